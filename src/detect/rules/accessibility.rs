//! Accessibility labels on SwiftUI images and buttons.

use crate::config::RuleView;
use crate::detect::{FileDetector, Finding, Severity};

/// Flags `Image(` and `Button(` declarations without an accessibility label.
#[derive(Debug, Clone)]
pub struct AccessibilityDetector {
    require_labels_for_images: bool,
    require_labels_for_buttons: bool,
}

impl AccessibilityDetector {
    pub const NAME: &'static str = "Accessibility";
    pub const CONFIG_KEY: &'static str = "accessibility";

    pub fn new(require_labels_for_images: bool, require_labels_for_buttons: bool) -> Self {
        Self {
            require_labels_for_images,
            require_labels_for_buttons,
        }
    }

    pub fn from_settings(settings: &RuleView<'_>) -> Self {
        Self::new(
            settings.extra("requireLabelsForImages", true),
            settings.extra("requireLabelsForButtons", true),
        )
    }
}

impl Default for AccessibilityDetector {
    fn default() -> Self {
        Self::new(true, true)
    }
}

fn is_labelled(line: &str) -> bool {
    line.contains(".accessibilityLabel(") || line.contains("accessibilityHidden(true)")
}

impl FileDetector for AccessibilityDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>> {
        let mut findings = Vec::new();

        for (idx, line) in source.lines().enumerate() {
            let trimmed = line.trim();

            if self.require_labels_for_images && trimmed.contains("Image(") && !is_labelled(trimmed) {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Warning,
                    path,
                    idx + 1,
                    "SwiftUI Image missing accessibilityLabel",
                ));
            }

            if self.require_labels_for_buttons && trimmed.contains("Button(") && !is_labelled(trimmed) {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Info,
                    path,
                    idx + 1,
                    "SwiftUI Button missing accessibilityLabel (hint)",
                ));
            }
        }

        Ok(findings)
    }
}
