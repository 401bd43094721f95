//! Performance hints: long functions, image decoding, heavy view bodies.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::RuleView;
use crate::detect::{FileDetector, Finding, Severity};

/// Default maximum function length in lines.
pub const DEFAULT_MAX_FUNCTION_LENGTH: usize = 80;

/// Lines after a `body` declaration searched for heavy work.
const BODY_LOOKAHEAD: usize = 20;

lazy_static! {
    static ref FUNC_DECL: Regex = Regex::new(
        r"^(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|private|internal|fileprivate|open|static|class|final|override|mutating|nonisolated|package)\s+)*func\s"
    ).unwrap();
}

#[derive(Debug, Clone)]
pub struct PerformanceDetector {
    max_function_length: usize,
    flag_image_decoding_on_main: bool,
    flag_heavy_work_in_view_body: bool,
}

impl PerformanceDetector {
    pub const NAME: &'static str = "Performance";
    pub const CONFIG_KEY: &'static str = "performance";

    pub fn new(
        max_function_length: usize,
        flag_image_decoding_on_main: bool,
        flag_heavy_work_in_view_body: bool,
    ) -> Self {
        Self {
            max_function_length,
            flag_image_decoding_on_main,
            flag_heavy_work_in_view_body,
        }
    }

    pub fn from_settings(settings: &RuleView<'_>) -> Self {
        Self::new(
            settings.threshold("maxFunctionLength", DEFAULT_MAX_FUNCTION_LENGTH),
            settings.extra("flagImageDecodingOnMain", true),
            settings.extra("flagHeavyWorkInViewBody", true),
        )
    }

    fn long_functions(&self, path: &str, lines: &[&str], out: &mut Vec<Finding>) {
        // (start line, brace depth before the declaration)
        let mut open: Vec<(usize, i64)> = Vec::new();
        let mut depth: i64 = 0;

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if FUNC_DECL.is_match(trimmed) {
                open.push((idx + 1, depth));
            }

            for ch in trimmed.chars() {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        while let Some(&(start, base)) = open.last() {
                            if depth > base {
                                break;
                            }
                            open.pop();
                            let length = (idx + 1) - start;
                            if length > self.max_function_length {
                                out.push(Finding::new(
                                    Self::NAME,
                                    Severity::Info,
                                    path,
                                    start,
                                    format!(
                                        "Function spans {} lines (> {}). Consider refactor for readability & compile time.",
                                        length, self.max_function_length
                                    ),
                                ));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

impl Default for PerformanceDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FUNCTION_LENGTH, true, true)
    }
}

impl FileDetector for PerformanceDetector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, path: &str, source: &str) -> anyhow::Result<Vec<Finding>> {
        let lines: Vec<&str> = source.lines().collect();
        let mut findings = Vec::new();
        let mut long = Vec::new();
        self.long_functions(path, &lines, &mut long);

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();

            if self.flag_image_decoding_on_main
                && (trimmed.contains("UIImage(data:")
                    || trimmed.contains("CGImageSourceCreateImageAtIndex"))
            {
                findings.push(Finding::new(
                    Self::NAME,
                    Severity::Warning,
                    path,
                    idx + 1,
                    "Image decoding may occur on main thread. Decode off-main to avoid UI jank.",
                ));
            }

            if self.flag_heavy_work_in_view_body
                && (trimmed.contains("var body: some View") || trimmed.contains("var body: View"))
            {
                let window = &lines[idx..lines.len().min(idx + BODY_LOOKAHEAD)];
                let heavy = window
                    .iter()
                    .any(|l| l.contains("JSONDecoder().decode(") || l.contains("Data(contentsOf:"));
                if heavy {
                    findings.push(Finding::new(
                        Self::NAME,
                        Severity::Warning,
                        path,
                        idx + 1,
                        "Avoid heavy work inside SwiftUI `body`. Move networking/decoding to ViewModel/.task.",
                    ));
                }
            }
        }

        // Long-function findings are reported at their start line, which
        // precedes the line-scan findings for the same region.
        long.sort_by_key(|f| f.line());
        long.extend(findings);
        Ok(long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function_of(len: usize) -> String {
        let mut s = String::from("func load() {\n");
        for i in 0..len.saturating_sub(1) {
            s.push_str(&format!("    let x{} = {}\n", i, i));
        }
        s.push_str("}\n");
        s
    }

    #[test]
    fn test_long_function_flagged() {
        let source = function_of(12);
        let findings = PerformanceDetector::new(10, false, false)
            .evaluate("Loader.swift", &source)
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line(), 1);
        assert!(findings[0].message().contains("12 lines"));
        assert!(findings[0].message().contains("> 10"));
    }

    #[test]
    fn test_short_function_not_flagged() {
        let source = function_of(5);
        let findings = PerformanceDetector::new(10, false, false)
            .evaluate("Loader.swift", &source)
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_nested_braces_do_not_end_function() {
        let source = r#"private func render() {
    if ready {
        draw()
    }
    for item in items {
        draw(item)
    }
}
"#;
        let findings = PerformanceDetector::new(3, false, false)
            .evaluate("View.swift", source)
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message().contains("7 lines"));
    }

    #[test]
    fn test_image_decoding_and_heavy_body() {
        let source = r#"struct Gallery: View {
    var body: some View {
        let items = try! JSONDecoder().decode([Item].self, from: raw)
        return List(items) { Text($0.name) }
    }
    func thumb(_ d: Data) -> UIImage? { UIImage(data: d) }
}
"#;
        let findings = PerformanceDetector::default()
            .evaluate("Gallery.swift", source)
            .unwrap();
        let lines: Vec<usize> = findings.iter().map(|f| f.line()).collect();
        assert_eq!(lines, vec![2, 6]);
        assert!(findings.iter().all(|f| f.severity() == Severity::Warning));
    }
}
