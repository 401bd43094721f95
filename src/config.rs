//! Configuration schema and loading for reviewgate.
//!
//! A configuration enables or disables detectors, tunes their thresholds,
//! selects the AI summary provider, and scopes the file scan.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "REVIEWGATE_CONFIG";

/// Default config file names to search for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &[
    "reviewgate.yaml",
    "reviewgate.yml",
    ".reviewgate.yaml",
    "reviewgate.json",
];

/// Errors raised while reading or parsing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Per-detector settings keyed by detector config key (e.g. "performance").
    #[serde(default)]
    pub rules: BTreeMap<String, RuleEntry>,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

/// A rule entry as written in the config file.
///
/// Entries that do not match the [`RuleSettings`] shape are kept as raw
/// values so one bad entry cannot reject the whole file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    Settings(RuleSettings),
    Malformed(serde_json::Value),
}

/// Well-formed settings for one detector.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub extras: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    pub thresholds: Option<BTreeMap<String, i64>>,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            extras: None,
            thresholds: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// AI summary provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    /// "local" (default), "openai", or "none"
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_prompt_style")]
    pub prompt_style: String,
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f64 {
    0.2
}

fn default_prompt_style() -> String {
    "pr-summary".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            prompt_style: default_prompt_style(),
        }
    }
}

/// Which files the scan enumerates.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// File extensions (without dot) to analyze.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Glob patterns, relative to the source root, to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["swift".to_string()]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

/// Read-only view of one detector's settings with default fallbacks.
#[derive(Debug, Clone, Copy)]
pub struct RuleView<'a> {
    key: &'a str,
    entry: Option<&'a RuleEntry>,
}

impl<'a> RuleView<'a> {
    /// Whether the detector is enabled. Absent entries are enabled.
    pub fn enabled(&self) -> bool {
        match self.entry {
            None => true,
            Some(RuleEntry::Settings(s)) => s.enabled,
            Some(RuleEntry::Malformed(raw)) => raw
                .as_bool()
                .or_else(|| raw.get("enabled").and_then(|v| v.as_bool()))
                .unwrap_or(true),
        }
    }

    /// Whether the entry failed to parse as settings.
    pub fn is_malformed(&self) -> bool {
        matches!(self.entry, Some(RuleEntry::Malformed(_)))
    }

    /// Boolean extra flag, or `default` when unset or malformed.
    pub fn extra(&self, name: &str, default: bool) -> bool {
        match self.entry {
            Some(RuleEntry::Settings(s)) => s
                .extras
                .as_ref()
                .and_then(|m| m.get(name).copied())
                .unwrap_or(default),
            _ => default,
        }
    }

    /// Non-negative threshold, or `default` when unset, negative, or malformed.
    pub fn threshold(&self, name: &str, default: usize) -> usize {
        let raw = match self.entry {
            Some(RuleEntry::Settings(s)) => s.thresholds.as_ref().and_then(|m| m.get(name).copied()),
            _ => None,
        };
        match raw {
            Some(v) => usize::try_from(v).unwrap_or_else(|_| {
                warn!(
                    rule = self.key,
                    threshold = name,
                    value = v,
                    "negative threshold, using default {}",
                    default
                );
                default
            }),
            None => default,
        }
    }
}

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config <path>` on the command line.
    Explicit(PathBuf),
    /// The path in [`CONFIG_ENV`].
    Environment(PathBuf),
    /// A default file name found in the working directory.
    Discovered(PathBuf),
    /// Nothing found, or a non-explicit file failed to load.
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Explicit(p) => write!(f, "{}", p.display()),
            ConfigSource::Environment(p) => write!(f, "{} (from ${})", p.display(), CONFIG_ENV),
            ConfigSource::Discovered(p) => write!(f, "{}", p.display()),
            ConfigSource::Defaults => write!(f, "built-in defaults"),
        }
    }
}

impl Config {
    /// Parse a config file, choosing JSON for `.json` and YAML otherwise.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            serde_json::from_str::<Config>(&content).map_err(|e| e.to_string())
        } else {
            Self::parse_yaml(&content)
        };

        let config = parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })?;

        validate(&config).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(config)
    }

    fn parse_yaml(content: &str) -> Result<Config, String> {
        // An empty YAML document is a valid, empty config.
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str::<Config>(content).map_err(|e| e.to_string())
    }

    /// Settings view for a detector config key.
    pub fn rule<'a>(&'a self, key: &'a str) -> RuleView<'a> {
        RuleView {
            key,
            entry: self.rules.get(key),
        }
    }
}

/// Validate a parsed config.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    for pattern in &config.scan.exclude {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid scan.exclude pattern {:?}: {}", pattern, e))?;
    }

    if config.scan.extensions.is_empty() {
        anyhow::bail!("scan.extensions must list at least one extension");
    }

    Ok(())
}

/// Load the configuration for one invocation.
///
/// An explicit path must load; any other source falls back to defaults on
/// failure.
pub fn load(explicit: Option<&Path>) -> Result<(Config, ConfigSource), ConfigError> {
    let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    load_from(explicit, env_path, Path::new("."))
}

/// [`load`] with the environment and search directory supplied by the caller.
pub fn load_from(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    search_dir: &Path,
) -> Result<(Config, ConfigSource), ConfigError> {
    if let Some(path) = explicit {
        let config = Config::parse_file(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let candidate = match env_path {
        Some(p) => Some(ConfigSource::Environment(p)),
        None => discover(search_dir).map(ConfigSource::Discovered),
    };

    let path = match &candidate {
        Some(ConfigSource::Environment(p)) | Some(ConfigSource::Discovered(p)) => p.clone(),
        _ => {
            debug!("no config file found, using built-in defaults");
            return Ok((Config::default(), ConfigSource::Defaults));
        }
    };

    match Config::parse_file(&path) {
        Ok(config) => Ok((config, candidate.unwrap_or(ConfigSource::Defaults))),
        Err(e) => {
            warn!("{}; falling back to built-in defaults", e);
            Ok((Config::default(), ConfigSource::Defaults))
        }
    }
}

/// Find the first default config file in `dir`.
fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}
