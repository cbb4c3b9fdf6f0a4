//! Configuration for the engine, worker pool and output writer

use marginalia_domain::ScoringMethod;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on pool concurrency
pub const MAX_CONCURRENCY: usize = 16;

/// Worker pool configuration
///
/// # Examples
///
/// ```
/// use marginalia_engine::PoolConfig;
///
/// let config = PoolConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.concurrency, 4);
/// assert_eq!(config.threshold, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Allow the concurrent path at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of items in flight (1..=16)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Minimum item count for the concurrent path
    #[serde(default = "default_threshold")]
    pub threshold: usize,

    /// Items fed to the pool per chunk
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_threshold() -> usize {
    10
}

fn default_batch_size() -> usize {
    50
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            concurrency: default_concurrency(),
            threshold: default_threshold(),
            batch_size: default_batch_size(),
        }
    }
}

impl PoolConfig {
    /// Always process items one at a time
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            ));
        }
        if self.threshold == 0 {
            return Err("threshold must be at least 1".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Output file configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for pattern-named output files
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// File name with `{method}` and `{timestamp}` placeholders
    #[serde(default = "default_filename_pattern")]
    pub filename_pattern: String,

    /// Pretty-print the JSON
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_filename_pattern() -> String {
    "bookmarks_analyzed_{method}_{timestamp}.json".to_string()
}

fn default_pretty() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            filename_pattern: default_filename_pattern(),
            pretty: default_pretty(),
        }
    }
}

impl OutputConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let pattern = self.filename_pattern.trim();
        if pattern.is_empty() {
            return Err("filename_pattern must not be empty".to_string());
        }
        if pattern.contains('/') || pattern.contains('\\') {
            return Err("filename_pattern must be a file name, not a path".to_string());
        }
        Ok(())
    }
}

/// Top-level engine configuration
///
/// # Examples
///
/// ```
/// use marginalia_engine::EngineConfig;
///
/// let config = EngineConfig::from_toml(r#"
///     scoring_method = "hybrid"
///
///     [pool]
///     concurrency = 8
/// "#).unwrap();
/// assert_eq!(config.pool.concurrency, 8);
/// assert_eq!(config.pool.threshold, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recorded as `scoringMethod` in the output metadata
    #[serde(default)]
    pub scoring_method: ScoringMethod,

    /// Upper bound on a single analyzer call (seconds)
    #[serde(default = "default_analyzer_timeout_secs")]
    pub analyzer_timeout_secs: u64,

    /// Worker pool settings
    #[serde(default)]
    pub pool: PoolConfig,

    /// Output writer settings
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_analyzer_timeout_secs() -> u64 {
    120
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring_method: ScoringMethod::default(),
            analyzer_timeout_secs: default_analyzer_timeout_secs(),
            pool: PoolConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Sequential processing, useful for debugging and rate-limited providers
    pub fn sequential() -> Self {
        Self {
            pool: PoolConfig::sequential(),
            ..Self::default()
        }
    }

    /// Maximum concurrency from the first bookmark
    ///
    /// Suitable for large exports against providers without tight rate limits.
    pub fn high_throughput() -> Self {
        Self {
            pool: PoolConfig {
                enabled: true,
                concurrency: MAX_CONCURRENCY,
                threshold: 1,
                batch_size: 100,
            },
            ..Self::default()
        }
    }

    /// Per-analyzer time limit
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.analyzer_timeout_secs == 0 {
            return Err("analyzer_timeout_secs must be greater than 0".to_string());
        }
        self.pool.validate()?;
        self.output.validate()
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }
}
