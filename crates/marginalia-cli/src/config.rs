//! Configuration management for the CLI.

use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use marginalia_analyzers::{CategorizerConfig, ScorerConfig};
use marginalia_domain::ScoringMethod;
use marginalia_engine::{EngineConfig, OutputConfig, PoolConfig};
use marginalia_llm::ProviderConfig;
use marginalia_sandbox::SandboxConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Built-in analyzers that can be switched on in `[analyzers]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// LLM categorizer
    Categorizer,
    /// Usefulness scorer
    Scorer,
    /// Keyword sentiment analyzer
    Sentiment,
}

/// Which analyzers run, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzersConfig {
    /// Built-in analyzers
    #[serde(default = "default_enabled")]
    pub enabled: Vec<AnalyzerKind>,

    /// Scripts run after the built-in analyzers
    #[serde(default)]
    pub scripts: Vec<PathBuf>,
}

fn default_enabled() -> Vec<AnalyzerKind> {
    vec![AnalyzerKind::Scorer]
}

impl Default for AnalyzersConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            scripts: Vec::new(),
        }
    }
}

/// Engine settings that are not pool or output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Upper bound on a single analyzer call (seconds)
    #[serde(default = "default_analyzer_timeout_secs")]
    pub analyzer_timeout_secs: u64,
}

fn default_analyzer_timeout_secs() -> u64 {
    EngineConfig::default().analyzer_timeout_secs
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            analyzer_timeout_secs: default_analyzer_timeout_secs(),
        }
    }
}

/// CLI configuration.
///
/// ```toml
/// [analyzers]
/// enabled = ["categorizer", "scorer"]
/// scripts = ["~/scripts/tagger.py"]
///
/// [llm]
/// kind = "openai"
/// model = "gpt-4o-mini"
///
/// [scorer]
/// method = "hybrid"
///
/// [pool]
/// concurrency = 8
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Worker pool settings
    #[serde(default)]
    pub pool: PoolConfig,

    /// Output writer settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Language model provider, required by the categorizer and llm/hybrid scoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<ProviderConfig>,

    /// Categorizer settings
    #[serde(default)]
    pub categorizer: CategorizerConfig,

    /// Scorer settings
    #[serde(default)]
    pub scorer: ScorerConfig,

    /// Script sandbox settings
    #[serde(default)]
    pub sandbox: SandboxConfig,

    /// Analyzer selection
    #[serde(default)]
    pub analyzers: AnalyzersConfig,
}

impl AppConfig {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".marginalia").join("config.toml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one the default path is used if
    /// present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file {} does not exist",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let path = Self::path()?;
                if !path.exists() {
                    debug!("No config at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };

        debug!("Loading config from {}", path.display());
        Self::from_toml(&fs::read_to_string(&path)?)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply command-line overrides from `analyze`
    pub fn apply_overrides(&mut self, args: &AnalyzeArgs) {
        if let Some(method) = args.scoring {
            self.scorer.method = method;
            if method != ScoringMethod::None && !self.is_enabled(AnalyzerKind::Scorer) {
                self.analyzers.enabled.push(AnalyzerKind::Scorer);
            }
        }
        self.analyzers.scripts.extend(args.scripts.iter().cloned());
        if args.sequential {
            self.pool = PoolConfig::sequential();
        }
        if let Some(concurrency) = args.concurrency {
            self.pool.concurrency = concurrency;
        }
    }

    /// Whether a built-in analyzer is switched on
    pub fn is_enabled(&self, kind: AnalyzerKind) -> bool {
        self.analyzers.enabled.contains(&kind)
    }

    /// Whether the scorer will actually run
    pub fn scorer_active(&self) -> bool {
        self.is_enabled(AnalyzerKind::Scorer) && self.scorer.method != ScoringMethod::None
    }

    /// Method recorded in the output metadata
    pub fn scoring_method(&self) -> ScoringMethod {
        if self.scorer_active() {
            self.scorer.method
        } else {
            ScoringMethod::None
        }
    }

    /// Whether any enabled analyzer calls a language model
    pub fn needs_llm(&self) -> bool {
        self.is_enabled(AnalyzerKind::Categorizer)
            || (self.scorer_active() && self.scorer.method.uses_llm())
    }

    /// Engine configuration assembled from the sections
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            scoring_method: self.scoring_method(),
            analyzer_timeout_secs: self.engine.analyzer_timeout_secs,
            pool: self.pool.clone(),
            output: self.output.clone(),
        }
    }

    /// Validate every section that will be used
    pub fn validate(&self) -> Result<()> {
        self.engine_config().validate().map_err(CliError::Config)?;
        self.sandbox.validate().map_err(CliError::Config)?;

        if self.is_enabled(AnalyzerKind::Categorizer) {
            self.categorizer.validate().map_err(CliError::Config)?;
        }
        if self.scorer_active() {
            self.scorer.validate().map_err(CliError::Config)?;
        }

        match &self.llm {
            Some(llm) => llm.validate().map_err(CliError::Config)?,
            None if self.needs_llm() => {
                return Err(CliError::Config(
                    "an [llm] section is required for the categorizer and llm/hybrid scoring"
                        .to_string(),
                ))
            }
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn analyze_args(extra: &[&str]) -> AnalyzeArgs {
        let mut argv = vec!["marginalia", "analyze", "in.json"];
        argv.extend_from_slice(extra);
        match crate::Cli::parse_from(argv).command {
            crate::Command::Analyze(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analyzers.enabled, vec![AnalyzerKind::Scorer]);
        assert_eq!(config.scoring_method(), ScoringMethod::Heuristic);
        assert!(!config.needs_llm());
        config.validate().unwrap();
    }

    #[test]
    fn test_from_toml_sections() {
        let config = AppConfig::from_toml(
            r#"
            [engine]
            analyzer_timeout_secs = 15

            [pool]
            concurrency = 2

            [output]
            directory = "/tmp/out"

            [llm]
            kind = "anthropic"
            model = "claude-test"

            [scorer]
            method = "hybrid"

            [analyzers]
            enabled = ["categorizer", "scorer", "sentiment"]
            scripts = ["tag.py"]
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.analyzer_timeout_secs, 15);
        assert_eq!(config.pool.concurrency, 2);
        assert_eq!(config.output.directory, PathBuf::from("/tmp/out"));
        assert_eq!(config.scoring_method(), ScoringMethod::Hybrid);
        assert!(config.needs_llm());
        assert_eq!(config.analyzers.scripts, vec![PathBuf::from("tag.py")]);
        config.validate().unwrap();

        let engine = config.engine_config();
        assert_eq!(engine.analyzer_timeout_secs, 15);
        assert_eq!(engine.scoring_method, ScoringMethod::Hybrid);
    }

    #[test]
    fn test_llm_section_required() {
        let mut config = AppConfig::default();
        config.analyzers.enabled.push(AnalyzerKind::Categorizer);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("[llm]"));
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.analyzers.enabled.clear();

        config.apply_overrides(&analyze_args(&[
            "--scoring",
            "llm",
            "--script",
            "x.sh",
            "--sequential",
        ]));

        assert!(config.is_enabled(AnalyzerKind::Scorer));
        assert_eq!(config.scoring_method(), ScoringMethod::Llm);
        assert_eq!(config.analyzers.scripts, vec![PathBuf::from("x.sh")]);
        assert!(!config.pool.enabled);
    }

    #[test]
    fn test_scoring_none_disables_scorer() {
        let mut config = AppConfig::default();
        config.apply_overrides(&analyze_args(&["--scoring", "none"]));
        assert!(!config.scorer_active());
        assert_eq!(config.scoring_method(), ScoringMethod::None);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[pool]\nthreshold = 3\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.pool.threshold, 3);

        assert!(AppConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let reparsed = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reparsed.pool, config.pool);
        assert_eq!(reparsed.analyzers, config.analyzers);
    }
}
