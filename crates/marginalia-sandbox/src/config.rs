//! Sandbox configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Command used to run scripts of one extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpreter {
    /// Executable, resolved through `PATH`
    pub command: String,

    /// Arguments placed before the script path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Interpreter {
    /// Interpreter without extra arguments
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }
}

/// Limits and interpreters for user scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Wall-clock limit per execution (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ceiling on combined stdout and stderr (bytes)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// File extension (without the dot) to interpreter
    #[serde(default = "default_interpreters")]
    pub interpreters: BTreeMap<String, Interpreter>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_interpreters() -> BTreeMap<String, Interpreter> {
    let mut interpreters = BTreeMap::new();
    interpreters.insert("py".to_string(), Interpreter::new("python3"));
    for ext in ["js", "mjs", "cjs"] {
        interpreters.insert(ext.to_string(), Interpreter::new("node"));
    }
    interpreters.insert("sh".to_string(), Interpreter::new("sh"));
    interpreters.insert("rb".to_string(), Interpreter::new("ruby"));
    interpreters
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            interpreters: default_interpreters(),
        }
    }
}

impl SandboxConfig {
    /// Per-execution time limit
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Interpreter for a file extension, matched case-insensitively
    pub fn interpreter_for(&self, extension: &str) -> Option<&Interpreter> {
        self.interpreters.get(&extension.to_ascii_lowercase())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_output_bytes == 0 {
            return Err("max_output_bytes must be greater than 0".to_string());
        }
        if let Some((ext, _)) = self
            .interpreters
            .iter()
            .find(|(_, interpreter)| interpreter.command.trim().is_empty())
        {
            return Err(format!("interpreter for '.{}' has an empty command", ext));
        }
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SandboxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.interpreter_for("PY").unwrap().command, "python3");
        assert_eq!(config.interpreter_for("mjs").unwrap().command, "node");
        assert!(config.interpreter_for("exe").is_none());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = SandboxConfig {
            timeout_secs: 0,
            ..SandboxConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SandboxConfig {
            max_output_bytes: 0,
            ..SandboxConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_replaces_interpreters() {
        let config = SandboxConfig::from_toml(
            r#"
            timeout_secs = 5

            [interpreters.ts]
            command = "deno"
            args = ["run", "--quiet"]
            "#,
        )
        .unwrap();

        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.max_output_bytes, 1024 * 1024);
        assert_eq!(config.interpreters.len(), 1);
        assert_eq!(config.interpreter_for("ts").unwrap().args, vec!["run", "--quiet"]);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SandboxConfig::default();
        let parsed = SandboxConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.interpreters, config.interpreters);
    }
}
