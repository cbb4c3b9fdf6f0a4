//! Persist analysis exports without ever overwriting a file

use crate::config::OutputConfig;
use crate::schema::SchemaValidator;
use crate::EngineError;
use chrono::{DateTime, Utc};
use marginalia_domain::{AnalysisExport, ScoringMethod};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Filesystem-safe timestamp used in generated names
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";

const MAX_NAME_ATTEMPTS: usize = 16;

/// Validates and writes analysis exports
#[derive(Debug, Clone)]
pub struct OutputWriter {
    config: OutputConfig,
    validator: SchemaValidator,
}

impl OutputWriter {
    /// Create a writer
    pub fn new(config: OutputConfig) -> Self {
        Self {
            config,
            validator: SchemaValidator::new(),
        }
    }

    /// Write to a name generated from the filename pattern
    pub fn write(&self, export: &AnalysisExport) -> Result<PathBuf, EngineError> {
        let bytes = self.render(export)?;
        let name = self.resolve_filename(export.metadata.scoring_method, Utc::now());
        self.create_unique(&self.config.directory.join(name), &bytes)
    }

    /// Write to an explicit path, choosing a sibling name if it is taken
    pub fn write_to(&self, export: &AnalysisExport, path: &Path) -> Result<PathBuf, EngineError> {
        let bytes = self.render(export)?;
        self.create_unique(path, &bytes)
    }

    /// Expand `{method}` and `{timestamp}` in the filename pattern
    pub fn resolve_filename(&self, method: ScoringMethod, now: DateTime<Utc>) -> String {
        self.config
            .filename_pattern
            .replace("{method}", method.as_str())
            .replace("{timestamp}", &now.format(FILENAME_TIMESTAMP_FORMAT).to_string())
    }

    fn render(&self, export: &AnalysisExport) -> Result<Vec<u8>, EngineError> {
        let document = serde_json::to_value(export)
            .map_err(|e| EngineError::Validation(format!("Failed to serialize export: {}", e)))?;

        let report = self.validator.validate_output(&document);
        if !report.is_valid() {
            return Err(EngineError::Validation(report.message()));
        }

        let mut bytes = if self.config.pretty {
            serde_json::to_vec_pretty(&document)
        } else {
            serde_json::to_vec(&document)
        }
        .map_err(|e| EngineError::Validation(format!("Failed to serialize export: {}", e)))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn create_unique(&self, target: &Path, bytes: &[u8]) -> Result<PathBuf, EngineError> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }

        let mut candidate = target.to_path_buf();
        for _ in 0..MAX_NAME_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut file) => {
                    file.write_all(bytes)
                        .and_then(|()| file.flush())
                        .map_err(|e| EngineError::io(&candidate, e))?;
                    info!("Wrote analysis to {}", candidate.display());
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists, trying another name", candidate.display());
                    candidate = unique_variant(target);
                }
                Err(e) => return Err(EngineError::io(&candidate, e)),
            }
        }

        Err(EngineError::Io {
            path: target.to_path_buf(),
            message: format!("no free file name after {} attempts", MAX_NAME_ATTEMPTS),
        })
    }
}

/// `name.json` to `name_<millis>_<random>.json`
fn unique_variant(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    let suffix = format!("{}_{}", Utc::now().timestamp_millis(), &random[..8]);

    let name = match target.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    target.with_file_name(name)
}
