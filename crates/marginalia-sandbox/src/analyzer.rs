//! `Analyzer` adapter for user scripts

use crate::sandbox::ScriptSandbox;
use async_trait::async_trait;
use marginalia_domain::{AnalysisResult, Analyzer, AnalyzerError, BookmarkRecord};

/// Runs a [`ScriptSandbox`] as one analyzer in the pipeline
///
/// Script failures are logged by the sandbox and show up as an empty result,
/// so this analyzer never reports an error itself.
#[derive(Debug, Clone)]
pub struct ScriptAnalyzer {
    name: String,
    sandbox: ScriptSandbox,
}

impl ScriptAnalyzer {
    /// Wrap a loaded script
    pub fn new(sandbox: ScriptSandbox) -> Self {
        let file_name = sandbox
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| sandbox.path().display().to_string());

        Self {
            name: format!("script:{}", file_name),
            sandbox,
        }
    }

    /// The wrapped sandbox
    pub fn sandbox(&self) -> &ScriptSandbox {
        &self.sandbox
    }
}

#[async_trait]
impl Analyzer for ScriptAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, AnalyzerError> {
        Ok(self.sandbox.analyze(bookmark).await)
    }
}
