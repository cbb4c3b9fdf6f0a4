//! Run one user script per bookmark in its own interpreter process

use crate::config::{Interpreter, SandboxConfig};
use crate::error::ScriptError;
use crate::validate::{output_violations, to_analysis_result};
use marginalia_domain::{AnalysisResult, BookmarkRecord};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, warn};

const READ_CHUNK: usize = 8 * 1024;

/// A loaded user script
///
/// The script receives one bookmark as JSON on stdin and must print a JSON
/// object on stdout. Every call to [`execute`](Self::execute) starts a fresh
/// process; nothing is shared between calls.
#[derive(Debug, Clone)]
pub struct ScriptSandbox {
    path: PathBuf,
    timeout: Duration,
    max_output_bytes: usize,
    config: SandboxConfig,
}

struct Finished {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl ScriptSandbox {
    /// Load a script from disk
    pub fn load(path: impl AsRef<Path>, config: SandboxConfig) -> Result<Self, ScriptError> {
        config.validate().map_err(ScriptError::Config)?;

        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ScriptError::NotFound(path.to_path_buf()),
            _ => ScriptError::Io(format!("{}: {}", path.display(), e)),
        })?;
        if !metadata.is_file() {
            return Err(ScriptError::NotAFile(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            timeout: config.timeout(),
            max_output_bytes: config.max_output_bytes,
            config,
        })
    }

    /// Override the time limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Path of the script
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the script for one bookmark and return its parsed stdout
    pub async fn execute(&self, bookmark: &BookmarkRecord) -> Result<Value, ScriptError> {
        let interpreter = self.interpreter()?;
        let input = serde_json::to_vec(bookmark)
            .map_err(|e| ScriptError::Io(format!("Failed to serialize bookmark: {}", e)))?;

        let mut child = Command::new(&interpreter.command)
            .args(&interpreter.args)
            .arg(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ScriptError::Spawn {
                command: interpreter.command.clone(),
                message: e.to_string(),
            })?;

        debug!(
            "Running {} for bookmark {} ({} {})",
            self.path.display(),
            bookmark.id,
            interpreter.command,
            interpreter.args.join(" ")
        );

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let budget = AtomicUsize::new(self.max_output_bytes);
        let limit = self.max_output_bytes;

        let run = async {
            let ((), stdout, stderr) = tokio::try_join!(
                write_input(stdin, &input),
                read_capped(stdout, &budget, limit),
                read_capped(stderr, &budget, limit),
            )?;
            let status = child
                .wait()
                .await
                .map_err(|e| ScriptError::Io(format!("Failed to wait for script: {}", e)))?;
            Ok::<_, ScriptError>(Finished {
                status,
                stdout,
                stderr,
            })
        };

        let outcome = tokio::time::timeout(self.timeout, run).await;
        let finished = match outcome {
            Ok(Ok(finished)) => finished,
            Ok(Err(e)) => {
                kill_and_reap(&mut child).await;
                return Err(e);
            }
            Err(_) => {
                kill_and_reap(&mut child).await;
                return Err(ScriptError::Timeout(self.timeout));
            }
        };

        if !finished.status.success() {
            return Err(ScriptError::NonZeroExit {
                code: finished.status.code(),
                stderr: String::from_utf8_lossy(&finished.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&finished.stdout).map_err(|e| ScriptError::InvalidJson(e.to_string()))
    }

    /// Check the shape of script output, logging each violation
    pub fn validate(&self, output: &Value) -> bool {
        let violations = output_violations(output);
        for violation in &violations {
            warn!("Invalid output from {}: {}", self.path.display(), violation);
        }
        violations.is_empty()
    }

    /// Execute and validate; any failure yields an empty result
    pub async fn analyze(&self, bookmark: &BookmarkRecord) -> AnalysisResult {
        match self.try_analyze(bookmark).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "Script execution failed for bookmark {} ({}): {}",
                    bookmark.id,
                    self.path.display(),
                    e
                );
                AnalysisResult::empty()
            }
        }
    }

    async fn try_analyze(&self, bookmark: &BookmarkRecord) -> Result<AnalysisResult, ScriptError> {
        let output = self.execute(bookmark).await?;
        let violations = output_violations(&output);
        if !violations.is_empty() {
            return Err(ScriptError::InvalidOutput(violations.join("; ")));
        }
        Ok(to_analysis_result(&output))
    }

    fn interpreter(&self) -> Result<&Interpreter, ScriptError> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        self.config
            .interpreter_for(extension)
            .ok_or_else(|| ScriptError::UnsupportedExtension(extension.to_string()))
    }
}

async fn write_input(stdin: Option<ChildStdin>, input: &[u8]) -> Result<(), ScriptError> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };

    // Scripts may exit without reading their input
    let written = match stdin.write_all(input).await {
        Ok(()) => stdin.shutdown().await,
        Err(e) => Err(e),
    };
    match written {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(ScriptError::Io(format!("Failed to write script input: {}", e))),
    }
}

/// Read a stream to its end, charging every byte against the shared budget
async fn read_capped<R>(
    reader: Option<R>,
    budget: &AtomicUsize,
    limit: usize,
) -> Result<Vec<u8>, ScriptError>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };

    let mut collected = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let read = reader
            .read(&mut chunk)
            .await
            .map_err(|e| ScriptError::Io(format!("Failed to read script output: {}", e)))?;
        if read == 0 {
            return Ok(collected);
        }

        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(read))
            .map_err(|_| ScriptError::OutputTooLarge { limit })?;
        collected.extend_from_slice(&chunk[..read]);
    }
}

async fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Failed to kill script process: {}", e);
    }
}
