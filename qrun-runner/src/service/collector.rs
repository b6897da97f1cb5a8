//! Result collection
//!
//! Reads the job's redirected stdout/stderr from the workspace once the job
//! is terminal and relays them to the job log between begin/end markers.

use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

use crate::service::log_buffer::LogSink;
use crate::workspace::ExecutionWorkspace;

/// Raw bytes captured from the job
///
/// A stream is `None` when its file was missing or unreadable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedOutput {
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
}

impl CollectedOutput {
    /// Stdout decoded for display (UTF-8, lossy)
    pub fn stdout_text(&self) -> Option<String> {
        self.stdout
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Stderr decoded for display (UTF-8, lossy)
    pub fn stderr_text(&self) -> Option<String> {
        self.stderr
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

/// Reads `out` and `err` and forwards them to the job log
///
/// Unreadable streams are logged as warnings and omitted; this never fails.
pub async fn collect(workspace: &ExecutionWorkspace, log: &dyn LogSink) -> CollectedOutput {
    let stdout = relay_stream("stdout", workspace.out_path(), log).await;
    let stderr = relay_stream("stderr", workspace.err_path(), log).await;

    CollectedOutput { stdout, stderr }
}

async fn relay_stream(name: &str, path: &Path, log: &dyn LogSink) -> Option<Vec<u8>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let message = if e.kind() == ErrorKind::NotFound {
                format!("No {} captured: {} does not exist", name, path.display())
            } else {
                format!("Failed to read {} from {}: {}", name, path.display(), e)
            };
            warn!("{}", message);
            log.warning(message);
            return None;
        }
    };

    log.info(format!("---- begin {} ----", name));
    if !bytes.is_empty() {
        log.info(String::from_utf8_lossy(&bytes).into_owned());
    }
    log.info(format!("---- end {} ----", name));

    Some(bytes)
}
