//! Execution workspace for a submission
//!
//! Every submission stages its files in a private, uniquely named directory:
//! - `script` holds the request body
//! - `out` and `err` receive the job's redirected streams
//!
//! The directory is removed once the verdict is known, or when the workspace
//! is dropped (a cancelled or aborted run). Removal is best effort: failures
//! come back as warnings and never fail the submission.
//!
//! Filesystem calls here are synchronous: teardown must also run from `Drop`,
//! and each call is a single metadata operation on a local directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::WorkspaceError;

const SCRIPT_FILE: &str = "script";
const OUT_FILE: &str = "out";
const ERR_FILE: &str = "err";

/// How far the workspace is opened up when a run-as user is set
///
/// The job may run as a different user than the one owning the workspace, and
/// that user has to write `out` and `err` into it.
///
/// `World` makes the directory writable by every local account, so any of
/// them can read the script and plant or replace files before the job runs.
/// `Group` limits that to members of the base directory's group, which must
/// then be shared with the run-as user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharedAccess {
    /// Mode 0777
    #[default]
    World,
    /// Mode 2770 (setgid, so staged files inherit the directory's group)
    Group,
}

impl SharedAccess {
    pub fn mode(self) -> u32 {
        match self {
            SharedAccess::World => 0o777,
            SharedAccess::Group => 0o2770,
        }
    }
}

impl FromStr for SharedAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "world" => Ok(SharedAccess::World),
            "group" => Ok(SharedAccess::Group),
            other => Err(format!(
                "unknown shared access policy '{}' (expected 'world' or 'group')",
                other
            )),
        }
    }
}

/// A staged file or directory that could not be removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to remove {}: {}", self.path.display(), self.reason)
    }
}

/// Staging directory owned by exactly one submission
///
/// Dropping a workspace that was never torn down removes it.
#[derive(Debug)]
pub struct ExecutionWorkspace {
    dir: PathBuf,
    script: PathBuf,
    out: PathBuf,
    err: PathBuf,
    torn_down: AtomicBool,
}

impl ExecutionWorkspace {
    /// Creates a fresh workspace
    ///
    /// # Arguments
    /// * `base_dir` - Parent directory (None = system temp dir); must already exist
    /// * `run_as_user` - When set, permissions are widened per `access`
    /// * `access` - Widening policy for run-as submissions
    pub fn create(
        base_dir: Option<&Path>,
        run_as_user: Option<&str>,
        access: SharedAccess,
    ) -> Result<Self, WorkspaceError> {
        Self::create_with(base_dir, run_as_user, access, widen_permissions)
    }

    fn create_with<F>(
        base_dir: Option<&Path>,
        run_as_user: Option<&str>,
        access: SharedAccess,
        widen: F,
    ) -> Result<Self, WorkspaceError>
    where
        F: FnOnce(&Path, SharedAccess) -> Result<(), WorkspaceError>,
    {
        let base = match base_dir {
            Some(dir) => dir.to_path_buf(),
            None => std::env::temp_dir(),
        };
        let base = std::path::absolute(&base).map_err(|source| WorkspaceError::Create {
            path: base.clone(),
            source,
        })?;

        let dir = base.join(format!("qrun-{}", Uuid::new_v4()));

        // create_dir rather than create_dir_all: a missing base is an error
        fs::create_dir(&dir).map_err(|source| WorkspaceError::Create {
            path: dir.clone(),
            source,
        })?;

        let workspace = Self {
            script: dir.join(SCRIPT_FILE),
            out: dir.join(OUT_FILE),
            err: dir.join(ERR_FILE),
            dir,
            torn_down: AtomicBool::new(false),
        };

        if let Some(user) = run_as_user {
            if let Err(e) = widen(&workspace.dir, access) {
                workspace.teardown();
                return Err(e);
            }
            info!(
                "Opened workspace {} to run-as user {} ({:?} access)",
                workspace.dir.display(),
                user,
                access
            );
        }

        debug!("Created workspace {}", workspace.dir.display());
        Ok(workspace)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn script_path(&self) -> &Path {
        &self.script
    }

    pub fn out_path(&self) -> &Path {
        &self.out
    }

    pub fn err_path(&self) -> &Path {
        &self.err
    }

    /// Removes `script`, `out`, `err`, then the directory
    ///
    /// Each removal is attempted regardless of the others. Entries that are
    /// already gone are skipped, so calling this twice is harmless.
    pub fn teardown(&self) -> Vec<CleanupWarning> {
        self.torn_down.store(true, Ordering::SeqCst);
        let mut warnings = Vec::new();

        for file in [&self.script, &self.out, &self.err] {
            if let Err(e) = fs::remove_file(file) {
                if e.kind() != ErrorKind::NotFound {
                    warnings.push(CleanupWarning {
                        path: file.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if let Err(e) = fs::remove_dir(&self.dir) {
            if e.kind() != ErrorKind::NotFound {
                warnings.push(CleanupWarning {
                    path: self.dir.clone(),
                    reason: e.to_string(),
                });
            }
        }

        for warning in &warnings {
            warn!("{}", warning);
        }
        if warnings.is_empty() {
            debug!("Removed workspace {}", self.dir.display());
        }

        warnings
    }
}

impl Drop for ExecutionWorkspace {
    fn drop(&mut self) {
        if !self.torn_down.load(Ordering::SeqCst) {
            debug!("Workspace {} dropped before teardown", self.dir.display());
            self.teardown();
        }
    }
}

/// Formats a path for the scheduler, as `host:path` when a log host is set
pub fn qualify_path(path: &Path, log_host: Option<&str>) -> String {
    match log_host {
        Some(host) => format!("{}:{}", host, path.display()),
        None => path.display().to_string(),
    }
}

#[cfg(unix)]
fn widen_permissions(dir: &Path, access: SharedAccess) -> Result<(), WorkspaceError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(access.mode())).map_err(|source| {
        WorkspaceError::Permissions {
            path: dir.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn widen_permissions(_dir: &Path, _access: SharedAccess) -> Result<(), WorkspaceError> {
    Ok(())
}
