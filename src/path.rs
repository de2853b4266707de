// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Resolve user supplied paths, and temporarily move the process into another
//! working directory.

use std::{
    env::{current_dir, set_current_dir},
    path::{Path, PathBuf},
};
use tracing::{debug, error};

/// Determine user's home directory as a string.
///
/// Does not check if the path returned actually exists.
pub fn home_dir() -> Option<String> {
    dirs::home_dir().map(|home| home.to_string_lossy().into_owned())
}

/// Expand leading `~` of path into user's home directory.
///
/// Paths without a leading `~` are returned as is. The home directory is
/// resolved through [`home_dir`], and left unexpanded if it cannot be
/// determined.
pub fn expand_tilde(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref().to_string_lossy();
    PathBuf::from(shellexpand::tilde_with_context(&*path, home_dir).into_owned())
}

/// Scoped change of the current working directory.
///
/// Entering a [`WorkDir`] records the current working directory of the
/// process and switches to the target directory. The recorded directory is
/// restored when the guard is dropped, no matter how the enclosing scope is
/// left.
#[derive(Debug)]
pub struct WorkDir {
    saved: PathBuf,
}

impl WorkDir {
    /// Switch into `path`, expanding a leading `~`.
    ///
    /// # Errors
    ///
    /// - Return [`WorkDirError::Current`] if the current working directory
    ///   cannot be determined.
    /// - Return [`WorkDirError::Enter`] if `path` cannot be entered.
    pub fn enter(path: impl AsRef<Path>) -> Result<Self> {
        let saved = current_dir().map_err(WorkDirError::Current)?;
        let target = expand_tilde(path);
        set_current_dir(&target).map_err(|err| WorkDirError::Enter {
            source: err,
            path: target.clone(),
        })?;
        debug!("entered {:?}", target.display());

        Ok(Self { saved })
    }

    /// Working directory that will be restored.
    pub fn saved(&self) -> &Path {
        self.saved.as_path()
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match set_current_dir(&self.saved) {
            Ok(()) => debug!("restored {:?}", self.saved.display()),
            Err(err) => error!("cannot restore {:?}: {err}", self.saved.display()),
        }
    }
}

/// Run `work` inside `path`, restoring the working directory afterwards.
///
/// # Errors
///
/// - Return [`WorkDirError`] if `path` cannot be entered. Errors produced by
///   `work` itself are handed back untouched inside the `Ok` variant.
pub fn with_work_dir<T>(path: impl AsRef<Path>, work: impl FnOnce() -> T) -> Result<T> {
    let _guard = WorkDir::enter(path)?;
    Ok(work())
}

/// Working directory cannot be changed.
#[derive(Debug, thiserror::Error)]
pub enum WorkDirError {
    /// Current working directory is unknown.
    #[error("cannot determine current working directory")]
    Current(#[source] std::io::Error),

    /// Target directory cannot be entered.
    #[error("cannot enter directory {:?}", path.display())]
    Enter {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = WorkDirError> = std::result::Result<T, E>;
