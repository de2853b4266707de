// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Batch operations over every repository of a project.
//!
//! # Project Layout
//!
//! A project lives in one directory named after the project. Each repository
//! of the project is cloned into its own subdirectory named after the
//! repository, i.e., repository "a" of project "proj" lives at `proj/a`.
//! Nothing else is tracked. Whether a repository has been cloned is decided by
//! looking at the file system at the time of use.
//!
//! # Failure Policy
//!
//! Batch cloning never aborts. A repository that is already cloned is skipped
//! quietly, and any other failure is logged before moving on to the next
//! repository. The outcome of each repository is collected into a
//! [`CloneSummary`]. Branching, forking, and committing stop at the first
//! failure instead.

use crate::{
    access::{AccessError, Git2Access, RepoAccess},
    config::ProjectConfig,
    path::{with_work_dir, WorkDirError},
};

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{create_dir, remove_dir_all},
    path::{Path, PathBuf},
};
use tracing::{debug, error, info, instrument};

/// Create directory at `path`.
///
/// Failure, including `path` already existing, is logged and reported as
/// `false`. It is up to the caller whether that matters.
pub fn create_directory(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match create_dir(path) {
        Ok(()) => {
            debug!("created directory {:?}", path.display());
            true
        }
        Err(err) => {
            error!("encountered error when creating {:?}: {err}", path.display());
            false
        }
    }
}

/// Recursively remove directory at `path` if it exists.
///
/// # Errors
///
/// - Return [`ProjectError::Remove`] if directory cannot be removed.
pub fn remove_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("nothing to remove at {:?}", path.display());
        return Ok(());
    }

    remove_dir_all(path).map_err(|err| ProjectError::Remove {
        source: err,
        path: path.to_path_buf(),
    })?;
    info!("removed {:?}", path.display());

    Ok(())
}

/// Project of repositories described by a [`ProjectConfig`].
#[derive(Debug)]
pub struct Project<A = Git2Access>
where
    A: RepoAccess,
{
    config: ProjectConfig,
    access: A,
}

impl Project {
    /// Construct new project backed by libgit2.
    pub fn new(config: ProjectConfig) -> Self {
        Self::with_access(config, Git2Access::new())
    }
}

impl<A> Project<A>
where
    A: RepoAccess,
{
    /// Construct new project with custom repository access.
    pub fn with_access(config: ProjectConfig, access: A) -> Self {
        Self { config, access }
    }

    /// Configuration of project.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Create project directory.
    ///
    /// See [`create_directory`].
    pub fn create_directory(&self) -> bool {
        create_directory(self.config.project_dir())
    }

    /// Clone every repository of project into project directory.
    ///
    /// Repositories are cloned one at a time in configuration order. If the
    /// project directory does not exist, nothing is cloned and an empty
    /// summary is returned.
    #[instrument(skip(self), level = "debug")]
    pub fn clone_all(&self) -> CloneSummary {
        let mut summary = CloneSummary::default();
        let project_dir = self.config.project_dir();
        if !project_dir.exists() {
            error!("project directory {:?} does not exist", project_dir.display());
            return summary;
        }

        for repo in &self.config.repos {
            let url = self.config.remote_url(repo);
            let clone_path = self.config.clone_path(repo);
            let outcome = match self.access.clone_repo(&url, &clone_path) {
                Ok(()) => {
                    debug!("cloned {url} to {:?}", clone_path.display());
                    CloneOutcome::Cloned
                }
                Err(AccessError::AlreadyCloned { .. }) => {
                    debug!("{:?} already cloned, skipping", clone_path.display());
                    CloneOutcome::AlreadyCloned
                }
                Err(err) => {
                    error!("git encountered an error cloning {url}: {err}");
                    CloneOutcome::Failed(err.to_string())
                }
            };
            summary.push(repo, outcome);
        }

        summary
    }

    /// Create branch in every repository, then fork each one.
    ///
    /// The fork tool runs from inside each repository. The working directory
    /// of the process is restored afterwards, even on failure.
    ///
    /// # Errors
    ///
    /// - Return [`ProjectError::Access`] on first branch or fork failure.
    /// - Return [`ProjectError::WorkDir`] if a repository cannot be entered.
    #[instrument(skip(self, branch_name), level = "debug")]
    pub fn branch_and_fork(&self, branch_name: impl AsRef<str>) -> Result<()> {
        let branch_name = branch_name.as_ref();
        for repo in &self.config.repos {
            let working_dir = self.config.clone_path(repo);
            self.access.create_branch(&working_dir, branch_name)?;
            with_work_dir(&working_dir, || self.access.create_fork(&self.config.fork_tool))??;
            info!("forked {repo} on branch {branch_name:?}");
        }

        Ok(())
    }

    /// Commit and push working tree changes of every repository.
    ///
    /// # Errors
    ///
    /// - Return [`ProjectError::Access`] on first commit or push failure.
    #[instrument(skip(self, commit_message, branch_name), level = "debug")]
    pub fn commit_all(
        &self,
        commit_message: impl AsRef<str>,
        branch_name: impl AsRef<str>,
    ) -> Result<()> {
        for repo in &self.config.repos {
            self.access.add_content(
                self.config.clone_path(repo),
                commit_message.as_ref(),
                branch_name.as_ref(),
            )?;
        }

        Ok(())
    }

    /// Remove project directory and everything cloned into it.
    ///
    /// # Errors
    ///
    /// - Return [`ProjectError::Remove`] if directory cannot be removed.
    pub fn remove(&self) -> Result<()> {
        remove_dir(self.config.project_dir())
    }
}

/// Result of cloning one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    /// Fresh clone was made.
    Cloned,

    /// Destination was already occupied, nothing was done.
    AlreadyCloned,

    /// Clone failed with given message.
    Failed(String),
}

/// Outcome of each repository in a batch clone, in clone order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloneSummary {
    outcomes: Vec<(String, CloneOutcome)>,
}

impl CloneSummary {
    fn push(&mut self, repo: impl Into<String>, outcome: CloneOutcome) {
        self.outcomes.push((repo.into(), outcome));
    }

    /// Iterate over repositories and their outcomes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CloneOutcome)> {
        self.outcomes
            .iter()
            .map(|(repo, outcome)| (repo.as_str(), outcome))
    }

    /// Number of repositories attempted.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// No repository was attempted.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of fresh clones.
    pub fn cloned(&self) -> usize {
        self.count(|outcome| matches!(outcome, CloneOutcome::Cloned))
    }

    /// Number of skipped repositories.
    pub fn already_cloned(&self) -> usize {
        self.count(|outcome| matches!(outcome, CloneOutcome::AlreadyCloned))
    }

    /// Number of failed clones.
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, CloneOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&CloneOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .count()
    }
}

impl Display for CloneSummary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} of {} repositories cloned, {} already cloned, {} failed",
            self.cloned(),
            self.len(),
            self.already_cloned(),
            self.failed(),
        )
    }
}

/// Project operation error types.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    /// Repository access fails.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Repository directory cannot be entered.
    #[error(transparent)]
    WorkDir(#[from] WorkDirError),

    /// Project directory cannot be removed.
    #[error("failed to remove {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

type Result<T, E = ProjectError> = std::result::Result<T, E>;
