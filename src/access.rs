// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository access.
//!
//! Every interaction with version control and the hosting service goes
//! through the [`RepoAccess`] trait: cloning, branching, committing and
//! pushing, and forking. The default implementation, [`Git2Access`], talks to
//! repositories through libgit2 and hands forking off to an external command.
//!
//! # Authentication
//!
//! Remote repositories are addressed over SSH, i.e.,
//! `git@github.com:org/repo.git`. Credentials are resolved from the local
//! environment: ssh-agent, default SSH keys, and configured git credential
//! helpers. If none of those work out, the user is prompted. Prompts suspend
//! any active progress bar.

use auth_git2::{GitAuthenticator, Prompter};
use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    Config, ErrorCode, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks, Repository,
};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
    time::{Duration, Instant},
};
use tracing::{debug, info, instrument};

/// Name of the remote that branches are pushed to, and forks are recorded as.
pub const ORIGIN: &str = "origin";

/// Layer of indirection for repository access.
pub trait RepoAccess {
    /// Clone repository at `url` into `path`.
    ///
    /// Must return [`AccessError::AlreadyCloned`] when `path` already holds
    /// something, so callers can tell a skipped clone from a failed one.
    fn clone_repo(&self, url: impl AsRef<str>, path: impl AsRef<Path>) -> Result<()>;

    /// Create branch at HEAD of repository in `working_dir` and check it out.
    fn create_branch(
        &self,
        working_dir: impl AsRef<Path>,
        branch_name: impl AsRef<str>,
    ) -> Result<()>;

    /// Stage everything, commit, and push branch to [`ORIGIN`] as upstream.
    fn add_content(
        &self,
        working_dir: impl AsRef<Path>,
        commit_message: impl AsRef<str>,
        branch_name: impl AsRef<str>,
    ) -> Result<()>;

    /// Fork repository of current working directory on the hosting service.
    fn create_fork(&self, fork_tool: impl AsRef<OsStr>) -> Result<()>;
}

/// Repository access through libgit2.
#[derive(Debug, Clone)]
pub struct Git2Access {
    show_progress: bool,
}

impl Git2Access {
    /// Construct access that draws clone progress to the terminal.
    pub fn new() -> Self {
        Self { show_progress: true }
    }

    /// Construct access that never draws anything.
    pub fn quiet() -> Self {
        Self {
            show_progress: false,
        }
    }

    fn progress_bar(&self, message: impl Into<String>) -> Result<ProgressBar> {
        let bar = if self.show_progress {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));

        Ok(bar)
    }
}

impl Default for Git2Access {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoAccess for Git2Access {
    /// Clone repository through libgit2.
    ///
    /// The progress of the clone is displayed through a progress bar. If
    /// credentials are required, then the user will be prompted for them
    /// while the progress bar is held.
    ///
    /// # Errors
    ///
    /// - Return [`AccessError::AlreadyCloned`] if `path` exists and is not an
    ///   empty directory.
    /// - Return [`AccessError::Git2`] if the clone fails otherwise.
    #[instrument(skip(self, url, path), level = "debug")]
    fn clone_repo(&self, url: impl AsRef<str>, path: impl AsRef<Path>) -> Result<()> {
        let (url, path) = (url.as_ref(), path.as_ref());
        let prompter = IndicatifPrompter::new(self.progress_bar(url)?);
        let authenticator = GitAuthenticator::default().set_prompter(prompter.clone());
        let config = Config::open_default()?;

        let mut throttle = Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(|progress| {
            if throttle.elapsed() > Duration::from_millis(10) {
                throttle = Instant::now();
                prompter.bar.set_length(progress.total_objects() as u64);
                prompter.bar.set_position(progress.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        let result = RepoBuilder::new().fetch_options(fo).clone(url, path);
        prompter.bar.finish_and_clear();

        match result {
            Ok(_) => {
                debug!("cloned {url} to {:?}", path.display());
                Ok(())
            }
            Err(err) if err.code() == ErrorCode::Exists => Err(AccessError::AlreadyCloned {
                path: path.to_path_buf(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Create new branch through libgit2.
    ///
    /// Branch starts at the commit HEAD points to, and becomes the new HEAD.
    ///
    /// # Errors
    ///
    /// - Return [`AccessError::Git2`] if `working_dir` is not a repository,
    ///   HEAD cannot be resolved, or the branch already exists.
    #[instrument(skip(self, working_dir, branch_name), level = "debug")]
    fn create_branch(
        &self,
        working_dir: impl AsRef<Path>,
        branch_name: impl AsRef<str>,
    ) -> Result<()> {
        let (working_dir, branch_name) = (working_dir.as_ref(), branch_name.as_ref());
        info!("create branch {branch_name:?} in {:?}", working_dir.display());

        let repository = Repository::open(working_dir)?;
        let head = repository.head()?.peel_to_commit()?;
        repository.branch(branch_name, &head, false)?;
        repository.set_head(format!("refs/heads/{branch_name}").as_str())?;
        repository.checkout_head(Some(CheckoutBuilder::new().safe()))?;

        Ok(())
    }

    /// Commit and push everything in working tree.
    ///
    /// Stages all new, modified, and deleted files, commits them onto HEAD,
    /// pushes `branch_name` to [`ORIGIN`], and records `origin/<branch_name>`
    /// as its upstream.
    ///
    /// # Errors
    ///
    /// - Return [`AccessError::NothingToCommit`] if working tree is clean.
    /// - Return [`AccessError::Git2`] if staging, committing, or pushing
    ///   fails, including pushes rejected by the remote.
    #[instrument(skip(self, working_dir, commit_message, branch_name), level = "debug")]
    fn add_content(
        &self,
        working_dir: impl AsRef<Path>,
        commit_message: impl AsRef<str>,
        branch_name: impl AsRef<str>,
    ) -> Result<()> {
        let working_dir = working_dir.as_ref();
        let branch_name = branch_name.as_ref();
        let repository = Repository::open(working_dir)?;

        let mut index = repository.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        let tree_id = index.write_tree()?;

        let parent = repository
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        if parent
            .as_ref()
            .is_some_and(|commit| commit.tree_id() == tree_id)
        {
            return Err(AccessError::NothingToCommit {
                path: working_dir.to_path_buf(),
            });
        }

        let tree = repository.find_tree(tree_id)?;
        let signature = repository.signature()?;
        let parents = parent.iter().collect::<Vec<_>>();
        let oid = repository.commit(
            Some("HEAD"),
            &signature,
            &signature,
            commit_message.as_ref(),
            &tree,
            &parents,
        )?;
        info!("committed {oid} in {:?}", working_dir.display());

        let git_config = repository.config()?;
        let authenticator = GitAuthenticator::default();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&git_config));
        rc.push_update_reference(|refname, status| match status {
            Some(message) => Err(git2::Error::from_str(&format!(
                "push of {refname} rejected: {message}"
            ))),
            None => Ok(()),
        });

        let mut po = PushOptions::new();
        po.remote_callbacks(rc);
        let refspec = format!("refs/heads/{branch_name}:refs/heads/{branch_name}");
        repository
            .find_remote(ORIGIN)?
            .push(&[refspec.as_str()], Some(&mut po))?;
        info!("pushed {branch_name:?} to {ORIGIN}");

        // INVARIANT: Pushed branch always tracks its remote counterpart.
        let mut config = repository.config()?;
        config.set_str(&format!("branch.{branch_name}.remote"), ORIGIN)?;
        config.set_str(
            &format!("branch.{branch_name}.merge"),
            &format!("refs/heads/{branch_name}"),
        )?;

        Ok(())
    }

    /// Fork current repository through external fork tool.
    ///
    /// # Errors
    ///
    /// - Return [`AccessError::Syscall`] if fork tool cannot be spawned, or
    ///   exits with a failure status.
    #[instrument(skip(self, fork_tool), level = "debug")]
    fn create_fork(&self, fork_tool: impl AsRef<OsStr>) -> Result<()> {
        let remote_name = format!("--remote-name={ORIGIN}");
        let output = syscall_non_interactive(fork_tool, ["fork", remote_name.as_str()])?;
        if !output.is_empty() {
            info!("{output}");
        }

        Ok(())
    }
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    pub(crate) bar: ProgressBar,
}

impl IndicatifPrompter {
    /// Construct new progress bar authenticator.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| -> Option<(String, String)> {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| {
            Password::new("passphrase")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref()).args(args).output()?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(AccessError::Syscall(std::io::Error::other(format!(
            "command {:?} failed:\n{message}",
            cmd.as_ref()
        ))));
    }

    Ok(message)
}

/// Repository access error types.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// Clone destination already holds a repository, or other content.
    #[error("{:?} already exists", path.display())]
    AlreadyCloned { path: PathBuf },

    /// Working tree has no changes to commit.
    #[error("nothing to commit in {:?}", path.display())]
    NothingToCommit { path: PathBuf },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// External command fails.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = AccessError> = std::result::Result<T, E>;
