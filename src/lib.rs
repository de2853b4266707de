// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Batch management of the repositories that make up one project.
//!
//! A project is described by a small configuration file naming the project
//! directory, the hosting organization, and the repositories involved. From
//! that description the project directory can be created, every repository
//! cloned into it, and a branch created, committed, pushed, and forked across
//! all of them in one go.

pub mod access;
pub mod config;
pub mod log;
pub mod path;
pub mod project;

pub use access::{AccessError, Git2Access, RepoAccess};
pub use config::{ConfigError, ProjectConfig, DEFAULT_CONFIG_FILE};
pub use log::{LogSettings, LogSink};
pub use path::{with_work_dir, WorkDir};
pub use project::{create_directory, remove_dir, CloneOutcome, CloneSummary, Project};
