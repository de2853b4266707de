// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use multi_repo_mgr::{
    config::{ProjectConfig, DEFAULT_CONFIG_FILE},
    log::{self, LogSettings},
    project::Project,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::exit};
use tracing::{error, info};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  multi-repo-mgr [options] [<command>]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to project configuration file.
    #[arg(
        short,
        long,
        global = true,
        value_name = "path",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    fn run(self) -> Result<()> {
        let config = ProjectConfig::load(&self.config)?;
        let project = Project::new(config);

        match self.command.unwrap_or(Command::Clone) {
            Command::Clone => run_clone(project),
            Command::Fork(opts) => run_fork(project, opts),
            Command::Commit(opts) => run_commit(project, opts),
            Command::Remove => run_remove(project),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Create project directory and clone every repository into it (default).
    #[command(override_usage = "multi-repo-mgr clone [options]")]
    Clone,

    /// Create branch in every repository, and fork each one.
    #[command(override_usage = "multi-repo-mgr fork [options]")]
    Fork(ForkOptions),

    /// Commit and push changes of every repository.
    #[command(override_usage = "multi-repo-mgr commit [options] --message <msg> --branch <branch>")]
    Commit(CommitOptions),

    /// Remove project directory and all clones in it.
    #[command(override_usage = "multi-repo-mgr remove [options]")]
    Remove,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ForkOptions {
    /// Name of branch to create before forking.
    #[arg(short, long, value_name = "branch", default_value = "ci-update")]
    pub branch: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CommitOptions {
    /// Commit message to use in every repository.
    #[arg(short, long, value_name = "msg")]
    pub message: String,

    /// Branch to push to origin.
    #[arg(short, long, value_name = "branch")]
    pub branch: String,
}

fn main() {
    let settings = LogSettings::from_env();
    if let Err(error) = log::init(&settings) {
        eprintln!("{error:?}");
        exit(1);
    }

    // INVARIANT: Fatal errors always reach the terminal, whatever the log sink.
    if let Err(error) = run() {
        error!("{error:?}");
        eprintln!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_clone(project: Project) -> Result<()> {
    project.create_directory();
    let summary = project.clone_all();
    info!("{summary}");

    Ok(())
}

fn run_fork(project: Project, opts: ForkOptions) -> Result<()> {
    project.branch_and_fork(opts.branch)?;

    Ok(())
}

fn run_commit(project: Project, opts: CommitOptions) -> Result<()> {
    project.commit_all(opts.message, opts.branch)?;

    Ok(())
}

fn run_remove(project: Project) -> Result<()> {
    project.remove()?;

    Ok(())
}
