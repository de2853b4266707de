// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{set_identity, MirrorAccess, RepoFixture};

use anyhow::Result;
use assert_cmd::cargo::cargo_bin_cmd;
use git2::Repository;
use indoc::formatdoc;
use multi_repo_mgr::{
    access::AccessError,
    config::{ProjectConfig, DEFAULT_CONFIG_FILE},
    project::{CloneOutcome, Project, ProjectError},
};
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    env::current_dir,
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

fn publish_remotes(org: &str, repos: &[&str]) -> Result<PathBuf> {
    let root = current_dir()?.join("remotes");
    for repo in repos {
        let seed = RepoFixture::new(format!("seed/{repo}"))?;
        seed.stage_and_commit("README.md", format!("# {repo}\n"))?;
        seed.publish(root.join(org).join(format!("{repo}.git")))?;
    }

    Ok(root)
}

fn write_config(fork_tool: &str) -> Result<ProjectConfig> {
    write(
        DEFAULT_CONFIG_FILE,
        formatdoc! {r#"
            project_name: proj
            github_org: org
            fork_tool: "{fork_tool}"
            repos:
              - a
              - b
        "#,
            fork_tool = fork_tool,
        },
    )?;

    Ok(ProjectConfig::load(DEFAULT_CONFIG_FILE)?)
}

fn head_of(path: impl AsRef<Path>) -> Result<git2::Oid> {
    let repository = Repository::open(path)?;
    let oid = repository.head()?.peel_to_commit()?.id();
    Ok(oid)
}

#[sealed_test]
fn clone_project_from_scratch() -> Result<()> {
    let root = publish_remotes("org", &["a", "b"])?;
    let project = Project::with_access(write_config("true")?, MirrorAccess::new(root));

    assert!(project.create_directory());
    let summary = project.clone_all();

    assert_eq!(summary.cloned(), 2);
    assert_eq!(summary.failed(), 0);
    for repo in ["a", "b"] {
        let clone = Path::new("proj").join(repo);
        assert!(Repository::open(&clone).is_ok());
        assert_eq!(read_to_string(clone.join("README.md"))?, format!("# {repo}\n"));
    }

    Ok(())
}

#[sealed_test]
fn reclone_leaves_existing_clones_alone() -> Result<()> {
    let root = publish_remotes("org", &["a", "b"])?;
    let project = Project::with_access(write_config("true")?, MirrorAccess::new(root));
    assert!(project.create_directory());
    project.clone_all();
    let before = head_of("proj/a")?;

    assert!(!project.create_directory());
    let summary = project.clone_all();

    let outcomes = summary.iter().map(|(_, outcome)| outcome.clone()).collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        vec![CloneOutcome::AlreadyCloned, CloneOutcome::AlreadyCloned]
    );
    assert_eq!(head_of("proj/a")?, before);
    assert_eq!(read_to_string("proj/a/README.md")?, "# a\n");

    Ok(())
}

#[sealed_test]
fn clone_reports_missing_remote() -> Result<()> {
    let root = publish_remotes("org", &["a"])?;
    let project = Project::with_access(write_config("true")?, MirrorAccess::new(root));
    assert!(project.create_directory());

    let summary = project.clone_all();

    let outcomes = summary.iter().collect::<Vec<_>>();
    assert_eq!(outcomes[0], ("a", &CloneOutcome::Cloned));
    assert!(matches!(outcomes[1], ("b", CloneOutcome::Failed(_))));

    Ok(())
}

#[sealed_test]
fn branch_fork_and_commit_across_project() -> Result<()> {
    let root = publish_remotes("org", &["a", "b"])?;
    let project = Project::with_access(write_config("true")?, MirrorAccess::new(root.clone()));
    assert!(project.create_directory());
    project.clone_all();
    let start = current_dir()?;

    project.branch_and_fork("ci-update")?;
    assert_eq!(current_dir()?, start);

    for repo in ["a", "b"] {
        let clone = Path::new("proj").join(repo);
        let repository = Repository::open(&clone)?;
        assert_eq!(repository.head()?.shorthand(), Some("ci-update"));
        set_identity(&repository)?;
        write(clone.join("ci.yml"), "on: push\n")?;
    }

    project.commit_all("chore: add ci", "ci-update")?;

    for repo in ["a", "b"] {
        let remote = Repository::open(root.join("org").join(format!("{repo}.git")))?;
        let pushed = remote
            .find_reference("refs/heads/ci-update")?
            .peel_to_commit()?;
        assert_eq!(pushed.message(), Some("chore: add ci"));
        assert_eq!(pushed.id(), head_of(Path::new("proj").join(repo))?);

        let config = Repository::open(Path::new("proj").join(repo))?.config()?;
        assert_eq!(config.get_string("branch.ci-update.remote")?, "origin");
        assert_eq!(
            config.get_string("branch.ci-update.merge")?,
            "refs/heads/ci-update"
        );
    }

    Ok(())
}

#[sealed_test]
fn failing_fork_tool_aborts_workflow() -> Result<()> {
    let root = publish_remotes("org", &["a", "b"])?;
    let project = Project::with_access(write_config("false")?, MirrorAccess::new(root));
    assert!(project.create_directory());
    project.clone_all();
    let start = current_dir()?;

    let result = project.branch_and_fork("ci-update");

    assert!(matches!(
        result,
        Err(ProjectError::Access(AccessError::Syscall(_)))
    ));
    assert_eq!(current_dir()?, start);
    let untouched = Repository::open("proj/b")?;
    assert_eq!(untouched.head()?.shorthand(), Some("main"));

    Ok(())
}

#[sealed_test]
fn commit_on_clean_clones_fails() -> Result<()> {
    let root = publish_remotes("org", &["a", "b"])?;
    let project = Project::with_access(write_config("true")?, MirrorAccess::new(root));
    assert!(project.create_directory());
    project.clone_all();

    let result = project.commit_all("chore: nothing", "main");

    assert!(matches!(
        result,
        Err(ProjectError::Access(AccessError::NothingToCommit { .. }))
    ));

    Ok(())
}

#[sealed_test]
fn remove_project_after_clone() -> Result<()> {
    let root = publish_remotes("org", &["a", "b"])?;
    let project = Project::with_access(write_config("true")?, MirrorAccess::new(root));
    assert!(project.create_directory());
    project.clone_all();

    project.remove()?;

    assert!(!Path::new("proj").exists());

    Ok(())
}

#[sealed_test]
fn missing_config_fails_loudly() {
    let mut cmd = cargo_bin_cmd!("multi-repo-mgr");

    cmd.env_remove("AWS_EXECUTION_ENV")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config.yml"));

    assert!(!Path::new("proj").exists());
}

#[sealed_test]
fn malformed_config_fails_loudly() -> Result<()> {
    write(DEFAULT_CONFIG_FILE, "project_name: proj\n")?;
    let mut cmd = cargo_bin_cmd!("multi-repo-mgr");

    cmd.env_remove("AWS_EXECUTION_ENV")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty().not());

    Ok(())
}
