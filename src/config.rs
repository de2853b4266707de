// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project configuration layout.
//!
//! A __project__ is a named collection of related repositories that are
//! managed together under one local directory. The project is described by a
//! small declarative file, `config.yml` by default, that names the project
//! directory, the hosting organization, and the repositories to operate on:
//!
//! ```yaml
//! project_name: proj
//! github_org: org
//! repos:
//!   - a
//!   - b
//! ```
//!
//! YAML is the default format. Files ending in `.toml` are read as TOML with
//! the same keys. The configuration is read once at start up and never
//! written back.

use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Well-known configuration file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Hosting service used to build remote URLs when none is configured.
pub const DEFAULT_HOST: &str = "github.com";

/// External command used to create forks when none is configured.
pub const DEFAULT_FORK_TOOL: &str = "hub";

/// Project configuration.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Name of project directory that all repositories are cloned into.
    pub project_name: String,

    /// Organization on the hosting service that owns every repository.
    pub github_org: String,

    /// Repositories to operate on, in the order they are processed.
    pub repos: Vec<String>,

    /// Host of the hosting service.
    #[serde(default = "default_host")]
    pub host: String,

    /// Command that knows how to fork the current repository.
    #[serde(default = "default_fork_tool")]
    pub fork_tool: String,
}

impl ProjectConfig {
    /// Load configuration from file at `path`.
    ///
    /// The format is picked from the file extension: `.toml` is read as TOML,
    /// everything else as YAML.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file cannot be read.
    /// - Return [`ConfigError::Yaml`] or [`ConfigError::Toml`] if the file
    ///   does not describe a valid project.
    /// - Return [`ConfigError::ShellExpansion`] if the project name refers to
    ///   an undefined variable.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("load project configuration from {:?}", path.display());
        let data = read_to_string(path).map_err(|err| ConfigError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;

        match ConfigFormat::from_path(path) {
            ConfigFormat::Yaml => Self::from_yaml(&data),
            ConfigFormat::Toml => Self::from_toml(&data),
        }
    }

    /// Parse configuration from YAML document.
    pub fn from_yaml(data: &str) -> Result<Self> {
        serde_yaml::from_str::<Self>(data)?.expand()
    }

    /// Parse configuration from TOML document.
    pub fn from_toml(data: &str) -> Result<Self> {
        toml::de::from_str::<Self>(data)?.expand()
    }

    /// Path of the project directory.
    pub fn project_dir(&self) -> &Path {
        Path::new(&self.project_name)
    }

    /// Destination of a repository clone, i.e., `<project_name>/<repo>`.
    pub fn clone_path(&self, repo: impl AsRef<str>) -> PathBuf {
        self.project_dir().join(repo.as_ref())
    }

    /// SSH address of a repository on the hosting service.
    pub fn remote_url(&self, repo: impl AsRef<str>) -> String {
        format!("git@{}:{}/{}.git", self.host, self.github_org, repo.as_ref())
    }

    fn expand(mut self) -> Result<Self> {
        // INVARIANT: Project directory is always shell expanded.
        self.project_name = shellexpand::full(&self.project_name)?.into_owned();
        Ok(self)
    }
}

impl FromStr for ProjectConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        Self::from_yaml(data)
    }
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

fn default_fork_tool() -> String {
    DEFAULT_FORK_TOOL.into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file cannot be read.
    #[error("failed to read configuration file {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize YAML configuration.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Failed to deserialize TOML configuration.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::fs::write;

    fn proj() -> ProjectConfig {
        ProjectConfig {
            project_name: "proj".into(),
            github_org: "org".into(),
            repos: vec!["a".into(), "b".into()],
            host: DEFAULT_HOST.into(),
            fork_tool: DEFAULT_FORK_TOOL.into(),
        }
    }

    #[test]
    fn deserialize_yaml_config() -> anyhow::Result<()> {
        let result: ProjectConfig = indoc! {r#"
            project_name: proj
            github_org: org
            repos:
              - a
              - b
        "#}
        .parse()?;

        assert_eq!(result, proj());

        Ok(())
    }

    #[test]
    fn deserialize_toml_config() -> anyhow::Result<()> {
        let result = ProjectConfig::from_toml(indoc! {r#"
            project_name = "proj"
            github_org = "org"
            repos = ["a", "b"]
            host = "git.example.org"
            fork_tool = "gh"
        "#})?;

        let mut expect = proj();
        expect.host = "git.example.org".into();
        expect.fork_tool = "gh".into();
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn missing_key_is_an_error() {
        let result = ProjectConfig::from_yaml(indoc! {r#"
            project_name: proj
            repos: [a, b]
        "#});
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }

    #[sealed_test(env = [("PROJ_ROOT", "/tmp/work")])]
    fn project_name_is_shell_expanded() -> anyhow::Result<()> {
        let result = ProjectConfig::from_yaml(indoc! {r#"
            project_name: $PROJ_ROOT/proj
            github_org: org
            repos: []
        "#})?;
        assert_eq!(result.project_dir(), Path::new("/tmp/work/proj"));

        Ok(())
    }

    #[test]
    fn derive_clone_path_and_remote_url() {
        let config = proj();
        assert_eq!(config.clone_path("a"), PathBuf::from("proj/a"));
        assert_eq!(config.remote_url("a"), "git@github.com:org/a.git");
        assert_eq!(config.remote_url("b"), "git@github.com:org/b.git");
    }

    #[sealed_test]
    fn load_picks_format_from_extension() -> anyhow::Result<()> {
        write("config.yml", "project_name: proj\ngithub_org: org\nrepos: [a, b]\n")?;
        write("config.toml", "project_name = \"proj\"\ngithub_org = \"org\"\nrepos = [\"a\", \"b\"]\n")?;

        assert_eq!(ProjectConfig::load(DEFAULT_CONFIG_FILE)?, proj());
        assert_eq!(ProjectConfig::load("config.toml")?, proj());

        Ok(())
    }

    #[sealed_test]
    fn load_missing_file_is_an_error() {
        let result = ProjectConfig::load(DEFAULT_CONFIG_FILE);
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
