// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Logging setup.
//!
//! There is exactly one logging sink for the lifetime of the process. Its
//! target and verbosity come from the environment:
//!
//! - `LOG_LEVEL` selects verbosity by name: `critical`, `error`, `warning`,
//!   `info`, or `debug`. Names are case-insensitive. Unset or unknown names
//!   select the most verbose level.
//! - `AWS_EXECUTION_ENV` marks a serverless execution environment. When it is
//!   set, log lines go to standard output. Otherwise they are appended to
//!   `multi-repo-mgr.log` in the current working directory.
//!
//! Nothing is configured at load time. The binary builds [`LogSettings`] and
//! hands them to [`init`] before doing anything else.

use std::{env, fs::OpenOptions, path::PathBuf, sync::Mutex};
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter};

/// Environment variable selecting log verbosity.
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

/// Environment variable that marks a serverless execution environment.
pub const SERVERLESS_VAR: &str = "AWS_EXECUTION_ENV";

/// Log file written to when not running serverless.
pub const LOG_FILE_NAME: &str = "multi-repo-mgr.log";

/// Verbosity used for unset or unrecognized level names.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::DEBUG;

/// Map textual level name to a severity filter.
pub fn level_from_name(name: &str) -> LevelFilter {
    match name.to_lowercase().as_str() {
        "critical" | "error" => LevelFilter::ERROR,
        "warning" => LevelFilter::WARN,
        "info" => LevelFilter::INFO,
        "debug" => LevelFilter::DEBUG,
        _ => DEFAULT_LEVEL,
    }
}

/// Destination of log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Append to file.
    File(PathBuf),

    /// Write to standard output.
    Stdout,
}

/// Process-wide logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Least severe level that still gets written.
    pub level: LevelFilter,

    /// Where log lines are written to.
    pub sink: LogSink,
}

impl LogSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let level = env::var(LOG_LEVEL_VAR).ok();
        let serverless = env::var_os(SERVERLESS_VAR).is_some_and(|value| !value.is_empty());
        Self::from_vars(level.as_deref(), serverless)
    }

    /// Build settings from raw level name and serverless marker.
    pub fn from_vars(level: Option<&str>, serverless: bool) -> Self {
        let level = level.map_or(DEFAULT_LEVEL, level_from_name);
        let sink = if serverless {
            LogSink::Stdout
        } else {
            LogSink::File(PathBuf::from(LOG_FILE_NAME))
        };

        Self { level, sink }
    }
}

/// Build subscriber that writes lines at or above `level` into `writer`.
///
/// Lines carry a UTC timestamp, their level, and the target that emitted
/// them.
pub fn subscriber<W>(
    level: LevelFilter,
    writer: W,
    ansi: bool,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy("");
    tracing_subscriber::registry().with(filter).with(layer)
}

/// Install the process-wide subscriber.
///
/// # Errors
///
/// - Return [`LogError::OpenLogFile`] if log file cannot be opened.
/// - Return [`LogError::Init`] if a global subscriber was already installed.
pub fn init(settings: &LogSettings) -> Result<()> {
    match &settings.sink {
        LogSink::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| LogError::OpenLogFile {
                    source: err,
                    path: path.clone(),
                })?;
            subscriber(settings.level, Mutex::new(file), false).try_init()?;
        }
        LogSink::Stdout => {
            subscriber(settings.level, std::io::stdout, false).try_init()?;
        }
    }

    Ok(())
}

/// Logging setup error types.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// Log file cannot be opened for appending.
    #[error("failed to open log file {:?}", path.display())]
    OpenLogFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Global subscriber cannot be installed.
    #[error(transparent)]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

type Result<T, E = LogError> = std::result::Result<T, E>;
