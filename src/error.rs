//! Error types for container fixtures.

use crate::retry::RetryError;
use dockertest_netutil::ReachError;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while provisioning or tearing down a container.
#[derive(Error, Debug)]
pub enum DockerTestError {
    /// Container-backed tests are disabled by configuration.
    #[error("skipping container test for image '{0}'")]
    Skipped(String),

    /// The container runtime executable could not be found.
    #[error("'{0}' command not found")]
    RuntimeNotFound(String),

    /// The runtime is installed but its daemon does not answer.
    #[error("'{program}' is not responding: {source}")]
    RuntimeUnavailable {
        program: String,
        #[source]
        source: Box<DockerTestError>,
    },

    /// The runtime process could not be spawned.
    #[error("failed to execute `{program} {subcommand}`: {source}")]
    Spawn {
        program: String,
        subcommand: String,
        #[source]
        source: std::io::Error,
    },

    /// The runtime exited unsuccessfully.
    #[error("`{program} {subcommand}` failed ({status}): {output}")]
    CommandFailed {
        program: String,
        subcommand: String,
        status: ExitStatus,
        output: String,
    },

    /// `run` succeeded but printed no container id.
    #[error("unexpected empty output from `{0} run`")]
    EmptyContainerId(String),

    /// Database names are spliced into SQL and must be plain identifiers.
    #[error("invalid database name '{0}'")]
    InvalidDatabaseName(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The container never became reachable.
    #[error(transparent)]
    Unreachable(#[from] ReachError),

    /// The setup statement kept failing.
    #[error("could not create database {database}: {source}")]
    CreateDatabase {
        database: String,
        #[source]
        source: RetryError<tokio_postgres::Error>,
    },

    /// MySQL connection or query error.
    #[error("MySQL error: {0}")]
    MySQL(#[from] mysql_async::Error),

    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// MongoDB client error.
    #[error("MongoDB error: {0}")]
    MongoDB(#[from] mongodb::error::Error),
}

impl DockerTestError {
    /// Whether the error only means the test should not run here.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::Skipped(_) | Self::RuntimeNotFound(_) | Self::RuntimeUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DockerTestError>;
