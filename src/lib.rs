//! Ephemeral database containers for integration tests.
//!
//! Starts MongoDB, MySQL or PostgreSQL through the `docker` command line,
//! waits until the published port accepts connections and removes the
//! container again when the returned [`Container`] is dropped.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dockertest::DockerTest;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fixture = DockerTest::from_env()?;
//! let container = match fixture.start_postgresql_container("app_test").await {
//!     Ok(container) => container,
//!     // DOCKERTEST_SKIP is set or docker is not installed
//!     Err(e) if e.is_skip() => return Ok(()),
//!     Err(e) => return Err(e.into()),
//! };
//! let client = dockertest::postgresql::connect_postgres(&container, "app_test").await?;
//! client.simple_query("SELECT 1").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `DOCKERTEST_RUNTIME`: runtime executable (default `docker`)
//! - `DOCKERTEST_SKIP`: skip container-backed tests
//! - `DOCKERTEST_NO_PULL`: never pull missing images

pub mod config;
pub mod container;
pub mod database;
pub mod error;
pub mod fixture;
pub mod mongo;
pub mod mysql;
pub mod postgresql;
pub mod retry;
pub mod runtime;

pub use config::DockerTestConfig;
pub use container::{Container, ContainerId};
pub use database::DatabaseKind;
pub use dockertest_netutil::{await_reachable, ReachError};
pub use error::{DockerTestError, Result};
pub use fixture::{ContainerSpec, DockerTest};
pub use retry::{exec_retry, retry_with_backoff, RetryError, SqlExecutor};
pub use runtime::DockerCli;
