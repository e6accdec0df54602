//! Integration tests against real database containers.
//!
//! These need a working `docker`. They return early (and pass) when the
//! runtime is missing or `DOCKERTEST_SKIP` is set.
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use dockertest::{exec_retry, mongo, mysql, postgresql, Container, DockerTest, DockerTestError};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Test ports that don't conflict with locally installed servers
const MONGO_TEST_PORT: u16 = 27117;
const MYSQL_TEST_PORT: u16 = 13406;
const POSTGRES_TEST_PORT: u16 = 15532;

/// Generous readiness window: first starts may include image pulls.
const READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Initialize logging for tests
fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Unwraps a started container, or `None` when the environment can't run it.
fn started(result: Result<Container, DockerTestError>) -> Result<Option<Container>> {
    match result {
        Ok(container) => Ok(Some(container)),
        Err(e) if e.is_skip() => {
            info!("Skipping: {}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn fixture() -> Result<DockerTest> {
    init_logging();
    Ok(DockerTest::from_env()?)
}

#[tokio::test]
async fn test_mongo_container_accepts_commands() -> Result<()> {
    let fixture = fixture()?;
    let spec = mongo::mongo_spec()
        .with_host_port(MONGO_TEST_PORT)
        .with_timeout(READY_TIMEOUT);
    let Some(container) = started(fixture.start_mongo_container_with_spec(spec).await)? else {
        return Ok(());
    };

    let client = mongo::connect_mongo(&container).await?;
    client
        .database("admin")
        .run_command(mongodb::bson::doc! { "ping": 1 })
        .await
        .context("MongoDB ping failed")?;

    info!("MongoDB container {} answered ping", container.id());
    Ok(())
}

#[tokio::test]
async fn test_mysql_container_creates_database() -> Result<()> {
    let fixture = fixture()?;
    let spec = mysql::mysql_spec("dockertest_mysql")?
        .with_host_port(MYSQL_TEST_PORT)
        .with_timeout(READY_TIMEOUT);
    let Some(container) = started(
        fixture
            .start_mysql_container_with_spec("dockertest_mysql", spec)
            .await,
    )?
    else {
        return Ok(());
    };

    // The port opens before the server finishes initialising.
    let pool = mysql::mysql_pool(&container, "dockertest_mysql")?;
    exec_retry(&pool, "CREATE TABLE IF NOT EXISTS ready (id INT PRIMARY KEY)", 12)
        .await
        .context("MySQL never accepted queries")?;
    let inserted = exec_retry(&pool, "INSERT INTO ready (id) VALUES (1), (2)", 1).await?;
    assert_eq!(inserted, 2);

    pool.disconnect().await?;
    Ok(())
}

#[tokio::test]
async fn test_postgresql_container_creates_database() -> Result<()> {
    let fixture = fixture()?;
    let spec = postgresql::postgres_spec()
        .with_host_port(POSTGRES_TEST_PORT)
        .with_timeout(READY_TIMEOUT);
    let Some(container) = started(
        fixture
            .start_postgresql_container_with_spec("dockertest_pg", spec)
            .await,
    )?
    else {
        return Ok(());
    };

    let client = postgresql::connect_postgres(&container, "dockertest_pg").await?;
    let row = client
        .query_one("SELECT datcollate FROM pg_database WHERE datname = current_database()", &[])
        .await?;
    let collate: String = row.get(0);
    assert_eq!(collate, "C");

    Ok(())
}
