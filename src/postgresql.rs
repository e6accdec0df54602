//! PostgreSQL test containers.
//!
//! The image only creates the `postgres` database, so after the server is
//! reachable the requested database is created through [`exec_retry`]: the
//! server restarts once during first-time initialisation and refuses
//! queries for a while after the port opens.

use crate::container::Container;
use crate::database::validate_database_name;
use crate::error::{DockerTestError, Result};
use crate::fixture::{ContainerSpec, DockerTest};
use crate::retry::exec_retry;
use std::time::Duration;
use tracing::info;

pub const POSTGRES_IMAGE: &str = "postgres";
pub const POSTGRES_PORT: u16 = 5432;
pub const POSTGRES_TIMEOUT: Duration = Duration::from_secs(15);
pub const POSTGRES_USERNAME: &str = "docker";
pub const POSTGRES_PASSWORD: &str = "docker";

/// Attempts at creating the test database.
pub const CREATE_DATABASE_TRIES: u32 = 50;

pub fn postgres_spec() -> ContainerSpec {
    ContainerSpec::new(POSTGRES_IMAGE, POSTGRES_PORT, POSTGRES_TIMEOUT)
        .with_env("POSTGRES_USER", POSTGRES_USERNAME)
        .with_env("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
}

pub fn postgres_url(container: &Container, database: &str) -> String {
    format!(
        "postgresql://{POSTGRES_USERNAME}:{POSTGRES_PASSWORD}@{}/{database}?sslmode=disable",
        container.addr()
    )
}

/// Connection config for `database` in the container.
pub fn postgres_config(container: &Container, database: &str) -> tokio_postgres::Config {
    let mut config = tokio_postgres::Config::new();
    config
        .host(container.ip())
        .port(container.port())
        .user(POSTGRES_USERNAME)
        .password(POSTGRES_PASSWORD)
        .dbname(database)
        .ssl_mode(tokio_postgres::config::SslMode::Disable);
    config
}

/// Connects to `database`, driving the connection on a background task.
pub async fn connect_postgres(
    container: &Container,
    database: &str,
) -> Result<tokio_postgres::Client> {
    let (client, connection) = postgres_config(container, database)
        .connect(tokio_postgres::NoTls)
        .await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::debug!("PostgreSQL connection error: {}", e);
        }
    });
    Ok(client)
}

pub fn create_database_statement(database: &str) -> String {
    format!("CREATE DATABASE {database} LC_COLLATE = 'C' TEMPLATE = template0")
}

impl DockerTest {
    /// Starts a PostgreSQL server and creates `database` in it.
    pub async fn start_postgresql_container(&self, database: &str) -> Result<Container> {
        self.start_postgresql_container_with_spec(database, postgres_spec())
            .await
    }

    pub async fn start_postgresql_container_with_spec(
        &self,
        database: &str,
        spec: ContainerSpec,
    ) -> Result<Container> {
        validate_database_name(database)?;
        let mut container = self.setup_container(&spec).await?;

        let root = postgres_config(&container, "postgres");
        let stmt = create_database_statement(database);
        if let Err(source) = exec_retry(&root, &stmt, CREATE_DATABASE_TRIES).await {
            container.kill_remove();
            return Err(DockerTestError::CreateDatabase {
                database: database.to_string(),
                source,
            });
        }

        info!("Created database {} in container {}", database, container.id());
        Ok(container)
    }
}
