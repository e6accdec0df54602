//! MySQL test containers.

use crate::container::Container;
use crate::database::validate_database_name;
use crate::error::Result;
use crate::fixture::{ContainerSpec, DockerTest};
use std::time::Duration;

pub const MYSQL_IMAGE: &str = "mysql";
pub const MYSQL_PORT: u16 = 3306;
pub const MYSQL_TIMEOUT: Duration = Duration::from_secs(10);
pub const MYSQL_USERNAME: &str = "root";
pub const MYSQL_PASSWORD: &str = "root";

/// Spec for a MySQL server that creates `database` on first start.
pub fn mysql_spec(database: &str) -> Result<ContainerSpec> {
    validate_database_name(database)?;
    Ok(ContainerSpec::new(MYSQL_IMAGE, MYSQL_PORT, MYSQL_TIMEOUT)
        .with_env("MYSQL_ROOT_PASSWORD", MYSQL_PASSWORD)
        .with_env("MYSQL_DATABASE", database))
}

pub fn mysql_url(container: &Container, database: &str) -> String {
    format!(
        "mysql://{MYSQL_USERNAME}:{MYSQL_PASSWORD}@{}/{database}",
        container.addr()
    )
}

/// Gets a connection pool for `database` in the container.
pub fn mysql_pool(container: &Container, database: &str) -> Result<mysql_async::Pool> {
    let pool = mysql_async::Pool::from_url(mysql_url(container, database))
        .map_err(mysql_async::Error::from)?;
    Ok(pool)
}

impl DockerTest {
    /// Starts a MySQL server with an empty `database`.
    pub async fn start_mysql_container(&self, database: &str) -> Result<Container> {
        self.start_mysql_container_with_spec(database, mysql_spec(database)?)
            .await
    }

    pub async fn start_mysql_container_with_spec(
        &self,
        database: &str,
        spec: ContainerSpec,
    ) -> Result<Container> {
        validate_database_name(database)?;
        self.setup_container(&spec).await
    }
}
