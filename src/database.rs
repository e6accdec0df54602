//! Supported database flavours.

use crate::container::Container;
use crate::error::{DockerTestError, Result};
use crate::fixture::{ContainerSpec, DockerTest};
use crate::{mongo, mysql, postgresql};
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// PostgreSQL truncates identifiers beyond this length.
const MAX_DATABASE_NAME_LEN: usize = 63;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    #[value(name = "mongodb")]
    MongoDB,
    #[value(name = "mysql")]
    MySQL,
    #[value(name = "postgresql")]
    PostgreSQL,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MongoDB => "mongodb",
            Self::MySQL => "mysql",
            Self::PostgreSQL => "postgresql",
        }
    }

    /// Default container spec. `database` is ignored for MongoDB.
    pub fn default_spec(&self, database: &str) -> Result<ContainerSpec> {
        match self {
            Self::MongoDB => Ok(mongo::mongo_spec()),
            Self::MySQL => mysql::mysql_spec(database),
            Self::PostgreSQL => Ok(postgresql::postgres_spec()),
        }
    }

    /// Client connection string for a container started from this kind.
    pub fn connection_string(&self, container: &Container, database: &str) -> String {
        match self {
            Self::MongoDB => mongo::mongo_uri(container),
            Self::MySQL => mysql::mysql_url(container, database),
            Self::PostgreSQL => postgresql::postgres_url(container, database),
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DockerTest {
    /// Starts a database of the given kind from a (possibly customised) spec.
    pub async fn start_database(
        &self,
        kind: DatabaseKind,
        database: &str,
        spec: ContainerSpec,
    ) -> Result<Container> {
        match kind {
            DatabaseKind::MongoDB => self.start_mongo_container_with_spec(spec).await,
            DatabaseKind::MySQL => self.start_mysql_container_with_spec(database, spec).await,
            DatabaseKind::PostgreSQL => {
                self.start_postgresql_container_with_spec(database, spec)
                    .await
            }
        }
    }
}

/// Accepts plain identifiers only: ASCII letters, digits and `_`, not
/// starting with a digit.
pub fn validate_database_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && name.len() <= MAX_DATABASE_NAME_LEN
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DockerTestError::InvalidDatabaseName(name.to_string()))
    }
}
