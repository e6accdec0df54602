//! MongoDB test containers.

use crate::container::Container;
use crate::error::Result;
use crate::fixture::{ContainerSpec, DockerTest};
use std::time::Duration;

pub const MONGO_IMAGE: &str = "mongo";
pub const MONGO_PORT: u16 = 27017;
pub const MONGO_TIMEOUT: Duration = Duration::from_secs(10);

pub fn mongo_spec() -> ContainerSpec {
    ContainerSpec::new(MONGO_IMAGE, MONGO_PORT, MONGO_TIMEOUT)
}

/// `mongodb://` URI of the published port.
pub fn mongo_uri(container: &Container) -> String {
    format!("mongodb://{}", container.addr())
}

/// Creates a client for the container. Like all MongoDB clients it connects
/// lazily, on the first operation.
pub async fn connect_mongo(container: &Container) -> Result<mongodb::Client> {
    Ok(mongodb::Client::with_uri_str(mongo_uri(container)).await?)
}

impl DockerTest {
    /// Starts a MongoDB container on port 27017.
    pub async fn start_mongo_container(&self) -> Result<Container> {
        self.start_mongo_container_with_spec(mongo_spec()).await
    }

    pub async fn start_mongo_container_with_spec(&self, spec: ContainerSpec) -> Result<Container> {
        self.setup_container(&spec).await
    }
}
