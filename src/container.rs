//! Handles on running containers.

use crate::error::Result;
use crate::runtime::DockerCli;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Published ports are bound on the loopback interface.
pub const CONTAINER_IP: &str = "127.0.0.1";

/// Identifier printed by `docker run`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// IP address the container's published ports are reachable on.
    pub fn ip(&self) -> &'static str {
        CONTAINER_IP
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A running container that is killed and removed when dropped.
#[derive(Debug)]
pub struct Container {
    docker: DockerCli,
    id: ContainerId,
    host_port: u16,
    armed: bool,
}

impl Container {
    pub(crate) fn new(docker: DockerCli, id: ContainerId, host_port: u16) -> Self {
        Self {
            docker,
            id,
            host_port,
            armed: true,
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn ip(&self) -> &'static str {
        self.id.ip()
    }

    /// Host port the service port is published on.
    pub fn port(&self) -> u16 {
        self.host_port
    }

    /// `ip:port` of the published service.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip(), self.host_port)
    }

    pub fn kill(&self) -> Result<()> {
        self.docker.kill(&self.id)
    }

    pub fn remove(&self) -> Result<()> {
        self.docker.remove(&self.id)
    }

    /// Kills the container, then removes it if the kill succeeded.
    /// Failures are logged, not returned.
    pub fn kill_remove(&mut self) {
        self.armed = false;
        if let Err(e) = self.kill() {
            warn!("Failed to kill container {}: {}", self.id, e);
            return;
        }
        if let Err(e) = self.remove() {
            warn!("Failed to remove container {}: {}", self.id, e);
            return;
        }
        info!("Container {} killed and removed", self.id);
    }

    /// Disarms the drop cleanup and hands back the id.
    pub fn persist(mut self) -> ContainerId {
        self.armed = false;
        self.id.clone()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.armed {
            self.kill_remove();
        }
    }
}
