//! Container setup: prerequisites, launch and readiness.

use crate::config::DockerTestConfig;
use crate::container::Container;
use crate::error::{DockerTestError, Result};
use crate::runtime::DockerCli;
use dockertest_netutil::await_reachable;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What to run and how to tell when it is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    /// Port the service listens on inside the container.
    pub container_port: u16,
    /// Host port `container_port` is published on.
    pub host_port: u16,
    /// How long to wait for the published port to accept connections.
    pub timeout: Duration,
    pub name: Option<String>,
    pub env: Vec<(String, String)>,
    /// Arguments passed to the image entrypoint.
    pub command: Vec<String>,
}

impl ContainerSpec {
    /// Publishes `port` on the same host port.
    pub fn new(image: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            image: image.into(),
            container_port: port,
            host_port: port,
            timeout,
            name: None,
            env: Vec::new(),
            command: Vec::new(),
        }
    }

    pub fn with_host_port(mut self, host_port: u16) -> Self {
        self.host_port = host_port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = args.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments following `docker run`.
    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec!["-d".to_string()];
        if let Some(name) = &self.name {
            args.push("--name".to_string());
            args.push(name.clone());
        }
        args.push("-p".to_string());
        args.push(format!("{}:{}", self.host_port, self.container_port));
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(self.image.clone());
        args.extend(self.command.iter().cloned());
        args
    }
}

/// Entry point for starting test containers.
#[derive(Debug, Clone)]
pub struct DockerTest {
    config: DockerTestConfig,
    docker: DockerCli,
}

impl DockerTest {
    pub fn new(config: DockerTestConfig) -> Self {
        let docker = DockerCli::new(config.runtime.clone());
        Self { config, docker }
    }

    /// Builds a fixture from `DOCKERTEST_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(DockerTestConfig::from_env()?))
    }

    pub fn config(&self) -> &DockerTestConfig {
        &self.config
    }

    pub fn docker(&self) -> &DockerCli {
        &self.docker
    }

    /// Checks that a container for `image` can be started, pulling the
    /// image if it is not present locally.
    ///
    /// Image lookup and pull failures are only logged: `docker run` reports
    /// a genuinely missing image on its own.
    pub fn check_prerequisites(&self, image: &str) -> Result<()> {
        if self.config.skip {
            info!("Skipping container test for {}", image);
            return Err(DockerTestError::Skipped(image.to_string()));
        }
        if !self.docker.is_available() {
            return Err(DockerTestError::RuntimeNotFound(
                self.docker.program().to_string(),
            ));
        }
        if let Err(e) = self.docker.ping() {
            return Err(DockerTestError::RuntimeUnavailable {
                program: self.docker.program().to_string(),
                source: Box::new(e),
            });
        }

        match self.docker.has_image(image) {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => warn!("Error running {} to check for {}: {}", self.docker.program(), image, e),
        }

        if self.config.no_pull {
            debug!("Image {} not found locally, pulling disabled", image);
            return Ok(());
        }
        if let Err(e) = self.docker.pull(image) {
            warn!("Error pulling {}: {}", image, e);
        }
        Ok(())
    }

    /// Starts a container from `spec` and waits until its published port
    /// accepts TCP connections.
    ///
    /// A container that never becomes reachable is killed and removed
    /// before the error is returned.
    pub async fn setup_container(&self, spec: &ContainerSpec) -> Result<Container> {
        self.check_prerequisites(&spec.image)?;

        info!("Starting container from image {}", spec.image);
        let id = self.docker.run(&spec.run_args())?;
        info!("Started container: {}", id);

        let mut container = Container::new(self.docker.clone(), id, spec.host_port);
        let addr = container.addr();
        info!("Waiting for {} to be reachable...", addr);

        if let Err(e) = await_reachable(&addr, spec.timeout).await {
            warn!("Container {} setup failed: {}", container.id(), e);
            match self.docker.logs(container.id()) {
                Ok(logs) => debug!("Container {} logs:\n{}", container.id(), logs),
                Err(log_err) => debug!("Could not read container logs: {}", log_err),
            }
            container.kill_remove();
            return Err(e.into());
        }

        info!("Container {} is reachable at {}", container.id(), addr);
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(runtime: &str, skip: bool, no_pull: bool) -> DockerTest {
        DockerTest::new(DockerTestConfig {
            runtime: runtime.to_string(),
            skip,
            no_pull,
        })
    }

    #[test]
    fn test_run_args_layout() {
        let spec = ContainerSpec::new("mysql", 3306, Duration::from_secs(10))
            .with_host_port(13306)
            .with_name("dockertest-mysql")
            .with_env("MYSQL_ROOT_PASSWORD", "root")
            .with_env("MYSQL_DATABASE", "app")
            .with_command(["--sql-mode="]);

        assert_eq!(
            spec.run_args(),
            vec![
                "-d",
                "--name",
                "dockertest-mysql",
                "-p",
                "13306:3306",
                "-e",
                "MYSQL_ROOT_PASSWORD=root",
                "-e",
                "MYSQL_DATABASE=app",
                "mysql",
                "--sql-mode=",
            ]
        );
    }

    #[test]
    fn test_default_publishes_same_port() {
        let spec = ContainerSpec::new("mongo", 27017, Duration::from_secs(10));
        assert_eq!(spec.run_args(), vec!["-d", "-p", "27017:27017", "mongo"]);
    }

    #[test]
    fn test_skip_wins_over_everything() {
        let err = fixture("dockertest-no-such-runtime", true, false)
            .check_prerequisites("mongo")
            .unwrap_err();
        assert!(matches!(err, DockerTestError::Skipped(ref image) if image == "mongo"));
        assert!(err.is_skip());
    }

    #[test]
    fn test_missing_runtime() {
        let err = fixture("dockertest-no-such-runtime", false, false)
            .check_prerequisites("mongo")
            .unwrap_err();
        assert!(matches!(err, DockerTestError::RuntimeNotFound(_)));
        assert_eq!(err.to_string(), "'dockertest-no-such-runtime' command not found");
    }

    #[cfg(unix)]
    #[test]
    fn test_unresponsive_runtime_is_a_skip() {
        let err = fixture("false", false, false)
            .check_prerequisites("postgres")
            .unwrap_err();
        assert!(matches!(err, DockerTestError::RuntimeUnavailable { .. }));
        assert!(err.is_skip());
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_image_is_pulled() {
        // `true` answers every subcommand with empty output, so the image
        // is never listed and gets pulled.
        fixture("true", false, false)
            .check_prerequisites("postgres")
            .unwrap();
        fixture("true", false, true)
            .check_prerequisites("postgres")
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_setup_waits_for_published_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let spec = ContainerSpec::new("mongo", 27017, Duration::from_secs(5)).with_host_port(port);

        // `echo` prints the run arguments, which become the container id.
        let container = fixture("echo", false, true)
            .setup_container(&spec)
            .await
            .unwrap();

        assert_eq!(container.addr(), format!("127.0.0.1:{port}"));
        assert_eq!(
            container.id().as_str(),
            format!("run -d -p {port}:27017 mongo")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_setup_fails_when_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let spec = ContainerSpec::new("mongo", 27017, Duration::from_millis(250)).with_host_port(port);

        let err = fixture("echo", false, true)
            .setup_container(&spec)
            .await
            .unwrap_err();

        assert!(matches!(err, DockerTestError::Unreachable(_)));
        assert!(!err.is_skip());
    }
}
