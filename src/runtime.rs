//! Thin wrapper around the `docker` command line.

use crate::container::ContainerId;
use crate::error::{DockerTestError, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

/// Runtime executable used when none is configured.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Handle on the container runtime executable.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME)
    }
}

impl DockerCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns whether the runtime executable can be found.
    pub fn is_available(&self) -> bool {
        find_executable(&self.program).is_some()
    }

    /// Checks that the runtime's daemon answers.
    pub fn ping(&self) -> Result<()> {
        self.exec("info", &["--format", "{{.ServerVersion}}"]).map(drop)
    }

    /// Returns whether `name` appears in the local image list.
    pub fn has_image(&self, name: &str) -> Result<bool> {
        let output = self.exec("images", &["--no-trunc"])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.contains(name))
    }

    /// Retrieves an image with `docker pull`.
    pub fn pull(&self, image: &str) -> Result<()> {
        info!("Pulling image {} ...", image);
        let output = self.spawn("pull", &[image])?;
        if !output.status.success() {
            return Err(self.failure("pull", &output, true));
        }
        Ok(())
    }

    /// Runs `docker run <args>` and returns the id printed on stdout.
    pub fn run(&self, args: &[String]) -> Result<ContainerId> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.exec("run", &args)?;

        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if container_id.is_empty() {
            return Err(DockerTestError::EmptyContainerId(self.program.clone()));
        }
        debug!("`{} run` returned container {}", self.program, container_id);
        Ok(ContainerId::new(container_id))
    }

    pub fn kill(&self, id: &ContainerId) -> Result<()> {
        self.exec("kill", &[id.as_str()]).map(drop)
    }

    pub fn remove(&self, id: &ContainerId) -> Result<()> {
        self.exec("rm", &[id.as_str()]).map(drop)
    }

    /// Gets the combined logs of a container.
    pub fn logs(&self, id: &ContainerId) -> Result<String> {
        let output = self.spawn("logs", &[id.as_str()])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        Ok(format!("STDOUT:\n{stdout}\n\nSTDERR:\n{stderr}"))
    }

    fn spawn(&self, subcommand: &str, args: &[&str]) -> Result<Output> {
        Command::new(&self.program)
            .arg(subcommand)
            .args(args)
            .output()
            .map_err(|source| DockerTestError::Spawn {
                program: self.program.clone(),
                subcommand: subcommand.to_string(),
                source,
            })
    }

    /// Like `spawn`, but a non-zero exit status is an error carrying stderr.
    fn exec(&self, subcommand: &str, args: &[&str]) -> Result<Output> {
        let output = self.spawn(subcommand, args)?;
        if !output.status.success() {
            return Err(self.failure(subcommand, &output, false));
        }
        Ok(output)
    }

    fn failure(&self, subcommand: &str, output: &Output, with_stdout: bool) -> DockerTestError {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let output_text = if with_stdout {
            let stdout = String::from_utf8_lossy(&output.stdout);
            format!("{}{}", stdout, stderr)
        } else {
            stderr.into_owned()
        };

        DockerTestError::CommandFailed {
            program: self.program.clone(),
            subcommand: subcommand.to_string(),
            status: output.status,
            output: output_text.trim().to_string(),
        }
    }
}

/// Resolves `program` the way a shell would: explicit paths are checked
/// directly, bare names are searched for in `PATH`.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    // `echo`, `true` and `false` stand in for the runtime: they accept any
    // arguments and exercise the output and exit-status handling.

    #[test]
    fn test_is_available() {
        assert!(DockerCli::new("sh").is_available());
        assert!(DockerCli::new("/bin/sh").is_available());
        assert!(!DockerCli::new("dockertest-no-such-runtime").is_available());
        assert!(!DockerCli::new("/nonexistent/docker").is_available());
    }

    #[test]
    fn test_run_returns_trimmed_stdout() {
        let docker = DockerCli::new("echo");
        let id = docker
            .run(&["-d".to_string(), "mongo".to_string()])
            .unwrap();
        assert_eq!(id.as_str(), "run -d mongo");
    }

    #[test]
    fn test_run_with_empty_output_is_an_error() {
        let err = DockerCli::new("true").run(&[]).unwrap_err();
        assert!(matches!(err, DockerTestError::EmptyContainerId(_)));
        assert_eq!(err.to_string(), "unexpected empty output from `true run`");
    }

    #[test]
    fn test_failed_command_reports_status() {
        let docker = DockerCli::new("false");
        let err = docker.run(&["mysql".to_string()]).unwrap_err();
        match err {
            DockerTestError::CommandFailed {
                program,
                subcommand,
                status,
                ..
            } => {
                assert_eq!(program, "false");
                assert_eq!(subcommand, "run");
                assert!(!status.success());
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(docker.pull("mysql").is_err());
        assert!(docker.kill(&ContainerId::new("abc")).is_err());
        assert!(docker.remove(&ContainerId::new("abc")).is_err());
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let err = DockerCli::new("dockertest-no-such-runtime")
            .has_image("mongo")
            .unwrap_err();
        assert!(matches!(err, DockerTestError::Spawn { .. }));
    }

    #[test]
    fn test_has_image_searches_listing() {
        let docker = DockerCli::new("echo");
        // echo prints its arguments: "images --no-trunc"
        assert!(docker.has_image("no-trunc").unwrap());
        assert!(!docker.has_image("postgres").unwrap());
    }

    #[test]
    fn test_ping_follows_exit_status() {
        tokio_test::assert_ok!(DockerCli::new("true").ping());
        tokio_test::assert_err!(DockerCli::new("false").ping());
    }

    #[test]
    fn test_logs_include_both_streams() {
        let logs = DockerCli::new("echo")
            .logs(&ContainerId::new("c0ffee"))
            .unwrap();
        assert!(logs.starts_with("STDOUT:\nlogs c0ffee"));
        assert!(logs.contains("STDERR:"));
    }
}
