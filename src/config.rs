//! Fixture configuration.
//!
//! The same options drive the `dockertest` binary (as flattened CLI flags)
//! and library callers (through [`DockerTestConfig::from_env`]), so a test
//! suite can be steered entirely from the environment.

pub mod duration;

use crate::error::{DockerTestError, Result};
use crate::runtime::DEFAULT_RUNTIME;
use clap::builder::FalseyValueParser;
use clap::Parser;

#[derive(Parser, Clone, Debug, PartialEq, Eq)]
pub struct DockerTestConfig {
    /// Container runtime executable (name on PATH or explicit path)
    #[arg(long, default_value = DEFAULT_RUNTIME, env = "DOCKERTEST_RUNTIME")]
    pub runtime: String,

    /// Skip container-backed tests instead of starting containers
    #[arg(long, env = "DOCKERTEST_SKIP", value_parser = FalseyValueParser::new())]
    pub skip: bool,

    /// Never pull images that are missing locally
    #[arg(long, env = "DOCKERTEST_NO_PULL", value_parser = FalseyValueParser::new())]
    pub no_pull: bool,
}

impl DockerTestConfig {
    /// Reads the configuration from `DOCKERTEST_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::try_parse_from(["dockertest"]).map_err(|e| DockerTestError::Config(e.to_string()))
    }
}

impl Default for DockerTestConfig {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            skip: false,
            no_pull: false,
        }
    }
}
