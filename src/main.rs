//! Command-line interface for dockertest
//!
//! # Usage Examples
//!
//! ```bash
//! # Is the container runtime installed?
//! dockertest check
//!
//! # Start a PostgreSQL server with an `app_test` database on port 15432
//! dockertest start postgresql --database app_test --host-port 15432 --timeout 30s
//!
//! # Same, machine-readable
//! dockertest start mysql --database app_test --json
//!
//! # Tear down
//! dockertest stop 3f1c2a9e7b4d
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use dockertest::config::duration::parse_duration;
use dockertest::{ContainerId, DatabaseKind, DockerTest, DockerTestConfig};
use serde::Serialize;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dockertest")]
#[command(about = "Start and stop throwaway database containers for tests")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    config: DockerTestConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the container runtime is installed
    Check,

    /// Pull an image
    Pull {
        /// Image name, e.g. "postgres" or "mysql:8.0"
        image: String,
    },

    /// Start a database container and wait until it is reachable
    Start {
        /// Database type
        #[arg(value_enum)]
        kind: DatabaseKind,

        /// Database to create (ignored for MongoDB)
        #[arg(long, default_value = "dockertest")]
        database: String,

        /// Host port to publish the database port on (default: the database's standard port)
        #[arg(long)]
        host_port: Option<u16>,

        /// How long to wait for the port to become reachable
        /// Format: duration in seconds or with units like "1500ms", "30s", "2m"
        #[arg(long, value_parser = parse_timeout)]
        timeout: Option<Duration>,

        /// Container name (default: dockertest-<kind>-<random>)
        #[arg(long)]
        name: Option<String>,

        /// Print the started container as JSON
        #[arg(long)]
        json: bool,
    },

    /// Kill and remove containers
    Stop {
        /// Container ids or names
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Printed by `start`.
#[derive(Serialize)]
struct StartedContainer {
    kind: DatabaseKind,
    id: ContainerId,
    address: String,
    connection_string: String,
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| format!("{e:#}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let fixture = DockerTest::new(cli.config);

    match cli.command {
        Commands::Check => {
            let docker = fixture.docker();
            if !docker.is_available() {
                anyhow::bail!("'{}' command not found", docker.program());
            }
            println!("{} is available", docker.program());
        }
        Commands::Pull { image } => {
            fixture
                .docker()
                .pull(&image)
                .with_context(|| format!("Failed to pull {image}"))?;
        }
        Commands::Start {
            kind,
            database,
            host_port,
            timeout,
            name,
            json,
        } => {
            let mut spec = kind.default_spec(&database)?;
            if let Some(port) = host_port {
                spec = spec.with_host_port(port);
            }
            if let Some(timeout) = timeout {
                spec = spec.with_timeout(timeout);
            }
            let name = name.unwrap_or_else(|| default_container_name(kind));
            spec = spec.with_name(name);

            let container = fixture
                .start_database(kind, &database, spec)
                .await
                .with_context(|| format!("Failed to start {kind} container"))?;

            let started = StartedContainer {
                kind,
                id: container.id().clone(),
                address: container.addr(),
                connection_string: kind.connection_string(&container, &database),
            };
            // The container outlives this process until `dockertest stop`.
            container.persist();

            if json {
                println!("{}", serde_json::to_string_pretty(&started)?);
            } else {
                println!("{}", started.id);
                println!("address: {}", started.address);
                println!("connection: {}", started.connection_string);
            }
        }
        Commands::Stop { ids } => {
            let docker = fixture.docker();
            for id in ids.into_iter().map(ContainerId::new) {
                docker
                    .kill(&id)
                    .with_context(|| format!("Failed to kill container {id}"))?;
                docker
                    .remove(&id)
                    .with_context(|| format!("Failed to remove container {id}"))?;
                tracing::info!("Stopped {}", id);
            }
        }
    }

    Ok(())
}

fn default_container_name(kind: DatabaseKind) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("dockertest-{}-{}", kind, &suffix[..12])
}
