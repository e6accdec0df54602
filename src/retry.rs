//! Exponential backoff for setup statements.
//!
//! A freshly started database accepts TCP connections some time before it
//! accepts queries, so setup statements are retried with doubling waits.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Wait before the second attempt; doubled after every failure.
pub const INITIAL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// `max_tries` was zero.
    #[error("did not try at all")]
    NoAttempts,

    /// Every attempt failed; `source` is the last failure.
    #[error("failed {tries} times: {source}")]
    Exhausted {
        tries: u32,
        #[source]
        source: E,
    },
}

/// Calls `op` until it succeeds or has been tried `max_tries` times,
/// sleeping `initial_interval` after the first failure and twice as long
/// after each one that follows.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_tries: u32,
    initial_interval: Duration,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    if max_tries == 0 {
        return Err(RetryError::NoAttempts);
    }

    let mut interval = initial_interval;
    let mut tries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tries += 1;
                if tries == max_tries {
                    return Err(RetryError::Exhausted { tries, source: e });
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    tries, max_tries, e, interval
                );
                tokio::time::sleep(interval).await;
                interval = interval.saturating_mul(2);
            }
        }
    }
}

/// Something a single SQL statement can be executed against.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes `stmt` and returns the number of affected rows.
    async fn execute(&self, stmt: &str) -> Result<u64, Self::Error>;
}

/// Executes `stmt` on `db` until it succeeds or has been tried `max_tries`
/// times, starting with a [`INITIAL_INTERVAL`] wait between tries.
pub async fn exec_retry<D>(db: &D, stmt: &str, max_tries: u32) -> Result<u64, RetryError<D::Error>>
where
    D: SqlExecutor + ?Sized,
{
    retry_with_backoff(max_tries, INITIAL_INTERVAL, || db.execute(stmt)).await
}

/// A `Config` behaves like a lazy connection handle: every execution opens
/// a fresh connection, so a server that is still starting up is retried
/// from the handshake on.
#[async_trait]
impl SqlExecutor for tokio_postgres::Config {
    type Error = tokio_postgres::Error;

    async fn execute(&self, stmt: &str) -> Result<u64, Self::Error> {
        let (client, connection) = self.connect(tokio_postgres::NoTls).await?;
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("PostgreSQL connection closed with error: {}", e);
            }
        });

        let result = SqlExecutor::execute(&client, stmt).await;
        drop(client);
        let _ = connection.await;
        result
    }
}

#[async_trait]
impl SqlExecutor for tokio_postgres::Client {
    type Error = tokio_postgres::Error;

    async fn execute(&self, stmt: &str) -> Result<u64, Self::Error> {
        use tokio_postgres::SimpleQueryMessage;

        // Simple query protocol: utility statements such as CREATE DATABASE
        // cannot be prepared.
        let messages = self.simple_query(stmt).await?;
        Ok(messages
            .iter()
            .map(|message| match message {
                SimpleQueryMessage::CommandComplete(rows) => *rows,
                _ => 0,
            })
            .sum())
    }
}

#[async_trait]
impl SqlExecutor for mysql_async::Pool {
    type Error = mysql_async::Error;

    async fn execute(&self, stmt: &str) -> Result<u64, Self::Error> {
        use mysql_async::prelude::Queryable;

        let mut conn = self.get_conn().await?;
        conn.query_drop(stmt).await?;
        Ok(conn.affected_rows())
    }
}
