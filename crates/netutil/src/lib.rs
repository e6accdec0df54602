//! TCP reachability polling.
//!
//! Containers report themselves as started long before the service inside
//! them accepts connections. [`await_reachable`] bridges that gap by dialing
//! the published address until a connection succeeds or the deadline passes.

use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::debug;

/// Delay between two failed dials.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors returned by [`await_reachable`].
#[derive(Error, Debug)]
pub enum ReachError {
    /// No dial succeeded before the deadline.
    #[error("{addr} unreachable for {max_wait:?} after {attempts} attempts")]
    Unreachable {
        addr: String,
        max_wait: Duration,
        attempts: u32,
        #[source]
        last_error: Option<io::Error>,
    },
}

/// Repeatedly dials `addr` until a TCP connection is established or
/// `max_wait` has elapsed.
///
/// The successful connection is closed immediately. Each dial is bounded by
/// the time remaining before the deadline. A `max_wait` too large to be
/// represented as an instant means waiting without a deadline.
pub async fn await_reachable(addr: &str, max_wait: Duration) -> Result<(), ReachError> {
    let deadline = Instant::now().checked_add(max_wait);
    let mut attempts = 0u32;
    let mut last_error = None;

    loop {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if remaining == Some(Duration::ZERO) {
            break;
        }
        attempts += 1;

        match bounded(TcpStream::connect(addr), remaining).await {
            Ok(stream) => {
                drop(stream);
                debug!("{} reachable after {} attempts", addr, attempts);
                return Ok(());
            }
            Err(e) => {
                debug!("Dial {} to {} failed: {}", attempts, addr, e);
                last_error = Some(e);
            }
        }

        let pause = match deadline {
            Some(d) => POLL_INTERVAL.min(d.saturating_duration_since(Instant::now())),
            None => POLL_INTERVAL,
        };
        tokio::time::sleep(pause).await;
    }

    Err(ReachError::Unreachable {
        addr: addr.to_string(),
        max_wait,
        attempts,
        last_error,
    })
}

/// Runs `fut` for at most `limit`; running out of time is a `TimedOut` error.
async fn bounded<T>(
    fut: impl Future<Output = io::Result<T>>,
    limit: Option<Duration>,
) -> io::Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("dial timed out after {limit:?}"),
            ))
        }),
        None => fut.await,
    }
}
