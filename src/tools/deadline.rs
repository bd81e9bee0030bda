//! Timeout and cancellation around a single await point

use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use super::outcome::{Outcome, Subject};

/// Await `fut`, giving up after `limit` or when `cancel` fires.
///
/// The future is dropped on either interruption, which for reqwest closes
/// the connection.
pub(crate) async fn bounded<F: Future>(
    fut: F,
    limit: Duration,
    cancel: &CancellationToken,
    subject: Subject,
) -> Result<F::Output, Outcome> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Outcome::Cancelled { subject }),
        result = tokio::time::timeout(limit, fut) => {
            result.map_err(|_| Outcome::TimedOut { subject, after: limit })
        }
    }
}
