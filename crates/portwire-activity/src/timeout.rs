use std::future::Future;
use std::time::Duration;

use crate::error::{PortError, Result};

/// Run `future`, failing with [`PortError::Timeout`] if it takes longer than
/// `duration`.
///
/// Ports never time out by themselves; wrap `ready()`, `when_ready()` or
/// `accept_result()` when a deadline is needed.
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(?duration, "activity operation timed out");
            Err(PortError::Timeout(duration))
        }
    }
}
