//! Cancellation scopes.
//!
//! Scopes are `tokio_util` [`CancellationToken`]s: the host owns the
//! lifecycle token and the processor derives one child token per batch.
//! The token does not need a tokio runtime, so it is awaited directly on
//! the worker's `edge_executor`.

use core::time::Duration;

use futures_lite::future;

pub use tokio_util::sync::CancellationToken;

/// Sleep for `duration` unless `token` is cancelled first.
///
/// Returns `true` when the full duration elapsed and `false` when the wait
/// was cut short.  Cancellation is not an error.
pub async fn sleep(duration: Duration, token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    future::or(
        async {
            token.cancelled().await;
            false
        },
        async {
            async_io_mini::Timer::after(duration).await;
            true
        },
    )
    .await
}
