//! Cooperative cancellation checks.

use tokio_util::sync::CancellationToken;

/// Returned when the caller's cancellation token has fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Check the token at an operation boundary.
pub fn ensure_active(cancel: &CancellationToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }
    Ok(())
}
