//! Timeout helpers for transport operations.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Default timeout for establishing a connection
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for sending one logical request
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for receiving one logical response
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Run a fallible future, mapping an elapsed deadline to [`ProtocolError::Timeout`].
pub async fn with_timeout_error<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}
