use std::future::Future;
use std::time::Duration;

use moot_core::error::{MootError, Result};

/// Runs a gateway call under a deadline. Expiry is reported as
/// [`MootError::Timeout`] and handled like any other failure.
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(MootError::timeout(operation, limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_expired_call_is_timeout() {
        let err = bounded("slow", Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let err = bounded::<(), _>("fails", Duration::from_secs(1), async {
            Err(MootError::capture("camera gone"))
        })
        .await
        .unwrap_err();
        assert!(!err.is_timeout());
    }
}
