use std::future::Future;

use tracing::warn;

use crate::error::{ReconcileError, ReconcileResult};

/// Run one read-plan-commit attempt until it stops hitting version
/// conflicts, up to `max_attempts` times.
///
/// Each attempt must re-read everything it depends on. Non-conflict errors
/// are returned immediately.
pub(crate) async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    operation: &'static str,
    mut attempt: F,
) -> ReconcileResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ReconcileResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut tries = 0;
    loop {
        tries += 1;
        match attempt().await {
            Err(ReconcileError::ConcurrentModification { detail, .. }) if tries < max_attempts => {
                warn!(operation, attempt = tries, %detail, "version conflict, retrying");
                tokio::task::yield_now().await;
            }
            Err(ReconcileError::ConcurrentModification { detail, .. }) => {
                return Err(ReconcileError::ConcurrentModification {
                    attempts: tries,
                    detail,
                });
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn conflict() -> ReconcileError {
        ReconcileError::ConcurrentModification {
            attempts: 1,
            detail: "stale".into(),
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = &Cell::new(0);
        let out = with_retry(3, "test", move || async move {
            calls.set(calls.get() + 1);
            if calls.get() < 3 { Err(conflict()) } else { Ok(calls.get()) }
        })
        .await
        .unwrap();
        assert_eq!(out, 3);
    }

    #[tokio::test]
    async fn reports_attempts_when_exhausted() {
        let calls = &Cell::new(0);
        let err = with_retry(2, "test", move || async move {
            calls.set(calls.get() + 1);
            Err::<(), _>(conflict())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ReconcileError::ConcurrentModification { attempts: 2, .. }));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = &Cell::new(0);
        let err = with_retry(5, "test", move || async move {
            calls.set(calls.get() + 1);
            Err::<(), _>(ReconcileError::not_found("product"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound(_)));
        assert_eq!(calls.get(), 1);
    }
}
