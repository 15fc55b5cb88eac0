//! Disable-while-pending protection for submissions.
//!
//! Creation endpoints mint a new record per call and the gateway does not
//! deduplicate, so a front end wraps its submit action in a [`SubmitGuard`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::ApiError;

#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    pending: Arc<AtomicBool>,
}

/// Held while a submission is outstanding; releases the guard on drop.
#[derive(Debug)]
pub struct SubmitTicket {
    pending: Arc<AtomicBool>,
}

impl Drop for SubmitTicket {
    fn drop(&mut self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// `None` if a submission is already in flight.
    pub fn try_begin(&self) -> Option<SubmitTicket> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitTicket {
                pending: Arc::clone(&self.pending),
            })
    }

    /// Run `submit` unless another submission is pending.
    pub async fn run<T, F>(&self, submit: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let _ticket = self.try_begin().ok_or_else(|| {
            ApiError::Validation("A submission is already in progress".to_string())
        })?;
        submit.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_releases_on_drop() {
        let guard = SubmitGuard::new();
        let ticket = guard.try_begin().unwrap();
        assert!(guard.is_pending());
        assert!(guard.try_begin().is_none());

        drop(ticket);
        assert!(!guard.is_pending());
        assert!(guard.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_run_rejects_second_submission() {
        let guard = SubmitGuard::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let first = guard.run(async {
            let _ = rx.await;
            Ok::<_, ApiError>(1)
        });
        let second = async {
            let result = guard.run(async { Ok::<_, ApiError>(2) }).await;
            let _ = tx.send(());
            result
        };

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first.unwrap(), 1);
        assert_eq!(
            second.unwrap_err().user_message(),
            "A submission is already in progress"
        );
        assert!(!guard.is_pending());
    }
}
