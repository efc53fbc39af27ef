//! At-most-once delivery of a request's outcome.
//!
//! Every request can finish through several doors: the driver's "done"
//! event, its error event, or an error returned while the request was being
//! issued. [`CompletionGuard`] puts one delivery point in front of all of
//! them. The first caller of [`CompletionGuard::deliver`] hands its outcome
//! to the callback; every later call is a no-op that returns `false`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::CatalogDbError;

type Deliver<T> = Box<dyn FnOnce(Result<T, CatalogDbError>) + Send>;

pub struct CompletionGuard<T> {
    delivered: AtomicBool,
    callback: Mutex<Option<Deliver<T>>>,
}

impl<T: Send + 'static> CompletionGuard<T> {
    /// Guard a plain callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T, CatalogDbError>) + Send + 'static,
    {
        Self {
            delivered: AtomicBool::new(false),
            callback: Mutex::new(Some(Box::new(callback))),
        }
    }

    /// Guard whose outcome is awaited through the returned [`Completion`].
    #[must_use]
    pub fn channel() -> (Self, Completion<T>) {
        let (tx, rx) = oneshot::channel();
        let guard = Self::new(move |outcome| {
            // The receiver may already be gone if the caller stopped waiting.
            let _ = tx.send(outcome);
        });
        (guard, Completion { rx })
    }

    /// Deliver `outcome` if nothing has been delivered yet.
    ///
    /// Returns `true` when this call won and the callback ran.
    pub fn deliver(&self, outcome: Result<T, CatalogDbError>) -> bool {
        if self.delivered.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                discarded_error = ?outcome.as_ref().err(),
                "discarding duplicate completion"
            );
            return false;
        }

        let callback = match self.callback.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(callback) = callback {
            callback(outcome);
        }
        true
    }

    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }
}

impl<T> std::fmt::Debug for CompletionGuard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGuard")
            .field("delivered", &self.delivered.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Future side of [`CompletionGuard::channel`].
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<Result<T, CatalogDbError>>,
}

impl<T> Future for Completion<T> {
    type Output = Result<T, CatalogDbError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(CatalogDbError::DriverError(
                    "request dropped before an outcome was delivered".into(),
                ))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn first_delivery_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(None));
        let guard = {
            let calls = Arc::clone(&calls);
            let seen = Arc::clone(&seen);
            CompletionGuard::new(move |outcome: Result<u64, CatalogDbError>| {
                calls.fetch_add(1, Ordering::SeqCst);
                *seen.lock().unwrap() = Some(outcome.is_ok());
            })
        };

        assert!(guard.deliver(Err(CatalogDbError::DriverError("first".into()))));
        assert!(!guard.deliver(Ok(1)));
        assert!(!guard.deliver(Err(CatalogDbError::DriverError("third".into()))));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), Some(false));
        assert!(guard.is_delivered());
    }

    #[tokio::test]
    async fn channel_resolves_with_winner() {
        let (guard, completion) = CompletionGuard::<Vec<u8>>::channel();
        guard.deliver(Ok(vec![1, 2]));
        guard.deliver(Ok(vec![9]));
        assert_eq!(completion.await.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn dropped_guard_resolves_as_error() {
        let (guard, completion) = CompletionGuard::<()>::channel();
        drop(guard);
        assert!(matches!(
            completion.await,
            Err(CatalogDbError::DriverError(_))
        ));
    }
}
