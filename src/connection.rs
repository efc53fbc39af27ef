use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard};

use crate::aggregate::ResultShape;
use crate::error::CatalogDbError;
use crate::request::Request;
use crate::results::Row;

/// Receiver of the events a driver produces while running one request.
///
/// Drivers may call these in any order and any number of times; the
/// dispatcher behind the sink decides which call settles the request.
pub trait EventSink: Send {
    fn on_row(&mut self, row: Row);

    fn on_done(&mut self, rows_affected: u64);

    fn on_error(&mut self, error: CatalogDbError);
}

/// A live database connection able to run [`Request`]s.
///
/// `run` reports what the server sends through `sink`. An `Err` return
/// means the request could not be issued at all; it is routed through the
/// same single delivery point as error events.
#[async_trait]
pub trait DatabaseDriver: Send {
    async fn run(
        &mut self,
        request: &Request,
        shape: ResultShape,
        sink: &mut dyn EventSink,
    ) -> Result<(), CatalogDbError>;

    async fn close(self: Box<Self>) -> Result<(), CatalogDbError> {
        Ok(())
    }
}

/// Lifecycle of the process-wide connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Failed(String),
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Failed(cause) => write!(f, "failed ({cause})"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

struct Inner {
    state: StdMutex<ConnectionState>,
    driver: Mutex<Option<Box<dyn DatabaseDriver>>>,
}

/// Owner of the single database connection.
///
/// Cloning shares the same connection. Requests are serialised on it: a
/// request holds the driver until its terminal event, the next one waits.
/// The connection is established once and never re-established; a failed
/// connect leaves the handle in [`ConnectionState::Failed`] and every request
/// fails with `CatalogDbError::ConnectionError`.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<Inner>,
}

impl ConnectionHandle {
    /// Run `connector` once and keep whatever it yields.
    ///
    /// Never fails: a connect error is logged and recorded as the handle's
    /// state.
    pub async fn connect<D, Fut>(connector: Fut) -> Self
    where
        D: DatabaseDriver + 'static,
        Fut: Future<Output = Result<D, CatalogDbError>>,
    {
        let handle = Self::with_state(ConnectionState::Connecting, None);
        match connector.await {
            Ok(driver) => {
                *handle.inner.driver.lock().await = Some(Box::new(driver));
                handle.set_state(ConnectionState::Connected);
                tracing::info!("connected to the database");
            }
            Err(err) => {
                tracing::error!(error = %err, "database connection failed");
                handle.set_state(ConnectionState::Failed(err.to_string()));
            }
        }
        handle
    }

    /// Wrap an already connected driver.
    #[must_use]
    pub fn from_driver(driver: impl DatabaseDriver + 'static) -> Self {
        Self::with_state(ConnectionState::Connected, Some(Box::new(driver)))
    }

    /// A handle whose connect attempt failed with `cause`.
    #[must_use]
    pub fn failed(cause: impl Into<String>) -> Self {
        Self::with_state(ConnectionState::Failed(cause.into()), None)
    }

    fn with_state(state: ConnectionState, driver: Option<Box<dyn DatabaseDriver>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: StdMutex::new(state),
                driver: Mutex::new(driver),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match self.inner.state.lock() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set_state(&self, next: ConnectionState) {
        match self.inner.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Exclusive access to the driver for one request.
    ///
    /// # Errors
    /// Returns `CatalogDbError::ConnectionError` unless the handle is
    /// connected.
    pub(crate) async fn acquire(&self) -> Result<DriverLease<'_>, CatalogDbError> {
        let state = self.state();
        if state != ConnectionState::Connected {
            return Err(not_connected(&state));
        }
        let slot = self.inner.driver.lock().await;
        if slot.is_none() {
            return Err(not_connected(&self.state()));
        }
        Ok(DriverLease { slot })
    }

    /// Close the connection. Later requests fail with a connection error.
    ///
    /// # Errors
    /// Propagates the driver's error from shutting the connection down.
    pub async fn close(&self) -> Result<(), CatalogDbError> {
        let driver = self.inner.driver.lock().await.take();
        self.set_state(ConnectionState::Closed);
        match driver {
            Some(driver) => {
                let res = driver.close().await;
                tracing::info!("database connection closed");
                res
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("state", &self.state())
            .finish()
    }
}

/// The driver, held for the duration of one request.
pub(crate) struct DriverLease<'a> {
    slot: MutexGuard<'a, Option<Box<dyn DatabaseDriver>>>,
}

impl DriverLease<'_> {
    pub(crate) fn driver(&mut self) -> Result<&mut dyn DatabaseDriver, CatalogDbError> {
        match self.slot.as_mut() {
            Some(driver) => Ok(&mut **driver),
            None => Err(CatalogDbError::ConnectionError(
                "database connection was closed".into(),
            )),
        }
    }
}

fn not_connected(state: &ConnectionState) -> CatalogDbError {
    CatalogDbError::ConnectionError(format!("database connection is {state}"))
}
