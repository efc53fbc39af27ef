//! Database access layer for the book catalog.
//!
//! One connection per process, owned by a [`ConnectionHandle`] that callers
//! construct and inject. Each catalog operation becomes a [`Request`] (an
//! ad-hoc statement or a stored procedure call), its row events are folded by
//! a [`ResultAggregator`], and its outcome is delivered exactly once through
//! a [`CompletionGuard`].

pub mod aggregate;
pub mod catalog;
pub mod completion;
pub mod connection;
pub mod error;
pub mod executor;
pub mod models;
pub mod prelude;
pub mod request;
pub mod results;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{ResultAggregator, ResultShape};
pub use catalog::CatalogDb;
pub use completion::{Completion, CompletionGuard};
pub use connection::{ConnectionHandle, ConnectionState, DatabaseDriver, EventSink};
pub use error::{CatalogDbError, ErrorKind};
pub use request::Request;
