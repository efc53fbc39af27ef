//! Convenient imports for common functionality.

pub use crate::aggregate::{
    ResultAggregator, ResultShape, RowCountAggregator, RowsAggregator, SingleRowAggregator,
};
pub use crate::catalog::CatalogDb;
pub use crate::completion::{Completion, CompletionGuard};
pub use crate::connection::{ConnectionHandle, ConnectionState, DatabaseDriver, EventSink};
pub use crate::error::{CatalogDbError, ErrorKind};
pub use crate::executor::{ProcedureExecutor, QueryExecutor, RequestState, dispatch, dispatch_with};
pub use crate::models::{Book, MutationOutcome, NewBook, NewUser};
pub use crate::request::Request;
pub use crate::results::Row;
pub use crate::types::{RowValues, SqlParam, SqlType};

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlDriver, MssqlOptions, MssqlOptionsBuilder};
