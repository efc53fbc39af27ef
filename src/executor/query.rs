use crate::aggregate::{RowCountAggregator, RowsAggregator};
use crate::connection::ConnectionHandle;
use crate::error::CatalogDbError;
use crate::models::NewUser;
use crate::request::Request;
use crate::results::Row;
use crate::types::SqlParam;

use super::dispatch::dispatch;

pub const INSERT_USER_STATEMENT: &str =
    "INSERT INTO usuarios (nombres, apellidos, telefono, correoelectronico, contrasena) \
     VALUES (@P1, @P2, @P3, @P4, @P5)";

/// Active books only, by title. Collation (and so case ordering) is the
/// server's.
pub const LIST_ACTIVE_BOOKS_STATEMENT: &str =
    "SELECT id, titulo, autor, editorial, anio_publicacion, isbn, precio, stock, estado \
     FROM libros \
     WHERE estado = 1 \
     ORDER BY titulo ASC";

/// Runs the parameterized ad-hoc statements: account creation and listing.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    handle: ConnectionHandle,
}

impl QueryExecutor {
    #[must_use]
    pub fn new(handle: ConnectionHandle) -> Self {
        Self { handle }
    }

    /// Insert one row into `usuarios` and return the affected count.
    ///
    /// A duplicate email surfaces as `CatalogDbError::ConstraintViolation`
    /// carrying the server's message.
    ///
    /// # Errors
    /// Any connection or driver error, reported once.
    pub async fn insert_user(&self, user: &NewUser) -> Result<u64, CatalogDbError> {
        let request = Request::raw(
            INSERT_USER_STATEMENT,
            vec![
                SqlParam::nvarchar("nombres", user.names.as_str()),
                SqlParam::nvarchar("apellidos", user.surname.as_str()),
                SqlParam::bigint("telefono", user.phone),
                SqlParam::nvarchar("correoelectronico", user.email.as_str()),
                SqlParam::nvarchar("contrasena", user.password.as_str()),
            ],
        );
        dispatch(&self.handle, request, RowCountAggregator).await
    }

    /// Every active book, title ascending. No matches is an empty list.
    ///
    /// # Errors
    /// Any connection or driver error, reported once.
    pub async fn list_books(&self) -> Result<Vec<Row>, CatalogDbError> {
        let request = Request::raw(LIST_ACTIVE_BOOKS_STATEMENT, vec![]);
        dispatch(&self.handle, request, RowsAggregator::default()).await
    }
}
