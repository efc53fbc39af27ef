use crate::aggregate::{RowCountAggregator, SingleRowAggregator};
use crate::connection::ConnectionHandle;
use crate::error::CatalogDbError;
use crate::models::NewBook;
use crate::request::Request;
use crate::results::Row;
use crate::types::{SqlParam, SqlType};

use super::dispatch::dispatch;

pub const LOGIN_PROCEDURE: &str = "sp_LoginUsuario";
pub const INSERT_BOOK_PROCEDURE: &str = "sp_InsertarLibro";
pub const UPDATE_BOOK_PROCEDURE: &str = "sp_ActualizarLibro";
pub const DELETE_BOOK_PROCEDURE: &str = "sp_EliminarLibro";

/// Invokes the catalog's stored procedures. Parameter names and order match
/// the procedure signatures on the server.
#[derive(Debug, Clone)]
pub struct ProcedureExecutor {
    handle: ConnectionHandle,
}

impl ProcedureExecutor {
    #[must_use]
    pub fn new(handle: ConnectionHandle) -> Self {
        Self { handle }
    }

    /// Look up the account matching `email`, `password` and `active`.
    ///
    /// `Ok(None)` means the credentials matched no account in that state.
    /// Should the procedure return several rows, the last one is returned.
    ///
    /// # Errors
    /// Any connection or driver error, reported once.
    pub async fn login_user(
        &self,
        email: &str,
        password: &str,
        active: bool,
    ) -> Result<Option<Row>, CatalogDbError> {
        let request = Request::procedure(
            LOGIN_PROCEDURE,
            vec![
                SqlParam::nvarchar("correoelectronico", email),
                SqlParam::nvarchar("contrasena", password),
                SqlParam::bit("estado", active),
            ],
        )?;
        dispatch(&self.handle, request, SingleRowAggregator::default()).await
    }

    /// # Errors
    /// Any connection or driver error, reported once. A duplicate ISBN comes
    /// back as `CatalogDbError::ConstraintViolation`.
    pub async fn insert_book(&self, book: &NewBook) -> Result<u64, CatalogDbError> {
        let request = Request::procedure(INSERT_BOOK_PROCEDURE, book_params(book))?;
        dispatch(&self.handle, request, RowCountAggregator).await
    }

    /// Update book `id`. Zero affected rows means no such book; that is not
    /// an error here.
    ///
    /// # Errors
    /// Any connection or driver error, reported once.
    pub async fn update_book(&self, id: i32, book: &NewBook) -> Result<u64, CatalogDbError> {
        let mut params = Vec::with_capacity(8);
        params.push(SqlParam::int("id", id));
        params.extend(book_params(book));
        let request = Request::procedure(UPDATE_BOOK_PROCEDURE, params)?;
        dispatch(&self.handle, request, RowCountAggregator).await
    }

    /// Deactivate book `id`. Zero affected rows means no such book.
    ///
    /// # Errors
    /// Any connection or driver error, reported once.
    pub async fn delete_book(&self, id: i32) -> Result<u64, CatalogDbError> {
        let request = Request::procedure(DELETE_BOOK_PROCEDURE, vec![SqlParam::int("id", id)])?;
        dispatch(&self.handle, request, RowCountAggregator).await
    }
}

fn book_params(book: &NewBook) -> Vec<SqlParam> {
    vec![
        SqlParam::nvarchar("titulo", book.title.as_str()),
        SqlParam::nvarchar("autor", book.author.as_str()),
        SqlParam::optional(
            "editorial",
            book.publisher.clone(),
            SqlParam::nvarchar,
            SqlType::NVarChar,
        ),
        SqlParam::optional("anio_publicacion", book.year, SqlParam::int, SqlType::Int),
        SqlParam::optional("isbn", book.isbn.clone(), SqlParam::nvarchar, SqlType::NVarChar),
        SqlParam::optional("precio", book.price, SqlParam::money, SqlType::MONEY),
        SqlParam::optional("stock", book.stock, SqlParam::int, SqlType::Int),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptStep, ScriptedDriver};
    use crate::types::RowValues;

    fn user_row(id: i64) -> Row {
        Row::from_pairs([("id", RowValues::Int(id))])
    }

    #[tokio::test]
    async fn login_without_rows_is_absent_user() {
        let driver = ScriptedDriver::new().with_script([ScriptStep::Done(0)]);
        let exec = ProcedureExecutor::new(ConnectionHandle::from_driver(driver));
        assert_eq!(exec.login_user("nouser@x.com", "pw", true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn login_keeps_last_of_several_rows() {
        let driver = ScriptedDriver::new().with_script([
            ScriptStep::Row(user_row(1)),
            ScriptStep::Row(user_row(2)),
            ScriptStep::Done(2),
        ]);
        let exec = ProcedureExecutor::new(ConnectionHandle::from_driver(driver));
        assert_eq!(
            exec.login_user("a@x.com", "pw", true).await.unwrap(),
            Some(user_row(2))
        );
    }

    #[tokio::test]
    async fn update_sends_id_first_then_book_fields() {
        let driver = ScriptedDriver::new().with_script([ScriptStep::Done(0)]);
        let log = driver.request_log();
        let exec = ProcedureExecutor::new(ConnectionHandle::from_driver(driver));

        let affected = exec
            .update_book(99, &NewBook::new("Foo", "Bar").stock(5))
            .await
            .unwrap();
        assert_eq!(affected, 0);

        let req = &log.requests()[0];
        let names: Vec<_> = req.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "id",
                "titulo",
                "autor",
                "editorial",
                "anio_publicacion",
                "isbn",
                "precio",
                "stock"
            ]
        );
        assert_eq!(req.param("editorial"), Some(&RowValues::Null));
        assert_eq!(req.param("stock"), Some(&RowValues::Int(5)));
        assert!(req.to_sql().starts_with("EXEC sp_ActualizarLibro @id = @P1, @titulo = @P2"));
    }

    #[tokio::test]
    async fn insert_error_event_beats_later_throw() {
        let driver = ScriptedDriver::new().with_script([
            ScriptStep::Error(CatalogDbError::ConstraintViolation("UNIQUE isbn".into())),
            ScriptStep::Throw(CatalogDbError::SynchronousInvocation("busy".into())),
        ]);
        let exec = ProcedureExecutor::new(ConnectionHandle::from_driver(driver));
        let err = exec.insert_book(&NewBook::new("Foo", "Bar")).await.unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn synchronous_failure_is_delivered() {
        let driver = ScriptedDriver::new().with_script([ScriptStep::Throw(
            CatalogDbError::SynchronousInvocation("connection in SentClientRequest state".into()),
        )]);
        let exec = ProcedureExecutor::new(ConnectionHandle::from_driver(driver));
        assert!(matches!(
            exec.delete_book(1).await,
            Err(CatalogDbError::SynchronousInvocation(_))
        ));
    }
}
