use crate::connection::ConnectionHandle;
use crate::error::CatalogDbError;
use crate::executor::{ProcedureExecutor, QueryExecutor};
use crate::models::{Book, MutationOutcome, NewBook, NewUser};
use crate::results::Row;

pub const USER_CREATED: &str = "User created successfully";
pub const BOOK_INSERTED: &str = "Book inserted successfully";
pub const BOOK_UPDATED: &str = "Book updated successfully";
pub const BOOK_DELETED: &str = "Book deleted successfully";

/// Collaborator-facing entry point: one method per catalog use case, all
/// sharing the injected connection.
///
/// Every method resolves exactly once. Errors are passed through as the
/// driver classified them; mapping them onto responses is the caller's job.
#[derive(Debug, Clone)]
pub struct CatalogDb {
    handle: ConnectionHandle,
    queries: QueryExecutor,
    procedures: ProcedureExecutor,
}

impl CatalogDb {
    #[must_use]
    pub fn new(handle: ConnectionHandle) -> Self {
        Self {
            queries: QueryExecutor::new(handle.clone()),
            procedures: ProcedureExecutor::new(handle.clone()),
            handle,
        }
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// # Errors
    /// `ConstraintViolation` for a duplicate email; otherwise any connection
    /// or driver error.
    pub async fn insert_user(&self, user: &NewUser) -> Result<MutationOutcome, CatalogDbError> {
        let rows = self.queries.insert_user(user).await?;
        Ok(MutationOutcome::new(USER_CREATED, rows))
    }

    /// `None` when the credentials match no account with the given active
    /// flag.
    ///
    /// # Errors
    /// Any connection or driver error.
    pub async fn login_user(
        &self,
        email: &str,
        password: &str,
        active: bool,
    ) -> Result<Option<Row>, CatalogDbError> {
        self.procedures.login_user(email, password, active).await
    }

    /// # Errors
    /// `ConstraintViolation` when the server rejects the book; otherwise any
    /// connection or driver error.
    pub async fn insert_book(&self, book: &NewBook) -> Result<MutationOutcome, CatalogDbError> {
        let rows = self.procedures.insert_book(book).await?;
        Ok(MutationOutcome::new(BOOK_INSERTED, rows))
    }

    /// Active books, title ascending, as raw rows.
    ///
    /// # Errors
    /// Any connection or driver error.
    pub async fn list_books(&self) -> Result<Vec<Row>, CatalogDbError> {
        self.queries.list_books().await
    }

    /// Active books decoded into [`Book`]s.
    ///
    /// # Errors
    /// Any connection or driver error, or a row missing a required column.
    pub async fn list_books_typed(&self) -> Result<Vec<Book>, CatalogDbError> {
        self.list_books().await?.iter().map(Book::try_from).collect()
    }

    /// `rows_affected == 0` means no active book has that id.
    ///
    /// # Errors
    /// Any connection or driver error.
    pub async fn update_book(
        &self,
        id: i32,
        book: &NewBook,
    ) -> Result<MutationOutcome, CatalogDbError> {
        let rows = self.procedures.update_book(id, book).await?;
        Ok(MutationOutcome::new(BOOK_UPDATED, rows))
    }

    /// Soft-delete: the book stays in the table with its active flag off.
    /// `rows_affected == 0` means no active book has that id.
    ///
    /// # Errors
    /// Any connection or driver error.
    pub async fn delete_book(&self, id: i32) -> Result<MutationOutcome, CatalogDbError> {
        let rows = self.procedures.delete_book(id).await?;
        Ok(MutationOutcome::new(BOOK_DELETED, rows))
    }
}
