mod dispatch;
mod procedure;
mod query;

pub use dispatch::{RequestState, dispatch, dispatch_with};
pub use procedure::{
    DELETE_BOOK_PROCEDURE, INSERT_BOOK_PROCEDURE, LOGIN_PROCEDURE, ProcedureExecutor,
    UPDATE_BOOK_PROCEDURE,
};
pub use query::{INSERT_USER_STATEMENT, LIST_ACTIVE_BOOKS_STATEMENT, QueryExecutor};
