use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::aggregate::ResultShape;
use crate::connection::{DatabaseDriver, EventSink};
use crate::error::CatalogDbError;
use crate::executor::{
    DELETE_BOOK_PROCEDURE, INSERT_BOOK_PROCEDURE, INSERT_USER_STATEMENT,
    LIST_ACTIVE_BOOKS_STATEMENT, LOGIN_PROCEDURE, UPDATE_BOOK_PROCEDURE,
};
use crate::request::Request;
use crate::results::Row;
use crate::types::RowValues;

const BOOK_COLUMNS: [&str; 9] = [
    "id",
    "titulo",
    "autor",
    "editorial",
    "anio_publicacion",
    "isbn",
    "precio",
    "stock",
    "estado",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FakeUser {
    pub id: i64,
    pub names: String,
    pub surname: String,
    pub phone: i64,
    pub email: String,
    pub password: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct FakeBook {
    id: i64,
    values: Vec<RowValues>,
    active: bool,
}

impl FakeBook {
    fn title(&self) -> &str {
        self.values[1].as_text().unwrap_or_default()
    }

    fn isbn(&self) -> Option<&str> {
        self.values[5].as_text()
    }

    fn to_row(&self) -> Row {
        let mut values = self.values.clone();
        values[0] = RowValues::Int(self.id);
        values[8] = RowValues::Bool(self.active);
        Row::new(
            Arc::new(BOOK_COLUMNS.iter().map(|c| (*c).to_string()).collect()),
            values,
        )
    }
}

/// Table contents of a [`FakeCatalogServer`].
#[derive(Debug, Default)]
pub struct FakeCatalogState {
    pub users: Vec<FakeUser>,
    books: Vec<FakeBook>,
    next_user_id: i64,
    next_book_id: i64,
}

impl FakeCatalogState {
    /// Number of book rows, active or not.
    #[must_use]
    pub fn book_count(&self) -> usize {
        self.books.len()
    }
}

/// In-memory stand-in for the catalog database: the `usuarios` and
/// `libros` tables plus the four stored procedures, with unique email and
/// ISBN constraints and soft deletes.
#[derive(Debug, Clone, Default)]
pub struct FakeCatalogServer {
    state: Arc<Mutex<FakeCatalogState>>,
}

impl FakeCatalogServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the tables.
    #[must_use]
    pub fn state(&self) -> Arc<Mutex<FakeCatalogState>> {
        Arc::clone(&self.state)
    }

    /// Seed an account directly.
    pub fn add_user(&self, email: &str, password: &str, active: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.next_user_id += 1;
            let id = state.next_user_id;
            state.users.push(FakeUser {
                id,
                names: "Test".into(),
                surname: "User".into(),
                phone: 0,
                email: email.into(),
                password: password.into(),
                active,
            });
        }
    }

    fn handle(
        state: &mut FakeCatalogState,
        request: &Request,
        sink: &mut dyn EventSink,
    ) -> Result<(), CatalogDbError> {
        match request {
            Request::RawStatement { text, .. } if text == INSERT_USER_STATEMENT => {
                insert_user(state, request, sink);
            }
            Request::RawStatement { text, .. } if text == LIST_ACTIVE_BOOKS_STATEMENT => {
                let mut active: Vec<&FakeBook> = state.books.iter().filter(|b| b.active).collect();
                // Binary comparison stands in for a case-sensitive collation.
                active.sort_by(|a, b| a.title().cmp(b.title()));
                for book in &active {
                    sink.on_row(book.to_row());
                }
                sink.on_done(active.len() as u64);
            }
            Request::RawStatement { text, .. } => {
                sink.on_error(CatalogDbError::DriverError(format!(
                    "fake server cannot run statement: {text}"
                )));
            }
            Request::StoredProcedure { name, .. } => match name.as_str() {
                LOGIN_PROCEDURE => login(state, request, sink),
                INSERT_BOOK_PROCEDURE => insert_book(state, request, sink),
                UPDATE_BOOK_PROCEDURE => update_book(state, request, sink),
                DELETE_BOOK_PROCEDURE => {
                    let id = int_param(request, "id");
                    let mut affected = 0;
                    for book in state.books.iter_mut().filter(|b| b.active && Some(b.id) == id) {
                        book.active = false;
                        affected += 1;
                    }
                    sink.on_done(affected);
                }
                other => {
                    return Err(CatalogDbError::SynchronousInvocation(format!(
                        "Could not find stored procedure '{other}'."
                    )));
                }
            },
        }
        Ok(())
    }
}

#[async_trait]
impl DatabaseDriver for FakeCatalogServer {
    async fn run(
        &mut self,
        request: &Request,
        _shape: ResultShape,
        sink: &mut dyn EventSink,
    ) -> Result<(), CatalogDbError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| CatalogDbError::SynchronousInvocation("fake server poisoned".into()))?;
        Self::handle(&mut state, request, sink)
    }
}

fn text_param(request: &Request, name: &str) -> Option<String> {
    request
        .param(name)
        .and_then(RowValues::as_text)
        .map(str::to_owned)
}

fn int_param(request: &Request, name: &str) -> Option<i64> {
    request.param(name).and_then(RowValues::as_int).copied()
}

fn insert_user(state: &mut FakeCatalogState, request: &Request, sink: &mut dyn EventSink) {
    let params = request.params();
    let text_at = |i: usize| {
        params
            .get(i)
            .and_then(|p| p.value.as_text())
            .unwrap_or_default()
            .to_owned()
    };
    let email = text_at(3);
    if state.users.iter().any(|u| u.email == email) {
        sink.on_error(CatalogDbError::ConstraintViolation(format!(
            "Violation of UNIQUE KEY constraint 'UQ_usuarios_correo'. \
             Cannot insert duplicate key in object 'dbo.usuarios'. \
             The duplicate key value is ({email})."
        )));
        return;
    }
    state.next_user_id += 1;
    let id = state.next_user_id;
    state.users.push(FakeUser {
        id,
        names: text_at(0),
        surname: text_at(1),
        phone: params
            .get(2)
            .and_then(|p| p.value.as_int())
            .copied()
            .unwrap_or_default(),
        email,
        password: text_at(4),
        active: true,
    });
    sink.on_done(1);
}

fn login(state: &FakeCatalogState, request: &Request, sink: &mut dyn EventSink) {
    let email = text_param(request, "correoelectronico");
    let password = text_param(request, "contrasena");
    let active = request
        .param("estado")
        .and_then(RowValues::as_bool)
        .copied()
        .unwrap_or(true);
    let mut emitted = 0;
    for user in state.users.iter().filter(|u| {
        Some(&u.email) == email.as_ref()
            && Some(&u.password) == password.as_ref()
            && u.active == active
    }) {
        sink.on_row(Row::from_pairs([
            ("id", RowValues::Int(user.id)),
            ("nombres", RowValues::Text(user.names.clone())),
            ("apellidos", RowValues::Text(user.surname.clone())),
            ("correoelectronico", RowValues::Text(user.email.clone())),
        ]));
        emitted += 1;
    }
    sink.on_done(emitted);
}

fn book_values(request: &Request, skip: usize) -> Vec<RowValues> {
    let mut values = vec![RowValues::Null];
    values.extend(request.params().iter().skip(skip).map(|p| p.value.clone()));
    values.push(RowValues::Bool(true));
    values.resize(BOOK_COLUMNS.len(), RowValues::Null);
    values
}

fn duplicate_isbn(state: &FakeCatalogState, isbn: Option<&str>, except: Option<i64>) -> bool {
    isbn.is_some_and(|isbn| {
        state
            .books
            .iter()
            .any(|b| b.isbn() == Some(isbn) && Some(b.id) != except)
    })
}

fn insert_book(state: &mut FakeCatalogState, request: &Request, sink: &mut dyn EventSink) {
    let values = book_values(request, 0);
    if duplicate_isbn(state, values[5].as_text(), None) {
        sink.on_error(CatalogDbError::ConstraintViolation(
            "Violation of UNIQUE KEY constraint 'UQ_libros_isbn'.".into(),
        ));
        return;
    }
    state.next_book_id += 1;
    let id = state.next_book_id;
    state.books.push(FakeBook {
        id,
        values,
        active: true,
    });
    sink.on_done(1);
}

fn update_book(state: &mut FakeCatalogState, request: &Request, sink: &mut dyn EventSink) {
    let id = int_param(request, "id");
    let values = book_values(request, 1);
    if duplicate_isbn(state, values[5].as_text(), id) {
        sink.on_error(CatalogDbError::ConstraintViolation(
            "Violation of UNIQUE KEY constraint 'UQ_libros_isbn'.".into(),
        ));
        return;
    }
    let mut affected = 0;
    for book in state.books.iter_mut().filter(|b| b.active && Some(b.id) == id) {
        book.values = values.clone();
        affected += 1;
    }
    sink.on_done(affected);
}
