use serde::{Deserialize, Serialize};

use crate::error::CatalogDbError;
use crate::results::Row;
use crate::types::RowValues;

/// A new account for the `usuarios` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub names: String,
    pub surname: String,
    /// Stored as `BIGINT`; long numeric phone strings overflow `INT`.
    pub phone: i64,
    pub email: String,
    pub password: String,
}

/// Book fields accepted by insert and update. Only title and author are
/// required by the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
}

impl NewBook {
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    #[must_use]
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    #[must_use]
    pub fn isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    #[must_use]
    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn stock(mut self, stock: i32) -> Self {
        self.stock = Some(stock);
        self
    }
}

/// A row of the `libros` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub year: Option<i64>,
    pub isbn: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub active: bool,
}

impl TryFrom<&Row> for Book {
    type Error = CatalogDbError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let text = |col: &str| row.get(col).and_then(RowValues::as_text).map(str::to_owned);
        let int = |col: &str| row.get(col).and_then(RowValues::as_int).copied();
        let missing = |col: &str| CatalogDbError::DriverError(format!("book row has no {col}"));

        Ok(Self {
            id: int("id").ok_or_else(|| missing("id"))?,
            title: text("titulo").ok_or_else(|| missing("titulo"))?,
            author: text("autor").ok_or_else(|| missing("autor"))?,
            publisher: text("editorial"),
            year: int("anio_publicacion"),
            isbn: text("isbn"),
            price: row.get("precio").and_then(RowValues::as_float),
            stock: int("stock"),
            active: row
                .get("estado")
                .and_then(RowValues::as_bool)
                .copied()
                .unwrap_or(true),
        })
    }
}

/// Outcome of a write: a human-readable message plus the affected count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: &'static str,
    pub rows_affected: u64,
}

impl MutationOutcome {
    #[must_use]
    pub fn new(message: &'static str, rows_affected: u64) -> Self {
        Self {
            success: true,
            message,
            rows_affected,
        }
    }

    /// Turn "no row matched" into `CatalogDbError::NotFound` for callers that
    /// want that distinction as an error.
    ///
    /// # Errors
    /// Returns `CatalogDbError::NotFound` naming `what` when nothing was
    /// affected.
    pub fn expect_found(self, what: impl std::fmt::Display) -> Result<Self, CatalogDbError> {
        if self.rows_affected == 0 {
            Err(CatalogDbError::NotFound(what.to_string()))
        } else {
            Ok(self)
        }
    }
}
