use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::CatalogDbError;

/// Values that can be stored in a database row or used as query parameters.
///
/// ```rust
/// use catalog_db::prelude::*;
///
/// let values = vec![
///     RowValues::Int(1),
///     RowValues::Text("Dune".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value; `DECIMAL`/`NUMERIC` columns land here too
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// Server-side type a parameter is declared with. Must match the column or
/// procedure parameter it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    NVarChar,
    Int,
    BigInt,
    Decimal { precision: u8, scale: u8 },
    Bit,
}

impl SqlType {
    /// `DECIMAL(10, 2)`, the money shape used by the catalog.
    pub const MONEY: SqlType = SqlType::Decimal {
        precision: 10,
        scale: 2,
    };

    /// Largest `DECIMAL` precision SQL Server accepts.
    pub const MAX_DECIMAL_PRECISION: u8 = 38;

    /// `DECIMAL(p, s)` needs `1 <= p <= 38` and `s <= p`.
    #[must_use]
    pub fn is_valid(self) -> bool {
        match self {
            SqlType::Decimal { precision, scale } => {
                (1..=Self::MAX_DECIMAL_PRECISION).contains(&precision) && scale <= precision
            }
            _ => true,
        }
    }

    fn accepts(self, value: &RowValues) -> bool {
        match (self, value) {
            (SqlType::Decimal { .. }, RowValues::Float(f)) => f.is_finite(),
            _ => matches!(
                (self, value),
                (_, RowValues::Null)
                    | (SqlType::NVarChar, RowValues::Text(_))
                    | (SqlType::Int | SqlType::BigInt, RowValues::Int(_))
                    | (SqlType::Decimal { .. }, RowValues::Int(_))
                    | (SqlType::Bit, RowValues::Bool(_))
            ),
        }
    }
}

/// A named, typed parameter: `(name, declared type, value)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlParam {
    pub name: String,
    pub sql_type: SqlType,
    pub value: RowValues,
}

impl SqlParam {
    /// Build a parameter, checking that the value fits the declared type.
    ///
    /// # Errors
    /// Returns `CatalogDbError::ParameterError` when the value does not match
    /// `sql_type`, or when an `INT` parameter is out of 32-bit range.
    pub fn new(
        name: impl Into<String>,
        sql_type: SqlType,
        value: RowValues,
    ) -> Result<Self, CatalogDbError> {
        let name = name.into();
        if !sql_type.is_valid() {
            return Err(CatalogDbError::ParameterError(format!(
                "parameter @{name} has an invalid type {sql_type:?}"
            )));
        }
        if !sql_type.accepts(&value) {
            return Err(CatalogDbError::ParameterError(format!(
                "parameter @{name} declared as {sql_type:?} cannot carry {value:?}"
            )));
        }
        if let (SqlType::Int, RowValues::Int(i)) = (sql_type, &value) {
            if i32::try_from(*i).is_err() {
                return Err(CatalogDbError::ParameterError(format!(
                    "parameter @{name} value {i} does not fit INT"
                )));
            }
        }
        Ok(Self {
            name,
            sql_type,
            value,
        })
    }

    #[must_use]
    pub fn nvarchar(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::typed(name, SqlType::NVarChar, RowValues::Text(value.into()))
    }

    #[must_use]
    pub fn int(name: impl Into<String>, value: i32) -> Self {
        Self::typed(name, SqlType::Int, RowValues::Int(i64::from(value)))
    }

    #[must_use]
    pub fn bigint(name: impl Into<String>, value: i64) -> Self {
        Self::typed(name, SqlType::BigInt, RowValues::Int(value))
    }

    /// `DECIMAL(10, 2)` amount. A non-finite `value` is rejected when the
    /// parameter is bound.
    #[must_use]
    pub fn money(name: impl Into<String>, value: f64) -> Self {
        Self::typed(name, SqlType::MONEY, RowValues::Float(value))
    }

    #[must_use]
    pub fn bit(name: impl Into<String>, value: bool) -> Self {
        Self::typed(name, SqlType::Bit, RowValues::Bool(value))
    }

    /// Typed NULL.
    #[must_use]
    pub fn null(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self::typed(name, sql_type, RowValues::Null)
    }

    /// `value` when present, otherwise a typed NULL.
    #[must_use]
    pub fn optional<T>(
        name: impl Into<String>,
        value: Option<T>,
        build: impl FnOnce(String, T) -> SqlParam,
        sql_type: SqlType,
    ) -> Self {
        let name = name.into();
        match value {
            Some(v) => build(name, v),
            None => Self::null(name, sql_type),
        }
    }

    fn typed(name: impl Into<String>, sql_type: SqlType, value: RowValues) -> Self {
        Self {
            name: name.into(),
            sql_type,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_type_must_match_value() {
        assert!(SqlParam::new("titulo", SqlType::NVarChar, RowValues::Text("x".into())).is_ok());
        assert!(SqlParam::new("stock", SqlType::Int, RowValues::Null).is_ok());
        assert!(matches!(
            SqlParam::new("stock", SqlType::Int, RowValues::Text("5".into())),
            Err(CatalogDbError::ParameterError(_))
        ));
    }

    #[test]
    fn int_params_stay_in_range() {
        let err = SqlParam::new("id", SqlType::Int, RowValues::Int(i64::from(i32::MAX) + 1));
        assert!(err.is_err());
        let ok = SqlParam::new("telefono", SqlType::BigInt, RowValues::Int(18_095_551_234));
        assert!(ok.is_ok());
    }

    #[test]
    fn decimal_shape_is_bounded() {
        let too_wide = SqlType::Decimal {
            precision: 10,
            scale: 40,
        };
        assert!(matches!(
            SqlParam::new("precio", too_wide, RowValues::Int(5)),
            Err(CatalogDbError::ParameterError(_))
        ));
        let too_precise = SqlType::Decimal {
            precision: 39,
            scale: 2,
        };
        assert!(SqlParam::new("precio", too_precise, RowValues::Float(1.0)).is_err());
        assert!(SqlParam::new("precio", SqlType::MONEY, RowValues::Float(12.5)).is_ok());
    }

    #[test]
    fn decimal_rejects_non_finite_floats() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                SqlParam::new("precio", SqlType::MONEY, RowValues::Float(bad)),
                Err(CatalogDbError::ParameterError(_))
            ));
        }
    }

    #[test]
    fn optional_falls_back_to_typed_null() {
        let p = SqlParam::optional("isbn", None::<String>, SqlParam::nvarchar, SqlType::NVarChar);
        assert_eq!(p.value, RowValues::Null);
        assert_eq!(p.sql_type, SqlType::NVarChar);

        let p = SqlParam::optional("stock", Some(3), SqlParam::int, SqlType::Int);
        assert_eq!(p.value, RowValues::Int(3));
    }

    #[test]
    fn bool_accessor_reads_bits_stored_as_ints() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(7).as_bool(), None);
    }
}
