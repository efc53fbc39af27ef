use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use tiberius::{ColumnData, FromSql};

use crate::error::{CatalogDbError, is_constraint_code};
use crate::results::Row;
use crate::types::RowValues;

/// Column names of a result, shared by its rows.
pub fn column_names(columns: &[tiberius::Column]) -> Arc<Vec<String>> {
    Arc::new(columns.iter().map(|c| c.name().to_string()).collect())
}

/// Decode one driver row.
///
/// # Errors
/// Returns `CatalogDbError::MssqlError` if a date/time cell cannot be decoded.
pub fn build_row(names: Arc<Vec<String>>, row: &tiberius::Row) -> Result<Row, CatalogDbError> {
    let mut values = Vec::with_capacity(names.len());
    for (_, data) in row.cells() {
        values.push(extract_value(data)?);
    }
    Ok(Row::new(names, values))
}

fn extract_value(data: &ColumnData<'static>) -> Result<RowValues, CatalogDbError> {
    use RowValues::{Blob, Bool, Float, Int, Null, Text, Timestamp};

    let value = match data {
        ColumnData::U8(v) => v.map_or(Null, |x| Int(i64::from(x))),
        ColumnData::I16(v) => v.map_or(Null, |x| Int(i64::from(x))),
        ColumnData::I32(v) => v.map_or(Null, |x| Int(i64::from(x))),
        ColumnData::I64(v) => v.map_or(Null, Int),
        ColumnData::F32(v) => v.map_or(Null, |x| Float(f64::from(x))),
        ColumnData::F64(v) => v.map_or(Null, Float),
        ColumnData::Bit(v) => v.map_or(Null, Bool),
        ColumnData::Numeric(v) => v.map_or(Null, |n| Float(f64::from(n))),
        ColumnData::String(v) => v.as_ref().map_or(Null, |s| Text(s.to_string())),
        ColumnData::Guid(v) => v.map_or(Null, |g| Text(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map_or(Null, |b| Blob(b.to_vec())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.map_or(Null, Timestamp)
        }
        ColumnData::Date(_) => {
            NaiveDate::from_sql(data)?.map_or(Null, |d| Timestamp(d.and_time(NaiveTime::MIN)))
        }
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.map_or(Null, |t| Text(t.to_string())),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)?
            .map_or(Null, |dt| Timestamp(dt.naive_utc())),
        _ => {
            tracing::trace!("unsupported column type returned as NULL");
            Null
        }
    };
    Ok(value)
}

/// Map a server-reported failure onto the crate's error kinds. The
/// server's message text is kept as-is.
pub fn classify_error(err: tiberius::error::Error) -> CatalogDbError {
    match &err {
        tiberius::error::Error::Server(token) if is_constraint_code(token.code()) => {
            CatalogDbError::ConstraintViolation(token.message().to_string())
        }
        tiberius::error::Error::Server(token) => {
            CatalogDbError::DriverError(token.message().to_string())
        }
        _ => CatalogDbError::DriverError(err.to_string()),
    }
}

/// Errors tiberius raises while turning the request into TDS packets, before
/// anything goes on the wire. Everything else, transport faults included, is
/// a regular driver failure and goes through [`classify_error`].
#[must_use]
pub fn is_invocation_error(err: &tiberius::error::Error) -> bool {
    use tiberius::error::Error;

    matches!(
        err,
        Error::Encoding(_) | Error::Conversion(_) | Error::Utf8 | Error::Utf16 | Error::BulkInput(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind as IoErrorKind;

    #[test]
    fn transport_faults_are_driver_errors() {
        let err = tiberius::error::Error::Io {
            kind: IoErrorKind::ConnectionReset,
            message: "connection reset by peer".into(),
        };
        assert!(!is_invocation_error(&err));
        assert!(matches!(
            classify_error(err),
            CatalogDbError::DriverError(ref m) if m.contains("reset")
        ));
    }

    #[test]
    fn encoding_failures_are_invocation_errors() {
        let err = tiberius::error::Error::Encoding("string too long for the packet".into());
        assert!(is_invocation_error(&err));
        let err = tiberius::error::Error::Protocol("unexpected token".into());
        assert!(!is_invocation_error(&err));
    }
}
