use tiberius::Query;
use tiberius::numeric::Numeric;

use crate::error::CatalogDbError;
use crate::types::{RowValues, SqlParam, SqlType};

/// Bind `params` in order to `@P1..@Pn` of `sql`, each with the SQL type it
/// was declared with. NULLs stay typed.
///
/// # Errors
/// Returns `CatalogDbError::ParameterError` if a value does not fit its
/// declared type.
pub fn bind_query_params<'a>(
    sql: &'a str,
    params: &[SqlParam],
) -> Result<Query<'a>, CatalogDbError> {
    let mut query = Query::new(sql);

    for param in params {
        if !param.sql_type.is_valid() {
            return Err(CatalogDbError::ParameterError(format!(
                "@{} has an invalid type {:?}",
                param.name, param.sql_type
            )));
        }
        match (param.sql_type, &param.value) {
            (SqlType::NVarChar, RowValues::Null) => query.bind(Option::<String>::None),
            (SqlType::Int, RowValues::Null) => query.bind(Option::<i32>::None),
            (SqlType::BigInt, RowValues::Null) => query.bind(Option::<i64>::None),
            (SqlType::Decimal { .. }, RowValues::Null) => query.bind(Option::<Numeric>::None),
            (SqlType::Bit, RowValues::Null) => query.bind(Option::<bool>::None),
            (SqlType::NVarChar, RowValues::Text(s)) => query.bind(s.clone()),
            (SqlType::Int, RowValues::Int(i)) => query.bind(i32::try_from(*i).map_err(|e| {
                CatalogDbError::ParameterError(format!("@{} does not fit INT: {e}", param.name))
            })?),
            (SqlType::BigInt, RowValues::Int(i)) => query.bind(*i),
            (SqlType::Decimal { precision, scale }, RowValues::Float(f)) => {
                query.bind(to_numeric(*f, precision, scale).map_err(|e| in_param(param, e))?);
            }
            (SqlType::Decimal { precision, scale }, RowValues::Int(i)) => {
                let scaled = 10_i128
                    .checked_pow(u32::from(scale))
                    .and_then(|factor| i128::from(*i).checked_mul(factor))
                    .filter(|v| fits_precision(*v, precision))
                    .ok_or_else(|| {
                        CatalogDbError::ParameterError(format!(
                            "@{} value {i} does not fit DECIMAL({precision}, {scale})",
                            param.name
                        ))
                    })?;
                query.bind(Numeric::new_with_scale(scaled, scale));
            }
            (SqlType::Bit, RowValues::Bool(b)) => query.bind(*b),
            (sql_type, value) => {
                return Err(CatalogDbError::ParameterError(format!(
                    "@{} declared as {sql_type:?} cannot carry {value:?}",
                    param.name
                )));
            }
        }
    }

    Ok(query)
}

fn in_param(param: &SqlParam, err: CatalogDbError) -> CatalogDbError {
    match err {
        CatalogDbError::ParameterError(msg) => {
            CatalogDbError::ParameterError(format!("@{}: {msg}", param.name))
        }
        other => other,
    }
}

fn fits_precision(value: i128, precision: u8) -> bool {
    10_i128
        .checked_pow(u32::from(precision))
        .is_some_and(|limit| value.unsigned_abs() < limit.unsigned_abs())
}

/// Fixed-point encoding of `value` for `DECIMAL(precision, scale)`, rounded
/// half away from zero.
///
/// # Errors
/// Returns `CatalogDbError::ParameterError` if `value` is NaN or infinite,
/// or if it has more integer digits than the type allows.
#[allow(clippy::cast_possible_truncation)]
pub fn to_numeric(value: f64, precision: u8, scale: u8) -> Result<Numeric, CatalogDbError> {
    if !value.is_finite() {
        return Err(CatalogDbError::ParameterError(format!(
            "{value} is not a decimal number"
        )));
    }
    let scaled = (value * 10_f64.powi(i32::from(scale))).round();
    // Beyond 1e38 the cast saturates, so range-check in floating point first.
    if scaled.abs() >= 1e38 || !fits_precision(scaled as i128, precision) {
        return Err(CatalogDbError::ParameterError(format!(
            "{value} does not fit DECIMAL({precision}, {scale})"
        )));
    }
    Ok(Numeric::new_with_scale(scaled as i128, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_rounds_to_cents() {
        let n = to_numeric(10.125, 10, 2).unwrap();
        assert_eq!(n.scale(), 2);
        assert_eq!(n.value(), 1013);
        assert_eq!(to_numeric(12.5, 10, 2).unwrap().value(), 1250);
        assert_eq!(to_numeric(-3.2, 10, 2).unwrap().value(), -320);
    }

    #[test]
    fn non_finite_amounts_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                to_numeric(bad, 10, 2),
                Err(CatalogDbError::ParameterError(_))
            ));
            assert!(matches!(
                bind_query_params("SELECT @P1", &[SqlParam::money("precio", bad)]),
                Err(CatalogDbError::ParameterError(ref m)) if m.contains("@precio")
            ));
        }
    }

    #[test]
    fn amounts_wider_than_the_precision_are_rejected() {
        assert!(to_numeric(99_999_999.99, 10, 2).is_ok());
        assert!(to_numeric(100_000_000.0, 10, 2).is_err());
        assert!(to_numeric(1e300, 38, 2).is_err());

        let big = SqlParam {
            name: "precio".into(),
            sql_type: SqlType::MONEY,
            value: RowValues::Int(i64::MAX),
        };
        assert!(matches!(
            bind_query_params("SELECT @P1", &[big]),
            Err(CatalogDbError::ParameterError(_))
        ));
    }

    #[test]
    fn oversized_decimal_scale_is_an_error_not_a_panic() {
        let param = SqlParam {
            name: "precio".into(),
            sql_type: SqlType::Decimal {
                precision: 10,
                scale: 40,
            },
            value: RowValues::Int(5),
        };
        assert!(matches!(
            bind_query_params("SELECT @P1", &[param]),
            Err(CatalogDbError::ParameterError(_))
        ));
    }

    #[test]
    fn binds_every_declared_type() {
        let params = vec![
            SqlParam::nvarchar("titulo", "Foo"),
            SqlParam::int("stock", 5),
            SqlParam::bigint("telefono", 18_095_551_234),
            SqlParam::money("precio", 9.99),
            SqlParam::bit("estado", true),
            SqlParam::null("isbn", SqlType::NVarChar),
        ];
        assert!(bind_query_params("SELECT @P1, @P2, @P3, @P4, @P5, @P6", &params).is_ok());
    }

    #[test]
    fn rejects_mismatched_value() {
        let bad = SqlParam {
            name: "stock".into(),
            sql_type: SqlType::Int,
            value: RowValues::Text("five".into()),
        };
        assert!(matches!(
            bind_query_params("SELECT @P1", &[bad]),
            Err(CatalogDbError::ParameterError(_))
        ));
    }
}
