use std::fmt::Write as _;

use crate::error::CatalogDbError;
use crate::types::{RowValues, SqlParam};

/// A single unit of work sent over the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Ad-hoc statement text with positional `@P1..@Pn` placeholders; params
    /// bind in order.
    RawStatement { text: String, params: Vec<SqlParam> },
    /// Named stored procedure; params bind to the procedure's parameters by
    /// name.
    StoredProcedure { name: String, params: Vec<SqlParam> },
}

impl Request {
    #[must_use]
    pub fn raw(text: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self::RawStatement {
            text: text.into(),
            params,
        }
    }

    /// Build a procedure call.
    ///
    /// # Errors
    /// Returns `CatalogDbError::ParameterError` if the procedure or one of
    /// its parameter names is not a plain (optionally schema-qualified)
    /// identifier. Both are spliced into the `EXEC` text.
    pub fn procedure(
        name: impl Into<String>,
        params: Vec<SqlParam>,
    ) -> Result<Self, CatalogDbError> {
        let name = name.into();
        if !is_identifier(&name, true) {
            return Err(CatalogDbError::ParameterError(format!(
                "invalid procedure name: {name:?}"
            )));
        }
        if let Some(bad) = params.iter().find(|p| !is_identifier(&p.name, false)) {
            return Err(CatalogDbError::ParameterError(format!(
                "invalid parameter name for {name}: {:?}",
                bad.name
            )));
        }
        Ok(Self::StoredProcedure { name, params })
    }

    #[must_use]
    pub fn params(&self) -> &[SqlParam] {
        match self {
            Self::RawStatement { params, .. } | Self::StoredProcedure { params, .. } => params,
        }
    }

    /// Look a parameter value up by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&RowValues> {
        self.params()
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Short description for logs: the procedure name or the statement's
    /// leading keywords.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::StoredProcedure { name, .. } => name.clone(),
            Self::RawStatement { text, .. } => text
                .split_whitespace()
                .take(3)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// SQL text sent to the server. Procedures become
    /// `EXEC name @a = @P1, @b = @P2` so each value reaches the procedure
    /// parameter it is named after.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::RawStatement { text, .. } => text.clone(),
            Self::StoredProcedure { name, params } => {
                let mut sql = format!("EXEC {name}");
                for (i, param) in params.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    let _ = write!(sql, "{sep}@{} = @P{}", param.name, i + 1);
                }
                sql
            }
        }
    }
}

fn is_identifier(candidate: &str, allow_schema: bool) -> bool {
    let part_ok = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if allow_schema {
        let parts: Vec<&str> = candidate.split('.').collect();
        parts.len() <= 2 && parts.iter().all(|&p| part_ok(p))
    } else {
        part_ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedure_sql_names_each_parameter() {
        let req = Request::procedure(
            "sp_LoginUsuario",
            vec![
                SqlParam::nvarchar("correoelectronico", "a@b.c"),
                SqlParam::nvarchar("contrasena", "pw"),
                SqlParam::bit("estado", true),
            ],
        )
        .unwrap();
        assert_eq!(
            req.to_sql(),
            "EXEC sp_LoginUsuario @correoelectronico = @P1, @contrasena = @P2, @estado = @P3"
        );
        assert_eq!(req.label(), "sp_LoginUsuario");
        assert_eq!(req.param("estado"), Some(&RowValues::Bool(true)));
    }

    #[test]
    fn procedure_without_params() {
        let req = Request::procedure("dbo.sp_Ping", vec![]).unwrap();
        assert_eq!(req.to_sql(), "EXEC dbo.sp_Ping");
    }

    #[test]
    fn rejects_injected_names() {
        assert!(Request::procedure("sp_x; DROP TABLE libros", vec![]).is_err());
        assert!(Request::procedure("sp_x", vec![SqlParam::int("id = 1; --", 1)]).is_err());
        assert!(Request::procedure("a.b.c", vec![]).is_err());
    }

    #[test]
    fn raw_label_uses_leading_words() {
        let req = Request::raw("  SELECT id, titulo\n FROM libros", vec![]);
        assert_eq!(req.label(), "SELECT id, titulo");
        assert_eq!(req.to_sql(), "  SELECT id, titulo\n FROM libros");
    }
}
