use thiserror::Error;

/// SQL Server error numbers that signal a rejected write rather than a
/// general failure: unique key (2627), unique index (2601), check or
/// foreign key constraint (547).
pub const CONSTRAINT_ERROR_CODES: [u32; 3] = [2627, 2601, 547];

#[derive(Debug, Error)]
pub enum CatalogDbError {
    #[cfg(feature = "mssql")]
    #[error(transparent)]
    MssqlError(#[from] tiberius::error::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Request could not be issued: {0}")]
    SynchronousInvocation(String),

    #[error("Database error: {0}")]
    DriverError(String),
}

/// Coarse classification of a [`CatalogDbError`], for callers that map
/// failures onto responses without inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    ConstraintViolation,
    NotFound,
    Invocation,
    Other,
}

impl CatalogDbError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionError(_) => ErrorKind::Connection,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SynchronousInvocation(_) => ErrorKind::Invocation,
            #[cfg(feature = "mssql")]
            Self::MssqlError(err) => match err {
                tiberius::error::Error::Server(token) if is_constraint_code(token.code()) => {
                    ErrorKind::ConstraintViolation
                }
                _ => ErrorKind::Other,
            },
            Self::ConfigError(_) | Self::ParameterError(_) | Self::DriverError(_) => {
                ErrorKind::Other
            }
        }
    }

    /// True when the server rejected a write because of a uniqueness or
    /// check constraint.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        self.kind() == ErrorKind::ConstraintViolation
    }
}

#[must_use]
pub fn is_constraint_code(code: u32) -> bool {
    CONSTRAINT_ERROR_CODES.contains(&code)
}
