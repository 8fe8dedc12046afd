use std::fmt;

use crate::error::{AppError, AppErrorKind, InfrastructureError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseErrorKind {
    NotFound { entity: String, id: String },
    /// A unique constraint rejected the write.
    Duplicate { entity: String, key: String },
    Connection { message: String },
    Query { message: String },
    Unknown { message: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseError {
    pub kind: DatabaseErrorKind,
}

impl DatabaseError {
    pub fn new(kind: DatabaseErrorKind) -> Self {
        Self { kind }
    }

    pub fn duplicate(entity: &str, key: impl Into<String>) -> Self {
        Self::new(DatabaseErrorKind::Duplicate {
            entity: entity.to_string(),
            key: key.into(),
        })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::Duplicate { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, DatabaseErrorKind::Connection { .. })
    }

    #[cfg(feature = "database")]
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let kind = match &err {
            sqlx::Error::RowNotFound => DatabaseErrorKind::NotFound {
                entity: "row".to_string(),
                id: String::new(),
            },
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseErrorKind::Duplicate {
                    entity: db_err.table().unwrap_or("unknown").to_string(),
                    key: db_err.constraint().unwrap_or("unique").to_string(),
                }
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DatabaseErrorKind::Connection {
                message: err.to_string(),
            },
            sqlx::Error::Database(_) | sqlx::Error::ColumnDecode { .. } => {
                DatabaseErrorKind::Query {
                    message: err.to_string(),
                }
            }
            _ => DatabaseErrorKind::Unknown {
                message: err.to_string(),
            },
        };
        Self::new(kind)
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DatabaseErrorKind::NotFound { entity, id } => write!(f, "{} '{}' not found", entity, id),
            DatabaseErrorKind::Duplicate { entity, key } => {
                write!(f, "duplicate {} ({})", entity, key)
            }
            DatabaseErrorKind::Connection { message } => write!(f, "connection error: {}", message),
            DatabaseErrorKind::Query { message } => write!(f, "query error: {}", message),
            DatabaseErrorKind::Unknown { message } => write!(f, "database error: {}", message),
        }
    }
}

impl std::error::Error for DatabaseError {}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::new(AppErrorKind::Infrastructure(InfrastructureError::Database {
            message: err.to_string(),
            is_retryable: err.is_retryable(),
        }))
    }
}
