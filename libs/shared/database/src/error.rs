use serde::Deserialize;
use thiserror::Error;

use shared_models::error::AppError;

/// Postgres / PostgREST error codes the services care about.
pub mod codes {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const RAISE_EXCEPTION: &str = "P0001";
    pub const NO_DATA_FOUND: &str = "P0002";
    pub const SINGULAR_ROW_MISSING: &str = "PGRST116";
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Check constraint violated: {0}")]
    CheckViolation(String),

    #[error("Rejected by database rule: {0}")]
    Rejected(String),

    #[error("Database authentication error: {0}")]
    Unauthorized(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct PostgrestErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl DbError {
    /// Classifies a failed PostgREST response by its error code first and the
    /// HTTP status second.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: PostgrestErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .clone()
            .unwrap_or_else(|| body.to_string());

        match parsed.code.as_deref() {
            Some(codes::UNIQUE_VIOLATION) => DbError::UniqueViolation(message),
            Some(codes::FOREIGN_KEY_VIOLATION) => DbError::ForeignKeyViolation(message),
            Some(codes::CHECK_VIOLATION) => DbError::CheckViolation(message),
            Some(codes::RAISE_EXCEPTION) => DbError::Rejected(message),
            Some(codes::NO_DATA_FOUND) | Some(codes::SINGULAR_ROW_MISSING) => {
                DbError::NotFound(message)
            }
            _ => match status {
                401 | 403 => DbError::Unauthorized(message),
                404 => DbError::NotFound(message),
                _ => DbError::Api { status, message },
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(_) => AppError::NotFound("Record not found".to_string()),
            DbError::UniqueViolation(_) => {
                AppError::Conflict("A record with this unique value already exists".to_string())
            }
            DbError::ForeignKeyViolation(_) => AppError::BadRequest(
                "Foreign key violation: the referenced record is missing or still in use".to_string(),
            ),
            DbError::CheckViolation(_) => {
                AppError::BadRequest("Value violates a data constraint".to_string())
            }
            DbError::Rejected(msg) => AppError::BadRequest(msg),
            // A refused service key is a server fault.
            DbError::Unauthorized(msg) => {
                AppError::Database(format!("store refused credentials: {}", msg))
            }
            other => AppError::Database(other.to_string()),
        }
    }
}
