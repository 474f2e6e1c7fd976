use axum::http::StatusCode;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to the immediate caller of a store or settings operation.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    /// Stored data that no longer parses; the caller did nothing wrong.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidDate(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CorruptRecord(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AppError> for (StatusCode, String) {
    fn from(e: AppError) -> Self {
        let status = e.status();
        if status.is_server_error() {
            error!(error = %e, "request failed");
            return (status, "Internal server error".into());
        }
        (status, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let (status, msg): (StatusCode, String) = AppError::validation("food_name is required").into();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "food_name is required");

        let (status, _) = AppError::NotFound("Log not found".into()).into();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn database_errors_are_hidden() {
        let (status, msg): (StatusCode, String) = AppError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Internal server error");

        let (status, msg): (StatusCode, String) =
            AppError::CorruptRecord("log 3 has date 'garbage'".into()).into();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "Internal server error");
    }
}
