use chrono::NaiveDate;
use ntex::http::StatusCode;
use ntex::web::{HttpResponse, WebResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("corrupt value under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("insufficient balance: {required} required, {available} available")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("routine text is empty")]
    EmptyText,

    #[error("cannot record a routine for future date {0}")]
    FutureDate(NaiveDate),

    #[error("daily limit of {0} routines reached")]
    DailyLimitReached(usize),

    #[error("flat leveling needs the full cost of {required}, got {offered}")]
    PartialCredit { required: u64, offered: u64 },

    #[error("unknown character: {0}")]
    UnknownCharacter(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Db(_) | AppError::Corrupt { .. } => "storage",
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::EmptyText => "empty_text",
            AppError::FutureDate(_) => "future_date",
            AppError::DailyLimitReached(_) => "daily_limit_reached",
            AppError::PartialCredit { .. } => "partial_credit",
            AppError::UnknownCharacter(_) => "unknown_character",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Db(_) | AppError::Corrupt { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InsufficientBalance { .. } | AppError::DailyLimitReached(_) => {
                StatusCode::CONFLICT
            }
            AppError::UnknownCharacter(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmptyText
            | AppError::FutureDate(_)
            | AppError::PartialCredit { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl WebResponseError for AppError {
    fn error_response(&self, _: &ntex::web::HttpRequest) -> HttpResponse {
        let status = self.status();
        // Storage details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Internal error".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status).json(&serde_json::json!({
            "error": self.code(),
            "message": message,
        }))
    }
}
