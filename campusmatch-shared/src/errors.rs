use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Profile errors
/// - E2xxx: Photo/prompt content errors
/// - E3xxx: Discovery/like/match errors
/// - E4xxx: Messaging errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,
    ServiceUnavailable,

    // Profile (E1xxx)
    ProfileNotFound,
    ProfileAlreadyExists,

    // Content (E2xxx)
    PhotoNotFound,
    PhotoIdTaken,
    PhotoLimitReached,
    PromptNotFound,
    PromptIdTaken,
    PromptLimitReached,
    InvalidPromptId,
    PromptAlreadyAnswered,
    PromptDeleted,
    InvalidReorder,
    StorageError,

    // Discovery/likes/matches (E3xxx)
    CannotLikeSelf,
    AlreadyLiked,
    CannotPassSelf,
    AlreadyPassed,
    MatchNotFound,
    NotMatchParticipant,

    // Messaging (E4xxx)
    MessageEmpty,
    LikeNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",
            Self::ServiceUnavailable => "E0007",

            // Profile
            Self::ProfileNotFound => "E1001",
            Self::ProfileAlreadyExists => "E1002",

            // Content
            Self::PhotoNotFound => "E2001",
            Self::PhotoIdTaken => "E2002",
            Self::PhotoLimitReached => "E2003",
            Self::PromptNotFound => "E2004",
            Self::PromptIdTaken => "E2005",
            Self::PromptLimitReached => "E2006",
            Self::InvalidPromptId => "E2007",
            Self::PromptAlreadyAnswered => "E2008",
            Self::PromptDeleted => "E2009",
            Self::InvalidReorder => "E2010",
            Self::StorageError => "E2011",

            // Discovery/likes/matches
            Self::CannotLikeSelf => "E3001",
            Self::AlreadyLiked => "E3002",
            Self::CannotPassSelf => "E3003",
            Self::AlreadyPassed => "E3004",
            Self::MatchNotFound => "E3005",
            Self::NotMatchParticipant => "E3006",

            // Messaging
            Self::MessageEmpty => "E4001",
            Self::LikeNotFound => "E4002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable
            | Self::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::PhotoLimitReached
            | Self::PromptLimitReached | Self::InvalidPromptId | Self::InvalidReorder
            | Self::MessageEmpty | Self::PromptDeleted => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::ProfileNotFound | Self::PhotoNotFound
            | Self::PromptNotFound | Self::MatchNotFound
            | Self::LikeNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotMatchParticipant | Self::CannotLikeSelf
            | Self::CannotPassSelf => StatusCode::FORBIDDEN,
            Self::ProfileAlreadyExists | Self::PhotoIdTaken | Self::PromptIdTaken
            | Self::PromptAlreadyAnswered | Self::AlreadyLiked
            | Self::AlreadyPassed => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_edges_map_to_conflict() {
        assert_eq!(ErrorCode::AlreadyLiked.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::AlreadyPassed.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn authorization_failures_map_to_forbidden() {
        assert_eq!(ErrorCode::NotMatchParticipant.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::CannotLikeSelf.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::BadRequest,
            ErrorCode::ServiceUnavailable,
            ErrorCode::ProfileNotFound,
            ErrorCode::ProfileAlreadyExists,
            ErrorCode::PhotoNotFound,
            ErrorCode::PhotoIdTaken,
            ErrorCode::PhotoLimitReached,
            ErrorCode::PromptNotFound,
            ErrorCode::PromptIdTaken,
            ErrorCode::PromptLimitReached,
            ErrorCode::InvalidPromptId,
            ErrorCode::PromptAlreadyAnswered,
            ErrorCode::PromptDeleted,
            ErrorCode::InvalidReorder,
            ErrorCode::StorageError,
            ErrorCode::CannotLikeSelf,
            ErrorCode::AlreadyLiked,
            ErrorCode::CannotPassSelf,
            ErrorCode::AlreadyPassed,
            ErrorCode::MatchNotFound,
            ErrorCode::NotMatchParticipant,
            ErrorCode::MessageEmpty,
            ErrorCode::LikeNotFound,
        ];
        let mut seen = std::collections::HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }
}
