use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::{ErrorResponse, VenueId};

/// Rejections raised while validating request parameters
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),

    #[error("parameter `{name}` is not a valid number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("parameter `{name}` = {value} is out of range, expected {expected}")]
    OutOfRange {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid ranking period {0:?}, expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("unknown sort key {0:?}")]
    InvalidSort(String),

    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Failures of the venue catalog collaborator
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog contains invalid venue {id}: {reason}")]
    InvalidVenue { id: VenueId, reason: String },

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("venue {0} has a non-finite score")]
    NonFiniteScore(VenueId),

    #[error("venue {0} appears more than once in the snapshot")]
    DuplicateVenue(VenueId),
}

/// Errors surfaced by the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] ParamError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ranking(#[from] RankingError),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_request",
            ApiError::Catalog(_) => "catalog_error",
            ApiError::Ranking(_) => "ranking_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(_) | ApiError::Ranking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::info!("Request rejected: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
