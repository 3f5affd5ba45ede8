use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use serde::Serialize;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // Parsing errors
    #[error("{0}")]
    ParsingError(String),
    // Lookup errors
    #[error("{0} not found")]
    NotFound(&'static str),
    // Operator secret errors
    #[error("Unauthorized")]
    Unauthorized,
    // Missing or unusable settings
    #[error("Missing configuration: {0}")]
    Configuration(String),
    // Collaborator errors (extraction service, source pages)
    #[error("{0}")]
    Upstream(String),
    // Database errors
    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),
}

pub type RestResult<T> = std::result::Result<T, RestError>;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("{0}")]
    ParseError(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<Error> for RestError {
    fn from(e: Error) -> Self {
        match e {
            Error::ParsingError(msg) => Self::ParseError(msg),
            Error::NotFound(what) => Self::NotFound(format!("{} not found", what)),
            Error::Unauthorized => Self::Unauthorized,
            Error::Configuration(key) => {
                tracing::error!("Missing configuration value: {}", key);
                Self::InternalError(format!("Missing configuration: {}", key))
            }
            Error::Upstream(msg) => Self::InternalError(msg),
            Error::DatabaseError(e) => e.into(),
        }
    }
}

impl From<sqlx::Error> for RestError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error.cause_chain = ?e, "Database error");
        Self::InternalError(format!("Database error: {}", e))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
