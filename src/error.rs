//! Crate error type with HTTP status mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use derive_more::Display;
use sea_orm::DbErr;
use serde::Serialize;

/// Every failure a caller can observe, distinguishable by kind.
///
/// Numeric coercion is deliberately absent: an unparseable numeric value
/// degrades to "no numeric value" and is never an error.
#[derive(Debug, Display)]
pub enum Error {
    /// Malformed payload, e.g. an answer naming a question outside the
    /// survey. Rejected before any write.
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(&'static str),
    #[display(fmt = "{}", _0)]
    Forbidden(&'static str),
    #[display(fmt = "{}", _0)]
    NotFound(&'static str),
    #[display(fmt = "database error: {}", _0)]
    Database(DbErr),
}

impl std::error::Error for Error {}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        Error::Database(err)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (kind, message) = match self {
            Error::Validation(msg) => ("validation", msg.clone()),
            Error::Unauthorized(msg) => ("unauthorized", (*msg).to_owned()),
            Error::Forbidden(msg) => ("forbidden", (*msg).to_owned()),
            Error::NotFound(msg) => ("not_found", (*msg).to_owned()),
            Error::Database(err) => {
                log::error!("store failure: {}", err);
                ("internal", "Internal server error".to_owned())
            }
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: kind,
            message,
        })
    }
}
