use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::validation::FieldError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<FieldError>),
    #[error("username already taken")]
    DuplicateUsername,
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("users cannot follow themselves")]
    SelfFollow,
    #[error("users cannot unfollow themselves")]
    SelfUnfollow,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("not permitted")]
    Authorization,
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ServiceError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }

    /// Field errors for the variants a form can display next to its inputs.
    pub fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            ServiceError::Validation(errors) => Some(errors.clone()),
            ServiceError::DuplicateUsername => Some(vec![FieldError::new(
                "username",
                "Username already taken. Please choose a different one.",
            )]),
            ServiceError::DuplicateEmail => Some(vec![FieldError::new(
                "email",
                "Email already registered. Please choose a different one.",
            )]),
            _ => None,
        }
    }
}

/// True when the database rejected a write because of a UNIQUE constraint.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Authorization => StatusCode::FORBIDDEN,
            ServiceError::Validation(_)
            | ServiceError::DuplicateUsername
            | ServiceError::DuplicateEmail
            | ServiceError::SelfFollow
            | ServiceError::SelfUnfollow
            | ServiceError::Image(_) => StatusCode::BAD_REQUEST,
            ServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ServiceError::Database(_) | ServiceError::Io(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            log::error!("Request failed: {:?}", self);
            "Something went wrong. Please try again later.".to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(crate::api::render::error_page(status, &message))
    }
}
