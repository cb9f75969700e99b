use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{
    DomainErrorKind, EntityErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{}", self.0)
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Entity(entity_error_kind) => match entity_error_kind {
                    EntityErrorKind::NotFound => {
                        (StatusCode::NOT_FOUND, "NOT FOUND").into_response()
                    }
                    EntityErrorKind::Invalid(reason) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, reason.clone()).into_response()
                    }
                    EntityErrorKind::Other(detail) => {
                        error!("Entity error: {detail}");
                        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                    }
                },
            },
            DomainErrorKind::External(ExternalErrorKind::Network) => {
                warn!("Log store unreachable: {}", self.0);
                (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
