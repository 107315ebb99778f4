use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::env;
use std::fmt::Debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidDistance,
    InvalidPassengerCount,
    InvalidPartialFactor,
    InvalidInput,
    InvalidInvocation,
    NotFound,
    RouteUnavailable,
    TripFull,
    ConcurrencyConflict,
    PersistenceFailure,
    Configuration,
    Unexpected,
}

#[derive(Debug, thiserror::Error)]
#[error("{message} (code {code})")]
pub struct Error {
    pub kind: ErrorKind,
    pub code: i32,
    pub message: String,
}

impl Error {
    fn new(kind: ErrorKind, code: i32, message: &str) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    /// Whether the caller may retry the whole operation from a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RouteUnavailable | ErrorKind::ConcurrencyConflict
        )
    }
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        database_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::TripFull | ErrorKind::ConcurrencyConflict => StatusCode::CONFLICT,
            ErrorKind::RouteUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => match self.code {
                1..=99 => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        };

        let error_message = match self.code {
            1..=99 => "Internal Server Error",
            _ => self.message.as_str(),
        };

        let body = Json(json!({
            "code": self.code,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub fn invalid_distance_error() -> Error {
    Error::new(ErrorKind::InvalidDistance, 100, "distance must be positive")
}

pub fn invalid_passenger_count_error() -> Error {
    Error::new(
        ErrorKind::InvalidPassengerCount,
        101,
        "passenger count must be between 1 and 3",
    )
}

pub fn invalid_partial_factor_error() -> Error {
    Error::new(
        ErrorKind::InvalidPartialFactor,
        102,
        "partial distance factor must be in (0, 1]",
    )
}

pub fn invalid_input_error() -> Error {
    Error::new(ErrorKind::InvalidInput, 103, "invalid input")
}

pub fn invalid_invocation_error() -> Error {
    Error::new(ErrorKind::InvalidInvocation, 104, "invalid invocation")
}

pub fn not_found_error() -> Error {
    Error::new(ErrorKind::NotFound, 105, "not found")
}

pub fn trip_full_error() -> Error {
    Error::new(ErrorKind::TripFull, 106, "trip is full")
}

pub fn concurrency_conflict_error() -> Error {
    Error::new(
        ErrorKind::ConcurrencyConflict,
        107,
        "trip is being modified concurrently",
    )
}

pub fn route_unavailable_error() -> Error {
    Error::new(ErrorKind::RouteUnavailable, 108, "route unavailable")
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error::new(ErrorKind::Configuration, 1, "environment variable error")
}

pub fn configuration_error() -> Error {
    Error::new(ErrorKind::Configuration, 1, "invalid configuration")
}

pub fn database_error(err: sqlx::Error) -> Error {
    // serialization_failure, deadlock_detected, lock_not_available
    if let sqlx::Error::Database(db_err) = &err {
        if let Some("40001" | "40P01" | "55P03") = db_err.code().as_deref() {
            return concurrency_conflict_error();
        }
    }

    tracing::error!("database error: {:?}", err);
    persistence_failure_error()
}

pub fn persistence_failure_error() -> Error {
    Error::new(ErrorKind::PersistenceFailure, 2, "database error")
}

pub fn reqwest_error<T: Debug>(err: T) -> Error {
    tracing::warn!("route provider request failed: {:?}", err);
    route_unavailable_error()
}

pub fn unexpected_error() -> Error {
    Error::new(ErrorKind::Unexpected, 5, "unexpected error")
}

#[test]
fn internal_errors_hide_their_message() {
    let response = persistence_failure_error().into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = trip_full_error().into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = invalid_distance_error().into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn retryable_kinds() {
    assert!(route_unavailable_error().is_retryable());
    assert!(concurrency_conflict_error().is_retryable());
    assert!(!trip_full_error().is_retryable());
    assert!(!persistence_failure_error().is_retryable());
}
