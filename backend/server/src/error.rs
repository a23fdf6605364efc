use std::{io, sync::Arc};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use records::Failure;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid data")]
    Validation(Vec<String>),

    #[error("Invalid body: {0}")]
    Body(#[from] JsonRejection),

    #[error("User not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Unavailable(#[from] Arc<DatabaseError>),

    #[error("Malformed row: {0}")]
    MalformedRow(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Failure {
                    message: "invalid data".to_string(),
                    errors,
                    detail: None,
                },
            ),
            AppError::Body(rejection) => (
                StatusCode::BAD_REQUEST,
                Failure {
                    message: "invalid data".to_string(),
                    errors: vec![rejection.body_text()],
                    detail: None,
                },
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                Failure {
                    message: "user not found".to_string(),
                    ..Default::default()
                },
            ),
            AppError::Database(ref e) => {
                error!("Database error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, internal(e.to_string()))
            }
            AppError::Unavailable(ref e) => {
                error!("Database unavailable: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, internal(e.to_string()))
            }
            AppError::MalformedRow(ref reason) => {
                error!("Malformed row: {reason}");
                (StatusCode::INTERNAL_SERVER_ERROR, internal(reason.clone()))
            }
        };

        (status, Json(body)).into_response()
    }
}

fn internal(detail: String) -> Failure {
    Failure {
        message: "internal error".to_string(),
        errors: Vec::new(),
        detail: Some(detail),
    }
}

/// Connection bring-up failures.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database unreachable after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },
}

/// Listener bring-up failures.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("All fallback ports in use, last tried port {last_port}")]
    PortsExhausted {
        last_port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind port {port}: {source}")]
    Io {
        port: u16,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("Server error: {0}")]
    Serve(#[from] io::Error),
}
