//! Typed errors and HTTP mapping.

use crate::registry::Role;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised while building the composition root. Any of these aborts startup.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("cannot parse fragment {}{}: {message}", .path.display(), position(.line, .column))]
    FragmentParse {
        path: PathBuf,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },
    #[error("{role} name '{name}' defined in both {} and {}", .first.display(), .second.display())]
    NameCollision {
        role: Role,
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("environment fragment {} has no base {role} fragment in its module", .path.display())]
    EnvironmentOverride { role: Role, path: PathBuf },
    #[error("module '{module}' has more than one {role} fragment: {} and {}", .first.display(), .second.display())]
    AmbiguousFragment {
        module: String,
        role: Role,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("invalid {role} definition '{name}' (last set in {}): {message}", .path.display())]
    InvalidDefinition {
        role: Role,
        name: String,
        path: PathBuf,
        message: String,
    },
    #[error("invalid environment name '{0}'")]
    InvalidEnvironment(String),
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (*line, *column) {
        (Some(l), Some(c)) => format!(" at line {} column {}", l, c),
        (Some(l), None) => format!(" at line {}", l),
        _ => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{owner}: missing {kind} '{id}'")]
    MissingReference {
        kind: &'static str,
        id: String,
        owner: String,
    },
    #[error("invalid primary key: entity {entity} column {column}")]
    InvalidPrimaryKey { entity: String, column: String },
    #[error("duplicate column '{column}' in entity {entity}")]
    DuplicateColumn { entity: String, column: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("service '{service}' has unknown kind '{kind}'")]
    UnknownServiceKind { service: String, kind: String },
    #[error("service '{service}': {message}")]
    InvalidServiceArguments { service: String, message: String },
    #[error("settings: {0}")]
    Settings(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    /// HTTP status and stable error code for the response body.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::OperationNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "operation_not_allowed"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Db(e) => match e {
                sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "not_found"),
                sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                    (StatusCode::CONFLICT, "conflict")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
