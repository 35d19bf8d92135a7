use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::prelude::*;

/// Login failures. Both map to the same status code
#[derive(Debug, Error)]
pub enum Credentials {
  #[error("User not found.")]
  UnknownEmail,
  #[error("Invalid credentials.")]
  Mismatch,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] DbErr),

  #[error("Datastore did not respond within {0:?}")]
  Timeout(Duration),

  #[error("{0}")]
  InvalidInput(String),

  #[error("Email already in use")]
  EmailTaken,

  #[error("Unauthorized")]
  Unauthorized,

  #[error("Invalid token")]
  InvalidToken,

  #[error("Unauthorized to access this profile")]
  Forbidden,

  #[error("User not found")]
  UserNotFound,

  #[error(transparent)]
  Credentials(#[from] Credentials),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl Error {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }

  /// Maps unique-index violations to [`Error::EmailTaken`]
  pub fn unique(err: DbErr) -> Self {
    match err.sql_err() {
      Some(SqlErr::UniqueConstraintViolation(_)) => Self::EmailTaken,
      _ => Self::Database(err),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Database(_) | Self::Timeout(_) | Self::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
      Self::InvalidInput(_) | Self::Credentials(_) => StatusCode::BAD_REQUEST,
      Self::EmailTaken => StatusCode::CONFLICT,
      Self::Unauthorized | Self::InvalidToken => StatusCode::UNAUTHORIZED,
      Self::Forbidden => StatusCode::FORBIDDEN,
      Self::UserNotFound => StatusCode::NOT_FOUND,
    }
  }

  /// Like `into_response`, but server errors carry the underlying message.
  pub fn echoed(self, context: &str) -> Response {
    let status = self.status();
    if !status.is_server_error() {
      return self.into_response();
    }

    error!("{context} {self}");
    let body = json::json!({
      "error": context,
      "message": self.to_string(),
    });
    (status, Json(body)).into_response()
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status.is_server_error() {
      error!("Request failed: {self}");
      String::from("Internal server error")
    } else {
      self.to_string()
    };

    (status, Json(json::json!({ "error": message }))).into_response()
  }
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self {
    Self::InvalidInput(rejection.body_text())
  }
}

impl From<PathRejection> for Error {
  fn from(rejection: PathRejection) -> Self {
    Self::InvalidInput(rejection.body_text())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
