//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body is `{"error": "<message>"}`. Store failures carry the
//! [`ErrorKind`] of their cause so the status code follows the domain.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use stagehand_core::{Classify, ErrorKind};
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("missing or expired session")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// A domain rule checked in the handler itself.
  #[error(transparent)]
  Domain(#[from] stagehand_core::Error),

  #[error("{source}")]
  Store {
    kind:   ErrorKind,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Wrap a backend error, remembering how it is classified.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Classify + Send + Sync + 'static,
  {
    Self::Store { kind: err.kind(), source: Box::new(err) }
  }

  pub fn forbidden(msg: impl Into<String>) -> Self { Self::Forbidden(msg.into()) }

  pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
    Self::NotFound(format!("{what} {id} not found"))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthorized => ErrorKind::Unauthorized,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::BadRequest(_) => ErrorKind::Invalid,
      Self::Domain(e) => e.kind(),
      Self::Store { kind, .. } => *kind,
    }
  }
}

fn status_for(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::Invalid => StatusCode::BAD_REQUEST,
    ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
    ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    ErrorKind::NotFound => StatusCode::NOT_FOUND,
    ErrorKind::Conflict => StatusCode::CONFLICT,
    ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let status = status_for(kind);

    let message = if kind == ErrorKind::Internal {
      tracing::error!(error = %self, "request failed");
      "internal server error".to_owned()
    } else {
      self.to_string()
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if kind == ErrorKind::Unauthorized {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"stagehand\""),
      );
    }
    res
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;

  use super::*;

  #[test]
  fn domain_errors_keep_their_status() {
    let conflict = ApiError::from(stagehand_core::Error::Conflict("sold out".into()));
    assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

    let missing = ApiError::from(stagehand_core::Error::not_found("event", Uuid::nil()));
    assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn unauthorized_sets_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
  }
}
