//! Error types for `stagehand-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::booking::BookingStatus;

/// Coarse classification shared by every layer; the HTTP layer maps each kind
/// to exactly one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Invalid,
  Unauthorized,
  Forbidden,
  NotFound,
  Conflict,
  Internal,
}

/// Implemented by every error type that can cross the store boundary.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  Invalid(String),

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: Uuid },

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("booking cannot move from {from} to {to}")]
  InvalidTransition {
    from: BookingStatus,
    to:   BookingStatus,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn invalid(msg: impl Into<String>) -> Self { Self::Invalid(msg.into()) }

  pub fn not_found(entity: &'static str, id: Uuid) -> Self {
    Self::NotFound { entity, id }
  }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Invalid(_) => ErrorKind::Invalid,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::Conflict(_) | Self::InvalidTransition { .. } => ErrorKind::Conflict,
      Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
