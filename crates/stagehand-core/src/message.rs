//! Direct messages between accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub message_id:   Uuid,
  pub sender_id:    Uuid,
  pub recipient_id: Uuid,
  pub body:         String,
  pub sent_at:      DateTime<Utc>,
  pub read_at:      Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
  pub sender_id:    Uuid,
  pub recipient_id: Uuid,
  pub body:         String,
}

impl NewMessage {
  pub fn validate(&self) -> Result<()> {
    if self.sender_id == self.recipient_id {
      return Err(Error::invalid("cannot message yourself"));
    }
    if self.body.trim().is_empty() {
      return Err(Error::invalid("message body must not be empty"));
    }
    if self.body.chars().count() > MAX_MESSAGE_CHARS {
      return Err(Error::invalid(format!(
        "message body exceeds {MAX_MESSAGE_CHARS} characters"
      )));
    }
    Ok(())
  }
}

/// One row of an inbox: the latest message exchanged with a counterpart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
  pub counterpart_id: Uuid,
  pub last_message:   Message,
  /// Messages from the counterpart not yet read.
  pub unread:         u32,
}
