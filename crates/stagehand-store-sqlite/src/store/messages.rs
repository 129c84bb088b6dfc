//! [`MessageStore`] for [`SqliteStore`].

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  message::{InboxEntry, Message, NewMessage},
  store::MessageStore,
};
use uuid::Uuid;

use super::SqliteStore;
use crate::{
  Result,
  encode::{
    decode_dt, decode_opt_dt, decode_u32, decode_uuid, encode_dt, encode_uuid,
    is_constraint_violation,
  },
};

const MESSAGE_COLUMNS: &str = "message_id, sender_id, recipient_id, body, sent_at, read_at";

struct RawMessage {
  message_id:   String,
  sender_id:    String,
  recipient_id: String,
  body:         String,
  sent_at:      String,
  read_at:      Option<String>,
}

impl RawMessage {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:   row.get(0)?,
      sender_id:    row.get(1)?,
      recipient_id: row.get(2)?,
      body:         row.get(3)?,
      sent_at:      row.get(4)?,
      read_at:      row.get(5)?,
    })
  }

  fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:   decode_uuid(&self.message_id)?,
      sender_id:    decode_uuid(&self.sender_id)?,
      recipient_id: decode_uuid(&self.recipient_id)?,
      body:         self.body,
      sent_at:      decode_dt(&self.sent_at)?,
      read_at:      decode_opt_dt(self.read_at)?,
    })
  }
}

fn load_message(
  conn: &rusqlite::Connection,
  message_id: &str,
) -> rusqlite::Result<Option<RawMessage>> {
  conn
    .query_row(
      &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = ?1"),
      rusqlite::params![message_id],
      RawMessage::from_row,
    )
    .optional()
}

impl MessageStore for SqliteStore {
  async fn send_message(&self, input: NewMessage) -> Result<Message> {
    input.validate()?;

    let message = Message {
      message_id:   Uuid::new_v4(),
      sender_id:    input.sender_id,
      recipient_id: input.recipient_id,
      body:         input.body.trim().to_owned(),
      sent_at:      Utc::now(),
      read_at:      None,
    };

    let id_str        = encode_uuid(message.message_id);
    let sender_str    = encode_uuid(message.sender_id);
    let recipient_str = encode_uuid(message.recipient_id);
    let body          = message.body.clone();
    let at_str        = encode_dt(message.sent_at);
    let recipient_id  = message.recipient_id;

    self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          &format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, NULL)"
          ),
          rusqlite::params![id_str, sender_str, recipient_str, body, at_str],
        );
        match inserted {
          Ok(_) => Ok(Ok(())),
          Err(e) if is_constraint_violation(&e) => {
            Ok(Err(CoreError::not_found("account", recipient_id)))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await??;

    tracing::debug!(message_id = %message.message_id, "message sent");
    Ok(message)
  }

  async fn get_message(&self, message_id: Uuid) -> Result<Option<Message>> {
    let id_str = encode_uuid(message_id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_message(conn, &id_str)?))
      .await?;
    raw.map(RawMessage::into_message).transpose()
  }

  async fn conversation(&self, account_id: Uuid, other_id: Uuid) -> Result<Vec<Message>> {
    let a = encode_uuid(account_id);
    let b = encode_uuid(other_id);
    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
           WHERE (sender_id = ?1 AND recipient_id = ?2)
              OR (sender_id = ?2 AND recipient_id = ?1)
           ORDER BY sent_at, message_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![a, b], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMessage::into_message).collect()
  }

  async fn inbox(&self, account_id: Uuid) -> Result<Vec<InboxEntry>> {
    let me = encode_uuid(account_id);
    let rows: Vec<(String, RawMessage, i64)> = self
      .conn
      .call(move |conn| {
        // Rank each account's messages per counterpart, keep the newest, and
        // count what the counterpart sent that is still unread.
        let mut stmt = conn.prepare(&format!(
          "WITH threads AS (
             SELECT {MESSAGE_COLUMNS},
                    CASE WHEN sender_id = ?1 THEN recipient_id ELSE sender_id END
                      AS counterpart_id,
                    ROW_NUMBER() OVER (
                      PARTITION BY CASE WHEN sender_id = ?1 THEN recipient_id ELSE sender_id END
                      ORDER BY sent_at DESC, message_id DESC
                    ) AS rn
             FROM messages
             WHERE sender_id = ?1 OR recipient_id = ?1
           )
           SELECT t.counterpart_id, {MESSAGE_COLUMNS},
                  (SELECT COUNT(*) FROM messages u
                   WHERE u.sender_id = t.counterpart_id
                     AND u.recipient_id = ?1
                     AND u.read_at IS NULL)
           FROM threads t
           WHERE t.rn = 1
           ORDER BY t.sent_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![me], |row| {
            Ok((
              row.get::<_, String>(0)?,
              RawMessage {
                message_id:   row.get(1)?,
                sender_id:    row.get(2)?,
                recipient_id: row.get(3)?,
                body:         row.get(4)?,
                sent_at:      row.get(5)?,
                read_at:      row.get(6)?,
              },
              row.get::<_, i64>(7)?,
            ))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(counterpart, raw, unread)| -> Result<InboxEntry> {
        Ok(InboxEntry {
          counterpart_id: decode_uuid(&counterpart)?,
          last_message:   raw.into_message()?,
          unread:         decode_u32(unread, "unread count")?,
        })
      })
      .collect()
  }

  async fn mark_read(&self, message_id: Uuid, now: DateTime<Utc>) -> Result<Message> {
    let id_str  = encode_uuid(message_id);
    let now_str = encode_dt(now);

    let raw: RawMessage = self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE messages SET read_at = COALESCE(read_at, ?2) WHERE message_id = ?1",
          rusqlite::params![id_str, now_str],
        )?;
        match load_message(conn, &id_str)? {
          Some(raw) => Ok(Ok(raw)),
          None => Ok(Err(CoreError::not_found("message", message_id))),
        }
      })
      .await??;

    raw.into_message()
  }
}
