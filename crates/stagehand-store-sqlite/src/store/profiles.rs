//! [`ProfileStore`] for [`SqliteStore`]: registration, credentials, sessions.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  account::{Account, AccountKind, handle_from},
  profile::{NewProfile, Profile, Session, normalize_email},
  store::ProfileStore,
};
use uuid::Uuid;

use super::SqliteStore;
use crate::{
  Result,
  encode::{decode_dt, decode_opt_uuid, decode_uuid, encode_dt, encode_enum, encode_uuid},
};

// ─── Rows ────────────────────────────────────────────────────────────────────

pub(super) const PROFILE_COLUMNS: &str =
  "p.profile_id, p.email, p.display_name, p.active_account_id, p.created_at";

/// Raw strings read directly from a `profiles` row.
pub(super) struct RawProfile {
  pub profile_id:        String,
  pub email:             String,
  pub display_name:      String,
  pub active_account_id: Option<String>,
  pub created_at:        String,
}

impl RawProfile {
  /// Read the columns listed in [`PROFILE_COLUMNS`], starting at `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id:        row.get(offset)?,
      email:             row.get(offset + 1)?,
      display_name:      row.get(offset + 2)?,
      active_account_id: row.get(offset + 3)?,
      created_at:        row.get(offset + 4)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      profile_id:        decode_uuid(&self.profile_id)?,
      email:             self.email,
      display_name:      self.display_name,
      active_account_id: decode_opt_uuid(self.active_account_id)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

pub(super) fn load_profile(
  conn: &rusqlite::Connection,
  profile_id: &str,
) -> rusqlite::Result<Option<RawProfile>> {
  conn
    .query_row(
      &format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.profile_id = ?1"),
      rusqlite::params![profile_id],
      |row| RawProfile::from_row(row, 0),
    )
    .optional()
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  async fn register(&self, input: NewProfile) -> Result<(Profile, Account)> {
    input.validate()?;
    let email = normalize_email(&input.email)?;
    let now = Utc::now();

    let mut profile = Profile {
      profile_id:        Uuid::new_v4(),
      email:             email.clone(),
      display_name:      input.display_name.trim().to_owned(),
      active_account_id: None,
      created_at:        now,
    };
    let mut account = Account {
      account_id:   Uuid::new_v4(),
      owner_id:     profile.profile_id,
      kind:         AccountKind::Personal,
      handle:       handle_from(email.split('@').next().unwrap_or_default()),
      display_name: profile.display_name.clone(),
      bio:          None,
      created_at:   now,
    };
    profile.active_account_id = Some(account.account_id);

    let profile_id_str = encode_uuid(profile.profile_id);
    let account_id_str = encode_uuid(account.account_id);
    let at_str         = encode_dt(now);
    let display_name   = profile.display_name.clone();
    let base_handle    = account.handle.clone();
    let suffix         = profile.profile_id.simple().to_string()[..4].to_owned();
    let kind_str       = encode_enum(AccountKind::Personal);

    let handle = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken = tx
          .query_row(
            "SELECT 1 FROM profiles WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(Err(CoreError::Conflict(format!(
            "email {email} is already registered"
          ))));
        }

        let handle_taken = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE handle = ?1",
            rusqlite::params![base_handle],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        let handle = if handle_taken {
          format!("{base_handle}_{suffix}")
        } else {
          base_handle
        };

        tx.execute(
          "INSERT INTO profiles (
             profile_id, email, display_name, password_hash, active_account_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            profile_id_str,
            email,
            display_name,
            input.password_hash,
            account_id_str,
            at_str,
          ],
        )?;
        tx.execute(
          "INSERT INTO accounts (
             account_id, owner_id, kind, handle, display_name, bio, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)",
          rusqlite::params![
            account_id_str,
            profile_id_str,
            kind_str,
            handle,
            display_name,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(handle))
      })
      .await??;

    account.handle = handle;
    tracing::info!(profile_id = %profile.profile_id, "registered profile");
    Ok((profile, account))
  }

  async fn get_profile(&self, profile_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(profile_id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_profile(conn, &id_str)?))
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn credentials(&self, email: String) -> Result<Option<(Profile, String)>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {PROFILE_COLUMNS}, p.password_hash
                 FROM profiles p WHERE p.email = ?1"
              ),
              rusqlite::params![email],
              |row| Ok((RawProfile::from_row(row, 0)?, row.get::<_, String>(5)?)),
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some((profile, hash)) => Ok(Some((profile.into_profile()?, hash))),
      None => Ok(None),
    }
  }

  async fn create_session(&self, session: Session) -> Result<()> {
    let profile_id_str = encode_uuid(session.profile_id);
    let created_str    = encode_dt(session.created_at);
    let expires_str    = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, profile_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![session.token_hash, profile_id_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_profile(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> Result<Option<Profile>> {
    let now_str = encode_dt(now);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {PROFILE_COLUMNS}
                 FROM sessions s JOIN profiles p ON p.profile_id = s.profile_id
                 WHERE s.token_hash = ?1 AND s.expires_at > ?2"
              ),
              rusqlite::params![token_hash, now_str],
              |row| RawProfile::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn delete_session(&self, token_hash: String) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
    let now_str = encode_dt(now);
    let purged = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;
    if purged > 0 {
      tracing::debug!(purged, "purged expired sessions");
    }
    Ok(purged)
  }
}
