//! [`AccountStore`] for [`SqliteStore`]: personas and account switching.

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  account::{Account, AccountPatch, NewAccount},
  profile::Profile,
  store::AccountStore,
};
use uuid::Uuid;

use super::{
  SqliteStore,
  profiles::{RawProfile, load_profile},
};
use crate::{
  Result,
  encode::{
    decode_dt, decode_enum, decode_uuid, encode_dt, encode_enum, encode_uuid,
    is_constraint_violation,
  },
};

// ─── Rows ────────────────────────────────────────────────────────────────────

const ACCOUNT_COLUMNS: &str =
  "account_id, owner_id, kind, handle, display_name, bio, created_at";

struct RawAccount {
  account_id:   String,
  owner_id:     String,
  kind:         String,
  handle:       String,
  display_name: String,
  bio:          Option<String>,
  created_at:   String,
}

impl RawAccount {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:   row.get(0)?,
      owner_id:     row.get(1)?,
      kind:         row.get(2)?,
      handle:       row.get(3)?,
      display_name: row.get(4)?,
      bio:          row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  fn into_account(self) -> Result<Account> {
    Ok(Account {
      account_id:   decode_uuid(&self.account_id)?,
      owner_id:     decode_uuid(&self.owner_id)?,
      kind:         decode_enum(&self.kind, "account kind")?,
      handle:       self.handle,
      display_name: self.display_name,
      bio:          self.bio,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

fn load_account(
  conn: &rusqlite::Connection,
  account_id: &str,
) -> rusqlite::Result<Option<RawAccount>> {
  conn
    .query_row(
      &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
      rusqlite::params![account_id],
      RawAccount::from_row,
    )
    .optional()
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  async fn create_account(&self, input: NewAccount) -> Result<Account> {
    input.validate()?;

    let account = Account {
      account_id:   Uuid::new_v4(),
      owner_id:     input.owner_id,
      kind:         input.kind,
      handle:       input.handle,
      display_name: input.display_name.trim().to_owned(),
      bio:          input.bio.filter(|b| !b.trim().is_empty()),
      created_at:   Utc::now(),
    };

    let id_str    = encode_uuid(account.account_id);
    let owner_str = encode_uuid(account.owner_id);
    let kind_str  = encode_enum(account.kind);
    let handle    = account.handle.clone();
    let name      = account.display_name.clone();
    let bio       = account.bio.clone();
    let at_str    = encode_dt(account.created_at);

    self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO accounts (
             account_id, owner_id, kind, handle, display_name, bio, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, owner_str, kind_str, handle, name, bio, at_str],
        );
        match inserted {
          Ok(_) => Ok(Ok(())),
          Err(e) if is_constraint_violation(&e) => Ok(Err(CoreError::Conflict(format!(
            "handle {handle:?} is already taken"
          )))),
          Err(e) => Err(e.into()),
        }
      })
      .await??;

    tracing::info!(account_id = %account.account_id, kind = ?account.kind, "created account");
    Ok(account)
  }

  async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(account_id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_account(conn, &id_str)?))
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }

  async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>> {
    let owner_str = encode_uuid(owner_id);
    let raws: Vec<RawAccount> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACCOUNT_COLUMNS} FROM accounts
           WHERE owner_id = ?1 ORDER BY created_at, account_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawAccount::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAccount::into_account).collect()
  }

  async fn update_account(&self, account_id: Uuid, patch: AccountPatch) -> Result<Account> {
    patch.validate()?;
    let mut account = self
      .get_account(account_id)
      .await?
      .ok_or_else(|| CoreError::not_found("account", account_id))?;

    if let Some(name) = patch.display_name {
      account.display_name = name.trim().to_owned();
    }
    if let Some(bio) = patch.bio {
      // An empty bio clears it.
      account.bio = Some(bio).filter(|b| !b.trim().is_empty());
    }

    let id_str = encode_uuid(account_id);
    let name   = account.display_name.clone();
    let bio    = account.bio.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE accounts SET display_name = ?2, bio = ?3 WHERE account_id = ?1",
          rusqlite::params![id_str, name, bio],
        )?;
        Ok(())
      })
      .await?;

    Ok(account)
  }

  async fn switch_account(&self, profile_id: Uuid, account_id: Uuid) -> Result<Profile> {
    let profile_str = encode_uuid(profile_id);
    let account_str = encode_uuid(account_id);

    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(account) = load_account(&tx, &account_str)? else {
          return Ok(Err(CoreError::not_found("account", account_id)));
        };
        if account.owner_id != profile_str {
          return Ok(Err(CoreError::Forbidden(format!(
            "account {account_id} belongs to another profile"
          ))));
        }

        tx.execute(
          "UPDATE profiles SET active_account_id = ?2 WHERE profile_id = ?1",
          rusqlite::params![profile_str, account_str],
        )?;
        let Some(profile) = load_profile(&tx, &profile_str)? else {
          return Ok(Err(CoreError::not_found("profile", profile_id)));
        };
        tx.commit()?;
        Ok(Ok(profile))
      })
      .await??;

    tracing::debug!(%profile_id, %account_id, "switched active account");
    raw.into_profile()
  }
}
