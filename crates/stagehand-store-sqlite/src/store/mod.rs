//! [`SqliteStore`] is the SQLite implementation of the Stagehand store traits.
//!
//! Each submodule implements one trait from [`stagehand_core::store`].
//!
//! Closures passed to [`tokio_rusqlite::Connection::call`] return
//! `Result<Result<T, CoreError>, _>`: the outer layer carries database
//! failures, the inner one domain failures detected inside a transaction.
//! Callers unwrap both with `??`.

mod accounts;
mod bookings;
mod events;
mod feed;
mod messages;
mod profiles;
mod site_maps;
mod travel;

use std::path::Path;

use stagehand_core::store::Store;

use crate::{Error, Result, schema::SCHEMA};

/// A Stagehand store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }
}

impl Store for SqliteStore {
  type Error = Error;
}
