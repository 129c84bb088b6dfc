//! [`FeedStore`] for [`SqliteStore`]: posts and the scheduling queue.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use stagehand_core::{
  Error as CoreError,
  feed::{
    FeedQuery, NewPost, NewScheduledPost, Platform, Post, ScheduleStatus, ScheduledPost,
  },
  store::FeedStore,
};
use uuid::Uuid;

use super::SqliteStore;
use crate::{
  Result,
  encode::{
    decode_dt, decode_enum, decode_opt_uuid, decode_uuid, encode_dt, encode_enum,
    encode_uuid, is_constraint_violation,
  },
};

// ─── Rows ────────────────────────────────────────────────────────────────────

const POST_COLUMNS: &str = "post_id, author_id, event_id, body, created_at";

struct RawPost {
  post_id:    String,
  author_id:  String,
  event_id:   Option<String>,
  body:       String,
  created_at: String,
}

impl RawPost {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:    row.get(0)?,
      author_id:  row.get(1)?,
      event_id:   row.get(2)?,
      body:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:    decode_uuid(&self.post_id)?,
      author_id:  decode_uuid(&self.author_id)?,
      event_id:   decode_opt_uuid(self.event_id)?,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

const SCHEDULED_COLUMNS: &str = "scheduled_post_id, account_id, body, platforms_json, \
                                 scheduled_for, status, post_id, created_at";

struct RawScheduled {
  scheduled_post_id: String,
  account_id:        String,
  body:              String,
  platforms_json:    String,
  scheduled_for:     String,
  status:            String,
  post_id:           Option<String>,
  created_at:        String,
}

impl RawScheduled {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      scheduled_post_id: row.get(0)?,
      account_id:        row.get(1)?,
      body:              row.get(2)?,
      platforms_json:    row.get(3)?,
      scheduled_for:     row.get(4)?,
      status:            row.get(5)?,
      post_id:           row.get(6)?,
      created_at:        row.get(7)?,
    })
  }

  fn into_scheduled(self) -> Result<ScheduledPost> {
    let platforms: Vec<Platform> = serde_json::from_str(&self.platforms_json)?;
    Ok(ScheduledPost {
      scheduled_post_id: decode_uuid(&self.scheduled_post_id)?,
      account_id:        decode_uuid(&self.account_id)?,
      body:              self.body,
      platforms,
      scheduled_for:     decode_dt(&self.scheduled_for)?,
      status:            decode_enum(&self.status, "schedule status")?,
      post_id:           decode_opt_uuid(self.post_id)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

fn load_scheduled(
  conn: &rusqlite::Connection,
  scheduled_post_id: &str,
) -> rusqlite::Result<Option<RawScheduled>> {
  conn
    .query_row(
      &format!("SELECT {SCHEDULED_COLUMNS} FROM scheduled_posts WHERE scheduled_post_id = ?1"),
      rusqlite::params![scheduled_post_id],
      RawScheduled::from_row,
    )
    .optional()
}

// ─── FeedStore impl ──────────────────────────────────────────────────────────

impl FeedStore for SqliteStore {
  async fn create_post(&self, input: NewPost) -> Result<Post> {
    input.validate()?;

    let post = Post {
      post_id:    Uuid::new_v4(),
      author_id:  input.author_id,
      event_id:   input.event_id,
      body:       input.body.trim().to_owned(),
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(post.post_id);
    let author_str = encode_uuid(post.author_id);
    let event_str  = post.event_id.map(encode_uuid);
    let body       = post.body.clone();
    let at_str     = encode_dt(post.created_at);

    self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          &format!("INSERT INTO posts ({POST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
          rusqlite::params![id_str, author_str, event_str, body, at_str],
        );
        match inserted {
          Ok(_) => Ok(Ok(())),
          Err(e) if is_constraint_violation(&e) => {
            Ok(Err(CoreError::invalid("post references an unknown account or event")))
          }
          Err(e) => Err(e.into()),
        }
      })
      .await??;

    Ok(post)
  }

  async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
    let id_str = encode_uuid(post_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {POST_COLUMNS} FROM posts WHERE post_id = ?1"),
              rusqlite::params![id_str],
              RawPost::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawPost::into_post).transpose()
  }

  async fn list_posts(&self, query: FeedQuery) -> Result<Vec<Post>> {
    let author_str = query.author_id.map(encode_uuid);
    let event_str  = query.event_id.map(encode_uuid);
    let before_str = query.before.map(encode_dt);
    let limit      = i64::try_from(query.effective_limit()).unwrap_or(i64::MAX);

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {POST_COLUMNS} FROM posts
           WHERE (?1 IS NULL OR author_id = ?1)
             AND (?2 IS NULL OR event_id = ?2)
             AND (?3 IS NULL OR created_at < ?3)
           ORDER BY created_at DESC, post_id DESC
           LIMIT ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![author_str, event_str, before_str, limit],
            RawPost::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawPost::into_post).collect()
  }

  async fn delete_post(&self, post_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(post_id);
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM posts WHERE post_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn schedule_post(&self, mut input: NewScheduledPost) -> Result<ScheduledPost> {
    let now = Utc::now();
    input.normalize(now)?;

    let scheduled = ScheduledPost {
      scheduled_post_id: Uuid::new_v4(),
      account_id:        input.account_id,
      body:              input.body.trim().to_owned(),
      platforms:         input.platforms,
      scheduled_for:     input.scheduled_for,
      status:            ScheduleStatus::Scheduled,
      post_id:           None,
      created_at:        now,
    };

    let id_str         = encode_uuid(scheduled.scheduled_post_id);
    let account_str    = encode_uuid(scheduled.account_id);
    let body           = scheduled.body.clone();
    let platforms_json = serde_json::to_string(&scheduled.platforms)?;
    let for_str        = encode_dt(scheduled.scheduled_for);
    let status_str     = encode_enum(scheduled.status);
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO scheduled_posts ({SCHEDULED_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7)"
          ),
          rusqlite::params![id_str, account_str, body, platforms_json, for_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(
      scheduled_post_id = %scheduled.scheduled_post_id,
      scheduled_for = %scheduled.scheduled_for,
      "scheduled post"
    );
    Ok(scheduled)
  }

  async fn get_scheduled_post(&self, scheduled_post_id: Uuid) -> Result<Option<ScheduledPost>> {
    let id_str = encode_uuid(scheduled_post_id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_scheduled(conn, &id_str)?))
      .await?;
    raw.map(RawScheduled::into_scheduled).transpose()
  }

  async fn list_scheduled_posts(&self, account_id: Uuid) -> Result<Vec<ScheduledPost>> {
    let account_str = encode_uuid(account_id);
    let raws: Vec<RawScheduled> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SCHEDULED_COLUMNS} FROM scheduled_posts
           WHERE account_id = ?1 ORDER BY scheduled_for"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![account_str], RawScheduled::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawScheduled::into_scheduled).collect()
  }

  async fn cancel_scheduled_post(&self, scheduled_post_id: Uuid) -> Result<ScheduledPost> {
    let id_str    = encode_uuid(scheduled_post_id);
    let scheduled = encode_enum(ScheduleStatus::Scheduled);
    let cancelled = encode_enum(ScheduleStatus::Cancelled);

    let raw: RawScheduled = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let Some(mut raw) = load_scheduled(&tx, &id_str)? else {
          return Ok(Err(CoreError::not_found("scheduled post", scheduled_post_id)));
        };
        if raw.status != scheduled {
          return Ok(Err(CoreError::Conflict(format!(
            "scheduled post is already {}",
            raw.status
          ))));
        }

        tx.execute(
          "UPDATE scheduled_posts SET status = ?2 WHERE scheduled_post_id = ?1",
          rusqlite::params![id_str, cancelled],
        )?;
        tx.commit()?;

        raw.status = cancelled;
        Ok(Ok(raw))
      })
      .await??;

    tracing::info!(%scheduled_post_id, "cancelled scheduled post");
    raw.into_scheduled()
  }

  async fn publish_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
    let now_str   = encode_dt(now);
    let scheduled = encode_enum(ScheduleStatus::Scheduled);
    let published = encode_enum(ScheduleStatus::Published);

    let raws: Vec<RawScheduled> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let due = {
          let mut stmt = tx.prepare(&format!(
            "SELECT {SCHEDULED_COLUMNS} FROM scheduled_posts
             WHERE status = ?1 AND scheduled_for <= ?2
             ORDER BY scheduled_for"
          ))?;
          stmt
            .query_map(rusqlite::params![scheduled, now_str], RawScheduled::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut out = Vec::with_capacity(due.len());
        for mut raw in due {
          let post_id = encode_uuid(Uuid::new_v4());
          tx.execute(
            &format!("INSERT INTO posts ({POST_COLUMNS}) VALUES (?1, ?2, NULL, ?3, ?4)"),
            rusqlite::params![post_id, raw.account_id, raw.body, now_str],
          )?;
          tx.execute(
            "UPDATE scheduled_posts SET status = ?2, post_id = ?3 WHERE scheduled_post_id = ?1",
            rusqlite::params![raw.scheduled_post_id, published, post_id],
          )?;
          raw.status = published.clone();
          raw.post_id = Some(post_id);
          out.push(raw);
        }

        tx.commit()?;
        Ok(out)
      })
      .await?;

    if !raws.is_empty() {
      tracing::info!(count = raws.len(), "published scheduled posts");
    }
    raws.into_iter().map(RawScheduled::into_scheduled).collect()
  }
}
