//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `chatledger-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reads on the reader
//! pool and every write inside `DatabasePool::with_transaction` or on the
//! single writer connection.

use chatledger_core::session::repository::SessionRepository;
use chatledger_types::chat::{
    Message, Metadata, NewMessage, NewSession, Session, SessionContext, SessionLookup,
};
use chatledger_types::config::RetentionConfig;
use chatledger_types::error::StoreError;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, sqlite_error};

/// Expiry and purge windows applied by the session store.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Lifetime of a new session. `None` means sessions never expire.
    pub session_ttl: Option<TimeDelta>,
    /// How long a soft-deleted session is kept before it is purged.
    pub hard_delete_after: TimeDelta,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&RetentionConfig::default())
    }
}

impl From<&RetentionConfig> for RetentionPolicy {
    fn from(config: &RetentionConfig) -> Self {
        let session_ttl = match config.session_ttl_hours {
            0 => None,
            hours => Some(
                i64::try_from(hours)
                    .ok()
                    .and_then(TimeDelta::try_hours)
                    .unwrap_or(TimeDelta::MAX),
            ),
        };
        let hard_delete_after = i64::try_from(config.hard_delete_after_days)
            .ok()
            .and_then(TimeDelta::try_days)
            .unwrap_or(TimeDelta::MAX);
        Self {
            session_ttl,
            hard_delete_after,
        }
    }
}

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
    retention: RetentionPolicy,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool, retention: RetentionPolicy) -> Self {
        Self { pool, retention }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

const SESSION_COLUMNS: &str =
    "id, store_id, user_id, metadata, is_active, created_at, last_active_at, expires_at, deleted_at";

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, token_count, response_time_ms, trace_id, parent_message_id, metadata, sequence_number, created_at, is_deleted";

struct SessionRow {
    id: String,
    store_id: String,
    user_id: String,
    metadata: String,
    is_active: bool,
    created_at: String,
    last_active_at: String,
    expires_at: Option<String>,
    deleted_at: Option<String>,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            store_id: row.try_get("store_id")?,
            user_id: row.try_get("user_id")?,
            metadata: row.try_get("metadata")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            last_active_at: row.try_get("last_active_at")?,
            expires_at: row.try_get("expires_at")?,
            deleted_at: row.try_get("deleted_at")?,
        })
    }

    fn into_session(self) -> Result<Session, StoreError> {
        Ok(Session {
            id: parse_uuid(&self.id, "session id")?,
            store_id: self.store_id,
            user_id: self.user_id,
            metadata: parse_metadata(&self.metadata)?,
            is_active: self.is_active,
            created_at: parse_datetime(&self.created_at)?,
            last_active_at: parse_datetime(&self.last_active_at)?,
            expires_at: self.expires_at.as_deref().map(parse_datetime).transpose()?,
            deleted_at: self.deleted_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    token_count: Option<i64>,
    response_time_ms: Option<i64>,
    trace_id: Option<String>,
    parent_message_id: Option<String>,
    metadata: String,
    sequence_number: i64,
    created_at: String,
    is_deleted: bool,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            token_count: row.try_get("token_count")?,
            response_time_ms: row.try_get("response_time_ms")?,
            trace_id: row.try_get("trace_id")?,
            parent_message_id: row.try_get("parent_message_id")?,
            metadata: row.try_get("metadata")?,
            sequence_number: row.try_get("sequence_number")?,
            created_at: row.try_get("created_at")?,
            is_deleted: row.try_get("is_deleted")?,
        })
    }

    fn into_message(self) -> Result<Message, StoreError> {
        Ok(Message {
            id: parse_uuid(&self.id, "message id")?,
            session_id: parse_uuid(&self.session_id, "session_id")?,
            role: self.role.parse().map_err(StoreError::Persistence)?,
            content: self.content,
            token_count: self.token_count.map(|v| v as u32),
            response_time_ms: self.response_time_ms.map(|v| v as u64),
            trace_id: self.trace_id,
            parent_message_id: self
                .parent_message_id
                .as_deref()
                .map(|id| parse_uuid(id, "parent_message_id"))
                .transpose()?,
            metadata: parse_metadata(&self.metadata)?,
            sequence_number: self.sequence_number,
            created_at: parse_datetime(&self.created_at)?,
            is_deleted: self.is_deleted,
        })
    }
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Persistence(format!("invalid {what}: {e}")))
}

fn parse_metadata(s: &str) -> Result<Metadata, StoreError> {
    serde_json::from_str(s).map_err(|e| StoreError::Persistence(format!("invalid metadata: {e}")))
}

fn encode_metadata(metadata: &Metadata) -> Result<String, StoreError> {
    serde_json::to_string(metadata).map_err(|e| StoreError::Validation(format!("metadata: {e}")))
}

fn require_non_blank(value: &str, field: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

impl SessionRepository for SqliteSessionRepository {
    async fn create_session(&self, session: &NewSession) -> Result<Uuid, StoreError> {
        require_non_blank(&session.store_id, "store_id")?;
        require_non_blank(&session.user_id, "user_id")?;
        let metadata = encode_metadata(&session.metadata)?;

        let id = Uuid::now_v7();
        let now = Utc::now();
        let expires_at = self
            .retention
            .session_ttl
            .and_then(|ttl| now.checked_add_signed(ttl));

        sqlx::query(
            "INSERT INTO sessions (id, store_id, user_id, metadata, is_active, created_at, last_active_at, expires_at)
             VALUES (?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&session.store_id)
        .bind(&session.user_id)
        .bind(&metadata)
        .bind(format_datetime(&now))
        .bind(format_datetime(&now))
        .bind(expires_at.as_ref().map(format_datetime))
        .execute(&self.pool.writer)
        .await
        .map_err(sqlite_error)?;

        Ok(id)
    }

    async fn get_session(&self, session_id: &Uuid) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"))
            .bind(session_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(sqlite_error)?;

        row.map(|r| SessionRow::from_row(&r).map_err(sqlite_error)?.into_session())
            .transpose()
    }

    async fn find_active_session(
        &self,
        lookup: &SessionLookup,
    ) -> Result<Option<Uuid>, StoreError> {
        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM sessions
             WHERE store_id = ? AND user_id = ?
               AND is_active = 1
               AND deleted_at IS NULL
               AND (expires_at IS NULL OR expires_at > ?)
             ORDER BY last_active_at DESC
             LIMIT 1",
        )
        .bind(&lookup.store_id)
        .bind(&lookup.user_id)
        .bind(format_datetime(&Utc::now()))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;

        id.as_deref().map(|s| parse_uuid(s, "session id")).transpose()
    }

    async fn list_sessions(
        &self,
        store_id: &str,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Session>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE store_id = ? AND user_id = ?
             ORDER BY last_active_at DESC
             LIMIT ?"
        ))
        .bind(store_id)
        .bind(user_id)
        .bind(limit.max(0))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;

        rows.iter()
            .map(|r| SessionRow::from_row(r).map_err(sqlite_error)?.into_session())
            .collect()
    }

    async fn get_session_context(
        &self,
        session_id: &Uuid,
        message_limit: i64,
    ) -> Result<SessionContext, StoreError> {
        let session = self
            .get_session(session_id)
            .await?
            .filter(|s| s.is_live_at(Utc::now()))
            .ok_or_else(|| StoreError::session_not_found(session_id))?;

        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE session_id = ? AND is_deleted = 0
             ORDER BY sequence_number DESC
             LIMIT ?"
        ))
        .bind(session_id.to_string())
        .bind(message_limit.max(0))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(sqlite_error)?;

        let mut recent_messages = rows
            .iter()
            .map(|r| MessageRow::from_row(r).map_err(sqlite_error)?.into_message())
            .collect::<Result<Vec<_>, _>>()?;
        recent_messages.reverse();

        Ok(SessionContext {
            session,
            recent_messages,
        })
    }

    async fn save_message(&self, message: &NewMessage) -> Result<Uuid, StoreError> {
        require_non_blank(&message.content, "message content")?;
        let metadata = encode_metadata(&message.metadata)?;

        let id = Uuid::now_v7();
        let id_str = id.to_string();
        let session_id = message.session_id.to_string();
        let role = message.role.to_string();
        let content = message.content.clone();
        let token_count = message.token_count.map(i64::from);
        let response_time_ms = message
            .response_time_ms
            .map(|ms| i64::try_from(ms).unwrap_or(i64::MAX));
        let trace_id = message.trace_id.clone();
        let parent_id = message.parent_message_id.map(|p| p.to_string());
        let now = format_datetime(&Utc::now());

        let sequence_number = self
            .pool
            .with_transaction(move |conn| {
                Box::pin(async move {
                    let bumped = sqlx::query(
                        "UPDATE sessions SET last_active_at = MAX(last_active_at, ?)
                         WHERE id = ? AND deleted_at IS NULL",
                    )
                    .bind(&now)
                    .bind(&session_id)
                    .execute(&mut *conn)
                    .await
                    .map_err(sqlite_error)?;
                    if bumped.rows_affected() == 0 {
                        return Err(StoreError::session_not_found(&session_id));
                    }

                    if let Some(parent) = &parent_id {
                        let parent_exists: Option<i64> = sqlx::query_scalar(
                            "SELECT 1 FROM messages WHERE id = ? AND session_id = ?",
                        )
                        .bind(parent)
                        .bind(&session_id)
                        .fetch_optional(&mut *conn)
                        .await
                        .map_err(sqlite_error)?;
                        if parent_exists.is_none() {
                            return Err(StoreError::Validation(format!(
                                "parent message '{parent}' is not in session '{session_id}'"
                            )));
                        }
                    }

                    let sequence_number: i64 = sqlx::query_scalar(
                        "INSERT INTO messages (id, session_id, role, content, token_count, response_time_ms, trace_id, parent_message_id, metadata, sequence_number, created_at, is_deleted)
                         SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(MAX(sequence_number), 0) + 1, ?, 0
                         FROM messages WHERE session_id = ?
                         RETURNING sequence_number",
                    )
                    .bind(&id_str)
                    .bind(&session_id)
                    .bind(&role)
                    .bind(&content)
                    .bind(token_count)
                    .bind(response_time_ms)
                    .bind(&trace_id)
                    .bind(&parent_id)
                    .bind(&metadata)
                    .bind(&now)
                    .bind(&session_id)
                    .fetch_one(&mut *conn)
                    .await
                    .map_err(sqlite_error)?;

                    Ok(sequence_number)
                })
            })
            .await?;

        debug!(
            session_id = %message.session_id,
            message_id = %id,
            role = %message.role,
            sequence = sequence_number,
            "Message saved"
        );
        Ok(id)
    }

    async fn end_session(&self, session_id: &Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE sessions SET is_active = 0 WHERE id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(sqlite_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::session_not_found(session_id));
        }
        Ok(())
    }

    async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError> {
        let now = format_datetime(&Utc::now());

        self.pool
            .with_transaction(move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        "UPDATE messages SET is_deleted = 1
                         WHERE is_deleted = 0 AND session_id IN (
                             SELECT id FROM sessions
                             WHERE deleted_at IS NULL AND expires_at IS NOT NULL AND expires_at <= ?
                         )",
                    )
                    .bind(&now)
                    .execute(&mut *conn)
                    .await
                    .map_err(sqlite_error)?;

                    let result = sqlx::query(
                        "UPDATE sessions SET is_active = 0, deleted_at = ?
                         WHERE deleted_at IS NULL AND expires_at IS NOT NULL AND expires_at <= ?",
                    )
                    .bind(&now)
                    .bind(&now)
                    .execute(&mut *conn)
                    .await
                    .map_err(sqlite_error)?;

                    Ok(result.rows_affected())
                })
            })
            .await
    }

    async fn hard_delete_old_data(&self) -> Result<u64, StoreError> {
        let cutoff = Utc::now()
            .checked_sub_signed(self.retention.hard_delete_after)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let result = sqlx::query(
            "DELETE FROM sessions WHERE deleted_at IS NOT NULL AND deleted_at <= ?",
        )
        .bind(format_datetime(&cutoff))
        .execute(&self.pool.writer)
        .await
        .map_err(sqlite_error)?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.pool.ping().await
    }
}
