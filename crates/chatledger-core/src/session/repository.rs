//! SessionRepository trait definition.
//!
//! Sole owner of the write paths for sessions and messages. Follows the
//! RPITIT pattern used by every repository trait in this crate.

use chatledger_types::chat::{NewMessage, NewSession, Session, SessionContext, SessionLookup};
use chatledger_types::error::StoreError;
use uuid::Uuid;

/// Repository trait for session lifecycle and ordered message persistence.
///
/// Implementations live in chatledger-infra (e.g., `SqliteSessionRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionRepository: Send + Sync {
    /// Create a new active session and return its generated id.
    fn create_session(
        &self,
        session: &NewSession,
    ) -> impl std::future::Future<Output = Result<Uuid, StoreError>> + Send;

    /// Get a session row by id regardless of liveness.
    fn get_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Session>, StoreError>> + Send;

    /// Most recently active live session for a store/user pair.
    ///
    /// Never creates a session; "resume-or-create" is the caller's choice.
    fn find_active_session(
        &self,
        lookup: &SessionLookup,
    ) -> impl std::future::Future<Output = Result<Option<Uuid>, StoreError>> + Send;

    /// Sessions for a store/user pair, most recently active first, including
    /// sessions that are no longer live.
    fn list_sessions(
        &self,
        store_id: &str,
        user_id: &str,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, StoreError>> + Send;

    /// A live session plus its `message_limit` most recent non-deleted
    /// messages in ascending sequence order.
    ///
    /// Returns `StoreError::NotFound` if the session is absent or not live.
    fn get_session_context(
        &self,
        session_id: &Uuid,
        message_limit: i64,
    ) -> impl std::future::Future<Output = Result<SessionContext, StoreError>> + Send;

    /// Persist one message in a single transaction that also bumps the
    /// session's `last_active_at`. Returns the new message id.
    fn save_message(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<Uuid, StoreError>> + Send;

    /// Deactivate a session without deleting it.
    fn end_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Soft-delete sessions past their expiry. Returns the number affected.
    fn cleanup_expired_sessions(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Physically remove sessions soft-deleted longer ago than the retention
    /// window, cascading to their messages. Returns the number removed.
    fn hard_delete_old_data(
        &self,
    ) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;

    /// Lightweight database round-trip.
    fn ping(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
