//! Chat tracker facade.
//!
//! `ChatTracker` composes the session store, the analytics aggregator and
//! the trace forwarder. Its one piece of real logic is
//! [`ChatTracker::log_chat_interaction`]: two durable message writes that
//! must succeed, followed by a best-effort trace forward that runs in the
//! background and can never fail the call. Everything else is delegation
//! with parameter defaults.

use std::sync::Arc;
use std::time::Instant;

use chatledger_types::analytics::{PerformanceMetrics, SessionStats, StoreDailyStats};
use chatledger_types::chat::{
    ChatInteraction, ChatReply, InteractionRecord, Metadata, NewMessage, NewSession, Session,
    SessionContext, SessionLookup,
};
use chatledger_types::error::{StoreError, TrackerError};
use chatledger_types::health::HealthStatus;
use chatledger_types::llm::ChatTurn;
use chatledger_types::trace::{InteractionTrace, TraceRun, UserFeedback};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analytics::repository::AnalyticsRepository;
use crate::analytics::tokens::calculate_tokens;
use crate::llm::provider::ModelProvider;
use crate::session::repository::SessionRepository;
use crate::trace::forwarder::{TraceForwarder, op_run};
use crate::trace::sink::TraceSink;

/// Messages returned by `get_session_context` when no limit is given.
pub const DEFAULT_CONTEXT_LIMIT: i64 = 5;

/// Trailing window for `get_performance_metrics` when none is given.
pub const DEFAULT_METRICS_WINDOW_DAYS: u32 = 7;

/// Run name for model calls made by `respond`.
pub const COMPLETION_RUN_NAME: &str = "model_completion";

/// Metadata key under which token usage is stored on assistant messages.
pub const TOKEN_USAGE_KEY: &str = "token_usage";

/// Facade over session persistence, analytics and trace forwarding.
///
/// Generic over the repository and sink traits so that chatledger-core
/// never depends on chatledger-infra.
pub struct ChatTracker<R: SessionRepository, A: AnalyticsRepository, S: TraceSink + 'static> {
    sessions: R,
    analytics: A,
    forwarder: Arc<TraceForwarder<S>>,
    background: TaskTracker,
}

impl<R, A, S> ChatTracker<R, A, S>
where
    R: SessionRepository,
    A: AnalyticsRepository,
    S: TraceSink + 'static,
{
    pub fn new(sessions: R, analytics: A, forwarder: TraceForwarder<S>) -> Self {
        Self {
            sessions,
            analytics,
            forwarder: Arc::new(forwarder),
            background: TaskTracker::new(),
        }
    }

    pub fn sessions(&self) -> &R {
        &self.sessions
    }

    pub fn analytics(&self) -> &A {
        &self.analytics
    }

    pub fn forwarder(&self) -> &TraceForwarder<S> {
        &self.forwarder
    }

    // --- Session lifecycle ---

    pub async fn create_session(&self, session: &NewSession) -> Result<Uuid, StoreError> {
        let id = self.sessions.create_session(session).await?;
        info!(session_id = %id, store_id = %session.store_id, "Session created");
        Ok(id)
    }

    pub async fn find_active_session(
        &self,
        lookup: &SessionLookup,
    ) -> Result<Option<Uuid>, StoreError> {
        self.sessions.find_active_session(lookup).await
    }

    pub async fn get_session(&self, session_id: &Uuid) -> Result<Option<Session>, StoreError> {
        self.sessions.get_session(session_id).await
    }

    pub async fn list_sessions(
        &self,
        store_id: &str,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Session>, StoreError> {
        self.sessions.list_sessions(store_id, user_id, limit).await
    }

    /// Live session plus recent messages; `limit` defaults to
    /// [`DEFAULT_CONTEXT_LIMIT`].
    pub async fn get_session_context(
        &self,
        session_id: &Uuid,
        limit: Option<i64>,
    ) -> Result<SessionContext, StoreError> {
        self.sessions
            .get_session_context(session_id, limit.unwrap_or(DEFAULT_CONTEXT_LIMIT))
            .await
    }

    pub async fn end_session(&self, session_id: &Uuid) -> Result<(), StoreError> {
        self.sessions.end_session(session_id).await?;
        info!(session_id = %session_id, "Session ended");
        Ok(())
    }

    // --- Interaction logging ---

    /// Persist a user/assistant message pair, then forward the interaction
    /// to the trace sink in the background.
    ///
    /// Both texts are checked before the first write, so a blank user
    /// message or reply fails without touching storage. The two messages are
    /// then written in two separate transactions: if the assistant write
    /// fails the user message stays durable and the error is returned. The
    /// trace forward starts only after both writes succeed and its failure is
    /// only logged.
    #[tracing::instrument(
        name = "log_chat_interaction",
        skip(self, interaction),
        fields(session_id = %interaction.session_id)
    )]
    pub async fn log_chat_interaction(
        &self,
        interaction: ChatInteraction,
    ) -> Result<InteractionRecord, StoreError> {
        require_content(&interaction.user_message, "user message")?;
        require_content(&interaction.assistant_response, "assistant response")?;
        let usage = interaction.token_usage.as_ref();

        let mut user_message = NewMessage::user(interaction.session_id, &interaction.user_message);
        user_message.token_count = Some(
            usage
                .and_then(|u| u.prompt_tokens)
                .unwrap_or_else(|| calculate_tokens(Some(&interaction.user_message))),
        );
        let user_message_id = self.sessions.save_message(&user_message).await?;

        let mut metadata = interaction.business_metadata.clone().unwrap_or_default();
        if let Some(usage) = usage {
            metadata.insert(
                TOKEN_USAGE_KEY.to_string(),
                json!({
                    "prompt_tokens": usage.prompt_tokens,
                    "completion_tokens": usage.completion_tokens,
                    "total_tokens": usage.total_tokens,
                }),
            );
        }

        let mut assistant_message =
            NewMessage::assistant(interaction.session_id, &interaction.assistant_response);
        assistant_message.token_count = Some(
            usage
                .and_then(|u| u.completion_tokens)
                .unwrap_or_else(|| calculate_tokens(Some(&interaction.assistant_response))),
        );
        assistant_message.response_time_ms = interaction.response_time_ms;
        assistant_message.trace_id = interaction.trace_id.clone();
        assistant_message.parent_message_id = Some(user_message_id);
        assistant_message.metadata = metadata;
        let assistant_message_id = self.sessions.save_message(&assistant_message).await?;

        info!(
            user_message_id = %user_message_id,
            assistant_message_id = %assistant_message_id,
            "Chat interaction logged"
        );

        self.forward_in_background(InteractionTrace {
            session_id: interaction.session_id,
            user_message: interaction.user_message,
            assistant_response: interaction.assistant_response,
            token_usage: interaction.token_usage,
            response_time_ms: interaction.response_time_ms,
            trace_id: interaction.trace_id,
            business_metadata: interaction.business_metadata,
            timestamp: Utc::now(),
        });

        Ok(InteractionRecord {
            user_message_id,
            assistant_message_id,
        })
    }

    /// Generate a reply with `provider` from the session's recent context,
    /// then log the exchange with the measured latency.
    ///
    /// Latency covers the provider call alone. The `model_completion` run is
    /// recorded in the background like interaction traces. Nothing is
    /// persisted when the provider fails.
    #[tracing::instrument(
        name = "respond",
        skip(self, provider, user_message, business_metadata),
        fields(session_id = %session_id, provider = provider.name())
    )]
    pub async fn respond<P: ModelProvider>(
        &self,
        provider: &P,
        session_id: Uuid,
        user_message: &str,
        business_metadata: Option<Metadata>,
    ) -> Result<ChatReply, TrackerError> {
        require_content(user_message, "user message")?;

        let context = self
            .sessions
            .get_session_context(&session_id, DEFAULT_CONTEXT_LIMIT)
            .await?;

        let mut turns: Vec<ChatTurn> = context.recent_messages.iter().map(ChatTurn::from).collect();
        turns.push(ChatTurn::user(user_message));

        let start_time = Utc::now();
        let started = Instant::now();
        let result = provider.complete(&turns).await;
        let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if self.forwarder.is_enabled() {
            let inputs = json!({
                "provider": provider.name(),
                "session_id": session_id,
                "turns": turns,
            });
            self.record_in_background(op_run(COMPLETION_RUN_NAME, inputs, start_time, &result));
        }
        let completion = result?;
        debug!(response_time_ms, "Model completion received");

        let interaction = ChatInteraction {
            session_id,
            user_message: user_message.to_string(),
            assistant_response: completion.content.clone(),
            token_usage: completion.usage.clone(),
            response_time_ms: Some(response_time_ms),
            trace_id: None,
            business_metadata,
        };
        let record = self.log_chat_interaction(interaction).await?;

        Ok(ChatReply {
            content: completion.content,
            record,
            response_time_ms,
            token_usage: completion.usage,
        })
    }

    /// Forward user feedback. Best-effort: failures are only logged.
    pub async fn add_user_feedback(&self, feedback: &UserFeedback) {
        self.forwarder.track_feedback(feedback).await;
    }

    // --- Analytics ---

    pub async fn get_session_stats(&self, session_id: &Uuid) -> Result<SessionStats, StoreError> {
        self.analytics.session_stats(session_id).await
    }

    pub async fn get_store_daily_stats(
        &self,
        store_id: &str,
        date: NaiveDate,
    ) -> Result<StoreDailyStats, StoreError> {
        self.analytics.store_daily_stats(store_id, date).await
    }

    /// Window defaults to [`DEFAULT_METRICS_WINDOW_DAYS`].
    pub async fn get_performance_metrics(
        &self,
        store_id: &str,
        days: Option<u32>,
    ) -> Result<PerformanceMetrics, StoreError> {
        self.analytics
            .performance_metrics(store_id, days.unwrap_or(DEFAULT_METRICS_WINDOW_DAYS))
            .await
    }

    // --- Maintenance ---

    pub async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError> {
        let count = self.sessions.cleanup_expired_sessions().await?;
        info!(count, "Expired sessions cleaned up");
        Ok(count)
    }

    pub async fn hard_delete_old_data(&self) -> Result<u64, StoreError> {
        let count = self.sessions.hard_delete_old_data().await?;
        info!(count, "Old sessions purged");
        Ok(count)
    }

    /// Probe the database and the trace sink.
    pub async fn get_health_status(&self) -> HealthStatus {
        let database_ok = match self.sessions.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database health probe failed");
                false
            }
        };
        let trace_ok = self.forwarder.check_connectivity().await;
        HealthStatus::from_probes(database_ok, trace_ok)
    }

    /// Stop accepting background work and wait for in-flight trace forwards.
    pub async fn shutdown(&self) {
        self.background.close();
        self.background.wait().await;
        debug!("Chat tracker background tasks drained");
    }

    fn record_in_background(&self, run: TraceRun) {
        let forwarder = Arc::clone(&self.forwarder);
        self.background.spawn(async move {
            forwarder.track_run(&run).await;
        });
    }

    fn forward_in_background(&self, trace: InteractionTrace) {
        if !self.forwarder.is_enabled() {
            return;
        }
        let forwarder = Arc::clone(&self.forwarder);
        self.background.spawn(async move {
            forwarder.track_interaction(&trace).await;
        });
    }
}

fn require_content(text: &str, field: &str) -> Result<(), StoreError> {
    if text.trim().is_empty() {
        return Err(StoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chatledger_types::analytics::{LatencyPercentiles, TokenUsageStats};
    use chatledger_types::chat::{Message, MessageRole, TokenUsage};
    use chatledger_types::error::{ForwardingError, ProviderError};
    use chatledger_types::health::{ConnectionState, ServiceState};
    use chatledger_types::llm::Completion;

    // --- In-memory fakes ---

    #[derive(Default)]
    struct MemorySessions {
        sessions: Mutex<HashMap<Uuid, Session>>,
        messages: Mutex<Vec<Message>>,
        /// Fail every `save_message` whose role matches.
        fail_role: Option<MessageRole>,
    }

    impl SessionRepository for MemorySessions {
        async fn create_session(&self, new: &NewSession) -> Result<Uuid, StoreError> {
            let now = Utc::now();
            let id = Uuid::now_v7();
            self.sessions.lock().unwrap().insert(
                id,
                Session {
                    id,
                    store_id: new.store_id.clone(),
                    user_id: new.user_id.clone(),
                    metadata: new.metadata.clone(),
                    is_active: true,
                    created_at: now,
                    last_active_at: now,
                    expires_at: None,
                    deleted_at: None,
                },
            );
            Ok(id)
        }

        async fn get_session(&self, id: &Uuid) -> Result<Option<Session>, StoreError> {
            Ok(self.sessions.lock().unwrap().get(id).cloned())
        }

        async fn find_active_session(
            &self,
            lookup: &SessionLookup,
        ) -> Result<Option<Uuid>, StoreError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.store_id == lookup.store_id && s.user_id == lookup.user_id)
                .filter(|s| s.is_live())
                .max_by_key(|s| s.last_active_at)
                .map(|s| s.id))
        }

        async fn list_sessions(
            &self,
            store_id: &str,
            user_id: &str,
            _limit: i64,
        ) -> Result<Vec<Session>, StoreError> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.store_id == store_id && s.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn get_session_context(
            &self,
            id: &Uuid,
            limit: i64,
        ) -> Result<SessionContext, StoreError> {
            let session = self
                .sessions
                .lock()
                .unwrap()
                .get(id)
                .filter(|s| s.is_live())
                .cloned()
                .ok_or_else(|| StoreError::session_not_found(id))?;
            let messages: Vec<Message> = self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.session_id == *id)
                .cloned()
                .collect();
            let skip = messages.len().saturating_sub(limit as usize);
            Ok(SessionContext {
                session,
                recent_messages: messages.into_iter().skip(skip).collect(),
            })
        }

        async fn save_message(&self, new: &NewMessage) -> Result<Uuid, StoreError> {
            if self.fail_role == Some(new.role) {
                return Err(StoreError::Persistence("disk full".to_string()));
            }
            if !self.sessions.lock().unwrap().contains_key(&new.session_id) {
                return Err(StoreError::session_not_found(new.session_id));
            }
            let mut messages = self.messages.lock().unwrap();
            let sequence_number = messages
                .iter()
                .filter(|m| m.session_id == new.session_id)
                .map(|m| m.sequence_number)
                .max()
                .unwrap_or(0)
                + 1;
            let id = Uuid::now_v7();
            messages.push(Message {
                id,
                session_id: new.session_id,
                role: new.role,
                content: new.content.clone(),
                token_count: new.token_count,
                response_time_ms: new.response_time_ms,
                trace_id: new.trace_id.clone(),
                parent_message_id: new.parent_message_id,
                metadata: new.metadata.clone(),
                sequence_number,
                created_at: Utc::now(),
                is_deleted: false,
            });
            Ok(id)
        }

        async fn end_session(&self, id: &Uuid) -> Result<(), StoreError> {
            let mut sessions = self.sessions.lock().unwrap();
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| StoreError::session_not_found(id))?;
            session.is_active = false;
            Ok(())
        }

        async fn cleanup_expired_sessions(&self) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn hard_delete_old_data(&self) -> Result<u64, StoreError> {
            Ok(0)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct NoAnalytics;

    impl AnalyticsRepository for NoAnalytics {
        async fn session_stats(&self, id: &Uuid) -> Result<SessionStats, StoreError> {
            Ok(SessionStats::empty(*id))
        }

        async fn store_daily_stats(
            &self,
            store_id: &str,
            date: NaiveDate,
        ) -> Result<StoreDailyStats, StoreError> {
            Ok(StoreDailyStats {
                store_id: store_id.to_string(),
                date,
                session_count: 0,
                message_count: 0,
                total_tokens: 0,
                avg_response_time: 0.0,
                top_categories: Vec::new(),
            })
        }

        async fn performance_metrics(
            &self,
            store_id: &str,
            days: u32,
        ) -> Result<PerformanceMetrics, StoreError> {
            Ok(PerformanceMetrics {
                store_id: store_id.to_string(),
                window_days: days,
                avg_response_time: 0.0,
                percentiles: LatencyPercentiles::default(),
                token_usage_stats: TokenUsageStats::default(),
                error_rate: 0.0,
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        runs: Mutex<Vec<TraceRun>>,
        always_fail: bool,
        /// Hold every `record_run` this long before answering.
        delay: Option<std::time::Duration>,
    }

    impl TraceSink for RecordingSink {
        fn project_name(&self) -> &str {
            "rag-chatbot"
        }

        async fn record_run(&self, run: &TraceRun) -> Result<(), ForwardingError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.always_fail {
                return Err(ForwardingError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.runs.lock().unwrap().push(run.clone());
            Ok(())
        }

        async fn record_feedback(&self, _feedback: &UserFeedback) -> Result<(), ForwardingError> {
            if self.always_fail {
                return Err(ForwardingError::Request("refused".to_string()));
            }
            Ok(())
        }

        async fn project_exists(&self, _name: &str) -> Result<bool, ForwardingError> {
            if self.always_fail {
                return Err(ForwardingError::Request("refused".to_string()));
            }
            Ok(true)
        }
    }

    struct CannedProvider {
        reply: Result<&'static str, ()>,
    }

    impl ModelProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _turns: &[ChatTurn]) -> Result<Completion, ProviderError> {
            match self.reply {
                Ok(text) => Ok(Completion {
                    content: text.to_string(),
                    usage: Some(TokenUsage {
                        prompt_tokens: Some(11),
                        completion_tokens: Some(7),
                        total_tokens: Some(18),
                    }),
                }),
                Err(()) => Err(ProviderError::RateLimited),
            }
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![0.0; 4])
        }
    }

    type Tracker = ChatTracker<MemorySessions, NoAnalytics, RecordingSink>;

    fn tracker(sessions: MemorySessions, sink: RecordingSink) -> Tracker {
        ChatTracker::new(sessions, NoAnalytics, TraceForwarder::new(sink))
    }

    async fn new_session(tracker: &Tracker) -> Uuid {
        tracker
            .create_session(&NewSession::new("store_test", "user_test"))
            .await
            .unwrap()
    }

    // --- Tests ---

    #[tokio::test]
    async fn log_interaction_writes_linked_pair() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let sid = new_session(&tracker).await;

        let record = tracker
            .log_chat_interaction(ChatInteraction::new(sid, "hi", "hello there"))
            .await
            .unwrap();

        let ctx = tracker.get_session_context(&sid, Some(10)).await.unwrap();
        assert_eq!(ctx.recent_messages.len(), 2);
        let (user, assistant) = (&ctx.recent_messages[0], &ctx.recent_messages[1]);
        assert_eq!(user.id, record.user_message_id);
        assert_eq!(user.role, MessageRole::User);
        assert_eq!(user.token_count, Some(2));
        assert_eq!(assistant.id, record.assistant_message_id);
        assert_eq!(assistant.parent_message_id, Some(user.id));
        assert_eq!(assistant.token_count, Some(3));
        assert_eq!([user.sequence_number, assistant.sequence_number], [1, 2]);
    }

    #[tokio::test]
    async fn supplied_usage_overrides_estimate_and_lands_in_metadata() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let sid = new_session(&tracker).await;

        let mut business = Metadata::new();
        business.insert("category".to_string(), json!("shipping"));
        let mut interaction = ChatInteraction::new(sid, "where is my order", "on its way");
        interaction.token_usage = Some(TokenUsage {
            prompt_tokens: Some(40),
            completion_tokens: Some(12),
            total_tokens: Some(52),
        });
        interaction.response_time_ms = Some(850);
        interaction.trace_id = Some("run-abc".to_string());
        interaction.business_metadata = Some(business);

        tracker.log_chat_interaction(interaction).await.unwrap();

        let ctx = tracker.get_session_context(&sid, None).await.unwrap();
        let user = &ctx.recent_messages[0];
        let assistant = &ctx.recent_messages[1];
        assert_eq!(user.token_count, Some(40));
        assert_eq!(assistant.token_count, Some(12));
        assert_eq!(assistant.response_time_ms, Some(850));
        assert_eq!(assistant.trace_id.as_deref(), Some("run-abc"));
        assert_eq!(assistant.metadata["category"], "shipping");
        assert_eq!(assistant.metadata[TOKEN_USAGE_KEY]["total_tokens"], 52);
    }

    #[tokio::test]
    async fn interaction_is_forwarded_after_shutdown_drains() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let sid = new_session(&tracker).await;

        tracker
            .log_chat_interaction(ChatInteraction::new(sid, "hi", "hello"))
            .await
            .unwrap();
        tracker.shutdown().await;

        let runs = tracker.forwarder().sink().unwrap().runs.lock().unwrap().clone();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].inputs["user_message"], "hi");
    }

    #[tokio::test]
    async fn failing_sink_does_not_fail_logging() {
        let tracker = tracker(
            MemorySessions::default(),
            RecordingSink {
                always_fail: true,
                ..Default::default()
            },
        );
        let sid = new_session(&tracker).await;

        tracker
            .log_chat_interaction(ChatInteraction::new(sid, "hi", "hello"))
            .await
            .unwrap();
        tracker.add_user_feedback(&UserFeedback::new("run-1", 1.0)).await;
        tracker.shutdown().await;

        let ctx = tracker.get_session_context(&sid, None).await.unwrap();
        assert_eq!(ctx.recent_messages.len(), 2);
    }

    #[tokio::test]
    async fn assistant_write_failure_keeps_user_message_and_skips_forward() {
        let sessions = MemorySessions {
            fail_role: Some(MessageRole::Assistant),
            ..Default::default()
        };
        let tracker = tracker(sessions, RecordingSink::default());
        let sid = new_session(&tracker).await;

        let err = tracker
            .log_chat_interaction(ChatInteraction::new(sid, "hi", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        tracker.shutdown().await;

        let ctx = tracker.get_session_context(&sid, None).await.unwrap();
        assert_eq!(ctx.recent_messages.len(), 1);
        assert_eq!(ctx.recent_messages[0].role, MessageRole::User);
        assert!(tracker.forwarder().sink().unwrap().runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_reply_fails_before_any_write() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let sid = new_session(&tracker).await;

        let err = tracker
            .log_chat_interaction(ChatInteraction::new(sid, "hi", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        tracker.shutdown().await;

        let ctx = tracker.get_session_context(&sid, Some(10)).await.unwrap();
        assert!(ctx.recent_messages.is_empty());
        assert!(tracker.forwarder().sink().unwrap().runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_session_fails_durable_step() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let err = tracker
            .log_chat_interaction(ChatInteraction::new(Uuid::now_v7(), "hi", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn respond_logs_reply_with_provider_usage() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let sid = new_session(&tracker).await;
        let provider = CannedProvider {
            reply: Ok("Happy to help."),
        };

        let reply = tracker.respond(&provider, sid, "hello", None).await.unwrap();
        assert_eq!(reply.content, "Happy to help.");

        let ctx = tracker.get_session_context(&sid, None).await.unwrap();
        assert_eq!(ctx.recent_messages.len(), 2);
        assert_eq!(ctx.recent_messages[0].token_count, Some(11));
        assert_eq!(ctx.recent_messages[1].token_count, Some(7));
        assert_eq!(ctx.recent_messages[1].id, reply.record.assistant_message_id);
        assert_eq!(
            ctx.recent_messages[1].response_time_ms,
            Some(reply.response_time_ms)
        );

        tracker.shutdown().await;
        let runs = tracker.forwarder().sink().unwrap().runs.lock().unwrap().clone();
        assert!(runs.iter().any(|r| r.name == "model_completion"));
        assert!(runs.iter().any(|r| r.name == "chat_interaction"));
    }

    #[tokio::test]
    async fn respond_latency_excludes_slow_sink() {
        let sink = RecordingSink {
            delay: Some(std::time::Duration::from_millis(800)),
            ..Default::default()
        };
        let tracker = tracker(MemorySessions::default(), sink);
        let sid = new_session(&tracker).await;
        let provider = CannedProvider { reply: Ok("Sure.") };

        let started = Instant::now();
        let reply = tracker.respond(&provider, sid, "hello", None).await.unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(800));
        assert!(reply.response_time_ms < 800);

        let ctx = tracker.get_session_context(&sid, None).await.unwrap();
        assert_eq!(
            ctx.recent_messages[1].response_time_ms,
            Some(reply.response_time_ms)
        );

        tracker.shutdown().await;
        let runs = tracker.forwarder().sink().unwrap().runs.lock().unwrap().clone();
        assert!(runs.iter().any(|r| r.name == COMPLETION_RUN_NAME));
    }

    #[tokio::test]
    async fn respond_provider_failure_persists_nothing() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let sid = new_session(&tracker).await;
        let provider = CannedProvider { reply: Err(()) };

        let err = tracker.respond(&provider, sid, "hello", None).await.unwrap_err();
        assert!(matches!(err, TrackerError::Provider(ProviderError::RateLimited)));

        let ctx = tracker.get_session_context(&sid, None).await.unwrap();
        assert!(ctx.recent_messages.is_empty());
    }

    #[tokio::test]
    async fn respond_rejects_blank_message_before_io() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let provider = CannedProvider { reply: Ok("x") };
        let err = tracker
            .respond(&provider, Uuid::now_v7(), "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Store(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn ended_session_is_not_live() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let sid = new_session(&tracker).await;
        let lookup = SessionLookup {
            store_id: "store_test".to_string(),
            user_id: "user_test".to_string(),
        };
        assert_eq!(tracker.find_active_session(&lookup).await.unwrap(), Some(sid));

        tracker.end_session(&sid).await.unwrap();
        assert_eq!(tracker.find_active_session(&lookup).await.unwrap(), None);
        assert!(matches!(
            tracker.get_session_context(&sid, None).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn metrics_window_defaults_to_seven_days() {
        let tracker = tracker(MemorySessions::default(), RecordingSink::default());
        let metrics = tracker.get_performance_metrics("store_test", None).await.unwrap();
        assert_eq!(metrics.window_days, DEFAULT_METRICS_WINDOW_DAYS);
        assert_eq!(metrics.error_rate, 0.0);
    }

    #[tokio::test]
    async fn health_reports_probe_results() {
        let healthy = tracker(MemorySessions::default(), RecordingSink::default());
        let status = healthy.get_health_status().await;
        assert_eq!(status.database, ConnectionState::Connected);
        assert_eq!(status.trace, ConnectionState::Connected);
        assert_eq!(status.services.monitoring, ServiceState::Active);

        let degraded = tracker(
            MemorySessions::default(),
            RecordingSink {
                always_fail: true,
                ..Default::default()
            },
        );
        let status = degraded.get_health_status().await;
        assert_eq!(status.trace, ConnectionState::Disconnected);
        assert_eq!(status.services.monitoring, ServiceState::Degraded);
        assert_eq!(status.services.session, ServiceState::Active);
    }
}
