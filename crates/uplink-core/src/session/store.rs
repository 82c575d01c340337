use super::clock::{Clock, StampSequence, SystemClock};
use super::message::Message;
use super::model::{ChatSession, decode_sessions, encode_sessions};
use super::policy::{SendPolicy, StoreLifecycle};
use super::sink::{PersistenceSink, SESSIONS_KEY};
use crate::backend::ChatBackend;
use crate::error::{Result, UplinkError};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

/// Text of the AI message appended when a chat request fails.
pub const FAILURE_NOTICE: &str = "⚠ Signal Lost. Check Backend Connection.";

/// Result of [`SessionStore::send_message`].
///
/// Backend failures are part of the conversation, not errors: they show up
/// as [`SendOutcome::Failed`] with the appended notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The text was blank; nothing happened.
    Ignored,
    /// A send for this session was already in flight under
    /// [`SendPolicy::SingleFlight`]; nothing was appended.
    Rejected,
    /// The backend answered; this reply was appended.
    Answered(Message),
    /// The request failed; this failure notice was appended.
    Failed(Message),
    /// The session was deleted before the reply arrived; the reply was dropped.
    Discarded,
}

/// A chat request that has been issued but not yet completed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlight {
    sequence: u64,
    session_id: String,
}

struct StoreState {
    sessions: Vec<ChatSession>,
    active_session_id: String,
    lifecycle: StoreLifecycle,
    in_flight: Vec<InFlight>,
    next_sequence: u64,
    message_ids: StampSequence,
    session_ids: StampSequence,
}

impl StoreState {
    fn seeded() -> Self {
        let seed = ChatSession::default_seed();
        Self {
            active_session_id: seed.id.clone(),
            sessions: vec![seed],
            lifecycle: StoreLifecycle::Uninitialized,
            in_flight: Vec::new(),
            next_sequence: 0,
            message_ids: StampSequence::default(),
            session_ids: StampSequence::default(),
        }
    }

    fn position(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == session_id)
    }

    fn session_mut(&mut self, session_id: &str) -> Option<&mut ChatSession> {
        self.sessions.iter_mut().find(|s| s.id == session_id)
    }

    fn is_session_pending(&self, session_id: &str) -> bool {
        self.in_flight.iter().any(|r| r.session_id == session_id)
    }

    fn begin_request(&mut self, session_id: &str) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.in_flight.push(InFlight {
            sequence,
            session_id: session_id.to_string(),
        });
        sequence
    }

    fn finish_request(&mut self, sequence: u64) {
        self.in_flight.retain(|r| r.sequence != sequence);
    }

    fn fresh_session_id(&mut self, now: u64) -> String {
        loop {
            let id = self.session_ids.next(now).to_string();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }
}

/// Owns the chat sessions, the active session pointer, and their persistence.
///
/// `SessionStore` is responsible for:
/// - Loading the session collection from the sink on startup
/// - Creating, selecting and deleting sessions
/// - Appending user messages and backend replies
/// - Writing the whole collection back after every mutation
///
/// The store is built once per application instance and shared by reference
/// (typically inside an `Arc`). All state sits behind one mutex that is never
/// held across a backend call, so overlapping sends interleave their replies
/// in completion order.
pub struct SessionStore {
    state: Mutex<StoreState>,
    sink: Arc<dyn PersistenceSink>,
    backend: Arc<dyn ChatBackend>,
    clock: Arc<dyn Clock>,
    policy: SendPolicy,
    idle: Notify,
}

impl SessionStore {
    /// Creates a store holding the built-in seed session.
    ///
    /// Nothing is read or written until [`SessionStore::initialize`] runs.
    ///
    /// # Arguments
    ///
    /// * `sink` - Where the session collection is persisted
    /// * `backend` - Where chat queries are sent
    pub fn new(sink: Arc<dyn PersistenceSink>, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            state: Mutex::new(StoreState::seeded()),
            sink,
            backend,
            clock: Arc::new(SystemClock),
            policy: SendPolicy::default(),
            idle: Notify::new(),
        }
    }

    /// Sets how overlapping sends for one session are handled.
    pub fn with_policy(mut self, policy: SendPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the time source used for ids and timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The configured send policy.
    pub fn policy(&self) -> SendPolicy {
        self.policy
    }

    /// Reads the persisted collection and enables persistence.
    ///
    /// A non-empty, well-formed array replaces the in-memory collection and
    /// its first entry becomes active. Missing, empty, or malformed data
    /// leaves the seed in place and is logged, never returned.
    ///
    /// If the sink itself fails, the store moves to
    /// [`StoreLifecycle::Degraded`]: nothing is written, so storage that
    /// could not be read is never overwritten, and a later call retries the
    /// read. Once storage has been read, later calls return the current
    /// lifecycle untouched.
    pub async fn initialize(&self) -> StoreLifecycle {
        let mut state = self.state.lock().await;
        if state.lifecycle.persists() {
            return state.lifecycle;
        }

        match self.sink.read(SESSIONS_KEY).await {
            Ok(Some(bytes)) => match decode_sessions(&bytes) {
                Ok(sessions) if !sessions.is_empty() => {
                    tracing::info!(count = sessions.len(), "Restored saved sessions");
                    state.active_session_id = sessions[0].id.clone();
                    state.sessions = sessions;
                }
                Ok(_) => tracing::debug!("Saved session list is empty, keeping default"),
                Err(e) => tracing::warn!(error = %e, "Failed to parse saved sessions"),
            },
            Ok(None) => tracing::debug!("No saved sessions found"),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read saved sessions, persistence disabled");
                state.lifecycle = StoreLifecycle::Degraded;
                return state.lifecycle;
            }
        }

        state.lifecycle = StoreLifecycle::Loaded;
        state.lifecycle
    }

    /// Creates a new session at the front of the collection and makes it active.
    ///
    /// # Returns
    ///
    /// The id of the new session.
    pub async fn create_session(&self) -> String {
        let mut state = self.state.lock().await;
        let now = self.clock.now_millis();
        let id = state.fresh_session_id(now);

        state.sessions.insert(0, ChatSession::new_thread(id.clone(), now));
        state.active_session_id = id.clone();
        tracing::debug!(session_id = %id, "Created session");

        self.persist_after_mutation(&mut state).await;
        id
    }

    /// Makes `session_id` the active session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no session has that id; nothing changes.
    pub async fn select_session(&self, session_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.position(session_id).is_none() {
            return Err(UplinkError::not_found("Session", session_id));
        }
        state.active_session_id = session_id.to_string();
        Ok(())
    }

    /// Removes a session.
    ///
    /// If the removed session was active, the first remaining session
    /// becomes active.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if it is the only session left
    /// - `NotFound` if no session has that id
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.sessions.len() <= 1 {
            return Err(UplinkError::invalid_operation(
                "cannot delete the last remaining session",
            ));
        }
        let index = state
            .position(session_id)
            .ok_or_else(|| UplinkError::not_found("Session", session_id))?;

        state.sessions.remove(index);
        if state.active_session_id == session_id {
            state.active_session_id = state.sessions[0].id.clone();
        }
        tracing::debug!(session_id, "Deleted session");

        self.persist_after_mutation(&mut state).await;
        Ok(())
    }

    /// Sends `text` in the session `session_id` and appends the reply.
    ///
    /// The user message is appended (and persisted) before the backend is
    /// called. The reply goes to the session identified here, even if the
    /// user has switched sessions meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no session has that id. Backend failures are
    /// never returned; see [`SendOutcome::Failed`].
    pub async fn send_message(&self, session_id: &str, text: &str) -> Result<SendOutcome> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let sequence = {
            let mut state = self.state.lock().await;
            let index = state
                .position(session_id)
                .ok_or_else(|| UplinkError::not_found("Session", session_id))?;

            if self.policy == SendPolicy::SingleFlight && state.is_session_pending(session_id) {
                tracing::info!(session_id, "Send rejected, a request is already in flight");
                return Ok(SendOutcome::Rejected);
            }

            let id = state.message_ids.next(self.clock.now_millis());
            state.sessions[index].push_user_message(Message::user(id, text));
            let sequence = state.begin_request(session_id);

            self.persist_after_mutation(&mut state).await;
            sequence
        };

        tracing::debug!(session_id, sequence, "Chat request issued");
        let result = self.backend.chat(text).await;

        let mut state = self.state.lock().await;
        state.finish_request(sequence);
        if state.in_flight.is_empty() {
            self.idle.notify_waiters();
        }

        let id = state.message_ids.next(self.clock.now_millis());
        let (reply, answered) = match result {
            Ok(reply) => (Message::ai(id, reply.response, reply.sources), true),
            Err(e) => {
                tracing::warn!(session_id, sequence, error = %e, "Chat request failed");
                (Message::ai(id, FAILURE_NOTICE, None), false)
            }
        };

        let Some(session) = state.session_mut(session_id) else {
            tracing::warn!(session_id, sequence, "Session deleted before reply arrived");
            return Ok(SendOutcome::Discarded);
        };
        session.messages.push(reply.clone());

        self.persist_after_mutation(&mut state).await;
        Ok(if answered {
            SendOutcome::Answered(reply)
        } else {
            SendOutcome::Failed(reply)
        })
    }

    /// Writes the whole collection to the sink.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` until [`SessionStore::initialize`] has read the
    ///   sink, so the seed never overwrites storage that has not been read
    /// - Any error reported by the sink
    pub async fn persist(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.lifecycle.persists() {
            return Err(UplinkError::invalid_operation(
                "saved sessions have not been read",
            ));
        }
        self.write_through(&mut state).await
    }

    async fn write_through(&self, state: &mut StoreState) -> Result<()> {
        let bytes = encode_sessions(&state.sessions)?;
        self.sink.write(SESSIONS_KEY, &bytes).await?;
        state.lifecycle = StoreLifecycle::Ready;
        Ok(())
    }

    /// Persists after a mutation; failures are logged and memory is kept.
    async fn persist_after_mutation(&self, state: &mut StoreState) {
        if !state.lifecycle.persists() {
            return;
        }
        if let Err(e) = self.write_through(state).await {
            tracing::error!(error = %e, "Failed to persist sessions");
        }
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// A snapshot of all sessions, most recently created first.
    pub async fn sessions(&self) -> Vec<ChatSession> {
        self.state.lock().await.sessions.clone()
    }

    /// A snapshot of one session.
    pub async fn session(&self, session_id: &str) -> Option<ChatSession> {
        let state = self.state.lock().await;
        state.sessions.iter().find(|s| s.id == session_id).cloned()
    }

    /// The id of the active session.
    pub async fn active_session_id(&self) -> String {
        self.state.lock().await.active_session_id.clone()
    }

    /// A snapshot of the active session.
    pub async fn active_session(&self) -> ChatSession {
        let state = self.state.lock().await;
        state
            .sessions
            .iter()
            .find(|s| s.id == state.active_session_id)
            .unwrap_or(&state.sessions[0])
            .clone()
    }

    /// Number of sessions in the collection.
    pub async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Whether any chat request is in flight.
    pub async fn is_pending(&self) -> bool {
        !self.state.lock().await.in_flight.is_empty()
    }

    /// Number of chat requests in flight.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Whether a chat request for `session_id` is in flight.
    pub async fn is_session_pending(&self, session_id: &str) -> bool {
        self.state.lock().await.is_session_pending(session_id)
    }

    /// Resolves once no chat request is in flight.
    ///
    /// Returns immediately when the store is already idle. Callers that must
    /// not wait forever wrap this in a timeout.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.state.lock().await.in_flight.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Current initialization lifecycle.
    pub async fn lifecycle(&self) -> StoreLifecycle {
        self.state.lock().await.lifecycle
    }
}
