use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use uplink_core::backend::{BackendError, ChatBackend, ChatReply};
use uplink_core::error::{Result, UplinkError};
use uplink_core::session::{
    ChatSession, DEFAULT_SESSION_ID, FAILURE_NOTICE, NEW_SESSION_TITLE,
    PersistenceSink, SESSIONS_KEY, SendOutcome, SendPolicy, SessionStore, StoreLifecycle,
    decode_sessions, encode_sessions,
};

// Mock sink for testing
#[derive(Default)]
struct MemorySink {
    values: Mutex<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
}

impl MemorySink {
    fn with_value(value: &[u8]) -> Self {
        let sink = Self::default();
        sink.values
            .lock()
            .unwrap()
            .insert(SESSIONS_KEY.to_string(), value.to_vec());
        sink
    }

    fn stored(&self) -> Option<Vec<ChatSession>> {
        let values = self.values.lock().unwrap();
        values.get(SESSIONS_KEY).map(|b| decode_sessions(b).unwrap())
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(UplinkError::persistence("disk unavailable"));
        }
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

struct ScriptedBackend {
    reply: std::result::Result<ChatReply, BackendError>,
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, _query: &str) -> std::result::Result<ChatReply, BackendError> {
        self.reply.clone()
    }
}

/// Backend whose replies are released one by one by the test.
#[derive(Default)]
struct GatedBackend {
    gates: Mutex<HashMap<String, oneshot::Receiver<ChatReply>>>,
}

impl GatedBackend {
    fn gate(&self, query: &str) -> oneshot::Sender<ChatReply> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(query.to_string(), rx);
        tx
    }
}

#[async_trait]
impl ChatBackend for GatedBackend {
    async fn chat(&self, query: &str) -> std::result::Result<ChatReply, BackendError> {
        let rx = self.gates.lock().unwrap().remove(query);
        match rx {
            Some(rx) => rx
                .await
                .map_err(|_| BackendError::transport("gate dropped", false)),
            None => Err(BackendError::transport("no gate for query", false)),
        }
    }
}

fn answering(text: &str) -> Arc<ScriptedBackend> {
    Arc::new(ScriptedBackend {
        reply: Ok(ChatReply::new(text).with_sources(vec!["PSLV-C57_Brochure.pdf".to_string()])),
    })
}

fn failing() -> Arc<ScriptedBackend> {
    Arc::new(ScriptedBackend {
        reply: Err(BackendError::transport("connection refused", true)),
    })
}

async fn ready_store(sink: Arc<MemorySink>, backend: Arc<dyn ChatBackend>) -> SessionStore {
    let store = SessionStore::new(sink, backend);
    store.initialize().await;
    store
}

async fn wait_for_pending(store: &SessionStore, count: usize) {
    for _ in 0..1000 {
        if store.pending_count().await == count {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("store never reached {count} pending requests");
}

#[tokio::test]
async fn test_fresh_store_holds_default_seed() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;

    let sessions = store.sessions().await;
    assert_eq!(sessions, vec![ChatSession::default_seed()]);
    assert_eq!(store.active_session_id().await, DEFAULT_SESSION_ID);
}

#[tokio::test]
async fn test_create_session_scenario() {
    let sink = Arc::new(MemorySink::default());
    let store = ready_store(sink.clone(), answering("ok")).await;
    let old = store.active_session().await;

    let new_id = store.create_session().await;

    let sessions = store.sessions().await;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, new_id);
    assert_eq!(sessions[0].title, NEW_SESSION_TITLE);
    assert_eq!(sessions[0].messages.len(), 1);
    assert_eq!(store.active_session_id().await, new_id);
    assert_eq!(sessions[1], old);

    assert_eq!(sink.stored().unwrap(), sessions);
}

#[tokio::test]
async fn test_delete_last_session_is_invalid() {
    let sink = Arc::new(MemorySink::default());
    let store = ready_store(sink.clone(), answering("ok")).await;

    let err = store.delete_session(DEFAULT_SESSION_ID).await.unwrap_err();

    assert!(err.is_invalid_operation());
    assert_eq!(store.sessions().await, vec![ChatSession::default_seed()]);
    assert!(sink.stored().is_none());
}

#[tokio::test]
async fn test_delete_active_session_activates_first_remaining() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;
    let a = store.create_session().await;
    let b = store.create_session().await;

    store.delete_session(&b).await.unwrap();
    assert_eq!(store.active_session_id().await, a);

    store.select_session(DEFAULT_SESSION_ID).await.unwrap();
    store.delete_session(&a).await.unwrap();
    assert_eq!(store.active_session_id().await, DEFAULT_SESSION_ID);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_delete_inactive_session_keeps_active() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;
    let a = store.create_session().await;

    store.delete_session(DEFAULT_SESSION_ID).await.unwrap();
    assert_eq!(store.active_session_id().await, a);
}

#[tokio::test]
async fn test_delete_unknown_session_not_found() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;
    store.create_session().await;

    let err = store.delete_session("nope").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_active_id_always_references_member() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;
    let mut ids = vec![DEFAULT_SESSION_ID.to_string()];

    for round in 0..12 {
        if round % 3 == 2 && ids.len() > 1 {
            let victim = ids.remove(round % ids.len());
            store.delete_session(&victim).await.unwrap();
        } else {
            ids.push(store.create_session().await);
        }

        let sessions = store.sessions().await;
        let active = store.active_session_id().await;
        assert!(!sessions.is_empty());
        assert!(sessions.iter().any(|s| s.id == active));
        assert_eq!(sessions.len(), ids.len());
    }
}

#[tokio::test]
async fn test_select_unknown_session_not_found() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;

    let err = store.select_session("missing").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.active_session_id().await, DEFAULT_SESSION_ID);
}

#[tokio::test]
async fn test_select_does_not_persist() {
    let sink = Arc::new(MemorySink::default());
    let store = ready_store(sink.clone(), answering("ok")).await;
    let new_id = store.create_session().await;
    let before = sink.stored();

    store.select_session(DEFAULT_SESSION_ID).await.unwrap();

    assert_eq!(sink.stored(), before);
    assert_eq!(before.unwrap()[0].id, new_id);
}

#[tokio::test]
async fn test_blank_messages_are_ignored() {
    let sink = Arc::new(MemorySink::default());
    let store = ready_store(sink.clone(), answering("ok")).await;

    for text in ["", "   ", "\n\t "] {
        let outcome = store.send_message(DEFAULT_SESSION_ID, text).await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored);
    }

    assert_eq!(store.active_session().await.messages.len(), 1);
    assert!(sink.stored().is_none());
}

#[tokio::test]
async fn test_long_first_message_sets_truncated_title() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;
    let text = "Summarize the Gaganyaan crew escape system qualification tests";

    store.send_message(DEFAULT_SESSION_ID, text).await.unwrap();

    let session = store.active_session().await;
    assert_eq!(session.title, format!("{}...", &text[..30]));
}

#[tokio::test]
async fn test_later_messages_keep_title() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;

    store.send_message(DEFAULT_SESSION_ID, "First question").await.unwrap();
    store
        .send_message(
            DEFAULT_SESSION_ID,
            "A much longer follow-up question that exceeds thirty characters",
        )
        .await
        .unwrap();

    assert_eq!(store.active_session().await.title, "First question");
}

#[tokio::test]
async fn test_successful_reply_appended_with_sources() {
    let sink = Arc::new(MemorySink::default());
    let store = ready_store(sink.clone(), answering("Launch on 2023-09-02")).await;

    let outcome = store
        .send_message(DEFAULT_SESSION_ID, "When did it launch?")
        .await
        .unwrap();

    let SendOutcome::Answered(reply) = outcome else {
        panic!("expected an answer, got {outcome:?}");
    };
    assert_eq!(reply.text, "Launch on 2023-09-02");
    assert_eq!(
        reply.sources,
        Some(vec!["PSLV-C57_Brochure.pdf".to_string()])
    );

    let stored = sink.stored().unwrap();
    assert_eq!(stored[0].messages.len(), 3);
    assert_eq!(stored[0].messages[2], reply);
}

#[tokio::test]
async fn test_backend_failure_appends_single_notice() {
    let store = ready_store(Arc::new(MemorySink::default()), failing()).await;

    let outcome = store
        .send_message(DEFAULT_SESSION_ID, "Anyone there?")
        .await
        .unwrap();

    assert!(matches!(outcome, SendOutcome::Failed(_)));
    let messages = store.active_session().await.messages;
    assert_eq!(messages.len(), 3);
    assert!(messages[1].is_user());
    assert_eq!(messages[2].text, FAILURE_NOTICE);
    assert!(messages[2].sources.is_none());
    assert!(!store.is_pending().await);
}

#[tokio::test]
async fn test_send_to_unknown_session_not_found() {
    let store = ready_store(Arc::new(MemorySink::default()), answering("ok")).await;

    let err = store.send_message("ghost", "hello").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.active_session().await.messages.len(), 1);
}

#[tokio::test]
async fn test_persisted_collection_round_trips() {
    let sink = Arc::new(MemorySink::default());
    let store = ready_store(sink.clone(), answering("Answer")).await;
    store.send_message(DEFAULT_SESSION_ID, "Question one").await.unwrap();
    let second = store.create_session().await;
    store.send_message(&second, "Question two").await.unwrap();
    let before = store.sessions().await;

    let reloaded = ready_store(sink.clone(), answering("unused")).await;

    assert_eq!(reloaded.sessions().await, before);
    assert_eq!(reloaded.active_session_id().await, second);
    assert_eq!(reloaded.lifecycle().await, StoreLifecycle::Loaded);
}

#[tokio::test]
async fn test_encode_decode_identity() {
    let sessions = vec![
        ChatSession::new_thread("1706500000000", 1_706_500_000_000),
        ChatSession::default_seed(),
    ];
    let decoded = decode_sessions(&encode_sessions(&sessions).unwrap()).unwrap();
    assert_eq!(decoded, sessions);
}

#[tokio::test]
async fn test_malformed_storage_falls_back_to_seed() {
    let cases: [&[u8]; 6] = [
        b"{not json",
        b"[]",
        br#"{"id":"x"}"#,
        br#"[{"id":"1"}]"#,
        br#"[{"id":"9","title":"t","messages":[],"timestamp":1}]"#,
        br#"[{"id":"9","title":"a","messages":[{"id":1,"text":"hi","sender":"ai"}],"timestamp":1},
            {"id":"9","title":"b","messages":[{"id":2,"text":"hi","sender":"ai"}],"timestamp":2}]"#,
    ];
    for raw in cases {
        let sink = Arc::new(MemorySink::with_value(raw));
        let store = ready_store(sink.clone(), answering("ok")).await;

        assert_eq!(store.sessions().await, vec![ChatSession::default_seed()]);
        assert_eq!(store.lifecycle().await, StoreLifecycle::Loaded);
        // Storage stays untouched until the first mutation.
        assert_eq!(
            sink.values.lock().unwrap().get(SESSIONS_KEY).unwrap().as_slice(),
            raw
        );
    }
}

#[tokio::test]
async fn test_initialize_adopts_first_entry_as_active() {
    let saved = vec![
        ChatSession::new_thread("300", 300),
        ChatSession::new_thread("200", 200),
    ];
    let sink = Arc::new(MemorySink::with_value(&encode_sessions(&saved).unwrap()));
    let store = ready_store(sink, answering("ok")).await;

    assert_eq!(store.sessions().await, saved);
    assert_eq!(store.active_session_id().await, "300");
}

#[tokio::test]
async fn test_unreadable_storage_is_never_overwritten() {
    let mut saved = ChatSession::new_thread("500", 500);
    saved.title = "Precious".to_string();
    let original = encode_sessions(&[saved.clone()]).unwrap();
    let sink = Arc::new(MemorySink::with_value(&original));
    sink.fail_reads.store(true, Ordering::SeqCst);

    let store = SessionStore::new(sink.clone(), answering("ok"));
    assert_eq!(store.initialize().await, StoreLifecycle::Degraded);

    store.create_session().await;
    let id = store.active_session_id().await;
    store.send_message(&id, "still here?").await.unwrap();
    assert!(store.persist().await.unwrap_err().is_invalid_operation());
    assert_eq!(
        sink.values.lock().unwrap().get(SESSIONS_KEY).unwrap(),
        &original
    );

    // Once the sink recovers, a retry reads the saved collection.
    sink.fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(store.initialize().await, StoreLifecycle::Loaded);
    assert_eq!(store.sessions().await, vec![saved]);
    assert_eq!(store.active_session_id().await, "500");
}

#[tokio::test]
async fn test_initialize_runs_once() {
    let sink = Arc::new(MemorySink::default());
    let store = ready_store(sink.clone(), answering("ok")).await;
    store.create_session().await;

    assert_eq!(store.initialize().await, StoreLifecycle::Ready);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_reply_lands_in_call_time_session() {
    let backend = Arc::new(GatedBackend::default());
    let store = Arc::new(ready_store(Arc::new(MemorySink::default()), backend.clone()).await);
    let release = backend.gate("slow question");

    let sender = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(DEFAULT_SESSION_ID, "slow question").await })
    };
    wait_for_pending(&store, 1).await;

    let other = store.create_session().await;
    assert_eq!(store.active_session_id().await, other);

    release.send(ChatReply::new("late answer")).unwrap();
    let outcome = sender.await.unwrap().unwrap();
    assert!(matches!(outcome, SendOutcome::Answered(_)));

    let original = store.session(DEFAULT_SESSION_ID).await.unwrap();
    assert_eq!(original.messages.last().unwrap().text, "late answer");
    assert_eq!(store.session(&other).await.unwrap().messages.len(), 1);
}

#[tokio::test]
async fn test_concurrent_replies_append_in_completion_order() {
    let backend = Arc::new(GatedBackend::default());
    let store = Arc::new(ready_store(Arc::new(MemorySink::default()), backend.clone()).await);
    let release_first = backend.gate("first");
    let release_second = backend.gate("second");

    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(DEFAULT_SESSION_ID, "first").await })
    };
    wait_for_pending(&store, 1).await;
    let second = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(DEFAULT_SESSION_ID, "second").await })
    };
    wait_for_pending(&store, 2).await;
    assert!(store.is_session_pending(DEFAULT_SESSION_ID).await);

    release_second.send(ChatReply::new("answer two")).unwrap();
    second.await.unwrap().unwrap();
    release_first.send(ChatReply::new("answer one")).unwrap();
    first.await.unwrap().unwrap();

    let texts: Vec<String> = store
        .active_session()
        .await
        .messages
        .into_iter()
        .skip(1)
        .map(|m| m.text)
        .collect();
    assert_eq!(texts, ["first", "second", "answer two", "answer one"]);
    assert!(!store.is_pending().await);
}

#[tokio::test]
async fn test_single_flight_rejects_overlapping_send() {
    let backend = Arc::new(GatedBackend::default());
    let store = Arc::new(
        SessionStore::new(Arc::new(MemorySink::default()), backend.clone())
            .with_policy(SendPolicy::SingleFlight),
    );
    store.initialize().await;
    let release = backend.gate("first");

    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(DEFAULT_SESSION_ID, "first").await })
    };
    wait_for_pending(&store, 1).await;

    let outcome = store.send_message(DEFAULT_SESSION_ID, "second").await.unwrap();
    assert_eq!(outcome, SendOutcome::Rejected);

    // Other sessions are not blocked.
    let other = store.create_session().await;
    backend.gate("elsewhere").send(ChatReply::new("fine")).unwrap();
    let elsewhere = store.send_message(&other, "elsewhere").await.unwrap();
    assert!(matches!(elsewhere, SendOutcome::Answered(_)));

    release.send(ChatReply::new("done")).unwrap();
    first.await.unwrap().unwrap();

    let messages = store.session(DEFAULT_SESSION_ID).await.unwrap().messages;
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| m.text != "second"));
}

#[tokio::test]
async fn test_wait_until_idle_resolves_after_last_reply() {
    let backend = Arc::new(GatedBackend::default());
    let store = Arc::new(ready_store(Arc::new(MemorySink::default()), backend.clone()).await);
    store.wait_until_idle().await;

    let release = backend.gate("telemetry?");
    let id = store.active_session_id().await;
    let sender = {
        let store = store.clone();
        tokio::spawn(async move { store.send_message(&id, "telemetry?").await })
    };
    wait_for_pending(&store, 1).await;

    let waiter = {
        let store = store.clone();
        tokio::spawn(async move { store.wait_until_idle().await })
    };
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!waiter.is_finished());

    release.send(ChatReply::new("nominal")).unwrap();
    waiter.await.unwrap();
    assert_eq!(store.pending_count().await, 0);
    assert!(matches!(
        sender.await.unwrap().unwrap(),
        SendOutcome::Answered(_)
    ));
}

#[tokio::test]
async fn test_reply_for_deleted_session_is_discarded() {
    let backend = Arc::new(GatedBackend::default());
    let store = Arc::new(ready_store(Arc::new(MemorySink::default()), backend.clone()).await);
    let doomed = store.create_session().await;
    let release = backend.gate("question");

    let sender = {
        let store = store.clone();
        let doomed = doomed.clone();
        tokio::spawn(async move { store.send_message(&doomed, "question").await })
    };
    wait_for_pending(&store, 1).await;
    store.delete_session(&doomed).await.unwrap();

    release.send(ChatReply::new("too late")).unwrap();
    let outcome = sender.await.unwrap().unwrap();

    assert_eq!(outcome, SendOutcome::Discarded);
    assert_eq!(store.sessions().await, vec![ChatSession::default_seed()]);
    assert!(!store.is_pending().await);
}
