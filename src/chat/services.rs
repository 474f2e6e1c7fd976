use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    time::{Duration, Instant},
};

use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::{
    chat::{
        classify::{apology, classify},
        transcript::{ChatState, EntryKind, Reply, SubmitRejected, Transcript, TranscriptEntry},
    },
    date_key::DateKey,
    logs::{services::commit_breakdown, LogEntry},
    state::AppState,
};

/// One conversation plus when it was last used.
struct Session {
    transcript: Transcript,
    touched: Instant,
}

type SessionHandle = Arc<Mutex<Session>>;

/// Live conversations, one transcript per session id.
///
/// Sessions idle for longer than `ttl` are swept whenever a new one is
/// created. A session waiting on the interpreter is never swept.
#[derive(Clone)]
pub struct ChatSessions {
    inner: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    ttl: Duration,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: ChatState,
    pub entries: Vec<TranscriptEntry>,
}

fn lock(session: &SessionHandle) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Session {
    fn view(&self, id: Uuid) -> SessionView {
        SessionView {
            id,
            state: self.transcript.state(),
            entries: self.transcript.entries().to_vec(),
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        self.transcript.state() == ChatState::Idle && now.saturating_duration_since(self.touched) >= ttl
    }
}

impl ChatSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    pub fn create(&self) -> SessionView {
        let now = Instant::now();
        let id = Uuid::new_v4();
        let session = Session {
            transcript: Transcript::new(),
            touched: now,
        };
        let view = session.view(id);

        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, s| !lock(s).is_expired(now, self.ttl));
        let evicted = before - sessions.len();
        sessions.insert(id, Arc::new(Mutex::new(session)));
        drop(sessions);

        if evicted > 0 {
            debug!(evicted, "idle chat sessions dropped");
        }
        info!(session_id = %id, "chat session created");
        view
    }

    fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn view(&self, id: Uuid) -> Option<SessionView> {
        let session = self.get(id)?;
        let mut s = lock(&session);
        s.touched = Instant::now();
        Some(s.view(id))
    }

    /// Forgets a session. An exchange already in flight still finishes.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            info!(session_id = %id, "chat session ended");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("chat session not found")]
    UnknownSession,
    #[error(transparent)]
    Rejected(#[from] SubmitRejected),
}

/// What one exchange added: the user entry, the system reply, and any logs committed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Exchange {
    pub entries: Vec<TranscriptEntry>,
    pub logged: Vec<LogEntry>,
}

/// Commits a breakdown under `day`. A failed commit turns the reply into the apology.
async fn commit(state: &AppState, day: DateKey, reply: Reply) -> (Reply, Vec<LogEntry>) {
    let EntryKind::Breakdown { breakdown_items } = &reply.kind else {
        return (reply, Vec::new());
    };
    if breakdown_items.is_empty() {
        return (reply, Vec::new());
    }
    let committed = commit_breakdown(&state.db, day, breakdown_items).await;
    match committed {
        Ok(logged) => (reply, logged),
        Err(e) => {
            error!(error = %e, "breakdown commit failed");
            (apology(), Vec::new())
        }
    }
}

fn finish(session: &SessionHandle, reply: Reply) -> Option<TranscriptEntry> {
    let mut s = lock(session);
    s.touched = Instant::now();
    s.transcript.complete(reply).cloned()
}

/// Runs one utterance through the interpreter.
///
/// The interpreter call runs on its own task so the transcript returns to
/// `Idle` even if the caller goes away while waiting.
#[instrument(skip(state, utterance))]
pub async fn submit(state: &AppState, session_id: Uuid, utterance: &str) -> Result<Exchange, SubmitError> {
    let session = state.sessions.get(session_id).ok_or(SubmitError::UnknownSession)?;
    let user_entry = {
        let mut s = lock(&session);
        let entry = s.transcript.submit(utterance)?.clone();
        s.touched = Instant::now();
        entry
    };
    // Meals belong to the day they were described on, however long the reply takes.
    let day = state.calendar.today();

    let task = {
        let state = state.clone();
        let session = session.clone();
        let text = user_entry.text.clone();
        tokio::spawn(async move {
            let outcome = state.interpreter.interpret(&text).await;
            let reply = classify(&text, outcome);
            let (reply, logged) = commit(&state, day, reply).await;
            (finish(&session, reply), logged)
        })
    };

    let (reply_entry, logged) = match task.await {
        Ok(done) => done,
        Err(e) => {
            error!(error = %e, "intake task failed");
            (finish(&session, apology()), Vec::new())
        }
    };

    let mut entries = vec![user_entry];
    entries.extend(reply_entry);
    info!(%session_id, logged = logged.len(), "exchange complete");
    Ok(Exchange { entries, logged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::classify::APOLOGY_TEXT;
    use crate::chat::transcript::Role;
    use crate::interpreter::{FoodDetail, Interpretation, Interpreter, InterpreterFault};
    use crate::logs::repo;
    use crate::state::test_state;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct Canned(fn() -> Result<Interpretation, InterpreterFault>);

    #[async_trait]
    impl Interpreter for Canned {
        async fn interpret(&self, _utterance: &str) -> Result<Interpretation, InterpreterFault> {
            (self.0)()
        }
    }

    fn rotis() -> Result<Interpretation, InterpreterFault> {
        Ok(Interpretation::Breakdown {
            summary: "Logged 2 rotis".into(),
            details: vec![FoodDetail {
                food: "roti".into(),
                quantity_or_measurement: Some("2".into()),
                calories: 160.0,
                protein: 6.0,
            }],
        })
    }

    #[tokio::test]
    async fn breakdown_commits_logs_and_returns_to_idle() {
        let state = test_state(Arc::new(Canned(rotis))).await;
        let session = state.sessions.create();

        let exchange = submit(&state, session.id, "2 rotis").await.expect("exchange");
        assert_eq!(exchange.entries.len(), 2);
        assert_eq!(exchange.entries[0].role, Role::User);
        assert_eq!(exchange.entries[1].text, "Logged 2 rotis");
        assert_eq!(exchange.logged.len(), 1);
        assert_eq!(exchange.logged[0].food_name, "2 roti");
        assert_eq!(exchange.logged[0].date, state.calendar.today());

        let view = state.sessions.view(session.id).unwrap();
        assert_eq!(view.state, ChatState::Idle);
        assert_eq!(view.entries.len(), 3);
        assert_eq!(repo::list(&state.db, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fault_still_advances_transcript() {
        let state = test_state(Arc::new(Canned(|| Err(InterpreterFault::Timeout)))).await;
        let session = state.sessions.create();

        let exchange = submit(&state, session.id, "egg").await.expect("exchange");
        assert_eq!(exchange.entries[1].kind, EntryKind::Error);
        assert_eq!(exchange.entries[1].text, APOLOGY_TEXT);
        assert!(exchange.logged.is_empty());
        assert_eq!(state.sessions.view(session.id).unwrap().state, ChatState::Idle);
    }

    #[tokio::test]
    async fn clarification_commits_nothing() {
        let state = test_state(Arc::new(Canned(|| {
            Ok(Interpretation::Clarification {
                suggestions: vec!["chicken breast".into()],
            })
        })))
        .await;
        let session = state.sessions.create();

        let exchange = submit(&state, session.id, "some food").await.expect("exchange");
        assert!(matches!(exchange.entries[1].kind, EntryKind::Clarification { .. }));
        assert!(repo::list(&state.db, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_session_and_blank_input_are_rejected() {
        let state = test_state(Arc::new(Canned(rotis))).await;
        assert!(matches!(
            submit(&state, Uuid::new_v4(), "egg").await,
            Err(SubmitError::UnknownSession)
        ));

        let session = state.sessions.create();
        assert!(matches!(
            submit(&state, session.id, "   ").await,
            Err(SubmitError::Rejected(SubmitRejected::EmptyUtterance))
        ));
        assert_eq!(state.sessions.view(session.id).unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn breakdown_is_logged_under_the_given_day() {
        let state = test_state(Arc::new(Canned(rotis))).await;
        let day: DateKey = "2024-05-01".parse().unwrap();
        let reply = classify("2 rotis", rotis());

        let (reply, logged) = commit(&state, day, reply).await;
        assert!(matches!(reply.kind, EntryKind::Breakdown { .. }));
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].date, day);
        assert_ne!(day, state.calendar.today());
    }

    #[test]
    fn removed_session_is_gone() {
        let sessions = ChatSessions::new(Duration::from_secs(3600));
        let id = sessions.create().id;
        assert!(sessions.remove(id));
        assert!(sessions.view(id).is_none());
        assert!(!sessions.remove(id));
        assert!(sessions.is_empty());
    }

    #[test]
    fn idle_sessions_are_swept_on_create() {
        let sessions = ChatSessions::new(Duration::ZERO);
        let first = sessions.create().id;
        let second = sessions.create().id;
        assert!(sessions.view(first).is_none());
        assert!(sessions.view(second).is_some());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn sessions_within_ttl_survive_the_sweep() {
        let sessions = ChatSessions::new(Duration::from_secs(3600));
        let first = sessions.create().id;
        sessions.create();
        assert!(sessions.view(first).is_some());
        assert_eq!(sessions.len(), 2);
    }

    /// Blocks until released so a second submission can race the first.
    struct Gate {
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl Interpreter for Gate {
        async fn interpret(&self, _utterance: &str) -> Result<Interpretation, InterpreterFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(Interpretation::Unrecognized)
        }
    }

    #[tokio::test]
    async fn second_submission_while_awaiting_is_a_no_op() {
        let gate = Arc::new(Gate {
            calls: AtomicUsize::new(0),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let state = test_state(gate.clone()).await;
        let session_id = state.sessions.create().id;

        let first = {
            let state = state.clone();
            tokio::spawn(async move { submit(&state, session_id, "egg").await })
        };
        gate.entered.notified().await;

        let view = state.sessions.view(session_id).unwrap();
        assert_eq!(view.state, ChatState::AwaitingResponse);
        let len_before = view.entries.len();

        let second = submit(&state, session_id, "toast").await;
        assert!(matches!(second, Err(SubmitError::Rejected(SubmitRejected::Busy))));
        assert_eq!(state.sessions.view(session_id).unwrap().entries.len(), len_before);

        // Even a zero TTL leaves a session that is waiting on a reply alone.
        let pending = ChatSessions {
            inner: state.sessions.inner.clone(),
            ttl: Duration::ZERO,
        };
        pending.create();
        assert!(state.sessions.view(session_id).is_some());

        gate.release.notify_one();
        let exchange = first.await.unwrap().expect("first exchange");
        assert_eq!(exchange.entries.len(), 2);
        assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.sessions.view(session_id).unwrap().state, ChatState::Idle);
    }
}
