use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;

/// Speaker role in a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a call's conversation history.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

struct Session {
    history: Vec<ChatMessage>,
    last_used: Instant,
}

/// Conversation transcripts for active calls, keyed by Twilio CallSid.
///
/// Each history starts with the system prompt and grows by one user and
/// one assistant message per turn. Idle sessions are swept on access.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Create a session for `call_sid` if none exists, seeding it with the
    /// system prompt. Returns true if the session was newly created.
    pub async fn begin(&self, call_sid: &str, system_prompt: &str) -> bool {
        let mut sessions = self.inner.lock().await;

        // Sweep idle sessions: calls that ended without a completed
        // recording callback would otherwise accumulate forever.
        sessions.retain(|_, s| s.last_used.elapsed() < self.timeout);

        match sessions.get_mut(call_sid) {
            Some(session) => {
                session.last_used = Instant::now();
                false
            }
            None => {
                sessions.insert(
                    call_sid.to_string(),
                    Session {
                        history: vec![ChatMessage::new(Role::System, system_prompt)],
                        last_used: Instant::now(),
                    },
                );
                true
            }
        }
    }

    /// Append a caller turn and return a snapshot of the full history,
    /// ready to send to the chat-completion API.
    pub async fn record_user(&self, call_sid: &str, text: &str) -> Vec<ChatMessage> {
        let mut sessions = self.inner.lock().await;
        match sessions.get_mut(call_sid) {
            Some(session) => {
                session.history.push(ChatMessage::new(Role::User, text));
                session.last_used = Instant::now();
                session.history.clone()
            }
            None => Vec::new(),
        }
    }

    /// Append the spoken reply to the history.
    pub async fn record_assistant(&self, call_sid: &str, text: &str) {
        let mut sessions = self.inner.lock().await;
        if let Some(session) = sessions.get_mut(call_sid) {
            session.history.push(ChatMessage::new(Role::Assistant, text));
            session.last_used = Instant::now();
        }
    }

    /// Remove a session (call ended).
    pub async fn end(&self, call_sid: &str) {
        if self.inner.lock().await.remove(call_sid).is_some() {
            tracing::info!(call_sid, "Session ended");
        }
    }

    /// Number of live sessions.
    pub async fn active(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_creates_once() {
        let store = SessionStore::new(300);
        assert!(store.begin("CA1", "be helpful").await);
        assert!(!store.begin("CA1", "be helpful").await);
        assert_eq!(store.active().await, 1);
    }

    #[tokio::test]
    async fn history_orders_turns() {
        let store = SessionStore::new(300);
        store.begin("CA1", "be helpful").await;
        store.record_user("CA1", "hello").await;
        store.record_assistant("CA1", "hi there").await;
        let history = store.record_user("CA1", "what time is it?").await;

        let roles: Vec<Role> = history.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(history[0].content, "be helpful");
        assert_eq!(history[3].content, "what time is it?");
    }

    #[tokio::test]
    async fn record_user_without_session_is_empty() {
        let store = SessionStore::new(300);
        let history = store.record_user("CA-missing", "hello?").await;
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn end_removes_session() {
        let store = SessionStore::new(300);
        store.begin("CA1", "p").await;
        store.begin("CA2", "p").await;
        store.end("CA1").await;
        assert_eq!(store.active().await, 1);
        // Ending twice is harmless
        store.end("CA1").await;
        assert_eq!(store.active().await, 1);
    }

    #[tokio::test]
    async fn idle_sessions_are_swept() {
        let store = SessionStore::new(0);
        store.begin("CA-old", "p").await;
        // Zero timeout: the next begin sweeps it and recreates
        assert!(store.begin("CA-old", "p").await);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::new(Role::Assistant, "ok");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "ok");
    }
}
