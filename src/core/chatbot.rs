//! Per-paper chatbot state.
//!
//! The chatbot session lives on the backend; this store owns the visible
//! transcript, the session lifecycle phase, and the persisted history keyed
//! by research id. Switching papers discards the old transcript from storage
//! and asks the caller to refresh the backend cache for the old session,
//! best-effort.
//!
//! Like `PaperStore`, all async results arrive stamped with a research id and
//! are dropped when the stamp no longer matches the session being built.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::persist::{self, KeyValueStore};

/// Shown in place of an answer when sending a question fails. The transcript
/// keeps flowing instead of surfacing a modal error.
pub const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while answering. Please try asking again.";

fn history_key(research_id: u64) -> String {
    format!("chat_history_{research_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    /// Unix milliseconds, for transcript ordering across restarts.
    pub timestamp: i64,
}

impl ChatTurn {
    fn now(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Session lifecycle. `Creating` and `Ready` are scoped to `research_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatbotPhase {
    Idle,
    Creating,
    Ready,
}

/// What the caller should do after `prepare_create`.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatePlan {
    /// Session for this paper already exists or is being created.
    Skip,
    /// Dispatch a create request for `research_id`. When the store switched
    /// away from a previous paper, `refresh_old` carries its id for a
    /// best-effort backend cache refresh.
    Start {
        research_id: u64,
        refresh_old: Option<u64>,
    },
}

pub struct ChatbotStore {
    storage: Arc<dyn KeyValueStore>,
    phase: ChatbotPhase,
    research_id: Option<u64>,
    messages: Vec<ChatTurn>,
    panel_open: bool,
    awaiting_answer: bool,
}

impl ChatbotStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            phase: ChatbotPhase::Idle,
            research_id: None,
            messages: Vec::new(),
            panel_open: false,
            awaiting_answer: false,
        }
    }

    pub fn phase(&self) -> ChatbotPhase {
        self.phase
    }

    pub fn research_id(&self) -> Option<u64> {
        self.research_id
    }

    pub fn messages(&self) -> &[ChatTurn] {
        &self.messages
    }

    pub fn panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn awaiting_answer(&self) -> bool {
        self.awaiting_answer
    }

    pub fn toggle_panel(&mut self) {
        self.panel_open = !self.panel_open;
    }

    pub fn close_panel(&mut self) {
        self.panel_open = false;
    }

    // ── Session lifecycle ───────────────────────────────────────────────

    /// Called when a paper's learning flow is entered. Decides whether a
    /// create request is needed and resets state when the paper changed.
    pub fn prepare_create(&mut self, research_id: u64) -> CreatePlan {
        if self.research_id == Some(research_id)
            && matches!(self.phase, ChatbotPhase::Creating | ChatbotPhase::Ready)
        {
            return CreatePlan::Skip;
        }

        // Paper switch: drop the old transcript from storage and hand the
        // old id back so the caller can refresh the backend cache.
        let refresh_old = match self.research_id {
            Some(old) if old != research_id => {
                log::info!("Chatbot switching from paper {old} to {research_id}");
                self.storage.remove(&history_key(old));
                Some(old)
            }
            _ => None,
        };

        self.research_id = Some(research_id);
        self.phase = ChatbotPhase::Creating;
        self.awaiting_answer = false;
        self.panel_open = false;
        self.messages =
            persist::get_json(self.storage.as_ref(), &history_key(research_id)).unwrap_or_default();

        CreatePlan::Start {
            research_id,
            refresh_old,
        }
    }

    /// Stamped result of the create request. Failure falls back to Idle
    /// silently; the next flow entry will try again.
    pub fn commit_created(&mut self, research_id: u64, result: Result<(), String>) {
        if self.research_id != Some(research_id) || self.phase != ChatbotPhase::Creating {
            log::warn!(
                "Dropping stale chatbot-create result for paper {research_id} (current: {:?})",
                self.research_id
            );
            return;
        }
        match result {
            Ok(()) => {
                log::info!("Chatbot ready for paper {research_id}");
                self.phase = ChatbotPhase::Ready;
            }
            Err(e) => {
                log::error!("Chatbot create failed for paper {research_id}: {e}");
                self.phase = ChatbotPhase::Idle;
            }
        }
    }

    // ── Transcript ──────────────────────────────────────────────────────

    /// Append the user's question optimistically and return the stamped id
    /// the caller should send with. None when the session is not ready.
    pub fn push_user_turn(&mut self, question: &str) -> Option<u64> {
        let question = question.trim();
        if question.is_empty() || self.phase != ChatbotPhase::Ready || self.awaiting_answer {
            return None;
        }
        let research_id = self.research_id?;
        self.messages.push(ChatTurn::now(ChatRole::User, question));
        self.awaiting_answer = true;
        self.persist();
        Some(research_id)
    }

    /// Stamped answer. An error appends the fixed fallback turn so the user
    /// sees the failure in the transcript.
    pub fn commit_answer(&mut self, research_id: u64, result: Result<String, String>) {
        if self.research_id != Some(research_id) {
            log::warn!(
                "Dropping stale chat answer for paper {research_id} (current: {:?})",
                self.research_id
            );
            return;
        }
        self.awaiting_answer = false;
        let content = match result {
            Ok(answer) => answer,
            Err(e) => {
                log::error!("Chat send failed for paper {research_id}: {e}");
                FALLBACK_ANSWER.to_string()
            }
        };
        self.messages
            .push(ChatTurn::now(ChatRole::Assistant, content));
        self.persist();
    }

    /// Clear the transcript for the current paper, storage included. The
    /// session itself stays alive.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.awaiting_answer = false;
        if let Some(id) = self.research_id {
            self.storage.remove(&history_key(id));
        }
    }

    /// Drop everything, including the session binding. Used when the paper
    /// selection itself is cleared.
    pub fn reset(&mut self) {
        self.phase = ChatbotPhase::Idle;
        self.research_id = None;
        self.messages.clear();
        self.panel_open = false;
        self.awaiting_answer = false;
    }

    /// An empty transcript deletes the key instead of storing `[]`.
    fn persist(&self) {
        let Some(id) = self.research_id else { return };
        if self.messages.is_empty() {
            self.storage.remove(&history_key(id));
        } else {
            persist::set_json(self.storage.as_ref(), &history_key(id), &self.messages);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persist::MemoryStore;

    fn store() -> (Arc<MemoryStore>, ChatbotStore) {
        let mem = Arc::new(MemoryStore::new());
        let store = ChatbotStore::new(mem.clone());
        (mem, store)
    }

    fn ready(store: &mut ChatbotStore, id: u64) {
        assert!(matches!(
            store.prepare_create(id),
            CreatePlan::Start { .. }
        ));
        store.commit_created(id, Ok(()));
        assert_eq!(store.phase(), ChatbotPhase::Ready);
    }

    #[test]
    fn test_create_skipped_when_already_ready() {
        let (_, mut store) = store();
        ready(&mut store, 42);
        assert_eq!(store.prepare_create(42), CreatePlan::Skip);
    }

    #[test]
    fn test_create_skipped_while_creating() {
        let (_, mut store) = store();
        store.prepare_create(42);
        assert_eq!(store.phase(), ChatbotPhase::Creating);
        assert_eq!(store.prepare_create(42), CreatePlan::Skip);
    }

    #[test]
    fn test_paper_switch_resets_and_asks_for_refresh() {
        let (mem, mut store) = store();
        ready(&mut store, 42);
        let id = store.push_user_turn("What is attention?").unwrap();
        store.commit_answer(id, Ok("A weighting mechanism.".into()));
        assert!(mem.contains_key("chat_history_42"));

        let plan = store.prepare_create(43);
        assert_eq!(
            plan,
            CreatePlan::Start {
                research_id: 43,
                refresh_old: Some(42)
            }
        );
        assert!(store.messages().is_empty());
        assert!(!store.panel_open());
        assert_eq!(store.phase(), ChatbotPhase::Creating);
        // Old transcript is gone from storage.
        assert!(!mem.contains_key("chat_history_42"));
    }

    #[test]
    fn test_stale_create_result_dropped_after_switch() {
        let (_, mut store) = store();
        store.prepare_create(42);
        store.prepare_create(43);
        store.commit_created(42, Ok(()));
        // Still creating 43; the stale success for 42 changed nothing.
        assert_eq!(store.phase(), ChatbotPhase::Creating);
        assert_eq!(store.research_id(), Some(43));
    }

    #[test]
    fn test_create_failure_returns_to_idle() {
        let (_, mut store) = store();
        store.prepare_create(7);
        store.commit_created(7, Err("503".into()));
        assert_eq!(store.phase(), ChatbotPhase::Idle);
        // Next entry tries again.
        assert!(matches!(store.prepare_create(7), CreatePlan::Start { .. }));
    }

    #[test]
    fn test_send_requires_ready_session() {
        let (_, mut store) = store();
        assert!(store.push_user_turn("hello").is_none());
        store.prepare_create(1);
        assert!(store.push_user_turn("hello").is_none());
        store.commit_created(1, Ok(()));
        assert!(store.push_user_turn("hello").is_some());
    }

    #[test]
    fn test_send_blocked_while_awaiting_answer() {
        let (_, mut store) = store();
        ready(&mut store, 1);
        assert!(store.push_user_turn("first").is_some());
        assert!(store.push_user_turn("second").is_none());
        store.commit_answer(1, Ok("answer".into()));
        assert!(store.push_user_turn("second").is_some());
    }

    #[test]
    fn test_blank_question_ignored() {
        let (_, mut store) = store();
        ready(&mut store, 1);
        assert!(store.push_user_turn("   ").is_none());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_failed_answer_appends_fallback_turn() {
        let (_, mut store) = store();
        ready(&mut store, 5);
        let id = store.push_user_turn("Why?").unwrap();
        store.commit_answer(id, Err("connection refused".into()));
        let last = store.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, FALLBACK_ANSWER);
        assert!(!store.awaiting_answer());
    }

    #[test]
    fn test_stale_answer_dropped_after_switch() {
        let (_, mut store) = store();
        ready(&mut store, 5);
        let id = store.push_user_turn("Why?").unwrap();
        store.prepare_create(6);
        store.commit_answer(id, Ok("late".into()));
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_history_persists_and_reloads() {
        let mem = Arc::new(MemoryStore::new());
        {
            let mut store = ChatbotStore::new(mem.clone());
            ready(&mut store, 9);
            let id = store.push_user_turn("Q1").unwrap();
            store.commit_answer(id, Ok("A1".into()));
        }
        let mut store = ChatbotStore::new(mem);
        store.prepare_create(9);
        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.messages()[0].content, "Q1");
        assert_eq!(store.messages()[1].content, "A1");
    }

    #[test]
    fn test_clear_removes_transcript_and_storage() {
        let (mem, mut store) = store();
        ready(&mut store, 3);
        let id = store.push_user_turn("Q").unwrap();
        store.commit_answer(id, Ok("A".into()));
        store.clear();
        assert!(store.messages().is_empty());
        assert!(!mem.contains_key("chat_history_3"));
        // Session survives a clear.
        assert_eq!(store.phase(), ChatbotPhase::Ready);
    }

    #[test]
    fn test_empty_transcript_deletes_key() {
        let (mem, mut store) = store();
        ready(&mut store, 4);
        let id = store.push_user_turn("Q").unwrap();
        store.commit_answer(id, Ok("A".into()));
        assert!(mem.contains_key("chat_history_4"));
        store.clear();
        assert!(!mem.contains_key("chat_history_4"));
    }
}
