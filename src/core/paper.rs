//! Paper selection store.
//!
//! Owns the currently selected paper, the mission-progress set, and the four
//! derived payload slots (summary, quiz, podcast narration, video lecture).
//! Selecting a paper persists the snapshot, resets everything scoped to the
//! previous paper, and produces a `SelectionPlan` describing the background
//! work to dispatch (archive + content fan-out).
//!
//! The store's commit methods are the only write path for async results.
//! Every result arrives stamped with the research id that was current when
//! the request was dispatched; a stamp that no longer matches the selection
//! is dropped, so a slow response for a previous paper can never overwrite
//! the current paper's state.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::types::{Paper, QuizQuestion, SummaryDoc, TtsTrack, VideoLecture, VideoStatus};
use crate::core::persist::{self, KeyValueStore};

const SELECTED_PAPER_KEY: &str = "selected_paper";
const KEYWORD_SESSION_KEY: &str = "keyword_session";

fn archived_key(research_id: u64) -> String {
    format!("archived_{research_id}")
}

fn video_generated_key(research_id: u64) -> String {
    format!("video_generated_{research_id}")
}

// ── Mission progress ────────────────────────────────────────────────────────

/// One stage of the guided learning flow. Video is deliberately not a
/// mission step; it is an extra after the podcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStep {
    Summary,
    Quiz,
    Tts,
    History,
}

impl MissionStep {
    pub const ALL: [MissionStep; 4] = [
        MissionStep::Summary,
        MissionStep::Quiz,
        MissionStep::Tts,
        MissionStep::History,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MissionStep::Summary => "Summary",
            MissionStep::Quiz => "Quiz",
            MissionStep::Tts => "Podcast",
            MissionStep::History => "History",
        }
    }
}

// ── Derived payload slots ───────────────────────────────────────────────────

/// Independent lifecycle of one derived payload. One failing slot never
/// blocks the others.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchSlot<T> {
    Idle,
    Loading,
    Ready(T),
    Error(String),
}

impl<T> FetchSlot<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchSlot::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FetchSlot::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchSlot::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Lifecycle of the backend-side archive request for the selected paper.
/// Failure here blocks dependent download actions until retried.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveState {
    Idle,
    Pending,
    Archived,
    Failed(String),
}

/// Background work to dispatch after a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPlan {
    pub research_id: u64,
    /// False when a persisted marker shows this id was already archived
    /// (idempotency survives restarts).
    pub needs_archive: bool,
}

// ── Keyword search session ──────────────────────────────────────────────────

/// Persisted keyword-search session: extracted keywords, the one the user
/// picked, and the uploaded file they came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSession {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub source_file: Option<String>,
}

// ── Store ───────────────────────────────────────────────────────────────────

pub struct PaperStore {
    storage: Arc<dyn KeyValueStore>,
    selected: Option<Paper>,
    completed: BTreeSet<MissionStep>,
    archive: ArchiveState,
    summary: FetchSlot<SummaryDoc>,
    quiz: FetchSlot<Vec<QuizQuestion>>,
    tts: FetchSlot<TtsTrack>,
    video: FetchSlot<VideoLecture>,
}

impl PaperStore {
    /// Restores a persisted selection so a restart lands where the user
    /// left off. Derived slots start idle; progress starts empty.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let selected: Option<Paper> = persist::get_json(storage.as_ref(), SELECTED_PAPER_KEY);
        if let Some(paper) = &selected {
            log::info!(
                "Restored selected paper {} ({})",
                paper.research_id,
                paper.title
            );
        }
        let archive = match &selected {
            Some(paper) if storage.get(&archived_key(paper.research_id)).is_some() => {
                ArchiveState::Archived
            }
            Some(_) => ArchiveState::Idle,
            None => ArchiveState::Idle,
        };
        Self {
            storage,
            selected,
            completed: BTreeSet::new(),
            archive,
            summary: FetchSlot::Idle,
            quiz: FetchSlot::Idle,
            tts: FetchSlot::Idle,
            video: FetchSlot::Idle,
        }
    }

    // ── Selection ───────────────────────────────────────────────────────

    pub fn selected(&self) -> Option<&Paper> {
        self.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<u64> {
        self.selected.as_ref().map(|p| p.research_id)
    }

    /// Select a paper: persist the snapshot, drop everything scoped to the
    /// previous paper, move all content slots to Loading, and return the
    /// plan for the background fan-out.
    pub fn select(&mut self, paper: Paper) -> SelectionPlan {
        let research_id = paper.research_id;
        log::info!("Selecting paper {research_id}: {}", paper.title);

        persist::set_json(self.storage.as_ref(), SELECTED_PAPER_KEY, &paper);
        self.selected = Some(paper);
        self.completed.clear();
        self.summary = FetchSlot::Loading;
        self.quiz = FetchSlot::Loading;
        self.tts = FetchSlot::Loading;
        self.video = FetchSlot::Loading;

        let already_archived = self.storage.get(&archived_key(research_id)).is_some();
        self.archive = if already_archived {
            log::info!("Paper {research_id} already archived, skipping request");
            ArchiveState::Archived
        } else {
            ArchiveState::Pending
        };

        SelectionPlan {
            research_id,
            needs_archive: !already_archived,
        }
    }

    /// Drop the selection entirely (back to the picker with nothing chosen).
    pub fn clear(&mut self) {
        self.storage.remove(SELECTED_PAPER_KEY);
        self.selected = None;
        self.completed.clear();
        self.archive = ArchiveState::Idle;
        self.summary = FetchSlot::Idle;
        self.quiz = FetchSlot::Idle;
        self.tts = FetchSlot::Idle;
        self.video = FetchSlot::Idle;
    }

    // ── Mission progress ────────────────────────────────────────────────

    /// Idempotent: marking a step that is already complete is a no-op.
    pub fn mark_step_complete(&mut self, step: MissionStep) {
        if self.selected.is_none() {
            return;
        }
        if self.completed.insert(step) {
            log::debug!("Mission step {} complete", step.label());
        }
    }

    pub fn is_step_complete(&self, step: MissionStep) -> bool {
        self.completed.contains(&step)
    }

    pub fn completed_steps(&self) -> &BTreeSet<MissionStep> {
        &self.completed
    }

    // ── Stamped commits ─────────────────────────────────────────────────

    /// True when `research_id` is still the current selection. Commits for
    /// anything else are stale and must be dropped.
    fn stamp_matches(&self, research_id: u64, what: &str) -> bool {
        if self.selected_id() == Some(research_id) {
            return true;
        }
        log::warn!(
            "Dropping stale {what} result for paper {research_id} (current: {:?})",
            self.selected_id()
        );
        false
    }

    pub fn commit_archive(&mut self, research_id: u64, result: Result<String, String>) {
        if !self.stamp_matches(research_id, "archive") {
            return;
        }
        match result {
            Ok(s3_key) => {
                persist::set_json(self.storage.as_ref(), &archived_key(research_id), &true);
                log::info!("Paper {research_id} archived ({s3_key})");
                self.archive = ArchiveState::Archived;
            }
            Err(e) => {
                log::error!("Archive failed for paper {research_id}: {e}");
                self.archive = ArchiveState::Failed(e);
            }
        }
    }

    /// Move the archive back to Pending for a user-initiated retry.
    /// Returns the plan, or None when there is nothing to retry.
    pub fn retry_archive(&mut self) -> Option<SelectionPlan> {
        let research_id = self.selected_id()?;
        if !matches!(self.archive, ArchiveState::Failed(_)) {
            return None;
        }
        self.archive = ArchiveState::Pending;
        Some(SelectionPlan {
            research_id,
            needs_archive: true,
        })
    }

    pub fn archive_state(&self) -> &ArchiveState {
        &self.archive
    }

    /// Slot commits return whether the result was applied, so callers can
    /// skip view-side refreshes for results that were dropped as stale.
    pub fn commit_summary(&mut self, research_id: u64, result: Result<SummaryDoc, String>) -> bool {
        if !self.stamp_matches(research_id, "summary") {
            return false;
        }
        self.summary = match result {
            Ok(doc) => FetchSlot::Ready(doc),
            Err(e) => {
                log::error!("Summary failed for paper {research_id}: {e}");
                FetchSlot::Error(e)
            }
        };
        true
    }

    pub fn commit_quiz(
        &mut self,
        research_id: u64,
        result: Result<Vec<QuizQuestion>, String>,
    ) -> bool {
        if !self.stamp_matches(research_id, "quiz") {
            return false;
        }
        self.quiz = match result {
            Ok(questions) => FetchSlot::Ready(questions),
            Err(e) => {
                log::error!("Quiz failed for paper {research_id}: {e}");
                FetchSlot::Error(e)
            }
        };
        true
    }

    pub fn commit_tts(&mut self, research_id: u64, result: Result<TtsTrack, String>) -> bool {
        if !self.stamp_matches(research_id, "tts") {
            return false;
        }
        self.tts = match result {
            Ok(track) => FetchSlot::Ready(track),
            Err(e) => {
                log::error!("TTS failed for paper {research_id}: {e}");
                FetchSlot::Error(e)
            }
        };
        true
    }

    pub fn commit_video(&mut self, research_id: u64, result: Result<VideoLecture, String>) -> bool {
        if !self.stamp_matches(research_id, "video") {
            return false;
        }
        self.video = match result {
            Ok(lecture) => {
                if lecture.video_status == VideoStatus::Ready {
                    persist::set_json(
                        self.storage.as_ref(),
                        &video_generated_key(research_id),
                        &true,
                    );
                }
                FetchSlot::Ready(lecture)
            }
            Err(e) => {
                log::error!("Video failed for paper {research_id}: {e}");
                FetchSlot::Error(e)
            }
        };
        true
    }

    /// Re-arm one slot for a user-initiated retry. Returns the stamped id
    /// the caller should dispatch with.
    pub fn retry_summary(&mut self) -> Option<u64> {
        let id = self.selected_id()?;
        self.summary = FetchSlot::Loading;
        Some(id)
    }

    pub fn retry_quiz(&mut self) -> Option<u64> {
        let id = self.selected_id()?;
        self.quiz = FetchSlot::Loading;
        Some(id)
    }

    pub fn retry_tts(&mut self) -> Option<u64> {
        let id = self.selected_id()?;
        self.tts = FetchSlot::Loading;
        Some(id)
    }

    pub fn retry_video(&mut self) -> Option<u64> {
        let id = self.selected_id()?;
        self.video = FetchSlot::Loading;
        Some(id)
    }

    pub fn summary(&self) -> &FetchSlot<SummaryDoc> {
        &self.summary
    }

    pub fn quiz(&self) -> &FetchSlot<Vec<QuizQuestion>> {
        &self.quiz
    }

    pub fn tts(&self) -> &FetchSlot<TtsTrack> {
        &self.tts
    }

    pub fn video(&self) -> &FetchSlot<VideoLecture> {
        &self.video
    }

    pub fn video_previously_generated(&self, research_id: u64) -> bool {
        self.storage.get(&video_generated_key(research_id)).is_some()
    }

    // ── Keyword session ─────────────────────────────────────────────────

    pub fn keyword_session(&self) -> KeywordSession {
        persist::get_json(self.storage.as_ref(), KEYWORD_SESSION_KEY).unwrap_or_default()
    }

    pub fn save_keyword_session(&self, session: &KeywordSession) {
        persist::set_json(self.storage.as_ref(), KEYWORD_SESSION_KEY, session);
    }
}
