//! Events flowing through the Elm-architecture event loop.
//!
//! Async results carry the `research_id` that was current when the request
//! was dispatched. The stores drop results whose stamp no longer matches
//! the active selection.

use std::path::PathBuf;

use crate::api::types::{Paper, QuizQuestion, SummaryDoc, TtsTrack, VideoLecture};
use crate::tui::audio::AudioEvent;

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic tick for animations, notification TTLs, etc.
    Tick,
    /// Raw terminal input (keyboard/mouse).
    Input(crossterm::event::Event),

    // Stamped results of the per-paper fan-out.
    ArchiveSettled {
        research_id: u64,
        result: Result<String, String>,
    },
    SummaryFetched {
        research_id: u64,
        result: Result<SummaryDoc, String>,
    },
    QuizFetched {
        research_id: u64,
        result: Result<Vec<QuizQuestion>, String>,
    },
    TtsFetched {
        research_id: u64,
        result: Result<TtsTrack, String>,
    },
    VideoFetched {
        research_id: u64,
        result: Result<VideoLecture, String>,
    },
    /// Podcast audio bytes fetched for playback.
    TtsAudioLoaded {
        research_id: u64,
        result: Result<Vec<u8>, String>,
    },

    // Chatbot lifecycle.
    ChatbotCreated {
        research_id: u64,
        result: Result<(), String>,
    },
    ChatAnswered {
        research_id: u64,
        result: Result<String, String>,
    },

    /// A background download finished (PDF, audio, video).
    FileSaved {
        label: String,
        result: Result<PathBuf, String>,
    },

    /// Playback state change from the audio thread.
    AudioPlayback(AudioEvent),

    /// A resolved action to execute.
    Action(Action),
    /// Notification to display to the user.
    Notification(Notification),
    /// Request to quit the application.
    Quit,
}

/// High-level actions dispatched by the input mapper or views.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Navigation
    FocusBrowse,
    FocusSummary,
    FocusQuiz,
    FocusPodcast,
    FocusVideo,
    FocusHistory,
    TabNext,
    TabPrev,
    ToggleSidebar,

    // Selection
    SelectPaper(Paper),

    // Chat overlay
    ToggleChat,

    // Modals
    ShowHelp,
    CloseHelp,

    // Application
    Quit,
}

/// Which top-level view has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    Browse,
    Summary,
    Quiz,
    Podcast,
    Video,
    History,
}

impl Focus {
    pub const ALL: [Focus; 6] = [
        Focus::Browse,
        Focus::Summary,
        Focus::Quiz,
        Focus::Podcast,
        Focus::Video,
        Focus::History,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Focus::Browse => "Browse",
            Focus::Summary => "Summary",
            Focus::Quiz => "Quiz",
            Focus::Podcast => "Podcast",
            Focus::Video => "Video",
            Focus::History => "History",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Focus::Browse => "⌕",
            Focus::Summary => "¶",
            Focus::Quiz => "?",
            Focus::Podcast => "♪",
            Focus::Video => "▷",
            Focus::History => "≡",
        }
    }

    /// Everything except Browse needs a selected paper.
    pub fn requires_selection(self) -> bool {
        self != Focus::Browse
    }

    pub fn group(self) -> SidebarGroup {
        match self {
            Focus::Browse => SidebarGroup::Discover,
            _ => SidebarGroup::Learn,
        }
    }

    pub fn to_action(self) -> Action {
        match self {
            Focus::Browse => Action::FocusBrowse,
            Focus::Summary => Action::FocusSummary,
            Focus::Quiz => Action::FocusQuiz,
            Focus::Podcast => Action::FocusPodcast,
            Focus::Video => Action::FocusVideo,
            Focus::History => Action::FocusHistory,
        }
    }

    pub fn next(self) -> Focus {
        let idx = Focus::ALL.iter().position(|&f| f == self).unwrap_or(0);
        Focus::ALL[(idx + 1) % Focus::ALL.len()]
    }

    pub fn prev(self) -> Focus {
        let idx = Focus::ALL.iter().position(|&f| f == self).unwrap_or(0);
        Focus::ALL[(idx + Focus::ALL.len() - 1) % Focus::ALL.len()]
    }
}

/// Sidebar navigation groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarGroup {
    Discover,
    Learn,
}

impl SidebarGroup {
    pub const ALL: [SidebarGroup; 2] = [SidebarGroup::Discover, SidebarGroup::Learn];

    pub fn label(self) -> &'static str {
        match self {
            SidebarGroup::Discover => "Discover",
            SidebarGroup::Learn => "Learn",
        }
    }

    pub fn views(self) -> &'static [Focus] {
        match self {
            SidebarGroup::Discover => &[Focus::Browse],
            SidebarGroup::Learn => &[
                Focus::Summary,
                Focus::Quiz,
                Focus::Podcast,
                Focus::Video,
                Focus::History,
            ],
        }
    }
}

/// Whether sidebar or main content has input focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaFocus {
    Sidebar,
    Main,
}

/// Notification level for the overlay system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A timed notification shown in the overlay.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub level: NotificationLevel,
    /// Ticks remaining before auto-dismiss.
    pub ttl_ticks: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_next_cycles() {
        let mut f = Focus::Browse;
        for _ in 0..Focus::ALL.len() {
            f = f.next();
        }
        assert_eq!(f, Focus::Browse);
    }

    #[test]
    fn test_focus_prev_cycles() {
        assert_eq!(Focus::Browse.prev(), Focus::History);
        assert_eq!(Focus::History.next(), Focus::Browse);
    }

    #[test]
    fn test_only_browse_is_unguarded() {
        for f in Focus::ALL {
            assert_eq!(f.requires_selection(), f != Focus::Browse);
        }
    }

    #[test]
    fn test_sidebar_groups_cover_all_views() {
        let mut all_from_groups: Vec<Focus> = Vec::new();
        for group in SidebarGroup::ALL {
            all_from_groups.extend_from_slice(group.views());
        }
        assert_eq!(all_from_groups.len(), Focus::ALL.len());
        for f in Focus::ALL {
            assert!(all_from_groups.contains(&f));
        }
    }

    #[test]
    fn test_focus_to_action_is_unique() {
        let actions: Vec<Action> = Focus::ALL.iter().map(|f| f.to_action()).collect();
        for (i, a) in actions.iter().enumerate() {
            for (j, b) in actions.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b);
                }
            }
        }
    }
}
