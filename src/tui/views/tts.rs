//! Podcast view — TTS explainer transcript with audio playback controls.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::core::paper::{FetchSlot, PaperStore};
use crate::tui::audio::PlaybackState;
use crate::tui::theme;
use crate::tui::widgets::markdown::markdown_to_lines;

pub enum PodcastResult {
    Consumed,
    /// Start playback (fetch audio first if not cached).
    Play,
    Pause,
    Resume,
    Stop,
    VolumeUp,
    VolumeDown,
    /// Save the mp3 locally.
    Download,
    /// Re-generate the track after a failure.
    Retry,
}

pub struct PodcastState {
    transcript_cache: Vec<Line<'static>>,
    scroll: usize,
    /// Set while the mp3 bytes are in flight.
    pub audio_loading: bool,
}

impl PodcastState {
    pub fn new() -> Self {
        Self {
            transcript_cache: Vec::new(),
            scroll: 0,
            audio_loading: false,
        }
    }

    pub fn refresh(&mut self, store: &PaperStore) {
        self.scroll = 0;
        self.audio_loading = false;
        self.transcript_cache = match store.tts() {
            FetchSlot::Ready(track) if !track.explainer.is_empty() => {
                markdown_to_lines(&track.explainer)
            }
            FetchSlot::Ready(_) => vec![Line::styled(
                "No transcript available for this episode.",
                theme::muted(),
            )],
            _ => Vec::new(),
        };
    }

    pub fn handle_input(
        &mut self,
        event: &Event,
        store: &PaperStore,
        playback: PlaybackState,
    ) -> Option<PodcastResult> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };

        if store.tts().error().is_some() {
            return match (*modifiers, *code) {
                (KeyModifiers::SHIFT, KeyCode::Char('R')) => Some(PodcastResult::Retry),
                _ => None,
            };
        }
        if store.tts().value().is_none() {
            return None;
        }

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char(' ')) => match playback {
                PlaybackState::Idle => Some(PodcastResult::Play),
                PlaybackState::Playing => Some(PodcastResult::Pause),
                PlaybackState::Paused => Some(PodcastResult::Resume),
            },
            (KeyModifiers::NONE, KeyCode::Char('s')) => Some(PodcastResult::Stop),
            (KeyModifiers::NONE, KeyCode::Char('+') | KeyCode::Char('=')) => {
                Some(PodcastResult::VolumeUp)
            }
            (KeyModifiers::NONE, KeyCode::Char('-')) => Some(PodcastResult::VolumeDown),
            (KeyModifiers::NONE, KeyCode::Char('d')) => Some(PodcastResult::Download),
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                if self.scroll + 1 < self.transcript_cache.len() {
                    self.scroll += 1;
                }
                Some(PodcastResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                self.scroll = self.scroll.saturating_sub(1);
                Some(PodcastResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('g')) => {
                self.scroll = 0;
                Some(PodcastResult::Consumed)
            }
            (KeyModifiers::SHIFT, KeyCode::Char('G')) => {
                self.scroll = self.transcript_cache.len().saturating_sub(1);
                Some(PodcastResult::Consumed)
            }
            _ => None,
        }
    }

    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        store: &PaperStore,
        playback: PlaybackState,
        volume: f32,
    ) {
        let block = theme::block_focused("Podcast");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match store.tts() {
            FetchSlot::Idle | FetchSlot::Loading => {
                frame.render_widget(
                    Paragraph::new(Line::styled(
                        "  Recording podcast episode...",
                        theme::muted(),
                    )),
                    inner,
                );
                return;
            }
            FetchSlot::Error(e) => {
                frame.render_widget(
                    Paragraph::new(vec![
                        Line::styled(
                            format!("  Podcast failed: {e}"),
                            Style::default().fg(theme::ERROR),
                        ),
                        Line::styled("  Press R to retry.", theme::muted()),
                    ]),
                    inner,
                );
                return;
            }
            FetchSlot::Ready(_) => {}
        }

        let rows = Layout::vertical([
            Constraint::Length(1), // player bar
            Constraint::Length(1),
            Constraint::Min(1),   // transcript
            Constraint::Length(1), // footer
        ])
        .split(inner);

        let status = if self.audio_loading {
            Span::styled("⟳ buffering", theme::muted())
        } else {
            match playback {
                PlaybackState::Idle => Span::styled("■ stopped", theme::muted()),
                PlaybackState::Playing => {
                    Span::styled("▶ playing", Style::default().fg(theme::SUCCESS))
                }
                PlaybackState::Paused => {
                    Span::styled("⏸ paused", Style::default().fg(theme::WARNING))
                }
            }
        };
        let player = Line::from(vec![
            Span::raw(" "),
            status,
            Span::raw("   "),
            Span::styled(format!("vol {:.0}%", volume * 100.0), theme::dim()),
        ]);
        frame.render_widget(Paragraph::new(player), rows[0]);

        frame.render_widget(
            Paragraph::new(self.transcript_cache.clone())
                .scroll((self.scroll as u16, 0))
                .wrap(Wrap { trim: false }),
            rows[2],
        );

        let footer = Line::from(vec![
            Span::styled(" space", theme::key_hint()),
            Span::raw(":play/pause "),
            Span::styled("s", theme::key_hint()),
            Span::raw(":stop "),
            Span::styled("+/-", theme::key_hint()),
            Span::raw(":volume "),
            Span::styled("d", theme::key_hint()),
            Span::raw(":download "),
            Span::styled("j/k", theme::key_hint()),
            Span::raw(":scroll"),
        ]);
        frame.render_widget(Paragraph::new(footer), rows[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Domain, Paper, TtsTrack};
    use crate::core::persist::MemoryStore;
    use std::sync::Arc;

    fn store_with_track(explainer: &str) -> PaperStore {
        let mut store = PaperStore::new(Arc::new(MemoryStore::new()));
        store.select(Paper {
            research_id: 3,
            domain: Domain::Cloud,
            title: "T".into(),
            authors: vec![],
            abstract_text: String::new(),
            source: "arXiv".into(),
            published_at: String::new(),
            url: String::new(),
            pdf_url: None,
            arxiv_url: None,
        });
        store.commit_tts(
            3,
            Ok(TtsTrack {
                message: String::new(),
                tts_id: "t3".into(),
                audio_file: "t3.mp3".into(),
                explainer: explainer.into(),
                download_url: None,
                stream_url: None,
            }),
        );
        store
    }

    #[test]
    fn test_refresh_builds_transcript() {
        let store = store_with_track("# Episode\n\nWelcome.");
        let mut view = PodcastState::new();
        view.refresh(&store);
        let text: String = view
            .transcript_cache
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains("Episode"));
    }

    #[test]
    fn test_missing_transcript_placeholder() {
        let store = store_with_track("");
        let mut view = PodcastState::new();
        view.refresh(&store);
        assert!(view.transcript_cache[0]
            .to_string()
            .contains("No transcript"));
    }

    #[test]
    fn test_space_toggles_by_playback_state() {
        let store = store_with_track("hi");
        let mut view = PodcastState::new();
        view.refresh(&store);

        let space = Event::Key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE));
        assert!(matches!(
            view.handle_input(&space, &store, PlaybackState::Idle),
            Some(PodcastResult::Play)
        ));
        assert!(matches!(
            view.handle_input(&space, &store, PlaybackState::Playing),
            Some(PodcastResult::Pause)
        ));
        assert!(matches!(
            view.handle_input(&space, &store, PlaybackState::Paused),
            Some(PodcastResult::Resume)
        ));
    }

    #[test]
    fn test_no_controls_while_loading() {
        let mut store = store_with_track("hi");
        store.retry_tts();
        let mut view = PodcastState::new();
        view.refresh(&store);

        let space = Event::Key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE));
        assert!(view
            .handle_input(&space, &store, PlaybackState::Idle)
            .is_none());
    }
}
