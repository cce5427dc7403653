//! Video lecture view — generation status, stream link, download.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::api::types::VideoStatus;
use crate::core::paper::{FetchSlot, PaperStore};
use crate::tui::theme;

pub enum VideoResult {
    Consumed,
    /// Save the mp4 locally.
    Download,
    /// Request a fresh render, discarding the cached one.
    Regenerate,
    /// Poll the backend again after a failure.
    Retry,
}

pub struct VideoState;

impl VideoState {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_input(&mut self, event: &Event, store: &PaperStore) -> Option<VideoResult> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };

        if store.video().error().is_some() {
            return match (*modifiers, *code) {
                (KeyModifiers::SHIFT, KeyCode::Char('R')) => Some(VideoResult::Retry),
                _ => None,
            };
        }
        let lecture = store.video().value()?;

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char('d'))
                if lecture.video_status == VideoStatus::Ready =>
            {
                Some(VideoResult::Download)
            }
            (KeyModifiers::NONE, KeyCode::Char('f')) => Some(VideoResult::Regenerate),
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, store: &PaperStore) {
        let block = theme::block_focused("Video");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = match store.video() {
            FetchSlot::Idle | FetchSlot::Loading => {
                vec![Line::styled(
                    "  Requesting video lecture...",
                    theme::muted(),
                )]
            }
            FetchSlot::Error(e) => vec![
                Line::styled(
                    format!("  Video request failed: {e}"),
                    Style::default().fg(theme::ERROR),
                ),
                Line::styled("  Press R to retry.", theme::muted()),
            ],
            FetchSlot::Ready(lecture) => match lecture.video_status {
                VideoStatus::Generating => vec![
                    Line::styled(
                        "  ⟳ The lecture is still rendering.",
                        Style::default().fg(theme::WARNING),
                    ),
                    Line::raw(""),
                    Line::styled(
                        "  This can take a few minutes; switch views and come back.",
                        theme::muted(),
                    ),
                ],
                VideoStatus::Error => vec![
                    Line::styled(
                        "  ✗ The backend could not render this lecture.",
                        Style::default().fg(theme::ERROR),
                    ),
                    Line::raw(""),
                    Line::from(vec![
                        Span::raw("  Press "),
                        Span::styled("f", theme::key_hint()),
                        Span::raw(" to force a fresh render."),
                    ]),
                ],
                VideoStatus::Ready => {
                    let mut lines = vec![
                        Line::styled(
                            "  ✓ Video lecture ready",
                            Style::default().fg(theme::SUCCESS),
                        ),
                        Line::raw(""),
                    ];
                    if let Some(url) = &lecture.stream_url {
                        lines.push(Line::from(vec![
                            Span::styled("  Stream: ", theme::muted()),
                            Span::styled(
                                url.clone(),
                                Style::default().fg(theme::INFO),
                            ),
                        ]));
                        lines.push(Line::raw(""));
                    }
                    lines.push(Line::from(vec![
                        Span::raw("  Press "),
                        Span::styled("d", theme::key_hint()),
                        Span::raw(" to download the mp4, "),
                        Span::styled("f", theme::key_hint()),
                        Span::raw(" to regenerate."),
                    ]));
                    lines
                }
            },
        };

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}
