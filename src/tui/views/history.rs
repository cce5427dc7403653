//! History view — the selected paper's record card and learning progress.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::core::paper::{ArchiveState, MissionStep, PaperStore};
use crate::tui::theme;

pub enum HistoryResult {
    Consumed,
    /// Save the paper PDF locally.
    DownloadPaper,
    /// Archive failed earlier; try again.
    RetryArchive,
}

pub struct HistoryState;

impl HistoryState {
    pub fn new() -> Self {
        Self
    }

    pub fn handle_input(&mut self, event: &Event, store: &PaperStore) -> Option<HistoryResult> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char('d')) => Some(HistoryResult::DownloadPaper),
            (KeyModifiers::SHIFT, KeyCode::Char('R'))
                if matches!(store.archive_state(), ArchiveState::Failed(_)) =>
            {
                Some(HistoryResult::RetryArchive)
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, store: &PaperStore) {
        let block = theme::block_focused("History");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(paper) = store.selected() else {
            return;
        };

        let mut lines = vec![
            Line::styled(paper.title.clone(), theme::title()),
            Line::raw(""),
            field("Domain", paper.domain.label()),
            field("Source", &paper.source),
            field("Published", &paper.published_at),
        ];
        if !paper.authors.is_empty() {
            lines.push(field("Authors", &paper.authors.join(", ")));
        }
        if !paper.url.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("  Link      ", theme::muted()),
                Span::styled(paper.url.clone(), Style::default().fg(theme::INFO)),
            ]));
        }

        lines.push(Line::raw(""));
        lines.push(match store.archive_state() {
            ArchiveState::Archived => Line::styled(
                "  ✓ Archived to your library",
                Style::default().fg(theme::SUCCESS),
            ),
            ArchiveState::Pending => Line::styled("  ⟳ Archiving...", theme::muted()),
            ArchiveState::Failed(e) => Line::styled(
                format!("  ✗ Archive failed: {e} (R to retry)"),
                Style::default().fg(theme::ERROR),
            ),
            ArchiveState::Idle => Line::styled("  Not archived", theme::dim()),
        });

        lines.push(Line::raw(""));
        lines.push(Line::styled("  Learning progress", theme::heading()));
        for step in MissionStep::ALL {
            let done = store.is_step_complete(step);
            let (mark, style) = if done {
                ("✓", Style::default().fg(theme::SUCCESS))
            } else {
                ("·", theme::dim())
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {mark} "), style),
                Span::styled(step.label(), if done { theme::muted() } else { theme::dim() }),
            ]));
        }

        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::raw("  Press "),
            Span::styled("d", theme::key_hint()),
            Span::raw(" to download the PDF."),
        ]));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }
}

fn field(name: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {name:<9} "), theme::muted()),
        Span::raw(value.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Domain, Paper};
    use crate::core::persist::MemoryStore;
    use std::sync::Arc;

    fn store_with_selection() -> PaperStore {
        let mut store = PaperStore::new(Arc::new(MemoryStore::new()));
        store.select(Paper {
            research_id: 4,
            domain: Domain::Logistics,
            title: "Routing".into(),
            authors: vec!["A. Author".into()],
            abstract_text: String::new(),
            source: "arXiv".into(),
            published_at: "2024-01-01".into(),
            url: "https://arxiv.org/abs/2401.0".into(),
            pdf_url: None,
            arxiv_url: None,
        });
        store
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_download_key() {
        let store = store_with_selection();
        let mut view = HistoryState::new();
        assert!(matches!(
            view.handle_input(&key(KeyCode::Char('d'), KeyModifiers::NONE), &store),
            Some(HistoryResult::DownloadPaper)
        ));
    }

    #[test]
    fn test_retry_archive_only_after_failure() {
        let mut store = store_with_selection();
        let mut view = HistoryState::new();
        let retry = key(KeyCode::Char('R'), KeyModifiers::SHIFT);

        assert!(view.handle_input(&retry, &store).is_none());

        store.commit_archive(4, Err("boom".into()));
        assert!(matches!(
            view.handle_input(&retry, &store),
            Some(HistoryResult::RetryArchive)
        ));
    }
}
