//! Summary view — AI summary of the selected paper, rendered as markdown.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::core::paper::{FetchSlot, PaperStore};
use crate::tui::theme;
use crate::tui::widgets::markdown::markdown_to_lines;

pub enum SummaryResult {
    Consumed,
    /// Save the paper PDF locally.
    DownloadPaper,
    /// Re-fetch the summary after a failure.
    Retry,
}

pub struct SummaryState {
    lines_cache: Vec<Line<'static>>,
    scroll: usize,
}

impl SummaryState {
    pub fn new() -> Self {
        Self {
            lines_cache: Vec::new(),
            scroll: 0,
        }
    }

    /// Rebuild the rendered transcript. Called when the summary slot changes.
    pub fn refresh(&mut self, store: &PaperStore) {
        self.scroll = 0;
        self.lines_cache = match store.summary() {
            FetchSlot::Ready(doc) => {
                let mut lines = vec![
                    Line::styled(doc.title.clone(), theme::title()),
                    Line::raw(""),
                ];
                lines.extend(markdown_to_lines(&doc.summary));
                lines
            }
            _ => Vec::new(),
        };
    }

    pub fn handle_input(&mut self, event: &Event, store: &PaperStore) -> Option<SummaryResult> {
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
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                if self.scroll + 1 < self.lines_cache.len() {
                    self.scroll += 1;
                }
                Some(SummaryResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                self.scroll = self.scroll.saturating_sub(1);
                Some(SummaryResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('g')) => {
                self.scroll = 0;
                Some(SummaryResult::Consumed)
            }
            (KeyModifiers::SHIFT, KeyCode::Char('G')) => {
                self.scroll = self.lines_cache.len().saturating_sub(1);
                Some(SummaryResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('d')) => Some(SummaryResult::DownloadPaper),
            (KeyModifiers::SHIFT, KeyCode::Char('R')) => {
                if store.summary().error().is_some() {
                    Some(SummaryResult::Retry)
                } else {
                    Some(SummaryResult::Consumed)
                }
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, store: &PaperStore) {
        let block = theme::block_focused("Summary");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(inner);

        match store.summary() {
            FetchSlot::Idle | FetchSlot::Loading => {
                frame.render_widget(
                    Paragraph::new(Line::styled("  Summarizing paper...", theme::muted())),
                    rows[0],
                );
            }
            FetchSlot::Error(e) => {
                frame.render_widget(
                    Paragraph::new(vec![
                        Line::styled(
                            format!("  Summary failed: {e}"),
                            ratatui::style::Style::default().fg(theme::ERROR),
                        ),
                        Line::styled("  Press R to retry.", theme::muted()),
                    ]),
                    rows[0],
                );
            }
            FetchSlot::Ready(_) => {
                frame.render_widget(
                    Paragraph::new(self.lines_cache.clone())
                        .scroll((self.scroll as u16, 0))
                        .wrap(ratatui::widgets::Wrap { trim: false }),
                    rows[0],
                );
            }
        }

        let footer = Line::from(vec![
            Span::styled(" j/k", theme::key_hint()),
            Span::raw(":scroll "),
            Span::styled("d", theme::key_hint()),
            Span::raw(":download pdf "),
            Span::styled("R", theme::key_hint()),
            Span::raw(":retry "),
            Span::styled("c", theme::key_hint()),
            Span::raw(":chat"),
        ]);
        frame.render_widget(Paragraph::new(footer), rows[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Domain, Paper, SummaryDoc};
    use crate::core::persist::MemoryStore;
    use std::sync::Arc;

    fn ready_store() -> PaperStore {
        let mut store = PaperStore::new(Arc::new(MemoryStore::new()));
        store.select(Paper {
            research_id: 1,
            domain: Domain::Ai,
            title: "T".into(),
            authors: vec![],
            abstract_text: String::new(),
            source: "arXiv".into(),
            published_at: String::new(),
            url: String::new(),
            pdf_url: None,
            arxiv_url: None,
        });
        store.commit_summary(
            1,
            Ok(SummaryDoc {
                title: "Attention".into(),
                summary: "# Key idea\n\nSelf-attention.".into(),
                pdf_link: None,
            }),
        );
        store
    }

    #[test]
    fn test_refresh_builds_lines_from_ready_slot() {
        let store = ready_store();
        let mut view = SummaryState::new();
        view.refresh(&store);
        assert!(!view.lines_cache.is_empty());
        let text: String = view
            .lines_cache
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.contains("Attention"));
        assert!(text.contains("Key idea"));
    }

    #[test]
    fn test_refresh_clears_on_loading() {
        let store = ready_store();
        let mut view = SummaryState::new();
        view.refresh(&store);
        assert!(!view.lines_cache.is_empty());

        let mut store = store;
        store.retry_summary();
        view.refresh(&store);
        assert!(view.lines_cache.is_empty());
        assert_eq!(view.scroll, 0);
    }
}
