//! Browse view — discover papers by domain or keyword.
//!
//! Domain tabs cycle with h/l; `/` opens a keyword search field. Results
//! load asynchronously and arrive on a channel stamped with the query they
//! were dispatched for, so a slow response for a previous domain or keyword
//! never replaces the current list.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tokio::sync::mpsc;

use crate::api::types::{Domain, Paper};
use crate::core::paper::KeywordSession;
use crate::tui::services::Services;
use crate::tui::theme;
use crate::tui::widgets::input_buffer::InputBuffer;

// ── Query stamping ──────────────────────────────────────────────────────────

/// The query a result set was produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchQuery {
    Domain(Domain),
    Keyword(String),
}

#[derive(Debug)]
struct SearchPayload {
    query: SearchQuery,
    result: Result<Vec<Paper>, String>,
}

// ── State ───────────────────────────────────────────────────────────────────

pub enum BrowseResult {
    /// Input consumed, view stays as-is.
    Consumed,
    /// User picked a paper to learn.
    Select(Paper),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    List,
    KeywordEntry,
}

pub struct BrowseState {
    domain: Domain,
    /// Query the current dispatch (and list) belongs to.
    query: SearchQuery,
    papers: Vec<Paper>,
    selected: usize,
    loading: bool,
    error: Option<String>,
    input_mode: InputMode,
    keyword: InputBuffer,
    /// Most recent keywords, newest first.
    recent_keywords: Vec<String>,
    data_rx: mpsc::UnboundedReceiver<SearchPayload>,
    data_tx: mpsc::UnboundedSender<SearchPayload>,
}

impl BrowseState {
    pub fn new() -> Self {
        let (data_tx, data_rx) = mpsc::unbounded_channel();
        Self {
            domain: Domain::Finance,
            query: SearchQuery::Domain(Domain::Finance),
            papers: Vec::new(),
            selected: 0,
            loading: false,
            error: None,
            input_mode: InputMode::List,
            keyword: InputBuffer::new(),
            recent_keywords: Vec::new(),
            data_rx,
            data_tx,
        }
    }

    /// Restore the keyword history from a persisted session.
    pub fn restore_session(&mut self, session: KeywordSession) {
        self.recent_keywords = session.keywords;
    }

    pub fn session(&self) -> KeywordSession {
        KeywordSession {
            keywords: self.recent_keywords.clone(),
            selected: self.recent_keywords.first().cloned(),
            source_file: None,
        }
    }

    /// Trigger an async search for the current query.
    pub fn load(&mut self, services: &Services) {
        self.loading = true;
        self.error = None;

        let query = self.query.clone();
        let browsing_domain = self.domain;
        let api = services.api.clone();
        let tx = self.data_tx.clone();

        tokio::spawn(async move {
            let result = match &query {
                SearchQuery::Domain(domain) => api.search_by_domain(*domain).await,
                SearchQuery::Keyword(keyword) => {
                    api.search_by_keyword(keyword, browsing_domain).await
                }
            };
            let result = result.map_err(|e| e.to_string());
            let _ = tx.send(SearchPayload { query, result });
        });
    }

    /// Poll for async results. Call from on_tick. Results stamped with a
    /// query other than the current one are dropped.
    pub fn poll(&mut self) {
        while let Ok(payload) = self.data_rx.try_recv() {
            if payload.query != self.query {
                log::debug!("Dropping stale search results for {:?}", payload.query);
                continue;
            }
            self.loading = false;
            match payload.result {
                Ok(papers) => {
                    log::info!("Search returned {} papers", papers.len());
                    self.selected = 0;
                    self.papers = papers;
                    self.error = None;
                }
                Err(e) => {
                    self.papers.clear();
                    self.error = Some(e);
                }
            }
        }
    }

    fn set_domain(&mut self, domain: Domain, services: &Services) {
        self.domain = domain;
        self.query = SearchQuery::Domain(domain);
        self.papers.clear();
        self.selected = 0;
        self.load(services);
    }

    fn run_keyword_search(&mut self, services: &Services) {
        let keyword = self.keyword.take();
        let keyword = keyword.trim().to_string();
        if keyword.is_empty() {
            self.input_mode = InputMode::List;
            return;
        }
        self.recent_keywords.retain(|k| k != &keyword);
        self.recent_keywords.insert(0, keyword.clone());
        self.recent_keywords.truncate(10);

        self.query = SearchQuery::Keyword(keyword);
        self.papers.clear();
        self.selected = 0;
        self.input_mode = InputMode::List;
        self.load(services);
    }

    // ── Input ───────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: &Event, services: &Services) -> Option<BrowseResult> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };

        if self.input_mode == InputMode::KeywordEntry {
            match code {
                KeyCode::Enter => self.run_keyword_search(services),
                KeyCode::Esc => {
                    self.keyword.clear();
                    self.input_mode = InputMode::List;
                }
                KeyCode::Backspace => self.keyword.backspace(),
                KeyCode::Delete => self.keyword.delete(),
                KeyCode::Left => self.keyword.move_left(),
                KeyCode::Right => self.keyword.move_right(),
                KeyCode::Home => self.keyword.move_home(),
                KeyCode::End => self.keyword.move_end(),
                KeyCode::Char(c) => self.keyword.insert_char(*c),
                _ => {}
            }
            return Some(BrowseResult::Consumed);
        }

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                if !self.papers.is_empty() {
                    self.selected = (self.selected + 1).min(self.papers.len() - 1);
                }
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                self.selected = self.selected.saturating_sub(1);
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('l') | KeyCode::Right) => {
                self.set_domain(self.domain.next(), services);
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('h') | KeyCode::Left) => {
                self.set_domain(self.domain.prev(), services);
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('/')) => {
                self.input_mode = InputMode::KeywordEntry;
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('r')) => {
                self.load(services);
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Enter) => {
                if let Some(paper) = self.papers.get(self.selected) {
                    return Some(BrowseResult::Select(paper.clone()));
                }
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::SHIFT, KeyCode::Char('G')) => {
                if !self.papers.is_empty() {
                    self.selected = self.papers.len() - 1;
                }
                Some(BrowseResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Char('g')) => {
                self.selected = 0;
                Some(BrowseResult::Consumed)
            }
            _ => None,
        }
    }

    // ── Rendering ───────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = theme::block_focused("Browse Papers");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::vertical([
            Constraint::Length(2), // Domain tabs + search field
            Constraint::Min(3),    // Paper list
            Constraint::Length(6), // Abstract preview
            Constraint::Length(1), // Footer
        ])
        .split(inner);

        self.render_tabs(frame, rows[0]);
        self.render_list(frame, rows[1]);
        self.render_preview(frame, rows[2]);
        self.render_footer(frame, rows[3]);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let mut spans: Vec<Span> = vec![Span::raw(" ")];
        let on_domain = matches!(self.query, SearchQuery::Domain(_));
        for domain in Domain::ALL {
            let style = if on_domain && domain == self.domain {
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme::TEXT_MUTED)
            };
            spans.push(Span::styled(format!(" {} ", domain.label()), style));
        }

        let mut lines = vec![Line::from(spans)];
        if self.input_mode == InputMode::KeywordEntry {
            lines.push(Line::from(vec![
                Span::styled(" search: ", theme::heading()),
                Span::styled(
                    self.keyword.text().to_string(),
                    Style::default().fg(theme::TEXT),
                ),
                Span::styled("█", Style::default().fg(theme::ACCENT)),
            ]));
        } else if let SearchQuery::Keyword(ref kw) = self.query {
            lines.push(Line::from(vec![
                Span::styled(" keyword: ", theme::muted()),
                Span::styled(kw.clone(), Style::default().fg(theme::ACCENT_SOFT)),
            ]));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_list(&self, frame: &mut Frame, area: Rect) {
        if self.loading {
            frame.render_widget(
                Paragraph::new(Line::styled("  Searching...", theme::muted())),
                area,
            );
            return;
        }

        if let Some(ref e) = self.error {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::styled(format!("  Search failed: {e}"), Style::default().fg(theme::ERROR)),
                    Line::styled("  Press r to retry.", theme::muted()),
                ]),
                area,
            );
            return;
        }

        if self.papers.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::styled(
                    "  No papers found. h/l to switch domain, / to search.",
                    theme::muted(),
                )),
                area,
            );
            return;
        }

        let visible = area.height as usize;
        let scroll = if self.selected >= visible {
            self.selected + 1 - visible
        } else {
            0
        };

        let lines: Vec<Line> = self
            .papers
            .iter()
            .enumerate()
            .skip(scroll)
            .take(visible)
            .map(|(i, paper)| {
                let is_selected = i == self.selected;
                let cursor = if is_selected { "▸ " } else { "  " };
                let title_style = if is_selected {
                    Style::default()
                        .fg(theme::ACCENT)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme::TEXT)
                };
                Line::from(vec![
                    Span::styled(cursor, Style::default().fg(theme::ACCENT)),
                    Span::styled(paper.title.clone(), title_style),
                    Span::styled(
                        format!("  {} · {}", paper.source, paper.published_at),
                        theme::dim(),
                    ),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_preview(&self, frame: &mut Frame, area: Rect) {
        let Some(paper) = self.papers.get(self.selected) else {
            return;
        };

        let authors = if paper.authors.is_empty() {
            "Unknown authors".to_string()
        } else {
            paper.authors.join(", ")
        };

        let lines = vec![
            Line::styled(format!("  {}", "─".repeat(40)), theme::dim()),
            Line::from(vec![
                Span::raw("  "),
                Span::styled(authors, Style::default().fg(theme::PRIMARY_LIGHT)),
            ]),
            Line::from(vec![
                Span::raw("  "),
                Span::styled(paper.abstract_text.clone(), theme::muted()),
            ]),
        ];

        frame.render_widget(Paragraph::new(lines).wrap(ratatui::widgets::Wrap { trim: true }), area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let footer = Line::from(vec![
            Span::styled(" h/l", theme::key_hint()),
            Span::raw(":domain "),
            Span::styled("/", theme::key_hint()),
            Span::raw(":keyword "),
            Span::styled("j/k", theme::key_hint()),
            Span::raw(":select "),
            Span::styled("Enter", theme::key_hint()),
            Span::raw(":learn "),
            Span::styled("r", theme::key_hint()),
            Span::raw(":refresh"),
        ]);
        frame.render_widget(Paragraph::new(footer), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(id: u64, title: &str) -> Paper {
        Paper {
            research_id: id,
            domain: Domain::Ai,
            title: title.into(),
            authors: vec![],
            abstract_text: String::new(),
            source: "arXiv".into(),
            published_at: "2024-01-01".into(),
            url: String::new(),
            pdf_url: None,
            arxiv_url: None,
        }
    }

    #[test]
    fn test_initial_state() {
        let state = BrowseState::new();
        assert_eq!(state.domain, Domain::Finance);
        assert!(state.papers.is_empty());
        assert!(!state.loading);
    }

    #[test]
    fn test_stale_payload_for_other_domain_dropped() {
        let mut state = BrowseState::new();
        state.query = SearchQuery::Domain(Domain::Ai);

        // A late result for Finance arrives after the user moved to AI.
        state
            .data_tx
            .send(SearchPayload {
                query: SearchQuery::Domain(Domain::Finance),
                result: Ok(vec![paper(1, "stale")]),
            })
            .unwrap();
        state.poll();
        assert!(state.papers.is_empty());

        state
            .data_tx
            .send(SearchPayload {
                query: SearchQuery::Domain(Domain::Ai),
                result: Ok(vec![paper(2, "fresh")]),
            })
            .unwrap();
        state.poll();
        assert_eq!(state.papers.len(), 1);
        assert_eq!(state.papers[0].title, "fresh");
    }

    #[test]
    fn test_error_clears_list() {
        let mut state = BrowseState::new();
        state.query = SearchQuery::Domain(Domain::Finance);
        state.papers = vec![paper(1, "old")];
        state
            .data_tx
            .send(SearchPayload {
                query: SearchQuery::Domain(Domain::Finance),
                result: Err("503 Service Unavailable".into()),
            })
            .unwrap();
        state.poll();
        assert!(state.papers.is_empty());
        assert!(state.error.is_some());
    }

    #[test]
    fn test_keyword_history_dedupes_and_caps() {
        let mut state = BrowseState::new();
        for i in 0..12 {
            state.recent_keywords.retain(|k| k != &format!("kw{i}"));
            state.recent_keywords.insert(0, format!("kw{i}"));
            state.recent_keywords.truncate(10);
        }
        assert_eq!(state.recent_keywords.len(), 10);
        assert_eq!(state.recent_keywords[0], "kw11");
    }

    #[test]
    fn test_session_roundtrip() {
        let mut state = BrowseState::new();
        state.recent_keywords = vec!["attention".into()];
        let session = state.session();
        assert_eq!(session.selected.as_deref(), Some("attention"));

        let mut other = BrowseState::new();
        other.restore_session(session);
        assert_eq!(other.recent_keywords, vec!["attention".to_string()]);
    }
}
