//! Chat panel — paper Q&A overlay on the right side of the screen.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::core::chatbot::{ChatRole, ChatbotPhase, ChatbotStore};
use crate::tui::theme;
use crate::tui::widgets::input_buffer::InputBuffer;

pub enum ChatResult {
    Consumed,
    /// Send a question to the backend.
    Send(String),
    /// Wipe the transcript for the current paper.
    Clear,
    /// Close the panel.
    Close,
}

pub struct ChatPanelState {
    input: InputBuffer,
    scroll: usize,
    /// Pin the view to the newest message until the user scrolls up.
    follow_tail: bool,
}

impl ChatPanelState {
    pub fn new() -> Self {
        Self {
            input: InputBuffer::new(),
            scroll: 0,
            follow_tail: true,
        }
    }

    pub fn reset(&mut self) {
        self.input.clear();
        self.scroll = 0;
        self.follow_tail = true;
    }

    /// The panel owns all keys while open.
    pub fn handle_input(&mut self, event: &Event, store: &ChatbotStore) -> Option<ChatResult> {
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
            (KeyModifiers::NONE, KeyCode::Esc) => Some(ChatResult::Close),
            (KeyModifiers::CONTROL, KeyCode::Char('l')) => Some(ChatResult::Clear),
            (KeyModifiers::NONE, KeyCode::Enter) => {
                if store.phase() != ChatbotPhase::Ready
                    || store.awaiting_answer()
                    || self.input.is_empty()
                {
                    return Some(ChatResult::Consumed);
                }
                self.follow_tail = true;
                Some(ChatResult::Send(self.input.take()))
            }
            (KeyModifiers::NONE, KeyCode::Backspace) => {
                self.input.backspace();
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Delete) => {
                self.input.delete();
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Left) => {
                self.input.move_left();
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Right) => {
                self.input.move_right();
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Home) => {
                self.input.move_home();
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::End) => {
                self.input.move_end();
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Up) => {
                self.follow_tail = false;
                self.scroll = self.scroll.saturating_sub(1);
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE, KeyCode::Down) => {
                self.scroll += 1;
                Some(ChatResult::Consumed)
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => {
                self.input.insert_char(c);
                Some(ChatResult::Consumed)
            }
            _ => Some(ChatResult::Consumed),
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, store: &ChatbotStore) {
        let block = theme::block_focused("Chat");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::vertical([
            Constraint::Min(1),    // transcript
            Constraint::Length(1), // status
            Constraint::Length(1), // input
        ])
        .split(inner);

        let width = rows[0].width.max(1) as usize;
        let mut lines: Vec<Line<'static>> = Vec::new();
        for turn in store.messages() {
            let (tag, style) = match turn.role {
                ChatRole::User => (
                    "you",
                    Style::default()
                        .fg(theme::ACCENT)
                        .add_modifier(Modifier::BOLD),
                ),
                ChatRole::Assistant => (
                    "paperdeck",
                    Style::default()
                        .fg(theme::PRIMARY_LIGHT)
                        .add_modifier(Modifier::BOLD),
                ),
            };
            lines.push(Line::from(Span::styled(format!("{tag}:"), style)));
            lines.push(Line::raw(turn.content.clone()));
            lines.push(Line::raw(""));
        }

        // Approximate wrapped height so tail-follow lands on the last message.
        let wrapped: usize = lines
            .iter()
            .map(|l| (l.to_string().chars().count().max(1)).div_ceil(width))
            .sum();
        let visible = rows[0].height as usize;
        let max_scroll = wrapped.saturating_sub(visible);
        let scroll = if self.follow_tail {
            max_scroll
        } else {
            self.scroll.min(max_scroll)
        };
        self.scroll = scroll;

        frame.render_widget(
            Paragraph::new(lines)
                .scroll((scroll as u16, 0))
                .wrap(Wrap { trim: false }),
            rows[0],
        );

        let status = match store.phase() {
            ChatbotPhase::Idle => Span::styled(" no session", theme::dim()),
            ChatbotPhase::Creating => Span::styled(" starting chat session...", theme::muted()),
            ChatbotPhase::Ready if store.awaiting_answer() => {
                Span::styled(" thinking...", Style::default().fg(theme::WARNING))
            }
            ChatbotPhase::Ready => Span::styled(
                " ready · Enter:send  Ctrl-l:clear  Esc:close",
                theme::dim(),
            ),
        };
        frame.render_widget(Paragraph::new(Line::from(status)), rows[1]);

        let prompt = Line::from(vec![
            Span::styled("> ", Style::default().fg(theme::ACCENT)),
            Span::raw(self.input.text().to_string()),
        ]);
        frame.render_widget(Paragraph::new(prompt), rows[2]);

        if store.phase() == ChatbotPhase::Ready && !store.awaiting_answer() {
            let cursor_x = rows[2].x + 2 + self.input.cursor_position() as u16;
            frame.set_cursor_position((cursor_x.min(rows[2].right().saturating_sub(1)), rows[2].y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::persist::MemoryStore;
    use std::sync::Arc;

    fn ready_store() -> ChatbotStore {
        let mut store = ChatbotStore::new(Arc::new(MemoryStore::new()));
        store.prepare_create(1);
        store.commit_created(1, Ok(()));
        store
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_enter_sends_trimmed_question() {
        let store = ready_store();
        let mut panel = ChatPanelState::new();
        for c in "hi there".chars() {
            panel.handle_input(&key(KeyCode::Char(c), KeyModifiers::NONE), &store);
        }
        match panel.handle_input(&key(KeyCode::Enter, KeyModifiers::NONE), &store) {
            Some(ChatResult::Send(q)) => assert_eq!(q, "hi there"),
            other => panic!("expected Send, got {:?}", matches!(other, None)),
        }
        assert!(panel.input.is_empty());
    }

    #[test]
    fn test_enter_blocked_while_awaiting() {
        let mut store = ready_store();
        let mut panel = ChatPanelState::new();
        store.push_user_turn("first");
        for c in "second".chars() {
            panel.handle_input(&key(KeyCode::Char(c), KeyModifiers::NONE), &store);
        }
        assert!(matches!(
            panel.handle_input(&key(KeyCode::Enter, KeyModifiers::NONE), &store),
            Some(ChatResult::Consumed)
        ));
    }

    #[test]
    fn test_empty_input_not_sent() {
        let store = ready_store();
        let mut panel = ChatPanelState::new();
        panel.handle_input(&key(KeyCode::Char(' '), KeyModifiers::NONE), &store);
        assert!(matches!(
            panel.handle_input(&key(KeyCode::Enter, KeyModifiers::NONE), &store),
            Some(ChatResult::Consumed)
        ));
    }

    #[test]
    fn test_esc_closes_and_ctrl_l_clears() {
        let store = ready_store();
        let mut panel = ChatPanelState::new();
        assert!(matches!(
            panel.handle_input(&key(KeyCode::Esc, KeyModifiers::NONE), &store),
            Some(ChatResult::Close)
        ));
        assert!(matches!(
            panel.handle_input(&key(KeyCode::Char('l'), KeyModifiers::CONTROL), &store),
            Some(ChatResult::Clear)
        ));
    }
}
