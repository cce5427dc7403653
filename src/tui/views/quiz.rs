//! O/X quiz view — one statement card at a time, answer then reveal.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Wrap},
    Frame,
};

use crate::api::types::OxAnswer;
use crate::core::paper::{FetchSlot, PaperStore};
use crate::tui::theme;

pub enum QuizResult {
    Consumed,
    /// Every card has been answered; the step counts as done.
    Completed,
    /// Re-fetch the quiz after a failure.
    Retry,
}

/// Per-card progress. Reset whenever the quiz slot changes.
pub struct QuizState {
    current: usize,
    answers: Vec<Option<OxAnswer>>,
    /// Whether the current card's verdict is showing.
    revealed: bool,
    finished: bool,
}

impl QuizState {
    pub fn new() -> Self {
        Self {
            current: 0,
            answers: Vec::new(),
            revealed: false,
            finished: false,
        }
    }

    pub fn refresh(&mut self, store: &PaperStore) {
        let len = store.quiz().value().map(Vec::len).unwrap_or(0);
        self.current = 0;
        self.answers = vec![None; len];
        self.revealed = false;
        self.finished = false;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn score(&self, store: &PaperStore) -> usize {
        let Some(questions) = store.quiz().value() else {
            return 0;
        };
        self.answers
            .iter()
            .zip(questions.iter())
            .filter(|(given, q)| **given == Some(q.answer))
            .count()
    }

    fn answer(&mut self, choice: OxAnswer) -> Option<QuizResult> {
        if self.revealed || self.finished {
            return Some(QuizResult::Consumed);
        }
        if let Some(slot) = self.answers.get_mut(self.current) {
            *slot = Some(choice);
            self.revealed = true;
        }
        Some(QuizResult::Consumed)
    }

    fn advance(&mut self) -> Option<QuizResult> {
        if !self.revealed {
            return Some(QuizResult::Consumed);
        }
        if self.current + 1 < self.answers.len() {
            self.current += 1;
            self.revealed = false;
            Some(QuizResult::Consumed)
        } else if !self.finished {
            self.finished = true;
            Some(QuizResult::Completed)
        } else {
            Some(QuizResult::Consumed)
        }
    }

    pub fn handle_input(&mut self, event: &Event, store: &PaperStore) -> Option<QuizResult> {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return None;
        };

        if store.quiz().error().is_some() {
            return match (*modifiers, *code) {
                (KeyModifiers::SHIFT, KeyCode::Char('R')) => Some(QuizResult::Retry),
                _ => None,
            };
        }
        if self.answers.is_empty() {
            return None;
        }

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char('o')) | (KeyModifiers::SHIFT, KeyCode::Char('O')) => {
                self.answer(OxAnswer::O)
            }
            (KeyModifiers::NONE, KeyCode::Char('x')) | (KeyModifiers::SHIFT, KeyCode::Char('X')) => {
                self.answer(OxAnswer::X)
            }
            (KeyModifiers::NONE, KeyCode::Enter | KeyCode::Char('n')) => self.advance(),
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, store: &PaperStore) {
        let block = theme::block_focused("Quiz");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match store.quiz() {
            FetchSlot::Idle | FetchSlot::Loading => {
                frame.render_widget(
                    Paragraph::new(Line::styled("  Writing quiz questions...", theme::muted())),
                    inner,
                );
                return;
            }
            FetchSlot::Error(e) => {
                frame.render_widget(
                    Paragraph::new(vec![
                        Line::styled(
                            format!("  Quiz failed: {e}"),
                            Style::default().fg(theme::ERROR),
                        ),
                        Line::styled("  Press R to retry.", theme::muted()),
                    ]),
                    inner,
                );
                return;
            }
            FetchSlot::Ready(questions) if questions.is_empty() => {
                frame.render_widget(
                    Paragraph::new(Line::styled(
                        "  No quiz questions for this paper.",
                        theme::muted(),
                    )),
                    inner,
                );
                return;
            }
            FetchSlot::Ready(_) => {}
        }

        let questions = match store.quiz().value() {
            Some(q) => q,
            None => return,
        };

        if self.finished {
            self.render_score(frame, inner, questions.len(), store);
            return;
        }

        let rows = Layout::vertical([
            Constraint::Length(1), // progress gauge
            Constraint::Length(1),
            Constraint::Min(3),   // question
            Constraint::Length(4), // verdict + explanation
            Constraint::Length(1), // footer
        ])
        .split(inner);

        let answered = self.answers.iter().filter(|a| a.is_some()).count();
        frame.render_widget(
            Gauge::default()
                .gauge_style(Style::default().fg(theme::PRIMARY).bg(theme::BG_SURFACE))
                .ratio(answered as f64 / questions.len() as f64)
                .label(format!("{}/{}", self.current + 1, questions.len())),
            rows[0],
        );

        let question = &questions[self.current];
        frame.render_widget(
            Paragraph::new(Line::styled(question.question.clone(), theme::heading()))
                .wrap(Wrap { trim: false }),
            rows[2],
        );

        if self.revealed {
            let given = self.answers[self.current];
            let correct = given == Some(question.answer);
            let verdict = if correct {
                Line::styled("  ✓ Correct", Style::default().fg(theme::SUCCESS))
            } else {
                Line::styled(
                    format!("  ✗ Wrong — the answer is {}", question.answer.label()),
                    Style::default().fg(theme::ERROR),
                )
            };
            frame.render_widget(
                Paragraph::new(vec![
                    verdict,
                    Line::raw(""),
                    Line::styled(format!("  {}", question.explanation), theme::muted()),
                ])
                .wrap(Wrap { trim: false }),
                rows[3],
            );
        }

        let footer = if self.revealed {
            Line::from(vec![
                Span::styled(" Enter", theme::key_hint()),
                Span::raw(":next"),
            ])
        } else {
            Line::from(vec![
                Span::styled(" o", theme::key_hint()),
                Span::raw(":true "),
                Span::styled("x", theme::key_hint()),
                Span::raw(":false"),
            ])
        };
        frame.render_widget(Paragraph::new(footer), rows[4]);
    }

    fn render_score(&self, frame: &mut Frame, area: Rect, total: usize, store: &PaperStore) {
        let score = self.score(store);
        let lines = vec![
            Line::raw(""),
            Line::styled("  Quiz complete!", theme::title()),
            Line::raw(""),
            Line::from(vec![
                Span::raw("  Score: "),
                Span::styled(
                    format!("{score}/{total}"),
                    Style::default().fg(if score * 2 >= total {
                        theme::SUCCESS
                    } else {
                        theme::WARNING
                    }),
                ),
            ]),
        ];
        frame.render_widget(Paragraph::new(lines), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Domain, Paper, QuizQuestion};
    use crate::core::persist::MemoryStore;
    use std::sync::Arc;

    fn store_with_quiz(questions: Vec<QuizQuestion>) -> PaperStore {
        let mut store = PaperStore::new(Arc::new(MemoryStore::new()));
        store.select(Paper {
            research_id: 7,
            domain: Domain::Finance,
            title: "T".into(),
            authors: vec![],
            abstract_text: String::new(),
            source: "arXiv".into(),
            published_at: String::new(),
            url: String::new(),
            pdf_url: None,
            arxiv_url: None,
        });
        store.commit_quiz(7, Ok(questions));
        store
    }

    fn two_questions() -> Vec<QuizQuestion> {
        vec![
            QuizQuestion {
                question: "Transformers use recurrence.".into(),
                answer: OxAnswer::X,
                explanation: "They rely on attention instead.".into(),
            },
            QuizQuestion {
                question: "Attention weights sum to one.".into(),
                answer: OxAnswer::O,
                explanation: "Softmax normalizes them.".into(),
            },
        ]
    }

    #[test]
    fn test_answer_reveal_advance_complete() {
        let store = store_with_quiz(two_questions());
        let mut quiz = QuizState::new();
        quiz.refresh(&store);

        assert!(matches!(quiz.answer(OxAnswer::X), Some(QuizResult::Consumed)));
        assert!(quiz.revealed);
        assert!(matches!(quiz.advance(), Some(QuizResult::Consumed)));
        assert_eq!(quiz.current, 1);
        assert!(!quiz.revealed);

        quiz.answer(OxAnswer::X);
        assert!(matches!(quiz.advance(), Some(QuizResult::Completed)));
        assert!(quiz.is_finished());
        assert_eq!(quiz.score(&store), 1);
    }

    #[test]
    fn test_advance_requires_reveal() {
        let store = store_with_quiz(two_questions());
        let mut quiz = QuizState::new();
        quiz.refresh(&store);

        quiz.advance();
        assert_eq!(quiz.current, 0);
    }

    #[test]
    fn test_second_answer_ignored() {
        let store = store_with_quiz(two_questions());
        let mut quiz = QuizState::new();
        quiz.refresh(&store);

        quiz.answer(OxAnswer::X);
        quiz.answer(OxAnswer::O);
        assert_eq!(quiz.answers[0], Some(OxAnswer::X));
    }

    #[test]
    fn test_completion_emitted_once() {
        let store = store_with_quiz(two_questions());
        let mut quiz = QuizState::new();
        quiz.refresh(&store);

        quiz.answer(OxAnswer::O);
        quiz.advance();
        quiz.answer(OxAnswer::O);
        assert!(matches!(quiz.advance(), Some(QuizResult::Completed)));
        assert!(matches!(quiz.advance(), Some(QuizResult::Consumed)));
    }

    #[test]
    fn test_refresh_resets_progress() {
        let store = store_with_quiz(two_questions());
        let mut quiz = QuizState::new();
        quiz.refresh(&store);
        quiz.answer(OxAnswer::O);
        quiz.advance();

        quiz.refresh(&store);
        assert_eq!(quiz.current, 0);
        assert!(quiz.answers.iter().all(Option::is_none));
        assert!(!quiz.is_finished());
    }
}
