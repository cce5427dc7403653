//! Collapsible left sidebar with grouped navigation and mission progress.
//!
//! Learning steps show a checkmark once completed for the selected paper.
//! When no paper is selected the Learn group renders dimmed, matching the
//! route guard that bounces those views back to Browse.

use std::collections::BTreeSet;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::core::paper::MissionStep;

use super::events::{AreaFocus, Focus, SidebarGroup};
use super::layout::SidebarVisibility;
use super::theme;

/// Mission step tracked for a view, if any. Video is an extra, not a step.
fn mission_step_for(focus: Focus) -> Option<MissionStep> {
    match focus {
        Focus::Summary => Some(MissionStep::Summary),
        Focus::Quiz => Some(MissionStep::Quiz),
        Focus::Podcast => Some(MissionStep::Tts),
        Focus::History => Some(MissionStep::History),
        Focus::Browse | Focus::Video => None,
    }
}

/// Sidebar navigation state.
pub struct SidebarState {
    /// Whether the user has toggled collapse (Ctrl+B).
    pub user_collapsed: bool,
    /// Currently highlighted item index (into Focus::ALL).
    pub selected: usize,
}

impl SidebarState {
    pub fn new() -> Self {
        Self {
            user_collapsed: false,
            selected: 0,
        }
    }

    pub fn toggle_collapse(&mut self) {
        self.user_collapsed = !self.user_collapsed;
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % Focus::ALL.len();
    }

    pub fn select_prev(&mut self) {
        if self.selected == 0 {
            self.selected = Focus::ALL.len() - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn selected_focus(&self) -> Focus {
        Focus::ALL[self.selected]
    }

    /// Sync selection to match the active focus (e.g., after Tab navigation).
    pub fn sync_to_focus(&mut self, focus: Focus) {
        if let Some(idx) = Focus::ALL.iter().position(|&f| f == focus) {
            self.selected = idx;
        }
    }

    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        visibility: SidebarVisibility,
        current_focus: Focus,
        area_focus: AreaFocus,
        completed: &BTreeSet<MissionStep>,
        has_selection: bool,
    ) {
        match visibility {
            SidebarVisibility::Hidden => {}
            SidebarVisibility::Collapsed => {
                self.render_collapsed(frame, area, current_focus, has_selection);
            }
            SidebarVisibility::Expanded => {
                self.render_expanded(
                    frame,
                    area,
                    current_focus,
                    area_focus,
                    completed,
                    has_selection,
                );
            }
        }
    }

    fn render_collapsed(
        &self,
        frame: &mut Frame,
        area: Rect,
        current_focus: Focus,
        has_selection: bool,
    ) {
        let mut lines: Vec<Line> = Vec::new();

        for group in SidebarGroup::ALL {
            for &view in group.views() {
                if lines.len() >= area.height as usize {
                    break;
                }
                let style = if view == current_focus {
                    Style::default()
                        .fg(theme::ACCENT)
                        .add_modifier(Modifier::BOLD)
                } else if view.requires_selection() && !has_selection {
                    Style::default().fg(theme::TEXT_DIM)
                } else {
                    Style::default().fg(theme::TEXT_MUTED)
                };
                lines.push(Line::from(Span::styled(format!(" {}", view.icon()), style)));
            }
        }

        frame.render_widget(
            Paragraph::new(lines).style(Style::default().bg(theme::BG_SURFACE)),
            area,
        );
    }

    fn render_expanded(
        &self,
        frame: &mut Frame,
        area: Rect,
        current_focus: Focus,
        area_focus: AreaFocus,
        completed: &BTreeSet<MissionStep>,
        has_selection: bool,
    ) {
        let mut lines: Vec<Line> = Vec::new();
        let sidebar_focused = area_focus == AreaFocus::Sidebar;

        let mut focus_idx = 0usize;

        for group in SidebarGroup::ALL {
            if lines.len() >= area.height as usize {
                break;
            }

            lines.push(Line::from(Span::styled(
                format!(" {}", group.label()),
                Style::default()
                    .fg(theme::PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )));

            for &view in group.views() {
                if lines.len() >= area.height as usize {
                    break;
                }

                let is_current = view == current_focus;
                let is_selected = sidebar_focused && focus_idx == self.selected;
                let is_locked = view.requires_selection() && !has_selection;

                let (prefix, style) = if is_selected {
                    (
                        "▸ ",
                        Style::default()
                            .fg(if is_current { theme::ACCENT } else { theme::TEXT })
                            .add_modifier(Modifier::BOLD),
                    )
                } else if is_current {
                    (
                        "  ",
                        Style::default()
                            .fg(theme::ACCENT)
                            .add_modifier(Modifier::BOLD),
                    )
                } else if is_locked {
                    ("  ", Style::default().fg(theme::TEXT_DIM))
                } else {
                    ("  ", Style::default().fg(theme::TEXT_MUTED))
                };

                let check = match mission_step_for(view) {
                    Some(step) if completed.contains(&step) => " ✓",
                    _ => "",
                };

                let label = format!("{prefix}{} {}{check}", view.icon(), view.label());
                let padded = format!("{:<width$}", label, width = area.width as usize);

                if check.is_empty() {
                    lines.push(Line::from(Span::styled(padded, style)));
                } else {
                    // Checkmark gets its own green span at the end of the row.
                    let base = format!("{prefix}{} {}", view.icon(), view.label());
                    let pad_width = (area.width as usize).saturating_sub(base.len() + 2);
                    lines.push(Line::from(vec![
                        Span::styled(base, style),
                        Span::styled(" ✓", Style::default().fg(theme::SUCCESS)),
                        Span::raw(" ".repeat(pad_width)),
                    ]));
                }

                focus_idx += 1;
            }
        }

        frame.render_widget(
            Paragraph::new(lines).style(Style::default().bg(theme::BG_SURFACE)),
            area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SidebarState::new();
        assert!(!state.user_collapsed);
        assert_eq!(state.selected_focus(), Focus::Browse);
    }

    #[test]
    fn test_select_next_wraps() {
        let mut state = SidebarState::new();
        for _ in 0..Focus::ALL.len() {
            state.select_next();
        }
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_select_prev_wraps() {
        let mut state = SidebarState::new();
        state.select_prev();
        assert_eq!(state.selected, Focus::ALL.len() - 1);
    }

    #[test]
    fn test_sync_to_focus() {
        let mut state = SidebarState::new();
        state.sync_to_focus(Focus::Podcast);
        assert_eq!(state.selected_focus(), Focus::Podcast);
    }

    #[test]
    fn test_mission_steps_map_to_learn_views() {
        assert_eq!(mission_step_for(Focus::Summary), Some(MissionStep::Summary));
        assert_eq!(mission_step_for(Focus::Quiz), Some(MissionStep::Quiz));
        assert_eq!(mission_step_for(Focus::Podcast), Some(MissionStep::Tts));
        assert_eq!(mission_step_for(Focus::History), Some(MissionStep::History));
        assert_eq!(mission_step_for(Focus::Video), None);
        assert_eq!(mission_step_for(Focus::Browse), None);
    }
}
