//! Root layout computation for sidebar + main content + status bar,
//! with an optional right-hand chat panel.

use ratatui::layout::{Constraint, Layout, Rect};

/// Width of the expanded sidebar (group headers + labeled items).
pub const SIDEBAR_EXPANDED_WIDTH: u16 = 22;
/// Width of the collapsed sidebar (single-char icons).
pub const SIDEBAR_COLLAPSED_WIDTH: u16 = 3;
/// Auto-collapse sidebar below this terminal width.
pub const AUTO_COLLAPSE_THRESHOLD: u16 = 70;
/// Hide sidebar entirely below this terminal width.
pub const HIDE_SIDEBAR_THRESHOLD: u16 = 24;
/// Chat panel takes this share of the content width when open.
pub const CHAT_PANEL_PERCENT: u16 = 40;

/// Computed layout regions for a single frame.
pub struct AppLayout {
    /// Sidebar area (None if hidden).
    pub sidebar: Option<Rect>,
    /// Main content area.
    pub main: Rect,
    /// Chat panel area (None when the panel is closed).
    pub chat: Option<Rect>,
    /// Status bar (bottom row).
    pub status: Rect,
}

/// Sidebar visibility state derived from terminal width and user preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarVisibility {
    Expanded,
    Collapsed,
    Hidden,
}

impl AppLayout {
    /// Compute layout regions from the terminal area and panel state.
    ///
    /// `user_collapsed`: user has toggled sidebar collapse with Ctrl+B.
    /// `chat_open`: the chat panel is showing to the right of main content.
    pub fn compute(area: Rect, user_collapsed: bool, chat_open: bool) -> (Self, SidebarVisibility) {
        let visibility = if area.width < HIDE_SIDEBAR_THRESHOLD {
            SidebarVisibility::Hidden
        } else if user_collapsed || area.width < AUTO_COLLAPSE_THRESHOLD {
            SidebarVisibility::Collapsed
        } else {
            SidebarVisibility::Expanded
        };

        let rows = Layout::vertical([
            Constraint::Min(1),    // Content (sidebar + main + chat)
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        let content_area = rows[0];
        let status = rows[1];

        let (sidebar, body) = match visibility {
            SidebarVisibility::Hidden => (None, content_area),
            SidebarVisibility::Collapsed => {
                let cols = Layout::horizontal([
                    Constraint::Length(SIDEBAR_COLLAPSED_WIDTH),
                    Constraint::Min(1),
                ])
                .split(content_area);
                (Some(cols[0]), cols[1])
            }
            SidebarVisibility::Expanded => {
                let cols = Layout::horizontal([
                    Constraint::Length(SIDEBAR_EXPANDED_WIDTH),
                    Constraint::Min(1),
                ])
                .split(content_area);
                (Some(cols[0]), cols[1])
            }
        };

        let (main, chat) = if chat_open {
            let cols = Layout::horizontal([
                Constraint::Percentage(100 - CHAT_PANEL_PERCENT),
                Constraint::Percentage(CHAT_PANEL_PERCENT),
            ])
            .split(body);
            (cols[0], Some(cols[1]))
        } else {
            (body, None)
        };

        (
            AppLayout {
                sidebar,
                main,
                chat,
                status,
            },
            visibility,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_layout() {
        let area = Rect::new(0, 0, 120, 40);
        let (layout, vis) = AppLayout::compute(area, false, false);
        assert_eq!(vis, SidebarVisibility::Expanded);
        assert_eq!(layout.sidebar.unwrap().width, SIDEBAR_EXPANDED_WIDTH);
        assert!(layout.chat.is_none());
        assert_eq!(layout.status.height, 1);
    }

    #[test]
    fn test_collapsed_by_user() {
        let area = Rect::new(0, 0, 120, 40);
        let (layout, vis) = AppLayout::compute(area, true, false);
        assert_eq!(vis, SidebarVisibility::Collapsed);
        assert_eq!(layout.sidebar.unwrap().width, SIDEBAR_COLLAPSED_WIDTH);
    }

    #[test]
    fn test_auto_collapse_narrow() {
        let area = Rect::new(0, 0, 65, 40);
        let (_, vis) = AppLayout::compute(area, false, false);
        assert_eq!(vis, SidebarVisibility::Collapsed);
    }

    #[test]
    fn test_hidden_very_narrow() {
        let area = Rect::new(0, 0, 20, 40);
        let (layout, vis) = AppLayout::compute(area, false, false);
        assert_eq!(vis, SidebarVisibility::Hidden);
        assert!(layout.sidebar.is_none());
        assert_eq!(layout.main.width, 20);
    }

    #[test]
    fn test_chat_panel_splits_body() {
        let area = Rect::new(0, 0, 120, 40);
        let (layout, _) = AppLayout::compute(area, false, true);
        let chat = layout.chat.unwrap();
        assert!(chat.width > 0);
        let sidebar_w = layout.sidebar.map(|s| s.width).unwrap_or(0);
        assert_eq!(sidebar_w + layout.main.width + chat.width, area.width);
    }

    #[test]
    fn test_main_plus_sidebar_fills_width() {
        let area = Rect::new(0, 0, 100, 30);
        let (layout, _) = AppLayout::compute(area, false, false);
        let sidebar_w = layout.sidebar.map(|s| s.width).unwrap_or(0);
        assert_eq!(sidebar_w + layout.main.width, area.width);
    }
}
