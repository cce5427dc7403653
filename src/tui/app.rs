//! Application state and the main event loop.
//!
//! Input and async results funnel into one unbounded channel; each loop
//! iteration renders, waits for the next event, and updates state. Results
//! stamped with a stale research id are dropped by the stores, so a fast
//! paper switch never shows content from the previous paper.

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    DefaultTerminal, Frame,
};
use tokio::sync::mpsc;

use crate::api::types::Paper;
use crate::core::chatbot::{ChatbotStore, CreatePlan};
use crate::core::paper::{MissionStep, PaperStore};

use super::audio::AudioEvent;
use super::events::{Action, AppEvent, AreaFocus, Focus, Notification, NotificationLevel};
use super::layout::AppLayout;
use super::services::Services;
use super::sidebar::SidebarState;
use super::tasks;
use super::theme;
use super::views::browse::{BrowseResult, BrowseState};
use super::views::chat::{ChatPanelState, ChatResult};
use super::views::history::{HistoryResult, HistoryState};
use super::views::quiz::{QuizResult, QuizState};
use super::views::summary::{SummaryResult, SummaryState};
use super::views::tts::{PodcastResult, PodcastState};
use super::views::video::{VideoResult, VideoState};

const NOTIFICATION_TTL_TICKS: u32 = 100;
const MAX_NOTIFICATIONS: usize = 3;

pub struct AppState {
    running: bool,
    focus: Focus,
    area_focus: AreaFocus,
    show_help: bool,
    /// One guard notice per session of "no paper selected" bounces.
    guard_notice_sent: bool,

    sidebar: SidebarState,
    papers: PaperStore,
    chatbot: ChatbotStore,

    browse: BrowseState,
    summary_view: SummaryState,
    quiz_view: QuizState,
    podcast_view: PodcastState,
    video_view: VideoState,
    history_view: HistoryState,
    chat_panel: ChatPanelState,

    /// Podcast bytes for the current paper, so replay skips the refetch.
    podcast_audio: Option<(u64, Vec<u8>)>,

    notifications: Vec<Notification>,
    notification_counter: u64,

    services: Services,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl AppState {
    pub fn new(
        services: Services,
        event_tx: mpsc::UnboundedSender<AppEvent>,
        event_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> Self {
        let papers = PaperStore::new(services.storage.clone());
        let chatbot = ChatbotStore::new(services.storage.clone());

        let mut browse = BrowseState::new();
        browse.restore_session(papers.keyword_session());

        Self {
            running: true,
            focus: Focus::Browse,
            area_focus: AreaFocus::Main,
            show_help: false,
            guard_notice_sent: false,
            sidebar: SidebarState::new(),
            papers,
            chatbot,
            browse,
            summary_view: SummaryState::new(),
            quiz_view: QuizState::new(),
            podcast_view: PodcastState::new(),
            video_view: VideoState::new(),
            history_view: HistoryState::new(),
            chat_panel: ChatPanelState::new(),
            podcast_audio: None,
            notifications: Vec::new(),
            notification_counter: 0,
            services,
            event_tx,
            event_rx,
        }
    }

    /// Kick off initial background work: the browse search, and when a
    /// selection survived a restart, the full content fan-out for it.
    fn bootstrap(&mut self) {
        self.browse.load(&self.services);

        if let Some(paper) = self.papers.selected().cloned() {
            let plan = self.papers.select(paper);
            tasks::dispatch_selection(&self.services, &plan);
            self.prepare_chat_session(plan.research_id);
            self.focus = Focus::Summary;
            self.sidebar.sync_to_focus(self.focus);
        }
    }

    pub async fn run(
        &mut self,
        terminal: &mut DefaultTerminal,
        tick_rate: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.bootstrap();

        let mut tick = tokio::time::interval(tick_rate);
        let mut input = EventStream::new();

        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                _ = tick.tick() => {
                    self.handle_event(AppEvent::Tick);
                }
                Some(Ok(ev)) = input.next() => {
                    self.handle_event(AppEvent::Input(ev));
                }
                Some(ev) = self.event_rx.recv() => {
                    self.handle_event(ev);
                }
            }
        }
        Ok(())
    }

    // ── Event handling ──────────────────────────────────────────────────

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.on_tick(),
            AppEvent::Input(ev) => self.handle_input(ev),

            AppEvent::ArchiveSettled {
                research_id,
                result,
            } => {
                if let Err(e) = &result {
                    self.notify(NotificationLevel::Error, format!("Archive failed: {e}"));
                }
                self.papers.commit_archive(research_id, result);
            }
            AppEvent::SummaryFetched {
                research_id,
                result,
            } => {
                // Refresh only on a genuine commit; a stale result must not
                // touch the current paper's view state.
                if self.papers.commit_summary(research_id, result) {
                    self.summary_view.refresh(&self.papers);
                    self.mark_summary_if_viewed();
                }
            }
            AppEvent::QuizFetched {
                research_id,
                result,
            } => {
                if self.papers.commit_quiz(research_id, result) {
                    self.quiz_view.refresh(&self.papers);
                    self.mark_empty_quiz_if_viewed();
                }
            }
            AppEvent::TtsFetched {
                research_id,
                result,
            } => {
                if self.papers.commit_tts(research_id, result) {
                    self.podcast_view.refresh(&self.papers);
                }
            }
            AppEvent::VideoFetched {
                research_id,
                result,
            } => {
                self.papers.commit_video(research_id, result);
            }
            AppEvent::TtsAudioLoaded {
                research_id,
                result,
            } => {
                if self.papers.selected_id() != Some(research_id) {
                    log::warn!("Dropping stale podcast audio for paper {research_id}");
                    return;
                }
                self.podcast_view.audio_loading = false;
                match result {
                    Ok(bytes) => {
                        self.services.audio.play(bytes.clone());
                        self.podcast_audio = Some((research_id, bytes));
                    }
                    Err(e) => {
                        self.notify(
                            NotificationLevel::Error,
                            format!("Podcast audio failed: {e}"),
                        );
                    }
                }
            }

            AppEvent::ChatbotCreated {
                research_id,
                result,
            } => {
                if let Err(e) = &result {
                    self.notify(
                        NotificationLevel::Error,
                        format!("Chat session failed: {e}"),
                    );
                }
                self.chatbot.commit_created(research_id, result);
            }
            AppEvent::ChatAnswered {
                research_id,
                result,
            } => {
                self.chatbot.commit_answer(research_id, result);
            }

            AppEvent::FileSaved { label, result } => match result {
                Ok(path) => self.notify(
                    NotificationLevel::Success,
                    format!("{label} saved to {}", path.display()),
                ),
                Err(e) => {
                    self.notify(NotificationLevel::Error, format!("{label} failed: {e}"))
                }
            },

            AppEvent::AudioPlayback(ev) => {
                if let AudioEvent::Error(e) = &ev {
                    self.notify(NotificationLevel::Error, format!("Playback error: {e}"));
                }
                if matches!(ev, AudioEvent::Playing) {
                    self.papers.mark_step_complete(MissionStep::Tts);
                }
                self.services.audio.update_state(&ev);
            }

            AppEvent::Action(action) => self.handle_action(action),
            AppEvent::Notification(n) => self.push_notification(n),
            AppEvent::Quit => self.running = false,
        }
    }

    fn on_tick(&mut self) {
        self.browse.poll();
        for n in &mut self.notifications {
            n.ttl_ticks = n.ttl_ticks.saturating_sub(1);
        }
        self.notifications.retain(|n| n.ttl_ticks > 0);
    }

    // ── Input routing ───────────────────────────────────────────────────

    fn handle_input(&mut self, event: Event) {
        if self.show_help {
            if let Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                ..
            }) = event
            {
                self.show_help = false;
            }
            return;
        }

        // The chat overlay owns all keys while open.
        if self.chatbot.panel_open() {
            if let Some(result) = self.chat_panel.handle_input(&event, &self.chatbot) {
                self.handle_chat_result(result);
            }
            return;
        }

        if self.area_focus == AreaFocus::Sidebar {
            self.handle_sidebar_input(&event);
            return;
        }

        // Active view gets the key first; unhandled keys fall through to
        // the global bindings.
        let consumed = match self.focus {
            Focus::Browse => {
                let result = self.browse.handle_input(&event, &self.services);
                if let Some(result) = result {
                    self.handle_browse_result(result);
                    true
                } else {
                    false
                }
            }
            Focus::Summary => {
                if let Some(result) = self.summary_view.handle_input(&event, &self.papers) {
                    self.handle_summary_result(result);
                    true
                } else {
                    false
                }
            }
            Focus::Quiz => {
                if let Some(result) = self.quiz_view.handle_input(&event, &self.papers) {
                    self.handle_quiz_result(result);
                    true
                } else {
                    false
                }
            }
            Focus::Podcast => {
                let playback = self.services.audio.state();
                if let Some(result) =
                    self.podcast_view.handle_input(&event, &self.papers, playback)
                {
                    self.handle_podcast_result(result);
                    true
                } else {
                    false
                }
            }
            Focus::Video => {
                if let Some(result) = self.video_view.handle_input(&event, &self.papers) {
                    self.handle_video_result(result);
                    true
                } else {
                    false
                }
            }
            Focus::History => {
                if let Some(result) = self.history_view.handle_input(&event, &self.papers) {
                    self.handle_history_result(result);
                    true
                } else {
                    false
                }
            }
        };
        if consumed {
            return;
        }

        if let Some(action) = self.map_global_key(&event) {
            self.handle_action(action);
        }
    }

    fn map_global_key(&self, event: &Event) -> Option<Action> {
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
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Quit),
            (KeyModifiers::NONE, KeyCode::Char('q')) => Some(Action::Quit),
            (KeyModifiers::NONE, KeyCode::Char('?')) => Some(Action::ShowHelp),
            (KeyModifiers::NONE, KeyCode::Tab) => Some(Action::TabNext),
            (KeyModifiers::SHIFT, KeyCode::BackTab) => Some(Action::TabPrev),
            (KeyModifiers::CONTROL, KeyCode::Char('b')) => Some(Action::ToggleSidebar),
            (KeyModifiers::NONE, KeyCode::Char('c')) => Some(Action::ToggleChat),
            (KeyModifiers::NONE, KeyCode::Char('1')) => Some(Action::FocusBrowse),
            (KeyModifiers::NONE, KeyCode::Char('2')) => Some(Action::FocusSummary),
            (KeyModifiers::NONE, KeyCode::Char('3')) => Some(Action::FocusQuiz),
            (KeyModifiers::NONE, KeyCode::Char('4')) => Some(Action::FocusPodcast),
            (KeyModifiers::NONE, KeyCode::Char('5')) => Some(Action::FocusVideo),
            (KeyModifiers::NONE, KeyCode::Char('6')) => Some(Action::FocusHistory),
            _ => None,
        }
    }

    fn handle_sidebar_input(&mut self, event: &Event) {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = event
        else {
            return;
        };

        match (*modifiers, *code) {
            (KeyModifiers::NONE, KeyCode::Char('j') | KeyCode::Down) => {
                self.sidebar.select_next();
            }
            (KeyModifiers::NONE, KeyCode::Char('k') | KeyCode::Up) => {
                self.sidebar.select_prev();
            }
            (KeyModifiers::NONE, KeyCode::Enter) => {
                let action = self.sidebar.selected_focus().to_action();
                self.area_focus = AreaFocus::Main;
                self.handle_action(action);
            }
            (KeyModifiers::NONE, KeyCode::Esc | KeyCode::Char('l') | KeyCode::Right) => {
                self.area_focus = AreaFocus::Main;
            }
            (KeyModifiers::NONE, KeyCode::Char('q')) => self.running = false,
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => self.running = false,
            (KeyModifiers::CONTROL, KeyCode::Char('b')) => self.sidebar.toggle_collapse(),
            (KeyModifiers::NONE, KeyCode::Char('?')) => self.show_help = true,
            _ => {}
        }
    }

    // ── Actions ─────────────────────────────────────────────────────────

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::FocusBrowse => self.set_focus(Focus::Browse),
            Action::FocusSummary => self.set_focus(Focus::Summary),
            Action::FocusQuiz => self.set_focus(Focus::Quiz),
            Action::FocusPodcast => self.set_focus(Focus::Podcast),
            Action::FocusVideo => self.set_focus(Focus::Video),
            Action::FocusHistory => self.set_focus(Focus::History),
            Action::TabNext => self.set_focus(self.focus.next()),
            Action::TabPrev => self.set_focus(self.focus.prev()),
            Action::ToggleSidebar => {
                if self.area_focus == AreaFocus::Main && !self.sidebar.user_collapsed {
                    self.area_focus = AreaFocus::Sidebar;
                    self.sidebar.sync_to_focus(self.focus);
                } else {
                    self.sidebar.toggle_collapse();
                }
            }
            Action::SelectPaper(paper) => self.select_paper(paper),
            Action::ToggleChat => {
                if self.papers.selected().is_none() {
                    self.notify(
                        NotificationLevel::Warning,
                        "Select a paper before opening chat".to_string(),
                    );
                    return;
                }
                if !self.chatbot.panel_open() {
                    self.chat_panel.reset();
                }
                self.chatbot.toggle_panel();
            }
            Action::ShowHelp => self.show_help = true,
            Action::CloseHelp => self.show_help = false,
            Action::Quit => self.running = false,
        }
    }

    /// Route guard: learning views need a selected paper. The bounce posts
    /// one notice per dry spell, not one per keypress.
    fn set_focus(&mut self, focus: Focus) {
        if focus.requires_selection() && self.papers.selected().is_none() {
            if !self.guard_notice_sent {
                self.notify(
                    NotificationLevel::Warning,
                    "Pick a paper in Browse first".to_string(),
                );
                self.guard_notice_sent = true;
            }
            self.focus = Focus::Browse;
            self.sidebar.sync_to_focus(self.focus);
            return;
        }

        self.focus = focus;
        self.sidebar.sync_to_focus(focus);

        match focus {
            Focus::Summary => self.mark_summary_if_viewed(),
            Focus::Quiz => self.mark_empty_quiz_if_viewed(),
            Focus::History => self.papers.mark_step_complete(MissionStep::History),
            _ => {}
        }
    }

    fn select_paper(&mut self, paper: Paper) {
        let plan = self.papers.select(paper);
        self.guard_notice_sent = false;
        self.podcast_audio = None;
        self.services.audio.stop();

        self.summary_view.refresh(&self.papers);
        self.quiz_view.refresh(&self.papers);
        self.podcast_view.refresh(&self.papers);

        self.papers.save_keyword_session(&self.browse.session());

        tasks::dispatch_selection(&self.services, &plan);
        self.prepare_chat_session(plan.research_id);

        self.set_focus(Focus::Summary);
    }

    fn prepare_chat_session(&mut self, research_id: u64) {
        match self.chatbot.prepare_create(research_id) {
            CreatePlan::Skip => {}
            CreatePlan::Start {
                research_id,
                refresh_old,
            } => {
                self.chat_panel.reset();
                tasks::dispatch_chatbot_create(&self.services, research_id, refresh_old);
            }
        }
    }

    /// Reading the summary counts once it is actually on screen.
    fn mark_summary_if_viewed(&mut self) {
        if self.focus == Focus::Summary && self.papers.summary().value().is_some() {
            self.papers.mark_step_complete(MissionStep::Summary);
        }
    }

    /// A paper with no quiz questions cannot block the mission.
    fn mark_empty_quiz_if_viewed(&mut self) {
        if self.focus == Focus::Quiz
            && self
                .papers
                .quiz()
                .value()
                .is_some_and(|questions| questions.is_empty())
        {
            self.papers.mark_step_complete(MissionStep::Quiz);
        }
    }

    // ── View results ────────────────────────────────────────────────────

    fn handle_browse_result(&mut self, result: BrowseResult) {
        match result {
            BrowseResult::Consumed => {}
            BrowseResult::Select(paper) => self.select_paper(paper),
        }
    }

    fn handle_summary_result(&mut self, result: SummaryResult) {
        match result {
            SummaryResult::Consumed => {}
            SummaryResult::DownloadPaper => self.download_paper(),
            SummaryResult::Retry => {
                if let Some(id) = self.papers.retry_summary() {
                    self.summary_view.refresh(&self.papers);
                    tasks::dispatch_summary(&self.services, id);
                }
            }
        }
    }

    fn handle_quiz_result(&mut self, result: QuizResult) {
        match result {
            QuizResult::Consumed => {}
            QuizResult::Completed => {
                self.papers.mark_step_complete(MissionStep::Quiz);
                self.notify(NotificationLevel::Success, "Quiz complete!".to_string());
            }
            QuizResult::Retry => {
                if let Some(id) = self.papers.retry_quiz() {
                    self.quiz_view.refresh(&self.papers);
                    tasks::dispatch_quiz(&self.services, id);
                }
            }
        }
    }

    fn handle_podcast_result(&mut self, result: PodcastResult) {
        match result {
            PodcastResult::Consumed => {}
            PodcastResult::Play => self.start_podcast_playback(),
            PodcastResult::Pause => self.services.audio.pause(),
            PodcastResult::Resume => self.services.audio.resume(),
            PodcastResult::Stop => self.services.audio.stop(),
            PodcastResult::VolumeUp => {
                let vol = self.services.audio.volume() + 0.1;
                self.services.audio.set_volume(vol);
            }
            PodcastResult::VolumeDown => {
                let vol = self.services.audio.volume() - 0.1;
                self.services.audio.set_volume(vol);
            }
            PodcastResult::Download => {
                let request = match (self.papers.selected(), self.papers.tts().value()) {
                    (Some(paper), Some(track)) => {
                        Some((track.audio_file.clone(), paper.title.clone()))
                    }
                    _ => None,
                };
                if let Some((audio_file, title)) = request {
                    self.notify(
                        NotificationLevel::Info,
                        "Downloading podcast audio...".to_string(),
                    );
                    tasks::dispatch_save_audio(&self.services, audio_file, title);
                }
            }
            PodcastResult::Retry => {
                if let Some(id) = self.papers.retry_tts() {
                    self.podcast_view.refresh(&self.papers);
                    tasks::dispatch_tts(&self.services, id);
                }
            }
        }
    }

    fn start_podcast_playback(&mut self) {
        let Some(id) = self.papers.selected_id() else {
            return;
        };
        if let Some((cached_id, bytes)) = &self.podcast_audio {
            if *cached_id == id {
                self.services.audio.play(bytes.clone());
                return;
            }
        }
        if let Some(track) = self.papers.tts().value() {
            self.podcast_view.audio_loading = true;
            tasks::dispatch_tts_audio(&self.services, id, track.audio_file.clone());
        }
    }

    fn handle_video_result(&mut self, result: VideoResult) {
        match result {
            VideoResult::Consumed => {}
            VideoResult::Download => {
                if let Some(id) = self.papers.selected_id() {
                    self.notify(
                        NotificationLevel::Info,
                        "Downloading video lecture...".to_string(),
                    );
                    tasks::dispatch_save_video(&self.services, id);
                }
            }
            VideoResult::Regenerate => {
                if let Some(id) = self.papers.retry_video() {
                    tasks::dispatch_video(&self.services, id, true);
                }
            }
            VideoResult::Retry => {
                if let Some(id) = self.papers.retry_video() {
                    tasks::dispatch_video(&self.services, id, false);
                }
            }
        }
    }

    fn handle_history_result(&mut self, result: HistoryResult) {
        match result {
            HistoryResult::Consumed => {}
            HistoryResult::DownloadPaper => self.download_paper(),
            HistoryResult::RetryArchive => {
                if let Some(plan) = self.papers.retry_archive() {
                    tasks::dispatch_archive(&self.services, plan.research_id);
                }
            }
        }
    }

    fn download_paper(&mut self) {
        if let Some(id) = self.papers.selected_id() {
            self.notify(NotificationLevel::Info, "Downloading paper PDF...".to_string());
            tasks::dispatch_save_paper(&self.services, id);
        }
    }

    fn handle_chat_result(&mut self, result: ChatResult) {
        match result {
            ChatResult::Consumed => {}
            ChatResult::Send(question) => {
                if let Some(id) = self.chatbot.push_user_turn(&question) {
                    tasks::dispatch_chat_message(&self.services, id, question);
                }
            }
            ChatResult::Clear => self.chatbot.clear(),
            ChatResult::Close => self.chatbot.close_panel(),
        }
    }

    // ── Notifications ───────────────────────────────────────────────────

    fn notify(&mut self, level: NotificationLevel, message: String) {
        self.notification_counter += 1;
        let n = Notification {
            id: self.notification_counter,
            message,
            level,
            ttl_ticks: NOTIFICATION_TTL_TICKS,
        };
        self.push_notification(n);
    }

    fn push_notification(&mut self, n: Notification) {
        // Duplicate messages just refresh the timer.
        if let Some(existing) = self
            .notifications
            .iter_mut()
            .find(|e| e.message == n.message)
        {
            existing.ttl_ticks = NOTIFICATION_TTL_TICKS;
            return;
        }
        if self.notifications.len() >= MAX_NOTIFICATIONS {
            self.notifications.remove(0);
        }
        self.notifications.push(n);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    fn render(&mut self, frame: &mut Frame) {
        let chat_open = self.chatbot.panel_open();
        let (layout, visibility) =
            AppLayout::compute(frame.area(), self.sidebar.user_collapsed, chat_open);

        if let Some(sidebar_area) = layout.sidebar {
            self.sidebar.render(
                frame,
                sidebar_area,
                visibility,
                self.focus,
                self.area_focus,
                self.papers.completed_steps(),
                self.papers.selected().is_some(),
            );
        }

        match self.focus {
            Focus::Browse => self.browse.render(frame, layout.main),
            Focus::Summary => self.summary_view.render(frame, layout.main, &self.papers),
            Focus::Quiz => self.quiz_view.render(frame, layout.main, &self.papers),
            Focus::Podcast => self.podcast_view.render(
                frame,
                layout.main,
                &self.papers,
                self.services.audio.state(),
                self.services.audio.volume(),
            ),
            Focus::Video => self.video_view.render(frame, layout.main, &self.papers),
            Focus::History => self.history_view.render(frame, layout.main, &self.papers),
        }

        if let Some(chat_area) = layout.chat {
            self.chat_panel.render(frame, chat_area, &self.chatbot);
        }

        self.render_status_bar(frame, layout.status);
        self.render_notifications(frame, layout.main);

        if self.show_help {
            self.render_help(frame);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(" paperdeck ", theme::brand_badge()),
            Span::raw(" "),
            Span::styled(self.focus.label(), Style::default().fg(theme::ACCENT)),
        ];
        if let Some(paper) = self.papers.selected() {
            spans.push(Span::styled(" · ", theme::dim()));
            spans.push(Span::styled(
                truncated(&paper.title, area.width.saturating_sub(40) as usize),
                theme::muted(),
            ));
            let done = self.papers.completed_steps().len();
            spans.push(Span::styled(
                format!("  [{done}/{} steps]", MissionStep::ALL.len()),
                Style::default().fg(if done == MissionStep::ALL.len() {
                    theme::SUCCESS
                } else {
                    theme::TEXT_DIM
                }),
            ));
        }
        spans.push(Span::styled("  ?:help q:quit", theme::dim()));

        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(theme::BG_SURFACE)),
            area,
        );
    }

    fn render_notifications(&self, frame: &mut Frame, main: Rect) {
        for (i, n) in self.notifications.iter().enumerate() {
            let width = (n.message.len() as u16 + 4).min(main.width.saturating_sub(2));
            let area = Rect {
                x: main.right().saturating_sub(width + 1),
                y: main.y + 1 + (i as u16 * 3),
                width,
                height: 3,
            };
            if area.bottom() > main.bottom() {
                break;
            }
            let color = match n.level {
                NotificationLevel::Info => theme::INFO,
                NotificationLevel::Success => theme::SUCCESS,
                NotificationLevel::Warning => theme::WARNING,
                NotificationLevel::Error => theme::ERROR,
            };
            frame.render_widget(Clear, area);
            frame.render_widget(
                Paragraph::new(Line::raw(n.message.clone())).block(
                    ratatui::widgets::Block::bordered()
                        .border_style(Style::default().fg(color))
                        .style(Style::default().bg(theme::BG_SURFACE)),
                ),
                area,
            );
        }
    }

    fn render_help(&self, frame: &mut Frame) {
        let area = centered_rect(60, 70, frame.area());
        frame.render_widget(Clear, area);

        let bold = Style::default()
            .fg(theme::ACCENT)
            .add_modifier(Modifier::BOLD);
        let lines = vec![
            Line::styled("Keyboard reference", theme::title()),
            Line::raw(""),
            Line::styled("Global", bold),
            help_line("1-6", "jump to view"),
            help_line("Tab / Shift-Tab", "next / previous view"),
            help_line("Ctrl-b", "focus or collapse sidebar"),
            help_line("c", "toggle chat panel"),
            help_line("?", "this help"),
            help_line("q / Ctrl-c", "quit"),
            Line::raw(""),
            Line::styled("Browse", bold),
            help_line("h/l", "switch domain"),
            help_line("/", "keyword search"),
            help_line("j/k, Enter", "pick a paper"),
            help_line("r", "reload results"),
            Line::raw(""),
            Line::styled("Learning", bold),
            help_line("o / x", "answer quiz card"),
            help_line("space, s, +/-", "podcast play, stop, volume"),
            help_line("d", "download (pdf / audio / video)"),
            help_line("f", "regenerate video"),
            help_line("R", "retry a failed request"),
            Line::raw(""),
            Line::styled("Press any key to close", theme::dim()),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(
                theme::block_focused("Help")
                    .style(Style::default().bg(theme::BG_SURFACE)),
            ),
            area,
        );
    }
}

fn help_line(keys: &str, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {keys:<16}"), theme::key_hint()),
        Span::raw(what.to_string()),
    ])
}

fn truncated(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{Domain, OxAnswer, QuizQuestion, TtsTrack};
    use crate::core::persist::MemoryStore;
    use std::sync::Arc;

    fn test_app() -> AppState {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let services = Services {
            api: Arc::new(crate::api::ApiClient::new("http://127.0.0.1:0")),
            storage: Arc::new(MemoryStore::new()),
            audio: super::super::audio::AudioPlayer::new(event_tx.clone()),
            downloads_dir: std::env::temp_dir(),
            event_tx: event_tx.clone(),
        };
        AppState::new(services, event_tx, event_rx)
    }

    fn sample_paper(id: u64) -> Paper {
        Paper {
            research_id: id,
            domain: Domain::Ai,
            title: format!("Paper {id}"),
            authors: vec![],
            abstract_text: String::new(),
            source: "arXiv".into(),
            published_at: String::new(),
            url: String::new(),
            pdf_url: None,
            arxiv_url: None,
        }
    }

    #[tokio::test]
    async fn test_route_guard_bounces_to_browse_once() {
        let mut app = test_app();

        app.set_focus(Focus::Summary);
        assert_eq!(app.focus, Focus::Browse);
        assert_eq!(app.notifications.len(), 1);

        // Second bounce stays quiet.
        app.set_focus(Focus::Quiz);
        assert_eq!(app.notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_guard_notice_rearms_after_selection() {
        let mut app = test_app();
        app.set_focus(Focus::Summary);
        assert!(app.guard_notice_sent);

        app.select_paper(sample_paper(1));
        assert!(!app.guard_notice_sent);
        assert_eq!(app.focus, Focus::Summary);
    }

    #[tokio::test]
    async fn test_notification_dedupe_and_cap() {
        let mut app = test_app();
        app.notify(NotificationLevel::Info, "same".to_string());
        app.notify(NotificationLevel::Info, "same".to_string());
        assert_eq!(app.notifications.len(), 1);

        app.notify(NotificationLevel::Info, "a".to_string());
        app.notify(NotificationLevel::Info, "b".to_string());
        app.notify(NotificationLevel::Info, "c".to_string());
        assert_eq!(app.notifications.len(), MAX_NOTIFICATIONS);
        assert!(app.notifications.iter().all(|n| n.message != "same"));
    }

    #[tokio::test]
    async fn test_notifications_expire_on_tick() {
        let mut app = test_app();
        app.notify(NotificationLevel::Info, "fleeting".to_string());
        app.notifications[0].ttl_ticks = 1;
        app.on_tick();
        assert!(app.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_stale_summary_dropped_after_reselect() {
        let mut app = test_app();
        app.select_paper(sample_paper(1));
        app.select_paper(sample_paper(2));

        app.handle_event(AppEvent::SummaryFetched {
            research_id: 1,
            result: Ok(crate::api::types::SummaryDoc {
                title: "old".into(),
                summary: "old".into(),
                pdf_link: None,
            }),
        });
        assert!(app.papers.summary().is_loading());
    }

    #[tokio::test]
    async fn test_summary_marked_when_viewed() {
        let mut app = test_app();
        app.select_paper(sample_paper(3));
        assert!(!app.papers.is_step_complete(MissionStep::Summary));

        app.handle_event(AppEvent::SummaryFetched {
            research_id: 3,
            result: Ok(crate::api::types::SummaryDoc {
                title: "t".into(),
                summary: "s".into(),
                pdf_link: None,
            }),
        });
        // select_paper landed on Summary, so the arrival marks it.
        assert!(app.papers.is_step_complete(MissionStep::Summary));
    }

    #[tokio::test]
    async fn test_empty_quiz_counts_as_complete() {
        let mut app = test_app();
        app.select_paper(sample_paper(4));
        app.handle_event(AppEvent::QuizFetched {
            research_id: 4,
            result: Ok(vec![]),
        });
        assert!(!app.papers.is_step_complete(MissionStep::Quiz));

        app.set_focus(Focus::Quiz);
        assert!(app.papers.is_step_complete(MissionStep::Quiz));
    }

    #[tokio::test]
    async fn test_history_marked_on_visit() {
        let mut app = test_app();
        app.select_paper(sample_paper(5));
        app.set_focus(Focus::History);
        assert!(app.papers.is_step_complete(MissionStep::History));
    }

    #[tokio::test]
    async fn test_podcast_playback_marks_step() {
        let mut app = test_app();
        app.select_paper(sample_paper(6));
        app.handle_event(AppEvent::AudioPlayback(AudioEvent::Playing));
        assert!(app.papers.is_step_complete(MissionStep::Tts));
    }

    #[tokio::test]
    async fn test_quit_event_stops_loop() {
        let mut app = test_app();
        app.handle_event(AppEvent::Quit);
        assert!(!app.running);
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[tokio::test]
    async fn test_stale_quiz_keeps_finished_progress() {
        let mut app = test_app();
        app.select_paper(sample_paper(1));
        app.select_paper(sample_paper(2));

        app.handle_event(AppEvent::QuizFetched {
            research_id: 2,
            result: Ok(vec![QuizQuestion {
                question: "q".into(),
                answer: OxAnswer::O,
                explanation: "e".into(),
            }]),
        });

        app.quiz_view.handle_input(&key('o'), &app.papers);
        app.quiz_view
            .handle_input(&Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)), &app.papers);
        assert!(app.quiz_view.is_finished());

        // A late answer for the previous paper must not reset the view.
        app.handle_event(AppEvent::QuizFetched {
            research_id: 1,
            result: Err("quiz timed out".into()),
        });
        assert!(app.quiz_view.is_finished());
        assert!(app.papers.quiz().value().is_some());
    }

    #[tokio::test]
    async fn test_stale_podcast_audio_keeps_loading_flag() {
        let mut app = test_app();
        app.select_paper(sample_paper(8));
        app.podcast_view.audio_loading = true;

        app.handle_event(AppEvent::TtsAudioLoaded {
            research_id: 9,
            result: Ok(vec![]),
        });
        assert!(app.podcast_view.audio_loading);

        app.handle_event(AppEvent::TtsAudioLoaded {
            research_id: 8,
            result: Err("fetch failed".into()),
        });
        assert!(!app.podcast_view.audio_loading);
    }

    #[tokio::test]
    async fn test_podcast_download_needs_ready_track() {
        let mut app = test_app();
        app.handle_podcast_result(PodcastResult::Download);
        assert!(app.notifications.is_empty());

        app.select_paper(sample_paper(7));
        app.handle_event(AppEvent::TtsFetched {
            research_id: 7,
            result: Ok(TtsTrack {
                message: String::new(),
                tts_id: "t-7".into(),
                audio_file: "podcast_7.mp3".into(),
                explainer: "transcript".into(),
                download_url: None,
                stream_url: None,
            }),
        });
        app.handle_podcast_result(PodcastResult::Download);
        assert!(app
            .notifications
            .iter()
            .any(|n| n.message.contains("Downloading podcast audio")));
    }
}
