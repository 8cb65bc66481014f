mod line_mode;

pub use line_mode::run_line_mode;

use crate::api::{ChatClient, ChatError, ChatTransport, DecoderLimits};
use crate::config::Config;
use crate::state::{ChatController, ChatUpdate, TurnPhase};
use crate::terminal::{self, TerminalGuard, TerminalType};
use crate::types::Language;
use crate::ui::editor::{InputAction, InputEditor, ScrollAction};
use crate::ui::layout::split_chat_layout;
use crate::ui::render::{
    input_visual_rows, render_footer, render_header, render_input, render_messages,
    render_status_line, transcript_lines, ToastKind, ASSISTANT_NAME,
};
use anyhow::Result;
use crossterm::event;
use ratatui::layout::Rect;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;

const TUI_TICK_INTERVAL: Duration = Duration::from_millis(50);
const TYPING_FRAME_TICKS: u64 = 8;
const PAGE_STEP: usize = 10;
const MAX_INPUT_ROWS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Info,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
        }
    }
}

/// Scroll position of the transcript. Follows the newest row until the
/// user scrolls away, and resumes following once they scroll back down.
#[derive(Debug)]
struct HistoryView {
    offset: usize,
    max_offset: usize,
    auto_follow: bool,
}

impl Default for HistoryView {
    fn default() -> Self {
        Self {
            offset: 0,
            max_offset: 0,
            auto_follow: true,
        }
    }
}

impl HistoryView {
    fn apply(&mut self, action: ScrollAction) {
        match action {
            ScrollAction::LineUp => self.scroll_up(1),
            ScrollAction::PageUp => self.scroll_up(PAGE_STEP),
            ScrollAction::LineDown => self.scroll_down(1),
            ScrollAction::PageDown => self.scroll_down(PAGE_STEP),
            ScrollAction::Home => {
                self.offset = 0;
                self.auto_follow = false;
            }
            ScrollAction::End => self.follow(),
        }
    }

    fn follow(&mut self) {
        self.offset = self.max_offset;
        self.auto_follow = true;
    }

    fn scroll_up(&mut self, rows: usize) {
        self.offset = self.offset.min(self.max_offset).saturating_sub(rows);
        self.auto_follow = false;
    }

    fn scroll_down(&mut self, rows: usize) {
        self.offset = self.offset.saturating_add(rows).min(self.max_offset);
        self.auto_follow = self.offset >= self.max_offset;
    }

    /// Clamps to the current transcript size and returns the row offset to draw.
    fn resolve(&mut self, total_rows: usize, viewport_rows: usize) -> usize {
        self.max_offset = total_rows.saturating_sub(viewport_rows);
        self.offset = if self.auto_follow {
            self.max_offset
        } else {
            self.offset.min(self.max_offset)
        };
        self.offset
    }
}

pub struct App {
    controller: ChatController,
    update_rx: mpsc::UnboundedReceiver<ChatUpdate>,
    language: Language,
    editor: InputEditor,
    view: HistoryView,
    toast: Option<Toast>,
    pending_quit: bool,
    should_quit: bool,
    tick: u64,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let client = ChatClient::new(config)?;
        Ok(Self::with_transport(
            Arc::new(client),
            config.language,
            config.decoder_limits(),
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn ChatTransport>,
        language: Language,
        limits: DecoderLimits,
    ) -> Self {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let controller = ChatController::new(transport)
            .with_limits(limits)
            .with_updates(update_tx);
        Self {
            controller,
            update_rx,
            language,
            editor: InputEditor::new(),
            view: HistoryView::default(),
            toast: None,
            pending_quit: false,
            should_quit: false,
            tick: 0,
        }
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn quit_requested(&self) -> bool {
        self.should_quit
    }

    /// Full-screen UI on a terminal, line mode otherwise.
    pub async fn run(&mut self) -> Result<()> {
        if terminal::is_interactive() {
            return self.run_tui().await;
        }

        tracing::info!(language = self.language.code(), "starting line mode");
        let mut out = std::io::stdout();
        let mut err = std::io::stderr();
        run_line_mode(
            &self.controller,
            &mut self.update_rx,
            self.language,
            BufReader::new(tokio::io::stdin()),
            &mut out,
            &mut err,
        )
        .await
    }

    async fn run_tui(&mut self) -> Result<()> {
        let mut guard = TerminalGuard::enter()?;
        tracing::info!(language = self.language.code(), "starting terminal UI");

        let mut tick = tokio::time::interval(TUI_TICK_INTERVAL);
        while !self.should_quit {
            self.draw_frame(guard.terminal())?;
            self.process_terminal_events()?;

            tokio::select! {
                _ = tick.tick() => {
                    self.tick = self.tick.wrapping_add(1);
                }
                update = self.update_rx.recv() => {
                    if let Some(update) = update {
                        self.apply_update(update);
                    }
                }
            }
        }

        self.controller.cancel_turn();
        Ok(())
    }

    fn process_terminal_events(&mut self) -> Result<()> {
        while event::poll(Duration::ZERO)? {
            let action = self.editor.apply_event(event::read()?);
            self.handle_action(action);
        }
        Ok(())
    }

    fn draw_frame(&mut self, terminal: &mut TerminalType) -> Result<()> {
        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        let input_width = area.width.saturating_sub(2).max(1) as usize;
        let input_rows = input_visual_rows(self.editor.buffer(), input_width).min(MAX_INPUT_ROWS);
        let panes = split_chat_layout(area, input_rows as u16);

        let session = self.controller.snapshot();
        let phase = self.controller.phase();
        let lines = transcript_lines(
            &session,
            self.language,
            panes.history.width as usize,
            self.tick / TYPING_FRAME_TICKS,
        );
        let scroll = self.view.resolve(lines.len(), panes.history.height as usize);
        let (status, status_kind) = self.status_text(phase);
        let language = self.language;
        let input = self.editor.buffer();
        let cursor = self.editor.cursor();

        terminal.draw(|frame| {
            render_header(frame, panes.header, language, phase);
            render_messages(frame, panes.history, lines, scroll);
            render_status_line(frame, panes.status, &status, status_kind);
            render_input(
                frame,
                panes.input,
                input,
                cursor,
                language.texts().placeholder,
            );
            render_footer(frame, panes.footer);
        })?;
        Ok(())
    }

    fn status_text(&self, phase: TurnPhase) -> (String, ToastKind) {
        if let Some(toast) = &self.toast {
            return (toast.message.clone(), toast.kind);
        }
        let text = match phase {
            TurnPhase::Sending => format!("Connecting to {ASSISTANT_NAME}..."),
            TurnPhase::Streaming => format!("{ASSISTANT_NAME} is replying · Ctrl+C to stop"),
            TurnPhase::Idle | TurnPhase::Failed => String::new(),
        };
        (text, ToastKind::Info)
    }

    pub fn handle_action(&mut self, action: InputAction) {
        match action {
            InputAction::None => {}
            InputAction::Submit => self.submit(),
            InputAction::CycleLanguage => {
                self.language = self.language.next();
                tracing::debug!(language = self.language.code(), "language changed");
                self.toast = Some(Toast::info(format!("Language: {}", self.language)));
            }
            InputAction::NewConversation => {
                self.controller.clear_chat();
                self.view.follow();
            }
            InputAction::Dismiss => {
                self.toast = None;
                self.pending_quit = false;
            }
            InputAction::Interrupt => self.interrupt(),
            InputAction::Scroll(action) => self.view.apply(action),
            InputAction::Quit => self.should_quit = true,
        }
    }

    fn submit(&mut self) {
        if self.editor.is_blank() {
            return;
        }
        let text = self.editor.buffer().trim().to_string();
        // Admit the turn before spawning so a second Enter sees `Busy`.
        let turn = match self.controller.start_turn(text, self.language) {
            Ok(turn) => turn,
            Err(error) => {
                self.toast = Some(Toast::info(error.user_message()));
                return;
            }
        };
        self.editor.submit();

        self.toast = None;
        self.pending_quit = false;
        self.view.follow();

        tokio::spawn(async move {
            if let Err(error) = turn.run().await {
                tracing::debug!(%error, "turn ended without a reply");
            }
        });
    }

    fn interrupt(&mut self) {
        if self.controller.cancel_turn() {
            self.pending_quit = false;
            return;
        }
        if self.pending_quit {
            self.should_quit = true;
            return;
        }
        self.pending_quit = true;
        self.toast = Some(Toast::info("Press Ctrl+C again to quit."));
    }

    pub fn apply_update(&mut self, update: ChatUpdate) {
        match update {
            ChatUpdate::TurnStarted { .. } => self.view.follow(),
            ChatUpdate::TurnFailed { message } => self.toast = Some(Toast::error(message)),
            ChatUpdate::Cancelled => {
                self.toast = Some(Toast::info(ChatError::Cancelled.user_message()));
            }
            ChatUpdate::Cleared => {
                self.toast = Some(Toast::info("Started a new conversation."));
            }
            ChatUpdate::PhaseChanged(_)
            | ChatUpdate::AssistantDelta { .. }
            | ChatUpdate::TurnComplete => {}
        }
    }
}
