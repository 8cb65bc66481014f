use super::{DeltaAccumulator, SessionState};
use crate::api::logging::emit_decode_error;
use crate::api::{ChatError, ChatTransport, DecodedLine, DecoderLimits, StreamParser};
use crate::types::{ChatRequest, Language, Message};
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Sending,
    Streaming,
    /// Only ever announced through [`ChatUpdate::PhaseChanged`]. The stored
    /// phase goes straight back to `Idle` after a failure, so
    /// [`ChatController::phase`] never returns it.
    Failed,
}

/// Notifications for the front-end. `TurnFailed` carries the user-visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatUpdate {
    TurnStarted { generation: u64 },
    PhaseChanged(TurnPhase),
    AssistantDelta { content: String },
    TurnComplete,
    TurnFailed { message: String },
    Cancelled,
    Cleared,
}

struct ControllerState {
    session: SessionState,
    phase: TurnPhase,
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// Owns the chat session and the single outstanding request.
///
/// Cloning yields another handle to the same session. At most one
/// `send_message` runs at a time; overlapping calls get [`ChatError::Busy`].
/// Each turn gets a generation number, and output from a turn whose
/// generation is no longer current never reaches the session.
#[derive(Clone)]
pub struct ChatController {
    transport: Arc<dyn ChatTransport>,
    limits: DecoderLimits,
    state: Arc<Mutex<ControllerState>>,
    updates: Option<mpsc::UnboundedSender<ChatUpdate>>,
}

/// A turn admitted by [`ChatController::start_turn`], waiting to be streamed.
///
/// Dropping it without calling [`PendingTurn::run`] leaves the controller
/// busy until [`ChatController::cancel_turn`] or [`ChatController::clear_chat`].
pub struct PendingTurn {
    controller: ChatController,
    generation: u64,
    cancel: CancellationToken,
    request: ChatRequest,
}

impl PendingTurn {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> Result<(), ChatError> {
        let controller = &self.controller;
        let result = controller
            .stream_turn(self.generation, &self.cancel, &self.request)
            .await;
        controller.finish_turn(self.generation, result)
    }
}

impl ChatController {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            limits: DecoderLimits::default(),
            state: Arc::new(Mutex::new(ControllerState {
                session: SessionState::new(),
                phase: TurnPhase::Idle,
                generation: 0,
                cancel: None,
            })),
            updates: None,
        }
    }

    pub fn with_limits(mut self, limits: DecoderLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_updates(mut self, updates: mpsc::UnboundedSender<ChatUpdate>) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().session.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().session.messages().to_vec()
    }

    pub fn phase(&self) -> TurnPhase {
        self.lock().phase
    }

    pub fn is_loading(&self) -> bool {
        self.lock().session.is_loading()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub async fn send_message(
        &self,
        user_text: impl Into<String>,
        language: Language,
    ) -> Result<(), ChatError> {
        self.start_turn(user_text, language)?.run().await
    }

    /// Admits a turn without sending it. The user message is appended and
    /// the phase leaves `Idle` before this returns, so a second call made
    /// before [`PendingTurn::run`] is polled already gets [`ChatError::Busy`].
    pub fn start_turn(
        &self,
        user_text: impl Into<String>,
        language: Language,
    ) -> Result<PendingTurn, ChatError> {
        let (generation, cancel, request) = self.begin_turn(user_text.into(), language)?;
        Ok(PendingTurn {
            controller: self.clone(),
            generation,
            cancel,
            request,
        })
    }

    /// Empties the log and discards any in-flight reply.
    pub fn clear_chat(&self) {
        let mut state = self.lock();
        let was_active = state.phase != TurnPhase::Idle;
        state.generation += 1;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        state.session.clear();
        state.phase = TurnPhase::Idle;
        let generation = state.generation;
        drop(state);

        tracing::info!(generation, was_active, "chat cleared");
        self.emit(ChatUpdate::Cleared);
        if was_active {
            self.emit(ChatUpdate::PhaseChanged(TurnPhase::Idle));
        }
    }

    /// Stops the in-flight reply, keeping the log as it is. Returns false
    /// when nothing was in flight.
    pub fn cancel_turn(&self) -> bool {
        let mut state = self.lock();
        if state.phase == TurnPhase::Idle {
            return false;
        }
        state.generation += 1;
        if let Some(token) = state.cancel.take() {
            token.cancel();
        }
        state.session.set_loading(false);
        state.phase = TurnPhase::Idle;
        drop(state);

        tracing::info!("chat turn cancelled");
        self.emit(ChatUpdate::Cancelled);
        self.emit(ChatUpdate::PhaseChanged(TurnPhase::Idle));
        true
    }

    fn begin_turn(
        &self,
        user_text: String,
        language: Language,
    ) -> Result<(u64, CancellationToken, ChatRequest), ChatError> {
        let mut state = self.lock();
        if state.phase != TurnPhase::Idle {
            return Err(ChatError::Busy);
        }

        state.session.push_user(user_text);
        state.session.set_loading(true);
        state.generation += 1;
        state.phase = TurnPhase::Sending;
        let generation = state.generation;
        let cancel = CancellationToken::new();
        state.cancel = Some(cancel.clone());
        let request = ChatRequest {
            messages: state.session.messages().to_vec(),
            language,
        };
        drop(state);

        tracing::info!(
            generation,
            history = request.messages.len(),
            language = language.code(),
            "chat turn started"
        );
        self.emit(ChatUpdate::TurnStarted { generation });
        self.emit(ChatUpdate::PhaseChanged(TurnPhase::Sending));
        Ok((generation, cancel, request))
    }

    async fn stream_turn(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        request: &ChatRequest,
    ) -> Result<(), ChatError> {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            opened = self.transport.open_stream(request) => opened?,
        };

        self.enter_streaming(generation)?;

        let mut parser = StreamParser::with_limits(self.limits);
        let mut accumulator = DeltaAccumulator::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                next = stream.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    let decoded = parser.process(&chunk);
                    self.apply_decoded(generation, decoded, &mut accumulator)?;
                }
                Some(Err(error)) => return Err(error),
                None => break,
            }
        }

        let tail = parser.finish();
        self.apply_decoded(generation, tail, &mut accumulator)?;
        tracing::debug!(
            generation,
            chars = accumulator.content().chars().count(),
            done_seen = parser.is_done(),
            "chat stream ended"
        );
        Ok(())
    }

    fn enter_streaming(&self, generation: u64) -> Result<(), ChatError> {
        let mut state = self.lock();
        if state.generation != generation {
            return Err(ChatError::Cancelled);
        }
        state.phase = TurnPhase::Streaming;
        drop(state);
        self.emit(ChatUpdate::PhaseChanged(TurnPhase::Streaming));
        Ok(())
    }

    fn apply_decoded(
        &self,
        generation: u64,
        lines: Vec<DecodedLine>,
        accumulator: &mut DeltaAccumulator,
    ) -> Result<(), ChatError> {
        for line in lines {
            match line {
                DecodedLine::Frame(frame) => {
                    let Some(content) = accumulator.apply(&frame) else {
                        continue;
                    };
                    let content = content.to_string();
                    let mut state = self.lock();
                    if state.generation != generation {
                        return Err(ChatError::Cancelled);
                    }
                    state.session.upsert_assistant(&content);
                    drop(state);
                    self.emit(ChatUpdate::AssistantDelta { content });
                }
                DecodedLine::Malformed(error) => emit_decode_error(generation, &error),
            }
        }
        Ok(())
    }

    fn finish_turn(&self, generation: u64, result: Result<(), ChatError>) -> Result<(), ChatError> {
        let mut state = self.lock();
        if state.generation != generation {
            // clear_chat or cancel_turn already reset the session.
            tracing::debug!(generation, "discarding stale turn result");
            return Err(ChatError::Cancelled);
        }
        state.cancel = None;

        match result {
            Ok(()) => {
                state.session.set_loading(false);
                state.phase = TurnPhase::Idle;
                drop(state);

                tracing::info!(generation, "chat turn complete");
                self.emit(ChatUpdate::PhaseChanged(TurnPhase::Idle));
                self.emit(ChatUpdate::TurnComplete);
                Ok(())
            }
            Err(error) => {
                if error.rolls_back_turn() {
                    state.session.remove_last_user();
                }
                state.session.set_loading(false);
                state.phase = TurnPhase::Idle;
                drop(state);

                tracing::warn!(generation, %error, "chat turn failed");
                self.emit(ChatUpdate::PhaseChanged(TurnPhase::Failed));
                self.emit(ChatUpdate::TurnFailed {
                    message: error.user_message(),
                });
                self.emit(ChatUpdate::PhaseChanged(TurnPhase::Idle));
                Err(error)
            }
        }
    }

    fn emit(&self, update: ChatUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
