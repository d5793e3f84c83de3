use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::{
    buffer::IncrementalBuffer,
    error::ChatStreamError,
    message::{ChatMessage, MessageId},
    wire::WireEvent,
};

/// Dispatcher state machine. Terminal states never transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Ended,
    Errored,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Ended | SessionState::Errored)
    }
}

/// Outbound callback contract for one stream session.
///
/// `on_start` fires exactly once, before any `on_content`; exactly one of
/// `on_end` / `on_error` fires, and nothing is delivered afterwards.
/// `buffered` is the running buffer value after the fragment was appended,
/// ready to hand to a renderer.
pub trait StreamHandler {
    fn on_start(&mut self, _message_id: &MessageId) {}
    fn on_content(&mut self, _fragment: &str, _buffered: &str) {}
    fn on_end(&mut self, _message_id: &MessageId) {}
    fn on_error(&mut self, _error: &ChatStreamError) {}
}

/// No-op handler for callers that only want the returned message.
impl StreamHandler for () {}

/// Cloneable cancellation flag for an active session. `cancel` is idempotent.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One open streaming exchange for a single assistant reply.
///
/// Owns the incremental buffer and the assistant placeholder message
/// exclusively; both live exactly as long as the session. Events are
/// dispatched strictly in arrival order from the single driving task.
pub struct StreamSession {
    conversation_id: String,
    buffer: IncrementalBuffer,
    message: ChatMessage,
    state: SessionState,
    cancel: CancelHandle,
}

impl StreamSession {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            buffer: IncrementalBuffer::new(),
            message: ChatMessage::assistant_placeholder(MessageId::generate()),
            state: SessionState::Idle,
            cancel: CancelHandle::default(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    /// Handle for the "stop generation" action; safe to clone into UI code.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Drive the session to completion, dispatching callbacks in arrival
    /// order, and return the finalized message.
    ///
    /// Dropping the event stream on exit aborts the underlying transport.
    pub async fn run<S, H>(mut self, mut events: S, handler: &mut H) -> ChatMessage
    where
        S: Stream<Item = Result<WireEvent, ChatStreamError>> + Unpin,
        H: StreamHandler,
    {
        while !self.state.is_terminal() {
            if self.cancel.is_cancelled() {
                self.finish_cancelled(handler);
                break;
            }

            let item = events.next().await;

            // The flag may have been raised while suspended; checked again
            // before anything is dispatched.
            if self.cancel.is_cancelled() {
                self.finish_cancelled(handler);
                break;
            }

            match item {
                Some(Ok(event)) => self.dispatch(event, handler),
                Some(Err(err)) => self.fail(err, handler),
                None => {
                    // The transport closed without an end marker.
                    self.fail(
                        ChatStreamError::StreamRead(
                            "stream ended before message_stop".to_string(),
                        ),
                        handler,
                    );
                }
            }
        }

        drop(events);
        self.message
    }

    fn dispatch<H: StreamHandler>(&mut self, event: WireEvent, handler: &mut H) {
        match event {
            WireEvent::MessageStart { id } => match self.state {
                SessionState::Idle => self.start(MessageId::new(id), handler),
                _ => warn!(conversation = %self.conversation_id, "duplicate message_start ignored"),
            },
            WireEvent::ContentDelta { text } => {
                if self.state == SessionState::Idle {
                    // Start marker lost in transit; the first content-bearing
                    // event still opens the session exactly once.
                    let id = self.message.id.clone();
                    self.start(id, handler);
                }
                if self.state == SessionState::Streaming {
                    let buffered = self.buffer.append(&text);
                    self.message.append_content(&text);
                    handler.on_content(&text, buffered);
                }
            }
            WireEvent::MessageStop { id } => {
                if self.state == SessionState::Idle {
                    warn!(conversation = %self.conversation_id, "message_stop before any content");
                }
                self.finish(MessageId::new(id), handler);
            }
            WireEvent::Error { error } => self.fail(error.into(), handler),
            WireEvent::Ping | WireEvent::Unknown => {}
        }
    }

    fn start<H: StreamHandler>(&mut self, id: MessageId, handler: &mut H) {
        debug!(conversation = %self.conversation_id, message = %id, "stream started");
        self.message.id = id;
        self.state = SessionState::Streaming;
        handler.on_start(&self.message.id);
    }

    fn finish<H: StreamHandler>(&mut self, id: MessageId, handler: &mut H) {
        debug!(conversation = %self.conversation_id, message = %id, "stream ended");
        self.message.mark_sent();
        self.state = SessionState::Ended;
        handler.on_end(&self.message.id);
    }

    /// User-initiated stop is not a failure: the message keeps whatever
    /// partial content accumulated and ends `Sent`.
    fn finish_cancelled<H: StreamHandler>(&mut self, handler: &mut H) {
        debug!(conversation = %self.conversation_id, "stream cancelled");
        self.message.mark_sent();
        self.state = SessionState::Ended;
        handler.on_end(&self.message.id);
    }

    fn fail<H: StreamHandler>(&mut self, error: ChatStreamError, handler: &mut H) {
        warn!(conversation = %self.conversation_id, %error, "stream failed");
        self.message
            .mark_error(&format!("(response interrupted: {error})"));
        self.state = SessionState::Errored;
        handler.on_error(&error);
    }
}
