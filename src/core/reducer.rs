//! Applies a streamed reply to its placeholder message.

use std::fmt;
use std::ops::ControlFlow;

use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::core::chat_stream::{classify_segment, frame_segments, Segment, SseDecoder};
use crate::core::constants::EMPTY_REPLY_TEXT;
use crate::core::message::{ChatMessage, MessagePatch};
use crate::core::store::SessionStore;

/// Observer notified as a transcript changes.
pub trait TranscriptView {
    /// A message was appended or its content changed in place.
    fn message_changed(&mut self, session_id: &str, message: &ChatMessage);

    /// Keep the newest content visible. Called after every applied delta.
    fn scroll_to_bottom(&mut self);

    /// Transient user-facing notice, typically an error.
    fn notify(&mut self, text: &str);
}

/// How a streamed reply ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// At least one non-empty delta was applied.
    pub received_any: bool,
    /// The `[DONE]` sentinel ended the stream.
    pub done_sentinel: bool,
    /// Text that replaced the placeholder content on failure.
    pub error: Option<String>,
}

/// Feeds decoded deltas into one placeholder message.
///
/// The placeholder is addressed by session and message id for the whole
/// stream, so replies to different sessions never touch each other.
pub struct StreamReducer<'a, V: TranscriptView + ?Sized> {
    store: &'a mut SessionStore,
    view: &'a mut V,
    session_id: String,
    message_id: String,
    outcome: StreamOutcome,
}

impl<'a, V: TranscriptView + ?Sized> StreamReducer<'a, V> {
    pub fn new(
        store: &'a mut SessionStore,
        view: &'a mut V,
        session_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            view,
            session_id: session_id.into(),
            message_id: message_id.into(),
            outcome: StreamOutcome::default(),
        }
    }

    /// Consume `stream` until end of input, `[DONE]`, or an error.
    pub async fn run<S, B, E>(mut self, stream: S) -> StreamOutcome
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let mut stream = std::pin::pin!(stream);
        let mut decoder = SseDecoder::new();

        'read: while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(error = %err, "reply stream failed");
                    self.outcome.error = Some(format!("Error: {err}"));
                    break;
                }
            };

            decoder.push(chunk.as_ref());
            while let Some(frame) = decoder.next_frame() {
                if self.apply_frame(&frame).is_break() {
                    break 'read;
                }
            }
        }

        if !self.stopped() {
            if let Some(frame) = decoder.finish() {
                let _ = self.apply_frame(&frame);
            }
        }

        self.settle()
    }

    fn stopped(&self) -> bool {
        self.outcome.done_sentinel || self.outcome.error.is_some()
    }

    fn apply_frame(&mut self, frame: &str) -> ControlFlow<()> {
        for segment in frame_segments(frame) {
            match classify_segment(segment) {
                Segment::Delta(delta) => self.apply_delta(&delta),
                Segment::Done => {
                    self.outcome.done_sentinel = true;
                    return ControlFlow::Break(());
                }
                Segment::Error(text) => {
                    self.outcome.error = Some(text);
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn apply_delta(&mut self, delta: &str) {
        if delta.is_empty() {
            return;
        }

        if !self.outcome.received_any {
            // Drop the pending marker before the first real text.
            self.store
                .update_message(&self.session_id, &self.message_id, MessagePatch::content(""));
            self.outcome.received_any = true;
        }

        self.store
            .append_to_message(&self.session_id, &self.message_id, delta);
        self.publish();
        self.view.scroll_to_bottom();
    }

    fn settle(mut self) -> StreamOutcome {
        if let Some(text) = self.outcome.error.clone() {
            self.replace_content(&text);
            self.view.notify(&text);
        } else if !self.outcome.received_any {
            self.replace_content(EMPTY_REPLY_TEXT);
        }

        debug!(
            session_id = %self.session_id,
            message_id = %self.message_id,
            received_any = self.outcome.received_any,
            done_sentinel = self.outcome.done_sentinel,
            failed = self.outcome.error.is_some(),
            "reply stream settled"
        );
        self.outcome
    }

    fn replace_content(&mut self, content: &str) {
        self.store.update_message(
            &self.session_id,
            &self.message_id,
            MessagePatch::content(content),
        );
        self.publish();
    }

    fn publish(&mut self) {
        if let Some(message) = self.store.message(&self.session_id, &self.message_id) {
            self.view.message_changed(&self.session_id, message);
        }
    }
}
