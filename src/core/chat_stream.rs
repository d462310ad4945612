//! Event-stream framing for streamed chat replies.
//!
//! Bytes arrive in arbitrary chunks. [`SseDecoder`] buffers them and hands
//! out one frame per blank-line boundary; each frame is split into its
//! `data:` segments, and each segment is classified into a text delta, the
//! `[DONE]` sentinel, or an API error.

use memchr::memchr_iter;
use serde_json::Value;
use tracing::warn;

use crate::core::constants::DONE_SENTINEL;

/// One classified `data:` payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Incremental reply text; may be empty.
    Delta(String),
    /// A formatted error reported inside the stream.
    Error(String),
    /// The `[DONE]` sentinel.
    Done,
}

/// Incremental frame splitter over a byte stream.
///
/// Frames are cut at ASCII newlines only, so a multi-byte character split
/// across two reads is decoded once, after both halves have arrived.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    scan_from: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// The next frame whose terminating blank line has been received.
    pub fn next_frame(&mut self) -> Option<String> {
        match find_frame_boundary(&self.buffer, self.scan_from) {
            Some((frame_end, consumed)) => {
                let frame = decode_frame(&self.buffer[..frame_end]);
                self.buffer.drain(..consumed);
                self.scan_from = 0;
                Some(frame)
            }
            None => {
                // A newline this close to the end may still turn out to be a boundary.
                self.scan_from = self.buffer.len().saturating_sub(2);
                None
            }
        }
    }

    /// Whatever is left once the stream has ended, as a final frame.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        self.scan_from = 0;
        let frame = decode_frame(&rest);
        (!frame.trim().is_empty()).then_some(frame)
    }
}

/// Locate the first blank line at or after `from`.
///
/// Returns the end of the frame body and the number of bytes to consume
/// including the separator. Both `\n\n` and `\r\n\r\n` (and their mixtures)
/// separate frames.
fn find_frame_boundary(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    let from = from.min(buffer.len());
    for newline in memchr_iter(b'\n', &buffer[from..]).map(|offset| offset + from) {
        let rest = &buffer[newline + 1..];
        if rest.starts_with(b"\n") {
            return Some((newline, newline + 2));
        }
        if rest.starts_with(b"\r\n") {
            return Some((newline, newline + 3));
        }
    }
    None
}

fn decode_frame(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(err) => {
            warn!(error = %err, "invalid UTF-8 in stream frame");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// The trimmed payloads of every `data:` line in `frame`, in order.
///
/// Other event-stream fields (`event:`, `id:`, comments) are skipped.
pub fn frame_segments(frame: &str) -> impl Iterator<Item = &str> {
    frame.lines().filter_map(extract_data_payload)
}

/// Text increment carried by a chat-completion chunk.
///
/// Looks at `choices[0].delta.content`, then `choices[0].message.content`.
pub fn extract_delta(value: &Value) -> Option<&str> {
    value
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .or_else(|| {
            value
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
        })
}

/// Classify one segment. Payloads that are not JSON are literal text.
pub fn classify_segment(segment: &str) -> Segment {
    if segment == DONE_SENTINEL {
        return Segment::Done;
    }

    match serde_json::from_str::<Value>(segment) {
        Ok(value) => {
            if value.get("error").is_some_and(|error| !error.is_null()) {
                return Segment::Error(stream_error_text(&value));
            }
            Segment::Delta(extract_delta(&value).unwrap_or_default().to_string())
        }
        Err(_) => Segment::Delta(segment.to_string()),
    }
}

/// Error message carried by a payload, with the provider's code or type
/// appended in parentheses when present.
fn describe_error(payload: &Value) -> Option<String> {
    let error = payload.get("error");
    let message = match error {
        Some(Value::String(text)) => Some(text.as_str()),
        Some(fields) => fields.get("message").and_then(Value::as_str),
        None => None,
    }
    .or_else(|| payload.get("message").and_then(Value::as_str))?;

    let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if message.is_empty() {
        return None;
    }

    let code = error
        .and_then(|fields| fields.get("code").or_else(|| fields.get("type")))
        .and_then(|code| match code {
            Value::String(text) if !text.is_empty() => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        });
    Some(match code {
        Some(code) => format!("{message} ({code})"),
        None => message,
    })
}

/// One-line text that replaces a reply when the stream reports an error.
///
/// Payloads without a readable message fall back to their compact JSON.
pub fn stream_error_text(payload: &Value) -> String {
    match describe_error(payload) {
        Some(summary) => format!("Error: {summary}"),
        None => format!("Error: {payload}"),
    }
}
