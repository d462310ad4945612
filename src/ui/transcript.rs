//! Typed spans for message text.
//!
//! Assistant replies may carry a reasoning trace between `<think>` and
//! `</think>` and tool-call traces between `<mcp>` and `</mcp>`. The split is
//! recomputed from the full text on every render, so an open marker whose
//! close has not streamed in yet simply reads as plain text until it does.
//!
//! ```
//! use agentdesk::ui::transcript::{split_spans, Span, SpanKind};
//!
//! let spans = split_spans("<think>plan</think>answer");
//! assert_eq!(
//!     spans,
//!     vec![
//!         Span { kind: SpanKind::Thinking, text: "plan" },
//!         Span { kind: SpanKind::Plain, text: "answer" },
//!     ]
//! );
//! ```

use crate::core::constants::{THINK_CLOSE, THINK_OPEN, TOOL_CLOSE, TOOL_OPEN};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanKind {
    Plain,
    Thinking,
    ToolCall,
}

impl SpanKind {
    fn markers(self) -> Option<(&'static str, &'static str)> {
        match self {
            SpanKind::Plain => None,
            SpanKind::Thinking => Some((THINK_OPEN, THINK_CLOSE)),
            SpanKind::ToolCall => Some((TOOL_OPEN, TOOL_CLOSE)),
        }
    }
}

/// A run of message text, borrowed from the source with markers removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: SpanKind,
    pub text: &'a str,
}

/// Earliest open marker at or after `from`.
fn next_open(text: &str, from: usize) -> Option<(usize, SpanKind)> {
    [SpanKind::Thinking, SpanKind::ToolCall]
        .into_iter()
        .filter_map(|kind| {
            let (open, _) = kind.markers()?;
            text[from..].find(open).map(|offset| (from + offset, kind))
        })
        .min_by_key(|(position, _)| *position)
}

/// Split `text` into ordered spans. Empty plain runs are omitted.
///
/// An open marker with no matching close stays in the surrounding plain
/// text; scanning resumes right after it, so later complete spans are
/// still recognized.
pub fn split_spans(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut search_from = 0;

    while let Some((start, kind)) = next_open(text, search_from) {
        let Some((open, close)) = kind.markers() else {
            break;
        };
        let body_start = start + open.len();
        let Some(body_len) = text[body_start..].find(close) else {
            search_from = body_start;
            continue;
        };

        if start > plain_start {
            spans.push(Span {
                kind: SpanKind::Plain,
                text: &text[plain_start..start],
            });
        }
        spans.push(Span {
            kind,
            text: &text[body_start..body_start + body_len],
        });
        plain_start = body_start + body_len + close.len();
        search_from = plain_start;
    }

    if plain_start < text.len() {
        spans.push(Span {
            kind: SpanKind::Plain,
            text: &text[plain_start..],
        });
    }
    spans
}

/// Plain-text rendering of `text` for a terminal.
pub fn render_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for span in split_spans(text) {
        match span.kind {
            SpanKind::Plain => out.push_str(span.text),
            SpanKind::Thinking => {
                ensure_line_start(&mut out);
                out.push_str("[thinking]\n");
                for line in span.text.trim().lines() {
                    out.push_str("  │ ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            SpanKind::ToolCall => {
                ensure_line_start(&mut out);
                for line in span.text.trim().lines() {
                    out.push_str("[tool] ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
    }
    out
}

fn ensure_line_start(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}
