//! Line-oriented transcript output for the terminal.

use std::io::{self, Write};

use crate::core::constants::PENDING_REPLY_TEXT;
use crate::core::message::{ChatMessage, ChatSession, Role};
use crate::core::reducer::TranscriptView;
use crate::ui::transcript::render_text;

/// Prints a reply as it grows.
///
/// Appends are printed as they arrive. When content is replaced rather than
/// extended (an error or the empty-reply sentinel), the new content starts
/// on a fresh line.
pub struct TerminalView<W: Write> {
    out: W,
    live: Option<LiveMessage>,
    notices: Vec<String>,
}

struct LiveMessage {
    id: String,
    printed: String,
}

impl TerminalView<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            live: None,
            notices: Vec::new(),
        }
    }

    /// Notices raised so far, oldest first.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Terminate the live line, if any.
    pub fn finish(&mut self) -> io::Result<()> {
        if let Some(live) = self.live.take() {
            if !live.printed.is_empty() && !live.printed.ends_with('\n') {
                writeln!(self.out)?;
            }
        }
        self.out.flush()
    }

    /// Print an input prompt on a line of its own.
    pub fn prompt(&mut self, text: &str) -> io::Result<()> {
        self.finish()?;
        write!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Print an out-of-band line, such as a command acknowledgement.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        self.finish()?;
        writeln!(self.out, "{text}")
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_change(&mut self, message: &ChatMessage) -> io::Result<()> {
        if message.content == PENDING_REPLY_TEXT {
            return Ok(());
        }

        let same_message = self.live.as_ref().is_some_and(|live| live.id == message.id);
        if !same_message {
            self.finish()?;
            write!(self.out, "{}", role_label(message.role))?;
            self.live = Some(LiveMessage {
                id: message.id.clone(),
                printed: String::new(),
            });
        }

        let Some(live) = self.live.as_mut() else {
            return Ok(());
        };
        match message.content.strip_prefix(live.printed.as_str()) {
            Some(tail) => write!(self.out, "{tail}")?,
            None => {
                writeln!(self.out)?;
                write!(self.out, "{}", message.content)?;
            }
        }
        live.printed = message.content.clone();
        Ok(())
    }
}

impl<W: Write> TranscriptView for TerminalView<W> {
    fn message_changed(&mut self, _session_id: &str, message: &ChatMessage) {
        if let Err(err) = self.write_change(message) {
            tracing::warn!(error = %err, "failed to write transcript");
        }
    }

    fn scroll_to_bottom(&mut self) {
        let _ = self.out.flush();
    }

    fn notify(&mut self, text: &str) {
        let _ = self.finish();
        eprintln!("❌ {text}");
        self.notices.push(text.to_string());
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You: ",
        Role::Assistant => "Assistant: ",
        Role::System => "System: ",
    }
}

/// Full transcript of `session` with thinking and tool-call spans labelled.
pub fn render_session(session: &ChatSession) -> String {
    let mut out = format!("# {} ({})\n", session.title, session.agent_name);
    for message in &session.messages {
        out.push('\n');
        out.push_str(role_label(message.role));
        let body = render_text(&message.content);
        if body.contains('\n') {
            out.push('\n');
        }
        out.push_str(body.trim_end());
        out.push('\n');
    }
    out
}
