//! Shared constants used across the application

/// Content of a reply placeholder until its first non-empty delta arrives.
pub const PENDING_REPLY_TEXT: &str = "Thinking…";

/// Content left in a reply placeholder when the stream ended without text.
pub const EMPTY_REPLY_TEXT: &str = "(empty response)";

/// Prefix of placeholder message ids.
pub const REPLY_ID_PREFIX: &str = "reply-";

/// Event-stream sentinel that ends a reply.
pub const DONE_SENTINEL: &str = "[DONE]";

/// File name of the session cache inside the data directory.
pub const SESSIONS_CACHE_FILE: &str = "sessions.json";

/// Default backend location, matching the development server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Open and close markers of a model reasoning trace.
pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// Open and close markers of a tool-call trace emitted by the backend.
pub const TOOL_OPEN: &str = "<mcp>";
pub const TOOL_CLOSE: &str = "</mcp>";

/// Title given to a new session when none is supplied.
pub fn default_session_title(agent_name: &str) -> String {
    format!("与 {agent_name} 的对话")
}
