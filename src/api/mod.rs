//! Wire payloads exchanged with the agents backend.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub mod client;
pub mod envelope;

#[cfg(test)]
pub(crate) mod test_server;

pub use client::{ApiError, BackendClient, ByteStream, ChatBackend, ChatReply};

/// Open, backend-defined key/value payload (provider settings, tool schemas).
pub type JsonMap = Map<String, Value>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    /// Tool identifiers scoped as `<server>_<tool>`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mcp_tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub openai_config: JsonMap,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewAgent {
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub mcp_tools: Vec<String>,
    pub openai_config: JsonMap,
}

/// Partial agent update; absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp_tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_config: Option<JsonMap>,
}

impl AgentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.prompt.is_none()
            && self.mcp_tools.is_none()
            && self.openai_config.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServer {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub api_url: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMcpServer {
    pub name: String,
    pub description: String,
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct McpServerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl McpServerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.api_url.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Schema and any other backend-specific fields.
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Build the identifier an agent uses to enable `tool` from `server`.
pub fn scoped_tool_id(server: &str, tool: &str) -> String {
    format!("{server}_{tool}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub agent_id: i64,
    pub messages: Vec<ChatTurn>,
}
