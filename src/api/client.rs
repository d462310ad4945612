//! HTTP client for the agents backend REST API and chat endpoints.

use std::error::Error as StdError;
use std::fmt;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::envelope::{extract_reply, failure_message, unwrap_envelope};
use super::{
    Agent, AgentPatch, ChatRequest, McpServer, McpServerPatch, McpTool, NewAgent, NewMcpServer,
};
use crate::utils::url::{construct_api_url, normalize_base_url};

/// Raw response body of the streaming chat endpoint, chunked as it arrives.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ApiError>> + Send>>;

/// Errors surfaced by backend calls.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be sent or the body could not be read.
    Http(reqwest::Error),

    /// The backend answered with a non-success HTTP status.
    Status {
        /// HTTP status code.
        status: u16,
        /// Envelope message or body text.
        message: String,
    },

    /// The backend answered `{success: false, message}`.
    Backend {
        /// The message carried by the envelope.
        message: String,
    },

    /// The request was rejected locally before being sent.
    Validation(String),

    /// The response body did not have the expected shape.
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http(source) => write!(f, "Network error: {source}"),
            ApiError::Status { status, message } => {
                write!(f, "Request failed with status {status}: {message}")
            }
            ApiError::Backend { message } => write!(f, "{message}"),
            ApiError::Validation(message) => write!(f, "{message}"),
            ApiError::Decode(message) => write!(f, "Failed to parse response: {message}"),
        }
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ApiError::Http(source) => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        ApiError::Http(value)
    }
}

/// Outcome of opening the streaming chat endpoint.
pub enum ChatReply {
    /// A live event-stream body.
    Stream(ByteStream),
    /// A complete reply, either because the stream could not be established
    /// and the buffered endpoint answered instead, or because the backend
    /// answered the streaming endpoint with a plain JSON body.
    Complete(String),
}

impl fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatReply::Stream(_) => f.write_str("ChatReply::Stream(..)"),
            ChatReply::Complete(text) => f.debug_tuple("ChatReply::Complete").field(text).finish(),
        }
    }
}

/// The chat half of the backend, as used by the send orchestration.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the history and wait for one complete reply.
    async fn send_chat(&self, request: &ChatRequest) -> Result<String, ApiError>;

    /// Open the streaming endpoint, falling back to [`ChatBackend::send_chat`]
    /// when no stream can be established.
    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;
}

/// Reject agent payloads the backend would refuse anyway.
pub fn validate_new_agent(agent: &NewAgent) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if agent.name.trim().is_empty() {
        errors.push("agent name must not be empty");
    }
    if agent.prompt.trim().is_empty() {
        errors.push("system prompt must not be empty");
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors.join("; ")))
    }
}

/// Trim an MCP endpoint and require an absolute `http(s)://` URL.
pub fn validate_api_url(api_url: &str) -> Result<String, ApiError> {
    let trimmed = api_url.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation("API URL must not be empty".to_string()));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ApiError::Validation(
            "only MCP HTTP endpoints starting with http:// or https:// are supported".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|err| ApiError::Decode(err.to_string()))
}

fn status_error(status: StatusCode, body: &str) -> ApiError {
    let trimmed = body.trim();
    let message = serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|value| failure_message(&value))
        .or_else(|| (!trimmed.is_empty()).then(|| trimmed.to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().starts_with("application/json"))
        .unwrap_or(false)
}

/// Read a successful body as JSON; non-JSON text is kept as a JSON string.
async fn read_body(response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    let text = response.text().await?;
    if !status.is_success() {
        return Err(status_error(status, &text));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// Typed client for the agents backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl AsRef<str>) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url.as_ref()),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = construct_api_url(&self.base_url, endpoint);
        debug!(%method, %url, "backend request");
        self.client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn call(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        unwrap_envelope(read_body(response).await?)
    }

    async fn call_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.call(self.request(method, endpoint).json(body)).await
    }

    // =========================================================================
    // Agents
    // =========================================================================

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        decode(self.call(self.request(Method::GET, "agents")).await?)
    }

    pub async fn get_agent(&self, id: i64) -> Result<Agent, ApiError> {
        decode(self.call(self.request(Method::GET, &format!("agents/{id}"))).await?)
    }

    pub async fn create_agent(&self, agent: &NewAgent) -> Result<Agent, ApiError> {
        validate_new_agent(agent)?;
        decode(self.call_json(Method::POST, "agents", agent).await?)
    }

    pub async fn update_agent(&self, id: i64, patch: &AgentPatch) -> Result<Agent, ApiError> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ApiError::Validation(
                "agent name must not be empty".to_string(),
            ));
        }
        decode(
            self.call_json(Method::PUT, &format!("agents/{id}"), patch)
                .await?,
        )
    }

    pub async fn delete_agent(&self, id: i64) -> Result<(), ApiError> {
        self.call(self.request(Method::DELETE, &format!("agents/{id}")))
            .await
            .map(|_| ())
    }

    /// Tool descriptors enabled for one agent, in backend-defined shape.
    pub async fn agent_mcp_tools(&self, id: i64) -> Result<Vec<Value>, ApiError> {
        let data = self
            .call(self.request(Method::GET, &format!("agents/{id}/mcp-tools")))
            .await?;
        Ok(match data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }

    // =========================================================================
    // MCP servers
    // =========================================================================

    pub async fn list_servers(&self) -> Result<Vec<McpServer>, ApiError> {
        decode(self.call(self.request(Method::GET, "mcp/servers")).await?)
    }

    pub async fn create_server(&self, server: &NewMcpServer) -> Result<McpServer, ApiError> {
        if server.name.trim().is_empty() {
            return Err(ApiError::Validation(
                "server name must not be empty".to_string(),
            ));
        }
        let payload = NewMcpServer {
            api_url: validate_api_url(&server.api_url)?,
            ..server.clone()
        };
        decode(self.call_json(Method::POST, "mcp/servers", &payload).await?)
    }

    pub async fn update_server(
        &self,
        id: i64,
        patch: &McpServerPatch,
    ) -> Result<McpServer, ApiError> {
        let api_url = match patch.api_url.as_deref() {
            Some(url) => Some(validate_api_url(url)?),
            None => None,
        };
        let payload = McpServerPatch {
            api_url,
            ..patch.clone()
        };
        decode(
            self.call_json(Method::PUT, &format!("mcp/servers/{id}"), &payload)
                .await?,
        )
    }

    pub async fn delete_server(&self, id: i64) -> Result<(), ApiError> {
        self.call(self.request(Method::DELETE, &format!("mcp/servers/{id}")))
            .await
            .map(|_| ())
    }

    pub async fn server_tools(&self, server_name: &str) -> Result<Vec<McpTool>, ApiError> {
        let path = format!("mcp/servers/{}/tools", urlencoding::encode(server_name));
        decode(self.call(self.request(Method::GET, &path)).await?)
    }

    pub async fn health(&self) -> Result<Value, ApiError> {
        self.call(self.request(Method::GET, "health")).await
    }

    // =========================================================================
    // Chat
    // =========================================================================

    async fn fallback_to_buffered(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.send_chat(request).await.map(ChatReply::Complete)
    }
}

#[async_trait::async_trait]
impl ChatBackend for BackendClient {
    async fn send_chat(&self, request: &ChatRequest) -> Result<String, ApiError> {
        let data = self.call_json(Method::POST, "chat/send", request).await?;
        Ok(extract_reply(&data))
    }

    async fn open_chat_stream(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let response = match self
            .request(Method::POST, "chat/stream")
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "chat stream could not be opened; using buffered send");
                return self.fallback_to_buffered(request).await;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "chat stream rejected; using buffered send");
            return self.fallback_to_buffered(request).await;
        }

        if response.content_length() == Some(0) {
            warn!("chat stream has no body; using buffered send");
            return self.fallback_to_buffered(request).await;
        }

        if is_json_response(&response) {
            debug!("chat stream answered with a JSON body");
            let data = unwrap_envelope(read_body(response).await?)?;
            return Ok(ChatReply::Complete(extract_reply(&data)));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(ApiError::from));
        Ok(ChatReply::Stream(Box::pin(stream)))
    }
}
