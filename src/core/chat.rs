//! The send action: one user turn in, one assistant reply out.

use tracing::{debug, info};

use crate::api::{ChatBackend, ChatReply, ChatRequest};
use crate::core::constants::EMPTY_REPLY_TEXT;
use crate::core::message::{ChatMessage, MessagePatch};
use crate::core::reducer::{StreamReducer, TranscriptView};
use crate::core::store::SessionStore;

/// How the assistant reply is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyMode {
    /// Stream into a placeholder, falling back to a buffered reply.
    #[default]
    Streamed,
    /// Wait for the complete reply, then append it.
    Buffered,
}

/// Append `content` as a user message to `session_id` and obtain the reply.
///
/// Returns the id of the assistant message, or `None` when nothing was sent
/// (blank input or unknown session) or a buffered send failed. Failures are
/// reported through `view.notify` and recorded as the store's error.
pub async fn send_message<B, V>(
    backend: &B,
    store: &mut SessionStore,
    view: &mut V,
    session_id: &str,
    content: &str,
    mode: ReplyMode,
) -> Option<String>
where
    B: ChatBackend + ?Sized,
    V: TranscriptView + ?Sized,
{
    let content = content.trim();
    if content.is_empty() {
        return None;
    }
    let Some(agent_id) = store.session(session_id).map(|session| session.agent_id) else {
        debug!(session_id, "send to unknown session ignored");
        return None;
    };

    store.clear_error();
    store.set_loading(true);
    store.add_message(session_id, ChatMessage::user(content));

    // History is taken before the placeholder exists.
    let request = ChatRequest {
        agent_id,
        messages: store
            .session(session_id)
            .map(|session| session.history())
            .unwrap_or_default(),
    };
    info!(session_id, agent_id, turns = request.messages.len(), ?mode, "sending chat");

    let reply_id = match mode {
        ReplyMode::Buffered => send_buffered(backend, store, view, session_id, &request).await,
        ReplyMode::Streamed => {
            Some(send_streamed(backend, store, view, session_id, &request).await)
        }
    };

    store.set_loading(false);
    reply_id
}

async fn send_buffered<B, V>(
    backend: &B,
    store: &mut SessionStore,
    view: &mut V,
    session_id: &str,
    request: &ChatRequest,
) -> Option<String>
where
    B: ChatBackend + ?Sized,
    V: TranscriptView + ?Sized,
{
    match backend.send_chat(request).await {
        Ok(text) => {
            let reply = ChatMessage::assistant(text);
            let reply_id = reply.id.clone();
            store.add_message(session_id, reply);
            publish(store, view, session_id, &reply_id);
            view.scroll_to_bottom();
            Some(reply_id)
        }
        Err(err) => {
            let text = err.to_string();
            view.notify(&text);
            store.set_error(Some(text));
            None
        }
    }
}

async fn send_streamed<B, V>(
    backend: &B,
    store: &mut SessionStore,
    view: &mut V,
    session_id: &str,
    request: &ChatRequest,
) -> String
where
    B: ChatBackend + ?Sized,
    V: TranscriptView + ?Sized,
{
    let placeholder = ChatMessage::reply_placeholder();
    let reply_id = placeholder.id.clone();
    store.add_message(session_id, placeholder);
    publish(store, view, session_id, &reply_id);

    match backend.open_chat_stream(request).await {
        Ok(ChatReply::Stream(stream)) => {
            let outcome = StreamReducer::new(&mut *store, &mut *view, session_id, reply_id.as_str())
                .run(stream)
                .await;
            if let Some(error) = outcome.error {
                store.set_error(Some(error));
            }
        }
        Ok(ChatReply::Complete(text)) => {
            let text = if text.is_empty() {
                EMPTY_REPLY_TEXT.to_string()
            } else {
                text
            };
            settle_placeholder(store, view, session_id, &reply_id, text);
            view.scroll_to_bottom();
        }
        Err(err) => {
            let text = format!("Error: {err}");
            settle_placeholder(store, view, session_id, &reply_id, text.clone());
            view.notify(&text);
            store.set_error(Some(text));
        }
    }

    reply_id
}

fn settle_placeholder<V: TranscriptView + ?Sized>(
    store: &mut SessionStore,
    view: &mut V,
    session_id: &str,
    reply_id: &str,
    content: String,
) {
    store.update_message(session_id, reply_id, MessagePatch::content(content));
    publish(store, view, session_id, reply_id);
}

fn publish<V: TranscriptView + ?Sized>(
    store: &SessionStore,
    view: &mut V,
    session_id: &str,
    message_id: &str,
) {
    if let Some(message) = store.message(session_id, message_id) {
        view.message_changed(session_id, message);
    }
}
