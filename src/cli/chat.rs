//! `agentdesk chat` and `agentdesk say`.

use std::error::Error;
use std::io::{BufRead, Write};

use clap::Args;
use tracing::debug;

use crate::api::BackendClient;
use crate::cli::sessions::resolve_session_id;
use crate::cli::AlreadyReported;
use crate::core::chat::{send_message, ReplyMode};
use crate::core::store::SessionStore;
use crate::ui::printer::TerminalView;

/// Which session a conversation continues.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ChatTarget {
    /// Continue this session (id or unique prefix)
    #[arg(short = 's', long, value_name = "SESSION", conflicts_with = "agent")]
    pub session: Option<String>,
    /// Start a new session with this agent
    #[arg(short = 'a', long, value_name = "AGENT_ID")]
    pub agent: Option<i64>,
}

const REPL_HELP: &str = "Commands: /title <text> renames the session, /quit or /exit leaves.";

/// Pick the session to talk in and make it current.
///
/// An explicit session wins; an agent id starts a fresh session; otherwise
/// the most recent session is continued.
pub(crate) async fn resolve_target(
    client: &BackendClient,
    store: &mut SessionStore,
    target: &ChatTarget,
) -> Result<String, Box<dyn Error>> {
    let session_id = if let Some(query) = target.session.as_deref() {
        resolve_session_id(store, query)?
    } else if let Some(agent_id) = target.agent {
        store.set_agents(client.list_agents().await?);
        let agent = store
            .agent(agent_id)
            .cloned()
            .ok_or_else(|| format!("No agent with id {agent_id}"))?;
        store.set_current_agent(Some(agent.clone()));
        store.create_session(&agent, None).id
    } else {
        store
            .sessions()
            .first()
            .map(|session| session.id.clone())
            .ok_or("No sessions yet; pass --agent <id> to start one")?
    };

    store.set_current_session(Some(&session_id));
    debug!(session_id = %session_id, "chat target resolved");
    Ok(session_id)
}

/// Send one message and wait for the whole reply.
pub async fn say<W: Write>(
    client: &BackendClient,
    store: &mut SessionStore,
    view: &mut TerminalView<W>,
    target: &ChatTarget,
    prompt: &str,
    mode: ReplyMode,
) -> Result<(), Box<dyn Error>> {
    if prompt.trim().is_empty() {
        return Err("Nothing to say; pass a message after `say`".into());
    }
    let session_id = resolve_target(client, store, target).await?;
    send_message(client, store, view, &session_id, prompt, mode).await;
    view.finish()?;

    // The view has already shown the failure.
    match store.error() {
        Some(_) => Err(AlreadyReported.into()),
        None => Ok(()),
    }
}

/// Read lines from `input` and send each as a message until EOF or `/quit`.
pub async fn chat<R: BufRead, W: Write>(
    client: &BackendClient,
    store: &mut SessionStore,
    view: &mut TerminalView<W>,
    target: &ChatTarget,
    mut input: R,
    mode: ReplyMode,
) -> Result<(), Box<dyn Error>> {
    let session_id = resolve_target(client, store, target).await?;
    if let Some(session) = store.session(&session_id) {
        view.line(&format!("# {} ({})", session.title, session.agent_name))?;
    }
    view.line(REPL_HELP)?;

    let mut line = String::new();
    loop {
        view.prompt("> ")?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();

        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => view.line(REPL_HELP)?,
            _ if text == "/title" || text.starts_with("/title ") => {
                let title = text["/title".len()..].trim();
                if title.is_empty() {
                    view.line("Usage: /title <text>")?;
                } else {
                    store.update_session_title(&session_id, title);
                    view.line(&format!("✅ Renamed to {title}"))?;
                }
            }
            _ => {
                send_message(client, store, view, &session_id, text, mode).await;
            }
        }
    }

    view.finish()?;
    Ok(())
}
