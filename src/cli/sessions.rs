//! `agentdesk sessions ...`
//!
//! Sessions live only in the local cache; the backend never sees them.

use std::error::Error;
use std::io::Write;

use clap::Subcommand;

use crate::api::BackendClient;
use crate::core::store::SessionStore;
use crate::ui::printer::render_session;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum SessionCommands {
    /// List cached sessions, newest first
    List,
    /// Start an empty session with an agent
    New {
        agent_id: i64,
        #[arg(long)]
        title: Option<String>,
    },
    /// Print a session transcript
    Show { session: String },
    /// Change a session title
    Rename {
        session: String,
        #[arg(trailing_var_arg = true, required = true)]
        title: Vec<String>,
    },
    /// Delete a session from the cache
    Delete { session: String },
}

pub async fn run(
    command: SessionCommands,
    client: &BackendClient,
    store: &mut SessionStore,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match command {
        SessionCommands::List => print_sessions(store, out)?,
        SessionCommands::New { agent_id, title } => {
            let agent = client.get_agent(agent_id).await?;
            let session = store.create_session(&agent, title.as_deref());
            writeln!(out, "✅ Started session {} ({})", session.id, session.title)?;
        }
        SessionCommands::Show { session } => {
            let id = resolve_session_id(store, &session)?;
            if let Some(session) = store.session(&id) {
                write!(out, "{}", render_session(session))?;
            }
        }
        SessionCommands::Rename { session, title } => {
            let id = resolve_session_id(store, &session)?;
            let title = title.join(" ");
            if title.trim().is_empty() {
                return Err("title must not be empty".into());
            }
            store.update_session_title(&id, title.trim());
            writeln!(out, "✅ Renamed session {id} to {}", title.trim())?;
        }
        SessionCommands::Delete { session } => {
            let id = resolve_session_id(store, &session)?;
            store.delete_session(&id);
            writeln!(out, "✅ Deleted session {id}")?;
        }
    }
    Ok(())
}

/// Accept a full session id or an unambiguous prefix of one.
pub(crate) fn resolve_session_id(store: &SessionStore, query: &str) -> Result<String, String> {
    let query = query.trim();
    if let Some(session) = store.session(query) {
        return Ok(session.id.clone());
    }

    let matches: Vec<&str> = store
        .sessions()
        .iter()
        .map(|session| session.id.as_str())
        .filter(|id| !query.is_empty() && id.starts_with(query))
        .collect();
    match matches.as_slice() {
        [id] => Ok((*id).to_string()),
        [] => Err(format!("No session matches '{query}'")),
        _ => Err(format!(
            "'{query}' matches {} sessions; use more of the id",
            matches.len()
        )),
    }
}

fn print_sessions(store: &SessionStore, out: &mut impl Write) -> std::io::Result<()> {
    if store.sessions().is_empty() {
        writeln!(out, "No sessions yet.")?;
        writeln!(out, "\n💡 Start one with: agentdesk chat --agent <id>")?;
        return Ok(());
    }

    writeln!(out, "Sessions:\n")?;
    for session in store.sessions() {
        let marker = if store.current_session_id() == Some(session.id.as_str()) {
            "*"
        } else {
            "•"
        };
        writeln!(
            out,
            "  {marker} {}: {} [{}, {} messages, updated {}]",
            session.id,
            session.title,
            session.agent_name,
            session.messages.len(),
            session.updated_at
        )?;
    }
    Ok(())
}
