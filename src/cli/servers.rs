//! `agentdesk servers ...`

use std::error::Error;
use std::io::Write;

use clap::Subcommand;

use crate::api::{scoped_tool_id, BackendClient, McpServer, McpServerPatch, NewMcpServer};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ServerCommands {
    /// List registered MCP servers
    List,
    /// Register an MCP server
    Create {
        /// Name used to scope tool ids (<name>_<tool>)
        #[arg(long)]
        name: String,
        /// Endpoint, http:// or https://
        #[arg(long)]
        url: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Register without activating
        #[arg(long)]
        inactive: bool,
    },
    /// Change fields of a server
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Activate (true) or deactivate (false)
        #[arg(long, value_name = "BOOL")]
        active: Option<bool>,
    },
    /// Remove a server
    Delete { id: i64 },
    /// List tools a server exposes, with the ids agents enable them by
    Tools { name: String },
}

pub async fn run(
    command: ServerCommands,
    client: &BackendClient,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match command {
        ServerCommands::List => {
            let servers = client.list_servers().await?;
            print_servers(&servers, out)?;
        }
        ServerCommands::Create {
            name,
            url,
            description,
            inactive,
        } => {
            let server = NewMcpServer {
                name,
                description,
                api_url: url,
                is_active: Some(!inactive),
            };
            let created = client.create_server(&server).await?;
            writeln!(
                out,
                "✅ Registered server {} ({}) at {}",
                created.id, created.name, created.api_url
            )?;
        }
        ServerCommands::Update {
            id,
            name,
            url,
            description,
            active,
        } => {
            let patch = McpServerPatch {
                name,
                description,
                api_url: url,
                is_active: active,
            };
            if patch.is_empty() {
                writeln!(
                    out,
                    "⚠️  Nothing to update. Pass --name, --url, --description, or --active."
                )?;
                return Ok(());
            }
            let updated = client.update_server(id, &patch).await?;
            writeln!(out, "✅ Updated server {} ({})", updated.id, updated.name)?;
        }
        ServerCommands::Delete { id } => {
            client.delete_server(id).await?;
            writeln!(out, "✅ Deleted server {id}")?;
        }
        ServerCommands::Tools { name } => {
            let tools = client.server_tools(&name).await?;
            if tools.is_empty() {
                writeln!(out, "Server {name} exposes no tools.")?;
                return Ok(());
            }
            writeln!(out, "Tools on {name}:\n")?;
            for tool in &tools {
                let id = scoped_tool_id(&name, &tool.name);
                match tool.description.as_deref().filter(|d| !d.is_empty()) {
                    Some(description) => writeln!(out, "  • {id}: {description}")?,
                    None => writeln!(out, "  • {id}")?,
                }
            }
            writeln!(
                out,
                "\n💡 Enable one with: agentdesk agents update <id> --tool <tool id>"
            )?;
        }
    }
    Ok(())
}

fn print_servers(servers: &[McpServer], out: &mut impl Write) -> std::io::Result<()> {
    if servers.is_empty() {
        writeln!(out, "No MCP servers registered.")?;
        writeln!(out, "\n💡 Register one with:")?;
        writeln!(
            out,
            "   agentdesk servers create --name <name> --url http://host:port/mcp"
        )?;
        return Ok(());
    }

    writeln!(out, "MCP servers:\n")?;
    for server in servers {
        let state = if server.is_active { "" } else { " [inactive]" };
        writeln!(
            out,
            "  • {}: {} {}{}",
            server.id, server.name, server.api_url, state
        )?;
        if !server.description.is_empty() {
            writeln!(out, "      {}", server.description)?;
        }
    }
    Ok(())
}
