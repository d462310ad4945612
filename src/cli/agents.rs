//! `agentdesk agents ...`

use std::error::Error;
use std::io::Write;

use clap::Subcommand;
use serde_json::Value;

use crate::api::{Agent, AgentPatch, BackendClient, JsonMap, NewAgent};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum AgentCommands {
    /// List agents
    List,
    /// Show one agent in full
    Show { id: i64 },
    /// Create an agent
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// System prompt
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Enabled tool, as <server>_<tool> (repeatable)
        #[arg(long = "tool", value_name = "TOOL")]
        tools: Vec<String>,
        /// Provider settings as a JSON object
        #[arg(long, value_name = "JSON")]
        openai_config: Option<String>,
    },
    /// Change fields of an agent
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replace the enabled tools (repeatable)
        #[arg(long = "tool", value_name = "TOOL")]
        tools: Option<Vec<String>>,
        /// Remove every enabled tool
        #[arg(long, conflicts_with = "tools")]
        clear_tools: bool,
        /// Replace provider settings with this JSON object
        #[arg(long, value_name = "JSON")]
        openai_config: Option<String>,
    },
    /// Delete an agent
    Delete { id: i64 },
    /// List the MCP tools an agent can call
    Tools { id: i64 },
}

pub async fn run(
    command: AgentCommands,
    client: &BackendClient,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    match command {
        AgentCommands::List => {
            let agents = client.list_agents().await?;
            print_agents(&agents, out)?;
        }
        AgentCommands::Show { id } => {
            let agent = client.get_agent(id).await?;
            print_agent(&agent, out)?;
        }
        AgentCommands::Create {
            name,
            prompt,
            description,
            tools,
            openai_config,
        } => {
            let agent = NewAgent {
                name,
                description,
                prompt,
                mcp_tools: tools,
                openai_config: openai_config
                    .as_deref()
                    .map(parse_provider_config)
                    .transpose()?
                    .unwrap_or_default(),
            };
            let created = client.create_agent(&agent).await?;
            writeln!(out, "✅ Created agent {} ({})", created.id, created.name)?;
        }
        AgentCommands::Update {
            id,
            name,
            prompt,
            description,
            tools,
            clear_tools,
            openai_config,
        } => {
            let patch = AgentPatch {
                name,
                description,
                prompt,
                mcp_tools: if clear_tools { Some(Vec::new()) } else { tools },
                openai_config: openai_config
                    .as_deref()
                    .map(parse_provider_config)
                    .transpose()?,
            };
            if patch.is_empty() {
                writeln!(out, "⚠️  Nothing to update. Pass --name, --prompt, --description, --tool, or --openai-config.")?;
                return Ok(());
            }
            let updated = client.update_agent(id, &patch).await?;
            writeln!(out, "✅ Updated agent {} ({})", updated.id, updated.name)?;
        }
        AgentCommands::Delete { id } => {
            client.delete_agent(id).await?;
            writeln!(out, "✅ Deleted agent {id}")?;
        }
        AgentCommands::Tools { id } => {
            let tools = client.agent_mcp_tools(id).await?;
            if tools.is_empty() {
                writeln!(out, "Agent {id} has no MCP tools enabled.")?;
            }
            for tool in &tools {
                writeln!(out, "  • {}", describe_tool(tool))?;
            }
        }
    }
    Ok(())
}

fn parse_provider_config(raw: &str) -> Result<JsonMap, Box<dyn Error>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err("--openai-config must be a JSON object".into()),
    }
}

/// One line for a tool descriptor whose shape the backend decides.
fn describe_tool(tool: &Value) -> String {
    let name = tool
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| tool.as_str());
    let description = tool.get("description").and_then(Value::as_str);
    match (name, description) {
        (Some(name), Some(description)) if !description.is_empty() => {
            format!("{name}: {description}")
        }
        (Some(name), _) => name.to_string(),
        (None, _) => tool.to_string(),
    }
}

pub(crate) fn print_agents(agents: &[Agent], out: &mut impl Write) -> std::io::Result<()> {
    if agents.is_empty() {
        writeln!(out, "No agents yet.")?;
        writeln!(out, "\n💡 Create one with:")?;
        writeln!(
            out,
            "   agentdesk agents create --name <name> --prompt <system prompt>"
        )?;
        return Ok(());
    }

    writeln!(out, "Agents:\n")?;
    for agent in agents {
        if agent.description.is_empty() {
            writeln!(out, "  • {}: {}", agent.id, agent.name)?;
        } else {
            writeln!(out, "  • {}: {} ({})", agent.id, agent.name, agent.description)?;
        }
        if !agent.mcp_tools.is_empty() {
            writeln!(out, "      tools: {}", agent.mcp_tools.join(", "))?;
        }
    }
    Ok(())
}

fn print_agent(agent: &Agent, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Agent {}: {}", agent.id, agent.name)?;
    if !agent.description.is_empty() {
        writeln!(out, "  description: {}", agent.description)?;
    }
    writeln!(out, "  prompt:")?;
    for line in agent.prompt.lines() {
        writeln!(out, "    {line}")?;
    }
    if agent.mcp_tools.is_empty() {
        writeln!(out, "  tools: (none)")?;
    } else {
        writeln!(out, "  tools: {}", agent.mcp_tools.join(", "))?;
    }
    if !agent.openai_config.is_empty() {
        let pretty = serde_json::to_string_pretty(&agent.openai_config)
            .unwrap_or_else(|_| Value::Object(agent.openai_config.clone()).to_string());
        writeln!(out, "  openai_config: {pretty}")?;
    }
    if let Some(created_at) = &agent.created_at {
        writeln!(out, "  created: {created_at}")?;
    }
    Ok(())
}
