//! Command-line interface parsing and handling
//!
//! Every verb runs on one tokio runtime. Backend verbs (`agents`, `servers`,
//! `health`) are thin wrappers over [`BackendClient`]; `sessions`, `chat`,
//! and `say` also open the local session cache.

pub mod agents;
pub mod chat;
pub mod servers;
pub mod sessions;
pub mod settings;

use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::api::BackendClient;
use crate::cli::agents::AgentCommands;
use crate::cli::chat::ChatTarget;
use crate::cli::servers::ServerCommands;
use crate::cli::sessions::SessionCommands;
use crate::cli::settings::{set_setting, unset_setting, SetContext, SettingRegistry};
use crate::core::cache::FileSessionCache;
use crate::core::chat::ReplyMode;
use crate::core::config::data::{path_display, Config};
use crate::core::store::SessionStore;
use crate::ui::printer::TerminalView;
use crate::utils::logging::init_logging;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "agentdesk", version, long_version = LONG_VERSION)]
#[command(about = "Terminal client for an AI agents backend")]
#[command(
    long_about = "agentdesk talks to an AI agents backend: it manages agents and MCP servers, \
keeps chat sessions in a local cache, and streams assistant replies to the terminal.\n\n\
Configuration:\n\
  Settings live in config.toml under your config directory; see 'agentdesk config show'.\n\n\
Environment Variables:\n\
  AGENTDESK_BASE_URL   Backend API root (overrides config, overridden by --base-url)\n\
  RUST_LOG             Log filter (overrides the log-level setting)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend API root, e.g. http://localhost:8000/api
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Manage agents
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Manage MCP servers
    Servers {
        #[command(subcommand)]
        command: ServerCommands,
    },
    /// Manage locally cached chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Chat interactively, one line per message
    Chat {
        #[command(flatten)]
        target: ChatTarget,
        /// Wait for complete replies instead of streaming
        #[arg(long)]
        no_stream: bool,
    },
    /// Send one message and print the reply
    Say {
        #[command(flatten)]
        target: ChatTarget,
        /// Wait for the complete reply instead of streaming
        #[arg(long)]
        no_stream: bool,
        /// Message text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        prompt: Vec<String>,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Check that the backend is reachable
    Health,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Print the current configuration (default)
    Show,
    /// Set a configuration value
    Set {
        key: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Reset a configuration value to its default
    Unset { key: String },
}

/// A failure whose message has already been printed; the process only
/// needs to exit with a failure status.
#[derive(Debug)]
pub struct AlreadyReported;

impl fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failure already reported")
    }
}

impl Error for AlreadyReported {}

/// Resolved settings shared by every verb.
pub(crate) struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub client: BackendClient,
}

impl Context {
    pub(crate) fn new(config: Config, config_path: PathBuf, base_url: Option<&str>) -> Self {
        let client = BackendClient::new(config.resolve_base_url(base_url));
        Self {
            config,
            config_path,
            client,
        }
    }

    fn reply_mode(&self, no_stream: bool) -> ReplyMode {
        if no_stream || !self.config.stream_enabled() {
            ReplyMode::Buffered
        } else {
            ReplyMode::Streamed
        }
    }

    pub(crate) fn open_store(&self) -> Result<SessionStore, Box<dyn Error>> {
        let cache = FileSessionCache::new(self.config.session_cache_path()?);
        debug!(path = %cache.path().display(), "opening session cache");
        Ok(SessionStore::open(cache))
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = Config::load_from_path(&config_path)?;
    init_logging(config.log_filter(), args.log.as_deref())?;

    let context = Context::new(config, config_path, args.base_url.as_deref());
    debug!(base_url = %context.client.base_url(), "starting");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args.command, &context))
}

pub(crate) async fn run(command: Commands, context: &Context) -> Result<(), Box<dyn Error>> {
    let mut stdout = io::stdout().lock();
    match command {
        Commands::Agents { command } => agents::run(command, &context.client, &mut stdout).await,
        Commands::Servers { command } => {
            servers::run(command, &context.client, &mut stdout).await
        }
        Commands::Sessions { command } => {
            let mut store = context.open_store()?;
            sessions::run(command, &context.client, &mut store, &mut stdout).await
        }
        Commands::Chat { target, no_stream } => {
            drop(stdout);
            let mut store = context.open_store()?;
            let mut view = TerminalView::stdout();
            chat::chat(
                &context.client,
                &mut store,
                &mut view,
                &target,
                io::stdin().lock(),
                context.reply_mode(no_stream),
            )
            .await
        }
        Commands::Say {
            target,
            no_stream,
            prompt,
        } => {
            drop(stdout);
            let mut store = context.open_store()?;
            let mut view = TerminalView::stdout();
            chat::say(
                &context.client,
                &mut store,
                &mut view,
                &target,
                &prompt.join(" "),
                context.reply_mode(no_stream),
            )
            .await
        }
        Commands::Config { command } => {
            run_config(command.unwrap_or(ConfigCommands::Show), context, &mut stdout)
        }
        Commands::Health => {
            let status = context.client.health().await?;
            writeln!(
                stdout,
                "✅ Backend at {} is up: {status}",
                context.client.base_url()
            )?;
            Ok(())
        }
    }
}

fn run_config(
    command: ConfigCommands,
    context: &Context,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let registry = SettingRegistry::new();
    let ctx = SetContext {
        config_path: &context.config_path,
    };
    let result = match command {
        ConfigCommands::Show => {
            print_config(&context.config, &context.config_path, &registry, out)?;
            return Ok(());
        }
        ConfigCommands::Set { key, value } => set_setting(&registry, &key, &value, &ctx),
        ConfigCommands::Unset { key } => unset_setting(&registry, &key, &ctx),
    };

    match result {
        Ok(message) => {
            writeln!(out, "{message}")?;
            Ok(())
        }
        Err(err) => {
            err.print();
            std::process::exit(1);
        }
    }
}

fn print_config(
    config: &Config,
    config_path: &Path,
    registry: &SettingRegistry,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "Config file: {}", path_display(config_path))?;
    writeln!(out, "Current configuration:")?;
    for line in config.summary_lines() {
        writeln!(out, "{line}")?;
    }
    writeln!(out, "\nKeys: {}", registry.keys_sorted().join(", "))
}

#[cfg(test)]
mod tests;
