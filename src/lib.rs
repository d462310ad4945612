//! agentdesk is a terminal client for an AI agents backend.
//!
//! The crate is organized in a few layers:
//! - [`api`] holds the wire types and [`api::BackendClient`], which talks to
//!   the backend's REST and streaming chat endpoints.
//! - [`core`] owns the session store and its cache, the event-stream decoder,
//!   the reducer that grows a reply placeholder from stream deltas, and the
//!   send orchestration tying them together.
//! - [`ui`] splits message text into plain, thinking, and tool-call spans and
//!   prints transcripts to the terminal.
//! - [`cli`] parses arguments and dispatches each verb.
//!
//! The binary (`src/main.rs`) only calls [`cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
