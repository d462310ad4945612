//! Terminal presentation.
//!
//! - [`transcript`]: splits message text into typed spans.
//! - [`printer`]: prints replies as they grow and renders stored sessions.

pub mod printer;
pub mod transcript;
