//! Command-line chat client for the deep research agent backend.
//!
//! The backend streams each turn as one plain-text body with in-band
//! sentinel markers for tool execution and research-iteration progress.
//! The [`stream`] module reconstructs that byte stream into ordered content
//! and tool-call updates under an accuracy-first buffering policy; the rest
//! of the crate is the surrounding client: HTTP access, configuration,
//! logging, and the interactive chat loop.

pub mod chat;
pub mod client;
pub mod config;
pub mod logging;
pub mod models;
pub mod stream;
pub mod utils;
