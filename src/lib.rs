//! paperdeck - terminal client for guided paper learning.
//!
//! Core library: backend API client, local persistence, and the TUI that
//! walks a paper through summary, quiz, podcast, video, and chat steps.

pub mod api;
pub mod config;
pub mod core;
pub mod tui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
