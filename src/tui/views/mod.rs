//! View states: one module per screen plus the chat overlay.

pub mod browse;
pub mod chat;
pub mod history;
pub mod quiz;
pub mod summary;
pub mod tts;
pub mod video;
