pub mod chatbot;
pub mod logging;
pub mod paper;
pub mod persist;
