//! Terminal user interface.
//!
//! Elm-style loop: render the current state, wait for terminal input or an
//! async result on the app event channel, update state, repeat. All business
//! logic lives in the backend; this layer only orchestrates requests and
//! presents results.

pub mod app;
pub mod audio;
pub mod events;
pub mod layout;
pub mod services;
pub mod sidebar;
pub mod tasks;
pub mod theme;
pub mod views;
pub mod widgets;
