//! Aria gateway
//!
//! A WhatsApp safety-assistant gateway for worksites in Guyana: webhook
//! intake, conversation state and thread tracking, a structured incident
//! report flow, and dual text-plus-voice delivery backed by a chain of
//! speech synthesis engines.

pub mod api;
pub mod app;
pub mod backend;
pub mod bot;
pub mod channels;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod intent;
pub mod llm;
pub mod location;
pub mod responder;
pub mod tracker;
pub mod tts;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
