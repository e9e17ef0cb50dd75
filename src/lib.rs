//! voice-agent-rs: speech text preparation and per-customer conversation
//! memory for a Hinglish voice assistant.

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod memory;
pub mod speech;
