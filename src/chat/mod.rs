//! Chat application module for interactive conversations with Gemini.
//!
//! This module provides a REPL chat interface built on top of the nexus
//! client library. It supports:
//!
//! - Word-by-word reveal of completed answers at a configurable speed
//! - Stopping generation mid-request or mid-reveal
//! - Editing and resending earlier questions
//! - Light and dark ANSI themes
//! - Slash commands for session control
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Transcript, reveal, and request bookkeeping
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{CATEGORIES, ChatCommand, category, help_text, parse_command};
pub use config::{
    ChatArgs, ChatConfig, DEFAULT_TYPING_SPEED_MS, MAX_TYPING_SPEED_MS, MIN_TYPING_SPEED_MS,
    clamp_typing_speed,
};
pub use render::{PlainTextRenderer, Renderer, Theme};
pub use session::{
    ChatSession, FALLBACK_MESSAGE, Interrupt, Resolution, SessionStats, Ticket, TurnOutcome,
};
