// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod markdown;
pub mod observability;
pub mod reveal;
pub mod timer;
pub mod transcript;
pub mod types;

// Re-exports
pub use client::{Complete, Gemini};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use reveal::{RevealScheduler, RevealState, StartOutcome, TickOutcome, TickToken};
pub use timer::{ManualTimer, Timer, TimerHandle, TokioTimer};
pub use transcript::{Message, Role, Transcript};
pub use types::*;
