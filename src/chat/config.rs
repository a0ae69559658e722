//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::chat::render::Theme;
use crate::error::{Error, Result};
use crate::types::Model;

/// Slowest accepted typing speed, in milliseconds per word.
pub const MAX_TYPING_SPEED_MS: u64 = 500;

/// Fastest accepted typing speed, in milliseconds per word.
pub const MIN_TYPING_SPEED_MS: u64 = 5;

/// Default typing speed, in milliseconds per word.
pub const DEFAULT_TYPING_SPEED_MS: u64 = 50;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Command-line arguments for the nexus-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gemini-2.0-flash)", "MODEL")]
    pub model: Option<String>,

    /// Delay between revealed words.
    #[arrrg(optional, "Typing speed in ms per word, 5-500 (default: 50)", "MS")]
    pub typing_speed: Option<u64>,

    /// Color theme.
    #[arrrg(optional, "Color theme: light or dark (default: dark)", "THEME")]
    pub theme: Option<String>,

    /// Request timeout in seconds.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout: Option<u64>,

    /// Alternate API base URL.
    #[arrrg(optional, "API base URL (default: generativelanguage.googleapis.com)", "URL")]
    pub base_url: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Milliseconds between revealed words, within 5..=500.
    pub typing_speed_ms: u64,

    /// The color theme used by the renderer.
    pub theme: Theme,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,

    /// Request timeout.
    pub timeout: Duration,

    /// Alternate API base URL, if any.
    pub base_url: Option<String>,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gemini-2.0-flash
    /// - Typing speed: 50 ms per word
    /// - Theme: dark
    /// - Color: enabled
    /// - Timeout: 60 seconds
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            typing_speed_ms: DEFAULT_TYPING_SPEED_MS,
            theme: Theme::default(),
            use_color: true,
            timeout: DEFAULT_TIMEOUT,
            base_url: None,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the typing speed, clamped to 5..=500 ms per word.
    pub fn with_typing_speed(mut self, ms: u64) -> Self {
        self.typing_speed_ms = clamp_typing_speed(ms);
        self
    }

    /// Sets the color theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets an alternate API base URL.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// The delay between revealed words.
    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_speed_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<ChatArgs> for ChatConfig {
    type Error = Error;

    fn try_from(args: ChatArgs) -> Result<Self> {
        let mut config = ChatConfig::new().with_base_url(args.base_url);
        if let Some(model) = args.model {
            config.model = model
                .parse()
                .map_err(|err: String| Error::validation(err, Some("model".to_string())))?;
        }
        if let Some(ms) = args.typing_speed {
            config = config.with_typing_speed(ms);
        }
        if let Some(theme) = args.theme {
            config.theme = theme
                .parse()
                .map_err(|err: String| Error::validation(err, Some("theme".to_string())))?;
        }
        if let Some(seconds) = args.timeout {
            if seconds == 0 {
                return Err(Error::validation(
                    "timeout must be at least one second",
                    Some("timeout".to_string()),
                ));
            }
            config.timeout = Duration::from_secs(seconds);
        }
        config.use_color = !args.no_color;
        Ok(config)
    }
}

/// Clamps a typing speed to the accepted range.
pub fn clamp_typing_speed(ms: u64) -> u64 {
    ms.clamp(MIN_TYPING_SPEED_MS, MAX_TYPING_SPEED_MS)
}
