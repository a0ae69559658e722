//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles. The default implementation uses ANSI
//! escape codes, with a palette chosen by the active [`Theme`].

use std::fmt;
use std::io::{self, Stdout, Write};
use std::str::FromStr;

use crate::markdown::{self, Node};
use crate::transcript::{Message, Role};

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text.
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for italic text.
const ANSI_ITALIC: &str = "\x1b[3m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Color theme for terminal output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    /// Dark text on a light background.
    Light,
    /// Light text on a dark background.
    #[default]
    Dark,
}

impl Theme {
    /// Returns the other theme.
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                question: "\x1b[96m",
                answer: "\x1b[97m",
                heading: "\x1b[95m",
                code: "\x1b[93m",
                accent: "\x1b[36m",
            },
            Theme::Light => Palette {
                question: "\x1b[34m",
                answer: "\x1b[30m",
                heading: "\x1b[35m",
                code: "\x1b[32m",
                accent: "\x1b[34m",
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme {other:?}; expected light or dark")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    question: &'static str,
    answer: &'static str,
    heading: &'static str,
    code: &'static str,
    accent: &'static str,
}

/// Trait for rendering chat output.
///
/// This abstraction allows for different rendering strategies:
/// - Plain text with ANSI styling
/// - Plain text without styling (for piping/redirecting)
/// - Recording renderers in tests
///
/// Answers that are revealed word by word reach the renderer only through
/// [`Renderer::print_word`], so their markdown is shown raw as it types out.
/// Answers shown in one piece (fenced code, the fallback) arrive as parsed
/// [`Node`]s, and [`Renderer::print_message`] re-renders any stored answer,
/// which is how `/history` shows a revealed answer with its markup applied.
pub trait Renderer: Send {
    /// Called before the first word (or block) of an answer.
    fn start_answer(&mut self);

    /// Print one revealed word, exactly as it appears in the answer text.
    ///
    /// `first` is true for the opening word of the answer, which is not
    /// preceded by a space.
    fn print_word(&mut self, word: &str, first: bool);

    /// Print rendered markdown blocks in one piece.
    fn print_nodes(&mut self, nodes: &[Node]);

    /// Called when an answer is complete.
    fn finish_answer(&mut self);

    /// Shown while a request is in flight.
    fn print_generating(&mut self);

    /// Print one transcript message, numbered from one.
    fn print_message(&mut self, number: usize, message: &Message);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when generation is stopped by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    theme: Theme,
    in_answer: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors and the default theme.
    pub fn new() -> Self {
        Self::with_color(true, Theme::default())
    }

    /// Creates a new PlainTextRenderer with specified color setting and theme.
    pub fn with_color(use_color: bool, theme: Theme) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            theme,
            in_answer: false,
        }
    }

    /// Returns the active theme.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switches the palette used for subsequent output.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Flushes stdout to ensure immediate display of revealed words.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn style(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    fn end_answer_line(&mut self) {
        if self.in_answer {
            if self.use_color {
                print!("{ANSI_RESET}");
            }
            println!();
            self.in_answer = false;
        }
    }

    fn format_node(&self, node: &Node) -> String {
        let palette = self.theme.palette();
        match node {
            Node::Heading { level, text } => {
                if self.use_color {
                    format!("{ANSI_BOLD}{}{text}{ANSI_RESET}", palette.heading)
                } else {
                    format!("{} {text}", "#".repeat(usize::from(*level)))
                }
            }
            Node::Paragraph(text) => self.style(palette.answer, text),
            Node::ListItem { marker, text } => {
                let marker = if marker.ends_with('.') || marker.ends_with(')') {
                    marker.clone()
                } else {
                    "•".to_string()
                };
                format!(
                    "  {} {}",
                    self.style(palette.accent, &marker),
                    self.style(palette.answer, text)
                )
            }
            Node::CodeBlock { lang, body } => {
                let label = lang.as_deref().unwrap_or("code");
                let mut out = self.style(ANSI_DIM, &format!("┌─ {label}"));
                for line in body.lines() {
                    out.push('\n');
                    out.push_str(&self.style(ANSI_DIM, "│ "));
                    out.push_str(&self.style(palette.code, line));
                }
                out.push('\n');
                out.push_str(&self.style(ANSI_DIM, "└─"));
                out
            }
            Node::Quote(text) => {
                if self.use_color {
                    format!("{}▌{ANSI_RESET} {ANSI_ITALIC}{text}{ANSI_RESET}", palette.accent)
                } else {
                    format!("> {text}")
                }
            }
            Node::Rule => self.style(ANSI_DIM, "────────────────────"),
        }
    }
}

impl PlainTextRenderer {
    /// Formats a stored message; answers go through the markdown renderer.
    fn format_message(&self, number: usize, message: &Message) -> String {
        let palette = self.theme.palette();
        match message.role {
            Role::Question => {
                let edited = if message.edited { " (edited)" } else { "" };
                let label = self.style(ANSI_BOLD, &format!("[{number}] You{edited}:"));
                format!("{label} {}", self.style(palette.question, &message.content))
            }
            Role::Answer => {
                let mut out = self.style(ANSI_BOLD, &format!("[{number}] Nexus:"));
                for node in markdown::render(&message.content) {
                    out.push('\n');
                    out.push_str(&self.format_node(&node));
                }
                out
            }
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_answer(&mut self) {
        self.end_answer_line();
        let label = self.style(ANSI_BOLD, "Nexus:");
        print!("{label} ");
        if self.use_color {
            print!("{}", self.theme.palette().answer);
        }
        self.in_answer = true;
        self.flush();
    }

    fn print_word(&mut self, word: &str, first: bool) {
        if first {
            print!("{word}");
        } else {
            print!(" {word}");
        }
        self.flush();
    }

    fn print_nodes(&mut self, nodes: &[Node]) {
        if self.use_color {
            print!("{ANSI_RESET}");
        }
        println!();
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                println!();
            }
            println!("{}", self.format_node(node));
        }
        self.in_answer = false;
        self.flush();
    }

    fn finish_answer(&mut self) {
        self.end_answer_line();
        println!();
        self.flush();
    }

    fn print_generating(&mut self) {
        print!("{}", self.style(ANSI_DIM, "..."));
        print!("\r");
        self.flush();
    }

    fn print_message(&mut self, number: usize, message: &Message) {
        self.end_answer_line();
        println!("{}", self.format_message(number, message));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.end_answer_line();
        if self.use_color {
            eprintln!("{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("Error: {error}");
        }
    }

    fn print_info(&mut self, info: &str) {
        self.end_answer_line();
        println!("{info}");
    }

    fn print_interrupted(&mut self) {
        self.end_answer_line();
        println!("{}", self.style(ANSI_DIM, "[stopped]"));
        self.flush();
    }
}
