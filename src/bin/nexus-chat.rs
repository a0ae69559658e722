//! Interactive chat application for conversing with Gemini.
//!
//! Each answer is fetched in one request and then revealed word by word, as
//! if it were being typed.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! nexus-chat
//!
//! # Specify a model and a slower typing speed
//! nexus-chat --model gemini-2.5-flash --typing-speed 120
//!
//! # Light theme, no colors (useful for piping output)
//! nexus-chat --theme light --no-color
//! ```
//!
//! Set `NEXUS_LOG=debug` to see diagnostics on stderr.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear the conversation
//! - `/edit <n> [text]` - Edit an earlier question and resend it
//! - `/speed <ms>` - Change the typing speed
//! - `/theme [light|dark]` - Change the color theme
//! - `/quit` - Exit the application
//!
//! Press Ctrl+C while an answer is generating to stop it.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use nexus::chat::{
    CATEGORIES, ChatArgs, ChatCommand, ChatConfig, ChatSession, Interrupt, PlainTextRenderer,
    Renderer, Theme, Ticket, TurnOutcome, category, help_text, parse_command,
};
use nexus::{Gemini, Model};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "NEXUS_LOG";

/// Main entry point for the nexus-chat application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (args, _) = ChatArgs::from_command_line_relaxed("nexus-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let mut client = Gemini::with_options(
        None,
        config.model.clone(),
        config.base_url.clone(),
        Some(config.timeout),
    )?;
    let mut renderer = PlainTextRenderer::with_color(config.use_color, config.theme);
    let mut session = ChatSession::new(config);
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during generation
    let interrupt = Arc::new(Interrupt::new());

    // Set up Ctrl+C handler
    let interrupt_clone = Arc::clone(&interrupt);
    ctrlc::set_handler(move || {
        interrupt_clone.trigger();
    })?;

    println!("Nexus Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");
    print_welcome(&mut renderer);

    let mut prefill: Option<String> = None;

    loop {
        let readline = match prefill.take() {
            Some(initial) => rl.readline_with_initial("You: ", (initial.as_str(), "")),
            None => rl.readline("You: "),
        };

        let line = match readline {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        let Some(cmd) = parse_command(line) else {
            // Regular message - send to API
            match session.submit(line) {
                Ok(ticket) => {
                    run_turn(&mut session, &client, ticket, &mut renderer, &interrupt).await;
                }
                Err(err) => renderer.print_error(&err.to_string()),
            }
            continue;
        };

        match cmd {
            ChatCommand::Quit => {
                println!("Goodbye!");
                break;
            }
            ChatCommand::Clear => {
                session.clear();
                renderer.print_info("Conversation cleared.");
                print_welcome(&mut renderer);
            }
            ChatCommand::Edit { number, text } => {
                let index = number - 1;
                let text = match text {
                    Some(text) => text,
                    None => {
                        let Some(original) = session.messages().get(index) else {
                            renderer.print_error(&format!("No message {number}"));
                            continue;
                        };
                        let original = original.content.clone();
                        match rl.readline_with_initial("Edit: ", (original.as_str(), "")) {
                            Ok(text) => text,
                            Err(_) => {
                                renderer.print_info("Edit cancelled.");
                                continue;
                            }
                        }
                    }
                };
                match session.edit_and_resend(index, &text) {
                    Ok(ticket) => {
                        run_turn(&mut session, &client, ticket, &mut renderer, &interrupt).await;
                    }
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            ChatCommand::History => {
                if session.messages().is_empty() {
                    renderer.print_info("No messages yet.");
                }
                for (i, message) in session.messages().iter().enumerate() {
                    renderer.print_message(i + 1, message);
                }
            }
            ChatCommand::Speed(ms) => {
                let ms = session.set_typing_speed(ms);
                renderer.print_info(&format!("Typing speed set to {ms} ms per word"));
            }
            ChatCommand::Theme(theme) => {
                let theme = theme.unwrap_or_else(|| renderer.theme().toggle());
                renderer.set_theme(theme);
                renderer.print_info(&format!("Theme set to {theme}"));
            }
            ChatCommand::Suggest => print_categories(&mut renderer),
            ChatCommand::Pick(number) => match category(number) {
                Some(text) => prefill = Some(text.to_string()),
                None => renderer.print_error(&format!(
                    "No suggestion {number}; pick 1-{}",
                    CATEGORIES.len()
                )),
            },
            ChatCommand::Model(model_name) => match model_name.parse::<Model>() {
                Ok(model) => {
                    client.set_model(model.clone());
                    session.set_model(model);
                    renderer.print_info(&format!("Model changed to: {}", model_name));
                }
                Err(err) => renderer.print_error(&err),
            },
            ChatCommand::Help => {
                for line in help_text().lines() {
                    println!("    {}", line);
                }
            }
            ChatCommand::Stats => print_stats(&session),
            ChatCommand::ShowConfig => print_config(&session, renderer.theme()),
            ChatCommand::Invalid(message) => renderer.print_error(&message),
        }
    }

    Ok(())
}

async fn run_turn(
    session: &mut ChatSession,
    client: &Gemini,
    ticket: Ticket,
    renderer: &mut PlainTextRenderer,
    interrupt: &Interrupt,
) {
    // Reset interrupt flag before each turn
    interrupt.reset();
    match session
        .run_turn(ticket, Arc::new(client.clone()), renderer, interrupt)
        .await
    {
        Ok(TurnOutcome::Failed) => debug!(ticket = ticket.id(), "turn failed; fallback shown"),
        Ok(outcome) => debug!(ticket = ticket.id(), ?outcome, "turn finished"),
        Err(err) => {
            session.stop();
            renderer.print_error(&err.to_string());
        }
    }
}

fn print_welcome(renderer: &mut PlainTextRenderer) {
    renderer.print_info("How can I help you today?");
    print_categories(renderer);
}

fn print_categories(renderer: &mut PlainTextRenderer) {
    for (i, category) in CATEGORIES.iter().enumerate() {
        renderer.print_info(&format!("    {}. {}", i + 1, category));
    }
    renderer.print_info("Use /pick <n> to start from a suggestion.\n");
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Messages: {}", stats.message_count);
    println!(
        "      Questions: {} ({} edited)",
        stats.question_count, stats.edited_count
    );
    println!(
        "      Requests: {} ({} failed, {} discarded)",
        stats.total_requests, stats.failed_requests, stats.discarded_responses
    );
    println!("      Typing speed: {} ms per word", stats.typing_speed_ms);
}

fn print_config(session: &ChatSession, theme: Theme) {
    let config = session.config();
    println!("    Current Configuration:");
    println!("      Model: {}", config.model);
    println!("      Typing speed: {} ms per word", config.typing_speed_ms);
    println!("      Theme: {}", theme);
    println!(
        "      Color: {}",
        if config.use_color {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("      Timeout: {}s", config.timeout.as_secs());
    match config.base_url.as_deref() {
        Some(url) => println!("      Base URL: {}", url),
        None => println!("      Base URL: (default)"),
    }
}
