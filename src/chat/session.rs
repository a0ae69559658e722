//! Core chat session management.
//!
//! This module provides the [`ChatSession`] struct which owns the transcript,
//! the reveal scheduler, and the bookkeeping that decides what happens to a
//! completion once it arrives.  Synchronous operations do all the state
//! changes; [`ChatSession::run_turn`] is a thin async driver that feeds
//! completions, ticks, and interrupts into them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{debug, info};

use crate::chat::config::{ChatConfig, clamp_typing_speed};
use crate::chat::render::Renderer;
use crate::client::Complete;
use crate::error::{Error, Result};
use crate::markdown;
use crate::observability::{SESSION_DISCARDED, SESSION_FALLBACKS, SESSION_SUBMISSIONS};
use crate::reveal::{RevealScheduler, StartOutcome, TickOutcome, TickToken, is_fenced_code_block};
use crate::timer::{Timer, TokioTimer};
use crate::transcript::{Message, Role, Transcript};
use crate::types::Model;

/// Answer content written when a request fails for any reason.
pub const FALLBACK_MESSAGE: &str = "Sorry - Something went wrong. Please try again!";

/// Identifies one submitted request.
///
/// A completion is only applied if its ticket is still the pending one, so a
/// response that arrives after a stop is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Sequence number of the request, starting at one.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// What [`ChatSession::resolve`] did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The request was stopped or superseded; nothing changed.
    Discarded,
    /// The request failed; the answer holds [`FALLBACK_MESSAGE`].
    Failed {
        /// Transcript index of the answer.
        index: usize,
    },
    /// The answer is a fenced code block and was written in one piece.
    Atomic {
        /// Transcript index of the answer.
        index: usize,
    },
    /// The answer had no words; it stays empty.
    Completed {
        /// Transcript index of the answer.
        index: usize,
    },
    /// A reveal job is growing the answer.
    Revealing {
        /// Transcript index of the answer.
        index: usize,
        /// Number of words to reveal.
        words: usize,
    },
}

/// How a turn driven by [`ChatSession::run_turn`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The answer is complete.
    Answered,
    /// The request failed and the fallback answer was shown.
    Failed,
    /// The user stopped generation.
    Stopped,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// Milliseconds between revealed words.
    pub typing_speed_ms: u64,
    /// The number of messages in the transcript.
    pub message_count: usize,
    /// Questions in the transcript.
    pub question_count: usize,
    /// Questions that were edited and resent.
    pub edited_count: usize,
    /// Total number of requests submitted.
    pub total_requests: u64,
    /// Requests that ended with the fallback answer.
    pub failed_requests: u64,
    /// Completions dropped because their request was stopped.
    pub discarded_responses: u64,
    /// Whether a request or reveal is in flight.
    pub generating: bool,
}

/// User request to stop generation.
///
/// Shared between the `ctrlc` handler thread and the turn driver.  Triggering
/// wakes a waiting driver; the flag stays set until [`Interrupt::reset`].
#[derive(Debug, Default)]
pub struct Interrupt {
    flag: AtomicBool,
    notify: Notify,
}

impl Interrupt {
    /// Creates an untriggered interrupt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Returns true if a stop was requested.
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears the stop request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Waits for the next trigger.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

#[derive(Debug)]
struct Pending {
    ticket: Ticket,
    prompt: String,
}

struct Completion {
    ticket: Ticket,
    result: Result<String>,
}

/// A chat session: transcript, reveal scheduler, and request bookkeeping.
pub struct ChatSession<T: Timer = TokioTimer> {
    config: ChatConfig,
    transcript: Transcript,
    scheduler: RevealScheduler<T>,
    ticks: UnboundedReceiver<TickToken>,
    completions_tx: UnboundedSender<Completion>,
    completions: UnboundedReceiver<Completion>,
    pending: Option<Pending>,
    next_ticket: u64,
    failed_requests: u64,
    discarded_responses: u64,
}

impl ChatSession<TokioTimer> {
    /// Creates a new chat session driven by tokio timers.
    pub fn new(config: ChatConfig) -> Self {
        Self::with_timer(config, TokioTimer::new())
    }
}

impl<T: Timer> ChatSession<T> {
    /// Creates a new chat session with a custom timer.
    pub fn with_timer(config: ChatConfig, timer: T) -> Self {
        let (ticks_tx, ticks) = unbounded_channel();
        let (completions_tx, completions) = unbounded_channel();
        Self {
            config,
            transcript: Transcript::new(),
            scheduler: RevealScheduler::new(timer, ticks_tx),
            ticks,
            completions_tx,
            completions,
            pending: None,
            next_ticket: 0,
            failed_requests: 0,
            discarded_responses: 0,
        }
    }

    /// Appends `prompt` as a question and returns the ticket for its request.
    ///
    /// Whitespace-only input is rejected without touching the transcript.
    pub fn submit(&mut self, prompt: &str) -> Result<Ticket> {
        self.ensure_idle()?;
        let index = self.transcript.append_question(prompt)?;
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.pending = Some(Pending {
            ticket,
            prompt: prompt.to_string(),
        });
        SESSION_SUBMISSIONS.click();
        debug!(ticket = ticket.id(), index, "question submitted");
        Ok(ticket)
    }

    /// Marks the question at `index` edited and submits `text` as a new
    /// question.  The original question's content is left unchanged.
    pub fn edit_and_resend(&mut self, index: usize, text: &str) -> Result<Ticket> {
        self.ensure_idle()?;
        if text.trim().is_empty() {
            return Err(Error::empty_submission());
        }
        match self.transcript.get(index) {
            Some(message) if message.is_question() => {}
            Some(_) => {
                return Err(Error::invalid_index(index, "only questions can be edited"));
            }
            None => return Err(Error::invalid_index(index, "no such message")),
        }
        self.transcript.mark_edited(index)?;
        self.submit(text)
    }

    /// Applies the completion for `ticket`.
    ///
    /// Completions for a ticket that is no longer pending are dropped.
    /// Otherwise an answer placeholder is appended and filled according to
    /// the result: the fallback on failure, the whole text for a fenced code
    /// block, or a reveal job for everything else.
    pub fn resolve(&mut self, ticket: Ticket, result: Result<String>) -> Result<Resolution> {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {}
            _ => {
                SESSION_DISCARDED.click();
                self.discarded_responses += 1;
                debug!(ticket = ticket.id(), "discarding late completion");
                return Ok(Resolution::Discarded);
            }
        }
        self.pending = None;
        let index = self.transcript.append_answer_placeholder();

        let text = match result {
            Ok(text) => text,
            Err(err) => {
                SESSION_FALLBACKS.click();
                self.failed_requests += 1;
                info!(ticket = ticket.id(), error = %err, "request failed; using fallback");
                self.transcript.set_answer_content(index, FALLBACK_MESSAGE)?;
                return Ok(Resolution::Failed { index });
            }
        };

        if is_fenced_code_block(&text) {
            self.transcript.set_answer_content(index, &text)?;
            return Ok(Resolution::Atomic { index });
        }

        match self
            .scheduler
            .start(&text, index, self.config.typing_interval())?
        {
            StartOutcome::Running { words } => Ok(Resolution::Revealing { index, words }),
            StartOutcome::Completed => Ok(Resolution::Completed { index }),
        }
    }

    /// Forwards a tick to the reveal scheduler.
    pub fn tick(&mut self, token: TickToken) -> Result<TickOutcome> {
        self.scheduler.tick(token, &mut self.transcript)
    }

    /// Stops generation: the pending request's result will be discarded and
    /// any reveal is cancelled with its partial text kept.
    ///
    /// Returns true if anything was stopped.
    pub fn stop(&mut self) -> bool {
        let dropped = self.pending.take();
        if let Some(pending) = &dropped {
            debug!(ticket = pending.ticket.id(), "pending request abandoned");
        }
        let cancelled = self.scheduler.cancel();
        dropped.is_some() || cancelled
    }

    /// Stops generation and empties the transcript.
    pub fn clear(&mut self) {
        self.stop();
        self.transcript.clear();
    }

    /// Returns true while a request is pending or an answer is being revealed.
    pub fn is_generating(&self) -> bool {
        self.pending.is_some() || self.scheduler.is_running()
    }

    /// Returns the transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the transcript messages in order.
    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Sets the typing speed, clamped to 5..=500 ms.  A running reveal keeps
    /// the speed it started with.
    pub fn set_typing_speed(&mut self, ms: u64) -> u64 {
        self.config.typing_speed_ms = clamp_typing_speed(ms);
        self.config.typing_speed_ms
    }

    /// Changes the model recorded for the session.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.config.model
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        let messages = self.transcript.messages();
        SessionStats {
            model: self.config.model.clone(),
            typing_speed_ms: self.config.typing_speed_ms,
            message_count: messages.len(),
            question_count: messages.iter().filter(|m| m.role == Role::Question).count(),
            edited_count: messages.iter().filter(|m| m.edited).count(),
            total_requests: self.next_ticket,
            failed_requests: self.failed_requests,
            discarded_responses: self.discarded_responses,
            generating: self.is_generating(),
        }
    }

    /// Drives the request for `ticket` until its answer is complete, it
    /// fails, or `interrupt` fires.
    ///
    /// The request runs as its own task.  Stopping does not abort it; its
    /// result is discarded whenever it arrives.
    pub async fn run_turn(
        &mut self,
        ticket: Ticket,
        completer: Arc<dyn Complete>,
        renderer: &mut dyn Renderer,
        interrupt: &Interrupt,
    ) -> Result<TurnOutcome> {
        let prompt = match &self.pending {
            Some(pending) if pending.ticket == ticket => pending.prompt.clone(),
            _ => return Ok(TurnOutcome::Stopped),
        };

        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = completer.complete(&prompt).await;
            // The session may be gone by the time a slow request finishes.
            let _ = tx.send(Completion { ticket, result });
        });
        renderer.print_generating();

        loop {
            if interrupt.is_triggered() {
                self.stop();
                renderer.print_interrupted();
                return Ok(TurnOutcome::Stopped);
            }
            tokio::select! {
                _ = interrupt.notified() => {}
                Some(completion) = self.completions.recv() => {
                    let resolution = self.resolve(completion.ticket, completion.result)?;
                    match resolution {
                        Resolution::Discarded => {}
                        Resolution::Failed { index } => {
                            self.render_whole(index, renderer);
                            return Ok(TurnOutcome::Failed);
                        }
                        Resolution::Atomic { index } => {
                            self.render_whole(index, renderer);
                            return Ok(TurnOutcome::Answered);
                        }
                        Resolution::Completed { .. } => {
                            renderer.start_answer();
                            renderer.finish_answer();
                            return Ok(TurnOutcome::Answered);
                        }
                        Resolution::Revealing { .. } => renderer.start_answer(),
                    }
                }
                Some(token) = self.ticks.recv() => {
                    if let TickOutcome::Revealed { word, position, done, .. } = self.tick(token)? {
                        renderer.print_word(&word, position == 0);
                        if done {
                            renderer.finish_answer();
                            return Ok(TurnOutcome::Answered);
                        }
                    }
                }
            }
        }
    }

    fn render_whole(&self, index: usize, renderer: &mut dyn Renderer) {
        let content = self
            .transcript
            .get(index)
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        renderer.start_answer();
        renderer.print_nodes(&markdown::render(content));
        renderer.finish_answer();
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_generating() {
            Err(Error::busy("an answer is still being generated"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reveal::RevealState;
    use crate::timer::ManualTimer;
    use crate::types::KnownModel;

    fn session() -> (ChatSession<ManualTimer>, ManualTimer) {
        let timer = ManualTimer::new();
        (ChatSession::with_timer(ChatConfig::new(), timer.clone()), timer)
    }

    /// Fires every pending tick until the reveal finishes.
    fn drain(session: &mut ChatSession<ManualTimer>, timer: &ManualTimer) {
        while timer.fire_next() {
            let token = session.ticks.try_recv().unwrap();
            session.tick(token).unwrap();
        }
    }

    fn content(session: &ChatSession<ManualTimer>, index: usize) -> &str {
        &session.messages()[index].content
    }

    #[test]
    fn new_session_empty() {
        let (session, _) = session();
        assert!(session.messages().is_empty());
        assert!(!session.is_generating());
        assert_eq!(session.model(), &Model::Known(KnownModel::Gemini20Flash));
    }

    #[test]
    fn whitespace_submission_is_noop() {
        let (mut session, timer) = session();
        let err = session.submit("   \n\t").unwrap_err();
        assert!(err.is_empty_submission());
        assert!(session.messages().is_empty());
        assert!(!session.is_generating());
        assert_eq!(timer.pending(), 0);
        assert_eq!(session.stats().total_requests, 0);
    }

    #[test]
    fn hello_reveals_word_by_word() {
        let (mut session, timer) = session();
        let ticket = session.submit("Hello").unwrap();
        assert!(session.is_generating());
        let resolution = session
            .resolve(ticket, Ok("Hi there friend".to_string()))
            .unwrap();
        assert_eq!(resolution, Resolution::Revealing { index: 1, words: 3 });
        assert_eq!(content(&session, 1), "");
        assert_eq!(timer.delays(), vec![ChatConfig::new().typing_interval()]);

        drain(&mut session, &timer);
        assert_eq!(content(&session, 0), "Hello");
        assert_eq!(content(&session, 1), "Hi there friend");
        assert_eq!(session.messages()[1].role, Role::Answer);
        assert!(!session.is_generating());
    }

    #[test]
    fn failure_writes_fallback() {
        let (mut session, timer) = session();
        let ticket = session.submit("Hello").unwrap();
        let resolution = session
            .resolve(ticket, Err(Error::internal_server("boom")))
            .unwrap();
        assert_eq!(resolution, Resolution::Failed { index: 1 });
        assert_eq!(content(&session, 1), FALLBACK_MESSAGE);
        assert_eq!(timer.pending(), 0);
        assert!(!session.is_generating());
        assert_eq!(session.stats().failed_requests, 1);
    }

    #[test]
    fn fenced_code_is_written_at_once() {
        let (mut session, timer) = session();
        let ticket = session.submit("Show code").unwrap();
        let code = "```rust\nfn main() {}\n```";
        let resolution = session.resolve(ticket, Ok(code.to_string())).unwrap();
        assert_eq!(resolution, Resolution::Atomic { index: 1 });
        assert_eq!(content(&session, 1), code);
        assert_eq!(timer.pending(), 0);
        assert!(!session.is_generating());
    }

    #[test]
    fn empty_completion_leaves_empty_answer() {
        let (mut session, _) = session();
        let ticket = session.submit("Hello").unwrap();
        let resolution = session.resolve(ticket, Ok("  ".to_string())).unwrap();
        assert_eq!(resolution, Resolution::Completed { index: 1 });
        assert_eq!(content(&session, 1), "");
        assert!(!session.is_generating());
    }

    #[test]
    fn busy_while_pending_or_revealing() {
        let (mut session, timer) = session();
        let ticket = session.submit("first").unwrap();
        assert!(session.submit("second").unwrap_err().is_busy());
        session.resolve(ticket, Ok("one two".to_string())).unwrap();
        assert!(session.submit("second").unwrap_err().is_busy());
        assert!(session.edit_and_resend(0, "again").unwrap_err().is_busy());
        assert_eq!(session.messages().len(), 2);
        drain(&mut session, &timer);
        assert!(session.submit("second").is_ok());
    }

    #[test]
    fn edit_and_resend_appends_new_question() {
        let (mut session, timer) = session();
        let ticket = session.submit("What is rust").unwrap();
        session.resolve(ticket, Ok("A language".to_string())).unwrap();
        drain(&mut session, &timer);

        session.edit_and_resend(0, "What is Rust?").unwrap();
        let messages = session.messages();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].edited);
        assert_eq!(messages[0].content, "What is rust");
        assert_eq!(messages[2].content, "What is Rust?");
        assert!(!messages[2].edited);
        assert!(session.is_generating());
        assert_eq!(session.stats().edited_count, 1);
    }

    #[test]
    fn edit_rejects_answers_and_bad_indices() {
        let (mut session, timer) = session();
        let ticket = session.submit("Hello").unwrap();
        session.resolve(ticket, Ok("Hi".to_string())).unwrap();
        drain(&mut session, &timer);

        assert!(session.edit_and_resend(1, "text").unwrap_err().is_invalid_index());
        assert!(session.edit_and_resend(7, "text").unwrap_err().is_invalid_index());
        assert!(session.edit_and_resend(0, "  ").unwrap_err().is_empty_submission());
        assert!(!session.messages()[0].edited);
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn stop_then_late_arrival_is_discarded() {
        let (mut session, timer) = session();
        let ticket = session.submit("Hello").unwrap();
        assert!(session.stop());
        assert!(!session.is_generating());

        let resolution = session
            .resolve(ticket, Ok("too late".to_string()))
            .unwrap();
        assert_eq!(resolution, Resolution::Discarded);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(timer.pending(), 0);
        assert_eq!(session.stats().discarded_responses, 1);
    }

    #[test]
    fn stale_ticket_does_not_resolve_newer_request() {
        let (mut session, _) = session();
        let old = session.submit("first").unwrap();
        session.stop();
        let new = session.submit("second").unwrap();
        assert_ne!(old, new);
        assert_eq!(
            session.resolve(old, Ok("stale".to_string())).unwrap(),
            Resolution::Discarded
        );
        assert!(session.is_generating());
        assert_eq!(
            session.resolve(new, Ok("```\nok\n```".to_string())).unwrap(),
            Resolution::Atomic { index: 2 }
        );
    }

    #[test]
    fn stop_mid_reveal_keeps_prefix() {
        let (mut session, timer) = session();
        let ticket = session.submit("Hello").unwrap();
        session
            .resolve(ticket, Ok("one two three".to_string()))
            .unwrap();
        assert!(timer.fire_next());
        let token = session.ticks.try_recv().unwrap();
        session.tick(token).unwrap();

        assert!(session.stop());
        assert!(!session.stop());
        assert_eq!(content(&session, 1), "one");
        assert_eq!(session.scheduler.state(), RevealState::Idle);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn clear_mid_reveal_empties_everything() {
        let (mut session, timer) = session();
        let ticket = session.submit("Hello").unwrap();
        session
            .resolve(ticket, Ok("one two three".to_string()))
            .unwrap();
        assert!(timer.fire_next());
        let token = session.ticks.try_recv().unwrap();

        session.clear();
        assert!(session.messages().is_empty());
        assert!(!session.is_generating());
        assert_eq!(session.tick(token).unwrap(), TickOutcome::Stale);
        assert!(session.messages().is_empty());
    }

    #[test]
    fn typing_speed_is_captured_at_start() {
        let (mut session, timer) = session();
        assert_eq!(session.set_typing_speed(100), 100);
        let ticket = session.submit("Hello").unwrap();
        session.resolve(ticket, Ok("a b".to_string())).unwrap();
        assert_eq!(session.set_typing_speed(1), 5);
        drain(&mut session, &timer);
        assert_eq!(
            timer.delays(),
            vec![std::time::Duration::from_millis(100); 2]
        );
        assert_eq!(session.set_typing_speed(9_000), 500);
    }

    #[test]
    fn stats_snapshot() {
        let (mut session, timer) = session();
        session.set_model(Model::Known(KnownModel::Gemini25Flash));
        let ticket = session.submit("Hello").unwrap();
        session.resolve(ticket, Ok("Hi".to_string())).unwrap();
        let stats = session.stats();
        assert!(stats.generating);
        drain(&mut session, &timer);

        let stats = session.stats();
        assert_eq!(stats.model, Model::Known(KnownModel::Gemini25Flash));
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.question_count, 1);
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.failed_requests, 0);
        assert!(!stats.generating);
    }

    #[test]
    fn interrupt_flag() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_triggered());
        interrupt.trigger();
        assert!(interrupt.is_triggered());
        interrupt.reset();
        assert!(!interrupt.is_triggered());
    }
}
