//! Word-by-word reveal of a finished answer.
//!
//! The remote API returns a completion in one piece.  The [`RevealScheduler`]
//! drip-feeds it into the transcript one word per tick so it reads like live
//! generation.  A job runs to completion or is cancelled; there is no pause.
//!
//! Ticks arrive as [`TickToken`]s on a channel.  The scheduler asks its
//! [`Timer`] to post the token for the next word after the job's interval, and
//! the owner feeds each received token back into [`RevealScheduler::tick`].
//! Every job gets a fresh token generation, so a token left over from a
//! cancelled job is recognised as stale and never touches a later answer.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::observability::{REVEAL_CANCELLED, REVEAL_COMPLETED, REVEAL_STARTED, REVEAL_WORDS};
use crate::timer::{Timer, TimerHandle};
use crate::transcript::Transcript;

/// Marker that opens a fenced code block.
pub const CODE_FENCE: &str = "```";

/// Returns true if `text`, once trimmed, opens with a fenced code block.
///
/// Such answers are written in one piece instead of being revealed.
pub fn is_fenced_code_block(text: &str) -> bool {
    text.trim().starts_with(CODE_FENCE)
}

/// Splits `text` on runs of whitespace.
///
/// Joining the result with single spaces and splitting again yields the same
/// words, which is all a reveal preserves of the original spacing.
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Identifies the tick a timer callback stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickToken {
    generation: u64,
}

/// Whether a reveal job is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    /// No job active.
    Idle,
    /// A job is waiting for its next tick.
    Running,
}

/// Result of [`RevealScheduler::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A job is running; the first word arrives after one interval.
    Running {
        /// Number of words the job will reveal.
        words: usize,
    },
    /// The text held no words, so there was nothing to reveal.
    Completed,
}

/// Result of [`RevealScheduler::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// One word was appended to the target answer.
    Revealed {
        /// Transcript index of the answer being grown.
        index: usize,
        /// The word that was appended.
        word: String,
        /// Zero-based position of the word within the answer.
        position: usize,
        /// True if this was the last word; the scheduler is Idle again.
        done: bool,
    },
    /// The token belongs to a cancelled or finished job and was ignored.
    Stale,
}

#[derive(Debug)]
struct RevealJob {
    words: Vec<String>,
    cursor: usize,
    target: usize,
    interval: Duration,
    token: TickToken,
}

impl RevealJob {
    fn remaining(&self) -> usize {
        self.words.len() - self.cursor
    }
}

/// Reveals one answer at a time into a [`Transcript`].
pub struct RevealScheduler<T: Timer> {
    timer: T,
    ticks: UnboundedSender<TickToken>,
    job: Option<RevealJob>,
    handle: Option<T::Handle>,
    generation: u64,
}

impl<T: Timer> RevealScheduler<T> {
    /// Creates an idle scheduler that posts tick tokens to `ticks`.
    pub fn new(timer: T, ticks: UnboundedSender<TickToken>) -> Self {
        Self {
            timer,
            ticks,
            job: None,
            handle: None,
            generation: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> RevealState {
        if self.job.is_some() {
            RevealState::Running
        } else {
            RevealState::Idle
        }
    }

    /// Returns true while a job is running.
    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }

    /// Transcript index being grown by the running job, if any.
    pub fn target(&self) -> Option<usize> {
        self.job.as_ref().map(|job| job.target)
    }

    /// Words still to be revealed by the running job.
    pub fn remaining(&self) -> usize {
        self.job.as_ref().map_or(0, RevealJob::remaining)
    }

    /// Starts revealing `answer` into the answer at `target`, one word every
    /// `interval`.
    ///
    /// The interval is fixed for the lifetime of the job.  Starting while a
    /// job is running is an error; cancel it first.
    pub fn start(
        &mut self,
        answer: &str,
        target: usize,
        interval: Duration,
    ) -> Result<StartOutcome> {
        if let Some(job) = &self.job {
            return Err(Error::busy(format!(
                "reveal into message {} still running",
                job.target
            )));
        }
        let words = split_words(answer);
        if words.is_empty() {
            debug!(index = target, "nothing to reveal");
            return Ok(StartOutcome::Completed);
        }
        self.generation += 1;
        let count = words.len();
        self.job = Some(RevealJob {
            words,
            cursor: 0,
            target,
            interval,
            token: TickToken {
                generation: self.generation,
            },
        });
        REVEAL_STARTED.click();
        debug!(
            index = target,
            words = count,
            interval_ms = interval.as_millis() as u64,
            "reveal started"
        );
        self.schedule();
        Ok(StartOutcome::Running { words: count })
    }

    /// Reveals the next word into `transcript`.
    ///
    /// Tokens from any job other than the running one are ignored.  If the
    /// target answer has vanished the job is dropped and the error returned.
    pub fn tick(
        &mut self,
        token: TickToken,
        transcript: &mut Transcript,
    ) -> Result<TickOutcome> {
        let Some(job) = self.job.as_mut() else {
            trace!(?token, "tick with no job");
            return Ok(TickOutcome::Stale);
        };
        if job.token != token {
            trace!(?token, current = ?job.token, "stale tick");
            return Ok(TickOutcome::Stale);
        }
        // The handle belongs to the callback that just delivered this token.
        self.handle = None;

        let position = job.cursor;
        let index = job.target;
        let word = job.words[position].clone();
        if let Err(err) = transcript.append_word(index, &word) {
            self.job = None;
            REVEAL_CANCELLED.click();
            return Err(err);
        }
        job.cursor += 1;
        REVEAL_WORDS.click();

        let done = job.remaining() == 0;
        if done {
            self.job = None;
            REVEAL_COMPLETED.click();
            debug!(index, "reveal completed");
        } else {
            self.schedule();
        }
        Ok(TickOutcome::Revealed {
            index,
            word,
            position,
            done,
        })
    }

    /// Cancels the running job, leaving whatever was revealed in place.
    ///
    /// Returns true if a job was cancelled; false (and no effect) when idle.
    pub fn cancel(&mut self) -> bool {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        match self.job.take() {
            Some(job) => {
                REVEAL_CANCELLED.click();
                debug!(
                    index = job.target,
                    revealed = job.cursor,
                    remaining = job.remaining(),
                    "reveal cancelled"
                );
                true
            }
            None => false,
        }
    }

    fn schedule(&mut self) {
        let Some(job) = &self.job else {
            return;
        };
        if let Some(previous) = self.handle.take() {
            previous.cancel();
        }
        let token = job.token;
        let ticks = self.ticks.clone();
        let handle = self.timer.after(
            job.interval,
            Box::new(move || {
                // The receiver is gone only when the owner is shutting down.
                let _ = ticks.send(token);
            }),
        );
        self.handle = Some(handle);
    }
}

impl<T: Timer> Drop for RevealScheduler<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimer;
    use crate::transcript::Role;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    struct Harness {
        timer: ManualTimer,
        scheduler: RevealScheduler<ManualTimer>,
        ticks: UnboundedReceiver<TickToken>,
        transcript: Transcript,
    }

    impl Harness {
        fn new() -> Self {
            let timer = ManualTimer::new();
            let (tx, rx) = unbounded_channel();
            Self {
                scheduler: RevealScheduler::new(timer.clone(), tx),
                timer,
                ticks: rx,
                transcript: Transcript::new(),
            }
        }

        fn answer(&mut self) -> usize {
            self.transcript.append_question("Hello").unwrap();
            self.transcript.append_answer_placeholder()
        }

        /// Fires the pending timer callback and feeds its token back in.
        fn step(&mut self) -> Option<TickOutcome> {
            if !self.timer.fire_next() {
                return None;
            }
            let token = self.ticks.try_recv().unwrap();
            Some(self.scheduler.tick(token, &mut self.transcript).unwrap())
        }

        fn content(&self, index: usize) -> &str {
            &self.transcript.get(index).unwrap().content
        }
    }

    const INTERVAL: Duration = Duration::from_millis(40);

    #[test]
    fn reveals_one_word_per_tick() {
        let mut h = Harness::new();
        let index = h.answer();
        let outcome = h.scheduler.start("Hi there friend", index, INTERVAL).unwrap();
        assert_eq!(outcome, StartOutcome::Running { words: 3 });
        assert_eq!(h.scheduler.state(), RevealState::Running);
        assert_eq!(h.content(index), "");

        assert_eq!(
            h.step(),
            Some(TickOutcome::Revealed {
                index,
                word: "Hi".to_string(),
                position: 0,
                done: false,
            })
        );
        assert_eq!(h.content(index), "Hi");
        h.step();
        assert_eq!(h.content(index), "Hi there");
        assert!(matches!(
            h.step(),
            Some(TickOutcome::Revealed { done: true, .. })
        ));
        assert_eq!(h.content(index), "Hi there friend");
        assert_eq!(h.scheduler.state(), RevealState::Idle);
        assert_eq!(h.timer.pending(), 0);
        assert_eq!(h.timer.delays(), vec![INTERVAL; 3]);
    }

    #[test]
    fn completed_text_is_words_joined_by_single_spaces() {
        let text = "  Lists:\n\n- one\t two  \n- three   ";
        let mut h = Harness::new();
        let index = h.answer();
        h.scheduler.start(text, index, INTERVAL).unwrap();
        while h.step().is_some() {}
        let expected = split_words(text).join(" ");
        assert_eq!(h.content(index), expected);
        assert_eq!(split_words(&expected).join(" "), expected);
    }

    #[test]
    fn empty_answer_completes_immediately() {
        let mut h = Harness::new();
        let index = h.answer();
        let outcome = h.scheduler.start(" \n\t ", index, INTERVAL).unwrap();
        assert_eq!(outcome, StartOutcome::Completed);
        assert_eq!(h.scheduler.state(), RevealState::Idle);
        assert_eq!(h.timer.pending(), 0);
    }

    #[test]
    fn cancel_at_every_position_keeps_prefix() {
        let text = "one two three four five";
        let words = split_words(text);
        for k in 0..=words.len() {
            let mut h = Harness::new();
            let index = h.answer();
            h.scheduler.start(text, index, INTERVAL).unwrap();
            for _ in 0..k {
                h.step();
            }
            h.scheduler.cancel();
            assert_eq!(h.content(index), words[..k].join(" "));
            assert_eq!(h.scheduler.state(), RevealState::Idle);
            assert_eq!(h.timer.pending(), 0);
            assert!(h.step().is_none());
            assert_eq!(h.content(index), words[..k].join(" "));
        }
    }

    #[test]
    fn cancel_when_idle_is_noop() {
        let mut h = Harness::new();
        assert!(!h.scheduler.cancel());
        assert!(!h.scheduler.cancel());
        assert_eq!(h.scheduler.state(), RevealState::Idle);
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut h = Harness::new();
        let index = h.answer();
        h.scheduler.start("first answer", index, INTERVAL).unwrap();
        let err = h.scheduler.start("second", index, INTERVAL).unwrap_err();
        assert!(err.is_busy());
        assert_eq!(h.scheduler.remaining(), 2);
        assert_eq!(h.scheduler.target(), Some(index));
    }

    #[test]
    fn stale_token_never_touches_new_job() {
        let mut h = Harness::new();
        let first = h.answer();
        h.scheduler.start("old words here", first, INTERVAL).unwrap();
        // Deliver the callback but hold on to its token.
        assert!(h.timer.fire_next());
        let old_token = h.ticks.try_recv().unwrap();
        h.scheduler.cancel();

        let second = h.answer();
        h.scheduler.start("new", second, INTERVAL).unwrap();
        let outcome = h.scheduler.tick(old_token, &mut h.transcript).unwrap();
        assert_eq!(outcome, TickOutcome::Stale);
        assert_eq!(h.content(first), "");
        assert_eq!(h.content(second), "");

        h.step();
        assert_eq!(h.content(second), "new");
        assert_eq!(h.content(first), "");
    }

    #[test]
    fn interval_is_captured_per_job() {
        let mut h = Harness::new();
        let first = h.answer();
        h.scheduler.start("a b", first, Duration::from_millis(10)).unwrap();
        while h.step().is_some() {}
        let second = h.answer();
        h.scheduler.start("c d", second, Duration::from_millis(300)).unwrap();
        while h.step().is_some() {}
        assert_eq!(
            h.timer.delays(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(10),
                Duration::from_millis(300),
                Duration::from_millis(300),
            ]
        );
    }

    #[test]
    fn vanished_target_drops_job() {
        let mut h = Harness::new();
        let index = h.answer();
        h.scheduler.start("some words", index, INTERVAL).unwrap();
        h.transcript.clear();
        assert!(h.timer.fire_next());
        let token = h.ticks.try_recv().unwrap();
        let err = h.scheduler.tick(token, &mut h.transcript).unwrap_err();
        assert!(err.is_invalid_index());
        assert_eq!(h.scheduler.state(), RevealState::Idle);
        assert_eq!(h.timer.pending(), 0);
    }

    #[test]
    fn reveal_only_touches_target() {
        let mut h = Harness::new();
        let earlier = h.answer();
        h.transcript.set_answer_content(earlier, "kept as is").unwrap();
        let index = h.answer();
        h.scheduler.start("fresh answer", index, INTERVAL).unwrap();
        while h.step().is_some() {}
        assert_eq!(h.content(earlier), "kept as is");
        assert_eq!(h.transcript.get(index).unwrap().role, Role::Answer);
        assert_eq!(h.content(index), "fresh answer");
    }

    #[test]
    fn fence_detection() {
        assert!(is_fenced_code_block("```rust\nfn main() {}\n```"));
        assert!(is_fenced_code_block("\n  ```\ncode\n```"));
        assert!(!is_fenced_code_block("Here is code:\n```\nx\n```"));
        assert!(!is_fenced_code_block("`` not a fence"));
        assert!(!is_fenced_code_block(""));
    }
}
