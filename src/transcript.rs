//! The session transcript.
//!
//! A [`Transcript`] is the ordered list of questions and answers exchanged in
//! the current session and the single source of truth for presentation.  It
//! only ever grows at the end, with two in-place exceptions: the newest answer
//! grows word by word while it is being revealed, and a question can be
//! flagged as edited once it has been resubmitted.

use crate::error::{Error, Result};

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A prompt typed by the user.
    Question,
    /// A completion produced by the remote model (or the fallback text).
    Answer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Question => write!(f, "question"),
            Role::Answer => write!(f, "answer"),
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// The author of this entry.
    pub role: Role,
    /// The text of this entry.
    pub content: String,
    /// Set once a question has been edited and resubmitted.
    pub edited: bool,
}

impl Message {
    /// Creates a question entry.
    pub fn question(content: impl Into<String>) -> Self {
        Self {
            role: Role::Question,
            content: content.into(),
            edited: false,
        }
    }

    /// Creates an empty answer entry.
    pub fn answer_placeholder() -> Self {
        Self {
            role: Role::Answer,
            content: String::new(),
            edited: false,
        }
    }

    /// Returns true if this entry is a question.
    pub fn is_question(&self) -> bool {
        self.role == Role::Question
    }

    /// Returns true if this entry is an answer.
    pub fn is_answer(&self) -> bool {
        self.role == Role::Answer
    }
}

/// Ordered transcript of the current session.
///
/// Insertion order is chronological order is display order.  Nothing is
/// persisted; a new process starts with an empty transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a question.
    ///
    /// Whitespace-only text is rejected with [`Error::EmptySubmission`] and
    /// leaves the transcript untouched.  Returns the index of the new entry.
    pub fn append_question(&mut self, text: &str) -> Result<usize> {
        if text.trim().is_empty() {
            return Err(Error::empty_submission());
        }
        self.messages.push(Message::question(text));
        Ok(self.messages.len() - 1)
    }

    /// Appends an empty answer and returns its index.
    pub fn append_answer_placeholder(&mut self) -> usize {
        self.messages.push(Message::answer_placeholder());
        self.messages.len() - 1
    }

    /// Replaces the content of the answer at `index` wholesale.
    pub fn set_answer_content(&mut self, index: usize, text: &str) -> Result<()> {
        let message = self.answer_mut(index)?;
        message.content.clear();
        message.content.push_str(text);
        Ok(())
    }

    /// Appends one word to the answer at `index`, separated by a single space
    /// unless the answer is still empty.
    pub fn append_word(&mut self, index: usize, word: &str) -> Result<()> {
        let message = self.answer_mut(index)?;
        if !message.content.is_empty() {
            message.content.push(' ');
        }
        message.content.push_str(word);
        Ok(())
    }

    /// Flags the question at `index` as edited.  Its content is unchanged.
    pub fn mark_edited(&mut self, index: usize) -> Result<()> {
        let len = self.messages.len();
        match self.messages.get_mut(index) {
            Some(message) if message.is_question() => {
                message.edited = true;
                Ok(())
            }
            Some(message) => Err(Error::invalid_index(
                index,
                format!("expected a question, found an {}", message.role),
            )),
            None => Err(Error::invalid_index(
                index,
                format!("transcript has {len} messages"),
            )),
        }
    }

    /// Empties the transcript.
    ///
    /// Any reveal still writing into this transcript must be cancelled by the
    /// owner; see `ChatSession::clear`.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// Returns all entries in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent entry, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn answer_mut(&mut self, index: usize) -> Result<&mut Message> {
        let len = self.messages.len();
        match self.messages.get_mut(index) {
            Some(message) if message.is_answer() => Ok(message),
            Some(message) => Err(Error::invalid_index(
                index,
                format!("expected an answer, found a {}", message.role),
            )),
            None => Err(Error::invalid_index(
                index,
                format!("transcript has {len} messages"),
            )),
        }
    }
}
