use serde::{Deserialize, Serialize};

use crate::types::Content;

/// Body of a `models/{model}:generateContent` request.
///
/// Every request is a single user turn; no earlier messages are sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    /// The conversation contents; always exactly one user turn here.
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Creates a single-turn request for `prompt`.
    pub fn single_turn(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::text(prompt)],
        }
    }
}
