//! Batch input types.

use crate::ModelProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rendered model input: the analysis instructions and the conversation
/// they apply to. Produced upstream; never inspected by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Payload {
    /// Instruction (system) text
    #[serde(default)]
    pub instructions: String,
    /// Conversation text or document
    pub conversation: String,
}

impl Payload {
    /// Create a payload from instructions and conversation text.
    pub fn new(instructions: impl Into<String>, conversation: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            conversation: conversation.into(),
        }
    }

    /// Approximate size in bytes, used for logging.
    pub fn len(&self) -> usize {
        self.instructions.len() + self.conversation.len()
    }

    /// True when both parts are empty.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.conversation.is_empty()
    }
}

/// One `(identifier, payload, model)` triple handed to the dispatcher.
///
/// Deserializes from a flat JSON object, which is the line format of batch
/// files:
///
/// ```
/// use colloquy_core::Submission;
///
/// let line = r#"{"id":"chat-1","model":"gpt-4o","instructions":"Summarise","conversation":"hi"}"#;
/// let submission: Submission = serde_json::from_str(line).unwrap();
/// assert_eq!(submission.id, "chat-1");
/// assert_eq!(submission.payload.instructions, "Summarise");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Caller-chosen identifier, unique within a batch
    pub id: String,
    /// Model name, looked up in the profile table
    pub model: String,
    /// Rendered input
    #[serde(flatten)]
    pub payload: Payload,
}

impl Submission {
    /// Create a submission.
    pub fn new(id: impl Into<String>, payload: Payload, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            payload,
        }
    }
}

/// A submission bound to its resolved model profile. Immutable once built.
#[derive(Debug, Clone)]
pub struct RequestItem {
    id: String,
    model: String,
    payload: Payload,
    profile: Arc<ModelProfile>,
}

impl RequestItem {
    /// Bind a submission to a profile.
    pub fn new(submission: Submission, profile: Arc<ModelProfile>) -> Self {
        Self {
            id: submission.id,
            model: submission.model,
            payload: submission.payload,
            profile,
        }
    }

    /// Request identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Rendered input.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Shared model configuration.
    pub fn profile(&self) -> &Arc<ModelProfile> {
        &self.profile
    }
}
