//! Prompt Building
//!
//! Insight prompts are a system message stating the task and the exact JSON
//! reply shape, followed by a user message carrying the record as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

const ANALYST_PREAMBLE: &str = "You are a B2B sales operations analyst. \
You assess sales records and return a single JSON object. \
Reply with JSON only, no prose and no markdown.";

/// Prompt builder for structured insight requests
#[derive(Debug, Default)]
pub struct PromptBuilder {
    task: Option<String>,
    reply_shape: Option<String>,
    guidance: Vec<String>,
    payload: Option<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// What the model should produce, e.g. "Predict a lead score"
    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// JSON reply shape the caller will validate against
    pub fn reply_shape(mut self, shape: impl Into<String>) -> Self {
        self.reply_shape = Some(shape.into());
        self
    }

    /// Extra constraint line appended to the system message
    pub fn guidance(mut self, line: impl Into<String>) -> Self {
        self.guidance.push(line.into());
        self
    }

    /// Input data, serialized as pretty JSON
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self, serde_json::Error> {
        self.payload = Some(serde_json::to_string_pretty(payload)?);
        Ok(self)
    }

    /// Build final message list
    pub fn build(self) -> Vec<Message> {
        let mut system = String::from(ANALYST_PREAMBLE);

        if let Some(task) = &self.task {
            system.push_str("\n\n## Task\n");
            system.push_str(task);
        }
        if let Some(shape) = &self.reply_shape {
            system.push_str("\n\n## Reply format (field names exact)\n");
            system.push_str(shape);
        }
        if !self.guidance.is_empty() {
            system.push_str("\n\n## Constraints\n");
            for line in &self.guidance {
                system.push_str("- ");
                system.push_str(line);
                system.push('\n');
            }
        }

        let mut messages = vec![Message::system(system.trim_end())];
        if let Some(payload) = self.payload {
            messages.push(Message::user(format!("## Input\n{}", payload)));
        }
        messages
    }
}

/// Strip a surrounding markdown code fence, if the model added one
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
