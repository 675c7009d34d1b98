//! Append-only debate transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DebateError;
use crate::role::{Role, RoleStance};

/// One turn in the debate transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DebateMessage {
    pub id: Uuid,
    /// Id of the speaking role.
    pub role_id: String,
    pub role_name: String,
    pub stance: RoleStance,
    pub content: String,
    /// Round the turn belongs to, starting at 1.
    pub round: u32,
    pub timestamp: DateTime<Utc>,
}

impl DebateMessage {
    pub fn new(role: &Role, content: impl Into<String>, round: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            role_id: role.id.clone(),
            role_name: role.name.clone(),
            stance: role.stance,
            content: content.into(),
            round,
            timestamp: Utc::now(),
        }
    }
}

/// Ordered list of turns. Records can be appended but never changed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<DebateMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: DebateMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[DebateMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Serialize a transcript as pretty-printed JSON.
pub fn to_json(messages: &[DebateMessage]) -> Result<String, DebateError> {
    Ok(serde_json::to_string_pretty(messages)?)
}

/// Render a transcript, and the summary if any, as Markdown.
pub fn to_markdown(topic: &str, messages: &[DebateMessage], summary: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Debate: {}\n\n", topic));

    let mut current_round = 0;
    for message in messages {
        if message.round != current_round {
            current_round = message.round;
            out.push_str(&format!("## Round {}\n\n", current_round));
        }
        out.push_str(&format!(
            "**{} ({})**: {}\n\n",
            message.role_name,
            message.stance.display_name(),
            message.content
        ));
    }

    if let Some(summary) = summary {
        out.push_str(&format!("## Summary\n\n{}\n", summary));
    }

    out
}
