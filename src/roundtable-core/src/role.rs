//! Role definitions.
//!
//! A role is a persona taking part in the debate: a stance, a system
//! prompt and optionally the model that voices it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;

/// Minimum number of rotating roles a debate needs.
pub const MIN_SPEAKING_ROLES: usize = 2;

/// Stance a role takes in the debate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoleStance {
    /// Arguing in favor of the topic.
    Pro,
    /// Arguing against the topic.
    Con,
    /// No fixed side.
    Neutral,
    /// Steers the debate; its turns are checked for closing keywords.
    Moderator,
    /// Speaks once after the debate to summarize it.
    Summary,
}

impl RoleStance {
    pub fn display_name(&self) -> &str {
        match self {
            RoleStance::Pro => "PRO",
            RoleStance::Con => "CON",
            RoleStance::Neutral => "NEUTRAL",
            RoleStance::Moderator => "MODERATOR",
            RoleStance::Summary => "SUMMARY",
        }
    }

    /// Whether roles with this stance take turns in the rotation.
    pub fn rotates(&self) -> bool {
        !matches!(self, RoleStance::Summary)
    }
}

/// Display color hint for a role.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleColor {
    Red,
    Blue,
    Green,
    Yellow,
    Magenta,
    Cyan,
    #[default]
    White,
}

/// A persona in the debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    /// Stable identifier, unique within a debate.
    pub id: String,
    /// Display name.
    pub name: String,
    pub stance: RoleStance,
    /// Prompt template; `{topic}`, `{name}` and `{stance}` are substituted.
    pub system_prompt: String,
    /// Model override (e.g. "gpt-4o", "llama3:8b"). Falls back to the
    /// generator's default model when unset.
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub color: RoleColor,
}

impl Role {
    /// Create a role with the given id, name and stance and an empty prompt.
    pub fn new(id: impl Into<String>, name: impl Into<String>, stance: RoleStance) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stance,
            system_prompt: String::new(),
            model_id: None,
            color: RoleColor::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_color(mut self, color: RoleColor) -> Self {
        self.color = color;
        self
    }

    /// Render the system prompt for a topic.
    pub fn render_prompt(&self, topic: &str) -> String {
        self.system_prompt
            .replace("{topic}", topic)
            .replace("{name}", &self.name)
            .replace("{stance}", self.stance.display_name())
    }
}

/// The validated, read-only set of roles for one debate.
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    speakers: Vec<Role>,
    summarizer: Option<Role>,
}

impl RoleRegistry {
    /// Split `roles` into the rotation and the optional summarizer.
    ///
    /// Fails if ids repeat or fewer than [`MIN_SPEAKING_ROLES`] roles rotate.
    /// When several summary roles are configured the first one is used.
    pub fn new(roles: Vec<Role>) -> Result<Self, DebateError> {
        let mut seen = HashSet::new();
        for role in &roles {
            if !seen.insert(role.id.as_str()) {
                return Err(DebateError::DuplicateRoleId(role.id.clone()));
            }
        }

        let (speakers, summarizers): (Vec<Role>, Vec<Role>) =
            roles.into_iter().partition(|r| r.stance.rotates());

        if speakers.len() < MIN_SPEAKING_ROLES {
            return Err(DebateError::InvalidRoleCount {
                min: MIN_SPEAKING_ROLES,
                actual: speakers.len(),
            });
        }

        Ok(Self {
            speakers,
            summarizer: summarizers.into_iter().next(),
        })
    }

    /// Roles in speaking order.
    pub fn speakers(&self) -> &[Role] {
        &self.speakers
    }

    pub fn summarizer(&self) -> Option<&Role> {
        self.summarizer.as_ref()
    }

    pub fn get(&self, id: &str) -> Option<&Role> {
        self.speakers
            .iter()
            .chain(self.summarizer.iter())
            .find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }
}
