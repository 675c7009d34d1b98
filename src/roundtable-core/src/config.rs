//! Debate configuration, loadable from TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;
use crate::role::{Role, RoleColor, RoleStance};
use crate::termination::DEFAULT_MODERATOR_KEYWORDS;

/// Configuration for running a debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// The topic being debated.
    #[serde(default)]
    pub topic: String,
    pub roles: Vec<Role>,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default)]
    pub auto_end_conditions: AutoEndConditions,
    #[serde(default = "default_true")]
    pub summary_enabled: bool,
    /// Pause between turns.
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u64,
    /// Consecutive generation failures tolerated before giving up; 0 retries forever.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

/// Conditions that end a debate early.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoEndConditions {
    /// Wall-clock limit; `None` or 0 disables it.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: Option<u64>,
    /// Words that end the debate when a moderator uses them.
    #[serde(default = "default_moderator_keywords")]
    pub moderator_keywords: Vec<String>,
}

impl Default for AutoEndConditions {
    fn default() -> Self {
        Self {
            timeout_minutes: default_timeout_minutes(),
            moderator_keywords: default_moderator_keywords(),
        }
    }
}

fn default_max_rounds() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_turn_delay_ms() -> u64 {
    2000
}

fn default_max_consecutive_failures() -> u32 {
    3
}

fn default_timeout_minutes() -> Option<u64> {
    Some(10)
}

fn default_moderator_keywords() -> Vec<String> {
    DEFAULT_MODERATOR_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}

impl DebateConfig {
    /// Built-in configuration: two debaters, a moderator and a summarizer.
    pub fn with_default_roles(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            roles: default_roles(),
            max_rounds: default_max_rounds(),
            auto_end_conditions: AutoEndConditions::default(),
            summary_enabled: true,
            turn_delay_ms: default_turn_delay_ms(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DebateError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| DebateError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_toml_str(content: &str) -> Result<Self, DebateError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| DebateError::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that do not depend on the roles; those are checked when the
    /// session starts.
    pub fn validate(&self) -> Result<(), DebateError> {
        if self.max_rounds == 0 {
            return Err(DebateError::ConfigError(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn turn_delay(&self) -> Duration {
        Duration::from_millis(self.turn_delay_ms)
    }

    /// Set the same model on every role.
    pub fn override_model(&mut self, model: &str) {
        for role in &mut self.roles {
            role.model_id = Some(model.to_string());
        }
    }
}

/// Default personas.
pub fn default_roles() -> Vec<Role> {
    vec![
        Role::new("pro", "Advocate", RoleStance::Pro)
            .with_system_prompt(DEFAULT_PRO_PROMPT)
            .with_color(RoleColor::Green),
        Role::new("con", "Skeptic", RoleStance::Con)
            .with_system_prompt(DEFAULT_CON_PROMPT)
            .with_color(RoleColor::Red),
        Role::new("moderator", "Moderator", RoleStance::Moderator)
            .with_system_prompt(DEFAULT_MODERATOR_PROMPT)
            .with_color(RoleColor::Yellow),
        Role::new("summary", "Chronicler", RoleStance::Summary)
            .with_system_prompt(DEFAULT_SUMMARY_PROMPT)
            .with_color(RoleColor::Cyan),
    ]
}

const DEFAULT_PRO_PROMPT: &str = r#"You are {name}, a debater arguing IN FAVOR of the topic.

DEBATE TOPIC: {topic}

- Present clear arguments supported by evidence and reasoning
- Respond directly to the points other speakers have raised
- Stay respectful and concise; a few short paragraphs at most
- Output only your spoken words, with no stage directions or markdown
"#;

const DEFAULT_CON_PROMPT: &str = r#"You are {name}, a debater arguing AGAINST the topic.

DEBATE TOPIC: {topic}

- Present clear arguments supported by evidence and reasoning
- Respond directly to the points other speakers have raised
- Stay respectful and concise; a few short paragraphs at most
- Output only your spoken words, with no stage directions or markdown
"#;

const DEFAULT_MODERATOR_PROMPT: &str = r#"You are {name}, the moderator of a debate.

DEBATE TOPIC: {topic}

- Keep the debate focused and point out arguments that went unanswered
- Ask one pointed question to move the discussion forward
- When the sides have reached consensus or nothing new is being said,
  say so explicitly using the word "共识" or "结束"
- Output only your spoken words, with no stage directions or markdown
"#;

const DEFAULT_SUMMARY_PROMPT: &str = r#"You are {name}, an impartial observer of a debate.

DEBATE TOPIC: {topic}

Summarize the debate: the strongest argument from each side, points of
agreement, and open questions. Do not declare a winner. Output plain prose.
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_gets_defaults() {
        let config = DebateConfig::from_toml_str(
            r#"
            topic = "Should cities ban cars?"

            [[roles]]
            id = "pro"
            name = "Ada"
            stance = "pro"
            system_prompt = "Argue for {topic}"

            [[roles]]
            id = "con"
            name = "Ben"
            stance = "con"
            system_prompt = "Argue against {topic}"
            model_id = "llama3:8b"
            color = "red"
            "#,
        )
        .unwrap();

        assert_eq!(config.roles.len(), 2);
        assert_eq!(config.max_rounds, 3);
        assert!(config.summary_enabled);
        assert_eq!(config.auto_end_conditions.timeout_minutes, Some(10));
        assert_eq!(config.auto_end_conditions.moderator_keywords.len(), 3);
        assert_eq!(config.roles[1].model_id.as_deref(), Some("llama3:8b"));
        assert_eq!(config.roles[1].color, RoleColor::Red);
    }

    #[test]
    fn test_auto_end_overrides() {
        let config = DebateConfig::from_toml_str(
            r#"
            roles = []
            max_rounds = 5
            summary_enabled = false

            [auto_end_conditions]
            timeout_minutes = 0
            moderator_keywords = ["consensus"]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_rounds, 5);
        assert!(!config.summary_enabled);
        assert_eq!(config.auto_end_conditions.timeout_minutes, Some(0));
        assert_eq!(config.auto_end_conditions.moderator_keywords, vec!["consensus"]);
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let err = DebateConfig::from_toml_str("roles = []\nmax_rounds = 0").unwrap_err();
        assert!(matches!(err, DebateError::ConfigError(_)));
    }

    #[test]
    fn test_unknown_stance_rejected() {
        let err = DebateConfig::from_toml_str(
            r#"
            [[roles]]
            id = "x"
            name = "X"
            stance = "heckler"
            system_prompt = ""
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, DebateError::ConfigError(_)));
    }

    #[test]
    fn test_default_roles_and_model_override() {
        let mut config = DebateConfig::with_default_roles("topic");
        config.override_model("gpt-4o-mini");
        assert_eq!(config.roles.len(), 4);
        assert!(
            config
                .roles
                .iter()
                .all(|r| r.model_id.as_deref() == Some("gpt-4o-mini"))
        );
        assert_eq!(config.turn_delay(), Duration::from_secs(2));
    }
}
