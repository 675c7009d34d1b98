//! Response generation.
//!
//! The orchestrator asks a [`ResponseGenerator`] for each role's next
//! contribution. [`OpenAiGenerator`] talks to any OpenAI-compatible chat
//! endpoint; [`TemplateGenerator`] produces canned text offline.

use std::sync::LazyLock;
use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::DebateError;
use crate::role::Role;
use crate::transcript::DebateMessage;

/// Everything a generator needs to produce one turn.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub topic: &'a str,
    pub role: &'a Role,
    pub round: u32,
    /// Turns spoken so far, oldest first.
    pub transcript: &'a [DebateMessage],
    /// Replaces the default "your turn" instruction (used for summaries).
    pub instruction: Option<&'a str>,
}

impl GenerationRequest<'_> {
    /// The final user message sent for this turn.
    pub fn turn_instruction(&self) -> String {
        if let Some(instruction) = self.instruction {
            return instruction.to_string();
        }
        if self.transcript.is_empty() {
            format!(
                "[Round {}] The debate on \"{}\" begins. Please give your opening statement.",
                self.round, self.topic
            )
        } else {
            format!(
                "[Round {}] It is your turn, {}. Please give your next contribution.",
                self.round, self.role.name
            )
        }
    }
}

/// Produces the text for one turn.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, DebateError>;
}

/// Settings for [`OpenAiGenerator`].
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// OpenAI-compatible API base URL.
    pub api_base: String,
    pub api_key: String,
    /// Model used for roles without a `model_id`.
    pub default_model: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl OpenAiSettings {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            default_model: default_model.into(),
            max_tokens: 400,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Chat-completion generator for OpenAI-compatible APIs.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    default_model: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings) -> Result<Self, DebateError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                DebateError::ConfigError(format!("Failed to create HTTP client: {}", e))
            })?;

        let config = OpenAIConfig::new()
            .with_api_key(&settings.api_key)
            .with_api_base(&settings.api_base);

        Ok(Self {
            client: Client::with_config(config).with_http_client(http_client),
            default_model: settings.default_model,
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl ResponseGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, DebateError> {
        let model = request
            .role
            .model_id
            .as_deref()
            .unwrap_or(&self.default_model);

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .max_completion_tokens(self.max_tokens)
            .messages(build_messages(request))
            .build()?;

        debug!(role = %request.role.id, model, round = request.round, "requesting completion");
        let response = self.client.chat().create(chat_request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let sanitized = sanitize_response(&content);
        if sanitized.is_empty() {
            return Err(DebateError::EmptyResponse(request.role.name.clone()));
        }
        Ok(sanitized)
    }
}

/// Build the chat history for the speaking role.
///
/// The role's own turns are replayed as assistant messages and everyone
/// else's as user messages tagged with the speaker's name.
pub fn build_messages(request: &GenerationRequest<'_>) -> Vec<ChatCompletionRequestMessage> {
    let mut messages = Vec::with_capacity(request.transcript.len() + 2);

    messages.push(ChatCompletionRequestMessage::System(
        ChatCompletionRequestSystemMessage {
            content: request.role.render_prompt(request.topic).into(),
            name: None,
        },
    ));

    for turn in request.transcript {
        if turn.role_id == request.role.id {
            messages.push(ChatCompletionRequestMessage::Assistant(
                ChatCompletionRequestAssistantMessage {
                    content: Some(turn.content.clone().into()),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                },
            ));
        } else {
            messages.push(ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: format!(
                        "[{} ({}) said]: {}",
                        turn.role_name,
                        turn.stance.display_name(),
                        turn.content
                    )
                    .into(),
                    name: None,
                },
            ));
        }
    }

    messages.push(ChatCompletionRequestMessage::User(
        ChatCompletionRequestUserMessage {
            content: request.turn_instruction().into(),
            name: None,
        },
    ));

    messages
}

/// Offline generator returning templated text after a fixed delay.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    delay: Duration,
}

impl TemplateGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl ResponseGenerator for TemplateGenerator {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, DebateError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let role = request.role;
        let text = if request.instruction.is_some() {
            format!(
                "{} looked back on {} turns about \"{}\" and found the arguments on both sides worth weighing.",
                role.name,
                request.transcript.len(),
                request.topic
            )
        } else {
            format!(
                "As {} ({}), in round {} I hold my position on \"{}\" and respond to what has been said so far.",
                role.name,
                role.stance.display_name(),
                request.round,
                request.topic
            )
        };
        Ok(text)
    }
}

const REASONING_TAGS: &[&str] = &[
    "thinking",
    "think",
    "reflection",
    "reflect",
    "internal",
    "reasoning",
    "thought",
    "scratch",
    "scratchpad",
    "plan",
    "analysis",
];

static REASONING_RE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REASONING_TAGS
        .iter()
        .filter_map(|tag| Regex::new(&format!(r"(?is)<{tag}[^>]*>.*?</{tag}>")).ok())
        .collect()
});

static ORPHAN_TAG_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"</?[\w]+[^>]*>").ok());

static WHITESPACE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Strip reasoning blocks, stray tags and emphasis markers from model output.
pub fn sanitize_response(response: &str) -> String {
    let mut result = response.to_string();

    for re in REASONING_RE.iter() {
        result = re.replace_all(&result, "").into_owned();
    }

    if let Some(re) = ORPHAN_TAG_RE.as_ref() {
        result = re.replace_all(&result, "").into_owned();
    }

    result = result.replace('*', "");

    if let Some(re) = WHITESPACE_RE.as_ref() {
        result = re.replace_all(&result, " ").into_owned();
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleStance;

    #[test]
    fn test_sanitize_response_thinking_tags() {
        let input = "<thinking>Let me think about this...</thinking>The answer is 42.";
        assert_eq!(sanitize_response(input), "The answer is 42.");
    }

    #[test]
    fn test_sanitize_response_multiline_think() {
        let input = "<think>\nstep one\nstep two\n</think>\n\n**Final** answer here.";
        assert_eq!(sanitize_response(input), "Final answer here.");
    }

    #[test]
    fn test_sanitize_response_keeps_cjk() {
        let input = "我认为  这个观点\n\n值得讨论。";
        assert_eq!(sanitize_response(input), "我认为 这个观点 值得讨论。");
    }

    #[test]
    fn test_build_messages_splits_own_and_others_turns() {
        let pro = Role::new("pro", "Alice", RoleStance::Pro)
            .with_system_prompt("You are {name}. Topic: {topic}");
        let con = Role::new("con", "Bob", RoleStance::Con);
        let transcript = vec![
            DebateMessage::new(&pro, "Opening.", 1),
            DebateMessage::new(&con, "Rebuttal.", 1),
        ];
        let request = GenerationRequest {
            topic: "cats",
            role: &pro,
            round: 2,
            transcript: &transcript,
            instruction: None,
        };

        let messages = build_messages(&request);
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_turn_instruction_opening_and_override() {
        let pro = Role::new("pro", "Alice", RoleStance::Pro);
        let mut request = GenerationRequest {
            topic: "cats",
            role: &pro,
            round: 1,
            transcript: &[],
            instruction: None,
        };
        assert!(request.turn_instruction().contains("opening statement"));

        request.instruction = Some("Summarize.");
        assert_eq!(request.turn_instruction(), "Summarize.");
    }

    #[tokio::test]
    async fn test_template_generator_mentions_role_and_round() {
        let con = Role::new("con", "Bob", RoleStance::Con);
        let request = GenerationRequest {
            topic: "cats",
            role: &con,
            round: 3,
            transcript: &[],
            instruction: None,
        };
        let text = TemplateGenerator::new(Duration::ZERO)
            .generate(&request)
            .await
            .unwrap();
        assert!(text.contains("Bob (CON)"));
        assert!(text.contains("round 3"));
    }
}
