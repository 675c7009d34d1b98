//! Debate orchestration logic.
//!
//! Drives one [`DebateSession`] through its turns: ask the generator for
//! the current speaker's contribution, record it, advance the scheduler
//! and check whether the debate is over.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DebateConfig, default_roles};
use crate::error::DebateError;
use crate::generator::{GenerationRequest, ResponseGenerator};
use crate::role::{Role, RoleRegistry, RoleStance};
use crate::session::DebateSession;
use crate::termination::{EndReason, TerminationContext, TerminationEvaluator};
use crate::transcript::DebateMessage;

/// Callback for debate events.
pub type DebateCallback = Box<dyn Fn(DebateEvent) + Send + Sync>;

/// Events emitted during a debate.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    /// The debate is starting.
    DebateStart { topic: String, speakers: Vec<String> },
    /// A new round is starting.
    RoundStart { round: u32, max_rounds: u32 },
    /// A role is about to speak.
    SpeakerStart { role: Role, round: u32 },
    /// A role has finished speaking.
    SpeakerMessage(DebateMessage),
    /// Generating a turn failed; the same role will be asked again.
    TurnFailed { role: String, error: String },
    /// The closing summary is ready.
    Summary { author: String, content: String },
    /// The debate has concluded.
    DebateEnd { reason: EndReason },
}

/// Result of a finished debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    pub topic: String,
    pub transcript: Vec<DebateMessage>,
    pub summary: Option<String>,
    pub end_reason: EndReason,
    /// Number of rounds every speaker completed.
    pub rounds_completed: u32,
}

impl DebateOutcome {
    /// Pretty-printed JSON with transcript, summary and end reason.
    pub fn to_json(&self) -> Result<String, DebateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Requests a running debate to stop. Cheap to clone and `Send`.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Orchestrates a debate between configured roles.
pub struct DebateOrchestrator {
    config: DebateConfig,
    generator: Box<dyn ResponseGenerator>,
    session: DebateSession,
    evaluator: TerminationEvaluator,
    stop: StopHandle,
    /// Event callback.
    callback: Option<DebateCallback>,
}

impl DebateOrchestrator {
    /// Validate the configuration and open the session.
    ///
    /// Fails when fewer than two roles rotate. The session clock, and with
    /// it the timeout, starts when [`run`](Self::run) is called.
    pub fn new(
        config: DebateConfig,
        generator: Box<dyn ResponseGenerator>,
    ) -> Result<Self, DebateError> {
        config.validate()?;
        let registry = RoleRegistry::new(config.roles.clone())?;

        let evaluator = TerminationEvaluator::new(
            config.max_rounds,
            config.auto_end_conditions.timeout_minutes,
            config.auto_end_conditions.moderator_keywords.clone(),
        );

        Ok(Self {
            session: DebateSession::start(registry),
            config,
            generator,
            evaluator,
            stop: StopHandle::default(),
            callback: None,
        })
    }

    /// Set a callback for debate events.
    pub fn with_callback(mut self, callback: DebateCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Share an existing stop handle instead of the orchestrator's own.
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    /// Handle for stopping the debate from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn session(&self) -> &DebateSession {
        &self.session
    }

    /// Run the debate until a termination condition fires.
    pub async fn run(&mut self) -> Result<DebateOutcome, DebateError> {
        if !self.session.is_active() {
            return Err(DebateError::ConfigError(
                "debate session has already finished".to_string(),
            ));
        }

        self.session.restart_clock();

        let speakers: Vec<String> = self
            .session
            .roles()
            .speakers()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        info!(
            topic = %self.config.topic,
            speakers = speakers.len(),
            max_rounds = self.config.max_rounds,
            "debate started"
        );
        self.emit_event(DebateEvent::DebateStart {
            topic: self.config.topic.clone(),
            speakers,
        });

        let reason = self.run_turns().await;
        self.session.finish(reason.clone());
        info!(%reason, turns = self.session.transcript().len(), "debate ended");

        let summary = if self.config.summary_enabled && reason != EndReason::ManualStop {
            self.summarize(&reason).await
        } else {
            None
        };

        self.emit_event(DebateEvent::DebateEnd {
            reason: reason.clone(),
        });

        Ok(DebateOutcome {
            topic: self.config.topic.clone(),
            transcript: self.session.transcript().messages().to_vec(),
            summary,
            end_reason: reason,
            rounds_completed: self.session.current_round().saturating_sub(1),
        })
    }

    async fn run_turns(&mut self) -> EndReason {
        let mut announced_round = 0;
        let mut consecutive_failures = 0;

        loop {
            if let Some(reason) = self.check_termination(None) {
                return reason;
            }

            let (role, round) = self.session.current_turn();
            let role = role.clone();

            if round != announced_round {
                announced_round = round;
                self.emit_event(DebateEvent::RoundStart {
                    round,
                    max_rounds: self.config.max_rounds,
                });
            }
            self.emit_event(DebateEvent::SpeakerStart {
                role: role.clone(),
                round,
            });

            let result = {
                let request = GenerationRequest {
                    topic: &self.config.topic,
                    role: &role,
                    round,
                    transcript: self.session.transcript().messages(),
                    instruction: None,
                };
                self.generator.generate(&request).await
            };

            // The call is not cancelled by a stop; its result is dropped.
            if self.stop.is_stopped() {
                debug!(role = %role.id, "discarding turn generated after stop");
                return EndReason::ManualStop;
            }

            match result {
                Ok(content) => {
                    consecutive_failures = 0;
                    let message = self.session.complete_turn(content);
                    debug!(role = %message.role_id, round = message.round, "turn recorded");
                    self.emit_event(DebateEvent::SpeakerMessage(message.clone()));

                    if let Some(reason) = self.check_termination(Some(&message)) {
                        return reason;
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(role = %role.id, round, error = %e, "turn generation failed");
                    self.emit_event(DebateEvent::TurnFailed {
                        role: role.name.clone(),
                        error: e.to_string(),
                    });

                    let limit = self.config.max_consecutive_failures;
                    if limit > 0 && consecutive_failures >= limit {
                        return EndReason::GenerationFailed {
                            failures: consecutive_failures,
                        };
                    }
                }
            }

            let delay = self.config.turn_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn check_termination(&self, last_turn: Option<&DebateMessage>) -> Option<EndReason> {
        self.evaluator.evaluate(&TerminationContext {
            stop_requested: self.stop.is_stopped(),
            current_round: self.session.current_round(),
            elapsed: self.session.elapsed(),
            last_turn,
        })
    }

    /// Ask the summary role, or a stand-in, to sum up the transcript.
    async fn summarize(&self, reason: &EndReason) -> Option<String> {
        if self.session.transcript().is_empty() {
            return None;
        }

        let author = self
            .session
            .roles()
            .summarizer()
            .cloned()
            .unwrap_or_else(|| self.fallback_summarizer());

        let instruction = format!(
            "The debate has ended: {}. Please summarize the debate on \"{}\".",
            reason, self.config.topic
        );
        let request = GenerationRequest {
            topic: &self.config.topic,
            role: &author,
            round: self.session.current_round(),
            transcript: self.session.transcript().messages(),
            instruction: Some(instruction.as_str()),
        };

        match self.generator.generate(&request).await {
            Ok(content) => {
                self.emit_event(DebateEvent::Summary {
                    author: author.name.clone(),
                    content: content.clone(),
                });
                Some(content)
            }
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                None
            }
        }
    }

    /// Built-in summary persona, voiced by the first speaker's model.
    fn fallback_summarizer(&self) -> Role {
        let mut role = default_roles()
            .into_iter()
            .find(|r| r.stance == RoleStance::Summary)
            .unwrap_or_else(|| Role::new("summary", "Summary", RoleStance::Summary));
        role.model_id = self
            .session
            .roles()
            .speakers()
            .first()
            .and_then(|r| r.model_id.clone());
        role
    }

    /// Emit an event if a callback is registered.
    fn emit_event(&self, event: DebateEvent) {
        if let Some(ref callback) = self.callback {
            callback(event);
        }
    }

    /// Get the transcript so far.
    pub fn transcript(&self) -> &[DebateMessage] {
        self.session.transcript().messages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TemplateGenerator;
    use std::time::Duration;

    fn config(n: usize) -> DebateConfig {
        let mut config = DebateConfig::with_default_roles("t");
        config.roles = (0..n)
            .map(|i| Role::new(format!("r{i}"), format!("R{i}"), RoleStance::Neutral))
            .collect();
        config.turn_delay_ms = 0;
        config
    }

    #[test]
    fn test_new_rejects_fewer_than_two_roles() {
        for n in 0..2 {
            let result = DebateOrchestrator::new(
                config(n),
                Box::new(TemplateGenerator::new(Duration::ZERO)),
            );
            assert!(matches!(
                result,
                Err(DebateError::InvalidRoleCount { min: 2, .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_stop_before_run_ends_immediately() {
        let mut orchestrator =
            DebateOrchestrator::new(config(2), Box::new(TemplateGenerator::new(Duration::ZERO)))
                .unwrap();
        orchestrator.stop();

        let outcome = orchestrator.run().await.unwrap();
        assert_eq!(outcome.end_reason, EndReason::ManualStop);
        assert!(outcome.transcript.is_empty());
        assert!(outcome.summary.is_none());
        assert!(!orchestrator.session().is_active());
    }

    #[tokio::test]
    async fn test_run_twice_fails() {
        let mut cfg = config(2);
        cfg.max_rounds = 1;
        let mut orchestrator =
            DebateOrchestrator::new(cfg, Box::new(TemplateGenerator::new(Duration::ZERO)))
                .unwrap();
        orchestrator.run().await.unwrap();
        assert_eq!(orchestrator.transcript().len(), 2);
        assert!(orchestrator.run().await.is_err());
        assert_eq!(orchestrator.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_clock_starts_at_run() {
        let mut cfg = config(2);
        cfg.max_rounds = 1;
        cfg.summary_enabled = false;
        let mut orchestrator =
            DebateOrchestrator::new(cfg, Box::new(TemplateGenerator::new(Duration::ZERO)))
                .unwrap();
        let constructed_at = orchestrator.session().start_time();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let before_run = chrono::Utc::now();
        orchestrator.run().await.unwrap();

        let started = orchestrator.session().start_time();
        assert!(started >= before_run);
        assert!(started > constructed_at);
    }
}
