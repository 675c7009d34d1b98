//! Roundtable Core Library
//!
//! Multi-role debate orchestration: role registry, turn scheduling,
//! transcript, termination rules and pluggable response generation.

pub mod config;
pub mod error;
pub mod generator;
pub mod orchestrator;
pub mod role;
pub mod session;
pub mod termination;
pub mod transcript;

pub use config::{AutoEndConditions, DebateConfig};
pub use error::DebateError;
pub use generator::{
    GenerationRequest, OpenAiGenerator, OpenAiSettings, ResponseGenerator, TemplateGenerator,
};
pub use orchestrator::{DebateEvent, DebateOrchestrator, DebateOutcome, StopHandle};
pub use role::{Role, RoleColor, RoleRegistry, RoleStance};
pub use session::DebateSession;
pub use termination::{EndReason, TerminationEvaluator};
pub use transcript::{DebateMessage, Transcript};
