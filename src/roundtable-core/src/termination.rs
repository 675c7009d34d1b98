//! Debate termination rules.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::role::RoleStance;
use crate::transcript::DebateMessage;

/// Keywords that close the debate when a moderator says them.
pub const DEFAULT_MODERATOR_KEYWORDS: &[&str] = &["结束", "总结", "共识"];

/// Why a debate ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EndReason {
    ManualStop,
    MaxRoundsReached { max_rounds: u32 },
    Timeout { minutes: u64 },
    ModeratorSignal { keyword: String },
    GenerationFailed { failures: u32 },
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::ManualStop => write!(f, "stopped by user"),
            EndReason::MaxRoundsReached { max_rounds } => {
                write!(f, "reached the limit of {} rounds", max_rounds)
            }
            EndReason::Timeout { minutes } => write!(f, "timed out after {} minutes", minutes),
            EndReason::ModeratorSignal { keyword } => {
                write!(f, "moderator signalled the end (\"{}\")", keyword)
            }
            EndReason::GenerationFailed { failures } => {
                write!(f, "generation failed {} times in a row", failures)
            }
        }
    }
}

/// Snapshot the evaluator looks at.
#[derive(Debug, Clone, Copy)]
pub struct TerminationContext<'a> {
    pub stop_requested: bool,
    pub current_round: u32,
    pub elapsed: Duration,
    /// The turn just completed, if any.
    pub last_turn: Option<&'a DebateMessage>,
}

/// Decides whether the debate is over.
#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    max_rounds: u32,
    timeout_minutes: Option<u64>,
    keywords: Vec<String>,
}

impl TerminationEvaluator {
    /// A zero timeout disables the wall-clock check.
    pub fn new(max_rounds: u32, timeout_minutes: Option<u64>, keywords: Vec<String>) -> Self {
        Self {
            max_rounds,
            timeout_minutes: timeout_minutes.filter(|m| *m > 0),
            keywords: keywords
                .into_iter()
                .filter(|k| !k.trim().is_empty())
                .collect(),
        }
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// First matching condition wins: stop flag, round limit, timeout,
    /// then a closing keyword in a moderator's turn.
    pub fn evaluate(&self, ctx: &TerminationContext<'_>) -> Option<EndReason> {
        if ctx.stop_requested {
            return Some(EndReason::ManualStop);
        }

        if ctx.current_round > self.max_rounds {
            return Some(EndReason::MaxRoundsReached {
                max_rounds: self.max_rounds,
            });
        }

        if let Some(minutes) = self.timeout_minutes {
            if ctx.elapsed >= Duration::from_secs(minutes.saturating_mul(60)) {
                return Some(EndReason::Timeout { minutes });
            }
        }

        ctx.last_turn
            .filter(|m| m.stance == RoleStance::Moderator)
            .and_then(|m| self.moderator_keyword(&m.content))
            .map(|keyword| EndReason::ModeratorSignal { keyword })
    }

    fn moderator_keyword(&self, content: &str) -> Option<String> {
        let haystack = content.to_lowercase();
        self.keywords
            .iter()
            .find(|k| haystack.contains(&k.to_lowercase()))
            .cloned()
    }
}
