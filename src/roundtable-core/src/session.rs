//! Debate session state and turn scheduling.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::role::{Role, RoleRegistry};
use crate::termination::EndReason;
use crate::transcript::{DebateMessage, Transcript};

/// Mutable state of one running debate.
///
/// `current_speaker_index` always stays within `[0, roles.len())` and
/// `current_round` only moves when the index wraps back to 0.
#[derive(Debug)]
pub struct DebateSession {
    is_active: bool,
    current_round: u32,
    current_speaker_index: usize,
    roles: RoleRegistry,
    transcript: Transcript,
    start_time: DateTime<Utc>,
    started: Instant,
    end_reason: Option<EndReason>,
}

impl DebateSession {
    pub fn start(roles: RoleRegistry) -> Self {
        Self {
            is_active: true,
            current_round: 1,
            current_speaker_index: 0,
            roles,
            transcript: Transcript::new(),
            start_time: Utc::now(),
            started: Instant::now(),
            end_reason: None,
        }
    }

    /// Restart the wall clock; called when the debate actually begins.
    pub(crate) fn restart_clock(&mut self) {
        self.start_time = Utc::now();
        self.started = Instant::now();
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn current_speaker_index(&self) -> usize {
        self.current_speaker_index
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    /// The role due to speak and the round it speaks in.
    pub fn current_turn(&self) -> (&Role, u32) {
        (
            &self.roles.speakers()[self.current_speaker_index],
            self.current_round,
        )
    }

    /// Move to the next speaker. Returns `true` when a round completed.
    pub fn advance(&mut self) -> bool {
        self.current_speaker_index = (self.current_speaker_index + 1) % self.roles.len();
        if self.current_speaker_index == 0 {
            self.current_round += 1;
            true
        } else {
            false
        }
    }

    /// Record `content` for the current speaker and advance the scheduler.
    pub fn complete_turn(&mut self, content: impl Into<String>) -> DebateMessage {
        let (role, round) = self.current_turn();
        let message = DebateMessage::new(role, content, round);
        self.transcript.push(message.clone());
        self.advance();
        message
    }

    /// Mark the session finished. The first reason recorded is kept.
    pub fn finish(&mut self, reason: EndReason) {
        self.is_active = false;
        if self.end_reason.is_none() {
            self.end_reason = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::RoleStance;

    fn session(n: usize) -> DebateSession {
        let roles = (0..n)
            .map(|i| Role::new(format!("r{i}"), format!("Role {i}"), RoleStance::Neutral))
            .collect();
        DebateSession::start(RoleRegistry::new(roles).unwrap())
    }

    #[test]
    fn test_full_round_after_n_turns() {
        for n in 2..=6 {
            let mut s = session(n);
            for turn in 0..n {
                assert_eq!(s.current_round(), 1);
                assert_eq!(s.current_speaker_index(), turn);
                let wrapped = s.advance();
                assert_eq!(wrapped, turn == n - 1);
            }
            assert_eq!(s.current_round(), 2);
            assert_eq!(s.current_speaker_index(), 0);
        }
    }

    #[test]
    fn test_complete_turn_appends_in_speaker_order() {
        let mut s = session(3);
        for k in 0..7 {
            s.complete_turn(format!("turn {k}"));
        }

        let messages = s.transcript().messages();
        assert_eq!(messages.len(), 7);
        for (k, m) in messages.iter().enumerate() {
            assert_eq!(m.role_id, format!("r{}", k % 3));
            assert_eq!(m.round, (k / 3) as u32 + 1);
        }
    }

    #[test]
    fn test_finish_keeps_first_reason() {
        let mut s = session(2);
        s.finish(EndReason::ManualStop);
        s.finish(EndReason::MaxRoundsReached { max_rounds: 3 });
        assert!(!s.is_active());
        assert_eq!(s.end_reason(), Some(&EndReason::ManualStop));
    }
}
