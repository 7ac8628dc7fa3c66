//! Session state for one goal: the accepted plan, per-step progress, chunk
//! locks, and the replan lifecycle.
//!
//! The session is synchronous and single-owner. Async work (calling the
//! generation client) happens outside; the session only records the
//! lifecycle: `begin_replan` marks a fetch in flight, `complete_replan`
//! parks the candidate next to its diff for review, and `accept_replan` or
//! `cancel_replan` settles it.

use std::collections::HashSet;
use std::sync::Arc;

use momentum_protocol::{Chunk, Plan, SubStep, parse_acceptance_criteria};

use crate::diff::{PlanDiff, diff_plans};
use crate::error::SessionError;

/// Estimate attached to sub-steps created from stuck suggestions.
const SUGGESTION_ESTIMATE: &str = "Just do it";

/// Position of one sub-step: chunk index and sub-step index within it.
///
/// Progress is keyed by position, not by content, so replacing the plan
/// invalidates every key. The session clears them at that point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepKey {
    pub chunk: usize,
    pub step: usize,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No plan yet.
    Empty,
    /// A plan is loaded and the user is working through it.
    Active,
    /// A replacement plan is being fetched.
    Replanning,
    /// A candidate plan arrived and its diff is on screen.
    ReviewingDiff,
}

struct ReplanCandidate {
    plan: Arc<Plan>,
    diff: PlanDiff,
}

/// One goal's worth of planning state.
pub struct PlanSession {
    goal_text: String,
    plan: Option<Arc<Plan>>,
    checked_steps: HashSet<StepKey>,
    locked_chunks: HashSet<usize>,
    replanning: bool,
    candidate: Option<ReplanCandidate>,
}

impl PlanSession {
    pub fn new(goal_text: impl Into<String>) -> Self {
        Self {
            goal_text: goal_text.into(),
            plan: None,
            checked_steps: HashSet::new(),
            locked_chunks: HashSet::new(),
            replanning: false,
            candidate: None,
        }
    }

    pub fn goal_text(&self) -> &str {
        &self.goal_text
    }

    pub fn state(&self) -> SessionState {
        if self.plan.is_none() {
            SessionState::Empty
        } else if self.replanning {
            SessionState::Replanning
        } else if self.candidate.is_some() {
            SessionState::ReviewingDiff
        } else {
            SessionState::Active
        }
    }

    /// The current accepted plan, if one is loaded.
    pub fn plan(&self) -> Option<&Arc<Plan>> {
        self.plan.as_ref()
    }

    /// Installs a freshly generated plan, discarding any prior plan along
    /// with all progress, locks, and replan state.
    pub fn load_plan(&mut self, plan: Plan) {
        self.plan = Some(Arc::new(plan));
        self.checked_steps.clear();
        self.locked_chunks.clear();
        self.replanning = false;
        self.candidate = None;
    }

    /// Flips the checked flag for one sub-step position.
    ///
    /// Keys are positional and not validated against the plan shape; a key
    /// that points past the end is harmless and disappears with the rest of
    /// the progress when the plan is replaced.
    pub fn toggle_step(&mut self, chunk_idx: usize, step_idx: usize) -> Result<(), SessionError> {
        if self.plan.is_none() {
            return Err(SessionError::NoPlan);
        }
        let key = StepKey {
            chunk: chunk_idx,
            step: step_idx,
        };
        if !self.checked_steps.remove(&key) {
            self.checked_steps.insert(key);
        }
        Ok(())
    }

    pub fn is_step_checked(&self, chunk_idx: usize, step_idx: usize) -> bool {
        self.checked_steps.contains(&StepKey {
            chunk: chunk_idx,
            step: step_idx,
        })
    }

    /// Flips the lock flag for one chunk position.
    pub fn toggle_lock(&mut self, chunk_idx: usize) -> Result<(), SessionError> {
        if self.plan.is_none() {
            return Err(SessionError::NoPlan);
        }
        if !self.locked_chunks.remove(&chunk_idx) {
            self.locked_chunks.insert(chunk_idx);
        }
        Ok(())
    }

    pub fn is_chunk_locked(&self, chunk_idx: usize) -> bool {
        self.locked_chunks.contains(&chunk_idx)
    }

    /// The locked chunks themselves, in plan order. This is what rides along
    /// in a replan request as must-preserve content.
    pub fn locked_chunk_values(&self) -> Vec<Chunk> {
        self.plan
            .as_ref()
            .map(|plan| {
                plan.chunks
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| self.locked_chunks.contains(idx))
                    .map(|(_, chunk)| chunk.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Marks a replan fetch as in flight. Only one can be; a second request
    /// while one is pending or under review is rejected.
    pub fn begin_replan(&mut self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Empty => Err(SessionError::NoPlan),
            SessionState::Replanning | SessionState::ReviewingDiff => {
                Err(SessionError::ReplanInFlight)
            }
            SessionState::Active => {
                self.replanning = true;
                Ok(())
            }
        }
    }

    /// Records the fetched candidate plan and computes its diff against the
    /// current plan. The session moves to diff review; the current plan
    /// stays in place until the user accepts.
    pub fn complete_replan(&mut self, candidate: Plan) -> Result<(), SessionError> {
        if self.state() != SessionState::Replanning {
            return Err(SessionError::NotReplanning);
        }
        let Some(current) = self.plan.as_ref() else {
            return Err(SessionError::NoPlan);
        };
        let diff = diff_plans(current.as_ref(), &candidate);
        self.candidate = Some(ReplanCandidate {
            plan: Arc::new(candidate),
            diff,
        });
        self.replanning = false;
        Ok(())
    }

    /// Abandons an in-flight replan after a fetch failure or cancellation.
    /// Nothing else is lost.
    pub fn fail_replan(&mut self) -> Result<(), SessionError> {
        if !self.replanning {
            return Err(SessionError::NotReplanning);
        }
        self.replanning = false;
        Ok(())
    }

    /// The diff currently under review, if any.
    pub fn review_diff(&self) -> Option<&PlanDiff> {
        self.candidate.as_ref().map(|candidate| &candidate.diff)
    }

    /// The candidate plan currently under review, if any.
    pub fn candidate_plan(&self) -> Option<&Arc<Plan>> {
        self.candidate.as_ref().map(|candidate| &candidate.plan)
    }

    /// Replaces the current plan with the reviewed candidate.
    ///
    /// All checked steps are reset, even for chunks the diff reported
    /// unchanged: progress keys are positional and the new plan's positions
    /// need not line up. Locks are also cleared rather than guessed onto new
    /// positions.
    pub fn accept_replan(&mut self) -> Result<(), SessionError> {
        let Some(candidate) = self.candidate.take() else {
            return Err(SessionError::NoCandidate);
        };
        self.plan = Some(candidate.plan);
        self.checked_steps.clear();
        self.locked_chunks.clear();
        Ok(())
    }

    /// Discards the reviewed candidate and keeps the current plan, progress
    /// and locks exactly as they were.
    pub fn cancel_replan(&mut self) -> Result<(), SessionError> {
        if self.candidate.take().is_none() {
            return Err(SessionError::NoCandidate);
        }
        Ok(())
    }

    /// Appends a suggestion as a new sub-step on the given chunk, with the
    /// fixed "Just do it" estimate. The plan is replaced, not edited: the
    /// prior value stays intact for anyone still holding it.
    pub fn add_stuck_suggestion(
        &mut self,
        chunk_idx: usize,
        suggestion: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.candidate.is_some() {
            return Err(SessionError::ReplanInFlight);
        }
        let Some(current) = self.plan.as_ref() else {
            return Err(SessionError::NoPlan);
        };
        if chunk_idx >= current.chunks.len() {
            return Err(SessionError::ChunkOutOfRange(chunk_idx));
        }
        let mut next = Plan::clone(current);
        next.chunks[chunk_idx].sub_steps.push(SubStep {
            description: suggestion.into(),
            estimate: SUGGESTION_ESTIMATE.to_string(),
        });
        self.plan = Some(Arc::new(next));
        Ok(())
    }

    /// Replaces the acceptance criteria from user-edited text, one criterion
    /// per non-blank line. Replaces the plan value like any other edit.
    pub fn update_acceptance_criteria(&mut self, text: &str) -> Result<(), SessionError> {
        if self.candidate.is_some() {
            return Err(SessionError::ReplanInFlight);
        }
        let Some(current) = self.plan.as_ref() else {
            return Err(SessionError::NoPlan);
        };
        let mut next = Plan::clone(current);
        next.acceptance_criteria = parse_acceptance_criteria(text);
        self.plan = Some(Arc::new(next));
        Ok(())
    }

    /// How many chunks still have at least one unchecked sub-step. Chunks
    /// with no sub-steps count as complete.
    pub fn remaining_chunks(&self) -> usize {
        let Some(plan) = self.plan.as_ref() else {
            return 0;
        };
        plan.chunks
            .iter()
            .enumerate()
            .filter(|(chunk_idx, chunk)| !self.chunk_complete(*chunk_idx, chunk))
            .count()
    }

    fn chunk_complete(&self, chunk_idx: usize, chunk: &Chunk) -> bool {
        (0..chunk.sub_steps.len()).all(|step| {
            self.checked_steps.contains(&StepKey {
                chunk: chunk_idx,
                step,
            })
        })
    }
}
