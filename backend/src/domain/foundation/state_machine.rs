//! State machine trait for lifecycle enums.
//!
//! Gives every lifecycle enum the same validated `transition_to` so that an
//! illegal move (say, a finished job going back to polling) surfaces as a
//! `ValidationError` instead of silently corrupting state.

use super::ValidationError;

/// Trait for copyable enums that represent state machines.
///
/// Implementors list their legal moves; validated transitions and
/// terminal-state detection come for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from self to target is legal.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all legal targets from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition, or fails if it is not legal.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// A state with no outgoing transitions.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
