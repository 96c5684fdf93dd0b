//! Results of a dispatch.

use crate::{domain::MemoryState, transfer::InstructionOffset};

/// One way execution continues after a transfer.
///
/// Dispatch returns a list of these; the fixpoint driver merges every
/// [`Successor::Instruction`] back into its worklist and records the terminal ones.
#[derive(Clone, Debug)]
pub enum Successor<S: MemoryState> {
    /// Continue at `offset` with `state`.
    Instruction {
        /// The next instruction.
        offset: InstructionOffset,
        /// The state to continue with.
        state: S,
    },

    /// The exception leaves the analyzed unit uncaught.
    Escape {
        /// What is left of the thrown type after every enclosing catch.
        exception: S::Exception,
        /// The state at the point the exception escapes.
        state: S,
    },

    /// The path ends with a return from the analyzed unit.
    Return {
        /// The state at the point of return.
        state: S,
    },
}

impl<S: MemoryState> Successor<S> {
    /// Returns the next instruction, or `None` for a terminal successor.
    #[must_use]
    pub fn offset(&self) -> Option<InstructionOffset> {
        match self {
            Successor::Instruction { offset, .. } => Some(*offset),
            Successor::Escape { .. } | Successor::Return { .. } => None,
        }
    }

    /// Returns `true` if the path ends here.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Successor::Instruction { .. })
    }

    /// Returns the escaping exception type, if this is an escape.
    #[must_use]
    pub fn escaped(&self) -> Option<&S::Exception> {
        match self {
            Successor::Escape { exception, .. } => Some(exception),
            _ => None,
        }
    }

    /// Returns the state of this successor.
    #[must_use]
    pub fn state(&self) -> &S {
        match self {
            Successor::Instruction { state, .. }
            | Successor::Escape { state, .. }
            | Successor::Return { state } => state,
        }
    }

    /// Consumes the successor, returning its state.
    #[must_use]
    pub fn into_state(self) -> S {
        match self {
            Successor::Instruction { state, .. }
            | Successor::Escape { state, .. }
            | Successor::Return { state } => state,
        }
    }
}
