//! Transfer targets: why control is leaving the current instruction.
//!
//! A [`TransferTarget`] is pure data. It is created once by the control-flow
//! builder, attached to a control-transfer instruction and then threaded through
//! the trap stack by [`crate::transfer::ControlTransferHandler`]. The only
//! behavior it carries is the set of variables a [`TransferTarget::Jump`] must
//! invalidate before execution resumes at its offset.

use std::{fmt, hash::Hash, sync::Arc};

use rustc_hash::FxHashSet;

use crate::transfer::{EnterFinally, InstructionOffset};

/// The reason control is leaving the current instruction.
///
/// # Type Parameters
///
/// * `T` - The exception type lattice element carried by [`TransferTarget::Exception`]
/// * `V` - The variable identity named in a jump's flush set
///
/// # Examples
///
/// ```rust
/// use trapflow::{InstructionOffset, TransferTarget};
///
/// let jump: TransferTarget<String, &str> =
///     TransferTarget::jump_flushing(InstructionOffset::new(100), ["x", "y", "x"]);
/// assert_eq!(jump.vars_to_flush(), &["x", "y"]);
/// assert_eq!(jump.to_string(), "-> 100");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum TransferTarget<T, V> {
    /// An exception of the given (possibly imprecise) type is being thrown.
    Exception(T),

    /// An unconditional jump out of one or more guarded regions.
    Jump {
        /// The instruction execution continues at.
        offset: InstructionOffset,
        /// Variables that go out of scope across the jump and must read as unknown
        /// afterwards. Duplicates are removed at construction.
        flush: Arc<[V]>,
    },

    /// The finally block entered through the given trap has just completed.
    ///
    /// The live resume point is taken from the continuation saved on the state; the
    /// carried entry is only used to answer reachability queries.
    ExitFinally(EnterFinally),

    /// The analyzed method returns.
    Return,
}

impl<T, V> TransferTarget<T, V> {
    /// Creates an exception target.
    #[must_use]
    pub fn exception(thrown: T) -> Self {
        TransferTarget::Exception(thrown)
    }

    /// Creates a jump target without variables to flush.
    #[must_use]
    pub fn jump(offset: InstructionOffset) -> Self {
        TransferTarget::Jump {
            offset,
            flush: Arc::from(Vec::new()),
        }
    }

    /// Creates a target signalling that the finally block of `enter` completed.
    #[must_use]
    pub fn exit_finally(enter: EnterFinally) -> Self {
        TransferTarget::ExitFinally(enter)
    }

    /// Returns `true` for [`TransferTarget::Exception`].
    #[must_use]
    pub const fn is_exception(&self) -> bool {
        matches!(self, TransferTarget::Exception(_))
    }

    /// Returns `true` for [`TransferTarget::Return`].
    #[must_use]
    pub const fn is_return(&self) -> bool {
        matches!(self, TransferTarget::Return)
    }

    /// Returns the thrown type if this is an exception target.
    #[must_use]
    pub fn exception_type(&self) -> Option<&T> {
        match self {
            TransferTarget::Exception(thrown) => Some(thrown),
            _ => None,
        }
    }

    /// Returns the variables this target invalidates, empty for anything but a jump.
    #[must_use]
    pub fn vars_to_flush(&self) -> &[V] {
        match self {
            TransferTarget::Jump { flush, .. } => flush,
            _ => &[],
        }
    }

    /// Short variant name, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            TransferTarget::Exception(_) => "Exception",
            TransferTarget::Jump { .. } => "Jump",
            TransferTarget::ExitFinally(_) => "ExitFinally",
            TransferTarget::Return => "Return",
        }
    }
}

impl<T, V: Eq + Hash + Clone> TransferTarget<T, V> {
    /// Creates a jump target that invalidates `vars` before resuming at `offset`.
    ///
    /// The first occurrence of each variable is kept, later duplicates are dropped.
    ///
    /// # Arguments
    ///
    /// * `offset` - The instruction execution continues at
    /// * `vars` - Variables going out of scope across the jump
    #[must_use]
    pub fn jump_flushing(offset: InstructionOffset, vars: impl IntoIterator<Item = V>) -> Self {
        let mut seen = FxHashSet::default();
        let flush: Vec<V> = vars
            .into_iter()
            .filter(|var| seen.insert(var.clone()))
            .collect();
        TransferTarget::Jump {
            offset,
            flush: Arc::from(flush),
        }
    }
}

impl<T: fmt::Display, V> fmt::Display for TransferTarget<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferTarget::Exception(thrown) => write!(f, "Exception({})", thrown),
            TransferTarget::Jump { offset, .. } => write!(f, "-> {}", offset),
            TransferTarget::ExitFinally(_) => write!(f, "ExitFinally"),
            TransferTarget::Return => write!(f, "Return"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{FinallyId, FinallyKind};

    type Target = TransferTarget<&'static str, &'static str>;

    #[test]
    fn test_jump_flush_dedup_keeps_order() {
        let target = Target::jump_flushing(InstructionOffset::new(9), ["b", "a", "b", "c", "a"]);
        assert_eq!(target.vars_to_flush(), &["b", "a", "c"]);
    }

    #[test]
    fn test_non_jump_has_nothing_to_flush() {
        assert!(Target::Return.vars_to_flush().is_empty());
        assert!(Target::exception("IOException").vars_to_flush().is_empty());
        assert!(Target::jump(InstructionOffset::new(1)).vars_to_flush().is_empty());
    }

    #[test]
    fn test_predicates() {
        let thrown = Target::exception("Error");
        assert!(thrown.is_exception());
        assert_eq!(thrown.exception_type(), Some(&"Error"));
        assert!(Target::Return.is_return());
        assert!(Target::Return.exception_type().is_none());
    }

    #[test]
    fn test_display() {
        let enter = EnterFinally::new(
            FinallyId::new(0),
            FinallyKind::TryFinally,
            InstructionOffset::new(50),
        );
        assert_eq!(Target::exception("IOException").to_string(), "Exception(IOException)");
        assert_eq!(Target::jump(InstructionOffset::new(12)).to_string(), "-> 12");
        assert_eq!(Target::exit_finally(enter).to_string(), "ExitFinally");
        assert_eq!(Target::Return.to_string(), "Return");
        assert_eq!(Target::exit_finally(enter).kind_name(), "ExitFinally");
    }
}
