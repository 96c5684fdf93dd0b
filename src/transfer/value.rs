//! Continuations saved across finally and inlined-block bodies.

use std::fmt;

use crate::transfer::{TransferTarget, TrapStack};

/// An immutable `(target, remaining traps)` pair.
///
/// Created by the dispatch handler when a finally block is entered and pushed onto
/// the abstract state's value stack. It is owned by that state copy until the
/// matching `InsideFinally` trap pops it and resumes dispatch from it, or an
/// `InsideInlinedBlock` trap pops and drops a saved return. Since states are copied, merged and widened by the fixpoint
/// driver, a continuation is a value, never a reference into live dispatch.
///
/// # Examples
///
/// ```rust
/// use trapflow::{ControlTransferValue, InstructionOffset, TransferTarget, TrapStack};
///
/// let target = TransferTarget::jump(InstructionOffset::new(100));
/// let value: ControlTransferValue<String, &str> =
///     ControlTransferValue::new(target, TrapStack::new());
/// assert_eq!(value.to_string(), "-> 100");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ControlTransferValue<T, V> {
    target: TransferTarget<T, V>,
    traps: TrapStack<T>,
}

impl<T, V> ControlTransferValue<T, V> {
    /// Creates a new continuation.
    ///
    /// # Arguments
    ///
    /// * `target` - The transfer to resume
    /// * `traps` - The traps it still has to pass, innermost first
    #[must_use]
    pub fn new(target: TransferTarget<T, V>, traps: TrapStack<T>) -> Self {
        Self { target, traps }
    }

    /// Returns the saved transfer target.
    #[must_use]
    pub const fn target(&self) -> &TransferTarget<T, V> {
        &self.target
    }

    /// Returns the saved remaining trap stack.
    #[must_use]
    pub const fn traps(&self) -> &TrapStack<T> {
        &self.traps
    }

    /// Splits the continuation into its target and trap stack.
    #[must_use]
    pub fn into_parts(self) -> (TransferTarget<T, V>, TrapStack<T>) {
        (self.target, self.traps)
    }
}

impl<T: fmt::Display, V> fmt::Display for ControlTransferValue<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.traps.is_empty() {
            write!(f, "{}", self.target)
        } else {
            write!(f, "{} {}", self.target, self.traps)
        }
    }
}
