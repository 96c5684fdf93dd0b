//! Persistent trap stacks.
//!
//! Every instruction that can transfer control carries the stack of traps active
//! at that point, innermost first. Continuations capture the remaining stack at
//! the moment a finally is entered, so stacks are persistent: `imbl::Vector`
//! shares structure between a stack and every stack derived from it, and cloning
//! is O(1).

use std::{fmt, sync::Arc};

use imbl::Vector;

use crate::transfer::Trap;

/// An ordered stack of active traps, innermost first.
///
/// # Examples
///
/// ```rust
/// use trapflow::{InstructionOffset, RegionId, Trap, TrapStack};
///
/// let outer = Trap::<&str>::try_catch_all(RegionId::new(0), InstructionOffset::new(99));
/// let inner = Trap::<&str>::try_catch_all(RegionId::new(1), InstructionOffset::new(10));
///
/// let outer_stack = TrapStack::new().push_inner(outer.into_shared());
/// let inner_stack = outer_stack.push_inner(inner.into_shared());
///
/// assert_eq!(inner_stack.len(), 2);
/// assert!(outer_stack.is_suffix_of(&inner_stack));
/// assert!(!inner_stack.is_suffix_of(&outer_stack));
/// ```
pub struct TrapStack<T> {
    traps: Vector<Arc<Trap<T>>>,
}

impl<T> TrapStack<T> {
    /// Creates an empty trap stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            traps: Vector::new(),
        }
    }

    /// Builds a stack from traps listed innermost first.
    #[must_use]
    pub fn from_innermost(traps: impl IntoIterator<Item = Arc<Trap<T>>>) -> Self {
        Self {
            traps: traps.into_iter().collect(),
        }
    }

    /// Returns a new stack with `trap` as the innermost trap.
    ///
    /// `self` is left untouched and shares its structure with the result.
    #[must_use]
    pub fn push_inner(&self, trap: Arc<Trap<T>>) -> Self {
        let mut traps = self.traps.clone();
        traps.push_front(trap);
        Self { traps }
    }

    /// Removes and returns the innermost trap.
    pub fn pop_innermost(&mut self) -> Option<Arc<Trap<T>>> {
        self.traps.pop_front()
    }

    /// Returns the innermost trap without removing it.
    #[must_use]
    pub fn innermost(&self) -> Option<&Arc<Trap<T>>> {
        self.traps.front()
    }

    /// Returns the number of traps on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.traps.len()
    }

    /// Returns `true` if no trap is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }

    /// Iterates over the traps, innermost first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Trap<T>>> {
        self.traps.iter()
    }

    /// Checks whether `self` is a suffix of `other`, comparing traps by identity.
    ///
    /// Along any control-flow path the stack of an instruction in an outer region
    /// must be a suffix of the stack of an instruction nested inside it; this is
    /// the check for that property.
    #[must_use]
    pub fn is_suffix_of(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        let skip = other.len() - self.len();
        other
            .iter()
            .skip(skip)
            .zip(self.iter())
            .all(|(theirs, ours)| Arc::ptr_eq(theirs, ours))
    }
}

impl<T> Clone for TrapStack<T> {
    fn clone(&self) -> Self {
        Self {
            traps: self.traps.clone(),
        }
    }
}

impl<T> Default for TrapStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for TrapStack<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(ours, theirs)| Arc::ptr_eq(ours, theirs) || ours == theirs)
    }
}

impl<T: fmt::Debug> fmt::Debug for TrapStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> fmt::Display for TrapStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let traps: Vec<String> = self.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", traps.join(", "))
    }
}

impl<T> FromIterator<Arc<Trap<T>>> for TrapStack<T> {
    fn from_iter<I: IntoIterator<Item = Arc<Trap<T>>>>(iter: I) -> Self {
        Self::from_innermost(iter)
    }
}
