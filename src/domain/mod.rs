//! The abstract-domain seams the dispatch engine consumes.
//!
//! Dispatch never inspects variable values or decides exception subtyping itself. It
//! relies on two collaborators, expressed as traits:
//!
//! - [`ExceptionType`] - the type-constraint lattice that decides whether a thrown type
//!   can be caught by a clause, and what is left of it afterwards
//! - [`MemoryState`] - the abstract memory state: variable flushing, the value stack
//!   continuations are saved on, and narrowing by a caught exception type
//!
//! Both come with a reference implementation used by the crate's own tests and
//! benchmarks, and usable by drivers that need nothing more elaborate:
//!
//! - [`TypeConstraint`] over a single-inheritance [`ClassHierarchy`]
//! - [`TrackingState`], a persistent (`imbl`) state that forks in O(1)

mod state;
mod types;

use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

pub use state::{StackValue, TrackingState};
pub use types::{ClassHierarchy, ClassId, TypeConstraint};

use crate::transfer::{ControlTransferValue, TransferTarget};

/// An element of the exception type lattice.
///
/// Implementations may be imprecise, but must never claim disjointness or full
/// coverage that does not hold: dispatch drops a catch branch only when
/// [`meet`](Self::meet) returns `None`, and drops the fall-through branch only when
/// [`exclude`](Self::exclude) returns `None`.
pub trait ExceptionType: Clone + Debug + Display + PartialEq {
    /// Computes the types that are both `self` and `other`.
    ///
    /// # Returns
    ///
    /// `None` if the two are provably disjoint, otherwise the (possibly
    /// over-approximated) intersection.
    #[must_use]
    fn meet(&self, other: &Self) -> Option<Self>;

    /// Computes the types that are `self` but not `other`.
    ///
    /// # Returns
    ///
    /// `None` if every value of `self` is provably an instance of `other`, otherwise
    /// the (possibly over-approximated) remainder.
    #[must_use]
    fn exclude(&self, other: &Self) -> Option<Self>;
}

/// The continuation type stored on a state of type `S`.
pub type StateTransfer<S> =
    ControlTransferValue<<S as MemoryState>::Exception, <S as MemoryState>::Variable>;

/// The transfer target type dispatched on a state of type `S`.
pub type StateTarget<S> =
    TransferTarget<<S as MemoryState>::Exception, <S as MemoryState>::Variable>;

/// The abstract memory state, as far as dispatch is concerned.
///
/// A state is cloned once per branch, so `Clone` should be cheap.
pub trait MemoryState: Clone {
    /// The exception type lattice this state narrows by.
    type Exception: ExceptionType;

    /// The identity of a tracked variable.
    type Variable: Clone + Debug + Eq + Hash;

    /// Forgets everything known about `variable`; it reads as unknown afterwards.
    fn flush_variable(&mut self, variable: &Self::Variable);

    /// Pushes a continuation onto the state's value stack.
    fn push_transfer(&mut self, value: StateTransfer<Self>);

    /// Pops the top of the state's value stack as a continuation.
    ///
    /// # Returns
    ///
    /// `None` if the stack is empty or its top is not a continuation. Dispatch treats
    /// that as a fatal invariant violation.
    fn pop_transfer(&mut self) -> Option<StateTransfer<Self>>;

    /// Restricts the state to executions where the in-flight exception is an
    /// instance of `exception`.
    ///
    /// # Returns
    ///
    /// `false` if the restricted state is infeasible; the branch is then dropped.
    fn narrow_exception(&mut self, exception: &Self::Exception) -> bool;
}
