// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # trapflow
//!
//! Non-local control-transfer dispatch for dataflow analyzers of languages with
//! structured exception handling.
//!
//! A dataflow analyzer walks instructions with an abstract state. Most instructions
//! have obvious successors, but `throw`, `return`, `break` and the end of a `finally`
//! body do not: where control goes depends on the try/catch, try/finally and inlined
//! call regions that enclose the instruction. `trapflow` models those regions as a
//! stack of *traps* and resolves a transfer against it into the list of successor
//! states.
//!
//! ## Features
//!
//! - **Ordered catch resolution** - multi-catch clauses, type narrowing per handler, and
//!   an uncaught remainder that keeps propagating outwards
//! - **Finally continuations** - the pending transfer is saved on the abstract state on
//!   entry to a finally block and resumed when the block completes
//! - **Try-with-resources** - the implicit finally lets exceptions pass through
//! - **Inlined calls** - transfers leaving an inlined body drop its saved return and keep
//!   propagating through the caller's traps
//! - **Static reachability** - back-links from finally entries answer "where can this
//!   finally exit lead" without any abstract state
//! - **Sound under imprecision** - when the type lattice cannot decide, every possible
//!   branch is emitted
//!
//! ## Quick Start
//!
//! ```rust
//! use trapflow::prelude::*;
//!
//! let mut classes = ClassHierarchy::new();
//! let throwable = classes.add_root("Throwable")?;
//! let classes = classes.into_shared();
//!
//! let mut registry = BackLinkRegistry::<TypeConstraint, &str>::new();
//! let finally = registry.try_finally(RegionId::new(0), InstructionOffset::new(50));
//! let traps = TrapStack::new()
//!     .push_inner(Trap::try_catch_all(RegionId::new(1), InstructionOffset::new(20)).into_shared())
//!     .push_inner(finally);
//!
//! // An exception thrown inside the try block runs the finally body first.
//! let state: TrackingState<TypeConstraint, &str> = TrackingState::new();
//! let thrown = TypeConstraint::instance_of(&classes, throwable);
//! let successors = dispatch(state, TransferTarget::exception(thrown), traps)?;
//!
//! assert_eq!(successors.len(), 1);
//! assert_eq!(successors[0].offset(), Some(InstructionOffset::new(50)));
//! # Ok::<(), trapflow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`transfer`] - targets, traps, trap stacks, the dispatch algorithm and back-links
//! - [`domain`] - the exception lattice and memory state seams dispatch consumes,
//!   with reference implementations
//! - [`prelude`] - convenient re-exports of commonly used types and traits
//! - [`Error`] and [`Result`] - error handling
//!
//! ## Error Handling
//!
//! Imprecision is never an error: it becomes extra successors. Errors are reserved for
//! trap stacks and states that a well-formed control-flow builder cannot produce, and
//! for the resource limits in [`DispatchConfig`]. Every error means the current
//! analysis unit must be abandoned.
//!
//! ## Thread Safety
//!
//! Traps, trap stacks and frozen back-link tables are immutable and `Send + Sync`.
//! Dispatch owns the state it is given, so independent units can be analyzed in
//! parallel.

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// ```rust
/// use trapflow::prelude::*;
///
/// let config = DispatchConfig::strict();
/// let dispatcher = Dispatcher::new(config);
/// assert_eq!(dispatcher.config().max_depth, 64);
/// ```
pub mod prelude;

/// Transfer targets, traps and the dispatch algorithm.
pub mod transfer;

/// The abstract-domain seams dispatch consumes.
pub mod domain;

/// `trapflow` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `trapflow` Error type
///
/// The single error type returned by every fallible operation in this crate.
pub use error::Error;

pub use transfer::{
    dispatch, BackLink, BackLinkRegistry, BackLinkTable, CatchClause, ControlTransferHandler,
    ControlTransferInstruction, ControlTransferValue, DispatchConfig, Dispatcher, EnterFinally,
    FinallyId, FinallyKind, InstructionOffset, RegionId, Successor, TransferTarget, Trap,
    TrapKind, TrapStack,
};
