//! # trapflow Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the trapflow library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all trapflow operations
pub use crate::Error;

/// The result type used throughout trapflow
pub use crate::Result;

/// Resource limits applied to a single dispatch
pub use crate::DispatchConfig;

// ================================================================================================
// Dispatch
// ================================================================================================

/// Dispatch entry points
pub use crate::transfer::{dispatch, Dispatcher, Successor};

/// Transfer targets and continuations
pub use crate::transfer::{ControlTransferInstruction, ControlTransferValue, TransferTarget};

/// Traps and trap stacks
pub use crate::transfer::{CatchClause, EnterFinally, FinallyKind, Trap, TrapKind, TrapStack};

/// Identifiers
pub use crate::transfer::{FinallyId, InstructionOffset, RegionId};

/// Finally back-links for static reachability
pub use crate::transfer::{BackLinkRegistry, BackLinkTable};

// ================================================================================================
// Abstract Domain
// ================================================================================================

/// The seams dispatch consumes
pub use crate::domain::{ExceptionType, MemoryState};

/// Reference implementations of the domain seams
pub use crate::domain::{ClassHierarchy, TrackingState, TypeConstraint};
