//! Non-local control transfer through nested exception, finally and inlining traps.
//!
//! This module turns "control is leaving this instruction for reason X" into the
//! concrete list of places execution may continue at, given the stack of guards that
//! are active around the instruction.
//!
//! # Architecture
//!
//! - [`TransferTarget`] - why control is leaving (exception, jump, finally exit, return)
//! - [`Trap`] and [`TrapKind`] - an active guard and its dispatch rule
//! - [`TrapStack`] - the persistent, innermost-first stack of active traps
//! - [`ControlTransferValue`] - a target bundled with its stack; the continuation saved
//!   on the abstract state when a finally block is entered
//! - [`ControlTransferHandler`] and [`Dispatcher`] - the dispatch algorithm
//! - [`BackLinkRegistry`] and [`BackLinkTable`] - finally back-links for static
//!   reachability
//! - [`ControlTransferInstruction`] - the instruction carrying a transfer
//!
//! # Usage
//!
//! ```rust
//! use trapflow::transfer::{
//!     CatchClause, Dispatcher, InstructionOffset, RegionId, TransferTarget, Trap, TrapStack,
//! };
//! use trapflow::domain::{ClassHierarchy, TrackingState, TypeConstraint};
//!
//! let mut classes = ClassHierarchy::new();
//! let throwable = classes.add_root("Throwable")?;
//! let exception = classes.add_class("Exception", throwable)?;
//! let io = classes.add_class("IOException", exception)?;
//! let classes = classes.into_shared();
//!
//! // try { ... } catch (IOException e) { @10 }
//! let catch = Trap::try_catch(
//!     RegionId::new(0),
//!     vec![CatchClause::new(
//!         TypeConstraint::instance_of(&classes, io),
//!         InstructionOffset::new(10),
//!     )],
//! )?;
//! let traps = TrapStack::new().push_inner(catch.into_shared());
//!
//! // Throwing an imprecise `Exception` may be caught, or may escape.
//! let state: TrackingState<TypeConstraint, &str> = TrackingState::new();
//! let thrown = TypeConstraint::instance_of(&classes, exception);
//! let target = TransferTarget::exception(thrown);
//! let successors = Dispatcher::default().dispatch(state, target, traps)?;
//!
//! assert_eq!(successors.len(), 2);
//! assert_eq!(successors[0].offset(), Some(InstructionOffset::new(10)));
//! assert_eq!(successors[1].escaped().unwrap().to_string(), "Exception \\ {IOException}");
//! # Ok::<(), trapflow::Error>(())
//! ```

mod backlinks;
mod config;
mod handler;
mod instruction;
mod offset;
mod stack;
mod successor;
mod target;
mod trap;
mod value;

pub use backlinks::{BackLink, BackLinkRegistry, BackLinkTable};
pub use config::DispatchConfig;
pub use handler::{dispatch, ControlTransferHandler, Dispatcher};
pub use instruction::ControlTransferInstruction;
pub use offset::{FinallyId, InstructionOffset, RegionId};
pub use stack::TrapStack;
pub use successor::Successor;
pub use target::TransferTarget;
pub use trap::{CatchClause, EnterFinally, FinallyKind, Trap, TrapKind};
pub use value::ControlTransferValue;
