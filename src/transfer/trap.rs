//! Traps: active guards that can intercept a transfer target.
//!
//! A [`Trap`] is anchored to a lexical region and owns exactly one dispatch rule,
//! selected by exhaustive matching on [`TrapKind`]:
//!
//! | Trap | On `Exception` | On other targets |
//! |------|----------------|------------------|
//! | `TryCatch` | branch per overlapping clause, fall through with the remainder | pass through |
//! | `TryCatchAll` | jump to its offset | pass through |
//! | `TryFinally` | save continuation, jump to the finally entry | same |
//! | `TwrFinally` | pass through | save continuation, jump to the finally entry |
//! | `InsideFinally` | resume the saved continuation | same |
//! | `InsideInlinedBlock` | drop the saved return continuation, pass through | same |
//!
//! Traps are created once during control-flow construction and are immutable,
//! shared values afterwards (`Arc<Trap<T>>` inside a [`crate::transfer::TrapStack`]).

use std::{fmt, sync::Arc};

use rustc_hash::FxHashSet;
use strum::{Display, EnumIter, IntoStaticStr};

use crate::{
    domain::{ExceptionType, MemoryState},
    transfer::{
        ControlTransferHandler, FinallyId, InstructionOffset, RegionId, Successor, TransferTarget,
    },
    Error, Result,
};

/// The two flavours of finally entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum FinallyKind {
    /// A plain `try { } finally { }`: every transfer enters the finally block.
    TryFinally,
    /// The implicit finally of a try-with-resources statement.
    ///
    /// Exceptions pass through unconsumed; resource closing on the exceptional path
    /// is instrumented separately by the control-flow builder.
    TwrFinally,
}

/// A finally-entry description: which finally, what flavour, and where its body starts.
///
/// This is `Copy` so that [`TransferTarget::ExitFinally`] can carry it without
/// referencing the trap itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EnterFinally {
    id: FinallyId,
    kind: FinallyKind,
    jump_offset: InstructionOffset,
}

impl EnterFinally {
    /// Creates a finally-entry description.
    ///
    /// Prefer [`crate::transfer::BackLinkRegistry::enter_finally`], which allocates
    /// a fresh [`FinallyId`].
    #[must_use]
    pub const fn new(id: FinallyId, kind: FinallyKind, jump_offset: InstructionOffset) -> Self {
        Self {
            id,
            kind,
            jump_offset,
        }
    }

    /// Returns the identity of this finally entry.
    #[must_use]
    pub const fn id(&self) -> FinallyId {
        self.id
    }

    /// Returns the finally flavour.
    #[must_use]
    pub const fn kind(&self) -> FinallyKind {
        self.kind
    }

    /// Returns the first instruction of the finally body.
    #[must_use]
    pub const fn jump_offset(&self) -> InstructionOffset {
        self.jump_offset
    }
}

/// One catch section of a `TryCatch` trap.
///
/// A clause lists one or more caught types (more than one for a multi-catch) and
/// the handler they all jump to.
#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause<T> {
    types: Box<[T]>,
    handler: InstructionOffset,
}

impl<T> CatchClause<T> {
    /// Creates a clause catching a single type.
    #[must_use]
    pub fn new(caught: T, handler: InstructionOffset) -> Self {
        Self {
            types: Box::new([caught]),
            handler,
        }
    }

    /// Creates a multi-catch clause. The list may be empty here; it is rejected by
    /// [`Trap::try_catch`].
    #[must_use]
    pub fn multi(caught: impl IntoIterator<Item = T>, handler: InstructionOffset) -> Self {
        Self {
            types: caught.into_iter().collect(),
            handler,
        }
    }

    /// Returns the caught types in declaration order.
    #[must_use]
    pub fn types(&self) -> &[T] {
        &self.types
    }

    /// Returns the handler offset.
    #[must_use]
    pub const fn handler(&self) -> InstructionOffset {
        self.handler
    }
}

/// The closed set of trap variants.
#[derive(Clone, Debug, PartialEq, IntoStaticStr)]
pub enum TrapKind<T> {
    /// Ordered catch clauses, tried in declaration order.
    TryCatch(Box<[CatchClause<T>]>),
    /// Catches any exception and jumps to the offset.
    TryCatchAll(InstructionOffset),
    /// Entry into a finally block.
    EnterFinally(EnterFinally),
    /// Currently inside a finally body.
    InsideFinally,
    /// Currently inside an inlined call body.
    InsideInlinedBlock,
}

/// An active non-local-exit guard anchored to a lexical region.
///
/// # Examples
///
/// ```rust
/// use trapflow::{CatchClause, InstructionOffset, RegionId, Trap};
///
/// let trap = Trap::try_catch(
///     RegionId::new(0),
///     vec![
///         CatchClause::new("IOException", InstructionOffset::new(10)),
///         CatchClause::new("Exception", InstructionOffset::new(20)),
///     ],
/// )?;
/// assert_eq!(trap.to_string(), "TryCatch -> [10, 20]");
/// # Ok::<(), trapflow::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Trap<T> {
    anchor: RegionId,
    kind: TrapKind<T>,
}

impl<T> Trap<T> {
    /// Creates a `TryCatch` trap.
    ///
    /// # Arguments
    ///
    /// * `anchor` - The try statement this trap guards
    /// * `clauses` - Catch clauses in declaration order
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedTrap`] if `clauses` is empty, if a clause has no
    /// caught types, or if two clauses share a handler offset.
    pub fn try_catch(anchor: RegionId, clauses: Vec<CatchClause<T>>) -> Result<Self> {
        if clauses.is_empty() {
            return Err(Error::MalformedTrap(format!(
                "TryCatch at {} has no catch clauses",
                anchor
            )));
        }

        let mut handlers = FxHashSet::default();
        for clause in &clauses {
            if clause.types.is_empty() {
                return Err(Error::MalformedTrap(format!(
                    "TryCatch at {} has a clause without caught types (handler {})",
                    anchor, clause.handler
                )));
            }
            if !handlers.insert(clause.handler) {
                return Err(Error::MalformedTrap(format!(
                    "TryCatch at {} uses handler offset {} twice",
                    anchor, clause.handler
                )));
            }
        }

        Ok(Self {
            anchor,
            kind: TrapKind::TryCatch(clauses.into_boxed_slice()),
        })
    }

    /// Creates a `TryCatchAll` trap jumping to `target` for every exception.
    #[must_use]
    pub fn try_catch_all(anchor: RegionId, target: InstructionOffset) -> Self {
        Self {
            anchor,
            kind: TrapKind::TryCatchAll(target),
        }
    }

    /// Creates a finally-entry trap from an existing description.
    ///
    /// Back-links for the entry are tracked by id, so the same `enter` must not be
    /// reused for two different finally blocks.
    #[must_use]
    pub fn enter_finally(anchor: RegionId, enter: EnterFinally) -> Self {
        Self {
            anchor,
            kind: TrapKind::EnterFinally(enter),
        }
    }

    /// Creates the trap marking the body of a finally block.
    #[must_use]
    pub fn inside_finally(anchor: RegionId) -> Self {
        Self {
            anchor,
            kind: TrapKind::InsideFinally,
        }
    }

    /// Creates the trap marking the body of an inlined call.
    #[must_use]
    pub fn inside_inlined_block(anchor: RegionId) -> Self {
        Self {
            anchor,
            kind: TrapKind::InsideInlinedBlock,
        }
    }

    /// Wraps this trap for sharing between trap stacks.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Returns the lexical region this trap is anchored to.
    #[must_use]
    pub const fn anchor(&self) -> RegionId {
        self.anchor
    }

    /// Returns the variant of this trap.
    #[must_use]
    pub const fn kind(&self) -> &TrapKind<T> {
        &self.kind
    }

    /// Returns the finally entry if this is a `TryFinally` or `TwrFinally` trap.
    #[must_use]
    pub const fn as_enter_finally(&self) -> Option<&EnterFinally> {
        match &self.kind {
            TrapKind::EnterFinally(enter) => Some(enter),
            _ => None,
        }
    }

    /// Diagnostic name of this trap.
    ///
    /// Finally entries report their flavour (`TryFinally`, `TwrFinally`) rather than
    /// the shared variant name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.kind {
            TrapKind::EnterFinally(enter) => match enter.kind {
                FinallyKind::TryFinally => "TryFinally",
                FinallyKind::TwrFinally => "TwrFinally",
            },
            kind => kind.into(),
        }
    }

    /// Returns the instruction offsets this trap can redirect control to.
    ///
    /// Used for static reachability; no abstract state is involved.
    #[must_use]
    pub fn possible_targets(&self) -> Vec<InstructionOffset> {
        match &self.kind {
            TrapKind::TryCatch(clauses) => clauses.iter().map(CatchClause::handler).collect(),
            TrapKind::TryCatchAll(target) => vec![*target],
            TrapKind::EnterFinally(enter) => vec![enter.jump_offset],
            TrapKind::InsideFinally | TrapKind::InsideInlinedBlock => Vec::new(),
        }
    }
}

impl<T: ExceptionType> Trap<T> {
    /// Applies this trap's rule to the transfer held by `handler`.
    ///
    /// `handler` already has this trap removed from its stack: passing through means
    /// calling [`ControlTransferHandler::do_dispatch`] on it unchanged.
    ///
    /// # Errors
    ///
    /// Propagates fatal invariant violations and resource-limit errors from deeper
    /// dispatch steps.
    pub(crate) fn dispatch<S>(
        &self,
        handler: ControlTransferHandler<'_, S>,
    ) -> Result<Vec<Successor<S>>>
    where
        S: MemoryState<Exception = T>,
    {
        match &self.kind {
            TrapKind::TryCatch(clauses) => match handler.target().exception_type().cloned() {
                Some(thrown) => handler.process_catches(&thrown, clauses),
                None => handler.do_dispatch(),
            },
            TrapKind::TryCatchAll(target) => {
                if handler.target().is_exception() {
                    Ok(vec![handler.redirect(*target)])
                } else {
                    handler.do_dispatch()
                }
            }
            TrapKind::EnterFinally(enter) => {
                if enter.kind == FinallyKind::TwrFinally && handler.target().is_exception() {
                    handler.do_dispatch()
                } else {
                    handler.enter_finally(enter.jump_offset)
                }
            }
            TrapKind::InsideFinally => handler.resume_continuation(self.name()),
            TrapKind::InsideInlinedBlock => {
                let expect_return = |saved: &TransferTarget<T, S::Variable>| {
                    if saved.is_return() {
                        Ok(())
                    } else {
                        Err(invariant_error!(
                            "InsideInlinedBlock popped a {} continuation, expected Return",
                            saved.kind_name()
                        ))
                    }
                };
                handler.discard_continuation(self.name(), expect_return)
            }
        }
    }
}

impl<T> fmt::Display for Trap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TrapKind::TryCatch(_) => {
                let offsets: Vec<String> = self
                    .possible_targets()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                write!(f, "{} -> [{}]", self.name(), offsets.join(", "))
            }
            TrapKind::TryCatchAll(target) => write!(f, "{} -> {}", self.name(), target),
            TrapKind::EnterFinally(enter) => write!(f, "{} -> {}", self.name(), enter.jump_offset),
            TrapKind::InsideFinally | TrapKind::InsideInlinedBlock => write!(f, "{}", self.name()),
        }
    }
}
