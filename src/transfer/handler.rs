//! The dispatch algorithm.
//!
//! [`ControlTransferHandler`] holds one transfer in flight: the abstract state, the
//! target being propagated and the traps it still has to pass. Dispatch pops the
//! innermost trap and lets it decide; a trap either consumes the transfer (redirects
//! to a concrete instruction) or hands the handler back through
//! [`ControlTransferHandler::do_dispatch`] to the next outer trap.
//!
//! # Algorithm
//!
//! 1. If no trap is left, the target is terminal: an exception escapes the unit, a
//!    return ends the path, a jump flushes its variables and resumes at its offset.
//!    A finally exit with no enclosing trap is a fatal invariant violation.
//! 2. Otherwise the innermost trap is removed and applies its rule (see
//!    [`crate::transfer::Trap`]). Pass-through traps and continuation resumes recurse;
//!    the recursion is bounded by [`DispatchConfig::max_depth`].
//!
//! Whenever type information cannot exclude a branch, both the "caught" and the
//! "try the next trap" branches are emitted, so no reachable successor is lost.
//!
//! # Thread Safety
//!
//! Dispatch reads shared, immutable traps and owns its state, so different analysis
//! units can be dispatched from different threads concurrently.

use crate::{
    domain::{ExceptionType, MemoryState, StateTarget, StateTransfer},
    transfer::{
        CatchClause, ControlTransferValue, DispatchConfig, InstructionOffset, Successor,
        TransferTarget, TrapStack,
    },
    Error, Result,
};

/// One transfer in flight.
///
/// Traps receive the handler by value with themselves already removed from
/// [`traps`](Self::traps).
pub struct ControlTransferHandler<'a, S: MemoryState> {
    state: S,
    target: StateTarget<S>,
    traps: TrapStack<S::Exception>,
    config: &'a DispatchConfig,
    steps: usize,
}

impl<'a, S: MemoryState> ControlTransferHandler<'a, S> {
    /// Creates a handler for `target` leaving through `traps`.
    ///
    /// # Arguments
    ///
    /// * `state` - The abstract state at the transferring instruction
    /// * `target` - Why control is leaving
    /// * `traps` - The traps active at the transferring instruction, innermost first
    /// * `config` - Resource limits for this dispatch
    #[must_use]
    pub fn new(
        state: S,
        target: StateTarget<S>,
        traps: TrapStack<S::Exception>,
        config: &'a DispatchConfig,
    ) -> Self {
        Self {
            state,
            target,
            traps,
            config,
            steps: 0,
        }
    }

    /// Returns the abstract state.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns the target being propagated.
    #[must_use]
    pub fn target(&self) -> &StateTarget<S> {
        &self.target
    }

    /// Returns the traps not yet visited, innermost first.
    #[must_use]
    pub fn traps(&self) -> &TrapStack<S::Exception> {
        &self.traps
    }

    /// Passes the transfer to the next outer trap, or resolves it if none is left.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecursionLimit`] when the step budget is exhausted, and
    /// [`Error::InvariantViolation`] when the trap stack is malformed.
    pub fn do_dispatch(mut self) -> Result<Vec<Successor<S>>> {
        self.steps += 1;
        if self.steps > self.config.max_depth {
            log::debug!(
                "dispatch of {} exceeded {} steps",
                self.target,
                self.config.max_depth
            );
            return Err(Error::RecursionLimit(self.config.max_depth));
        }

        match self.traps.pop_innermost() {
            Some(trap) => {
                log::trace!("dispatch {} through {}", self.target, trap);
                trap.dispatch(self)
            }
            None => self.resolve_terminal(),
        }
    }

    /// A successor continuing at `offset` with the current state unchanged.
    pub(crate) fn redirect(self, offset: InstructionOffset) -> Successor<S> {
        log::trace!("{} redirected to {}", self.target, offset);
        Successor::Instruction {
            offset,
            state: self.state,
        }
    }

    /// Saves `(target, remaining traps)` on the state and jumps to the finally body.
    pub(crate) fn enter_finally(
        mut self,
        jump_offset: InstructionOffset,
    ) -> Result<Vec<Successor<S>>> {
        let continuation = ControlTransferValue::new(self.target.clone(), self.traps.clone());
        self.state.push_transfer(continuation);
        Ok(vec![self.redirect(jump_offset)])
    }

    /// Pops the saved continuation and resumes dispatch from it.
    ///
    /// The target currently in flight and the current remaining stack are discarded.
    pub(crate) fn resume_continuation(mut self, trap_name: &str) -> Result<Vec<Successor<S>>> {
        let continuation = self.pop_continuation(trap_name)?;

        log::trace!("{} resumes {}", trap_name, continuation);
        let (target, traps) = continuation.into_parts();
        self.target = target;
        self.traps = traps;
        self.do_dispatch()
    }

    /// Pops the saved continuation and keeps dispatching the target in flight.
    ///
    /// `check` may reject the popped target; the popped value is dropped otherwise.
    pub(crate) fn discard_continuation(
        mut self,
        trap_name: &str,
        check: impl FnOnce(&StateTarget<S>) -> Result<()>,
    ) -> Result<Vec<Successor<S>>> {
        let continuation = self.pop_continuation(trap_name)?;

        if let Err(error) = check(continuation.target()) {
            log::debug!("{} rejected continuation {}", trap_name, continuation);
            return Err(error);
        }

        log::trace!("{} drops {}, {} continues", trap_name, continuation, self.target);
        self.do_dispatch()
    }

    fn pop_continuation(&mut self, trap_name: &str) -> Result<StateTransfer<S>> {
        match self.state.pop_transfer() {
            Some(continuation) => Ok(continuation),
            None => {
                log::debug!(
                    "{} found no continuation while dispatching {}",
                    trap_name,
                    self.target
                );
                Err(invariant_error!(
                    "{} dispatched {} without a saved continuation on the state",
                    trap_name,
                    self.target
                ))
            }
        }
    }

    /// Resolves a thrown type against ordered catch clauses.
    ///
    /// Each caught type that may overlap what is still uncaught yields a branch to its
    /// handler with the state narrowed to the overlap. Whatever the clauses cannot be
    /// shown to cover continues to the next trap as a narrower exception.
    pub(crate) fn process_catches(
        mut self,
        thrown: &S::Exception,
        clauses: &[CatchClause<S::Exception>],
    ) -> Result<Vec<Successor<S>>> {
        let mut successors = Vec::new();
        let mut remaining = Some(thrown.clone());

        'clauses: for clause in clauses {
            for caught in clause.types() {
                let Some(uncaught) = remaining.take() else {
                    break 'clauses;
                };

                if let Some(matched) = uncaught.meet(caught) {
                    let mut branch = self.state.clone();
                    if branch.narrow_exception(&matched) {
                        log::trace!("{} caught as {} at {}", thrown, matched, clause.handler());
                        successors.push(Successor::Instruction {
                            offset: clause.handler(),
                            state: branch,
                        });
                    }
                }

                remaining = uncaught.exclude(caught);
            }
        }

        if let Some(uncaught) = remaining {
            if self.state.narrow_exception(&uncaught) {
                self.target = TransferTarget::Exception(uncaught);
                successors.extend(self.do_dispatch()?);
            }
        }

        Ok(successors)
    }

    /// Resolves the target once no trap is left.
    fn resolve_terminal(mut self) -> Result<Vec<Successor<S>>> {
        log::trace!("{} reached the end of the trap stack", self.target);
        match self.target {
            TransferTarget::Exception(exception) => Ok(vec![Successor::Escape {
                exception,
                state: self.state,
            }]),
            TransferTarget::Return => Ok(vec![Successor::Return { state: self.state }]),
            TransferTarget::Jump { offset, flush } => {
                for variable in flush.iter() {
                    self.state.flush_variable(variable);
                }
                Ok(vec![Successor::Instruction {
                    offset,
                    state: self.state,
                }])
            }
            TransferTarget::ExitFinally(enter) => {
                log::debug!("ExitFinally of {} reached an empty trap stack", enter.id());
                Err(invariant_error!(
                    "ExitFinally of {} (jump {}) reached an empty trap stack",
                    enter.id(),
                    enter.jump_offset()
                ))
            }
        }
    }
}

/// Dispatch entry point holding a [`DispatchConfig`].
///
/// # Examples
///
/// ```rust
/// use trapflow::{
///     DispatchConfig, Dispatcher, InstructionOffset, RegionId, TransferTarget, Trap, TrapStack,
/// };
/// use trapflow::domain::{ClassHierarchy, TrackingState, TypeConstraint};
///
/// let mut hierarchy = ClassHierarchy::new();
/// let throwable = hierarchy.add_root("Throwable")?;
/// let hierarchy = hierarchy.into_shared();
///
/// let catch_all = Trap::try_catch_all(RegionId::new(0), InstructionOffset::new(99));
/// let traps = TrapStack::new().push_inner(catch_all.into_shared());
///
/// let dispatcher = Dispatcher::new(DispatchConfig::default());
/// let state: TrackingState<TypeConstraint, &str> = TrackingState::new();
/// let thrown = TypeConstraint::instance_of(&hierarchy, throwable);
///
/// let successors = dispatcher.dispatch(state, TransferTarget::exception(thrown), traps)?;
/// assert_eq!(successors.len(), 1);
/// assert_eq!(successors[0].offset(), Some(InstructionOffset::new(99)));
/// # Ok::<(), trapflow::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    /// Creates a dispatcher with the given limits.
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Returns the configured limits.
    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Resolves `target` leaving through `traps` into the list of successors.
    ///
    /// # Arguments
    ///
    /// * `state` - The abstract state at the transferring instruction
    /// * `target` - Why control is leaving
    /// * `traps` - The traps active at the transferring instruction, innermost first
    ///
    /// # Errors
    ///
    /// Every error is fatal for the current analysis unit:
    /// [`Error::InvariantViolation`] for malformed trap stacks or states,
    /// [`Error::RecursionLimit`] and [`Error::SuccessorLimit`] for exhausted limits.
    pub fn dispatch<S: MemoryState>(
        &self,
        state: S,
        target: StateTarget<S>,
        traps: TrapStack<S::Exception>,
    ) -> Result<Vec<Successor<S>>> {
        let successors =
            ControlTransferHandler::new(state, target, traps, &self.config).do_dispatch()?;

        let limit = self.config.max_successors;
        if limit != 0 && successors.len() > limit {
            return Err(Error::SuccessorLimit {
                count: successors.len(),
                limit,
            });
        }
        Ok(successors)
    }

    /// Resolves a saved continuation, as if its transfer happened now.
    ///
    /// # Errors
    ///
    /// See [`dispatch`](Self::dispatch).
    pub fn dispatch_value<S: MemoryState>(
        &self,
        state: S,
        value: &StateTransfer<S>,
    ) -> Result<Vec<Successor<S>>> {
        self.dispatch(state, value.target().clone(), value.traps().clone())
    }
}

/// Resolves `target` leaving through `traps` with the default limits.
///
/// # Errors
///
/// See [`Dispatcher::dispatch`].
pub fn dispatch<S: MemoryState>(
    state: S,
    target: StateTarget<S>,
    traps: TrapStack<S::Exception>,
) -> Result<Vec<Successor<S>>> {
    Dispatcher::default().dispatch(state, target, traps)
}
