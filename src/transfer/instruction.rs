//! The instruction that carries a transfer.

use std::{collections::BTreeSet, fmt};

use crate::{
    domain::MemoryState,
    transfer::{BackLinkTable, ControlTransferValue, Dispatcher, InstructionOffset, Successor},
    Result,
};

/// An instruction that transfers control non-locally.
///
/// The control-flow builder emits one for every `throw`, `return`, `break`,
/// `continue` and finally completion whose destination depends on the enclosing traps.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlTransferInstruction<T, V> {
    index: InstructionOffset,
    transfer: ControlTransferValue<T, V>,
}

impl<T, V> ControlTransferInstruction<T, V> {
    /// Creates the instruction at `index` performing `transfer`.
    #[must_use]
    pub fn new(index: InstructionOffset, transfer: ControlTransferValue<T, V>) -> Self {
        Self { index, transfer }
    }

    /// Returns the index of this instruction.
    #[must_use]
    pub const fn index(&self) -> InstructionOffset {
        self.index
    }

    /// Returns the transfer this instruction performs.
    #[must_use]
    pub const fn transfer(&self) -> &ControlTransferValue<T, V> {
        &self.transfer
    }

    /// Returns every instruction this one can lead to, for static reachability.
    #[must_use]
    pub fn possible_targets(&self, table: &BackLinkTable<T, V>) -> BTreeSet<InstructionOffset> {
        table.transfer_possible_targets(&self.transfer)
    }

    /// Dispatches this instruction's transfer on `state`.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch`].
    pub fn execute<S>(&self, dispatcher: &Dispatcher, state: S) -> Result<Vec<Successor<S>>>
    where
        S: MemoryState<Exception = T, Variable = V>,
    {
        log::trace!("execute {} at {}", self.transfer.target().kind_name(), self.index);
        dispatcher.dispatch_value(state, &self.transfer)
    }
}

impl<T: fmt::Display, V> fmt::Display for ControlTransferInstruction<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TRANSFER {}", self.transfer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{TrackingState, TypeConstraint},
        test::factories::{catch_all, exception_hierarchy, offset, stack, thrown},
        transfer::{BackLinkRegistry, TransferTarget},
    };

    #[test]
    fn test_execute_dispatches_transfer() {
        let hierarchy = exception_hierarchy();
        let throw = ControlTransferInstruction::new(
            offset(4),
            ControlTransferValue::new(
                TransferTarget::exception(thrown(&hierarchy, "IOException")),
                stack([catch_all(40)]),
            ),
        );

        let state: TrackingState<TypeConstraint, &str> = TrackingState::new();
        let successors = throw.execute(&Dispatcher::default(), state).unwrap();
        assert_eq!(successors.len(), 1);
        assert_eq!(successors[0].offset(), Some(offset(40)));
    }

    #[test]
    fn test_possible_targets_and_display() {
        let value =
            ControlTransferValue::new(TransferTarget::jump(offset(8)), stack([catch_all(40)]));
        let jump: ControlTransferInstruction<TypeConstraint, &str> =
            ControlTransferInstruction::new(offset(4), value);
        let table = BackLinkRegistry::new().freeze();

        assert_eq!(
            jump.possible_targets(&table).into_iter().collect::<Vec<_>>(),
            vec![offset(8), offset(40)]
        );
        assert_eq!(jump.to_string(), "TRANSFER -> 8 [TryCatchAll -> 40]");
    }
}
