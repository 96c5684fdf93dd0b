//! Back-links from finally entries to the transfers that can enter them.
//!
//! A finally body can be entered from many places: a `return` inside the try block,
//! a `break` out of it, an exception, the normal fall-through. When the body ends with
//! [`TransferTarget::ExitFinally`], live dispatch resumes the one continuation saved on
//! the state. Static reachability has no state to look at, so it asks instead "which
//! transfers were registered as entering this finally, and where can they go?".
//!
//! Registration happens while the control-flow graph is built ([`BackLinkRegistry`]);
//! queries happen during analysis ([`BackLinkTable`]). The registry is consumed by
//! [`BackLinkRegistry::freeze`], so no mutation is possible once analysis starts and
//! the table can be shared between threads.
//!
//! # Examples
//!
//! ```rust
//! use trapflow::{
//!     BackLinkRegistry, ControlTransferInstruction, ControlTransferValue, InstructionOffset,
//!     RegionId, TransferTarget, TrapStack,
//! };
//!
//! let mut registry = BackLinkRegistry::<String, u32>::new();
//! let finally = registry.try_finally(RegionId::new(0), InstructionOffset::new(50));
//! let enter = *finally.as_enter_finally().unwrap();
//!
//! // `return` inside the try block enters the finally first.
//! let traps = TrapStack::new().push_inner(finally);
//! let ret = ControlTransferInstruction::new(
//!     InstructionOffset::new(10),
//!     ControlTransferValue::new(TransferTarget::jump(InstructionOffset::new(90)), traps),
//! );
//! registry.link(&ret);
//!
//! let table = registry.freeze();
//! let exit: TransferTarget<String, u32> = TransferTarget::exit_finally(enter);
//! let targets: Vec<u32> = table
//!     .target_possible_targets(&exit)
//!     .into_iter()
//!     .map(|o| o.index())
//!     .collect();
//! assert_eq!(targets, vec![90]);
//! ```

use std::{collections::BTreeSet, fmt, sync::Arc};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::transfer::{
    ControlTransferInstruction, ControlTransferValue, EnterFinally, FinallyId, FinallyKind,
    InstructionOffset, RegionId, TransferTarget, Trap,
};

/// A transfer registered as entering a finally block.
#[derive(Clone, Debug, PartialEq)]
pub struct BackLink<T, V> {
    instruction: InstructionOffset,
    transfer: ControlTransferValue<T, V>,
}

impl<T, V> BackLink<T, V> {
    /// Returns the index of the transferring instruction.
    #[must_use]
    pub const fn instruction(&self) -> InstructionOffset {
        self.instruction
    }

    /// Returns the transfer of the registered instruction.
    #[must_use]
    pub const fn transfer(&self) -> &ControlTransferValue<T, V> {
        &self.transfer
    }
}

/// Construction-phase bookkeeping of finally entries and their back-links.
pub struct BackLinkRegistry<T, V> {
    next_id: u32,
    links: FxHashMap<FinallyId, Vec<BackLink<T, V>>>,
    seen: FxHashSet<(FinallyId, InstructionOffset)>,
}

impl<T, V> BackLinkRegistry<T, V>
where
    T: Clone,
    V: Clone,
{
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            links: FxHashMap::default(),
            seen: FxHashSet::default(),
        }
    }

    /// Creates a finally-entry trap with a fresh [`FinallyId`].
    ///
    /// # Arguments
    ///
    /// * `anchor` - The lexical region of the try statement
    /// * `kind` - The finally flavour
    /// * `jump_offset` - The first instruction of the finally body
    pub fn enter_finally(
        &mut self,
        anchor: RegionId,
        kind: FinallyKind,
        jump_offset: InstructionOffset,
    ) -> Arc<Trap<T>> {
        let id = FinallyId::new(self.next_id);
        self.next_id += 1;
        self.links.entry(id).or_default();
        Trap::enter_finally(anchor, EnterFinally::new(id, kind, jump_offset)).into_shared()
    }

    /// Creates a `TryFinally` trap.
    pub fn try_finally(
        &mut self,
        anchor: RegionId,
        jump_offset: InstructionOffset,
    ) -> Arc<Trap<T>> {
        self.enter_finally(anchor, FinallyKind::TryFinally, jump_offset)
    }

    /// Creates a `TwrFinally` trap.
    pub fn twr_finally(
        &mut self,
        anchor: RegionId,
        jump_offset: InstructionOffset,
    ) -> Arc<Trap<T>> {
        self.enter_finally(anchor, FinallyKind::TwrFinally, jump_offset)
    }

    /// Registers `instruction` as a back-link of every finally entry on its trap stack.
    ///
    /// Linking the same instruction twice has no further effect.
    pub fn link(&mut self, instruction: &ControlTransferInstruction<T, V>) {
        self.link_transfer(instruction.index(), instruction.transfer());
    }

    /// Registers the transfer at `index` as a back-link of every finally entry on its
    /// trap stack.
    pub fn link_transfer(
        &mut self,
        index: InstructionOffset,
        transfer: &ControlTransferValue<T, V>,
    ) {
        for trap in transfer.traps().iter() {
            let Some(enter) = trap.as_enter_finally() else {
                continue;
            };
            if !self.seen.insert((enter.id(), index)) {
                continue;
            }
            log::trace!("back-link {} -> {}", index, enter.id());
            self.links.entry(enter.id()).or_default().push(BackLink {
                instruction: index,
                transfer: transfer.clone(),
            });
        }
    }

    /// Returns the back-links registered so far for `id`.
    #[must_use]
    pub fn back_links(&self, id: FinallyId) -> &[BackLink<T, V>] {
        self.links.get(&id).map_or(&[][..], Vec::as_slice)
    }

    /// Ends the construction phase.
    #[must_use]
    pub fn freeze(self) -> BackLinkTable<T, V> {
        BackLinkTable {
            links: self
                .links
                .into_iter()
                .map(|(id, links)| (id, links.into_boxed_slice()))
                .collect(),
        }
    }
}

impl<T: Clone, V: Clone> Default for BackLinkRegistry<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V> fmt::Debug for BackLinkRegistry<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackLinkRegistry")
            .field("finally_entries", &self.next_id)
            .field("back_links", &self.seen.len())
            .finish()
    }
}

/// Frozen back-links, answering static reachability queries.
pub struct BackLinkTable<T, V> {
    links: FxHashMap<FinallyId, Box<[BackLink<T, V>]>>,
}

impl<T, V> BackLinkTable<T, V> {
    /// Returns the back-links of a finally entry.
    #[must_use]
    pub fn back_links(&self, enter: &EnterFinally) -> &[BackLink<T, V>] {
        self.links.get(&enter.id()).map_or(&[][..], |links| &links[..])
    }

    /// Returns the offsets a transfer target can lead to, ignoring traps.
    ///
    /// `Jump` leads to its offset. `ExitFinally` leads wherever the transfers that
    /// entered the finally can lead, except back into the finally body itself.
    /// `Exception` and `Return` have no static target.
    #[must_use]
    pub fn target_possible_targets(
        &self,
        target: &TransferTarget<T, V>,
    ) -> BTreeSet<InstructionOffset> {
        let mut targets = BTreeSet::new();
        let mut visited = FxHashSet::default();
        self.collect_target(target, &mut visited, &mut targets);
        targets
    }

    /// Returns the offsets a trap can redirect control to.
    #[must_use]
    pub fn trap_possible_targets(&self, trap: &Trap<T>) -> BTreeSet<InstructionOffset> {
        trap.possible_targets().into_iter().collect()
    }

    /// Returns the offsets a transfer value can lead to: the union of its traps' and
    /// its target's possible targets.
    #[must_use]
    pub fn transfer_possible_targets(
        &self,
        transfer: &ControlTransferValue<T, V>,
    ) -> BTreeSet<InstructionOffset> {
        let mut targets = BTreeSet::new();
        let mut visited = FxHashSet::default();
        self.collect_transfer(transfer, &mut visited, &mut targets);
        targets
    }

    fn collect_transfer(
        &self,
        transfer: &ControlTransferValue<T, V>,
        visited: &mut FxHashSet<FinallyId>,
        targets: &mut BTreeSet<InstructionOffset>,
    ) {
        for trap in transfer.traps().iter() {
            targets.extend(trap.possible_targets());
        }
        self.collect_target(transfer.target(), visited, targets);
    }

    fn collect_target(
        &self,
        target: &TransferTarget<T, V>,
        visited: &mut FxHashSet<FinallyId>,
        targets: &mut BTreeSet<InstructionOffset>,
    ) {
        match target {
            TransferTarget::Jump { offset, .. } => {
                targets.insert(*offset);
            }
            TransferTarget::ExitFinally(enter) => {
                // A finally reached again on the same path is a malformed cycle. Sibling
                // paths may still revisit it, so the guard is released on the way out.
                if !visited.insert(enter.id()) {
                    return;
                }
                let mut resumed = BTreeSet::new();
                for link in self.back_links(enter) {
                    self.collect_transfer(&link.transfer, visited, &mut resumed);
                }
                visited.remove(&enter.id());
                resumed.remove(&enter.jump_offset());
                targets.extend(resumed);
            }
            TransferTarget::Exception(_) | TransferTarget::Return => {}
        }
    }

    /// Returns the number of finally entries known to the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if no finally entry was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl<T, V> fmt::Debug for BackLinkTable<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackLinkTable")
            .field("finally_entries", &self.links.len())
            .finish()
    }
}
