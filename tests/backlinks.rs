//! Static reachability through finally back-links.
//!
//! Models the control-flow builder's construction phase for
//!
//! ```text
//! for (...) {                 // loop exit @200, continue @0
//!     try {
//!         if (a) break;       // @10
//!         if (b) continue;    // @11
//!         if (c) return;      // @12
//!         throw ...;          // @13
//!     } catch (IOException) { // @80
//!     } finally {             // @50 .. @59
//!     }
//! }
//! ```
//!
//! and then queries where the end of the finally body can lead.

use std::collections::BTreeSet;

use trapflow::{
    domain::{ClassHierarchy, TypeConstraint},
    BackLinkRegistry, CatchClause, ControlTransferInstruction, ControlTransferValue,
    InstructionOffset, RegionId, TransferTarget, Trap, TrapStack,
};

type Instruction = ControlTransferInstruction<TypeConstraint, u32>;

fn at(index: u32) -> InstructionOffset {
    InstructionOffset::new(index)
}

fn indices(offsets: BTreeSet<InstructionOffset>) -> Vec<u32> {
    offsets.into_iter().map(|offset| offset.index()).collect()
}

#[test]
fn finally_exit_reaches_every_linked_destination() {
    let mut hierarchy = ClassHierarchy::new();
    let throwable = hierarchy.add_root("Throwable").unwrap();
    let io = hierarchy.add_class("IOException", throwable).unwrap();
    let hierarchy = hierarchy.into_shared();

    let mut registry = BackLinkRegistry::<TypeConstraint, u32>::new();
    let finally = registry.try_finally(RegionId::new(1), at(50));
    let enter = *finally.as_enter_finally().unwrap();
    let catch = Trap::try_catch(
        RegionId::new(1),
        vec![CatchClause::new(TypeConstraint::instance_of(&hierarchy, io), at(80))],
    )
    .unwrap()
    .into_shared();
    let try_block = TrapStack::from_innermost([catch, finally]);

    let transfers = [
        Instruction::new(
            at(10),
            ControlTransferValue::new(TransferTarget::jump(at(200)), try_block.clone()),
        ),
        Instruction::new(
            at(11),
            ControlTransferValue::new(TransferTarget::jump_flushing(at(0), [7]), try_block.clone()),
        ),
        Instruction::new(
            at(12),
            ControlTransferValue::new(TransferTarget::Return, try_block.clone()),
        ),
        Instruction::new(
            at(13),
            ControlTransferValue::new(
                TransferTarget::exception(TypeConstraint::instance_of(&hierarchy, throwable)),
                try_block.clone(),
            ),
        ),
    ];
    for transfer in &transfers {
        registry.link(transfer);
        // The builder may revisit an instruction; links are idempotent.
        registry.link(transfer);
    }

    let table = registry.freeze();
    assert_eq!(table.back_links(&enter).len(), 4);

    // The finally entry itself is excluded; the catch handler stays reachable.
    let exit = TransferTarget::exit_finally(enter);
    assert_eq!(indices(table.target_possible_targets(&exit)), vec![0, 80, 200]);

    let end_of_finally = Instruction::new(
        at(59),
        ControlTransferValue::new(
            exit,
            TrapStack::new().push_inner(Trap::inside_finally(RegionId::new(1)).into_shared()),
        ),
    );
    assert_eq!(indices(end_of_finally.possible_targets(&table)), vec![0, 80, 200]);
    assert_eq!(indices(transfers[0].possible_targets(&table)), vec![50, 80, 200]);
}

#[test]
fn nested_finally_exits_are_followed() {
    let mut registry = BackLinkRegistry::<TypeConstraint, u32>::new();
    let inner = registry.try_finally(RegionId::new(2), at(50));
    let outer = registry.try_finally(RegionId::new(1), at(70));
    let inner_enter = *inner.as_enter_finally().unwrap();
    let outer_enter = *outer.as_enter_finally().unwrap();

    // A return from the inner try runs both finally bodies.
    registry.link(&Instruction::new(
        at(10),
        ControlTransferValue::new(
            TransferTarget::jump(at(300)),
            TrapStack::from_innermost([inner, outer.clone()]),
        ),
    ));
    // The end of the inner finally body exits into the outer finally.
    registry.link(&Instruction::new(
        at(59),
        ControlTransferValue::new(
            TransferTarget::exit_finally(inner_enter),
            TrapStack::from_innermost([
                Trap::inside_finally(RegionId::new(2)).into_shared(),
                outer,
            ]),
        ),
    ));

    let table = registry.freeze();
    let outer_exit = TransferTarget::exit_finally(outer_enter);
    // Back-links carry every trap target of the linked transfer, so the inner entry shows up.
    assert_eq!(indices(table.target_possible_targets(&outer_exit)), vec![50, 300]);

    let inner_exit = TransferTarget::exit_finally(inner_enter);
    assert_eq!(indices(table.target_possible_targets(&inner_exit)), vec![70, 300]);
}
