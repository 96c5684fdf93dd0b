#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use trapflow::{
    domain::{ClassHierarchy, ClassId, MemoryState, TrackingState, TypeConstraint},
    CatchClause, DispatchConfig, Dispatcher, EnterFinally, FinallyId, FinallyKind,
    InstructionOffset, RegionId, TransferTarget, Trap, TrapStack,
};

fn build_hierarchy() -> trapflow::Result<(Arc<ClassHierarchy>, [ClassId; 6])> {
    let mut hierarchy = ClassHierarchy::new();
    let throwable = hierarchy.add_root("Throwable")?;
    let exception = hierarchy.add_class("Exception", throwable)?;
    let io = hierarchy.add_class("IOException", exception)?;
    let classes = [
        throwable,
        exception,
        hierarchy.add_class("Error", throwable)?,
        io,
        hierarchy.add_class("FileNotFoundException", io)?,
        hierarchy.add_class("RuntimeException", exception)?,
    ];
    Ok((hierarchy.into_shared(), classes))
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };

    let Ok((hierarchy, classes)) = build_hierarchy() else {
        return;
    };
    let class = |byte: u8| -> ClassId { classes[byte as usize % classes.len()] };

    let mut traps = TrapStack::new();
    let mut state: TrackingState<TypeConstraint, u8> = TrackingState::new();
    for (index, chunk) in rest.chunks(3).enumerate() {
        let [kind, a, b] = chunk else {
            break;
        };
        let anchor = RegionId::new(index as u32);
        let trap = match kind % 7 {
            0 => Trap::try_catch(
                anchor,
                vec![
                    CatchClause::new(
                        TypeConstraint::instance_of(&hierarchy, class(*a)),
                        InstructionOffset::new(1),
                    ),
                    CatchClause::multi(
                        [
                            TypeConstraint::instance_of(&hierarchy, class(*b)),
                            TypeConstraint::instance_of(&hierarchy, class(a ^ b)),
                        ],
                        InstructionOffset::new(2),
                    ),
                ],
            ),
            1 => Ok(Trap::try_catch_all(anchor, InstructionOffset::new(u32::from(*a)))),
            2 | 3 => {
                let kind = if kind % 7 == 2 {
                    FinallyKind::TryFinally
                } else {
                    FinallyKind::TwrFinally
                };
                let jump_offset = InstructionOffset::new(u32::from(*b));
                let enter = EnterFinally::new(FinallyId::new(index as u32), kind, jump_offset);
                Ok(Trap::enter_finally(anchor, enter))
            }
            4 => Ok(Trap::inside_finally(anchor)),
            5 => Ok(Trap::inside_inlined_block(anchor)),
            _ => {
                // Seed a continuation so finally boundaries have something to resume.
                let target = if a % 2 == 0 {
                    TransferTarget::Return
                } else {
                    TransferTarget::jump_flushing(InstructionOffset::new(u32::from(*b)), [*a, *b])
                };
                state.push_transfer(trapflow::ControlTransferValue::new(target, traps.clone()));
                continue;
            }
        };
        if let Ok(trap) = trap {
            traps = traps.push_inner(trap.into_shared());
        }
    }

    let target = match selector % 4 {
        0 => {
            let thrown = TypeConstraint::instance_of(&hierarchy, class(selector >> 2));
            TransferTarget::exception(thrown)
        }
        1 => TransferTarget::jump_flushing(InstructionOffset::new(u32::from(selector)), [selector]),
        2 => TransferTarget::exit_finally(EnterFinally::new(
            FinallyId::new(0),
            FinallyKind::TryFinally,
            InstructionOffset::new(0),
        )),
        _ => TransferTarget::Return,
    };

    let _ = Dispatcher::new(DispatchConfig::strict()).dispatch(state, target, traps);
});
