//! Factories for exception hierarchies, traps and trap stacks.
//!
//! Every trap is anchored to region 0 unless the helper takes an explicit id; dispatch
//! never looks at anchors.

use std::sync::Arc;

use crate::{
    domain::{ClassHierarchy, TypeConstraint},
    transfer::{
        CatchClause, EnterFinally, FinallyId, FinallyKind, InstructionOffset, RegionId, Trap,
        TrapStack,
    },
};

/// A small Java-like exception tree.
///
/// ```text
/// Throwable
/// ├── Exception
/// │   ├── IOException
/// │   │   └── FileNotFoundException
/// │   ├── RuntimeException
/// │   │   └── IllegalStateException
/// │   └── SQLException
/// └── Error
/// ```
pub fn exception_hierarchy() -> Arc<ClassHierarchy> {
    let mut hierarchy = ClassHierarchy::new();
    let throwable = hierarchy.add_root("Throwable").unwrap();
    let exception = hierarchy.add_class("Exception", throwable).unwrap();
    hierarchy.add_class("Error", throwable).unwrap();
    let io = hierarchy.add_class("IOException", exception).unwrap();
    hierarchy.add_class("FileNotFoundException", io).unwrap();
    let runtime = hierarchy.add_class("RuntimeException", exception).unwrap();
    hierarchy.add_class("IllegalStateException", runtime).unwrap();
    hierarchy.add_class("SQLException", exception).unwrap();
    hierarchy.into_shared()
}

/// The constraint "any instance of `name`". Panics on unknown names.
pub fn thrown(hierarchy: &Arc<ClassHierarchy>, name: &str) -> TypeConstraint {
    TypeConstraint::named(hierarchy, name).unwrap_or_else(|| panic!("unknown class {name}"))
}

pub fn offset(index: u32) -> InstructionOffset {
    InstructionOffset::new(index)
}

/// A `TryCatch` with one single-type clause per `(class, handler)` pair.
pub fn catch(
    hierarchy: &Arc<ClassHierarchy>,
    clauses: &[(&str, u32)],
) -> Arc<Trap<TypeConstraint>> {
    let clauses = clauses
        .iter()
        .map(|(name, handler)| CatchClause::new(thrown(hierarchy, name), offset(*handler)))
        .collect();
    Trap::try_catch(RegionId::new(0), clauses)
        .unwrap()
        .into_shared()
}

pub fn catch_all(handler: u32) -> Arc<Trap<TypeConstraint>> {
    Trap::try_catch_all(RegionId::new(0), offset(handler)).into_shared()
}

pub fn finally_entry(id: u32, kind: FinallyKind, jump: u32) -> EnterFinally {
    EnterFinally::new(FinallyId::new(id), kind, offset(jump))
}

pub fn try_finally(id: u32, jump: u32) -> Arc<Trap<TypeConstraint>> {
    Trap::enter_finally(
        RegionId::new(0),
        finally_entry(id, FinallyKind::TryFinally, jump),
    )
    .into_shared()
}

pub fn twr_finally(id: u32, jump: u32) -> Arc<Trap<TypeConstraint>> {
    Trap::enter_finally(
        RegionId::new(0),
        finally_entry(id, FinallyKind::TwrFinally, jump),
    )
    .into_shared()
}

pub fn inside_finally() -> Arc<Trap<TypeConstraint>> {
    Trap::inside_finally(RegionId::new(0)).into_shared()
}

pub fn inlined() -> Arc<Trap<TypeConstraint>> {
    Trap::inside_inlined_block(RegionId::new(0)).into_shared()
}

/// Builds a stack from traps listed innermost first.
pub fn stack(
    traps: impl IntoIterator<Item = Arc<Trap<TypeConstraint>>>,
) -> TrapStack<TypeConstraint> {
    TrapStack::from_innermost(traps)
}
