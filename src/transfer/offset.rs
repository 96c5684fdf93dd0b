//! Identities shared between the control-flow builder and the dispatch engine.
//!
//! These are plain `Copy` newtypes. The engine never dereferences them: an
//! [`InstructionOffset`] is handed back to the fixpoint driver as a successor, a
//! [`RegionId`] only labels the lexical region a trap guards, and a [`FinallyId`]
//! keys the back-link table of one finally entry.

use std::fmt;

/// A resolved instruction index inside one analyzed unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstructionOffset(pub u32);

impl InstructionOffset {
    /// Creates a new offset from a raw instruction index
    #[must_use]
    pub const fn new(index: u32) -> Self {
        InstructionOffset(index)
    }

    /// Returns the raw instruction index
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.0
    }
}

impl From<u32> for InstructionOffset {
    fn from(index: u32) -> Self {
        InstructionOffset(index)
    }
}

impl From<InstructionOffset> for u32 {
    fn from(offset: InstructionOffset) -> Self {
        offset.0
    }
}

impl fmt::Display for InstructionOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identity of the lexical region (try statement, finally block, resource
/// list, inlined body) a trap is anchored to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub u32);

impl RegionId {
    /// Creates a new region identity
    #[must_use]
    pub const fn new(id: u32) -> Self {
        RegionId(id)
    }

    /// Returns the raw region identity
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Identity of one finally-entry trap.
///
/// Allocated by [`crate::transfer::BackLinkRegistry`]; used to look up the
/// back-links registered for that entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinallyId(pub u32);

impl FinallyId {
    /// Creates a new finally identity
    #[must_use]
    pub const fn new(id: u32) -> Self {
        FinallyId(id)
    }

    /// Returns the raw finally identity
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FinallyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "finally#{}", self.0)
    }
}
