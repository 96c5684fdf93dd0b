//! Dispatch configuration.
//!
//! Dispatch is a pure function of its inputs, so the only knobs are resource
//! guards. Both exist to turn a malformed trap stack or a pathological explosion
//! of catch branches into an error for the current analysis unit instead of a
//! stack overflow or an unbounded successor list.
//!
//! # Example
//!
//! ```rust
//! use trapflow::DispatchConfig;
//!
//! let config = DispatchConfig::new()
//!     .with_max_depth(64)
//!     .with_max_successors(16);
//! assert_eq!(config.max_depth, 64);
//! ```

/// Limits applied to a single dispatch.
///
/// # Default Values
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_depth` | 1,000 |
/// | `max_successors` | 0 (unlimited) |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Maximum number of trap steps one dispatch may take.
    ///
    /// Every trap visited and every continuation resumed counts as a step. On a
    /// well-formed stack the count is bounded by the trap nesting depth, so the
    /// limit only trips on malformed input. When exceeded, dispatch fails with
    /// [`crate::Error::RecursionLimit`].
    pub max_depth: usize,

    /// Maximum number of successors one dispatch may return.
    ///
    /// Set to 0 for no limit. When exceeded, dispatch fails with
    /// [`crate::Error::SuccessorLimit`].
    pub max_successors: usize,
}

impl DispatchConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Small limits for tests and fuzzing.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_depth: 64,
            max_successors: 64,
        }
    }

    /// Sets the maximum number of trap steps.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Sets the maximum number of successors, 0 for no limit.
    #[must_use]
    pub fn with_max_successors(mut self, max_successors: usize) -> Self {
        self.max_successors = max_successors;
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_depth: 1_000,
            max_successors: 0,
        }
    }
}
