use thiserror::Error;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Dispatch itself never signals imprecision as an error: ambiguous exception types are handled
/// by branching. Every variant here means the current analysis unit must be abandoned, because
/// continuing would produce unsound successors.
///
/// # Error Categories
///
/// ## Internal Consistency
/// - [`Error::InvariantViolation`] - A trap stack or abstract state that cannot be produced by a
///   well-formed control-flow builder
/// - [`Error::MalformedTrap`] - A trap rejected at construction time
///
/// ## Resource Guards
/// - [`Error::RecursionLimit`] - A single dispatch took more trap steps than allowed
/// - [`Error::SuccessorLimit`] - A single dispatch produced more successors than allowed
///
/// # Examples
///
/// ```rust
/// use trapflow::{
///     dispatch, EnterFinally, Error, FinallyId, FinallyKind, InstructionOffset, TransferTarget,
///     TrapStack,
/// };
/// use trapflow::domain::{TrackingState, TypeConstraint};
///
/// let state: TrackingState<TypeConstraint, &str> = TrackingState::new();
/// let jump_offset = InstructionOffset::new(5);
/// let enter = EnterFinally::new(FinallyId::new(0), FinallyKind::TryFinally, jump_offset);
/// let target = TransferTarget::exit_finally(enter);
///
/// match dispatch(state, target, TrapStack::new()) {
///     Err(Error::InvariantViolation { message, file, line }) => {
///         eprintln!("broken trap stack: {} ({}:{})", message, file, line);
///     }
///     Err(e) => panic!("unexpected error: {}", e),
///     Ok(_) => panic!("an unmatched finally exit must not resolve"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A structural invariant of the trap stack or of the abstract state was violated.
    ///
    /// Raised when a non-terminal target reaches an empty trap stack, when a finally or
    /// inlined-block boundary finds no continuation on the state's value stack, or when an
    /// inlined-block boundary pops a continuation whose target is not a return. The error
    /// includes the source location where the violation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violated - {file}:{line}: {message}")]
    InvariantViolation {
        /// The message to be printed for the InvariantViolation error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A trap could not be constructed from the given parts.
    ///
    /// For example a `TryCatch` without clauses, or with two clauses sharing a handler offset.
    #[error("Malformed trap - {0}")]
    MalformedTrap(String),

    /// Recursion limit reached.
    ///
    /// Every trap step and every continuation resume counts towards the limit configured in
    /// [`crate::DispatchConfig::max_depth`]. The associated value is the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// A [`crate::domain::ClassHierarchy`] is full.
    ///
    /// Class ids are `u32` indices; the associated value is the class limit.
    #[error("Class hierarchy cannot hold more than {0} classes")]
    ClassLimit(usize),

    /// A single dispatch produced more successors than allowed.
    ///
    /// See [`crate::DispatchConfig::max_successors`].
    #[error("Dispatch produced {count} successors, limit is {limit}")]
    SuccessorLimit {
        /// Number of successors the dispatch produced
        count: usize,
        /// The configured limit
        limit: usize,
    },
}
