//! A forkable reference memory state.
//!
//! [`TrackingState`] stores everything in `imbl` persistent collections, so cloning
//! a state for every dispatch branch is O(1) and only the entries a branch touches
//! are copied.

use std::{
    fmt::{self, Debug},
    hash::Hash,
};

use imbl::{HashMap as ImHashMap, Vector as ImVector};

use crate::{
    domain::{ExceptionType, MemoryState},
    transfer::ControlTransferValue,
};

/// An entry on the state's value stack.
#[derive(Clone, Debug, PartialEq)]
pub enum StackValue<T, V> {
    /// A continuation saved on entry to a finally block.
    Transfer(ControlTransferValue<T, V>),
    /// Any other operand.
    Constant(i64),
}

/// A memory state tracking integer constants, a value stack and the in-flight
/// exception type.
///
/// Variables absent from the state are unknown.
///
/// # Examples
///
/// ```rust
/// use trapflow::domain::{MemoryState, TrackingState, TypeConstraint};
///
/// let mut state: TrackingState<TypeConstraint, &str> = TrackingState::new();
/// state.set_variable("x", 42);
///
/// let fork = state.clone();
/// state.flush_variable(&"x");
///
/// assert_eq!(state.variable(&"x"), None);
/// assert_eq!(fork.variable(&"x"), Some(42));
/// ```
pub struct TrackingState<T, V> {
    variables: ImHashMap<V, i64>,
    stack: ImVector<StackValue<T, V>>,
    exception: Option<T>,
}

impl<T, V> TrackingState<T, V>
where
    T: Clone,
    V: Clone + Eq + Hash,
{
    /// Creates a state with no known variables, an empty stack and no in-flight
    /// exception constraint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variables: ImHashMap::new(),
            stack: ImVector::new(),
            exception: None,
        }
    }

    /// Binds `variable` to a known constant.
    pub fn set_variable(&mut self, variable: V, value: i64) {
        self.variables.insert(variable, value);
    }

    /// Returns the constant bound to `variable`, or `None` if it is unknown.
    #[must_use]
    pub fn variable(&self, variable: &V) -> Option<i64> {
        self.variables.get(variable).copied()
    }

    /// Pushes an opaque operand onto the value stack.
    pub fn push_constant(&mut self, value: i64) {
        self.stack.push_back(StackValue::Constant(value));
    }

    /// Returns the top of the value stack.
    #[must_use]
    pub fn peek(&self) -> Option<&StackValue<T, V>> {
        self.stack.back()
    }

    /// Returns the number of entries on the value stack.
    #[must_use]
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns the in-flight exception constraint, if the state was narrowed.
    #[must_use]
    pub fn exception(&self) -> Option<&T> {
        self.exception.as_ref()
    }
}

impl<T, V> Clone for TrackingState<T, V>
where
    T: Clone,
    V: Clone + Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            variables: self.variables.clone(),
            stack: self.stack.clone(),
            exception: self.exception.clone(),
        }
    }
}

impl<T, V> Debug for TrackingState<T, V>
where
    T: Clone + Debug,
    V: Clone + Eq + Hash + Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingState")
            .field("variables", &self.variables)
            .field("stack", &self.stack)
            .field("exception", &self.exception)
            .finish()
    }
}

impl<T, V> Default for TrackingState<T, V>
where
    T: Clone,
    V: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, V> MemoryState for TrackingState<T, V>
where
    T: ExceptionType,
    V: Clone + Debug + Eq + Hash,
{
    type Exception = T;
    type Variable = V;

    fn flush_variable(&mut self, variable: &V) {
        self.variables.remove(variable);
    }

    fn push_transfer(&mut self, value: ControlTransferValue<T, V>) {
        self.stack.push_back(StackValue::Transfer(value));
    }

    fn pop_transfer(&mut self) -> Option<ControlTransferValue<T, V>> {
        match self.stack.back() {
            Some(StackValue::Transfer(_)) => match self.stack.pop_back() {
                Some(StackValue::Transfer(value)) => Some(value),
                _ => None,
            },
            _ => None,
        }
    }

    fn narrow_exception(&mut self, exception: &T) -> bool {
        let narrowed = match &self.exception {
            Some(current) => current.meet(exception),
            None => Some(exception.clone()),
        };
        match narrowed {
            Some(narrowed) => {
                self.exception = Some(narrowed);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::TypeConstraint,
        test::factories::{exception_hierarchy, thrown},
        transfer::{TransferTarget, TrapStack},
    };

    type State = TrackingState<TypeConstraint, &'static str>;

    #[test]
    fn test_flush_makes_variable_unknown() {
        let mut state = State::new();
        state.set_variable("x", 1);
        state.set_variable("y", 2);
        state.flush_variable(&"x");

        assert_eq!(state.variable(&"x"), None);
        assert_eq!(state.variable(&"y"), Some(2));
    }

    #[test]
    fn test_pop_transfer_is_lifo() {
        let mut state = State::new();
        state.push_transfer(ControlTransferValue::new(TransferTarget::Return, TrapStack::new()));
        state.push_transfer(ControlTransferValue::new(
            TransferTarget::jump(crate::transfer::InstructionOffset::new(4)),
            TrapStack::new(),
        ));

        assert_eq!(state.stack_depth(), 2);
        assert!(!state.pop_transfer().unwrap().target().is_return());
        assert!(state.pop_transfer().unwrap().target().is_return());
        assert!(state.pop_transfer().is_none());
    }

    #[test]
    fn test_pop_transfer_leaves_foreign_values() {
        let mut state = State::new();
        state.push_constant(7);

        assert!(state.pop_transfer().is_none());
        assert_eq!(state.stack_depth(), 1);
        assert_eq!(state.peek(), Some(&StackValue::Constant(7)));
    }

    #[test]
    fn test_narrow_exception_intersects() {
        let hierarchy = exception_hierarchy();
        let mut state = State::new();

        assert!(state.narrow_exception(&thrown(&hierarchy, "Exception")));
        assert!(state.narrow_exception(&thrown(&hierarchy, "IOException")));
        assert_eq!(state.exception().unwrap().to_string(), "IOException");

        let mut infeasible = state.clone();
        assert!(!infeasible.narrow_exception(&thrown(&hierarchy, "RuntimeException")));
    }
}
