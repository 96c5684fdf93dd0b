//! A type-constraint lattice over a single-inheritance class hierarchy.
//!
//! [`TypeConstraint`] describes a thrown value as "an instance of class `C`, but not
//! of any of the classes `E1..En`". This is precise enough to model sequential catch
//! clauses: after `catch (IOException)` the remainder of a thrown `Exception` is
//! `Exception \ {IOException}`, and a later `catch (FileNotFoundException)` is
//! provably unreachable for it.
//!
//! Exception classes form a tree, so two classes neither of which derives from the
//! other have no common instances. That is what makes disjointness provable.

use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{domain::ExceptionType, Error, Result};

/// Index of a class inside a [`ClassHierarchy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(u32);

impl ClassId {
    /// Returns the raw index of this class
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.0
    }
}

#[derive(Clone, Debug)]
struct ClassEntry {
    name: String,
    parent: Option<ClassId>,
}

/// A single-inheritance class tree.
///
/// Classes are added parents first, so the tree is acyclic by construction.
///
/// # Examples
///
/// ```rust
/// use trapflow::domain::ClassHierarchy;
///
/// let mut hierarchy = ClassHierarchy::new();
/// let throwable = hierarchy.add_root("Throwable")?;
/// let exception = hierarchy.add_class("Exception", throwable)?;
/// let io = hierarchy.add_class("IOException", exception)?;
///
/// assert!(hierarchy.is_subclass(io, throwable));
/// assert!(!hierarchy.is_subclass(exception, io));
/// assert_eq!(hierarchy.lookup("IOException"), Some(io));
/// # Ok::<(), trapflow::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClassHierarchy {
    classes: Vec<ClassEntry>,
    by_name: FxHashMap<String, ClassId>,
}

impl ClassHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class without a parent.
    ///
    /// If a class of that name already exists, its id is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassLimit`] once the hierarchy holds [`Self::MAX_CLASSES`].
    pub fn add_root(&mut self, name: &str) -> Result<ClassId> {
        self.insert(name, None)
    }

    /// Adds a class deriving from `parent`.
    ///
    /// If a class of that name already exists, its id is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClassLimit`] once the hierarchy holds [`Self::MAX_CLASSES`].
    pub fn add_class(&mut self, name: &str, parent: ClassId) -> Result<ClassId> {
        self.insert(name, Some(parent))
    }

    /// The largest number of classes a hierarchy can hold; ids are `u32` indices.
    pub const MAX_CLASSES: usize = u32::MAX as usize;

    fn insert(&mut self, name: &str, parent: Option<ClassId>) -> Result<ClassId> {
        if let Some(existing) = self.by_name.get(name) {
            return Ok(*existing);
        }
        Self::next_id(self.classes.len()).map(|id| {
            // Parents always precede their children, which keeps `is_subclass` finite.
            let parent = parent.filter(|p| p.0 < id.0);
            self.classes.push(ClassEntry {
                name: name.to_string(),
                parent,
            });
            self.by_name.insert(name.to_string(), id);
            id
        })
    }

    fn next_id(len: usize) -> Result<ClassId> {
        match u32::try_from(len) {
            Ok(index) if len < Self::MAX_CLASSES => Ok(ClassId(index)),
            _ => Err(Error::ClassLimit(Self::MAX_CLASSES)),
        }
    }

    /// Looks up a class by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of a class, or `None` for an id from another hierarchy.
    #[must_use]
    pub fn name(&self, id: ClassId) -> Option<&str> {
        self.classes.get(id.0 as usize).map(|entry| entry.name.as_str())
    }

    /// Returns the direct parent of a class.
    #[must_use]
    pub fn parent(&self, id: ClassId) -> Option<ClassId> {
        self.classes.get(id.0 as usize).and_then(|entry| entry.parent)
    }

    /// Returns the number of classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if no class was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns `true` if `sub` is `sup` or derives from it.
    #[must_use]
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut current = Some(sub);
        while let Some(class) = current {
            if class == sup {
                return true;
            }
            current = self.parent(class);
        }
        false
    }

    /// Freezes the hierarchy for sharing between constraints and threads.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// "Instance of `instance_of`, but not of any excluded class."
///
/// The excluded set is kept minimal: only strict subclasses of `instance_of`, none
/// of them deriving from another excluded class.
#[derive(Clone)]
pub struct TypeConstraint {
    hierarchy: Arc<ClassHierarchy>,
    instance_of: ClassId,
    excluded: Vec<ClassId>,
}

impl TypeConstraint {
    /// Creates the constraint "any instance of `class`".
    #[must_use]
    pub fn instance_of(hierarchy: &Arc<ClassHierarchy>, class: ClassId) -> Self {
        Self {
            hierarchy: Arc::clone(hierarchy),
            instance_of: class,
            excluded: Vec::new(),
        }
    }

    /// Creates the constraint "any instance of the class called `name`".
    ///
    /// # Returns
    ///
    /// `None` if the hierarchy has no such class.
    #[must_use]
    pub fn named(hierarchy: &Arc<ClassHierarchy>, name: &str) -> Option<Self> {
        hierarchy
            .lookup(name)
            .map(|class| Self::instance_of(hierarchy, class))
    }

    /// Returns the upper bound class of this constraint.
    #[must_use]
    pub const fn class(&self) -> ClassId {
        self.instance_of
    }

    /// Returns the excluded subclasses, sorted.
    #[must_use]
    pub fn excluded(&self) -> &[ClassId] {
        &self.excluded
    }

    /// Returns the hierarchy this constraint is expressed in.
    #[must_use]
    pub fn hierarchy(&self) -> &Arc<ClassHierarchy> {
        &self.hierarchy
    }

    fn same_hierarchy(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.hierarchy, &other.hierarchy)
    }

    fn with_excluded(
        &self,
        instance_of: ClassId,
        excluded: impl IntoIterator<Item = ClassId>,
    ) -> Self {
        let hierarchy = &self.hierarchy;
        let mut candidates: Vec<ClassId> = excluded
            .into_iter()
            .filter(|class| *class != instance_of && hierarchy.is_subclass(*class, instance_of))
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        let minimal: Vec<ClassId> = candidates
            .iter()
            .copied()
            .filter(|class| {
                !candidates
                    .iter()
                    .any(|other| other != class && hierarchy.is_subclass(*class, *other))
            })
            .collect();

        Self {
            hierarchy: Arc::clone(hierarchy),
            instance_of,
            excluded: minimal,
        }
    }
}

impl ExceptionType for TypeConstraint {
    fn meet(&self, other: &Self) -> Option<Self> {
        if !self.same_hierarchy(other) {
            return Some(self.clone());
        }

        let hierarchy = &self.hierarchy;
        let lower = if hierarchy.is_subclass(self.instance_of, other.instance_of) {
            self.instance_of
        } else if hierarchy.is_subclass(other.instance_of, self.instance_of) {
            other.instance_of
        } else {
            return None;
        };

        let excluded = self.excluded.iter().chain(other.excluded.iter()).copied();
        if excluded
            .clone()
            .any(|class| hierarchy.is_subclass(lower, class))
        {
            return None;
        }

        Some(self.with_excluded(lower, excluded))
    }

    fn exclude(&self, other: &Self) -> Option<Self> {
        if !self.same_hierarchy(other) {
            return Some(self.clone());
        }

        let hierarchy = &self.hierarchy;
        if hierarchy.is_subclass(self.instance_of, other.instance_of) {
            return None;
        }
        if !hierarchy.is_subclass(other.instance_of, self.instance_of) {
            return Some(self.clone());
        }
        if self
            .excluded
            .iter()
            .any(|class| hierarchy.is_subclass(other.instance_of, *class))
        {
            return Some(self.clone());
        }

        let excluded = self
            .excluded
            .iter()
            .copied()
            .chain(std::iter::once(other.instance_of));
        Some(self.with_excluded(self.instance_of, excluded))
    }
}

impl PartialEq for TypeConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.same_hierarchy(other)
            && self.instance_of == other.instance_of
            && self.excluded == other.excluded
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |class: ClassId| self.hierarchy.name(class).unwrap_or("?");
        write!(f, "{}", name(self.instance_of))?;
        if !self.excluded.is_empty() {
            let excluded: Vec<&str> = self.excluded.iter().map(|class| name(*class)).collect();
            write!(f, " \\ {{{}}}", excluded.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Debug for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeConstraint({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::factories::exception_hierarchy;

    #[test]
    fn test_is_subclass_walks_parents() {
        let hierarchy = exception_hierarchy();
        let throwable = hierarchy.lookup("Throwable").unwrap();
        let fnf = hierarchy.lookup("FileNotFoundException").unwrap();
        let runtime = hierarchy.lookup("RuntimeException").unwrap();

        assert!(hierarchy.is_subclass(fnf, throwable));
        assert!(hierarchy.is_subclass(fnf, fnf));
        assert!(!hierarchy.is_subclass(fnf, runtime));
    }

    #[test]
    fn test_add_existing_name_returns_same_id() {
        let mut hierarchy = ClassHierarchy::new();
        let a = hierarchy.add_root("A").unwrap();
        let again = hierarchy.add_root("A").unwrap();
        assert_eq!(a, again);
        assert_eq!(hierarchy.len(), 1);
    }

    #[test]
    fn test_class_ids_stop_at_the_u32_range() {
        assert_eq!(ClassHierarchy::next_id(0).unwrap(), ClassId(0));
        assert_eq!(
            ClassHierarchy::next_id(ClassHierarchy::MAX_CLASSES - 1).unwrap(),
            ClassId(u32::MAX - 1)
        );
        assert!(matches!(
            ClassHierarchy::next_id(ClassHierarchy::MAX_CLASSES),
            Err(Error::ClassLimit(limit)) if limit == ClassHierarchy::MAX_CLASSES
        ));
        assert!(matches!(
            ClassHierarchy::next_id(usize::MAX),
            Err(Error::ClassLimit(_))
        ));
    }

    #[test]
    fn test_meet_of_related_classes_is_the_subclass() {
        let hierarchy = exception_hierarchy();
        let exception = TypeConstraint::named(&hierarchy, "Exception").unwrap();
        let io = TypeConstraint::named(&hierarchy, "IOException").unwrap();

        assert_eq!(exception.meet(&io), Some(io.clone()));
        assert_eq!(io.meet(&exception), Some(io));
    }

    #[test]
    fn test_meet_of_unrelated_classes_is_disjoint() {
        let hierarchy = exception_hierarchy();
        let io = TypeConstraint::named(&hierarchy, "IOException").unwrap();
        let runtime = TypeConstraint::named(&hierarchy, "RuntimeException").unwrap();

        assert_eq!(io.meet(&runtime), None);
    }

    #[test]
    fn test_exclude_subclass_leaves_remainder() {
        let hierarchy = exception_hierarchy();
        let exception = TypeConstraint::named(&hierarchy, "Exception").unwrap();
        let io = TypeConstraint::named(&hierarchy, "IOException").unwrap();
        let fnf = TypeConstraint::named(&hierarchy, "FileNotFoundException").unwrap();

        let rest = exception.exclude(&io).unwrap();
        assert_eq!(rest.to_string(), "Exception \\ {IOException}");

        // Already excluded through its parent.
        assert_eq!(rest.meet(&fnf), None);
        assert_eq!(rest.exclude(&fnf), Some(rest.clone()));
        // Fully covered.
        assert_eq!(io.exclude(&exception), None);
    }

    #[test]
    fn test_exclude_keeps_minimal_set() {
        let hierarchy = exception_hierarchy();
        let exception = TypeConstraint::named(&hierarchy, "Exception").unwrap();
        let io = TypeConstraint::named(&hierarchy, "IOException").unwrap();
        let fnf = TypeConstraint::named(&hierarchy, "FileNotFoundException").unwrap();

        let rest = exception.exclude(&fnf).unwrap().exclude(&io).unwrap();
        assert_eq!(rest.excluded(), &[io.class()]);
    }

    #[test]
    fn test_exclude_unrelated_is_identity() {
        let hierarchy = exception_hierarchy();
        let io = TypeConstraint::named(&hierarchy, "IOException").unwrap();
        let runtime = TypeConstraint::named(&hierarchy, "RuntimeException").unwrap();

        assert_eq!(io.exclude(&runtime), Some(io.clone()));
    }

    #[test]
    fn test_meet_carries_exclusions() {
        let hierarchy = exception_hierarchy();
        let throwable = TypeConstraint::named(&hierarchy, "Throwable").unwrap();
        let exception = TypeConstraint::named(&hierarchy, "Exception").unwrap();
        let io = TypeConstraint::named(&hierarchy, "IOException").unwrap();

        let rest = throwable.exclude(&io).unwrap();
        let narrowed = rest.meet(&exception).unwrap();
        assert_eq!(narrowed.to_string(), "Exception \\ {IOException}");
    }
}
