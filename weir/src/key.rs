use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of an injectable type.
///
/// A `Key` is what providers produce and what parameters ask for. Two keys are
/// equal when they were built from the same type; the stored type name is only
/// used for diagnostics.
///
/// # Examples
///
/// ```rust
/// use weir::Key;
///
/// struct Database;
///
/// assert_eq!(Key::of::<Database>(), Key::of::<Database>());
/// assert_ne!(Key::of::<Database>(), Key::of::<String>());
/// assert!(Key::of::<Database>().name().ends_with("Database"));
/// ```
#[derive(Clone, Copy)]
pub struct Key {
    id: TypeId,
    name: &'static str,
}

impl Key {
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A named formal parameter of an injectable callable.
///
/// The name takes part in binding: a parameter named like a declared initial
/// slot is bound to that slot before any type-based lookup happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    name: &'static str,
    key: Key,
}

impl Param {
    pub fn new<T>(name: &'static str) -> Self
    where
        T: 'static,
    {
        Self {
            name,
            key: Key::of::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> Key {
        self.key
    }
}
