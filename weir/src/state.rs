use std::any::{Any, type_name};
use std::collections::HashMap;

use crate::{Key, Param};

pub(crate) type Value = Box<dyn Any + Send + Sync>;

/// Declared initial slots of an injector.
///
/// Initial slots are values supplied directly by the caller of
/// [`Injector::run`](crate::Injector::run) instead of being produced by a
/// provider. Declaration order matters: when several slots share a type, a
/// parameter bound by type takes the first one.
///
/// # Examples
///
/// ```rust
/// use weir::{Initial, Key};
///
/// struct Environ;
///
/// let initial = Initial::new()
///     .slot::<Environ>("environ")
///     .slot::<String>("path");
///
/// assert_eq!(initial.by_name("path").unwrap().key(), Key::of::<String>());
/// assert_eq!(initial.by_key(Key::of::<Environ>()).unwrap().name(), "environ");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Initial {
    slots: Vec<Param>,
}

impl Initial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a slot.
    ///
    /// # Panics
    ///
    /// Panics if a slot with the same name has already been declared.
    pub fn slot<T>(mut self, name: &'static str) -> Self
    where
        T: Send + Sync + 'static,
    {
        if self.by_name(name).is_some() {
            panic!("Initial slot {name} already declared");
        }
        self.slots.push(Param::new::<T>(name));
        self
    }

    pub fn by_name(&self, name: &str) -> Option<&Param> {
        self.slots.iter().find(|v| v.name() == name)
    }

    pub fn by_key(&self, key: Key) -> Option<&Param> {
        self.slots.iter().find(|v| v.key() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.slots.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Where a plan reads one argument from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// A named initial slot.
    Initial(&'static str),
    /// The value produced by the provider of this key.
    Provided(Key),
}

/// Per-call working map of an injector run.
///
/// A `State` is seeded with initial values by the caller and accumulates the
/// values produced by plan steps. Provided values stay in the state after the
/// run, so a second run against the same state (for example an error handler
/// after a failed handler) reuses them instead of calling providers again.
#[derive(Default)]
pub struct State {
    initial: HashMap<&'static str, Value>,
    provided: HashMap<Key, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of an initial slot, replacing any previous value.
    pub fn set<T>(&mut self, name: &'static str, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.initial.insert(name, Box::new(value));
        self
    }

    pub fn with<T>(mut self, name: &'static str, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.set(name, value);
        self
    }

    /// Removes the value of an initial slot, leaving it declared but absent.
    pub fn unset(&mut self, name: &str) -> &mut Self {
        self.initial.remove(name);
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.initial.contains_key(name)
    }

    pub fn get<T>(&self, name: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.get_ref(name).cloned()
    }

    pub fn get_ref<T>(&self, name: &str) -> Option<&T>
    where
        T: 'static,
    {
        self.initial.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns a value produced by a provider during a previous run.
    pub fn provided<T>(&self) -> Option<&T>
    where
        T: 'static,
    {
        self.provided
            .get(&Key::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Seeds a provided value so that the step producing it is skipped.
    pub fn provide<T>(&mut self, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.provided.insert(Key::of::<T>(), Box::new(value));
        self
    }

    pub(crate) fn contains(&self, source: &Source) -> bool {
        match source {
            Source::Initial(name) => self.initial.contains_key(name),
            Source::Provided(key) => self.provided.contains_key(key),
        }
    }

    pub(crate) fn value(&self, source: &Source) -> Option<&(dyn Any + Send + Sync)> {
        match source {
            Source::Initial(name) => self.initial.get(name).map(|v| v.as_ref()),
            Source::Provided(key) => self.provided.get(key).map(|v| v.as_ref()),
        }
    }

    pub(crate) fn insert_provided(&mut self, key: Key, value: Value) {
        self.provided.insert(key, value);
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut initial: Vec<_> = self.initial.keys().collect();
        initial.sort();
        f.debug_struct(type_name::<Self>())
            .field("initial", &initial)
            .field("provided", &self.provided.keys().collect::<Vec<_>>())
            .finish()
    }
}
