use std::collections::HashMap;
use std::sync::Arc;

use crate::injectable::DynProvider;
use crate::{Injectable, Key, Param};

/// Ordered set of provider rules.
///
/// Each rule maps the type a provider produces to the provider itself.
/// Registering a provider for a type that already has one replaces it in its
/// original position, so iteration order is the order in which types were
/// first registered.
///
/// # Examples
///
/// ```rust
/// use weir::{Args, Injectable, Key, Param, Registry, StdError};
///
/// #[derive(Clone)]
/// struct Answer(u32);
///
/// struct AnswerProvider;
///
/// impl Injectable for AnswerProvider {
///     type Output = Answer;
///
///     fn params(&self) -> Vec<Param> {
///         Vec::new()
///     }
///
///     async fn call(&self, _args: Args<'_>) -> Result<Answer, StdError> {
///         Ok(Answer(42))
///     }
/// }
///
/// let registry = Registry::new().with(AnswerProvider);
/// assert!(registry.provides::<Answer>());
/// assert!(registry.rule(Key::of::<Answer>()).unwrap().requires.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct Registry {
    providers: Vec<Arc<dyn DynProvider>>,
    index: HashMap<Key, usize>,
}

/// Description of one registered provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub produces: Key,
    pub requires: Vec<Param>,
    pub name: &'static str,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider for the type it produces.
    pub fn register<T>(&mut self, provider: T) -> &mut Self
    where
        T: Injectable,
        T::Output: Clone + Sync,
    {
        self.insert(Arc::new(provider));
        self
    }

    pub fn with<T>(mut self, provider: T) -> Self
    where
        T: Injectable,
        T::Output: Clone + Sync,
    {
        self.register(provider);
        self
    }

    /// Registers every provider of `other`, in its order, over this registry.
    pub fn merge(&mut self, other: Registry) -> &mut Self {
        for provider in other.providers {
            self.insert(provider);
        }
        self
    }

    pub fn rule(&self, key: Key) -> Option<Rule> {
        self.provider(key).map(|v| Rule {
            produces: v.produces(),
            requires: v.requires(),
            name: v.name(),
        })
    }

    pub fn contains(&self, key: Key) -> bool {
        self.index.contains_key(&key)
    }

    pub fn provides<T>(&self) -> bool
    where
        T: 'static,
    {
        self.contains(Key::of::<T>())
    }

    /// Produced types in registration order.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.providers.iter().map(|v| v.produces())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub(crate) fn provider(&self, key: Key) -> Option<&Arc<dyn DynProvider>> {
        self.index.get(&key).map(|&v| &self.providers[v])
    }

    fn insert(&mut self, provider: Arc<dyn DynProvider>) {
        let key = provider.produces();
        match self.index.get(&key) {
            Some(&position) => {
                tracing::debug!(
                    key = key.name(),
                    provider = provider.name(),
                    "Provider replaced"
                );
                self.providers[position] = provider;
            }
            None => {
                self.index.insert(key, self.providers.len());
                self.providers.push(provider);
            }
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|v| v.name()))
            .finish()
    }
}
