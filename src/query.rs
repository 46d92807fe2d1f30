//! Query keys and a small invalidation-aware cache.
//!
//! Keys are ordered segments; invalidating a key also invalidates every
//! key it prefixes, so `["appointments"]` covers every page.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn appointments() -> Self {
        Self::new(["appointments"])
    }

    pub fn appointments_page(page: u32) -> Self {
        Self::new(["appointments".to_string(), format!("page={page}")])
    }

    pub fn appointment(id: Uuid) -> Self {
        Self::new(["appointment".to_string(), id.to_string()])
    }

    pub fn users() -> Self {
        Self::new(["users"])
    }

    pub fn users_page(page: u32) -> Self {
        Self::new(["users".to_string(), format!("page={page}")])
    }

    pub fn current_user() -> Self {
        Self::new(["currentUser"])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True when `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &QueryKey) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

struct Entry {
    value: Box<dyn Any>,
    stale: bool,
}

/// Cached results of backend reads, keyed by `QueryKey`.
#[derive(Default)]
pub struct QueryClient {
    entries: RefCell<HashMap<QueryKey, Entry>>,
    invalidated: RefCell<Vec<QueryKey>>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, or the result of `load` when missing or stale.
    /// Failed loads are not cached.
    pub fn fetch<T, E, F>(&self, key: &QueryKey, load: F) -> Result<T, E>
    where
        T: Clone + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(entry) = self.entries.borrow().get(key) {
            if !entry.stale {
                if let Some(value) = entry.value.downcast_ref::<T>() {
                    return Ok(value.clone());
                }
            }
        }

        tracing::debug!(key = %key, "Query miss, loading");
        let value = load()?;
        self.entries.borrow_mut().insert(
            key.clone(),
            Entry {
                value: Box::new(value.clone()),
                stale: false,
            },
        );
        Ok(value)
    }

    /// Store a value directly, e.g. the record returned by a mutation.
    pub fn set<T: 'static>(&self, key: &QueryKey, value: T) {
        self.entries.borrow_mut().insert(
            key.clone(),
            Entry {
                value: Box::new(value),
                stale: false,
            },
        );
    }

    /// Mark `prefix` and every key under it stale.
    pub fn invalidate(&self, prefix: &QueryKey) {
        tracing::debug!(prefix = %prefix, "Invalidating queries");
        for (key, entry) in self.entries.borrow_mut().iter_mut() {
            if prefix.is_prefix_of(key) {
                entry.stale = true;
            }
        }
        self.invalidated.borrow_mut().push(prefix.clone());
    }

    pub fn invalidate_all(&self) {
        tracing::debug!("Invalidating all queries");
        for entry in self.entries.borrow_mut().values_mut() {
            entry.stale = true;
        }
        self.invalidated.borrow_mut().push(QueryKey::new(Vec::<String>::new()));
    }

    /// True when no fresh value is cached for `key`.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.borrow().get(key).map_or(true, |e| e.stale)
    }

    /// Every invalidation prefix so far, oldest first. The empty key
    /// stands for `invalidate_all`.
    pub fn invalidated(&self) -> Vec<QueryKey> {
        self.invalidated.borrow().clone()
    }

    pub fn was_invalidated(&self, key: &QueryKey) -> bool {
        self.invalidated.borrow().iter().any(|k| k == key)
    }
}
