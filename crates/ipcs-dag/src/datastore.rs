//! Key-value datastores.
//!
//! [`Datastore`] is the plain, single-owner interface; [`MutexDatastore`]
//! wraps any of them into a [`ThreadSafeDatastore`] that can be shared
//! between the components of a running node.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A slash-separated datastore key such as `/blocks/Qm...`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Create a key, normalising it to a single leading slash and no
    /// trailing slash.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let parts: Vec<&str> = raw.as_ref().split('/').filter(|p| !p.is_empty()).collect();
        Key(format!("/{}", parts.join("/")))
    }

    /// Append a path segment.
    pub fn child(&self, name: impl AsRef<str>) -> Self {
        Key::new(format!("{}/{}", self.0, name.as_ref()))
    }

    /// Check whether this key lives strictly below `prefix`.
    pub fn is_descendant_of(&self, prefix: &Key) -> bool {
        if prefix.0 == "/" {
            return self.0 != "/";
        }
        self.0.len() > prefix.0.len()
            && self.0.starts_with(&prefix.0)
            && self.0.as_bytes()[prefix.0.len()] == b'/'
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors returned by datastores.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatastoreError {
    #[error("key not found: {0}")]
    NotFound(Key),

    #[error("datastore backend error: {0}")]
    Backend(String),
}

/// A single-owner key-value store.
pub trait Datastore {
    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<(), DatastoreError>;

    fn get(&self, key: &Key) -> Result<Vec<u8>, DatastoreError>;

    fn has(&self, key: &Key) -> Result<bool, DatastoreError>;

    /// Delete a key. Deleting an absent key fails with `NotFound`.
    fn delete(&mut self, key: &Key) -> Result<(), DatastoreError>;

    /// All keys strictly below `prefix`, sorted.
    fn keys(&self, prefix: &Key) -> Result<Vec<Key>, DatastoreError>;
}

/// A key-value store that may be shared across threads.
pub trait ThreadSafeDatastore: Send + Sync {
    fn put(&self, key: Key, value: Vec<u8>) -> Result<(), DatastoreError>;

    fn get(&self, key: &Key) -> Result<Vec<u8>, DatastoreError>;

    fn has(&self, key: &Key) -> Result<bool, DatastoreError>;

    fn delete(&self, key: &Key) -> Result<(), DatastoreError>;

    fn keys(&self, prefix: &Key) -> Result<Vec<Key>, DatastoreError>;
}

/// In-memory datastore backed by a `HashMap`.
#[derive(Clone, Debug, Default)]
pub struct MapDatastore {
    values: HashMap<Key, Vec<u8>>,
}

impl MapDatastore {
    pub fn new() -> Self {
        MapDatastore::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Datastore for MapDatastore {
    fn put(&mut self, key: Key, value: Vec<u8>) -> Result<(), DatastoreError> {
        self.values.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &Key) -> Result<Vec<u8>, DatastoreError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| DatastoreError::NotFound(key.clone()))
    }

    fn has(&self, key: &Key) -> Result<bool, DatastoreError> {
        Ok(self.values.contains_key(key))
    }

    fn delete(&mut self, key: &Key) -> Result<(), DatastoreError> {
        self.values
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| DatastoreError::NotFound(key.clone()))
    }

    fn keys(&self, prefix: &Key) -> Result<Vec<Key>, DatastoreError> {
        let mut keys: Vec<Key> = self
            .values
            .keys()
            .filter(|k| k.is_descendant_of(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Serialises every access to an inner [`Datastore`] through a mutex.
#[derive(Debug, Default)]
pub struct MutexDatastore<D> {
    inner: Mutex<D>,
}

impl<D: Datastore> MutexDatastore<D> {
    pub fn new(inner: D) -> Self {
        MutexDatastore {
            inner: Mutex::new(inner),
        }
    }

    /// Unwrap the inner datastore.
    pub fn into_inner(self) -> D {
        self.inner.into_inner()
    }
}

impl<D: Datastore + Send> ThreadSafeDatastore for MutexDatastore<D> {
    fn put(&self, key: Key, value: Vec<u8>) -> Result<(), DatastoreError> {
        self.inner.lock().put(key, value)
    }

    fn get(&self, key: &Key) -> Result<Vec<u8>, DatastoreError> {
        self.inner.lock().get(key)
    }

    fn has(&self, key: &Key) -> Result<bool, DatastoreError> {
        self.inner.lock().has(key)
    }

    fn delete(&self, key: &Key) -> Result<(), DatastoreError> {
        self.inner.lock().delete(key)
    }

    fn keys(&self, prefix: &Key) -> Result<Vec<Key>, DatastoreError> {
        self.inner.lock().keys(prefix)
    }
}
