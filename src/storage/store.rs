//! sled-backed JSON store.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),

    #[error("value codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the faucet database. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: sled::Db,
}

impl Store {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = sled::Config::default().path(path).open()?;
        tracing::info!(path = %path.display(), "Store opened");
        Ok(Self { db })
    }

    /// In-memory database removed on drop.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::default().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Open a named key namespace.
    pub fn namespace(&self, name: &str) -> StoreResult<Namespace> {
        let tree = self.db.open_tree(name)?;
        Ok(Namespace {
            name: name.to_string(),
            tree,
        })
    }

    /// Flush all dirty buffers to disk.
    pub async fn flush(&self) -> StoreResult<()> {
        let bytes = self.db.flush_async().await?;
        tracing::debug!(bytes, "Store flushed");
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("trees", &self.db.tree_names().len())
            .finish()
    }
}

/// A keyspace inside the store holding JSON values.
#[derive(Clone)]
pub struct Namespace {
    name: String,
    tree: sled::Tree,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Atomically apply `f` to the current value and store its result.
    ///
    /// `f` may run more than once under contention and must be pure. A value
    /// that fails to decode is passed to `f` as `None`. Returning `None`
    /// deletes the key.
    pub fn update_json<T, F>(&self, key: &str, f: F) -> StoreResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(Option<T>) -> Option<T>,
    {
        let updated = self.tree.update_and_fetch(key.as_bytes(), |old| {
            let current = old.and_then(|bytes| serde_json::from_slice::<T>(bytes).ok());
            f(current).and_then(|next| serde_json::to_vec(&next).ok())
        })?;

        match updated {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Atomically remove `key`, returning the value it held.
    pub fn take_json<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.tree.remove(key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Remove `key`. Returns whether it existed.
    pub fn remove(&self, key: &str) -> StoreResult<bool> {
        Ok(self.tree.remove(key.as_bytes())?.is_some())
    }

    pub fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.tree.contains_key(key.as_bytes())?)
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.tree.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let store = Store::temporary().unwrap();
        let ns = store.namespace("test").unwrap();

        assert_eq!(ns.get_json::<Vec<u64>>("k").unwrap(), None);
        ns.put_json("k", &vec![1u64, 2, 3]).unwrap();
        assert_eq!(ns.get_json::<Vec<u64>>("k").unwrap(), Some(vec![1, 2, 3]));
        assert!(ns.contains("k").unwrap());
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = Store::temporary().unwrap();
        let a = store.namespace("a").unwrap();
        let b = store.namespace("b").unwrap();

        a.put_json("key", &1u64).unwrap();
        assert!(!b.contains("key").unwrap());
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_update_json() {
        let store = Store::temporary().unwrap();
        let ns = store.namespace("test").unwrap();

        let push = |v: Option<Vec<u64>>| {
            let mut v = v.unwrap_or_default();
            v.push(7);
            Some(v)
        };
        assert_eq!(ns.update_json("k", push).unwrap(), Some(vec![7]));
        assert_eq!(ns.update_json("k", push).unwrap(), Some(vec![7, 7]));

        assert_eq!(ns.update_json::<Vec<u64>, _>("k", |_| None).unwrap(), None);
        assert!(!ns.contains("k").unwrap());
    }

    #[test]
    fn test_take_is_single_shot() {
        let store = Store::temporary().unwrap();
        let ns = store.namespace("test").unwrap();

        ns.put_json("nonce", &42u64).unwrap();
        assert_eq!(ns.take_json::<u64>("nonce").unwrap(), Some(42));
        assert_eq!(ns.take_json::<u64>("nonce").unwrap(), None);
        assert!(!ns.remove("nonce").unwrap());
    }

    #[tokio::test]
    async fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("faucet.db")).unwrap();
        let ns = store.namespace("test").unwrap();
        ns.put_json("k", &5u64).unwrap();
        store.flush().await.unwrap();
        assert_eq!(ns.get_json::<u64>("k").unwrap(), Some(5));
    }

    #[test]
    fn test_decode_error() {
        let store = Store::temporary().unwrap();
        let ns = store.namespace("test").unwrap();

        ns.put_json("k", &"text").unwrap();
        assert!(matches!(ns.get_json::<u64>("k"), Err(StoreError::Codec(_))));
    }
}
