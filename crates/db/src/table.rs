//! Indexed document table

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{DbError, DbResult};

/// A record that can live in a [`Table`].
pub trait Document: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static;

    /// Table name used in errors and logs
    const TABLE: &'static str;

    fn id(&self) -> &Self::Id;

    /// Keys this document claims in unique indexes.
    ///
    /// Leaving an index out of the returned list keeps the document out of
    /// that index, which makes optional fields behave as sparse indexes.
    fn unique_keys(&self) -> Vec<IndexKey> {
        Vec::new()
    }

    /// Keys for non-unique lookup indexes
    fn index_keys(&self) -> Vec<IndexKey> {
        Vec::new()
    }
}

/// Entry in a named index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey {
    pub index: &'static str,
    pub value: String,
}

impl IndexKey {
    pub fn new(index: &'static str, value: impl Into<String>) -> Self {
        Self {
            index,
            value: value.into(),
        }
    }
}

struct Inner<D: Document> {
    rows: HashMap<D::Id, D>,
    unique: HashMap<IndexKey, D::Id>,
    secondary: HashMap<IndexKey, HashSet<D::Id>>,
}

impl<D: Document> Inner<D> {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
            unique: HashMap::new(),
            secondary: HashMap::new(),
        }
    }

    fn check_unique(&self, doc: &D) -> DbResult<()> {
        for key in doc.unique_keys() {
            if let Some(owner) = self.unique.get(&key) {
                if owner != doc.id() {
                    return Err(DbError::Duplicate {
                        table: D::TABLE,
                        index: key.index,
                        value: key.value,
                    });
                }
            }
        }
        Ok(())
    }

    fn link(&mut self, doc: &D) {
        for key in doc.unique_keys() {
            self.unique.insert(key, doc.id().clone());
        }
        for key in doc.index_keys() {
            self.secondary
                .entry(key)
                .or_default()
                .insert(doc.id().clone());
        }
    }

    fn unlink(&mut self, doc: &D) {
        for key in doc.unique_keys() {
            if self.unique.get(&key) == Some(doc.id()) {
                self.unique.remove(&key);
            }
        }
        for key in doc.index_keys() {
            if let Some(ids) = self.secondary.get_mut(&key) {
                ids.remove(doc.id());
                if ids.is_empty() {
                    self.secondary.remove(&key);
                }
            }
        }
    }

    /// Writes `doc`, replacing and unindexing any previous version.
    /// Callers must have run `check_unique` first.
    fn store(&mut self, doc: D) {
        if let Some(previous) = self.rows.remove(doc.id()) {
            self.unlink(&previous);
        }
        self.link(&doc);
        self.rows.insert(doc.id().clone(), doc);
    }

    fn delete(&mut self, id: &D::Id) -> Option<D> {
        let doc = self.rows.remove(id)?;
        self.unlink(&doc);
        Some(doc)
    }
}

/// Thread-safe document table.
///
/// Every write validates unique indexes and updates all indexes under one
/// write lock, so each call is atomic with respect to every other call on
/// the same table. Reads take the shared lock and return clones.
pub struct Table<D: Document> {
    inner: RwLock<Inner<D>>,
}

impl<D: Document> Table<D> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }

    /// Table name
    pub fn name(&self) -> &'static str {
        D::TABLE
    }

    fn read(&self) -> DbResult<RwLockReadGuard<'_, Inner<D>>> {
        self.inner
            .read()
            .map_err(|_| DbError::Poisoned { table: D::TABLE })
    }

    fn write(&self) -> DbResult<RwLockWriteGuard<'_, Inner<D>>> {
        self.inner
            .write()
            .map_err(|_| DbError::Poisoned { table: D::TABLE })
    }

    pub fn len(&self) -> DbResult<usize> {
        Ok(self.read()?.rows.len())
    }

    pub fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, id: &D::Id) -> DbResult<Option<D>> {
        Ok(self.read()?.rows.get(id).cloned())
    }

    /// Insert a new document, failing on a taken id or unique key
    pub fn insert(&self, doc: D) -> DbResult<D> {
        let mut inner = self.write()?;
        if inner.rows.contains_key(doc.id()) {
            return Err(DbError::Duplicate {
                table: D::TABLE,
                index: "primary",
                value: doc.id().to_string(),
            });
        }
        inner.check_unique(&doc)?;
        inner.store(doc.clone());

        tracing::trace!(table = D::TABLE, id = %doc.id(), "document inserted");
        Ok(doc)
    }

    /// Overwrite an existing document
    pub fn replace(&self, doc: D) -> DbResult<D> {
        let mut inner = self.write()?;
        if !inner.rows.contains_key(doc.id()) {
            return Err(DbError::NotFound {
                table: D::TABLE,
                id: doc.id().to_string(),
            });
        }
        inner.check_unique(&doc)?;
        inner.store(doc.clone());
        Ok(doc)
    }

    /// Atomic read-modify-write of a single document.
    ///
    /// Returns `Ok(None)` when no document has the id. The closure must not
    /// change the document id.
    pub fn update<F>(&self, id: &D::Id, apply: F) -> DbResult<Option<D>>
    where
        F: FnOnce(&mut D),
    {
        let mut inner = self.write()?;
        let Some(current) = inner.rows.get(id) else {
            return Ok(None);
        };

        let mut next = current.clone();
        apply(&mut next);
        if next.id() != id {
            return Err(DbError::KeyChanged { table: D::TABLE });
        }

        inner.check_unique(&next)?;
        inner.store(next.clone());
        Ok(Some(next))
    }

    pub fn remove(&self, id: &D::Id) -> DbResult<Option<D>> {
        let removed = self.write()?.delete(id);
        if removed.is_some() {
            tracing::trace!(table = D::TABLE, id = %id, "document removed");
        }
        Ok(removed)
    }

    /// All documents filed under `value` in a secondary index, in no
    /// particular order
    pub fn find(&self, index: &'static str, value: &str) -> DbResult<Vec<D>> {
        let inner = self.read()?;
        let key = IndexKey::new(index, value);
        Ok(inner
            .secondary
            .get(&key)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.rows.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    pub fn find_unique(&self, index: &'static str, value: &str) -> DbResult<Option<D>> {
        let inner = self.read()?;
        let key = IndexKey::new(index, value);
        Ok(inner
            .unique
            .get(&key)
            .and_then(|id| inner.rows.get(id).cloned()))
    }

    /// Remove every document filed under `value` in a secondary index, in
    /// one critical section
    pub fn remove_indexed(&self, index: &'static str, value: &str) -> DbResult<Vec<D>> {
        let mut inner = self.write()?;
        let key = IndexKey::new(index, value);
        let ids: Vec<D::Id> = inner
            .secondary
            .get(&key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();

        let removed: Vec<D> = ids.iter().filter_map(|id| inner.delete(id)).collect();
        tracing::trace!(
            table = D::TABLE,
            index,
            count = removed.len(),
            "indexed documents removed"
        );
        Ok(removed)
    }

    /// Full scan with a filter
    pub fn scan<P>(&self, predicate: P) -> DbResult<Vec<D>>
    where
        P: Fn(&D) -> bool,
    {
        Ok(self
            .read()?
            .rows
            .values()
            .filter(|doc| predicate(doc))
            .cloned()
            .collect())
    }

    pub fn ids(&self) -> DbResult<Vec<D::Id>> {
        Ok(self.read()?.rows.keys().cloned().collect())
    }
}

impl<D: Document> Default for Table<D> {
    fn default() -> Self {
        Self::new()
    }
}
