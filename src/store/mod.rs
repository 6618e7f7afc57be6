#![forbid(unsafe_code)]

//! Durable, insertion-ordered collections, one serialized document per
//! entity kind.
//!
//! Every collection is stored in the wrapped shape `{"<kind>": [...]}`. The
//! bare-array shape written by older versions is still readable and is
//! rewritten into the wrapped shape by [`RecordStore::open`].

pub mod medium;

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{BoardError, Result};

pub use medium::{FileMedium, Medium, MemoryMedium};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Projects,
    Tasks,
}

impl EntityKind {
    pub const ALL: [Self; 2] = [Self::Projects, Self::Tasks];

    /// Key wrapping the document array, e.g. `{"tasks": [...]}`.
    #[must_use]
    pub fn collection_key(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Tasks => "tasks",
        }
    }

    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Projects => "projects.json",
            Self::Tasks => "tasks.json",
        }
    }

    fn singular(self) -> &'static str {
        match self {
            Self::Projects => "project",
            Self::Tasks => "task",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

/// A document that lives in one of the store's collections.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Fills in fields that older versions did not write. Runs on every
    /// stored document before it is decoded; returns whether `doc` changed.
    fn upgrade(_doc: &mut Value) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Wrapped,
    Bare,
    MissingKey,
}

#[derive(Debug)]
pub struct RecordStore {
    medium: Box<dyn Medium>,
    pretty: bool,
    projects_lock: Mutex<()>,
    tasks_lock: Mutex<()>,
}

impl RecordStore {
    /// Opens a store over `medium`, creating missing collections and
    /// normalizing legacy shapes in place.
    pub fn open(medium: impl Medium + 'static) -> Result<Self> {
        let store = Self {
            medium: Box::new(medium),
            pretty: true,
            projects_lock: Mutex::new(()),
            tasks_lock: Mutex::new(()),
        };
        for kind in EntityKind::ALL {
            store.initialize(kind)?;
        }
        Ok(store)
    }

    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// All documents of `T`'s collection in insertion order.
    pub fn load<T: Record>(&self) -> Result<Vec<T>> {
        let kind = T::KIND;
        let Some(data) = self.medium.read(kind)? else {
            tracing::debug!(%kind, "collection missing, initializing empty");
            self.write_values(kind, Vec::new())?;
            return Ok(Vec::new());
        };
        let Some((mut items, shape)) = decode(kind, &data)? else {
            self.write_values(kind, Vec::new())?;
            return Ok(Vec::new());
        };
        if shape == Shape::Bare {
            tracing::warn!(%kind, "collection stored in legacy bare-array shape");
        }
        let upgraded = items
            .iter_mut()
            .map(T::upgrade)
            .filter(|changed| *changed)
            .count();
        if upgraded > 0 {
            tracing::warn!(%kind, count = upgraded, "filled in fields missing from legacy documents");
        }
        let docs: Vec<T> = serde_json::from_value(Value::Array(items))
            .map_err(|e| corrupted(kind, format!("invalid document: {e}")))?;
        tracing::debug!(%kind, count = docs.len(), "loaded collection");
        Ok(docs)
    }

    pub fn get<T: Record>(&self, id: &str) -> Result<T> {
        self.load::<T>()?
            .into_iter()
            .find(|d| d.id() == id)
            .ok_or_else(|| BoardError::not_found(T::KIND, id))
    }

    /// Replaces the whole collection. Does not take the collection's write
    /// lock; callers doing read-modify-write hold it via [`Self::write_lock`].
    pub fn save_all<T: Record>(&self, docs: &[T]) -> Result<()> {
        let kind = T::KIND;
        let items = docs
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupted(kind, format!("failed to encode document: {e}")))?;
        self.write_values(kind, items)?;
        tracing::debug!(%kind, count = docs.len(), "saved collection");
        Ok(())
    }

    pub fn insert<T: Record>(&self, doc: T) -> Result<T> {
        let _guard = self.write_lock(T::KIND);
        let mut docs = self.load::<T>()?;
        if docs.iter().any(|d| d.id() == doc.id()) {
            return Err(BoardError::validation(format!(
                "{} id '{}' already exists",
                T::KIND,
                doc.id()
            )));
        }
        docs.push(doc.clone());
        self.save_all(&docs)?;
        Ok(doc)
    }

    /// Applies `f` to the document with `id` and persists the result. Nothing
    /// is written when `f` fails.
    pub fn update<T, F>(&self, id: &str, f: F) -> Result<T>
    where
        T: Record,
        F: FnOnce(&mut T) -> Result<()>,
    {
        let _guard = self.write_lock(T::KIND);
        let mut docs = self.load::<T>()?;
        let doc = docs
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or_else(|| BoardError::not_found(T::KIND, id))?;
        let mut next = doc.clone();
        f(&mut next)?;
        *doc = next.clone();
        self.save_all(&docs)?;
        Ok(next)
    }

    pub fn delete<T: Record>(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock(T::KIND);
        let mut docs = self.load::<T>()?;
        let before = docs.len();
        docs.retain(|d| d.id() != id);
        if docs.len() == before {
            return Err(BoardError::not_found(T::KIND, id));
        }
        self.save_all(&docs)
    }

    /// Serializes writers of one collection. Multi-collection writers lock
    /// projects before tasks.
    pub(crate) fn write_lock(&self, kind: EntityKind) -> MutexGuard<'_, ()> {
        let lock = match kind {
            EntityKind::Projects => &self.projects_lock,
            EntityKind::Tasks => &self.tasks_lock,
        };
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn initialize(&self, kind: EntityKind) -> Result<()> {
        let _guard = self.write_lock(kind);
        let Some(data) = self.medium.read(kind)? else {
            tracing::debug!(%kind, "creating empty collection");
            return self.write_values(kind, Vec::new());
        };
        match decode(kind, &data)? {
            None => self.write_values(kind, Vec::new()),
            Some((_, Shape::Wrapped)) => Ok(()),
            Some((items, Shape::Bare)) => {
                tracing::warn!(%kind, count = items.len(), "normalizing legacy bare-array collection");
                self.write_values(kind, items)
            }
            Some((_, Shape::MissingKey)) => {
                tracing::warn!(%kind, "collection key missing, resetting to empty collection");
                self.write_values(kind, Vec::new())
            }
        }
    }

    fn write_values(&self, kind: EntityKind, items: Vec<Value>) -> Result<()> {
        let mut root = serde_json::Map::new();
        root.insert(kind.collection_key().to_owned(), Value::Array(items));
        let root = Value::Object(root);
        let mut data = if self.pretty {
            serde_json::to_vec_pretty(&root)
        } else {
            serde_json::to_vec(&root)
        }
        .map_err(|e| corrupted(kind, format!("failed to encode collection: {e}")))?;
        data.push(b'\n');
        self.medium.write(kind, &data)
    }
}

/// Parses raw collection bytes. `None` means the medium holds no content yet.
fn decode(kind: EntityKind, data: &[u8]) -> Result<Option<(Vec<Value>, Shape)>> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let root: Value =
        serde_json::from_slice(data).map_err(|e| corrupted(kind, format!("invalid JSON: {e}")))?;
    match root {
        Value::Array(items) => Ok(Some((items, Shape::Bare))),
        Value::Object(mut map) => match map.remove(kind.collection_key()) {
            Some(Value::Array(items)) => Ok(Some((items, Shape::Wrapped))),
            None => Ok(Some((Vec::new(), Shape::MissingKey))),
            Some(other) => Err(corrupted(
                kind,
                format!(
                    "'{}' must be an array, found {}",
                    kind.collection_key(),
                    json_type(&other)
                ),
            )),
        },
        other => Err(corrupted(
            kind,
            format!("expected an object or array, found {}", json_type(&other)),
        )),
    }
}

fn corrupted(kind: EntityKind, msg: String) -> BoardError {
    BoardError::StoreCorrupted { kind, msg }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
