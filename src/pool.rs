//! Object pool: the load-time result of the compilation pipeline.
//!
//! Keys are `"OwnerType.objectName"`. Entries are atomic: an entry is
//! either absent or carries every method parsed for its segment, and a
//! recompile replaces entries wholesale after `clear()`.

use crate::unit::ExecutableUnit;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PoolError;

/// One compiled script object: method name -> executable unit.
#[derive(Debug)]
pub struct ObjectEntry {
    owner: String,
    name: String,
    methods: HashMap<String, Arc<ExecutableUnit>>,
}

impl ObjectEntry {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        methods: HashMap<String, Arc<ExecutableUnit>>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            methods,
        }
    }

    /// Pool key, `"OwnerType.objectName"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&Arc<ExecutableUnit>> {
        self.methods.get(name)
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Repository of compiled entries. Shared between the compilation job
/// (writer) and host bindings (readers) via [`SharedPool`].
#[derive(Debug, Default)]
pub struct ObjectPool {
    entries: HashMap<String, Arc<ObjectEntry>>,
}

/// Pool handle shared between the job task and binding callers.
pub type SharedPool = Arc<tokio::sync::RwLock<ObjectPool>>;

pub fn shared_pool() -> SharedPool {
    Arc::new(tokio::sync::RwLock::new(ObjectPool::new()))
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a completed entry. Duplicate keys are an error, never an
    /// overwrite.
    pub fn insert(&mut self, entry: Arc<ObjectEntry>) -> Result<(), PoolError> {
        let key = entry.key();
        if self.entries.contains_key(&key) {
            return Err(PoolError::DuplicateKey(key));
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Arc<ObjectEntry>> {
        self.entries.get(key).cloned()
    }

    /// Empties the pool at the start of a full recompile.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
