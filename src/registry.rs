//! Context type registry.
//!
//! Maps (owner type name, method name) to the ordered field list a compiled
//! method body runs against. The host populates the registry during startup,
//! before any compilation job; the compiler only reads it.

use crate::engine::value::FieldType;
use crate::error::RegistryError;
use std::collections::HashMap;
use std::sync::Arc;

/// Ordered, named, typed field list exposed to a compiled method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDescriptor {
    pub owner: String,
    pub fields: Vec<(String, FieldType)>,
}

impl ContextDescriptor {
    pub fn new(
        owner: impl Into<String>,
        fields: impl IntoIterator<Item = (impl Into<String>, FieldType)>,
    ) -> Self {
        Self {
            owner: owner.into(),
            fields: fields.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }
}

#[derive(Debug, Default)]
pub struct ContextRegistry {
    contexts: HashMap<(String, String), Arc<ContextDescriptor>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a descriptor with one or more method names under an owner
    /// type. A pair that is already registered is rejected; the first
    /// registration wins.
    pub fn register(
        &mut self,
        owner: &str,
        methods: &[&str],
        descriptor: ContextDescriptor,
    ) -> Result<(), RegistryError> {
        for method in methods {
            let key = (owner.to_string(), method.to_string());
            if self.contexts.contains_key(&key) {
                return Err(RegistryError::DuplicateContext {
                    owner: owner.to_string(),
                    method: method.to_string(),
                });
            }
        }
        let descriptor = Arc::new(descriptor);
        for method in methods {
            self.contexts.insert(
                (owner.to_string(), method.to_string()),
                Arc::clone(&descriptor),
            );
        }
        Ok(())
    }

    pub fn lookup(&self, owner: &str, method: &str) -> Option<Arc<ContextDescriptor>> {
        self.contexts
            .get(&(owner.to_string(), method.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
