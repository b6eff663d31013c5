//! Persistence boundary.
//!
//! The codec never owns storage: it reads a base entity's type tag and asks a
//! [`Store`] for the concrete record. [`MemoryStore`] keeps one table per type
//! and writes each entity into its own table and every ancestor's, the way a
//! table-per-type layout exposes a subtype row through its parents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, LoadError, StoreError};
use crate::types::{TypeHierarchy, TypeName};

/// A stored record: identity, type tag and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub id: u64,
    /// Concrete type of the record. Set once when the record is created.
    #[serde(rename = "type", default)]
    pub type_tag: Option<TypeName>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn new(id: u64, type_tag: impl Into<TypeName>) -> Self {
        Self {
            id,
            type_tag: Some(type_tag.into()),
            attributes: Map::new(),
        }
    }

    /// An entity whose type tag was never recorded.
    pub fn untagged(id: u64) -> Self {
        Self {
            id,
            type_tag: None,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

/// Read access to persisted entities.
pub trait Store {
    /// Fetch the record `id` narrowed to `type_name`.
    ///
    /// Returns `Ok(None)` when no such record exists for that type.
    fn fetch_by_id(&self, type_name: &TypeName, id: u64) -> Result<Option<Entity>, StoreError>;

    /// Every record visible through `type_name`'s table.
    ///
    /// Order is unspecified and the sequence is not restartable.
    fn query_all<'a>(
        &'a self,
        type_name: &TypeName,
    ) -> Result<Box<dyn Iterator<Item = Entity> + 'a>, StoreError>;
}

/// In-memory [`Store`] with one table per type.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    hierarchy: TypeHierarchy,
    tables: BTreeMap<TypeName, BTreeMap<u64, Entity>>,
}

impl MemoryStore {
    pub fn new(hierarchy: TypeHierarchy) -> Self {
        Self {
            hierarchy,
            tables: BTreeMap::new(),
        }
    }

    /// Build a store from a JSON array of entities (`{id, type, attributes}`).
    ///
    /// Each entity is written to its type tag's table.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDocument` if the dump is malformed or an
    /// entity has no type, and `LoadError::Config` for unknown types.
    pub fn from_dump(hierarchy: TypeHierarchy, dump: &Value) -> Result<Self, LoadError> {
        let entities: Vec<Entity> =
            serde_json::from_value(dump.clone()).map_err(|e| LoadError::InvalidDocument {
                message: format!("store dump: {}", e),
            })?;

        let mut store = Self::new(hierarchy);
        for entity in entities {
            let table = entity
                .type_tag
                .clone()
                .ok_or_else(|| LoadError::InvalidDocument {
                    message: format!("store dump: entity {} has no type", entity.id),
                })?;
            store.insert(&table, entity)?;
        }
        Ok(store)
    }

    /// Write `entity` into `table` and every ancestor table of it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownType` if `table` is not in the hierarchy.
    pub fn insert(&mut self, table: &TypeName, entity: Entity) -> Result<(), ConfigError> {
        let ancestry: Vec<TypeName> = self
            .hierarchy
            .ancestry(table)?
            .into_iter()
            .cloned()
            .collect();
        for ty in ancestry {
            self.tables
                .entry(ty)
                .or_default()
                .insert(entity.id, entity.clone());
        }
        Ok(())
    }

    /// Remove record `id` from a single table, leaving ancestor rows behind.
    pub fn remove(&mut self, table: &TypeName, id: u64) -> Option<Entity> {
        self.tables.get_mut(table).and_then(|t| t.remove(&id))
    }
}

impl Store for MemoryStore {
    fn fetch_by_id(&self, type_name: &TypeName, id: u64) -> Result<Option<Entity>, StoreError> {
        Ok(self
            .tables
            .get(type_name)
            .and_then(|t| t.get(&id))
            .cloned())
    }

    fn query_all<'a>(
        &'a self,
        type_name: &TypeName,
    ) -> Result<Box<dyn Iterator<Item = Entity> + 'a>, StoreError> {
        match self.tables.get(type_name) {
            Some(table) => Ok(Box::new(table.values().cloned())),
            None => Ok(Box::new(std::iter::empty())),
        }
    }
}
