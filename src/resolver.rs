//! Leaf resolution - turns a base-typed handle into its concrete variant.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::EncodeError;
use crate::registry::{VariantEntry, VariantRegistry};
use crate::store::{Entity, Store};
use crate::types::{json_type_name, TypeName, ID_ATTRIBUTE};

/// Something the codec can encode.
#[derive(Debug, Clone, Copy)]
pub enum Handle<'a> {
    /// A persisted base entity, resolved through its type tag.
    Entity(&'a Entity),
    /// An already-decoded record, resolved through its discriminator field.
    Mapping(&'a Value),
}

impl<'a> From<&'a Entity> for Handle<'a> {
    fn from(entity: &'a Entity) -> Self {
        Handle::Entity(entity)
    }
}

impl<'a> From<&'a Value> for Handle<'a> {
    fn from(value: &'a Value) -> Self {
        Handle::Mapping(value)
    }
}

/// A resolved leaf: the concrete type, its registry entry and the attribute
/// view contracts render from.
#[derive(Debug)]
pub struct Leaf<'r> {
    /// Most-derived type of the handle. May be a subtype of `entry`'s type.
    pub concrete_type: TypeName,
    pub entry: &'r VariantEntry,
    /// Attributes plus `id` and the discriminator field.
    pub view: Map<String, Value>,
}

/// Resolves handles against a registry and a store.
#[derive(Debug)]
pub struct LeafResolver<'r, S: ?Sized> {
    registry: &'r VariantRegistry,
    store: &'r S,
}

impl<'r, S: Store + ?Sized> LeafResolver<'r, S> {
    pub fn new(registry: &'r VariantRegistry, store: &'r S) -> Self {
        Self { registry, store }
    }

    /// Resolve `handle` to its leaf.
    ///
    /// Entities are re-fetched from the store narrowed to their type tag;
    /// mappings are resolved by their discriminator value. Resolution does
    /// not mutate anything, so repeated calls agree.
    ///
    /// # Errors
    ///
    /// - `MissingTypeTag` / `LeafNotFound` / `Store` for entity handles
    /// - `NotAnObject` / `MissingDiscriminator` / `UnknownDiscriminator` for mappings
    /// - `Config(UnregisteredType)` when the type tag has no registered ancestor
    pub fn resolve(&self, handle: Handle<'_>) -> Result<Leaf<'r>, EncodeError> {
        match handle {
            Handle::Entity(entity) => self.resolve_entity(entity),
            Handle::Mapping(value) => self.resolve_mapping(value),
        }
    }

    fn resolve_entity(&self, entity: &Entity) -> Result<Leaf<'r>, EncodeError> {
        let tag = entity
            .type_tag
            .as_ref()
            .ok_or(EncodeError::MissingTypeTag { id: entity.id })?;

        let leaf = self
            .store
            .fetch_by_id(tag, entity.id)
            .map_err(|source| EncodeError::Store {
                type_tag: tag.to_string(),
                id: entity.id,
                source,
            })?
            .ok_or_else(|| EncodeError::LeafNotFound {
                type_tag: tag.to_string(),
                id: entity.id,
            })?;

        let entry = self.registry.entry_for_type(tag)?;

        let mut view = leaf.attributes;
        view.insert(ID_ATTRIBUTE.to_string(), Value::from(leaf.id));
        view.insert(
            self.registry.discriminator_field().to_string(),
            Value::String(entry.discriminator().to_string()),
        );

        debug!(
            id = entity.id,
            type_tag = tag.as_str(),
            variant = entry.type_name().as_str(),
            "resolved leaf by type tag"
        );

        Ok(Leaf {
            concrete_type: tag.clone(),
            entry,
            view,
        })
    }

    fn resolve_mapping(&self, value: &Value) -> Result<Leaf<'r>, EncodeError> {
        let map = value.as_object().ok_or_else(|| EncodeError::NotAnObject {
            actual: json_type_name(value).to_string(),
        })?;

        let field = self.registry.discriminator_field();
        let discriminator = map
            .get(field)
            .ok_or_else(|| EncodeError::MissingDiscriminator {
                field: field.to_string(),
            })?;

        let entry = discriminator
            .as_str()
            .and_then(|d| self.registry.entry_for_discriminator(d))
            .ok_or_else(|| EncodeError::UnknownDiscriminator {
                field: field.to_string(),
                value: discriminator_text(discriminator),
            })?;

        debug!(
            discriminator = entry.discriminator(),
            variant = entry.type_name().as_str(),
            "resolved leaf by discriminator"
        );

        Ok(Leaf {
            concrete_type: entry.type_name().clone(),
            entry,
            view: map.clone(),
        })
    }
}

pub(crate) fn discriminator_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
