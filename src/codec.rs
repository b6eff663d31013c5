//! Polymorphic codec: encodes base-typed handles as merged base + variant
//! records and validates incoming payloads against the variant their
//! discriminator names.

use serde_json::{Map, Value};
use tracing::debug;

use crate::contract::FieldErrors;
use crate::error::{EncodeError, UnsupportedOperation, ValidationFailure};
use crate::registry::VariantRegistry;
use crate::resolver::{Handle, LeafResolver};
use crate::store::{Entity, Store};
use crate::types::{json_type_name, TypeName, INVALID, NON_FIELD_ERRORS, REQUIRED};

/// Merge two rendered records.
///
/// Starts from `primary` and adds every key of `fallback` that `primary`
/// lacks, so `primary` wins on collisions. Not symmetric.
pub fn merge_records(
    mut primary: Map<String, Value>,
    fallback: &Map<String, Value>,
) -> Map<String, Value> {
    for (key, value) in fallback {
        if !primary.contains_key(key) {
            primary.insert(key.clone(), value.clone());
        }
    }
    primary
}

/// Result of decoding a payload. Never an error: failures are data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    /// Variant named by the payload's discriminator, once resolved.
    pub variant: Option<TypeName>,
    pub discriminator: Option<String>,
    /// Fields that passed validation, plus the discriminator.
    pub data: Map<String, Value>,
    pub errors: FieldErrors,
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub variant: TypeName,
    pub discriminator: String,
    pub data: Map<String, Value>,
}

impl Validation {
    /// True when the discriminator resolved and the variant contract accepted the payload.
    pub fn is_valid(&self) -> bool {
        self.variant.is_some() && self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<Decoded, ValidationFailure> {
        match (self.variant, self.discriminator) {
            (Some(variant), Some(discriminator)) if self.errors.is_empty() => Ok(Decoded {
                variant,
                discriminator,
                data: self.data,
            }),
            _ => Err(ValidationFailure {
                errors: self.errors,
            }),
        }
    }

    fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }
}

/// Encoder/validator for one polymorphic registry.
#[derive(Debug)]
pub struct PolymorphicCodec<'r, S: ?Sized> {
    registry: &'r VariantRegistry,
    store: &'r S,
}

impl<'r, S: Store + ?Sized> PolymorphicCodec<'r, S> {
    pub fn new(registry: &'r VariantRegistry, store: &'r S) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &'r VariantRegistry {
        self.registry
    }

    /// Encode a handle as a single record.
    ///
    /// The base contract and (if any) the variant contract are rendered
    /// against the resolved leaf, then merged with variant fields taking
    /// precedence.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` when the leaf cannot be resolved, the leaf's
    /// type has no registered ancestor, or a nested polymorphic attribute
    /// fails to render.
    pub fn encode<'h>(
        &self,
        handle: impl Into<Handle<'h>>,
    ) -> Result<Map<String, Value>, EncodeError> {
        let leaf = LeafResolver::new(self.registry, self.store).resolve(handle.into())?;

        let base = self.registry.base_contract().render(&leaf.view)?;
        let variant = leaf
            .entry
            .contract()
            .map(|c| c.render(&leaf.view))
            .transpose()?
            .unwrap_or_default();

        Ok(merge_records(variant, &base))
    }

    /// Encode every entity visible through the base type's table.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError::Query` if the store cannot be queried; each
    /// item carries its own encode result.
    #[allow(clippy::type_complexity)]
    pub fn encode_all(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<Map<String, Value>, EncodeError>> + '_>, EncodeError>
    {
        let base_type = self.registry.base_type();
        let rows = self
            .store
            .query_all(base_type)
            .map_err(|source| EncodeError::Query {
                type_tag: base_type.to_string(),
                source,
            })?;

        Ok(Box::new(rows.map(move |entity| self.encode(Handle::Entity(&entity)))))
    }

    /// Validate a payload.
    ///
    /// The discriminator field must name a registered variant; the
    /// variant's contract then validates the rest of the payload. All field
    /// errors are collected.
    pub fn decode(&self, payload: &Value) -> Validation {
        let mut validation = Validation::default();
        let field = self.registry.discriminator_field();

        let Some(map) = payload.as_object() else {
            validation.reject(
                NON_FIELD_ERRORS,
                format!("expected an object, got {}", json_type_name(payload)),
            );
            return validation;
        };

        let Some(raw) = map.get(field) else {
            validation.reject(field, REQUIRED);
            return validation;
        };

        let Some(entry) = raw
            .as_str()
            .and_then(|d| self.registry.entry_for_discriminator(d))
        else {
            debug!(field, value = %raw, "unknown discriminator");
            validation.reject(field, INVALID);
            return validation;
        };

        if let Some(contract) = entry.contract() {
            let result = contract.validate(map);
            validation.data = result.data;
            validation.errors = result.errors;
        }

        validation.data.insert(
            field.to_string(),
            Value::String(entry.discriminator().to_string()),
        );
        validation.variant = Some(entry.type_name().clone());
        validation.discriminator = Some(entry.discriminator().to_string());

        debug!(
            variant = entry.type_name().as_str(),
            errors = validation.errors.len(),
            "decoded payload"
        );

        validation
    }

    /// Persisting a new variant belongs to the storage layer.
    pub fn create(&self, _validated: &Decoded) -> Result<Entity, UnsupportedOperation> {
        Err(UnsupportedOperation { operation: "create" })
    }

    /// Persisting changes belongs to the storage layer.
    pub fn update(
        &self,
        _instance: &Entity,
        _validated: &Decoded,
    ) -> Result<Entity, UnsupportedOperation> {
        Err(UnsupportedOperation { operation: "update" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Contract, Field};
    use crate::store::MemoryStore;
    use crate::types::TypeHierarchy;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn merge_prefers_primary_on_collision() {
        let variant = map(json!({ "name": "Tom", "id": 99 }));
        let base = map(json!({ "id": 2, "kind": "Cat" }));

        let merged = merge_records(variant, &base);
        assert_eq!(Value::Object(merged), json!({ "id": 99, "name": "Tom", "kind": "Cat" }));
    }

    #[test]
    fn merge_is_not_symmetric() {
        let a = map(json!({ "id": 1 }));
        let b = map(json!({ "id": 2 }));
        assert_ne!(merge_records(a.clone(), &b), merge_records(b, &a));
    }

    #[test]
    fn merge_keeps_primary_order_first() {
        let merged = merge_records(map(json!({ "name": "Tom" })), &map(json!({ "id": 2 })));
        let keys: Vec<&String> = merged.keys().collect();
        assert_eq!(keys, vec!["name", "id"]);
    }

    #[test]
    fn validation_into_result() {
        let ok = Validation {
            variant: Some("Dog".into()),
            discriminator: Some("Dog".into()),
            data: map(json!({ "kind": "Dog" })),
            errors: FieldErrors::new(),
        };
        let decoded = ok.into_result().unwrap();
        assert_eq!(decoded.variant.as_str(), "Dog");

        let mut failed = Validation::default();
        failed.reject("kind", REQUIRED);
        assert!(!failed.is_valid());
        let failure = failed.into_result().unwrap_err();
        assert_eq!(failure.errors["kind"], vec!["required".to_string()]);
    }

    #[test]
    fn decode_validates_against_the_named_variant_only() {
        let hierarchy = TypeHierarchy::new()
            .root("Pet")
            .with_type("Cat", "Pet")
            .with_type("Kitten", "Cat");
        let registry = VariantRegistry::builder("Pet", "kind")
            .base(Contract::new("PetContract"))
            .variant(
                "Cat",
                Some(Contract::new("CatContract").with_field(Field::new("name", json!({})))),
            )
            .variant(
                "Kitten",
                Some(Contract::new("KittenContract").with_field(Field::new("size", json!({})))),
            )
            .build(&hierarchy)
            .unwrap();
        let store = MemoryStore::default();
        let codec = PolymorphicCodec::new(&registry, &store);

        let cat = codec.decode(&json!({ "kind": "Cat", "name": "Tom" }));
        assert!(cat.is_valid());
        assert_eq!(cat.variant.unwrap().as_str(), "Cat");

        let kitten = codec.decode(&json!({ "kind": "Kitten", "name": "Bit" }));
        assert_eq!(kitten.variant.unwrap().as_str(), "Kitten");
        assert_eq!(kitten.errors["size"], vec![REQUIRED.to_string()]);
        assert!(!kitten.data.contains_key("name"));
    }
}
