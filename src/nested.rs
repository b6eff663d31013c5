//! Polymorphic attributes nested inside another contract.
//!
//! A [`PolymorphicField`] renders an attribute that holds a base-typed record
//! the way the codec renders a top-level one: the nested record names its
//! variant, and the base and variant renderings of that variant's registry
//! are merged.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::codec::merge_records;
use crate::error::EncodeError;
use crate::registry::{VariantEntry, VariantRegistry};
use crate::resolver::discriminator_text;
use crate::types::{json_type_name, TypeName};

/// Derives a discriminator value from a nested record.
pub type DiscriminatorFn = Arc<dyn Fn(&Map<String, Value>) -> Option<String> + Send + Sync>;

/// How a nested record names its variant.
#[derive(Clone)]
pub enum Discriminator {
    /// Attribute holding a discriminator value.
    Attribute(String),
    /// Attribute holding the record's concrete type. Resolved through the
    /// registry's ancestry table, so unregistered subtypes render as their
    /// nearest registered ancestor.
    TypeTag(String),
    /// Computed from the record.
    Derived(DiscriminatorFn),
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discriminator::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            Discriminator::TypeTag(name) => f.debug_tuple("TypeTag").field(name).finish(),
            Discriminator::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl PartialEq for Discriminator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Discriminator::Attribute(a), Discriminator::Attribute(b))
            | (Discriminator::TypeTag(a), Discriminator::TypeTag(b)) => a == b,
            (Discriminator::Derived(a), Discriminator::Derived(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Renders a nested base-typed record through its own registry.
#[derive(Clone)]
pub struct PolymorphicField {
    registry: Arc<VariantRegistry>,
    discriminator: Discriminator,
}

impl PolymorphicField {
    /// Pick variants by the registry's own discriminator field.
    pub fn new(registry: Arc<VariantRegistry>) -> Self {
        let discriminator = Discriminator::Attribute(registry.discriminator_field().to_string());
        Self {
            registry,
            discriminator,
        }
    }

    /// Read the discriminator value from `attribute` instead.
    pub fn by_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.discriminator = Discriminator::Attribute(attribute.into());
        self
    }

    /// Read the concrete type name from `attribute`.
    pub fn by_type_tag(mut self, attribute: impl Into<String>) -> Self {
        self.discriminator = Discriminator::TypeTag(attribute.into());
        self
    }

    /// Derive the discriminator value with `derive`.
    pub fn by_fn<F>(mut self, derive: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Option<String> + Send + Sync + 'static,
    {
        self.discriminator = Discriminator::Derived(Arc::new(derive));
        self
    }

    pub fn registry(&self) -> &VariantRegistry {
        &self.registry
    }

    pub fn discriminator(&self) -> &Discriminator {
        &self.discriminator
    }

    /// Render the value of attribute `field`.
    ///
    /// `null` renders as `null`. The rendered record carries the registry's
    /// discriminator field set to the resolved variant.
    ///
    /// # Errors
    ///
    /// Returns `NotAnObject` for non-object values, `MissingDiscriminator` /
    /// `UnknownDiscriminator` when the variant cannot be picked, and
    /// `Config(UnregisteredType)` for a type tag with no registered ancestor.
    pub fn render(&self, field: &str, value: &Value) -> Result<Value, EncodeError> {
        let record = match value {
            Value::Null => return Ok(Value::Null),
            Value::Object(record) => record,
            other => {
                return Err(EncodeError::NotAnObject {
                    actual: json_type_name(other).to_string(),
                })
            }
        };
        let entry = self.entry_for(field, record)?;

        let mut view = record.clone();
        view.insert(
            self.registry.discriminator_field().to_string(),
            Value::String(entry.discriminator().to_string()),
        );

        let base = self.registry.base_contract().render(&view)?;
        let variant = entry
            .contract()
            .map(|c| c.render(&view))
            .transpose()?
            .unwrap_or_default();

        Ok(Value::Object(merge_records(variant, &base)))
    }

    fn entry_for(
        &self,
        field: &str,
        record: &Map<String, Value>,
    ) -> Result<&VariantEntry, EncodeError> {
        match &self.discriminator {
            Discriminator::Attribute(attribute) => {
                let raw = required(record, attribute)?;
                raw.as_str()
                    .and_then(|d| self.registry.entry_for_discriminator(d))
                    .ok_or_else(|| EncodeError::UnknownDiscriminator {
                        field: attribute.clone(),
                        value: discriminator_text(raw),
                    })
            }
            Discriminator::TypeTag(attribute) => {
                let raw = required(record, attribute)?;
                let tag = raw.as_str().ok_or_else(|| EncodeError::UnknownDiscriminator {
                    field: attribute.clone(),
                    value: discriminator_text(raw),
                })?;
                Ok(self.registry.entry_for_type(&TypeName::from(tag))?)
            }
            Discriminator::Derived(derive) => {
                let value = derive(record).ok_or_else(|| EncodeError::MissingDiscriminator {
                    field: field.to_string(),
                })?;
                match self.registry.entry_for_discriminator(&value) {
                    Some(entry) => Ok(entry),
                    None => Err(EncodeError::UnknownDiscriminator {
                        field: field.to_string(),
                        value,
                    }),
                }
            }
        }
    }
}

fn required<'v>(
    record: &'v Map<String, Value>,
    attribute: &str,
) -> Result<&'v Value, EncodeError> {
    record
        .get(attribute)
        .ok_or_else(|| EncodeError::MissingDiscriminator {
            field: attribute.to_string(),
        })
}

impl fmt::Debug for PolymorphicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolymorphicField")
            .field("base_type", self.registry.base_type())
            .field("discriminator", &self.discriminator)
            .finish()
    }
}

impl PartialEq for PolymorphicField {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry) && self.discriminator == other.discriminator
    }
}
