//! Declarative registry configuration.
//!
//! ```json
//! {
//!   "base_type": "Pet",
//!   "discriminator": "pet_type",
//!   "naming": "type_name",
//!   "types": { "Kitten": "Cat" },
//!   "base": {
//!     "name": "PetContract",
//!     "fields": [{ "name": "id", "schema": { "type": "integer" }, "read_only": true }]
//!   },
//!   "variants": [
//!     { "type": "Cat", "contract": { "name": "CatContract", "fields": [{ "name": "name" }] } },
//!     { "type": "Ordinary" }
//!   ],
//!   "definitions": { "Item": { "type": "object" } }
//! }
//! ```
//!
//! `types` maps extra types to their parent. Variants not listed there are
//! direct children of `base_type`. `definitions` are hand-authored schema
//! definitions that synthesis must leave alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::Contract;
use crate::error::ConfigError;
use crate::graph::SchemaGraph;
use crate::registry::VariantRegistry;
use crate::types::{NamingStrategy, TypeHierarchy, TypeName};

/// One entry of the `variants` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantConfig {
    #[serde(rename = "type")]
    pub type_name: TypeName,
    #[serde(default)]
    pub contract: Option<Contract>,
}

/// Registry configuration as read from a JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    pub base_type: TypeName,
    pub discriminator: String,
    #[serde(default)]
    pub naming: NamingStrategy,
    #[serde(default)]
    pub types: BTreeMap<TypeName, TypeName>,
    #[serde(default)]
    pub base: Option<Contract>,
    #[serde(default)]
    pub variants: Option<Vec<VariantConfig>>,
    #[serde(default)]
    pub definitions: Map<String, Value>,
}

/// Everything a configuration produces.
#[derive(Debug)]
pub struct Configured {
    pub hierarchy: TypeHierarchy,
    pub registry: VariantRegistry,
    /// Hand-authored definitions, ready to synthesize into.
    pub definitions: SchemaGraph,
}

impl RegistryConfig {
    /// Type hierarchy implied by `base_type`, `types` and `variants`.
    pub fn hierarchy(&self) -> TypeHierarchy {
        let mut hierarchy = TypeHierarchy::new();
        if !self.types.contains_key(&self.base_type) {
            hierarchy.insert(self.base_type.clone(), None);
        }
        for (child, parent) in &self.types {
            hierarchy.insert(child.clone(), Some(parent.clone()));
        }
        for variant in self.variants.iter().flatten() {
            if !hierarchy.contains(&variant.type_name) {
                hierarchy.insert(variant.type_name.clone(), Some(self.base_type.clone()));
            }
        }
        hierarchy
    }

    /// Build the hierarchy, registry and authored definitions.
    ///
    /// # Errors
    ///
    /// Returns any `ConfigError` raised while building the registry.
    pub fn build(self) -> Result<Configured, ConfigError> {
        let hierarchy = self.hierarchy();

        let mut builder = VariantRegistry::builder(self.base_type, self.discriminator)
            .naming_strategy(self.naming);
        if let Some(base) = self.base {
            builder = builder.base(base);
        }
        if let Some(variants) = self.variants {
            builder = builder.variants(variants.into_iter().map(|v| (v.type_name, v.contract)));
        }
        let registry = builder.build(&hierarchy)?;

        let mut definitions = SchemaGraph::new();
        for (name, schema) in self.definitions {
            definitions.insert_authored(name, schema);
        }

        Ok(Configured {
            hierarchy,
            registry,
            definitions,
        })
    }
}
