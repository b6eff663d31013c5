//! Variant registry: discriminator values, variant types and their contracts.
//!
//! A registry is built once from a base contract and a mapping of variant
//! type to optional variant contract, then shared read-only. Construction
//! flattens the type hierarchy so that any type descending from a registered
//! variant maps to that variant's entry without walking ancestry at runtime.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::contract::{CompiledContract, Contract};
use crate::error::ConfigError;
use crate::types::{is_field_identifier, NamingStrategy, TypeHierarchy, TypeName};

/// Derives a discriminator value from a variant type.
pub type NamingFn = Arc<dyn Fn(&TypeName) -> String + Send + Sync>;

/// One registered variant.
#[derive(Debug)]
pub struct VariantEntry {
    discriminator: String,
    type_name: TypeName,
    contract: Option<CompiledContract>,
}

impl VariantEntry {
    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Variant-specific contract; `None` when the variant adds no fields.
    pub fn contract(&self) -> Option<&CompiledContract> {
        self.contract.as_ref()
    }
}

/// Immutable registry of polymorphic variants sharing one base type.
pub struct VariantRegistry {
    discriminator_field: String,
    base_type: TypeName,
    base_name: String,
    base_contract: CompiledContract,
    entries: Vec<VariantEntry>,
    by_discriminator: HashMap<String, usize>,
    // Every hierarchy type -> nearest registered ancestor (itself included).
    by_type: HashMap<TypeName, usize>,
}

impl VariantRegistry {
    /// Start building a registry for `base_type`, discriminated by `discriminator_field`.
    pub fn builder(
        base_type: impl Into<TypeName>,
        discriminator_field: impl Into<String>,
    ) -> RegistryBuilder {
        RegistryBuilder {
            base_type: base_type.into(),
            discriminator_field: discriminator_field.into(),
            base: None,
            variants: None,
            naming: None,
        }
    }

    pub fn discriminator_field(&self) -> &str {
        &self.discriminator_field
    }

    pub fn base_type(&self) -> &TypeName {
        &self.base_type
    }

    /// The base type's name as produced by the naming function.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn base_contract(&self) -> &CompiledContract {
        &self.base_contract
    }

    /// Registered variants, in registration order.
    pub fn entries(&self) -> &[VariantEntry] {
        &self.entries
    }

    /// Entry for `type_name` or its nearest registered ancestor.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnregisteredType` when neither the type nor any
    /// ancestor is registered. This is a programming error, not bad input.
    pub fn entry_for_type(&self, type_name: &TypeName) -> Result<&VariantEntry, ConfigError> {
        self.by_type
            .get(type_name)
            .map(|&idx| &self.entries[idx])
            .ok_or_else(|| ConfigError::UnregisteredType {
                type_name: type_name.to_string(),
            })
    }

    pub fn entry_for_discriminator(&self, value: &str) -> Option<&VariantEntry> {
        self.by_discriminator
            .get(value)
            .map(|&idx| &self.entries[idx])
    }

    /// Discriminator value that encodes `type_name`.
    pub fn discriminator_for(&self, type_name: &TypeName) -> Result<&str, ConfigError> {
        self.entry_for_type(type_name).map(VariantEntry::discriminator)
    }
}

impl fmt::Debug for VariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantRegistry")
            .field("discriminator_field", &self.discriminator_field)
            .field("base_type", &self.base_type)
            .field("base_contract", &self.base_contract)
            .field("entries", &self.entries)
            .finish()
    }
}

/// Builder for [`VariantRegistry`].
pub struct RegistryBuilder {
    base_type: TypeName,
    discriminator_field: String,
    base: Option<Contract>,
    variants: Option<Vec<(TypeName, Option<Contract>)>>,
    naming: Option<NamingFn>,
}

impl RegistryBuilder {
    /// Set the base contract rendered for every variant.
    pub fn base(mut self, contract: Contract) -> Self {
        self.base = Some(contract);
        self
    }

    /// Register one variant type with an optional variant contract.
    pub fn variant(mut self, type_name: impl Into<TypeName>, contract: Option<Contract>) -> Self {
        self.variants
            .get_or_insert_with(Vec::new)
            .push((type_name.into(), contract));
        self
    }

    /// Register several variants. Supplying an empty iterator still counts
    /// as a (empty) mapping.
    pub fn variants<I>(mut self, variants: I) -> Self
    where
        I: IntoIterator<Item = (TypeName, Option<Contract>)>,
    {
        self.variants
            .get_or_insert_with(Vec::new)
            .extend(variants);
        self
    }

    /// Use a custom discriminator naming function.
    pub fn naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&TypeName) -> String + Send + Sync + 'static,
    {
        self.naming = Some(Arc::new(naming));
        self
    }

    /// Use one of the built-in naming strategies.
    pub fn naming_strategy(self, strategy: NamingStrategy) -> Self {
        self.naming(move |t| strategy.apply(t))
    }

    /// Validate the configuration and build the registry.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for a missing base contract or mapping, an
    /// invalid discriminator field name, duplicate variants or
    /// discriminators, types unknown to `hierarchy`, variants that do not
    /// descend from the base type, and field schemas that fail to compile.
    pub fn build(self, hierarchy: &TypeHierarchy) -> Result<VariantRegistry, ConfigError> {
        let RegistryBuilder {
            base_type,
            discriminator_field,
            base,
            variants,
            naming,
        } = self;

        let base = base.ok_or_else(|| ConfigError::MissingBaseContract {
            base_type: base_type.to_string(),
        })?;
        let variants = variants.ok_or_else(|| ConfigError::MissingVariantMapping {
            base_type: base_type.to_string(),
        })?;
        if !is_field_identifier(&discriminator_field) {
            return Err(ConfigError::InvalidDiscriminatorField {
                field: discriminator_field,
            });
        }
        if !hierarchy.contains(&base_type) {
            return Err(ConfigError::UnknownType {
                type_name: base_type.to_string(),
            });
        }

        let naming: NamingFn = match naming {
            Some(naming) => naming,
            None => Arc::new(|t: &TypeName| NamingStrategy::TypeName.apply(t)),
        };

        let mut entries: Vec<VariantEntry> = Vec::with_capacity(variants.len());
        let mut by_discriminator = HashMap::new();
        let mut registered: HashMap<TypeName, usize> = HashMap::new();

        for (type_name, contract) in variants {
            if registered.contains_key(&type_name) {
                return Err(ConfigError::DuplicateVariant {
                    type_name: type_name.to_string(),
                });
            }
            if !hierarchy.descends_from(&type_name, &base_type)? {
                return Err(ConfigError::UnreachableVariant {
                    variant: type_name.to_string(),
                    base_type: base_type.to_string(),
                });
            }

            let discriminator = naming(&type_name);
            if let Some(&existing) = by_discriminator.get(&discriminator) {
                let first: &VariantEntry = &entries[existing];
                return Err(ConfigError::DuplicateDiscriminator {
                    value: discriminator,
                    first: first.type_name.to_string(),
                    second: type_name.to_string(),
                });
            }

            let contract = contract.map(CompiledContract::compile).transpose()?;
            let idx = entries.len();
            by_discriminator.insert(discriminator.clone(), idx);
            registered.insert(type_name.clone(), idx);
            entries.push(VariantEntry {
                discriminator,
                type_name,
                contract,
            });
        }

        let by_type = flatten(hierarchy, &registered)?;
        let base_contract = CompiledContract::compile(base)?;
        let base_name = naming(&base_type);

        debug!(
            base_type = base_type.as_str(),
            variants = entries.len(),
            resolvable_types = by_type.len(),
            "built variant registry"
        );

        Ok(VariantRegistry {
            discriminator_field,
            base_type,
            base_name,
            base_contract,
            entries,
            by_discriminator,
            by_type,
        })
    }
}

/// Map every hierarchy type to the entry of its nearest registered ancestor.
fn flatten(
    hierarchy: &TypeHierarchy,
    registered: &HashMap<TypeName, usize>,
) -> Result<HashMap<TypeName, usize>, ConfigError> {
    let mut table = HashMap::new();
    for ty in hierarchy.types() {
        let found = hierarchy
            .ancestry(ty)?
            .into_iter()
            .find_map(|ancestor| registered.get(ancestor).copied());
        if let Some(idx) = found {
            table.insert(ty.clone(), idx);
        }
    }
    Ok(table)
}
