//! Core types: type names, the static type hierarchy and discriminator naming.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;

/// Attribute name under which an entity's identity is exposed to contracts.
pub const ID_ATTRIBUTE: &str = "id";

/// Error key for payload-level (non field) validation errors.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation message for a missing required field.
pub const REQUIRED: &str = "required";

/// Validation message for a discriminator that names no registered variant.
pub const INVALID: &str = "invalid";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true if `s` can be used as a record field name.
///
/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_field_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Name of a concrete entity type (the target of a type tag).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TypeName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Static single-inheritance hierarchy of entity types.
///
/// Each type has at most one parent. A parent that is referenced but never
/// declared is treated as a root.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    parents: BTreeMap<TypeName, Option<TypeName>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type without a parent.
    pub fn root(mut self, name: impl Into<TypeName>) -> Self {
        self.insert(name.into(), None);
        self
    }

    /// Declare `name` as a direct specialization of `parent`.
    pub fn with_type(mut self, name: impl Into<TypeName>, parent: impl Into<TypeName>) -> Self {
        self.insert(name.into(), Some(parent.into()));
        self
    }

    /// Declare or redeclare a type.
    pub fn insert(&mut self, name: TypeName, parent: Option<TypeName>) {
        self.parents.insert(name, parent);
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.parents.contains_key(name)
    }

    pub fn parent(&self, name: &TypeName) -> Option<&TypeName> {
        self.parents.get(name).and_then(Option::as_ref)
    }

    /// All declared types, in name order.
    pub fn types(&self) -> impl Iterator<Item = &TypeName> {
        self.parents.keys()
    }

    /// Ancestry chain of `name`, most-derived first (the type itself included).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownType` if `name` was never declared and
    /// `ConfigError::HierarchyCycle` if the parent chain loops.
    pub fn ancestry(&self, name: &TypeName) -> Result<Vec<&TypeName>, ConfigError> {
        let (declared, _) = self
            .parents
            .get_key_value(name)
            .ok_or_else(|| ConfigError::UnknownType {
                type_name: name.to_string(),
            })?;

        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(declared);

        while let Some(ty) = current {
            if !seen.insert(ty) {
                return Err(ConfigError::HierarchyCycle {
                    type_name: ty.to_string(),
                });
            }
            chain.push(ty);
            current = self.parent(ty);
        }

        Ok(chain)
    }

    /// Returns true if `ancestor` appears in the ancestry chain of `name`.
    pub fn descends_from(&self, name: &TypeName, ancestor: &TypeName) -> Result<bool, ConfigError> {
        Ok(self.ancestry(name)?.into_iter().any(|t| t == ancestor))
    }
}

/// Built-in strategies for deriving a discriminator value from a type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStrategy {
    /// Use the type name verbatim (`KittenCat` -> `KittenCat`).
    #[default]
    TypeName,
    /// Lowercase the type name (`KittenCat` -> `kittencat`).
    Lowercase,
    /// Convert CamelCase to snake_case (`KittenCat` -> `kitten_cat`).
    SnakeCase,
}

impl NamingStrategy {
    pub fn apply(&self, name: &TypeName) -> String {
        match self {
            NamingStrategy::TypeName => name.as_str().to_string(),
            NamingStrategy::Lowercase => name.as_str().to_lowercase(),
            NamingStrategy::SnakeCase => to_snake_case(name.as_str()),
        }
    }
}

fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}
