//! Schema graph: the named definitions table built during synthesis.
//!
//! Each definition remembers where it came from. Hand-authored definitions
//! are never replaced or removed by synthesis; generated ones carry the name
//! of the synthesis run that owns them so a later run can prune its own stale
//! output without touching anyone else's.

use std::collections::{BTreeMap, HashSet};

use serde_json::{json, Map, Value};

use crate::error::SynthesisError;

/// Prefix of every definition reference (`{"$ref": "#/definitions/Pet"}`).
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Build a reference to definition `name`.
pub fn reference(name: &str) -> Value {
    let escaped = name.replace('~', "~0").replace('/', "~1");
    json!({ "$ref": format!("{}{}", DEFINITIONS_PREFIX, escaped) })
}

/// Definition name targeted by a `{"$ref": "#/definitions/..."}` node.
pub fn ref_target(value: &Value) -> Option<String> {
    let pointer = value.get("$ref")?.as_str()?;
    let name = pointer.strip_prefix(DEFINITIONS_PREFIX)?;
    // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
    Some(name.replace("~1", "/").replace("~0", "~"))
}

/// Where a definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Supplied by hand; synthesis leaves it alone.
    Authored,
    /// Produced by an inspector (`owner: None`) or by a synthesis run.
    Generated { owner: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub schema: Value,
    pub origin: Origin,
}

/// A schema node or a reference to a named definition.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaRef {
    Inline(Value),
    Reference(String),
}

impl SchemaRef {
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            SchemaRef::Reference(name) => Some(name),
            SchemaRef::Inline(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            SchemaRef::Inline(value) => value.clone(),
            SchemaRef::Reference(name) => reference(name),
        }
    }
}

/// Named schema definitions, ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaGraph {
    definitions: BTreeMap<String, Definition>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert_authored`](Self::insert_authored).
    pub fn with_authored(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.insert_authored(name, schema);
        self
    }

    /// Add or replace a hand-authored definition.
    pub fn insert_authored(&mut self, name: impl Into<String>, schema: Value) {
        self.definitions.insert(
            name.into(),
            Definition {
                schema,
                origin: Origin::Authored,
            },
        );
    }

    /// Add or replace a generated definition.
    ///
    /// Returns `false` (and changes nothing) if `name` is hand-authored.
    pub fn insert_generated(&mut self, name: &str, schema: Value, owner: Option<&str>) -> bool {
        if self.is_authored(name) {
            return false;
        }
        self.definitions.insert(
            name.to_string(),
            Definition {
                schema,
                origin: Origin::Generated {
                    owner: owner.map(str::to_string),
                },
            },
        );
        true
    }

    /// Remove a generated definition. Authored definitions are kept.
    pub fn remove_generated(&mut self, name: &str) -> Option<Definition> {
        if self.is_authored(name) {
            return None;
        }
        self.definitions.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name).map(|d| &d.schema)
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn is_authored(&self, name: &str) -> bool {
        matches!(
            self.definitions.get(name),
            Some(Definition {
                origin: Origin::Authored,
                ..
            })
        )
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Names of definitions generated by the synthesis run `owner`.
    pub fn owned_by<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a str> {
        self.definitions
            .iter()
            .filter(move |(_, d)| {
                matches!(&d.origin, Origin::Generated { owner: Some(o) } if o == owner)
            })
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolve a schema reference to its node.
    pub fn resolve<'a>(&'a self, schema: &'a SchemaRef) -> Option<&'a Value> {
        match schema {
            SchemaRef::Inline(value) => Some(value),
            SchemaRef::Reference(name) => self.get(name),
        }
    }

    /// Definition names referenced anywhere inside definition `name`.
    pub fn references_from(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(schema) = self.get(name) {
            collect_refs(schema, &mut out);
        }
        out
    }

    /// True if any definition other than `name` itself references `name`.
    pub fn is_referenced(&self, name: &str) -> bool {
        self.definitions
            .iter()
            .filter(|(other, _)| other.as_str() != name)
            .any(|(_, d)| {
                let mut refs = Vec::new();
                collect_refs(&d.schema, &mut refs);
                refs.iter().any(|r| r == name)
            })
    }

    /// Check that every reference reachable from `roots` resolves and that
    /// the reachable subgraph has no cycles.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::DanglingReference` or `SynthesisError::Cycle`.
    pub fn check_references<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), SynthesisError> {
        let mut done = HashSet::new();
        for root in roots {
            let mut visiting = HashSet::new();
            self.visit(root, &mut visiting, &mut done)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        name: &str,
        visiting: &mut HashSet<String>,
        done: &mut HashSet<String>,
    ) -> Result<(), SynthesisError> {
        if done.contains(name) {
            return Ok(());
        }
        if !visiting.insert(name.to_string()) {
            return Err(SynthesisError::Cycle {
                name: name.to_string(),
            });
        }

        for target in self.references_from(name) {
            if !self.contains(&target) {
                return Err(SynthesisError::DanglingReference {
                    from: name.to_string(),
                    target,
                });
            }
            self.visit(&target, visiting, done)?;
        }

        visiting.remove(name);
        done.insert(name.to_string());
        Ok(())
    }

    /// Render as a `{name: schema}` object, ordered by name.
    pub fn to_value(&self) -> Value {
        let map: Map<String, Value> = self
            .definitions
            .iter()
            .map(|(name, d)| (name.clone(), d.schema.clone()))
            .collect();
        Value::Object(map)
    }
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(obj) => {
            if let Some(target) = ref_target(value) {
                out.push(target);
            }
            for child in obj.values() {
                collect_refs(child, out);
            }
        }
        Value::Array(arr) => {
            for item in arr {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}
