//! Schema synthesis - describes a variant registry as a discriminated
//! `allOf` schema graph.
//!
//! The output has one base definition carrying `discriminator`, plus one
//! definition per variant:
//!
//! ```json
//! {
//!   "Pet": {
//!     "type": "object",
//!     "properties": {...},
//!     "required": ["pet_type"],
//!     "discriminator": "pet_type"
//!   },
//!   "Cat": {
//!     "allOf": [
//!       { "$ref": "#/definitions/Pet" },
//!       { "type": "object", "properties": { "name": {...} } }
//!     ]
//!   },
//!   "Ordinary": { "allOf": [ { "$ref": "#/definitions/Pet" } ] }
//! }
//! ```
//!
//! Definitions are named by the registry's naming function: the base after
//! the base type, each variant after its discriminator value.

use std::collections::{BTreeSet, HashSet};

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::SynthesisError;
use crate::graph::{reference, SchemaGraph, SchemaRef};
use crate::inspect::{ContractInspector, SchemaInspector};
use crate::registry::VariantRegistry;

/// Synthesize a fresh schema graph with the default [`ContractInspector`].
pub fn synthesize(registry: &VariantRegistry) -> Result<SchemaGraph, SynthesisError> {
    Synthesizer::new().synthesize(registry)
}

/// Builds schema graphs from registries using a [`SchemaInspector`].
#[derive(Debug, Clone, Default)]
pub struct Synthesizer<I = ContractInspector> {
    inspector: I,
}

impl Synthesizer<ContractInspector> {
    pub fn new() -> Self {
        Self {
            inspector: ContractInspector,
        }
    }
}

impl<I: SchemaInspector> Synthesizer<I> {
    pub fn with_inspector(inspector: I) -> Self {
        Self { inspector }
    }

    /// Synthesize into an empty graph.
    ///
    /// # Errors
    ///
    /// See [`synthesize_into`](Self::synthesize_into).
    pub fn synthesize(&self, registry: &VariantRegistry) -> Result<SchemaGraph, SynthesisError> {
        let mut graph = SchemaGraph::new();
        self.synthesize_into(registry, &mut graph)?;
        Ok(graph)
    }

    /// Synthesize into an existing graph.
    ///
    /// Hand-authored definitions are left untouched, including ones whose
    /// names collide with generated definitions. Definitions generated by a
    /// previous run for the same base, and intermediate definitions the
    /// inspector registered, are removed once nothing references them.
    /// Running twice over an unchanged registry yields an identical graph.
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::UnresolvedContract` if the inspector hands
    /// back a reference it did not register, and `DanglingReference` /
    /// `Cycle` if the resulting graph is not closed and acyclic.
    pub fn synthesize_into(
        &self,
        registry: &VariantRegistry,
        graph: &mut SchemaGraph,
    ) -> Result<(), SynthesisError> {
        let owner = registry.base_name().to_string();
        let field = registry.discriminator_field();
        let existing: HashSet<String> = graph.names().map(str::to_string).collect();

        let base_contract = registry.base_contract().contract();
        let base_ref = self.inspector.schema_for(base_contract, graph);
        let base_plain = resolved(graph, &base_ref, &base_contract.name)?;

        let mut targets = vec![(owner.clone(), annotate_base(base_plain.clone(), field))];

        for entry in registry.entries() {
            let name = entry.discriminator();
            if name == owner {
                debug!(variant = name, "variant shares the base definition");
                continue;
            }

            let mut all_of = vec![reference(&owner)];
            if let Some(contract) = entry.contract() {
                let variant_ref = self.inspector.schema_for(contract.contract(), graph);
                let node = resolved(graph, &variant_ref, contract.name())?;
                // Names can collide across contracts; only the content decides.
                if node != base_plain {
                    all_of.push(node);
                }
            }
            targets.push((name.to_string(), json!({ "allOf": all_of })));
        }

        let target_names: BTreeSet<String> = targets.iter().map(|(n, _)| n.clone()).collect();
        for (name, node) in targets {
            if !graph.insert_generated(&name, node, Some(&owner)) {
                warn!(
                    definition = %name,
                    "hand-authored definition kept in place of generated schema"
                );
            }
        }

        let stale: BTreeSet<String> = graph
            .owned_by(&owner)
            .chain(graph.names().filter(|n| !existing.contains(*n)))
            .filter(|n| !target_names.contains(*n))
            .map(str::to_string)
            .collect();
        prune(graph, stale);

        graph.check_references(target_names.iter().map(String::as_str))?;

        debug!(
            base = %owner,
            definitions = target_names.len(),
            total = graph.len(),
            "synthesized schema graph"
        );
        Ok(())
    }
}

fn resolved(
    graph: &SchemaGraph,
    schema: &SchemaRef,
    contract: &str,
) -> Result<Value, SynthesisError> {
    graph
        .resolve(schema)
        .cloned()
        .ok_or_else(|| SynthesisError::UnresolvedContract {
            contract: contract.to_string(),
        })
}

/// Mark `field` as the discriminator of `node` and make it required.
fn annotate_base(mut node: Value, field: &str) -> Value {
    if let Value::Object(obj) = &mut node {
        mark_discriminator(obj, field);
    }
    node
}

fn mark_discriminator(obj: &mut Map<String, Value>, field: &str) {
    let properties = obj
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(props) = properties {
        props
            .entry(field.to_string())
            .or_insert_with(|| json!({ "type": "string" }));
    }

    let required = obj
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = required {
        if !list.iter().any(|v| v.as_str() == Some(field)) {
            list.push(Value::String(field.to_string()));
        }
    }

    obj.insert("discriminator".to_string(), Value::String(field.to_string()));
}

/// Remove unreferenced candidates until none can be removed.
fn prune(graph: &mut SchemaGraph, mut candidates: BTreeSet<String>) {
    loop {
        let removable: Vec<String> = candidates
            .iter()
            .filter(|n| !graph.is_referenced(n))
            .cloned()
            .collect();
        if removable.is_empty() {
            return;
        }
        for name in removable {
            candidates.remove(&name);
            if graph.remove_generated(&name).is_some() {
                debug!(definition = %name, "pruned generated definition");
            }
        }
    }
}
