//! Field-level schema inspection for contracts.

use crate::contract::Contract;
use crate::graph::{SchemaGraph, SchemaRef};

/// Produces the schema of a contract, possibly registering it in the graph
/// and returning a reference to it.
pub trait SchemaInspector {
    fn schema_for(&self, contract: &Contract, graph: &mut SchemaGraph) -> SchemaRef;
}

/// Registers each contract's object schema under the contract's name and
/// returns a reference to it.
///
/// Definitions it registers are generated without an owner; synthesis
/// inlines and prunes them when nothing else points at them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractInspector;

impl SchemaInspector for ContractInspector {
    fn schema_for(&self, contract: &Contract, graph: &mut SchemaGraph) -> SchemaRef {
        graph.insert_generated(&contract.name, contract.schema(), None);
        SchemaRef::Reference(contract.name.clone())
    }
}

/// Returns contract schemas inline without touching the graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineInspector;

impl SchemaInspector for InlineInspector {
    fn schema_for(&self, contract: &Contract, _graph: &mut SchemaGraph) -> SchemaRef {
        SchemaRef::Inline(contract.schema())
    }
}
