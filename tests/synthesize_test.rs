//! Integration tests for discriminated schema synthesis.

use poly_schema::{
    reference, synthesize, Contract, Field, InlineInspector, SchemaGraph, SynthesisError,
    Synthesizer, TypeHierarchy, VariantRegistry,
};
use serde_json::{json, Value};

fn hierarchy() -> TypeHierarchy {
    TypeHierarchy::new()
        .root("Base")
        .with_type("Cat", "Base")
        .with_type("Dog", "Base")
        .with_type("Ordinary", "Base")
}

fn base_contract() -> Contract {
    Contract::new("BaseContract")
        .with_field(Field::new("id", json!({ "type": "integer" })).read_only())
        .with_field(Field::new("kind", json!({ "type": "string" })))
}

fn cat_contract() -> Contract {
    Contract::new("CatContract").with_field(Field::new("name", json!({ "type": "string" })))
}

fn dog_contract() -> Contract {
    Contract::new("DogContract").with_field(Field::new("bark", json!({ "type": "string" })))
}

fn registry() -> VariantRegistry {
    VariantRegistry::builder("Base", "kind")
        .base(base_contract())
        .variant("Cat", Some(cat_contract()))
        .variant("Dog", Some(dog_contract()))
        .variant("Ordinary", None)
        .build(&hierarchy())
        .unwrap()
}

fn expected() -> Value {
    json!({
        "Base": {
            "type": "object",
            "properties": {
                "id": { "type": "integer", "readOnly": true },
                "kind": { "type": "string" }
            },
            "required": ["kind"],
            "discriminator": "kind"
        },
        "Cat": {
            "allOf": [
                { "$ref": "#/definitions/Base" },
                {
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"]
                }
            ]
        },
        "Dog": {
            "allOf": [
                { "$ref": "#/definitions/Base" },
                {
                    "type": "object",
                    "properties": { "bark": { "type": "string" } },
                    "required": ["bark"]
                }
            ]
        },
        "Ordinary": {
            "allOf": [{ "$ref": "#/definitions/Base" }]
        }
    })
}

// === Output Shape ===

mod shape {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pet_registry_synthesizes_base_and_variants() {
        let graph = synthesize(&registry()).unwrap();
        assert_eq!(graph.to_value(), expected());
    }

    #[test]
    fn intermediate_contract_definitions_are_pruned() {
        let graph = synthesize(&registry()).unwrap();
        for name in ["BaseContract", "CatContract", "DogContract"] {
            assert!(!graph.contains(name), "{} should be pruned", name);
        }
    }

    #[test]
    fn inline_inspector_produces_same_graph() {
        let graph = Synthesizer::with_inspector(InlineInspector)
            .synthesize(&registry())
            .unwrap();
        assert_eq!(graph.to_value(), expected());
    }

    #[test]
    fn variant_reusing_base_contract_only_references_base() {
        let registry = VariantRegistry::builder("Base", "kind")
            .base(base_contract())
            .variant("Ordinary", Some(base_contract()))
            .build(&hierarchy())
            .unwrap();

        let graph = synthesize(&registry).unwrap();
        assert_eq!(
            graph.get("Ordinary").unwrap(),
            &json!({ "allOf": [reference("Base")] })
        );
    }

    #[test]
    fn variant_sharing_base_contract_name_keeps_its_fields() {
        let shared_base =
            Contract::new("Shared").with_field(Field::new("kind", json!({ "type": "string" })));
        let shared_cat =
            Contract::new("Shared").with_field(Field::new("name", json!({ "type": "string" })));
        let registry = VariantRegistry::builder("Base", "kind")
            .base(shared_base)
            .variant("Cat", Some(shared_cat.clone()))
            .build(&hierarchy())
            .unwrap();

        let graph = synthesize(&registry).unwrap();
        assert_eq!(
            graph.get("Cat").unwrap(),
            &json!({ "allOf": [reference("Base"), shared_cat.schema()] })
        );
        assert!(!graph.contains("Shared"));
    }

    #[test]
    fn variant_contract_named_after_base_definition_keeps_its_fields() {
        let cat = Contract::new("Base").with_field(Field::new("name", json!({ "type": "string" })));
        let registry = VariantRegistry::builder("Base", "kind")
            .base(base_contract())
            .variant("Cat", Some(cat.clone()))
            .build(&hierarchy())
            .unwrap();

        let graph = synthesize(&registry).unwrap();
        assert_eq!(
            graph.get("Cat").unwrap(),
            &json!({ "allOf": [reference("Base"), cat.schema()] })
        );
        assert_eq!(graph.get("Base").unwrap()["discriminator"], "kind");
        assert_eq!(graph.get("Base").unwrap()["properties"]["id"]["readOnly"], true);
    }

    #[test]
    fn every_reference_resolves() {
        let graph = synthesize(&registry()).unwrap();
        for name in graph.names() {
            for target in graph.references_from(name) {
                assert!(graph.contains(&target), "{} -> {}", name, target);
            }
        }
    }
}

// === Re-running Synthesis ===

mod rerun {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn second_run_is_byte_identical() {
        let registry = registry();
        let synthesizer = Synthesizer::new();

        let mut graph = SchemaGraph::new();
        synthesizer.synthesize_into(&registry, &mut graph).unwrap();
        let first = serde_json::to_string(&graph.to_value()).unwrap();

        synthesizer.synthesize_into(&registry, &mut graph).unwrap();
        let second = serde_json::to_string(&graph.to_value()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn removed_variant_is_pruned() {
        let synthesizer = Synthesizer::new();
        let mut graph = SchemaGraph::new();
        synthesizer.synthesize_into(&registry(), &mut graph).unwrap();

        let smaller = VariantRegistry::builder("Base", "kind")
            .base(base_contract())
            .variant("Cat", Some(cat_contract()))
            .build(&hierarchy())
            .unwrap();
        synthesizer.synthesize_into(&smaller, &mut graph).unwrap();

        let names: Vec<&str> = graph.names().collect();
        assert_eq!(names, vec!["Base", "Cat"]);
    }
}

// === Hand-authored Definitions ===

mod authored {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unrelated_definitions_are_untouched() {
        let item = json!({
            "type": "object",
            "properties": { "owner": { "$ref": "#/definitions/Base" } }
        });
        let mut graph = SchemaGraph::new().with_authored("Item", item.clone());

        Synthesizer::new()
            .synthesize_into(&registry(), &mut graph)
            .unwrap();

        assert!(graph.is_authored("Item"));
        assert_eq!(graph.get("Item").unwrap(), &item);
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn colliding_definition_is_kept() {
        let dog = json!({ "type": "object", "description": "hand written" });
        let mut graph = SchemaGraph::new().with_authored("Dog", dog.clone());

        Synthesizer::new()
            .synthesize_into(&registry(), &mut graph)
            .unwrap();

        assert_eq!(graph.get("Dog").unwrap(), &dog);
        assert!(graph.get("Cat").is_some());
    }

    #[test]
    fn authored_contract_definition_is_referenced() {
        let authored = json!({
            "type": "object",
            "properties": { "name": { "type": "string", "maxLength": 20 } }
        });
        let mut graph = SchemaGraph::new().with_authored("CatContract", authored.clone());

        Synthesizer::new()
            .synthesize_into(&registry(), &mut graph)
            .unwrap();

        assert_eq!(graph.get("CatContract").unwrap(), &authored);
        assert_eq!(graph.get("Cat").unwrap()["allOf"][1], authored);
    }

    #[test]
    fn dangling_reference_is_reported() {
        let broken = json!({ "$ref": "#/definitions/Missing" });
        let mut graph = SchemaGraph::new().with_authored("Cat", broken);

        let result = Synthesizer::new().synthesize_into(&registry(), &mut graph);
        assert!(matches!(
            result,
            Err(SynthesisError::DanglingReference { target, .. }) if target == "Missing"
        ));
    }

    #[test]
    fn reference_cycle_is_reported() {
        let mut graph = SchemaGraph::new()
            .with_authored("Dog", json!({ "$ref": "#/definitions/Hound" }))
            .with_authored("Hound", json!({ "$ref": "#/definitions/Dog" }));

        let result = Synthesizer::new().synthesize_into(&registry(), &mut graph);
        assert!(matches!(result, Err(SynthesisError::Cycle { .. })));
    }
}
