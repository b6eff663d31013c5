//! Polymorphic records over a discriminated set of variants.
//!
//! A [`VariantRegistry`] ties a base type's representation contract to a set
//! of variant types, each with an optional contract of its own, and to the
//! discriminator value that names it on the wire. On top of a registry:
//!
//! - [`PolymorphicCodec::encode`] resolves a base-typed handle to its leaf
//!   variant and renders base + variant fields as one record (variant fields
//!   win on collision);
//! - [`PolymorphicCodec::decode`] reads the discriminator from a payload and
//!   validates the payload against that variant's contract;
//! - [`synthesize`] describes the registry as a schema graph: a base
//!   definition with `discriminator`, and an `allOf` definition per variant.
//!
//! # Example
//!
//! ```
//! use poly_schema::{
//!     synthesize, Contract, Entity, Field, MemoryStore, PolymorphicCodec, TypeHierarchy,
//!     VariantRegistry,
//! };
//! use serde_json::json;
//!
//! let hierarchy = TypeHierarchy::new()
//!     .root("Pet")
//!     .with_type("Cat", "Pet")
//!     .with_type("Ordinary", "Pet");
//!
//! let registry = VariantRegistry::builder("Pet", "kind")
//!     .base(
//!         Contract::new("PetContract")
//!             .with_field(Field::new("id", json!({ "type": "integer" })).read_only())
//!             .with_field(Field::new("kind", json!({ "type": "string" }))),
//!     )
//!     .variant(
//!         "Cat",
//!         Some(
//!             Contract::new("CatContract")
//!                 .with_field(Field::new("name", json!({ "type": "string" }))),
//!         ),
//!     )
//!     .variant("Ordinary", None)
//!     .build(&hierarchy)
//!     .unwrap();
//!
//! let mut store = MemoryStore::new(hierarchy);
//! store
//!     .insert(&"Cat".into(), Entity::new(2, "Cat").with_attribute("name", json!("Tom")))
//!     .unwrap();
//!
//! let codec = PolymorphicCodec::new(&registry, &store);
//! let record = codec.encode(&Entity::new(2, "Cat")).unwrap();
//! assert_eq!(serde_json::Value::Object(record), json!({ "id": 2, "kind": "Cat", "name": "Tom" }));
//!
//! assert!(codec.decode(&json!({ "kind": "Cat", "name": "Felix" })).is_valid());
//!
//! let graph = synthesize(&registry).unwrap();
//! assert_eq!(graph.get("Pet").unwrap()["discriminator"], "kind");
//! assert_eq!(
//!     graph.get("Ordinary").unwrap(),
//!     &json!({ "allOf": [{ "$ref": "#/definitions/Pet" }] })
//! );
//! ```

mod codec;
mod config;
mod contract;
mod error;
mod graph;
mod inspect;
mod loader;
mod nested;
mod registry;
mod resolver;
mod store;
mod synthesize;
mod types;

pub use codec::{merge_records, Decoded, PolymorphicCodec, Validation};
pub use config::{Configured, RegistryConfig, VariantConfig};
pub use contract::{CompiledContract, Contract, ContractValidation, Field, FieldErrors};
pub use error::{
    ConfigError, EncodeError, LoadError, StoreError, SynthesisError, UnsupportedOperation,
    ValidationFailure,
};
pub use graph::{
    ref_target, reference, Definition, Origin, SchemaGraph, SchemaRef, DEFINITIONS_PREFIX,
};
pub use inspect::{ContractInspector, InlineInspector, SchemaInspector};
pub use loader::{is_url, load_config, load_config_auto, load_config_str, load_json, parse_config};
pub use nested::{Discriminator, DiscriminatorFn, PolymorphicField};
pub use registry::{NamingFn, RegistryBuilder, VariantEntry, VariantRegistry};
pub use resolver::{Handle, Leaf, LeafResolver};
pub use store::{Entity, MemoryStore, Store};
pub use synthesize::{synthesize, Synthesizer};
pub use types::{
    is_field_identifier, json_type_name, NamingStrategy, TypeHierarchy, TypeName, ID_ATTRIBUTE,
    INVALID, NON_FIELD_ERRORS, REQUIRED,
};

#[cfg(feature = "remote")]
pub use loader::{load_config_url, load_json_url};
