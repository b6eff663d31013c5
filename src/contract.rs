//! Representation contracts: which attributes a record exposes and how each
//! one is validated on input.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ConfigError, EncodeError};
use crate::nested::PolymorphicField;
use crate::types::REQUIRED;

/// Field-level validation errors, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

fn any_schema() -> Value {
    json!({})
}

fn default_required() -> bool {
    true
}

/// A single exposed attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    pub name: String,
    /// JSON Schema for the attribute's value.
    #[serde(default = "any_schema")]
    pub schema: Value,
    /// Whether input payloads must carry the field. Ignored for read-only fields.
    #[serde(default = "default_required")]
    pub required: bool,
    /// Rendered on output, ignored on input.
    #[serde(default)]
    pub read_only: bool,
    /// Accepted on input, never rendered.
    #[serde(default)]
    pub write_only: bool,
    /// Renders a nested base-typed record through another registry.
    #[serde(skip)]
    pub polymorphic: Option<PolymorphicField>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            required: true,
            read_only: false,
            write_only: false,
            polymorphic: None,
        }
    }

    /// A read-only attribute holding a nested base-typed record.
    pub fn polymorphic(name: impl Into<String>, field: PolymorphicField) -> Self {
        Self {
            polymorphic: Some(field),
            ..Self::new(name, json!({ "type": ["object", "null"] }))
        }
        .read_only()
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    fn is_input_required(&self) -> bool {
        self.required && !self.read_only
    }
}

/// Declarative description of the attributes an entity exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Contract {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Contract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Object schema describing this contract.
    ///
    /// Read-only fields are marked `readOnly` and never listed in `required`.
    /// `required` is omitted when empty.
    pub fn schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut schema = field.schema.clone();
            if field.read_only {
                if let Value::Object(obj) = &mut schema {
                    obj.insert("readOnly".to_string(), Value::Bool(true));
                }
            }
            properties.insert(field.name.clone(), schema);

            if field.is_input_required() {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut node = Map::new();
        node.insert("type".to_string(), json!("object"));
        node.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            node.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(node)
    }
}

/// Outcome of validating a payload against one contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractValidation {
    /// Writable fields that passed validation.
    pub data: Map<String, Value>,
    pub errors: FieldErrors,
}

impl ContractValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A contract with its field schemas compiled for validation.
pub struct CompiledContract {
    contract: Contract,
    // One per field; `None` for read-only fields.
    validators: Vec<Option<jsonschema::Validator>>,
}

impl CompiledContract {
    /// Compile every writable field's schema.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidFieldSchema` if a field schema is not
    /// valid JSON Schema.
    pub fn compile(contract: Contract) -> Result<Self, ConfigError> {
        let validators = contract
            .fields
            .iter()
            .map(|field| {
                if field.read_only {
                    return Ok(None);
                }
                jsonschema::validator_for(&field.schema)
                    .map(Some)
                    .map_err(|e| ConfigError::InvalidFieldSchema {
                        contract: contract.name.clone(),
                        field: field.name.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            contract,
            validators,
        })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn name(&self) -> &str {
        &self.contract.name
    }

    /// Render the contract's fields from `view`.
    ///
    /// Every non write-only field is emitted; attributes missing from the
    /// view render as `null`. Polymorphic fields render their nested record
    /// through their own registry.
    ///
    /// # Errors
    ///
    /// Returns the `EncodeError` of a nested record that cannot be rendered.
    pub fn render(&self, view: &Map<String, Value>) -> Result<Map<String, Value>, EncodeError> {
        let mut rendered = Map::new();
        for field in self.contract.fields.iter().filter(|f| !f.write_only) {
            let value = match (view.get(&field.name), &field.polymorphic) {
                (Some(value), Some(nested)) => nested.render(&field.name, value)?,
                (Some(value), None) => value.clone(),
                (None, _) => Value::Null,
            };
            rendered.insert(field.name.clone(), value);
        }
        Ok(rendered)
    }

    /// Validate the contract's writable fields in `payload`.
    ///
    /// All fields are checked; errors are collected rather than returned on
    /// the first failure. Unknown payload keys are ignored.
    pub fn validate(&self, payload: &Map<String, Value>) -> ContractValidation {
        let mut result = ContractValidation::default();

        for (field, validator) in self.contract.fields.iter().zip(&self.validators) {
            let Some(validator) = validator else {
                continue;
            };

            match payload.get(&field.name) {
                None if field.required => {
                    result
                        .errors
                        .entry(field.name.clone())
                        .or_default()
                        .push(REQUIRED.to_string());
                }
                None => {}
                Some(value) => {
                    let messages: Vec<String> =
                        validator.iter_errors(value).map(|e| e.to_string()).collect();
                    if messages.is_empty() {
                        result.data.insert(field.name.clone(), value.clone());
                    } else {
                        result
                            .errors
                            .entry(field.name.clone())
                            .or_default()
                            .extend(messages);
                    }
                }
            }
        }

        result
    }
}

impl fmt::Debug for CompiledContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledContract")
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}
