//! Error types for registry construction, encoding, synthesis and loading.

use std::path::PathBuf;
use thiserror::Error;

use crate::contract::FieldErrors;

/// Error reported by a [`Store`](crate::Store) implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration errors. Raised while building a registry or on first use of
/// a type the registry cannot place; never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("registry for '{base_type}' is missing a base contract")]
    MissingBaseContract { base_type: String },

    #[error("registry for '{base_type}' is missing a variant mapping")]
    MissingVariantMapping { base_type: String },

    #[error("discriminator field \"{field}\" is not a valid field name")]
    InvalidDiscriminatorField { field: String },

    #[error("variants '{first}' and '{second}' both map to discriminator \"{value}\"")]
    DuplicateDiscriminator {
        value: String,
        first: String,
        second: String,
    },

    #[error("variant '{type_name}' is registered more than once")]
    DuplicateVariant { type_name: String },

    #[error("type '{type_name}' is not declared in the type hierarchy")]
    UnknownType { type_name: String },

    #[error("type hierarchy has a cycle through '{type_name}'")]
    HierarchyCycle { type_name: String },

    #[error("variant '{variant}' does not descend from base type '{base_type}'")]
    UnreachableVariant { variant: String, base_type: String },

    #[error("no registered variant for type '{type_name}' or any of its ancestors")]
    UnregisteredType { type_name: String },

    #[error("invalid schema for field '{field}' of contract '{contract}': {message}")]
    InvalidFieldSchema {
        contract: String,
        field: String,
        message: String,
    },
}

/// Errors on the output (encode) path.
#[derive(Debug, Error)]
pub enum EncodeError {
    // Data integrity (exit code 1)
    #[error("entity {id} has no type tag")]
    MissingTypeTag { id: u64 },

    #[error("leaf '{type_tag}' for entity {id} not found")]
    LeafNotFound { type_tag: String, id: u64 },

    #[error("expected an object handle, got {actual}")]
    NotAnObject { actual: String },

    #[error("handle is missing discriminator field \"{field}\"")]
    MissingDiscriminator { field: String },

    #[error("unknown discriminator \"{value}\" in field \"{field}\"")]
    UnknownDiscriminator { field: String, value: String },

    // Store (exit code 3)
    #[error("store lookup for '{type_tag}' {id} failed: {source}")]
    Store {
        type_tag: String,
        id: u64,
        #[source]
        source: StoreError,
    },

    #[error("store query for '{type_tag}' failed: {source}")]
    Query {
        type_tag: String,
        #[source]
        source: StoreError,
    },

    // Configuration (exit code 2)
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A decoded payload that failed validation.
#[derive(Debug, Clone, Error)]
#[error("validation failed with {} error(s)", .errors.values().map(Vec::len).sum::<usize>())]
pub struct ValidationFailure {
    pub errors: FieldErrors,
}

impl ValidationFailure {
    /// One `field: message` line per error, in field order.
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.errors
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{}: {}", field, m)))
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Raised by operations the polymorphic codec delegates elsewhere.
#[derive(Debug, Error)]
#[error("`{operation}` is not implemented by the polymorphic codec")]
pub struct UnsupportedOperation {
    pub operation: &'static str,
}

/// Errors during schema synthesis.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("schema for contract '{contract}' does not resolve to a definition")]
    UnresolvedContract { contract: String },

    #[error("definition '{from}' references missing definition '{target}'")]
    DanglingReference { from: String, target: String },

    #[error("definition '{name}' is part of a reference cycle")]
    Cycle { name: String },
}

/// Errors while loading configuration or JSON documents.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl EncodeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            EncodeError::Store { .. } | EncodeError::Query { .. } => 3,
            EncodeError::Config(e) => e.exit_code(),
            _ => 1,
        }
    }
}

impl SynthesisError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
