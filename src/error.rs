//! Error definitions for conversion, writing and client generation.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum ContractError {
    /// A type handle that does not exist in the universe, or another unusable input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A property references a type that was never converted.
    #[error(
        "reference error: unable to find referenced type for property {} in {}",
        .0.property,
        .0.type_name
    )]
    ReferenceError(Box<ReferenceFault>),
    /// Relative import path could not be computed.
    #[error("import error: attempted to import {imported} in {type_name}: {message}")]
    ImportError {
        type_name: String,
        imported: String,
        message: String,
    },
    /// Two folders without a shared namespace root.
    #[error("path error: {0}")]
    PathError(String),
    /// Endpoint uses an HTTP method the client templates cannot express.
    #[error("unmapped http method: no mapping exists for {method} on {endpoint}")]
    UnmappedHttpMethod { endpoint: String, method: String },
    /// Invalid configuration values or duplicate configuration entries.
    #[error("configuration error: {0}")]
    ConfigError(String),
    /// Manifest or configuration (de)serialization failure.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// Filesystem I/O error while writing output files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Payload of [`ContractError::ReferenceError`].
///
/// `references` lists every converted type whose own properties point at the
/// type that failed to build, so the offending declaration can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFault {
    pub type_name: String,
    pub type_full_name: String,
    pub property: String,
    pub property_type: String,
    pub references: Vec<ReferencingType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencingType {
    pub name: String,
    pub full_name: String,
    pub properties: Vec<String>,
}

impl ReferenceFault {
    /// Renders the reverse-reference list, one `- Type.Property (FullName)` per line.
    pub fn describe_references(&self) -> String {
        let mut out = String::new();
        for reference in &self.references {
            for property in &reference.properties {
                out.push_str(&format!(
                    "\n- {}.{} ({})",
                    reference.name, property, reference.full_name
                ));
            }
        }
        out
    }
}
