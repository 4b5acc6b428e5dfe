//! Generates TypeScript declarations, zod schemas and typed API clients from
//! the type metadata of a statically-typed object model.

pub mod api;
pub mod casing;
pub mod client_templates;
pub mod client_writer;
pub mod config;
pub mod contractor;
pub mod converter;
pub mod error;
pub mod metadata;
pub mod output;
pub mod paths;
pub mod shape;
pub mod typescript_writer;
pub mod zod_schema;

pub use api::{ApiClient, ApiClientEndpoint, EndpointMethod, EndpointParameter};
pub use casing::Casing;
pub use config::Configuration;
pub use contractor::{BuildReport, Contractor};
pub use converter::TypeScriptConverter;
pub use error::ContractError;
pub use metadata::{Manifest, TypeId, TypeUniverse};
pub use output::{DestinationType, OutputType};

/// Runs a complete generation for a manifest produced by a metadata scanner.
pub fn generate_from_manifest(
    manifest: &Manifest,
    configuration: Configuration,
) -> Result<BuildReport, ContractError> {
    Contractor::with_configuration(configuration).build(&manifest.types, &manifest.clients)
}
