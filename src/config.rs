//! Generation options threaded through the converter and the writers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::casing::{sanitize_type_name, Casing};
use crate::metadata::TypeDescriptor;
use crate::ContractError;

pub const DEFAULT_RELATIVE_ROOT: &str = "..";
pub const DEFAULT_CLIENT_TEMPLATE: &str = "aurelia";
pub const DEFAULT_SUFFIXES: &[&str] = &["Dto", "Request", "Response"];

/// Source full name to destination type text for types that need no declaration.
const BUILTIN_TYPE_MAPS: &[(&str, &str)] = &[
    ("System.String", "string"),
    ("System.Char", "string"),
    ("System.DateTime", "string"),
    ("System.DateTimeOffset", "string"),
    ("System.DateOnly", "string"),
    ("System.TimeOnly", "string"),
    ("System.TimeSpan", "string"),
    ("System.Guid", "string"),
    ("System.Uri", "string"),
    ("System.Globalization.CultureInfo", "string"),
    ("System.Boolean", "boolean"),
    ("System.Byte", "number"),
    ("System.SByte", "number"),
    ("System.Int16", "number"),
    ("System.UInt16", "number"),
    ("System.Int32", "number"),
    ("System.UInt32", "number"),
    ("System.Int64", "number"),
    ("System.UInt64", "number"),
    ("System.Single", "number"),
    ("System.Double", "number"),
    ("System.Decimal", "number"),
    ("System.IO.Stream", "number[]"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub search: String,
    pub replacement: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub output_path: Option<PathBuf>,
    pub casing: Casing,
    pub relative_root: Option<String>,
    pub suffixes: Vec<String>,
    pub types: Vec<String>,
    pub replacements: Vec<Replacement>,
    pub strip: Vec<String>,
    /// Custom maps; these take precedence over the built-in primitives.
    pub type_maps: BTreeMap<String, String>,
    pub build_zod_schemas: bool,
    pub generate_api_clients: bool,
    pub api_client_template: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            output_path: None,
            casing: Casing::Pascal,
            relative_root: None,
            suffixes: DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect(),
            types: Vec::new(),
            replacements: Vec::new(),
            strip: Vec::new(),
            type_maps: BTreeMap::new(),
            build_zod_schemas: false,
            generate_api_clients: false,
            api_client_template: DEFAULT_CLIENT_TEMPLATE.to_string(),
        }
    }
}

impl Configuration {
    pub fn from_json_str(input: &str) -> Result<Self, ContractError> {
        serde_json::from_str(input).map_err(|e| {
            ContractError::SerializationError(format!("failed to parse configuration: {e}"))
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).map_err(|e| {
            ContractError::ConfigError(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&input)
    }

    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_casing(mut self, casing: Casing) -> Self {
        self.casing = casing;
        self
    }

    pub fn with_relative_root(mut self, relative_root: &str) -> Self {
        self.relative_root = Some(relative_root.to_string());
        self
    }

    pub fn with_zod_schemas(mut self, enabled: bool) -> Self {
        self.build_zod_schemas = enabled;
        self
    }

    pub fn with_api_clients(mut self, enabled: bool) -> Self {
        self.generate_api_clients = enabled;
        self
    }

    pub fn with_api_client_template(mut self, template: &str) -> Self {
        self.api_client_template = template.to_string();
        self
    }

    /// Replaces the default suffix list.
    pub fn with_suffixes(mut self, suffixes: &[&str]) -> Self {
        self.suffixes = suffixes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn add_type(mut self, full_name: &str) -> Self {
        if !self.types.iter().any(|t| t == full_name) {
            self.types.push(full_name.to_string());
        }
        self
    }

    pub fn add_strip(mut self, prefix: &str) -> Self {
        if !self.strip.iter().any(|s| s == prefix) {
            self.strip.push(prefix.to_string());
        }
        self
    }

    pub fn add_replacement(mut self, search: &str, replacement: &str) -> Result<Self, ContractError> {
        if self.replacements.iter().any(|r| r.search == search) {
            return Err(ContractError::ConfigError(format!(
                "replacement for '{search}' is already configured"
            )));
        }
        self.replacements.push(Replacement {
            search: search.to_string(),
            replacement: replacement.to_string(),
        });
        Ok(self)
    }

    pub fn add_custom_map(mut self, full_name: &str, destination: &str) -> Result<Self, ContractError> {
        if self.type_maps.contains_key(full_name) {
            return Err(ContractError::ConfigError(format!(
                "custom map for '{full_name}' is already configured"
            )));
        }
        self.type_maps
            .insert(full_name.to_string(), destination.to_string());
        Ok(self)
    }

    pub fn output_path(&self) -> Result<&Path, ContractError> {
        self.output_path
            .as_deref()
            .ok_or_else(|| ContractError::ConfigError("no output path configured".to_string()))
    }

    pub fn relative_root(&self) -> &str {
        self.relative_root.as_deref().unwrap_or(DEFAULT_RELATIVE_ROOT)
    }

    /// Destination text for a source type that maps to a builtin, if any.
    pub fn type_map(&self, full_name: &str) -> Option<&str> {
        if let Some(custom) = self.type_maps.get(full_name) {
            return Some(custom.as_str());
        }
        BUILTIN_TYPE_MAPS
            .iter()
            .find(|(source, _)| *source == full_name)
            .map(|(_, destination)| *destination)
    }

    /// Strips configured prefixes, then applies replacements in order.
    pub fn apply_replacements(&self, full_name: &str) -> String {
        let mut out = full_name.to_string();
        for prefix in &self.strip {
            if let Some(rest) = out.strip_prefix(prefix.as_str()) {
                out = rest.to_string();
            }
        }
        for rule in &self.replacements {
            out = out.replace(&rule.search, &rule.replacement);
        }
        out
    }

    /// Whether a source type is requested for generation.
    pub fn selects(&self, descriptor: &TypeDescriptor) -> bool {
        if self.types.iter().any(|t| *t == descriptor.full_name) {
            return true;
        }
        let name = sanitize_type_name(&descriptor.name).to_lowercase();
        self.suffixes
            .iter()
            .any(|suffix| !suffix.is_empty() && name.ends_with(&suffix.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TypeKind;

    #[test]
    fn custom_maps_override_builtins() {
        let configuration = Configuration::default()
            .add_custom_map("System.DateTime", "Date")
            .unwrap();
        assert_eq!(configuration.type_map("System.DateTime"), Some("Date"));
        assert_eq!(configuration.type_map("System.Int32"), Some("number"));
        assert_eq!(configuration.type_map("System.Object"), None);
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        let configuration = Configuration::default()
            .add_custom_map("Acme.Money", "number")
            .unwrap();
        assert!(configuration.add_custom_map("Acme.Money", "string").is_err());

        let configuration = Configuration::default().add_replacement("A.", "B.").unwrap();
        let err = configuration.add_replacement("A.", "C.").unwrap_err();
        assert!(err.to_string().contains("already configured"));
    }

    #[test]
    fn strips_then_replaces() {
        let configuration = Configuration::default()
            .add_strip("Acme.")
            .add_replacement("Contracts", "Api")
            .unwrap();
        assert_eq!(
            configuration.apply_replacements("Acme.Contracts.UserDto"),
            "Api.UserDto"
        );
    }

    #[test]
    fn selects_by_suffix_or_explicit_name() {
        let configuration = Configuration::default().add_type("Acme.Settings");
        let dto = TypeDescriptor::new("Acme.UserDTO", TypeKind::Class);
        let settings = TypeDescriptor::new("Acme.Settings", TypeKind::Class);
        let other = TypeDescriptor::new("Acme.Service", TypeKind::Class);

        assert!(configuration.selects(&dto));
        assert!(configuration.selects(&settings));
        assert!(!configuration.selects(&other));
    }

    #[test]
    fn parses_partial_json() {
        let configuration =
            Configuration::from_json_str(r#"{"casing":"kebab","build_zod_schemas":true}"#).unwrap();
        assert_eq!(configuration.casing, Casing::Kebab);
        assert!(configuration.build_zod_schemas);
        assert_eq!(configuration.suffixes.len(), 3);
        assert_eq!(configuration.relative_root(), "..");
    }
}
