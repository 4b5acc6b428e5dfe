//! Output model produced by the converter and consumed by the writers.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::casing::{sanitize_type_name, to_casing};
use crate::config::Configuration;
use crate::metadata::{TypeDescriptor, TypeId};

/// Deprecation marker carried from a source member or type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObsoleteInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ObsoleteInfo {
    pub fn new(reason: Option<&str>) -> Self {
        Self {
            reason: reason.map(str::to_string),
        }
    }

    /// Reason text with surrounding whitespace removed; empty when absent.
    pub fn trimmed_reason(&self) -> &str {
        self.reason.as_deref().map(str::trim).unwrap_or("")
    }
}

/// Output directory derived from a source namespace.
///
/// `name` keeps the dotted form used for relative path computation, `path`
/// the directory relative to the output root. Equality is by path only.
#[derive(Clone, Debug, Eq)]
pub struct Folder {
    pub name: String,
    pub path: PathBuf,
}

impl Folder {
    pub fn from_segments(segments: &[String]) -> Self {
        Self {
            name: segments.join("."),
            path: segments.iter().collect(),
        }
    }

    /// Folder path with forward slashes, for module specifiers.
    pub fn import_path(&self) -> String {
        self.name.replace('.', "/")
    }
}

impl PartialEq for Folder {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Hash for Folder {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// Resolved identity of one composite source type in the output tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractedType {
    pub name: String,
    pub full_name: String,
    pub source: TypeId,
    pub folder: Folder,
}

impl ContractedType {
    /// Applies replacements and strip prefixes to the full name, then splits
    /// it into folder segments (cased) and a type name (uncased).
    pub fn from_descriptor(
        descriptor: &TypeDescriptor,
        source: TypeId,
        configuration: &Configuration,
    ) -> Self {
        let replaced = configuration.apply_replacements(&descriptor.full_name);
        let mut segments: Vec<&str> = replaced.split('.').filter(|s| !s.is_empty()).collect();
        let last = segments.pop().unwrap_or(descriptor.name.as_str());
        let folder_segments: Vec<String> = segments
            .iter()
            .map(|segment| to_casing(segment, configuration.casing))
            .collect();

        Self {
            name: sanitize_type_name(last),
            full_name: descriptor.full_name.clone(),
            source,
            folder: Folder::from_segments(&folder_segments),
        }
    }
}

/// Resolved destination of one source type at one use site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationType {
    pub type_name: String,
    /// Full name of the composite this resolves to, when there is one.
    pub full_name: Option<String>,
    /// Name imported from another module when the type is not builtin.
    pub import_type: String,
    pub is_builtin: bool,
    pub is_array: bool,
    pub is_readonly: bool,
    pub is_nullable: bool,
    pub is_generic: bool,
    pub generic_type_arguments: Vec<DestinationType>,
    pub source_type: TypeId,
    pub inner_type: Option<TypeId>,
}

impl DestinationType {
    /// A builtin destination with no wrappers.
    pub fn builtin(type_name: &str, source_type: TypeId) -> Self {
        Self {
            type_name: type_name.to_string(),
            full_name: None,
            import_type: type_name.to_string(),
            is_builtin: true,
            is_array: false,
            is_readonly: false,
            is_nullable: false,
            is_generic: false,
            generic_type_arguments: Vec::new(),
            source_type,
            inner_type: None,
        }
    }

    /// Type name with an array suffix when the destination is a collection.
    pub fn full_type_name(&self) -> String {
        if self.is_array {
            format!("{}[]", self.type_name)
        } else {
            self.type_name.clone()
        }
    }
}

impl fmt::Display for DestinationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_type_name())?;
        if self.is_nullable {
            f.write_str(" (nullable)")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputProperty {
    pub source_name: String,
    pub source_type: TypeId,
    pub inner_source_type: Option<TypeId>,
    pub destination_name: String,
    pub destination_type: String,
    pub import_type: String,
    pub is_builtin: bool,
    pub is_array: bool,
    pub is_nullable: bool,
    pub is_readonly: bool,
    pub is_generic: bool,
    pub generic_type_arguments: Vec<DestinationType>,
    pub obsolete: Option<ObsoleteInfo>,
}

impl OutputProperty {
    pub fn full_destination_type(&self) -> String {
        if self.is_array {
            format!("{}[]", self.destination_type)
        } else {
            self.destination_type.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputEnumMember {
    pub source_name: String,
    pub destination_name: String,
    pub destination_value: i64,
    pub obsolete: Option<ObsoleteInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputBody {
    Object(Vec<OutputProperty>),
    Enum(Vec<OutputEnumMember>),
}

/// One emitted declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputType {
    pub name: String,
    pub full_name: String,
    /// File stem, already cased.
    pub file_name: String,
    pub contracted_type: ContractedType,
    /// True for unbound generic definitions; `generic_type_arguments` then
    /// holds the type parameters.
    pub is_generic: bool,
    pub generic_type_arguments: Vec<DestinationType>,
    pub body: OutputBody,
}

impl OutputType {
    pub fn source(&self) -> TypeId {
        self.contracted_type.source
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.body, OutputBody::Enum(_))
    }

    pub fn properties(&self) -> &[OutputProperty] {
        match &self.body {
            OutputBody::Object(properties) => properties,
            OutputBody::Enum(_) => &[],
        }
    }

    pub fn enum_members(&self) -> &[OutputEnumMember] {
        match &self.body {
            OutputBody::Enum(members) => members,
            OutputBody::Object(_) => &[],
        }
    }

    /// `Name` or `Name<T, U>` for generic definitions.
    pub fn declaration_name(&self) -> String {
        if !self.is_generic || self.generic_type_arguments.is_empty() {
            return self.name.clone();
        }
        let parameters: Vec<&str> = self
            .generic_type_arguments
            .iter()
            .map(|argument| argument.type_name.as_str())
            .collect();
        format!("{}<{}>", self.name, parameters.join(", "))
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, count) = match &self.body {
            OutputBody::Object(properties) => ("properties", properties.len()),
            OutputBody::Enum(members) => ("members", members.len()),
        };
        write!(
            f,
            "{} ({}) in {} with {} {}",
            self.declaration_name(),
            self.full_name,
            self.contracted_type.folder.name,
            count,
            kind
        )
    }
}

/// Lookup of converted declarations by the source type they were built from.
pub fn index_by_source(all_types: &[OutputType]) -> HashMap<TypeId, &OutputType> {
    all_types
        .iter()
        .map(|output_type| (output_type.source(), output_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casing::Casing;
    use crate::metadata::{TypeDescriptor, TypeKind};

    #[test]
    fn contracted_type_applies_replacements_and_casing() {
        let configuration = Configuration::default()
            .with_casing(Casing::Kebab)
            .add_replacement("TypeContractor.", "")
            .unwrap();
        let descriptor = TypeDescriptor::new(
            "TypeContractor.Tests.TypeScript.SimpleTypes",
            TypeKind::Class,
        );

        let contracted = ContractedType::from_descriptor(&descriptor, TypeId(3), &configuration);
        assert_eq!(contracted.name, "SimpleTypes");
        assert_eq!(contracted.folder.name, "tests.type-script");
        assert_eq!(contracted.folder.import_path(), "tests/type-script");
        assert_eq!(contracted.source, TypeId(3));
    }

    #[test]
    fn folders_compare_by_path() {
        let left = Folder {
            name: "a.b".to_string(),
            path: PathBuf::from("a").join("b"),
        };
        let right = Folder::from_segments(&["a".to_string(), "b".to_string()]);
        assert_eq!(left, right);
    }

    #[test]
    fn full_destination_type_appends_array_suffix() {
        let mut destination = DestinationType::builtin("number", TypeId(0));
        assert_eq!(destination.full_type_name(), "number");
        destination.is_array = true;
        assert_eq!(destination.full_type_name(), "number[]");
    }
}
