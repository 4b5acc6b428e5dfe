//! Source type descriptors handed to the converter by a metadata loader.
//!
//! The loader itself lives outside this crate. It produces a [`TypeUniverse`]
//! (usually inside a [`Manifest`]) in which every distinct source type has
//! exactly one [`TypeId`]. That identity is what the conversion cache keys on.
//!
//! Well-known system shapes are described the same way a runtime would
//! describe them: `List<T>` is a bound instance of `` List`1 `` implementing
//! `` IEnumerable`1 ``, `int?` is a bound `` Nullable`1 ``, and so on. The
//! builder methods below create those descriptors so producers and tests do
//! not have to spell out the interface graph by hand.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::output::ObsoleteInfo;
use crate::ContractError;

/// Full names of the system types the shape predicates recognise.
pub mod names {
    pub const OBJECT: &str = "System.Object";
    pub const STRING: &str = "System.String";
    pub const NULLABLE: &str = "System.Nullable`1";
    pub const VALUE_TUPLE: &str = "System.ValueTuple`";
    pub const ENUMERABLE: &str = "System.Collections.Generic.IEnumerable`1";
    pub const LIST: &str = "System.Collections.Generic.List`1";
    pub const DICTIONARY: &str = "System.Collections.Generic.Dictionary`2";
    pub const IDICTIONARY: &str = "System.Collections.Generic.IDictionary`2";
    pub const IREADONLY_DICTIONARY: &str = "System.Collections.Generic.IReadOnlyDictionary`2";
    pub const TASK: &str = "System.Threading.Tasks.Task`1";
    pub const VALUE_TASK: &str = "System.Threading.Tasks.ValueTask`1";
    pub const ACTION_RESULT: &str = "Microsoft.AspNetCore.Mvc.ActionResult`1";
}

/// Identity of one source type inside a [`TypeUniverse`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub usize);

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    #[default]
    Class,
    Struct,
    Interface,
    Enum,
    Array,
    GenericParameter,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Short name, including a generic arity suffix such as `` List`1 ``.
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<TypeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<TypeId>,
    /// Element type of an array.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<TypeId>,
    /// Unbound definition of a bound generic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_definition: Option<TypeId>,
    /// Bound arguments, or the parameters of an unbound definition.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_arguments: Vec<TypeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_members: Vec<EnumMemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new(full_name: &str, kind: TypeKind) -> Self {
        let name = full_name
            .rsplit('.')
            .next()
            .unwrap_or(full_name)
            .rsplit('+')
            .next()
            .unwrap_or(full_name)
            .to_string();
        Self {
            name,
            full_name: full_name.to_string(),
            kind,
            base_type: None,
            interfaces: Vec::new(),
            element_type: None,
            generic_definition: None,
            generic_arguments: Vec::new(),
            properties: Vec::new(),
            enum_members: Vec::new(),
        }
    }

    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }

    pub fn is_generic_parameter(&self) -> bool {
        self.kind == TypeKind::GenericParameter
    }

    pub fn is_bound_generic(&self) -> bool {
        self.generic_definition.is_some() && !self.generic_arguments.is_empty()
    }

    pub fn is_generic_definition(&self) -> bool {
        self.generic_definition.is_none() && !self.generic_arguments.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: TypeId,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default = "default_true")]
    pub has_public_getter: bool,
    #[serde(default = "default_true")]
    pub has_public_setter: bool,
    /// Nullability annotation reported by the loader (`string?`).
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsolete: Option<ObsoleteInfo>,
    /// Explicit "treat as nullable" marker for sources without annotations.
    #[serde(default)]
    pub nullable_override: bool,
    #[serde(default)]
    pub is_dynamic: bool,
}

fn default_true() -> bool {
    true
}

impl PropertyDescriptor {
    pub fn new(name: &str, property_type: TypeId) -> Self {
        Self {
            name: name.to_string(),
            property_type,
            is_static: false,
            has_public_getter: true,
            has_public_setter: true,
            is_nullable: false,
            obsolete: None,
            nullable_override: false,
            is_dynamic: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.has_public_setter = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.has_public_getter = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn nullable_override(mut self) -> Self {
        self.nullable_override = true;
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.is_dynamic = true;
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn obsolete(mut self, reason: Option<&str>) -> Self {
        self.obsolete = Some(ObsoleteInfo::new(reason));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumMemberDescriptor {
    pub name: String,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsolete: Option<ObsoleteInfo>,
}

impl EnumMemberDescriptor {
    pub fn new(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value,
            obsolete: None,
        }
    }

    pub fn obsolete(mut self, reason: Option<&str>) -> Self {
        self.obsolete = Some(ObsoleteInfo::new(reason));
        self
    }
}

/// Arena of source type descriptors, addressed by [`TypeId`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<TypeDescriptor>", into = "Vec<TypeDescriptor>")]
pub struct TypeUniverse {
    types: Vec<TypeDescriptor>,
    by_full_name: HashMap<String, TypeId>,
}

impl From<Vec<TypeDescriptor>> for TypeUniverse {
    fn from(types: Vec<TypeDescriptor>) -> Self {
        let mut by_full_name = HashMap::new();
        for (index, descriptor) in types.iter().enumerate() {
            by_full_name
                .entry(descriptor.full_name.clone())
                .or_insert(TypeId(index));
        }
        Self {
            types,
            by_full_name,
        }
    }
}

impl From<TypeUniverse> for Vec<TypeDescriptor> {
    fn from(universe: TypeUniverse) -> Self {
        universe.types
    }
}

impl TypeUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDescriptor)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, descriptor)| (TypeId(index), descriptor))
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeDescriptor> {
        self.types.get(id.0)
    }

    /// Looks up a descriptor, failing for handles that are not part of this universe.
    pub fn descriptor(&self, id: TypeId) -> Result<&TypeDescriptor, ContractError> {
        self.get(id).ok_or_else(|| {
            ContractError::InvalidArgument(format!(
                "type handle {id} is not part of the type universe ({} types)",
                self.types.len()
            ))
        })
    }

    pub fn find(&self, full_name: &str) -> Option<TypeId> {
        self.by_full_name.get(full_name).copied()
    }

    pub fn full_name(&self, id: TypeId) -> &str {
        self.get(id).map(|d| d.full_name.as_str()).unwrap_or("<unknown>")
    }

    pub fn add(&mut self, descriptor: TypeDescriptor) -> TypeId {
        let id = TypeId(self.types.len());
        self.by_full_name
            .entry(descriptor.full_name.clone())
            .or_insert(id);
        self.types.push(descriptor);
        id
    }

    fn get_or_add(&mut self, full_name: &str, kind: TypeKind) -> TypeId {
        match self.find(full_name) {
            Some(id) => id,
            None => self.add(TypeDescriptor::new(full_name, kind)),
        }
    }

    /// A memberless system type such as `System.Int32` or `System.String`.
    pub fn primitive(&mut self, full_name: &str) -> TypeId {
        let kind = if full_name == names::STRING || full_name == names::OBJECT {
            TypeKind::Class
        } else {
            TypeKind::Struct
        };
        self.get_or_add(full_name, kind)
    }

    pub fn class(&mut self, full_name: &str) -> TypeId {
        self.get_or_add(full_name, TypeKind::Class)
    }

    pub fn interface(&mut self, full_name: &str) -> TypeId {
        self.get_or_add(full_name, TypeKind::Interface)
    }

    pub fn enumeration(&mut self, full_name: &str, members: Vec<EnumMemberDescriptor>) -> TypeId {
        let id = self.get_or_add(full_name, TypeKind::Enum);
        self.types[id.0].enum_members = members;
        id
    }

    pub fn add_property(&mut self, owner: TypeId, property: PropertyDescriptor) {
        if let Some(descriptor) = self.types.get_mut(owner.0) {
            descriptor.properties.push(property);
        }
    }

    pub fn set_base_type(&mut self, id: TypeId, base: TypeId) {
        if let Some(descriptor) = self.types.get_mut(id.0) {
            descriptor.base_type = Some(base);
        }
    }

    pub fn add_interface(&mut self, id: TypeId, interface: TypeId) {
        if let Some(descriptor) = self.types.get_mut(id.0) {
            if !descriptor.interfaces.contains(&interface) {
                descriptor.interfaces.push(interface);
            }
        }
    }

    /// Declares an unbound generic class such as `` Acme.Paged`1 `` with parameters `["T"]`.
    pub fn generic_definition(&mut self, full_name: &str, parameters: &[&str]) -> TypeId {
        self.generic_definition_of_kind(full_name, TypeKind::Class, parameters)
    }

    fn generic_definition_of_kind(
        &mut self,
        full_name: &str,
        kind: TypeKind,
        parameters: &[&str],
    ) -> TypeId {
        if let Some(existing) = self.find(full_name) {
            return existing;
        }
        let id = self.add(TypeDescriptor::new(full_name, kind));
        let mut arguments = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let mut descriptor = TypeDescriptor::new(
                &format!("{full_name}!{parameter}"),
                TypeKind::GenericParameter,
            );
            descriptor.name = (*parameter).to_string();
            arguments.push(self.add(descriptor));
        }
        self.types[id.0].generic_arguments = arguments;
        id
    }

    /// Binds a generic definition to concrete arguments.
    ///
    /// Bound instances are identity-unique: constructing the same definition
    /// with the same arguments twice yields the same [`TypeId`]. Base type,
    /// interfaces and properties of the definition are substituted.
    pub fn construct(&mut self, definition: TypeId, arguments: &[TypeId]) -> TypeId {
        let Some(template) = self.get(definition).cloned() else {
            return definition;
        };
        let argument_names: Vec<String> = arguments
            .iter()
            .map(|a| self.full_name(*a).to_string())
            .collect();
        let full_name = format!("{}[{}]", template.full_name, argument_names.join(","));
        if let Some(existing) = self.find(&full_name) {
            return existing;
        }

        let mut bound = TypeDescriptor::new(&template.full_name, template.kind);
        bound.name = template.name.clone();
        bound.full_name = full_name;
        bound.generic_definition = Some(definition);
        bound.generic_arguments = arguments.to_vec();
        let id = self.add(bound);

        let substitutions: BTreeMap<TypeId, TypeId> = template
            .generic_arguments
            .iter()
            .copied()
            .zip(arguments.iter().copied())
            .collect();

        let base_type = template
            .base_type
            .map(|base| self.substitute(base, &substitutions));
        let interfaces: Vec<TypeId> = template
            .interfaces
            .iter()
            .map(|iface| self.substitute(*iface, &substitutions))
            .collect();
        let properties: Vec<PropertyDescriptor> = template
            .properties
            .iter()
            .map(|property| {
                let mut property = property.clone();
                property.property_type = self.substitute(property.property_type, &substitutions);
                property
            })
            .collect();

        let descriptor = &mut self.types[id.0];
        descriptor.base_type = base_type;
        descriptor.interfaces = interfaces;
        descriptor.properties = properties;
        id
    }

    fn substitute(&mut self, id: TypeId, substitutions: &BTreeMap<TypeId, TypeId>) -> TypeId {
        if let Some(replacement) = substitutions.get(&id) {
            return *replacement;
        }
        let Some(descriptor) = self.get(id) else {
            return id;
        };
        if let Some(element) = descriptor.element_type {
            let element = self.substitute(element, substitutions);
            return self.array_of(element);
        }
        let Some(definition) = descriptor.generic_definition else {
            return id;
        };
        let arguments = descriptor.generic_arguments.clone();
        let substituted: Vec<TypeId> = arguments
            .iter()
            .map(|a| self.substitute(*a, substitutions))
            .collect();
        if substituted == arguments {
            return id;
        }
        self.construct(definition, &substituted)
    }

    pub fn enumerable_of(&mut self, element: TypeId) -> TypeId {
        let definition =
            self.generic_definition_of_kind(names::ENUMERABLE, TypeKind::Interface, &["T"]);
        self.construct(definition, &[element])
    }

    pub fn list_of(&mut self, element: TypeId) -> TypeId {
        let existed = self.find(names::LIST).is_some();
        let definition = self.generic_definition_of_kind(names::LIST, TypeKind::Class, &["T"]);
        if !existed {
            let parameter = self.types[definition.0].generic_arguments[0];
            let iface = self.enumerable_of(parameter);
            self.add_interface(definition, iface);
        }
        self.construct(definition, &[element])
    }

    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        let full_name = format!("{}[]", self.full_name(element));
        if let Some(existing) = self.find(&full_name) {
            return existing;
        }
        let id = self.add(TypeDescriptor::new(&full_name, TypeKind::Array));
        self.types[id.0].element_type = Some(element);
        let iface = self.enumerable_of(element);
        self.add_interface(id, iface);
        id
    }

    pub fn dictionary_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        let existed = self.find(names::DICTIONARY).is_some();
        let definition =
            self.generic_definition_of_kind(names::DICTIONARY, TypeKind::Class, &["TKey", "TValue"]);
        if !existed {
            let parameters = self.types[definition.0].generic_arguments.clone();
            let iface_definition = self.generic_definition_of_kind(
                names::IDICTIONARY,
                TypeKind::Interface,
                &["TKey", "TValue"],
            );
            let iface = self.construct(iface_definition, &parameters);
            self.add_interface(definition, iface);
        }
        self.construct(definition, &[key, value])
    }

    pub fn read_only_dictionary_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        let definition = self.generic_definition_of_kind(
            names::IREADONLY_DICTIONARY,
            TypeKind::Interface,
            &["TKey", "TValue"],
        );
        self.construct(definition, &[key, value])
    }

    pub fn nullable_of(&mut self, inner: TypeId) -> TypeId {
        let definition = self.generic_definition_of_kind(names::NULLABLE, TypeKind::Struct, &["T"]);
        self.construct(definition, &[inner])
    }

    pub fn tuple_of(&mut self, items: &[TypeId]) -> TypeId {
        let full_name = format!("{}{}", names::VALUE_TUPLE, items.len());
        let parameters: Vec<String> = (1..=items.len()).map(|i| format!("T{i}")).collect();
        let parameter_refs: Vec<&str> = parameters.iter().map(String::as_str).collect();
        let definition =
            self.generic_definition_of_kind(&full_name, TypeKind::Struct, &parameter_refs);
        self.construct(definition, items)
    }

    pub fn task_of(&mut self, inner: TypeId) -> TypeId {
        let definition = self.generic_definition_of_kind(names::TASK, TypeKind::Class, &["TResult"]);
        self.construct(definition, &[inner])
    }
}

/// Everything an external scanner hands over for one generation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub types: TypeUniverse,
    #[serde(default)]
    pub clients: Vec<ApiClient>,
}

impl Manifest {
    pub fn from_json_str(input: &str) -> Result<Self, ContractError> {
        serde_json::from_str(input).map_err(|e| {
            ContractError::SerializationError(format!("failed to parse manifest: {e}"))
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref();
        let input = fs::read_to_string(path)?;
        Self::from_json_str(&input).map_err(|e| {
            ContractError::SerializationError(format!("{} ({})", e, path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{names, PropertyDescriptor, TypeKind, TypeUniverse};

    #[test]
    fn constructed_generics_are_identity_unique() {
        let mut universe = TypeUniverse::new();
        let int = universe.primitive("System.Int32");
        let first = universe.list_of(int);
        let second = universe.list_of(int);
        assert_eq!(first, second);

        let string = universe.primitive(names::STRING);
        assert_ne!(first, universe.list_of(string));
    }

    #[test]
    fn list_instances_implement_bound_enumerable() {
        let mut universe = TypeUniverse::new();
        let int = universe.primitive("System.Int32");
        let list = universe.list_of(int);
        let enumerable = universe.enumerable_of(int);

        let descriptor = universe.get(list).unwrap();
        assert!(descriptor.interfaces.contains(&enumerable));
    }

    #[test]
    fn construct_substitutes_properties_of_self_referencing_definitions() {
        let mut universe = TypeUniverse::new();
        let node = universe.generic_definition("Acme.Node`1", &["T"]);
        let parameter = universe.get(node).unwrap().generic_arguments[0];
        let next = universe.construct(node, &[parameter]);
        universe.add_property(node, PropertyDescriptor::new("Value", parameter));
        universe.add_property(node, PropertyDescriptor::new("Next", next));

        let int = universe.primitive("System.Int32");
        let bound = universe.construct(node, &[int]);
        let descriptor = universe.get(bound).unwrap();
        assert_eq!(descriptor.properties[0].property_type, int);
        assert_eq!(descriptor.properties[1].property_type, bound);
    }

    #[test]
    fn universe_round_trips_through_json() {
        let mut universe = TypeUniverse::new();
        let dto = universe.class("Acme.Contracts.UserDto");
        let string = universe.primitive(names::STRING);
        universe.add_property(dto, PropertyDescriptor::new("Name", string));

        let json = serde_json::to_string(&universe).unwrap();
        let parsed: TypeUniverse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.find("Acme.Contracts.UserDto"), Some(dto));
        assert_eq!(parsed.get(dto).unwrap().kind, TypeKind::Class);
        assert_eq!(parsed.get(dto).unwrap().properties.len(), 1);
    }
}
