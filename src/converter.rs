//! Resolution of source types into output declarations and use-site destinations.
//!
//! A [`TypeScriptConverter`] lives for one generation run. It keeps a memo
//! cache keyed by [`TypeId`] so every composite source type is converted at
//! most once. A composite is reserved in the cache before its members are
//! resolved, which is what makes self- and mutually-referencing types
//! terminate.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::casing::{to_casing, to_typescript_name};
use crate::config::Configuration;
use crate::metadata::{PropertyDescriptor, TypeDescriptor, TypeId, TypeUniverse};
use crate::output::{
    ContractedType, DestinationType, OutputBody, OutputEnumMember, OutputProperty, OutputType,
};
use crate::shape;
use crate::ContractError;

/// Use-site facts that travel into a destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveContext {
    pub is_readonly: bool,
    pub is_nullable: bool,
    /// The member carries a dynamic marker and resolves to `any`.
    pub is_dynamic: bool,
}

impl ResolveContext {
    fn element(&self) -> Self {
        Self {
            is_readonly: self.is_readonly,
            is_nullable: false,
            is_dynamic: false,
        }
    }
}

#[derive(Default)]
struct ConversionCache {
    /// Reserved before members are resolved; present for in-flight and finished types.
    contracted: HashMap<TypeId, ContractedType>,
    converted: HashMap<TypeId, OutputType>,
    /// Completion order.
    order: Vec<TypeId>,
}

pub struct TypeScriptConverter<'a> {
    configuration: &'a Configuration,
    universe: &'a TypeUniverse,
    cache: ConversionCache,
}

impl<'a> TypeScriptConverter<'a> {
    pub fn new(configuration: &'a Configuration, universe: &'a TypeUniverse) -> Self {
        Self {
            configuration,
            universe,
            cache: ConversionCache::default(),
        }
    }

    pub fn configuration(&self) -> &'a Configuration {
        self.configuration
    }

    pub fn universe(&self) -> &'a TypeUniverse {
        self.universe
    }

    /// Converts a requested type into its declaration.
    ///
    /// Requested types are always declared, even when their shape would make
    /// a use site resolve them to a collection or a builtin.
    pub fn convert(&mut self, source: TypeId) -> Result<OutputType, ContractError> {
        self.convert_composite(source)?;
        self.cache.converted.get(&source).cloned().ok_or_else(|| {
            ContractError::InvalidArgument(format!(
                "type {} is still being converted",
                self.universe.full_name(source)
            ))
        })
    }

    /// Resolves a source type at a use site without use-site modifiers.
    pub fn destination_type(&mut self, source: TypeId) -> Result<DestinationType, ContractError> {
        self.resolve(source, &ResolveContext::default())
    }

    /// Resolves a source type at a use site.
    ///
    /// Rules apply in a fixed order and the first match wins: mapped
    /// builtins, memoized composites, generic parameters, dictionaries,
    /// enumerables, tuples, nullable wrappers, bound generics, dynamic
    /// values, and finally fresh composites.
    pub fn resolve(
        &mut self,
        source: TypeId,
        context: &ResolveContext,
    ) -> Result<DestinationType, ContractError> {
        let universe = self.universe;
        let descriptor = universe.descriptor(source)?;

        if let Some(mapped) = self.configuration.type_map(&descriptor.full_name) {
            let (type_name, is_array) = match mapped.strip_suffix("[]") {
                Some(element) => (element, true),
                None => (mapped, false),
            };
            let mut destination = DestinationType::builtin(type_name, source);
            destination.full_name = Some(descriptor.full_name.clone());
            destination.is_array = is_array;
            return Ok(with_context(destination, context));
        }

        if let Some(contracted) = self.cache.contracted.get(&source) {
            return Ok(reference(contracted, source, context));
        }

        if descriptor.is_generic_parameter() {
            let destination = DestinationType::builtin(&descriptor.name, source);
            return Ok(with_context(destination, context));
        }

        if let Some((key, value)) = shape::dictionary_arguments(universe, source) {
            return self.resolve_dictionary(source, key, value, context);
        }

        if let Some(element) = shape::enumerable_element(universe, source) {
            return self.resolve_enumerable(source, element, context);
        }

        if let Some(items) = shape::tuple_elements(universe, source) {
            return self.resolve_tuple(source, items, context);
        }

        if let Some(inner) = shape::nullable_inner(universe, source) {
            let inner_context = ResolveContext {
                is_nullable: true,
                ..*context
            };
            let mut destination = self.resolve(inner, &inner_context)?;
            destination.is_nullable = true;
            destination.source_type = source;
            return Ok(destination);
        }

        if let Some((definition, arguments)) = shape::bound_generic(universe, source) {
            return self.resolve_bound_generic(source, definition, arguments, context);
        }

        if context.is_dynamic || shape::is_dynamic(universe, source) {
            return Ok(with_context(DestinationType::builtin("any", source), context));
        }

        self.convert_composite(source)?;
        match self.cache.contracted.get(&source) {
            Some(contracted) => Ok(reference(contracted, source, context)),
            None => Err(ContractError::InvalidArgument(format!(
                "type {} was not recorded after conversion",
                descriptor.full_name
            ))),
        }
    }

    fn resolve_dictionary(
        &mut self,
        source: TypeId,
        key: TypeId,
        value: TypeId,
        context: &ResolveContext,
    ) -> Result<DestinationType, ContractError> {
        let key_destination = self.resolve(key, &context.element())?;
        let value_destination = self.resolve(value, &context.element())?;

        Ok(DestinationType {
            type_name: format!(
                "{{ [key: {}]: {} }}",
                key_destination.full_type_name(),
                nullable_slot(&value_destination, false)
            ),
            full_name: value_destination.full_name.clone(),
            import_type: value_destination.import_type.clone(),
            is_builtin: key_destination.is_builtin && value_destination.is_builtin,
            is_array: false,
            is_readonly: context.is_readonly,
            is_nullable: context.is_nullable,
            is_generic: false,
            generic_type_arguments: Vec::new(),
            source_type: source,
            inner_type: value_destination.inner_type.or(Some(value)),
        })
    }

    fn resolve_enumerable(
        &mut self,
        source: TypeId,
        element: TypeId,
        context: &ResolveContext,
    ) -> Result<DestinationType, ContractError> {
        let element_destination = self.resolve(element, &context.element())?;
        // Nested collections keep the inner brackets: `number[][]`.
        let type_name = nullable_slot(&element_destination, true);

        Ok(DestinationType {
            type_name,
            full_name: element_destination.full_name,
            import_type: element_destination.import_type,
            is_builtin: element_destination.is_builtin,
            is_array: true,
            is_readonly: context.is_readonly,
            is_nullable: context.is_nullable,
            is_generic: element_destination.is_generic,
            generic_type_arguments: element_destination.generic_type_arguments,
            source_type: source,
            inner_type: Some(element),
        })
    }

    fn resolve_tuple(
        &mut self,
        source: TypeId,
        items: &[TypeId],
        context: &ResolveContext,
    ) -> Result<DestinationType, ContractError> {
        let mut slots = Vec::with_capacity(items.len());
        let mut is_builtin = true;
        let mut import_type = None;
        for (index, item) in items.iter().enumerate() {
            let destination = self.resolve(*item, &context.element())?;
            if !destination.is_builtin && import_type.is_none() {
                import_type = Some(destination.import_type.clone());
            }
            is_builtin &= destination.is_builtin;
            slots.push(format!("item{}: {}", index + 1, destination.full_type_name()));
        }
        let type_name = format!("{{ {} }}", slots.join(", "));

        let mut destination = DestinationType::builtin(&type_name, source);
        destination.is_builtin = is_builtin;
        if let Some(import_type) = import_type {
            destination.import_type = import_type;
        }
        Ok(with_context(destination, context))
    }

    fn resolve_bound_generic(
        &mut self,
        source: TypeId,
        definition: TypeId,
        arguments: &[TypeId],
        context: &ResolveContext,
    ) -> Result<DestinationType, ContractError> {
        let template = self.resolve(definition, &ResolveContext::default())?;
        let mut resolved = Vec::with_capacity(arguments.len());
        for argument in arguments {
            resolved.push(self.resolve(*argument, &ResolveContext::default())?);
        }
        let rendered: Vec<String> = resolved.iter().map(DestinationType::full_type_name).collect();

        Ok(DestinationType {
            type_name: format!("{}<{}>", template.type_name, rendered.join(", ")),
            full_name: template.full_name,
            import_type: template.import_type,
            is_builtin: template.is_builtin && resolved.iter().all(|a| a.is_builtin),
            is_array: false,
            is_readonly: context.is_readonly,
            is_nullable: context.is_nullable,
            is_generic: true,
            generic_type_arguments: resolved,
            source_type: source,
            inner_type: None,
        })
    }

    fn convert_composite(&mut self, source: TypeId) -> Result<(), ContractError> {
        if self.cache.contracted.contains_key(&source) {
            return Ok(());
        }
        let universe = self.universe;
        let descriptor = universe.descriptor(source)?;
        let contracted = ContractedType::from_descriptor(descriptor, source, self.configuration);
        debug!(
            "converting {} into {}/{}",
            descriptor.full_name, contracted.folder.name, contracted.name
        );
        self.cache.contracted.insert(source, contracted.clone());

        match self.build_output(descriptor, contracted) {
            Ok(output) => {
                self.cache.converted.insert(source, output);
                self.cache.order.push(source);
                Ok(())
            }
            Err(err) => {
                self.cache.contracted.remove(&source);
                Err(err)
            }
        }
    }

    fn build_output(
        &mut self,
        descriptor: &'a TypeDescriptor,
        contracted: ContractedType,
    ) -> Result<OutputType, ContractError> {
        let body = if descriptor.is_enum() {
            OutputBody::Enum(
                descriptor
                    .enum_members
                    .iter()
                    .map(|member| OutputEnumMember {
                        source_name: member.name.clone(),
                        destination_name: member.name.clone(),
                        destination_value: member.value,
                        obsolete: member.obsolete.clone(),
                    })
                    .collect(),
            )
        } else {
            OutputBody::Object(self.collect_properties(contracted.source)?)
        };

        let is_generic = descriptor.is_generic_definition();
        let mut generic_type_arguments = Vec::new();
        if is_generic {
            for parameter in &descriptor.generic_arguments {
                generic_type_arguments.push(self.destination_type(*parameter)?);
            }
        }

        Ok(OutputType {
            name: contracted.name.clone(),
            full_name: descriptor.full_name.clone(),
            file_name: to_casing(&contracted.name, self.configuration.casing),
            contracted_type: contracted,
            is_generic,
            generic_type_arguments,
            body,
        })
    }

    /// Public instance properties of the type, its base chain and its
    /// interfaces, first declaration of a name wins.
    fn collect_properties(&mut self, source: TypeId) -> Result<Vec<OutputProperty>, ContractError> {
        let universe = self.universe;
        let mut declaring = Vec::new();
        declaring_types(universe, source, &mut declaring, &mut HashSet::new());

        let mut seen = HashSet::new();
        let mut properties = Vec::new();
        for declaring_type in declaring {
            let descriptor = universe.descriptor(declaring_type)?;
            for property in &descriptor.properties {
                if property.is_static || !property.has_public_getter {
                    continue;
                }
                if !seen.insert(property.name.as_str()) {
                    continue;
                }
                properties.push(self.build_property(property)?);
            }
        }
        Ok(properties)
    }

    fn build_property(&mut self, property: &PropertyDescriptor) -> Result<OutputProperty, ContractError> {
        let is_readonly = !property.has_public_setter;
        let is_nullable = property.is_nullable
            || property.nullable_override
            || shape::is_nullable(self.universe, property.property_type);
        let context = ResolveContext {
            is_readonly,
            is_nullable,
            is_dynamic: property.is_dynamic,
        };
        let destination = self.resolve(property.property_type, &context)?;

        Ok(OutputProperty {
            source_name: property.name.clone(),
            source_type: property.property_type,
            inner_source_type: destination.inner_type,
            destination_name: to_typescript_name(&property.name),
            destination_type: destination.type_name,
            import_type: destination.import_type,
            is_builtin: destination.is_builtin,
            is_array: destination.is_array,
            is_nullable: destination.is_nullable || is_nullable,
            is_readonly,
            is_generic: destination.is_generic,
            generic_type_arguments: destination.generic_type_arguments,
            obsolete: property.obsolete.clone(),
        })
    }

    pub fn is_converted(&self, source: TypeId) -> bool {
        self.cache.converted.contains_key(&source)
    }

    pub fn output_type(&self, source: TypeId) -> Option<&OutputType> {
        self.cache.converted.get(&source)
    }

    /// Every converted declaration, requested and discovered, in completion order.
    pub fn output_types(&self) -> impl Iterator<Item = &OutputType> {
        self.cache
            .order
            .iter()
            .filter_map(|id| self.cache.converted.get(id))
    }

    pub fn len(&self) -> usize {
        self.cache.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.order.is_empty()
    }
}

/// Text of a collection element or dictionary value. Nullable slots keep
/// their `null`, parenthesized inside arrays: `(number | null)[]`.
fn nullable_slot(destination: &DestinationType, in_array: bool) -> String {
    let text = destination.full_type_name();
    match (destination.is_nullable, in_array) {
        (false, _) => text,
        (true, true) => format!("({text} | null)"),
        (true, false) => format!("{text} | null"),
    }
}

fn with_context(mut destination: DestinationType, context: &ResolveContext) -> DestinationType {
    destination.is_readonly = context.is_readonly;
    destination.is_nullable = context.is_nullable;
    destination
}

fn reference(contracted: &ContractedType, source: TypeId, context: &ResolveContext) -> DestinationType {
    DestinationType {
        type_name: contracted.name.clone(),
        full_name: Some(contracted.full_name.clone()),
        import_type: contracted.name.clone(),
        is_builtin: false,
        is_array: false,
        is_readonly: context.is_readonly,
        is_nullable: context.is_nullable,
        is_generic: false,
        generic_type_arguments: Vec::new(),
        source_type: source,
        inner_type: None,
    }
}

/// Self, then the base chain, then interfaces; each declaring type once.
fn declaring_types(
    universe: &TypeUniverse,
    id: TypeId,
    out: &mut Vec<TypeId>,
    visited: &mut HashSet<TypeId>,
) {
    if !visited.insert(id) {
        return;
    }
    out.push(id);
    let Some(descriptor) = universe.get(id) else {
        return;
    };
    if let Some(base) = descriptor.base_type {
        declaring_types(universe, base, out, visited);
    }
    for interface in &descriptor.interfaces {
        declaring_types(universe, *interface, out, visited);
    }
}
