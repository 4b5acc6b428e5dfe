//! TypeScript declaration files, one per converted type.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::casing::render_property_name;
use crate::config::Configuration;
use crate::error::{ReferenceFault, ReferencingType};
use crate::metadata::{TypeId, TypeUniverse};
use crate::output::{index_by_source, ObsoleteInfo, OutputType};
use crate::paths::{import_path, relative_path};
use crate::shape;
use crate::zod_schema::{schema_import, SchemaResolver, LIBRARY_IMPORT};
use crate::ContractError;

pub struct TypeScriptWriter<'a> {
    configuration: &'a Configuration,
    universe: &'a TypeUniverse,
    output_path: PathBuf,
}

impl<'a> TypeScriptWriter<'a> {
    pub fn new(
        configuration: &'a Configuration,
        universe: &'a TypeUniverse,
    ) -> Result<Self, ContractError> {
        Ok(Self {
            configuration,
            universe,
            output_path: configuration.output_path()?.to_path_buf(),
        })
    }

    /// Writes `<output>/<folder>/<file>.ts` and returns its path.
    ///
    /// `all_types` is the complete set of converted declarations; every type
    /// referenced by `output_type` must be part of it.
    pub fn write(
        &self,
        output_type: &OutputType,
        all_types: &[OutputType],
    ) -> Result<PathBuf, ContractError> {
        let content = self.render(output_type, all_types)?;
        let directory = self.output_path.join(&output_type.contracted_type.folder.path);
        let file_path = directory.join(format!("{}.ts", output_type.file_name));
        fs::create_dir_all(&directory)?;
        fs::write(&file_path, content)?;
        debug!("wrote {} to {}", output_type.full_name, file_path.display());
        Ok(file_path)
    }

    pub fn render(
        &self,
        output_type: &OutputType,
        all_types: &[OutputType],
    ) -> Result<String, ContractError> {
        let index = index_by_source(all_types);
        let mut out = String::new();

        if self.configuration.build_zod_schemas {
            out.push_str(LIBRARY_IMPORT);
            out.push('\n');
        }
        for imported in self.collect_imports(output_type, &index, all_types)? {
            out.push_str(&self.import_line(output_type, imported)?);
        }
        if !out.is_empty() {
            out.push('\n');
        }

        render_declaration(output_type, &mut out);

        if self.configuration.build_zod_schemas {
            let resolver = SchemaResolver::new(self.configuration, self.universe, all_types);
            out.push('\n');
            out.push_str(&resolver.render_declaration(output_type));
        }

        Ok(format!("{}\n", out.trim()))
    }

    fn collect_imports<'t>(
        &self,
        output_type: &OutputType,
        index: &HashMap<TypeId, &'t OutputType>,
        all_types: &[OutputType],
    ) -> Result<Vec<&'t OutputType>, ContractError> {
        let mut seen = HashSet::new();
        let mut imports = Vec::new();
        for property in output_type.properties().iter().filter(|p| !p.is_builtin) {
            for id in referenced_types(self.universe, self.configuration, index, property.source_type) {
                let Some(imported) = index.get(&id).copied() else {
                    return Err(self.reference_error(output_type, &property.source_name, id, index, all_types));
                };
                if imported.source() == output_type.source() {
                    continue;
                }
                if seen.insert(imported.source()) {
                    imports.push(imported);
                }
            }
        }
        Ok(imports)
    }

    fn import_line(
        &self,
        output_type: &OutputType,
        imported: &OutputType,
    ) -> Result<String, ContractError> {
        let relative = relative_path(
            &imported.contracted_type.folder.name,
            &output_type.contracted_type.folder.name,
        )
        .map_err(|e| ContractError::ImportError {
            type_name: output_type.full_name.clone(),
            imported: imported.full_name.clone(),
            message: e.to_string(),
        })?;

        let mut symbols = vec![imported.name.clone()];
        if self.configuration.build_zod_schemas {
            symbols.extend(schema_import(imported));
        }
        Ok(format!(
            "import {{ {} }} from '{}';\n",
            symbols.join(", "),
            import_path(&relative, &imported.file_name)
        ))
    }

    fn reference_error(
        &self,
        output_type: &OutputType,
        property: &str,
        missing: TypeId,
        index: &HashMap<TypeId, &OutputType>,
        all_types: &[OutputType],
    ) -> ContractError {
        let references = all_types
            .iter()
            .filter_map(|candidate| {
                let properties: Vec<String> = candidate
                    .properties()
                    .iter()
                    .filter(|p| {
                        referenced_types(self.universe, self.configuration, index, p.source_type)
                            .contains(&output_type.source())
                    })
                    .map(|p| p.source_name.clone())
                    .collect();
                (!properties.is_empty()).then(|| ReferencingType {
                    name: candidate.name.clone(),
                    full_name: candidate.full_name.clone(),
                    properties,
                })
            })
            .collect();

        ContractError::ReferenceError(Box::new(ReferenceFault {
            type_name: output_type.name.clone(),
            type_full_name: output_type.full_name.clone(),
            property: property.to_string(),
            property_type: self.universe.full_name(missing).to_string(),
            references,
        }))
    }
}

/// Declarations a use of `source` depends on, in first-use order.
///
/// Mirrors the converter's rule order: mapped builtins contribute nothing,
/// converted declarations are themselves the dependency, and wrappers
/// (dictionaries, collections, tuples, nullables, bound generics) are looked
/// through to every composite position they hold.
pub(crate) fn referenced_types(
    universe: &TypeUniverse,
    configuration: &Configuration,
    known: &HashMap<TypeId, &OutputType>,
    source: TypeId,
) -> Vec<TypeId> {
    let mut out = Vec::new();
    collect_referenced(universe, configuration, known, source, &mut out, &mut HashSet::new());
    out
}

fn collect_referenced(
    universe: &TypeUniverse,
    configuration: &Configuration,
    known: &HashMap<TypeId, &OutputType>,
    source: TypeId,
    out: &mut Vec<TypeId>,
    visited: &mut HashSet<TypeId>,
) {
    if !visited.insert(source) {
        return;
    }
    let Some(descriptor) = universe.get(source) else {
        out.push(source);
        return;
    };
    if configuration.type_map(&descriptor.full_name).is_some() {
        return;
    }
    if known.contains_key(&source) {
        out.push(source);
        return;
    }
    if descriptor.is_generic_parameter() {
        return;
    }

    let mut nested = Vec::new();
    if let Some((key, value)) = shape::dictionary_arguments(universe, source) {
        nested.extend([key, value]);
    } else if let Some(element) = shape::enumerable_element(universe, source) {
        nested.push(element);
    } else if let Some(items) = shape::tuple_elements(universe, source) {
        nested.extend_from_slice(items);
    } else if let Some(inner) = shape::nullable_inner(universe, source) {
        nested.push(inner);
    } else if let Some((definition, arguments)) = shape::bound_generic(universe, source) {
        nested.push(definition);
        nested.extend_from_slice(arguments);
    } else if shape::is_dynamic(universe, source) {
        return;
    } else {
        out.push(source);
        return;
    }

    for id in nested {
        collect_referenced(universe, configuration, known, id, out, visited);
    }
}

fn render_declaration(output_type: &OutputType, out: &mut String) {
    if output_type.is_enum() {
        out.push_str(&format!("export enum {} {{\n", output_type.name));
        for member in output_type.enum_members() {
            push_deprecation(out, member.obsolete.as_ref(), "  ");
            out.push_str(&format!(
                "  {} = {},\n",
                render_property_name(&member.destination_name),
                member.destination_value
            ));
        }
    } else {
        out.push_str(&format!(
            "export interface {} {{\n",
            output_type.declaration_name()
        ));
        for property in output_type.properties() {
            push_deprecation(out, property.obsolete.as_ref(), "  ");
            out.push_str(&format!(
                "  {}{}{}: {};\n",
                if property.is_readonly { "readonly " } else { "" },
                render_property_name(&property.destination_name),
                if property.is_nullable { "?" } else { "" },
                property.full_destination_type()
            ));
        }
    }
    out.push_str("}\n");
}

/// Appends a JSDoc `@deprecated` block when the member is obsolete.
pub(crate) fn push_deprecation(out: &mut String, obsolete: Option<&ObsoleteInfo>, indent: &str) {
    let Some(obsolete) = obsolete else {
        return;
    };
    out.push_str(&format!("{indent}/**\n"));
    out.push_str(format!("{indent} * @deprecated {}", obsolete.trimmed_reason()).trim_end());
    out.push('\n');
    out.push_str(&format!("{indent} */\n"));
}
