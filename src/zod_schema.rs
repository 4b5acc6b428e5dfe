//! Companion zod validation schemas for emitted declarations.

use std::collections::HashMap;

use crate::casing::{escape_string, render_property_name, to_typescript_name};
use crate::config::Configuration;
use crate::metadata::{TypeId, TypeUniverse};
use crate::output::{index_by_source, DestinationType, OutputProperty, OutputType};
use crate::shape;

pub const LIBRARY_IMPORT: &str = "import { z } from 'zod';";

const ANY: &str = "z.any()";

/// Validators for source types whose destination alone is not specific enough.
const SOURCE_VALIDATORS: &[(&str, &str)] = &[
    ("System.String", "z.string()"),
    ("System.Char", "z.string()"),
    ("System.Uri", "z.string()"),
    ("System.Globalization.CultureInfo", "z.string()"),
    ("System.Guid", "z.string().uuid()"),
    ("System.Boolean", "z.boolean()"),
    ("System.DateTime", "z.string().datetime({ offset: true })"),
    ("System.DateTimeOffset", "z.string().datetime({ offset: true })"),
    ("System.DateOnly", "z.string().date()"),
    ("System.TimeOnly", "z.string().time()"),
    ("System.TimeSpan", "z.string()"),
    ("System.Byte", "z.number()"),
    ("System.SByte", "z.number()"),
    ("System.Int16", "z.number()"),
    ("System.UInt16", "z.number()"),
    ("System.Int32", "z.number()"),
    ("System.UInt32", "z.number()"),
    ("System.Int64", "z.number()"),
    ("System.UInt64", "z.number()"),
    ("System.Single", "z.number()"),
    ("System.Double", "z.number()"),
    ("System.Decimal", "z.number()"),
];

/// Name of the exported schema constant for an object declaration.
pub fn schema_name(output_type: &OutputType) -> String {
    format!("{}Schema", output_type.name)
}

/// Schema symbol to import alongside a declaration. Enums are validated with
/// `z.nativeEnum` and need no companion import.
pub fn schema_import(output_type: &OutputType) -> Option<String> {
    if output_type.is_enum() {
        None
    } else {
        Some(schema_name(output_type))
    }
}

struct Schema {
    expression: String,
    nullable: bool,
}

impl Schema {
    fn plain(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            nullable: false,
        }
    }

    fn render(self) -> String {
        if self.nullable {
            format!("{}.nullable()", self.expression)
        } else {
            self.expression
        }
    }
}

/// Builds schema expressions against one snapshot of converted declarations.
pub struct SchemaResolver<'a> {
    configuration: &'a Configuration,
    universe: &'a TypeUniverse,
    outputs: HashMap<TypeId, &'a OutputType>,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(
        configuration: &'a Configuration,
        universe: &'a TypeUniverse,
        all_types: &'a [OutputType],
    ) -> Self {
        Self {
            configuration,
            universe,
            outputs: index_by_source(all_types),
        }
    }

    /// Renders the schema constant (or enum schema pair) for a declaration.
    pub fn render_declaration(&self, output_type: &OutputType) -> String {
        let name = &output_type.name;
        if output_type.is_enum() {
            let members: Vec<String> = output_type
                .enum_members()
                .iter()
                .map(|member| format!("\"{}\"", escape_string(&member.destination_name)))
                .collect();
            let validator = if members.is_empty() {
                "z.never()".to_string()
            } else {
                format!("z.enum([{}])", members.join(", "))
            };
            return format!(
                "export const {name}Enum = {validator};\nexport type {name}EnumType = z.infer<typeof {name}Enum>;\n"
            );
        }

        let mut out = format!("export const {} = ", schema_name(output_type));
        if output_type.is_generic && !output_type.generic_type_arguments.is_empty() {
            let bounds: Vec<String> = output_type
                .generic_type_arguments
                .iter()
                .map(|parameter| format!("{} extends z.ZodTypeAny", parameter.type_name))
                .collect();
            let arguments: Vec<String> = output_type
                .generic_type_arguments
                .iter()
                .map(|parameter| {
                    format!(
                        "{}: {}",
                        parameter_schema_name(&parameter.type_name),
                        parameter.type_name
                    )
                })
                .collect();
            out.push_str(&format!("<{}>({}) => ", bounds.join(", "), arguments.join(", ")));
        }
        out.push_str("z.object({\n");
        for property in output_type.properties() {
            out.push_str(&format!(
                "  {}: {},\n",
                render_property_name(&property.destination_name),
                self.property_schema(property)
            ));
        }
        out.push_str("});\n");
        out
    }

    /// Full validator for one property, including its modifiers.
    pub fn property_schema(&self, property: &OutputProperty) -> String {
        let schema = if property.is_builtin && !property.is_array && property.destination_type == "any" {
            Schema::plain(ANY)
        } else {
            self.schema(property.source_type)
        };

        let mut expression = schema.expression;
        if schema.nullable || property.is_nullable {
            expression.push_str(".nullable()");
        } else if property.is_readonly {
            expression.push_str(".readonly()");
        }
        expression
    }

    /// Validator for a use-site destination, such as an endpoint return type.
    pub fn destination_schema(&self, destination: &DestinationType) -> String {
        let schema = self.schema(destination.source_type);
        let mut expression = schema.expression;
        if schema.nullable || destination.is_nullable {
            expression.push_str(".nullable()");
        }
        expression
    }

    /// Follows the same rule order as the converter so a schema always
    /// describes the declared type.
    fn schema(&self, id: TypeId) -> Schema {
        let universe = self.universe;
        let Some(descriptor) = universe.get(id) else {
            return Schema::plain(ANY);
        };

        if let Some(mapped) = self.configuration.type_map(&descriptor.full_name) {
            let custom = self.configuration.type_maps.contains_key(&descriptor.full_name);
            return Schema::plain(builtin_validator(&descriptor.full_name, mapped, custom));
        }

        if let Some(output_type) = self.outputs.get(&id) {
            return Schema::plain(reference_schema(output_type));
        }

        if descriptor.is_generic_parameter() {
            return Schema::plain(parameter_schema_name(&descriptor.name));
        }

        if let Some((_, value)) = shape::dictionary_arguments(universe, id) {
            return Schema::plain(format!(
                "z.record(z.string(), {})",
                self.schema(value).render()
            ));
        }

        if let Some(element) = shape::enumerable_element(universe, id) {
            return Schema::plain(format!("z.array({})", self.schema(element).render()));
        }

        if let Some(items) = shape::tuple_elements(universe, id) {
            let slots: Vec<String> = items
                .iter()
                .enumerate()
                .map(|(index, item)| format!("item{}: {}", index + 1, self.schema(*item).render()))
                .collect();
            return Schema::plain(format!("z.object({{ {} }})", slots.join(", ")));
        }

        if let Some(inner) = shape::nullable_inner(universe, id) {
            return Schema {
                expression: self.schema(inner).render(),
                nullable: true,
            };
        }

        if let Some((definition, arguments)) = shape::bound_generic(universe, id) {
            if let Some(template) = self.outputs.get(&definition).filter(|t| !t.is_enum()) {
                let rendered: Vec<String> = arguments
                    .iter()
                    .map(|argument| self.schema(*argument).render())
                    .collect();
                return Schema::plain(format!("{}({})", schema_name(template), rendered.join(", ")));
            }
        }

        Schema::plain(ANY)
    }
}

fn reference_schema(output_type: &OutputType) -> String {
    if output_type.is_enum() {
        format!("z.nativeEnum({})", output_type.name)
    } else {
        schema_name(output_type)
    }
}

fn parameter_schema_name(parameter: &str) -> String {
    format!("{}Schema", to_typescript_name(parameter))
}

fn builtin_validator(full_name: &str, destination: &str, custom: bool) -> String {
    if !custom {
        if let Some((_, validator)) = SOURCE_VALIDATORS.iter().find(|(source, _)| *source == full_name) {
            return (*validator).to_string();
        }
    }
    destination_validator(destination)
}

fn destination_validator(destination: &str) -> String {
    if let Some(element) = destination.strip_suffix("[]") {
        return format!("z.array({})", destination_validator(element));
    }
    match destination {
        "string" => "z.string()".to_string(),
        "number" => "z.number()".to_string(),
        "boolean" => "z.boolean()".to_string(),
        _ => ANY.to_string(),
    }
}
