//! RPC client files built from endpoint descriptors.
//!
//! The writer resolves every endpoint against the converted declarations and
//! hands a plain [`ApiClientTemplateDto`] to a [`ClientTemplate`] for
//! rendering; templates never see the type universe.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiClientEndpoint, EndpointMethod, EndpointParameter, ParameterOrigin};
use crate::casing::to_typescript_name;
use crate::client_templates::ClientTemplate;
use crate::config::Configuration;
use crate::converter::TypeScriptConverter;
use crate::error::ReferenceFault;
use crate::metadata::{TypeId, TypeUniverse};
use crate::output::{index_by_source, DestinationType, ObsoleteInfo, OutputType};
use crate::shape;
use crate::typescript_writer::referenced_types;
use crate::zod_schema::{schema_import, SchemaResolver, LIBRARY_IMPORT};
use crate::ContractError;

pub const CLIENTS_FOLDER: &str = "clients";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiClientTemplateDto {
    pub name: String,
    pub imports: Vec<String>,
    pub has_json_parameter: bool,
    pub obsolete: Option<ObsoleteInfo>,
    pub endpoints: Vec<EndpointTemplateDto>,
    pub build_zod_schemas: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EndpointTemplateDto {
    /// Method name in the generated class.
    pub name: String,
    pub obsolete: Option<ObsoleteInfo>,
    /// Lower-case HTTP verb.
    pub method: String,
    /// Declared promise type, `Response` when the endpoint returns nothing.
    pub return_type: String,
    pub return_schema: Option<String>,
    pub return_unparsed_response: bool,
    pub url: String,
    /// `url` contains `${...}` interpolations.
    pub dynamic_url: bool,
    /// Rendered signature entries, without the trailing cancellation token.
    pub parameters: Vec<String>,
    pub route_parameters: Vec<RouteParameterTemplateDto>,
    pub query_parameters: Vec<QueryParameterTemplateDto>,
    pub requires_body: bool,
    pub body_parameter: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteParameterTemplateDto {
    pub name: String,
    pub is_optional: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryParameterTemplateDto {
    /// Query string key.
    pub key: String,
    /// Expression producing the value.
    pub value: String,
    pub is_nullable: bool,
    pub is_array: bool,
}

/// Import statements for one client file, merged per imported declaration.
#[derive(Default)]
struct ClientImports {
    needs_library: bool,
    entries: Vec<(TypeId, String, Vec<String>)>,
}

impl ClientImports {
    fn add(&mut self, source: TypeId, path: String, symbol: String) {
        match self.entries.iter_mut().find(|(id, _, _)| *id == source) {
            Some((_, _, symbols)) => {
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
            None => self.entries.push((source, path, vec![symbol])),
        }
    }

    fn into_lines(self, build_zod_schemas: bool) -> Vec<String> {
        let mut lines = Vec::new();
        if build_zod_schemas && self.needs_library {
            lines.push(LIBRARY_IMPORT.to_string());
        }
        for (_, path, symbols) in self.entries {
            lines.push(format!("import {{ {} }} from '{}';", symbols.join(", "), path));
        }
        lines
    }
}

pub struct ApiClientWriter<'a> {
    configuration: &'a Configuration,
    universe: &'a TypeUniverse,
    output_path: PathBuf,
}

impl<'a> ApiClientWriter<'a> {
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

    /// Writes `<output>/clients/<ClientName>.ts` and returns its path.
    pub fn write(
        &self,
        client: &ApiClient,
        all_types: &[OutputType],
        converter: &mut TypeScriptConverter<'_>,
        template: &dyn ClientTemplate,
    ) -> Result<PathBuf, ContractError> {
        let data = self.build_template_data(client, all_types, converter)?;
        let content = template.render(&data);

        let directory = self.output_path.join(CLIENTS_FOLDER);
        let file_path = directory.join(format!("{}.ts", client.name));
        fs::create_dir_all(&directory)?;
        fs::write(&file_path, format!("{}\n", content.trim()))?;
        debug!("wrote client {} to {}", client.name, file_path.display());
        Ok(file_path)
    }

    pub fn build_template_data(
        &self,
        client: &ApiClient,
        all_types: &[OutputType],
        converter: &mut TypeScriptConverter<'_>,
    ) -> Result<ApiClientTemplateDto, ContractError> {
        let index = index_by_source(all_types);
        let resolver = SchemaResolver::new(self.configuration, self.universe, all_types);
        let mut imports = ClientImports::default();

        let mut endpoints = Vec::with_capacity(client.endpoints.len());
        for endpoint in &client.endpoints {
            debug!("building endpoint {}.{}", client.name, endpoint.name);
            endpoints.push(self.build_endpoint(
                client,
                endpoint,
                converter,
                &index,
                &resolver,
                &mut imports,
            )?);
        }

        Ok(ApiClientTemplateDto {
            name: client.name.clone(),
            imports: imports.into_lines(self.configuration.build_zod_schemas),
            has_json_parameter: endpoints.iter().any(|e| e.body_parameter.is_some()),
            obsolete: client.obsolete.clone(),
            endpoints,
            build_zod_schemas: self.configuration.build_zod_schemas,
        })
    }

    fn build_endpoint(
        &self,
        client: &ApiClient,
        endpoint: &ApiClientEndpoint,
        converter: &mut TypeScriptConverter<'_>,
        index: &HashMap<TypeId, &OutputType>,
        resolver: &SchemaResolver<'_>,
        imports: &mut ClientImports,
    ) -> Result<EndpointTemplateDto, ContractError> {
        let method = http_method(client, endpoint)?;

        let mut parameters = Vec::new();
        let mut route_names = Vec::new();
        let mut query_parameters = Vec::new();
        let mut body_parameter = None;
        for parameter in endpoint.parameters.iter().filter(|p| !p.is_excluded()) {
            let destination = converter.destination_type(parameter.parameter_type)?;
            debug!(
                "mapped parameter {} of {}.{} to {}",
                parameter.name, client.name, endpoint.name, destination
            );
            parameters.push(parameter_signature(parameter, &destination));
            if !destination.is_builtin {
                self.import_types(client, endpoint, destination.source_type, index, imports, false)?;
            }

            match parameter.origin() {
                ParameterOrigin::Body => {
                    if body_parameter.is_none() {
                        body_parameter = Some(parameter.name.clone());
                    }
                }
                ParameterOrigin::Route => route_names.push(parameter.name.clone()),
                ParameterOrigin::Query => query_parameters.extend(self.query_entries(
                    client,
                    endpoint,
                    parameter,
                    &destination,
                    index,
                )),
            }
        }

        let (return_type, return_schema) = match endpoint.return_type {
            None => ("Response".to_string(), None),
            Some(declared) => {
                let declared = shape::unwrap_async(self.universe, declared);
                let destination = converter.destination_type(declared)?;
                if !destination.is_builtin {
                    self.import_types(client, endpoint, destination.source_type, index, imports, true)?;
                }
                let schema = if self.configuration.build_zod_schemas {
                    Some(self.return_schema(client, endpoint, &destination, converter, index, resolver, imports)?)
                } else {
                    None
                };
                if schema.as_deref().is_some_and(|s| s.contains("z.")) {
                    imports.needs_library = true;
                }
                (destination.full_type_name(), schema)
            }
        };

        let built = build_url(client.route_prefix.as_deref(), &endpoint.route, &route_names);
        if !built.unresolved.is_empty() {
            warn!(
                "url '{}' of {}.{} still contains placeholders without a matching parameter: {}",
                built.url,
                client.name,
                endpoint.name,
                built.unresolved.join(", ")
            );
        }

        Ok(EndpointTemplateDto {
            name: to_typescript_name(&endpoint.name),
            obsolete: endpoint.obsolete.clone(),
            method: method.to_string(),
            return_unparsed_response: endpoint.return_type.is_none(),
            return_type,
            return_schema,
            dynamic_url: built.url.contains("${"),
            url: built.url,
            parameters,
            route_parameters: route_names
                .iter()
                .map(|name| RouteParameterTemplateDto {
                    is_optional: built.optional.contains(name),
                    name: name.clone(),
                })
                .collect(),
            query_parameters,
            requires_body: matches!(
                endpoint.http_method,
                EndpointMethod::Post | EndpointMethod::Put | EndpointMethod::Patch
            ),
            body_parameter,
        })
    }

    /// Response validator. A supplied element type overrides the declared
    /// return for validation only, wrapped in `z.array` for collections.
    #[allow(clippy::too_many_arguments)]
    fn return_schema(
        &self,
        client: &ApiClient,
        endpoint: &ApiClientEndpoint,
        declared: &DestinationType,
        converter: &mut TypeScriptConverter<'_>,
        index: &HashMap<TypeId, &OutputType>,
        resolver: &SchemaResolver<'_>,
        imports: &mut ClientImports,
    ) -> Result<String, ContractError> {
        let Some(element) = endpoint.unwrapped_return_type else {
            return Ok(resolver.destination_schema(declared));
        };
        let element = converter.destination_type(element)?;
        if !element.is_builtin {
            self.import_types(client, endpoint, element.source_type, index, imports, true)?;
        }
        let schema = resolver.destination_schema(&element);
        if endpoint.is_enumerable_return {
            Ok(format!("z.array({schema})"))
        } else {
            Ok(schema)
        }
    }

    fn import_types(
        &self,
        client: &ApiClient,
        endpoint: &ApiClientEndpoint,
        source: TypeId,
        index: &HashMap<TypeId, &OutputType>,
        imports: &mut ClientImports,
        with_schema: bool,
    ) -> Result<(), ContractError> {
        for id in referenced_types(self.universe, self.configuration, index, source) {
            let Some(imported) = index.get(&id) else {
                return Err(ContractError::ReferenceError(Box::new(ReferenceFault {
                    type_name: client.name.clone(),
                    type_full_name: client.type_name.clone(),
                    property: endpoint.name.clone(),
                    property_type: self.universe.full_name(id).to_string(),
                    references: Vec::new(),
                })));
            };
            let path = format!(
                "{}/{}/{}",
                self.configuration.relative_root(),
                imported.contracted_type.folder.import_path(),
                imported.file_name
            )
            .replace("//", "/");

            imports.add(id, path.clone(), imported.name.clone());
            if with_schema && self.configuration.build_zod_schemas {
                if let Some(schema) = schema_import(imported) {
                    imports.add(id, path, schema);
                }
            }
        }
        Ok(())
    }

    /// Builtin query values become one entry; composite ones expand into one
    /// entry per member.
    fn query_entries(
        &self,
        client: &ApiClient,
        endpoint: &ApiClientEndpoint,
        parameter: &EndpointParameter,
        destination: &DestinationType,
        index: &HashMap<TypeId, &OutputType>,
    ) -> Vec<QueryParameterTemplateDto> {
        let is_nullable = destination.is_nullable || parameter.is_optional;
        let single = || {
            vec![QueryParameterTemplateDto {
                key: parameter.name.clone(),
                value: parameter.name.clone(),
                is_nullable,
                is_array: destination.is_array,
            }]
        };
        if destination.is_builtin {
            return single();
        }

        let source = shape::nullable_inner(self.universe, destination.source_type)
            .unwrap_or(destination.source_type);
        match index.get(&source) {
            Some(output_type) if output_type.is_enum() => single(),
            Some(output_type) if !destination.is_array => {
                let accessor = if is_nullable { "?." } else { "." };
                output_type
                    .properties()
                    .iter()
                    .map(|property| QueryParameterTemplateDto {
                        key: property.destination_name.clone(),
                        value: format!("{}{}{}", parameter.name, accessor, property.destination_name),
                        is_nullable: is_nullable || property.is_nullable,
                        is_array: property.is_array,
                    })
                    .collect()
            }
            _ => {
                warn!(
                    "unable to expand query parameter {} of {}.{}; it is left out of the query string",
                    parameter.name, client.name, endpoint.name
                );
                Vec::new()
            }
        }
    }
}

fn http_method(client: &ApiClient, endpoint: &ApiClientEndpoint) -> Result<&'static str, ContractError> {
    match endpoint.http_method {
        EndpointMethod::Get => Ok("get"),
        EndpointMethod::Post => Ok("post"),
        EndpointMethod::Put => Ok("put"),
        EndpointMethod::Patch => Ok("patch"),
        EndpointMethod::Delete => Ok("delete"),
        EndpointMethod::Head | EndpointMethod::Options | EndpointMethod::Invalid => {
            Err(ContractError::UnmappedHttpMethod {
                endpoint: format!("{}.{}", client.name, endpoint.name),
                method: endpoint.http_method.as_str().to_string(),
            })
        }
    }
}

/// `name`, `name?` for nullable values, `name: T | undefined` for optional ones.
fn parameter_signature(parameter: &EndpointParameter, destination: &DestinationType) -> String {
    let mut out = parameter.name.clone();
    if destination.is_nullable && !parameter.is_optional {
        out.push('?');
    }
    out.push_str(": ");
    out.push_str(&destination.full_type_name());
    if parameter.is_optional {
        out.push_str(" | undefined");
    }
    out
}

struct BuiltUrl {
    url: String,
    optional: Vec<String>,
    unresolved: Vec<String>,
}

fn placeholder_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\*{0,2}([A-Za-z0-9_]+)(?::[^{}]*?)?(\?)?\}").expect("valid placeholder regex")
    })
}

fn residual_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(^|[^$])\{([A-Za-z0-9_]+)\??\}").expect("valid residual placeholder regex")
    })
}

fn merge_route(prefix: Option<&str>, route: &str) -> String {
    if let Some(absolute) = route.strip_prefix("~/") {
        return absolute.to_string();
    }
    if let Some(absolute) = route.strip_prefix('/') {
        return absolute.to_string();
    }
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) if route.is_empty() => prefix.to_string(),
        Some(prefix) => format!("{prefix}/{route}"),
        None => route.to_string(),
    }
}

/// Merges the prefix, normalizes placeholder syntax, interpolates required
/// route parameters and drops optional segments (appended at runtime).
fn build_url(prefix: Option<&str>, route: &str, route_parameters: &[String]) -> BuiltUrl {
    let merged = merge_route(prefix, route);
    let mut url = placeholder_pattern()
        .replace_all(&merged, "{${1}${2}}")
        .into_owned();

    let mut optional = Vec::new();
    for name in route_parameters {
        let escaped = regex::escape(name);
        let optional_segment = Regex::new(&format!(r"(?i)/?\{{{escaped}\?\}}"));
        if let Ok(pattern) = optional_segment {
            if pattern.is_match(&url) {
                url = pattern.replace_all(&url, "").into_owned();
                optional.push(name.clone());
                continue;
            }
        }
        if let Ok(pattern) = Regex::new(&format!(r"(?i)\{{{escaped}\}}")) {
            let interpolation = format!("${{{name}}}");
            url = pattern
                .replace_all(&url, regex::NoExpand(&interpolation))
                .into_owned();
        }
    }

    let url = url.trim_end_matches('/').to_string();
    let unresolved = residual_pattern()
        .captures_iter(&url)
        .filter_map(|c| c.get(2).map(|m| m.as_str().to_string()))
        .collect();
    BuiltUrl {
        url,
        optional,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn merges_prefix_unless_route_is_absolute() {
        assert_eq!(merge_route(Some("api/test"), "latest"), "api/test/latest");
        assert_eq!(merge_route(Some("api/test/"), ""), "api/test");
        assert_eq!(merge_route(Some("api/test"), "/health"), "health");
        assert_eq!(merge_route(Some("api/test"), "~/status"), "status");
        assert_eq!(merge_route(None, "latest"), "latest");
    }

    #[test]
    fn interpolates_required_route_parameters() {
        let built = build_url(Some("test"), "latest/{year}", &names(&["year"]));
        assert_eq!(built.url, "test/latest/${year}");
        assert!(built.optional.is_empty());
        assert!(built.unresolved.is_empty());
    }

    #[test]
    fn normalizes_constraints_and_drops_optional_segments() {
        let built = build_url(None, "items/{id:int}/{page:int?}/", &names(&["id", "page"]));
        assert_eq!(built.url, "items/${id}");
        assert_eq!(built.optional, names(&["page"]));
    }

    #[test]
    fn reports_placeholders_without_parameters() {
        let built = build_url(None, "items/{id}/{tenant}", &names(&["id"]));
        assert_eq!(built.url, "items/${id}/{tenant}");
        assert_eq!(built.unresolved, names(&["tenant"]));
    }

    #[test]
    fn signature_marks_nullable_and_optional_parameters() {
        let mut destination = DestinationType::builtin("number", TypeId(0));
        let parameter = EndpointParameter::new("year", TypeId(0));
        assert_eq!(parameter_signature(&parameter, &destination), "year: number");

        destination.is_nullable = true;
        assert_eq!(parameter_signature(&parameter, &destination), "year?: number");

        let optional = EndpointParameter::new("year", TypeId(0)).optional();
        assert_eq!(
            parameter_signature(&optional, &destination),
            "year: number | undefined"
        );
    }

    #[test]
    fn head_and_options_are_unmapped() {
        let client = ApiClient::new("TestClient", "Acme.TestController", None);
        let endpoint = ApiClientEndpoint::new("Check", "", EndpointMethod::Head, None);
        let err = http_method(&client, &endpoint).unwrap_err();
        assert!(err.to_string().contains("HEAD"));
        assert!(err.to_string().contains("TestClient.Check"));
    }
}
