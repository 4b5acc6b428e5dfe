//! Built-in renderers for API client files.

use crate::client_writer::{ApiClientTemplateDto, EndpointTemplateDto, QueryParameterTemplateDto};
use crate::typescript_writer::push_deprecation;
use crate::ContractError;

pub const AURELIA: &str = "aurelia";
pub const REACT_AXIOS: &str = "react-axios";

/// Renders resolved client data into source text.
pub trait ClientTemplate {
    fn name(&self) -> &'static str;

    fn render(&self, client: &ApiClientTemplateDto) -> String;
}

pub fn template_by_name(name: &str) -> Result<Box<dyn ClientTemplate>, ContractError> {
    match name.trim().to_ascii_lowercase().as_str() {
        AURELIA => Ok(Box::new(AureliaTemplate)),
        REACT_AXIOS => Ok(Box::new(ReactAxiosTemplate)),
        other => Err(ContractError::ConfigError(format!(
            "unknown api client template '{other}', expected one of {AURELIA}, {REACT_AXIOS}"
        ))),
    }
}

/// Fetch-based client injected with Aurelia's `HttpClient`.
pub struct AureliaTemplate;

impl ClientTemplate for AureliaTemplate {
    fn name(&self) -> &'static str {
        AURELIA
    }

    fn render(&self, client: &ApiClientTemplateDto) -> String {
        let mut out = String::new();
        if client.has_json_parameter {
            out.push_str("import { HttpClient, json } from '@aurelia/fetch-client';\n");
        } else {
            out.push_str("import { HttpClient } from '@aurelia/fetch-client';\n");
        }
        out.push_str("import { inject } from 'aurelia';\n");
        push_imports(&mut out, client);
        out.push('\n');

        push_deprecation(&mut out, client.obsolete.as_ref(), "");
        out.push_str("@inject(HttpClient)\n");
        out.push_str(&format!("export class {} {{\n", client.name));
        out.push_str("  constructor(private readonly http: HttpClient) {}\n");

        for endpoint in &client.endpoints {
            out.push('\n');
            push_method_header(&mut out, endpoint, &endpoint.return_type);
            push_url(&mut out, endpoint);

            let target = "`${url.pathname}${url.search}`.slice(1)";
            let call = if endpoint.method == "get" {
                format!(
                    "this.http.get({target}, {{ signal: cancellationToken }})"
                )
            } else {
                let body = match (&endpoint.body_parameter, endpoint.requires_body) {
                    (Some(body), true) => format!("json({body})"),
                    _ => "null".to_string(),
                };
                format!(
                    "this.http.{}({target}, {body}, {{ signal: cancellationToken }})",
                    endpoint.method
                )
            };
            out.push_str(&format!("    const response = await {call};\n"));

            if endpoint.return_unparsed_response {
                out.push_str("    return response;\n");
            } else if let Some(schema) = endpoint.return_schema.as_ref() {
                out.push_str(&format!(
                    "    return await response.parseJson<{}>({});\n",
                    endpoint.return_type, schema
                ));
            } else {
                out.push_str("    return await response.json();\n");
            }
            out.push_str("  }\n");
        }
        out.push_str("}\n");
        out
    }
}

/// Plain axios client for React applications.
pub struct ReactAxiosTemplate;

impl ClientTemplate for ReactAxiosTemplate {
    fn name(&self) -> &'static str {
        REACT_AXIOS
    }

    fn render(&self, client: &ApiClientTemplateDto) -> String {
        let mut out = String::new();
        if client.endpoints.iter().any(|e| e.return_unparsed_response) {
            out.push_str("import axios, { AxiosResponse } from 'axios';\n");
        } else {
            out.push_str("import axios from 'axios';\n");
        }
        push_imports(&mut out, client);
        out.push('\n');

        push_deprecation(&mut out, client.obsolete.as_ref(), "");
        out.push_str(&format!("export class {} {{\n", client.name));

        for (position, endpoint) in client.endpoints.iter().enumerate() {
            if position > 0 {
                out.push('\n');
            }
            let return_type = if endpoint.return_unparsed_response {
                "AxiosResponse"
            } else {
                endpoint.return_type.as_str()
            };
            push_method_header(&mut out, endpoint, return_type);
            push_url(&mut out, endpoint);

            let target = "`${url.pathname}${url.search}`";
            let call = if endpoint.requires_body {
                let body = endpoint.body_parameter.as_deref().unwrap_or("null");
                format!(
                    "axios.{}({target}, {body}, {{ signal: cancellationToken }})",
                    endpoint.method
                )
            } else {
                format!(
                    "axios.{}({target}, {{ signal: cancellationToken }})",
                    endpoint.method
                )
            };
            out.push_str(&format!("    const response = await {call};\n"));

            if endpoint.return_unparsed_response {
                out.push_str("    return response;\n");
            } else if let Some(schema) = endpoint.return_schema.as_ref() {
                out.push_str(&format!("    return {schema}.parse(response.data);\n"));
            } else {
                out.push_str("    return response.data;\n");
            }
            out.push_str("  }\n");
        }
        out.push_str("}\n");
        out
    }
}

fn push_imports(out: &mut String, client: &ApiClientTemplateDto) {
    for import in &client.imports {
        out.push_str(import);
        out.push('\n');
    }
}

fn push_method_header(out: &mut String, endpoint: &EndpointTemplateDto, return_type: &str) {
    push_deprecation(out, endpoint.obsolete.as_ref(), "  ");
    let mut parameters = endpoint.parameters.clone();
    parameters.push("cancellationToken: AbortSignal = null".to_string());
    out.push_str(&format!(
        "  public async {}({}): Promise<{}> {{\n",
        endpoint.name,
        parameters.join(", "),
        return_type
    ));
}

fn push_url(out: &mut String, endpoint: &EndpointTemplateDto) {
    let url = if endpoint.dynamic_url {
        format!("`{}`", endpoint.url)
    } else {
        format!("'{}'", endpoint.url)
    };
    out.push_str(&format!(
        "    const url = new URL({url}, window.location.origin);\n"
    ));

    for route in endpoint.route_parameters.iter().filter(|r| r.is_optional) {
        out.push_str(&format!(
            "    if ({0} !== undefined && {0} !== null) url.pathname += `/${{{0}}}`;\n",
            route.name
        ));
    }
    for query in &endpoint.query_parameters {
        push_query(out, query);
    }
}

fn push_query(out: &mut String, query: &QueryParameterTemplateDto) {
    let append = if query.is_array {
        format!(
            "{}.forEach(item => url.searchParams.append('{}', item.toString()));",
            query.value, query.key
        )
    } else {
        format!(
            "url.searchParams.append('{}', {}.toString());",
            query.key, query.value
        )
    };
    if query.is_nullable {
        out.push_str(&format!(
            "    if ({0} !== undefined && {0} !== null) {1}\n",
            query.value, append
        ));
    } else {
        out.push_str(&format!("    {append}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_writer::RouteParameterTemplateDto;

    fn endpoint() -> EndpointTemplateDto {
        EndpointTemplateDto {
            name: "getLatestId".to_string(),
            obsolete: None,
            method: "get".to_string(),
            return_type: "string".to_string(),
            return_schema: None,
            return_unparsed_response: false,
            url: "test/latest".to_string(),
            dynamic_url: false,
            parameters: vec!["year: number".to_string()],
            route_parameters: Vec::new(),
            query_parameters: vec![QueryParameterTemplateDto {
                key: "year".to_string(),
                value: "year".to_string(),
                is_nullable: false,
                is_array: false,
            }],
            requires_body: false,
            body_parameter: None,
        }
    }

    fn client(endpoints: Vec<EndpointTemplateDto>) -> ApiClientTemplateDto {
        ApiClientTemplateDto {
            name: "TestClient".to_string(),
            imports: Vec::new(),
            has_json_parameter: false,
            obsolete: None,
            endpoints,
            build_zod_schemas: false,
        }
    }

    #[test]
    fn aurelia_renders_get_endpoint() {
        let rendered = AureliaTemplate.render(&client(vec![endpoint()]));
        assert!(rendered.contains("export class TestClient {"));
        assert!(rendered.contains(
            "public async getLatestId(year: number, cancellationToken: AbortSignal = null): Promise<string> {"
        ));
        assert!(rendered.contains("const url = new URL('test/latest', window.location.origin);"));
        assert!(rendered.contains("url.searchParams.append('year', year.toString());"));
        assert!(rendered.contains(
            "const response = await this.http.get(`${url.pathname}${url.search}`.slice(1), { signal: cancellationToken });"
        ));
        assert!(rendered.contains("return await response.json();"));
    }

    #[test]
    fn aurelia_posts_json_body() {
        let mut post = endpoint();
        post.method = "post".to_string();
        post.requires_body = true;
        post.body_parameter = Some("request".to_string());
        post.query_parameters.clear();
        let mut data = client(vec![post]);
        data.has_json_parameter = true;

        let rendered = AureliaTemplate.render(&data);
        assert!(rendered.contains("import { HttpClient, json } from '@aurelia/fetch-client';"));
        assert!(rendered.contains(
            "this.http.post(`${url.pathname}${url.search}`.slice(1), json(request), { signal: cancellationToken });"
        ));
    }

    #[test]
    fn optional_route_segments_are_appended_at_runtime() {
        let mut with_route = endpoint();
        with_route.route_parameters = vec![RouteParameterTemplateDto {
            name: "page".to_string(),
            is_optional: true,
        }];
        let rendered = ReactAxiosTemplate.render(&client(vec![with_route]));
        assert!(rendered.contains("if (page !== undefined && page !== null) url.pathname += `/${page}`;"));
        assert!(rendered.contains("axios.get(`${url.pathname}${url.search}`, { signal: cancellationToken })"));
        assert!(rendered.contains("return response.data;"));
    }

    #[test]
    fn nullable_and_array_queries_are_guarded() {
        let mut out = String::new();
        push_query(
            &mut out,
            &QueryParameterTemplateDto {
                key: "ids".to_string(),
                value: "filter?.ids".to_string(),
                is_nullable: true,
                is_array: true,
            },
        );
        assert_eq!(
            out,
            "    if (filter?.ids !== undefined && filter?.ids !== null) filter?.ids.forEach(item => url.searchParams.append('ids', item.toString()));\n"
        );
    }

    #[test]
    fn unknown_template_is_a_configuration_error() {
        assert_eq!(template_by_name("Aurelia").unwrap().name(), AURELIA);
        assert!(matches!(
            template_by_name("angular"),
            Err(ContractError::ConfigError(_))
        ));
    }
}
