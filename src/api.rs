//! Endpoint descriptors produced by an external route scanner.

use serde::{Deserialize, Serialize};

use crate::metadata::TypeId;
use crate::output::ObsoleteInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    #[serde(other)]
    Invalid,
}

impl EndpointMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointMethod::Get => "GET",
            EndpointMethod::Post => "POST",
            EndpointMethod::Put => "PUT",
            EndpointMethod::Patch => "PATCH",
            EndpointMethod::Delete => "DELETE",
            EndpointMethod::Head => "HEAD",
            EndpointMethod::Options => "OPTIONS",
            EndpointMethod::Invalid => "INVALID",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiClient {
    /// Client class name, e.g. `UsersClient`.
    pub name: String,
    /// Full name of the source controller, used to derive fallback names.
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsolete: Option<ObsoleteInfo>,
    #[serde(default)]
    pub endpoints: Vec<ApiClientEndpoint>,
}

impl ApiClient {
    pub fn new(name: &str, type_name: &str, route_prefix: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            route_prefix: route_prefix.map(str::to_string),
            obsolete: None,
            endpoints: Vec::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: ApiClientEndpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Namespace segments of the source controller, excluding its own name.
    pub fn namespace_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.type_name.split('.').collect();
        segments.pop();
        segments
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiClientEndpoint {
    pub name: String,
    #[serde(default)]
    pub route: String,
    pub http_method: EndpointMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<TypeId>,
    /// Innermost element of the return type, used only to pick the response
    /// schema. The declared return type always comes from `return_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unwrapped_return_type: Option<TypeId>,
    /// The response is a collection of `unwrapped_return_type`.
    #[serde(default)]
    pub is_enumerable_return: bool,
    #[serde(default)]
    pub parameters: Vec<EndpointParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obsolete: Option<ObsoleteInfo>,
}

impl ApiClientEndpoint {
    pub fn new(
        name: &str,
        route: &str,
        http_method: EndpointMethod,
        return_type: Option<TypeId>,
    ) -> Self {
        Self {
            name: name.to_string(),
            route: route.to_string(),
            http_method,
            return_type,
            unwrapped_return_type: None,
            is_enumerable_return: false,
            parameters: Vec::new(),
            obsolete: None,
        }
    }

    pub fn with_parameter(mut self, parameter: EndpointParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_unwrapped_return(mut self, element: TypeId, is_enumerable: bool) -> Self {
        self.unwrapped_return_type = Some(element);
        self.is_enumerable_return = is_enumerable;
        self
    }

    pub fn obsolete(mut self, reason: Option<&str>) -> Self {
        self.obsolete = Some(ObsoleteInfo::new(reason));
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub parameter_type: TypeId,
    #[serde(default)]
    pub from_body: bool,
    #[serde(default)]
    pub from_route: bool,
    #[serde(default)]
    pub from_query: bool,
    #[serde(default)]
    pub from_header: bool,
    #[serde(default)]
    pub from_services: bool,
    #[serde(default)]
    pub from_form: bool,
    #[serde(default)]
    pub is_optional: bool,
}

/// Where a parameter travels in the generated request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterOrigin {
    Body,
    Route,
    Query,
}

impl EndpointParameter {
    pub fn new(name: &str, parameter_type: TypeId) -> Self {
        Self {
            name: name.to_string(),
            parameter_type,
            ..Self::default()
        }
    }

    pub fn from_route(mut self) -> Self {
        self.from_route = true;
        self
    }

    pub fn from_query(mut self) -> Self {
        self.from_query = true;
        self
    }

    pub fn from_body(mut self) -> Self {
        self.from_body = true;
        self
    }

    pub fn from_header(mut self) -> Self {
        self.from_header = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// Header, service and form parameters never reach the generated signature.
    pub fn is_excluded(&self) -> bool {
        self.from_header || self.from_services || self.from_form
    }

    /// Explicit body wins; unmarked parameters also travel in the body.
    pub fn origin(&self) -> ParameterOrigin {
        if self.from_body || (!self.from_route && !self.from_query) {
            ParameterOrigin::Body
        } else if self.from_route {
            ParameterOrigin::Route
        } else {
            ParameterOrigin::Query
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_parameter_origin() {
        let id = TypeId(0);
        assert_eq!(EndpointParameter::new("a", id).origin(), ParameterOrigin::Body);
        assert_eq!(
            EndpointParameter::new("a", id).from_route().origin(),
            ParameterOrigin::Route
        );
        assert_eq!(
            EndpointParameter::new("a", id).from_query().origin(),
            ParameterOrigin::Query
        );
        assert_eq!(
            EndpointParameter::new("a", id).from_query().from_body().origin(),
            ParameterOrigin::Body
        );
        assert!(EndpointParameter::new("a", id).from_header().is_excluded());
    }

    #[test]
    fn parses_http_methods() {
        let method: EndpointMethod = serde_json::from_str("\"PATCH\"").unwrap();
        assert_eq!(method, EndpointMethod::Patch);
        let method: EndpointMethod = serde_json::from_str("\"TRACE\"").unwrap();
        assert_eq!(method, EndpointMethod::Invalid);
    }

    #[test]
    fn namespace_excludes_controller_name() {
        let client = ApiClient::new("UsersClient", "Acme.Admin.UsersController", None);
        assert_eq!(client.namespace_segments(), vec!["Acme", "Admin"]);
    }
}
