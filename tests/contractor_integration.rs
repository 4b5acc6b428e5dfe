use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ts_contract::metadata::{names, PropertyDescriptor};
use ts_contract::{
    generate_from_manifest, ApiClient, ApiClientEndpoint, Configuration, ContractError, Contractor,
    EndpointMethod, EndpointParameter, Manifest, TypeUniverse,
};

struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(prefix: &str) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "ts_contract_build_{}_{}_{}",
            prefix,
            std::process::id(),
            stamp
        ));
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let file_path = self.path.join(relative);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&file_path, content).expect("write file");
        file_path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

const MANIFEST: &str = r#"{
  "types": [
    { "name": "String", "full_name": "System.String" },
    { "name": "Int32", "full_name": "System.Int32", "kind": "struct" },
    {
      "name": "UserDto",
      "full_name": "Acme.Contracts.UserDto",
      "properties": [
        { "name": "Name", "type": 0 },
        { "name": "Age", "type": 1 },
        { "name": "Home", "type": 4, "is_nullable": true }
      ]
    },
    {
      "name": "OrderResponse",
      "full_name": "Acme.Contracts.Orders.OrderResponse",
      "properties": [
        { "name": "Owner", "type": 2 },
        { "name": "Count", "type": 1, "has_public_getter": false }
      ]
    },
    {
      "name": "AddressInfo",
      "full_name": "Acme.Contracts.AddressInfo",
      "properties": [ { "name": "Street", "type": 0 } ]
    },
    { "name": "UserService", "full_name": "Acme.Services.UserService" }
  ],
  "clients": [
    {
      "name": "UsersClient",
      "type_name": "Acme.Api.UsersController",
      "route_prefix": "api/users",
      "endpoints": [
        {
          "name": "Get",
          "route": "{id:int}",
          "http_method": "GET",
          "return_type": 2,
          "parameters": [ { "name": "id", "type": 1, "from_route": true } ]
        }
      ]
    }
  ]
}"#;

#[test]
fn builds_declarations_and_clients_from_manifest_files() {
    let temp = TempDir::new("manifest");
    let manifest_path = temp.write("input/manifest.json", MANIFEST);
    let config_path = temp.write(
        "input/config.json",
        r#"{ "build_zod_schemas": true, "generate_api_clients": true }"#,
    );

    let manifest = Manifest::from_path(&manifest_path).unwrap();
    let configuration = Configuration::from_path(&config_path)
        .unwrap()
        .with_output_path(temp.path.join("out"));
    let report = generate_from_manifest(&manifest, configuration).unwrap();

    assert!(report.is_success(), "failures: {:?}", report.failures);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.generated_files.len(), 4);

    let out = temp.path.join("out");
    let user = read(&out.join("Acme/Contracts/UserDto.ts"));
    assert!(user.starts_with("import { z } from 'zod';\n"));
    assert!(user.contains("import { AddressInfo, AddressInfoSchema } from './AddressInfo';"));
    assert!(user.contains("export interface UserDto {\n"));
    assert!(user.contains("  home?: AddressInfo;\n"));
    assert!(user.contains("export const UserDtoSchema = z.object({"));

    let order = read(&out.join("Acme/Contracts/Orders/OrderResponse.ts"));
    assert!(order.contains("import { UserDto, UserDtoSchema } from '../UserDto';"));
    assert!(order.contains("  owner: UserDto;\n"));
    assert!(!order.contains("count"));

    assert!(out.join("Acme/Contracts/AddressInfo.ts").exists());
    assert!(!out.join("Acme/Services/UserService.ts").exists());

    let client = read(&out.join("clients/UsersClient.ts"));
    assert!(client.contains("import { UserDto, UserDtoSchema } from '../Acme/Contracts/UserDto';"));
    assert!(client.contains("const url = new URL(`api/users/${id}`, window.location.origin);"));
    assert!(client.contains("return await response.parseJson<UserDto>(UserDtoSchema);"));
}

#[test]
fn casing_applies_to_every_written_path() {
    let temp = TempDir::new("kebab");
    let manifest = Manifest::from_json_str(MANIFEST).unwrap();
    let configuration = Configuration::from_json_str(r#"{ "casing": "kebab" }"#)
        .unwrap()
        .with_output_path(&temp.path);

    let report = generate_from_manifest(&manifest, configuration).unwrap();
    assert!(report.is_success());

    let order = read(&temp.path.join("acme/contracts/orders/order-response.ts"));
    assert!(order.contains("import { UserDto } from '../user-dto';"));
    assert!(order.contains("export interface OrderResponse {"));
    assert!(!temp.path.join("clients").exists());
}

fn universe_with_user() -> (TypeUniverse, ts_contract::TypeId, ts_contract::TypeId) {
    let mut universe = TypeUniverse::new();
    let string = universe.primitive(names::STRING);
    let int = universe.primitive("System.Int32");
    let user = universe.class("Acme.Contracts.UserDto");
    universe.add_property(user, PropertyDescriptor::new("Name", string));
    (universe, user, int)
}

#[test]
fn failing_client_is_reported_while_the_rest_is_written() {
    let temp = TempDir::new("failures");
    let (universe, user, int) = universe_with_user();
    let clients = vec![
        ApiClient::new("UsersClient", "Acme.Api.UsersController", Some("api/users")).with_endpoint(
            ApiClientEndpoint::new("Get", "{id}", EndpointMethod::Get, Some(user))
                .with_parameter(EndpointParameter::new("id", int).from_route()),
        ),
        ApiClient::new("PingClient", "Acme.Api.PingController", Some("ping"))
            .with_endpoint(ApiClientEndpoint::new("Check", "", EndpointMethod::Head, None)),
    ];
    let configuration = Configuration::default()
        .with_output_path(&temp.path)
        .with_api_clients(true);

    let report = Contractor::with_configuration(configuration)
        .build(&universe, &clients)
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].item, "PingClient");
    assert!(report.failures[0].message.contains("HEAD"));

    assert!(temp.path.join("Acme/Contracts/UserDto.ts").exists());
    assert!(temp.path.join("clients/UsersClient.ts").exists());
    assert!(!temp.path.join("clients/PingClient.ts").exists());
}

#[test]
fn colliding_client_names_are_written_separately() {
    let temp = TempDir::new("collision");
    let (universe, user, _) = universe_with_user();
    let endpoint = ApiClientEndpoint::new("List", "", EndpointMethod::Get, Some(user));
    let clients = vec![
        ApiClient::new("UsersClient", "Acme.Api.UsersController", Some("api/users"))
            .with_endpoint(endpoint.clone()),
        ApiClient::new("UsersClient", "Acme.Api.Admin.UsersController", Some("api/admin/users"))
            .with_endpoint(endpoint),
    ];
    let configuration = Configuration::default()
        .with_output_path(&temp.path)
        .with_api_clients(true)
        .with_api_client_template("react-axios");

    let report = Contractor::with_configuration(configuration)
        .build(&universe, &clients)
        .unwrap();
    assert!(report.is_success());

    let first = read(&temp.path.join("clients/UsersClient.ts"));
    let second = read(&temp.path.join("clients/AdminUsersClient.ts"));
    assert!(first.contains("export class UsersClient {"));
    assert!(first.contains("new URL('api/users', window.location.origin)"));
    assert!(second.contains("export class AdminUsersClient {"));
    assert!(second.contains("new URL('api/admin/users', window.location.origin)"));
}

#[test]
fn setup_problems_abort_the_run() {
    let (universe, _, _) = universe_with_user();

    let missing_output = Contractor::with_configuration(Configuration::default()).build(&universe, &[]);
    assert!(matches!(missing_output, Err(ContractError::ConfigError(_))));

    let temp = TempDir::new("template");
    let unknown_template = Configuration::default()
        .with_output_path(&temp.path)
        .with_api_clients(true)
        .with_api_client_template("angular");
    let result = Contractor::with_configuration(unknown_template).build(&universe, &[]);
    assert!(matches!(result, Err(ContractError::ConfigError(_))));
    assert!(!temp.path.join("Acme").exists());
}

#[test]
fn malformed_manifest_is_a_serialization_error() {
    let temp = TempDir::new("malformed");
    let path = temp.write("manifest.json", r#"{ "types": [ { "full_name": 3 } ] }"#);
    assert!(matches!(
        Manifest::from_path(&path),
        Err(ContractError::SerializationError(_))
    ));
}
