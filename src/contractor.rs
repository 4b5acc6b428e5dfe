//! Batch generation: select, convert, then write every declaration and client.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::casing::unique_identifier;
use crate::client_templates::template_by_name;
use crate::client_writer::ApiClientWriter;
use crate::config::Configuration;
use crate::converter::TypeScriptConverter;
use crate::metadata::{TypeKind, TypeUniverse};
use crate::output::{ContractedType, OutputType};
use crate::shape;
use crate::typescript_writer::TypeScriptWriter;
use crate::ContractError;

/// One item that could not be generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildFailure {
    pub item: String,
    pub message: String,
}

#[derive(Clone, Debug, Default)]
pub struct BuildReport {
    pub generated_files: Vec<PathBuf>,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Process exit status for this run.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    fn record_failure(&mut self, item: &str, err: &ContractError) {
        let message = match err {
            ContractError::ReferenceError(fault) => {
                format!("{err}{}", fault.describe_references())
            }
            _ => err.to_string(),
        };
        error!("failed to generate {item}: {message}");
        self.failures.push(BuildFailure {
            item: item.to_string(),
            message,
        });
    }
}

pub struct Contractor {
    configuration: Configuration,
}

impl Contractor {
    pub fn with_configuration(configuration: Configuration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Types requested by explicit name or suffix, ordered by output folder.
    pub fn select_types(&self, universe: &TypeUniverse) -> Vec<ContractedType> {
        let mut selected: Vec<ContractedType> = universe
            .iter()
            .filter(|(_, descriptor)| {
                !matches!(descriptor.kind, TypeKind::GenericParameter | TypeKind::Array)
                    && !descriptor.is_bound_generic()
                    && self.configuration.selects(descriptor)
            })
            .map(|(id, descriptor)| ContractedType::from_descriptor(descriptor, id, &self.configuration))
            .collect();
        selected.sort_by(|left, right| left.folder.path.cmp(&right.folder.path));
        selected
    }

    /// Runs one complete generation.
    ///
    /// Only setup problems (missing output path, unknown client template)
    /// fail the whole run; per-file failures are logged, recorded in the
    /// report and the batch continues.
    pub fn build(
        &self,
        universe: &TypeUniverse,
        clients: &[ApiClient],
    ) -> Result<BuildReport, ContractError> {
        let configuration = &self.configuration;
        let type_writer = TypeScriptWriter::new(configuration, universe)?;
        let client_setup = if configuration.generate_api_clients {
            Some((
                ApiClientWriter::new(configuration, universe)?,
                template_by_name(&configuration.api_client_template)?,
            ))
        } else {
            None
        };

        let selected = self.select_types(universe);
        info!("generating {} requested types", selected.len());

        let mut report = BuildReport::default();
        let mut converter = TypeScriptConverter::new(configuration, universe);
        for contracted in &selected {
            debug!("converting {}", contracted.full_name);
            if let Err(err) = converter.convert(contracted.source) {
                report.record_failure(&contracted.full_name, &err);
            }
        }

        let clients = if client_setup.is_some() {
            deduplicate_client_names(clients)
        } else {
            Vec::new()
        };
        let mut failed_clients = HashSet::new();
        for client in &clients {
            if let Err(err) = resolve_client_types(&mut converter, universe, client) {
                report.record_failure(&client.name, &err);
                failed_clients.insert(client.name.clone());
            }
        }

        let all_types: Vec<OutputType> = converter.output_types().cloned().collect();
        info!(
            "writing {} types ({} discovered through references)",
            all_types.len(),
            all_types.len().saturating_sub(selected.len())
        );
        for output_type in &all_types {
            match type_writer.write(output_type, &all_types) {
                Ok(path) => report.generated_files.push(path),
                Err(err) => report.record_failure(&output_type.full_name, &err),
            }
        }

        if let Some((client_writer, template)) = client_setup {
            info!(
                "writing {} api clients with the {} template",
                clients.len(),
                template.name()
            );
            for client in clients.iter().filter(|c| !failed_clients.contains(&c.name)) {
                match client_writer.write(client, &all_types, &mut converter, template.as_ref()) {
                    Ok(path) => report.generated_files.push(path),
                    Err(err) => report.record_failure(&client.name, &err),
                }
            }
        }

        info!(
            "generated {} files with {} failures",
            report.generated_files.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// Converts every type an endpoint touches so the declaration snapshot is
/// complete before anything is written.
fn resolve_client_types(
    converter: &mut TypeScriptConverter<'_>,
    universe: &TypeUniverse,
    client: &ApiClient,
) -> Result<(), ContractError> {
    for endpoint in &client.endpoints {
        if let Some(declared) = endpoint.return_type {
            converter.destination_type(shape::unwrap_async(universe, declared))?;
        }
        if let Some(element) = endpoint.unwrapped_return_type {
            converter.destination_type(element)?;
        }
        for parameter in endpoint.parameters.iter().filter(|p| !p.is_excluded()) {
            converter.destination_type(parameter.parameter_type)?;
        }
    }
    Ok(())
}

/// Renames clients whose names collide, preferring a name derived from the
/// controller's namespace (`Admin` + `UsersClient`).
pub fn deduplicate_client_names(clients: &[ApiClient]) -> Vec<ApiClient> {
    let mut used = HashSet::new();
    let mut out = Vec::with_capacity(clients.len());
    for client in clients {
        let mut client = client.clone();
        if used.contains(&client.name) {
            let candidate = client
                .namespace_segments()
                .last()
                .map(|segment| format!("{segment}{}", client.name));
            let renamed = match candidate {
                Some(candidate) if !used.contains(&candidate) => {
                    used.insert(candidate.clone());
                    candidate
                }
                _ => unique_identifier(&client.name, &mut used),
            };
            warn!(
                "client name {} for {} is already used, writing it as {}",
                client.name, client.type_name, renamed
            );
            client.name = renamed;
        } else {
            used.insert(client.name.clone());
        }
        out.push(client);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PropertyDescriptor, TypeId};

    #[test]
    fn renames_colliding_clients_from_namespace() {
        let clients = vec![
            ApiClient::new("UsersClient", "Acme.UsersController", None),
            ApiClient::new("UsersClient", "Acme.Admin.UsersController", None),
            ApiClient::new("UsersClient", "Acme.Admin.UsersController", None),
        ];
        let renamed = deduplicate_client_names(&clients);
        let names: Vec<&str> = renamed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["UsersClient", "AdminUsersClient", "UsersClient2"]);
    }

    #[test]
    fn selects_by_suffix_sorted_by_folder() {
        let mut universe = TypeUniverse::new();
        let string = universe.primitive("System.String");
        let later = universe.class("Acme.Zeta.UserDto");
        let earlier = universe.class("Acme.Alpha.OrderResponse");
        universe.class("Acme.Alpha.OrderService");
        universe.add_property(later, PropertyDescriptor::new("Name", string));

        let contractor = Contractor::with_configuration(Configuration::default());
        let selected = contractor.select_types(&universe);
        let sources: Vec<TypeId> = selected.iter().map(|c| c.source).collect();
        assert_eq!(sources, vec![earlier, later]);
    }

    #[test]
    fn exit_code_reflects_failures() {
        let mut report = BuildReport::default();
        assert_eq!(report.exit_code(), 0);
        report.record_failure("Acme.UserDto", &ContractError::PathError("no root".to_string()));
        assert_eq!(report.exit_code(), 1);
        assert!(!report.is_success());
    }
}
