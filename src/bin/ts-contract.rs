use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ts_contract::{generate_from_manifest, BuildReport, Casing, Configuration, ContractError, Manifest};

#[derive(Parser, Debug)]
#[command(
    name = "ts-contract",
    version,
    about = "Generate TypeScript declarations, zod schemas and API clients from type metadata"
)]
struct Args {
    /// Metadata manifest (JSON) produced by the type scanner
    #[arg(long)]
    manifest: PathBuf,

    /// Configuration file (JSON); flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root output directory
    #[arg(long)]
    output: Option<PathBuf>,

    /// Import root used by client files
    #[arg(long = "root")]
    relative_root: Option<String>,

    /// Casing for folders and file names: pascal, camel, snake or kebab
    #[arg(long)]
    casing: Option<Casing>,

    /// Name replacement as `search:replacement`, may be repeated
    #[arg(long = "replace")]
    replacements: Vec<String>,

    /// Prefix removed from full names, may be repeated
    #[arg(long)]
    strip: Vec<String>,

    /// Custom type map as `Full.Source.Name:destination`, may be repeated
    #[arg(long = "custom-map")]
    custom_maps: Vec<String>,

    /// Additional type name suffix to generate, may be repeated
    #[arg(long = "suffix")]
    suffixes: Vec<String>,

    #[arg(long)]
    build_zod_schemas: bool,

    #[arg(long)]
    generate_api_clients: bool,

    /// Client template: aurelia or react-axios
    #[arg(long)]
    api_client_template: Option<String>,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("ts_contract={}", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(args) {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<BuildReport, ContractError> {
    let configuration = build_configuration(&args)?;
    let manifest = Manifest::from_path(&args.manifest)?;
    generate_from_manifest(&manifest, configuration)
}

fn build_configuration(args: &Args) -> Result<Configuration, ContractError> {
    let mut configuration = match &args.config {
        Some(path) => Configuration::from_path(path)?,
        None => Configuration::default(),
    };

    if let Some(output) = &args.output {
        configuration = configuration.with_output_path(output);
    }
    if let Some(root) = &args.relative_root {
        configuration = configuration.with_relative_root(root);
    }
    if let Some(casing) = args.casing {
        configuration = configuration.with_casing(casing);
    }
    for prefix in &args.strip {
        configuration = configuration.add_strip(prefix);
    }
    for raw in &args.replacements {
        match split_pair(raw) {
            Some((search, replacement)) => {
                configuration = configuration.add_replacement(search, replacement)?;
            }
            None => warn!("ignoring replacement '{raw}', expected search:replacement"),
        }
    }
    for raw in &args.custom_maps {
        match split_pair(raw) {
            Some((source, destination)) => {
                configuration = configuration.add_custom_map(source, destination)?;
            }
            None => warn!("ignoring custom map '{raw}', expected Source.Type:destination"),
        }
    }
    for suffix in &args.suffixes {
        if !configuration.suffixes.contains(suffix) {
            configuration.suffixes.push(suffix.clone());
        }
    }
    if args.build_zod_schemas {
        configuration = configuration.with_zod_schemas(true);
    }
    if args.generate_api_clients {
        configuration = configuration.with_api_clients(true);
    }
    if let Some(template) = &args.api_client_template {
        configuration = configuration.with_api_client_template(template);
    }
    Ok(configuration)
}

fn split_pair(raw: &str) -> Option<(&str, &str)> {
    let (left, right) = raw.split_once(':')?;
    if left.is_empty() || right.contains(':') {
        return None;
    }
    Some((left, right))
}
