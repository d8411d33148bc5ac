//! kmutate - offline front end to the mutation engine.
//!
//! Loads OpenAPI v3 documents as a static schema set and applies patches to
//! objects on disk, exactly as an admission webhook would.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use kube_apply_mutate::config::EngineConfig;
use kube_apply_mutate::mutation::{PatchApplier, PatchRequest};
use kube_apply_mutate::resolver::{SchemaResolver, StaticSchemaClient};
use kube_apply_mutate::schema::{GroupVersionKind, ResourceKind};
use kube_apply_mutate::value::{self, Value};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

#[derive(Debug, Parser)]
#[command(name = "kmutate", version, about = "Schema-aware apply configuration merges")]
struct Cli {
    /// Engine configuration file (YAML).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OpenAPI v3 document to load; may be repeated. Added to the documents
    /// listed in the configuration file.
    #[arg(long = "openapi", global = true)]
    openapi: Vec<PathBuf>,

    /// Schema resolution timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge a patch into a live object and print the result.
    Apply {
        /// The live object (YAML or JSON).
        #[arg(long)]
        live: PathBuf,

        /// The apply configuration (YAML or JSON).
        #[arg(long)]
        patch: PathBuf,

        /// Target apiVersion; read from the live object when omitted.
        #[arg(long, requires = "kind")]
        api_version: Option<String>,

        /// Target kind; read from the live object when omitted.
        #[arg(long, requires = "api_version")]
        kind: Option<String>,

        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        output: Format,
    },

    /// List the kinds the loaded documents declare.
    Kinds,

    /// Print the declaration view of a kind.
    Declarations {
        #[arg(long)]
        api_version: String,

        #[arg(long)]
        kind: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    // stdout carries the merged object.
    let logger = match std::env::var("LOG_FORMAT") {
        Ok(v) if v == "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().with_writer(std::io::stderr).boxed(),
    };

    Registry::default()
        .with(EnvFilter::from_env("LOG_LEVEL"))
        .with(logger)
        .try_init()?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match cli.config {
        Some(ref path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.openapi_documents.extend(cli.openapi.iter().cloned());
    if let Some(timeout_ms) = cli.timeout_ms {
        config.schema_timeout_ms = timeout_ms;
    }
    Ok(config)
}

fn read_object(path: &Path) -> Result<Value, Box<dyn Error>> {
    let contents = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let object = if path.extension().is_some_and(|ext| ext == "json") {
        value::from_json(&contents)?
    } else {
        value::from_yaml(&contents)?
    };
    Ok(object)
}

fn static_client(config: &EngineConfig) -> Result<StaticSchemaClient, Box<dyn Error>> {
    let (client, errors) = config.static_client()?;
    for err in &errors {
        warn!(error = %err, "openapi conversion problem");
    }
    info!(kinds = client.kinds().count(), "static schema set loaded");
    Ok(client)
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(&cli)?;
    let client = static_client(&config)?;

    match cli.command {
        Command::Kinds => {
            for gvk in client.kinds() {
                println!("{gvk}");
            }
        }
        Command::Declarations { api_version, kind } => {
            let kind = ResourceKind::from_gvk(GroupVersionKind::from_api_version(&api_version, &kind));
            let resolver = SchemaResolver::new(client);
            let schema = resolver.resolve_within(&kind, config.schema_timeout()).await?;
            print!("{}", serde_yaml::to_string(schema.declaration_view())?);
        }
        Command::Apply {
            live,
            patch,
            api_version,
            kind,
            output,
        } => {
            let live = read_object(&live)?;
            let patch = read_object(&patch)?;
            let gvk = match (api_version, kind) {
                (Some(api_version), Some(kind)) => GroupVersionKind::from_api_version(&api_version, &kind),
                _ => GroupVersionKind::from_object(&live)
                    .ok_or("live object has no apiVersion/kind; pass --api-version and --kind")?,
            };
            let kind = ResourceKind::from_gvk(gvk);

            let resolver = SchemaResolver::new(client);
            let schema = resolver.resolve_within(&kind, config.schema_timeout()).await?;
            let result = PatchApplier::new().apply(&PatchRequest::new(kind, live, patch, Some(schema)))?;

            match output {
                Format::Yaml => print!("{}", value::to_yaml(&result)?),
                Format::Json => println!("{}", value::to_json(&result)?),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging() {
        eprintln!("kmutate: cannot initialise logging: {err}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("kmutate: {err}");
            ExitCode::FAILURE
        }
    }
}
