use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tfconfluent::config::ProviderConfig;
use tfconfluent::error::Diagnostic;
use tfconfluent::lifecycle::{CreateError, LifecycleState};
use tfconfluent::resource::{get_all_data_source_keys, get_all_resource_keys, get_data_source, get_resource};
use tfconfluent::{Provider, ProviderError, StoredState, VERSION};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Confluent Cloud resources as declarative infrastructure
#[derive(Parser, Debug)]
#[command(name = "tfconfluent", version = VERSION, about, long_about = None)]
struct Args {
    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Confluent Cloud API endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save endpoint and API key to the config file (the secret is never saved)
    Configure {
        #[arg(long)]
        cloud_api_key: Option<String>,
        /// Poll quickly; for acceptance tests against a mock server
        #[arg(long)]
        acceptance_test_mode: bool,
    },
    /// List supported resource and data source types
    Resources,
    /// Print the schema of a resource or data source type
    Schema { type_name: String },
    /// Create a resource from a configuration file
    Create {
        type_name: String,
        #[arg(long)]
        config: PathBuf,
    },
    /// Refresh one or more state files
    Read {
        #[arg(long, required = true, num_args = 1..)]
        state: Vec<PathBuf>,
    },
    /// Apply in-place changes from a configuration file
    Update {
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        config: PathBuf,
    },
    /// Delete the resource tracked by a state file
    Delete {
        #[arg(long)]
        state: PathBuf,
    },
    /// Import an existing resource by its import id
    Import { type_name: String, id: String },
    /// Run a data source lookup
    Data {
        type_name: String,
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tfconfluent {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tfconfluent").join("tfconfluent.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tfconfluent").join("tfconfluent.log");
    }
    PathBuf::from("tfconfluent.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        let diagnostic = match err.downcast_ref::<ProviderError>() {
            Some(provider_error) => provider_error.diagnostic(),
            None => Diagnostic {
                severity: tfconfluent::error::Severity::Error,
                summary: format!("{err:#}"),
                detail: None,
            },
        };
        report(&diagnostic);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Configure {
            cloud_api_key,
            acceptance_test_mode,
        } => {
            let mut config = ProviderConfig::load();
            if args.endpoint.is_some() {
                config.endpoint = args.endpoint;
            }
            if cloud_api_key.is_some() {
                config.cloud_api_key = cloud_api_key;
            }
            config.acceptance_test_mode = acceptance_test_mode;
            config.save().context("Failed to save configuration")?;
            print_json(&config)
        }
        Command::Resources => {
            let listing = serde_json::json!({
                "resources": get_all_resource_keys(),
                "data_sources": get_all_data_source_keys(),
            });
            print_json(&listing)
        }
        Command::Schema { type_name } => {
            let schema = match (get_resource(&type_name), get_data_source(&type_name)) {
                (Some(resource), _) => resource.schema(),
                (None, Some(data_source)) => data_source.schema(),
                (None, None) => anyhow::bail!("Unknown resource or data source type: {}", type_name),
            };
            print_json(&schema)
        }
        Command::Create { type_name, config } => {
            let provider = configure(args.endpoint)?;
            let declared = provider.declared(&type_name, &read_document(&config)?)?;
            let resource = provider.resource(&type_name)?;
            match provider.lifecycle(&type_name)?.create(declared).await {
                Ok(instance) => print_json(&StoredState::capture(resource, &instance)),
                Err(CreateError {
                    error,
                    tainted: Some(instance),
                }) => {
                    print_json(&StoredState::capture(resource, &instance))?;
                    Err(error.into())
                }
                Err(CreateError { error, tainted: None }) => Err(error.into()),
            }
        }
        Command::Read { state } => {
            let provider = configure(args.endpoint)?;
            let refreshes = state.iter().map(|path| refresh(&provider, path));
            let states = join_all(refreshes)
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()?;
            print_json(&states)
        }
        Command::Update { state, config } => {
            let provider = configure(args.endpoint)?;
            let stored: StoredState = read_state(&state)?;
            let resource = provider.resource(&stored.resource_type)?;
            let mut instance = stored.restore(resource)?;
            let declared = provider.declared(&stored.resource_type, &read_document(&config)?)?;

            provider
                .lifecycle(&stored.resource_type)?
                .update(&mut instance, declared)
                .await?;
            print_json(&StoredState::capture(resource, &instance))
        }
        Command::Delete { state } => {
            let provider = configure(args.endpoint)?;
            let stored: StoredState = read_state(&state)?;
            let resource = provider.resource(&stored.resource_type)?;
            let mut instance = stored.restore(resource)?;

            provider.lifecycle(&stored.resource_type)?.delete(&mut instance).await?;
            print_json(&StoredState::capture(resource, &instance))
        }
        Command::Import { type_name, id } => {
            let provider = configure(args.endpoint)?;
            let instance = provider.lifecycle(&type_name)?.import(&id).await?;
            print_json(&StoredState::capture(provider.resource(&type_name)?, &instance))
        }
        Command::Data { type_name, config } => {
            let provider = configure(args.endpoint)?;
            let result = provider.read_data(&type_name, &read_document(&config)?).await?;
            print_json(&result)
        }
    }
}

/// Resolve configuration (flag > environment > config file > default)
fn configure(endpoint: Option<String>) -> Result<Provider> {
    let mut config = ProviderConfig::load().with_env();
    if endpoint.is_some() {
        config.endpoint = endpoint;
    }
    Provider::new(&config)
}

/// Refresh one state file; drift is reported as a warning
async fn refresh(provider: &Provider, path: &Path) -> Result<StoredState> {
    let stored = read_state(path)?;
    let resource = provider.resource(&stored.resource_type)?;
    let mut instance = stored.restore(resource)?;

    provider.lifecycle(&stored.resource_type)?.read(&mut instance).await?;

    if instance.state == LifecycleState::Unmanaged {
        report(&Diagnostic::warning(format!(
            "{} {:?} no longer exists and was removed from {}",
            resource.type_name(),
            stored.id,
            path.display()
        )));
    }
    Ok(StoredState::capture(resource, &instance))
}

/// Load a JSON or YAML document, chosen by file extension
fn read_document(path: &Path) -> Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML in {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {}", path.display()))
    }
}

fn read_state(path: &Path) -> Result<StoredState> {
    let document = read_document(path)?;
    serde_json::from_value(document).with_context(|| format!("Invalid state file {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(diagnostic: &Diagnostic) {
    match serde_json::to_string(diagnostic) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!("{}", diagnostic.summary),
    }
}
