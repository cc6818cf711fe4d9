//! gcpadm CLI entry point.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use gcpadm::commands::{
    bootstrap, import_config, manage_billing_access, print_api_lookup, print_tree, BootstrapOptions,
};
use gcpadm::config::ConfigStore;
use gcpadm::gcp::http::format_gcp_error;
use gcpadm::shell::ProcessGcloud;
use gcpadm::{GcpClient, GcpError};

/// Navigate, survey, and bootstrap GCP organizations
#[derive(Parser, Debug)]
#[command(name = "gcpadm", version, about, long_about = None)]
struct Cli {
    /// Log level for debugging (written to the gcpadm log file)
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the admin bot project, service account, roles, and local profile
    Bootstrap {
        /// gcloud configuration to use (interactive if omitted)
        #[arg(long)]
        config: Option<String>,
        /// Billing account ID (interactive if omitted)
        #[arg(long)]
        billing: Option<String>,
        /// Organization ID (interactive if omitted)
        #[arg(long)]
        org: Option<String>,
        /// Show what would be done without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Print every gcloud command
        #[arg(short, long)]
        verbose: bool,
    },
    /// Set up this machine with an admin bot bootstrapped elsewhere
    Import {
        #[arg(long)]
        config: Option<String>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Grant the admin bot access to more billing accounts
    ManageBilling {
        #[arg(long)]
        config: Option<String>,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the version
    Version,
    /// Print the organization/folder/project hierarchy
    Tree {
        /// Only this organization ID
        #[arg(long)]
        org: Option<String>,
    },
    /// Resolve an API display name to its service id
    LookupApi {
        /// e.g. "Compute Engine API"
        name: String,
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

fn setup_logging(
    level: LogLevel,
    store: Option<&ConfigStore>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = match store {
        Some(store) => store.log_path(),
        None => std::env::temp_dir().join("gcpadm.log"),
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

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

    tracing::info!("gcpadm {} started with log level: {:?}", env!("CARGO_PKG_VERSION"), level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

/// Attach the friendly message for API errors
fn friendly(err: GcpError) -> anyhow::Error {
    let hint = format_gcp_error(&err);
    if err.status().is_some() {
        anyhow::Error::new(err).context(hint)
    } else {
        anyhow::Error::new(err)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = ConfigStore::new().ok();
    let _log_guard = setup_logging(cli.log_level, store.as_ref())?;

    match cli.command {
        Commands::Bootstrap {
            config,
            billing,
            org,
            dry_run,
            verbose,
        } => {
            let store = store.context("Could not locate the gcloud configuration directory")?;
            let gcloud = ProcessGcloud::new(verbose).with_configuration(config.clone());
            let options = BootstrapOptions {
                config,
                billing,
                org,
                dry_run,
            };
            bootstrap(&gcloud, &store, &options)
                .map_err(friendly)
                .context("Bootstrap failed")?;
        },
        Commands::Import { config, verbose } => {
            let store = store.context("Could not locate the gcloud configuration directory")?;
            let gcloud = ProcessGcloud::new(verbose).with_configuration(config.clone());
            import_config(&gcloud, &store, config.as_deref())
                .map_err(friendly)
                .context("Import failed")?;
        },
        Commands::ManageBilling { config, verbose } => {
            let store = store.context("Could not locate the gcloud configuration directory")?;
            let gcloud = ProcessGcloud::new(verbose).with_configuration(config.clone());
            manage_billing_access(&gcloud, &store, config.as_deref())
                .map_err(friendly)
                .context("Billing access management failed")?;
        },
        Commands::Version => {
            println!("gcpadm {}", env!("CARGO_PKG_VERSION"));
        },
        Commands::Tree { org } => {
            let client = GcpClient::new()
                .await
                .map_err(friendly)
                .context("Failed to initialize GCP client")?;
            print_tree(&client, org.as_deref())
                .await
                .map_err(friendly)
                .context("Failed to render the resource tree")?;
        },
        Commands::LookupApi { name } => {
            print_api_lookup(&name).map_err(friendly)?;
        },
    }

    Ok(())
}
