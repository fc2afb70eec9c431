//! modhost binary
//!
//! Usage:
//!   modhost [--config <path>] [--log-filter <filter>] [run|modules]
//!
//! `run` reads gateway events as JSON lines on stdin and writes responses as
//! JSON lines on stdout. Logs go to stderr.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use modhost::config::{HostConfig, TOKEN_ENV};
use modhost::gateway::{spawn_line_reader, JsonLineSink, SharedSink};
use modhost::http::{RouteTable, WebServer};
use modhost::interaction::{ContextProvider, InteractionRouter};
use modhost::module::{ModuleManager, ModuleSource};
use modhost::settings::{MemoryTenantDirectory, SettingsModule, TenantDirectory};
use modhost::storage::{open_settings_store, MemorySettingsStore, SettingsStore};
use modhost::utils::{create_shutdown_receiver, init_logging_from_config, log_error};

#[derive(Parser, Debug)]
#[command(name = "modhost", version, about = "Modular chat-bot host")]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "modhost::interaction=trace" (RUST_LOG wins)
    #[arg(long)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Start the host (default)
    Run,
    /// Print the resolved load order and disabled modules, then exit
    Modules,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match HostConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => HostConfig::default(),
    };
    init_logging_from_config(config.logging.as_ref(), cli.log_filter.as_deref());

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => runtime.block_on(run(config)),
        Command::Modules => print_modules(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Failed to start host: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// The static registration list
fn module_sources(
    store: Arc<dyn SettingsStore>,
    directory: Arc<dyn TenantDirectory>,
) -> Vec<Box<dyn ModuleSource>> {
    vec![Box::new(SettingsModule::new(store, directory))]
}

fn print_modules(config: &HostConfig) -> anyhow::Result<()> {
    let sources = module_sources(
        Arc::new(MemorySettingsStore::new()),
        Arc::new(MemoryTenantDirectory::new()),
    );
    let plan = ModuleManager::new(sources)
        .with_config(&config.modules)
        .plan()?;

    println!("Load order:");
    for (i, id) in plan.load_order().iter().enumerate() {
        println!("  {}. {}", i + 1, id);
    }
    let disabled = plan.disabled();
    if !disabled.is_empty() {
        println!("Disabled:");
        for entry in disabled {
            println!("  {} ({})", entry.id, entry.reason);
        }
    }
    for skipped in &plan.skipped {
        println!("Skipped: {} ({})", skipped.location, skipped.reason);
    }
    Ok(())
}

async fn run(config: HostConfig) -> anyhow::Result<()> {
    info!("Starting modhost {}", env!("CARGO_PKG_VERSION"));
    if config.token().is_none() {
        warn!("No platform token configured (set `token` or {})", TOKEN_ENV);
    }

    let store = open_settings_store(&config.database)?;
    let directory: Arc<dyn TenantDirectory> = Arc::new(MemoryTenantDirectory::new());

    let host = ModuleManager::new(module_sources(store, directory))
        .with_config(&config.modules)
        .start()
        .await?;
    for disabled in host.disabled() {
        info!("Module '{}' disabled: {}", disabled.id, disabled.reason);
    }

    let shutdown = create_shutdown_receiver();

    if config.webserver.enabled {
        let routes = RouteTable::from_modules(&host.modules());
        info!("Mounted routers: {:?}", routes.prefixes());
        let server = WebServer::on_port(config.webserver.port, routes, host.subscribe());
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start(server_shutdown).await {
                error!("Web server failed: {}", e);
            }
        });
    }

    let interactions = &config.interactions;
    let provider = log_error(
        || {
            ContextProvider::from_registry(
                &host.actions(),
                &interactions.context_provider,
                &interactions.fetch_action,
                &interactions.create_action,
            )
        },
        "Context provider unavailable",
    )
    .unwrap_or_else(ContextProvider::disabled);

    let sink: SharedSink = Arc::new(JsonLineSink::stdout());
    let router = Arc::new(InteractionRouter::new(&host, provider, sink));

    router
        .dispatch_event("ready", &json!({ "modules": host.modules().ids() }))
        .await;

    let events = spawn_line_reader(tokio::io::stdin(), interactions.queue_capacity);
    router.run(events, shutdown).await;

    info!("modhost stopped");
    Ok(())
}
