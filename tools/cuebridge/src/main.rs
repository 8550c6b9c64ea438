//! cuebridge - run a protocol-bridging router from a configuration file
//!
//! Loads modules and routes, starts every module, and routes between them
//! until Ctrl+C.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use cuebridge_bridge::register_builtins;
use cuebridge_core::Config;
use cuebridge_router::{ModuleRegistry, ProcessorRegistry, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// cuebridge - protocol-bridging message router
#[derive(Parser)]
#[command(name = "cuebridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (.json or .toml)
    #[arg(short, long, env = "CUEBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// List the available module and processor types and exit
    #[arg(long)]
    list: bool,

    /// Build the router, report rejected modules and routes, and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, cli.json_logs)?;

    let modules = ModuleRegistry::new();
    let processors = ProcessorRegistry::new();
    register_builtins(&modules, &processors);

    if cli.list {
        print_types(&modules, &processors);
        return Ok(());
    }

    let path = cli
        .config
        .context("No configuration file given (use --config or CUEBRIDGE_CONFIG)")?;
    let config = Config::from_path(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    let (router, module_errors, route_errors) = Router::new(&config, &modules, &processors);
    let rejected = module_errors.len() + route_errors.len();

    if cli.check {
        for e in &module_errors {
            println!("{} {}", "module".red().bold(), e);
        }
        for e in &route_errors {
            println!("{} {}", "route".red().bold(), e);
        }
        println!(
            "{} {} modules, {} routes, {} rejected",
            "cuebridge".cyan().bold(),
            router.module_count(),
            router.route_count(),
            rejected
        );
        if rejected > 0 {
            bail!("{} configuration entries rejected", rejected);
        }
        return Ok(());
    }

    if rejected > 0 {
        warn!(
            "{} modules and {} routes were rejected, continuing without them",
            module_errors.len(),
            route_errors.len()
        );
    }

    println!(
        "{} Routing {} modules over {} routes (Ctrl+C to stop)",
        "cuebridge".cyan().bold(),
        router.module_count(),
        router.route_count()
    );

    let router = Arc::new(router);

    let shutdown = router.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                shutdown.stop();
            }
            Err(e) => error!("Failed to listen for ctrl+c: {}", e),
        }
    });

    router.start().await;
    Ok(())
}

fn setup_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    Ok(())
}

fn print_types(modules: &ModuleRegistry, processors: &ProcessorRegistry) {
    println!("{}", "Modules:".bold());
    for type_name in modules.types() {
        println!("  {}", type_name.green());
    }
    println!("{}", "Processors:".bold());
    for type_name in processors.types() {
        println!("  {}", type_name.green());
    }
}
