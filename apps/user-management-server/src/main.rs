use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dc_microservice::{AppConfig, DistributedLock, ManagedComponent, logging, run_lifecycle, signals};
use mimalloc::MiMalloc;
use tokio_util::sync::CancellationToken;
use user_management::UserManagementMicroservice;
use user_management::config::{MODULE_NAME, UserManagementConfiguration};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// DeviceChain user management microservice
#[derive(Parser)]
#[command(name = "user-management-server")]
#[command(about = "DeviceChain user management: provisions the tenant realm in Keycloak")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// PostgreSQL DSN for the provisioning lock (in-process lock if absent)
    #[cfg(feature = "pg")]
    #[arg(long)]
    lock_dsn: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Start the microservice
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config: defaults -> YAML (if provided) -> env (DC__*)
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init_logging(&config.logging, cli.verbose)?;

    if cli.print_config {
        println!("Effective configuration:\n{}", effective_yaml(&config)?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(&cli, &config).await,
        Commands::Check => check_config(&config),
    }
}

/// The loaded config with the module section filled in with its defaults.
fn effective_yaml(config: &AppConfig) -> Result<String> {
    let module: UserManagementConfiguration = config.module_config_or_default(MODULE_NAME)?;
    let mut effective = config.clone();
    effective.set_module_config(MODULE_NAME, &module)?;
    Ok(effective.to_yaml()?)
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let module: UserManagementConfiguration = config.module_config_or_default(MODULE_NAME)?;
    module.validate()?;
    let yaml = effective_yaml(config)?;
    println!("Configuration is valid");
    println!("{yaml}");
    Ok(())
}

#[cfg_attr(not(feature = "pg"), allow(clippy::unused_async))]
async fn build_lock(cli: &Cli) -> Result<Arc<dyn DistributedLock>> {
    #[cfg(feature = "pg")]
    if let Some(dsn) = &cli.lock_dsn {
        tracing::info!("using postgres lease table for the provisioning lock");
        let lock = dc_microservice::lock::PgLeaseLock::connect(dsn).await?;
        return Ok(Arc::new(lock));
    }
    #[cfg(not(feature = "pg"))]
    let _ = cli;

    tracing::warn!("using in-process provisioning lock; only safe with a single replica");
    Ok(Arc::new(dc_microservice::InMemoryLock::new()))
}

async fn run_server(cli: &Cli, config: &AppConfig) -> Result<()> {
    tracing::info!(
        functional_area = %config.microservice.functional_area,
        tenant_id = %config.microservice.tenant_id,
        "user management starting"
    );

    let lock = build_lock(cli).await?;
    let microservice: Arc<dyn ManagedComponent> =
        Arc::new(UserManagementMicroservice::from_config(config, lock)?);

    let cancel = CancellationToken::new();
    let listener = signals::spawn_shutdown_listener(cancel.clone());

    let result = run_lifecycle(&[microservice], cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = listener.await {
        tracing::warn!(error = %e, "shutdown listener task failed");
    }
    result
}
