//! chef-inventory - Ansible dynamic inventory backed by a Chef server
//!
//! This is the main entry point for the chef-inventory CLI. Inventory JSON is
//! written to stdout; logs and errors go to stderr.

mod cli;

use anyhow::{Context, Result};
use clap::CommandFactory;
use cli::Cli;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chef_inventory::chef::{ChefClientConfig, ChefServerClient};
use chef_inventory::config::{default_settings_path, InventoryConfig};
use chef_inventory::service::{InventoryResponse, InventoryService};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());
    debug!("chef-inventory v{}", VERSION);

    let exit_code = match run(&cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {:#}", e);
            exit_code_for(&e)
        }
    };

    std::process::exit(exit_code);
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let settings_path = cli.settings.clone().unwrap_or_else(default_settings_path);
    let config = InventoryConfig::load(&settings_path)?;

    let client = ChefServerClient::new(
        ChefClientConfig::from_credentials(&config.credentials).with_timeout(config.timeout),
    );
    let service = InventoryService::new(&config, client);

    let (state, response) = service.run(&cli.request())?;
    debug!(?state, cache = %service.store().path().display(), "cache ready");

    match response {
        InventoryResponse::Inventory(inventory) => {
            let json = inventory
                .to_pretty_json()
                .context("failed to render inventory")?;
            println!("{}", json);
        }
        InventoryResponse::HostVars(vars) => {
            println!("{}", serde_json::to_string_pretty(&vars)?);
        }
        InventoryResponse::Usage => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

/// Map an error to the process exit code
fn exit_code_for(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<chef_inventory::Error>()
        .map(chef_inventory::Error::exit_code)
        .unwrap_or(1)
}
