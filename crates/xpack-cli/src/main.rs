mod cli;
mod cmd;
mod config_gen;
mod console;
mod format;
mod prompt;
mod signal;

use clap::Parser;

use xpack_core::config::{self, XpackConfig};

use cli::{Cli, Commands, PackArgs};
use cmd::pack::{run_pack, PackSettings};
use config_gen::run_config_generate;

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    console::init_colors();

    // `config` needs no config file
    if let Some(Commands::Config { dest, user }) = &cli.command {
        if let Err(e) = run_config_generate(dest.as_deref(), *user) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let cfg = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let default_args = PackArgs::default();
    let args = match &cli.command {
        Some(Commands::Pack(args)) => args,
        _ => &default_args,
    };

    let result = PackSettings::resolve(&cfg, args).and_then(|settings| {
        signal::install_signal_handlers();
        run_pack(&settings)
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Load the config file if one is found. An explicit `--config` or
/// `XPACK_CONFIG` that points at a missing file is an error; finding nothing
/// in the search paths just means built-in defaults.
fn load_config(cli_config: Option<&str>) -> Result<XpackConfig, Box<dyn std::error::Error>> {
    match config::resolve_config_path(cli_config) {
        Some(source) => {
            tracing::info!("Using config: {source}");
            Ok(config::load_config(source.path())?)
        }
        None => {
            tracing::debug!("no config file found, using defaults");
            Ok(XpackConfig::default())
        }
    }
}
