// src/main.rs

use anyhow::Result;
use asicdoc::Configuration;
use clap::{CommandFactory, Parser};
use std::path::Path;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> asicdoc::Result<Configuration> {
    Configuration::load(path)
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Keygen {
            output,
            password,
            key_id,
            force,
        } => commands::cmd_keygen(&output, &password, key_id, force),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "asicdoc", &mut std::io::stdout());
            Ok(())
        }
        Commands::Process(args) => commands::cmd_process(args, &load_config(config)?),
        Commands::ComposeDigest(args) => commands::cmd_compose_digest(args, &load_config(config)?),
        Commands::ComposeSignature(args) => {
            commands::cmd_compose_signature(args, &load_config(config)?)
        }
        Commands::AddSignature(args) => commands::cmd_add_signature(args, &load_config(config)?),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<asicdoc::Error>()
            .map(asicdoc::Error::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
