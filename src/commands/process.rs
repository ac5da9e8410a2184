// src/commands/process.rs

//! The `process` command

use super::{add_files, apply_signature_args, apply_token_args, print_outcome, workflow};
use crate::cli::ProcessArgs;
use anyhow::Result;
use asicdoc::workflow::{Command, CommandOptions, Extract};
use asicdoc::Configuration;
use std::path::PathBuf;
use tracing::info;

/// Open or create a container and run the requested operations on it
pub fn cmd_process(args: ProcessArgs, config: &Configuration) -> Result<()> {
    let mut options = CommandOptions {
        container: Some(args.container.container),
        container_type: args.container.container_type,
        add: add_files(&args.add),
        remove: args.remove,
        extract: args.extract.as_deref().and_then(|values| match values {
            [name, destination] => Some(Extract {
                name: name.clone(),
                destination: PathBuf::from(destination),
            }),
            _ => None,
        }),
        timestamp: args.tst,
        timestamp_digest_algorithm: args.datst,
        verify: args.verify,
        report_dir: args.report_dir,
        ..Default::default()
    };
    apply_signature_args(&mut options, &args.signature);
    apply_token_args(&mut options, &args.token)?;

    let outcome = workflow(config)?.execute(Command::Process, &options)?;
    print_outcome(&outcome);

    if let Some(validation) = &outcome.validation {
        info!("Container is valid: {}", validation.is_valid);
    }
    Ok(())
}
