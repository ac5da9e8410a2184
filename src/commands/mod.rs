// src/commands/mod.rs
//! Command handlers for the asicdoc CLI

mod external;
mod keygen;
mod process;

pub use external::{cmd_add_signature, cmd_compose_digest, cmd_compose_signature};
pub use keygen::cmd_keygen;
pub use process::cmd_process;

use crate::cli::{SignatureArgs, TokenArgs};
use asicdoc::report::print_result;
use asicdoc::workflow::{AddFile, CommandOptions, Pkcs11Options, Pkcs12Options};
use asicdoc::{
    ArchiveStore, Configuration, Error, ExecutionOutcome, LocalEngine, SoftTokenProvider,
    WorkflowEngine,
};
use std::path::PathBuf;
use tracing::debug;

type Workflow = WorkflowEngine<LocalEngine, ArchiveStore, SoftTokenProvider>;

/// Build the workflow engine from the loaded configuration
fn workflow(config: &Configuration) -> asicdoc::Result<Workflow> {
    let engine = LocalEngine::from_configuration(config)?;
    Ok(WorkflowEngine::new(engine, ArchiveStore, SoftTokenProvider)
        .with_digest_algorithm(config.signature_digest_algorithm()))
}

/// `FILE MIME` pairs from a repeated `--add`
fn add_files(values: &[String]) -> Vec<AddFile> {
    values
        .chunks_exact(2)
        .map(|pair| AddFile {
            path: PathBuf::from(&pair[0]),
            media_type: pair[1].clone(),
        })
        .collect()
}

fn apply_signature_args(options: &mut CommandOptions, args: &SignatureArgs) {
    options.profile = args.profile.clone();
    options.encryption = args.encryption.clone();
    options.digest_algorithm = args.digest_algorithm.clone();
}

fn apply_token_args(options: &mut CommandOptions, args: &TokenArgs) -> asicdoc::Result<()> {
    if let Some([module, pin, slot]) = args.pkcs11.as_deref() {
        let slot = slot
            .parse()
            .map_err(|_| Error::ConfigurationError(format!("Invalid PKCS#11 slot: {}", slot)))?;
        options.pkcs11 = Some(Pkcs11Options {
            module: PathBuf::from(module),
            pin: pin.clone(),
            slot,
        });
    }
    if let Some([path, password]) = args.pkcs12.as_deref() {
        options.pkcs12 = Some(Pkcs12Options {
            path: PathBuf::from(path),
            password: password.clone(),
        });
    }
    Ok(())
}

/// Print what a command did
fn print_outcome(outcome: &ExecutionOutcome) {
    debug!("{:?}", outcome);
    if let Some(validation) = &outcome.validation {
        print_result(validation);
    }
    for artifact in &outcome.artifacts {
        println!("Wrote {}", artifact.display());
    }
    println!(
        "{} container: {} data file(s), {} signature(s){}{}",
        outcome.format,
        outcome.data_files,
        outcome.signatures,
        if outcome.timestamped { ", timestamped" } else { "" },
        if outcome.changed { " [saved]" } else { "" }
    );
}
