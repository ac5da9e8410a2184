// src/commands/external.rs

//! Detached signing commands
//!
//! `compose-digest` and `add-signature` work on a container;
//! `compose-signature` only turns a digest file into a signature file.

use super::{add_files, apply_signature_args, apply_token_args, print_outcome, workflow};
use crate::cli::{AddSignatureArgs, ComposeDigestArgs, ComposeSignatureArgs};
use anyhow::Result;
use asicdoc::workflow::{Command, CommandOptions};
use asicdoc::{Configuration, Error};

/// Write the data to sign for a container
pub fn cmd_compose_digest(args: ComposeDigestArgs, config: &Configuration) -> Result<()> {
    let mut options = CommandOptions {
        container: Some(args.container.container),
        container_type: args.container.container_type,
        add: add_files(&args.add),
        certificate: Some(args.certificate),
        digest_file: Some(args.digest_file),
        ..Default::default()
    };
    apply_signature_args(&mut options, &args.signature);

    let outcome = workflow(config)?.execute(Command::ComposeDigest, &options)?;
    print_outcome(&outcome);
    Ok(())
}

/// Sign a digest file with a token
pub fn cmd_compose_signature(args: ComposeSignatureArgs, config: &Configuration) -> Result<()> {
    let mut options = CommandOptions {
        digest_file: Some(args.digest_file),
        signature_file: Some(args.signature_file),
        digest_algorithm: args.digest_algorithm,
        ..Default::default()
    };
    apply_token_args(&mut options, &args.token)?;

    let command = match (&options.pkcs11, &options.pkcs12) {
        (Some(_), None) => Command::ComposeSignatureWithPkcs11,
        (None, Some(_)) => Command::ComposeSignatureWithPkcs12,
        _ => {
            return Err(Error::ConfigurationError(
                "Exactly one of --pkcs11 or --pkcs12 is required".to_string(),
            )
            .into());
        }
    };

    let outcome = workflow(config)?.execute(command, &options)?;
    for artifact in &outcome.artifacts {
        println!("Wrote {}", artifact.display());
    }
    Ok(())
}

/// Add a signature value produced elsewhere to a container
pub fn cmd_add_signature(args: AddSignatureArgs, config: &Configuration) -> Result<()> {
    let mut options = CommandOptions {
        container: Some(args.container.container),
        container_type: args.container.container_type,
        certificate: Some(args.certificate),
        signature_file: Some(args.signature_file),
        ..Default::default()
    };
    apply_signature_args(&mut options, &args.signature);

    let outcome = workflow(config)?.execute(Command::AddSignature, &options)?;
    print_outcome(&outcome);
    Ok(())
}
