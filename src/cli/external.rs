// src/cli/external.rs
//! Arguments for the detached signing commands
//!
//! The three commands must be given the same profile and digest algorithm,
//! otherwise the signature applied in the last step will not verify.

use super::{ContainerArgs, SignatureArgs, TokenArgs};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ComposeDigestArgs {
    #[command(flatten)]
    pub container: ContainerArgs,

    /// Add a data file with its mime type before computing the digest (repeatable)
    #[arg(long, num_args = 2, value_names = ["FILE", "MIME"], action = clap::ArgAction::Append)]
    pub add: Vec<String>,

    /// Signer certificate file
    #[arg(long, value_name = "FILE")]
    pub certificate: PathBuf,

    /// Output file for the data to sign
    #[arg(long, value_name = "FILE")]
    pub digest_file: PathBuf,

    #[command(flatten)]
    pub signature: SignatureArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ComposeSignatureArgs {
    /// Digest file written by compose-digest
    #[arg(long, value_name = "FILE")]
    pub digest_file: PathBuf,

    /// Output file for the raw signature value
    #[arg(long, value_name = "FILE")]
    pub signature_file: PathBuf,

    /// Digest algorithm used when the digest was composed
    #[arg(long)]
    pub digest_algorithm: Option<String>,

    #[command(flatten)]
    pub token: TokenArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AddSignatureArgs {
    #[command(flatten)]
    pub container: ContainerArgs,

    /// Signer certificate file
    #[arg(long, value_name = "FILE")]
    pub certificate: PathBuf,

    /// Raw signature value file written by compose-signature
    #[arg(long, value_name = "FILE")]
    pub signature_file: PathBuf,

    #[command(flatten)]
    pub signature: SignatureArgs,
}
