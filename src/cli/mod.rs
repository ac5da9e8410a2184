// src/cli/mod.rs
//! CLI definitions for asicdoc
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! - `process` - Open or create a container, add/remove/extract, sign, verify
//! - `compose-digest` - External signing step 1: write the data to sign
//! - `compose-signature` - External signing step 2: sign a digest file with a token
//! - `add-signature` - External signing step 3: add the signature to the container
//! - `keygen` - Generate a soft keystore and certificate for signing
//! - `completions` - Shell completion scripts

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

mod external;
mod process;

pub use external::{AddSignatureArgs, ComposeDigestArgs, ComposeSignatureArgs};
pub use process::ProcessArgs;

#[derive(Parser)]
#[command(name = "asicdoc")]
#[command(author = "asicdoc Contributors")]
#[command(version)]
#[command(about = "Create, sign and validate ASiC signature containers", long_about = None)]
pub struct Cli {
    /// Configuration file (default: $XDG_CONFIG_HOME/asicdoc/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open or create a container, modify it, sign it and verify it
    Process(ProcessArgs),

    /// Compute the data to sign for a container and write it to a digest file
    ComposeDigest(ComposeDigestArgs),

    /// Sign a digest file with a PKCS#11 or PKCS#12 token
    ComposeSignature(ComposeSignatureArgs),

    /// Add a detached signature value to a container
    AddSignature(AddSignatureArgs),

    /// Generate a soft keystore and its public certificate
    Keygen {
        /// Output path for key files (without extension)
        #[arg(short, long, default_value = "asicdoc-signer")]
        output: String,

        /// Keystore password
        #[arg(short, long)]
        password: String,

        /// Key identifier (e.g., name or email)
        #[arg(long)]
        key_id: Option<String>,

        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Container selection shared by the container commands
#[derive(Args, Debug, Clone)]
pub struct ContainerArgs {
    /// Container file
    #[arg(long = "in", value_name = "FILE")]
    pub container: PathBuf,

    /// Container type (BDOC, ASICS, ASICE, DDOC); guessed from the extension if omitted
    #[arg(long = "type", value_name = "TYPE")]
    pub container_type: Option<String>,
}

/// Signature parameters shared by the signing commands
#[derive(Args, Debug, Clone, Default)]
pub struct SignatureArgs {
    /// Signature profile (LT, LT_TM, LTA, B_BES, B_EPES)
    #[arg(long)]
    pub profile: Option<String>,

    /// Signature encryption algorithm (RSA, ECDSA, EDDSA)
    #[arg(long)]
    pub encryption: Option<String>,

    /// Signature digest algorithm (SHA224, SHA256, SHA384, SHA512)
    #[arg(long)]
    pub digest_algorithm: Option<String>,
}

/// Token selection; exactly one of the two
#[derive(Args, Debug, Clone, Default)]
pub struct TokenArgs {
    /// PKCS#11 module, PIN and slot
    #[arg(long, num_args = 3, value_names = ["MODULE", "PIN", "SLOT"])]
    pub pkcs11: Option<Vec<String>>,

    /// PKCS#12 keystore file and password
    #[arg(long, num_args = 2, value_names = ["FILE", "PASSWORD"])]
    pub pkcs12: Option<Vec<String>>,
}
