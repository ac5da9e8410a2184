// src/cli/process.rs
//! Arguments for the `process` command

use super::{ContainerArgs, SignatureArgs, TokenArgs};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    #[command(flatten)]
    pub container: ContainerArgs,

    /// Add a data file with its mime type (repeatable)
    #[arg(long, num_args = 2, value_names = ["FILE", "MIME"], action = clap::ArgAction::Append)]
    pub add: Vec<String>,

    /// Remove a data file by name (repeatable)
    #[arg(long)]
    pub remove: Vec<String>,

    /// Extract a data file to a destination path
    #[arg(long, num_args = 2, value_names = ["NAME", "DEST"])]
    pub extract: Option<Vec<String>>,

    #[command(flatten)]
    pub signature: SignatureArgs,

    #[command(flatten)]
    pub token: TokenArgs,

    /// Timestamp an ASiC-S container instead of signing it
    #[arg(long)]
    pub tst: bool,

    /// Digest algorithm for the timestamp token
    #[arg(long, value_name = "ALGORITHM")]
    pub datst: Option<String>,

    /// Validate the container
    #[arg(long)]
    pub verify: bool,

    /// Directory for validation reports
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,
}
