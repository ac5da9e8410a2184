// src/workflow/command.rs

//! Commands, their step tables and options

use std::fmt;
use std::path::PathBuf;

/// A top-level workflow command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open or create a container, mutate, sign, verify, save
    Process,
    /// External step 1: write the data to sign for a container
    ComposeDigest,
    /// External step 2 with a PKCS#11 token
    ComposeSignatureWithPkcs11,
    /// External step 2 with a PKCS#12 token
    ComposeSignatureWithPkcs12,
    /// External step 3: add a detached signature to a container
    AddSignature,
}

/// One unit of work; commands are fixed sequences of steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Open the container when present (or verify/remove requested), else create it
    OpenOrCreate,
    /// Open the container; absence is an error
    OpenExisting,
    /// Reject signing or adding to a sealed ASiC-S container
    GuardAsics,
    /// Add, remove and extract data files
    Mutate,
    /// Read the signer certificate file
    LoadCertificate,
    /// Compute the data to sign and write the digest file
    ComposeDigest,
    /// Read a digest file written by [`Step::ComposeDigest`]
    LoadDigest,
    LoadPkcs11Token,
    LoadPkcs12Token,
    /// Sign the loaded digest and write the signature file
    ComposeSignature,
    /// Read a raw signature value file
    LoadSignature,
    /// Finalize the loaded signature into the container
    ApplySignature,
    /// Timestamp or sign with the configured tokens
    Sign,
    /// Validate the container
    Verify,
    /// Save the container if anything changed
    Persist,
}

impl Command {
    /// The ordered steps this command runs
    pub const fn steps(&self) -> &'static [Step] {
        match self {
            Self::Process => &[
                Step::OpenOrCreate,
                Step::GuardAsics,
                Step::Mutate,
                Step::Sign,
                Step::Verify,
                Step::Persist,
            ],
            Self::ComposeDigest => &[
                Step::OpenOrCreate,
                Step::Mutate,
                Step::LoadCertificate,
                Step::ComposeDigest,
                Step::Persist,
            ],
            Self::ComposeSignatureWithPkcs11 => &[
                Step::LoadDigest,
                Step::LoadPkcs11Token,
                Step::ComposeSignature,
            ],
            Self::ComposeSignatureWithPkcs12 => &[
                Step::LoadDigest,
                Step::LoadPkcs12Token,
                Step::ComposeSignature,
            ],
            Self::AddSignature => &[
                Step::OpenExisting,
                Step::LoadCertificate,
                Step::LoadSignature,
                Step::ApplySignature,
                Step::Persist,
            ],
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::ComposeDigest => "compose-digest",
            Self::ComposeSignatureWithPkcs11 => "compose-signature (PKCS#11)",
            Self::ComposeSignatureWithPkcs12 => "compose-signature (PKCS#12)",
            Self::AddSignature => "add-signature",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A file to add to the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddFile {
    pub path: PathBuf,
    pub media_type: String,
}

/// A data file to copy out of the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extract {
    pub name: String,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs11Options {
    pub module: PathBuf,
    pub pin: String,
    pub slot: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkcs12Options {
    pub path: PathBuf,
    pub password: String,
}

/// Everything a command may be told to do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Container file
    pub container: Option<PathBuf>,
    /// Explicit type hint (`BDOC`, `ASICS`, `ASICE`, `DDOC`)
    pub container_type: Option<String>,
    pub add: Vec<AddFile>,
    pub remove: Vec<String>,
    pub extract: Option<Extract>,
    /// Signature profile name, e.g. `LT`
    pub profile: Option<String>,
    /// Encryption algorithm name, e.g. `ECDSA`
    pub encryption: Option<String>,
    /// Signature digest algorithm name
    pub digest_algorithm: Option<String>,
    pub pkcs11: Option<Pkcs11Options>,
    pub pkcs12: Option<Pkcs12Options>,
    /// Seal an ASiC-S container with a timestamp token instead of signing
    pub timestamp: bool,
    /// Digest algorithm for the timestamp token
    pub timestamp_digest_algorithm: Option<String>,
    /// Signer certificate for the detached signing commands
    pub certificate: Option<PathBuf>,
    pub digest_file: Option<PathBuf>,
    pub signature_file: Option<PathBuf>,
    pub verify: bool,
    pub report_dir: Option<PathBuf>,
}

impl CommandOptions {
    /// Whether any option asks to add data or sign with a token
    pub fn adds_or_signs(&self) -> bool {
        !self.add.is_empty() || self.pkcs11.is_some() || self.pkcs12.is_some()
    }

    pub fn has_token(&self) -> bool {
        self.pkcs11.is_some() || self.pkcs12.is_some()
    }

    pub fn has_mutations(&self) -> bool {
        !self.add.is_empty() || !self.remove.is_empty() || self.extract.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Command; 5] = [
        Command::Process,
        Command::ComposeDigest,
        Command::ComposeSignatureWithPkcs11,
        Command::ComposeSignatureWithPkcs12,
        Command::AddSignature,
    ];

    fn position(command: Command, step: Step) -> Option<usize> {
        command.steps().iter().position(|s| *s == step)
    }

    #[test]
    fn test_persist_is_always_last() {
        for command in ALL {
            if let Some(index) = position(command, Step::Persist) {
                assert_eq!(index, command.steps().len() - 1, "{}", command);
            }
        }
    }

    #[test]
    fn test_process_guard_runs_before_mutation() {
        let guard = position(Command::Process, Step::GuardAsics).unwrap();
        let mutate = position(Command::Process, Step::Mutate).unwrap();
        let sign = position(Command::Process, Step::Sign).unwrap();
        let verify = position(Command::Process, Step::Verify).unwrap();
        assert!(guard < mutate && mutate < sign && sign < verify);
    }

    #[test]
    fn test_compose_signature_needs_no_container() {
        for command in [
            Command::ComposeSignatureWithPkcs11,
            Command::ComposeSignatureWithPkcs12,
        ] {
            assert!(position(command, Step::OpenOrCreate).is_none());
            assert!(position(command, Step::OpenExisting).is_none());
            assert!(position(command, Step::Persist).is_none());
        }
    }

    #[test]
    fn test_add_signature_requires_existing_container() {
        assert_eq!(Command::AddSignature.steps()[0], Step::OpenExisting);
        assert!(
            position(Command::AddSignature, Step::LoadSignature).unwrap()
                < position(Command::AddSignature, Step::ApplySignature).unwrap()
        );
    }

    #[test]
    fn test_option_predicates() {
        let mut options = CommandOptions::default();
        assert!(!options.adds_or_signs());
        assert!(!options.has_mutations());

        options.remove.push("a.txt".to_string());
        assert!(options.has_mutations());
        assert!(!options.adds_or_signs());

        options.pkcs12 = Some(Pkcs12Options {
            path: PathBuf::from("signer.p12"),
            password: "secret".to_string(),
        });
        assert!(options.adds_or_signs());
        assert!(options.has_token());
    }
}
