// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: container file
fn container_arg() -> Arg {
    Arg::new("in")
        .long("in")
        .value_name("FILE")
        .required(true)
        .help("Container file")
}

/// Common argument: container type hint
fn type_arg() -> Arg {
    Arg::new("type")
        .long("type")
        .value_name("TYPE")
        .help("Container type (BDOC, ASICS, ASICE, DDOC)")
}

fn signature_args() -> [Arg; 3] {
    [
        Arg::new("profile")
            .long("profile")
            .help("Signature profile (LT, LT_TM, LTA, B_BES, B_EPES)"),
        Arg::new("encryption")
            .long("encryption")
            .help("Signature encryption algorithm (RSA, ECDSA, EDDSA)"),
        Arg::new("digest_algorithm")
            .long("digest-algorithm")
            .help("Signature digest algorithm"),
    ]
}

fn token_args() -> [Arg; 2] {
    [
        Arg::new("pkcs11")
            .long("pkcs11")
            .num_args(3)
            .value_names(["MODULE", "PIN", "SLOT"])
            .help("PKCS#11 module, PIN and slot"),
        Arg::new("pkcs12")
            .long("pkcs12")
            .num_args(2)
            .value_names(["FILE", "PASSWORD"])
            .help("PKCS#12 keystore file and password"),
    ]
}

fn build_cli() -> Command {
    Command::new("asicdoc")
        .version(env!("CARGO_PKG_VERSION"))
        .author("asicdoc Contributors")
        .about("Create, sign and validate ASiC signature containers")
        .arg(Arg::new("config").long("config").global(true).help("Configuration file"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Verbose output (debug logging)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Only log warnings and errors"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("process")
                .about("Open or create a container, modify it, sign it and verify it")
                .arg(container_arg())
                .arg(type_arg())
                .arg(
                    Arg::new("add")
                        .long("add")
                        .num_args(2)
                        .value_names(["FILE", "MIME"])
                        .action(ArgAction::Append)
                        .help("Add a data file with its mime type"),
                )
                .arg(
                    Arg::new("remove")
                        .long("remove")
                        .action(ArgAction::Append)
                        .help("Remove a data file by name"),
                )
                .arg(
                    Arg::new("extract")
                        .long("extract")
                        .num_args(2)
                        .value_names(["NAME", "DEST"])
                        .help("Extract a data file to a destination path"),
                )
                .args(signature_args())
                .args(token_args())
                .arg(
                    Arg::new("tst")
                        .long("tst")
                        .action(ArgAction::SetTrue)
                        .help("Timestamp an ASiC-S container instead of signing it"),
                )
                .arg(Arg::new("datst").long("datst").help("Digest algorithm for the timestamp token"))
                .arg(
                    Arg::new("verify")
                        .long("verify")
                        .action(ArgAction::SetTrue)
                        .help("Validate the container"),
                )
                .arg(Arg::new("report_dir").long("report-dir").help("Directory for validation reports")),
        )
        .subcommand(
            Command::new("compose-digest")
                .about("Compute the data to sign for a container and write it to a digest file")
                .arg(container_arg())
                .arg(type_arg())
                .arg(Arg::new("certificate").long("certificate").required(true).help("Signer certificate file"))
                .arg(Arg::new("digest_file").long("digest-file").required(true).help("Output digest file"))
                .args(signature_args()),
        )
        .subcommand(
            Command::new("compose-signature")
                .about("Sign a digest file with a PKCS#11 or PKCS#12 token")
                .arg(Arg::new("digest_file").long("digest-file").required(true).help("Digest file"))
                .arg(
                    Arg::new("signature_file")
                        .long("signature-file")
                        .required(true)
                        .help("Output signature file"),
                )
                .arg(Arg::new("digest_algorithm").long("digest-algorithm").help("Digest algorithm"))
                .args(token_args()),
        )
        .subcommand(
            Command::new("add-signature")
                .about("Add a detached signature value to a container")
                .arg(container_arg())
                .arg(type_arg())
                .arg(Arg::new("certificate").long("certificate").required(true).help("Signer certificate file"))
                .arg(
                    Arg::new("signature_file")
                        .long("signature-file")
                        .required(true)
                        .help("Signature value file"),
                )
                .args(signature_args()),
        )
        .subcommand(
            Command::new("keygen")
                .about("Generate a soft keystore and its public certificate")
                .arg(Arg::new("output").short('o').long("output").default_value("asicdoc-signer"))
                .arg(Arg::new("password").short('p').long("password").required(true))
                .arg(Arg::new("key_id").long("key-id"))
                .arg(Arg::new("force").long("force").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("asicdoc.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
