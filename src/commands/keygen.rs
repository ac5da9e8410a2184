// src/commands/keygen.rs

//! Soft keystore generation
//!
//! Produces the PKCS#12-slot keystore read by `--pkcs12` and the
//! certificate file read by `--certificate`.

use anyhow::{Context, Result};
use asicdoc::signing::{SignatureToken, SoftToken};
use std::path::Path;

/// Generate an Ed25519 keystore and its public certificate
pub fn cmd_keygen(output: &str, password: &str, key_id: Option<String>, force: bool) -> Result<()> {
    let keystore_path = Path::new(output).with_extension("p12");
    let certificate_path = Path::new(output).with_extension("cert");

    if !force && (keystore_path.exists() || certificate_path.exists()) {
        anyhow::bail!(
            "Key files already exist. Use --force to overwrite.\n  Keystore: {}\n  Certificate: {}",
            keystore_path.display(),
            certificate_path.display()
        );
    }

    println!("Generating Ed25519 signing key...");

    let mut token = SoftToken::generate();
    if let Some(id) = key_id {
        token = token.with_key_id(&id);
    }

    token
        .save(&keystore_path, password)
        .context("Failed to save keystore")?;
    let certificate = token.certificate();
    certificate
        .save(&certificate_path)
        .context("Failed to save certificate")?;

    println!();
    println!("Key generated successfully!");
    println!();
    println!("Files created:");
    println!("  Keystore:    {} (keep this secret!)", keystore_path.display());
    println!("  Certificate: {} (share for verification)", certificate_path.display());
    println!();
    println!("Public key (base64):");
    println!("  {}", certificate.public_key);
    println!();
    println!("To sign a container:");
    println!(
        "  asicdoc process --in doc.asice --add file.txt text/plain --pkcs12 {} <password>",
        keystore_path.display()
    );

    Ok(())
}
