// tests/workflow.rs

//! End-to-end command tests against real container files.

mod common;

use asicdoc::container::ContainerStore;
use asicdoc::workflow::{Command, CommandOptions, Extract};
use asicdoc::{ArchiveStore, ContainerFormat, Error, ErrorKind};
use common::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_sign_verify_and_reopen_asice() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("signed.asice");

    let options = CommandOptions {
        add: vec![hello(temp_dir.path())],
        pkcs12: Some(signer.pkcs12()),
        verify: true,
        ..options_for(&container)
    };
    let outcome = local_workflow().execute(Command::Process, &options).unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.format, ContainerFormat::Asice);
    assert_eq!(outcome.data_files, 1);
    assert_eq!(outcome.signatures, 1);
    let validation = outcome.validation.unwrap();
    assert!(validation.is_valid, "{}", validation.report());
    assert_eq!(validation.signatures.len(), 1);

    let reopened = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                verify: true,
                ..options_for(&container)
            },
        )
        .unwrap();
    assert!(!reopened.changed);
    assert_eq!(reopened.data_files, 1);
    assert_eq!(reopened.signatures, 1);
    assert!(reopened.validation.unwrap().is_valid);
}

#[test]
fn test_verify_writes_reports() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let reports = temp_dir.path().join("reports");
    fs::create_dir(&reports).unwrap();

    let options = CommandOptions {
        add: vec![hello(temp_dir.path())],
        pkcs12: Some(signer.pkcs12()),
        verify: true,
        report_dir: Some(reports.clone()),
        ..options_for(&temp_dir.path().join("report.asice"))
    };
    local_workflow().execute(Command::Process, &options).unwrap();

    assert!(reports.join("validation-report.json").exists());
    assert!(reports.join("validation-report.txt").exists());
}

#[test]
fn test_asics_timestamp_blocks_signing() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("stamped.asics");

    let stamped = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                timestamp: true,
                timestamp_digest_algorithm: Some("SHA512".to_string()),
                ..options_for(&container)
            },
        )
        .unwrap();
    assert_eq!(stamped.format, ContainerFormat::Asics);
    assert!(stamped.timestamped);
    assert_eq!(stamped.signatures, 0);

    let before = fs::read(&container).unwrap();
    let err = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                pkcs12: Some(signer.pkcs12()),
                ..options_for(&container)
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::ContainerAlreadyTimestamped));
    assert_eq!(err.kind(), ErrorKind::Integrity);

    assert_eq!(fs::read(&container).unwrap(), before);
    let reopened = ArchiveStore
        .open_existing(&container, ContainerFormat::Asics)
        .unwrap();
    assert!(reopened.signatures().is_empty());
    assert!(reopened.is_timestamped());
}

#[test]
fn test_asics_signature_blocks_timestamp() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("signed.asics");

    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                pkcs12: Some(signer.pkcs12()),
                ..options_for(&container)
            },
        )
        .unwrap();

    let before = fs::read(&container).unwrap();
    let err = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![text_file(temp_dir.path(), "second.txt")],
                timestamp: true,
                ..options_for(&container)
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::ContainerAlreadySigned));
    assert_eq!(fs::read(&container).unwrap(), before);
}

#[test]
fn test_bad_timestamp_digest_falls_back() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("fallback.asics");

    let outcome = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                timestamp: true,
                timestamp_digest_algorithm: Some("MD5".to_string()),
                verify: true,
                ..options_for(&container)
            },
        )
        .unwrap();
    assert!(outcome.timestamped);
    assert!(outcome.validation.unwrap().is_valid);

    let reopened = ArchiveStore
        .open_existing(&container, ContainerFormat::Asics)
        .unwrap();
    let token = reopened.timestamp_token().unwrap();
    assert_eq!(token.digest_algorithm, asicdoc::DigestAlgorithm::Sha256);
}

#[test]
fn test_extract_missing_file_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("plain.asice");
    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                ..options_for(&container)
            },
        )
        .unwrap();

    let destination = temp_dir.path().join("out.txt");
    let err = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                extract: Some(Extract {
                    name: "missing.txt".to_string(),
                    destination: destination.clone(),
                }),
                ..options_for(&container)
            },
        )
        .unwrap_err();

    assert!(matches!(err, Error::DataFileNotFound(ref name) if name == "missing.txt"));
    assert_eq!(err.exit_code(), 4);
    assert!(!destination.exists());
}

#[test]
fn test_extract_is_case_insensitive() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("plain.asice");
    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                ..options_for(&container)
            },
        )
        .unwrap();

    let destination = temp_dir.path().join("copy.txt");
    let outcome = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                extract: Some(Extract {
                    name: "HELLO.TXT".to_string(),
                    destination: destination.clone(),
                }),
                ..options_for(&container)
            },
        )
        .unwrap();

    assert!(!outcome.changed);
    assert_eq!(fs::read(&destination).unwrap(), b"hello");
}

#[test]
fn test_remove_from_unsigned_container() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("plain.asice");
    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![
                    hello(temp_dir.path()),
                    text_file(temp_dir.path(), "second.txt"),
                ],
                ..options_for(&container)
            },
        )
        .unwrap();

    let outcome = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                remove: vec!["hello.txt".to_string()],
                ..options_for(&container)
            },
        )
        .unwrap();
    assert!(outcome.changed);
    assert_eq!(outcome.data_files, 1);
}

#[test]
fn test_signed_container_rejects_new_data() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("sealed.bdoc");
    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                pkcs12: Some(signer.pkcs12()),
                ..options_for(&container)
            },
        )
        .unwrap();

    let err = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![text_file(temp_dir.path(), "late.txt")],
                ..options_for(&container)
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::ContainerSigned(_)));
}

#[test]
fn test_data_file_named_mimetype_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("reserved.asice");

    let err = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![text_file(temp_dir.path(), "mimetype")],
                ..options_for(&container)
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::ReservedEntryName(ref name) if name == "mimetype"));
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(!container.exists());

    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                ..options_for(&container)
            },
        )
        .unwrap();
    let reopened = ArchiveStore
        .open_existing(&container, ContainerFormat::Asice)
        .unwrap();
    assert_eq!(reopened.data_files().len(), 1);
}

#[test]
fn test_external_round_trip_with_identity_signer() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("external.asice");
    let digest_file = temp_dir.path().join("digest.bin");
    let signature_file = temp_dir.path().join("signature.bin");
    let vector = b"fixed data-to-sign vector";

    let composed = mock_workflow(MockEngine::new(vector))
        .execute(
            Command::ComposeDigest,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                certificate: Some(signer.certificate.clone()),
                digest_file: Some(digest_file.clone()),
                ..options_for(&container)
            },
        )
        .unwrap();
    assert_eq!(composed.artifacts, vec![digest_file.clone()]);
    assert_eq!(fs::read(&digest_file).unwrap(), vector);

    // The external signer returns its input unchanged.
    fs::write(&signature_file, fs::read(&digest_file).unwrap()).unwrap();

    let engine = MockEngine::new(vector);
    let workflow = mock_workflow(engine);
    let applied = workflow
        .execute(
            Command::AddSignature,
            &CommandOptions {
                certificate: Some(signer.certificate.clone()),
                signature_file: Some(signature_file),
                ..options_for(&container)
            },
        )
        .unwrap();
    assert!(applied.changed);
    assert_eq!(applied.signatures, composed.signatures + 1);
    assert_eq!(workflow.engine().calls(), vec!["build_data_to_sign"]);

    let reopened = ArchiveStore
        .open_existing(&container, ContainerFormat::Asice)
        .unwrap();
    assert_eq!(reopened.signatures().len(), 1);
}

#[test]
fn test_external_signing_with_soft_token() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("detached.asice");
    let digest_file = temp_dir.path().join("digest.bin");
    let signature_file = temp_dir.path().join("signature.bin");

    local_workflow()
        .execute(
            Command::ComposeDigest,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                certificate: Some(signer.certificate.clone()),
                digest_file: Some(digest_file.clone()),
                digest_algorithm: Some("SHA384".to_string()),
                ..options_for(&container)
            },
        )
        .unwrap();

    let signed = local_workflow()
        .execute(
            Command::ComposeSignatureWithPkcs12,
            &CommandOptions {
                digest_file: Some(digest_file),
                signature_file: Some(signature_file.clone()),
                pkcs12: Some(signer.pkcs12()),
                digest_algorithm: Some("SHA384".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(signed.artifacts, vec![signature_file.clone()]);

    local_workflow()
        .execute(
            Command::AddSignature,
            &CommandOptions {
                certificate: Some(signer.certificate.clone()),
                signature_file: Some(signature_file),
                digest_algorithm: Some("SHA384".to_string()),
                ..options_for(&container)
            },
        )
        .unwrap();

    let verified = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                verify: true,
                ..options_for(&container)
            },
        )
        .unwrap();
    let validation = verified.validation.unwrap();
    assert!(validation.is_valid, "{}", validation.report());
    assert_eq!(verified.signatures, 1);
}

#[test]
fn test_mismatched_digest_algorithm_fails_verification() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("mismatch.asice");
    let digest_file = temp_dir.path().join("digest.bin");
    let signature_file = temp_dir.path().join("signature.bin");

    local_workflow()
        .execute(
            Command::ComposeDigest,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                certificate: Some(signer.certificate.clone()),
                digest_file: Some(digest_file.clone()),
                ..options_for(&container)
            },
        )
        .unwrap();
    local_workflow()
        .execute(
            Command::ComposeSignatureWithPkcs12,
            &CommandOptions {
                digest_file: Some(digest_file),
                signature_file: Some(signature_file.clone()),
                pkcs12: Some(signer.pkcs12()),
                digest_algorithm: Some("SHA512".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    local_workflow()
        .execute(
            Command::AddSignature,
            &CommandOptions {
                certificate: Some(signer.certificate.clone()),
                signature_file: Some(signature_file),
                ..options_for(&container)
            },
        )
        .unwrap();

    let verified = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                verify: true,
                ..options_for(&container)
            },
        )
        .unwrap();
    assert!(!verified.validation.unwrap().is_valid);
}

#[test]
fn test_add_signature_needs_existing_container() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let signature_file = data_file(temp_dir.path(), "signature.bin", b"value");

    let err = local_workflow()
        .execute(
            Command::AddSignature,
            &CommandOptions {
                certificate: Some(signer.certificate),
                signature_file: Some(signature_file),
                ..options_for(&temp_dir.path().join("absent.asice"))
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::ContainerNotFound(_)));
    assert_eq!(err.exit_code(), 7);
}

#[test]
fn test_add_signature_with_missing_signature_file() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let container = temp_dir.path().join("plain.asice");
    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                ..options_for(&container)
            },
        )
        .unwrap();

    let err = local_workflow()
        .execute(
            Command::AddSignature,
            &CommandOptions {
                certificate: Some(signer.certificate),
                signature_file: Some(temp_dir.path().join("missing.sig")),
                ..options_for(&container)
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::SignatureLoad(_)));
}

#[test]
fn test_pkcs11_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let err = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                pkcs11: Some(asicdoc::workflow::Pkcs11Options {
                    module: "/usr/lib/softhsm/libsofthsm2.so".into(),
                    pin: "1234".to_string(),
                    slot: 0,
                }),
                ..options_for(&temp_dir.path().join("hsm.asice"))
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::TokenError(_)));
    assert!(!temp_dir.path().join("hsm.asice").exists());
}

#[test]
fn test_wrong_keystore_password() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let mut pkcs12 = signer.pkcs12();
    pkcs12.password = "wrong".to_string();

    let err = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                pkcs12: Some(pkcs12),
                ..options_for(&temp_dir.path().join("locked.asice"))
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::TokenError(_)));
}

#[test]
fn test_invalid_pades_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = data_file(temp_dir.path(), "document.pdf", b"%PDF-1.7\n...");

    let workflow = mock_workflow(MockEngine::invalid());
    let err = workflow
        .execute(Command::Process, &options_for(&pdf))
        .unwrap_err();
    assert!(matches!(err, Error::ValidationFailure(_)));
    assert_eq!(err.exit_code(), 6);
    assert_eq!(workflow.engine().calls(), vec!["validate"]);
}

#[test]
fn test_pades_ignores_mutations() {
    let temp_dir = TempDir::new().unwrap();
    let pdf = data_file(temp_dir.path(), "document.pdf", b"%PDF-1.7\n...");

    let outcome = mock_workflow(MockEngine::new(b"unused"))
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                remove: vec!["document.pdf".to_string()],
                ..options_for(&pdf)
            },
        )
        .unwrap();

    assert_eq!(outcome.format, ContainerFormat::Pades);
    assert!(!outcome.changed);
    assert!(outcome.validation.unwrap().is_valid);
    assert_eq!(fs::read(&pdf).unwrap(), b"%PDF-1.7\n...");
}

#[test]
fn test_pades_cannot_be_signed() {
    let temp_dir = TempDir::new().unwrap();
    let signer = generate_signer(temp_dir.path());
    let pdf = data_file(temp_dir.path(), "document.pdf", b"%PDF-1.7\n...");

    let err = mock_workflow(MockEngine::new(b"unused"))
        .execute(
            Command::Process,
            &CommandOptions {
                pkcs12: Some(signer.pkcs12()),
                ..options_for(&pdf)
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::ConfigurationError(_)));
}

#[test]
fn test_opened_format_overrides_hint() {
    let temp_dir = TempDir::new().unwrap();
    let container = temp_dir.path().join("single.asics");
    local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                add: vec![hello(temp_dir.path())],
                ..options_for(&container)
            },
        )
        .unwrap();

    let outcome = local_workflow()
        .execute(
            Command::Process,
            &CommandOptions {
                container_type: Some("ASICE".to_string()),
                ..options_for(&container)
            },
        )
        .unwrap();
    assert_eq!(outcome.format, ContainerFormat::Asics);
}
