// src/workflow/mod.rs

//! Command execution
//!
//! [`WorkflowEngine::execute`] runs the steps of a [`Command`] in table
//! order. It sees the signing engine, the container store and the token
//! provider only through their traits.
//!
//! Format rules applied here:
//!
//! - Once a container is opened its stored format governs the later steps.
//! - ASiC-S: when data or signatures are to be added, an already signed or
//!   timestamped container is rejected before anything is modified.
//! - PAdES: never mutated or signed; always validated, and invalid is fatal.
//! - Persistence happens only when a step changed the container.

mod command;
mod context;

pub use command::{AddFile, Command, CommandOptions, Extract, Pkcs11Options, Pkcs12Options, Step};
pub use context::{ExecutionContext, ExecutionOutcome};

use crate::container::{ContainerFormat, ContainerStore, DataFile, resolve};
use crate::error::{Error, Result};
use crate::external::{ExternalSigning, read_artifact, write_artifact};
use crate::hash::DigestAlgorithm;
use crate::report::ReportWriter;
use crate::signing::{
    EncryptionAlgorithm, SignatureBuilder, SignatureEngine, SignatureParameters, SignatureProfile,
    SigningCertificate, TokenProvider, load_certificate,
};
use std::path::Path;
use tracing::{debug, info, warn};

/// Runs commands against a signing engine, a container store and tokens
pub struct WorkflowEngine<E, S, T> {
    engine: E,
    store: S,
    tokens: T,
    digest_algorithm: DigestAlgorithm,
}

impl<E, S, T> WorkflowEngine<E, S, T>
where
    E: SignatureEngine,
    S: ContainerStore,
    T: TokenProvider,
{
    pub fn new(engine: E, store: S, tokens: T) -> Self {
        Self {
            engine,
            store,
            tokens,
            digest_algorithm: DigestAlgorithm::default(),
        }
    }

    /// Default signature digest algorithm when a command names none
    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = algorithm;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Execute `command`
    pub fn execute(&self, command: Command, options: &CommandOptions) -> Result<ExecutionOutcome> {
        let input = options
            .container
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let format = resolve(options.container_type.as_deref(), input.as_deref());
        info!("Executing {} ({} format)", command, format);

        let mut context = ExecutionContext::new(format);
        for step in command.steps() {
            debug!("Running step {:?}", step);
            context = self.run_step(*step, options, context)?;
        }

        Ok(context.into_outcome(command))
    }

    fn run_step(
        &self,
        step: Step,
        options: &CommandOptions,
        context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        match step {
            Step::OpenOrCreate => self.open_or_create(options, context),
            Step::OpenExisting => self.open_existing(options, context),
            Step::GuardAsics => guard_asics(options, context),
            Step::Mutate => mutate(options, context),
            Step::LoadCertificate => load_signer_certificate(options, context),
            Step::ComposeDigest => self.compose_digest(options, context),
            Step::LoadDigest => load_digest(options, context),
            Step::LoadPkcs11Token => self.load_pkcs11_token(options, context),
            Step::LoadPkcs12Token => self.load_pkcs12_token(options, context),
            Step::ComposeSignature => self.compose_signature(options, context),
            Step::LoadSignature => load_signature(options, context),
            Step::ApplySignature => self.apply_signature(options, context),
            Step::Sign => self.sign(options, context),
            Step::Verify => self.verify(options, context),
            Step::Persist => self.persist(options, context),
        }
    }

    fn open_or_create(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let path = container_path(options)?;

        if path.exists() || options.verify || !options.remove.is_empty() {
            return self.open_existing(options, context);
        }

        if matches!(context.format, ContainerFormat::Ddoc | ContainerFormat::Pades) {
            return Err(Error::ConfigurationError(format!(
                "Cannot create a new {} container",
                context.format
            )));
        }

        info!("Creating new {} container {}", context.format, path.display());
        context.container = Some(crate::container::Container::new(context.format));
        Ok(context)
    }

    fn open_existing(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let path = container_path(options)?;
        debug!("Opening container {}", path.display());

        let container = self.store.open_existing(path, context.format)?;
        if container.format() != context.format {
            debug!(
                "Stored format {} overrides resolved {}",
                container.format(),
                context.format
            );
        }
        context.format = container.format();
        context.container = Some(container);
        Ok(context)
    }

    /// Signature parameters from the command options
    ///
    /// An unknown profile is ignored with a warning; an unknown encryption
    /// algorithm is fatal.
    fn signature_parameters(
        &self,
        options: &CommandOptions,
        certificate: Option<SigningCertificate>,
    ) -> Result<SignatureParameters> {
        let digest_algorithm = match options.digest_algorithm.as_deref() {
            Some(name) => name.parse::<DigestAlgorithm>().unwrap_or_else(|e| {
                warn!("{}, using {}", e, self.digest_algorithm);
                self.digest_algorithm
            }),
            None => self.digest_algorithm,
        };
        let mut builder = SignatureBuilder::new().with_digest_algorithm(digest_algorithm);

        if let Some(name) = &options.profile {
            match name.parse::<SignatureProfile>() {
                Ok(profile) => builder = builder.with_profile(profile),
                Err(_) => warn!("Signature profile \"{}\" is unknown and will be ignored", name),
            }
        }

        if let Some(name) = &options.encryption {
            let algorithm = name
                .parse::<EncryptionAlgorithm>()
                .map_err(|_| Error::UnknownEncryptionAlgorithm(name.clone()))?;
            builder = builder.with_encryption_algorithm(algorithm);
        }

        if let Some(certificate) = certificate {
            builder = builder.with_signing_certificate(certificate);
        }

        Ok(builder.build())
    }

    fn sign(&self, options: &CommandOptions, mut context: ExecutionContext) -> Result<ExecutionContext> {
        let format = context.container()?.format();

        if format == ContainerFormat::Pades {
            if options.has_token() || options.timestamp {
                return Err(Error::ConfigurationError(
                    "PAdES containers cannot be signed or timestamped".to_string(),
                ));
            }
            return Ok(context);
        }

        let asics_path = format == ContainerFormat::Asics && options.adds_or_signs();
        if asics_path && options.timestamp && !options.has_token() {
            return self.timestamp(options, context);
        }

        let params = self.signature_parameters(options, None)?;

        if let Some(pkcs12) = &options.pkcs12 {
            debug!("Loading PKCS12 token {}", pkcs12.path.display());
            let token = self.tokens.pkcs12(&pkcs12.path, &pkcs12.password)?;
            let container = context.container_mut()?;
            let signature = self.engine.sign(container, token.as_ref(), &params)?;
            info!("Signed container with PKCS#12 token ({})", signature.id);
            container.add_signature(signature)?;
            context.changed = true;
        }

        if let Some(pkcs11) = &options.pkcs11 {
            debug!("Loading PKCS11 token {}", pkcs11.module.display());
            let token = self.tokens.pkcs11(
                &pkcs11.module.to_string_lossy(),
                &pkcs11.pin,
                pkcs11.slot,
            )?;
            let container = context.container_mut()?;
            let signature = self.engine.sign(container, token.as_ref(), &params)?;
            info!("Signed container with PKCS#11 token ({})", signature.id);
            container.add_signature(signature)?;
            context.changed = true;
        }

        Ok(context)
    }

    fn timestamp(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let algorithm =
            DigestAlgorithm::parse_or_default(options.timestamp_digest_algorithm.as_deref());
        info!("Digest algorithm to calculate data file hash: {}", algorithm);

        let container = context.container_mut()?;
        let Some(data_file) = container.data_files().first().cloned() else {
            warn!("Container has no data file to timestamp");
            return Ok(context);
        };

        let token = self.engine.generate_timestamp_token(algorithm, &data_file)?;
        container.set_timestamp_token(token)?;
        context.changed = true;
        Ok(context)
    }

    fn verify(&self, options: &CommandOptions, mut context: ExecutionContext) -> Result<ExecutionContext> {
        let container = context.container()?;

        if container.format() == ContainerFormat::Pades {
            let result = self.engine.validate(container)?;
            if !result.is_valid {
                return Err(Error::ValidationFailure(format!(
                    "PAdES container has errors\n{}",
                    result.report()
                )));
            }
            info!("Container is valid: {}", result.is_valid);
            context.validation = Some(result);
            return Ok(context);
        }

        if !options.verify {
            return Ok(context);
        }

        let result = self.engine.validate(container)?;
        if let Some(dir) = &options.report_dir
            && let Err(e) = ReportWriter::new(dir).write(&result)
        {
            warn!("Failed to write validation report: {}", e);
        }
        context.validation = Some(result);
        Ok(context)
    }

    fn persist(&self, options: &CommandOptions, context: ExecutionContext) -> Result<ExecutionContext> {
        if !context.changed {
            debug!("Container unchanged, not saving");
            return Ok(context);
        }
        let path = container_path(options)?;
        self.store.save(context.container()?, path)?;
        Ok(context)
    }

    fn compose_digest(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let digest_file = required(options.digest_file.as_deref(), "digest file")?;
        let params = self.signature_parameters(options, context.certificate.clone())?;

        let protocol = std::mem::take(&mut context.protocol)
            .compute_digest(&self.engine, context.container()?, &params)?
            .export_signature()?;

        write_artifact(digest_file, protocol.digest().unwrap_or_default())?;
        context.artifacts.push(digest_file.to_path_buf());
        context.protocol = protocol;
        Ok(context)
    }

    fn load_pkcs11_token(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let pkcs11 = options
            .pkcs11
            .as_ref()
            .ok_or_else(|| Error::ConfigurationError("PKCS#11 token options are required".to_string()))?;
        debug!("Loading PKCS11 token ...");
        context.token = Some(self.tokens.pkcs11(
            &pkcs11.module.to_string_lossy(),
            &pkcs11.pin,
            pkcs11.slot,
        )?);
        Ok(context)
    }

    fn load_pkcs12_token(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let pkcs12 = options
            .pkcs12
            .as_ref()
            .ok_or_else(|| Error::ConfigurationError("PKCS#12 token options are required".to_string()))?;
        debug!("Loading PKCS12 token ...");
        context.token = Some(self.tokens.pkcs12(&pkcs12.path, &pkcs12.password)?);
        Ok(context)
    }

    fn compose_signature(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let signature_file = required(options.signature_file.as_deref(), "signature file")?;
        let params = self.signature_parameters(options, None)?;
        let token = context
            .token
            .take()
            .ok_or_else(|| Error::ConfigurationError("No signature token is loaded".to_string()))?;

        let protocol = std::mem::take(&mut context.protocol)
            .sign_digest(token.as_ref(), params.digest_algorithm)?;

        write_artifact(signature_file, protocol.signature().unwrap_or_default())?;
        context.artifacts.push(signature_file.to_path_buf());
        context.protocol = protocol;
        context.token = Some(token);
        Ok(context)
    }

    fn apply_signature(
        &self,
        options: &CommandOptions,
        mut context: ExecutionContext,
    ) -> Result<ExecutionContext> {
        let certificate = context.certificate.clone().ok_or_else(|| {
            Error::ConfigurationError("A signer certificate is required".to_string())
        })?;
        let params = self.signature_parameters(options, Some(certificate))?;

        let protocol = std::mem::take(&mut context.protocol);
        let protocol = protocol.apply(&self.engine, context.container_mut()?, &params)?;
        context.changed |= protocol.changed();
        context.protocol = protocol;
        Ok(context)
    }
}

/// Reject adding or signing when an ASiC-S container is already sealed
fn guard_asics(options: &CommandOptions, context: ExecutionContext) -> Result<ExecutionContext> {
    let container = context.container()?;
    if container.format() == ContainerFormat::Asics && options.adds_or_signs() {
        container.ensure_asics_unsealed()?;
    }
    Ok(context)
}

/// Add, remove, then extract
fn mutate(options: &CommandOptions, mut context: ExecutionContext) -> Result<ExecutionContext> {
    let container = context.container_mut()?;

    if container.format() == ContainerFormat::Pades {
        if options.has_mutations() {
            warn!("PAdES containers are not modified; ignoring add, remove and extract options");
        }
        return Ok(context);
    }

    let mut changed = false;
    for add in &options.add {
        debug!("Adding data to container ...");
        container.add_data_file(DataFile::from_path(&add.path, &add.media_type)?)?;
        changed = true;
    }

    for name in &options.remove {
        container.remove_data_file(name)?;
        changed = true;
    }

    if let Some(extract) = &options.extract {
        let data_file = container
            .find_data_file(&extract.name)
            .ok_or_else(|| Error::DataFileNotFound(extract.name.clone()))?;
        info!(
            "Extracting {} to {}",
            data_file.name(),
            extract.destination.display()
        );
        data_file.save_as(&extract.destination)?;
    }

    context.changed |= changed;
    Ok(context)
}

fn load_signer_certificate(
    options: &CommandOptions,
    mut context: ExecutionContext,
) -> Result<ExecutionContext> {
    let path = required(options.certificate.as_deref(), "certificate")?;
    debug!("Loading certificate ...");
    context.certificate = Some(load_certificate(path)?);
    Ok(context)
}

fn load_digest(options: &CommandOptions, mut context: ExecutionContext) -> Result<ExecutionContext> {
    let path = required(options.digest_file.as_deref(), "digest file")?;
    debug!("Loading digest ...");
    context.protocol = ExternalSigning::resume_with_digest(read_artifact(path)?);
    Ok(context)
}

fn load_signature(options: &CommandOptions, mut context: ExecutionContext) -> Result<ExecutionContext> {
    let path = required(options.signature_file.as_deref(), "signature file")?;
    debug!("Loading signature ...");
    context.protocol = std::mem::take(&mut context.protocol).load_signature(path)?;
    Ok(context)
}

fn container_path(options: &CommandOptions) -> Result<&Path> {
    required(options.container.as_deref(), "container path")
}

fn required<'a>(value: Option<&'a Path>, what: &str) -> Result<&'a Path> {
    value.ok_or_else(|| Error::ConfigurationError(format!("A {} is required", what)))
}
