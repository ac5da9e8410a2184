// src/dataloader.rs

//! Network data loader
//!
//! Trust lists and other validation material are fetched over HTTP. The
//! loader is configured through the [`DataLoaderSettings`] seam; the two
//! decorators copy the `[ssl]` and `[proxy]` configuration sections onto it,
//! touching only the settings that are actually configured.

use crate::config::Configuration;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::tls::Version;
use std::fs;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Proxy endpoint for one URL scheme
///
/// Unset fields stay empty: no host, port 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyProperties {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Proxy endpoints per URL scheme
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    pub http: ProxyProperties,
    pub https: ProxyProperties,
}

/// Mutable connection settings of a data loader
pub trait DataLoaderSettings {
    fn set_ssl_keystore_path(&mut self, path: &str);
    fn set_ssl_keystore_type(&mut self, keystore_type: &str);
    fn set_ssl_keystore_password(&mut self, password: &str);
    fn set_ssl_truststore_path(&mut self, path: &str);
    fn set_ssl_truststore_type(&mut self, truststore_type: &str);
    fn set_ssl_truststore_password(&mut self, password: &str);
    fn set_supported_ssl_protocols(&mut self, protocols: &[String]);
    fn set_supported_ssl_cipher_suites(&mut self, cipher_suites: &[String]);
    fn set_proxy_config(&mut self, proxy_config: ProxyConfig);
}

/// Fetches remote documents
pub trait DataLoader {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Apply the configured SSL settings; no-op unless `[ssl] enabled`
pub fn decorate_with_ssl_settings<L>(loader: &mut L, config: &Configuration)
where
    L: DataLoaderSettings + ?Sized,
{
    let ssl = &config.ssl;
    if !ssl.enabled {
        return;
    }

    if let Some(path) = &ssl.keystore_path {
        loader.set_ssl_keystore_path(path);
    }
    if let Some(keystore_type) = &ssl.keystore_type {
        loader.set_ssl_keystore_type(keystore_type);
    }
    if let Some(password) = &ssl.keystore_password {
        loader.set_ssl_keystore_password(password);
    }
    if let Some(path) = &ssl.truststore_path {
        loader.set_ssl_truststore_path(path);
    }
    if let Some(truststore_type) = &ssl.truststore_type {
        loader.set_ssl_truststore_type(truststore_type);
    }
    if let Some(password) = &ssl.truststore_password {
        loader.set_ssl_truststore_password(password);
    }
    if let Some(protocols) = &ssl.protocols {
        loader.set_supported_ssl_protocols(protocols);
    }
    if let Some(cipher_suites) = &ssl.cipher_suites {
        loader.set_supported_ssl_cipher_suites(cipher_suites);
    }
}

/// Apply the configured proxy settings; no-op unless `[proxy] enabled`
///
/// When enabled a proxy configuration is always set, even if every field
/// is empty.
pub fn decorate_with_proxy_settings<L>(loader: &mut L, config: &Configuration)
where
    L: DataLoaderSettings + ?Sized,
{
    let proxy = &config.proxy;
    if !proxy.enabled {
        return;
    }

    let mut http = ProxyProperties::default();
    let mut https = ProxyProperties::default();

    if let Some(host) = &proxy.http_host {
        http.host = Some(host.clone());
    }
    if let Some(port) = proxy.http_port {
        http.port = port;
    }
    if let Some(host) = &proxy.https_host {
        https.host = Some(host.clone());
    }
    if let Some(port) = proxy.https_port {
        https.port = port;
    }
    if let Some(user) = &proxy.user {
        http.user = Some(user.clone());
        https.user = Some(user.clone());
    }
    if let Some(password) = &proxy.password {
        http.password = Some(password.clone());
        https.password = Some(password.clone());
    }

    loader.set_proxy_config(ProxyConfig { http, https });
}

/// Blocking HTTP data loader with retry support
#[derive(Debug, Clone)]
pub struct HttpDataLoader {
    timeout: Duration,
    max_retries: u32,
    keystore_path: Option<String>,
    keystore_type: Option<String>,
    keystore_password: Option<String>,
    truststore_path: Option<String>,
    truststore_type: Option<String>,
    truststore_password: Option<String>,
    protocols: Option<Vec<String>>,
    cipher_suites: Option<Vec<String>>,
    proxy_config: Option<ProxyConfig>,
}

impl HttpDataLoader {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries: max_retries.max(1),
            keystore_path: None,
            keystore_type: None,
            keystore_password: None,
            truststore_path: None,
            truststore_type: None,
            truststore_password: None,
            protocols: None,
            cipher_suites: None,
            proxy_config: None,
        }
    }

    /// Create a loader decorated with the configured SSL and proxy settings
    pub fn from_configuration(config: &Configuration) -> Self {
        let mut loader = Self::new(config.network.timeout(), config.network.max_retries);
        decorate_with_ssl_settings(&mut loader, config);
        decorate_with_proxy_settings(&mut loader, config);
        loader
    }

    pub fn proxy_config(&self) -> Option<&ProxyConfig> {
        self.proxy_config.as_ref()
    }

    /// Build an HTTP client from the current settings
    pub fn client(&self) -> Result<Client> {
        let mut builder = Client::builder().timeout(self.timeout).use_rustls_tls();

        if let Some(path) = &self.truststore_path {
            require_pem("truststore", self.truststore_type.as_deref())?;
            if self.truststore_password.is_some() {
                debug!("Ignoring truststore password for PEM truststore");
            }
            let pem = read_store(path)?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                Error::ConfigurationError(format!("Invalid truststore {}: {}", path, e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(path) = &self.keystore_path {
            require_pem("keystore", self.keystore_type.as_deref())?;
            if self.keystore_password.is_some() {
                debug!("Ignoring keystore password for PEM keystore");
            }
            let pem = read_store(path)?;
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
                Error::ConfigurationError(format!("Invalid keystore {}: {}", path, e))
            })?;
            builder = builder.identity(identity);
        }

        if let Some(protocols) = &self.protocols {
            let versions: Vec<Version> = protocols
                .iter()
                .filter_map(|name| {
                    let version = tls_version(name);
                    if version.is_none() {
                        warn!("Unsupported SSL protocol {} ignored", name);
                    }
                    version
                })
                .collect();
            if versions.is_empty() {
                return Err(Error::ConfigurationError(
                    "None of the configured SSL protocols is supported".to_string(),
                ));
            }
            if versions.contains(&Version::TLS_1_2) {
                builder = builder.min_tls_version(Version::TLS_1_2);
            } else {
                builder = builder.min_tls_version(Version::TLS_1_3);
            }
            if versions.contains(&Version::TLS_1_3) {
                builder = builder.max_tls_version(Version::TLS_1_3);
            } else {
                builder = builder.max_tls_version(Version::TLS_1_2);
            }
        }

        if let Some(cipher_suites) = &self.cipher_suites {
            warn!(
                "Cipher suite restriction ({}) is not enforced by the HTTP client",
                cipher_suites.join(", ")
            );
        }

        if let Some(proxy_config) = &self.proxy_config {
            if let Some(proxy) = proxy_for(&proxy_config.http, 80, reqwest::Proxy::http)? {
                builder = builder.proxy(proxy);
            }
            if let Some(proxy) = proxy_for(&proxy_config.https, 443, reqwest::Proxy::https)? {
                builder = builder.proxy(proxy);
            }
        }

        builder
            .build()
            .map_err(|e| Error::ConfigurationError(format!("Failed to create HTTP client: {e}")))
    }
}

impl DataLoader for HttpDataLoader {
    /// Fetch `url` with retry on transport errors
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let client = self.client()?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match client.get(url).send() {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(Error::DownloadError(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }
                    let bytes = response.bytes().map_err(|e| {
                        Error::DownloadError(format!("Failed to read response: {}", e))
                    })?;
                    info!("Fetched {} bytes from {}", bytes.len(), url);
                    return Ok(bytes.to_vec());
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to fetch {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Fetch attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

impl DataLoaderSettings for HttpDataLoader {
    fn set_ssl_keystore_path(&mut self, path: &str) {
        self.keystore_path = Some(path.to_string());
    }

    fn set_ssl_keystore_type(&mut self, keystore_type: &str) {
        self.keystore_type = Some(keystore_type.to_string());
    }

    fn set_ssl_keystore_password(&mut self, password: &str) {
        self.keystore_password = Some(password.to_string());
    }

    fn set_ssl_truststore_path(&mut self, path: &str) {
        self.truststore_path = Some(path.to_string());
    }

    fn set_ssl_truststore_type(&mut self, truststore_type: &str) {
        self.truststore_type = Some(truststore_type.to_string());
    }

    fn set_ssl_truststore_password(&mut self, password: &str) {
        self.truststore_password = Some(password.to_string());
    }

    fn set_supported_ssl_protocols(&mut self, protocols: &[String]) {
        self.protocols = Some(protocols.to_vec());
    }

    fn set_supported_ssl_cipher_suites(&mut self, cipher_suites: &[String]) {
        self.cipher_suites = Some(cipher_suites.to_vec());
    }

    fn set_proxy_config(&mut self, proxy_config: ProxyConfig) {
        self.proxy_config = Some(proxy_config);
    }
}

fn require_pem(store: &str, store_type: Option<&str>) -> Result<()> {
    match store_type {
        None => Ok(()),
        Some(t) if t.eq_ignore_ascii_case("PEM") => Ok(()),
        Some(t) => Err(Error::ConfigurationError(format!(
            "Unsupported {} type {}; only PEM is supported",
            store, t
        ))),
    }
}

fn read_store(path: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::ConfigurationError(format!("Failed to read {}: {}", path, e)))
}

fn tls_version(name: &str) -> Option<Version> {
    match name {
        "TLSv1.2" => Some(Version::TLS_1_2),
        "TLSv1.3" => Some(Version::TLS_1_3),
        _ => None,
    }
}

fn proxy_for(
    properties: &ProxyProperties,
    default_port: u16,
    make: fn(String) -> reqwest::Result<reqwest::Proxy>,
) -> Result<Option<reqwest::Proxy>> {
    let Some(host) = &properties.host else {
        return Ok(None);
    };
    let port = if properties.port == 0 {
        default_port
    } else {
        properties.port
    };

    let mut proxy = make(format!("http://{}:{}", host, port))
        .map_err(|e| Error::ConfigurationError(format!("Invalid proxy {}: {}", host, e)))?;
    if let Some(user) = &properties.user {
        proxy = proxy.basic_auth(user, properties.password.as_deref().unwrap_or_default());
    }
    Ok(Some(proxy))
}
