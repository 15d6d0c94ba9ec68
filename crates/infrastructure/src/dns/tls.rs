//! rustls configuration for outbound DoT and inbound TLS listeners.

use dohgate_domain::DomainError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::DigitallySignedStruct;
use std::path::Path;
use std::sync::{Arc, LazyLock};

static PROVIDER: LazyLock<Arc<CryptoProvider>> =
    LazyLock::new(|| Arc::new(rustls::crypto::ring::default_provider()));

/// Shared verifying client config, built once.
static VERIFYING_CLIENT_CONFIG: LazyLock<Result<Arc<rustls::ClientConfig>, String>> =
    LazyLock::new(|| {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        rustls::ClientConfig::builder_with_provider(PROVIDER.clone())
            .with_safe_default_protocol_versions()
            .map(|builder| {
                Arc::new(
                    builder
                        .with_root_certificates(root_store)
                        .with_no_client_auth(),
                )
            })
            .map_err(|e| e.to_string())
    });

/// Client config verifying against the webpki roots, or accepting any
/// certificate when `insecure` is set.
pub fn client_config(insecure: bool) -> Result<Arc<rustls::ClientConfig>, DomainError> {
    if !insecure {
        return VERIFYING_CLIENT_CONFIG
            .clone()
            .map_err(|e| DomainError::ConfigError(format!("TLS client config: {}", e)));
    }

    let config = rustls::ClientConfig::builder_with_provider(PROVIDER.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| DomainError::ConfigError(format!("TLS client config: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(SkipServerVerification(PROVIDER.clone())))
        .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Accepts any server certificate while still checking handshake signatures.
#[derive(Debug)]
struct SkipServerVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Certificate chain and key for a TLS listener, loaded from PEM files.
pub struct ServerTlsConfig {
    pub certs: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
}

impl ServerTlsConfig {
    pub fn from_files(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let certs = Self::load_certs(cert_path.as_ref())?;
        let key = Self::load_key(key_path.as_ref())?;
        Ok(Self { certs, key })
    }

    fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, DomainError> {
        let pem = std::fs::read(path).map_err(|e| {
            DomainError::ConfigError(format!("Failed to read certificate {}: {}", path.display(), e))
        })?;

        let certs = rustls_pemfile::certs(&mut &pem[..])
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                DomainError::ConfigError(format!("Failed to parse certificate {}: {}", path.display(), e))
            })?;

        if certs.is_empty() {
            return Err(DomainError::ConfigError(format!(
                "No certificates found in {}",
                path.display()
            )));
        }
        Ok(certs)
    }

    fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, DomainError> {
        let pem = std::fs::read(path).map_err(|e| {
            DomainError::ConfigError(format!("Failed to read key {}: {}", path.display(), e))
        })?;

        rustls_pemfile::private_key(&mut &pem[..])
            .map_err(|e| DomainError::ConfigError(format!("Failed to parse key {}: {}", path.display(), e)))?
            .ok_or_else(|| DomainError::ConfigError(format!("No private key found in {}", path.display())))
    }

    /// Server config advertising `alpn` protocols (e.g. `h2`, `http/1.1` for DoH, `dot` for DoT).
    pub fn build_server_config(self, alpn: &[&[u8]]) -> Result<Arc<rustls::ServerConfig>, DomainError> {
        let mut config = rustls::ServerConfig::builder_with_provider(PROVIDER.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| DomainError::ConfigError(format!("TLS server config: {}", e)))?
            .with_no_client_auth()
            .with_single_cert(self.certs, self.key)
            .map_err(|e| DomainError::ConfigError(format!("TLS server config: {}", e)))?;
        config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
        Ok(Arc::new(config))
    }
}
