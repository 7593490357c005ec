//! Pinned-CA TLS context for the store connection
//!
//! The trust store holds only the certificates found in the configured CA
//! bundle; the system roots are never consulted. When a client certificate
//! and key are configured they are presented for mutual authentication.
//!
//! The driver hands rustls the node's IP address as the server name, so the
//! certificate's names are ignored unless `verify_hostname` is set, in which
//! case they are checked against the configured endpoint instead.

use super::error::ConnectionError;
use crate::mediaflow::config::CassandraConfig;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

fn open_pem(path: &Path) -> Result<BufReader<File>, ConnectionError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| ConnectionError::CertificateLoad {
            path: path.display().to_string(),
            source,
        })
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConnectionError> {
    let mut reader = open_pem(path)?;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ConnectionError::CertificateLoad {
            path: path.display().to_string(),
            source,
        })?;

    if certs.is_empty() {
        return Err(ConnectionError::NoCertificate {
            path: path.display().to_string(),
        });
    }
    Ok(certs)
}

fn read_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConnectionError> {
    let mut reader = open_pem(path)?;
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| ConnectionError::PrivateKey {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| ConnectionError::PrivateKey {
            path: path.display().to_string(),
            reason: "no private key found".to_string(),
        })
}

/// Trust store containing only the CA bundle at `path`
pub fn load_ca_store(path: &Path) -> Result<rustls::RootCertStore, ConnectionError> {
    let mut root_store = rustls::RootCertStore::empty();
    for cert in read_certs(path)? {
        root_store
            .add(cert)
            .map_err(|e| ConnectionError::InvalidCertificate {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(root_store)
}

/// Chain and signature checks against the pinned CA, with the name check
/// redirected to the configured endpoint or skipped
#[derive(Debug)]
pub struct PinnedCaVerifier {
    inner: Arc<WebPkiServerVerifier>,
    expected_name: Option<ServerName<'static>>,
}

impl PinnedCaVerifier {
    pub fn new(
        inner: Arc<WebPkiServerVerifier>,
        expected_name: Option<ServerName<'static>>,
    ) -> Self {
        Self {
            inner,
            expected_name,
        }
    }
}

impl ServerCertVerifier for PinnedCaVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if let Some(expected) = &self.expected_name {
            return self.inner.verify_server_cert(
                end_entity,
                intermediates,
                expected,
                ocsp_response,
                now,
            );
        }

        // The name is checked last, so a name mismatch means the chain is good.
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
            )) => Ok(ServerCertVerified::assertion()),
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

pub fn build_tls_context(
    config: &CassandraConfig,
) -> Result<Arc<rustls::ClientConfig>, ConnectionError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let root_store = load_ca_store(&config.ca_cert_path)?;

    let webpki = WebPkiServerVerifier::builder_with_provider(
        Arc::new(root_store),
        Arc::clone(&provider),
    )
    .build()
    .map_err(|e| ConnectionError::InvalidCertificate {
        path: config.ca_cert_path.display().to_string(),
        reason: e.to_string(),
    })?;

    let expected_name = if config.verify_hostname {
        let name = ServerName::try_from(config.endpoint.clone()).map_err(|_| {
            ConnectionError::EndpointName {
                endpoint: config.endpoint.clone(),
            }
        })?;
        Some(name)
    } else {
        None
    };

    let verifier = Arc::new(PinnedCaVerifier::new(webpki, expected_name));
    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier);

    let client_config = match (&config.client_cert_path, &config.client_key_path) {
        (Some(cert_path), Some(key_path)) => {
            let certs = read_certs(cert_path)?;
            let key = read_private_key(key_path)?;
            log::debug!(
                "Presenting client certificate {} for mutual TLS",
                cert_path.display()
            );
            builder.with_client_auth_cert(certs, key)?
        }
        _ => builder.with_no_client_auth(),
    };

    Ok(Arc::new(client_config))
}
