//! TLS configuration with an optional pinned CA root certificate.
//!
//! When no CA file is configured the connector bundled with
//! `tokio-tungstenite` (webpki roots) is used instead.

use std::path::Path;
use std::sync::Arc;

use rustls::ClientConfig;
use tracing::info;

use crate::FeedError;
use crate::Result;

/// Builds a [`ClientConfig`] whose root store contains only the
/// certificates found in the PEM file at `ca_file`.
///
/// Returns `Ok(None)` when `ca_file` is `None`.
///
/// # Errors
///
/// Returns [`FeedError::Tls`] if the file cannot be read, contains no
/// certificates, or cannot be parsed.
pub fn build_tls_config(ca_file: Option<&Path>) -> Result<Option<Arc<ClientConfig>>> {
    let Some(path) = ca_file else {
        return Ok(None);
    };

    let pem = std::fs::read(path)
        .map_err(|e| FeedError::Tls(format!("failed to read {}: {e}", path.display())))?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| FeedError::Tls(format!("failed to parse CA PEM: {e}")))?;

    if certs.is_empty() {
        return Err(FeedError::Tls(format!(
            "{} contains no certificates",
            path.display()
        )));
    }

    let mut root_store = rustls::RootCertStore::empty();
    let (added, ignored) = root_store.add_parsable_certificates(certs);
    info!(added, ignored, path = %path.display(), "Pinned TLS roots");

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Some(Arc::new(config)))
}
