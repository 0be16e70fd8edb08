use std::time::Duration;

use crate::config::TlsConfig;

#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    #[error("Failed to read TLS file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TLS material or client settings: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Build an HTTP client for one upstream with optional TLS settings.
///
/// `timeout_seconds` bounds connecting and each body read, not the whole
/// response; a long generation is capped by the relay's total deadline.
pub fn build_http_client(
    timeout_seconds: u64,
    tls: Option<&TlsConfig>,
) -> Result<reqwest::Client, ClientBuildError> {
    let mut client_builder = reqwest::Client::builder()
        .read_timeout(Duration::from_secs(timeout_seconds))
        .connect_timeout(Duration::from_secs(timeout_seconds.min(30)))
        .pool_max_idle_per_host(10);

    if let Some(tls) = tls {
        if tls.accept_invalid_certs {
            client_builder = client_builder.danger_accept_invalid_certs(true);
            tracing::warn!("TLS: Accepting invalid certificates (use only for development/testing)");
        }

        if let Some(ref ca_path) = tls.ca_cert_path {
            let ca_cert = std::fs::read(ca_path)?;
            let ca_cert = reqwest::Certificate::from_pem(&ca_cert)?;
            client_builder = client_builder.add_root_certificate(ca_cert);
            tracing::info!("TLS: Loaded custom CA certificate from {}", ca_path);
        }

        if let (Some(cert_path), Some(key_path)) = (&tls.client_cert_path, &tls.client_key_path) {
            let cert_pem = std::fs::read(cert_path)?;
            let key_pem = std::fs::read(key_path)?;
            let identity = reqwest::Identity::from_pem(&[cert_pem, key_pem].concat())?;
            client_builder = client_builder.identity(identity);
            tracing::info!("TLS: Loaded client certificate from {} for mTLS", cert_path);
        }
    }

    Ok(client_builder.build()?)
}
