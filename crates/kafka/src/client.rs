//! Shared rskafka client construction.

use rskafka::client::{Client, ClientBuilder, Credentials, SaslConfig};
use std::sync::Arc;

use fraud_core::{Error, Result};

use crate::config::KafkaConfig;

/// Creates a TLS configuration trusting the webpki root set, for
/// SASL-authenticated cloud brokers.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Builds an rskafka client from the bus configuration, with TLS and
/// SCRAM-SHA-256 when credentials are present.
pub async fn build_client(config: &KafkaConfig) -> Result<Client> {
    let connection = config.broker_string();
    let mut builder = ClientBuilder::new(vec![connection]);

    if let (Some(username), Some(password)) = (&config.sasl_username, &config.sasl_password) {
        builder = builder
            .tls_config(create_tls_config())
            .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                username.clone(),
                password.clone(),
            )));
    }

    builder
        .build()
        .await
        .map_err(|e| Error::kafka(format!("failed to connect to brokers: {e}")))
}
