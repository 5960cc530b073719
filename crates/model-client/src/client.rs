//! Prediction service client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use telemetry::metrics;
use tracing::{debug, warn};

use fraud_core::{Error, Result};

use crate::config::MlConfig;

/// Source of a fraud probability for a feature vector.
///
/// Implementations never error outward: the pipeline treats any failure as
/// the model abstaining (probability 0.0).
#[async_trait]
pub trait FraudPredictor: Send + Sync {
    /// Fraud probability in [0, 1] for the given feature vector.
    async fn predict(&self, features: &[f64]) -> f64;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    features: &'a [f64],
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    fraud_probability: f64,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct FeaturesResponse {
    features: Vec<String>,
    #[serde(default)]
    model_version: Option<String>,
}

/// HTTP client for the prediction service.
pub struct ModelClient {
    config: MlConfig,
    http: reqwest::Client,
}

impl ModelClient {
    /// Builds the client with the per-call deadline baked into reqwest.
    pub fn new(config: MlConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::model(format!("failed to build http client: {e}")))?;

        Ok(Self { config, http })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn weight(&self) -> f64 {
        self.config.weight
    }

    /// Probes the health endpoint; healthy iff the status token is `UP`.
    /// A disabled model reports unhealthy, matching its scoring behavior.
    pub async fn is_healthy(&self) -> bool {
        if !self.config.enabled {
            return false;
        }

        let url = format!("{}/health", self.config.url);
        match self.http.get(&url).send().await {
            Ok(resp) => match resp.json::<HealthResponse>().await {
                Ok(health) => health.status == "UP",
                Err(e) => {
                    debug!(error = %e, "model health response unparseable");
                    false
                }
            },
            Err(e) => {
                debug!(error = %e, "model health check failed");
                false
            }
        }
    }

    /// Fetches the feature names the deployed model artifact expects.
    ///
    /// The vector's slot order is a versioned contract; the binary refuses
    /// to score when the advertised arity disagrees with the extractor's.
    pub async fn advertised_features(&self) -> Result<Vec<String>> {
        let url = format!("{}/features", self.config.url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::model(format!("features request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::model(format!(
                "features endpoint returned {}",
                resp.status()
            )));
        }

        let features: FeaturesResponse = resp
            .json()
            .await
            .map_err(|e| Error::model(format!("invalid features response: {e}")))?;

        if let Some(version) = &features.model_version {
            debug!(model_version = %version, arity = features.features.len(), "model metadata");
        }
        Ok(features.features)
    }
}

#[async_trait]
impl FraudPredictor for ModelClient {
    async fn predict(&self, features: &[f64]) -> f64 {
        if !self.config.enabled {
            return 0.0;
        }

        metrics().model_calls.inc();
        let url = format!("{}/predict", self.config.url);
        let started = std::time::Instant::now();

        let response = self
            .http
            .post(&url)
            .json(&PredictRequest { features })
            .send()
            .await;

        metrics()
            .model_latency_ms
            .observe(started.elapsed().as_millis() as u64);

        let probability = match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<PredictResponse>().await {
                Ok(body) => body.fraud_probability,
                Err(e) => {
                    warn!(error = %e, "model response unparseable, scoring without it");
                    metrics().model_failures.inc();
                    return 0.0;
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "model returned non-2xx, scoring without it");
                metrics().model_failures.inc();
                return 0.0;
            }
            Err(e) => {
                warn!(error = %e, "model call failed, scoring without it");
                metrics().model_failures.inc();
                return 0.0;
            }
        };

        if !probability.is_finite() {
            warn!(probability, "model returned non-finite probability");
            metrics().model_failures.inc();
            return 0.0;
        }
        probability.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_model_abstains() {
        let client = ModelClient::new(MlConfig {
            enabled: false,
            ..MlConfig::default()
        })
        .unwrap();
        assert_eq!(client.predict(&[0.0; 18]).await, 0.0);
        assert!(!client.is_healthy().await);
    }

    #[tokio::test]
    async fn unreachable_model_abstains() {
        // Nothing listens on this port; the call must degrade, not error.
        let client = ModelClient::new(MlConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 50,
            ..MlConfig::default()
        })
        .unwrap();
        assert_eq!(client.predict(&[0.0; 18]).await, 0.0);
        assert!(!client.is_healthy().await);
        assert!(client.advertised_features().await.is_err());
    }
}
