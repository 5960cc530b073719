//! Fraud Scoring Engine
//!
//! Near-real-time transaction risk pipeline:
//! - Per-partition consumption of inbound payment transactions
//! - Stateful per-user rules over warm Redis context
//! - Hybrid blend with an external model's fraud probability
//! - Idempotent decision persistence and keyed decision publishing

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use decision_store::{DecisionStore, PgDecisionStore, PostgresConfig};
use kafka::{DecisionPublisher, KafkaConfig, PartitionConsumer, Producer};
use model_client::{FraudPredictor, MlConfig, ModelClient};
use scoring::{RulesConfig, ScorePolicy, Thresholds};
use state_store::{RedisConfig, RedisStateStore, UserStateStore};
use telemetry::{health, init_tracing_from_env};
use worker::{DecisionSink, SinkConfig, TransactionProcessor, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    kafka: KafkaConfig,
    #[serde(default)]
    redis: RedisConfig,
    #[serde(default)]
    postgres: PostgresConfig,
    #[serde(default)]
    rules: RulesConfig,
    #[serde(default)]
    ml: MlConfig,
    #[serde(default)]
    thresholds: Thresholds,
    #[serde(default)]
    sink: SinkConfig,
    #[serde(default)]
    worker: WorkerConfig,
}

impl Config {
    /// Invalid configuration is fatal: refuse to start.
    fn validate(&self) -> Result<()> {
        self.kafka.check().map_err(anyhow::Error::msg)?;
        self.rules.check().map_err(anyhow::Error::msg)?;
        self.ml.check().map_err(anyhow::Error::msg)?;
        self.score_policy().check().map_err(anyhow::Error::msg)?;
        Ok(())
    }

    fn score_policy(&self) -> ScorePolicy {
        ScorePolicy {
            rule_weight: self.rules.weight,
            ml_weight: self.ml.weight,
            thresholds: self.thresholds,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // rustls 0.23+ requires explicit crypto provider selection before any
    // TLS operation.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting fraud engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config.validate().context("Invalid configuration")?;

    info!(
        brokers = ?config.kafka.brokers,
        transactions_topic = %config.kafka.topics.transactions,
        decisions_topic = %config.kafka.topics.decisions,
        "Loaded configuration"
    );

    // Warm state store
    let state: Arc<dyn UserStateStore> = {
        let store = RedisStateStore::connect(&config.redis)
            .await
            .context("Failed to connect to Redis")?;
        if store.ping().await {
            health().redis.set_healthy();
        } else {
            health().redis.set_unhealthy("ping failed");
            warn!("Redis unreachable at startup; scoring degrades to stateless rules");
        }
        Arc::new(store)
    };

    // Decision store
    let pg = PgDecisionStore::connect(&config.postgres)
        .await
        .context("Failed to connect to Postgres")?;
    pg.init_schema()
        .await
        .context("Failed to initialize decision schema")?;
    if pg.ping().await {
        health().postgres.set_healthy();
    } else {
        health().postgres.set_unhealthy("ping failed");
    }
    let store: Arc<dyn DecisionStore> = Arc::new(pg);

    // Bus
    if kafka::health::check_connection(&config.kafka).await {
        health().kafka.set_healthy();
        info!("Bus connection: healthy");
    } else {
        health().kafka.set_unhealthy("connection failed");
        error!("Bus connection: unhealthy");
    }
    let publisher: Arc<dyn DecisionPublisher> = Arc::new(Producer::new(config.kafka.clone()));

    // Model client, with the feature-arity contract enforced at startup.
    let model = build_model_client(&config.ml).await?;
    let predictor: Arc<dyn FraudPredictor> = model.clone();

    // Parallelism is bounded by the inbound topic's partition count.
    let partitions =
        kafka::health::partition_ids(&config.kafka, &config.kafka.topics.transactions)
            .await
            .context("Failed to discover inbound partitions")?;
    info!(partitions = partitions.len(), "Discovered inbound partitions");

    let consumers: Vec<PartitionConsumer> = partitions
        .into_iter()
        .map(|partition| PartitionConsumer::new(config.kafka.clone(), partition))
        .collect();

    let sink = DecisionSink::new(publisher, store.clone(), config.sink.clone());
    let processor = Arc::new(TransactionProcessor::new(
        state,
        store,
        predictor,
        sink,
        config.rules.clone(),
        config.score_policy(),
    ));

    let scheduler = WorkerScheduler::new(config.worker.clone(), processor, consumers)
        .with_model(model);
    let _handles = scheduler.start();

    info!("Fraud engine running");
    shutdown_signal().await;
    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from defaults, `config/default.toml`, and
/// `FRAUD__`-prefixed environment variables.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("FRAUD")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for the nested fields the config crate's env
    // parsing does not reach reliably.
    if let Ok(brokers) = std::env::var("FRAUD_KAFKA_BROKERS") {
        config.kafka.brokers = brokers.split(',').map(|s| s.trim().to_string()).collect();
    }
    if let Ok(username) = std::env::var("FRAUD_KAFKA_SASL_USERNAME") {
        config.kafka.sasl_username = Some(username);
    }
    if let Ok(password) = std::env::var("FRAUD_KAFKA_SASL_PASSWORD") {
        config.kafka.sasl_password = Some(password);
    }
    if let Ok(url) = std::env::var("FRAUD_REDIS_URL") {
        config.redis.url = url;
    }
    if let Ok(url) = std::env::var("FRAUD_POSTGRES_URL") {
        config.postgres.url = url;
    }
    if let Ok(url) = std::env::var("FRAUD_ML_URL") {
        config.ml.url = url;
    }

    Ok(config)
}

/// Builds the model client, disabling it when the deployed artifact's
/// advertised feature list disagrees with the extractor's arity.
async fn build_model_client(ml: &MlConfig) -> Result<Arc<ModelClient>> {
    let mut ml = ml.clone();

    if ml.enabled {
        let probe = ModelClient::new(ml.clone()).context("Failed to build model client")?;
        match probe.advertised_features().await {
            Ok(features) if features.len() == scoring::features::FEATURE_COUNT => {
                info!(arity = features.len(), "Model feature contract verified");
            }
            Ok(features) => {
                error!(
                    advertised = features.len(),
                    expected = scoring::features::FEATURE_COUNT,
                    "Model feature arity mismatch; refusing to score with the model"
                );
                ml.enabled = false;
            }
            Err(e) => {
                // Metadata unavailable is a degradation, not a mismatch;
                // per-call failures already fall back to 0.0.
                warn!(error = %e, "Could not verify model feature contract");
            }
        }

        if probe.is_healthy().await {
            health().model.set_healthy();
            info!("Model service: healthy");
        } else {
            health().model.set_unhealthy("health probe failed");
            warn!("Model service: unhealthy; scoring continues on rules");
        }
    }

    Ok(Arc::new(
        ModelClient::new(ml).context("Failed to build model client")?,
    ))
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
