//! Personality Predictor - Service Entry Point
//!
//! Loads the model bundle once, then answers questionnaire submissions
//! received over NATS with predictions.

use anyhow::Result;
use futures::StreamExt;
use personality_predictor::{
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    consumer::RequestConsumer,
    logging,
    metrics::{MetricsReporter, PredictionMetrics},
    models::{BundleCache, BundleLoader, InferencePipeline},
    producer::ReplyProducer,
    service::PredictionService,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load_or_default(&config_path)?;

    logging::init(&config.logging, &["personality_predictor"])?;
    info!(config = %config_path, "Starting Personality Predictor");

    // A bundle that fails to load is a deployment error: refuse to serve.
    let loader = BundleLoader::new(config.artifacts.clone());
    let bundle = match BundleCache::global().get_or_load(|| loader.load()) {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(artifact = %e.artifact(), error = %e, "Model bundle could not be loaded");
            return Err(e.into());
        }
    };

    let metrics = Arc::new(PredictionMetrics::new());
    let service = Arc::new(PredictionService::new(
        InferencePipeline::new(bundle),
        metrics.clone(),
    )?);

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats.request_subject);
    let producer = Arc::new(ReplyProducer::new(client.clone(), &config.nats.response_subject));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        requests = %consumer.subject(),
        replies = %producer.fallback_subject(),
        "Starting request processing loop"
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        let service = service.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let reply = service.handle(&message.payload);

            if let Err(e) = producer.publish(message.reply.as_ref(), &reply).await {
                error!(
                    request_id = %reply.request_id,
                    error = %e,
                    "Failed to publish reply"
                );
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Personality Predictor shutting down...");
    metrics.print_summary();

    Ok(())
}
