//! Test Request Generator
//!
//! Sends random questionnaire submissions to the prediction service and
//! logs the replies.

use personality_predictor::{
    features::{
        FeatureKind, FeatureSpec, DRAINED_AFTER_SOCIALIZING, FRIENDS_CIRCLE_SIZE, GOING_OUTSIDE,
        POST_FREQUENCY, SOCIAL_EVENT_ATTENDANCE, TIME_SPENT_ALONE,
    },
    types::{
        AnswerValue, BinaryChoice, InputRecord, Personality, PredictionReply, PredictionRequest,
        ReplyStatus,
    },
};
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::{info, warn};

/// Answer generator for testing
struct AnswerGenerator {
    rng: rand::rngs::ThreadRng,
    features: FeatureSpec,
    request_counter: u64,
}

impl AnswerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            features: FeatureSpec::personality(),
            request_counter: 0,
        }
    }

    /// Answers typical of an introvert
    fn generate_introvert(&mut self) -> PredictionRequest {
        self.generate(0.8, |feature| match feature {
            TIME_SPENT_ALONE => 6..=11,
            SOCIAL_EVENT_ATTENDANCE => 0..=3,
            GOING_OUTSIDE => 0..=3,
            FRIENDS_CIRCLE_SIZE => 0..=5,
            POST_FREQUENCY => 0..=3,
            _ => 0..=10,
        })
    }

    /// Answers typical of an extrovert
    fn generate_extrovert(&mut self) -> PredictionRequest {
        self.generate(0.15, |feature| match feature {
            TIME_SPENT_ALONE => 0..=4,
            SOCIAL_EVENT_ATTENDANCE => 4..=10,
            GOING_OUTSIDE => 3..=7,
            FRIENDS_CIRCLE_SIZE => 6..=15,
            POST_FREQUENCY => 3..=10,
            _ => 0..=10,
        })
    }

    fn generate(
        &mut self,
        yes_rate: f64,
        count_range: impl Fn(&str) -> RangeInclusive<i64>,
    ) -> PredictionRequest {
        self.request_counter += 1;

        let mut answers = InputRecord::new();
        for (name, kind) in self.features.iter() {
            let answer: AnswerValue = match kind {
                FeatureKind::Binary => {
                    let rate = if name == DRAINED_AFTER_SOCIALIZING {
                        yes_rate
                    } else {
                        yes_rate * 0.8
                    };
                    if self.rng.gen_bool(rate) {
                        BinaryChoice::Yes.into()
                    } else {
                        BinaryChoice::No.into()
                    }
                }
                FeatureKind::Count => self.rng.gen_range(count_range(name)).into(),
            };
            answers.insert(name, answer);
        }

        PredictionRequest {
            request_id: format!("req_{:08}", self.request_counter),
            answers,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_requester=info".parse()?),
        )
        .init();

    info!("Starting Test Request Generator");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("personality.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let extrovert_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.5);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        extrovert_rate = extrovert_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, extrovert_rate, delay_ms).await;
        }
    };

    let mut generator = AnswerGenerator::new();
    let mut rng = rand::thread_rng();

    let mut agreed = 0u64;
    let mut rejected = 0u64;

    for i in 0..count {
        let expect_extrovert = rng.gen_bool(extrovert_rate);
        let request = if expect_extrovert {
            generator.generate_extrovert()
        } else {
            generator.generate_introvert()
        };

        let payload = serde_json::to_vec(&request)?;
        let message = match client.request(subject.to_string(), payload.into()).await {
            Ok(message) => message,
            Err(e) => {
                warn!(request_id = %request.request_id, error = %e, "Request failed");
                continue;
            }
        };

        let reply: PredictionReply = match serde_json::from_slice(&message.payload) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(request_id = %request.request_id, error = %e, "Unreadable reply");
                continue;
            }
        };

        match &reply.status {
            ReplyStatus::Ok { prediction, .. } => {
                let extrovert = prediction.label == Personality::Extrovert;
                if extrovert == expect_extrovert {
                    agreed += 1;
                }
                info!(
                    request_id = %reply.request_id,
                    label = %prediction.label,
                    confidence = prediction.confidence_score,
                    introvert = prediction.class_probabilities.introvert,
                    extrovert = prediction.class_probabilities.extrovert,
                    "Prediction received"
                );
            }
            ReplyStatus::Rejected { kind, error } => {
                rejected += 1;
                warn!(request_id = %reply.request_id, kind = %kind, error = %error, "Request rejected");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} matched the generated profile, {} rejected)",
                i + 1,
                count,
                agreed,
                rejected
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} matched the generated profile, {} rejected)",
        count, agreed, rejected
    );

    Ok(())
}

async fn run_dry_mode(count: u64, extrovert_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = AnswerGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = if rng.gen_bool(extrovert_rate) {
            generator.generate_extrovert()
        } else {
            generator.generate_introvert()
        };

        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
