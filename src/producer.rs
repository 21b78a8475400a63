//! NATS publisher for prediction replies

use crate::types::request::PredictionReply;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// The requester's inbox when present, otherwise `fallback`.
pub fn reply_subject(reply_to: Option<&Subject>, fallback: &str) -> String {
    match reply_to {
        Some(inbox) => inbox.to_string(),
        None => fallback.to_string(),
    }
}

/// Publishes replies to the requester's inbox, or to a fixed subject when
/// the request carried no reply address
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
    fallback_subject: String,
}

impl ReplyProducer {
    pub fn new(client: Client, fallback_subject: &str) -> Self {
        Self {
            client,
            fallback_subject: fallback_subject.to_string(),
        }
    }

    /// Subject a reply goes to
    pub fn target(&self, reply_to: Option<&Subject>) -> String {
        reply_subject(reply_to, &self.fallback_subject)
    }

    /// Publish a reply
    pub async fn publish(&self, reply_to: Option<&Subject>, reply: &PredictionReply) -> Result<()> {
        let payload = serde_json::to_vec(reply)?;
        let subject = self.target(reply_to);

        self.client.publish(subject.clone(), payload.into()).await?;

        debug!(
            request_id = %reply.request_id,
            subject = %subject,
            ok = reply.is_ok(),
            "Published prediction reply"
        );

        Ok(())
    }

    /// Get the fallback subject name
    pub fn fallback_subject(&self) -> &str {
        &self.fallback_subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_goes_to_inbox() {
        let inbox = Subject::from("_INBOX.abc123");
        assert_eq!(
            reply_subject(Some(&inbox), "personality.results"),
            "_INBOX.abc123"
        );
    }

    #[test]
    fn test_reply_without_inbox_uses_fallback() {
        assert_eq!(reply_subject(None, "personality.results"), "personality.results");
    }
}
