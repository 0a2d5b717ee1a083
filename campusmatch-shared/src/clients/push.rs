use std::time::Duration;

use serde::Serialize;

/// Errors raised by the push delivery provider. The status code is kept
/// so callers can tell a dead endpoint (404/410) from a transient one.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push endpoint rejected delivery with status {status}")]
    Rejected { status: u16 },

    #[error("push delivery transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl PushError {
    /// The provider reports this endpoint as permanently invalid.
    pub fn is_endpoint_gone(&self) -> bool {
        matches!(self, Self::Rejected { status: 404 | 410 })
    }
}

/// Thin client over the web-push delivery gateway. Payload encryption
/// and VAPID signing happen at the gateway; this side only posts the
/// notification body to the subscription endpoint.
#[derive(Clone)]
pub struct PushClient {
    http: reqwest::Client,
    contact: String,
}

impl PushClient {
    pub fn new(contact: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            contact: contact.to_string(),
        }
    }

    /// Deliver a payload to a single subscription endpoint.
    pub async fn deliver<T: Serialize>(
        &self,
        endpoint: &str,
        payload: &T,
    ) -> Result<(), PushError> {
        let response = self
            .http
            .post(endpoint)
            .header("TTL", "86400")
            .header("Urgency", "normal")
            .header("From", &self.contact)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PushError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_statuses_are_permanent() {
        assert!(PushError::Rejected { status: 404 }.is_endpoint_gone());
        assert!(PushError::Rejected { status: 410 }.is_endpoint_gone());
    }

    #[test]
    fn transient_statuses_are_not_permanent() {
        assert!(!PushError::Rejected { status: 429 }.is_endpoint_gone());
        assert!(!PushError::Rejected { status: 500 }.is_endpoint_gone());
        assert!(!PushError::Rejected { status: 400 }.is_endpoint_gone());
    }
}
