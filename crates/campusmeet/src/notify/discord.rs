/// Discord webhook client
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::NotifyError;

/// Discord blurple.
pub const EMBED_COLOR: u32 = 0x5865F2;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
}

/// Body of a webhook execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embeds: Vec<Embed>,
}

impl DiscordPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(title: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            content: None,
            embeds: vec![Embed {
                title: title.into(),
                description: description.unwrap_or_default().to_string(),
                color: EMBED_COLOR,
            }],
        }
    }
}

#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
}

impl DiscordClient {
    pub fn new() -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Posts `payload` to a single webhook.
    pub async fn send(&self, url: &str, payload: &DiscordPayload) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        debug!("Delivered webhook to {}", url);
        Ok(())
    }

    /// Posts `payload` to every URL concurrently.
    ///
    /// # Returns
    /// How many deliveries succeeded. Failures are logged and otherwise ignored.
    pub async fn broadcast(&self, urls: &[String], payload: &DiscordPayload) -> usize {
        let results = join_all(urls.iter().map(|url| self.send(url, payload))).await;

        let mut delivered = 0;
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to send Discord webhook to {}: {}", url, e),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_payload_shapes() {
        let text = serde_json::to_value(DiscordPayload::text("hello")).unwrap();
        assert_eq!(text, json!({"content": "hello"}));

        let embed = serde_json::to_value(DiscordPayload::embed("New event: Lunch", None)).unwrap();
        assert_eq!(
            embed,
            json!({"embeds": [{"title": "New event: Lunch", "description": "", "color": 0x5865F2}]})
        );
    }

    #[tokio::test]
    async fn test_broadcast_counts_successes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ok"))
            .and(body_json(json!({"content": "Ann joined the room"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = DiscordClient::new().unwrap();
        let urls = vec![format!("{}/ok", server.uri()), format!("{}/broken", server.uri())];
        let delivered = client
            .broadcast(&urls, &DiscordPayload::text("Ann joined the room"))
            .await;

        assert_eq!(delivered, 1);
    }
}
