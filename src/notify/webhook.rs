use serde::Serialize;

use super::Notifier;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("webhook rejected notification. status: {code}, body: {body}")]
    Rejected {
        code: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Serialize)]
struct Payload<'a> {
    topic: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// POSTs `{topic, subject, message}` as JSON.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Notifier for WebhookNotifier {
    type Error = Error;

    async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<(), Self::Error> {
        let response = self
            .client
            .post(&self.url)
            .json(&Payload {
                topic,
                subject,
                message,
            })
            .send()
            .await
            .map_err(Error::Transport)?;
        let code = response.status();
        if !code.is_success() {
            let body = response.text().await.map_err(Error::Transport)?;
            return Err(Error::Rejected { code, body });
        }
        Ok(())
    }
}
