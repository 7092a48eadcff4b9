use anyhow::Context;
use axum::async_trait;
use serde_json::json;

use crate::config::MailConfig;

/// Outbound message as the rest of the app sees it. The transport fills in
/// the sender address.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingEmail) -> anyhow::Result<()>;
}

/// Delivers through a JSON mail API (Mailpit locally, a hosted relay in
/// production). Any non-2xx answer is a failed delivery.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_token: String,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: &OutgoingEmail) -> anyhow::Result<()> {
        let payload = json!({
            "from": self.from,
            "to": mail.to,
            "subject": mail.subject,
            "text": mail.text,
        });

        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .context("mail api request")?
            .error_for_status()
            .context("mail api rejected message")?;

        Ok(())
    }
}
