use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Serialize;

use crate::domain::SubscriberEmail;
use crate::notification::NotificationGateway;
use crate::templates::EmailTemplate;
use crate::templates::TemplateRenderer;

/// HTTP client for a Postmark-style email API (`POST {base_url}/email`).
///
/// Establishing a HTTP connection is expensive, so a single `Client` is kept
/// for the lifetime of the app and shared between workers.
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    authorization_token: Secret<String>,
    renderer: TemplateRenderer,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        authorization_token: Secret<String>,
        timeout: Duration,
        renderer: TemplateRenderer,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url,
            sender,
            authorization_token,
            renderer,
        }
    }

    pub fn sender(&self) -> &SubscriberEmail { &self.sender }

    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> Result<(), reqwest::Error> {
        let url = format!("{}/email", self.base_url);
        let body = SendEmailRequest {
            from: self.sender.as_ref(),
            to: recipient.as_ref(),
            subject,
            html_body: html_content,
            text_body: text_content,
        };
        self.http_client
            .post(&url)
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for EmailClient {
    #[tracing::instrument(name = "Sending templated email", skip(self, template))]
    async fn send(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        template: &EmailTemplate,
    ) -> Result<(), anyhow::Error> {
        let rendered = self
            .renderer
            .render(template)
            .context("Failed to render email template")?;
        self.send_email(recipient, subject, &rendered.html, &rendered.text)
            .await
            .with_context(|| format!("Failed to send email to {recipient}"))?;
        Ok(())
    }
}
