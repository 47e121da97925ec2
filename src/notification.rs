use async_trait::async_trait;

use crate::domain::SubscriberEmail;
use crate::templates::EmailTemplate;

/// Anything that can deliver one of our templated emails to a single
/// recipient. The sender address belongs to the gateway.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        template: &EmailTemplate,
    ) -> Result<(), anyhow::Error>;
}
