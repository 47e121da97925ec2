use super::SubscriberEmail;
use super::SubscriptionToken;

/// A subscriber that has not been stored yet. Always starts out pending.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub token: SubscriptionToken,
}
