use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use super::SubscriberEmail;
use super::SubscriptionToken;

/// A stored subscriber. There is no "removed" state; unsubscribing deletes
/// the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub token: SubscriptionToken,
    pub is_confirmed: bool,
    pub subscribed_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn is_pending(&self) -> bool { !self.is_confirmed }
}
