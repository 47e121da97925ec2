//! The subscription lifecycle: pending -> confirmed -> removed.
//!
//! All functions work on an already open `SubscriptionStore` transaction; the
//! caller decides when to commit. Nothing in here knows about HTTP.

use std::fmt::Debug;

use crate::domain::NewSubscriber;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;
use crate::notification::NotificationGateway;
use crate::store::StoreError;
use crate::store::SubscriptionStore;
use crate::templates::EmailTemplate;
use crate::templates::CONFIRMATION_SUBJECT;
use crate::utils::error_chain_fmt;

/// How many fresh tokens `register` tries before giving up on a collision
pub const MAX_TOKEN_ATTEMPTS: usize = 3;

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    InvalidEmail(String),
    #[error("This email address is already registered.")]
    DuplicateEmail,
    #[error("Could not allocate a unique subscription token")]
    DuplicateToken,
    #[error("This token is no longer valid.")]
    TokenNotFound,
    #[error("Failed to deliver email to {recipient}")]
    DeliveryFailure {
        recipient: SubscriberEmail,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl Debug for SubscriptionError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<StoreError> for SubscriptionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::DuplicateToken => Self::DuplicateToken,
            StoreError::Unexpected(e) => Self::Unexpected(e),
        }
    }
}

/// What `register` did for a given email
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// New pending subscriber, confirmation sent
    Created(Subscriber),
    /// Already pending; confirmation re-sent with the existing token
    ConfirmationResent(Subscriber),
    /// Already confirmed; nothing sent
    AlreadyConfirmed(Subscriber),
}

/// Insert a new pending subscriber. Email uniqueness is the caller's
/// business (see `register`); a token collision surfaces as `DuplicateToken`.
#[tracing::instrument(name = "Adding new subscriber", skip(store, token))]
pub async fn subscribe(
    store: &mut dyn SubscriptionStore,
    email: SubscriberEmail,
    token: SubscriptionToken,
) -> Result<Subscriber, SubscriptionError> {
    let sub = store.insert(&NewSubscriber { email, token }).await?;
    Ok(sub)
}

#[tracing::instrument(name = "Sending confirmation email", skip_all, fields(subscriber_email = %sub.email))]
async fn send_confirmation(
    gateway: &dyn NotificationGateway,
    sub: &Subscriber,
) -> Result<(), SubscriptionError> {
    let template = EmailTemplate::Confirmation {
        token: sub.token.clone(),
    };
    gateway
        .send(&sub.email, CONFIRMATION_SUBJECT, &template)
        .await
        .map_err(|source| SubscriptionError::DeliveryFailure {
            recipient: sub.email.clone(),
            source,
        })
}

/// Look the email up first, then either create a pending subscriber, re-send
/// the pending confirmation, or do nothing for an already confirmed address.
///
/// Tokens are drawn from `next_token`; on a collision a fresh one is drawn,
/// up to `MAX_TOKEN_ATTEMPTS` times.
#[tracing::instrument(name = "Registering subscriber", skip(store, gateway, next_token))]
pub async fn register<F>(
    store: &mut dyn SubscriptionStore,
    gateway: &dyn NotificationGateway,
    email: SubscriberEmail,
    mut next_token: F,
) -> Result<Registration, SubscriptionError>
where
    F: FnMut() -> SubscriptionToken,
{
    if let Some(existing) = store.find_by_email(&email).await? {
        if existing.is_confirmed {
            return Ok(Registration::AlreadyConfirmed(existing));
        }
        send_confirmation(gateway, &existing).await?;
        return Ok(Registration::ConfirmationResent(existing));
    }

    let mut attempt = 1;
    let sub = loop {
        match subscribe(store, email.clone(), next_token()).await {
            Ok(sub) => break sub,
            Err(SubscriptionError::DuplicateToken) if attempt < MAX_TOKEN_ATTEMPTS => {
                tracing::warn!(attempt, "subscription token collision, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    };

    send_confirmation(gateway, &sub).await?;
    Ok(Registration::Created(sub))
}

/// Mark the subscriber owning `token` as confirmed. Returns whether the token
/// matched anyone; confirming twice is harmless and returns `true` both times.
#[tracing::instrument(name = "Confirming subscriber", skip_all)]
pub async fn confirm(
    store: &mut dyn SubscriptionStore,
    token: &SubscriptionToken,
) -> Result<bool, SubscriptionError> {
    match store.find_by_token(token).await? {
        Some(sub) => {
            store.set_confirmed(&sub).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Delete the subscriber owning `token`. Returns whether the token matched
/// anyone, so a second call with the same token returns `false`.
#[tracing::instrument(name = "Removing subscriber", skip_all)]
pub async fn unsubscribe(
    store: &mut dyn SubscriptionStore,
    token: &SubscriptionToken,
) -> Result<bool, SubscriptionError> {
    match store.find_by_token(token).await? {
        Some(sub) => {
            store.delete(&sub).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Send the same message to every confirmed subscriber, each carrying their
/// own unsubscribe token. Sends are sequential and the first failure aborts
/// the rest. Returns the number of emails sent.
#[tracing::instrument(name = "Broadcasting newsletter", skip(store, gateway, message))]
pub async fn broadcast(
    store: &mut dyn SubscriptionStore,
    gateway: &dyn NotificationGateway,
    subject: &str,
    title: &str,
    message: &str,
) -> Result<usize, SubscriptionError> {
    let subs = store.list_confirmed().await?;
    for sub in &subs {
        let template = EmailTemplate::Broadcast {
            title: title.to_string(),
            message: message.to_string(),
            token: sub.token.clone(),
        };
        gateway
            .send(&sub.email, subject, &template)
            .await
            .map_err(|source| SubscriptionError::DeliveryFailure {
                recipient: sub.email.clone(),
                source,
            })?;
    }
    Ok(subs.len())
}
