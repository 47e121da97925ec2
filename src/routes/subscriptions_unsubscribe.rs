use actix_web::web;
use actix_web::HttpResponse;
use actix_web_flash_messages::FlashMessage;
use serde::Deserialize;

use crate::domain::SubscriptionToken;
use crate::lifecycle;
use crate::lifecycle::SubscriptionError;
use crate::store::SubscriptionDatabase;
use crate::utils::redirect;

pub const UNSUBSCRIBED: &str = "Your email address has been successfully removed.";

#[derive(Deserialize)]
pub struct UnsubscribeParameters {
    token: String,
}

/// `GET /subscriptions/unsubscribe?token=...`
///
/// The link at the bottom of every broadcast. Deletes the subscriber; using
/// the same link again reports the token as no longer valid.
#[tracing::instrument(name = "Unsubscribing", skip(params, db))]
pub async fn unsubscribe(
    params: web::Query<UnsubscribeParameters>,
    db: web::Data<dyn SubscriptionDatabase>,
) -> Result<HttpResponse, SubscriptionError> {
    let removed = match SubscriptionToken::parse(params.0.token) {
        Ok(token) => {
            let mut store = db.begin().await?;
            let removed = lifecycle::unsubscribe(store.as_mut(), &token).await?;
            store.commit().await?;
            removed
        }
        Err(e) => {
            tracing::info!(error.message = %e, "rejected unsubscribe token");
            false
        }
    };

    match removed {
        true => FlashMessage::success(UNSUBSCRIBED).send(),
        false => FlashMessage::error(SubscriptionError::TokenNotFound.to_string()).send(),
    }
    Ok(redirect("/"))
}
