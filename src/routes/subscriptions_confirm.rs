use actix_web::web;
use actix_web::HttpResponse;
use actix_web_flash_messages::FlashMessage;
use serde::Deserialize;

use crate::domain::SubscriptionToken;
use crate::lifecycle;
use crate::lifecycle::SubscriptionError;
use crate::store::SubscriptionDatabase;
use crate::utils::redirect;

pub const CONFIRMED: &str = "Your email address has been successfully confirmed.";

#[derive(Deserialize)]
pub struct Parameters {
    token: String,
}

/// `GET /subscriptions/confirm?token=...`
///
/// Failure to parse the query (no `token`) automatically returns 400. A token
/// that is malformed or matches nobody is reported as no longer valid.
#[tracing::instrument(name = "Confirming subscription", skip(params, db))]
pub async fn confirm(
    params: web::Query<Parameters>,
    db: web::Data<dyn SubscriptionDatabase>,
) -> Result<HttpResponse, SubscriptionError> {
    let confirmed = match SubscriptionToken::parse(params.0.token) {
        Ok(token) => {
            let mut store = db.begin().await?;
            let confirmed = lifecycle::confirm(store.as_mut(), &token).await?;
            store.commit().await?;
            confirmed
        }
        Err(e) => {
            tracing::info!(error.message = %e, "rejected confirmation token");
            false
        }
    };

    match confirmed {
        true => FlashMessage::success(CONFIRMED).send(),
        false => FlashMessage::error(SubscriptionError::TokenNotFound.to_string()).send(),
    }
    Ok(redirect("/"))
}
