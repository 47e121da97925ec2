use actix_web::http::header::REFERER;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web_flash_messages::FlashMessage;
use serde::Deserialize;

use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;
use crate::lifecycle;
use crate::lifecycle::Registration;
use crate::lifecycle::SubscriptionError;
use crate::notification::NotificationGateway;
use crate::store::SubscriptionDatabase;
use crate::utils::redirect;

pub const SUBSCRIBED: &str = "Thank you for signing up! Check your email for confirmation.";
pub const ALREADY_PENDING: &str =
    "This email address is already registered! Check your email for confirmation.";
pub const ALREADY_CONFIRMED: &str = "This email address is already registered.";
pub const INVALID_EMAIL: &str = "Please provide a valid email address.";
pub const SERVICE_UNAVAILABLE: &str =
    "The service is temporarily unavailable. Please try again later.";

#[derive(Deserialize)]
pub struct FormData {
    email: String,
}

/// Back to the page the form was submitted from, if the browser told us
fn back_to(request: &HttpRequest) -> String {
    request
        .headers()
        .get(REFERER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("/")
        .to_string()
}

/// `POST /subscriptions`
///
/// Parses the email, then lets `lifecycle::register` create a pending
/// subscriber (or re-send / skip for a known address) inside one transaction.
/// The outcome is reported as a flash message on redirect.
///
/// # Request example
///
/// ```sh
///     curl -v --data 'email=john@foo.com' http://127.0.0.1:8000/subscriptions
/// ```
#[tracing::instrument(
    name = "Subscribing",
    skip(form, request, db, gateway),
    fields(subscriber_email = %form.email)
)]
pub async fn subscribe(
    form: web::Form<FormData>,
    request: HttpRequest,
    db: web::Data<dyn SubscriptionDatabase>,
    gateway: web::Data<dyn NotificationGateway>,
) -> Result<HttpResponse, SubscriptionError> {
    let location = back_to(&request);

    let email = match SubscriberEmail::parse(form.0.email) {
        Ok(email) => email,
        Err(e) => {
            tracing::info!(error.message = %e, "rejected subscription");
            FlashMessage::error(INVALID_EMAIL).send();
            return Ok(redirect(&location));
        }
    };

    let mut store = db.begin().await?;
    let outcome = lifecycle::register(
        store.as_mut(),
        gateway.get_ref(),
        email,
        SubscriptionToken::generate,
    )
    .await;

    match outcome {
        Ok(registration) => {
            store.commit().await?;
            match registration {
                Registration::Created(_) => FlashMessage::success(SUBSCRIBED).send(),
                Registration::ConfirmationResent(_) => FlashMessage::error(ALREADY_PENDING).send(),
                Registration::AlreadyConfirmed(_) => FlashMessage::error(ALREADY_CONFIRMED).send(),
            }
        }
        // lost a race against a concurrent request for the same address
        Err(SubscriptionError::DuplicateEmail) => FlashMessage::error(ALREADY_CONFIRMED).send(),
        Err(SubscriptionError::DuplicateToken) => {
            tracing::error!("could not allocate a unique subscription token");
            FlashMessage::error(SERVICE_UNAVAILABLE).send()
        }
        Err(e) => return Err(e),
    }

    Ok(redirect(&location))
}
