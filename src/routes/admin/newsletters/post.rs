use actix_web::web;
use actix_web::HttpResponse;
use actix_web_flash_messages::FlashMessage;
use serde::Deserialize;

use crate::lifecycle;
use crate::lifecycle::SubscriptionError;
use crate::notification::NotificationGateway;
use crate::store::SubscriptionDatabase;
use crate::utils::redirect;

pub const NEWSLETTER_SENT: &str = "Newsletter sent to all subscribers!";
pub const NEWSLETTER_INCOMPLETE: &str = "Subject, title and message must not be empty.";

#[derive(Deserialize)]
pub struct NewsletterForm {
    subject: String,
    title: String,
    message: String,
}

/// `POST /admin/newsletters`
///
/// Sends the issue to every confirmed subscriber. Any failure (including a
/// single undeliverable email, which stops the run) is reported to the
/// operator as a flash message rather than an error page.
#[tracing::instrument(
    name = "Publishing newsletter",
    skip(form, db, gateway),
    fields(subject = %form.subject, sent = tracing::field::Empty)
)]
pub async fn publish_newsletter(
    form: web::Form<NewsletterForm>,
    db: web::Data<dyn SubscriptionDatabase>,
    gateway: web::Data<dyn NotificationGateway>,
) -> HttpResponse {
    let NewsletterForm {
        subject,
        title,
        message,
    } = form.0;

    if [&subject, &title, &message]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        FlashMessage::error(NEWSLETTER_INCOMPLETE).send();
        return redirect("/admin/newsletters");
    }

    match send_to_all(&db, gateway.get_ref(), &subject, &title, &message).await {
        Ok(sent) => {
            tracing::Span::current().record("sent", sent);
            FlashMessage::info(NEWSLETTER_SENT).send();
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "failed to send newsletter"
            );
            FlashMessage::error(format!(
                "An error occurred while sending the newsletter: {e}"
            ))
            .send();
        }
    }
    redirect("/admin/newsletters")
}

async fn send_to_all(
    db: &web::Data<dyn SubscriptionDatabase>,
    gateway: &dyn NotificationGateway,
    subject: &str,
    title: &str,
    message: &str,
) -> Result<usize, SubscriptionError> {
    let mut store = db.begin().await?;
    let sent = lifecycle::broadcast(store.as_mut(), gateway, subject, title, message).await?;
    store.commit().await?;
    Ok(sent)
}
