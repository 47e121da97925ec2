mod admin;
mod health_check;
mod home;
mod subscriptions;
mod subscriptions_confirm;
mod subscriptions_unsubscribe;

pub use admin::*;
pub use health_check::*;
pub use home::*;
pub use subscriptions::*;
pub use subscriptions_confirm::*;
pub use subscriptions_unsubscribe::*;

use actix_web::http::StatusCode;
use actix_web::ResponseError;
use actix_web_flash_messages::IncomingFlashMessages;
use actix_web_flash_messages::Level;

use crate::lifecycle::SubscriptionError;

/// Only the errors that a route does not turn into a flash message end up
/// here, so everything but a bad request is our fault.
impl ResponseError for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            Self::TokenNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::DuplicateToken => StatusCode::SERVICE_UNAVAILABLE,
            Self::DeliveryFailure { .. } | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Render incoming flash messages as html paragraphs, escaped
fn flash_html(flash_messages: &IncomingFlashMessages) -> String {
    flash_messages
        .iter()
        .map(|m| {
            let class = match m.level() {
                Level::Error | Level::Warning => "error",
                _ => "info",
            };
            format!(
                "<p class=\"{class}\"><i>{}</i></p>\n",
                htmlescape::encode_minimal(m.content())
            )
        })
        .collect()
}
