use actix_web::http::header::ContentType;
use actix_web::HttpResponse;
use actix_web_flash_messages::IncomingFlashMessages;

use super::flash_html;

/// `GET /`
///
/// Subscribe form, plus whatever status message the previous redirect left
/// behind.
pub async fn home(flash_messages: IncomingFlashMessages) -> HttpResponse {
    let body = include_str!("./home.html").replace("{flash}", &flash_html(&flash_messages));
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}
