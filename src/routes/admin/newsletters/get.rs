use actix_web::http::header::ContentType;
use actix_web::HttpResponse;
use actix_web_flash_messages::IncomingFlashMessages;

use crate::routes::flash_html;

/// `GET /admin/newsletters`
pub async fn newsletter_form(flash_messages: IncomingFlashMessages) -> HttpResponse {
    let flash = flash_html(&flash_messages);

    let body = format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8" />
    <title>Send a newsletter</title>
  </head>
  <body>
    {flash}
    <form action="/admin/newsletters" method="post">
      <label>
        Subject
        <input type="text" placeholder="Enter subject" name="subject" />
      </label>
      <label>
        Title
        <input type="text" placeholder="Enter title" name="title" />
      </label>
      <label>
        Message
        <textarea placeholder="Enter message" name="message" rows="20" cols="50"></textarea>
      </label>
      <button type="submit">Send to all subscribers</button>
    </form>
  </body>
</html>"#
    );

    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(body)
}
