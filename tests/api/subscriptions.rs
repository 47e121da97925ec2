use mailing_list::routes::ALREADY_CONFIRMED;
use mailing_list::routes::ALREADY_PENDING;
use mailing_list::routes::INVALID_EMAIL;
use mailing_list::routes::SUBSCRIBED;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::ResponseTemplate;

use crate::helpers::assert_is_redirect_to;
use crate::helpers::spawn_app;

#[tokio::test]
async fn subscribe_valid_creates_pending_subscriber() {
    let app = spawn_app().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".to_string())
        .await;
    assert_is_redirect_to(&resp, "/");

    let html = app.get_home_html().await;
    assert!(html.contains(SUBSCRIBED));

    let saved = app.db.snapshot().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].email.as_ref(), "ursula_le_guin@gmail.com");
    assert!(saved[0].is_pending());
}

#[tokio::test]
async fn subscribe_sends_confirmation_email_with_link() {
    let app = spawn_app().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    app.post_subscriptions("email=ursula_le_guin%40gmail.com".to_string())
        .await;

    let email_req = &app.email_server.received_requests().await.unwrap()[0];
    let body: serde_json::Value = serde_json::from_slice(&email_req.body).unwrap();
    assert_eq!(body["To"], "ursula_le_guin@gmail.com");
    assert_eq!(body["Subject"], "Confirmation of your email address");

    let links = app.get_links(email_req);
    assert_eq!(links.html, links.text);
    assert_eq!(links.text.path(), "/subscriptions/confirm");

    let saved = app.db.snapshot().await;
    let token = links
        .text
        .query_pairs()
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(token, saved[0].token.as_ref());
}

#[tokio::test]
async fn subscribe_invalid_email_is_flashed_and_not_stored() {
    let app = spawn_app().await;

    // no email is ever sent
    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    for (body, desc) in [
        ("email=", "empty email"),
        ("email=%20%20", "blank email"),
        ("email=definitely-not-an-email", "no @"),
        ("email=%40domain.com", "no subject"),
    ] {
        let resp = app.post_subscriptions(body.to_string()).await;
        assert_is_redirect_to(&resp, "/");

        let html = app.get_home_html().await;
        assert!(html.contains(INVALID_EMAIL), "no error shown for {desc}");
    }

    assert!(app.db.snapshot().await.is_empty());
}

#[tokio::test]
async fn subscribe_without_email_field_returns_400() {
    let app = spawn_app().await;

    for body in ["", "name=le%20guin"] {
        let resp = app.post_subscriptions(body.to_string()).await;
        assert_eq!(resp.status().as_u16(), 400);
    }
}

#[tokio::test]
async fn subscribe_twice_resends_same_confirmation() {
    let app = spawn_app().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_server)
        .await;

    let body = "email=ursula_le_guin%40gmail.com".to_string();
    app.post_subscriptions(body.clone()).await;
    app.get_home_html().await;

    let resp = app.post_subscriptions(body).await;
    assert_is_redirect_to(&resp, "/");
    assert!(app.get_home_html().await.contains(ALREADY_PENDING));

    let reqs = app.email_server.received_requests().await.unwrap();
    assert_eq!(app.get_links(&reqs[0]).text, app.get_links(&reqs[1]).text);
    assert_eq!(app.db.snapshot().await.len(), 1);
}

#[tokio::test]
async fn subscribe_confirmed_address_sends_nothing() {
    let app = spawn_app().await;
    app.create_confirmed_subscriber("ursula_le_guin@gmail.com")
        .await;

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".to_string())
        .await;
    assert_is_redirect_to(&resp, "/");
    assert!(app.get_home_html().await.contains(ALREADY_CONFIRMED));

    let saved = app.db.snapshot().await;
    assert_eq!(saved.len(), 1);
    assert!(saved[0].is_confirmed);
}

#[tokio::test]
async fn subscribe_redirects_back_to_referer() {
    let app = spawn_app().await;

    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_server)
        .await;

    let resp = app
        .api_client
        .post(format!("{}/subscriptions", app.addr))
        .header("Referer", "/blog/some-post")
        .form(&[("email", "ursula_le_guin@gmail.com")])
        .send()
        .await
        .unwrap();

    assert_is_redirect_to(&resp, "/blog/some-post");
}

#[tokio::test]
async fn subscribe_fails_if_confirmation_cannot_be_sent() {
    let app = spawn_app().await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    let resp = app
        .post_subscriptions("email=ursula_le_guin%40gmail.com".to_string())
        .await;

    assert_eq!(resp.status().as_u16(), 500);
    // the insert was rolled back
    assert!(app.db.snapshot().await.is_empty());
}
