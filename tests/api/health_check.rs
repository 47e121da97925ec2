use crate::helpers::spawn_app;

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app().await;

    let resp = app
        .api_client
        .get(format!("{}/health_check", app.addr))
        .send()
        .await
        .expect("execute request");

    assert!(resp.status().is_success());
    assert_eq!(resp.content_length(), Some(0));
}

#[tokio::test]
async fn home_page_shows_subscribe_form() {
    let app = spawn_app().await;

    let html = app.get_home_html().await;

    assert!(html.contains(r#"action="/subscriptions""#));
    assert!(html.contains(r#"name="email""#));
}
