use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::PasswordHasher;
use argon2::Version;
use mailing_list::configuration::get_configuration;
use mailing_list::configuration::Settings;
use mailing_list::startup::Application;
use mailing_list::store::InMemoryDatabase;
use mailing_list::telemetry::get_subscriber;
use mailing_list::telemetry::init_subscriber;
use once_cell::sync::Lazy;
use secrecy::Secret;
use uuid::Uuid;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

/// Init the tracing subscriber once for the whole test binary.
///
/// To opt in to verbose logging, use the env var `TEST_LOG`:
///
/// ```sh
///      TEST_LOG=true cargo test [test_name] | bunyan
/// ```
static TRACING: Lazy<()> = Lazy::new(|| {
    // two different closure types cannot be assigned to the same var, hence the
    // duplicated arms
    match std::env::var("TEST_LOG") {
        Ok(_) => init_subscriber(get_subscriber("test", "debug", std::io::stdout)),
        Err(_) => init_subscriber(get_subscriber("test", "debug", std::io::sink)),
    };
});

pub struct TestAdmin {
    pub username: String,
    pub password: String,
}

impl TestAdmin {
    pub fn generate() -> Self {
        Self {
            username: "admin".to_string(),
            password: Uuid::new_v4().to_string(),
        }
    }

    /// PHC string for the config; same params as OWASP recommends
    pub fn password_hash(&self) -> String {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(15000, 2, 1, None).unwrap(),
        )
        .hash_password(self.password.as_bytes(), &salt)
        .unwrap()
        .to_string()
    }
}

/// Links extracted from an email sent through the mock email API
pub struct EmailLinks {
    pub html: reqwest::Url,
    pub text: reqwest::Url,
}

pub struct TestApp {
    pub addr: String,
    pub port: u16,
    pub db: InMemoryDatabase,
    pub email_server: MockServer,
    pub admin: TestAdmin,
    /// Keeps cookies (for flash messages) but does not follow redirects
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_subscriptions(
        &self,
        body: String,
    ) -> reqwest::Response {
        self.api_client
            .post(format!("{}/subscriptions", self.addr))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_home_html(&self) -> String {
        self.api_client
            .get(format!("{}/", self.addr))
            .send()
            .await
            .expect("execute request")
            .text()
            .await
            .unwrap()
    }

    pub async fn get(
        &self,
        url: reqwest::Url,
    ) -> reqwest::Response {
        self.api_client
            .get(url)
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_newsletters_as(
        &self,
        username: &str,
        password: &str,
    ) -> reqwest::Response {
        self.api_client
            .get(format!("{}/admin/newsletters", self.addr))
            .basic_auth(username, Some(password))
            .send()
            .await
            .expect("execute request")
    }

    pub async fn get_newsletters_html(&self) -> String {
        self.get_newsletters_as(&self.admin.username, &self.admin.password)
            .await
            .text()
            .await
            .unwrap()
    }

    pub async fn post_newsletters<Body>(
        &self,
        body: &Body,
    ) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(format!("{}/admin/newsletters", self.addr))
            .basic_auth(&self.admin.username, Some(&self.admin.password))
            .form(body)
            .send()
            .await
            .expect("execute request")
    }

    /// Extract the single link pointing at our app from both bodies of an
    /// email. Links are built from `base_url`, which lacks the random port,
    /// so the port is patched in.
    pub fn get_links(
        &self,
        email_req: &wiremock::Request,
    ) -> EmailLinks {
        let body: serde_json::Value = serde_json::from_slice(&email_req.body).unwrap();

        let get_link = |s: &str| {
            let links: Vec<_> = linkify::LinkFinder::new()
                .links(s)
                .filter(|l| *l.kind() == linkify::LinkKind::Url)
                .collect();
            assert_eq!(links.len(), 1);
            let mut link = reqwest::Url::parse(links[0].as_str()).unwrap();
            assert_eq!(link.host_str().unwrap(), "127.0.0.1");
            link.set_port(Some(self.port)).unwrap();
            link
        };

        EmailLinks {
            html: get_link(body["HtmlBody"].as_str().unwrap()),
            text: get_link(body["TextBody"].as_str().unwrap()),
        }
    }

    /// Links in the last email received by the mock email API
    pub async fn last_email_links(&self) -> EmailLinks {
        let email_req = self
            .email_server
            .received_requests()
            .await
            .unwrap()
            .pop()
            .expect("no email was sent");
        self.get_links(&email_req)
    }

    /// Subscribe a fresh address without confirming; returns the links of
    /// the confirmation email
    pub async fn create_unconfirmed_subscriber(
        &self,
        email: &str,
    ) -> EmailLinks {
        // (scoped) mocks must always be assigned and -named-!
        let _mock = Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .named("Create unconfirmed subscriber")
            .expect(1)
            .mount_as_scoped(&self.email_server)
            .await;

        let body = serde_urlencoded::to_string([("email", email)]).unwrap();
        let resp = self.post_subscriptions(body).await;
        assert_is_redirect_to(&resp, "/");

        self.last_email_links().await
    }

    /// Simulate clicking the confirmation link
    pub async fn create_confirmed_subscriber(
        &self,
        email: &str,
    ) -> EmailLinks {
        let links = self.create_unconfirmed_subscriber(email).await;
        let resp = self.get(links.text.clone()).await;
        assert_is_redirect_to(&resp, "/");
        links
    }
}

pub fn assert_is_redirect_to(
    resp: &reqwest::Response,
    location: &str,
) {
    assert_eq!(resp.status().as_u16(), 303);
    assert_eq!(resp.headers().get("Location").unwrap(), location);
}

/// Spawn the app on a random port, on top of a fresh in-memory store, with
/// the email API replaced by a `MockServer`.
pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    // simulate the email API
    let email_server = MockServer::start().await;
    let admin = TestAdmin::generate();
    let cfg = test_configuration(&email_server, &admin);

    let db = InMemoryDatabase::new();
    let app = Application::build_with_database(cfg, Arc::new(db.clone()))
        .await
        .expect("Failed to build application");
    let port = app.get_port();
    tokio::spawn(app.run_until_stopped());

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .build()
        .unwrap();

    TestApp {
        addr: format!("http://127.0.0.1:{port}"),
        port,
        db,
        email_server,
        admin,
        api_client,
    }
}

/// Randomised config: port 0 (the OS picks one) and the email API pointed
/// at `email_server`
pub fn test_configuration(
    email_server: &MockServer,
    admin: &TestAdmin,
) -> Settings {
    let mut cfg = get_configuration().expect("Failed to read configuration");
    cfg.application.port = 0;
    cfg.email_client.base_url = email_server.uri();
    cfg.admin.username = admin.username.clone();
    cfg.admin.password_hash = Secret::new(admin.password_hash());
    cfg
}
