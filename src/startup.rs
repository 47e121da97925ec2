use std::net::TcpListener;
use std::sync::Arc;

use actix_web::cookie::Key;
use actix_web::dev::Server;
use actix_web::web;
use actix_web::web::Data;
use actix_web::App;
use actix_web::HttpServer;
use actix_web_flash_messages::storage::CookieMessageStore;
use actix_web_flash_messages::FlashMessagesFramework;
use actix_web_lab::middleware::from_fn;
use secrecy::ExposeSecret;
use secrecy::Secret;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_actix_web::TracingLogger;

use crate::authentication::reject_unauthorized;
use crate::configuration::AdminSettings;
use crate::configuration::DatabaseSettings;
use crate::configuration::Settings;
use crate::notification::NotificationGateway;
use crate::routes::confirm;
use crate::routes::health_check;
use crate::routes::home;
use crate::routes::newsletter_form;
use crate::routes::publish_newsletter;
use crate::routes::subscribe;
use crate::routes::unsubscribe;
use crate::store::PgDatabase;
use crate::store::SubscriptionDatabase;

/// Wrapper for actix's `Server` with access to the bound port. Not to be
/// confused with actix's `App`!
pub struct Application {
    /// Left private; use `get_port` to access
    port: u16,
    server: Server,
}

impl Application {
    /// Build the server on top of the Postgres store described in `cfg`
    pub async fn build(cfg: Settings) -> Result<Self, anyhow::Error> {
        let pool = get_connection_pool(&cfg.database);
        Self::build_with_database(cfg, Arc::new(PgDatabase::new(pool))).await
    }

    /// Build the server on top of any store; `cfg.database` is ignored.
    pub async fn build_with_database(
        cfg: Settings,
        database: Arc<dyn SubscriptionDatabase>,
    ) -> Result<Self, anyhow::Error> {
        let addr = format!("{}:{}", cfg.application.host, cfg.application.port);
        let listener = TcpListener::bind(addr)?;
        // with port 0 the OS picks one; remember which
        let port = listener.local_addr()?.port();

        let email_client = cfg.email_client.client(&cfg.application.base_url)?;

        let server = run(
            listener,
            database,
            Arc::new(email_client),
            cfg.application.hmac_secret,
            cfg.admin,
        )?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 { self.port }

    /// Because this consumes `self`, this should be the final function call (or
    /// passed to `tokio::spawn`)
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> { self.server.await }
}

/// `connect_lazy_with` only connects when the pool is first used, so the
/// server starts (and answers `/health_check`) even if the db is not up yet.
pub fn get_connection_pool(db_cfg: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(db_cfg.connection())
}

/// The server is not responsible for binding to an address, it only listens to
/// an already bound address.
///
/// Declares all API endpoints.
pub fn run(
    listener: TcpListener,
    database: Arc<dyn SubscriptionDatabase>,
    gateway: Arc<dyn NotificationGateway>,
    hmac_secret: Secret<String>,
    admin: AdminSettings,
) -> Result<Server, anyhow::Error> {
    // `Key::from` requires at least 64 bytes
    let secret_key = Key::from(hmac_secret.expose_secret().as_bytes());

    // status messages survive the redirect in a signed cookie
    let cookie_store = CookieMessageStore::builder(secret_key).build();
    let msg_framework = FlashMessagesFramework::builder(cookie_store).build();

    // `Data` is externally an `Arc`; `from` keeps the trait objects unsized
    let database: Data<dyn SubscriptionDatabase> = Data::from(database);
    let gateway: Data<dyn NotificationGateway> = Data::from(gateway);
    let admin = Data::new(admin);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(msg_framework.clone())
            .route("/", web::get().to(home))
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(subscribe))
            .route("/subscriptions/confirm", web::get().to(confirm))
            .route("/subscriptions/unsubscribe", web::get().to(unsubscribe))
            .service(
                web::scope("/admin")
                    .wrap(from_fn(reject_unauthorized))
                    .route("/newsletters", web::get().to(newsletter_form))
                    .route("/newsletters", web::post().to(publish_newsletter)),
            )
            .app_data(database.clone())
            .app_data(gateway.clone())
            .app_data(admin.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
