use mailing_list::configuration::get_configuration;
use mailing_list::startup::Application;
use mailing_list::telemetry::get_subscriber;
use mailing_list::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the server
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // RUST_LOG overrides the default level
    let subscriber = get_subscriber("mailing-list", "info", std::io::stdout);
    init_subscriber(subscriber);

    let cfg = get_configuration()?;
    let server = Application::build(cfg).await?;
    tracing::info!(port = server.get_port(), "listening");
    server.run_until_stopped().await?;
    Ok(())
}
