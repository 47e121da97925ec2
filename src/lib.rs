pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod lifecycle;
pub mod notification;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod templates;
pub mod utils;
