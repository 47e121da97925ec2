// only one kind of client needs authenticating: the operator who sends
// broadcasts. HTTP Basic auth against a single configured account is enough;
// the password is stored as an argon2 PHC string, never in plain text.

use actix_web::body::MessageBody;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::error::InternalError;
use actix_web::http::header;
use actix_web::http::header::HeaderMap;
use actix_web::http::header::HeaderValue;
use actix_web::web;
use actix_web::HttpResponse;
use actix_web_lab::middleware::Next;
use anyhow::Context;
use argon2::Argon2;
use argon2::PasswordHash;
use argon2::PasswordVerifier;
use base64::Engine;
use secrecy::ExposeSecret;
use secrecy::Secret;
use tokio::task::JoinHandle;

use crate::configuration::AdminSettings;
use crate::utils::error_500;

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

/// Parse the `Authorization` header of a request (RFCs 2617, 7617). This does
/// not validate anything; for that, see `validate_credentials`.
pub fn basic_authentication(headers: &HeaderMap) -> Result<Credentials, anyhow::Error> {
    let encoded = headers
        .get("Authorization")
        .context("No Authorization header")?
        .to_str()
        .context("Invalid str")?
        .strip_prefix("Basic ")
        .context("Authorization scheme was not 'Basic'")?;

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("Failed to decode base64")?;
    let decoded = String::from_utf8(decoded).context("Invalid str")?;

    let mut creds = decoded.splitn(2, ':');

    let username = creds
        .next()
        .ok_or_else(|| anyhow::anyhow!("No username"))?
        .to_string();

    let password = creds
        .next()
        .ok_or_else(|| anyhow::anyhow!("No password"))?
        .to_string();

    Ok(Credentials {
        username,
        password: Secret::new(password),
    })
}

/// CPU-bound and slow; run it off the async executor
fn verify_password(
    supplied_password: Secret<String>,
    stored_password: Secret<String>,
) -> Result<(), AuthError> {
    let stored_password = &PasswordHash::new(stored_password.expose_secret())
        .context("Failed to read stored PHC string")
        .map_err(AuthError::UnexpectedError)?;
    Argon2::default()
        .verify_password(
            supplied_password.expose_secret().as_bytes(),
            stored_password,
        )
        .context("Invalid password")
        .map_err(AuthError::InvalidCredentials)?;
    Ok(())
}

/// Wrapper for `spawn_blocking` that keeps the current span
pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || span.in_scope(f))
}

/// Check supplied credentials against the configured admin account.
///
/// The hash is verified even when the username is wrong, so that both
/// failures take the same time and usernames cannot be enumerated.
#[tracing::instrument(name = "Validating credentials", skip_all, fields(username = %creds.username))]
pub async fn validate_credentials(
    creds: Credentials,
    admin: &AdminSettings,
) -> Result<(), AuthError> {
    let stored_password = admin.password_hash.clone();
    let verified = spawn_blocking_with_tracing(move || verify_password(creds.password, stored_password))
        .await
        .context("Failed to spawn blocking thread")
        .map_err(AuthError::UnexpectedError)?;

    verified?;
    if creds.username != admin.username {
        return Err(AuthError::InvalidCredentials(anyhow::anyhow!(
            "Unknown username"
        )));
    }
    Ok(())
}

fn unauthorized(e: anyhow::Error) -> actix_web::Error {
    let mut resp = HttpResponse::Unauthorized().finish();
    resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static(r#"Basic realm="admin""#),
    );
    InternalError::from_response(e, resp).into()
}

/// Middleware guarding `/admin`. Requests without valid Basic credentials are
/// answered with 401 and a `WWW-Authenticate` challenge.
///
/// For more details, refer to the documentation for
/// `actix_web_lab::middleware::from_fn`
pub async fn reject_unauthorized(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let admin = req
        .app_data::<web::Data<AdminSettings>>()
        .cloned()
        .ok_or_else(|| error_500("Admin credentials are not configured"))?;

    let creds = basic_authentication(req.headers()).map_err(unauthorized)?;

    match validate_credentials(creds, &admin).await {
        Ok(()) => next.call(req).await,
        Err(AuthError::InvalidCredentials(e)) => Err(unauthorized(e)),
        Err(AuthError::UnexpectedError(e)) => Err(error_500(e)),
    }
}
