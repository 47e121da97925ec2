use std::fmt::Display;

use validator::ValidateEmail;

/// A parsed email address, used for both senders and recipients.
///
/// Must be instantiated with `SubscriberEmail::parse`; the field is left
/// private so that an unvalidated address can never reach the store or the
/// mail gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        if email.trim().is_empty() {
            return Err("Email must not be blank".to_string());
        }
        ValidateEmail::validate_email(&email)
            // https://stackoverflow.com/a/65012849
            .then_some(Self(email.clone()))
            .ok_or(format!("Invalid email: {email:?}"))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Display for SubscriberEmail {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
