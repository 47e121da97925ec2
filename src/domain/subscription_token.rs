use std::fmt::Display;

use rand::distributions::Alphanumeric;
use rand::thread_rng;
use rand::Rng;

/// Number of characters in every token we hand out.
pub const TOKEN_LENGTH: usize = 55;

/// Opaque credential used both to confirm a subscription and to unsubscribe.
///
/// Tokens are only ever created by `generate` (for new subscribers) or `parse`
/// (for tokens coming back to us in a link), so a malformed string never
/// reaches the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(String);

impl SubscriptionToken {
    /// Draw a fresh token from a cryptographically secure rng. `thread_rng`
    /// is a CSPRNG seeded by the OS.
    pub fn generate() -> Self {
        let mut rng = thread_rng();
        Self(
            std::iter::repeat_with(|| rng.sample(Alphanumeric))
                .map(char::from)
                .take(TOKEN_LENGTH)
                .collect(),
        )
    }

    pub fn parse(token: String) -> Result<Self, String> {
        let well_formed = token.len() == TOKEN_LENGTH
            && token.chars().all(|c| c.is_ascii_alphanumeric());
        match well_formed {
            true => Ok(Self(token)),
            false => Err(format!("Malformed subscription token: {token:?}")),
        }
    }
}

impl AsRef<str> for SubscriptionToken {
    fn as_ref(&self) -> &str { &self.0 }
}

impl Display for SubscriptionToken {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
