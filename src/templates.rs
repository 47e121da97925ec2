//! Email bodies. Rendering is a pure function of the template and its
//! context; it knows nothing about how the result is delivered.

use tera::Context;
use tera::Tera;

use crate::domain::SubscriptionToken;

pub const CONFIRMATION_SUBJECT: &str = "Confirmation of your email address";

/// The two emails we ever send, with the variables each one needs.
#[derive(Debug, Clone)]
pub enum EmailTemplate {
    Confirmation {
        token: SubscriptionToken,
    },
    Broadcast {
        title: String,
        message: String,
        token: SubscriptionToken,
    },
}

impl EmailTemplate {
    /// Names of the html and plain text variants
    fn names(&self) -> (&'static str, &'static str) {
        match self {
            Self::Confirmation { .. } => ("confirm.html", "confirm.txt"),
            Self::Broadcast { .. } => ("news.html", "news.txt"),
        }
    }

    pub fn token(&self) -> &SubscriptionToken {
        match self {
            Self::Confirmation { token } | Self::Broadcast { token, .. } => token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

/// Templates are compiled into the binary; `base_url` is used to build the
/// confirm and unsubscribe links.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    tera: Tera,
    base_url: String,
}

impl TemplateRenderer {
    pub fn new(base_url: String) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        // `.html` names are autoescaped, `.txt` names are not
        tera.add_raw_templates(vec![
            ("confirm.html", include_str!("../templates/emails/confirm.html")),
            ("confirm.txt", include_str!("../templates/emails/confirm.txt")),
            ("news.html", include_str!("../templates/emails/news.html")),
            ("news.txt", include_str!("../templates/emails/news.txt")),
        ])?;
        Ok(Self {
            tera,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn confirm_link(
        &self,
        token: &SubscriptionToken,
    ) -> String {
        format!(
            "{}/subscriptions/confirm?token={}",
            self.base_url,
            urlencoding::encode(token.as_ref())
        )
    }

    pub fn unsubscribe_link(
        &self,
        token: &SubscriptionToken,
    ) -> String {
        format!(
            "{}/subscriptions/unsubscribe?token={}",
            self.base_url,
            urlencoding::encode(token.as_ref())
        )
    }

    pub fn render(
        &self,
        template: &EmailTemplate,
    ) -> Result<RenderedEmail, tera::Error> {
        let mut ctx = Context::new();
        ctx.insert("token", template.token().as_ref());
        match template {
            EmailTemplate::Confirmation { token } => {
                ctx.insert("confirm_link", &self.confirm_link(token));
            }
            EmailTemplate::Broadcast {
                title,
                message,
                token,
            } => {
                ctx.insert("title", title);
                ctx.insert("message", message);
                ctx.insert("unsubscribe_link", &self.unsubscribe_link(token));
            }
        }

        let (html_name, text_name) = template.names();
        Ok(RenderedEmail {
            html: self.tera.render(html_name, &ctx)?,
            text: self.tera.render(text_name, &ctx)?,
        })
    }
}
