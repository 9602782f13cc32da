//! Fuzzy decisions the retriever leans on, pulled out as named, pure items.
//!
//! Login-state detection is URL-substring guesswork and the download-link
//! scan is keyword matching; keeping them here makes the fuzziness visible
//! and testable instead of inlined in the browser flow.

use crate::utils::error::Result;
use url::Url;

/// URL fragments that mark an authentication page.
const LOGIN_MARKERS: [&str; 3] = ["/auth/login", "auth0.", "/u/login"];

/// Hosts the portal redirects to once a session is established.
const APP_HOSTS: [&str; 3] = ["chat.openai.com", "chatgpt.com", "platform.openai.com"];

/// True when the URL still points at a login form. Post-login redirect targets
/// are not guaranteed, so the inverse of this is not proof of a session.
pub fn looks_on_login_page(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    LOGIN_MARKERS.iter().any(|marker| url.contains(marker))
}

/// True when the URL sits on a known app host and carries no login marker.
/// Stricter than `!looks_on_login_page`: an unexpected third-party domain is
/// neither logged in nor on a login page.
pub fn looks_logged_in(url: &str) -> bool {
    let lowered = url.to_ascii_lowercase();
    !looks_on_login_page(url) && APP_HOSTS.iter().any(|host| lowered.contains(host))
}

/// An ordered list of selector candidates, evaluated first-match-wins.
/// The matched candidate is reported back so logs show which strategy won.
#[derive(Debug, Clone, Copy)]
pub struct SelectorCascade {
    name: &'static str,
    candidates: &'static [&'static str],
}

impl SelectorCascade {
    pub const fn new(name: &'static str, candidates: &'static [&'static str]) -> Self {
        Self { name, candidates }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.candidates.iter().copied()
    }
}

pub const EMAIL_FIELD: SelectorCascade = SelectorCascade::new(
    "email field",
    &[
        r#"input[name="username"]"#,
        r#"input[type="email"]"#,
        r#"input[placeholder*="mail"]"#,
    ],
);

pub const PASSWORD_FIELD: SelectorCascade = SelectorCascade::new(
    "password field",
    &[
        r#"input[name="password"]"#,
        r#"input[type="password"]"#,
        r#"input[placeholder*="assword"]"#,
    ],
);

pub const SUBMIT_BUTTON: SelectorCascade = SelectorCascade::new(
    "submit button",
    &[r#"button[type="submit"]"#, r#"input[type="submit"]"#],
);

/// Keywords that make an anchor look like an invoice download.
const INVOICE_KEYWORDS: [&str; 3] = ["invoice", "pdf", "download"];

/// Case-insensitive keyword match over an anchor's href and visible text.
pub fn link_looks_like_invoice(href: &str, text: &str) -> bool {
    let href = href.to_ascii_lowercase();
    let text = text.to_ascii_lowercase();
    INVOICE_KEYWORDS
        .iter()
        .any(|kw| href.contains(kw) || text.contains(kw))
}

/// Resolves an invoice href to an absolute URL. Relative links are joined
/// against the platform origin.
pub fn resolve_invoice_url(origin: &str, href: &str) -> Result<String> {
    match Url::parse(href) {
        Ok(absolute) => Ok(absolute.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(origin)?;
            Ok(base.join(href)?.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Serializes browser cookies into a single `Cookie` request header value.
pub fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}
