//! Browser-automation flow: portal login, billing page, invoice download.

use crate::config::CliConfig;
use crate::core::heuristics::{
    cookie_header, link_looks_like_invoice, looks_logged_in, looks_on_login_page,
    resolve_invoice_url, SelectorCascade, EMAIL_FIELD, PASSWORD_FIELD, SUBMIT_BUTTON,
};
use crate::domain::model::{Credentials, InvoiceFile, RetrievalOutcome};
use crate::domain::ports::Retriever;
use crate::utils::error::{CourierError, Result};
use crate::utils::retry::with_retries;
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Sent on every request, browser and fallback HTTP alike. The portal serves
/// a degraded page to obvious bot agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const SETTLE_DELAY: Duration = Duration::from_secs(2);
const FIELD_WAIT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct InvoiceRetriever {
    config: CliConfig,
    client: reqwest::Client,
}

impl InvoiceRetriever {
    pub fn new(config: CliConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn automation(stage: impl Into<String>) -> CourierError {
        CourierError::Automation {
            stage: stage.into(),
        }
    }

    /// Best-effort checkpoint screenshot. A screenshot failure must never
    /// mask the error that led here.
    async fn snap(&self, page: &Page, name: &str) {
        let path = Path::new(&self.config.screenshot_dir).join(format!("{}.png", name));
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();
        if let Err(e) = page.save_screenshot(params, &path).await {
            tracing::warn!("screenshot '{}' failed: {}", name, e);
        }
    }

    async fn run_flow(&self, page: &Page, creds: &Credentials) -> Result<RetrievalOutcome> {
        // Step 1: login entry point.
        tracing::info!("Navigating to login page: {}", self.config.login_url);
        page.goto(self.config.login_url.as_str()).await?;
        let _ = page.wait_for_navigation().await;
        tokio::time::sleep(SETTLE_DELAY).await;
        self.snap(page, "01-login-entry").await;

        // Step 2: the "Log in" affordance. Its absence can mean an existing
        // session rather than a broken page.
        if click_control_with_text(page, &["log in", "login"]).await? {
            tokio::time::sleep(SETTLE_DELAY).await;
            self.submit_login_form(page, creds, "chat login").await?;
            self.await_login_complete(page).await?;
        } else {
            let url = current_url(page).await;
            if looks_logged_in(&url) {
                tracing::info!("No log-in control; URL suggests an existing session: {}", url);
            } else {
                self.snap(page, "err-no-login-control").await;
                return Err(Self::automation(format!(
                    "log-in control not found (url={})",
                    url
                )));
            }
        }
        self.snap(page, "04-post-login").await;

        // Step 3: billing page, with bounded retries for transient timeouts.
        self.goto_billing(page).await?;
        tokio::time::sleep(SETTLE_DELAY).await;
        self.snap(page, "05-billing").await;

        // Step 4: the platform may bounce billing back to its own login form.
        let url = current_url(page).await;
        if looks_on_login_page(&url) {
            tracing::info!("Billing redirected to platform login, replaying credentials");
            self.submit_login_form(page, creds, "platform login").await?;
            self.await_login_complete(page).await?;
            self.goto_billing(page).await?;
            tokio::time::sleep(SETTLE_DELAY).await;

            let url = current_url(page).await;
            if looks_on_login_page(&url) {
                // A structurally different third login variant is not guessed
                // at; surface it instead.
                self.snap(page, "err-platform-login-replay").await;
                return Err(Self::automation(format!(
                    "platform login replay still on a login page (url={})",
                    url
                )));
            }
        }

        // Step 5: invoice link discovery.
        let Some(href) = self.find_invoice_link(page).await? else {
            tracing::info!("No invoice link found on billing page");
            self.snap(page, "06-no-invoice").await;
            return Ok(RetrievalOutcome::NoInvoice);
        };
        tracing::info!("Invoice link discovered: {}", href);
        self.snap(page, "06-invoice-link").await;

        let invoice_url = resolve_invoice_url(&self.config.platform_origin, &href)?;

        // Step 6: download, native path first, cookie-forwarding GET second.
        let bytes = match download_in_page(page, &invoice_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("In-page download failed ({}), falling back to HTTP", e);
                let header = page_cookie_header(page).await?;
                match fetch_with_cookies(&self.client, &invoice_url, &header).await? {
                    Some(bytes) => bytes,
                    None => {
                        self.snap(page, "err-download").await;
                        return Ok(RetrievalOutcome::NoInvoice);
                    }
                }
            }
        };

        let invoice = persist_invoice(&bytes)?;
        tracing::info!(
            "Invoice downloaded to {} ({} bytes)",
            invoice.path.display(),
            bytes.len()
        );
        Ok(RetrievalOutcome::Retrieved(invoice))
    }

    /// Fills the email and password fields via their selector cascades and
    /// submits each step. `stage` names the form for error messages since the
    /// chat and platform login forms are shaped differently.
    async fn submit_login_form(
        &self,
        page: &Page,
        creds: &Credentials,
        stage: &str,
    ) -> Result<()> {
        let Some((field, matched)) = wait_for_cascade(page, &EMAIL_FIELD, FIELD_WAIT).await else {
            self.snap(page, "err-email-field").await;
            return Err(Self::automation(format!("{}: email field not found", stage)));
        };
        tracing::debug!("{}: email field matched via {}", stage, matched);
        field.click().await?;
        field.type_str(&creds.portal_email).await?;
        self.snap(page, "02-email-filled").await;

        if !click_control_with_text(page, &["continue"]).await? {
            field.press_key("Enter").await?;
        }
        tokio::time::sleep(SETTLE_DELAY).await;

        let Some((field, matched)) = wait_for_cascade(page, &PASSWORD_FIELD, FIELD_WAIT).await
        else {
            self.snap(page, "err-password-field").await;
            return Err(Self::automation(format!(
                "{}: password field not found",
                stage
            )));
        };
        tracing::debug!("{}: password field matched via {}", stage, matched);
        field.click().await?;
        field.type_str(&creds.portal_password).await?;
        self.snap(page, "03-password-filled").await;

        if let Some((button, _)) = first_matching_element(page, &SUBMIT_BUTTON).await {
            button.click().await?;
        } else if !click_control_with_text(page, &["log in", "continue", "sign in"]).await? {
            field.press_key("Enter").await?;
        }
        tokio::time::sleep(SETTLE_DELAY).await;
        Ok(())
    }

    /// Polls the URL until it leaves the login domain. A timeout is still a
    /// success when the URL no longer carries a login marker; the post-login
    /// redirect target is not guaranteed.
    async fn await_login_complete(&self, page: &Page) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(self.config.op_timeout_secs);
        loop {
            let url = current_url(page).await;
            if looks_logged_in(&url) {
                tracing::info!("Login complete: {}", url);
                return Ok(());
            }
            if Instant::now() > deadline {
                if !looks_on_login_page(&url) {
                    tracing::warn!(
                        "Login wait timed out on an unrecognized URL, assuming success: {}",
                        url
                    );
                    return Ok(());
                }
                self.snap(page, "err-login-timeout").await;
                return Err(Self::automation(format!(
                    "login did not complete (url={})",
                    url
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn goto_billing(&self, page: &Page) -> Result<()> {
        let delay = Duration::from_secs(self.config.nav_retry_delay_secs);
        with_retries(self.config.nav_retries, delay, "billing navigation", || async move {
            page.goto(self.config.billing_url.as_str()).await?;
            let _ = page.wait_for_navigation().await;
            Ok::<(), CourierError>(())
        })
        .await
        .map_err(|e| Self::automation(format!("billing navigation exhausted retries: {}", e)))
    }

    /// Direct attribute probe first, keyword scan over every anchor second.
    async fn find_invoice_link(&self, page: &Page) -> Result<Option<String>> {
        if let Ok(element) = page.find_element(r#"a[href*="invoice"]"#).await {
            if let Some(href) = element.attribute("href").await? {
                tracing::debug!("invoice link matched direct selector");
                return Ok(Some(href));
            }
        }

        for link in scan_links(page).await? {
            if link_looks_like_invoice(&link.href, &link.text) {
                tracing::debug!("invoice link matched keyword scan: {}", link.href);
                return Ok(Some(link.href));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Retriever for InvoiceRetriever {
    async fn retrieve(&self, credentials: &Credentials) -> Result<RetrievalOutcome> {
        let session = BrowserSession::launch(&self.config).await?;
        // The session must be torn down on every exit path, errors included.
        let result = self.run_flow(&session.page, credentials).await;
        session.close().await;
        result
    }
}

struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(config: &CliConfig) -> Result<Self> {
        tracing::info!("Launching headless browser");
        let browser_config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", USER_AGENT))
            .window_size(1280, 960)
            .request_timeout(Duration::from_secs(config.op_timeout_secs))
            .build()
            .map_err(CourierError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        // The CDP handler pumps WebSocket messages for the session's lifetime.
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser,
            page,
            handler: handler_task,
        })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!("Error closing browser: {}", e);
        }
        self.handler.abort();
    }
}

async fn current_url(page: &Page) -> String {
    page.url().await.ok().flatten().unwrap_or_default()
}

/// Tries each cascade candidate once, in order, first match wins.
async fn first_matching_element(
    page: &Page,
    cascade: &SelectorCascade,
) -> Option<(Element, &'static str)> {
    for selector in cascade.candidates() {
        if let Ok(element) = page.find_element(selector).await {
            return Some((element, selector));
        }
    }
    None
}

/// Polls the cascade until an element appears or the wait expires.
async fn wait_for_cascade(
    page: &Page,
    cascade: &SelectorCascade,
    timeout: Duration,
) -> Option<(Element, &'static str)> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(found) = first_matching_element(page, cascade).await {
            return Some(found);
        }
        if Instant::now() > deadline {
            tracing::warn!("{} did not appear within {:?}", cascade.name(), timeout);
            return None;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Clicks the first button-like control whose visible text contains one of
/// `labels` (case-insensitive). Text matching is not expressible in CSS, so
/// this runs inside the page.
async fn click_control_with_text(page: &Page, labels: &[&str]) -> Result<bool> {
    let wanted = serde_json::to_string(labels)?;
    let js = format!(
        r#"(function(want) {{
  const norm = s => String(s || '').trim().toLowerCase();
  const controls = Array.from(
    document.querySelectorAll('button, input[type="submit"], [role="button"], a')
  );
  for (const el of controls) {{
    const txt = norm(el.innerText || el.value || el.getAttribute('aria-label'));
    if (!txt) continue;
    if (want.some(w => txt.includes(w))) {{
      el.click();
      return true;
    }}
  }}
  return false;
}})({})"#,
        wanted
    );
    let clicked: bool = page.evaluate(js).await?.into_value()?;
    Ok(clicked)
}

#[derive(Debug, Deserialize)]
struct LinkProbe {
    #[serde(default)]
    href: String,
    #[serde(default)]
    text: String,
}

async fn scan_links(page: &Page) -> Result<Vec<LinkProbe>> {
    let js = r#"Array.from(document.querySelectorAll('a')).map(a => ({
  href: a.getAttribute('href') || '',
  text: (a.innerText || '').trim()
}))"#;
    Ok(page.evaluate(js).await?.into_value()?)
}

#[derive(Debug, Deserialize)]
struct PageFetch {
    ok: bool,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Browser-native download path: fetch inside the page so the session's
/// cookies ride along implicitly, returning the body base64-encoded.
async fn download_in_page(page: &Page, url: &str) -> Result<Vec<u8>> {
    let quoted = serde_json::to_string(url)?;
    let js = format!(
        r#"(async function(u) {{
  try {{
    const res = await fetch(u, {{ credentials: 'include' }});
    if (!res.ok) return {{ ok: false, status: res.status }};
    const bytes = new Uint8Array(await res.arrayBuffer());
    let bin = '';
    const chunk = 0x8000;
    for (let i = 0; i < bytes.length; i += chunk) {{
      bin += String.fromCharCode.apply(null, bytes.subarray(i, i + chunk));
    }}
    return {{ ok: true, data: btoa(bin) }};
  }} catch (e) {{
    return {{ ok: false, status: 0, error: String((e && e.message) || e) }};
  }}
}})({})"#,
        quoted
    );

    let fetched: PageFetch = page.evaluate(js).await?.into_value()?;
    if !fetched.ok {
        return Err(CourierError::Browser(format!(
            "in-page fetch failed (status={}, error={})",
            fetched.status,
            fetched.error.unwrap_or_default()
        )));
    }
    let data = fetched
        .data
        .ok_or_else(|| CourierError::Browser("in-page fetch returned no body".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CourierError::Browser(format!("invalid base64 from in-page fetch: {}", e)))
}

async fn page_cookie_header(page: &Page) -> Result<String> {
    let cookies = page.get_cookies().await?;
    let pairs: Vec<(String, String)> = cookies.into_iter().map(|c| (c.name, c.value)).collect();
    Ok(cookie_header(&pairs))
}

/// Fallback download: plain GET carrying the browser session's cookies.
/// A non-success status is final for this run and yields `None`, not an error.
pub async fn fetch_with_cookies(
    client: &reqwest::Client,
    url: &str,
    cookie_header: &str,
) -> Result<Option<Vec<u8>>> {
    let mut request = client
        .get(url)
        .header(reqwest::header::USER_AGENT, USER_AGENT);
    if !cookie_header.is_empty() {
        request = request.header(reqwest::header::COOKIE, cookie_header);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        tracing::warn!(
            "Fallback download rejected with status {} for {}",
            response.status(),
            url
        );
        return Ok(None);
    }
    Ok(Some(response.bytes().await?.to_vec()))
}

/// Writes the invoice bytes to a uniquely named temp file that outlives the
/// handle; the engine owns deletion.
pub fn persist_invoice(bytes: &[u8]) -> Result<InvoiceFile> {
    let mut file = tempfile::Builder::new()
        .prefix("invoice-")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(bytes)?;
    let (handle, path) = file.keep().map_err(|e| CourierError::Io(e.error))?;
    drop(handle);

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "invoice.pdf".to_string());
    Ok(InvoiceFile { path, file_name })
}
