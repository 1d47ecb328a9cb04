//! Headless-browser fetch mode.
//!
//! Navigates with headless Chromium (`--dump-dom`) and dispatches the same
//! callback registrations the static mode uses. A rendered document whose
//! body is a bare JSON payload is unwrapped and handed to response
//! callbacks instead.

use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{error, info, warn};
use url::Url;

use crate::element::dispatch_html;
use crate::error::{Result, ScrapeError};
use crate::fetcher::{HtmlCallback, Response, ResponseCallback};

const BROWSER_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser-mode fetcher with its own callback registrations, for sources
/// that never work in static mode.
pub struct BrowserFetcher {
    url: String,
    ua: Option<String>,
    html_callbacks: Vec<(String, HtmlCallback)>,
    response_callbacks: Vec<ResponseCallback>,
}

impl BrowserFetcher {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ua: None,
            html_callbacks: Vec::new(),
            response_callbacks: Vec::new(),
        }
    }

    pub fn with_ua(mut self, ua: &str) -> Self {
        if !ua.is_empty() {
            self.ua = Some(ua.to_string());
        }
        self
    }

    pub fn on_html(
        &mut self,
        selector: &str,
        f: impl for<'a> FnMut(&crate::element::Element<'a>) + Send + Sync + 'static,
    ) {
        self.html_callbacks.push((selector.to_string(), Box::new(f)));
    }

    pub fn on_response(&mut self, f: impl FnMut(&Response) + Send + Sync + 'static) {
        self.response_callbacks.push(Box::new(f));
    }

    pub async fn start(&mut self) {
        run_callbacks(
            &self.url,
            self.ua.as_deref(),
            &mut self.html_callbacks,
            &mut self.response_callbacks,
        )
        .await;
    }
}

/// Navigate and dispatch. Shared by `BrowserFetcher` and the static
/// fetcher's 403 escalation path.
pub(crate) async fn run_callbacks(
    url: &str,
    ua: Option<&str>,
    html_callbacks: &mut [(String, HtmlCallback)],
    response_callbacks: &mut [ResponseCallback],
) {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(url, error = %e, "Invalid browser URL");
            return;
        }
    };

    let html = match render(url, ua).await {
        Ok(html) => html,
        Err(e) => {
            error!(url, error = %e, "Browser navigation failed");
            return;
        }
    };

    if html.trim().is_empty() {
        warn!(url, fetcher = "browser", "Empty DOM output");
        return;
    }

    if let Some(json_text) = json_payload(&html) {
        let response = Response {
            status: 200,
            body: json_text.into_bytes(),
            url: parsed,
        };
        for callback in response_callbacks {
            callback(&response);
        }
        return;
    }

    dispatch_html(&html, &parsed, html_callbacks);
}

/// Launch Chromium `--dump-dom` and return the rendered document.
pub(crate) async fn render(url: &str, ua: Option<&str>) -> Result<String> {
    let parsed = Url::parse(url)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ScrapeError::Browser(format!(
            "Only http/https URLs allowed, got: {}",
            parsed.scheme()
        )));
    }

    let chrome_bin = std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string());
    let tmp_dir = tempfile::tempdir()
        .map_err(|e| ScrapeError::Browser(format!("Failed to create temp profile dir: {e}")))?;

    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-gpu".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--user-data-dir={}", tmp_dir.path().display()),
    ];
    if let Some(ua) = ua {
        args.push(format!("--user-agent={ua}"));
    }
    args.push("--dump-dom".to_string());
    args.push(url.to_string());

    info!(url, fetcher = "browser", "Navigating");

    let output = tokio::time::timeout(
        BROWSER_TIMEOUT,
        tokio::process::Command::new(&chrome_bin).args(&args).output(),
    )
    .await
    .map_err(|_| ScrapeError::Browser(format!("Browser timed out after 30s for {url}")))?
    .map_err(|e| ScrapeError::Browser(format!("Failed to run browser for {url}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(url, fetcher = "browser", stderr = %stderr, "Browser exited with error");
        return Ok(String::new());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Unwrap a JSON payload rendered by the browser's plain-text viewer.
/// Chromium wraps non-HTML bodies in a minimal document with the raw text
/// inside `<pre>`.
fn json_payload(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let pre = Selector::parse("body > pre").ok()?;
    let text: String = document
        .select(&pre)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join("");
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_viewer_documents_are_unwrapped() {
        let html = r#"<html><head></head><body><pre>{"data": {"vos": []}}</pre></body></html>"#;
        let payload = json_payload(html).unwrap();
        assert_eq!(payload, r#"{"data": {"vos": []}}"#);
    }

    #[test]
    fn regular_documents_are_not_json() {
        let html = "<html><body><article><h1>Title</h1></article></body></html>";
        assert!(json_payload(html).is_none());
        let pre_but_not_json = "<html><body><pre>plain text</pre></body></html>";
        assert!(json_payload(pre_but_not_json).is_none());
    }
}
