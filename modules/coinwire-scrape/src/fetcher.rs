//! The uniform fetch abstraction.
//!
//! Static mode issues one pooled HTTP request with a browser-like header
//! set; a 403 escalates to the headless-browser mode transparently,
//! re-running the same callback registrations. Transport errors retry with
//! a short backoff before the traversal step is abandoned.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tracing::{error, info, warn};
use url::Url;

use crate::browser;
use crate::element::{dispatch_html, Element};

pub type HtmlCallback = Box<dyn for<'a> FnMut(&Element<'a>) + Send + Sync>;
pub type ResponseCallback = Box<dyn FnMut(&Response) + Send + Sync>;

/// Raw response handed to `on_response` callbacks: JSON bodies in static
/// mode, JSON payloads rendered by the browser, and non-2xx statuses the
/// adapter wants to react to.
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
    pub url: Url,
}

impl Response {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

const RETRIES: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Recent desktop Chrome user agents, rotated per fetch.
const DESKTOP_UAS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36",
];

pub(crate) fn random_ua() -> &'static str {
    DESKTOP_UAS[rand::rng().random_range(0..DESKTOP_UAS.len())]
}

/// Key-exchange groups offered in the TLS hello: the set anti-bot
/// heuristics expect from a real browser. rustls ships no P-521 group, so
/// the narrowing covers the remaining three.
fn narrowed_kx_groups() -> Vec<&'static dyn rustls::crypto::SupportedKxGroup> {
    vec![
        rustls::crypto::ring::kx_group::SECP256R1,
        rustls::crypto::ring::kx_group::SECP384R1,
        rustls::crypto::ring::kx_group::X25519,
    ]
}

fn tls_config() -> rustls::ClientConfig {
    let provider = rustls::crypto::CryptoProvider {
        kx_groups: narrowed_kx_groups(),
        ..rustls::crypto::ring::default_provider()
    };

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config = rustls::ClientConfig::builder_with_provider(provider.into())
        .with_safe_default_protocol_versions()
        .expect("TLS protocol versions are supported")
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    config
}

pub struct Fetcher {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
    ua_override: Option<String>,
    html_callbacks: Vec<(String, HtmlCallback)>,
    response_callbacks: Vec<ResponseCallback>,
}

impl Fetcher {
    pub fn new(url: &str) -> Self {
        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls_config())
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(20))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            url: url.to_string(),
            headers: HashMap::new(),
            ua_override: None,
            html_callbacks: Vec::new(),
            response_callbacks: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_ua(mut self, ua: &str) -> Self {
        if !ua.is_empty() {
            self.ua_override = Some(ua.to_string());
        }
        self
    }

    /// Sibling-endpoint traversal under one session: same connection pool
    /// and default headers, fresh callback set.
    pub fn clone_for(&self, url: &str) -> Self {
        Self {
            client: self.client.clone(),
            url: url.to_string(),
            headers: self.headers.clone(),
            ua_override: self.ua_override.clone(),
            html_callbacks: Vec::new(),
            response_callbacks: Vec::new(),
        }
    }

    pub fn on_html(&mut self, selector: &str, f: impl for<'a> FnMut(&Element<'a>) + Send + Sync + 'static) {
        self.html_callbacks.push((selector.to_string(), Box::new(f)));
    }

    pub fn on_response(&mut self, f: impl FnMut(&Response) + Send + Sync + 'static) {
        self.response_callbacks.push(Box::new(f));
    }

    /// Fetch the URL and dispatch callbacks. HTML bodies run the selector
    /// callbacks synchronously in document order; JSON bodies and non-2xx
    /// statuses go to the response callbacks. Callbacks never run
    /// concurrently for one fetcher.
    pub async fn start(&mut self) {
        let parsed = match Url::parse(&self.url) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(url = %self.url, error = %e, "Invalid fetch URL");
                return;
            }
        };

        info!(url = %self.url, "Visiting");

        let mut attempt = 0;
        let response = loop {
            match self.issue().await {
                Ok(resp) => break resp,
                Err(e) => {
                    attempt += 1;
                    if attempt > RETRIES {
                        error!(url = %self.url, error = %e, "Giving up after retries");
                        return;
                    }
                    warn!(url = %self.url, attempt, error = %e, "Request failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        };

        let status = response.status().as_u16();

        if status == 403 {
            // Anti-bot wall: re-run the same registrations through the
            // headless browser.
            info!(url = %self.url, "Forbidden in static mode, escalating to browser");
            browser::run_callbacks(
                &self.url,
                self.ua_override.as_deref(),
                &mut self.html_callbacks,
                &mut self.response_callbacks,
            )
            .await;
            return;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                error!(url = %self.url, error = %e, "Failed to read response body");
                return;
            }
        };

        if (200..300).contains(&status) && content_type.contains("text/html") {
            let html = String::from_utf8_lossy(&body);
            dispatch_html(&html, &parsed, &mut self.html_callbacks);
        } else {
            // JSON bodies and every other status are the adapter's call.
            let response = Response {
                status,
                body,
                url: parsed,
            };
            for callback in &mut self.response_callbacks {
                callback(&response);
            }
        }

        info!(url = %self.url, status, "Finished");
    }

    async fn issue(&self) -> reqwest::Result<reqwest::Response> {
        let ua = self
            .ua_override
            .clone()
            .unwrap_or_else(|| random_ua().to_string());

        let mut request = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, ua)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5");

        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        request.send().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::NamedGroup;

    #[test]
    fn kx_groups_are_narrowed_to_the_browser_set() {
        let names: Vec<NamedGroup> = narrowed_kx_groups().iter().map(|g| g.name()).collect();
        assert_eq!(
            names,
            vec![
                NamedGroup::secp256r1,
                NamedGroup::secp384r1,
                NamedGroup::X25519
            ]
        );
    }

    #[test]
    fn tls_config_prefers_http2() {
        let config = tls_config();
        assert_eq!(config.alpn_protocols[0], b"h2".to_vec());
    }
}
