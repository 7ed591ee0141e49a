use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions};
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::pipeline::PageSource;

/// Fixed desktop user agent; some business sites serve reduced markup to
/// unknown agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Retrieves fully rendered page HTML through a per-request headless browser
/// session.
///
/// A cheap HTTP preflight runs first so unreachable hosts, timeouts, and
/// error statuses fail before a browser process is ever launched; the
/// response body is not read.
pub struct BrowserFetcher {
    http: Client,
    timeout: Duration,
}

impl BrowserFetcher {
    pub fn new(config: &AppConfig) -> Self {
        let http = Client::builder()
            .timeout(config.fetch_timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(5))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            timeout: config.fetch_timeout,
        }
    }

    /// Validate that `raw` is a well-formed http(s) URL.
    pub fn parse_target(raw: &str) -> Result<Url, FetchError> {
        let url = Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(FetchError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme {other:?}"),
            }),
        }
    }

    fn preflight(&self, url: &Url) -> Result<(), FetchError> {
        debug!(%url, "preflight request");
        let response = self.http.get(url.clone()).send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }

    /// Render the page in a scoped headless browser session.
    ///
    /// The `Browser` handle owns the underlying process; it is dropped on
    /// every exit path, which tears the session down.
    fn render(&self, url: &Url) -> Result<String, FetchError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .map_err(|e| FetchError::Browser(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| FetchError::Browser(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| FetchError::Browser(e.to_string()))?;
        tab.set_default_timeout(self.timeout);
        if let Err(e) = tab.set_user_agent(USER_AGENT, None, None) {
            warn!(error = %e, "could not set user agent on browser tab");
        }

        tab.navigate_to(url.as_str())
            .map_err(|e| self.browser_error(url, e))?;
        tab.wait_until_navigated()
            .map_err(|e| self.browser_error(url, e))?;
        tab.get_content()
            .map_err(|e| FetchError::Browser(e.to_string()))
    }

    fn browser_error(&self, url: &Url, err: anyhow::Error) -> FetchError {
        let text = err.to_string();
        if text.to_lowercase().contains("time") && text.to_lowercase().contains("out") {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Browser(text)
        }
    }
}

impl PageSource for BrowserFetcher {
    fn fetch(&self, raw_url: &str) -> Result<String, FetchError> {
        let url = Self::parse_target(raw_url)?;
        self.preflight(&url)?;
        info!(%url, "rendering page");
        let html = self.render(&url)?;
        info!(%url, bytes = html.len(), "page rendered");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_fetcher(timeout_secs: u64) -> BrowserFetcher {
        let config = AppConfig {
            api_token: None,
            api_base: crate::config::DEFAULT_API_BASE.to_string(),
            default_model: Default::default(),
            max_scrape_chars: 8_000,
            fetch_timeout: Duration::from_secs(timeout_secs),
        };
        BrowserFetcher::new(&config)
    }

    #[test]
    fn well_formed_http_urls_are_accepted() {
        assert!(BrowserFetcher::parse_target("https://example.com").is_ok());
        assert!(BrowserFetcher::parse_target("http://example.com/a?b=c").is_ok());
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let err = BrowserFetcher::parse_target("not a url").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        for raw in ["ftp://example.com/file", "file:///etc/passwd", "javascript:alert(1)"] {
            let err = BrowserFetcher::parse_target(raw).unwrap_err();
            assert!(matches!(err, FetchError::InvalidUrl { .. }), "{raw}");
        }
    }

    #[test]
    fn preflight_maps_error_statuses() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let fetcher = test_fetcher(5);
        let url = BrowserFetcher::parse_target(&server.url("/missing")).unwrap();
        let err = fetcher.preflight(&url).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[test]
    fn preflight_passes_success_statuses() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).body("<html></html>");
        });

        let fetcher = test_fetcher(5);
        let url = BrowserFetcher::parse_target(&server.url("/ok")).unwrap();
        assert!(fetcher.preflight(&url).is_ok());
    }

    #[test]
    fn unreachable_host_is_a_network_error() {
        // Port 1 is essentially never listening; connection is refused fast.
        let fetcher = test_fetcher(2);
        let url = BrowserFetcher::parse_target("http://127.0.0.1:1/").unwrap();
        let err = fetcher.preflight(&url).unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
