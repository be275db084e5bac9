//! Upstream fetching for the proxy endpoint.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::ProxyRewriter;

/// Desktop Chrome user agent; many sites serve degraded pages otherwise.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

/// Errors from resolving or fetching a proxy target.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing ?url")]
    MissingTarget,
    #[error("invalid target url {target:?}: {source}")]
    InvalidTarget {
        target: String,
        source: url::ParseError,
    },
    #[error("unsupported scheme {0:?}; only http and https can be proxied")]
    UnsupportedScheme(String),
    #[error("http client setup failed: {0}")]
    Client(reqwest::Error),
    #[error("Request failed")]
    Request(#[from] reqwest::Error),
}

impl ProxyError {
    /// Returns true if the caller sent a bad target, as opposed to the
    /// upstream fetch failing.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingTarget | Self::InvalidTarget { .. } | Self::UnsupportedScheme(_)
        )
    }
}

/// Resolve the proxy target from request fields.
///
/// The `url` field names the target; every other field (from a rewritten
/// form submission) is appended to the target's query string.
pub fn parse_target(fields: &[(String, String)]) -> Result<Url, ProxyError> {
    let raw = fields
        .iter()
        .find(|(k, _)| k == "url")
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or(ProxyError::MissingTarget)?;

    let mut target = Url::parse(raw).map_err(|source| ProxyError::InvalidTarget {
        target: raw.to_string(),
        source,
    })?;
    if !matches!(target.scheme(), "http" | "https") {
        return Err(ProxyError::UnsupportedScheme(target.scheme().to_string()));
    }

    let extra: Vec<_> = fields.iter().filter(|(k, _)| k != "url").collect();
    if !extra.is_empty() {
        let mut pairs = target.query_pairs_mut();
        for (k, v) in extra {
            pairs.append_pair(k, v);
        }
    }
    Ok(target)
}

/// A fetched upstream response, ready to send back to the client.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    /// Upstream status code.
    pub status: u16,
    /// Final URL after redirects; relative references resolve against it.
    pub url: Url,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl ProxiedResponse {
    /// Returns true if the body is an HTML document.
    pub fn is_html(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("text/html")
    }

    /// Rewrite HTML bodies through `rewriter`. Anything else passes through
    /// with its original content type.
    pub fn rewrite(mut self, rewriter: &ProxyRewriter) -> Self {
        if self.is_html() {
            let rewritten = {
                let html = String::from_utf8_lossy(&self.body);
                rewriter.rewrite_html(&html, &self.url)
            };
            self.body = rewritten.into_bytes();
            self.content_type = "text/html; charset=utf-8".to_string();
        }
        self
    }
}

/// Fetches proxy targets with a browser user agent.
#[derive(Debug, Clone)]
pub struct ProxyFetcher {
    client: reqwest::Client,
}

impl ProxyFetcher {
    /// Build a fetcher. `timeout` of `None` means no deadline.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, ProxyError> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ProxyError::Client)?;
        Ok(Self { client })
    }

    /// Fetch `target` in full.
    pub async fn fetch(&self, target: &Url) -> Result<ProxiedResponse, ProxyError> {
        tracing::info!(%target, "proxying request");
        let response = self.client.get(target.clone()).send().await?;
        let status = response.status().as_u16();
        let url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?.to_vec();
        tracing::debug!(%url, status, bytes = body.len(), "upstream responded");

        Ok(ProxiedResponse {
            status,
            url,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_target() {
        let err = parse_target(&fields(&[("q", "x")])).unwrap_err();
        assert!(matches!(err, ProxyError::MissingTarget));
        assert_eq!(err.to_string(), "Missing ?url");
        assert!(parse_target(&fields(&[("url", "  ")])).is_err());
    }

    #[test]
    fn test_invalid_targets_are_client_errors() {
        let err = parse_target(&fields(&[("url", "not a url")])).unwrap_err();
        assert!(err.is_client_error());

        let err = parse_target(&fields(&[("url", "file:///etc/passwd")])).unwrap_err();
        assert!(matches!(err, ProxyError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_form_fields_join_the_query() {
        let target = parse_target(&fields(&[
            ("url", "https://example.com/search?lang=en"),
            ("q", "rust lang"),
        ]))
        .unwrap();
        assert_eq!(target.as_str(), "https://example.com/search?lang=en&q=rust+lang");
    }

    #[test]
    fn test_non_html_passes_through() {
        let response = ProxiedResponse {
            status: 200,
            url: Url::parse("https://example.com/a.css").unwrap(),
            content_type: "text/css".to_string(),
            body: b"body { background: url(/x.png) }".to_vec(),
        };
        let out = response.clone().rewrite(&ProxyRewriter::default());
        assert_eq!(out.body, response.body);
        assert_eq!(out.content_type, "text/css");
    }

    #[test]
    fn test_html_is_rewritten() {
        let response = ProxiedResponse {
            status: 200,
            url: Url::parse("https://example.com/").unwrap(),
            content_type: "Text/HTML; charset=ISO-8859-1".to_string(),
            body: br#"<img src="/x.png">"#.to_vec(),
        };
        let out = response.rewrite(&ProxyRewriter::default());
        let html = String::from_utf8(out.body).unwrap();
        assert!(html.contains("/proxy?url=https%3A%2F%2Fexample.com%2Fx.png"));
        assert_eq!(out.content_type, "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn test_unreachable_target_fails() {
        let fetcher = ProxyFetcher::new(DEFAULT_USER_AGENT, Some(Duration::from_secs(5))).unwrap();
        let target = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher.fetch(&target).await.unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Request failed");
    }
}
