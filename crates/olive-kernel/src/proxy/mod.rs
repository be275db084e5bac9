//! Embedding proxy for external pages.
//!
//! External sites usually refuse to be framed. The proxy fetches them
//! server-side, strips the headers and tags that would block framing, and
//! rewrites every resource URL so it loads back through the proxy too.

mod fetch;
mod inject;
mod rewrite;

pub use fetch::{DEFAULT_USER_AGENT, ProxiedResponse, ProxyError, ProxyFetcher, parse_target};
pub use rewrite::ProxyRewriter;

/// Default path the proxy is served under.
pub const DEFAULT_PROXY_ENDPOINT: &str = "/proxy";

/// `Content-Security-Policy` sent with every proxied response.
pub const PROXY_CSP: &str = "default-src * 'unsafe-inline' 'unsafe-eval' data: blob:;";

/// `X-Frame-Options` sent with every proxied response.
pub const PROXY_FRAME_OPTIONS: &str = "ALLOWALL";

/// Encode a target URL for the `url` query parameter
/// (`application/x-www-form-urlencoded` byte serialization).
pub fn encode_target(absolute: &str) -> String {
    url::form_urlencoded::byte_serialize(absolute.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_target() {
        assert_eq!(
            encode_target("https://example.com/x.png?a=1&b=two words"),
            "https%3A%2F%2Fexample.com%2Fx.png%3Fa%3D1%26b%3Dtwo+words"
        );
    }
}
