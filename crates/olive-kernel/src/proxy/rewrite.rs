//! HTML and CSS rewriting for proxied pages.
//!
//! Markup goes through a streaming HTML rewriter, so comments, raw-text
//! elements and every untouched tag come out byte-for-byte. `<style>` bodies
//! get their `url()` references rewritten; `<script>` bodies are left alone.

use std::cell::Cell;
use std::sync::LazyLock;

use lol_html::errors::{AttributeNameError, RewritingError};
use lol_html::html_content::{ContentType, Element};
use lol_html::{RewriteStrSettings, element, rewrite_str, text};
use regex::{Captures, Regex};
use scraper::{ElementRef, Html};
use url::Url;

use super::inject::interception_script;
use super::{DEFAULT_PROXY_ENDPOINT, encode_target};

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#).expect("static regex")
});

// Candidate spots for the interception script, in order of preference.
const BEFORE_SCRIPT: &str = "<!--olive:before-script-->";
const HEAD_END: &str = "<!--olive:head-end-->";
const BODY_END: &str = "<!--olive:body-end-->";

/// The attribute carrying a URL for each rewritten element.
fn url_attribute(tag: &str) -> Option<&'static str> {
    match tag {
        "img" | "script" | "iframe" | "source" | "video" | "audio" | "embed" | "track" => {
            Some("src")
        }
        "link" | "a" | "area" => Some("href"),
        "form" => Some("action"),
        "object" => Some("data"),
        _ => None,
    }
}

/// Rewrites page markup so every resource loads back through the proxy.
#[derive(Debug, Clone)]
pub struct ProxyRewriter {
    endpoint: String,
}

impl Default for ProxyRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_ENDPOINT)
    }
}

impl ProxyRewriter {
    /// Create a rewriter that points resources at `endpoint` (e.g. `/proxy`).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// The proxy endpoint path.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `<endpoint>?url=<encoded absolute>`.
    pub fn proxied(&self, absolute: &str) -> String {
        format!("{}?url={}", self.endpoint, encode_target(absolute))
    }

    /// Returns true for values that must not be routed through the proxy.
    fn is_exempt(&self, value: &str) -> bool {
        let lower = value.trim_start().to_ascii_lowercase();
        lower.starts_with("data:")
            || lower.starts_with("blob:")
            || lower.starts_with("javascript:")
            || value.starts_with(&format!("{}?url=", self.endpoint))
    }

    fn resolve(&self, value: &str, base: &Url) -> Option<Url> {
        match base.join(value) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(value, error = %e, "leaving unresolvable url unchanged");
                None
            }
        }
    }

    /// Rewrite `url(...)` references in a stylesheet or a `style` attribute.
    pub fn rewrite_css(&self, css: &str, base: &Url) -> String {
        CSS_URL
            .replace_all(css, |caps: &Captures| {
                let (quote, value) = match (caps.get(1), caps.get(2), caps.get(3)) {
                    (Some(m), _, _) => ("\"", m.as_str()),
                    (_, Some(m), _) => ("'", m.as_str()),
                    (_, _, m) => ("", m.map_or("", |m| m.as_str())),
                };
                let value = value.trim();
                if value.is_empty() || self.is_exempt(value) {
                    return caps[0].to_string();
                }
                match self.resolve(value, base) {
                    Some(abs) => format!("url({quote}{}{quote})", self.proxied(abs.as_str())),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Rewrite an HTML document fetched from `base`.
    pub fn rewrite_html(&self, html: &str, base: &Url) -> String {
        let script = interception_script(base, &self.endpoint);
        match self.rewrite_markup(html, base) {
            Ok(out) => place_script(out, &script),
            Err(e) => {
                tracing::warn!(%base, error = %e, "html rewrite failed, serving page as fetched");
                format!("{script}{html}")
            }
        }
    }

    /// Rewrite elements and stylesheets, leaving markers where the
    /// interception script may go.
    fn rewrite_markup(&self, html: &str, base: &Url) -> Result<String, RewritingError> {
        let seen_script = Cell::new(false);
        let seen_head = Cell::new(false);
        let seen_body = Cell::new(false);
        let mut stylesheet = String::new();

        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("base", |el| {
                        el.remove();
                        Ok(())
                    }),
                    element!("meta[http-equiv]", |el| {
                        let csp = el.get_attribute("http-equiv").is_some_and(|v| {
                            decode_attr(v)
                                .trim()
                                .eq_ignore_ascii_case("content-security-policy")
                        });
                        if csp {
                            el.remove();
                        }
                        Ok(())
                    }),
                    element!("script", |el| {
                        if !seen_script.replace(true) {
                            el.before(BEFORE_SCRIPT, ContentType::Html);
                        }
                        Ok(())
                    }),
                    element!("head", |el| {
                        if !seen_head.replace(true) {
                            el.append(HEAD_END, ContentType::Html);
                        }
                        Ok(())
                    }),
                    element!("body", |el| {
                        if !seen_body.replace(true) {
                            el.append(BODY_END, ContentType::Html);
                        }
                        Ok(())
                    }),
                    element!("*", |el| {
                        self.rewrite_element(el, base)?;
                        Ok(())
                    }),
                    text!("style", |chunk| {
                        stylesheet.push_str(chunk.as_str());
                        if chunk.last_in_text_node() {
                            let css = self.rewrite_css(&stylesheet, base);
                            chunk.replace(&css, ContentType::Html);
                            stylesheet.clear();
                        } else {
                            chunk.remove();
                        }
                        Ok(())
                    }),
                ],
                strict: false,
                ..RewriteStrSettings::default()
            },
        )
    }

    /// Rewrite the URL-bearing attributes of one element.
    fn rewrite_element(
        &self,
        el: &mut Element<'_, '_>,
        base: &Url,
    ) -> Result<(), AttributeNameError> {
        if let Some(style) = el.get_attribute("style").map(decode_attr) {
            let rewritten = self.rewrite_css(&style, base);
            if rewritten != style {
                set_attr(el, "style", &rewritten)?;
            }
        }

        let name = el.tag_name();
        let Some(attr) = url_attribute(&name) else {
            return Ok(());
        };
        let Some(value) = el.get_attribute(attr).map(decode_attr) else {
            return Ok(());
        };
        let value = value.trim();
        if value.is_empty() || self.is_exempt(value) {
            return Ok(());
        }
        let Some(absolute) = self.resolve(value, base) else {
            return Ok(());
        };

        match name.as_str() {
            "form" => {
                let multipart = el
                    .get_attribute("enctype")
                    .is_some_and(|e| e.eq_ignore_ascii_case("multipart/form-data"));
                if multipart {
                    set_attr(el, "enctype", "application/x-www-form-urlencoded")?;
                }
                set_attr(el, "action", &self.endpoint)?;
                el.prepend(
                    &format!(
                        r#"<input type="hidden" name="url" value="{}">"#,
                        escape_attr(absolute.as_str())
                    ),
                    ContentType::Html,
                );
            }
            "a" | "area" => {
                set_attr(el, "href", "#")?;
                set_attr(
                    el,
                    "onclick",
                    &format!(
                        "event.preventDefault(); location.href='{}'",
                        self.proxied(absolute.as_str())
                    ),
                )?;
            }
            _ => set_attr(el, attr, &self.proxied(absolute.as_str()))?,
        }
        Ok(())
    }
}

/// Swap the best available marker for `script` and drop the rest. Pages
/// with no script, head or body get it at the very start.
fn place_script(mut out: String, script: &str) -> String {
    let mut placed = false;
    for mark in [BEFORE_SCRIPT, HEAD_END, BODY_END] {
        if !placed && out.contains(mark) {
            out = out.replacen(mark, script, 1);
            placed = true;
        }
        out = out.replace(mark, "");
    }
    if !placed {
        out.insert_str(0, script);
    }
    out
}

/// The rewriter writes attribute values as given, escaping only `"`.
fn set_attr(el: &mut Element<'_, '_>, name: &str, value: &str) -> Result<(), AttributeNameError> {
    el.set_attribute(name, &value.replace('&', "&amp;"))
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Resolve character references in an attribute value as written in the
/// markup, the way a browser would read it.
fn decode_attr(raw: String) -> String {
    if !raw.contains('&') {
        return raw;
    }
    let fragment = Html::parse_fragment(&format!(
        r#"<a title="{}"></a>"#,
        raw.replace('"', "&quot;")
    ));
    fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find_map(|el| el.value().attr("title").map(str::to_string))
        .unwrap_or(raw)
}
