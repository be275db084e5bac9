//! Client-side interception script injected into proxied pages.
//!
//! Markup rewriting only covers URLs present when the page is served. The
//! script catches the rest at runtime: element URL setters, `fetch`,
//! `XMLHttpRequest.open`, `src` on dynamically created scripts, and nodes
//! added later (via a `MutationObserver`).

use url::Url;

const SCRIPT_BODY: &str = r#"
  window.__proxyBase = base;
  var marker = endpoint + '?url=';
  function skip(value) {
    return typeof value !== 'string' || value === '' ||
      /^\s*(data|blob|javascript):/i.test(value) || value.indexOf(marker) === 0;
  }
  function proxied(value) {
    if (skip(value)) return value;
    try {
      return marker + encodeURIComponent(new URL(value, base).toString());
    } catch (e) {
      return value;
    }
  }
  var setters = {
    HTMLImageElement: ['src'], HTMLScriptElement: ['src'], HTMLLinkElement: ['href'],
    HTMLIFrameElement: ['src'], HTMLSourceElement: ['src'], HTMLVideoElement: ['src', 'poster'],
    HTMLAudioElement: ['src'], HTMLEmbedElement: ['src'], HTMLObjectElement: ['data'],
    HTMLTrackElement: ['src'], HTMLAnchorElement: ['href'], HTMLAreaElement: ['href']
  };
  Object.keys(setters).forEach(function (name) {
    var iface = window[name];
    if (!iface) return;
    setters[name].forEach(function (prop) {
      var desc = Object.getOwnPropertyDescriptor(iface.prototype, prop);
      if (!desc || !desc.set) return;
      Object.defineProperty(iface.prototype, prop, {
        get: desc.get,
        set: function (value) { desc.set.call(this, proxied(value)); },
        configurable: true
      });
    });
  });
  var attrs = {
    img: ['src'], script: ['src'], link: ['href'], iframe: ['src'], source: ['src'],
    video: ['src', 'poster'], audio: ['src'], form: ['action'], a: ['href'], area: ['href'],
    embed: ['src'], object: ['data'], track: ['src']
  };
  function rewriteTree(node) {
    if (!node || node.nodeType !== 1) return;
    var names = attrs[node.tagName.toLowerCase()] || [];
    names.forEach(function (attr) {
      var value = node.getAttribute(attr);
      var next = proxied(value);
      if (value !== null && next !== value) node.setAttribute(attr, next);
    });
    Array.prototype.forEach.call(node.children || [], rewriteTree);
  }
  var originalFetch = window.fetch;
  if (originalFetch) {
    window.fetch = function (input, init) {
      if (typeof input === 'string') {
        input = proxied(input);
      } else if (input && input.url && !skip(input.url)) {
        input = new Request(proxied(input.url), input);
      }
      return originalFetch.call(this, input, init);
    };
  }
  var originalOpen = XMLHttpRequest.prototype.open;
  XMLHttpRequest.prototype.open = function (method, url) {
    var args = Array.prototype.slice.call(arguments);
    args[1] = proxied(String(url));
    return originalOpen.apply(this, args);
  };
  var originalCreate = document.createElement;
  document.createElement = function (tagName) {
    var el = originalCreate.apply(document, arguments);
    if (String(tagName).toLowerCase() === 'script') {
      var originalSet = el.setAttribute;
      el.setAttribute = function (name, value) {
        if (String(name).toLowerCase() === 'src') value = proxied(value);
        return originalSet.call(el, name, value);
      };
    }
    return el;
  };
  function watch() {
    rewriteTree(document.body);
    new MutationObserver(function (mutations) {
      mutations.forEach(function (m) {
        Array.prototype.forEach.call(m.addedNodes, rewriteTree);
      });
    }).observe(document.documentElement, { childList: true, subtree: true });
  }
  if (document.body) watch(); else document.addEventListener('DOMContentLoaded', watch);
"#;

/// Render the `<script>` element for a page fetched from `base`.
pub(crate) fn interception_script(base: &Url, endpoint: &str) -> String {
    format!(
        "<script>(function () {{\n  var base = {};\n  var endpoint = {};{SCRIPT_BODY}}})();</script>",
        js_string(base.as_str()),
        js_string(endpoint),
    )
}

/// A JSON string literal that is also safe inside an HTML `<script>`.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace("</", "<\\/")
}
