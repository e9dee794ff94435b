//! Sanitizer Gate
//!
//! Every replacement payload passes through here before it can become nodes.
//! The gate is the only constructor of [`SanitizedMarkup`], and
//! [`DocumentTree::import`](crate::dom::DocumentTree::import) only accepts
//! that type, so "sanitize before parse" holds by construction.
//!
//! The policy itself sits behind the [`Sanitizer`] trait. The default
//! [`AllowlistSanitizer`] walks the payload with `tl` and writes back only
//! what is safe to insert into the live page.

use std::fmt::Write as _;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::config::SanitizeConfig;
use crate::utils::html::{
    decode_entities, escape_attr, is_raw_text_element, is_void_element, normalize_bare_attrs,
};

// =============================================================================
// Sanitizer Trait
// =============================================================================

/// Markup sanitation policy. Must be pure: same input, same output, no
/// side effects on the page.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, markup: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn sanitize(&self, markup: &str) -> String {
        self(markup)
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Markup that has been through a [`Sanitizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedMarkup(String);

impl SanitizedMarkup {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Cheap to clone; shared between the reconciler and its callers.
#[derive(Clone)]
pub struct SanitizerGate {
    inner: Arc<dyn Sanitizer>,
}

impl SanitizerGate {
    pub fn new(sanitizer: impl Sanitizer + 'static) -> Self {
        Self {
            inner: Arc::new(sanitizer),
        }
    }

    pub fn sanitize(&self, raw: &str) -> SanitizedMarkup {
        SanitizedMarkup(self.inner.sanitize(raw))
    }
}

impl Default for SanitizerGate {
    fn default() -> Self {
        Self::new(AllowlistSanitizer::default())
    }
}

impl std::fmt::Debug for SanitizerGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanitizerGate").finish_non_exhaustive()
    }
}

// =============================================================================
// Allowlist Sanitizer
// =============================================================================

/// Elements removed together with everything inside them.
const FORBIDDEN_TAGS: &[&str] = &[
    "script", "iframe", "frame", "frameset", "object", "embed", "applet", "base", "meta", "link",
    "noscript", "template",
];

/// Attributes whose value is dereferenced as a URL.
const URL_ATTRS: &[&str] = &[
    "href",
    "src",
    "action",
    "formaction",
    "xlink:href",
    "poster",
    "background",
];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Default policy: drop executable content, keep everything else verbatim.
#[derive(Debug, Clone)]
pub struct AllowlistSanitizer {
    forbidden: FxHashSet<String>,
    keep_comments: bool,
}

impl Default for AllowlistSanitizer {
    fn default() -> Self {
        Self::from_config(&SanitizeConfig::default())
    }
}

impl AllowlistSanitizer {
    pub fn from_config(config: &SanitizeConfig) -> Self {
        let forbidden = FORBIDDEN_TAGS
            .iter()
            .map(|t| (*t).to_string())
            .chain(
                config
                    .extra_forbidden_tags
                    .iter()
                    .map(|t| t.to_ascii_lowercase()),
            )
            .collect();
        Self {
            forbidden,
            keep_comments: config.keep_comments,
        }
    }

    fn write_node(&self, handle: tl::NodeHandle, parser: &tl::Parser, out: &mut String) {
        let Some(node) = handle.get(parser) else {
            return;
        };
        match node {
            tl::Node::Tag(tag) => {
                let name = tag.name().as_utf8_str().to_ascii_lowercase();
                if !is_valid_name(&name) || self.forbidden.contains(&name) {
                    return;
                }

                out.push('<');
                out.push_str(&name);
                for (key, value) in tag.attributes().iter() {
                    let key = key.to_ascii_lowercase();
                    let raw = value.unwrap_or_default();
                    let value = decode_entities(&raw);
                    if !is_allowed_attr(&key, &value) {
                        continue;
                    }
                    let _ = write!(out, " {key}=\"{}\"", escape_attr(&value));
                }
                out.push('>');

                if is_void_element(&name) {
                    return;
                }
                if is_raw_text_element(&name) {
                    out.push_str(&tag.inner_text(parser));
                } else {
                    for child in tag.children().top().iter() {
                        self.write_node(*child, parser, out);
                    }
                }
                let _ = write!(out, "</{name}>");
            }
            tl::Node::Raw(bytes) => out.push_str(&bytes.as_utf8_str()),
            tl::Node::Comment(bytes) => {
                if self.keep_comments {
                    let raw = bytes.as_utf8_str();
                    let text = raw
                        .strip_prefix("<!--")
                        .and_then(|s| s.strip_suffix("-->"))
                        .unwrap_or(raw.as_ref());
                    let _ = write!(out, "<!--{text}-->");
                }
            }
        }
    }
}

impl Sanitizer for AllowlistSanitizer {
    fn sanitize(&self, markup: &str) -> String {
        let markup = normalize_bare_attrs(markup);
        let Ok(dom) = tl::parse(&markup, tl::ParserOptions::default()) else {
            return String::new();
        };
        let parser = dom.parser();
        let mut out = String::with_capacity(markup.len());
        for handle in dom.children() {
            self.write_node(*handle, parser, &mut out);
        }
        out
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

fn is_allowed_attr(name: &str, value: &str) -> bool {
    if !is_valid_name(name) || name.starts_with("on") || name == "srcdoc" {
        return false;
    }
    if !URL_ATTRS.contains(&name) {
        return true;
    }
    let url = normalize_url(value);
    if name == "src" && url.starts_with("data:image/") {
        return true;
    }
    !BLOCKED_SCHEMES.iter().any(|scheme| url.starts_with(scheme))
}

/// Lower-case the decoded value and drop whitespace/control characters.
fn normalize_url(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
