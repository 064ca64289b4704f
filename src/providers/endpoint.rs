//! Dialect detection and endpoint construction.
//!
//! Relay services expose both dialects under arbitrary prefixes, so a base URL
//! may arrive bare (`https://relay.example.com`), versioned (`.../v1`) or as a
//! complete endpoint. All three resolve to the same completion URL.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OPENAI_DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_PATH: &str = "/chat/completions";
const ANTHROPIC_PATH: &str = "/messages";
const DEFAULT_VERSION_SEGMENT: &str = "/v1";

static VERSION_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/v\d+[a-z0-9]*$").expect("valid version pattern"));

/// Wire protocol spoken by the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    OpenAi,
    Anthropic,
}

impl Dialect {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the dialect from the model name; anything mentioning "claude" speaks
/// the Anthropic protocol.
pub fn detect_dialect(model: &str) -> Dialect {
    if model.to_lowercase().contains("claude") {
        Dialect::Anthropic
    } else {
        Dialect::OpenAi
    }
}

/// Strips the trailing slash (collapsing a doubled one) without touching the
/// scheme separator.
pub fn normalize_base_url(url: &str) -> String {
    let (scheme, rest) = match url.find("://") {
        Some(idx) => url.split_at(idx + 3),
        None => ("", url),
    };

    let mut rest = rest.strip_suffix('/').unwrap_or(rest);
    rest = rest.strip_suffix('/').unwrap_or(rest);
    format!("{scheme}{rest}")
}

fn build_endpoint(base_url: &str, path: &str) -> String {
    let base = normalize_base_url(base_url);
    if base.ends_with(path) {
        base
    } else if VERSION_SEGMENT.is_match(&base) {
        format!("{base}{path}")
    } else {
        format!("{base}{DEFAULT_VERSION_SEGMENT}{path}")
    }
}

pub fn build_openai_endpoint(base_url: Option<&str>) -> String {
    match base_url {
        Some(base) => build_endpoint(base, OPENAI_PATH),
        None => OPENAI_DEFAULT_ENDPOINT.to_string(),
    }
}

pub fn build_anthropic_endpoint(base_url: &str) -> String {
    build_endpoint(base_url, ANTHROPIC_PATH)
}

const BROWSER_HEADERS: [(&str, &str); 8] = [
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    ),
    ("accept", "application/json, text/plain, */*"),
    ("accept-language", "zh-CN,zh;q=0.9,en;q=0.8"),
    ("dnt", "1"),
    ("connection", "keep-alive"),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
];

/// Headers that make the request look like ordinary browser traffic to
/// relays sitting behind bot filters.
pub fn browser_headers() -> HeaderMap {
    BROWSER_HEADERS
        .iter()
        .map(|(name, value)| {
            (
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            )
        })
        .collect()
}
