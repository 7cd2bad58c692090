//! Placeholder tokens.
//!
//! A token stands in for an image while the document travels through the
//! Markdown to HTML serializer, and is resolved into Confluence markup
//! afterwards.
//!
//! ```text
//! U+E000 "md2cf:" kind ":" target ":" key=value *(";" key=value) U+E001
//! ```
//!
//! `kind` is `attachment` or `url`. Target, keys and values are
//! percent-encoded so only `A-Z a-z 0-9 - . _ ~ %` appear between the
//! delimiters, none of which an HTML serializer escapes. The delimiters are
//! private-use code points that are stripped from all document input, so a
//! token can only come from [`Placeholder::to_token`].

use std::borrow::Cow;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::{Captures, Regex};

/// Opening token delimiter.
pub const OPEN: char = '\u{E000}';

/// Closing token delimiter.
pub const CLOSE: char = '\u{E001}';

/// Characters left unencoded inside a token.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Regex source matching one token; shared with the anchor-unwrapping pattern.
pub(crate) const TOKEN_SOURCE: &str =
    "\u{E000}md2cf:(attachment|url):([A-Za-z0-9._~%-]*):([A-Za-z0-9._~%=;-]*)\u{E001}";

pub(crate) static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(TOKEN_SOURCE).unwrap());

/// What a placeholder points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// File uploaded next to the page, referenced by filename.
    Attachment,
    /// External image referenced by URL.
    Url,
}

impl PlaceholderKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Url => "url",
        }
    }
}

/// An image reference deferred until after HTML serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    /// Attachment filename or image URL.
    pub target: String,
    /// Ordered `key=value` parameters such as `width`.
    pub params: Vec<(String, String)>,
}

impl Placeholder {
    #[must_use]
    pub fn attachment(filename: impl Into<String>) -> Self {
        Self {
            kind: PlaceholderKind::Attachment,
            target: filename.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            kind: PlaceholderKind::Url,
            target: url.into(),
            params: Vec::new(),
        }
    }

    /// Set `key`, replacing an earlier value.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.params.push((key, value)),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(key, value);
        self
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize into a token.
    #[must_use]
    pub fn to_token(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect();
        format!(
            "{OPEN}md2cf:{}:{}:{}{CLOSE}",
            self.kind.as_str(),
            encode(&self.target),
            params.join(";")
        )
    }

    /// Parse a complete token. Returns `None` for anything else.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let caps = TOKEN_PATTERN.captures(token)?;
        if caps.get(0)?.as_str().len() != token.len() {
            return None;
        }
        Self::from_captures(&caps)
    }

    pub(crate) fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let kind = match caps.get(1)?.as_str() {
            "attachment" => PlaceholderKind::Attachment,
            "url" => PlaceholderKind::Url,
            _ => return None,
        };
        let target = decode(caps.get(2)?.as_str())?;

        let mut params = Vec::new();
        for pair in caps.get(3)?.as_str().split(';').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=')?;
            params.push((decode(key)?, decode(value)?));
        }

        Some(Self {
            kind,
            target,
            params,
        })
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

fn decode(value: &str) -> Option<String> {
    percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

/// Remove the reserved delimiter code points from document input.
#[must_use]
pub fn strip_reserved(text: &str) -> Cow<'_, str> {
    if text.contains([OPEN, CLOSE]) {
        Cow::Owned(text.replace([OPEN, CLOSE], ""))
    } else {
        Cow::Borrowed(text)
    }
}
