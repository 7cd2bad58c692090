//! XHTML normalization for Confluence storage format.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Namespace of `ac:` elements.
pub const AC_NAMESPACE: &str = "http://atlassian.com/content";

/// Namespace of `ri:` elements.
pub const RI_NAMESPACE: &str = "http://atlassian.com/resource/identifier";

static VOID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(hr|br|img|input|meta|link)\b([^>]*?)\s*/?>").unwrap()
});

/// Named entity, decimal or hexadecimal character reference at the start of the input.
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);").unwrap()
});

/// Turn an HTML fragment into a namespaced XHTML fragment.
///
/// Void elements are self-closed and bare ampersands escaped. Everything
/// else passes through unchanged.
#[must_use]
pub fn normalize(html: &str) -> String {
    let body = close_void_elements(html);
    let body = escape_bare_ampersands(&body);
    format!(
        r#"<ac:confluence xmlns:ac="{AC_NAMESPACE}" xmlns:ri="{RI_NAMESPACE}">{body}</ac:confluence>"#
    )
}

fn close_void_elements(html: &str) -> Cow<'_, str> {
    VOID_TAG.replace_all(html, |caps: &Captures<'_>| {
        format!("<{}{} />", caps[1].to_ascii_lowercase(), &caps[2])
    })
}

fn escape_bare_ampersands(html: &str) -> Cow<'_, str> {
    if !html.contains('&') {
        return Cow::Borrowed(html);
    }

    let mut out = String::with_capacity(html.len() + 16);
    let mut rest = html;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if ENTITY.is_match(tail) {
            out.push('&');
        } else {
            out.push_str("&amp;");
        }
        rest = &tail[1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}
