//! Placeholder resolution into Confluence image macros.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::placeholder::{Placeholder, PlaceholderKind, TOKEN_PATTERN, TOKEN_SOURCE};

/// A link whose only content is a token.
static LINKED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i:<a\b[^>]*>)\s*({TOKEN_SOURCE})\s*(?i:</a>)")).unwrap()
});

static STRIKETHROUGH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)(?:del|s|strike)\b[^>]*>").unwrap());

const STRIKE_OPEN: &str = r#"<span style="text-decoration: line-through;">"#;
const STRIKE_CLOSE: &str = "</span>";

/// Replaces placeholder tokens in serialized HTML.
///
/// Native image dimensions are read from the asset directory once per
/// filename and remembered for the lifetime of the resolver.
#[derive(Debug)]
pub struct PlaceholderResolver {
    image_dir: PathBuf,
    dimensions: HashMap<String, Option<(u32, u32)>>,
}

impl PlaceholderResolver {
    #[must_use]
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            dimensions: HashMap::new(),
        }
    }

    /// Resolve every token in `html` and rewrite strikethrough elements.
    pub fn resolve(&mut self, html: &str) -> String {
        let html = LINKED_TOKEN.replace_all(html, "${1}");
        let html = TOKEN_PATTERN.replace_all(&html, |caps: &Captures<'_>| {
            match Placeholder::from_captures(caps) {
                Some(placeholder) => self.image_macro(&placeholder),
                None => caps[0].to_owned(),
            }
        });
        STRIKETHROUGH
            .replace_all(&html, |caps: &Captures<'_>| {
                if caps[1].is_empty() {
                    STRIKE_OPEN
                } else {
                    STRIKE_CLOSE
                }
            })
            .into_owned()
    }

    fn image_macro(&mut self, placeholder: &Placeholder) -> String {
        let width = placeholder.param("width").map(strip_px);
        let height = placeholder.param("height").map(strip_px);

        let mut out = String::from("<ac:image");
        if let Some(width) = width {
            out.push_str(&format!(r#" ac:width="{}""#, escape_attribute(width)));
        }
        if let Some(height) = height {
            out.push_str(&format!(r#" ac:height="{}""#, escape_attribute(height)));
        }
        if width.is_some() || height.is_some() {
            out.push_str(r#" ac:thumbnail="true""#);
        }
        if placeholder.kind == PlaceholderKind::Attachment
            && let Some((w, h)) = self.native_dimensions(&placeholder.target)
        {
            out.push_str(&format!(
                r#" ac:original-width="{w}" ac:original-height="{h}""#
            ));
        }
        out.push('>');

        let target = escape_attribute(&placeholder.target);
        match placeholder.kind {
            PlaceholderKind::Attachment => {
                out.push_str(&format!(r#"<ri:attachment ri:filename="{target}" />"#));
            }
            PlaceholderKind::Url => out.push_str(&format!(r#"<ri:url ri:value="{target}" />"#)),
        }
        out.push_str("</ac:image>");
        out
    }

    fn native_dimensions(&mut self, filename: &str) -> Option<(u32, u32)> {
        let image_dir = &self.image_dir;
        *self
            .dimensions
            .entry(filename.to_owned())
            .or_insert_with(|| read_dimensions(&image_dir.join(filename)))
    }
}

fn read_dimensions(path: &Path) -> Option<(u32, u32)> {
    match image::image_dimensions(path) {
        Ok(dimensions) => Some(dimensions),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Image dimensions unavailable");
            None
        }
    }
}

/// `450px` and `450PX` become `450`; other values are kept.
fn strip_px(value: &str) -> &str {
    let value = value.trim();
    match value.len().checked_sub(2).and_then(|i| value.get(i..).map(|s| (i, s))) {
        Some((i, suffix)) if suffix.eq_ignore_ascii_case("px") => value[..i].trim_end(),
        _ => value,
    }
}

fn escape_attribute(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(html: &str) -> String {
        PlaceholderResolver::new("/nonexistent/attachments").resolve(html)
    }

    #[test]
    fn test_attachment_without_size() {
        let token = Placeholder::attachment("abc.png").to_token();

        assert_eq!(
            resolve(&format!("<p>{token}</p>")),
            r#"<p><ac:image><ri:attachment ri:filename="abc.png" /></ac:image></p>"#
        );
    }

    #[test]
    fn test_size_params_and_thumbnail() {
        let token = Placeholder::attachment("abc.png")
            .with_param("height", "80")
            .with_param("width", "450px")
            .to_token();

        assert_eq!(
            resolve(&token),
            r#"<ac:image ac:width="450" ac:height="80" ac:thumbnail="true"><ri:attachment ri:filename="abc.png" /></ac:image>"#
        );
    }

    #[test]
    fn test_url_target_escaped() {
        let token = Placeholder::url("https://example.com/a.png?x=1&y=2").to_token();

        assert_eq!(
            resolve(&token),
            r#"<ac:image><ri:url ri:value="https://example.com/a.png?x=1&amp;y=2" /></ac:image>"#
        );
    }

    #[test]
    fn test_wrapping_link_removed() {
        let token = Placeholder::attachment("a.png").to_token();
        let html = format!("<p><a href=\"https://example.com\">\n{token} </a> and <a href=\"x\">text</a></p>");

        assert_eq!(
            resolve(&html),
            r#"<p><ac:image><ri:attachment ri:filename="a.png" /></ac:image> and <a href="x">text</a></p>"#
        );
    }

    #[test]
    fn test_native_dimensions_read_once() {
        let tmp = tempfile::tempdir().unwrap();
        image::RgbaImage::new(64, 32)
            .save(tmp.path().join("shot.png"))
            .unwrap();
        let mut resolver = PlaceholderResolver::new(tmp.path());
        let token = Placeholder::attachment("shot.png").to_token();

        let first = resolver.resolve(&token);
        std::fs::remove_file(tmp.path().join("shot.png")).unwrap();
        let second = resolver.resolve(&token);

        let expected = r#"<ac:image ac:original-width="64" ac:original-height="32"><ri:attachment ri:filename="shot.png" /></ac:image>"#;
        assert_eq!(first, expected);
        assert_eq!(second, expected);
    }

    #[test]
    fn test_unreadable_image_omits_dimensions() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.png"), b"not a png").unwrap();
        let mut resolver = PlaceholderResolver::new(tmp.path());
        let token = Placeholder::attachment("broken.png")
            .with_param("width", "10")
            .to_token();

        assert_eq!(
            resolver.resolve(&token),
            r#"<ac:image ac:width="10" ac:thumbnail="true"><ri:attachment ri:filename="broken.png" /></ac:image>"#
        );
    }

    #[test]
    fn test_strikethrough_variants() {
        assert_eq!(
            resolve("<del>a</del> <s class=\"x\">b</s> <STRIKE>c</STRIKE> <strong>d</strong>"),
            r#"<span style="text-decoration: line-through;">a</span> <span style="text-decoration: line-through;">b</span> <span style="text-decoration: line-through;">c</span> <strong>d</strong>"#
        );
    }

    #[test]
    fn test_strip_px() {
        assert_eq!(strip_px("200px"), "200");
        assert_eq!(strip_px(" 200 PX "), "200");
        assert_eq!(strip_px("50%"), "50%");
        assert_eq!(strip_px("px"), "");
        assert_eq!(strip_px("é"), "é");
    }
}
