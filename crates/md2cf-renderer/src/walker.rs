//! Tree walker replacing diagrams and images with placeholders.
//!
//! The walk is depth-first and parent-indexed: each node is processed while
//! its parent's child list is borrowed, so it can be replaced in place and
//! its next sibling consumed without restarting the traversal. Children are
//! visited after their parent is processed.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use md2cf_diagrams::{DiagramCache, DiagramLanguage, DiagramSource};
use percent_encoding::percent_decode_str;
use pulldown_cmark::{CodeBlockKind, Tag};
use regex::{Captures, Regex};

use crate::assets::AttachmentMaterializer;
use crate::error::{ConvertError, MaterializeError};
use crate::placeholder::Placeholder;
use crate::tree::{Node, NodeKind};

/// `{width=200px height=100}` directly after an image.
static ANNOTATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{([^}]*)\}").unwrap());

static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .unwrap()
});

/// Outcome counters and warnings of a walk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkReport {
    /// Diagrams replaced by a placeholder.
    pub diagrams: usize,
    /// Diagrams left as code blocks.
    pub degraded: usize,
    /// Markdown and HTML images replaced by a placeholder.
    pub images: usize,
    /// Human-readable problems, one per affected node.
    pub warnings: Vec<String>,
}

/// Rewrites a document tree in place.
pub struct TreeWalker<'r> {
    diagrams: &'r DiagramCache,
    assets: &'r mut AttachmentMaterializer,
    base_dir: Option<PathBuf>,
    report: WalkReport,
}

impl<'r> TreeWalker<'r> {
    #[must_use]
    pub fn new(diagrams: &'r DiagramCache, assets: &'r mut AttachmentMaterializer) -> Self {
        Self {
            diagrams,
            assets,
            base_dir: None,
            report: WalkReport::default(),
        }
    }

    /// Resolve local image paths against `dir` and materialize files found there.
    #[must_use]
    pub fn with_base_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.base_dir = dir;
        self
    }

    /// Walk the whole tree. Only fatal I/O errors abort the walk.
    pub fn transform(&mut self, root: &mut Node<'_>) -> Result<(), ConvertError> {
        self.walk(root)
    }

    /// Consume the walker and return its report.
    #[must_use]
    pub fn finish(self) -> WalkReport {
        self.report
    }

    fn walk(&mut self, parent: &mut Node<'_>) -> Result<(), ConvertError> {
        let mut i = 0;
        while i < parent.children.len() {
            self.visit(parent, i)?;
            self.walk(&mut parent.children[i])?;
            i += 1;
        }
        Ok(())
    }

    fn visit(&mut self, parent: &mut Node<'_>, i: usize) -> Result<(), ConvertError> {
        match &mut parent.children[i].kind {
            NodeKind::CodeBlock {
                kind: CodeBlockKind::Fenced(info),
                literal,
            } => {
                if let Some(language) = DiagramLanguage::parse(info) {
                    let source = DiagramSource::new(language, literal.as_str());
                    if let Some(node) = self.diagram(&source)? {
                        parent.children[i] = node;
                    }
                }
            }
            NodeKind::Element(Tag::Image { dest_url, .. }) => {
                let url = dest_url.as_ref().to_owned();
                if let Some(mut placeholder) = self.image_placeholder(&url)? {
                    consume_annotation(&mut parent.children, i + 1, &mut placeholder);
                    parent.children[i] = Node::placeholder(placeholder, false);
                    self.report.images += 1;
                }
            }
            NodeKind::HtmlBlock(html) | NodeKind::InlineHtml(html) => {
                if let Some(rewritten) = self.rewrite_img_tags(html)? {
                    *html = rewritten;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Render a diagram and return its replacement node.
    ///
    /// Returns `None` when the code block must stay as it is.
    fn diagram(&mut self, source: &DiagramSource) -> Result<Option<Node<'static>>, ConvertError> {
        let language = source.language;
        match self.diagrams.ensure_rendered(source) {
            Ok(rendered) => {
                self.report.warnings.extend(
                    rendered
                        .warnings
                        .into_iter()
                        .map(|w| format!("{language} diagram: {w}")),
                );
                let filename = self.materialize(&rendered.path)?;
                self.report.diagrams += 1;
                Ok(Some(Node::placeholder(Placeholder::attachment(filename), true)))
            }
            Err(err) if err.is_fatal() => Err(err.into()),
            Err(err) => {
                tracing::warn!(%language, error = %err, "Diagram left as code block");
                self.report.degraded += 1;
                self.report
                    .warnings
                    .push(format!("{language} diagram left as code block: {err}"));
                Ok(None)
            }
        }
    }

    /// Placeholder for an image URL, or `None` for URLs left untouched.
    fn image_placeholder(&mut self, url: &str) -> Result<Option<Placeholder>, ConvertError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Some(Placeholder::url(url)));
        }
        if url.is_empty() || url.starts_with("data:") || url.starts_with('#') {
            return Ok(None);
        }

        let path = url.split(['?', '#']).next().unwrap_or(url);
        let path = percent_decode_str(path).decode_utf8_lossy();
        let filename = base_name(&path);
        if filename.is_empty() {
            return Ok(None);
        }

        let filename = match self.local_file(&path) {
            Some(file) => self.materialize(&file)?,
            None => filename.to_owned(),
        };
        Ok(Some(Placeholder::attachment(filename)))
    }

    /// Place `file` into the asset directory. Failures go to the diagnostic log.
    fn materialize(&mut self, file: &Path) -> Result<String, MaterializeError> {
        self.assets.ensure_available(file).inspect_err(|err| {
            self.diagrams.log().record("assets", &error_chain(err));
        })
    }

    /// Existing local file for `path` inside the base directory.
    ///
    /// Paths that resolve outside the base directory are never read.
    fn local_file(&self, path: &str) -> Option<PathBuf> {
        let base = self.base_dir.as_deref()?.canonicalize().ok()?;
        let Ok(file) = base.join(path).canonicalize() else {
            tracing::debug!(path, "Local image not found, leaving it to the publish step");
            return None;
        };
        if !file.starts_with(&base) {
            tracing::debug!(path, "Local image outside the base directory, not materialized");
            return None;
        }
        file.is_file().then_some(file)
    }

    /// Replace every `<img>` carrying a `src` with a placeholder.
    ///
    /// Returns `None` when nothing changed.
    fn rewrite_img_tags(&mut self, html: &str) -> Result<Option<String>, ConvertError> {
        if !IMG_TAG.is_match(html) {
            return Ok(None);
        }

        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        let mut changed = false;
        for tag in IMG_TAG.find_iter(html) {
            out.push_str(&html[last..tag.start()]);
            last = tag.end();

            let attrs = parse_attributes(tag.as_str());
            let placeholder = match attribute(&attrs, "src") {
                Some(src) => self.image_placeholder(src)?,
                None => None,
            };
            match placeholder {
                Some(mut placeholder) => {
                    for key in ["width", "height"] {
                        if let Some(value) = attribute(&attrs, key).filter(|v| !v.is_empty()) {
                            placeholder.set_param(key, value);
                        }
                    }
                    out.push_str(&placeholder.to_token());
                    self.report.images += 1;
                    changed = true;
                }
                None => out.push_str(tag.as_str()),
            }
        }
        out.push_str(&html[last..]);

        Ok(changed.then_some(out))
    }
}

/// Consume a `{key=value ...}` annotation at the start of `siblings[index]`.
///
/// The annotation is taken only if it holds at least one `key=value` pair.
/// A text node left empty is removed.
fn consume_annotation(siblings: &mut Vec<Node<'_>>, index: usize, placeholder: &mut Placeholder) {
    let Some(Node {
        kind: NodeKind::Text(text),
        ..
    }) = siblings.get_mut(index)
    else {
        return;
    };
    let Some((pairs, consumed)) = ANNOTATION
        .captures(text)
        .map(|caps| (parse_annotation(&caps), caps[0].len()))
    else {
        return;
    };
    if pairs.is_empty() {
        return;
    }
    for (key, value) in pairs {
        placeholder.set_param(key, value);
    }

    if consumed == text.len() {
        siblings.remove(index);
    } else {
        text.replace_range(..consumed, "");
    }
}

fn parse_annotation(caps: &Captures<'_>) -> Vec<(String, String)> {
    caps[1]
        .split(|c: char| c.is_whitespace() || c == ';' || c == ',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            (
                key.trim().to_ascii_lowercase(),
                value.trim().trim_matches(['"', '\'']).to_owned(),
            )
        })
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .collect()
}

/// Parse the attributes of a single HTML start tag. Names are lowercased.
fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    // Skip "<img"
    let body = tag.get(4..).unwrap_or("");
    ATTRIBUTE
        .captures_iter(body)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (caps[1].to_ascii_lowercase(), value.to_owned())
        })
        .collect()
}

fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// `err` followed by its sources, separated by `: `.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Last path segment of a URL path.
fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Base directory helper for callers holding a file path.
#[must_use]
pub fn document_dir(file: &Path) -> Option<PathBuf> {
    file.parent().map(|dir| {
        if dir.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            dir.to_path_buf()
        }
    })
}
