//! Mutable Markdown document tree.
//!
//! pulldown-cmark produces a flat event stream. The tree walker needs to
//! replace a node and look at its next sibling, so events are folded into
//! nodes with ordered children and unfolded again for HTML serialization.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, html};

use crate::placeholder::{CLOSE, OPEN, Placeholder, strip_reserved};

/// Parser options: GitHub-flavored tables, strikethrough and task lists.
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'a> {
    /// Document root.
    Root,
    /// Container such as a paragraph, list, link or image (alt text in children).
    Element(Tag<'a>),
    /// Code block with its literal content.
    CodeBlock {
        kind: CodeBlockKind<'a>,
        literal: String,
    },
    /// Raw HTML block.
    HtmlBlock(String),
    /// Raw inline HTML.
    InlineHtml(String),
    /// Plain text, adjacent text events merged.
    Text(String),
    /// Deferred image reference.
    Placeholder {
        placeholder: Placeholder,
        /// Emitted as its own paragraph instead of inline.
        block: bool,
    },
    /// Any other event, kept verbatim.
    Leaf(Event<'a>),
}

/// A document node with ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    pub kind: NodeKind<'a>,
    pub children: Vec<Node<'a>>,
}

impl<'a> Node<'a> {
    #[must_use]
    pub fn new(kind: NodeKind<'a>) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(text.into()))
    }

    #[must_use]
    pub fn placeholder(placeholder: Placeholder, block: bool) -> Self {
        Self::new(NodeKind::Placeholder { placeholder, block })
    }

    /// Parse `markdown` into a tree rooted at [`NodeKind::Root`].
    ///
    /// Placeholder delimiter code points are removed from all text, code,
    /// HTML content and tag strings such as URLs, titles and info strings.
    #[must_use]
    pub fn parse(markdown: &'a str) -> Self {
        let mut stack = vec![Node::new(NodeKind::Root)];

        for event in Parser::new_ext(markdown, parser_options()) {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => stack.push(Node::new(NodeKind::CodeBlock {
                    kind: clean_code_kind(kind),
                    literal: String::new(),
                })),
                Event::Start(Tag::HtmlBlock) => {
                    stack.push(Node::new(NodeKind::HtmlBlock(String::new())));
                }
                Event::Start(tag) => stack.push(Node::new(NodeKind::Element(clean_tag(tag)))),
                Event::End(_) => {
                    if stack.len() > 1
                        && let Some(node) = stack.pop()
                    {
                        push_child(&mut stack, node);
                    }
                }
                Event::Text(text) => {
                    let text = strip_reserved(&text);
                    let Some(top) = stack.last_mut() else { continue };
                    match &mut top.kind {
                        NodeKind::CodeBlock { literal, .. } => literal.push_str(&text),
                        _ => top.push_text(&text),
                    }
                }
                Event::Html(raw) => {
                    let raw = strip_reserved(&raw);
                    let Some(top) = stack.last_mut() else { continue };
                    match &mut top.kind {
                        NodeKind::HtmlBlock(buf) => buf.push_str(&raw),
                        _ => top
                            .children
                            .push(Node::new(NodeKind::HtmlBlock(raw.into_owned()))),
                    }
                }
                Event::InlineHtml(raw) => {
                    let node = Node::new(NodeKind::InlineHtml(strip_reserved(&raw).into_owned()));
                    push_child(&mut stack, node);
                }
                Event::Code(code) => {
                    let code = CowStr::from(strip_reserved(&code).into_owned());
                    push_child(&mut stack, Node::new(NodeKind::Leaf(Event::Code(code))));
                }
                Event::FootnoteReference(label) => push_child(
                    &mut stack,
                    Node::new(NodeKind::Leaf(Event::FootnoteReference(clean(label)))),
                ),
                other => push_child(&mut stack, Node::new(NodeKind::Leaf(other))),
            }
        }

        // Close anything left open by a truncated event stream
        while stack.len() > 1 {
            if let Some(node) = stack.pop() {
                push_child(&mut stack, node);
            }
        }
        stack.pop().unwrap_or_else(|| Node::new(NodeKind::Root))
    }

    /// Append text, merging with a preceding text child.
    fn push_text(&mut self, text: &str) {
        if let Some(Node {
            kind: NodeKind::Text(last),
            ..
        }) = self.children.last_mut()
        {
            last.push_str(text);
        } else {
            self.children.push(Node::text(text));
        }
    }

    /// Serialize the tree to HTML with pulldown-cmark's HTML writer.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut events = Vec::new();
        self.collect_events(&mut events);
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        out
    }

    fn collect_events<'s>(&'s self, out: &mut Vec<Event<'s>>) {
        match &self.kind {
            NodeKind::Root => self.collect_children(out),
            NodeKind::Element(tag) => {
                out.push(Event::Start(tag.clone()));
                self.collect_children(out);
                out.push(Event::End(tag.to_end()));
            }
            NodeKind::CodeBlock { kind, literal } => {
                let tag = Tag::CodeBlock(kind.clone());
                let end = tag.to_end();
                out.push(Event::Start(tag));
                if !literal.is_empty() {
                    out.push(Event::Text(CowStr::Borrowed(literal)));
                }
                out.push(Event::End(end));
            }
            NodeKind::HtmlBlock(raw) => {
                out.push(Event::Start(Tag::HtmlBlock));
                out.push(Event::Html(CowStr::Borrowed(raw)));
                out.push(Event::End(Tag::HtmlBlock.to_end()));
            }
            NodeKind::InlineHtml(raw) => out.push(Event::InlineHtml(CowStr::Borrowed(raw))),
            NodeKind::Text(text) => out.push(Event::Text(CowStr::Borrowed(text))),
            NodeKind::Placeholder { placeholder, block } => {
                let token = Event::InlineHtml(CowStr::from(placeholder.to_token()));
                if *block {
                    out.push(Event::Start(Tag::Paragraph));
                    out.push(token);
                    out.push(Event::End(Tag::Paragraph.to_end()));
                } else {
                    out.push(token);
                }
            }
            NodeKind::Leaf(event) => out.push(event.clone()),
        }
    }

    fn collect_children<'s>(&'s self, out: &mut Vec<Event<'s>>) {
        for child in &self.children {
            child.collect_events(out);
        }
    }
}

fn push_child<'a>(stack: &mut [Node<'a>], node: Node<'a>) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn clean(s: CowStr<'_>) -> CowStr<'_> {
    if s.contains([OPEN, CLOSE]) {
        CowStr::from(strip_reserved(&s).into_owned())
    } else {
        s
    }
}

fn clean_code_kind(kind: CodeBlockKind<'_>) -> CodeBlockKind<'_> {
    match kind {
        CodeBlockKind::Fenced(info) => CodeBlockKind::Fenced(clean(info)),
        CodeBlockKind::Indented => CodeBlockKind::Indented,
    }
}

/// Strip delimiters from every string a tag carries into the output.
fn clean_tag(tag: Tag<'_>) -> Tag<'_> {
    match tag {
        Tag::Heading {
            level,
            id,
            classes,
            attrs,
        } => Tag::Heading {
            level,
            id: id.map(clean),
            classes: classes.into_iter().map(clean).collect(),
            attrs: attrs
                .into_iter()
                .map(|(key, value)| (clean(key), value.map(clean)))
                .collect(),
        },
        Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        } => Tag::Link {
            link_type,
            dest_url: clean(dest_url),
            title: clean(title),
            id: clean(id),
        },
        Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        } => Tag::Image {
            link_type,
            dest_url: clean(dest_url),
            title: clean(title),
            id: clean(id),
        },
        Tag::FootnoteDefinition(label) => Tag::FootnoteDefinition(clean(label)),
        other => other,
    }
}
