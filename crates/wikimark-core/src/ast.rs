//! Abstract Syntax Tree types for wiki documents.
//!
//! The parser produces a flat `Vec<Node>` of root nodes. Every variant
//! carries only the fields its construct needs. The tree owns its strings so
//! it can outlive the token buffer and cross `.await` points in the renderer.
//!
//! Nodes serialize to JSON with a `type` tag, which is what the CLI prints.

use std::collections::BTreeMap;

use serde::Serialize;

/// Key/value attributes of a construct. Last write wins.
pub type Attributes = BTreeMap<String, String>;

/// A single AST node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    Heading {
        depth: u8,
        folding: bool,
        children: Vec<Node>,
    },
    /// `{{{#!wiki style="..."` block.
    StyledBlock {
        style: String,
        children: Vec<Node>,
    },
    /// `{{{#!html` block, passed through the sanitizer when rendered.
    RawHtml {
        html: String,
    },
    Folding {
        summary: Vec<Node>,
        children: Vec<Node>,
    },
    SyntaxBlock {
        language: String,
        code: String,
    },
    ColorSpan {
        color: String,
        children: Vec<Node>,
    },
    SizeSpan {
        delta: i8,
        children: Vec<Node>,
    },
    HorizontalLine,
    /// Literal text. A lone `"\n"` is a line break.
    Literal {
        text: String,
    },
    HyperLink {
        target: String,
        children: Vec<Node>,
    },
    Category {
        name: String,
    },
    Image {
        target: String,
        attributes: Attributes,
    },
    Bold {
        children: Vec<Node>,
    },
    Italic {
        children: Vec<Node>,
    },
    Underscore {
        children: Vec<Node>,
    },
    Strikethrough {
        children: Vec<Node>,
    },
    SuperScript {
        children: Vec<Node>,
    },
    SubScript {
        children: Vec<Node>,
    },
    Video {
        provider: VideoProvider,
        code: String,
        attributes: Attributes,
    },
    /// Footnote reference with its body. `name` is `None` for numbered notes.
    FootNote {
        name: Option<String>,
        children: Vec<Node>,
    },
    BlockQuote {
        depth: usize,
        children: Vec<Node>,
    },
    List {
        depth: usize,
        marker: ListMarker,
        /// Rendered start index from a `#N` override.
        start: Option<u32>,
        children: Vec<Node>,
    },
    ListItem {
        marker: ListMarker,
        children: Vec<Node>,
    },
    Indent {
        depth: usize,
        children: Vec<Node>,
    },
    /// Template inclusion; `attributes` become the nested render's parameters.
    Include {
        name: String,
        attributes: Attributes,
    },
    /// Template parameter `@name@` or `@name=fallback@`.
    Param {
        name: String,
        fallback: Vec<Node>,
    },
    Age {
        date: String,
    },
    Dday {
        date: String,
    },
    PageCount {
        name: Option<String>,
    },
    Ruby {
        base: Vec<Node>,
        attributes: Attributes,
    },
    Math {
        source: String,
    },
    DateTime,
    TableOfContents,
    TableOfFootnotes,
    ClearFix,
    Table(Table),
    /// Host-built comment. Parsed input never has one, since the lexer drops
    /// `##` lines.
    Comment {
        text: String,
    },
}

impl Node {
    /// Create a literal text node.
    #[inline]
    pub fn literal(text: impl Into<String>) -> Self {
        Node::Literal { text: text.into() }
    }

    /// A line break (`[br]`, empty lines inside nested blocks).
    #[inline]
    pub fn line_break() -> Self {
        Node::literal("\n")
    }

    /// Child nodes of container variants; empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Heading { children, .. }
            | Node::StyledBlock { children, .. }
            | Node::Folding { children, .. }
            | Node::ColorSpan { children, .. }
            | Node::SizeSpan { children, .. }
            | Node::HyperLink { children, .. }
            | Node::Bold { children }
            | Node::Italic { children }
            | Node::Underscore { children }
            | Node::Strikethrough { children }
            | Node::SuperScript { children }
            | Node::SubScript { children }
            | Node::FootNote { children, .. }
            | Node::BlockQuote { children, .. }
            | Node::List { children, .. }
            | Node::ListItem { children, .. }
            | Node::Indent { children, .. } => children,
            Node::Param { fallback, .. } => fallback,
            Node::Ruby { base, .. } => base,
            _ => &[],
        }
    }

    /// Concatenated literal text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Literal { text } => out.push_str(text),
            Node::Table(table) => {
                for row in &table.rows {
                    for cell in &row.cells {
                        for child in &cell.children {
                            child.collect_text(out);
                        }
                    }
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// Concatenated literal text of a node sequence.
pub fn text_content(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.collect_text(&mut out);
    }
    out
}

/// A table with an optional caption.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    pub caption: Option<Vec<Node>>,
    /// Table-scope attributes (`width`, `bgcolor`, `color`, `bordercolor`, `align`).
    pub attributes: Attributes,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TableRow {
    /// Row-scope attributes (`bgcolor`, `color`).
    pub attributes: Attributes,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TableCell {
    pub attributes: Attributes,
    pub children: Vec<Node>,
}

/// List item marker. Decides the list's CSS class and `<ul>`/`<ol>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListMarker {
    Bullet,
    Decimal,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
}

impl ListMarker {
    /// Map a list marker rule (`*`, `1.`, `a.`, ...) to its kind.
    pub fn from_rule(text: &str) -> Option<Self> {
        Some(match text {
            "*" => ListMarker::Bullet,
            "1." => ListMarker::Decimal,
            "a." => ListMarker::LowerAlpha,
            "A." => ListMarker::UpperAlpha,
            "i." => ListMarker::LowerRoman,
            "I." => ListMarker::UpperRoman,
            _ => return None,
        })
    }

    /// Whether the marker numbers its items.
    #[inline]
    pub fn is_ordered(self) -> bool {
        self != ListMarker::Bullet
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ListMarker::Bullet => "",
            ListMarker::Decimal => "wiki-list-decimal",
            ListMarker::LowerAlpha => "wiki-list-alpha",
            ListMarker::UpperAlpha => "wiki-list-upper-alpha",
            ListMarker::LowerRoman => "wiki-list-roman",
            ListMarker::UpperRoman => "wiki-list-upper-roman",
        }
    }
}

/// Supported video embed providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    YouTube,
    KakaoTv,
    NicoVideo,
    Vimeo,
    NaverTv,
}

impl VideoProvider {
    /// Map an embed opener such as `[youtube(` to its provider.
    pub fn from_rule(text: &str) -> Option<Self> {
        Some(match text {
            "[youtube(" => VideoProvider::YouTube,
            "[kakaotv(" => VideoProvider::KakaoTv,
            "[nicovideo(" => VideoProvider::NicoVideo,
            "[vimeo(" => VideoProvider::Vimeo,
            "[navertv(" => VideoProvider::NaverTv,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            VideoProvider::YouTube => "youtube",
            VideoProvider::KakaoTv => "kakaotv",
            VideoProvider::NicoVideo => "nicovideo",
            VideoProvider::Vimeo => "vimeo",
            VideoProvider::NaverTv => "navertv",
        }
    }
}
