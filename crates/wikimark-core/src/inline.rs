//! Inline productions: links, emphasis, media embeds, footnotes and macros.
//!
//! These extend the parser's walker with the constructs that live inside a
//! line. Paired forms collect children until their closer; a missing closer
//! ends the node at end of input and is recorded as a recovery.

use crate::ast::{Attributes, Node, VideoProvider};
use crate::error::ParseError;
use crate::parser::Walker;

/// Constructor of the node an emphasis delimiter opens.
pub(crate) type EmphasisBuilder = fn(Vec<Node>) -> Node;

/// Map a self-closing emphasis delimiter to its node constructor.
pub(crate) fn emphasis_builder(delimiter: &str) -> Option<EmphasisBuilder> {
    let build: EmphasisBuilder = match delimiter {
        "'''" => |children| Node::Bold { children },
        "''" => |children| Node::Italic { children },
        "__" => |children| Node::Underscore { children },
        "~~" | "--" => |children| Node::Strikethrough { children },
        "^^" => |children| Node::SuperScript { children },
        ",," => |children| Node::SubScript { children },
        _ => return None,
    };
    Some(build)
}

/// Link prefixes that may be escaped with a leading colon.
const ESCAPABLE_PREFIXES: &[&str] = &["파일:", "분류:", "file:", "category:"];

impl<'t, 'a> Walker<'t, 'a> {
    // ========================================================================
    // Links
    // ========================================================================

    pub(crate) fn hyperlink(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let mut target = self.raw_until(&["|", "]]"]);
        if let Some(escaped) = target.strip_prefix(':') {
            if ESCAPABLE_PREFIXES.iter().any(|p| escaped.starts_with(p)) {
                target.remove(0);
            }
        }

        let children = if self.at_rule("|") {
            self.pos += 1;
            self.collect_until(&["]]"])
        } else {
            vec![Node::literal(target.as_str())]
        };
        self.close("]]", "link", opened);
        Node::HyperLink { target, children }
    }

    pub(crate) fn category(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let name = self.raw_until(&["]]"]);
        self.close("]]", "category", opened);
        Node::Category { name }
    }

    pub(crate) fn image(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let target = self.raw_until(&["|", "]]"]);
        let attributes = if self.at_rule("|") {
            self.pos += 1;
            self.attributes("&", "]]")
        } else {
            Attributes::new()
        };
        self.close("]]", "image", opened);
        Node::Image { target, attributes }
    }

    /// Read `key=value` pairs joined by `separator`, stopping before `end`.
    ///
    /// A key without `=` gets an empty value. Empty keys are dropped.
    pub(crate) fn attributes(&mut self, separator: &str, end: &str) -> Attributes {
        let mut attributes = Attributes::new();
        while !self.at_end() && !self.at_rule(end) {
            let key = self.raw_until(&["=", separator, end]);
            let value = if self.at_rule("=") {
                self.pos += 1;
                self.raw_until(&[separator, end])
            } else {
                String::new()
            };
            let key = key.trim();
            if !key.is_empty() {
                attributes.insert(key.to_string(), value);
            }
            if self.at_rule(separator) {
                self.pos += 1;
            }
        }
        attributes
    }

    // ========================================================================
    // Emphasis and embeds
    // ========================================================================

    /// Delimiters close themselves. An empty pair degrades to its doubled text.
    pub(crate) fn emphasis(&mut self, delimiter: &str, build: EmphasisBuilder) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let children = self.collect_until(&[delimiter]);
        let closed = self.close(delimiter, "emphasis", opened);
        if children.is_empty() {
            if closed {
                self.record(ParseError::empty_emphasis(delimiter, Some(opened)));
            }
            return Node::literal(delimiter.repeat(2));
        }
        build(children)
    }

    pub(crate) fn video(&mut self, provider: VideoProvider) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let code = self.raw_until(&[",", ")]"]).trim().to_string();
        let attributes = if self.at_rule(",") {
            self.pos += 1;
            self.attributes(",", ")]")
        } else {
            Attributes::new()
        };
        self.close(")]", provider.name(), opened);
        Node::Video {
            provider,
            code,
            attributes,
        }
    }

    /// `[*name body]`, `[* body]` or `[*name]`.
    pub(crate) fn footnote(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let name = self.raw_until(&[" ", "]"]);
        let children = if self.at_rule(" ") {
            self.pos += 1;
            self.collect_until(&["]"])
        } else {
            Vec::new()
        };
        self.close("]", "footnote", opened);
        Node::FootNote {
            name: (!name.is_empty()).then_some(name),
            children,
        }
    }

    // ========================================================================
    // Macros
    // ========================================================================

    /// Macro productions keyed by their opener; `None` if `opener` is not one.
    pub(crate) fn macro_node(&mut self, opener: &str) -> Option<Node> {
        let node = match opener {
            "[include(" => self.include(),
            "@" => self.param(),
            "[age(" => Node::Age {
                date: self.macro_argument("age"),
            },
            "[dday(" => Node::Dday {
                date: self.macro_argument("dday"),
            },
            "[pagecount(" => {
                let name = self.macro_argument("pagecount");
                let name = name.trim();
                Node::PageCount {
                    name: (!name.is_empty()).then(|| name.to_string()),
                }
            }
            "[ruby(" => self.ruby(),
            "[math(" => Node::Math {
                source: self.macro_argument("math"),
            },
            "<math>" => {
                let opened = self.span_here();
                self.pos += 1;
                let source = self.raw_until(&["</math>"]);
                self.close("</math>", "math", opened);
                Node::Math { source }
            }
            "[date]" | "[datetime]" => self.bare(Node::DateTime),
            "[목차]" | "[tableofcontents]" => self.bare(Node::TableOfContents),
            "[각주]" | "[footnote]" => self.bare(Node::TableOfFootnotes),
            "[br]" => self.bare(Node::line_break()),
            "[clearfix]" => self.bare(Node::ClearFix),
            "[pagecount]" => self.bare(Node::PageCount { name: None }),
            _ => return None,
        };
        Some(node)
    }

    #[inline]
    fn bare(&mut self, node: Node) -> Node {
        self.pos += 1;
        node
    }

    /// Raw text of a single-argument macro up to `)]`.
    fn macro_argument(&mut self, name: &str) -> String {
        let opened = self.span_here();
        self.pos += 1;
        let argument = self.raw_until(&[")]"]);
        self.close(")]", name, opened);
        argument
    }

    fn include(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let name = self.raw_until(&[",", ")]"]).trim().to_string();
        let attributes = if self.at_rule(",") {
            self.pos += 1;
            self.attributes(",", ")]")
        } else {
            Attributes::new()
        };
        self.close(")]", "include", opened);
        Node::Include { name, attributes }
    }

    fn ruby(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let base = self.collect_until(&[",", ")]"]);
        let attributes = if self.at_rule(",") {
            self.pos += 1;
            self.attributes(",", ")]")
        } else {
            Attributes::new()
        };
        self.close(")]", "ruby", opened);
        Node::Ruby { base, attributes }
    }

    /// `@name@` or `@name=fallback@` on one line, else a literal `@`.
    fn param(&mut self) -> Node {
        let checkpoint = self.checkpoint();
        let at = self.span_here();
        self.pos += 1;

        let name = self.raw_until(&["=", "@", "\n"]);
        if !name.is_empty() {
            if self.at_rule("@") {
                self.pos += 1;
                return Node::Param {
                    name,
                    fallback: Vec::new(),
                };
            }
            if self.at_rule("=") {
                self.pos += 1;
                let fallback = self.collect_until(&["@", "\n"]);
                if self.at_rule("@") {
                    self.pos += 1;
                    return Node::Param { name, fallback };
                }
            }
        }

        self.restore(checkpoint);
        self.pos += 1;
        self.record(ParseError::invalid_param("template parameter", Some(at)));
        Node::literal("@")
    }
}
