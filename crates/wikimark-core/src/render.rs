//! HTML renderer.
//!
//! Walks the AST in source order and emits an HTML fragment together with
//! the side collections of the run: categories, backlinks, footnotes and
//! headings. All run state lives in a per-call context, so one [`Renderer`]
//! can serve concurrent renders.
//!
//! The renderer awaits the host's lookups one node at a time. Output order is
//! always source order, and footnote and heading numbers follow it.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::ast::{Attributes, Node, Table, VideoProvider};
use crate::config::RenderOptions;
use crate::host::{Host, UrlKind};
use crate::lexer::tokenize;
use crate::parser::Parser;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Parameter values of a template substitution pass.
pub type TemplateParams = Attributes;

/// Marks where the table of contents goes until all headings are known.
const TOC_PLACEHOLDER: &str = "<!--wikimark:toc-->";

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));
static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BacklinkKind {
    Link,
    Image,
    Category,
}

/// A reference from the rendered page to another page, image or category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backlink {
    pub kind: BacklinkKind,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Footnote {
    /// Unique id within the run, used for anchors.
    pub id: String,
    /// Displayed label.
    pub label: String,
    /// Rendered body.
    pub html: String,
}

/// One heading of the run, as listed in the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Heading text with tags stripped.
    pub name: String,
    /// Section number such as `1.2`.
    pub id: String,
    pub depth: u8,
    /// `false` for folded headings.
    pub closed: bool,
}

/// HTML and side collections of one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    pub html: String,
    pub categories: Vec<String>,
    pub backlinks: Vec<Backlink>,
    pub footnotes: Vec<Footnote>,
    pub headings: Vec<TocEntry>,
}

/// State of a single render call.
#[derive(Default)]
struct RenderContext {
    /// `Some` during a template substitution pass.
    params: Option<TemplateParams>,
    counters: [u32; 6],
    footnote_ids: HashSet<String>,
    /// Footnotes not yet written to a footnote section.
    pending: Vec<Footnote>,
    toc_used: bool,
    out: RenderOutput,
}

/// AST to HTML renderer.
///
/// ```rust
/// use wikimark_core::{Host, Renderer};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let renderer = Renderer::new(Host::default());
/// let output = renderer.render_markup("'''bold'''").await;
/// assert_eq!(output.html, "<b>bold</b>");
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Renderer {
    host: Host,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `nodes`. `params` makes this a template substitution pass.
    pub async fn render(&self, nodes: &[Node], params: Option<&TemplateParams>) -> RenderOutput {
        let mut ctx = RenderContext {
            params: params.cloned(),
            ..RenderContext::default()
        };
        log::debug!(
            "rendering {} root nodes{}",
            nodes.len(),
            if params.is_some() { " (substitution pass)" } else { "" }
        );

        let mut html = self.render_nodes(&mut ctx, nodes).await;
        if self.options.auto_footnotes && !ctx.pending.is_empty() {
            let section = self.footnote_section(&mut ctx);
            html.push_str(&section);
        }
        if ctx.toc_used {
            html = html.replace(TOC_PLACEHOLDER, &self.table_of_contents(&ctx.out.headings));
        }

        ctx.out.html = html;
        ctx.out
    }

    /// Tokenize, parse and render markup in one go.
    pub async fn render_markup(&self, markup: &str) -> RenderOutput {
        let nodes = parse_markup(markup);
        self.render(&nodes, None).await
    }

    fn render_nodes<'a>(
        &'a self,
        ctx: &'a mut RenderContext,
        nodes: &'a [Node],
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let mut html = String::new();
            for node in nodes {
                let part = self.render_node(ctx, node).await;
                html.push_str(&part);
            }
            html
        })
    }

    fn render_node<'a>(
        &'a self,
        ctx: &'a mut RenderContext,
        node: &'a Node,
    ) -> BoxFuture<'a, String> {
        Box::pin(async move {
            match node {
                Node::Literal { text } if text == "\n" => "<br />".to_string(),
                Node::Literal { text } => escape_text(text),

                Node::Heading {
                    depth,
                    folding,
                    children,
                } => {
                    let inner = self.render_nodes(ctx, children).await;
                    self.heading(ctx, *depth, *folding, inner)
                }

                Node::StyledBlock { style, children } => {
                    let inner = self.render_nodes(ctx, children).await;
                    format!("<div style=\"{}\">{}</div>", escape_attr(style), inner)
                }
                Node::RawHtml { html } => self.host.sanitizer.sanitize(html),
                Node::Folding { summary, children } => {
                    let summary = self.render_nodes(ctx, summary).await;
                    let body = self.render_nodes(ctx, children).await;
                    format!(
                        "<details class=\"wiki-folding\"><summary>{}</summary>{}</details>",
                        summary, body
                    )
                }
                Node::SyntaxBlock { language, code } => {
                    let highlighted = self
                        .host
                        .highlighter
                        .highlight(code, language)
                        .unwrap_or_else(|| self.host.highlighter.highlight_auto(code));
                    format!("<pre class=\"wiki-code\">{}</pre>", highlighted)
                }
                Node::ColorSpan { color, children } => {
                    let color = color.split(',').next().unwrap_or_default();
                    let inner = self.render_nodes(ctx, children).await;
                    format!(
                        "<span style=\"color: {}\">{}</span>",
                        escape_attr(color),
                        inner
                    )
                }
                Node::SizeSpan { delta, children } => {
                    let class = if *delta > 0 {
                        format!("size-up-{}", delta)
                    } else {
                        format!("size-down-{}", delta.unsigned_abs())
                    };
                    let inner = self.render_nodes(ctx, children).await;
                    format!("<span class=\"wiki-size {}\">{}</span>", class, inner)
                }
                Node::HorizontalLine => "<hr />".to_string(),

                Node::HyperLink { target, children } => {
                    self.hyperlink(ctx, target, children).await
                }
                Node::Category { name } => {
                    ctx.out.backlinks.push(Backlink {
                        kind: BacklinkKind::Category,
                        target: name.clone(),
                    });
                    ctx.out.categories.push(name.clone());
                    String::new()
                }
                Node::Image { target, attributes } => {
                    self.image(ctx, target, attributes).await
                }

                Node::Bold { children } => self.wrap(ctx, "b", children).await,
                Node::Italic { children } => self.wrap(ctx, "i", children).await,
                Node::Underscore { children } => self.wrap(ctx, "u", children).await,
                Node::Strikethrough { children } => self.wrap(ctx, "del", children).await,
                Node::SuperScript { children } => self.wrap(ctx, "sup", children).await,
                Node::SubScript { children } => self.wrap(ctx, "sub", children).await,

                Node::Video {
                    provider,
                    code,
                    attributes,
                } => video(*provider, code, attributes),

                Node::FootNote { name, children } => {
                    self.footnote(ctx, name.as_deref(), children).await
                }

                Node::BlockQuote { children, .. } => {
                    let inner = self.render_nodes(ctx, children).await;
                    format!("<blockquote class=\"wiki-quote\">{}</blockquote>", inner)
                }
                Node::List {
                    marker,
                    start,
                    children,
                    ..
                } => {
                    let tag = if marker.is_ordered() { "ol" } else { "ul" };
                    let start = match start {
                        Some(start) if marker.is_ordered() => format!(" start=\"{}\"", start),
                        _ => String::new(),
                    };
                    let inner = self.render_nodes(ctx, children).await;
                    format!("<{tag} class=\"wiki-list\"{start}>{inner}</{tag}>")
                }
                Node::ListItem { marker, children } => {
                    let inner = self.render_nodes(ctx, children).await;
                    match marker.css_class() {
                        "" => format!("<li>{}</li>", inner),
                        class => format!("<li class=\"{}\">{}</li>", class, inner),
                    }
                }
                Node::Indent { children, .. } => {
                    let inner = self.render_nodes(ctx, children).await;
                    format!("<div class=\"wiki-indent\">{}</div>", inner)
                }

                Node::Include { name, attributes } => {
                    if ctx.params.is_some() {
                        return String::new();
                    }
                    self.include(name, attributes).await
                }
                Node::Param { name, fallback } => {
                    let value = ctx
                        .params
                        .as_ref()
                        .and_then(|params| params.get(name))
                        .filter(|value| !value.is_empty())
                        .cloned();
                    match value {
                        Some(value) => escape_text(&value),
                        None => self.render_nodes(ctx, fallback).await,
                    }
                }

                Node::Age { date } => time_macro("age", date),
                Node::Dday { date } => time_macro("dday", date),
                Node::PageCount { name } => {
                    match self.host.pages.page_count(name.as_deref()).await {
                        Ok(count) => count.to_string(),
                        Err(err) => {
                            log::warn!("page count failed: {}", err);
                            "0".to_string()
                        }
                    }
                }
                Node::Ruby { base, attributes } => {
                    let base = self.render_nodes(ctx, base).await;
                    let ruby = attr(attributes, "ruby").map(escape_text).unwrap_or_default();
                    let ruby = match attr(attributes, "color") {
                        Some(color) => {
                            format!("<span style=\"color: {}\">{}</span>", escape_attr(color), ruby)
                        }
                        None => ruby,
                    };
                    format!(
                        "<ruby>{}<rp>(</rp><rt>{}</rt><rp>)</rp></ruby>",
                        base, ruby
                    )
                }
                Node::Math { source } => format!(
                    "<katex data-latex=\"{}\">{}</katex>",
                    escape_attr(source),
                    escape_text(source)
                ),
                Node::DateTime => {
                    let millis = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|elapsed| elapsed.as_millis())
                        .unwrap_or_default();
                    format!("<time datetime=\"{}\"></time>", millis)
                }
                Node::TableOfContents => {
                    ctx.toc_used = true;
                    TOC_PLACEHOLDER.to_string()
                }
                Node::TableOfFootnotes => self.footnote_section(ctx),
                Node::ClearFix => "<div style=\"clear: both\"></div>".to_string(),
                Node::Table(table) => self.table(ctx, table).await,
                Node::Comment { .. } => String::new(),
            }
        })
    }

    async fn wrap(&self, ctx: &mut RenderContext, tag: &str, children: &[Node]) -> String {
        let inner = self.render_nodes(ctx, children).await;
        format!("<{tag}>{inner}</{tag}>")
    }

    fn heading(&self, ctx: &mut RenderContext, depth: u8, folding: bool, inner: String) -> String {
        let level = (depth as usize).clamp(1, ctx.counters.len());
        ctx.counters[level - 1] += 1;
        for counter in &mut ctx.counters[level..] {
            *counter = 0;
        }
        let id = ctx.counters[..level]
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");

        ctx.out.headings.push(TocEntry {
            name: strip_tags(&inner),
            id: id.clone(),
            depth,
            closed: !folding,
        });

        format!(
            "<h{level} id=\"{}{id}\" class=\"wiki-heading{}\"><a href=\"#toc\">{id}.</a> {inner}</h{level}>",
            escape_attr(&self.options.heading_anchor_prefix),
            if folding { " wiki-close-heading" } else { "" },
        )
    }

    async fn page_exists(&self, name: &str) -> bool {
        match self.host.pages.find_page(name).await {
            Ok(page) => page.is_some(),
            Err(err) => {
                log::warn!("page lookup for '{}' failed: {}", name, err);
                false
            }
        }
    }

    async fn hyperlink(&self, ctx: &mut RenderContext, target: &str, children: &[Node]) -> String {
        let external = target.starts_with("https://") || target.starts_with("http://");
        let (href, class) = if external {
            (target.to_string(), " external-link")
        } else {
            ctx.out.backlinks.push(Backlink {
                kind: BacklinkKind::Link,
                target: target.to_string(),
            });
            let class = if self.page_exists(target).await { "" } else { " not-exist" };
            (self.host.urls.url(UrlKind::Link, target), class)
        };
        let label = self.render_nodes(ctx, children).await;
        format!(
            "<a href=\"{}\" class=\"wiki-link{}\">{}</a>",
            escape_attr(&href),
            class,
            label
        )
    }

    async fn image(&self, ctx: &mut RenderContext, target: &str, attributes: &Attributes) -> String {
        ctx.out.backlinks.push(Backlink {
            kind: BacklinkKind::Image,
            target: target.to_string(),
        });

        let image = match self.host.images.find_image(target).await {
            Ok(image) => image,
            Err(err) => {
                log::warn!("image lookup for '{}' failed: {}", target, err);
                None
            }
        };
        let Some(image) = image else {
            return format!(
                "<a href=\"{}\" class=\"wiki-link not-exist\">{}</a>",
                escape_attr(&self.host.urls.url(UrlKind::Link, target)),
                escape_text(target)
            );
        };

        let mut style = String::new();
        push_style(&mut style, "text-align", attr(attributes, "align"));
        push_style(&mut style, "background-color", attr(attributes, "bgcolor"));
        push_style(&mut style, "border-radius", attr(attributes, "border-radius"));
        push_style(&mut style, "image-rendering", attr(attributes, "rendering"));
        let width = attr(attributes, "width").map_or_else(|| image.width.to_string(), str::to_string);
        let height =
            attr(attributes, "height").map_or_else(|| image.height.to_string(), str::to_string);

        format!(
            "<img src=\"{}\" style=\"{}\" width=\"{}\" height=\"{}\" />",
            escape_attr(&self.host.urls.url(UrlKind::Image, &image.url)),
            escape_attr(&style),
            escape_attr(&width),
            escape_attr(&height)
        )
    }

    async fn footnote(
        &self,
        ctx: &mut RenderContext,
        name: Option<&str>,
        children: &[Node],
    ) -> String {
        let id = match name {
            Some(name) => (0u32..)
                .map(|n| match n {
                    0 => name.to_string(),
                    n => format!("{}_{}", name, n),
                })
                .find(|candidate| !ctx.footnote_ids.contains(candidate))
                .unwrap_or_else(|| name.to_string()),
            None => (1u32..)
                .map(|n| n.to_string())
                .find(|candidate| !ctx.footnote_ids.contains(candidate))
                .unwrap_or_default(),
        };
        ctx.footnote_ids.insert(id.clone());

        let html = self.render_nodes(ctx, children).await;
        let note = Footnote {
            id: id.clone(),
            label: id.clone(),
            html,
        };
        ctx.pending.push(note.clone());
        ctx.out.footnotes.push(note);

        let anchor = encode_id(&id);
        format!(
            "<sup id=\"fn-{anchor}\"><a href=\"#rfn-{anchor}\">[{}]</a></sup>",
            escape_text(&id)
        )
    }

    /// Write the pending footnotes and clear them.
    fn footnote_section(&self, ctx: &mut RenderContext) -> String {
        if ctx.pending.is_empty() {
            return String::new();
        }
        let mut html = String::from("<section class=\"wiki-footnotes\"><ol>");
        for note in ctx.pending.drain(..) {
            let anchor = encode_id(&note.id);
            html.push_str(&format!(
                "<li id=\"rfn-{anchor}\"><a href=\"#fn-{anchor}\">[{}]</a> <span>{}</span></li>",
                escape_text(&note.label),
                note.html
            ));
        }
        html.push_str("</ol></section>");
        html
    }

    fn table_of_contents(&self, headings: &[TocEntry]) -> String {
        let prefix = escape_attr(&self.options.heading_anchor_prefix);
        let mut html = format!(
            "<section class=\"wiki-toc\" id=\"toc\"><h2>{}</h2>",
            escape_text(&self.options.toc_title)
        );
        for heading in headings {
            html.push_str(&format!(
                "<div class=\"wiki-toc-item wiki-toc-indent-{}\"><a href=\"#{}{}\">{}.</a> {}</div>",
                heading.depth, prefix, heading.id, heading.id, heading.name
            ));
        }
        html.push_str("</section>");
        html
    }

    /// Render another page with this include's attributes as its parameters.
    async fn include(&self, name: &str, attributes: &Attributes) -> String {
        log::debug!("including '{}'", name);
        let source = match self.host.pages.find_page(name).await {
            Ok(source) => source,
            Err(err) => {
                log::warn!("include of '{}' failed: {}", name, err);
                None
            }
        };
        match source {
            Some(source) => {
                let nodes = parse_markup(&source);
                self.render(&nodes, Some(attributes)).await.html
            }
            None => error_span(&self.options.missing_include(name)),
        }
    }

    async fn table(&self, ctx: &mut RenderContext, table: &Table) -> String {
        let attrs = &table.attributes;
        let mut style = String::new();
        push_style(&mut style, "width", attr(attrs, "width"));
        push_style(&mut style, "background-color", attr(attrs, "bgcolor"));
        push_style(&mut style, "color", attr(attrs, "color"));
        push_style(&mut style, "border-color", attr(attrs, "bordercolor"));
        push_style(&mut style, "text-align", attr(attrs, "align"));

        let mut html = format!("<table class=\"wiki-table\" style=\"{}\">", escape_attr(&style));
        if let Some(caption) = &table.caption {
            let caption = self.render_nodes(ctx, caption).await;
            html.push_str(&format!("<caption>{}</caption>", caption));
        }
        html.push_str("<tbody>");

        for row in &table.rows {
            let mut style = String::new();
            push_style(&mut style, "background-color", attr(&row.attributes, "bgcolor"));
            push_style(&mut style, "color", attr(&row.attributes, "color"));
            html.push_str(&format!("<tr style=\"{}\">", escape_attr(&style)));

            for cell in &row.cells {
                let attrs = &cell.attributes;
                html.push_str("<td");
                for (key, name) in [
                    ("colspan", "colspan"),
                    ("rowspan", "rowspan"),
                    ("colbgcolor", "data-colbgcolor"),
                    ("colcolor", "data-colcolor"),
                ] {
                    if let Some(value) = attr(attrs, key) {
                        html.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
                    }
                }

                let mut style = String::new();
                push_style(&mut style, "vertical-align", attr(attrs, "vertical-align"));
                push_style(&mut style, "width", attr(attrs, "width"));
                push_style(&mut style, "height", attr(attrs, "height"));
                push_style(
                    &mut style,
                    "text-align",
                    Some(attr(attrs, "align").unwrap_or("center")),
                );
                if attr(attrs, "nopad").is_some() {
                    style.push_str("padding: 0;");
                }
                push_style(&mut style, "background-color", attr(attrs, "bgcolor"));
                push_style(&mut style, "color", attr(attrs, "color"));

                let inner = self.render_nodes(ctx, &cell.children).await;
                html.push_str(&format!(" style=\"{}\">{}</td>", escape_attr(&style), inner));
            }
            html.push_str("</tr>");
        }

        html.push_str("</tbody></table>");
        html
    }
}

/// Tokenize and parse `markup`.
fn parse_markup(markup: &str) -> Vec<Node> {
    let tokens = tokenize(markup);
    Parser::new().parse(&tokens)
}

/// Embed URL of a video, `None` if the code cannot form one.
fn embed_url(provider: VideoProvider, code: &str, attributes: &Attributes) -> Option<Url> {
    let (base, segment) = match provider {
        VideoProvider::YouTube => ("https://www.youtube.com/embed/", code.to_string()),
        VideoProvider::KakaoTv => ("https://tv.kakao.com/embed/player/cliplink/", code.to_string()),
        VideoProvider::NicoVideo => ("https://embed.nicovideo.jp/watch/", format!("sm{}", code)),
        VideoProvider::Vimeo => ("https://player.vimeo.com/video/", code.to_string()),
        VideoProvider::NaverTv => ("https://tv.naver.com/embed/", code.to_string()),
    };
    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(&segment);

    if provider == VideoProvider::YouTube {
        let start = attr(attributes, "start");
        let end = attr(attributes, "end");
        if start.is_some() || end.is_some() {
            let mut query = url.query_pairs_mut();
            if let Some(start) = start {
                query.append_pair("start", start);
            }
            if let Some(end) = end {
                query.append_pair("end", end);
            }
        }
    }
    Some(url)
}

fn video(provider: VideoProvider, code: &str, attributes: &Attributes) -> String {
    let Some(url) = embed_url(provider, code, attributes) else {
        log::debug!("skipping {} embed with code {:?}", provider.name(), code);
        return String::new();
    };
    let mut html = format!("<iframe src=\"{}\"", escape_attr(url.as_str()));
    for key in ["width", "height"] {
        if let Some(value) = attr(attributes, key) {
            html.push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
        }
    }
    html.push_str(" frameborder=\"0\" allowfullscreen loading=\"lazy\"></iframe>");
    html
}

/// `<time>` element for client-side age and D-day computation.
fn time_macro(class: &str, date: &str) -> String {
    let date = date.trim();
    if DATE.is_match(date) {
        format!("<time class=\"wiki-{}\" datetime=\"{}\"></time>", class, date)
    } else {
        error_span(&format!("invalid date '{}'", date))
    }
}

/// Inline error marker; `message` is escaped here.
fn error_span(message: &str) -> String {
    format!("<span class=\"wiki-error\">{}</span>", escape_text(message))
}

/// Non-empty attribute value.
#[inline]
fn attr<'m>(attributes: &'m Attributes, key: &str) -> Option<&'m str> {
    attributes
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

#[inline]
fn push_style(style: &mut String, property: &str, value: Option<&str>) {
    if let Some(value) = value {
        style.push_str(property);
        style.push_str(": ");
        style.push_str(value);
        style.push(';');
    }
}

fn encode_id(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes()).collect()
}

fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Escape `<`, `>` and `"` in text content.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape `"` in an attribute value.
pub fn escape_attr(value: &str) -> String {
    value.replace('"', "&quot;")
}
