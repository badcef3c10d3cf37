//! Integration tests for the HTML renderer

use async_trait::async_trait;
use proptest::prelude::*;
use wikimark_core::host::{Highlighter, ImageInfo, MemoryStore, PageLookup};
use wikimark_core::render::{escape_text, BacklinkKind};
use wikimark_core::{Host, LookupError, Node, RenderOptions, RenderOutput, Renderer};

async fn render(input: &str) -> RenderOutput {
    Renderer::default().render_markup(input).await
}

async fn render_with(store: MemoryStore, input: &str) -> RenderOutput {
    Renderer::new(Host::default().with_store(store))
        .render_markup(input)
        .await
}

struct FailingPages;

#[async_trait]
impl PageLookup for FailingPages {
    async fn find_page(&self, name: &str) -> Result<Option<String>, LookupError> {
        Err(LookupError::Backend {
            name: name.to_string(),
            message: "offline".to_string(),
        })
    }

    async fn page_count(&self, _prefix: Option<&str>) -> Result<u64, LookupError> {
        Err(LookupError::Backend {
            name: String::new(),
            message: "offline".to_string(),
        })
    }
}

struct TaggingHighlighter;

impl Highlighter for TaggingHighlighter {
    fn highlight(&self, code: &str, language: &str) -> Option<String> {
        (language == "rust").then(|| format!("<code class=\"rust\">{}</code>", code.trim()))
    }

    fn highlight_auto(&self, code: &str) -> String {
        format!("<code>{}</code>", code.trim())
    }
}

// ============================================================================
// Text and Emphasis
// ============================================================================

#[tokio::test]
async fn test_render_bold() {
    assert_eq!(render("'''bold'''").await.html, "<b>bold</b>");
}

#[tokio::test]
async fn test_render_emphasis_tags() {
    let out = render("''i'' __u__ ~~s~~ ^^up^^ ,,down,,").await;
    assert_eq!(
        out.html,
        "<i>i</i> <u>u</u> <del>s</del> <sup>up</sup> <sub>down</sub>"
    );
}

#[tokio::test]
async fn test_literals_are_escaped() {
    let out = render("a < b > \"c\"").await;
    assert_eq!(out.html, "a &lt; b &gt; &quot;c&quot;");
}

#[tokio::test]
async fn test_line_break() {
    assert_eq!(render("a[br]b").await.html, "a<br />b");
}

#[tokio::test]
async fn test_lone_delimiter_renders_doubled() {
    assert_eq!(render("'''").await.html, "''''''");
}

// ============================================================================
// Headings and Table of Contents
// ============================================================================

#[tokio::test]
async fn test_heading_markup() {
    let out = render("= A =").await;
    assert_eq!(
        out.html,
        "<h1 id=\"s-1\" class=\"wiki-heading\"><a href=\"#toc\">1.</a> A</h1>"
    );
}

#[tokio::test]
async fn test_folding_heading_class() {
    let out = render("=# A #=").await;
    assert!(out.html.contains("class=\"wiki-heading wiki-close-heading\""));
    assert!(!out.headings[0].closed);
}

#[tokio::test]
async fn test_heading_numbering_sequence() {
    let out = render("= A =\n= B =\n= C =").await;
    let ids: Vec<&str> = out.headings.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_heading_numbering_nests_and_resets() {
    let out = render("= A =\n== B ==\n== C ==\n= D =\n== E ==").await;
    let ids: Vec<&str> = out.headings.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "1.1", "1.2", "2", "2.1"]);
}

#[tokio::test]
async fn test_heading_names_are_stripped() {
    let out = render("= '''Bold''' title =").await;
    assert_eq!(out.headings[0].name, "Bold title");
}

#[tokio::test]
async fn test_table_of_contents_lists_later_headings() {
    let out = render("[목차]\n= A =\n== B ==").await;
    assert!(out.html.starts_with(
        "<section class=\"wiki-toc\" id=\"toc\"><h2>Contents</h2>\
         <div class=\"wiki-toc-item wiki-toc-indent-1\"><a href=\"#s-1\">1.</a> A</div>\
         <div class=\"wiki-toc-item wiki-toc-indent-2\"><a href=\"#s-1.1\">1.1.</a> B</div>\
         </section>"
    ));
}

#[tokio::test]
async fn test_options_change_toc_and_anchors() {
    let options = RenderOptions::default()
        .with_toc_title("목차")
        .with_heading_anchor_prefix("h-");
    let out = Renderer::default()
        .with_options(options)
        .render_markup("[tableofcontents]\n= A =")
        .await;
    assert!(out.html.contains("<h2>목차</h2>"));
    assert!(out.html.contains("<a href=\"#h-1\">1.</a> A"));
    assert!(out.html.contains("id=\"h-1\""));
}

// ============================================================================
// Footnotes
// ============================================================================

#[tokio::test]
async fn test_unnamed_footnotes_are_numbered() {
    let out = render("[* one][* two]").await;
    let labels: Vec<&str> = out.footnotes.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, vec!["1", "2"]);
    assert!(out
        .html
        .starts_with("<sup id=\"fn-1\"><a href=\"#rfn-1\">[1]</a></sup>"));
}

#[tokio::test]
async fn test_repeated_names_get_suffixes() {
    let out = render("[*note a][*note b]").await;
    let ids: Vec<&str> = out.footnotes.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["note", "note_1"]);
}

#[tokio::test]
async fn test_footnote_section_is_appended() {
    let out = render("x[* body]").await;
    assert!(out.html.ends_with(
        "<section class=\"wiki-footnotes\"><ol>\
         <li id=\"rfn-1\"><a href=\"#fn-1\">[1]</a> <span>body</span></li>\
         </ol></section>"
    ));
}

#[tokio::test]
async fn test_footnote_macro_flushes_once() {
    let out = render("[* a][footnote]tail").await;
    assert_eq!(out.html.matches("wiki-footnotes").count(), 1);
    assert!(out.html.ends_with("tail"));
}

#[tokio::test]
async fn test_auto_footnotes_can_be_disabled() {
    let out = Renderer::default()
        .with_options(RenderOptions::default().with_auto_footnotes(false))
        .render_markup("x[* body]")
        .await;
    assert!(!out.html.contains("wiki-footnotes"));
    assert_eq!(out.footnotes.len(), 1);
}

// ============================================================================
// Links, Categories and Images
// ============================================================================

#[tokio::test]
async fn test_missing_page_link() {
    let out = render("[[Page]]").await;
    assert_eq!(
        out.html,
        "<a href=\"/wiki/Page\" class=\"wiki-link not-exist\">Page</a>"
    );
    assert_eq!(out.backlinks.len(), 1);
    assert_eq!(out.backlinks[0].kind, BacklinkKind::Link);
}

#[tokio::test]
async fn test_existing_page_link() {
    let store = MemoryStore::default().with_page("Page", "content");
    let out = render_with(store, "[[Page|go]]").await;
    assert_eq!(out.html, "<a href=\"/wiki/Page\" class=\"wiki-link\">go</a>");
}

#[tokio::test]
async fn test_external_link() {
    let out = render("[[https://example.com|site]]").await;
    assert_eq!(
        out.html,
        "<a href=\"https://example.com\" class=\"wiki-link external-link\">site</a>"
    );
    assert!(out.backlinks.is_empty());
}

#[tokio::test]
async fn test_category_is_collected_not_rendered() {
    let out = render("[[분류:Foo]][[category:Bar]]").await;
    assert_eq!(out.html, "");
    assert_eq!(out.categories, vec!["Foo", "Bar"]);
    assert!(out.backlinks.iter().all(|b| b.kind == BacklinkKind::Category));
}

#[tokio::test]
async fn test_missing_image_renders_link() {
    let out = render("[[file:x.png]]").await;
    assert_eq!(
        out.html,
        "<a href=\"/wiki/x.png\" class=\"wiki-link not-exist\">x.png</a>"
    );
    assert_eq!(out.backlinks[0].kind, BacklinkKind::Image);
}

#[tokio::test]
async fn test_image_uses_metadata_and_overrides() {
    let store = MemoryStore::default().with_image(
        "cat.png",
        ImageInfo {
            url: "c/cat.png".to_string(),
            width: 64,
            height: 48,
        },
    );
    let out = render_with(store, "[[file:cat.png|width=100&bgcolor=red]]").await;
    assert_eq!(
        out.html,
        "<img src=\"/files/c/cat.png\" style=\"background-color: red;\" width=\"100\" height=\"48\" />"
    );
}

#[tokio::test]
async fn test_lookup_errors_degrade_to_misses() {
    let host = Host::default().with_pages(FailingPages);
    let renderer = Renderer::new(host);

    let link = renderer.render_markup("[[X]]").await;
    assert!(link.html.contains("not-exist"));

    let include = renderer.render_markup("[include(X)]").await;
    assert_eq!(
        include.html,
        "<span class=\"wiki-error\">'X' does not exist.</span>"
    );

    let count = renderer.render_markup("[pagecount]").await;
    assert_eq!(count.html, "0");
}

// ============================================================================
// Templates
// ============================================================================

#[tokio::test]
async fn test_include_substitutes_params() {
    let store = MemoryStore::default().with_page("Greeting", "Hello @name=stranger@!");
    let out = render_with(store.clone(), "[include(Greeting, name=Ann)]").await;
    assert_eq!(out.html, "Hello Ann!");

    let fallback = render_with(store, "[include(Greeting)]").await;
    assert_eq!(fallback.html, "Hello stranger!");
}

#[tokio::test]
async fn test_param_values_are_escaped() {
    let store = MemoryStore::default().with_page("T", "@v@");
    let out = render_with(store, "[include(T, v=<b>)]").await;
    assert_eq!(out.html, "&lt;b&gt;");
}

#[tokio::test]
async fn test_missing_include_message() {
    let out = render("[include(Nope)]").await;
    assert_eq!(
        out.html,
        "<span class=\"wiki-error\">'Nope' does not exist.</span>"
    );
}

#[tokio::test]
async fn test_nested_include_is_not_expanded() {
    let store = MemoryStore::default()
        .with_page("A", "x[include(B)]")
        .with_page("B", "y");
    let out = render_with(store, "[include(A)]").await;
    assert_eq!(out.html, "x");
}

#[tokio::test]
async fn test_param_outside_template_uses_fallback() {
    assert_eq!(render("@a=fb@").await.html, "fb");
    assert_eq!(render("@a@").await.html, "");
}

// ============================================================================
// Blocks
// ============================================================================

#[tokio::test]
async fn test_raw_html_goes_through_sanitizer() {
    let out = render("{{{#!html <i>x</i>}}}").await;
    assert_eq!(out.html, " &lt;i&gt;x&lt;/i&gt;");
}

#[tokio::test]
async fn test_syntax_block_falls_back_to_auto() {
    let out = render("{{{#!syntax rust\n<T>\n}}}").await;
    assert_eq!(out.html, "<pre class=\"wiki-code\">&lt;T&gt;\n</pre>");

    let renderer = Renderer::new(Host::default().with_highlighter(TaggingHighlighter));
    let known = renderer.render_markup("{{{#!syntax rust\nlet x;\n}}}").await;
    assert_eq!(
        known.html,
        "<pre class=\"wiki-code\"><code class=\"rust\">let x;</code></pre>"
    );
    let unknown = renderer.render_markup("{{{#!syntax cobol\nMOVE\n}}}").await;
    assert_eq!(unknown.html, "<pre class=\"wiki-code\"><code>MOVE</code></pre>");
}

#[tokio::test]
async fn test_color_and_size_spans() {
    let out = render("{{{#f00 red}}}{{{-1 small}}}").await;
    assert_eq!(
        out.html,
        "<span style=\"color: #f00\">red</span><span class=\"wiki-size size-down-1\">small</span>"
    );
}

#[tokio::test]
async fn test_folding_block() {
    let out = render("{{{#!folding More\nhidden}}}").await;
    assert_eq!(
        out.html,
        "<details class=\"wiki-folding\"><summary> More</summary>hidden</details>"
    );
}

#[tokio::test]
async fn test_lists_and_quotes() {
    assert_eq!(
        render(" * a").await.html,
        "<ul class=\"wiki-list\"><li> a</li></ul>"
    );
    assert_eq!(
        render(" 1.#3 x").await.html,
        "<ol class=\"wiki-list\" start=\"3\"><li class=\"wiki-list-decimal\">x</li></ol>"
    );
    assert_eq!(
        render("> a").await.html,
        "<blockquote class=\"wiki-quote\"> a</blockquote>"
    );
}

#[tokio::test]
async fn test_table_markup() {
    let out = render("||a||b||").await;
    assert_eq!(
        out.html,
        "<table class=\"wiki-table\" style=\"\"><tbody><tr style=\"\">\
         <td style=\"text-align: center;\">a</td>\
         <td style=\"text-align: center;\">b</td>\
         </tr></tbody></table>"
    );
}

#[tokio::test]
async fn test_table_cell_attributes() {
    let out = render("||<-2><bgcolor=#eee><(>wide||").await;
    assert!(out.html.contains(
        "<td colspan=\"2\" style=\"text-align: left;background-color: #eee;\">wide</td>"
    ));
}

// ============================================================================
// Macros and Embeds
// ============================================================================

#[tokio::test]
async fn test_youtube_embed() {
    let out = render("[youtube(abc, start=10)]").await;
    assert_eq!(
        out.html,
        "<iframe src=\"https://www.youtube.com/embed/abc?start=10\" \
         frameborder=\"0\" allowfullscreen loading=\"lazy\"></iframe>"
    );
}

#[tokio::test]
async fn test_nicovideo_embed_prefix() {
    let out = render("[nicovideo(123, width=640)]").await;
    assert!(out
        .html
        .starts_with("<iframe src=\"https://embed.nicovideo.jp/watch/sm123\" width=\"640\""));
}

#[tokio::test]
async fn test_age_and_dday() {
    assert_eq!(
        render("[age(2000-01-01)]").await.html,
        "<time class=\"wiki-age\" datetime=\"2000-01-01\"></time>"
    );
    assert_eq!(
        render("[dday(soon)]").await.html,
        "<span class=\"wiki-error\">invalid date 'soon'</span>"
    );
}

#[tokio::test]
async fn test_page_count() {
    let store = MemoryStore::default()
        .with_page("A", "")
        .with_page("Template:B", "");
    assert_eq!(render_with(store.clone(), "[pagecount]").await.html, "2");
    assert_eq!(render_with(store, "[pagecount(Template:)]").await.html, "1");
}

#[tokio::test]
async fn test_ruby() {
    let out = render("[ruby(漢字, ruby=かんじ)]").await;
    assert_eq!(
        out.html,
        "<ruby>漢字<rp>(</rp><rt>かんじ</rt><rp>)</rp></ruby>"
    );
}

#[tokio::test]
async fn test_math_and_clearfix() {
    assert_eq!(
        render("[math(x^2)]").await.html,
        "<katex data-latex=\"x^2\">x^2</katex>"
    );
    assert_eq!(
        render("[clearfix]").await.html,
        "<div style=\"clear: both\"></div>"
    );
}

#[tokio::test]
async fn test_comment_renders_nothing() {
    let nodes = vec![Node::Comment {
        text: "hidden".to_string(),
    }];
    assert_eq!(Renderer::default().render(&nodes, None).await.html, "");
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_runs_do_not_share_state() {
    let renderer = Renderer::default();
    let (first, second) = tokio::join!(
        renderer.render_markup("= A =\n[* a]"),
        renderer.render_markup("[* b]")
    );
    assert_eq!(first.footnotes[0].id, "1");
    assert_eq!(second.footnotes[0].id, "1");
    assert!(second.headings.is_empty());
}

fn assert_send<T: Send>(_: &T) {}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_renders_run_on_spawned_tasks() {
    let renderer = Renderer::new(
        Host::default().with_store(MemoryStore::default().with_page("Box", "@v=none@")),
    );
    let pending = renderer.render_markup("x");
    assert_send(&pending);
    drop(pending);

    let first = tokio::spawn({
        let renderer = renderer.clone();
        async move { renderer.render_markup("= A =\n[include(Box, v=1)]").await }
    });
    let second = tokio::spawn({
        let renderer = renderer.clone();
        async move { renderer.render_markup("[* note]").await }
    });

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(first.html.ends_with("</h1>1"));
    assert_eq!(first.headings.len(), 1);
    assert_eq!(second.footnotes[0].id, "1");
    assert!(second.headings.is_empty());
}

#[tokio::test]
async fn test_table_inside_quote_renders_in_blockquote() {
    let out = render("> ||a||").await;
    assert!(out.html.starts_with("<blockquote class=\"wiki-quote\"> <table"));
    assert!(out.html.ends_with("</table></blockquote>"));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_literals_never_leak_markup(text in "\\PC{0,64}") {
        prop_assume!(text != "\n");
        let nodes = vec![Node::literal(text.clone())];
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let out = runtime.block_on(Renderer::default().render(&nodes, None));
        prop_assert!(!out.html.contains('<'));
        prop_assert!(!out.html.contains('>'));
        prop_assert!(!out.html.contains('"'));
        prop_assert_eq!(out.html, escape_text(&text));
    }
}
