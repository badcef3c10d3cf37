//! Collaborator interfaces the renderer calls out to.
//!
//! Page storage, image metadata, URL layout, HTML sanitizing and syntax
//! highlighting belong to the deployment, not to this crate. The renderer
//! reaches them through the traits below, bundled in a [`Host`].
//!
//! Lookups are async and may fail; a failure is logged and rendered like a
//! miss. URL building, sanitizing and highlighting are synchronous.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LookupError;
use crate::render::escape_text;

/// Image metadata returned by an [`ImageLookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Storage name passed to [`UrlBuilder::url`] with [`UrlKind::Image`].
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// What a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Link,
    Image,
}

#[async_trait]
pub trait PageLookup: Send + Sync {
    /// Markup source of the page, or `None` if it does not exist.
    async fn find_page(&self, name: &str) -> Result<Option<String>, LookupError>;

    /// Number of pages, optionally restricted to names starting with `prefix`.
    async fn page_count(&self, prefix: Option<&str>) -> Result<u64, LookupError>;
}

#[async_trait]
pub trait ImageLookup: Send + Sync {
    async fn find_image(&self, name: &str) -> Result<Option<ImageInfo>, LookupError>;
}

pub trait UrlBuilder: Send + Sync {
    fn url(&self, kind: UrlKind, name: &str) -> String;
}

/// Makes raw `{{{#!html` content safe to embed.
pub trait HtmlSanitizer: Send + Sync {
    fn sanitize(&self, raw: &str) -> String;
}

pub trait Highlighter: Send + Sync {
    /// Highlight `code` as `language`; `None` if the language is unknown.
    fn highlight(&self, code: &str, language: &str) -> Option<String>;

    /// Highlight `code` with a guessed language.
    fn highlight_auto(&self, code: &str) -> String;
}

/// Collaborators handed to a renderer. Cloning shares the handles.
#[derive(Clone)]
pub struct Host {
    pub pages: Arc<dyn PageLookup>,
    pub images: Arc<dyn ImageLookup>,
    pub urls: Arc<dyn UrlBuilder>,
    pub sanitizer: Arc<dyn HtmlSanitizer>,
    pub highlighter: Arc<dyn Highlighter>,
}

impl Default for Host {
    /// No pages, no images, `/wiki/` and `/files/` URLs, escaping for raw HTML and code.
    fn default() -> Self {
        Self {
            pages: Arc::new(MemoryStore::default()),
            images: Arc::new(MemoryStore::default()),
            urls: Arc::new(PrefixUrls::default()),
            sanitizer: Arc::new(EscapeHtml),
            highlighter: Arc::new(PlainHighlighter),
        }
    }
}

impl Host {
    pub fn with_pages(mut self, pages: impl PageLookup + 'static) -> Self {
        self.pages = Arc::new(pages);
        self
    }

    pub fn with_images(mut self, images: impl ImageLookup + 'static) -> Self {
        self.images = Arc::new(images);
        self
    }

    /// Use one store for both pages and images.
    pub fn with_store<S>(mut self, store: S) -> Self
    where
        S: PageLookup + ImageLookup + 'static,
    {
        let store = Arc::new(store);
        self.pages = store.clone();
        self.images = store;
        self
    }

    pub fn with_urls(mut self, urls: impl UrlBuilder + 'static) -> Self {
        self.urls = Arc::new(urls);
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: impl HtmlSanitizer + 'static) -> Self {
        self.sanitizer = Arc::new(sanitizer);
        self
    }

    pub fn with_highlighter(mut self, highlighter: impl Highlighter + 'static) -> Self {
        self.highlighter = Arc::new(highlighter);
        self
    }
}

/// `prefix + name` URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixUrls {
    pub link_prefix: String,
    pub image_prefix: String,
}

impl Default for PrefixUrls {
    fn default() -> Self {
        Self {
            link_prefix: "/wiki/".to_string(),
            image_prefix: "/files/".to_string(),
        }
    }
}

impl UrlBuilder for PrefixUrls {
    fn url(&self, kind: UrlKind, name: &str) -> String {
        let prefix = match kind {
            UrlKind::Link => &self.link_prefix,
            UrlKind::Image => &self.image_prefix,
        };
        format!("{}{}", prefix, name)
    }
}

/// Sanitizer that escapes everything, so raw HTML shows up as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapeHtml;

impl HtmlSanitizer for EscapeHtml {
    fn sanitize(&self, raw: &str) -> String {
        escape_text(raw)
    }
}

/// Highlighter that knows no languages and escapes the code.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&self, _code: &str, _language: &str) -> Option<String> {
        None
    }

    fn highlight_auto(&self, code: &str) -> String {
        escape_text(code)
    }
}

/// In-memory pages and images.
///
/// ```rust
/// use wikimark_core::host::{ImageInfo, MemoryStore};
///
/// let store = MemoryStore::default()
///     .with_page("Template:Hello", "Hello @name@!")
///     .with_image("cat.png", ImageInfo { url: "c/cat.png".into(), width: 64, height: 48 });
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pages: HashMap<String, String>,
    images: HashMap<String, ImageInfo>,
}

impl MemoryStore {
    pub fn with_page(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert_page(name, content);
        self
    }

    pub fn with_image(mut self, name: impl Into<String>, image: ImageInfo) -> Self {
        self.images.insert(name.into(), image);
        self
    }

    pub fn insert_page(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.pages.insert(name.into(), content.into());
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[async_trait]
impl PageLookup for MemoryStore {
    async fn find_page(&self, name: &str) -> Result<Option<String>, LookupError> {
        Ok(self.pages.get(name).cloned())
    }

    async fn page_count(&self, prefix: Option<&str>) -> Result<u64, LookupError> {
        let count = match prefix {
            Some(prefix) => self.pages.keys().filter(|k| k.starts_with(prefix)).count(),
            None => self.pages.len(),
        };
        Ok(count as u64)
    }
}

#[async_trait]
impl ImageLookup for MemoryStore {
    async fn find_image(&self, name: &str) -> Result<Option<ImageInfo>, LookupError> {
        Ok(self.images.get(name).cloned())
    }
}
