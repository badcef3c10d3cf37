//! Renderer options.
//!
//! Options deserialize from any serde format with every field optional, so a
//! partial JSON file such as `{"toc_title": "목차"}` keeps the other defaults.

use serde::{Deserialize, Serialize};

/// Knobs for the HTML renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Heading of the table of contents section.
    pub toc_title: String,
    /// Append the footnote section when footnotes are still pending at the end.
    pub auto_footnotes: bool,
    /// Message for a missing included page; `{name}` is replaced by the page name.
    pub missing_include_message: String,
    /// Prefix of heading anchor ids (`s-1.2`).
    pub heading_anchor_prefix: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            toc_title: "Contents".to_string(),
            auto_footnotes: true,
            missing_include_message: "'{name}' does not exist.".to_string(),
            heading_anchor_prefix: "s-".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn with_toc_title(mut self, title: impl Into<String>) -> Self {
        self.toc_title = title.into();
        self
    }

    /// Enable or disable the trailing footnote section.
    pub fn with_auto_footnotes(mut self, enabled: bool) -> Self {
        self.auto_footnotes = enabled;
        self
    }

    pub fn with_missing_include_message(mut self, message: impl Into<String>) -> Self {
        self.missing_include_message = message.into();
        self
    }

    pub fn with_heading_anchor_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.heading_anchor_prefix = prefix.into();
        self
    }

    /// Missing-include message for `name`, unescaped.
    pub(crate) fn missing_include(&self, name: &str) -> String {
        self.missing_include_message.replace("{name}", name)
    }
}
