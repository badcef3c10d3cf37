//! # Wikimark Core
//!
//! Tokenizer, parser and HTML renderer for a lightweight wiki markup dialect.
//!
//! Markup goes through three stages: [`tokenize`] cuts it into rule and text
//! tokens, [`Parser`] builds a tree of [`Node`]s, and [`Renderer`] turns the
//! tree into HTML while collecting categories, backlinks, footnotes and
//! headings. Page and image lookups are supplied by the caller through a
//! [`Host`].
//!
//! ## Quick Start
//!
//! ```rust
//! use wikimark_core::{tokenize, Node, Parser};
//!
//! let tokens = tokenize("== Title ==\n'''bold''' text");
//! let nodes = Parser::new().parse(&tokens);
//!
//! assert!(matches!(nodes[0], Node::Heading { depth: 2, .. }));
//! ```
//!
//! ## Error Recovery
//!
//! Parsing never fails. Malformed markup falls back to literal text, and the
//! fallbacks are reported:
//!
//! ```rust
//! use wikimark_core::{tokenize, Parser};
//!
//! let tokens = tokenize("{{{unclosed");
//! let result = Parser::new().parse_with_recovery(&tokens);
//!
//! assert_eq!(result.nodes.len(), 1);
//! assert_eq!(result.errors.len(), 1);
//! ```
//!
//! ## Rendering
//!
//! ```rust
//! use wikimark_core::host::MemoryStore;
//! use wikimark_core::{Host, Renderer};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::default().with_page("Greeting", "Hello @name=stranger@!");
//! let renderer = Renderer::new(Host::default().with_store(store));
//!
//! let output = renderer.render_markup("[include(Greeting, name=Ann)]").await;
//! assert_eq!(output.html, "Hello Ann!");
//! # }
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod host;
mod inline;
mod ladder;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod rules;
pub mod span;

pub use ast::{Node, Table};
pub use config::RenderOptions;
pub use error::{LookupError, ParseError, ParseErrorKind, ParseErrors};
pub use host::Host;
pub use lexer::{tokenize, Token};
pub use parser::{ParseResult, Parser};
pub use render::{RenderOutput, Renderer};

/// Tokenize and parse `markup` in one call.
pub fn parse(markup: &str) -> Vec<Node> {
    let tokens = tokenize(markup);
    Parser::new().parse(&tokens)
}
