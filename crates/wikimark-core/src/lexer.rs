//! Single-pass longest-match tokenizer.
//!
//! The lexer walks the markup once, cutting it into `rule` tokens (matched
//! markup patterns and a few synthesized openers) and `text` tokens (runs of
//! everything else).
//!
//! # Performance
//!
//! - Zero-copy: token text borrows directly from the input
//! - SIMD-accelerated line scanning via `memchr` for comments and rules
//! - Pending text is tracked as a byte offset and flushed in one slice

use std::borrow::Cow;

use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::rules;
use crate::span::Span;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9a-fA-F]{3}){1,2}$").expect("valid hex color pattern"));

/// Longest run (in characters) considered as a color name after `{{{#`.
const COLOR_LOOKAHEAD: usize = 21;

/// Whether a token matched markup or is plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A markup pattern or synthesized control token.
    Rule,
    /// A run of literal characters.
    Text,
}

/// Heading marker descriptor, shared by the opening and closing tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingMark {
    /// Number of `=` characters, 1 through 6.
    pub depth: u8,
    /// Whether the heading starts folded (`=#`).
    pub folding: bool,
}

impl HeadingMark {
    /// Text that closes a heading opened with this mark.
    fn closer(&self) -> String {
        let mut closer = String::with_capacity(self.depth as usize + 2);
        closer.push(' ');
        if self.folding {
            closer.push('#');
        }
        closer.extend(std::iter::repeat('=').take(self.depth as usize));
        closer
    }
}

/// Extra payload carried by some rule tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenData<'a> {
    Heading(HeadingMark),
    /// Raw `style` attribute of a `{{{#!wiki` block.
    Style(&'a str),
    /// Signed size delta of a `{{{+N` / `{{{-N` block.
    Size(i8),
    /// Normalized color of a `{{{#color` block.
    Color(Cow<'a, str>),
}

/// A single token with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Exact source text the token was cut from.
    pub text: &'a str,
    pub data: Option<TokenData<'a>>,
    pub span: Span,
}

impl<'a> Token<'a> {
    /// Create a plain rule token.
    #[inline]
    pub fn rule(text: &'a str, span: Span) -> Self {
        Self {
            kind: TokenKind::Rule,
            text,
            data: None,
            span,
        }
    }

    /// Create a text token.
    #[inline]
    pub fn text(text: &'a str, span: Span) -> Self {
        Self {
            kind: TokenKind::Text,
            text,
            data: None,
            span,
        }
    }

    #[inline]
    fn with_data(mut self, data: TokenData<'a>) -> Self {
        self.data = Some(data);
        self
    }

    /// Check if this is a rule token with exactly the given text.
    #[inline(always)]
    pub fn is(&self, text: &str) -> bool {
        self.kind == TokenKind::Rule && self.text == text
    }

    #[inline(always)]
    pub fn is_rule(&self) -> bool {
        self.kind == TokenKind::Rule
    }

    #[inline(always)]
    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }

    /// Heading descriptor, if this token opens or closes a heading.
    #[inline]
    pub fn heading(&self) -> Option<HeadingMark> {
        match self.data {
            Some(TokenData::Heading(mark)) => Some(mark),
            _ => None,
        }
    }
}

/// Tokenize `input` into an ordered token sequence.
///
/// Always terminates and consumes all of the input: concatenating the text of
/// the returned tokens reproduces the input minus discarded `##` comment lines.
///
/// ```rust
/// use wikimark_core::lexer::tokenize;
///
/// let tokens = tokenize("'''bold'''");
/// assert_eq!(tokens.len(), 3);
/// assert!(tokens[0].is("'''"));
/// ```
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).run()
}

/// Tokenizer state for one pass over the input.
pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Start of the pending text run.
    text_start: usize,
    line_start: bool,
    open_heading: Option<HeadingMark>,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            text_start: 0,
            line_start: true,
            open_heading: None,
            tokens: Vec::with_capacity(input.len() / 4 + 1),
        }
    }

    /// Consume the lexer and produce all tokens.
    pub fn run(mut self) -> Vec<Token<'a>> {
        while self.pos < self.bytes.len() {
            self.step();
        }
        self.flush_text();
        log::trace!("tokenized {} bytes into {} tokens", self.input.len(), self.tokens.len());
        self.tokens
    }

    fn step(&mut self) {
        let rest = &self.input[self.pos..];

        if self.bytes[self.pos] == b'\n' {
            self.emit(1, None);
            self.line_start = true;
            self.open_heading = None;
            return;
        }

        if self.line_start {
            if rest.starts_with("##") {
                self.skip_comment_line();
                return;
            }
            if let Some((len, mark)) = heading_open(rest) {
                self.open_heading = Some(mark);
                self.emit(len, Some(TokenData::Heading(mark)));
                self.line_start = false;
                return;
            }
            if let Some(len) = horizontal_rule(rest) {
                self.emit(len, None);
                self.line_start = false;
                return;
            }
        }
        self.line_start = false;

        if let Some(mark) = self.open_heading {
            let closer = mark.closer();
            let line = line_of(rest);
            if line.strip_suffix('\r').unwrap_or(line) == closer {
                self.open_heading = None;
                self.emit(closer.len(), Some(TokenData::Heading(mark)));
                return;
            }
        }

        if let Some(rule) = rules::longest_match(rest) {
            self.emit(rule.len(), None);
            return;
        }

        if rest.starts_with("{{{") {
            let (len, data) = block_opener(rest);
            self.emit(len, data);
            return;
        }

        // Plain character; a backslash falls through here too and stays in the text.
        let width = rest.chars().next().map_or(1, char::len_utf8);
        self.pos += width;
    }

    /// Drop a `##` line together with its newline.
    fn skip_comment_line(&mut self) {
        self.flush_text();
        self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
            Some(offset) => self.pos + offset + 1,
            None => self.bytes.len(),
        };
        self.text_start = self.pos;
    }

    /// Flush pending text and emit a rule token covering the next `len` bytes.
    #[inline]
    fn emit(&mut self, len: usize, data: Option<TokenData<'a>>) {
        self.flush_text();
        let end = self.pos + len;
        let mut token = Token::rule(&self.input[self.pos..end], Span::from_range(self.pos, end));
        if let Some(data) = data {
            token = token.with_data(data);
        }
        self.tokens.push(token);
        self.pos = end;
        self.text_start = end;
    }

    #[inline(always)]
    fn flush_text(&mut self) {
        if self.text_start < self.pos {
            let span = Span::from_range(self.text_start, self.pos);
            self.tokens
                .push(Token::text(&self.input[self.text_start..self.pos], span));
        }
        self.text_start = self.pos;
    }
}

/// The rest of the current line, without its newline.
#[inline]
fn line_of(rest: &str) -> &str {
    match memchr(b'\n', rest.as_bytes()) {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// `={1,6}#? ` at line start.
fn heading_open(rest: &str) -> Option<(usize, HeadingMark)> {
    let bytes = rest.as_bytes();
    let depth = bytes.iter().take_while(|&&b| b == b'=').count();
    if !(1..=6).contains(&depth) {
        return None;
    }
    let folding = bytes.get(depth) == Some(&b'#');
    let space_at = depth + usize::from(folding);
    if bytes.get(space_at) != Some(&b' ') {
        return None;
    }
    Some((
        space_at + 1,
        HeadingMark {
            depth: depth as u8,
            folding,
        },
    ))
}

/// A line made only of 4 to 9 dashes.
fn horizontal_rule(rest: &str) -> Option<usize> {
    let line = line_of(rest);
    let line = line.strip_suffix('\r').unwrap_or(line);
    let ok = (4..=9).contains(&line.len()) && line.bytes().all(|b| b == b'-');
    ok.then_some(line.len())
}

/// Recognize the `{{{`-family openers that the rule table does not list.
///
/// Returns the consumed length and the payload. Falls back to a bare `{{{`.
fn block_opener(rest: &str) -> (usize, Option<TokenData<'_>>) {
    const WIKI: &str = "{{{#!wiki";
    const STYLE: &str = " style=\"";

    if let Some(after) = rest.strip_prefix(WIKI) {
        if let Some(quoted) = after.strip_prefix(STYLE) {
            if let Some(close) = memchr(b'"', quoted.as_bytes()) {
                let len = WIKI.len() + STYLE.len() + close + 1;
                return (len, Some(TokenData::Style(&quoted[..close])));
            }
        }
        return (WIKI.len(), Some(TokenData::Style("")));
    }

    let bytes = rest.as_bytes();
    if bytes.len() >= 6
        && matches!(bytes[3], b'+' | b'-')
        && bytes[4].is_ascii_digit()
        && bytes[5] == b' '
    {
        let magnitude = (bytes[4] - b'0') as i8;
        let delta = if bytes[3] == b'-' { -magnitude } else { magnitude };
        return (6, Some(TokenData::Size(delta)));
    }

    if let Some(after) = rest.strip_prefix("{{{#") {
        if let Some(color) = color_run(after) {
            let data = if HEX_COLOR.is_match(color) {
                Cow::Owned(format!("#{}", color))
            } else {
                Cow::Borrowed(color)
            };
            return (4 + color.len() + 1, Some(TokenData::Color(data)));
        }
    }

    (3, None)
}

/// A non-empty run ending at a space within the color lookahead.
fn color_run(after: &str) -> Option<&str> {
    for (count, (idx, ch)) in after.char_indices().enumerate() {
        if count > COLOR_LOOKAHEAD || ch == '\n' {
            return None;
        }
        if ch == ' ' {
            return (idx > 0).then(|| &after[..idx]);
        }
    }
    None
}
