//! Recursive-descent tree builder.
//!
//! One forward cursor walks the token sequence. Each rule token dispatches to
//! one production in a fixed priority order; anything no production claims
//! becomes a literal. Malformed markup never fails the parse: every fallback
//! the walker applies is recorded in [`ParseErrors`].
//!
//! Block productions (headings, `{{{` blocks, quotes, lists, indents, tables)
//! live here. Inline productions live in [`crate::inline`].

use crate::ast::{Attributes, ListMarker, Node, Table, TableCell, TableRow, VideoProvider};
use crate::error::{ParseError, ParseErrors};
use crate::inline::emphasis_builder;
use crate::ladder::{Arena, ContainerKind, DepthLadder, Handle};
use crate::lexer::{HeadingMark, Token, TokenData};
use crate::span::Span;

/// Result type for parsing that includes the recoveries applied.
#[derive(Debug)]
pub struct ParseResult {
    /// Root nodes in source order.
    pub nodes: Vec<Node>,
    /// Fallbacks applied while parsing.
    pub errors: ParseErrors,
}

impl ParseResult {
    /// Check if parsing completed without any fallback.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Wiki markup parser.
///
/// ```rust
/// use wikimark_core::{tokenize, Node, Parser};
///
/// let tokens = tokenize("''italic''");
/// let nodes = Parser::new().parse(&tokens);
/// assert!(matches!(nodes[0], Node::Italic { .. }));
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    /// Errors collected during the last parse.
    errors: ParseErrors,
}

impl Parser {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse tokens into root nodes. Recoveries stay available via [`Parser::errors`].
    pub fn parse(&mut self, tokens: &[Token<'_>]) -> Vec<Node> {
        let mut walker = Walker::new(tokens);
        let mut nodes = Vec::new();
        while !walker.at_end() {
            nodes.push(walker.walk());
        }
        log::debug!(
            "parsed {} tokens into {} root nodes ({} recoveries)",
            tokens.len(),
            nodes.len(),
            walker.errors.len()
        );
        self.errors = walker.errors;
        nodes
    }

    /// Parse tokens, returning both nodes and recoveries.
    pub fn parse_with_recovery(&mut self, tokens: &[Token<'_>]) -> ParseResult {
        let nodes = self.parse(tokens);
        ParseResult {
            nodes,
            errors: std::mem::take(&mut self.errors),
        }
    }

    /// Recoveries applied during the last [`Parser::parse`].
    pub fn errors(&self) -> &ParseErrors {
        &self.errors
    }
}

/// Cursor state shared by every production.
pub(crate) struct Walker<'t, 'a> {
    tokens: &'t [Token<'a>],
    pub(crate) pos: usize,
    pub(crate) errors: ParseErrors,
}

/// Saved cursor and error count for backtracking.
#[derive(Clone, Copy)]
pub(crate) struct Checkpoint {
    pos: usize,
    errors: usize,
}

impl<'t, 'a> Walker<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: ParseErrors::new(),
        }
    }

    // ========================================================================
    // Cursor helpers
    // ========================================================================

    #[inline(always)]
    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    #[inline(always)]
    pub(crate) fn peek(&self) -> Option<&'t Token<'a>> {
        self.tokens.get(self.pos)
    }

    #[inline(always)]
    pub(crate) fn at_rule(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    #[inline(always)]
    pub(crate) fn at_newline(&self) -> bool {
        self.at_rule("\n")
    }

    #[inline]
    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.tokens[self.pos - 1].is("\n")
    }

    /// Only quote markers, spaces and one list marker precede the cursor on
    /// this line.
    fn at_line_body_start(&self) -> bool {
        let line = &self.tokens[..self.pos];
        let start = line.iter().rposition(|t| t.is("\n")).map_or(0, |idx| idx + 1);
        let prefix = &line[start..];
        let lead = prefix
            .iter()
            .take_while(|t| t.is(">") || t.is(" "))
            .count();
        match &prefix[lead..] {
            [] => true,
            [marker, rest @ ..] => {
                lead > 0
                    && prefix[lead - 1].is(" ")
                    && marker.is_rule()
                    && ListMarker::from_rule(marker.text).is_some()
                    && rest.iter().all(|t| t.is(" "))
            }
        }
    }

    /// Span of the current token, or an empty span at the end of input.
    pub(crate) fn span_here(&self) -> Span {
        match self.peek() {
            Some(token) => token.span,
            None => self
                .tokens
                .last()
                .map_or(Span::default(), |t| Span::new(t.span.end, t.span.end)),
        }
    }

    pub(crate) fn record(&mut self, error: ParseError) {
        log::trace!("parse recovery: {}", error);
        self.errors.push(error);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            errors: self.errors.len(),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.errors.truncate(checkpoint.errors);
    }

    #[inline]
    fn is_stop(token: &Token<'_>, stops: &[&str]) -> bool {
        token.is_rule() && stops.contains(&token.text)
    }

    /// Concatenate token text up to (not including) a stop rule.
    pub(crate) fn raw_until(&mut self, stops: &[&str]) -> String {
        let mut out = String::new();
        while let Some(token) = self.peek() {
            if Self::is_stop(token, stops) {
                break;
            }
            out.push_str(token.text);
            self.pos += 1;
        }
        out
    }

    /// Walk nodes up to (not including) a stop rule.
    pub(crate) fn collect_until(&mut self, stops: &[&str]) -> Vec<Node> {
        let mut nodes = Vec::new();
        while let Some(token) = self.peek() {
            if Self::is_stop(token, stops) {
                break;
            }
            nodes.push(self.walk());
        }
        nodes
    }

    /// Walk the rest of the current line.
    #[inline]
    pub(crate) fn collect_line(&mut self) -> Vec<Node> {
        self.collect_until(&["\n"])
    }

    /// Consume `closer` if present, otherwise record the construct as unclosed.
    pub(crate) fn close(&mut self, closer: &str, construct: &str, opened: Span) -> bool {
        if self.at_rule(closer) {
            self.pos += 1;
            true
        } else {
            self.record(ParseError::unclosed(construct, Some(opened.merge(self.span_here()))));
            false
        }
    }

    /// Consume a run of single-space rule tokens, returning its length.
    fn skip_spaces(&mut self) -> usize {
        let start = self.pos;
        while self.at_rule(" ") {
            self.pos += 1;
        }
        self.pos - start
    }

    /// `spaces + list marker` starting at `idx`.
    fn list_marker_at(&self, idx: usize) -> Option<ListMarker> {
        let spaces = self.tokens[idx.min(self.tokens.len())..]
            .iter()
            .take_while(|t| t.is(" "))
            .count();
        if spaces == 0 {
            return None;
        }
        self.tokens
            .get(idx + spaces)
            .filter(|t| t.is_rule())
            .and_then(|t| ListMarker::from_rule(t.text))
    }

    fn marker_here(&self) -> Option<ListMarker> {
        self.peek()
            .filter(|t| t.is_rule())
            .and_then(|t| ListMarker::from_rule(t.text))
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Produce one node, always advancing the cursor.
    pub(crate) fn walk(&mut self) -> Node {
        let start = self.pos;
        let node = self.dispatch();
        debug_assert!(
            self.pos > start || self.at_end(),
            "parser cursor stalled at token {}",
            start
        );
        node
    }

    fn dispatch(&mut self) -> Node {
        let Some(token) = self.peek() else {
            return Node::literal(String::new());
        };

        if token.is_text() {
            self.pos += 1;
            return Node::literal(token.text);
        }

        if let Some(mark) = token.heading() {
            return self.heading(mark);
        }

        match (&token.data, token.text) {
            (Some(TokenData::Style(style)), _) => return self.styled_block(style),
            (_, "{{{#!html") => return self.raw_html(),
            (_, "{{{#!folding") => return self.folding(),
            (_, "{{{#!syntax ") => return self.syntax_block(),
            (Some(TokenData::Color(color)), _) => return self.color_span(color),
            (Some(TokenData::Size(delta)), _) => return self.size_span(*delta),
            _ => {}
        }

        if is_horizontal_rule(token.text) {
            self.pos += 1;
            self.skip_newline();
            return Node::HorizontalLine;
        }

        match token.text {
            "{{{" => return self.literal_block(),
            "[[" => return self.hyperlink(),
            "[[분류:" | "[[category:" => return self.category(),
            "[[파일:" | "[[file:" => return self.image(),
            _ => {}
        }

        if let Some(build) = emphasis_builder(token.text) {
            return self.emphasis(token.text, build);
        }

        if let Some(provider) = VideoProvider::from_rule(token.text) {
            return self.video(provider);
        }

        match token.text {
            "[*" | "[^" => return self.footnote(),
            ">" if self.at_line_start() => return self.block_quote(),
            " " if self.at_line_start() && self.list_marker_at(self.pos).is_some() => {
                return self.list()
            }
            "\n" if self.tokens.get(self.pos + 1).is_some_and(|t| t.is(" "))
                && self.list_marker_at(self.pos + 1).is_none() =>
            {
                return self.indent()
            }
            _ => {}
        }

        if let Some(node) = self.macro_node(token.text) {
            return node;
        }

        match token.text {
            "||" | "|" if self.at_line_body_start() => {
                let multiline = self.at_line_start();
                if token.text == "|" {
                    return self.captioned_table(multiline);
                }
                self.pos += 1;
                return self.table(None, multiline);
            }
            _ => {}
        }

        self.pos += 1;
        if matches!(token.text, "}}}" | "]]" | ")]" | "</math>") {
            self.record(ParseError::unexpected_token(token.text, Some(token.span)));
        }
        Node::literal(token.text)
    }

    fn skip_newline(&mut self) {
        if self.at_newline() {
            self.pos += 1;
        }
    }

    // ========================================================================
    // Headings and `{{{` blocks
    // ========================================================================

    fn heading(&mut self, mark: HeadingMark) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let mut children = Vec::new();
        while let Some(token) = self.peek() {
            if token.heading().is_some() || token.is("\n") {
                break;
            }
            children.push(self.walk());
        }
        if self.peek().is_some_and(|t| t.heading().is_some()) {
            self.pos += 1;
            self.skip_newline();
        } else {
            self.record(ParseError::unclosed("heading", Some(opened)));
        }
        Node::Heading {
            depth: mark.depth,
            folding: mark.folding,
            children,
        }
    }

    fn styled_block(&mut self, style: &str) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let children = self.collect_until(&["}}}"]);
        self.close("}}}", "wiki block", opened);
        Node::StyledBlock {
            style: style.to_string(),
            children,
        }
    }

    fn raw_html(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let html = self.raw_until(&["}}}"]);
        self.close("}}}", "html block", opened);
        Node::RawHtml { html }
    }

    fn folding(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let summary = self.collect_line();
        self.skip_newline();
        let children = self.collect_until(&["}}}"]);
        self.close("}}}", "folding block", opened);
        Node::Folding { summary, children }
    }

    fn syntax_block(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let language = self.raw_until(&["\n"]).trim().to_string();
        self.skip_newline();
        let code = self.raw_until(&["}}}"]);
        self.close("}}}", "syntax block", opened);
        Node::SyntaxBlock { language, code }
    }

    fn color_span(&mut self, color: &str) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let children = self.collect_until(&["}}}"]);
        self.close("}}}", "color block", opened);
        Node::ColorSpan {
            color: color.to_string(),
            children,
        }
    }

    fn size_span(&mut self, delta: i8) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let children = self.collect_until(&["}}}"]);
        self.close("}}}", "size block", opened);
        Node::SizeSpan { delta, children }
    }

    /// `{{{ ... }}}`: everything inside is kept as literal text.
    fn literal_block(&mut self) -> Node {
        let opened = self.span_here();
        self.pos += 1;
        let text = self.raw_until(&["}}}"]);
        self.close("}}}", "literal block", opened);
        Node::Literal { text }
    }

    // ========================================================================
    // Quotes, lists and indents
    // ========================================================================

    fn block_quote(&mut self) -> Node {
        let mut arena = Arena::default();
        let root = arena.open(ContainerKind::Quote, 1);
        let mut quotes = DepthLadder::new(root);
        let mut list: Option<DepthLadder> = None;

        while self.at_rule(">") {
            let mut depth = 0;
            while self.at_rule(">") {
                depth += 1;
                self.pos += 1;
            }
            if depth != quotes.depth() {
                list = None;
            }
            let quote = quotes.climb(&mut arena, depth, ContainerKind::Quote);

            let mut plain = false;
            if self.at_end() || self.at_newline() {
                arena.push(quote, Node::line_break());
            } else if self.at_rule(" ")
                && (list.is_some() || self.list_marker_at(self.pos).is_some())
            {
                let spaces = self.skip_spaces();
                match self.marker_here() {
                    Some(marker) => {
                        let ladder = list.get_or_insert_with(|| {
                            let nested = arena.open(ContainerKind::List(marker), 1);
                            arena.attach(quote, nested);
                            DepthLadder::new(nested)
                        });
                        self.list_item(&mut arena, ladder, spaces, marker);
                    }
                    None => {
                        let current = list.as_ref().map(DepthLadder::current);
                        self.continuation(&mut arena, current, quote);
                    }
                }
            } else {
                list = None;
                plain = true;
                let line = self.collect_line();
                arena.extend(quote, line);
            }

            if !self.at_newline() {
                break;
            }
            self.pos += 1;
            if plain && self.at_rule(">") {
                arena.push(quote, Node::line_break());
            }
        }

        arena.finish(root)
    }

    fn list(&mut self) -> Node {
        let mut arena = Arena::default();
        let first = self
            .list_marker_at(self.pos)
            .unwrap_or(ListMarker::Bullet);
        let root = arena.open(ContainerKind::List(first), 1);
        let mut ladder = DepthLadder::new(root);

        while self.at_rule(" ") {
            let depth = self.skip_spaces();
            match self.marker_here() {
                Some(marker) => self.list_item(&mut arena, &mut ladder, depth, marker),
                None => {
                    let current = ladder.current();
                    self.continuation(&mut arena, Some(current), current);
                }
            }
            if !self.at_newline() {
                break;
            }
            self.pos += 1;
        }

        arena.finish(root)
    }

    /// One `marker content` line at `depth`; the cursor sits on the marker.
    fn list_item(
        &mut self,
        arena: &mut Arena,
        ladder: &mut DepthLadder,
        depth: usize,
        marker: ListMarker,
    ) {
        self.pos += 1;
        let list = ladder.climb(arena, depth, ContainerKind::List(marker));
        if self.at_rule("#") {
            self.start_override(arena, list);
        }
        let item = arena.open(ContainerKind::ListItem(marker), depth);
        arena.attach(list, item);
        if self.at_end() || self.at_newline() {
            arena.push(item, Node::line_break());
        } else {
            let line = self.collect_line();
            arena.extend(item, line);
        }
    }

    /// `#N` right after a marker sets the list's start index.
    fn start_override(&mut self, arena: &mut Arena, list: Handle) {
        let at = self.span_here();
        self.pos += 1;
        let digits = self.raw_until(&[" ", "\n"]);
        if self.at_rule(" ") {
            self.pos += 1;
        }
        match digits.trim().parse::<u32>() {
            Ok(start) => arena.set_start(list, start),
            Err(_) => self.record(ParseError::invalid_param("list start index", Some(at))),
        }
    }

    /// A list-mode line without a marker continues the previous item.
    fn continuation(&mut self, arena: &mut Arena, list: Option<Handle>, fallback: Handle) {
        let line = if self.at_end() || self.at_newline() {
            Vec::new()
        } else {
            self.collect_line()
        };
        match list.and_then(|l| arena.last_item(l)) {
            Some(item) => {
                arena.push(item, Node::line_break());
                arena.extend(item, line);
            }
            None => arena.extend(fallback, line),
        }
    }

    fn indent(&mut self) -> Node {
        self.pos += 1;
        let mut arena = Arena::default();
        let root = arena.open(ContainerKind::Indent, 1);
        let mut ladder = DepthLadder::new(root);

        while self.at_rule(" ") && self.list_marker_at(self.pos).is_none() {
            let depth = self.skip_spaces();
            let node = ladder.climb(&mut arena, depth, ContainerKind::Indent);
            if self.at_end() || self.at_newline() {
                arena.push(node, Node::line_break());
            } else {
                let line = self.collect_line();
                arena.extend(node, line);
            }
            if !self.at_newline() {
                break;
            }
            self.pos += 1;
        }

        arena.finish(root)
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// `|caption|` in place of the first row's leading `||`.
    fn captioned_table(&mut self, multiline: bool) -> Node {
        let checkpoint = self.checkpoint();
        self.pos += 1;
        let caption = self.collect_until(&["|", "||", "\n"]);
        if self.at_rule("|") && !caption.is_empty() {
            self.pos += 1;
            return self.table(Some(caption), multiline);
        }
        self.restore(checkpoint);
        self.pos += 1;
        Node::literal("|")
    }

    /// Rows of cells; the cursor sits after the first `||`.
    ///
    /// A row ends at its newline. A `multiline` table goes on only while the
    /// next line starts with `||`; anything else is left for the caller. A
    /// table inside a quote, list or indent line ends with that line and
    /// leaves the newline to its container.
    fn table(&mut self, caption: Option<Vec<Node>>, multiline: bool) -> Node {
        let mut table = Table {
            caption,
            ..Table::default()
        };
        let mut row = TableRow::default();

        loop {
            let opened = self.span_here();
            let mut cell = TableCell::default();
            self.cell_attributes(&mut table.attributes, &mut row.attributes, &mut cell.attributes);
            cell.children = self.collect_until(&["||"]);
            let closed = self.close("||", "table cell", opened);
            row.cells.push(cell);
            if !closed {
                break;
            }

            self.skip_trailing_spaces();
            if self.at_end() {
                break;
            }
            if self.at_newline() {
                table.rows.push(std::mem::take(&mut row));
                if !multiline {
                    break;
                }
                self.pos += 1;
                if self.at_rule("||") {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }

        if !row.cells.is_empty() {
            table.rows.push(row);
        }
        Node::Table(table)
    }

    /// Spaces between a row's last `||` and its newline are dropped.
    fn skip_trailing_spaces(&mut self) {
        let mut idx = self.pos;
        while self.tokens.get(idx).is_some_and(|t| t.is(" ")) {
            idx += 1;
        }
        if idx != self.pos && self.tokens.get(idx).map_or(true, |t| t.is("\n")) {
            self.pos = idx;
        }
    }

    /// Consume attribute mini-tokens in front of a cell body.
    fn cell_attributes(
        &mut self,
        table: &mut Attributes,
        row: &mut Attributes,
        cell: &mut Attributes,
    ) {
        while let Some(token) = self.peek().filter(|t| t.is_rule()) {
            match token.text {
                "<-" => insert(cell, "colspan", self.table_param()),
                "<^|" | "<|" | "<v|" => {
                    let align = match token.text {
                        "<^|" => "top",
                        "<|" => "middle",
                        _ => "bottom",
                    };
                    cell.insert("vertical-align".to_string(), align.to_string());
                    let span = self.table_param();
                    if !span.is_empty() {
                        insert(cell, "rowspan", span);
                    }
                }
                "<width=" => insert(cell, "width", self.table_param()),
                "<height=" => insert(cell, "height", self.table_param()),
                "<(>" | "<:>" | "<)>" => {
                    let align = match token.text {
                        "<(>" => "left",
                        "<:>" => "center",
                        _ => "right",
                    };
                    insert(cell, "align", align.to_string());
                    self.pos += 1;
                }
                "<nopad>" => {
                    insert(cell, "nopad", "true".to_string());
                    self.pos += 1;
                }
                "<tablewidth=" | "<table width=" => insert(table, "width", self.table_param()),
                "<bgcolor=" => insert(cell, "bgcolor", self.table_param()),
                "<colbgcolor=" => insert(cell, "colbgcolor", self.table_param()),
                "<rowbgcolor=" => insert(row, "bgcolor", self.table_param()),
                "<tablebgcolor=" | "<table bgcolor=" => {
                    insert(table, "bgcolor", self.table_param())
                }
                "<color=" | "<color" => insert(cell, "color", self.table_param()),
                "<colcolor=" => insert(cell, "colcolor", self.table_param()),
                "<rowcolor=" => insert(row, "color", self.table_param()),
                "<tablecolor=" | "<table color=" => insert(table, "color", self.table_param()),
                "<tablebordercolor=" | "<table bordercolor=" => {
                    insert(table, "bordercolor", self.table_param())
                }
                text if text.starts_with("<tablealign=") || text.starts_with("<table align=") => {
                    let align = if text.ends_with("left>") {
                        "left"
                    } else if text.ends_with("center>") {
                        "center"
                    } else {
                        "right"
                    };
                    insert(table, "align", align.to_string());
                    self.pos += 1;
                }
                _ => break,
            }
        }
    }

    /// Value of a `<name=value>` attribute; the cursor sits on the opener.
    fn table_param(&mut self) -> String {
        self.pos += 1;
        let value = self.raw_until(&[">", "\n", "||"]);
        if self.at_rule(">") {
            self.pos += 1;
        }
        value
    }
}

#[inline]
fn insert(attributes: &mut Attributes, key: &str, value: String) {
    attributes.insert(key.to_string(), value);
}

/// A rule token made of 4 to 9 dashes, as produced for a whole-line rule.
#[inline]
fn is_horizontal_rule(text: &str) -> bool {
    (4..=9).contains(&text.len()) && text.bytes().all(|b| b == b'-')
}
