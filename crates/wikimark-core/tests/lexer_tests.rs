//! Integration tests for the tokenizer

use proptest::prelude::*;
use wikimark_core::lexer::{tokenize, TokenData, TokenKind};
use wikimark_core::span::Span;

fn texts(input: &str) -> Vec<&str> {
    tokenize(input).into_iter().map(|t| t.text).collect()
}

// ============================================================================
// Rule and Text Tokens
// ============================================================================

#[test]
fn test_emphasis_tokens() {
    let tokens = tokenize("'''bold'''");
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].kind, TokenKind::Rule);
    assert_eq!(tokens[1].kind, TokenKind::Text);
    assert_eq!(tokens[1].text, "bold");
    assert!(tokens[2].is("'''"));
}

#[test]
fn test_longest_rule_wins() {
    assert_eq!(texts("<tablebgcolor=#fff>")[0], "<tablebgcolor=");
    assert_eq!(texts("||a||")[0], "||");
    assert_eq!(texts("[[file:a]]")[0], "[[file:");
}

#[test]
fn test_korean_markers() {
    let tokens = texts("[[파일:cat]]");
    assert_eq!(tokens, vec!["[[파일:", "cat", "]]"]);
    assert_eq!(texts("[목차]"), vec!["[목차]"]);
}

#[test]
fn test_text_runs_are_flushed_once() {
    assert_eq!(texts("hello"), vec!["hello"]);
    assert_eq!(texts("a b"), vec!["a", " ", "b"]);
}

#[test]
fn test_backslash_stays_in_text() {
    let tokens = texts("\\'''x'''");
    assert_eq!(tokens, vec!["\\", "'''", "x", "'''"]);
}

#[test]
fn test_spans_point_into_source() {
    let input = "ab'''c";
    let tokens = tokenize(input);
    assert_eq!(tokens[1].span, Span::new(2, 5));
    for token in &tokens {
        assert_eq!(token.span.slice(input), Some(token.text));
    }
}

// ============================================================================
// Headings
// ============================================================================

#[test]
fn test_heading_open_and_close() {
    let tokens = tokenize("== Title ==");
    assert_eq!(tokens.len(), 3);

    let open = tokens[0].heading().unwrap();
    assert_eq!(open.depth, 2);
    assert!(!open.folding);
    assert_eq!(tokens[0].text, "== ");

    assert_eq!(tokens[1].text, "Title");
    assert_eq!(tokens[2].text, " ==");
    assert!(tokens[2].heading().is_some());
}

#[test]
fn test_folding_heading() {
    let tokens = tokenize("==# Fold #==");
    let open = tokens[0].heading().unwrap();
    assert!(open.folding);
    assert_eq!(tokens.last().unwrap().text, " #==");
}

#[test]
fn test_heading_needs_space_after_marker() {
    let tokens = tokenize("==x");
    assert!(tokens[0].heading().is_none());
}

#[test]
fn test_heading_only_at_line_start() {
    let tokens = tokenize("a = b =");
    assert!(tokens.iter().all(|t| t.heading().is_none()));
}

#[test]
fn test_unclosed_heading_does_not_leak_to_next_line() {
    let tokens = tokenize("= a\nb =");
    let marks = tokens.iter().filter(|t| t.heading().is_some()).count();
    assert_eq!(marks, 1);
}

#[test]
fn test_heading_closer_before_crlf() {
    let tokens = tokenize("= a =\r\nb");
    let marks = tokens.iter().filter(|t| t.heading().is_some()).count();
    assert_eq!(marks, 2);
}

// ============================================================================
// Line Constructs
// ============================================================================

#[test]
fn test_horizontal_rule_line() {
    assert_eq!(texts("----\nx"), vec!["----", "\n", "x"]);
    assert_eq!(texts("-----")[0], "-----");
}

#[test]
fn test_long_dash_line_is_not_a_rule() {
    let tokens = texts("------------");
    assert!(tokens.iter().all(|t| *t == "--"));
}

#[test]
fn test_comment_line_is_dropped() {
    let tokens = tokenize("## hidden\nshown");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].text, "shown");
}

// ============================================================================
// Block Openers
// ============================================================================

#[test]
fn test_wiki_block_style() {
    let tokens = tokenize("{{{#!wiki style=\"color: red\"\nhi}}}");
    assert_eq!(tokens[0].data, Some(TokenData::Style("color: red")));
    assert_eq!(tokens[0].text, "{{{#!wiki style=\"color: red\"");
}

#[test]
fn test_wiki_block_without_style() {
    let tokens = tokenize("{{{#!wiki\nhi}}}");
    assert_eq!(tokens[0].data, Some(TokenData::Style("")));
}

#[test]
fn test_size_openers() {
    assert_eq!(tokenize("{{{+2 big}}}")[0].data, Some(TokenData::Size(2)));
    let small = tokenize("{{{-1 small}}}");
    assert_eq!(small[0].data, Some(TokenData::Size(-1)));
    assert_eq!(small[0].text, "{{{-1 ");
}

#[test]
fn test_color_opener_normalizes_hex() {
    let hex = tokenize("{{{#f00 red}}}");
    assert_eq!(hex[0].data, Some(TokenData::Color("#f00".into())));

    let named = tokenize("{{{#red x}}}");
    assert_eq!(named[0].data, Some(TokenData::Color("red".into())));
}

#[test]
fn test_color_run_too_long_is_bare_opener() {
    let tokens = tokenize("{{{#abcdefghijklmnopqrstuvwxyz x}}}");
    assert_eq!(tokens[0].text, "{{{");
    assert_eq!(tokens[0].data, None);
}

#[test]
fn test_bare_opener() {
    assert_eq!(texts("{{{abc"), vec!["{{{", "abc"]);
}

#[test]
fn test_named_blocks_come_from_rule_table() {
    assert_eq!(texts("{{{#!html x}}}")[0], "{{{#!html");
    assert_eq!(texts("{{{#!syntax rust\n}}}")[0], "{{{#!syntax ");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_tokens_cover_input(input in "[a-z '=\\[\\]{}|<>*@,\n-]{0,64}") {
        let joined: String = tokenize(&input).iter().map(|t| t.text).collect();
        prop_assert_eq!(joined, input);
    }

    #[test]
    fn prop_spans_are_contiguous(input in "\\PC{0,64}") {
        let tokens = tokenize(&input);
        for pair in tokens.windows(2) {
            prop_assert!(pair[0].span.end <= pair[1].span.start);
        }
        for token in &tokens {
            prop_assert_eq!(token.span.slice(&input), Some(token.text));
        }
    }
}
