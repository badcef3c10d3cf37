//! Static table of literal markup patterns.
//!
//! The lexer matches these patterns verbatim at every position. The table is
//! sorted longest-first once, so compound markers such as `<tablebgcolor=`
//! always win over shorter prefixes such as `<tablecolor=`, and `||` over `|`.

use once_cell::sync::Lazy;

/// Raw pattern list, in no particular order.
const PATTERNS: &[&str] = &[
    // Inline emphasis
    "'''", "''", "__", "~~", "--", "^^", ",,",
    // Block openers and closer (a bare `{{{` is recognized by the lexer itself)
    "{{{#!folding", "{{{#!html", "{{{#!syntax ", "}}}",
    // Links, categories and files
    "[[", "[[파일:", "[[file:", "[[분류:", "[[category:", "|", "=", "&", "]]",
    // Macros with arguments
    "[youtube(", "[kakaotv(", "[nicovideo(", "[vimeo(", "[navertv(",
    "[include(", "[age(", "[dday(", "[pagecount(", "[ruby(", "[math(", ",", ")]",
    // Argument-less macros
    "[date]", "[datetime]", "[목차]", "[tableofcontents]", "[각주]", "[footnote]",
    "[br]", "[clearfix]", "[pagecount]",
    // Footnotes, quotes, template parameters
    "[*", "[^", " ", "]", ">", "@",
    "<math>", "</math>",
    // Tables
    "||", "<-", "<:>", "<width=", "<height=", "<|", "<(>", "<)>", "<^|", "<v|", "<nopad>",
    "<tablewidth=", "<table width=", "<bgcolor=", "<colbgcolor=", "<rowbgcolor=",
    "<tablebgcolor=", "<table bgcolor=", "<color=", "<color", "<colcolor=", "<rowcolor=",
    "<tablecolor=", "<table color=", "<tablebordercolor=", "<table bordercolor=",
    "<tablealign=left>", "<table align=left>", "<tablealign=center>", "<table align=center>",
    "<tablealign=right>", "<table align=right>",
    // List markers and list start override
    "*", "1.", "a.", "A.", "i.", "I.", "#",
];

/// The rule table, longest pattern first.
pub static RULES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut rules = PATTERNS.to_vec();
    // Stable sort keeps declaration order among equal lengths.
    rules.sort_by(|a, b| b.len().cmp(&a.len()));
    rules
});

/// Find the longest rule that `rest` starts with.
#[inline]
pub fn longest_match(rest: &str) -> Option<&'static str> {
    RULES.iter().copied().find(|rule| rest.starts_with(rule))
}
