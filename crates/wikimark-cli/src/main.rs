//! wmcli - Tokenize, parse and render wiki markup
//!
//! Usage:
//!   wmcli [OPTIONS] <COMMAND> <FILE>
//!
//! Commands:
//!   tokens    Show the token stream
//!   parse     Parse and display the node tree
//!   render    Render to HTML
//!   stats     Show document statistics

mod store;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use serde::Serialize;
use wikimark_core::ast::text_content;
use wikimark_core::{tokenize, Host, Node, Parser, RenderOptions, Renderer, Token};

use crate::store::FsStore;

#[derive(ClapParser, Debug)]
#[command(name = "wmcli", version, about = "Tokenize, parse and render wiki markup")]
struct Cli {
    /// Show debug logs and a detailed tree
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// JSON file with render options
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of `<name>.wiki` pages for links, includes and page counts
    #[arg(long, global = true, value_name = "DIR")]
    pages: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the token stream
    Tokens { file: PathBuf },
    /// Parse and display the node tree
    Parse { file: PathBuf },
    /// Render to HTML
    Render { file: PathBuf },
    /// Show document statistics
    Stats { file: PathBuf },
}

impl Command {
    fn file(&self) -> &Path {
        match self {
            Command::Tokens { file }
            | Command::Parse { file }
            | Command::Render { file }
            | Command::Stats { file } => file,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

async fn run(cli: &Cli) -> Result<(), String> {
    let file = cli.command.file();
    let input = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("failed to read '{}': {}", file.display(), e))?;

    match cli.command {
        Command::Tokens { .. } => cmd_tokens(&input, cli.json),
        Command::Parse { .. } => cmd_parse(&input, cli),
        Command::Render { .. } => cmd_render(&input, cli).await,
        Command::Stats { .. } => cmd_stats(&input),
    }
}

// =============================================================================
// Tokens Command
// =============================================================================

#[derive(Serialize)]
struct JsonToken<'a> {
    kind: &'static str,
    text: &'a str,
    start: u32,
    end: u32,
}

impl<'a> From<&Token<'a>> for JsonToken<'a> {
    fn from(token: &Token<'a>) -> Self {
        Self {
            kind: if token.is_rule() { "rule" } else { "text" },
            text: token.text,
            start: token.span.start,
            end: token.span.end,
        }
    }
}

fn cmd_tokens(input: &str, json: bool) -> Result<(), String> {
    let tokens = tokenize(input);

    if json {
        let tokens: Vec<JsonToken<'_>> = tokens.iter().map(JsonToken::from).collect();
        return print_json(&tokens);
    }

    for token in &tokens {
        let token = JsonToken::from(token);
        println!(
            "{:>6}..{:<6} {:<4} {:?}",
            token.start, token.end, token.kind, token.text
        );
    }
    Ok(())
}

// =============================================================================
// Parse Command
// =============================================================================

fn cmd_parse(input: &str, cli: &Cli) -> Result<(), String> {
    let tokens = tokenize(input);
    let result = Parser::new().parse_with_recovery(&tokens);

    for error in result.errors.iter() {
        eprintln!("warning: {}", error);
    }

    if cli.json {
        return print_json(&result.nodes);
    }
    for node in &result.nodes {
        print_node(node, 0, cli.verbose);
    }
    Ok(())
}

fn print_node(node: &Node, indent: usize, verbose: bool) {
    let pad = "  ".repeat(indent);
    match node {
        Node::Literal { text } => println!("{}Literal {:?}", pad, text),
        Node::Table(table) => {
            println!("{}Table ({} rows)", pad, table.rows.len());
            if !verbose {
                return;
            }
            for (r, row) in table.rows.iter().enumerate() {
                for (c, cell) in row.cells.iter().enumerate() {
                    println!("{}  [{},{}] {:?}", pad, r, c, text_content(&cell.children));
                }
            }
        }
        _ => {
            println!("{}{}", pad, label(node));
            if verbose || indent == 0 {
                for child in node.children() {
                    print_node(child, indent + 1, verbose);
                }
            }
        }
    }
}

fn label(node: &Node) -> String {
    match node {
        Node::Heading { depth, folding, .. } => {
            format!("Heading depth={}{}", depth, if *folding { " folding" } else { "" })
        }
        Node::StyledBlock { style, .. } => format!("StyledBlock style={:?}", style),
        Node::RawHtml { html } => format!("RawHtml ({} bytes)", html.len()),
        Node::Folding { .. } => "Folding".to_string(),
        Node::SyntaxBlock { language, .. } => format!("SyntaxBlock language={:?}", language),
        Node::ColorSpan { color, .. } => format!("ColorSpan color={}", color),
        Node::SizeSpan { delta, .. } => format!("SizeSpan delta={}", delta),
        Node::HorizontalLine => "HorizontalLine".to_string(),
        Node::HyperLink { target, .. } => format!("HyperLink -> {}", target),
        Node::Category { name } => format!("Category {}", name),
        Node::Image { target, .. } => format!("Image {}", target),
        Node::Bold { .. } => "Bold".to_string(),
        Node::Italic { .. } => "Italic".to_string(),
        Node::Underscore { .. } => "Underscore".to_string(),
        Node::Strikethrough { .. } => "Strikethrough".to_string(),
        Node::SuperScript { .. } => "SuperScript".to_string(),
        Node::SubScript { .. } => "SubScript".to_string(),
        Node::Video { provider, code, .. } => format!("Video {} {}", provider.name(), code),
        Node::FootNote { name, .. } => format!("FootNote {}", name.as_deref().unwrap_or("*")),
        Node::BlockQuote { depth, .. } => format!("BlockQuote depth={}", depth),
        Node::List { depth, marker, .. } => format!("List depth={} {:?}", depth, marker),
        Node::ListItem { marker, .. } => format!("ListItem {:?}", marker),
        Node::Indent { depth, .. } => format!("Indent depth={}", depth),
        Node::Include { name, attributes } => {
            format!("Include {} ({} params)", name, attributes.len())
        }
        Node::Param { name, .. } => format!("Param @{}@", name),
        Node::Age { date } => format!("Age {}", date),
        Node::Dday { date } => format!("Dday {}", date),
        Node::PageCount { name } => format!("PageCount {}", name.as_deref().unwrap_or("*")),
        Node::Ruby { .. } => "Ruby".to_string(),
        Node::Math { source } => format!("Math {:?}", source),
        Node::DateTime => "DateTime".to_string(),
        Node::TableOfContents => "TableOfContents".to_string(),
        Node::TableOfFootnotes => "TableOfFootnotes".to_string(),
        Node::ClearFix => "ClearFix".to_string(),
        Node::Comment { text } => format!("Comment {:?}", text),
        Node::Literal { .. } | Node::Table(_) => format!("{:?}", node),
    }
}

// =============================================================================
// Render Command
// =============================================================================

async fn cmd_render(input: &str, cli: &Cli) -> Result<(), String> {
    let options = match &cli.config {
        Some(path) => load_options(path).await?,
        None => RenderOptions::default(),
    };
    let mut host = Host::default();
    if let Some(dir) = &cli.pages {
        host = host.with_pages(FsStore::new(dir));
    }

    let output = Renderer::new(host)
        .with_options(options)
        .render_markup(input)
        .await;

    if cli.json {
        return print_json(&output);
    }

    println!("{}", output.html);
    if cli.verbose {
        eprintln!(
            "{} headings, {} footnotes, {} backlinks, categories: {}",
            output.headings.len(),
            output.footnotes.len(),
            output.backlinks.len(),
            output.categories.join(", ")
        );
    }
    Ok(())
}

async fn load_options(path: &Path) -> Result<RenderOptions, String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("failed to read config '{}': {}", path.display(), e))?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid config '{}': {}", path.display(), e))
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(input: &str) -> Result<(), String> {
    let tokens = tokenize(input);
    let result = Parser::new().parse_with_recovery(&tokens);

    let mut stats = DocumentStats::new(input, tokens.len());
    stats.count_nodes(&result.nodes);

    println!("Document Statistics");
    println!("-------------------");
    println!("Tokens:       {}", stats.tokens);
    println!("Root nodes:   {}", result.nodes.len());
    println!();
    println!("Content:");
    println!("  Total nodes:    {}", stats.total_nodes);
    println!("  Headings:       {}", stats.headings);
    println!("  Links:          {}", stats.links);
    println!("  Footnotes:      {}", stats.footnotes);
    println!("  Lists:          {}", stats.lists);
    println!("  Tables:         {}", stats.tables);
    println!("  Includes:       {}", stats.includes);
    println!();
    println!("Size:");
    println!("  Characters:     {}", stats.chars);
    println!("  Words (est.):   {}", stats.words);
    println!("  Lines:          {}", stats.lines);
    println!();
    println!("Recoveries:     {}", result.errors.len());

    Ok(())
}

struct DocumentStats {
    tokens: usize,
    total_nodes: usize,
    headings: usize,
    links: usize,
    footnotes: usize,
    lists: usize,
    tables: usize,
    includes: usize,
    chars: usize,
    words: usize,
    lines: usize,
}

impl DocumentStats {
    fn new(input: &str, tokens: usize) -> Self {
        Self {
            tokens,
            total_nodes: 0,
            headings: 0,
            links: 0,
            footnotes: 0,
            lists: 0,
            tables: 0,
            includes: 0,
            chars: input.chars().count(),
            words: input.split_whitespace().count(),
            lines: input.lines().count(),
        }
    }

    fn count_nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.total_nodes += 1;
            match node {
                Node::Heading { .. } => self.headings += 1,
                Node::HyperLink { .. } => self.links += 1,
                Node::FootNote { .. } => self.footnotes += 1,
                Node::List { .. } => self.lists += 1,
                Node::Include { .. } => self.includes += 1,
                Node::Table(table) => {
                    self.tables += 1;
                    for cell in table.rows.iter().flat_map(|row| &row.cells) {
                        self.count_nodes(&cell.children);
                    }
                }
                _ => {}
            }
            self.count_nodes(node.children());
        }
    }
}

// =============================================================================
// JSON Output
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| format!("JSON error: {}", e))?;
    println!("{}", json);
    Ok(())
}
