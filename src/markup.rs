//! Block tokenizer and renderer for markdown documents with `:::` containers
//!
//! Container fences follow the markdown-it-container conventions: a fence of
//! three or more colons followed by a registered name opens a container, and
//! the first later line made only of at least as many colons closes it. Nest
//! containers by giving the outer fence more colons than the inner one.
//!
//! Everything outside a container fence is prose and is rendered with
//! pulldown-cmark. Container output comes from [`ContainerRule`] handlers.
//!
//! Each prose chunk between containers is parsed on its own. Single-line link
//! reference definitions (`[label]: url`) are collected from the whole
//! document and shared with every chunk, so a reference link resolves across
//! a demo block. Footnotes are not enabled.

use crate::error::Result;
use crate::types::MIN_CONTAINER_MARKER;
use lazy_static::lazy_static;
use pulldown_cmark::{html, Options, Parser as CmarkParser};
use regex::Regex;

lazy_static! {
    static ref LINK_DEFINITION: Regex = Regex::new(r"^ {0,3}\[[^\]]+\]:[ \t]*\S").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    ContainerOpen,
    ContainerClose,
    /// Markdown text rendered by pulldown-cmark
    Prose,
    /// Verbatim inner text of a raw container
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Container name; empty for content tokens
    pub name: String,
    /// +1 open, -1 close, 0 content
    pub nesting: i8,
    /// Text after the fence colons, trimmed (`details Click me`)
    pub info: String,
    pub content: String,
    /// 1-based source line the token starts on
    pub line: usize,
}

impl Token {
    fn open(name: &str, info: &str, line: usize) -> Self {
        Self {
            kind: TokenKind::ContainerOpen,
            name: name.to_string(),
            nesting: 1,
            info: info.to_string(),
            content: String::new(),
            line,
        }
    }

    fn close(name: &str, line: usize) -> Self {
        Self {
            kind: TokenKind::ContainerClose,
            name: name.to_string(),
            nesting: -1,
            info: String::new(),
            content: String::new(),
            line,
        }
    }

    fn content(kind: TokenKind, content: String, line: usize) -> Self {
        Self {
            kind,
            name: String::new(),
            nesting: 0,
            info: String::new(),
            content,
            line,
        }
    }
}

/// Handler invoked for the open and close tokens of one container type
pub trait ContainerRule<C> {
    fn name(&self) -> &str;

    /// Raw containers keep their inner text as a single verbatim token
    fn raw_content(&self) -> bool {
        false
    }

    fn open(&mut self, tokens: &[Token], idx: usize, ctx: &mut C) -> Result<String>;

    /// Called with the close token, or with the open token when the
    /// container is still open at the end of the document.
    fn close(&mut self, token: &Token, ctx: &mut C) -> Result<String>;
}

#[derive(Debug, Clone)]
struct ContainerKind {
    name: String,
    raw: bool,
}

struct OpenFence<'a> {
    marker_len: usize,
    kind: &'a ContainerKind,
    info: String,
}

/// Line-oriented block tokenizer
#[derive(Debug, Clone, Default)]
pub struct BlockTokenizer {
    containers: Vec<ContainerKind>,
}

impl BlockTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(mut self, name: &str, raw: bool) -> Self {
        self.containers.push(ContainerKind {
            name: name.to_string(),
            raw,
        });
        self
    }

    pub fn tokenize(&self, source: &str) -> Vec<Token> {
        let lines: Vec<&str> = source.lines().collect();
        let mut tokens = Vec::new();
        self.tokenize_lines(&lines, 1, &mut tokens);
        tokens
    }

    fn tokenize_lines(&self, lines: &[&str], first_line: usize, tokens: &mut Vec<Token>) {
        let mut prose: Vec<&str> = Vec::new();
        let mut prose_start = first_line;
        let mut code_fence: Option<(char, usize)> = None;
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if let Some((ch, len)) = code_fence {
                if is_code_fence_close(line, ch, len) {
                    code_fence = None;
                }
                prose.push(line);
                i += 1;
                continue;
            }

            if let Some(fence) = code_fence_open(line) {
                code_fence = Some(fence);
                if prose.is_empty() {
                    prose_start = first_line + i;
                }
                prose.push(line);
                i += 1;
                continue;
            }

            let Some(open) = self.container_open(line) else {
                if prose.is_empty() {
                    prose_start = first_line + i;
                }
                prose.push(line);
                i += 1;
                continue;
            };

            flush_prose(&mut prose, prose_start, tokens);

            let open_line = first_line + i;
            tokens.push(Token::open(&open.kind.name, &open.info, open_line));

            let close_at = find_container_close(&lines[i + 1..], open.marker_len).map(|j| i + 1 + j);
            let inner_end = close_at.unwrap_or(lines.len());
            let inner = &lines[i + 1..inner_end];

            if open.kind.raw {
                if let Some((content, offset)) = raw_content(inner) {
                    tokens.push(Token::content(TokenKind::Raw, content, open_line + 1 + offset));
                }
            } else {
                self.tokenize_lines(inner, open_line + 1, tokens);
            }

            match close_at {
                Some(j) => {
                    tokens.push(Token::close(&open.kind.name, first_line + j));
                    i = j + 1;
                }
                None => {
                    log::warn!(
                        "Container '{}' opened at line {} is never closed",
                        open.kind.name,
                        open_line
                    );
                    i = lines.len();
                }
            }
        }

        flush_prose(&mut prose, prose_start, tokens);
    }

    fn container_open(&self, line: &str) -> Option<OpenFence<'_>> {
        let rest = strip_indent(line)?;
        let marker_len = rest.chars().take_while(|&c| c == ':').count();
        if marker_len < MIN_CONTAINER_MARKER {
            return None;
        }
        let info = rest[marker_len..].trim();
        let name = info.split_whitespace().next()?;
        let kind = self.containers.iter().find(|kind| kind.name == name)?;
        Some(OpenFence {
            marker_len,
            kind,
            info: info.to_string(),
        })
    }

    pub fn is_raw(&self, name: &str) -> bool {
        self.containers.iter().any(|kind| kind.name == name && kind.raw)
    }
}

/// Up to three spaces of indentation are allowed before a fence
fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.chars().take_while(|&c| c == ' ').count();
    if indent > 3 {
        None
    } else {
        Some(&line[indent..])
    }
}

fn code_fence_open(line: &str) -> Option<(char, usize)> {
    let rest = strip_indent(line)?;
    let ch = rest.chars().next()?;
    if ch != '`' && ch != '~' {
        return None;
    }
    let len = rest.chars().take_while(|&c| c == ch).count();
    if len < 3 {
        return None;
    }
    // Backtick fences may not carry backticks in their info string
    if ch == '`' && rest[len..].contains('`') {
        return None;
    }
    Some((ch, len))
}

fn is_code_fence_close(line: &str, ch: char, len: usize) -> bool {
    let Some(rest) = strip_indent(line) else {
        return false;
    };
    let count = rest.chars().take_while(|&c| c == ch).count();
    count >= len && rest[count * ch.len_utf8()..].trim().is_empty()
}

fn find_container_close(lines: &[&str], marker_len: usize) -> Option<usize> {
    let mut code_fence: Option<(char, usize)> = None;
    for (j, line) in lines.iter().enumerate() {
        if let Some((ch, len)) = code_fence {
            if is_code_fence_close(line, ch, len) {
                code_fence = None;
            }
            continue;
        }
        if let Some(fence) = code_fence_open(line) {
            code_fence = Some(fence);
            continue;
        }
        let Some(rest) = strip_indent(line) else {
            continue;
        };
        let count = rest.chars().take_while(|&c| c == ':').count();
        if count >= marker_len && rest[count..].trim().is_empty() {
            return Some(j);
        }
    }
    None
}

/// Inner text without surrounding blank lines, plus the offset of its first line
fn raw_content(inner: &[&str]) -> Option<(String, usize)> {
    let start = inner.iter().position(|line| !line.trim().is_empty())?;
    let end = inner.iter().rposition(|line| !line.trim().is_empty())?;
    Some((inner[start..=end].join("\n"), start))
}

/// Link reference definition lines outside code fences
fn link_definitions(text: &str) -> Vec<&str> {
    let mut definitions = Vec::new();
    let mut code_fence: Option<(char, usize)> = None;
    for line in text.lines() {
        if let Some((ch, len)) = code_fence {
            if is_code_fence_close(line, ch, len) {
                code_fence = None;
            }
            continue;
        }
        if let Some(fence) = code_fence_open(line) {
            code_fence = Some(fence);
            continue;
        }
        if LINK_DEFINITION.is_match(line) {
            definitions.push(line.trim());
        }
    }
    definitions
}

fn ends_in_code_fence(text: &str) -> bool {
    let mut code_fence: Option<(char, usize)> = None;
    for line in text.lines() {
        match code_fence {
            Some((ch, len)) if is_code_fence_close(line, ch, len) => code_fence = None,
            Some(_) => {}
            None => code_fence = code_fence_open(line),
        }
    }
    code_fence.is_some()
}

fn flush_prose(prose: &mut Vec<&str>, line: usize, tokens: &mut Vec<Token>) {
    if prose.iter().any(|l| !l.trim().is_empty()) {
        tokens.push(Token::content(TokenKind::Prose, prose.join("\n"), line));
    }
    prose.clear();
}

/// Renders a token stream to HTML, dispatching containers to their rules
pub struct MarkupRenderer<'r, C> {
    rules: Vec<Box<dyn ContainerRule<C> + 'r>>,
    options: Options,
}

impl<'r, C> MarkupRenderer<'r, C> {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            options: Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS,
        }
    }

    pub fn with_container(mut self, rule: impl ContainerRule<C> + 'r) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn tokenizer(&self) -> BlockTokenizer {
        self.rules.iter().fold(BlockTokenizer::new(), |tokenizer, rule| {
            tokenizer.with_container(rule.name(), rule.raw_content())
        })
    }

    pub fn render(&mut self, source: &str, ctx: &mut C) -> Result<String> {
        let tokens = self.tokenizer().tokenize(source);
        self.render_tokens(&tokens, ctx)
    }

    pub fn render_tokens(&mut self, tokens: &[Token], ctx: &mut C) -> Result<String> {
        let mut output = String::new();
        let mut open_stack: Vec<(usize, usize)> = Vec::new();
        let definitions = tokens
            .iter()
            .filter(|token| token.kind == TokenKind::Prose)
            .flat_map(|token| link_definitions(&token.content))
            .collect::<Vec<_>>()
            .join("\n");

        for (idx, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::ContainerOpen => {
                    let Some(rule) = self.rule_index(&token.name) else {
                        continue;
                    };
                    output.push_str(&self.rules[rule].open(tokens, idx, ctx)?);
                    open_stack.push((rule, idx));
                }
                TokenKind::ContainerClose => {
                    let Some(pos) = open_stack
                        .iter()
                        .rposition(|&(rule, _)| self.rules[rule].name() == token.name)
                    else {
                        log::warn!("Stray '{}' close at line {}", token.name, token.line);
                        continue;
                    };
                    // Containers left open inside this one end with it
                    while open_stack.len() > pos + 1 {
                        if let Some((rule, open_idx)) = open_stack.pop() {
                            output.push_str(&self.rules[rule].close(&tokens[open_idx], ctx)?);
                        }
                    }
                    if let Some((rule, _)) = open_stack.pop() {
                        output.push_str(&self.rules[rule].close(token, ctx)?);
                    }
                }
                TokenKind::Prose => {
                    if definitions.is_empty() || ends_in_code_fence(&token.content) {
                        html::push_html(&mut output, CmarkParser::new_ext(&token.content, self.options));
                    } else {
                        let text = format!("{}\n\n{}", token.content, definitions);
                        html::push_html(&mut output, CmarkParser::new_ext(&text, self.options));
                    }
                }
                TokenKind::Raw => {
                    output.push_str(&token.content);
                    output.push('\n');
                }
            }
        }

        while let Some((rule, idx)) = open_stack.pop() {
            output.push_str(&self.rules[rule].close(&tokens[idx], ctx)?);
        }

        Ok(output)
    }

    fn rule_index(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name() == name)
    }
}

impl<C> Default for MarkupRenderer<'_, C> {
    fn default() -> Self {
        Self::new()
    }
}
