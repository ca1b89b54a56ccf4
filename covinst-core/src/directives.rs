//! Ignore hints and embedded source-map references in comments
//!
//! Recognized comment forms (surrounding whitespace allowed):
//! - `istanbul ignore next` suppresses the node the comment leads
//! - `istanbul ignore if` / `istanbul ignore else` suppress one side of an `if`
//! - `istanbul ignore file` anywhere in the file skips the whole file
//! - `# sourceMappingURL=<url>` (or `@`) records the source map reference
//!
//! Global invariants enforced:
//! - Scanning is read-only and deterministic
//! - When several hints lead a node, the last one wins

use regex::Regex;
use std::sync::OnceLock;
use swc_common::comments::{Comment, Comments, SingleThreadedComments};
use swc_common::{BytePos, SourceMap, Span};
use swc_ecma_ast::Expr;

static HINT_RE: OnceLock<Regex> = OnceLock::new();
static FILE_RE: OnceLock<Regex> = OnceLock::new();
static SOURCE_MAP_RE: OnceLock<Regex> = OnceLock::new();

/// Scope of an `istanbul ignore` hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreHint {
    Next,
    If,
    Else,
}

fn hint_in(text: &str) -> Option<IgnoreHint> {
    let re = HINT_RE.get_or_init(|| Regex::new(r"^\s*istanbul\s+ignore\s+(if|else|next)\b").unwrap());
    let caps = re.captures(text.trim())?;
    match &caps[1] {
        "if" => Some(IgnoreHint::If),
        "else" => Some(IgnoreHint::Else),
        _ => Some(IgnoreHint::Next),
    }
}

fn is_file_hint(text: &str) -> bool {
    let re = FILE_RE.get_or_init(|| Regex::new(r"^\s*istanbul\s+ignore\s+(file)\b").unwrap());
    re.is_match(text.trim())
}

fn source_map_url_in(text: &str) -> Option<String> {
    let re = SOURCE_MAP_RE
        .get_or_init(|| Regex::new(r"(?m)[#@]\s*sourceMappingURL=(.*)\s*$").unwrap());
    let caps = re.captures(text.trim())?;
    let url = caps[1].trim();
    (!url.is_empty()).then(|| url.to_string())
}

/// A comment stored as trailing a token, with the hint it carries
struct TrailingComment {
    span: Span,
    hint: Option<IgnoreHint>,
}

/// Read-only view over the comments collected while parsing one file
pub struct DirectiveScanner<'a> {
    comments: &'a SingleThreadedComments,
    source_map: &'a SourceMap,
    /// Trailing comments sorted by position
    trailing_index: Vec<TrailingComment>,
}

impl<'a> DirectiveScanner<'a> {
    pub fn new(comments: &'a SingleThreadedComments, source_map: &'a SourceMap) -> Self {
        let (_, trailing) = comments.borrow_all();
        let mut trailing_index: Vec<TrailingComment> = trailing
            .values()
            .flatten()
            .map(|comment| TrailingComment {
                span: comment.span,
                hint: hint_in(&comment.text),
            })
            .collect();
        drop(trailing);
        trailing_index.sort_by_key(|comment| comment.span.lo);
        DirectiveScanner {
            comments,
            source_map,
            trailing_index,
        }
    }

    fn leading(&self, pos: BytePos) -> Vec<Comment> {
        self.comments.get_leading(pos).unwrap_or_default()
    }

    fn trailing(&self, pos: BytePos) -> Vec<Comment> {
        self.comments.get_trailing(pos).unwrap_or_default()
    }

    /// Ignore hint among the comments leading a node
    ///
    /// A comment on the same line after a token (`{ /* istanbul ignore next */ if ...`)
    /// is stored as trailing that token; it still leads the node when only
    /// whitespace separates the two.
    pub fn hint_for(&self, span: Span) -> Option<IgnoreHint> {
        if span.is_dummy() {
            return None;
        }
        self.leading(span.lo)
            .iter()
            .filter_map(|comment| hint_in(&comment.text))
            .last()
            .or_else(|| self.adjacent_trailing_hint(span.lo))
    }

    /// Nearest hint among trailing comments that run up to `pos`
    fn adjacent_trailing_hint(&self, pos: BytePos) -> Option<IgnoreHint> {
        let end = self
            .trailing_index
            .partition_point(|comment| comment.span.hi <= pos);
        let mut cursor = pos;
        for comment in self.trailing_index[..end].iter().rev() {
            if !self.only_whitespace_between(comment.span.hi, cursor) {
                break;
            }
            if comment.hint.is_some() {
                return comment.hint;
            }
            cursor = comment.span.lo;
        }
        None
    }

    fn only_whitespace_between(&self, lo: BytePos, hi: BytePos) -> bool {
        if lo >= hi {
            return lo == hi;
        }
        self.source_map
            .with_snippet_of_span(Span::new(lo, hi), |gap| gap.trim().is_empty())
            .unwrap_or(false)
    }

    /// Ignore hint for an expression, looking through parentheses
    ///
    /// `/* istanbul ignore next */ (a)` and `(/* istanbul ignore next */ a)`
    /// both mark `a`.
    pub fn hint_for_expr(&self, expr: &Expr) -> Option<IgnoreHint> {
        let outer = self.hint_for(swc_common::Spanned::span(expr));
        match expr {
            Expr::Paren(paren) => self.hint_for_expr(&paren.expr).or(outer),
            _ => outer,
        }
    }

    /// Source-map reference among the comments leading or trailing a node
    pub fn source_map_url(&self, span: Span) -> Option<String> {
        if span.is_dummy() {
            return None;
        }
        self.leading(span.lo)
            .iter()
            .chain(self.trailing(span.hi).iter())
            .filter_map(|comment| source_map_url_in(&comment.text))
            .last()
    }

    /// Source-map reference in comments attached at or after `pos`
    ///
    /// Picks up end-of-file trailers that are not attached to any node.
    pub fn trailing_source_map_url(&self, pos: BytePos) -> Option<String> {
        let (leading, trailing) = self.comments.borrow_all();
        let mut found: Vec<(BytePos, String)> = leading
            .iter()
            .chain(trailing.iter())
            .filter(|(at, _)| **at >= pos)
            .flat_map(|(_, comments)| comments.iter())
            .filter_map(|comment| source_map_url_in(&comment.text).map(|url| (comment.span.lo, url)))
            .collect();
        found.sort_by_key(|(at, _)| *at);
        found.pop().map(|(_, url)| url)
    }

    /// Whether any comment in the file carries `istanbul ignore file`
    pub fn file_ignored(&self) -> bool {
        let (leading, trailing) = self.comments.borrow_all();
        leading
            .values()
            .chain(trailing.values())
            .flatten()
            .any(|comment| is_file_hint(&comment.text))
    }
}
