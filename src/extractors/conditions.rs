//! Condition function extraction
//!
//! Collects simple named predicates of the form
//! `const isDev = (ctx: Ctx) => ctx.env === 'dev';` so that steps referring to
//! them by name can carry the predicate source. Only single-expression arrow
//! bodies qualify; block bodies are skipped.

use crate::scan;
use crate::syntax::{parse_expression_source, render_callable, render_expr, DEFAULT_MAX_DEPTH};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static ARROW_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(?:^|[;}])[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*(?::[^=\n]+)?=[ \t]*(async[ \t]+)?(?:\(([^()]*)\)|([A-Za-z_$][\w$]*))[ \t]*(?::[^=;{}\n]+)?=>",
    )
    .expect("valid regex")
});

/// Marker used when a condition cannot be reconstructed
pub fn unresolved_placeholder(source: &str) -> String {
    format!("/* unresolved condition: {} */", scan::collapse_whitespace(source))
}

/// Name → `(params) => expr` text of every condition function in a source
///
/// Insertion order is first declaration; a later declaration with the same
/// name replaces the text but keeps the position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConditionTable {
    entries: IndexMap<String, String>,
}

impl ConditionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan raw source text for condition function declarations
    pub fn from_source(source: &str) -> Self {
        let text = scan::strip_comments(source);
        let literals = scan::opaque_spans(&text);
        let mut table = Self::new();

        for caps in ARROW_DECLARATION.captures_iter(&text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // A `;` or `}` boundary must be code, not part of a string
            if scan::in_spans(&literals, whole.start()) {
                continue;
            }
            let body_start = whole.end();
            if scan::next_significant(text.as_bytes(), body_start) == Some(b'{') {
                continue;
            }
            let body_end = scan::expression_end(&text, body_start, false);
            let body = text[body_start..body_end].trim();
            if body.is_empty() {
                continue;
            }

            let params = caps
                .get(3)
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| strip_param_types(m.as_str()));
            let prefix = if caps.get(2).is_some() { "async " } else { "" };
            table.insert(
                name.as_str(),
                format!("{}({}) => {}", prefix, params, render_body(body)),
            );
        }

        table
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(name.into(), text.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Table text for `name`, or the unresolved marker
    pub fn resolve(&self, name: &str) -> String {
        self.get(name)
            .map(str::to_string)
            .unwrap_or_else(|| unresolved_placeholder(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Re-render an expression body with canonical spacing
///
/// Bodies the parser rejects (typed casts, exotic syntax) keep their source
/// text with whitespace collapsed.
fn render_body(body: &str) -> String {
    match parse_expression_source(body, DEFAULT_MAX_DEPTH) {
        Ok(expr) => render_callable(&expr).unwrap_or_else(|| render_expr(&expr)),
        Err(_) => scan::collapse_whitespace(body),
    }
}

/// Remove `: Type` annotations and optional markers from a parameter list
///
/// `a: string, { b }: Props, c?: number = 1` becomes `a, { b }, c = 1`.
pub(crate) fn strip_param_types(params: &str) -> String {
    split_top_level(params, b',')
        .into_iter()
        .map(strip_one_param)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn strip_one_param(param: &str) -> String {
    let param = param.trim();
    let Some(colon) = top_level_position(param, b':', 0) else {
        return param.trim_end_matches('?').to_string();
    };
    let name = param[..colon].trim_end().trim_end_matches('?');
    match top_level_position(param, b'=', colon) {
        Some(eq) => format!("{} = {}", name, param[eq + 1..].trim()),
        None => name.to_string(),
    }
}

/// Position of `needle` at nesting depth zero, searching from `from`
///
/// Angle brackets count as nesting so generic arguments stay intact; the `>`
/// of `=>` does not close anything, and an `=` that starts `=>` or belongs to
/// a comparison is not a default-value separator.
fn top_level_position(text: &str, needle: u8, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let spans = scan::opaque_spans(text);
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        if scan::in_spans(&spans, i) {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b'>' if i > 0 && bytes[i - 1] == b'=' => {}
            b')' | b']' | b'}' | b'>' => depth = depth.saturating_sub(1),
            _ if b == needle && depth == 0 => {
                let next = bytes.get(i + 1).copied();
                if needle == b'=' && matches!(next, Some(b'>') | Some(b'=')) {
                    continue;
                }
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    while let Some(pos) = top_level_position(text, separator, start) {
        parts.push(&text[start..pos]);
        start = pos + 1;
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[test]
    fn test_extracts_and_renders_canonically() {
        let table = ConditionTable::from_source(
            "const isDeveloper=(context)=>context.flowData.type==='dev';",
        );
        assert_eq!(
            table.get("isDeveloper"),
            Some("(context) => context.flowData.type === 'dev'")
        );
    }

    #[test]
    fn test_declaration_after_statement_on_same_line() {
        let table = ConditionTable::from_source(
            "const n = 1; const isDev = (c) => c.dev;\nif (n) { run(); } let ready = (c) => c.ok;",
        );
        assert_eq!(table.get("isDev"), Some("(c) => c.dev"));
        assert_eq!(table.get("ready"), Some("(c) => c.ok"));
    }

    #[test]
    fn test_declaration_text_inside_string_is_ignored() {
        let table = ConditionTable::from_source("const s = 'x; const fake = (c) => c.no';");
        assert!(table.is_empty());
    }

    #[test]
    fn test_strips_parameter_and_return_types() {
        let table = ConditionTable::from_source(
            "export const hasPlan = (ctx: FlowContext, strict?: boolean): boolean => !!ctx.plan\n",
        );
        assert_eq!(table.get("hasPlan"), Some("(ctx, strict) => !!ctx.plan"));
    }

    #[test]
    fn test_block_bodies_are_ignored() {
        let table = ConditionTable::from_source(
            "const check = (ctx) => {\n  return ctx.ok;\n};\nconst ok = (c) => c.ok;",
        );
        assert_eq!(table.get("check"), None);
        assert_eq!(table.get("ok"), Some("(c) => c.ok"));
    }

    #[test]
    fn test_last_declaration_wins() {
        let table = ConditionTable::from_source(
            "const a = (x) => x.one;\nconst b = (x) => x.b;\nconst a = (x) => x.two;",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a"), Some("(x) => x.two"));
        assert_eq!(table.iter().next().map(|(k, _)| k), Some("a"));
    }

    #[test]
    fn test_multiline_body_and_single_param() {
        let table = ConditionTable::from_source(
            "const complex = ctx =>\n  ctx.a &&\n  ctx.b\nconst next = 1;",
        );
        assert_eq!(table.get("complex"), Some("(ctx) => ctx.a && ctx.b"));
    }

    #[test]
    fn test_commented_declarations_are_skipped() {
        let table = ConditionTable::from_source("// const old = (x) => x.legacy;\n");
        assert!(table.is_empty());
    }

    #[test]
    fn test_resolve_falls_back_to_placeholder() {
        let table = ConditionTable::new();
        assert_eq!(table.resolve("missing"), "/* unresolved condition: missing */");
    }

    #[parameterized(
        plain = { "a, b", "a, b" },
        typed = { "a: string, b: number", "a, b" },
        generic = { "m: Map<string, number>, n", "m, n" },
        destructured = { "{ a, b }: Props", "{ a, b }" },
        optional_default = { "c?: number = 1", "c = 1" },
        function_type = { "cb: (x: number) => void", "cb" },
        empty = { "", "" },
    )]
    fn test_strip_param_types(input: &str, expected: &str) {
        assert_eq!(strip_param_types(input), expected);
    }
}
