//! Tokenizer for the script subset understood by the fallback parser
//!
//! Built on logos. Keywords are not distinguished from identifiers here; the
//! parser decides by text, which keeps property names like `default` or
//! `type` trivially legal. Regex literals need context the lexer does not
//! have in a pure DFA, so `/` is re-examined against the previous token and
//! extended with [`Lexer::bump`](logos::Lexer::bump) when it starts a regex.

use crate::error::{ExtractError, Result};
use crate::scan;
use logos::Logos;
use std::ops::Range;

fn lex_template(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match scan::template_end(lex.remainder().as_bytes(), 0) {
        Some(len) => {
            lex.bump(len);
            true
        }
        None => false,
    }
}

/// All token kinds produced by [`tokenize`]
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    Comment,

    #[regex(r"[a-zA-Z_$\u{80}-\u{10FFFF}][a-zA-Z0-9_$\u{80}-\u{10FFFF}]*")]
    Ident,

    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?n?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    #[regex(r"0[xX][0-9a-fA-F_]+n?")]
    #[regex(r"0[bB][01_]+n?")]
    #[regex(r"0[oO][0-7_]+n?")]
    Number,

    #[regex(r#""([^"\\\n\r]|\\(.|\r?\n))*""#)]
    #[regex(r"'([^'\\\n\r]|\\(.|\r?\n))*'")]
    String,

    #[token("`", lex_template)]
    Template,

    /// Only produced by [`tokenize`], never by the logos automaton
    Regex,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("?.")]
    QuestionDot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=>")]
    Arrow,

    #[token("=")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("**=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token(">>>=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("&&=")]
    #[token("||=")]
    #[token("??=")]
    Assign,

    #[token("==")]
    #[token("!=")]
    #[token("===")]
    #[token("!==")]
    #[token("<")]
    #[token(">")]
    #[token("<=")]
    #[token(">=")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("**")]
    #[token("<<")]
    #[token(">>")]
    #[token(">>>")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("&&")]
    #[token("||")]
    #[token("??")]
    Operator,

    #[token("!")]
    #[token("~")]
    Prefix,

    #[token("++")]
    #[token("--")]
    Update,
}

/// A token with its byte span and whether a line break precedes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    pub newline_before: bool,
}

const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

fn regex_allowed_after(prev: Option<&Token>, source: &str) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    match prev.kind {
        TokenKind::Ident => REGEX_KEYWORDS.contains(&&source[prev.span.clone()]),
        TokenKind::Number
        | TokenKind::String
        | TokenKind::Template
        | TokenKind::Regex
        | TokenKind::RParen
        | TokenKind::RBracket
        | TokenKind::RBrace
        | TokenKind::Update => false,
        _ => true,
    }
}

/// Tokenize `source`, failing on the first unrecognized character
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens: Vec<Token> = Vec::new();
    let mut last_end = 0;

    while let Some(result) = lexer.next() {
        let mut span = lexer.span();
        let mut kind = result.map_err(|_| ExtractError::Lex { offset: span.start })?;

        let text = &source[span.clone()];
        if matches!(text, "/" | "/=") && regex_allowed_after(tokens.last(), source) {
            if let Some(end) = scan::regex_end(source.as_bytes(), span.start) {
                lexer.bump(end - span.end);
                span = lexer.span();
                kind = TokenKind::Regex;
            }
        }

        let newline_before = source[last_end..span.start].contains('\n');
        last_end = span.end;
        tokens.push(Token {
            kind,
            span,
            newline_before,
        });
    }

    Ok(tokens)
}

/// Decode a quoted string token into its value
pub fn unquote(raw: &str) -> String {
    if raw.len() < 2 {
        return String::new();
    }
    unescape(&raw[1..raw.len() - 1])
}

/// Value of a template token without substitutions
pub fn cook_template(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('`')?.strip_suffix('`')?;
    if inner.contains("${") {
        return None;
    }
    Some(unescape(inner))
}

/// Resolve backslash escapes in string or template literal contents
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex, 'x');
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex, 'u');
            }
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str, marker: char) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push(marker);
            out.push_str(hex);
        }
    }
}
