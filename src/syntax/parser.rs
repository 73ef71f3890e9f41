//! Recursive-descent parser for the fallback strategy
//!
//! Covers the declaration/expression subset that step definitions are written
//! in: variable, function and class declarations, control flow, modules,
//! destructuring, arrows, templates, optional chaining. JSX and type syntax are
//! not supported; the preprocessor removes most of the latter beforehand.
//!
//! Recursion is bounded by `max_depth` so that pathological nesting fails with
//! [`ExtractError::NestingTooDeep`] instead of exhausting the stack.

use super::ast::*;
use super::lexer::{self, tokenize, Token, TokenKind};
use crate::error::{ExtractError, Result};

/// Nesting limit used when the caller has no configuration at hand
pub const DEFAULT_MAX_DEPTH: usize = 100;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with",
];

const STRICT_RESERVED: &[&str] = &[
    "implements", "interface", "let", "package", "private", "protected", "public", "static",
    "yield", "await",
];

/// Parse a complete program under the given dialect
pub fn parse_program(source: &str, dialect: Dialect, max_depth: usize) -> Result<Program> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens, dialect, max_depth);
    let mut body = Vec::new();
    while parser.peek().is_some() {
        body.push(parser.parse_statement()?);
    }
    Ok(Program {
        body,
        origin: ParseOrigin::Full(dialect),
    })
}

/// Parse an isolated array literal as a one-statement script
pub fn parse_array_fragment(fragment: &str, max_depth: usize) -> Result<Program> {
    let expr = parse_expression_source(fragment, max_depth)?;
    match expr {
        Expr::Array(_) => Ok(Program {
            body: vec![Stmt::Expr(expr)],
            origin: ParseOrigin::ArrayFragment,
        }),
        _ => Err(ExtractError::syntax(0, "fragment is not an array literal")),
    }
}

/// Parse text that must consist of exactly one expression
pub fn parse_expression_source(source: &str, max_depth: usize) -> Result<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(source, tokens, Dialect::Script, max_depth);
    let expr = parser.parse_expression()?;
    parser.eat(";");
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ExtractError::syntax(
            token.span.start,
            "unexpected trailing input after expression",
        )),
    }
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
    depth: usize,
    max_depth: usize,
    allow_in: bool,
    in_async: bool,
    in_generator: bool,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<Token>, dialect: Dialect, max_depth: usize) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            dialect,
            depth: 0,
            max_depth,
            allow_in: true,
            in_async: dialect == Dialect::Module,
            in_generator: false,
        }
    }

    // ----- token helpers -------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn kind_at(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn kind_at_index(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    fn text_of(&self, token: &Token) -> &'src str {
        &self.source[token.span.clone()]
    }

    fn text_at(&self, n: usize) -> &'src str {
        self.tokens
            .get(self.pos + n)
            .map_or("", |t| &self.source[t.span.clone()])
    }

    fn newline_before_at(&self, n: usize) -> bool {
        self.tokens.get(self.pos + n).map_or(false, |t| t.newline_before)
    }

    /// Current token text equals `text`; string tokens carry their quotes so
    /// they never collide with punctuators or words
    fn at(&self, text: &str) -> bool {
        self.text_at(0) == text && self.peek().is_some()
    }

    fn bump(&mut self) -> Result<Token> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(ExtractError::UnexpectedEof {
                expected: "more input".to_string(),
            }),
        }
    }

    fn bump_text(&mut self) -> Result<&'src str> {
        let token = self.bump()?;
        Ok(self.text_of(&token))
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<Token> {
        if self.at(text) {
            return self.bump();
        }
        Err(self.error_expected(&format!("`{}`", text)))
    }

    fn error_expected(&self, expected: &str) -> ExtractError {
        match self.peek() {
            Some(token) => ExtractError::syntax(
                token.span.start,
                format!("expected {}, found `{}`", expected, self.text_of(token)),
            ),
            None => ExtractError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }

    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat(";") {
            return Ok(());
        }
        match self.peek() {
            None => Ok(()),
            Some(token) if token.kind == TokenKind::RBrace || token.newline_before => Ok(()),
            Some(_) => Err(self.error_expected("`;`")),
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.max_depth {
            return Err(ExtractError::NestingTooDeep {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run `f` with `in` re-enabled, restoring the previous setting afterwards
    fn with_in<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.allow_in;
        self.allow_in = true;
        let result = f(self);
        self.allow_in = saved;
        result
    }

    /// Index of the `)` matching the `(` at token index `open`
    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn is_reserved(&self, word: &str) -> bool {
        RESERVED.contains(&word)
            || (self.dialect == Dialect::Module && STRICT_RESERVED.contains(&word))
    }

    fn parse_binding_ident(&mut self) -> Result<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                let word = self.text_of(token);
                if self.is_reserved(word) {
                    return Err(ExtractError::syntax(
                        token.span.start,
                        format!("`{}` cannot be used as a binding name", word),
                    ));
                }
                self.pos += 1;
                Ok(word.to_string())
            }
            _ => Err(self.error_expected("identifier")),
        }
    }

    /// Any word is accepted after `.` and as an object key
    fn parse_property_name(&mut self) -> Result<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => Ok(self.bump_text()?.to_string()),
            _ => Err(self.error_expected("property name")),
        }
    }

    fn parse_string_literal(&mut self) -> Result<String> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::String => {
                Ok(lexer::unquote(self.bump_text()?))
            }
            _ => Err(self.error_expected("string literal")),
        }
    }

    // ----- statements ----------------------------------------------------

    fn parse_statement(&mut self) -> Result<Stmt> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt> {
        let kind = match self.peek() {
            Some(token) => token.kind,
            None => return Err(self.error_expected("statement")),
        };
        match kind {
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.bump()?;
                Ok(Stmt::Empty)
            }
            TokenKind::Ident => self.parse_word_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn starts_let_declaration(&self) -> bool {
        self.at("let")
            && matches!(
                self.kind_at(1),
                Some(TokenKind::Ident) | Some(TokenKind::LBrace) | Some(TokenKind::LBracket)
            )
    }

    fn parse_word_statement(&mut self) -> Result<Stmt> {
        match self.text_at(0) {
            "var" | "const" => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(Stmt::Var(decl))
            }
            "let" if self.starts_let_declaration() => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(Stmt::Var(decl))
            }
            "function" => Ok(Stmt::Function(self.parse_function(false)?)),
            "async" if self.text_at(1) == "function" && !self.newline_before_at(1) => {
                self.bump()?;
                Ok(Stmt::Function(self.parse_function(true)?))
            }
            "class" => Ok(Stmt::Class(self.parse_class()?)),
            "if" => self.parse_if(),
            "for" => self.parse_for(),
            "while" => {
                self.bump()?;
                self.expect("(")?;
                let test = self.with_in(|p| p.parse_expression())?;
                self.expect(")")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { test, body })
            }
            "do" => {
                self.bump()?;
                let body = Box::new(self.parse_statement()?);
                self.expect("while")?;
                self.expect("(")?;
                let test = self.with_in(|p| p.parse_expression())?;
                self.expect(")")?;
                self.eat(";");
                Ok(Stmt::DoWhile { body, test })
            }
            "return" => {
                self.bump()?;
                let arg = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(arg))
            }
            "throw" => {
                self.bump()?;
                let arg = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(arg))
            }
            "try" => self.parse_try(),
            "switch" => self.parse_switch(),
            "break" | "continue" => {
                let word = self.bump_text()?;
                let label = match self.peek() {
                    Some(token) if token.kind == TokenKind::Ident && !token.newline_before => {
                        Some(self.bump_text()?.to_string())
                    }
                    _ => None,
                };
                self.consume_semicolon()?;
                Ok(if word == "break" {
                    Stmt::Break(label)
                } else {
                    Stmt::Continue(label)
                })
            }
            "import" if !matches!(self.kind_at(1), Some(TokenKind::LParen) | Some(TokenKind::Dot)) => {
                self.parse_import()
            }
            "export" => self.parse_export(),
            word if self.kind_at(1) == Some(TokenKind::Colon) && !self.is_reserved(word) => {
                let label = self.bump_text()?.to_string();
                self.bump()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::Labeled { label, body })
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn at_statement_end(&self) -> bool {
        match self.peek() {
            None => true,
            Some(token) => {
                token.newline_before
                    || matches!(token.kind, TokenKind::Semicolon | TokenKind::RBrace)
            }
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect("{")?;
        let mut body = Vec::new();
        while !self.at("}") {
            if self.peek().is_none() {
                return Err(self.error_expected("`}`"));
            }
            body.push(self.parse_statement()?);
        }
        self.expect("}")?;
        Ok(body)
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl> {
        let kind = match self.bump_text()? {
            "var" => VarKind::Var,
            "let" => VarKind::Let,
            _ => VarKind::Const,
        };
        let mut declarators = Vec::new();
        loop {
            let target = self.parse_binding_pattern()?;
            let init = if self.eat("=") {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarators.push(Declarator { target, init });
            if !self.eat(",") {
                break;
            }
        }
        Ok(VarDecl { kind, declarators })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.bump()?;
        self.expect("(")?;
        let test = self.with_in(|p| p.parse_expression())?;
        self.expect(")")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat("else") {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        self.bump()?;
        self.eat("await");
        self.expect("(")?;

        let init = if self.at(";") {
            None
        } else {
            let saved = self.allow_in;
            self.allow_in = false;
            let head = if self.at("var") || self.at("const") || self.starts_let_declaration() {
                self.parse_var_decl().map(ForHead::Var)
            } else {
                self.parse_expression().map(ForHead::Expr)
            };
            self.allow_in = saved;
            Some(head?)
        };

        match init {
            Some(left) if self.at("of") || self.at("in") => {
                let is_of = self.bump_text()? == "of";
                let right = if is_of {
                    self.parse_assignment()?
                } else {
                    self.parse_expression()?
                };
                self.expect(")")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::ForInOf {
                    left,
                    right,
                    body,
                    is_of,
                })
            }
            init => {
                self.expect(";")?;
                let test = if self.at(";") {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(";")?;
                let update = if self.at(")") {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(")")?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::For {
                    init,
                    test,
                    update,
                    body,
                })
            }
        }
    }

    fn parse_try(&mut self) -> Result<Stmt> {
        self.bump()?;
        let block = self.parse_block()?;
        let handler = if self.eat("catch") {
            let param = if self.eat("(") {
                let param = self.parse_binding_pattern()?;
                self.expect(")")?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.eat("finally") {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_expected("`catch` or `finally`"));
        }
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_switch(&mut self) -> Result<Stmt> {
        self.bump()?;
        self.expect("(")?;
        let discriminant = self.with_in(|p| p.parse_expression())?;
        self.expect(")")?;
        self.expect("{")?;
        let mut cases = Vec::new();
        while !self.eat("}") {
            let test = if self.eat("case") {
                Some(self.parse_expression()?)
            } else {
                self.expect("default")?;
                None
            };
            self.expect(":")?;
            let mut body = Vec::new();
            while !(self.at("case") || self.at("default") || self.at("}")) {
                if self.peek().is_none() {
                    return Err(self.error_expected("`}`"));
                }
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn require_module(&self, what: &str) -> Result<()> {
        if self.dialect == Dialect::Module {
            return Ok(());
        }
        let offset = self.peek().map_or(self.source.len(), |t| t.span.start);
        Err(ExtractError::syntax(
            offset,
            format!("{} declarations are only valid in modules", what),
        ))
    }

    fn parse_specifiers(&mut self) -> Result<Vec<ModuleSpecifier>> {
        self.expect("{")?;
        let mut specifiers = Vec::new();
        while !self.at("}") {
            let name = self.parse_specifier_name()?;
            let alias = if self.eat("as") {
                Some(self.parse_specifier_name()?)
            } else {
                None
            };
            specifiers.push(ModuleSpecifier { name, alias });
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(specifiers)
    }

    fn parse_specifier_name(&mut self) -> Result<String> {
        match self.kind_at(0) {
            Some(TokenKind::String) => self.parse_string_literal(),
            _ => self.parse_property_name(),
        }
    }

    fn parse_import(&mut self) -> Result<Stmt> {
        self.require_module("import")?;
        self.bump()?;

        let mut default = None;
        let mut namespace = None;
        let mut named = Vec::new();

        if self.kind_at(0) == Some(TokenKind::String) {
            let source = self.parse_string_literal()?;
            self.consume_semicolon()?;
            return Ok(Stmt::Import {
                source,
                default,
                namespace,
                named,
            });
        }

        if self.kind_at(0) == Some(TokenKind::Ident) {
            default = Some(self.parse_binding_ident()?);
            if !self.eat(",") {
                self.expect("from")?;
                let source = self.parse_string_literal()?;
                self.consume_semicolon()?;
                return Ok(Stmt::Import {
                    source,
                    default,
                    namespace,
                    named,
                });
            }
        }

        if self.eat("*") {
            self.expect("as")?;
            namespace = Some(self.parse_binding_ident()?);
        } else {
            named = self.parse_specifiers()?;
        }
        self.expect("from")?;
        let source = self.parse_string_literal()?;
        self.consume_semicolon()?;
        Ok(Stmt::Import {
            source,
            default,
            namespace,
            named,
        })
    }

    fn parse_export(&mut self) -> Result<Stmt> {
        self.require_module("export")?;
        self.bump()?;

        if self.eat("default") {
            if self.at("function") {
                return Ok(Stmt::ExportDecl(Box::new(Stmt::Function(
                    self.parse_function(false)?,
                ))));
            }
            if self.at("async") && self.text_at(1) == "function" {
                self.bump()?;
                return Ok(Stmt::ExportDecl(Box::new(Stmt::Function(
                    self.parse_function(true)?,
                ))));
            }
            if self.at("class") {
                return Ok(Stmt::ExportDecl(Box::new(Stmt::Class(self.parse_class()?))));
            }
            let expr = self.parse_assignment()?;
            self.consume_semicolon()?;
            return Ok(Stmt::ExportDefault(expr));
        }

        if self.eat("*") {
            let alias = if self.eat("as") {
                Some(self.parse_specifier_name()?)
            } else {
                None
            };
            self.expect("from")?;
            let source = self.parse_string_literal()?;
            self.consume_semicolon()?;
            return Ok(Stmt::ExportAll { source, alias });
        }

        if self.at("{") {
            let specifiers = self.parse_specifiers()?;
            let source = if self.eat("from") {
                Some(self.parse_string_literal()?)
            } else {
                None
            };
            self.consume_semicolon()?;
            return Ok(Stmt::ExportNamed { specifiers, source });
        }

        let decl = self.parse_statement()?;
        match decl {
            Stmt::Var(_) | Stmt::Function(_) | Stmt::Class(_) => Ok(Stmt::ExportDecl(Box::new(decl))),
            _ => Err(self.error_expected("declaration after `export`")),
        }
    }

    // ----- functions and classes ----------------------------------------

    fn parse_function(&mut self, is_async: bool) -> Result<Function> {
        self.expect("function")?;
        let is_generator = self.eat("*");
        let name = if self.kind_at(0) == Some(TokenKind::Ident) {
            Some(self.parse_binding_ident()?)
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_function_body(is_async, is_generator)?;
        Ok(Function {
            name,
            params,
            body,
            is_async,
            is_generator,
        })
    }

    fn parse_function_body(&mut self, is_async: bool, is_generator: bool) -> Result<Vec<Stmt>> {
        let saved = (self.in_async, self.in_generator, self.allow_in);
        self.in_async = is_async;
        self.in_generator = is_generator;
        self.allow_in = true;
        let body = self.parse_block();
        (self.in_async, self.in_generator, self.allow_in) = saved;
        body
    }

    fn parse_params(&mut self) -> Result<Vec<Pattern>> {
        self.expect("(")?;
        let mut params = Vec::new();
        while !self.at(")") {
            if self.eat("...") {
                params.push(Pattern::Rest(Box::new(self.parse_binding_pattern()?)));
            } else {
                params.push(self.parse_binding_element()?);
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    fn parse_class(&mut self) -> Result<Class> {
        self.expect("class")?;
        let name = if self.kind_at(0) == Some(TokenKind::Ident) && !self.at("extends") {
            Some(self.parse_binding_ident()?)
        } else {
            None
        };
        let superclass = if self.eat("extends") {
            Some(Box::new(self.parse_lhs()?))
        } else {
            None
        };
        self.expect("{")?;
        let mut members = Vec::new();
        while !self.at("}") {
            if self.peek().is_none() {
                return Err(self.error_expected("`}`"));
            }
            if self.eat(";") {
                continue;
            }
            members.push(self.parse_class_member()?);
        }
        self.expect("}")?;
        Ok(Class {
            name,
            superclass,
            members,
        })
    }

    fn parse_class_member(&mut self) -> Result<ClassMember> {
        let is_static = self.at("static")
            && !matches!(self.text_at(1), "(" | "=" | ";" | "}" | "");
        if is_static {
            self.bump()?;
            if self.at("{") {
                return Ok(ClassMember::StaticBlock(self.parse_function_body(false, false)?));
            }
        }

        let (is_async, is_generator, is_accessor) = self.parse_method_modifiers()?;
        let key = self.parse_prop_key()?;

        if self.at("(") {
            let func = self.parse_method(&key, is_async, is_generator)?;
            return Ok(ClassMember::Method {
                key,
                func,
                is_static,
            });
        }
        if is_async || is_generator || is_accessor {
            return Err(self.error_expected("method parameters"));
        }

        let value = if self.eat("=") {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        self.consume_semicolon()?;
        Ok(ClassMember::Field {
            key,
            value,
            is_static,
        })
    }

    /// `get`/`set`/`async` prefixes and the generator star before a method key
    fn parse_method_modifiers(&mut self) -> Result<(bool, bool, bool)> {
        let mut is_async = false;
        let mut is_accessor = false;
        if matches!(self.text_at(0), "get" | "set" | "async") && self.starts_key_at(1) {
            if self.bump_text()? == "async" {
                is_async = true;
            } else {
                is_accessor = true;
            }
        }
        let is_generator = self.eat("*");
        Ok((is_async, is_generator, is_accessor))
    }

    fn starts_key_at(&self, n: usize) -> bool {
        match self.kind_at(n) {
            Some(TokenKind::Ident)
            | Some(TokenKind::String)
            | Some(TokenKind::Number)
            | Some(TokenKind::LBracket) => true,
            Some(TokenKind::Operator) => self.text_at(n) == "*",
            _ => false,
        }
    }

    fn parse_method(&mut self, key: &PropKey, is_async: bool, is_generator: bool) -> Result<Function> {
        let params = self.parse_params()?;
        let body = self.parse_function_body(is_async, is_generator)?;
        Ok(Function {
            name: key.name().map(str::to_string),
            params,
            body,
            is_async,
            is_generator,
        })
    }

    fn parse_prop_key(&mut self) -> Result<PropKey> {
        match self.kind_at(0) {
            Some(TokenKind::Ident) => Ok(PropKey::Ident(self.bump_text()?.to_string())),
            Some(TokenKind::String) => Ok(PropKey::Str(self.parse_string_literal()?)),
            Some(TokenKind::Number) => Ok(PropKey::Num(self.bump_text()?.to_string())),
            Some(TokenKind::LBracket) => {
                self.bump()?;
                let expr = self.with_in(|p| p.parse_assignment())?;
                self.expect("]")?;
                Ok(PropKey::Computed(Box::new(expr)))
            }
            _ => Err(self.error_expected("property key")),
        }
    }

    // ----- patterns ------------------------------------------------------

    fn parse_binding_element(&mut self) -> Result<Pattern> {
        let pattern = self.parse_binding_pattern()?;
        if self.eat("=") {
            let default = self.with_in(|p| p.parse_assignment())?;
            return Ok(Pattern::Default(Box::new(pattern), Box::new(default)));
        }
        Ok(pattern)
    }

    fn parse_binding_pattern(&mut self) -> Result<Pattern> {
        self.nested(|p| match p.kind_at(0) {
            Some(TokenKind::LBrace) => p.parse_object_pattern(),
            Some(TokenKind::LBracket) => p.parse_array_pattern(),
            _ => Ok(Pattern::Ident(p.parse_binding_ident()?)),
        })
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern> {
        self.expect("{")?;
        let mut props = Vec::new();
        while !self.at("}") {
            if self.eat("...") {
                props.push(PatternProp::Rest(Box::new(self.parse_binding_pattern()?)));
            } else {
                let key_is_word = self.kind_at(0) == Some(TokenKind::Ident);
                let key = self.parse_prop_key()?;
                if self.eat(":") {
                    let value = self.parse_binding_element()?;
                    props.push(PatternProp::KeyValue { key, value });
                } else {
                    let name = match key {
                        PropKey::Ident(name) if key_is_word => name,
                        _ => return Err(self.error_expected("`:` in object pattern")),
                    };
                    let default = if self.eat("=") {
                        Some(self.with_in(|p| p.parse_assignment())?)
                    } else {
                        None
                    };
                    props.push(PatternProp::Shorthand { name, default });
                }
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(Pattern::Object(props))
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern> {
        self.expect("[")?;
        let mut elements = Vec::new();
        loop {
            if self.at("]") {
                break;
            }
            if self.eat(",") {
                elements.push(None);
                continue;
            }
            if self.eat("...") {
                elements.push(Some(Pattern::Rest(Box::new(self.parse_binding_pattern()?))));
            } else {
                elements.push(Some(self.parse_binding_element()?));
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect("]")?;
        Ok(Pattern::Array(elements))
    }

    // ----- expressions ---------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_assignment()?;
        if !self.at(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(",") {
            items.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(items))
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        self.nested(|p| p.parse_assignment_inner())
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }
        if self.in_generator && self.at("yield") {
            return self.parse_yield();
        }

        let target = self.parse_conditional()?;
        if self.kind_at(0) != Some(TokenKind::Assign) {
            return Ok(target);
        }
        if !is_assignable(&target) {
            return Err(self.error_expected("expression before assignment operator"));
        }
        let op = self.bump_text()?.to_string();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn try_arrow(&mut self) -> Result<Option<Expr>> {
        let is_async = self.at("async")
            && self.kind_at(1) != Some(TokenKind::Arrow)
            && !self.newline_before_at(1);
        let start = self.pos + usize::from(is_async);

        let is_arrow = match self.kind_at_index(start) {
            Some(TokenKind::Ident) => self.kind_at_index(start + 1) == Some(TokenKind::Arrow),
            Some(TokenKind::LParen) => self
                .matching_paren(start)
                .map_or(false, |close| self.kind_at_index(close + 1) == Some(TokenKind::Arrow)),
            _ => false,
        };
        if !is_arrow {
            return Ok(None);
        }

        if is_async {
            self.bump()?;
        }
        let params = if self.kind_at(0) == Some(TokenKind::Ident) {
            vec![Pattern::Ident(self.parse_binding_ident()?)]
        } else {
            self.parse_params()?
        };
        self.expect("=>")?;

        let body = if self.at("{") {
            ArrowBody::Block(self.parse_function_body(is_async, false)?)
        } else {
            let saved = (self.in_async, self.in_generator);
            self.in_async = is_async;
            self.in_generator = false;
            let expr = self.parse_assignment();
            (self.in_async, self.in_generator) = saved;
            ArrowBody::Expr(Box::new(expr?))
        };

        Ok(Some(Expr::Arrow(Box::new(Arrow {
            params,
            body,
            is_async,
        }))))
    }

    fn parse_yield(&mut self) -> Result<Expr> {
        self.bump()?;
        let delegate = self.eat("*");
        let ends = match self.peek() {
            None => true,
            Some(token) => {
                token.newline_before
                    || matches!(
                        token.kind,
                        TokenKind::RParen
                            | TokenKind::RBracket
                            | TokenKind::RBrace
                            | TokenKind::Comma
                            | TokenKind::Semicolon
                            | TokenKind::Colon
                    )
            }
        };
        let arg = if ends && !delegate {
            None
        } else {
            Some(Box::new(self.parse_assignment()?))
        };
        Ok(Expr::Yield { arg, delegate })
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let test = self.parse_binary(1)?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.with_in(|p| p.parse_assignment())?;
        self.expect(":")?;
        let alternate = self.parse_assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary_precedence(&self) -> Option<(u8, &'src str)> {
        let token = self.peek()?;
        let text = self.text_of(token);
        let precedence = match token.kind {
            TokenKind::Operator => match text {
                "??" => 1,
                "||" => 2,
                "&&" => 3,
                "|" => 4,
                "^" => 5,
                "&" => 6,
                "==" | "!=" | "===" | "!==" => 7,
                "<" | ">" | "<=" | ">=" => 8,
                "<<" | ">>" | ">>>" => 9,
                "+" | "-" => 10,
                "*" | "/" | "%" => 11,
                "**" => 12,
                _ => return None,
            },
            TokenKind::Ident => match text {
                "instanceof" => 8,
                "in" if self.allow_in => 8,
                _ => return None,
            },
            _ => return None,
        };
        Some((precedence, text))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while let Some((precedence, op)) = self.binary_precedence() {
            if precedence < min_precedence {
                break;
            }
            self.bump()?;
            let next_min = if op == "**" { precedence } else { precedence + 1 };
            let right = self.nested(|p| p.parse_binary(next_min))?;
            left = Expr::Binary {
                op: op.to_string(),
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let (kind, text) = match self.peek() {
            Some(token) => (token.kind, self.text_of(token)),
            None => return Err(self.error_expected("expression")),
        };
        let is_unary = match kind {
            TokenKind::Prefix => true,
            TokenKind::Operator => matches!(text, "+" | "-"),
            TokenKind::Ident => matches!(text, "typeof" | "void" | "delete"),
            _ => false,
        };

        if is_unary {
            self.bump()?;
            let arg = self.nested(|p| p.parse_unary())?;
            return Ok(Expr::Unary {
                op: text.to_string(),
                arg: Box::new(arg),
            });
        }
        if kind == TokenKind::Update {
            self.bump()?;
            let arg = self.nested(|p| p.parse_unary())?;
            return Ok(Expr::Update {
                op: text.to_string(),
                prefix: true,
                arg: Box::new(arg),
            });
        }
        if text == "await" && self.in_async {
            self.bump()?;
            let arg = self.nested(|p| p.parse_unary())?;
            return Ok(Expr::Await(Box::new(arg)));
        }

        let expr = self.parse_lhs()?;
        match self.peek() {
            Some(token) if token.kind == TokenKind::Update && !token.newline_before => {
                let op = self.bump_text()?.to_string();
                Ok(Expr::Update {
                    op,
                    prefix: false,
                    arg: Box::new(expr),
                })
            }
            _ => Ok(expr),
        }
    }

    fn parse_lhs(&mut self) -> Result<Expr> {
        let base = if self.at("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        self.parse_call_tail(base, true)
    }

    fn parse_new(&mut self) -> Result<Expr> {
        self.nested(|p| {
            p.expect("new")?;
            if p.eat(".") {
                let property = p.parse_property_name()?;
                return Ok(Expr::Member {
                    object: Box::new(Expr::Ident("new".to_string())),
                    property: MemberProp::Ident(property),
                    optional: false,
                });
            }
            let callee = if p.at("new") {
                p.parse_new()?
            } else {
                p.parse_primary()?
            };
            let callee = p.parse_call_tail(callee, false)?;
            let args = if p.at("(") {
                p.parse_arguments()?
            } else {
                Vec::new()
            };
            Ok(Expr::New {
                callee: Box::new(callee),
                args,
            })
        })
    }

    /// `x!` non-null assertions left over from typed sources
    fn at_non_null_assertion(&self) -> bool {
        self.at("!")
            && !self.newline_before_at(0)
            && matches!(
                self.kind_at(1),
                Some(TokenKind::Dot)
                    | Some(TokenKind::QuestionDot)
                    | Some(TokenKind::RParen)
                    | Some(TokenKind::RBracket)
                    | Some(TokenKind::RBrace)
                    | Some(TokenKind::Comma)
                    | Some(TokenKind::Semicolon)
                    | None
            )
    }

    fn parse_call_tail(&mut self, mut expr: Expr, allow_call: bool) -> Result<Expr> {
        loop {
            let Some(kind) = self.kind_at(0) else {
                break;
            };
            expr = match kind {
                TokenKind::Dot => {
                    self.bump()?;
                    Expr::Member {
                        object: Box::new(expr),
                        property: MemberProp::Ident(self.parse_property_name()?),
                        optional: false,
                    }
                }
                TokenKind::QuestionDot => {
                    self.bump()?;
                    if self.at("(") {
                        Expr::Call {
                            callee: Box::new(expr),
                            args: self.parse_arguments()?,
                            optional: true,
                        }
                    } else if self.eat("[") {
                        let property = self.with_in(|p| p.parse_expression())?;
                        self.expect("]")?;
                        Expr::Member {
                            object: Box::new(expr),
                            property: MemberProp::Computed(Box::new(property)),
                            optional: true,
                        }
                    } else {
                        Expr::Member {
                            object: Box::new(expr),
                            property: MemberProp::Ident(self.parse_property_name()?),
                            optional: true,
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.bump()?;
                    let property = self.with_in(|p| p.parse_expression())?;
                    self.expect("]")?;
                    Expr::Member {
                        object: Box::new(expr),
                        property: MemberProp::Computed(Box::new(property)),
                        optional: false,
                    }
                }
                TokenKind::LParen if allow_call => Expr::Call {
                    callee: Box::new(expr),
                    args: self.parse_arguments()?,
                    optional: false,
                },
                TokenKind::Template => Expr::TaggedTemplate {
                    tag: Box::new(expr),
                    raw: self.bump_text()?.to_string(),
                },
                TokenKind::Prefix if self.at_non_null_assertion() => {
                    self.bump()?;
                    expr
                }
                _ => break,
            };
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        self.expect("(")?;
        self.with_in(|p| {
            let mut args = Vec::new();
            while !p.at(")") {
                if p.eat("...") {
                    args.push(Expr::Spread(Box::new(p.parse_assignment()?)));
                } else {
                    args.push(p.parse_assignment()?);
                }
                if !p.eat(",") {
                    break;
                }
            }
            p.expect(")")?;
            Ok(args)
        })
    }

    /// Every operand level counts toward the limit, so one unit of depth
    /// stays a handful of frames however the nesting is spelled
    fn parse_primary(&mut self) -> Result<Expr> {
        self.nested(|p| p.parse_primary_inner())
    }

    fn parse_primary_inner(&mut self) -> Result<Expr> {
        let (kind, text, offset) = match self.peek() {
            Some(token) => (token.kind, self.text_of(token), token.span.start),
            None => return Err(self.error_expected("expression")),
        };

        match kind {
            TokenKind::Ident => self.parse_word_expression(text, offset),
            TokenKind::Number => {
                self.bump()?;
                Ok(Expr::Num(text.to_string()))
            }
            TokenKind::String => {
                self.bump()?;
                Ok(Expr::Str(StrLit {
                    value: lexer::unquote(text),
                    raw: text.to_string(),
                }))
            }
            TokenKind::Template => {
                self.bump()?;
                Ok(Expr::Template {
                    raw: text.to_string(),
                    cooked: lexer::cook_template(text),
                })
            }
            TokenKind::Regex => {
                self.bump()?;
                Ok(Expr::Regex(text.to_string()))
            }
            TokenKind::LParen => {
                self.bump()?;
                let inner = self.with_in(|p| p.parse_expression())?;
                self.expect(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::Operator if text == "<" => Err(ExtractError::syntax(
                offset,
                "JSX and type arguments are not supported",
            )),
            _ => Err(self.error_expected("expression")),
        }
    }

    fn parse_word_expression(&mut self, word: &'src str, offset: usize) -> Result<Expr> {
        match word {
            "function" => Ok(Expr::Function(Box::new(self.parse_function(false)?))),
            "async" if self.text_at(1) == "function" && !self.newline_before_at(1) => {
                self.bump()?;
                Ok(Expr::Function(Box::new(self.parse_function(true)?)))
            }
            "class" => Ok(Expr::Class(Box::new(self.parse_class()?))),
            "true" | "false" => {
                self.bump()?;
                Ok(Expr::Bool(word == "true"))
            }
            "null" => {
                self.bump()?;
                Ok(Expr::Null)
            }
            "this" | "super" | "import" => {
                self.bump()?;
                Ok(Expr::Ident(word.to_string()))
            }
            _ if RESERVED.contains(&word) => Err(ExtractError::syntax(
                offset,
                format!("unexpected keyword `{}`", word),
            )),
            "await" | "yield" if self.dialect == Dialect::Module => Err(ExtractError::syntax(
                offset,
                format!("`{}` is reserved in modules", word),
            )),
            _ => {
                self.bump()?;
                Ok(Expr::Ident(word.to_string()))
            }
        }
    }

    fn parse_array(&mut self) -> Result<Expr> {
        self.expect("[")?;
        self.with_in(|p| {
            let mut elements = Vec::new();
            loop {
                if p.at("]") {
                    break;
                }
                if p.eat(",") {
                    elements.push(None);
                    continue;
                }
                let element = if p.eat("...") {
                    Expr::Spread(Box::new(p.parse_assignment()?))
                } else {
                    p.parse_assignment()?
                };
                elements.push(Some(element));
                if !p.eat(",") {
                    break;
                }
            }
            p.expect("]")?;
            Ok(Expr::Array(elements))
        })
    }

    fn parse_object(&mut self) -> Result<Expr> {
        self.expect("{")?;
        self.with_in(|p| {
            let mut props = Vec::new();
            while !p.at("}") {
                props.push(p.parse_property()?);
                if !p.eat(",") {
                    break;
                }
            }
            p.expect("}")?;
            Ok(Expr::Object(props))
        })
    }

    fn parse_property(&mut self) -> Result<Property> {
        if self.eat("...") {
            return Ok(Property::Spread(self.parse_assignment()?));
        }

        let (is_async, is_generator, is_accessor) = self.parse_method_modifiers()?;
        let key_is_word = self.kind_at(0) == Some(TokenKind::Ident);
        let key = self.parse_prop_key()?;

        if self.at("(") {
            let func = self.parse_method(&key, is_async, is_generator)?;
            return Ok(Property::Method { key, func });
        }
        if is_async || is_generator || is_accessor {
            return Err(self.error_expected("method parameters"));
        }
        if self.eat(":") {
            let value = self.parse_assignment()?;
            return Ok(Property::KeyValue { key, value });
        }
        match key {
            PropKey::Ident(name) if key_is_word => Ok(Property::Shorthand(name)),
            _ => Err(self.error_expected("`:` after property key")),
        }
    }
}

fn is_assignable(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) | Expr::Member { .. } | Expr::Object(_) | Expr::Array(_) => true,
        Expr::Paren(inner) => is_assignable(inner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        parse_program(source, Dialect::Script, DEFAULT_MAX_DEPTH).unwrap()
    }

    fn expr(source: &str) -> Expr {
        parse_expression_source(source, DEFAULT_MAX_DEPTH).unwrap()
    }

    #[test]
    fn test_parses_step_array_declaration() {
        let program = parse("const steps = [{ id: 'a', next: null }, { id: \"b\" }];");
        let Stmt::Var(decl) = &program.body[0] else {
            panic!("expected declaration, got {:?}", program.body[0]);
        };
        assert_eq!(decl.kind, VarKind::Const);
        assert_eq!(decl.declarators[0].target.ident(), Some("steps"));
        let Some(Expr::Array(elements)) = &decl.declarators[0].init else {
            panic!("expected array initializer");
        };
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_binary_precedence() {
        let parsed = expr("a || b && c === d + e * f");
        let Expr::Binary { op, right, .. } = parsed else {
            panic!("expected binary");
        };
        assert_eq!(op, "||");
        let Expr::Binary { op, .. } = *right else {
            panic!("expected nested binary");
        };
        assert_eq!(op, "&&");
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let Expr::Binary { left, .. } = expr("a ** b ** c") else {
            panic!("expected binary");
        };
        assert_eq!(*left, Expr::Ident("a".to_string()));
    }

    #[test]
    fn test_arrow_forms() {
        for source in ["x => x.y", "(x) => x.y", "(a, { b }, ...c) => a", "async (ctx) => await ctx.load()"] {
            assert!(matches!(expr(source), Expr::Arrow(_)), "{}", source);
        }
        let Expr::Arrow(arrow) = expr("(ctx) => { return ctx.ok; }") else {
            panic!("expected arrow");
        };
        assert!(matches!(arrow.body, ArrowBody::Block(_)));
    }

    #[test]
    fn test_parenthesized_expression_is_not_an_arrow() {
        assert!(matches!(expr("(a, b)"), Expr::Paren(_)));
        assert!(matches!(expr("(a)(b)"), Expr::Call { .. }));
    }

    #[test]
    fn test_asi_between_statements() {
        let program = parse("const a = 1\nconst b = [a]\nfoo()");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_missing_semicolon_on_same_line_fails() {
        assert!(parse_program("a b", Dialect::Script, DEFAULT_MAX_DEPTH).is_err());
    }

    #[test]
    fn test_module_syntax_requires_module_dialect() {
        let source = "import { a } from './a';\nexport const steps = [a];";
        assert!(parse_program(source, Dialect::Module, DEFAULT_MAX_DEPTH).is_ok());
        assert!(parse_program(source, Dialect::Script, DEFAULT_MAX_DEPTH).is_err());
    }

    #[test]
    fn test_strict_reserved_words_only_bind_in_scripts() {
        let source = "var interface = 1;";
        assert!(parse_program(source, Dialect::Script, DEFAULT_MAX_DEPTH).is_ok());
        assert!(parse_program(source, Dialect::Module, DEFAULT_MAX_DEPTH).is_err());
    }

    #[test]
    fn test_top_level_await_in_modules() {
        assert!(parse_program("const s = await load();", Dialect::Module, DEFAULT_MAX_DEPTH).is_ok());
    }

    #[test]
    fn test_object_members() {
        let Expr::Paren(inner) = expr("({ a, 'b': 1, [c]: 2, d() {}, get e() { return 1 }, ...f })") else {
            panic!("expected parenthesized object");
        };
        let Expr::Object(props) = *inner else {
            panic!("expected object");
        };
        assert_eq!(props.len(), 6);
        assert!(matches!(props[0], Property::Shorthand(_)));
        assert!(matches!(props[3], Property::Method { .. }));
        assert!(matches!(props[5], Property::Spread(_)));
    }

    #[test]
    fn test_control_flow_and_classes() {
        let source = r#"
            function build(items) {
                const out = [];
                for (const item of items) {
                    if (!item) continue;
                    out.push(item);
                }
                for (let i = 0; i < 3; i++) { out.push(i) }
                switch (out.length) { case 0: return null; default: break }
                try { risky() } catch (e) { log(e) } finally { done() }
                return out;
            }
            class Flow extends Base {
                static steps = [];
                name = 'flow';
                get size() { return this.steps.length }
                async *run() { yield* this.steps }
            }
        "#;
        let program = parse(source);
        assert_eq!(program.body.len(), 2);
        assert!(matches!(program.body[1], Stmt::Class(_)));
    }

    #[test]
    fn test_optional_chaining_and_non_null() {
        assert!(matches!(expr("a?.b?.(c)?.[d]"), Expr::Member { optional: true, .. }));
        assert!(matches!(expr("ctx.user!.name"), Expr::Member { .. }));
    }

    #[test]
    fn test_jsx_is_rejected() {
        assert!(parse_program("const a = <div />;", Dialect::Script, DEFAULT_MAX_DEPTH).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        // Each array level costs two units: the element and its operand
        let source = format!("{}1{}", "[".repeat(30), "]".repeat(30));
        assert_eq!(
            parse_expression_source(&source, 20),
            Err(ExtractError::NestingTooDeep { limit: 20 })
        );
        assert!(parse_expression_source(&source, DEFAULT_MAX_DEPTH).is_ok());
    }

    #[test]
    fn test_array_fragment() {
        let program = parse_array_fragment("[{ id: 'a' }, , { id: 'b' }]", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(program.fragment_array().map(|a| a.len()), Some(3));
        assert!(parse_array_fragment("{ id: 'a' }", DEFAULT_MAX_DEPTH).is_err());
    }

    #[test]
    fn test_regex_and_template_literals() {
        assert!(matches!(expr("/a+/.test(s)"), Expr::Call { .. }));
        let Expr::Template { cooked, .. } = expr("`plain`") else {
            panic!("expected template");
        };
        assert_eq!(cooked.as_deref(), Some("plain"));
        let Expr::Template { cooked, .. } = expr("`hi ${name}`") else {
            panic!("expected template");
        };
        assert_eq!(cooked, None);
    }
}
