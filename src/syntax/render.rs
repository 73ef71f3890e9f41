//! Stringify expressions back to source text with canonical spacing
//!
//! Literals keep their original text. Block bodies of functions are replaced
//! by [`BLOCK_PLACEHOLDER`].

use super::ast::*;

/// Stand-in for a function body that is not reproduced
pub const BLOCK_PLACEHOLDER: &str = "{ /* ... */ }";

pub fn render_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr);
    out
}

/// Parameter list without the surrounding parentheses
pub fn render_params(params: &[Pattern]) -> String {
    let mut out = String::new();
    write_list(&mut out, params, write_pattern);
    out
}

/// `(<params>) => <body>` for any function-like node, `None` otherwise
pub fn render_callable(expr: &Expr) -> Option<String> {
    match expr.unparen() {
        Expr::Arrow(arrow) => {
            let mut out = String::new();
            write_arrow(&mut out, arrow);
            Some(out)
        }
        Expr::Function(function) => Some(format!(
            "{}({}) => {}",
            if function.is_async { "async " } else { "" },
            render_params(&function.params),
            BLOCK_PLACEHOLDER
        )),
        _ => None,
    }
}

fn write_list<T>(out: &mut String, items: &[T], write: fn(&mut String, &T)) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        write(out, item);
    }
}

fn write_arrow(out: &mut String, arrow: &Arrow) {
    if arrow.is_async {
        out.push_str("async ");
    }
    out.push('(');
    write_list(out, &arrow.params, write_pattern);
    out.push_str(") => ");
    match &arrow.body {
        ArrowBody::Expr(body) if matches!(**body, Expr::Object(_)) => {
            out.push('(');
            write_expr(out, body);
            out.push(')');
        }
        ArrowBody::Expr(body) => write_expr(out, body),
        ArrowBody::Block(_) => out.push_str(BLOCK_PLACEHOLDER),
    }
}

fn write_function(out: &mut String, function: &Function) {
    if function.is_async {
        out.push_str("async ");
    }
    out.push_str("function");
    if function.is_generator {
        out.push('*');
    }
    if let Some(name) = &function.name {
        out.push(' ');
        out.push_str(name);
    }
    out.push('(');
    write_list(out, &function.params, write_pattern);
    out.push_str(") ");
    out.push_str(BLOCK_PLACEHOLDER);
}

fn write_key(out: &mut String, key: &PropKey) {
    match key {
        PropKey::Ident(name) | PropKey::Num(name) => out.push_str(name),
        PropKey::Str(value) => {
            out.push('"');
            out.push_str(&value.replace('"', "\\\""));
            out.push('"');
        }
        PropKey::Computed(expr) => {
            out.push('[');
            write_expr(out, expr);
            out.push(']');
        }
    }
}

fn write_property(out: &mut String, prop: &Property) {
    match prop {
        Property::KeyValue { key, value } => {
            write_key(out, key);
            out.push_str(": ");
            write_expr(out, value);
        }
        Property::Shorthand(name) => out.push_str(name),
        Property::Method { key, func } => {
            write_key(out, key);
            out.push('(');
            write_list(out, &func.params, write_pattern);
            out.push_str(") ");
            out.push_str(BLOCK_PLACEHOLDER);
        }
        Property::Spread(expr) => {
            out.push_str("...");
            write_expr(out, expr);
        }
    }
}

fn write_pattern(out: &mut String, pattern: &Pattern) {
    match pattern {
        Pattern::Ident(name) => out.push_str(name),
        Pattern::Object(props) => {
            if props.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            for (index, prop) in props.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                match prop {
                    PatternProp::KeyValue { key, value } => {
                        write_key(out, key);
                        out.push_str(": ");
                        write_pattern(out, value);
                    }
                    PatternProp::Shorthand { name, default } => {
                        out.push_str(name);
                        if let Some(default) = default {
                            out.push_str(" = ");
                            write_expr(out, default);
                        }
                    }
                    PatternProp::Rest(inner) => {
                        out.push_str("...");
                        write_pattern(out, inner);
                    }
                }
            }
            out.push_str(" }");
        }
        Pattern::Array(elements) => {
            out.push('[');
            for (index, element) in elements.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                if let Some(element) = element {
                    write_pattern(out, element);
                }
            }
            out.push(']');
        }
        Pattern::Rest(inner) => {
            out.push_str("...");
            write_pattern(out, inner);
        }
        Pattern::Default(inner, default) => {
            write_pattern(out, inner);
            out.push_str(" = ");
            write_expr(out, default);
        }
    }
}

fn write_args(out: &mut String, args: &[Expr]) {
    out.push('(');
    write_list(out, args, write_expr);
    out.push(')');
}

fn write_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::Ident(name) => out.push_str(name),
        Expr::Str(lit) => out.push_str(&lit.raw),
        Expr::Num(raw) | Expr::Regex(raw) | Expr::Template { raw, .. } => out.push_str(raw),
        Expr::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
        Expr::Null => out.push_str("null"),
        Expr::TaggedTemplate { tag, raw } => {
            write_expr(out, tag);
            out.push_str(raw);
        }
        Expr::Array(elements) => {
            out.push('[');
            for (index, element) in elements.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                if let Some(element) = element {
                    write_expr(out, element);
                }
            }
            out.push(']');
        }
        Expr::Object(props) => {
            if props.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{ ");
            write_list(out, props, write_property);
            out.push_str(" }");
        }
        Expr::Function(function) => write_function(out, function),
        Expr::Arrow(arrow) => write_arrow(out, arrow),
        Expr::Class(class) => {
            out.push_str("class");
            if let Some(name) = &class.name {
                out.push(' ');
                out.push_str(name);
            }
            if let Some(superclass) = &class.superclass {
                out.push_str(" extends ");
                write_expr(out, superclass);
            }
            out.push(' ');
            out.push_str(BLOCK_PLACEHOLDER);
        }
        Expr::Unary { op, arg } => {
            out.push_str(op);
            if op.chars().all(|c| c.is_ascii_alphabetic()) {
                out.push(' ');
            }
            write_expr(out, arg);
        }
        Expr::Update { op, prefix, arg } => {
            if *prefix {
                out.push_str(op);
                write_expr(out, arg);
            } else {
                write_expr(out, arg);
                out.push_str(op);
            }
        }
        Expr::Binary { op, left, right } | Expr::Assign {
            op,
            target: left,
            value: right,
        } => {
            write_expr(out, left);
            out.push(' ');
            out.push_str(op);
            out.push(' ');
            write_expr(out, right);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            write_expr(out, test);
            out.push_str(" ? ");
            write_expr(out, consequent);
            out.push_str(" : ");
            write_expr(out, alternate);
        }
        Expr::Call {
            callee,
            args,
            optional,
        } => {
            write_expr(out, callee);
            if *optional {
                out.push_str("?.");
            }
            write_args(out, args);
        }
        Expr::New { callee, args } => {
            out.push_str("new ");
            write_expr(out, callee);
            write_args(out, args);
        }
        Expr::Member {
            object,
            property,
            optional,
        } => {
            write_expr(out, object);
            match property {
                MemberProp::Ident(name) => {
                    out.push_str(if *optional { "?." } else { "." });
                    out.push_str(name);
                }
                MemberProp::Computed(inner) => {
                    if *optional {
                        out.push_str("?.");
                    }
                    out.push('[');
                    write_expr(out, inner);
                    out.push(']');
                }
            }
        }
        Expr::Sequence(items) => write_list(out, items, write_expr),
        Expr::Spread(inner) => {
            out.push_str("...");
            write_expr(out, inner);
        }
        Expr::Await(inner) => {
            out.push_str("await ");
            write_expr(out, inner);
        }
        Expr::Yield { arg, delegate } => {
            out.push_str(if *delegate { "yield*" } else { "yield" });
            if let Some(arg) = arg {
                out.push(' ');
                write_expr(out, arg);
            }
        }
        Expr::Paren(inner) => {
            out.push('(');
            write_expr(out, inner);
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_expression_source, DEFAULT_MAX_DEPTH};

    fn round(source: &str) -> String {
        render_expr(&parse_expression_source(source, DEFAULT_MAX_DEPTH).unwrap())
    }

    #[test]
    fn test_canonical_spacing() {
        assert_eq!(
            round("(context)=>context.flowData.type==='dev'"),
            "(context) => context.flowData.type === 'dev'"
        );
        assert_eq!(round("a&&!b||c?.d"), "a && !b || c?.d");
        assert_eq!(round("typeof  x  ===  \"string\""), "typeof x === \"string\"");
    }

    #[test]
    fn test_block_bodies_become_placeholder() {
        assert_eq!(
            round("(ctx) => { return ctx.ok; }"),
            "(ctx) => { /* ... */ }"
        );
        assert_eq!(
            round("function check(ctx) { return true }"),
            "function check(ctx) { /* ... */ }"
        );
    }

    #[test]
    fn test_render_callable() {
        let function = parse_expression_source("function (a, b = 1) { }", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(
            render_callable(&function).as_deref(),
            Some("(a, b = 1) => { /* ... */ }")
        );
        let ident = parse_expression_source("isDev", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(render_callable(&ident), None);
    }

    #[test]
    fn test_collections() {
        assert_eq!(round("[1,,{a:1,...b}]"), "[1, , { a: 1, ...b }]");
        assert_eq!(round("x => ({ y: x })"), "(x) => ({ y: x })");
    }
}
