//! Read-only traversal over the syntax tree
//!
//! Implementors override the hooks they care about and call the matching
//! `walk_*` function to continue into children.

use super::ast::*;

pub trait Visitor<'ast> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }

    fn visit_declarator(&mut self, declarator: &'ast Declarator) {
        walk_declarator(self, declarator);
    }

    fn visit_pattern(&mut self, pattern: &'ast Pattern) {
        walk_pattern(self, pattern);
    }

    fn visit_function(&mut self, function: &'ast Function) {
        walk_function(self, function);
    }
}

pub fn walk_program<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, program: &'ast Program) {
    for stmt in &program.body {
        visitor.visit_stmt(stmt);
    }
}

fn walk_block<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, body: &'ast [Stmt]) {
    for stmt in body {
        visitor.visit_stmt(stmt);
    }
}

fn walk_var_decl<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, decl: &'ast VarDecl) {
    for declarator in &decl.declarators {
        visitor.visit_declarator(declarator);
    }
}

fn walk_for_head<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, head: &'ast ForHead) {
    match head {
        ForHead::Var(decl) => walk_var_decl(visitor, decl),
        ForHead::Expr(expr) => visitor.visit_expr(expr),
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, stmt: &'ast Stmt) {
    match stmt {
        Stmt::Var(decl) => walk_var_decl(visitor, decl),
        Stmt::Function(function) => visitor.visit_function(function),
        Stmt::Class(class) => walk_class(visitor, class),
        Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::ExportDefault(expr) => {
            visitor.visit_expr(expr)
        }
        Stmt::Block(body) => walk_block(visitor, body),
        Stmt::Return(arg) => {
            if let Some(arg) = arg {
                visitor.visit_expr(arg);
            }
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => {
            visitor.visit_expr(test);
            visitor.visit_stmt(consequent);
            if let Some(alternate) = alternate {
                visitor.visit_stmt(alternate);
            }
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            if let Some(init) = init {
                walk_for_head(visitor, init);
            }
            for expr in [test, update].into_iter().flatten() {
                visitor.visit_expr(expr);
            }
            visitor.visit_stmt(body);
        }
        Stmt::ForInOf {
            left, right, body, ..
        } => {
            walk_for_head(visitor, left);
            visitor.visit_expr(right);
            visitor.visit_stmt(body);
        }
        Stmt::While { test, body } | Stmt::DoWhile { body, test } => {
            visitor.visit_expr(test);
            visitor.visit_stmt(body);
        }
        Stmt::Switch {
            discriminant,
            cases,
        } => {
            visitor.visit_expr(discriminant);
            for case in cases {
                if let Some(test) = &case.test {
                    visitor.visit_expr(test);
                }
                walk_block(visitor, &case.body);
            }
        }
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            walk_block(visitor, block);
            if let Some(handler) = handler {
                if let Some(param) = &handler.param {
                    visitor.visit_pattern(param);
                }
                walk_block(visitor, &handler.body);
            }
            if let Some(finalizer) = finalizer {
                walk_block(visitor, finalizer);
            }
        }
        Stmt::Labeled { body, .. } => visitor.visit_stmt(body),
        Stmt::ExportDecl(decl) => visitor.visit_stmt(decl),
        Stmt::Empty
        | Stmt::Break(_)
        | Stmt::Continue(_)
        | Stmt::Import { .. }
        | Stmt::ExportNamed { .. }
        | Stmt::ExportAll { .. } => {}
    }
}

pub fn walk_declarator<'ast, V: Visitor<'ast> + ?Sized>(
    visitor: &mut V,
    declarator: &'ast Declarator,
) {
    visitor.visit_pattern(&declarator.target);
    if let Some(init) = &declarator.init {
        visitor.visit_expr(init);
    }
}

pub fn walk_function<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, function: &'ast Function) {
    for param in &function.params {
        visitor.visit_pattern(param);
    }
    walk_block(visitor, &function.body);
}

fn walk_class<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, class: &'ast Class) {
    if let Some(superclass) = &class.superclass {
        visitor.visit_expr(superclass);
    }
    for member in &class.members {
        match member {
            ClassMember::Method { key, func, .. } => {
                walk_prop_key(visitor, key);
                visitor.visit_function(func);
            }
            ClassMember::Field { key, value, .. } => {
                walk_prop_key(visitor, key);
                if let Some(value) = value {
                    visitor.visit_expr(value);
                }
            }
            ClassMember::StaticBlock(body) => walk_block(visitor, body),
        }
    }
}

fn walk_prop_key<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, key: &'ast PropKey) {
    if let PropKey::Computed(expr) = key {
        visitor.visit_expr(expr);
    }
}

pub fn walk_pattern<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, pattern: &'ast Pattern) {
    match pattern {
        Pattern::Ident(_) => {}
        Pattern::Object(props) => {
            for prop in props {
                match prop {
                    PatternProp::KeyValue { key, value } => {
                        walk_prop_key(visitor, key);
                        visitor.visit_pattern(value);
                    }
                    PatternProp::Shorthand { default, .. } => {
                        if let Some(default) = default {
                            visitor.visit_expr(default);
                        }
                    }
                    PatternProp::Rest(inner) => visitor.visit_pattern(inner),
                }
            }
        }
        Pattern::Array(elements) => {
            for element in elements.iter().flatten() {
                visitor.visit_pattern(element);
            }
        }
        Pattern::Rest(inner) => visitor.visit_pattern(inner),
        Pattern::Default(inner, default) => {
            visitor.visit_pattern(inner);
            visitor.visit_expr(default);
        }
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match expr {
        Expr::Ident(_)
        | Expr::Str(_)
        | Expr::Num(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Regex(_)
        | Expr::Template { .. } => {}
        Expr::TaggedTemplate { tag, .. } => visitor.visit_expr(tag),
        Expr::Array(elements) => {
            for element in elements.iter().flatten() {
                visitor.visit_expr(element);
            }
        }
        Expr::Object(props) => {
            for prop in props {
                match prop {
                    Property::KeyValue { key, value } => {
                        walk_prop_key(visitor, key);
                        visitor.visit_expr(value);
                    }
                    Property::Shorthand(_) => {}
                    Property::Method { key, func } => {
                        walk_prop_key(visitor, key);
                        visitor.visit_function(func);
                    }
                    Property::Spread(inner) => visitor.visit_expr(inner),
                }
            }
        }
        Expr::Function(function) => visitor.visit_function(function),
        Expr::Arrow(arrow) => {
            for param in &arrow.params {
                visitor.visit_pattern(param);
            }
            match &arrow.body {
                ArrowBody::Expr(body) => visitor.visit_expr(body),
                ArrowBody::Block(body) => walk_block(visitor, body),
            }
        }
        Expr::Class(class) => walk_class(visitor, class),
        Expr::Unary { arg, .. }
        | Expr::Update { arg, .. }
        | Expr::Spread(arg)
        | Expr::Await(arg)
        | Expr::Paren(arg) => visitor.visit_expr(arg),
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Assign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            visitor.visit_expr(test);
            visitor.visit_expr(consequent);
            visitor.visit_expr(alternate);
        }
        Expr::Call { callee, args, .. } | Expr::New { callee, args } => {
            visitor.visit_expr(callee);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::Member {
            object, property, ..
        } => {
            visitor.visit_expr(object);
            if let MemberProp::Computed(property) = property {
                visitor.visit_expr(property);
            }
        }
        Expr::Sequence(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
        Expr::Yield { arg, .. } => {
            if let Some(arg) = arg {
                visitor.visit_expr(arg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_program, DEFAULT_MAX_DEPTH};

    #[derive(Default)]
    struct IdentCollector<'ast> {
        names: Vec<&'ast str>,
    }

    impl<'ast> Visitor<'ast> for IdentCollector<'ast> {
        fn visit_expr(&mut self, expr: &'ast Expr) {
            if let Expr::Ident(name) = expr {
                self.names.push(name);
            }
            walk_expr(self, expr);
        }
    }

    #[test]
    fn test_visits_nested_expressions() {
        let program = parse_program(
            "const s = [a, { k: b }, () => c];\nif (d) { e(f) }",
            Dialect::Script,
            DEFAULT_MAX_DEPTH,
        )
        .unwrap();
        let mut collector = IdentCollector::default();
        walk_program(&mut collector, &program);
        assert_eq!(collector.names, vec!["a", "b", "c", "d", "e", "f"]);
    }
}
