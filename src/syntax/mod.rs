//! Tokenizer, parser and tree utilities for the grammar-based strategy

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod visit;

pub use ast::{Dialect, Expr, ParseOrigin, Program};
pub use parser::{parse_array_fragment, parse_expression_source, parse_program, DEFAULT_MAX_DEPTH};
pub use render::{render_callable, render_expr, render_params, BLOCK_PLACEHOLDER};
pub use visit::Visitor;
