//! Internal error type for the extraction pipeline
//!
//! None of these escape [`StepExtractor`](crate::extractors::StepExtractor): the
//! orchestrator turns every one of them into an empty result plus a diagnostic.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("unrecognized character at byte {offset}")]
    Lex { offset: usize },

    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("nesting exceeds the limit of {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("no array literal assignment found to parse as a fragment")]
    NoArrayFragment,

    #[error("input of {size} bytes exceeds the limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("unbalanced delimiter opened at byte {offset}")]
    Unbalanced { offset: usize },

    #[error("internal failure: {0}")]
    Internal(String),
}

impl ExtractError {
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        ExtractError::Syntax {
            offset,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
