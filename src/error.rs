//! Error types for pipeline construction and execution.

use thiserror::Error;

/// Errors surfaced by the grouping pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A declarative filter expression had a shape the evaluator does not know.
    #[error("invalid expression: {expression}")]
    InvalidExpression { expression: String },

    /// The stage (or one of its ancestors) was already executed and torn down.
    #[error("stage has already been executed")]
    AlreadyExecuted,

    /// Pipeline configuration could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create an invalid expression error from the offending JSON.
    pub fn invalid_expression(expression: &serde_json::Value) -> Self {
        Self::InvalidExpression {
            expression: expression.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
