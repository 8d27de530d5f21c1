//! Expression evaluator error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("expression `{expression}`: {reason}")]
    Eval { expression: String, reason: String },

    #[error("expression evaluation exceeded its step budget")]
    BudgetExceeded,
}

impl ExpressionError {
    pub fn eval(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Eval { expression: expression.into(), reason: reason.into() }
    }
}
