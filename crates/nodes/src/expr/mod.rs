//! Restricted expression grammar used to resolve node configuration fields
//! against prior node outputs, workflow variables, and environment values.
//!
//! This is deliberately NOT a host-language `eval`: admins author workflow
//! definitions, so the grammar is closed (no function calls, no loops, no
//! assignment) and every evaluation is bounded by a step budget. See
//! [`eval::STEP_BUDGET`] via [`eval::eval`].

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;

pub use ast::{BinOp, Expr, Reference, UnaryOp};
pub use error::ExpressionError;
pub use eval::ExpressionContext;

/// Parses and evaluates `expression` against `ctx` in one step.
pub fn evaluate(expression: &str, ctx: &ExpressionContext) -> Result<serde_json::Value, ExpressionError> {
    let ast = parser::parse(expression)?;
    eval::eval(&ast, ctx)
}

/// Parses `expression` without evaluating it, surfacing syntax errors early
/// (e.g. when an admin saves a workflow definition).
pub fn validate(expression: &str) -> Result<(), ExpressionError> {
    parser::parse(expression).map(|_| ())
}

/// Substitutes every `{{ expression }}` placeholder in `template` with the
/// stringified result of evaluating `expression` against `ctx`. Malformed or
/// failing expressions are left verbatim rather than aborting the whole
/// template, since templates typically interpolate into human-facing text
/// (notification bodies, webhook payloads) where a partial render beats none.
pub fn parse_template(template: &str, ctx: &ExpressionContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let inner = after_open[..end].trim();
        match evaluate(inner, ctx) {
            Ok(value) => out.push_str(&stringify(&value)),
            Err(_) => out.push_str(&rest[start..start + 4 + end]),
        }
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    out
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn evaluate_roundtrips_simple_arithmetic() {
        assert_eq!(evaluate("2 + 2", &ExpressionContext::new()).unwrap(), json!(4.0));
    }

    #[test]
    fn validate_rejects_malformed_syntax() {
        assert!(validate("$variables.").is_err());
        assert!(validate("1 +").is_err());
        assert!(validate("1 + 1").is_ok());
    }

    #[test]
    fn template_substitutes_resolved_expressions() {
        let ctx = ExpressionContext::new().with_variable("name", json!("Acme Corp"));
        let rendered = parse_template("Hello, {{ $variables.name }}!", &ctx);
        assert_eq!(rendered, "Hello, Acme Corp!");
    }

    #[test]
    fn template_leaves_unresolvable_expression_verbatim() {
        let ctx = ExpressionContext::new();
        let rendered = parse_template("Value: {{ $variables. }}", &ctx);
        assert_eq!(rendered, "Value: {{ $variables. }}");
    }

    #[test]
    fn template_with_no_placeholders_is_unchanged() {
        let ctx = ExpressionContext::new();
        assert_eq!(parse_template("plain text", &ctx), "plain text");
    }
}
