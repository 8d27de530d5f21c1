//! Evaluates an [`Expr`] tree against an [`ExpressionContext`].
//!
//! Evaluation is pure and bounded: no I/O, no mutation, and a step budget
//! guards against pathologically nested expressions instead of a timeout.

use serde_json::{json, Value};

use super::ast::{BinOp, Expr, Reference, UnaryOp};
use super::error::ExpressionError;

const STEP_BUDGET: u32 = 10_000;

/// Variables and node outputs an expression may reference. Distinct from
/// [`crate::traits::ExecutionContext`], which is the handler-facing context
/// a node receives; this one is scoped to what `$variables`/`$nodes`/`$env`
/// may resolve to during expression evaluation.
#[derive(Debug, Clone, Default)]
pub struct ExpressionContext {
    pub variables: std::collections::HashMap<String, Value>,
    pub node_outputs: std::collections::HashMap<String, Value>,
    pub env: std::collections::HashMap<String, String>,
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    pub fn with_node_output(mut self, node_id: impl Into<String>, output: Value) -> Self {
        self.node_outputs.insert(node_id.into(), output);
        self
    }
}

struct Evaluator<'a> {
    ctx: &'a ExpressionContext,
    steps: u32,
}

pub fn eval(expr: &Expr, ctx: &ExpressionContext) -> Result<Value, ExpressionError> {
    let mut evaluator = Evaluator { ctx, steps: 0 };
    evaluator.eval_expr(expr)
}

impl<'a> Evaluator<'a> {
    fn tick(&mut self) -> Result<(), ExpressionError> {
        self.steps += 1;
        if self.steps > STEP_BUDGET {
            return Err(ExpressionError::BudgetExceeded);
        }
        Ok(())
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, ExpressionError> {
        self.tick()?;
        match expr {
            Expr::Number(n) => Ok(json!(n)),
            Expr::Str(s) => Ok(json!(s)),
            Expr::Bool(b) => Ok(json!(b)),
            Expr::Null => Ok(Value::Null),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_expr(item)?);
                }
                Ok(Value::Array(out))
            }
            Expr::Object(fields) => {
                let mut map = serde_json::Map::with_capacity(fields.len());
                for (key, value) in fields {
                    map.insert(key.clone(), self.eval_expr(value)?);
                }
                Ok(Value::Object(map))
            }
            Expr::Reference(reference) => Ok(self.eval_reference(reference)),
            Expr::Member(base, name) => {
                let base = self.eval_expr(base)?;
                Ok(base.get(name).cloned().unwrap_or(Value::Null))
            }
            Expr::Index(base, index) => {
                let base = self.eval_expr(base)?;
                let index = self.eval_expr(index)?;
                Ok(index_value(&base, &index))
            }
            Expr::Unary(op, inner) => {
                let value = self.eval_expr(inner)?;
                eval_unary(*op, &value)
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                eval_binary(*op, &lhs, &rhs)
            }
        }
    }

    fn eval_reference(&self, reference: &Reference) -> Value {
        match reference {
            Reference::Variable(name) => self.ctx.variables.get(name).cloned().unwrap_or(Value::Null),
            Reference::Node(node_id, output) => self
                .ctx
                .node_outputs
                .get(node_id)
                .and_then(|v| v.get(output))
                .cloned()
                .unwrap_or(Value::Null),
            Reference::Env(name) => self
                .ctx
                .env
                .get(name)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null),
        }
    }
}

fn index_value(base: &Value, index: &Value) -> Value {
    match (base, index) {
        (Value::Array(items), Value::Number(n)) => {
            let idx = n.as_f64().unwrap_or(-1.0);
            if idx >= 0.0 {
                items.get(idx as usize).cloned().unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        (Value::Object(_), Value::String(key)) => base.get(key).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> Result<Value, ExpressionError> {
    match op {
        UnaryOp::Not => Ok(json!(!is_truthy(value))),
        UnaryOp::Neg => {
            let n = as_number(value)
                .ok_or_else(|| ExpressionError::eval("-", format!("cannot negate non-numeric value {value}")))?;
            Ok(json!(-n))
        }
    }
}

fn eval_binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    use BinOp::*;
    match op {
        And => Ok(json!(is_truthy(lhs) && is_truthy(rhs))),
        Or => Ok(json!(is_truthy(lhs) || is_truthy(rhs))),
        Eq => Ok(json!(values_equal(lhs, rhs))),
        Ne => Ok(json!(!values_equal(lhs, rhs))),
        Add => match (lhs, rhs) {
            (Value::String(a), Value::String(b)) => Ok(json!(format!("{a}{b}"))),
            _ => numeric_binop(op, lhs, rhs),
        },
        Sub | Mul | Div | Mod => numeric_binop(op, lhs, rhs),
        Lt | Gt | Le | Ge => comparison_binop(op, lhs, rhs),
    }
}

fn numeric_binop(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    let a = as_number(lhs)
        .ok_or_else(|| ExpressionError::eval(format!("{lhs}"), "left operand is not a number"))?;
    let b = as_number(rhs)
        .ok_or_else(|| ExpressionError::eval(format!("{rhs}"), "right operand is not a number"))?;
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(ExpressionError::eval(format!("{a} / {b}"), "division by zero"));
            }
            a / b
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(ExpressionError::eval(format!("{a} % {b}"), "modulo by zero"));
            }
            a % b
        }
        _ => unreachable!("numeric_binop only called for arithmetic operators"),
    };
    Ok(json!(result))
}

fn comparison_binop(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, ExpressionError> {
    let a = as_number(lhs)
        .ok_or_else(|| ExpressionError::eval(format!("{lhs}"), "left operand is not a number"))?;
    let b = as_number(rhs)
        .ok_or_else(|| ExpressionError::eval(format!("{rhs}"), "right operand is not a number"))?;
    let result = match op {
        BinOp::Lt => a < b,
        BinOp::Gt => a > b,
        BinOp::Le => a <= b,
        BinOp::Ge => a >= b,
        _ => unreachable!("comparison_binop only called for comparison operators"),
    };
    Ok(json!(result))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;

    fn run(src: &str, ctx: &ExpressionContext) -> Value {
        eval(&parse(src).unwrap(), ctx).unwrap()
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(run("1 + 2 * 3", &ExpressionContext::new()), json!(7.0));
    }

    #[test]
    fn resolves_variable_reference() {
        let ctx = ExpressionContext::new().with_variable("threshold", json!(10));
        assert_eq!(run("$variables.threshold > 5", &ctx), json!(true));
    }

    #[test]
    fn unresolved_reference_yields_null() {
        let ctx = ExpressionContext::new();
        assert_eq!(run("$variables.missing", &ctx), Value::Null);
    }

    #[test]
    fn resolves_node_output_member_chain() {
        let ctx = ExpressionContext::new().with_node_output("invoice", json!({"amount": 42.5}));
        assert_eq!(run("$nodes.invoice.amount", &ctx), json!(42.5));
    }

    #[test]
    fn division_by_zero_is_an_eval_error() {
        let err = eval(&parse("1 / 0").unwrap(), &ExpressionContext::new()).unwrap_err();
        assert!(matches!(err, ExpressionError::Eval { .. }));
    }

    #[test]
    fn is_deterministic_across_repeated_evaluation() {
        let ctx = ExpressionContext::new().with_variable("x", json!(3));
        let expr = parse("($variables.x + 1) * 2 == 8").unwrap();
        let first = eval(&expr, &ctx).unwrap();
        let second = eval(&expr, &ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, json!(true));
    }
}
