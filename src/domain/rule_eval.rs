//! Rule evaluation engine.
//!
//! Evaluates parsed rules against a single bar's field values.
//!
//! # Evaluation Semantics
//!
//! - Comparisons read both operands from the current bar only
//! - A comparison referencing an undefined field is undefined
//! - `==` and `!=` compare with an absolute tolerance of `1e-9`
//! - `not` keeps undefined as undefined
//! - `false and undefined` is `false`, `true or undefined` is `true`
//! - An undefined result at the top of the rule is `false`

use crate::domain::error::ParseError;
use crate::domain::field::FieldSource;
use crate::domain::rule::{CmpOp, Expr, Operand};
use crate::domain::rule_parser;

const EPSILON: f64 = 1e-9;

/// Missing data never triggers a signal: an expression whose outcome
/// depends on an undefined field is `false`.
pub fn evaluate(expr: &Expr, ctx: &impl FieldSource) -> bool {
    evaluate_partial(expr, ctx).unwrap_or(false)
}

/// Three-valued evaluation. `None` is "undefined" and propagates through
/// `not`; `and`/`or` only resolve it when the other side decides the result.
fn evaluate_partial(expr: &Expr, ctx: &impl FieldSource) -> Option<bool> {
    match expr {
        Expr::Literal(b) => Some(*b),
        Expr::Comparison { left, op, right } => {
            let l = resolve_operand(left, ctx)?;
            let r = resolve_operand(right, ctx)?;
            Some(compare(l, *op, r))
        }
        Expr::And(a, b) => match evaluate_partial(a, ctx) {
            Some(false) => Some(false),
            Some(true) => evaluate_partial(b, ctx),
            None => match evaluate_partial(b, ctx) {
                Some(false) => Some(false),
                _ => None,
            },
        },
        Expr::Or(a, b) => match evaluate_partial(a, ctx) {
            Some(true) => Some(true),
            Some(false) => evaluate_partial(b, ctx),
            None => match evaluate_partial(b, ctx) {
                Some(true) => Some(true),
                _ => None,
            },
        },
        Expr::Not(inner) => evaluate_partial(inner, ctx).map(|b| !b),
    }
}

/// Parse and evaluate in one step. Prefer [`CompiledRule`] when the same
/// text is evaluated on many bars.
pub fn evaluate_str(expression: &str, ctx: &impl FieldSource) -> Result<bool, ParseError> {
    let expr = rule_parser::parse(expression)?;
    Ok(evaluate(&expr, ctx))
}

fn resolve_operand(operand: &Operand, ctx: &impl FieldSource) -> Option<f64> {
    match operand {
        Operand::Field(field) => ctx.value(*field),
        Operand::Constant(v) => Some(*v),
    }
}

fn compare(left: f64, op: CmpOp, right: f64) -> bool {
    match op {
        CmpOp::Lt => left < right,
        CmpOp::Gt => left > right,
        CmpOp::Le => left <= right,
        CmpOp::Ge => left >= right,
        CmpOp::Eq => (left - right).abs() < EPSILON,
        CmpOp::Ne => (left - right).abs() >= EPSILON,
    }
}

/// A rule kept alongside the text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub source: String,
    pub expr: Expr,
}

impl CompiledRule {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Ok(CompiledRule {
            source: source.to_string(),
            expr: rule_parser::parse(source)?,
        })
    }

    pub fn matches(&self, ctx: &impl FieldSource) -> bool {
        evaluate(&self.expr, ctx)
    }
}

/// Index of the first rule that holds, if any. An empty list never matches.
pub fn first_match(rules: &[CompiledRule], ctx: &impl FieldSource) -> Option<usize> {
    rules.iter().position(|r| r.matches(ctx))
}

/// OR-combination of a rule list.
pub fn any_match(rules: &[CompiledRule], ctx: &impl FieldSource) -> bool {
    first_match(rules, ctx).is_some()
}
