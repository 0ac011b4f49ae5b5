//! Rule AST data structures.
//!
//! This module defines the abstract syntax tree for trading rules:
//! - `Operand`: What can be compared (a bar field or a numeric constant)
//! - `CmpOp`: The six comparison operators
//! - `Expr`: The boolean expression tree (comparison, `and`, `or`, `not`, literal)

use std::collections::BTreeSet;
use std::fmt;

use super::field::Field;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(Field),
    Constant(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(bool),
    Comparison {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Every field the expression reads, in `Field` order.
    pub fn fields(&self) -> BTreeSet<Field> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<Field>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Comparison { left, right, .. } => {
                for operand in [left, right] {
                    if let Operand::Field(f) = operand {
                        out.insert(*f);
                    }
                }
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_fields(out);
                b.collect_fields(out);
            }
            Expr::Not(inner) => inner.collect_fields(out),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(field) => write!(f, "{field}"),
            Operand::Constant(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(b) => write!(f, "{b}"),
            Expr::Comparison { left, op, right } => {
                write!(f, "{left} {} {right}", op.symbol())
            }
            Expr::And(a, b) => write!(f, "({a} and {b})"),
            Expr::Or(a, b) => write!(f, "({a} or {b})"),
            Expr::Not(inner) => write!(f, "not {inner}"),
        }
    }
}
