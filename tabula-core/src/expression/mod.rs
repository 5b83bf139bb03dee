mod binary_op;
mod op_precedence;
mod operand;
mod ordered;
mod unary_op;

pub use binary_op::*;
pub use op_precedence::*;
pub use operand::*;
pub use ordered::*;
pub use unary_op::*;

use crate::{AsValue, Column, Value, writer::SqlWriter};
use std::ops::{BitAnd, BitOr, Not};

/// Immutable predicate tree.
///
/// Usually built from the comparison methods of [`Column`] and combined with `&`, `|`
/// and `!`:
/// ```rust,ignore
/// let expr = books.column("year").ge(1950) & books.column("title").like("The %");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Operand(Operand),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Between(Between),
}

/// `arg BETWEEN low AND high`
#[derive(Debug, Clone, PartialEq)]
pub struct Between {
    pub arg: Box<Expression>,
    pub low: Box<Expression>,
    pub high: Box<Expression>,
}

impl Expression {
    pub fn and(self, rhs: impl Into<Expression>) -> Expression {
        Expression::Binary(BinaryOp::new(BinaryOpType::And, self, rhs))
    }

    pub fn or(self, rhs: impl Into<Expression>) -> Expression {
        Expression::Binary(BinaryOp::new(BinaryOpType::Or, self, rhs))
    }

    /// Every column referenced by the tree, left to right.
    pub fn columns(&self) -> Vec<&Column> {
        let mut result = Vec::new();
        self.collect_columns(&mut result);
        result
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a Column>) {
        match self {
            Expression::Operand(Operand::Column(column)) => out.push(column),
            Expression::Operand(..) => {}
            Expression::Unary(v) => v.arg.collect_columns(out),
            Expression::Binary(v) => {
                v.lhs.collect_columns(out);
                v.rhs.collect_columns(out);
            }
            Expression::Between(v) => {
                v.arg.collect_columns(out);
                v.low.collect_columns(out);
                v.high.collect_columns(out);
            }
        }
    }

    /// Bound parameters in the order the writer emits their placeholders.
    pub fn values(&self) -> Vec<&Value> {
        let mut result = Vec::new();
        self.collect_values(&mut result);
        result
    }

    fn collect_values<'a>(&'a self, out: &mut Vec<&'a Value>) {
        match self {
            Expression::Operand(Operand::Variable(v)) => out.push(v),
            Expression::Operand(Operand::List(v)) => out.extend(v.iter()),
            Expression::Operand(..) => {}
            Expression::Unary(v) => v.arg.collect_values(out),
            Expression::Binary(v) => {
                v.lhs.collect_values(out);
                v.rhs.collect_values(out);
            }
            Expression::Between(v) => {
                v.arg.collect_values(out);
                v.low.collect_values(out);
                v.high.collect_values(out);
            }
        }
    }
}

impl OpPrecedence for Expression {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        match self {
            Expression::Operand(v) => v.precedence(writer),
            Expression::Unary(v) => v.precedence(writer),
            Expression::Binary(v) => v.precedence(writer),
            Expression::Between(..) => writer.expression_between_precedence(),
        }
    }
}

impl<T: AsValue> From<T> for Expression {
    fn from(value: T) -> Self {
        Expression::Operand(value.into())
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Operand(value.into())
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Operand(Operand::Variable(value))
    }
}

impl From<Operand> for Expression {
    fn from(value: Operand) -> Self {
        Expression::Operand(value)
    }
}

impl From<Column> for Expression {
    fn from(value: Column) -> Self {
        Expression::Operand(Operand::Column(value))
    }
}

impl From<&Column> for Expression {
    fn from(value: &Column) -> Self {
        Expression::Operand(Operand::Column(value.clone()))
    }
}

impl<R: Into<Expression>> BitAnd<R> for Expression {
    type Output = Expression;
    fn bitand(self, rhs: R) -> Self::Output {
        self.and(rhs)
    }
}

impl<R: Into<Expression>> BitOr<R> for Expression {
    type Output = Expression;
    fn bitor(self, rhs: R) -> Self::Output {
        self.or(rhs)
    }
}

impl Not for Expression {
    type Output = Expression;
    fn not(self) -> Self::Output {
        Expression::Unary(UnaryOp {
            op: UnaryOpType::Not,
            arg: Box::new(self),
        })
    }
}
