use crate::{AsValue, Column, OpPrecedence, SqlWriter, Value};

/// Leaf of an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Reference to a mapper column, resolved against the query tables when written.
    Column(Column),
    /// Literal, always sent as a bound parameter.
    Variable(Value),
    /// Parenthesized list of bound parameters, right hand side of `IN`.
    List(Vec<Value>),
    /// The `NULL` keyword.
    Null,
}

impl OpPrecedence for Operand {
    fn precedence(&self, _writer: &dyn SqlWriter) -> i32 {
        1_000_000_000
    }
}

impl<T: AsValue> From<T> for Operand {
    fn from(value: T) -> Self {
        Operand::Variable(value.as_value())
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Variable(value.into())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Variable(value)
    }
}

impl From<Column> for Operand {
    fn from(value: Column) -> Self {
        Operand::Column(value)
    }
}

impl From<&Column> for Operand {
    fn from(value: &Column) -> Self {
        Operand::Column(value.clone())
    }
}
