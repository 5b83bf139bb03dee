use crate::{Expression, OpPrecedence, SqlWriter};

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum UnaryOpType {
    Not,
}

impl OpPrecedence for UnaryOpType {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        writer.expression_unary_op_precedence(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOp {
    pub op: UnaryOpType,
    pub arg: Box<Expression>,
}

impl OpPrecedence for UnaryOp {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        writer.expression_unary_op_precedence(&self.op)
    }
}
