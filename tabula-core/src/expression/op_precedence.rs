use crate::writer::SqlWriter;

/// Binding strength of an expression node in the dialect of `writer`.
///
/// Operands bind tightest. A child binding weaker than its parent operator is wrapped in
/// parentheses, a right hand child also when both bind equally.
pub trait OpPrecedence {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32;
}

impl<T: OpPrecedence> OpPrecedence for Box<T> {
    fn precedence(&self, writer: &dyn SqlWriter) -> i32 {
        self.as_ref().precedence(writer)
    }
}
