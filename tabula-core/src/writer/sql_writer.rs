use crate::{
    Between, BinaryOp, BinaryOpType, Column, ColumnDef, Expression, Fragment, Join, Mapper,
    OpPrecedence, Operand, Order, Ordered, Query, UnaryOp, UnaryOpType, Value,
    possibly_parenthesized, separated_by, writer::Context,
};
use std::fmt::Write;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

/// Dialect printer converting queries and mutations into concrete SQL strings.
///
/// Values are never printed: every literal becomes a placeholder and is pushed onto
/// [`Context::params`], in placeholder order.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Whether the current fragment context allows alias declaration.
    fn alias_declaration(&self, context: &mut Context) -> bool {
        match context.fragment {
            Fragment::SqlSelectFrom | Fragment::SqlJoin => true,
            _ => false,
        }
    }

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(
        &self,
        _context: &mut Context,
        out: &mut String,
        value: &str,
        search: char,
        replace: &str,
    ) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + 1;
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers ("name") doubling inner quotes.
    fn write_identifier_quoted(&self, context: &mut Context, out: &mut String, value: &str) {
        out.push('"');
        self.write_escaped(context, out, value, '"', "\"\"");
        out.push('"');
    }

    /// Render the table of a mapper, declaring its alias where the clause allows it.
    fn write_table_ref(&self, context: &mut Context, out: &mut String, mapper: &Mapper) {
        self.write_identifier_quoted(context, out, mapper.table().unwrap_or_default());
        if self.alias_declaration(context) {
            if let Some(alias) = context.alias(mapper) {
                let _ = write!(out, " {alias}");
            }
        }
    }

    /// Render a column reference, qualified with the table alias when required.
    fn write_column_ref(&self, context: &mut Context, out: &mut String, column: &Column) {
        if context.qualify_columns {
            if let Some(alias) = context.alias(column.mapper()) {
                out.push_str(alias);
                out.push('.');
            }
        }
        let name = column
            .def()
            .map(|c| c.db_column.as_ref())
            .unwrap_or(column.name());
        self.write_identifier_quoted(context, out, name);
    }

    /// Bind a value, emitting its placeholder.
    fn write_value(&self, context: &mut Context, out: &mut String, value: &Value) {
        context.params.push(value.clone());
        self.write_placeholder(context, out);
    }

    /// Render parameter placeholder (dialect may override).
    fn write_placeholder(&self, _context: &mut Context, out: &mut String) {
        out.push('?');
    }

    /// Precedence table for unary operators.
    fn expression_unary_op_precedence(&self, value: &UnaryOpType) -> i32 {
        match value {
            UnaryOpType::Not => 250,
        }
    }

    /// Precedence table for binary operators.
    fn expression_binary_op_precedence(&self, value: &BinaryOpType) -> i32 {
        match value {
            BinaryOpType::Or => 100,
            BinaryOpType::And => 200,
            BinaryOpType::Equal => 300,
            BinaryOpType::NotEqual => 300,
            BinaryOpType::Less => 300,
            BinaryOpType::Greater => 300,
            BinaryOpType::LessEqual => 300,
            BinaryOpType::GreaterEqual => 300,
            BinaryOpType::Is => 400,
            BinaryOpType::IsNot => 400,
            BinaryOpType::Like => 400,
            BinaryOpType::NotLike => 400,
            BinaryOpType::In => 400,
            BinaryOpType::NotIn => 400,
        }
    }

    fn expression_between_precedence(&self) -> i32 {
        400
    }

    fn write_expression(&self, context: &mut Context, out: &mut String, value: &Expression) {
        match value {
            Expression::Operand(v) => self.write_expression_operand(context, out, v),
            Expression::Unary(v) => self.write_expression_unary_op(context, out, v),
            Expression::Binary(v) => self.write_expression_binary_op(context, out, v),
            Expression::Between(v) => self.write_expression_between(context, out, v),
        }
    }

    /// Render an operand (column / variable / list).
    fn write_expression_operand(&self, context: &mut Context, out: &mut String, value: &Operand) {
        match value {
            Operand::Column(v) => self.write_column_ref(context, out, v),
            Operand::Variable(v) => self.write_value(context, out, v),
            Operand::List(v) => {
                out.push('(');
                separated_by(out, v, |out, v| self.write_value(context, out, v), ", ");
                out.push(')');
            }
            Operand::Null => out.push_str("NULL"),
        }
    }

    /// Render unary operator expression.
    fn write_expression_unary_op(&self, context: &mut Context, out: &mut String, value: &UnaryOp) {
        match value.op {
            UnaryOpType::Not => out.push_str("NOT "),
        };
        possibly_parenthesized!(
            out,
            value.arg.precedence(self.as_dyn()) <= self.expression_unary_op_precedence(&value.op),
            self.write_expression(context, out, &value.arg)
        );
    }

    /// Render binary operator expression handling precedence / parenthesis.
    fn write_expression_binary_op(&self, context: &mut Context, out: &mut String, value: &BinaryOp) {
        let infix = match value.op {
            BinaryOpType::Is => " IS ",
            BinaryOpType::IsNot => " IS NOT ",
            BinaryOpType::Like => " LIKE ",
            BinaryOpType::NotLike => " NOT LIKE ",
            BinaryOpType::In => " IN ",
            BinaryOpType::NotIn => " NOT IN ",
            BinaryOpType::Equal => " = ",
            BinaryOpType::NotEqual => " != ",
            BinaryOpType::Less => " < ",
            BinaryOpType::LessEqual => " <= ",
            BinaryOpType::Greater => " > ",
            BinaryOpType::GreaterEqual => " >= ",
            BinaryOpType::And => " AND ",
            BinaryOpType::Or => " OR ",
        };
        let precedence = self.expression_binary_op_precedence(&value.op);
        possibly_parenthesized!(
            out,
            value.lhs.precedence(self.as_dyn()) < precedence,
            self.write_expression(context, out, &value.lhs)
        );
        out.push_str(infix);
        possibly_parenthesized!(
            out,
            value.rhs.precedence(self.as_dyn()) <= precedence,
            self.write_expression(context, out, &value.rhs)
        );
    }

    fn write_expression_between(&self, context: &mut Context, out: &mut String, value: &Between) {
        let precedence = self.expression_between_precedence();
        possibly_parenthesized!(
            out,
            value.arg.precedence(self.as_dyn()) <= precedence,
            self.write_expression(context, out, &value.arg)
        );
        out.push_str(" BETWEEN ");
        possibly_parenthesized!(
            out,
            value.low.precedence(self.as_dyn()) <= precedence,
            self.write_expression(context, out, &value.low)
        );
        out.push_str(" AND ");
        possibly_parenthesized!(
            out,
            value.high.precedence(self.as_dyn()) <= precedence,
            self.write_expression(context, out, &value.high)
        );
    }

    /// Render ordered expression inside ORDER BY.
    fn write_expression_ordered(&self, context: &mut Context, out: &mut String, value: &Ordered) {
        self.write_column_ref(context, out, &value.column);
        out.push_str(match value.order {
            Order::ASC => " ASC",
            Order::DESC => " DESC",
        });
    }

    /// Render a LEFT JOIN clause.
    fn write_join(&self, context: &mut Context, out: &mut String, join: &Join) {
        context.fragment = Fragment::SqlJoin;
        out.push_str("\nLEFT JOIN ");
        self.write_table_ref(context, out, &join.mapper);
        out.push_str(" ON ");
        self.write_expression(context, out, &join.on);
    }

    /// Emit BEGIN statement.
    fn write_transaction_begin(&self, out: &mut String) {
        out.push_str("BEGIN;");
    }

    /// Emit COMMIT statement.
    fn write_transaction_commit(&self, out: &mut String) {
        out.push_str("COMMIT;");
    }

    /// Emit ROLLBACK statement.
    fn write_transaction_rollback(&self, out: &mut String) {
        out.push_str("ROLLBACK;");
    }

    /// Emit LIMIT / OFFSET.
    fn write_limit(&self, _context: &mut Context, out: &mut String, offset: u64, count: u64) {
        out.push_str("\nLIMIT ");
        write_integer!(out, count);
        out.push_str(" OFFSET ");
        write_integer!(out, offset);
    }

    /// Emit SELECT statement (projection, FROM, joins, WHERE, ORDER, LIMIT).
    ///
    /// The context must hold the aliases of every table of the query.
    fn write_select(&self, context: &mut Context, out: &mut String, query: &Query, columns: &[Column]) {
        out.reserve(128 + columns.len() * 32);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("SELECT ");
        context.fragment = Fragment::SqlSelect;
        separated_by(
            out,
            columns,
            |out, col| self.write_column_ref(context, out, col),
            ", ",
        );
        out.push_str("\nFROM ");
        context.fragment = Fragment::SqlSelectFrom;
        self.write_table_ref(context, out, query.base());
        for join in query.joins() {
            self.write_join(context, out, join);
        }
        if let Some(filter) = query.filter_expression() {
            out.push_str("\nWHERE ");
            context.fragment = Fragment::SqlSelectWhere;
            self.write_expression(context, out, filter);
        }
        if !query.order().is_empty() {
            out.push_str("\nORDER BY ");
            context.fragment = Fragment::SqlSelectOrderBy;
            separated_by(
                out,
                query.order(),
                |out, v| self.write_expression_ordered(context, out, v),
                ", ",
            );
        }
        if let Some((offset, count)) = query.limit_range() {
            self.write_limit(context, out, offset, count);
        }
        out.push(';');
    }

    /// Emit INSERT of a single row, `DEFAULT VALUES` when nothing is set.
    fn write_insert(
        &self,
        context: &mut Context,
        out: &mut String,
        mapper: &Mapper,
        values: &[(&ColumnDef, Value)],
    ) {
        out.reserve(128 + values.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("INSERT INTO ");
        context.fragment = Fragment::SqlInsertInto;
        self.write_table_ref(context, out, mapper);
        if values.is_empty() {
            out.push_str(" DEFAULT VALUES;");
            return;
        }
        out.push_str(" (");
        separated_by(
            out,
            values,
            |out, (col, _)| self.write_identifier_quoted(context, out, &col.db_column),
            ", ",
        );
        out.push_str(") VALUES (");
        context.fragment = Fragment::SqlInsertIntoValues;
        separated_by(
            out,
            values,
            |out, (_, value)| self.write_value(context, out, value),
            ", ",
        );
        out.push_str(");");
    }

    /// Emit UPDATE assigning `values`, with an optional WHERE clause.
    fn write_update(
        &self,
        context: &mut Context,
        out: &mut String,
        mapper: &Mapper,
        values: &[(&ColumnDef, Value)],
        condition: Option<&Expression>,
    ) {
        out.reserve(128 + values.len() * 48);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("UPDATE ");
        context.fragment = Fragment::SqlUpdate;
        self.write_table_ref(context, out, mapper);
        out.push_str(" SET ");
        context.fragment = Fragment::SqlUpdateSet;
        separated_by(
            out,
            values,
            |out, (col, value)| {
                self.write_identifier_quoted(context, out, &col.db_column);
                out.push_str(" = ");
                self.write_value(context, out, value);
            },
            ", ",
        );
        if let Some(condition) = condition {
            out.push_str("\nWHERE ");
            context.fragment = Fragment::SqlUpdateWhere;
            self.write_expression(context, out, condition);
        }
        out.push(';');
    }

    /// Emit DELETE statement, with an optional WHERE clause.
    fn write_delete(
        &self,
        context: &mut Context,
        out: &mut String,
        mapper: &Mapper,
        condition: Option<&Expression>,
    ) {
        out.reserve(128);
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("DELETE FROM ");
        context.fragment = Fragment::SqlDeleteFrom;
        self.write_table_ref(context, out, mapper);
        if let Some(condition) = condition {
            out.push_str("\nWHERE ");
            context.fragment = Fragment::SqlDeleteFromWhere;
            self.write_expression(context, out, condition);
        }
        out.push(';');
    }
}

/// Fallback generic SQL writer: `?` placeholders and `"` quoted identifiers.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter;

impl GenericSqlWriter {
    pub fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
