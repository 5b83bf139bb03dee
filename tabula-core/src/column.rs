use crate::{Between, BinaryOp, BinaryOpType, Expression, Mapper, Operand, Order, Ordered, Value};
use std::borrow::Cow;

/// Column declared on a mapper: a record field bound to a database column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Record field name.
    pub name: &'static str,
    /// Column name in the table, the field name unless overridden.
    pub db_column: Cow<'static, str>,
    /// Inserted when the field is left unset.
    pub default: Option<Value>,
    /// Assigned by the database on insert.
    pub auto_increment: bool,
}

impl ColumnDef {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            db_column: Cow::Borrowed(name),
            default: None,
            auto_increment: false,
        }
    }
    pub fn db_column(mut self, db_column: impl Into<Cow<'static, str>>) -> Self {
        self.db_column = db_column.into();
        self
    }
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

impl From<&'static str> for ColumnDef {
    fn from(name: &'static str) -> Self {
        ColumnDef::new(name)
    }
}

/// Reference to a column of one specific mapper, the building block of expressions.
///
/// Two references are equal when they name the same field of the same mapper
/// identity, so the columns of an [`Mapper::aliased`] copy are distinct.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) mapper: Mapper,
    pub(crate) name: &'static str,
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.mapper == other.mapper
    }
}

macro_rules! comparison {
    ($($(#[$attr:meta])* $name:ident => $op:path),+ $(,)?) => {
        $(
            $(#[$attr])*
            pub fn $name(&self, rhs: impl Into<Operand>) -> Expression {
                self.binary($op, rhs.into())
            }
        )+
    };
}

impl Column {
    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    /// Record field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn def(&self) -> Option<&ColumnDef> {
        self.mapper.column_def(self.name)
    }

    fn binary(&self, op: BinaryOpType, rhs: Operand) -> Expression {
        Expression::Binary(BinaryOp::new(op, self, rhs))
    }

    /// `= value`, or `IS NULL` when comparing with NULL.
    pub fn eq(&self, rhs: impl Into<Operand>) -> Expression {
        match rhs.into() {
            Operand::Variable(v) if v.is_null() => self.is_null(),
            rhs => self.binary(BinaryOpType::Equal, rhs),
        }
    }

    /// `!= value`, or `IS NOT NULL` when comparing with NULL.
    pub fn ne(&self, rhs: impl Into<Operand>) -> Expression {
        match rhs.into() {
            Operand::Variable(v) if v.is_null() => self.is_not_null(),
            rhs => self.binary(BinaryOpType::NotEqual, rhs),
        }
    }

    comparison! {
        lt => BinaryOpType::Less,
        le => BinaryOpType::LessEqual,
        gt => BinaryOpType::Greater,
        ge => BinaryOpType::GreaterEqual,
        /// SQL `LIKE` pattern match.
        like => BinaryOpType::Like,
        not_like => BinaryOpType::NotLike,
    }

    pub fn is_null(&self) -> Expression {
        self.binary(BinaryOpType::Is, Operand::Null)
    }

    pub fn is_not_null(&self) -> Expression {
        self.binary(BinaryOpType::IsNot, Operand::Null)
    }

    /// `IN (...)`, every value bound as a parameter.
    pub fn is_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Expression {
        self.binary(
            BinaryOpType::In,
            Operand::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn not_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Expression {
        self.binary(
            BinaryOpType::NotIn,
            Operand::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn between(&self, low: impl Into<Operand>, high: impl Into<Operand>) -> Expression {
        Expression::Between(Between {
            arg: Box::new(self.into()),
            low: Box::new(low.into().into()),
            high: Box::new(high.into().into()),
        })
    }

    pub fn asc(&self) -> Ordered {
        Ordered {
            order: Order::ASC,
            column: self.clone(),
        }
    }

    pub fn desc(&self) -> Ordered {
        Ordered {
            order: Order::DESC,
            column: self.clone(),
        }
    }
}
