use crate::Column;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    ASC,
    DESC,
}

/// Ordering term of an `ORDER BY` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered {
    pub order: Order,
    pub column: Column,
}

impl From<Column> for Ordered {
    fn from(column: Column) -> Self {
        Self {
            order: Order::ASC,
            column,
        }
    }
}

impl From<&Column> for Ordered {
    fn from(column: &Column) -> Self {
        column.clone().into()
    }
}
