use crate::{Value, truncate_long};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Compiled SQL text with its positional parameters, the only thing a driver receives.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
    pub fn with_params(mut self, params: impl IntoIterator<Item = Value>) -> Self {
        self.params = params.into_iter().collect();
        self
    }
}

impl From<&str> for Statement {
    fn from(value: &str) -> Self {
        Statement::new(value)
    }
}

impl From<String> for Statement {
    fn from(value: String) -> Self {
        Statement::new(value)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql.as_str()))?;
        if !self.params.is_empty() {
            f.write_str(" -- params: ")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{param}")?;
            }
        }
        Ok(())
    }
}

/// Metadata about modify operations (INSERT/UPDATE/DELETE).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Backend-specific last inserted identifier when available.
    pub last_affected_id: Option<i64>,
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
}

#[cfg(test)]
mod tests {
    use super::{RowLabeled, RowsAffected, Statement};
    use crate::Value;

    #[test]
    fn display_lists_params() {
        let statement = Statement::new("SELECT 1 WHERE ? = ?")
            .with_params([Value::Int32(Some(1)), Value::Varchar(Some("a".into()))]);
        assert_eq!(statement.to_string(), "SELECT 1 WHERE ? = ? -- params: 1, 'a'");
        assert_eq!(Statement::from("SELECT 1").to_string(), "SELECT 1");
    }

    #[test]
    fn rows_affected_accumulates() {
        let mut total = RowsAffected::default();
        total.extend([
            RowsAffected {
                rows_affected: 1,
                last_affected_id: Some(4),
            },
            RowsAffected {
                rows_affected: 2,
                last_affected_id: None,
            },
        ]);
        assert_eq!(total.rows_affected, 3);
        assert_eq!(total.last_affected_id, Some(4));
    }

    #[test]
    fn columns_by_label() {
        let row = RowLabeled::new(
            ["id".to_string(), "name".to_string()].into(),
            [Value::Int64(Some(1)), Value::Null].into(),
        );
        assert_eq!(row.get_column("id"), Some(&Value::Int64(Some(1))));
        assert_eq!(row.get_column("missing"), None);
    }
}
