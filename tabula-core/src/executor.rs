use crate::{Driver, RowLabeled, RowsAffected, Statement};
use anyhow::Result;

/// Lazy sequence of result rows, borrowing the executor that produced it.
pub type Rows<'s> = Box<dyn Iterator<Item = Result<RowLabeled>> + 's>;

/// Anything statements can run against: a connection or a transaction.
///
/// Calls block until the database answers. Parameters are always bound, never
/// printed into the SQL text.
pub trait Executor {
    type Driver: Driver;

    fn driver(&self) -> &Self::Driver;

    /// Run a query, rows are produced while the iterator is advanced.
    fn fetch<'s>(&'s mut self, statement: &Statement) -> Result<Rows<'s>>;

    /// Run a modify statement and return the number of rows it affected.
    fn execute(&mut self, statement: &Statement) -> Result<RowsAffected>;

    /// Run several statements, results are accumulated.
    fn execute_many<'a>(
        &mut self,
        statements: impl IntoIterator<Item = &'a Statement>,
    ) -> Result<RowsAffected>
    where
        Self: Sized,
    {
        let mut result = RowsAffected::default();
        for statement in statements {
            result.extend([self.execute(statement)?]);
        }
        Ok(result)
    }
}
