use crate::{SqliteConnection, SqliteDriver};
use tabula_core::{
    Driver, Executor, Rows, RowsAffected, SqlWriter, Statement, Transaction, anyhow::Result,
};

/// Transaction on a connection, rolled back when dropped without a commit.
pub struct SqliteTransaction<'c> {
    connection: &'c mut SqliteConnection,
    done: bool,
}

impl<'c> SqliteTransaction<'c> {
    pub fn new(connection: &'c mut SqliteConnection) -> Result<Self> {
        let mut sql = String::new();
        connection
            .driver()
            .sql_writer()
            .write_transaction_begin(&mut sql);
        connection.execute(&sql.into())?;
        Ok(Self {
            connection,
            done: false,
        })
    }

    fn finish(&mut self, sql: String) -> Result<()> {
        self.done = true;
        self.connection.execute(&sql.into()).map(|_| ())
    }
}

impl Executor for SqliteTransaction<'_> {
    type Driver = SqliteDriver;

    fn driver(&self) -> &SqliteDriver {
        self.connection.driver()
    }

    fn fetch<'s>(&'s mut self, statement: &Statement) -> Result<Rows<'s>> {
        self.connection.fetch(statement)
    }

    fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
        self.connection.execute(statement)
    }
}

impl<'c> Transaction<'c> for SqliteTransaction<'c> {
    fn commit(mut self) -> Result<()> {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_commit(&mut sql);
        self.finish(sql)
    }

    fn rollback(mut self) -> Result<()> {
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        self.finish(sql)
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut sql = String::new();
        self.driver()
            .sql_writer()
            .write_transaction_rollback(&mut sql);
        if let Err(e) = self.finish(sql) {
            log::error!("{:#}", e.context("While rolling back a dropped transaction"));
        }
    }
}
