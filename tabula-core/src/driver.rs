use crate::{Connection, Prepared, SqlWriter, Transaction};

/// Entry point of a database backend: names it and ties together its connection,
/// dialect printer and prepared statement types.
pub trait Driver {
    type Connection: Connection;
    type SqlWriter: SqlWriter;
    type Prepared: Prepared;
    type Transaction<'c>: Transaction<'c>;

    /// Scheme of the connection URLs this driver accepts.
    const NAME: &'static str;

    fn sql_writer(&self) -> Self::SqlWriter;
}
