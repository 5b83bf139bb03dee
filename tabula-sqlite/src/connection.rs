use crate::{
    CBox, SqliteDriver, SqlitePrepared, SqliteTransaction, error_message_from_ptr,
    extract::{extract_name, extract_value},
};
use libsqlite3_sys::{
    SQLITE_DONE, SQLITE_OK, SQLITE_OPEN_CREATE, SQLITE_OPEN_READWRITE,
    SQLITE_OPEN_URI, SQLITE_ROW, sqlite3, sqlite3_changes64, sqlite3_close, sqlite3_column_count,
    sqlite3_db_handle, sqlite3_errmsg, sqlite3_finalize, sqlite3_last_insert_rowid,
    sqlite3_open_v2, sqlite3_prepare_v2, sqlite3_step, sqlite3_stmt,
};
use std::{
    ffi::{CStr, CString, c_char, c_int},
    marker::PhantomData,
    ptr,
};
use tabula_core::{
    Connection, ConnectionUrl, Driver, Executor, Prepared, RowLabeled, RowNames, Rows,
    RowsAffected, Statement,
    anyhow::{Context, Error, Result},
    truncate_long,
};

pub struct SqliteConnection {
    pub(crate) connection: CBox<sqlite3>,
}

/// Characters with a meaning in SQLite URI filenames.
fn escape_uri_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => out.push_str("%25"),
            '?' => out.push_str("%3f"),
            '#' => out.push_str("%23"),
            c => out.push(c),
        }
    }
    out
}

/// Filename handed to `sqlite3_open_v2`, with the URL parameters (`mode`, `cache`, ...)
/// passed through as URI parameters.
fn sqlite_filename(url: &ConnectionUrl) -> String {
    let mut filename = if url.is_memory() {
        "file::memory:".to_string()
    } else {
        format!("file:{}", escape_uri_path(&url.location))
    };
    for (i, (key, value)) in url.params.iter().enumerate() {
        filename.push(if i == 0 { '?' } else { '&' });
        filename.push_str(&escape_uri_path(key));
        filename.push('=');
        filename.push_str(&escape_uri_path(value));
    }
    filename
}

impl SqliteConnection {
    fn error(&self) -> Error {
        unsafe { Error::msg(error_message_from_ptr(&sqlite3_errmsg(*self.connection)).to_string()) }
    }

    pub(crate) fn prepare(&mut self, sql: &str) -> Result<SqlitePrepared> {
        let context = || format!("While preparing the query:\n{}", truncate_long!(sql));
        let c_sql = CString::new(sql)
            .context("Could not create a CString from the query String")
            .with_context(context)?;
        let mut statement = CBox::new(ptr::null_mut::<sqlite3_stmt>(), |p| unsafe {
            sqlite3_finalize(p);
        });
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe {
            sqlite3_prepare_v2(
                *self.connection,
                c_sql.as_ptr(),
                -1,
                &mut *statement,
                &mut tail,
            )
        };
        if rc != SQLITE_OK {
            let error = self.error().context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        if statement.is_null() {
            let error = Error::msg("The query contains no statement").context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        if !tail.is_null() && !unsafe { CStr::from_ptr(tail) }.to_bytes().trim_ascii().is_empty()
        {
            let error =
                Error::msg("Cannot prepare more than one statement at a time").context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(SqlitePrepared::new(statement))
    }

    fn prepare_statement(&mut self, statement: &Statement) -> Result<SqlitePrepared> {
        let mut prepared = self.prepare(&statement.sql)?;
        for param in &statement.params {
            prepared.bind(param.clone())?;
        }
        Ok(prepared)
    }
}

/// Rows of a running statement, stepped on demand.
struct SqliteRows<'s> {
    prepared: SqlitePrepared,
    labels: RowNames,
    count: c_int,
    done: bool,
    _connection: PhantomData<&'s mut SqliteConnection>,
}

impl Iterator for SqliteRows<'_> {
    type Item = Result<RowLabeled>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let statement = *self.prepared.statement;
        match unsafe { sqlite3_step(statement) } {
            SQLITE_ROW => {
                let values = (0..self.count)
                    .map(|i| extract_value(statement, i))
                    .collect::<Result<Box<[_]>>>();
                Some(values.map(|values| RowLabeled::new(self.labels.clone(), values)))
            }
            SQLITE_DONE => {
                self.done = true;
                None
            }
            _ => {
                self.done = true;
                let error = unsafe {
                    Error::msg(
                        error_message_from_ptr(&sqlite3_errmsg(sqlite3_db_handle(statement)))
                            .to_string(),
                    )
                }
                .context(format!("While fetching the rows of:\n{}", self.prepared));
                log::error!("{:#}", error);
                Some(Err(error))
            }
        }
    }
}

impl Executor for SqliteConnection {
    type Driver = SqliteDriver;

    fn driver(&self) -> &Self::Driver {
        &SqliteDriver {}
    }

    fn fetch<'s>(&'s mut self, statement: &Statement) -> Result<Rows<'s>> {
        let prepared = self.prepare_statement(statement)?;
        let statement = *prepared.statement;
        let count = unsafe { sqlite3_column_count(statement) };
        let labels = (0..count)
            .map(|i| extract_name(statement, i))
            .collect::<Result<RowNames>>()?;
        Ok(Box::new(SqliteRows {
            prepared,
            labels,
            count,
            done: false,
            _connection: PhantomData,
        }))
    }

    fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
        let prepared = self.prepare_statement(statement)?;
        loop {
            match unsafe { sqlite3_step(*prepared.statement) } {
                SQLITE_ROW => continue,
                SQLITE_DONE => break,
                _ => {
                    let error = self
                        .error()
                        .context(format!("While executing the query:\n{}", statement));
                    log::error!("{:#}", error);
                    return Err(error);
                }
            }
        }
        let is_insert = statement
            .sql
            .trim_start()
            .get(..6)
            .is_some_and(|v| v.eq_ignore_ascii_case("INSERT"));
        unsafe {
            Ok(RowsAffected {
                rows_affected: sqlite3_changes64(*self.connection) as u64,
                last_affected_id: is_insert.then(|| sqlite3_last_insert_rowid(*self.connection)),
            })
        }
    }
}

impl Connection for SqliteConnection {
    /// Accepts `sqlite::memory:` and `sqlite:///path/to/file.db?mode=rwc` URLs.
    fn connect(url: &str) -> Result<SqliteConnection> {
        let parsed = ConnectionUrl::parse(url)?;
        parsed.expect_driver(<Self::Driver as Driver>::NAME)?;
        let context = || format!("While opening the database `{}`", url);
        let filename = CString::new(sqlite_filename(&parsed)).with_context(context)?;
        let mut connection = CBox::new(ptr::null_mut::<sqlite3>(), |p| unsafe {
            sqlite3_close(p);
        });
        let rc = unsafe {
            sqlite3_open_v2(
                filename.as_ptr(),
                &mut *connection,
                SQLITE_OPEN_URI | SQLITE_OPEN_READWRITE | SQLITE_OPEN_CREATE,
                ptr::null(),
            )
        };
        let result = Self { connection };
        if rc != SQLITE_OK {
            let error = result.error().context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(result)
    }

    fn begin(&mut self) -> Result<SqliteTransaction<'_>> {
        SqliteTransaction::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::{SqliteConnection, sqlite_filename};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tabula_core::{Connection, ConnectionUrl, Executor, Prepared, Statement, Value};

    #[test]
    fn filenames() {
        let url = ConnectionUrl::parse("sqlite::memory:").unwrap();
        assert_eq!(sqlite_filename(&url), "file::memory:");
        let url = ConnectionUrl::parse("sqlite:///tmp/a%3Fb.db?mode=ro").unwrap();
        assert_eq!(sqlite_filename(&url), "file:/tmp/a%3fb.db?mode=ro");
    }

    #[test]
    fn rebinding() {
        let mut connection = SqliteConnection::connect("sqlite::memory:").unwrap();
        let mut prepared = connection.prepare("SELECT ?1 + ?2").unwrap();
        prepared.bind(1).unwrap().bind(2).unwrap();
        assert_eq!(prepared.index, 3);
        prepared.clear_bindings().unwrap();
        assert_eq!(prepared.index, 1);
        prepared.bind_index(40, 2).unwrap();
        assert_eq!(prepared.index, 3);
        assert_eq!(prepared.to_string(), "SELECT ?1 + ?2");
        assert!(connection.prepare("").is_err());
    }

    #[test]
    fn decimals_are_bound_as_text() {
        let mut connection = SqliteConnection::connect("sqlite::memory:").unwrap();
        let amount = Decimal::from_str("1234567890.123456789").unwrap();
        let rows = connection
            .fetch(&Statement::new("SELECT typeof(?1), ?1").with_params([amount.into()]))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows[0].values()[0], Value::Varchar(Some("text".into())));
        assert_eq!(
            rows[0].values()[1],
            Value::Varchar(Some("1234567890.123456789".into()))
        );
    }
}
