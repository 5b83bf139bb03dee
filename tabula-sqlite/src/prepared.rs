use crate::{CBox, error_message_from_ptr};
use libsqlite3_sys::*;
use std::{
    ffi::{CStr, c_int},
    fmt::{self, Display},
    os::raw::{c_char, c_void},
};
use tabula_core::{
    Prepared, Value,
    anyhow::{Error, Result},
    truncate_long,
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Temporal values are stored as TEXT in the formats the value conversions parse back.
fn format_date(v: &Date) -> String {
    format!("{:04}-{:02}-{:02}", v.year(), u8::from(v.month()), v.day())
}

fn format_time(v: &Time) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:09}",
        v.hour(),
        v.minute(),
        v.second(),
        v.nanosecond()
    )
}

fn format_timestamp(v: &PrimitiveDateTime) -> String {
    format!("{} {}", format_date(&v.date()), format_time(&v.time()))
}

fn format_timestamp_utc(v: &OffsetDateTime) -> String {
    let v = v.to_offset(UtcOffset::UTC);
    format!("{} {}+00:00", format_date(&v.date()), format_time(&v.time()))
}

pub struct SqlitePrepared {
    pub(crate) statement: CBox<sqlite3_stmt>,
    pub(crate) index: u64,
}

impl SqlitePrepared {
    pub(crate) fn new(prepared: CBox<sqlite3_stmt>) -> Self {
        unsafe {
            sqlite3_clear_bindings(*prepared);
        }
        Self {
            statement: prepared,
            index: 1,
        }
    }

    fn bind_text(&mut self, index: c_int, v: &str) -> c_int {
        unsafe {
            sqlite3_bind_text(
                *self.statement,
                index,
                v.as_ptr() as *const c_char,
                v.len() as c_int,
                SQLITE_TRANSIENT(),
            )
        }
    }
}

impl Prepared for SqlitePrepared {
    fn bind(&mut self, value: impl Into<Value>) -> Result<&mut Self> {
        let index = self.index;
        self.bind_index(value, index)
    }

    /// SQLite parameters are numbered from 1.
    fn bind_index(&mut self, value: impl Into<Value>, index: u64) -> Result<&mut Self> {
        let value = value.into();
        let position = index as c_int;
        let statement = *self.statement;
        let rc = unsafe {
            match &value {
                v if v.is_null() => sqlite3_bind_null(statement, position),
                Value::Boolean(Some(v)) => sqlite3_bind_int(statement, position, *v as c_int),
                Value::Int8(Some(v)) => sqlite3_bind_int(statement, position, *v as c_int),
                Value::Int16(Some(v)) => sqlite3_bind_int(statement, position, *v as c_int),
                Value::Int32(Some(v)) => sqlite3_bind_int(statement, position, *v as c_int),
                Value::Int64(Some(v)) => sqlite3_bind_int64(statement, position, *v),
                Value::UInt8(Some(v)) => sqlite3_bind_int(statement, position, *v as c_int),
                Value::UInt16(Some(v)) => sqlite3_bind_int(statement, position, *v as c_int),
                Value::UInt32(Some(v)) => sqlite3_bind_int64(statement, position, *v as i64),
                Value::UInt64(Some(v)) => {
                    let Ok(v) = i64::try_from(*v) else {
                        let error = Error::msg(format!(
                            "Cannot bind u64 value `{v}` into a sqlite integer because it's out of bounds"
                        ));
                        log::error!("{:#}", error);
                        return Err(error);
                    };
                    sqlite3_bind_int64(statement, position, v)
                }
                Value::Float32(Some(v)) => sqlite3_bind_double(statement, position, *v as f64),
                Value::Float64(Some(v)) => sqlite3_bind_double(statement, position, *v),
                Value::Decimal(Some(v)) => self.bind_text(position, &v.to_string()),
                Value::Varchar(Some(v)) => self.bind_text(position, v),
                Value::Blob(Some(v)) => sqlite3_bind_blob(
                    statement,
                    position,
                    v.as_ptr() as *const c_void,
                    v.len() as c_int,
                    SQLITE_TRANSIENT(),
                ),
                Value::Date(Some(v)) => self.bind_text(position, &format_date(v)),
                Value::Time(Some(v)) => self.bind_text(position, &format_time(v)),
                Value::Timestamp(Some(v)) => self.bind_text(position, &format_timestamp(v)),
                Value::TimestampWithTimezone(Some(v)) => {
                    self.bind_text(position, &format_timestamp_utc(v))
                }
                Value::Uuid(Some(v)) => self.bind_text(position, &v.to_string()),
                _ => {
                    let error =
                        Error::msg(format!("Cannot use a {:?} as a query parameter", value));
                    log::error!("{:#}", error);
                    return Err(error);
                }
            }
        };
        if rc != SQLITE_OK {
            let error = unsafe {
                let db = sqlite3_db_handle(statement);
                let query = CStr::from_ptr(sqlite3_sql(statement)).to_string_lossy();
                Error::msg(error_message_from_ptr(&sqlite3_errmsg(db)).to_string()).context(
                    format!(
                        "Cannot bind parameter {} to query:\n{}",
                        index,
                        truncate_long!(&*query)
                    ),
                )
            };
            log::error!("{:#}", error);
            return Err(error);
        }
        self.index = index + 1;
        Ok(self)
    }

    fn clear_bindings(&mut self) -> Result<&mut Self> {
        unsafe {
            sqlite3_clear_bindings(*self.statement);
        }
        self.index = 1;
        Ok(self)
    }
}

impl Display for SqlitePrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = unsafe { sqlite3_sql(*self.statement) };
        if sql.is_null() {
            return write!(f, "{:p}", *self.statement);
        }
        let sql = unsafe { CStr::from_ptr(sql) }.to_string_lossy();
        write!(f, "{}", truncate_long!(&*sql))
    }
}
