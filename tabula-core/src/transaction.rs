use crate::Executor;
use anyhow::Result;

pub trait Transaction<'c>: Executor {
    fn commit(self) -> Result<()>;
    fn rollback(self) -> Result<()>;
}
