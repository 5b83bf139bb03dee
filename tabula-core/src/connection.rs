use crate::{Driver, Executor};
use anyhow::Result;

pub trait Connection: Executor + Sized {
    /// Open a connection described by a URL whose scheme is the driver name.
    fn connect(url: &str) -> Result<Self>;

    /// Start a transaction, it ends when committed or rolled back.
    fn begin(&mut self) -> Result<<Self::Driver as Driver>::Transaction<'_>>;
}
