use crate::Value;
use anyhow::Result;
use std::fmt::Display;

/// Statement compiled by the database, parameters bound one by one.
///
/// `bind` fills the next parameter, `bind_index` a given one using the numbering of
/// the driver. Both return the handle so calls chain:
/// ```rust,ignore
/// prepared.bind(42)?.bind("hello")?;
/// ```
pub trait Prepared: Display {
    fn bind(&mut self, value: impl Into<Value>) -> Result<&mut Self>;
    fn bind_index(&mut self, value: impl Into<Value>, index: u64) -> Result<&mut Self>;
    /// Forget every bound value, the next `bind` fills the first parameter.
    fn clear_bindings(&mut self) -> Result<&mut Self>;
}
