mod as_value;
mod column;
mod config;
mod connection;
mod driver;
mod error;
mod executor;
mod expression;
mod mapper;
mod mutation;
mod prepared;
mod record;
mod registry;
mod select;
mod statement;
mod tracking;
mod transaction;
mod util;
mod value;
pub mod writer;

pub use ::anyhow;
pub use as_value::*;
pub use column::*;
pub use config::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use expression::*;
pub use mapper::*;
pub use mutation::*;
pub use prepared::*;
pub use record::*;
pub use registry::*;
pub use select::*;
pub use statement::*;
pub use tracking::*;
pub use transaction::*;
pub use util::*;
pub use value::*;
pub use writer::*;
