//! Tabula maps plain Rust records onto relational tables.
//!
//! Records stay persistence agnostic: a [`Mapper`] binds their fields to the columns
//! of one table, [`Tracked`] remembers what was last persisted, and queries are built
//! fluently from the mapper columns:
//!
//! ```rust,ignore
//! let recent = books
//!     .filter(books.column("year").ge(2000))
//!     .order_by([books.column("title").asc()])
//!     .limit(0, 10)
//!     .select::<Book>();
//! for mut book in recent.fetch_all(&mut connection)? {
//!     book.year += 1;
//!     books.save(&mut connection, &mut book)?;
//! }
//! ```
pub use tabula_core::*;
pub use tabula_macros::*;
