use crate::{Record, Value};
use anyhow::{Result, bail};
use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    ops::{Deref, DerefMut},
};

/// Dirty-tracking state of one record: the values last known to be persisted.
///
/// The holder stores value snapshots only, it never references the record it tracks.
/// An empty baseline means the record was never loaded nor saved.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Holder {
    baseline: HashMap<&'static str, Value>,
}

impl Holder {
    pub fn new(baseline: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self {
            baseline: baseline.into_iter().collect(),
        }
    }
    pub fn baseline(&self, field: &str) -> Option<&Value> {
        self.baseline.get(field)
    }
    pub fn is_empty(&self) -> bool {
        self.baseline.is_empty()
    }
}

/// A record paired with its dirty-tracking holder.
///
/// Dereferences to the record, so fields are read and assigned directly:
/// ```rust
/// # use tabula_core::{Record, Tracked, Value};
/// # #[derive(Default)]
/// # struct Item { qty: i32 }
/// # impl Record for Item {
/// #     fn field_names() -> &'static [&'static str] { &["qty"] }
/// #     fn field(&self, _: &str) -> Option<Value> { Some(Value::Int32(Some(self.qty))) }
/// #     fn set_field(&mut self, _: &str, v: Value) -> anyhow::Result<()> {
/// #         self.qty = tabula_core::AsValue::try_from_value(v)?; Ok(())
/// #     }
/// # }
/// let mut item = Tracked::attach(Item { qty: 1 }, [("qty", Value::Int32(Some(1)))]);
/// assert!(item.is_clean());
/// item.qty = 2;
/// assert_eq!(item.compute_dirty(), [("qty", Value::Int32(Some(2)))]);
/// ```
///
/// Changes are detected lazily by comparing the current field values against the
/// baseline snapshot, nothing intercepts the assignments.
pub struct Tracked<R: Record> {
    record: R,
    holder: Holder,
}

impl<R: Record> Tracked<R> {
    /// Track a record that was never persisted.
    pub fn new(record: R) -> Self {
        Self {
            record,
            holder: Holder::default(),
        }
    }

    /// Track a record whose persisted values are `baseline`.
    pub fn attach(record: R, baseline: impl IntoIterator<Item = (&'static str, Value)>) -> Self {
        Self {
            record,
            holder: Holder::new(baseline),
        }
    }

    /// Fields whose current value diverges from the baseline, in field order.
    ///
    /// A field without a baseline entry counts as dirty only when it differs from its
    /// zero value, so an untouched field of a fresh record is unset, not dirty.
    pub fn compute_dirty(&self) -> Vec<(&'static str, Value)> {
        R::field_defs()
            .into_iter()
            .filter_map(|def| {
                let current = self.record.field(def.name)?;
                let reference = self.holder.baseline(def.name).unwrap_or(&def.zero);
                (current != *reference).then_some((def.name, current))
            })
            .collect()
    }

    /// Fields to write when the record is inserted: the dirty ones plus any field the
    /// baseline already knows about.
    pub fn compute_set(&self) -> Vec<(&'static str, Value)> {
        R::field_defs()
            .into_iter()
            .filter_map(|def| {
                let current = self.record.field(def.name)?;
                (self.holder.baseline(def.name).is_some() || current != def.zero)
                    .then_some((def.name, current))
            })
            .collect()
    }

    /// Take the current values as the new baseline.
    pub fn clear(&mut self) {
        self.holder = Holder::new(
            R::field_names()
                .iter()
                .filter_map(|&name| Some((name, self.record.field(name)?))),
        );
    }

    /// Assign `values` to the record, then take the result as the new baseline.
    pub fn reset<'a>(&mut self, values: impl IntoIterator<Item = (&'a str, Value)>) -> Result<()> {
        for (name, value) in values {
            if !R::has_field(name) {
                bail!("Record {} has no field `{name}`", std::any::type_name::<R>());
            }
            self.record.set_field(name, value)?;
        }
        self.clear();
        Ok(())
    }

    /// Forget the baseline, the record is no longer persisted.
    pub(crate) fn detach(&mut self) {
        self.holder = Holder::default();
    }

    pub fn is_clean(&self) -> bool {
        self.compute_dirty().is_empty()
    }

    /// True once the record was loaded or saved at least once.
    pub fn is_persisted(&self) -> bool {
        !self.holder.is_empty()
    }

    pub fn holder(&self) -> &Holder {
        &self.holder
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn into_inner(self) -> R {
        self.record
    }
}

impl<R: Record> Deref for Tracked<R> {
    type Target = R;
    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl<R: Record> DerefMut for Tracked<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.record
    }
}

impl<R: Record> Default for Tracked<R> {
    fn default() -> Self {
        Self::new(R::default())
    }
}

impl<R: Record> From<R> for Tracked<R> {
    fn from(record: R) -> Self {
        Self::new(record)
    }
}

impl<R: Record + Clone> Clone for Tracked<R> {
    fn clone(&self) -> Self {
        Self {
            record: self.record.clone(),
            holder: self.holder.clone(),
        }
    }
}

impl<R: Record + Debug> Debug for Tracked<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("record", &self.record)
            .field("holder", &self.holder)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Tracked;
    use crate::{Value, record::tests::Book};

    #[test]
    fn fresh_record_reports_only_assigned_fields() {
        let mut book = Tracked::new(Book::default());
        assert!(book.is_clean());
        assert!(!book.is_persisted());
        book.title = "Dune".into();
        assert_eq!(
            book.compute_dirty(),
            [("title", Value::Varchar(Some("Dune".into())))]
        );
        assert_eq!(book.compute_set(), book.compute_dirty());
    }

    #[test]
    fn clear_takes_current_values_as_baseline() {
        let mut book = Tracked::new(Book {
            id: 1,
            title: "Emma".into(),
            pages: Some(300),
        });
        assert_eq!(book.compute_dirty().len(), 3);
        book.clear();
        assert!(book.is_clean());
        assert!(book.is_persisted());
        assert_eq!(book.compute_dirty(), book.compute_dirty());
        book.pages = None;
        assert_eq!(book.compute_dirty(), [("pages", Value::Int32(None))]);
        assert_eq!(book.compute_set().len(), 3);
    }

    #[test]
    fn reverting_a_change_makes_the_field_clean_again() {
        let mut book = Tracked::attach(
            Book {
                id: 3,
                ..Default::default()
            },
            [("id", Value::Int64(Some(3)))],
        );
        book.id = 4;
        assert!(!book.is_clean());
        book.id = 3;
        assert!(book.is_clean());
    }

    #[test]
    fn reset_assigns_then_clears() {
        let mut book = Tracked::new(Book::default());
        book.reset([("id", Value::Int64(Some(9))), ("title", "Ulysses".into())])
            .unwrap();
        assert_eq!(book.id, 9);
        assert_eq!(book.title, "Ulysses");
        assert!(book.is_clean());
        assert_eq!(book.holder().baseline("id"), Some(&Value::Int64(Some(9))));
        assert!(book.reset([("isbn", Value::Null)]).is_err());
    }
}
