use crate::Value;
use anyhow::Result;

/// A named attribute of a record, with the value it holds in `R::default()`.
///
/// The zero value is the sentinel used by dirty tracking to tell an unset field
/// from one the caller assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub zero: Value,
}

/// Plain domain object the mappers translate to and from table rows.
///
/// Usually derived with `#[derive(Record)]`. Implementations expose their fields
/// by name, nothing else: a record knows nothing about tables or persistence.
pub trait Record: Default + 'static {
    /// Field names in declaration order.
    fn field_names() -> &'static [&'static str];

    /// Current value of the field, `None` if the record has no such field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Assign a field from a dynamic value, converting it to the field type.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    fn field_defs() -> Vec<FieldDef>
    where
        Self: Sized,
    {
        let zero = Self::default();
        Self::field_names()
            .iter()
            .map(|&name| FieldDef {
                name,
                zero: zero.field(name).unwrap_or_default(),
            })
            .collect()
    }

    fn has_field(name: &str) -> bool
    where
        Self: Sized,
    {
        Self::field_names().contains(&name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::Record;
    use crate::{AsValue, Value};
    use anyhow::{Result, bail};

    #[derive(Default, Debug, Clone, PartialEq)]
    pub struct Book {
        pub id: i64,
        pub title: String,
        pub pages: Option<i32>,
    }

    impl Record for Book {
        fn field_names() -> &'static [&'static str] {
            &["id", "title", "pages"]
        }
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.as_value()),
                "title" => Some(self.title.clone().as_value()),
                "pages" => Some(self.pages.as_value()),
                _ => None,
            }
        }
        fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "id" => self.id = AsValue::try_from_value(value)?,
                "title" => self.title = AsValue::try_from_value(value)?,
                "pages" => self.pages = AsValue::try_from_value(value)?,
                _ => bail!("Book has no field `{name}`"),
            }
            Ok(())
        }
    }

    #[test]
    fn zero_values_come_from_default() {
        let defs = Book::field_defs();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].name, "id");
        assert_eq!(defs[0].zero, Value::Int64(Some(0)));
        assert_eq!(defs[1].zero, Value::Varchar(Some("".into())));
        assert!(defs[2].zero.is_null());
    }

    #[test]
    fn set_field_converts() {
        let mut book = Book::default();
        book.set_field("id", Value::Int32(Some(4))).unwrap();
        book.set_field("pages", Value::Null).unwrap();
        assert_eq!(book.id, 4);
        assert_eq!(book.pages, None);
        assert!(book.set_field("author", Value::Null).is_err());
        assert!(Book::has_field("title"));
        assert!(!Book::has_field("author"));
    }
}
