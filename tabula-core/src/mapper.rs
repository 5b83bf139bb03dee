use crate::{Column, ColumnDef, Error, Record, Registry, Result};
use std::{
    any::{self, TypeId},
    borrow::Cow,
    collections::HashSet,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// Record type a mapper translates to and from its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedType {
    pub id: TypeId,
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

impl ManagedType {
    pub fn of<R: Record>() -> Self {
        Self {
            id: TypeId::of::<R>(),
            name: any::type_name::<R>(),
            fields: R::field_names(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MapperInner {
    pub(crate) name: Cow<'static, str>,
    pub(crate) table: Option<Cow<'static, str>>,
    pub(crate) columns: Vec<ColumnDef>,
    pub(crate) identifiers: Vec<&'static str>,
    pub(crate) managed: Vec<ManagedType>,
    pub(crate) is_abstract: bool,
}

/// Table mapper: binds the columns of one table to the fields of the records it manages.
///
/// A `Mapper` is a cheap shared handle. Its identity (not its content) tells the
/// tables of a query apart, see [`Mapper::aliased`].
#[derive(Clone)]
pub struct Mapper(pub(crate) Arc<MapperInner>);

impl Mapper {
    pub fn builder(name: impl Into<Cow<'static, str>>) -> MapperBuilder {
        MapperBuilder {
            inner: MapperInner {
                name: name.into(),
                table: None,
                columns: Vec::new(),
                identifiers: Vec::new(),
                managed: Vec::new(),
                is_abstract: false,
            },
            errors: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Physical table, `None` for abstract mappers.
    pub fn table(&self) -> Option<&str> {
        self.0.table.as_deref()
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.0.columns
    }

    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.0.columns.iter().find(|c| c.name == name)
    }

    pub fn identifiers(&self) -> &[&'static str] {
        &self.0.identifiers
    }

    pub fn managed(&self) -> &[ManagedType] {
        &self.0.managed
    }

    pub fn is_abstract(&self) -> bool {
        self.0.is_abstract
    }

    pub fn manages<R: Record>(&self) -> bool {
        self.manages_type(TypeId::of::<R>())
    }

    pub fn manages_type(&self, id: TypeId) -> bool {
        self.0.managed.iter().any(|m| m.id == id)
    }

    /// Reference to the column mapped to the record field `name`.
    ///
    /// The name is checked when a statement is compiled, an unknown one fails with
    /// [`Error::Validation`] at that point. Use [`Mapper::try_column`] to check it now.
    pub fn column(&self, name: &'static str) -> Column {
        Column {
            mapper: self.clone(),
            name,
        }
    }

    pub fn try_column(&self, name: &'static str) -> Result<Column> {
        if self.column_def(name).is_none() {
            return Err(Error::validation(format!(
                "Mapper `{}` has no column `{name}`",
                self.name()
            )));
        }
        Ok(self.column(name))
    }

    /// A second identity over the same table, needed to join a table with itself.
    pub fn aliased(&self) -> Mapper {
        Mapper(Arc::new((*self.0).clone()))
    }

    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub(crate) fn check_usable(&self, operation: &str) -> Result<()> {
        if self.is_abstract() {
            return Err(Error::validation(format!(
                "Cannot {operation} through abstract mapper `{}`",
                self.name()
            )));
        }
        Ok(())
    }

    pub(crate) fn check_manages<R: Record>(&self) -> Result<()> {
        if !self.manages::<R>() {
            return Err(Error::validation(format!(
                "Mapper `{}` does not manage {}",
                self.name(),
                any::type_name::<R>()
            )));
        }
        Ok(())
    }
}

impl PartialEq for Mapper {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Mapper {}

impl Debug for Mapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("name", &self.0.name)
            .field("table", &self.0.table)
            .field("abstract", &self.0.is_abstract)
            .finish_non_exhaustive()
    }
}

/// Declares a [`Mapper`]. Problems are collected and reported by
/// [`MapperBuilder::build`] as a single [`Error::Configuration`].
#[must_use]
pub struct MapperBuilder {
    inner: MapperInner,
    errors: Vec<String>,
}

impl MapperBuilder {
    /// Inherit the columns, identifiers and managed types of `parent`.
    ///
    /// Inherited columns come first, in the parent order. Abstractness is not inherited.
    pub fn extends(mut self, parent: &Mapper) -> Self {
        let parent = &parent.0;
        let own = std::mem::take(&mut self.inner.columns);
        self.inner.columns = parent.columns.clone();
        self.inner.columns.extend(own);
        for id in &parent.identifiers {
            if !self.inner.identifiers.contains(id) {
                self.inner.identifiers.push(id);
            }
        }
        for managed in &parent.managed {
            if !self.inner.managed.contains(managed) {
                self.inner.managed.push(*managed);
            }
        }
        self
    }

    pub fn column(mut self, column: impl Into<ColumnDef>) -> Self {
        let column = column.into();
        if let Some(existing) = self.inner.columns.iter_mut().find(|c| c.name == column.name) {
            *existing = column;
        } else {
            self.inner.columns.push(column);
        }
        self
    }

    pub fn identifiers(mut self, identifiers: impl IntoIterator<Item = &'static str>) -> Self {
        self.inner.identifiers = identifiers.into_iter().collect();
        self
    }

    pub fn table(mut self, table: impl Into<Cow<'static, str>>) -> Self {
        self.inner.table = Some(table.into());
        self
    }

    pub fn manages<R: Record>(mut self) -> Self {
        let managed = ManagedType::of::<R>();
        if self.inner.managed.contains(&managed) {
            self.errors.push(format!("{} is declared as managed twice", managed.name));
        } else {
            self.inner.managed.push(managed);
        }
        self
    }

    pub fn is_abstract(mut self, is_abstract: bool) -> Self {
        self.inner.is_abstract = is_abstract;
        self
    }

    /// Validate the declaration on its own, without registering it.
    pub fn build(self) -> Result<Mapper> {
        let Self { inner, mut errors } = self;
        if !inner.is_abstract {
            if inner.table.as_deref().is_none_or(str::is_empty) {
                errors.push("a non abstract mapper must declare a table".into());
            }
            if inner.managed.is_empty() {
                errors.push("a non abstract mapper must manage at least one record type".into());
            }
        }
        let mut names = HashSet::new();
        let mut db_columns = HashSet::new();
        for column in &inner.columns {
            if !names.insert(column.name) {
                errors.push(format!("column `{}` is declared twice", column.name));
            }
            if !db_columns.insert(column.db_column.as_ref()) {
                errors.push(format!(
                    "database column `{}` is mapped by more than one field",
                    column.db_column
                ));
            }
        }
        let mut identifiers = HashSet::new();
        for id in &inner.identifiers {
            if !names.contains(id) {
                errors.push(format!("identifier `{id}` is not a declared column"));
            }
            if !identifiers.insert(*id) {
                errors.push(format!("identifier `{id}` is listed twice"));
            }
        }
        if inner
            .columns
            .iter()
            .filter(|c| c.auto_increment)
            .any(|c| inner.identifiers.len() != 1 || inner.identifiers[0] != c.name)
        {
            errors.push("only a single identifier column can be auto increment".into());
        }
        for managed in &inner.managed {
            for field in managed.fields {
                if !names.contains(field) {
                    errors.push(format!(
                        "field `{field}` of {} has no column",
                        managed.name
                    ));
                }
            }
        }
        if !errors.is_empty() {
            let error = Error::configuration(format!(
                "mapper `{}`: {}",
                inner.name,
                errors.join(", ")
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        Ok(Mapper(Arc::new(inner)))
    }

    /// Validate the declaration and add it to `registry`.
    pub fn register(self, registry: &Registry) -> Result<Mapper> {
        let mapper = self.build()?;
        registry.register(mapper.clone())?;
        Ok(mapper)
    }
}

#[cfg(test)]
mod tests {
    use super::Mapper;
    use crate::{ColumnDef, Registry, record::tests::Book};

    fn base() -> Mapper {
        Mapper::builder("Base")
            .column(ColumnDef::new("id").auto_increment())
            .identifiers(["id"])
            .is_abstract(true)
            .build()
            .unwrap()
    }

    #[test]
    fn extends_inherits_columns_first() {
        let base = base();
        let books = Mapper::builder("Books")
            .extends(&base)
            .column("title")
            .column(ColumnDef::new("pages").db_column("page_count"))
            .table("books")
            .manages::<Book>()
            .build()
            .unwrap();
        let names: Vec<_> = books.columns().iter().map(|c| c.name).collect();
        assert_eq!(names, ["id", "title", "pages"]);
        assert_eq!(books.identifiers(), ["id"]);
        assert!(!books.is_abstract());
        assert_eq!(books.column_def("pages").unwrap().db_column, "page_count");
        assert_ne!(books.column("id"), base.column("id"));
    }

    #[test]
    fn configuration_errors() {
        let missing_table = Mapper::builder("NoTable")
            .column("id")
            .column("title")
            .column("pages")
            .manages::<Book>()
            .build();
        assert!(missing_table.unwrap_err().is_configuration());

        let bad_identifier = Mapper::builder("BadId")
            .column("id")
            .column("title")
            .column("pages")
            .identifiers(["isbn"])
            .table("books")
            .manages::<Book>()
            .build();
        assert!(bad_identifier.unwrap_err().is_configuration());

        let unmapped_field = Mapper::builder("Partial")
            .column("id")
            .table("books")
            .manages::<Book>()
            .build();
        assert!(unmapped_field.unwrap_err().is_configuration());

        let manages_nothing = Mapper::builder("Empty").column("id").table("t").build();
        assert!(manages_nothing.unwrap_err().is_configuration());

        let abstract_ok = Mapper::builder("Abstract")
            .column("id")
            .is_abstract(true)
            .build();
        assert!(abstract_ok.is_ok());
    }

    #[test]
    fn aliased_is_a_new_identity() {
        let registry = Registry::new();
        let books = Mapper::builder("Books")
            .extends(&base())
            .column("title")
            .column("pages")
            .table("books")
            .manages::<Book>()
            .register(&registry)
            .unwrap();
        let alias = books.aliased();
        assert_ne!(books, alias);
        assert_eq!(books, books.clone());
        assert_eq!(alias.table(), Some("books"));
        assert!(books.try_column("title").is_ok());
        assert!(books.try_column("isbn").unwrap_err().is_validation());
    }
}
