use crate::{
    Column, Context, Driver, Error, Executor, Expression, Fragment, Mapper, Ordered, Record,
    Result, SqlWriter, Statement, Tracked, Value,
};
use std::{
    any::TypeId,
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
};

/// LEFT JOIN of another mapper's table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub mapper: Mapper,
    pub on: Expression,
}

/// Immutable query builder: every chained call returns an updated copy.
///
/// Created from a mapper (`books.filter(..)`, `books.left_join(..)`, ...) and consumed by
/// a terminal call: `select::<T>().iter(..)`, `save(..)` or `delete(..)`.
#[derive(Debug, Clone)]
pub struct Query {
    base: Mapper,
    joins: Vec<Join>,
    filter: Option<Expression>,
    order: Vec<Ordered>,
    limit: Option<(u64, u64)>,
    misuse: Option<String>,
}

impl Query {
    pub fn new(base: &Mapper) -> Self {
        Self {
            base: base.clone(),
            joins: Vec::new(),
            filter: None,
            order: Vec::new(),
            limit: None,
            misuse: None,
        }
    }

    pub fn base(&self) -> &Mapper {
        &self.base
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn filter_expression(&self) -> Option<&Expression> {
        self.filter.as_ref()
    }

    pub fn order(&self) -> &[Ordered] {
        &self.order
    }

    /// `(offset, count)`
    pub fn limit_range(&self) -> Option<(u64, u64)> {
        self.limit
    }

    /// Restrict the rows. A query takes a single filter: combine predicates with `&`
    /// and `|` beforehand, a second call is reported by the terminal operation.
    pub fn filter(mut self, expression: impl Into<Expression>) -> Self {
        if self.filter.is_some() {
            self.misuse
                .get_or_insert_with(|| "filter can be called only once per query".into());
        } else {
            self.filter = Some(expression.into());
        }
        self
    }

    pub fn left_join(mut self, mapper: &Mapper, on: impl Into<Expression>) -> Self {
        self.joins.push(Join {
            mapper: mapper.clone(),
            on: on.into(),
        });
        self
    }

    /// Append ordering terms, the first one is the primary sort key.
    pub fn order_by<O: Into<Ordered>>(mut self, terms: impl IntoIterator<Item = O>) -> Self {
        self.order.extend(terms.into_iter().map(Into::into));
        self
    }

    /// Skip `offset` rows then return at most `count`. Both are capped at `i64::MAX`,
    /// the widest bound SQL accepts.
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        let cap = |v: u64| v.min(i64::MAX as u64);
        self.limit = Some((cap(offset), cap(count)));
        self
    }

    /// Project the rows onto `T`: a record type or a tuple of record types. Each
    /// record is read from the first table of the query whose mapper manages it.
    pub fn select<T: Selectable>(self) -> Select<T> {
        Select {
            query: self,
            mappers: None,
            _target: PhantomData,
        }
    }

    /// Like [`Query::select`], naming the mapper each record of `T` is read from.
    pub fn select_from<T: Selectable>(self, mappers: &[&Mapper]) -> Select<T> {
        Select {
            query: self,
            mappers: Some(mappers.iter().map(|&m| m.clone()).collect()),
            _target: PhantomData,
        }
    }

    /// Every table of the query, the base one first.
    pub fn mappers(&self) -> impl Iterator<Item = &Mapper> {
        std::iter::once(&self.base).chain(self.joins.iter().map(|j| &j.mapper))
    }

    pub(crate) fn check_misuse(&self) -> Result<()> {
        if let Some(misuse) = &self.misuse {
            return Err(Error::validation(misuse.clone()));
        }
        Ok(())
    }

    /// Checks shared by every select: usable mappers, distinct identities, known columns.
    pub(crate) fn check_select(&self) -> Result<()> {
        self.check_misuse()?;
        let mappers: Vec<&Mapper> = self.mappers().collect();
        for (i, mapper) in mappers.iter().enumerate() {
            mapper.check_usable("select")?;
            if mappers[..i].contains(mapper) {
                return Err(Error::validation(format!(
                    "mapper `{}` appears twice in the query, join an aliased() copy instead",
                    mapper.name()
                )));
            }
        }
        let columns = self
            .joins
            .iter()
            .flat_map(|j| j.on.columns())
            .chain(self.filter.iter().flat_map(|f| f.columns()))
            .chain(self.order.iter().map(|o| &o.column));
        for column in columns {
            check_column(column)?;
            if !mappers.contains(&column.mapper()) {
                return Err(Error::validation(format!(
                    "column `{}` of mapper `{}` is not part of the query",
                    column.name(),
                    column.mapper().name()
                )));
            }
        }
        Ok(())
    }

    /// Checks for update and delete: one table, columns of the base mapper only.
    pub(crate) fn check_single_table(&self, operation: &str) -> Result<()> {
        self.check_misuse()?;
        self.base.check_usable(operation)?;
        if !self.joins.is_empty() || !self.order.is_empty() || self.limit.is_some() {
            return Err(Error::validation(format!(
                "cannot {operation} through a query with joins, ordering or limits"
            )));
        }
        for column in self.filter.iter().flat_map(|f| f.columns()) {
            check_column(column)?;
            if *column.mapper() != self.base {
                return Err(Error::validation(format!(
                    "cannot {operation} rows of `{}` filtering on column `{}` of mapper `{}`",
                    self.base.name(),
                    column.name(),
                    column.mapper().name()
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn check_column(column: &Column) -> Result<()> {
    if column.def().is_none() {
        return Err(Error::validation(format!(
            "mapper `{}` has no column `{}`",
            column.mapper().name(),
            column.name()
        )));
    }
    Ok(())
}

impl Mapper {
    /// Start a query over this mapper's table.
    pub fn query(&self) -> Query {
        Query::new(self)
    }

    pub fn filter(&self, expression: impl Into<Expression>) -> Query {
        self.query().filter(expression)
    }

    pub fn left_join(&self, mapper: &Mapper, on: impl Into<Expression>) -> Query {
        self.query().left_join(mapper, on)
    }

    pub fn order_by<O: Into<Ordered>>(&self, terms: impl IntoIterator<Item = O>) -> Query {
        self.query().order_by(terms)
    }

    pub fn limit(&self, offset: u64, count: u64) -> Query {
        self.query().limit(offset, count)
    }

    pub fn select<T: Selectable>(&self) -> Select<T> {
        self.query().select()
    }

    pub fn select_from<T: Selectable>(&self, mappers: &[&Mapper]) -> Select<T> {
        self.query().select_from(mappers)
    }
}

/// Record type read from one table of a query.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub id: TypeId,
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

/// Shape of the items produced by [`Select::iter`].
///
/// Implemented for every [`Record`], yielding a bare [`Tracked`] record, and for tuples
/// of up to four records, yielding a tuple of tracked records.
pub trait Selectable: 'static {
    type Output;

    fn targets() -> Vec<Target>;

    /// Build the output from one `(field, value)` list per target.
    fn materialize(parts: Vec<Vec<(&'static str, Value)>>) -> Result<Self::Output>;
}

/// Record with a clean holder built from column values.
///
/// A row made only of NULLs, the unmatched side of a LEFT JOIN, yields a default record
/// that was never persisted. Otherwise every value must convert into its field, a NULL
/// read into a non nullable field included.
pub(crate) fn materialize_record<R: Record>(
    fields: impl IntoIterator<Item = (&'static str, Value)>,
) -> Result<Tracked<R>> {
    let fields: Vec<_> = fields.into_iter().collect();
    if fields.iter().all(|(_, v)| v.is_null()) {
        return Ok(Tracked::new(R::default()));
    }
    let mut record = R::default();
    for (name, value) in fields {
        record.set_field(name, value).map_err(|e| {
            Error::Database(e.context(format!(
                "While reading field `{name}` of {}",
                std::any::type_name::<R>()
            )))
        })?;
    }
    let mut tracked = Tracked::new(record);
    tracked.clear();
    Ok(tracked)
}

impl<R: Record> Selectable for R {
    type Output = Tracked<R>;

    fn targets() -> Vec<Target> {
        vec![Target {
            id: TypeId::of::<R>(),
            name: std::any::type_name::<R>(),
            fields: R::field_names(),
        }]
    }

    fn materialize(parts: Vec<Vec<(&'static str, Value)>>) -> Result<Self::Output> {
        let fields = parts.into_iter().next().unwrap_or_default();
        materialize_record::<R>(fields)
    }
}

macro_rules! impl_selectable_tuple {
    ($($name:ident),+) => {
        impl<$($name: Record),+> Selectable for ($($name,)+) {
            type Output = ($(Tracked<$name>,)+);

            fn targets() -> Vec<Target> {
                vec![$(Target {
                    id: TypeId::of::<$name>(),
                    name: std::any::type_name::<$name>(),
                    fields: $name::field_names(),
                }),+]
            }

            fn materialize(parts: Vec<Vec<(&'static str, Value)>>) -> Result<Self::Output> {
                let mut parts = parts.into_iter();
                Ok(($(materialize_record::<$name>(parts.next().unwrap_or_default())?,)+))
            }
        }
    };
}

impl_selectable_tuple!(A, B);
impl_selectable_tuple!(A, B, C);
impl_selectable_tuple!(A, B, C, D);

/// A compiled projection of a [`Query`], reusable: each [`Select::iter`] call runs the
/// statement again.
pub struct Select<T: Selectable> {
    query: Query,
    mappers: Option<Vec<Mapper>>,
    _target: PhantomData<fn() -> T>,
}

impl<T: Selectable> Clone for Select<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            mappers: self.mappers.clone(),
            _target: PhantomData,
        }
    }
}

impl<T: Selectable> Debug for Select<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("query", &self.query)
            .field("mappers", &self.mappers)
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

/// Resolved projection: the selected columns and the field each one fills.
struct Layout {
    columns: Vec<Column>,
    /// Number of columns read by each target, in target order.
    widths: Vec<usize>,
}

impl<T: Selectable> Select<T> {
    pub fn query(&self) -> &Query {
        &self.query
    }

    fn layout(&self) -> Result<Layout> {
        self.query.check_select()?;
        let targets = T::targets();
        if let Some(mappers) = &self.mappers {
            if mappers.len() != targets.len() {
                return Err(Error::validation(format!(
                    "select_from expects {} mappers, got {}",
                    targets.len(),
                    mappers.len()
                )));
            }
        }
        let mut columns = Vec::new();
        let mut widths = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate() {
            let mapper = match &self.mappers {
                Some(mappers) => {
                    let mapper = &mappers[i];
                    if !self.query.mappers().any(|m| m == mapper) {
                        return Err(Error::validation(format!(
                            "mapper `{}` is not part of the query",
                            mapper.name()
                        )));
                    }
                    if !mapper.manages_type(target.id) {
                        return Err(Error::validation(format!(
                            "mapper `{}` does not manage {}",
                            mapper.name(),
                            target.name
                        )));
                    }
                    mapper
                }
                None => self
                    .query
                    .mappers()
                    .find(|m| m.manages_type(target.id))
                    .ok_or_else(|| {
                        Error::validation(format!(
                            "no table of the query is mapped to {}",
                            target.name
                        ))
                    })?,
            };
            let before = columns.len();
            columns.extend(
                mapper
                    .columns()
                    .iter()
                    .filter(|c| target.fields.contains(&c.name))
                    .map(|c| mapper.column(c.name)),
            );
            widths.push(columns.len() - before);
        }
        Ok(Layout { columns, widths })
    }

    /// The SQL and parameters this select runs.
    pub fn statement(&self, writer: &dyn SqlWriter) -> Result<Statement> {
        Ok(self.compile(writer)?.0)
    }

    fn compile(&self, writer: &dyn SqlWriter) -> Result<(Statement, Layout)> {
        let layout = self.layout()?;
        let mut context = Context::with_tables(Fragment::SqlSelect, self.query.mappers());
        let mut sql = String::new();
        writer.write_select(&mut context, &mut sql, &self.query, &layout.columns);
        Ok((context.into_statement(sql), layout))
    }

    /// Run the query, records are materialized while the iterator is advanced.
    pub fn iter<'e, E: Executor>(
        &self,
        executor: &'e mut E,
    ) -> Result<impl Iterator<Item = Result<T::Output>> + use<'e, T, E>> {
        let writer = executor.driver().sql_writer();
        let (statement, layout) = self.compile(&writer)?;
        log::debug!("{}", statement);
        let rows = executor.fetch(&statement)?;
        let Layout { columns, widths } = layout;
        let names: Vec<&'static str> = columns.iter().map(Column::name).collect();
        Ok(rows.map(move |row| {
            let row = row?;
            if row.values.len() != names.len() {
                return Err(Error::Database(anyhow::anyhow!(
                    "Expected {} columns in the result, found {}",
                    names.len(),
                    row.values.len()
                )));
            }
            let mut values = row.values.into_vec().into_iter();
            let mut names = names.iter();
            let parts = widths
                .iter()
                .map(|&width| {
                    names
                        .by_ref()
                        .take(width)
                        .map(|&name| (name, values.next().unwrap_or_default()))
                        .collect()
                })
                .collect();
            T::materialize(parts)
        }))
    }

    /// Run the query and collect every item.
    pub fn fetch_all<E: Executor>(&self, executor: &mut E) -> Result<Vec<T::Output>> {
        self.iter(executor)?.collect()
    }
}
