use crate::{
    ColumnDef, Context, Driver, Error, Executor, Expression, Fragment, Mapper, Query, Record,
    Result, SqlWriter, Statement, Tracked, Value,
};
use std::any;

/// Outcome of an insert, update or delete.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct MutationResult {
    /// Identifier of the inserted row: the one supplied by the caller or the one the
    /// database generated. `None` for updates, deletes and composite keys.
    pub last_id: Option<Value>,
    /// Rows the database reports as modified.
    pub affected_cnt: u64,
}

impl Extend<MutationResult> for MutationResult {
    fn extend<T: IntoIterator<Item = MutationResult>>(&mut self, iter: T) {
        for elem in iter {
            self.affected_cnt += elem.affected_cnt;
            if elem.last_id.is_some() {
                self.last_id = elem.last_id;
            }
        }
    }
}

fn run<E: Executor>(executor: &mut E, statement: &Statement) -> Result<u64> {
    log::debug!("{}", statement);
    Ok(executor.execute(statement)?.rows_affected)
}

/// Equality on every identifier, `None` if some identifier has no value.
fn identifier_predicate<R: Record>(mapper: &Mapper, record: &Tracked<R>) -> Option<Expression> {
    let defs = R::field_defs();
    let mut predicate: Option<Expression> = None;
    for &id in mapper.identifiers() {
        let value = match record.holder().baseline(id) {
            Some(v) => v.clone(),
            None => {
                let current = record.field(id)?;
                let zero = defs.iter().find(|d| d.name == id).map(|d| &d.zero);
                if zero == Some(&current) {
                    return None;
                }
                current
            }
        };
        let term = mapper.column(id).eq(value);
        predicate = Some(match predicate {
            Some(p) => p & term,
            None => term,
        });
    }
    predicate
}

fn single_identifier<R: Record>(mapper: &Mapper, record: &R) -> Option<Value> {
    match mapper.identifiers() {
        [id] => record.field(id),
        _ => None,
    }
}

impl Mapper {
    /// The INSERT for `record`, with the field an auto increment key will receive and the
    /// column defaults to assign back once the row exists.
    fn insert_statement<R: Record>(
        &self,
        writer: &dyn SqlWriter,
        record: &Tracked<R>,
    ) -> Result<(Statement, Option<&'static str>, Vec<(&'static str, Value)>)> {
        self.check_usable("insert")?;
        self.check_manages::<R>()?;
        let set = record.compute_set();
        let mut values: Vec<(&ColumnDef, Value)> = Vec::with_capacity(set.len());
        let mut generated = None;
        let mut defaults = Vec::new();
        for column in self.columns().iter().filter(|c| R::has_field(c.name)) {
            if let Some((_, value)) = set.iter().find(|(name, _)| *name == column.name) {
                values.push((column, value.clone()));
            } else if let Some(default) = &column.default {
                values.push((column, default.clone()));
                defaults.push((column.name, default.clone()));
            } else if column.auto_increment {
                generated = Some(column.name);
            } else if self.identifiers().contains(&column.name) {
                return Err(Error::validation(format!(
                    "cannot insert {} through `{}`: identifier `{}` is not set",
                    any::type_name::<R>(),
                    self.name(),
                    column.name
                )));
            }
        }
        let mut context = Context::new(Fragment::SqlInsertInto, false);
        let mut sql = String::new();
        writer.write_insert(&mut context, &mut sql, self, &values);
        Ok((context.into_statement(sql), generated, defaults))
    }

    /// Insert a record that was never persisted.
    ///
    /// Only the fields that were set are written, unset ones fall back to the column
    /// default when declared. An unset identifier is accepted only when the database
    /// generates it, the generated value is then assigned to the record. On success the
    /// holder is cleared, on failure it is left untouched.
    pub fn insert<E: Executor, R: Record>(
        &self,
        executor: &mut E,
        record: &mut Tracked<R>,
    ) -> Result<MutationResult> {
        let writer = executor.driver().sql_writer();
        let (statement, generated, defaults) = self.insert_statement(&writer, record)?;
        log::debug!("{}", statement);
        let mut scratch = R::default();
        for (field, value) in &defaults {
            scratch.set_field(field, value.clone()).map_err(|e| {
                Error::validation(format!(
                    "cannot assign the default of `{field}` to {}: {e:#}",
                    any::type_name::<R>()
                ))
            })?;
        }
        let affected = executor.execute(&statement)?;
        if let Some(field) = generated {
            if let Some(id) = affected.last_affected_id {
                if let Err(e) = record.set_field(field, Value::Int64(Some(id))) {
                    log::warn!(
                        "Row inserted through `{}` but the generated `{field}` {id} was not assigned: {e:#}",
                        self.name()
                    );
                }
            }
        }
        // Conversions checked before executing
        for (field, value) in defaults {
            let _ = record.set_field(field, value);
        }
        record.clear();
        Ok(MutationResult {
            last_id: single_identifier(self, record.record()),
            affected_cnt: affected.rows_affected,
        })
    }

    /// Insert each record with its own statement, stopping at the first failure.
    pub fn insert_many<'r, E: Executor, R: Record>(
        &self,
        executor: &mut E,
        records: impl IntoIterator<Item = &'r mut Tracked<R>>,
    ) -> Result<MutationResult> {
        let mut result = MutationResult::default();
        for record in records {
            result.extend([self.insert(executor, record)?]);
        }
        Ok(result)
    }

    /// Update the row of a persisted record, insert a fresh one.
    pub fn save<E: Executor, R: Record>(
        &self,
        executor: &mut E,
        record: &mut Tracked<R>,
    ) -> Result<MutationResult> {
        if record.is_persisted() {
            self.query().save(executor, record)
        } else {
            self.insert(executor, record)
        }
    }

    /// Delete the row identified by the record identifiers. The record is then
    /// considered never persisted.
    pub fn delete_record<E: Executor, R: Record>(
        &self,
        executor: &mut E,
        record: &mut Tracked<R>,
    ) -> Result<MutationResult> {
        self.check_usable("delete")?;
        self.check_manages::<R>()?;
        if self.identifiers().is_empty() {
            return Err(Error::validation(format!(
                "mapper `{}` declares no identifier to delete a record by",
                self.name()
            )));
        }
        let condition = identifier_predicate(self, record).ok_or_else(|| {
            Error::validation(format!(
                "cannot delete {}: its identifier is not set",
                any::type_name::<R>()
            ))
        })?;
        let writer = executor.driver().sql_writer();
        let mut context = Context::new(Fragment::SqlDeleteFrom, false);
        let mut sql = String::new();
        writer.write_delete(&mut context, &mut sql, self, Some(&condition));
        let affected_cnt = run(executor, &context.into_statement(sql))?;
        record.detach();
        Ok(MutationResult {
            last_id: None,
            affected_cnt,
        })
    }

    /// Delete every row of the table.
    pub fn delete_all<E: Executor>(&self, executor: &mut E) -> Result<MutationResult> {
        self.check_usable("delete")?;
        log::warn!("Deleting every row of table `{}`", self.table().unwrap_or_default());
        let writer = executor.driver().sql_writer();
        let mut context = Context::new(Fragment::SqlDeleteFrom, false);
        let mut sql = String::new();
        writer.write_delete(&mut context, &mut sql, self, None);
        let affected_cnt = run(executor, &context.into_statement(sql))?;
        Ok(MutationResult {
            last_id: None,
            affected_cnt,
        })
    }
}

impl Query {
    /// The UPDATE writing the dirty fields of `record`, `None` when nothing changed.
    pub fn update_statement<R: Record>(
        &self,
        writer: &dyn SqlWriter,
        record: &Tracked<R>,
    ) -> Result<Option<Statement>> {
        self.check_single_table("update")?;
        let mapper = self.base();
        mapper.check_manages::<R>()?;
        let identifiers = mapper.identifiers();
        let condition = match (
            self.filter_expression().cloned(),
            identifier_predicate(mapper, record),
        ) {
            (Some(filter), Some(id)) => filter & id,
            (Some(filter), None) => filter,
            (None, Some(id)) => id,
            (None, None) => {
                return Err(Error::validation(format!(
                    "cannot save {} through `{}` without a filter or an identifier",
                    any::type_name::<R>(),
                    mapper.name()
                )));
            }
        };
        let values: Vec<(&ColumnDef, Value)> = record
            .compute_dirty()
            .into_iter()
            .filter(|(name, _)| {
                !identifiers.contains(name) || record.holder().baseline(name).is_some()
            })
            .filter_map(|(name, value)| Some((mapper.column_def(name)?, value)))
            .collect();
        if values.is_empty() {
            return Ok(None);
        }
        let mut context = Context::new(Fragment::SqlUpdate, false);
        let mut sql = String::new();
        writer.write_update(&mut context, &mut sql, mapper, &values, Some(&condition));
        Ok(Some(context.into_statement(sql)))
    }

    /// Write the dirty fields of `record` to the rows matching the filter and the
    /// record identifiers.
    ///
    /// The holder is cleared once the statement succeeds, even when no row matched.
    /// Nothing is executed when the record has no dirty field.
    pub fn save<E: Executor, R: Record>(
        &self,
        executor: &mut E,
        record: &mut Tracked<R>,
    ) -> Result<MutationResult> {
        let writer = executor.driver().sql_writer();
        let Some(statement) = self.update_statement(&writer, record)? else {
            return Ok(MutationResult::default());
        };
        let affected_cnt = run(executor, &statement)?;
        record.clear();
        Ok(MutationResult {
            last_id: None,
            affected_cnt,
        })
    }

    /// The DELETE removing the rows matching the filter.
    pub fn delete_statement(&self, writer: &dyn SqlWriter) -> Result<Statement> {
        self.check_single_table("delete")?;
        let Some(filter) = self.filter_expression() else {
            return Err(Error::validation(format!(
                "refusing to delete from `{}` without a filter, use delete_all to empty it",
                self.base().name()
            )));
        };
        let mut context = Context::new(Fragment::SqlDeleteFrom, false);
        let mut sql = String::new();
        writer.write_delete(&mut context, &mut sql, self.base(), Some(filter));
        Ok(context.into_statement(sql))
    }

    /// Delete the rows matching the filter, a filter is required.
    pub fn delete<E: Executor>(&self, executor: &mut E) -> Result<MutationResult> {
        let writer = executor.driver().sql_writer();
        let statement = self.delete_statement(&writer)?;
        let affected_cnt = run(executor, &statement)?;
        Ok(MutationResult {
            last_id: None,
            affected_cnt,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ColumnDef, GenericSqlWriter, Mapper, Tracked, Value, record::tests::Book,
    };

    fn books() -> Mapper {
        Mapper::builder("Books")
            .column(ColumnDef::new("id").auto_increment())
            .column("title")
            .column(ColumnDef::new("pages").default(100))
            .identifiers(["id"])
            .table("books")
            .manages::<Book>()
            .build()
            .unwrap()
    }

    #[test]
    fn insert_omits_generated_key_and_fills_defaults() {
        let books = books();
        let mut book = Tracked::new(Book {
            title: "Dune".into(),
            ..Default::default()
        });
        let (statement, generated, defaults) =
            books.insert_statement(&GenericSqlWriter, &book).unwrap();
        assert_eq!(
            statement.sql,
            r#"INSERT INTO "books" ("title", "pages") VALUES (?, ?);"#
        );
        assert_eq!(
            statement.params,
            [Value::Varchar(Some("Dune".into())), Value::Int32(Some(100))]
        );
        assert_eq!(generated, Some("id"));
        assert_eq!(defaults, [("pages", Value::Int32(Some(100)))]);

        book.id = 7;
        let (statement, generated, _) = books.insert_statement(&GenericSqlWriter, &book).unwrap();
        assert_eq!(
            statement.sql,
            r#"INSERT INTO "books" ("id", "title", "pages") VALUES (?, ?, ?);"#
        );
        assert_eq!(generated, None);
    }

    #[test]
    fn unset_identifier_is_rejected() {
        let books = Mapper::builder("Books")
            .column("id")
            .column("title")
            .column("pages")
            .identifiers(["id"])
            .table("books")
            .manages::<Book>()
            .build()
            .unwrap();
        let book = Tracked::new(Book::default());
        let error = books.insert_statement(&GenericSqlWriter, &book).unwrap_err();
        assert!(error.is_validation());
    }

    #[test]
    fn update_uses_the_baseline_identifier() {
        let books = books();
        let mut book = Tracked::new(Book {
            id: 1,
            title: "Emma".into(),
            pages: Some(300),
        });
        book.clear();
        assert!(
            books
                .query()
                .update_statement(&GenericSqlWriter, &book)
                .unwrap()
                .is_none()
        );
        book.id = 2;
        book.pages = None;
        let statement = books
            .query()
            .update_statement(&GenericSqlWriter, &book)
            .unwrap()
            .unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE \"books\" SET \"id\" = ?, \"pages\" = ?\nWHERE \"id\" = ?;"
        );
        assert_eq!(
            statement.params,
            [Value::Int64(Some(2)), Value::Int32(None), Value::Int64(Some(1))]
        );
    }

    #[test]
    fn delete_requires_a_filter() {
        let books = books();
        assert!(
            books
                .query()
                .delete_statement(&GenericSqlWriter)
                .unwrap_err()
                .is_validation()
        );
        let statement = books
            .filter(books.column("pages").lt(10))
            .delete_statement(&GenericSqlWriter)
            .unwrap();
        assert_eq!(statement.sql, "DELETE FROM \"books\"\nWHERE \"pages\" < ?;");
        assert_eq!(statement.params, [Value::Int32(Some(10))]);
    }
}
