#[cfg(test)]
mod tests {
    use indoc::indoc;
    use std::fmt::{self, Display, Formatter};
    use tabula_core::{
        AsValue, ColumnDef, Connection, Driver, Executor, GenericSqlWriter, Mapper,
        MutationResult, Prepared, Record, Registry, RowLabeled, RowNames, Rows, RowsAffected, Statement,
        Tracked, Transaction, Value,
        anyhow::{Result, bail},
    };

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Author {
        id: i64,
        name: String,
    }

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Book {
        id: i64,
        title: String,
        author: Option<i64>,
    }

    impl Record for Author {
        fn field_names() -> &'static [&'static str] {
            &["id", "name"]
        }
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.as_value()),
                "name" => Some(self.name.clone().as_value()),
                _ => None,
            }
        }
        fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "id" => self.id = AsValue::try_from_value(value)?,
                "name" => self.name = AsValue::try_from_value(value)?,
                _ => bail!("Author has no field `{name}`"),
            }
            Ok(())
        }
    }

    impl Record for Book {
        fn field_names() -> &'static [&'static str] {
            &["id", "title", "author"]
        }
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "id" => Some(self.id.as_value()),
                "title" => Some(self.title.clone().as_value()),
                "author" => Some(self.author.as_value()),
                _ => None,
            }
        }
        fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
            match name {
                "id" => self.id = AsValue::try_from_value(value)?,
                "title" => self.title = AsValue::try_from_value(value)?,
                "author" => self.author = AsValue::try_from_value(value)?,
                _ => bail!("Book has no field `{name}`"),
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDriver;

    impl Driver for MockDriver {
        type Connection = MockConnection;
        type SqlWriter = GenericSqlWriter;
        type Prepared = MockPrepared;
        type Transaction<'c> = MockTransaction<'c>;

        const NAME: &'static str = "mock";

        fn sql_writer(&self) -> GenericSqlWriter {
            GenericSqlWriter::new()
        }
    }

    /// Records every statement, answers with canned rows and counters.
    #[derive(Default)]
    struct MockConnection {
        driver: MockDriver,
        statements: Vec<Statement>,
        rows: Vec<Vec<Value>>,
        affected: RowsAffected,
        fail: bool,
    }

    impl MockConnection {
        fn sql(&self) -> Vec<&str> {
            self.statements.iter().map(|s| s.sql.as_str()).collect()
        }
    }

    impl Executor for MockConnection {
        type Driver = MockDriver;

        fn driver(&self) -> &MockDriver {
            &self.driver
        }

        fn fetch<'s>(&'s mut self, statement: &Statement) -> Result<Rows<'s>> {
            self.statements.push(statement.clone());
            if self.fail {
                bail!("mock failure");
            }
            let labels: RowNames = Vec::<String>::new().into();
            let rows = self.rows.clone();
            Ok(Box::new(rows.into_iter().map(
                move |values| -> Result<RowLabeled> {
                    Ok(RowLabeled::new(labels.clone(), values.into()))
                },
            )))
        }

        fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
            self.statements.push(statement.clone());
            if self.fail {
                bail!("mock failure");
            }
            Ok(self.affected)
        }
    }

    impl Connection for MockConnection {
        fn connect(_url: &str) -> Result<Self> {
            Ok(Self::default())
        }

        fn begin(&mut self) -> Result<MockTransaction<'_>> {
            Ok(MockTransaction(self))
        }
    }

    struct MockTransaction<'c>(&'c mut MockConnection);

    impl Executor for MockTransaction<'_> {
        type Driver = MockDriver;

        fn driver(&self) -> &MockDriver {
            self.0.driver()
        }

        fn fetch<'s>(&'s mut self, statement: &Statement) -> Result<Rows<'s>> {
            self.0.fetch(statement)
        }

        fn execute(&mut self, statement: &Statement) -> Result<RowsAffected> {
            self.0.execute(statement)
        }
    }

    impl<'c> Transaction<'c> for MockTransaction<'c> {
        fn commit(self) -> Result<()> {
            Ok(())
        }
        fn rollback(self) -> Result<()> {
            Ok(())
        }
    }

    struct MockPrepared;

    impl Display for MockPrepared {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            f.write_str("mock")
        }
    }

    impl Prepared for MockPrepared {
        fn bind(&mut self, _value: impl Into<Value>) -> Result<&mut Self> {
            Ok(self)
        }
        fn bind_index(&mut self, _value: impl Into<Value>, _index: u64) -> Result<&mut Self> {
            Ok(self)
        }
        fn clear_bindings(&mut self) -> Result<&mut Self> {
            Ok(self)
        }
    }

    struct Mappers {
        authors: Mapper,
        books: Mapper,
    }

    fn mappers() -> Mappers {
        let registry = Registry::new();
        let base = Mapper::builder("Base")
            .column(ColumnDef::new("id").auto_increment())
            .identifiers(["id"])
            .is_abstract(true)
            .register(&registry)
            .unwrap();
        let authors = Mapper::builder("Authors")
            .extends(&base)
            .column(ColumnDef::new("name").db_column("full_name"))
            .table("authors")
            .manages::<Author>()
            .register(&registry)
            .unwrap();
        let books = Mapper::builder("Books")
            .extends(&base)
            .column("title")
            .column(ColumnDef::new("author").db_column("author_id"))
            .table("books")
            .manages::<Book>()
            .register(&registry)
            .unwrap();
        registry.freeze();
        Mappers { authors, books }
    }

    #[test]
    fn select_with_join_order_and_limit() {
        let Mappers { authors, books } = mappers();
        let select = books
            .left_join(&authors, authors.column("id").eq(books.column("author")))
            .filter(books.column("title").like("D%") & authors.column("name").ne("Anonymous"))
            .order_by([authors.column("name").asc(), books.column("id").desc()])
            .limit(10, 5)
            .select::<(Book, Author)>();
        let statement = select.statement(&GenericSqlWriter).unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT t1."id", t1."title", t1."author_id", t2."id", t2."full_name"
                FROM "books" t1
                LEFT JOIN "authors" t2 ON t2."id" = t1."author_id"
                WHERE t1."title" LIKE ? AND t2."full_name" != ?
                ORDER BY t2."full_name" ASC, t1."id" DESC
                LIMIT 5 OFFSET 10;
            "#}
            .trim()
        );
        assert_eq!(
            statement.params,
            [
                Value::Varchar(Some("D%".into())),
                Value::Varchar(Some("Anonymous".into()))
            ]
        );
    }

    #[test]
    fn select_picks_the_mapper_of_each_type() {
        let Mappers { authors, books } = mappers();
        let statement = books
            .left_join(&authors, authors.column("id").eq(books.column("author")))
            .select::<Author>()
            .statement(&GenericSqlWriter)
            .unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT t2."id", t2."full_name"
                FROM "books" t1
                LEFT JOIN "authors" t2 ON t2."id" = t1."author_id";
            "#}
            .trim()
        );
    }

    #[test]
    fn self_join_requires_an_alias() {
        let Mappers { books, .. } = mappers();
        let twice = books
            .left_join(&books, books.column("id").eq(books.column("id")))
            .select::<Book>()
            .statement(&GenericSqlWriter);
        assert!(twice.unwrap_err().is_validation());

        let sequels = books.aliased();
        let statement = books
            .left_join(&sequels, sequels.column("id").eq(books.column("id")))
            .select_from::<(Book, Book)>(&[&books, &sequels])
            .statement(&GenericSqlWriter)
            .unwrap();
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT t1."id", t1."title", t1."author_id", t2."id", t2."title", t2."author_id"
                FROM "books" t1
                LEFT JOIN "books" t2 ON t2."id" = t1."id";
            "#}
            .trim()
        );
    }

    #[test]
    fn chaining_misuse() {
        let Mappers { authors, books } = mappers();
        let twice = books
            .filter(books.column("id").gt(1))
            .filter(books.column("id").lt(9))
            .select::<Book>()
            .statement(&GenericSqlWriter);
        assert!(twice.unwrap_err().is_validation());

        let unknown = books
            .filter(books.column("isbn").eq("x"))
            .select::<Book>()
            .statement(&GenericSqlWriter);
        assert!(unknown.unwrap_err().is_validation());

        let foreign = books
            .filter(authors.column("id").eq(1))
            .select::<Book>()
            .statement(&GenericSqlWriter);
        assert!(foreign.unwrap_err().is_validation());

        let unmapped = books.select::<Author>().statement(&GenericSqlWriter);
        assert!(unmapped.unwrap_err().is_validation());
    }

    #[test]
    fn rows_are_materialized_clean() {
        let Mappers { authors, books } = mappers();
        let mut connection = MockConnection {
            rows: vec![
                vec![
                    Value::Int64(Some(1)),
                    Value::Varchar(Some("Dune".into())),
                    Value::Int64(Some(7)),
                    Value::Int64(Some(7)),
                    Value::Varchar(Some("Frank Herbert".into())),
                ],
                vec![
                    Value::Int64(Some(2)),
                    Value::Varchar(Some("Beowulf".into())),
                    Value::Null,
                    Value::Null,
                    Value::Null,
                ],
            ],
            ..Default::default()
        };
        let select = books
            .left_join(&authors, authors.column("id").eq(books.column("author")))
            .select::<(Book, Author)>();
        let rows = select.fetch_all(&mut connection).unwrap();
        assert_eq!(rows.len(), 2);

        let (book, author) = &rows[0];
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, Some(7));
        assert_eq!(author.name, "Frank Herbert");
        assert!(book.is_clean() && book.is_persisted());
        assert!(author.is_clean() && author.is_persisted());

        let (book, author) = &rows[1];
        assert_eq!(book.author, None);
        assert_eq!(*author.record(), Author::default());
        assert!(author.is_clean());
        assert!(!author.is_persisted());

        // Reusable, each iteration runs the statement again
        assert_eq!(select.iter(&mut connection).unwrap().count(), 2);
        assert_eq!(connection.statements.len(), 2);
        assert_eq!(connection.statements[0], connection.statements[1]);
    }

    #[test]
    fn unreadable_rows_are_database_errors() {
        let Mappers { books, .. } = mappers();
        let mut connection = MockConnection {
            rows: vec![vec![Value::Int64(Some(1)), Value::Varchar(Some("Dune".into()))]],
            ..Default::default()
        };
        let select = books.select::<Book>();
        assert!(select.fetch_all(&mut connection).unwrap_err().is_database());

        // NULL in a field that is not optional, the row is not an unmatched join
        connection.rows = vec![vec![Value::Int64(Some(1)), Value::Null, Value::Null]];
        assert!(select.fetch_all(&mut connection).unwrap_err().is_database());

        connection.rows = vec![vec![
            Value::Int64(Some(1)),
            Value::Varchar(Some(String::new())),
            Value::Null,
        ]];
        let rows = select.fetch_all(&mut connection).unwrap();
        assert_eq!(rows[0].title, "");
        assert!(rows[0].is_clean() && rows[0].is_persisted());
    }

    #[test]
    fn limits_are_capped() {
        let Mappers { books, .. } = mappers();
        let statement = books
            .limit(u64::MAX, u64::MAX)
            .select::<Book>()
            .statement(&GenericSqlWriter)
            .unwrap();
        assert!(
            statement
                .sql
                .ends_with("LIMIT 9223372036854775807 OFFSET 9223372036854775807;"),
            "{}",
            statement.sql
        );
    }

    #[test]
    fn insert_assigns_the_generated_key() {
        let Mappers { books, .. } = mappers();
        let mut connection = MockConnection {
            affected: RowsAffected {
                rows_affected: 1,
                last_affected_id: Some(42),
            },
            ..Default::default()
        };
        let mut book = Tracked::new(Book {
            title: "Dune".into(),
            ..Default::default()
        });
        let result = books.insert(&mut connection, &mut book).unwrap();
        assert_eq!(
            result,
            MutationResult {
                last_id: Some(Value::Int64(Some(42))),
                affected_cnt: 1,
            }
        );
        assert_eq!(book.id, 42);
        assert!(book.is_clean());
        assert!(book.is_persisted());
        assert_eq!(connection.sql(), [r#"INSERT INTO "books" ("title") VALUES (?);"#]);
    }

    #[test]
    fn failed_insert_keeps_the_holder() {
        let Mappers { books, .. } = mappers();
        let mut connection = MockConnection {
            fail: true,
            ..Default::default()
        };
        let mut book = Tracked::new(Book {
            title: "Dune".into(),
            ..Default::default()
        });
        let error = books.insert(&mut connection, &mut book).unwrap_err();
        assert!(error.is_database());
        assert!(!book.is_clean());
        assert!(!book.is_persisted());
    }

    #[test]
    fn insert_write_back() {
        let registry = Registry::new();
        let mut connection = MockConnection {
            affected: RowsAffected {
                rows_affected: 1,
                last_affected_id: Some(7),
            },
            ..Default::default()
        };

        // A default that does not fit the field is refused before anything runs
        let mistyped = Mapper::builder("Mistyped")
            .column("id")
            .column(ColumnDef::new("name").default(7))
            .identifiers(["id"])
            .table("authors")
            .manages::<Author>()
            .register(&registry)
            .unwrap();
        let mut author = Tracked::new(Author {
            id: 1,
            ..Default::default()
        });
        let error = mistyped.insert(&mut connection, &mut author).unwrap_err();
        assert!(error.is_validation());
        assert!(connection.statements.is_empty());
        assert!(!author.is_persisted());

        // Once the row exists the insert succeeds even if the key cannot be assigned
        let named = Mapper::builder("Named")
            .column(ColumnDef::new("name").auto_increment())
            .column("id")
            .identifiers(["name"])
            .table("writers")
            .manages::<Author>()
            .register(&registry)
            .unwrap();
        let mut author = Tracked::new(Author {
            id: 1,
            ..Default::default()
        });
        let result = named.insert(&mut connection, &mut author).unwrap();
        assert_eq!(result.affected_cnt, 1);
        assert!(author.is_clean() && author.is_persisted());
        assert_eq!(connection.statements.len(), 1);
    }

    #[test]
    fn filtered_save_clears_even_without_matches() {
        let Mappers { books, .. } = mappers();
        let mut connection = MockConnection::default();
        let mut book = Tracked::attach(
            Book {
                id: 3,
                title: "Emma".into(),
                author: None,
            },
            [
                ("id", Value::Int64(Some(3))),
                ("title", Value::Varchar(Some("Emma".into()))),
                ("author", Value::Int64(None)),
            ],
        );
        book.title = "Persuasion".into();
        let result = books
            .filter(books.column("author").eq(99))
            .save(&mut connection, &mut book)
            .unwrap();
        assert_eq!(result.affected_cnt, 0);
        assert!(book.is_clean());
        assert_eq!(
            connection.sql(),
            ["UPDATE \"books\" SET \"title\" = ?\nWHERE \"author_id\" = ? AND \"id\" = ?;"]
        );
        assert_eq!(
            connection.statements[0].params,
            [
                Value::Varchar(Some("Persuasion".into())),
                Value::Int32(Some(99)),
                Value::Int64(Some(3)),
            ]
        );

        // Nothing dirty, nothing sent
        let result = books.save(&mut connection, &mut book).unwrap();
        assert_eq!(result.affected_cnt, 0);
        assert_eq!(connection.statements.len(), 1);
    }

    #[test]
    fn save_inserts_new_records_and_updates_loaded_ones() {
        let Mappers { authors, .. } = mappers();
        let mut connection = MockConnection {
            affected: RowsAffected {
                rows_affected: 1,
                last_affected_id: Some(5),
            },
            ..Default::default()
        };
        let mut author = Tracked::new(Author {
            name: "Jane Austen".into(),
            ..Default::default()
        });
        authors.save(&mut connection, &mut author).unwrap();
        assert_eq!(author.id, 5);
        author.name = "J. Austen".into();
        let result = authors.save(&mut connection, &mut author).unwrap();
        assert_eq!(result.affected_cnt, 1);
        assert!(author.is_clean());
        assert_eq!(
            connection.sql(),
            [
                r#"INSERT INTO "authors" ("full_name") VALUES (?);"#,
                "UPDATE \"authors\" SET \"full_name\" = ?\nWHERE \"id\" = ?;",
            ]
        );
    }

    #[test]
    fn deletes() {
        let Mappers { authors, books } = mappers();
        let mut connection = MockConnection {
            affected: RowsAffected {
                rows_affected: 2,
                last_affected_id: None,
            },
            ..Default::default()
        };
        let unfiltered = books.query().delete(&mut connection);
        assert!(unfiltered.unwrap_err().is_validation());
        let joined = books
            .left_join(&authors, authors.column("id").eq(books.column("author")))
            .filter(books.column("id").gt(1))
            .delete(&mut connection);
        assert!(joined.unwrap_err().is_validation());
        assert!(connection.statements.is_empty());

        let result = books
            .filter(books.column("author").is_null())
            .delete(&mut connection)
            .unwrap();
        assert_eq!(result.affected_cnt, 2);

        let mut book = Tracked::attach(Book::default(), [("id", Value::Int64(Some(8)))]);
        books.delete_record(&mut connection, &mut book).unwrap();
        assert!(!book.is_persisted());

        books.delete_all(&mut connection).unwrap();
        assert_eq!(
            connection.sql(),
            [
                "DELETE FROM \"books\"\nWHERE \"author_id\" IS NULL;",
                "DELETE FROM \"books\"\nWHERE \"id\" = ?;",
                "DELETE FROM \"books\";",
            ]
        );
    }

    #[test]
    fn abstract_mappers_reject_mutations() {
        let registry = Registry::new();
        let base = Mapper::builder("Base")
            .column("id")
            .column("name")
            .identifiers(["id"])
            .manages::<Author>()
            .is_abstract(true)
            .register(&registry)
            .unwrap();
        let mut connection = MockConnection::default();
        let mut author = Tracked::new(Author {
            id: 1,
            name: "Homer".into(),
        });
        assert!(
            base.insert(&mut connection, &mut author)
                .unwrap_err()
                .is_validation()
        );
        assert!(
            base.filter(base.column("id").eq(1))
                .delete(&mut connection)
                .unwrap_err()
                .is_validation()
        );
        assert!(
            base.select::<Author>()
                .fetch_all(&mut connection)
                .unwrap_err()
                .is_validation()
        );
        assert!(connection.statements.is_empty());
    }

    #[test]
    fn transactions_run_statements() {
        let Mappers { books, .. } = mappers();
        let mut connection = MockConnection::connect("mock::memory:").unwrap();
        let mut transaction = connection.begin().unwrap();
        let mut first = Tracked::new(Book {
            id: 1,
            title: "Iliad".into(),
            ..Default::default()
        });
        let mut second = Tracked::new(Book {
            id: 2,
            title: "Odyssey".into(),
            ..Default::default()
        });
        let result = books
            .insert_many(&mut transaction, [&mut first, &mut second])
            .unwrap();
        assert_eq!(result.last_id, Some(Value::Int64(Some(2))));
        transaction.commit().unwrap();
        assert_eq!(connection.statements.len(), 2);
        assert!(first.is_clean() && second.is_clean());
    }
}
