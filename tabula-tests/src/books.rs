use crate::execute_sql;
use std::sync::{LazyLock, Mutex};
use tabula::{ColumnDef, Executor, Mapper, Record, Registry, Tracked, Value};

static MUTEX: Mutex<()> = Mutex::new(());

#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub country: Option<String>,
}

#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct Book {
    pub id: i64,
    pub title: String,
    /// Main author
    pub author: Option<i64>,
    pub year: i32,
}

struct Library {
    authors: Mapper,
    books: Mapper,
}

static LIBRARY: LazyLock<Library> = LazyLock::new(|| {
    let registry = Registry::global();
    let entity = Mapper::builder("LibraryEntity")
        .column(ColumnDef::new("id").auto_increment())
        .identifiers(["id"])
        .is_abstract(true)
        .register(registry)
        .expect("Failed to register the LibraryEntity mapper");
    let authors = Mapper::builder("Authors")
        .extends(&entity)
        .column(ColumnDef::new("name").db_column("full_name"))
        .column("country")
        .table("authors")
        .manages::<Author>()
        .register(registry)
        .expect("Failed to register the Authors mapper");
    let books = Mapper::builder("Books")
        .extends(&entity)
        .column("title")
        .column(ColumnDef::new("author").db_column("author_id"))
        .column("year")
        .table("books")
        .manages::<Book>()
        .register(registry)
        .expect("Failed to register the Books mapper");
    Library { authors, books }
});

pub(crate) fn register() {
    LazyLock::force(&LIBRARY);
}

fn book(title: &str, author: &Tracked<Author>, year: i32) -> Tracked<Book> {
    Tracked::new(Book {
        title: title.into(),
        author: Some(author.id),
        year,
        ..Default::default()
    })
}

pub fn books<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let Library { authors, books } = &*LIBRARY;

    // Setup
    execute_sql(
        executor,
        &[
            "DROP TABLE IF EXISTS books",
            "DROP TABLE IF EXISTS authors",
            "CREATE TABLE authors (id INTEGER PRIMARY KEY, full_name VARCHAR(64) NOT NULL, country VARCHAR(64))",
            "CREATE TABLE books (id INTEGER PRIMARY KEY, title VARCHAR(128) NOT NULL, author_id INTEGER REFERENCES authors(id), year INTEGER NOT NULL)",
        ],
    );
    assert_eq!(
        Registry::global().mapper_for::<Book>().expect("Books is registered"),
        *books
    );

    // Authors
    let mut tolkien = Tracked::new(Author {
        name: "J.R.R. Tolkien".into(),
        country: Some("UK".into()),
        ..Default::default()
    });
    let result = authors
        .insert(executor, &mut tolkien)
        .expect("Failed to insert an author");
    assert_eq!(result.affected_cnt, 1);
    assert_ne!(tolkien.id, 0, "The generated identifier is written back");
    assert_eq!(result.last_id, Some(Value::Int64(Some(tolkien.id))));
    assert!(tolkien.is_persisted());
    assert!(tolkien.is_clean());

    let mut rowling = Tracked::new(Author {
        name: "J.K. Rowling".into(),
        country: Some("UK".into()),
        ..Default::default()
    });
    let mut gluchovskij = Tracked::new(Author {
        name: "Dmitrij Gluchovskij".into(),
        country: Some("Russia".into()),
        ..Default::default()
    });
    let result = authors
        .insert_many(executor, [&mut rowling, &mut gluchovskij])
        .expect("Failed to insert the authors");
    assert_eq!(result.affected_cnt, 2);
    assert_eq!(result.last_id, Some(Value::Int64(Some(gluchovskij.id))));
    assert!(rowling.id != tolkien.id && rowling.id != gluchovskij.id);

    // Books
    let mut shelf = vec![
        book("The Hobbit", &tolkien, 1937),
        book("The Fellowship of the Ring", &tolkien, 1955),
        book("Harry Potter and the Philosopher's Stone", &rowling, 1997),
        book("Harry Potter and the Chamber of Secrets", &rowling, 1998),
        book("Metro 2033", &gluchovskij, 2002),
        Tracked::new(Book {
            title: "Beowulf".into(),
            year: 1000,
            ..Default::default()
        }),
    ];
    let result = books
        .insert_many(executor, shelf.iter_mut())
        .expect("Failed to insert the books");
    assert_eq!(result.affected_cnt, 6);
    assert!(shelf.iter().all(|b| b.id != 0 && b.is_clean()));

    // Round trip
    let hobbit = &shelf[0];
    let loaded = books
        .filter(books.column("id").eq(hobbit.id))
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to load The Hobbit");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].record(), hobbit.record());
    assert!(loaded[0].is_persisted());
    assert!(loaded[0].is_clean());

    // Update
    let mut fellowship = books
        .filter(books.column("title").eq("The Fellowship of the Ring"))
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to load The Fellowship of the Ring")
        .pop()
        .expect("The Fellowship of the Ring was inserted");
    fellowship.year = 1954;
    assert_eq!(fellowship.compute_dirty(), [("year", Value::Int32(Some(1954)))]);
    let result = books
        .save(executor, &mut fellowship)
        .expect("Failed to update The Fellowship of the Ring");
    assert_eq!(result.affected_cnt, 1);
    assert_eq!(result.last_id, None);
    assert!(fellowship.is_clean());
    assert!(fellowship.compute_dirty().is_empty());
    assert!(fellowship.compute_dirty().is_empty());
    let result = books
        .save(executor, &mut fellowship)
        .expect("Saving a clean record does nothing");
    assert_eq!(result.affected_cnt, 0);
    let reloaded = books
        .filter(books.column("id").eq(fellowship.id))
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to reload The Fellowship of the Ring");
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].year, 1954);

    // A filtered update matching nothing still clears the record
    fellowship.title = "The Two Towers".into();
    let result = books
        .filter(books.column("year").gt(2000))
        .save(executor, &mut fellowship)
        .expect("Failed to run the filtered update");
    assert_eq!(result.affected_cnt, 0);
    assert!(fellowship.is_clean());
    let towers = books
        .filter(books.column("title").eq("The Two Towers"))
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to look for The Two Towers");
    assert!(towers.is_empty());

    // Join
    let join = authors.column("id").eq(books.column("author"));
    let rows = books
        .left_join(authors, join.clone())
        .filter(books.column("year").gt(1900))
        .order_by([authors.column("name").asc(), books.column("year").desc()])
        .select::<(Book, Author)>()
        .fetch_all(executor)
        .expect("Failed to join books and authors");
    let titles = rows
        .iter()
        .map(|(b, a)| (b.title.as_str(), a.name.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        titles,
        [
            ("Metro 2033", "Dmitrij Gluchovskij"),
            ("Harry Potter and the Chamber of Secrets", "J.K. Rowling"),
            ("Harry Potter and the Philosopher's Stone", "J.K. Rowling"),
            ("The Fellowship of the Ring", "J.R.R. Tolkien"),
            ("The Hobbit", "J.R.R. Tolkien"),
        ]
    );
    assert!(rows.iter().all(|(b, a)| b.is_clean() && a.is_persisted()));
    let russian = books
        .left_join(authors, join.clone())
        .filter(authors.column("country").eq("Russia"))
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to filter on the joined table");
    assert_eq!(russian.len(), 1);
    assert_eq!(russian[0].title, "Metro 2033");
    let none = books
        .left_join(authors, join.clone())
        .filter(books.column("year").lt(0))
        .select::<(Book, Author)>()
        .fetch_all(executor)
        .expect("Failed to run an empty join");
    assert!(none.is_empty());

    // Unmatched left join side
    let anonymous = books
        .left_join(authors, join.clone())
        .filter(books.column("author").is_null())
        .select::<(Book, Author)>()
        .fetch_all(executor)
        .expect("Failed to load the books without author");
    assert_eq!(anonymous.len(), 1);
    let (beowulf, nobody) = &anonymous[0];
    assert_eq!(beowulf.title, "Beowulf");
    assert_eq!(*nobody.record(), Author::default());
    assert!(!nobody.is_persisted());

    // Self join
    let sequels = books.aliased();
    let rows = books
        .left_join(
            &sequels,
            sequels.column("author").eq(books.column("author"))
                & sequels.column("year").gt(books.column("year")),
        )
        .filter(books.column("title").eq("The Hobbit"))
        .select_from::<(Book, Book)>(&[books, &sequels])
        .fetch_all(executor)
        .expect("Failed to join books with themselves");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0.title, "The Hobbit");
    assert_eq!(rows[0].1.title, "The Fellowship of the Ring");

    // Pagination
    let page = books
        .order_by([books.column("year").asc()])
        .limit(1, 2)
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to read a page of books");
    assert_eq!(
        page.iter().map(|b| b.title.as_str()).collect::<Vec<_>>(),
        ["The Hobbit", "The Fellowship of the Ring"]
    );
    let empty = books
        .order_by([books.column("year").asc()])
        .limit(0, 0)
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to read an empty page");
    assert!(empty.is_empty());
    let past_the_end = books
        .limit(10, 5)
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to read past the last page");
    assert!(past_the_end.is_empty());

    // A select can be run again
    let uk = books
        .left_join(authors, join)
        .filter(authors.column("country").eq("UK"))
        .select::<Book>();
    let mut count = 0;
    for book in uk.iter(executor).expect("Failed to run the select") {
        let book = book.expect("Failed to read a book");
        assert!(book.author.is_some());
        count += 1;
    }
    assert_eq!(count, 4);
    assert_eq!(uk.fetch_all(executor).expect("Failed to run it again").len(), 4);

    // Misuse
    let result = books
        .filter(books.column("year").gt(1900))
        .filter(books.column("year").lt(2000))
        .select::<Book>()
        .fetch_all(executor);
    assert!(result.unwrap_err().is_validation());
    let result = books.select::<Author>().fetch_all(executor);
    assert!(result.unwrap_err().is_validation());

    // Delete
    let result = books
        .filter(books.column("year").lt(1950))
        .delete(executor)
        .expect("Failed to delete the old books");
    assert_eq!(result.affected_cnt, 2);
    assert!(books.query().delete(executor).unwrap_err().is_validation());
    let mut metro = books
        .filter(books.column("title").eq("Metro 2033"))
        .select::<Book>()
        .fetch_all(executor)
        .expect("Failed to load Metro 2033")
        .pop()
        .expect("Metro 2033 was inserted");
    let result = books
        .delete_record(executor, &mut metro)
        .expect("Failed to delete Metro 2033");
    assert_eq!(result.affected_cnt, 1);
    assert!(!metro.is_persisted());
    let result = books
        .save(executor, &mut metro)
        .expect("Failed to insert Metro 2033 again");
    assert_eq!(result.last_id, Some(Value::Int64(Some(metro.id))));
    assert!(metro.is_persisted());
    let result = books
        .delete_all(executor)
        .expect("Failed to empty the books table");
    assert_eq!(result.affected_cnt, 4);
}
