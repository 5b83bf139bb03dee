use crate::execute_sql;
use std::sync::{LazyLock, Mutex};
use tabula::{ColumnDef, Connection, Executor, Mapper, Record, Registry, Tracked, Transaction};

#[derive(Record, Default, Debug, Clone, PartialEq)]
struct Entry {
    id: i64,
    name: String,
    field: i64,
}

static ENTRIES: LazyLock<Mapper> = LazyLock::new(|| {
    Mapper::builder("Entries")
        .column(ColumnDef::new("id").auto_increment())
        .column("name")
        .column("field")
        .identifiers(["id"])
        .table("entries")
        .manages::<Entry>()
        .register(Registry::global())
        .expect("Failed to register the Entries mapper")
});

static MUTEX: Mutex<()> = Mutex::new(());

pub(crate) fn register() {
    LazyLock::force(&ENTRIES);
}

fn count<E: Executor>(executor: &mut E) -> usize {
    ENTRIES
        .select::<Entry>()
        .fetch_all(executor)
        .expect("Failed to load the entries")
        .len()
}

pub fn transaction<C: Connection>(connection: &mut C) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let entries = &*ENTRIES;

    // Setup
    let mut transaction = connection
        .begin()
        .expect("Could not begin a transaction");
    execute_sql(
        &mut transaction,
        &[
            "DROP TABLE IF EXISTS entries",
            "CREATE TABLE entries (id INTEGER PRIMARY KEY, name VARCHAR(32) NOT NULL, field INTEGER NOT NULL)",
        ],
    );
    transaction
        .commit()
        .expect("Failed to commit the transaction");

    // Commit
    let mut transaction = connection
        .begin()
        .expect("Could not begin a transaction");
    let mut batch = ["first entry", "second entry", "third entry"]
        .into_iter()
        .map(|name| {
            Tracked::new(Entry {
                name: name.into(),
                field: 48826,
                ..Default::default()
            })
        })
        .collect::<Vec<_>>();
    let result = entries
        .insert_many(&mut transaction, batch.iter_mut())
        .expect("Failed to insert 3 entries");
    assert_eq!(result.affected_cnt, 3);
    assert_eq!(count(&mut transaction), 3);
    transaction
        .commit()
        .expect("Failed to commit the transaction");
    assert_eq!(count(connection), 3);

    // Rollback
    let mut transaction = connection
        .begin()
        .expect("Could not begin a transaction");
    let mut first = batch.swap_remove(0);
    first.field = 5832;
    entries
        .save(&mut transaction, &mut first)
        .expect("Failed to update the first entry");
    let result = entries
        .filter(entries.column("field").eq(48826))
        .delete(&mut transaction)
        .expect("Failed to delete the entries");
    assert_eq!(result.affected_cnt, 2);
    assert_eq!(count(&mut transaction), 1);
    transaction
        .rollback()
        .expect("Failed to roll back the transaction");
    assert_eq!(count(connection), 3);
    let untouched = entries
        .filter(entries.column("field").eq(5832))
        .select::<Entry>()
        .fetch_all(connection)
        .expect("Failed to look for the updated entry");
    assert!(untouched.is_empty());

    // Dropped without commit
    {
        let mut transaction = connection
            .begin()
            .expect("Could not begin a transaction");
        let mut fourth = Tracked::new(Entry {
            name: "fourth entry".into(),
            field: 1,
            ..Default::default()
        });
        entries
            .insert(&mut transaction, &mut fourth)
            .expect("Failed to insert the fourth entry");
        assert_eq!(count(&mut transaction), 4);
    }
    assert_eq!(count(connection), 3);
}
