use crate::execute_sql;
use rust_decimal::Decimal;
use std::{
    str::FromStr,
    sync::{LazyLock, Mutex},
};
use tabula::{ColumnDef, Executor, Mapper, Record, Registry, Tracked, Value};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time,
    macros::{date, datetime, time},
};
use uuid::Uuid;

static MUTEX: Mutex<()> = Mutex::new(());

#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: Uuid,
    pub label: String,
    pub amount: Decimal,
    pub ratio: f64,
    pub quantity: u16,
    pub flag: bool,
    pub day: Option<Date>,
    pub at: Option<Time>,
    pub created: Option<PrimitiveDateTime>,
    pub updated: Option<OffsetDateTime>,
    pub payload: Vec<u8>,
    pub note: Option<String>,
}

/// Record whose table allows NULL where the record does not.
#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct Tally {
    pub id: i64,
    pub count: i64,
    pub note: Option<String>,
}

static SAMPLES: LazyLock<Mapper> = LazyLock::new(|| {
    Mapper::builder("Samples")
        .column("id")
        .column(ColumnDef::new("label").default("unnamed"))
        .column("amount")
        .column("ratio")
        .column("quantity")
        .column("flag")
        .column("day")
        .column("at")
        .column("created")
        .column("updated")
        .column("payload")
        .column("note")
        .identifiers(["id"])
        .table("samples")
        .manages::<Sample>()
        .register(Registry::global())
        .expect("Failed to register the Samples mapper")
});

static TALLIES: LazyLock<Mapper> = LazyLock::new(|| {
    Mapper::builder("Tallies")
        .column("id")
        .column("count")
        .column("note")
        .identifiers(["id"])
        .table("tallies")
        .manages::<Tally>()
        .register(Registry::global())
        .expect("Failed to register the Tallies mapper")
});

pub(crate) fn register() {
    LazyLock::force(&SAMPLES);
    LazyLock::force(&TALLIES);
}

fn load<E: Executor>(executor: &mut E, id: Uuid) -> Tracked<Sample> {
    let mut loaded = SAMPLES
        .filter(SAMPLES.column("id").eq(id))
        .select::<Sample>()
        .fetch_all(executor)
        .expect("Failed to load a sample");
    assert_eq!(loaded.len(), 1, "Expected exactly one sample with id {id}");
    loaded.pop().expect("One sample")
}

pub fn samples<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let samples = &*SAMPLES;

    // Setup
    execute_sql(
        executor,
        &[
            "DROP TABLE IF EXISTS samples",
            // Decimals are stored as text to keep every digit
            "CREATE TABLE samples (id VARCHAR(36) PRIMARY KEY, label VARCHAR(32) NOT NULL, amount TEXT NOT NULL DEFAULT '0', ratio REAL NOT NULL DEFAULT 0, quantity INTEGER NOT NULL DEFAULT 0, flag BOOLEAN NOT NULL DEFAULT 0, day TEXT, at TEXT, created TEXT, updated TEXT, payload BLOB NOT NULL DEFAULT x'', note VARCHAR(256))",
        ],
    );

    // The identifier is not generated
    let mut first = Tracked::new(Sample {
        amount: Decimal::from_str("12.5").expect("Valid decimal"),
        ratio: 0.25,
        quantity: 3,
        flag: true,
        day: Some(date!(2024-01-05)),
        at: Some(time!(09:05:30.5)),
        created: Some(datetime!(2024-01-05 09:05)),
        updated: Some(datetime!(2024-03-01 01:30 +02:00)),
        payload: vec![0, 1, 2, 0xff],
        ..Default::default()
    });
    let error = samples
        .insert(executor, &mut first)
        .expect_err("Inserting without identifier must fail");
    assert!(error.is_validation());
    assert!(!first.is_persisted());
    assert!(!first.is_clean());

    first.id = Uuid::from_str("f938f818-0a40-4ce3-8fbc-259ac252a1b5").expect("Valid uuid");
    let result = samples
        .insert(executor, &mut first)
        .expect("Failed to insert the first sample");
    assert_eq!(result.affected_cnt, 1);
    assert_eq!(result.last_id, Some(Value::Uuid(Some(first.id))));
    assert_eq!(first.label, "unnamed", "The column default is assigned back");
    assert!(first.is_clean());

    // Values come back unchanged
    let loaded = load(executor, first.id);
    assert_eq!(loaded.record(), first.record());
    assert!(loaded.is_clean());
    assert_eq!(loaded.note, None);

    // A failed insert keeps the record as it was
    let mut duplicate = Tracked::new(Sample {
        id: first.id,
        label: "duplicate".into(),
        ..Default::default()
    });
    crate::silent_logs! {
        let error = samples.insert(executor, &mut duplicate).unwrap_err();
        assert!(error.is_database());
    }
    assert!(!duplicate.is_persisted());
    assert_eq!(duplicate.compute_dirty().len(), 2);

    let mut second = Tracked::new(Sample {
        id: Uuid::from_str("a73bc06a-ff89-44b9-a62f-416ebe976285").expect("Valid uuid"),
        label: "second".into(),
        amount: Decimal::from(-40),
        quantity: 7,
        note: Some("fragile".into()),
        ..Default::default()
    });
    samples
        .save(executor, &mut second)
        .expect("Failed to insert the second sample");
    assert!(second.is_persisted());

    // Decimals keep digits a double cannot hold
    let precise = Decimal::from_str("1234567890.123456789").expect("Valid decimal");
    let mut loaded = load(executor, second.id);
    loaded.amount = precise;
    samples
        .save(executor, &mut loaded)
        .expect("Failed to update the amount");
    assert_eq!(load(executor, second.id).amount, precise);
    let rows = samples
        .filter(samples.column("amount").eq(precise))
        .select::<Sample>()
        .fetch_all(executor)
        .expect("Failed to filter on a decimal");
    assert_eq!(rows.len(), 1);

    // Update, including a value set back to NULL
    let mut loaded = load(executor, second.id);
    loaded.note = None;
    loaded.ratio = 1.75;
    loaded.updated = Some(datetime!(2025-06-30 23:59:59 UTC));
    loaded.payload = b"checksum".to_vec();
    let result = samples
        .save(executor, &mut loaded)
        .expect("Failed to update the second sample");
    assert_eq!(result.affected_cnt, 1);
    assert_eq!(load(executor, second.id).record(), loaded.record());

    // Filters
    let ids = |rows: Vec<Tracked<Sample>>| rows.iter().map(|s| s.id).collect::<Vec<_>>();
    let rows = samples
        .filter(samples.column("note").eq(Option::<String>::None))
        .order_by([samples.column("quantity").asc()])
        .select::<Sample>()
        .fetch_all(executor)
        .expect("Failed to filter on NULL");
    assert_eq!(ids(rows), [first.id, second.id]);
    let rows = samples
        .filter(samples.column("quantity").is_in([1u16, 7, 9]))
        .select::<Sample>()
        .fetch_all(executor)
        .expect("Failed to filter with IN");
    assert_eq!(ids(rows), [second.id]);
    let rows = samples
        .filter(
            samples.column("quantity").between(1, 5)
                | samples.column("label").like("sec%"),
        )
        .order_by([samples.column("label").desc()])
        .select::<Sample>()
        .fetch_all(executor)
        .expect("Failed to filter with BETWEEN and LIKE");
    assert_eq!(ids(rows), [first.id, second.id]);
    let rows = samples
        .filter(samples.column("flag").eq(true) & samples.column("quantity").gt(5))
        .select::<Sample>()
        .fetch_all(executor)
        .expect("Failed to filter with AND");
    assert!(rows.is_empty());

    // Delete by identifier
    let result = samples
        .delete_record(executor, &mut first)
        .expect("Failed to delete the first sample");
    assert_eq!(result.affected_cnt, 1);
    assert!(!first.is_persisted());
    let remaining = samples
        .select::<Sample>()
        .fetch_all(executor)
        .expect("Failed to load the samples");
    assert_eq!(ids(remaining), [second.id]);
}

pub fn tallies<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let tallies = &*TALLIES;

    // Setup
    execute_sql(
        executor,
        &[
            "DROP TABLE IF EXISTS tallies",
            "CREATE TABLE tallies (id INTEGER PRIMARY KEY, count INTEGER, note VARCHAR(32))",
            "INSERT INTO tallies (id, count, note) VALUES (1, NULL, 'missing'), (2, 0, 'zero')",
        ],
    );
    let by_id = |id: i64| {
        tallies
            .filter(tallies.column("id").eq(id))
            .select::<Tally>()
    };

    // A NULL cannot be read into a field that is not optional
    crate::silent_logs! {
        let error = by_id(1).fetch_all(executor).unwrap_err();
        assert!(error.is_database(), "Unexpected error: {error:#}");
    }

    // The zero value is an ordinary value when the column holds it
    let mut loaded = by_id(2).fetch_all(executor).expect("Failed to load a tally");
    let mut zero = loaded.pop().expect("One tally");
    assert_eq!(zero.count, 0);
    assert!(zero.is_clean());
    zero.count = 0;
    assert!(zero.compute_dirty().is_empty());
    zero.count = 5;
    let result = tallies
        .save(executor, &mut zero)
        .expect("Failed to update a tally");
    assert_eq!(result.affected_cnt, 1);

    // Once written the row reads back
    execute_sql(executor, &["UPDATE tallies SET count = 0 WHERE id = 1"]);
    let loaded = by_id(1).fetch_all(executor).expect("Failed to load a tally");
    assert_eq!(loaded[0].count, 0);
    assert_eq!(loaded[0].note.as_deref(), Some("missing"));
}
