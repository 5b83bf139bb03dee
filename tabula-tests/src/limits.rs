use crate::execute_sql;
use std::sync::{LazyLock, Mutex};
use tabula::{Executor, Mapper, Record, Registry, Tracked};

#[derive(Record, Default, Debug, Clone, PartialEq)]
struct Limits {
    id: i32,
    boolean: bool,
    int8: i8,
    uint8: u8,
    int16: i16,
    uint16: u16,
    int32: i32,
    uint32: u32,
    int64: i64,
    uint64: u64,
    float32: f32,
    float64: f64,
}

static LIMITS: LazyLock<Mapper> = LazyLock::new(|| {
    Limits::field_names()
        .iter()
        .fold(Mapper::builder("Limits"), |builder, &name| {
            builder.column(name)
        })
        .identifiers(["id"])
        .table("limits")
        .manages::<Limits>()
        .register(Registry::global())
        .expect("Failed to register the Limits mapper")
});

pub(crate) fn register() {
    LazyLock::force(&LIMITS);
}

pub fn limits<E: Executor>(executor: &mut E) {
    static MUTEX: Mutex<()> = Mutex::new(());
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let limits = &*LIMITS;

    // Setup
    execute_sql(
        executor,
        &[
            "DROP TABLE IF EXISTS limits",
            // Fields left at zero are not written, the table supplies them
            "CREATE TABLE limits (id INTEGER PRIMARY KEY, boolean BOOLEAN NOT NULL DEFAULT 0, int8 INTEGER NOT NULL DEFAULT 0, uint8 INTEGER NOT NULL DEFAULT 0, int16 INTEGER NOT NULL DEFAULT 0, uint16 INTEGER NOT NULL DEFAULT 0, int32 INTEGER NOT NULL DEFAULT 0, uint32 INTEGER NOT NULL DEFAULT 0, int64 INTEGER NOT NULL DEFAULT 0, uint64 INTEGER NOT NULL DEFAULT 0, float32 REAL NOT NULL DEFAULT 0, float64 REAL NOT NULL DEFAULT 0)",
        ],
    );

    // Minimals
    let mut minimals = Tracked::new(Limits {
        id: 1,
        boolean: false,
        int8: i8::MIN,
        uint8: 0,
        int16: i16::MIN,
        uint16: 0,
        int32: i32::MIN,
        uint32: 0,
        int64: i64::MIN,
        uint64: 0,
        float32: f32::MIN_POSITIVE,
        float64: f64::MIN,
    });
    limits
        .insert(executor, &mut minimals)
        .expect("Failed to insert the minimal values");

    // Maximals
    let mut maximals = Tracked::new(Limits {
        id: 2,
        boolean: true,
        int8: i8::MAX,
        uint8: u8::MAX,
        int16: i16::MAX,
        uint16: u16::MAX,
        int32: i32::MAX,
        uint32: u32::MAX,
        int64: i64::MAX,
        uint64: i64::MAX as u64,
        float32: f32::MAX,
        float64: f64::MAX,
    });
    limits
        .insert(executor, &mut maximals)
        .expect("Failed to insert the maximal values");

    let loaded = limits
        .order_by([limits.column("id").asc()])
        .select::<Limits>()
        .fetch_all(executor)
        .expect("Failed to load the limits");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].record(), minimals.record());
    assert_eq!(loaded[1].record(), maximals.record());
    assert!(loaded.iter().all(Tracked::is_clean));

    // Out of range for the database
    let mut beyond = Tracked::new(Limits {
        id: 3,
        uint64: u64::MAX,
        ..Default::default()
    });
    crate::silent_logs! {
        assert!(limits.insert(executor, &mut beyond).is_err());
    }
    assert!(!beyond.is_persisted());
}
