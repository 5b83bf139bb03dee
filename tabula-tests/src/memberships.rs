use crate::execute_sql;
use std::sync::{LazyLock, Mutex};
use tabula::{ColumnDef, Executor, Mapper, Record, Registry, Tracked};
use time::{Date, macros::date};

static MUTEX: Mutex<()> = Mutex::new(());

/// Keyed by the user and the group together.
#[derive(Record, Default, Debug, Clone, PartialEq)]
pub struct Membership {
    pub user: i64,
    pub group: String,
    pub role: String,
    pub since: Option<Date>,
}

static MEMBERSHIPS: LazyLock<Mapper> = LazyLock::new(|| {
    Mapper::builder("Memberships")
        .column(ColumnDef::new("user").db_column("user_id"))
        .column(ColumnDef::new("group").db_column("group_name"))
        .column(ColumnDef::new("role").default("member"))
        .column("since")
        .identifiers(["user", "group"])
        .table("memberships")
        .manages::<Membership>()
        .register(Registry::global())
        .expect("Failed to register the Memberships mapper")
});

pub(crate) fn register() {
    LazyLock::force(&MEMBERSHIPS);
}

fn membership(user: i64, group: &str) -> Tracked<Membership> {
    Tracked::new(Membership {
        user,
        group: group.into(),
        ..Default::default()
    })
}

pub fn memberships<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let memberships = &*MEMBERSHIPS;

    // Setup
    execute_sql(
        executor,
        &[
            "DROP TABLE IF EXISTS memberships",
            "CREATE TABLE memberships (user_id INTEGER NOT NULL, group_name VARCHAR(32) NOT NULL, role VARCHAR(16) NOT NULL, since TEXT, PRIMARY KEY (user_id, group_name))",
        ],
    );

    // Insert
    let mut owner = membership(1, "admins");
    owner.role = "owner".into();
    owner.since = Some(date!(2023-11-02));
    let result = memberships
        .insert(executor, &mut owner)
        .expect("Failed to insert the owner");
    assert_eq!(result.affected_cnt, 1);
    assert_eq!(result.last_id, None, "A composite key has no single last id");

    let mut reader = membership(1, "readers");
    let mut writer = membership(2, "readers");
    memberships
        .insert_many(executor, [&mut reader, &mut writer])
        .expect("Failed to insert the readers");
    assert_eq!(reader.role, "member");
    assert!(reader.is_clean() && writer.is_clean());

    let mut incomplete = membership(3, "");
    let error = memberships
        .insert(executor, &mut incomplete)
        .expect_err("Every identifier must be set");
    assert!(error.is_validation());

    // Update by the full key
    writer.role = "editor".into();
    let result = memberships
        .save(executor, &mut writer)
        .expect("Failed to update the writer");
    assert_eq!(result.affected_cnt, 1);
    let readers = memberships
        .filter(memberships.column("group").eq("readers"))
        .order_by([memberships.column("user").asc()])
        .select::<Membership>()
        .fetch_all(executor)
        .expect("Failed to load the readers");
    assert_eq!(
        readers.iter().map(|m| m.role.as_str()).collect::<Vec<_>>(),
        ["member", "editor"]
    );

    // Moving a row to another key updates the persisted one
    writer.group = "writers".into();
    let result = memberships
        .save(executor, &mut writer)
        .expect("Failed to move the writer");
    assert_eq!(result.affected_cnt, 1);
    let moved = memberships
        .filter(memberships.column("group").eq("writers"))
        .select::<Membership>()
        .fetch_all(executor)
        .expect("Failed to load the writers");
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].record(), writer.record());

    // Delete by the full key
    let result = memberships
        .delete_record(executor, &mut reader)
        .expect("Failed to delete the reader");
    assert_eq!(result.affected_cnt, 1);
    let left = memberships
        .filter(memberships.column("user").eq(1))
        .select::<Membership>()
        .fetch_all(executor)
        .expect("Failed to load the memberships of user 1");
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].record(), owner.record());
}
