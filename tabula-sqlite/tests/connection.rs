#[cfg(test)]
mod tests {
    use std::{
        env, fs,
        sync::{Mutex, mpsc},
        thread,
        time::Duration,
    };
    use tabula_core::{Connection, Executor, Statement};
    use tabula_sqlite::SqliteConnection;
    use tabula_tests::{init_logs, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn create_database() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let path = env::temp_dir().join("tabula_creation.sqlite");
        if path.exists() {
            fs::remove_file(&path)
                .unwrap_or_else(|e| panic!("Failed to remove {}: {e}", path.display()));
        }
        let url = |mode: &str| format!("sqlite://{}?mode={mode}", path.display());
        {
            let mut connection =
                SqliteConnection::connect(&url("rwc")).expect("Could not open the database");
            connection
                .execute(&Statement::new("CREATE TABLE things (id INTEGER PRIMARY KEY)"))
                .expect("Could not create a table");
        }
        assert!(path.exists(), "Database file should be created after connection");
        {
            let mut connection = SqliteConnection::connect(&url("ro"))
                .expect("Could not open the database read only");
            silent_logs! {
                assert!(
                    connection
                        .execute(&Statement::new("INSERT INTO things (id) VALUES (1)"))
                        .is_err(),
                    "A read only database refuses writes"
                );
            }
        }
        fs::remove_file(&path).expect("Failed to remove the test database");
        silent_logs! {
            assert!(
                SqliteConnection::connect(&url("ro")).is_err(),
                "Should not be able to open in read only unexisting database"
            );
        }
    }

    #[test]
    fn locked_database_fails_immediately() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let path = env::temp_dir().join("tabula_locked.sqlite");
        if path.exists() {
            fs::remove_file(&path)
                .unwrap_or_else(|e| panic!("Failed to remove {}: {e}", path.display()));
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let mut holder = SqliteConnection::connect(&url).expect("Could not open the database");
        holder
            .execute(&Statement::new("CREATE TABLE things (id INTEGER PRIMARY KEY)"))
            .expect("Could not create a table");
        holder
            .execute(&Statement::new("BEGIN IMMEDIATE"))
            .expect("Could not begin the transaction");
        holder
            .execute(&Statement::new("INSERT INTO things (id) VALUES (1)"))
            .expect("Could not insert inside the transaction");

        let mut writer = SqliteConnection::connect(&url).expect("Could not open the database");
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut result = None;
            silent_logs! {
                result = Some(writer.execute(&Statement::new("INSERT INTO things (id) VALUES (2)")));
            }
            if let Some(result) = result {
                let _ = sender.send(result.map(|_| ()).map_err(|e| format!("{e:#}")));
            }
        });
        let result = receiver
            .recv_timeout(Duration::from_secs(5))
            .expect("The second writer should return instead of waiting for the lock");
        let error = result.expect_err("The second writer should fail while the lock is held");
        assert!(error.contains("locked"), "Unexpected error: {error}");

        holder
            .execute(&Statement::new("ROLLBACK"))
            .expect("Could not roll back");
        drop(holder);
        fs::remove_file(&path).expect("Failed to remove the test database");
    }

    #[test]
    fn wrong_url() {
        silent_logs! {
            assert!(SqliteConnection::connect("duckdb://some_value").is_err());
            assert!(SqliteConnection::connect("not a url").is_err());
        }
    }

    #[test]
    fn statements_one_at_a_time() {
        let mut connection =
            SqliteConnection::connect("sqlite::memory:").expect("Could not open the database");
        silent_logs! {
            assert!(
                connection
                    .execute(&Statement::new("SELECT 1; SELECT 2"))
                    .is_err()
            );
        }
        let rows = connection
            .fetch(&Statement::new("SELECT 1 AS one, 'two' AS two, NULL AS three"))
            .expect("Could not run the query")
            .collect::<Result<Vec<_>, _>>()
            .expect("Could not read the rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].names(), ["one", "two", "three"]);
        assert_eq!(
            rows[0].get_column("two"),
            Some(&tabula_core::Value::Varchar(Some("two".into())))
        );
        assert!(rows[0].get_column("three").is_some_and(|v| v.is_null()));
    }
}
