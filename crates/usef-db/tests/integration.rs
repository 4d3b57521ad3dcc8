use usef_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn pooled_connections_share_an_on_disk_schema() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("usef.db");
    let pool = create_pool(
        path.to_str().expect("utf-8 path"),
        DbRuntimeSettings::default(),
    )
    .expect("failed to create pool");

    {
        let conn = pool.get().expect("failed to get connection");
        let applied = run_migrations(&conn).expect("failed to run migrations");
        assert_eq!(applied, 3);
    }

    // A second connection must see the tables created through the first.
    let first = pool.get().expect("first connection");
    let second = pool.get().expect("second connection");
    assert_eq!(run_migrations(&second).expect("rerun"), 0);

    let mut stmt = first
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    assert_eq!(
        tables,
        vec![
            "_usef_migrations".to_string(),
            "seen_message_hashes".to_string(),
            "seen_message_ids".to_string(),
        ]
    );
}
