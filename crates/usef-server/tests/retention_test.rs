use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::sleep;
use usef_db::{create_pool, run_migrations, DbRuntimeSettings};
use usef_replay::{
    content_hash, content_hash_exists, message_id_exists, record_content_hash, record_message_id,
};
use usef_server::retention::{purge_expired, start_retention_task};

fn pool(dir: &tempfile::TempDir) -> usef_db::DbPool {
    let path = dir.path().join("retention.db");
    let pool = create_pool(path.to_str().expect("utf-8"), DbRuntimeSettings::default())
        .expect("failed to create pool");
    run_migrations(&pool.get().expect("conn")).expect("failed to run migrations");
    pool
}

#[test]
fn purge_keeps_records_inside_the_window() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = pool(&dir);
    {
        let conn = pool.get().expect("conn");
        record_message_id(&conn, "old", Utc::now() - ChronoDuration::days(40)).expect("old");
        record_message_id(&conn, "recent", Utc::now() - ChronoDuration::days(2)).expect("recent");
    }

    let counts = purge_expired(&pool, 30).expect("purge");
    assert_eq!(counts.message_ids, 1);
    assert_eq!(counts.content_hashes, 0);

    let conn = pool.get().expect("conn");
    assert!(!message_id_exists(&conn, "old").expect("check"));
    assert!(message_id_exists(&conn, "recent").expect("check"));
}

#[tokio::test]
async fn test_retention_task_purges_old_replay_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = pool(&dir);
    let hash = content_hash(b"sealed long ago");
    {
        let conn = pool.get().expect("failed to get connection");
        let long_ago = Utc::now() - ChronoDuration::days(90);
        record_message_id(&conn, "msg-ancient", long_ago).expect("record id");
        record_content_hash(&conn, &hash, long_ago).expect("record hash");
    }

    // Interval 1 second
    let pool_clone = pool.clone();
    tokio::spawn(async move {
        start_retention_task(pool_clone, 30, 1).await;
    });

    sleep(Duration::from_millis(1500)).await;

    let conn = pool.get().expect("failed to get connection");
    assert!(!message_id_exists(&conn, "msg-ancient").expect("check"));
    assert!(!content_hash_exists(&conn, &hash).expect("check"));
}
