//! Persistence operations for the replay tables.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode};
use sha2::{Digest, Sha256};

use crate::ReplayError;

/// SHA-256 digest of sealed message bytes.
pub type ContentHash = [u8; 32];

/// Hashes the decoded sealed bytes of a message.
pub fn content_hash(sealed: &[u8]) -> ContentHash {
    Sha256::digest(sealed).into()
}

/// Fixed-width UTC text, so lexical order in SQL is chronological order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Checks whether a message id has been recorded.
///
/// # Errors
///
/// Returns [`ReplayError::Database`] if the query fails.
pub fn message_id_exists(conn: &Connection, message_id: &str) -> Result<bool, ReplayError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM seen_message_ids WHERE message_id = ?1)",
        [message_id],
        |row| row.get(0),
    )?)
}

/// Records a message id.
///
/// # Errors
///
/// Returns [`ReplayError::MessageIdAlreadyUsed`] if the id was recorded
/// before, or [`ReplayError::Database`] for other database errors.
pub fn record_message_id(
    conn: &Connection,
    message_id: &str,
    received_at: DateTime<Utc>,
) -> Result<(), ReplayError> {
    conn.execute(
        "INSERT INTO seen_message_ids (message_id, received_at) VALUES (?1, ?2)",
        params![message_id, timestamp(received_at)],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            ReplayError::MessageIdAlreadyUsed(message_id.to_string())
        } else {
            ReplayError::Database(e)
        }
    })?;
    Ok(())
}

/// Checks whether a content hash has been recorded.
///
/// # Errors
///
/// Returns [`ReplayError::Database`] if the query fails.
pub fn content_hash_exists(conn: &Connection, hash: &ContentHash) -> Result<bool, ReplayError> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM seen_message_hashes WHERE content_hash = ?1)",
        [&hash[..]],
        |row| row.get(0),
    )?)
}

/// Records a content hash with its arrival time.
///
/// # Errors
///
/// Returns [`ReplayError::AlreadyReceivedAndProcessed`] if the hash was
/// recorded before, or [`ReplayError::Database`] for other database errors.
pub fn record_content_hash(
    conn: &Connection,
    hash: &ContentHash,
    received_at: DateTime<Utc>,
) -> Result<(), ReplayError> {
    conn.execute(
        "INSERT INTO seen_message_hashes (content_hash, received_at) VALUES (?1, ?2)",
        params![&hash[..], timestamp(received_at)],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            ReplayError::AlreadyReceivedAndProcessed(hex::encode(hash))
        } else {
            ReplayError::Database(e)
        }
    })?;
    Ok(())
}

/// Rows removed by [`purge_before`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    pub message_ids: usize,
    pub content_hashes: usize,
}

/// Deletes replay records that arrived before `cutoff`.
///
/// Once a record is purged, a message carrying that id or those bytes is no
/// longer recognized as a replay; callers pick a cutoff older than any
/// message could still be valid.
///
/// # Errors
///
/// Returns [`ReplayError::Database`] on SQL failure.
pub fn purge_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<PurgeCounts, ReplayError> {
    let cutoff = timestamp(cutoff);
    let tx = conn.unchecked_transaction()?;
    let message_ids = tx.execute(
        "DELETE FROM seen_message_ids WHERE received_at < ?1",
        [&cutoff],
    )?;
    let content_hashes = tx.execute(
        "DELETE FROM seen_message_hashes WHERE received_at < ?1",
        [&cutoff],
    )?;
    tx.commit()?;

    Ok(PurgeCounts {
        message_ids,
        content_hashes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        usef_db::run_migrations(&conn).expect("migrations");
        conn
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn message_id_lifecycle() {
        let conn = conn();
        assert!(!message_id_exists(&conn, "id-1").expect("check"));

        record_message_id(&conn, "id-1", at(10)).expect("first insert");
        assert!(message_id_exists(&conn, "id-1").expect("check"));

        let err = record_message_id(&conn, "id-1", at(11)).unwrap_err();
        assert!(matches!(err, ReplayError::MessageIdAlreadyUsed(ref id) if id == "id-1"));
        assert!(err.is_replay());

        record_message_id(&conn, "id-2", at(11)).expect("other id");
    }

    #[test]
    fn content_hash_lifecycle() {
        let conn = conn();
        let hash = content_hash(b"sealed bytes");
        assert!(!content_hash_exists(&conn, &hash).expect("check"));

        record_content_hash(&conn, &hash, at(10)).expect("first insert");
        assert!(content_hash_exists(&conn, &hash).expect("check"));

        let err = record_content_hash(&conn, &hash, at(10)).unwrap_err();
        assert!(
            matches!(err, ReplayError::AlreadyReceivedAndProcessed(ref h) if *h == hex::encode(hash))
        );
    }

    #[test]
    fn content_hash_is_sha256() {
        assert_eq!(
            hex::encode(content_hash(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn detectors_are_independent() {
        let conn = conn();
        record_message_id(&conn, "shared", at(9)).expect("id");
        let hash = content_hash(b"shared");
        record_content_hash(&conn, &hash, at(9)).expect("hash unaffected by id table");
    }

    #[test]
    fn purge_removes_only_older_records() {
        let conn = conn();
        record_message_id(&conn, "old", at(1)).expect("old id");
        record_message_id(&conn, "new", at(5)).expect("new id");
        record_content_hash(&conn, &content_hash(b"old"), at(1)).expect("old hash");
        record_content_hash(&conn, &content_hash(b"new"), at(5)).expect("new hash");

        let counts = purge_before(&conn, at(3)).expect("purge");
        assert_eq!(
            counts,
            PurgeCounts {
                message_ids: 1,
                content_hashes: 1
            }
        );

        assert!(!message_id_exists(&conn, "old").expect("check"));
        assert!(message_id_exists(&conn, "new").expect("check"));
        assert!(content_hash_exists(&conn, &content_hash(b"new")).expect("check"));

        // A purged id can be seen again.
        record_message_id(&conn, "old", at(6)).expect("reinsert after purge");
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let early = timestamp(at(9));
        let late = timestamp(at(9) + Duration::milliseconds(1));
        assert!(early < late);
        assert_eq!(early.len(), late.len());
    }
}
