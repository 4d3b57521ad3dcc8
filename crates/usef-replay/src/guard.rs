//! Transactional check-then-record over a pooled connection.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use usef_db::DbPool;

use crate::store::{self, ContentHash};
use crate::ReplayError;

/// Runs replay checks inside one write transaction.
#[derive(Clone)]
pub struct ReplayGuard {
    pool: DbPool,
}

impl ReplayGuard {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Runs `f` inside an immediate (write-locked) transaction and commits
    /// only if `f` succeeds.
    ///
    /// Records made through the [`ReplayScope`] are rolled back when `f`
    /// fails, so a rejected delivery leaves nothing behind. A concurrent
    /// caller waits on the database lock (bounded by the pool's busy
    /// timeout) and then sees the committed records.
    ///
    /// # Errors
    ///
    /// Returns `f`'s error, or a [`ReplayError`] converted into `E` if the
    /// transaction cannot be opened or committed.
    pub fn within_transaction<T, E, F>(&self, received_at: DateTime<Utc>, f: F) -> Result<T, E>
    where
        E: From<ReplayError>,
        F: FnOnce(&ReplayScope<'_>) -> Result<T, E>,
    {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| ReplayError::Pool(e.to_string()))?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(ReplayError::Database)?;

        let value = f(&ReplayScope {
            conn: &tx,
            received_at,
        })?;

        tx.commit().map_err(ReplayError::Database)?;
        Ok(value)
    }
}

/// Handle passed to [`ReplayGuard::within_transaction`] callbacks.
pub struct ReplayScope<'a> {
    conn: &'a Connection,
    received_at: DateTime<Utc>,
}

impl ReplayScope<'_> {
    /// Records the message id, failing with
    /// [`ReplayError::MessageIdAlreadyUsed`] if it was seen before.
    pub fn record_message_id(&self, message_id: &str) -> Result<(), ReplayError> {
        store::record_message_id(self.conn, message_id, self.received_at)
    }

    /// Records the hash of `sealed`, failing with
    /// [`ReplayError::AlreadyReceivedAndProcessed`] if the same bytes were
    /// seen before.
    pub fn record_content_hash(&self, sealed: &[u8]) -> Result<ContentHash, ReplayError> {
        let hash = store::content_hash(sealed);
        store::record_content_hash(self.conn, &hash, self.received_at)?;
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usef_db::{create_pool, run_migrations, DbRuntimeSettings};

    fn guard(dir: &tempfile::TempDir) -> ReplayGuard {
        let path = dir.path().join("replay.db");
        let pool = create_pool(path.to_str().expect("utf-8"), DbRuntimeSettings::default())
            .expect("pool");
        run_migrations(&pool.get().expect("conn")).expect("migrations");
        ReplayGuard::new(pool)
    }

    #[test]
    fn commits_on_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let guard = guard(&dir);

        guard
            .within_transaction(Utc::now(), |scope| {
                scope.record_message_id("m-1")?;
                scope.record_content_hash(b"bytes")?;
                Ok::<_, ReplayError>(())
            })
            .expect("first delivery");

        let conn = guard.pool.get().expect("conn");
        assert!(store::message_id_exists(&conn, "m-1").expect("check"));
        assert!(store::content_hash_exists(&conn, &store::content_hash(b"bytes")).expect("check"));
    }

    #[test]
    fn rolls_back_on_failure() {
        #[derive(Debug)]
        enum Outcome {
            Replay(ReplayError),
            Rejected,
        }
        impl From<ReplayError> for Outcome {
            fn from(e: ReplayError) -> Self {
                Self::Replay(e)
            }
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let guard = guard(&dir);

        let result: Result<(), Outcome> = guard.within_transaction(Utc::now(), |scope| {
            scope.record_message_id("m-2")?;
            scope.record_content_hash(b"other bytes")?;
            Err(Outcome::Rejected)
        });
        assert!(matches!(result, Err(Outcome::Rejected)));

        let conn = guard.pool.get().expect("conn");
        assert!(!store::message_id_exists(&conn, "m-2").expect("check"));
        assert!(
            !store::content_hash_exists(&conn, &store::content_hash(b"other bytes"))
                .expect("check")
        );
    }

    #[test]
    fn second_identical_delivery_is_replay() {
        let dir = tempfile::tempdir().expect("tempdir");
        let guard = guard(&dir);
        let deliver = || {
            guard.within_transaction(Utc::now(), |scope| {
                scope.record_message_id("m-3")?;
                scope.record_content_hash(b"same")?;
                Ok::<_, ReplayError>(())
            })
        };

        deliver().expect("first");
        assert!(matches!(
            deliver(),
            Err(ReplayError::MessageIdAlreadyUsed(_))
        ));
    }
}
