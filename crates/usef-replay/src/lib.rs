//! Replay protection for inbound signed messages.
//!
//! Two independent detectors back exactly-once delivery:
//!
//! 1. **Message id**: a logical resend reuses its id, whatever the bytes.
//! 2. **Content hash**: SHA-256 over the decoded sealed bytes catches a
//!    byte-identical retransmission even if no id was ever parsed.
//!
//! Each detector is an insert into a table with a unique column. A duplicate
//! is recognized by the constraint violation, never by a read followed by a
//! write, so two concurrent deliveries of the same message cannot both pass.
//! [`ReplayGuard::within_transaction`] runs both inserts in one transaction
//! that is only committed when the caller's whole check succeeds.

mod error;
mod guard;
mod store;

pub use error::ReplayError;
pub use guard::{ReplayGuard, ReplayScope};
pub use store::{
    content_hash, content_hash_exists, message_id_exists, purge_before, record_content_hash,
    record_message_id, ContentHash, PurgeCounts,
};
