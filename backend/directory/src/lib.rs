//! The directory: persistent per-user staying-time profiles.
//!
//! [`Directory`] is the store interface the tracker talks to.
//! [`InMemoryDirectory`] keeps JSON documents in process memory;
//! [`SqliteDirectory`] persists them with server-side increments.

pub mod document;
pub mod sqlite_store;
pub mod store;

pub use document::{decode_profile, encode_profile, DecodedProfile};
pub use sqlite_store::SqliteDirectory;
pub use store::{Directory, InMemoryDirectory, RecordFailure, Snapshot};
