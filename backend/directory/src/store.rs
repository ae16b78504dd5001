use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use staytime_core::{StayError, UserProfile};

use crate::document::{decode_profile, encode_profile, FIELD_WEEKLY};

/// A record that could not be read into a profile during a snapshot.
#[derive(Debug)]
pub struct RecordFailure {
    pub record_id: String,
    pub error: StayError,
}

/// One point-in-time read of every record in the directory.
///
/// Profiles are in directory order (ascending user ID), which is also the
/// tie-break order of the leaderboard.
#[derive(Debug)]
pub struct Snapshot {
    pub profiles: Vec<UserProfile>,
    pub failures: Vec<RecordFailure>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(profiles: Vec<UserProfile>, failures: Vec<RecordFailure>) -> Self {
        Self {
            profiles,
            failures,
            taken_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Abstract interface for the profile store.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch one profile; `None` when the user has no record yet.
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, StayError>;

    /// Write a full record, replacing whatever was stored.
    async fn put(&self, profile: &UserProfile) -> Result<(), StayError>;

    /// Read every record once. Undecodable records are reported, not fatal.
    async fn snapshot(&self) -> Result<Snapshot, StayError>;

    /// Take `announced` seconds off one user's weekly counter, flooring at zero.
    ///
    /// Time added after the announcing snapshot survives into the next week.
    /// Returns `false` if no record exists.
    async fn reset_weekly(&self, user_id: &str, announced: i64) -> Result<bool, StayError>;

    /// Add `seconds` to both counters in a single store-side operation.
    ///
    /// Returns `Ok(None)` when the backend cannot do this atomically; callers
    /// then fall back to get + put.
    async fn increment(
        &self,
        _user_id: &str,
        _user_name: Option<&str>,
        _seconds: i64,
    ) -> Result<Option<UserProfile>, StayError> {
        Ok(None)
    }
}

/// Directory kept in process memory as loosely typed JSON documents.
///
/// Iteration order is ascending record key. Writes for individual records
/// can be made to fail, which is how partial-failure handling is exercised.
pub struct InMemoryDirectory {
    documents: RwLock<BTreeMap<String, Value>>,
    failing: RwLock<HashSet<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Seed the directory with well-formed profiles.
    pub async fn with_profiles(profiles: impl IntoIterator<Item = UserProfile>) -> Self {
        let directory = Self::new();
        {
            let mut documents = directory.documents.write().await;
            for profile in profiles {
                documents.insert(profile.user_id.clone(), encode_profile(&profile));
            }
        }
        directory
    }

    /// Store a raw document under `record_id`, bypassing encoding.
    pub async fn insert_document(&self, record_id: impl Into<String>, doc: Value) {
        self.documents.write().await.insert(record_id.into(), doc);
    }

    /// Make every read and write touching `user_id` fail with `DirectoryIo`.
    pub async fn fail_user(&self, user_id: impl Into<String>) {
        self.failing.write().await.insert(user_id.into());
    }

    pub async fn heal_user(&self, user_id: &str) {
        self.failing.write().await.remove(user_id);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    async fn check(&self, op: &'static str, user_id: &str) -> Result<(), StayError> {
        if self.failing.read().await.contains(user_id) {
            return Err(StayError::directory(op, format!("injected failure for {user_id}")));
        }
        Ok(())
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>, StayError> {
        self.check("get", user_id).await?;
        let documents = self.documents.read().await;
        match documents.get(user_id) {
            Some(doc) => Ok(Some(decode_profile(user_id, doc)?.profile)),
            None => Ok(None),
        }
    }

    async fn put(&self, profile: &UserProfile) -> Result<(), StayError> {
        self.check("put", &profile.user_id).await?;
        self.documents
            .write()
            .await
            .insert(profile.user_id.clone(), encode_profile(profile));
        debug!(user = %profile.user_id, "Stored profile");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Snapshot, StayError> {
        let documents = self.documents.read().await;
        let mut profiles = Vec::with_capacity(documents.len());
        let mut failures = Vec::new();
        for (record_id, doc) in documents.iter() {
            match decode_profile(record_id, doc) {
                Ok(decoded) => profiles.push(decoded.profile),
                Err(error) => {
                    warn!(record = %record_id, error = %error, "Skipping undecodable record");
                    failures.push(RecordFailure {
                        record_id: record_id.clone(),
                        error,
                    });
                }
            }
        }
        Ok(Snapshot::new(profiles, failures))
    }

    async fn reset_weekly(&self, user_id: &str, announced: i64) -> Result<bool, StayError> {
        self.check("reset", user_id).await?;
        let mut documents = self.documents.write().await;
        match documents.get_mut(user_id) {
            Some(Value::Object(map)) => {
                let current = map.get(FIELD_WEEKLY).and_then(Value::as_i64).unwrap_or(0);
                let remaining = (current - announced.max(0)).max(0);
                map.insert(FIELD_WEEKLY.to_string(), Value::from(remaining));
                Ok(true)
            }
            Some(_) => Err(StayError::MalformedRecord {
                user_id: user_id.to_string(),
                message: "cannot reset a non-object record".into(),
            }),
            None => Ok(false),
        }
    }
}
