//! Persistence adapter: durable per-user snapshots of each domain
//!
//! One snapshot per (user, domain), addressed as `projects:{user}`,
//! `plan:{user}` and `usage:{user}`. Values are JSON documents.

pub mod memory;
pub mod sqlite;

pub use memory::MemorySnapshotStore;
pub use sqlite::SqliteSnapshotStore;

use crate::error::CoreError;
use crate::session::UserId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// State domain persisted as an independent snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Projects,
    Plan,
    Usage,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Projects, Domain::Plan, Domain::Usage];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Projects => "projects",
            Domain::Plan => "plan",
            Domain::Usage => "usage",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub user: UserId,
    pub domain: Domain,
}

impl SnapshotKey {
    pub fn new(user: &UserId, domain: Domain) -> Self {
        Self {
            user: user.clone(),
            domain,
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.user)
    }
}

/// Serialized value ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub key: SnapshotKey,
    pub value: String,
}

impl Snapshot {
    /// Serialize `value` as JSON for `key`
    pub fn encode<T: Serialize>(key: SnapshotKey, value: &T) -> Result<Self, CoreError> {
        let value = serde_json::to_string(value).map_err(|source| CoreError::SnapshotEncode {
            key: key.to_string(),
            source,
        })?;
        Ok(Self { key, value })
    }
}

/// Deserialize a stored snapshot
pub fn decode<T: DeserializeOwned>(key: &SnapshotKey, raw: &str) -> Result<T, CoreError> {
    serde_json::from_str(raw).map_err(|source| CoreError::SnapshotDecode {
        key: key.to_string(),
        message: source.to_string(),
        source,
    })
}

/// Durable key-value store for domain snapshots
///
/// Writes are synchronous. `save_batch` must be atomic: either every entry
/// lands or none does.
pub trait SnapshotStore: Send + Sync {
    /// Last saved value, or `None` if the snapshot was never written
    fn load(&self, key: &SnapshotKey) -> Result<Option<String>, CoreError>;

    /// Write several snapshots in one atomic step
    fn save_batch(&self, snapshots: &[Snapshot]) -> Result<(), CoreError>;

    /// Write a single snapshot
    fn save(&self, snapshot: Snapshot) -> Result<(), CoreError> {
        self.save_batch(std::slice::from_ref(&snapshot))
    }

    /// Delete every snapshot belonging to `user`; returns how many were removed
    fn remove_user(&self, user: &UserId) -> Result<usize, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Plan;

    #[test]
    fn test_key_layout() {
        let user = UserId::from("u-42");
        assert_eq!(SnapshotKey::new(&user, Domain::Projects).to_string(), "projects:u-42");
        assert_eq!(SnapshotKey::new(&user, Domain::Plan).to_string(), "plan:u-42");
        assert_eq!(SnapshotKey::new(&user, Domain::Usage).to_string(), "usage:u-42");
    }

    #[test]
    fn test_encode_decode() {
        let key = SnapshotKey::new(&UserId::from("a"), Domain::Plan);
        let snapshot = Snapshot::encode(key.clone(), &Plan::Pro).unwrap();
        assert_eq!(snapshot.value, "\"pro\"");

        let plan: Plan = decode(&key, &snapshot.value).unwrap();
        assert_eq!(plan, Plan::Pro);
    }

    #[test]
    fn test_decode_malformed() {
        let key = SnapshotKey::new(&UserId::from("a"), Domain::Usage);
        let err = decode::<Plan>(&key, "{not json").unwrap_err();
        assert!(matches!(err, CoreError::SnapshotDecode { key, .. } if key == "usage:a"));
    }
}
