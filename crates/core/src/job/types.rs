//! Job key and record types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::JobStoreError;
use crate::pinning::PinnedFile;

/// Identity of a single rendering job.
///
/// The owner id is lower-cased on construction so keys built from
/// differently-cased wallet addresses compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub owner_id: String,
    pub collection_id: String,
    pub item_id: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

impl JobKey {
    pub fn new(
        owner_id: &str,
        collection_id: impl Into<String>,
        item_id: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            owner_id: owner_id.to_lowercase(),
            collection_id: collection_id.into(),
            item_id: item_id.into(),
            created_at,
        }
    }

    /// Build a key stamped with the current time.
    pub fn now(
        owner_id: &str,
        collection_id: impl Into<String>,
        item_id: impl Into<String>,
    ) -> Self {
        Self::new(
            owner_id,
            collection_id,
            item_id,
            Utc::now().timestamp_millis(),
        )
    }

    /// Build a key stamped with the current time, rejecting ids that would
    /// not survive the `owner:collection:item:ts` encoding.
    pub fn try_now(
        owner_id: &str,
        collection_id: &str,
        item_id: &str,
    ) -> Result<Self, JobStoreError> {
        for part in [owner_id, collection_id, item_id] {
            Self::validate_part(part)?;
        }
        Ok(Self::now(owner_id, collection_id, item_id))
    }

    /// Ids must be non-empty and free of the `:` separator.
    pub fn validate_part(part: &str) -> Result<(), JobStoreError> {
        if part.is_empty() || part.contains(':') {
            return Err(JobStoreError::InvalidKey(part.to_string()));
        }
        Ok(())
    }

    /// Key prefix shared by every job of one owner in one collection.
    pub fn prefix(owner_id: &str, collection_id: &str) -> String {
        format!("{}:{}:", owner_id.to_lowercase(), collection_id)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.owner_id, self.collection_id, self.item_id, self.created_at
        )
    }
}

impl FromStr for JobKey {
    type Err = JobStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [owner, collection, item, timestamp] = parts.as_slice() else {
            return Err(JobStoreError::InvalidKey(s.to_string()));
        };
        if owner.is_empty() || collection.is_empty() || item.is_empty() {
            return Err(JobStoreError::InvalidKey(s.to_string()));
        }
        let created_at = timestamp
            .parse::<i64>()
            .map_err(|_| JobStoreError::InvalidKey(s.to_string()))?;

        Ok(Self::new(owner, *collection, *item, created_at))
    }
}

/// Scheduling state of a job.
///
/// `Pending` means "assigned to a worker in this process". Records left
/// `Pending` by a previous process are put back to `Waiting` on startup
/// (see [`super::JobStore::requeue_pending`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Waiting,
    Pending,
    Canceled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Pending => "pending",
            JobState::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    #[serde(default)]
    pub state: JobState,
}

/// Persisted job record: `{ metadata: { state }, pinnings: { name: result } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default)]
    pub metadata: JobMetadata,
    #[serde(default)]
    pub pinnings: BTreeMap<String, PinnedFile>,
}

impl JobRecord {
    pub fn with_state(state: JobState) -> Self {
        Self {
            metadata: JobMetadata { state },
            pinnings: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> JobState {
        self.metadata.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_lowercases_owner() {
        let key = JobKey::new("0xABCdef", "col-1", "nft-7", 1_700_000_000_000);
        assert_eq!(key.to_string(), "0xabcdef:col-1:nft-7:1700000000000");
    }

    #[test]
    fn test_key_parse() {
        let key: JobKey = "0xabc:col-1:nft-7:42".parse().unwrap();
        assert_eq!(key.owner_id, "0xabc");
        assert_eq!(key.collection_id, "col-1");
        assert_eq!(key.item_id, "nft-7");
        assert_eq!(key.created_at, 42);
    }

    #[test]
    fn test_key_parse_rejects_malformed() {
        assert!("0xabc:col-1:nft-7".parse::<JobKey>().is_err());
        assert!("0xabc:col-1:nft-7:soon".parse::<JobKey>().is_err());
        assert!("0xabc::nft-7:42".parse::<JobKey>().is_err());
        assert!("a:b:c:d:1".parse::<JobKey>().is_err());
    }

    #[test]
    fn test_try_now_rejects_separator_and_empty_ids() {
        assert!(matches!(
            JobKey::try_now("evil:user", "col-1", "nft-1"),
            Err(JobStoreError::InvalidKey(_))
        ));
        assert!(JobKey::try_now("0xabc", "col:1", "nft-1").is_err());
        assert!(JobKey::try_now("0xabc", "col-1", "").is_err());

        let key = JobKey::try_now("0xABC", "col-1", "nft-1").unwrap();
        let parsed: JobKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_prefix_matches_key() {
        let key = JobKey::new("0xABC", "col-1", "nft-7", 42);
        assert!(key.to_string().starts_with(&JobKey::prefix("0xAbc", "col-1")));
    }

    #[test]
    fn test_record_json_shape() {
        let record = JobRecord::with_state(JobState::Pending);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["metadata"]["state"], "pending");
        assert!(json["pinnings"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_record_tolerates_missing_sections() {
        let record: JobRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.state(), JobState::Waiting);
        assert!(record.pinnings.is_empty());
    }
}
