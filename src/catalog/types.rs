use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

static COUNTER: AtomicU32 = AtomicU32::new(0);
static PROCESS_NONCE: OnceLock<[u8; 5]> = OnceLock::new();

/// 12-byte document identifier: 4 bytes unix seconds (big-endian),
/// 5 bytes per-process nonce, 3 bytes counter. Rendered as 24 hex chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ObjectId([u8; 12]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object id: {0:?}")]
pub struct IdParseError(pub String);

fn process_nonce() -> [u8; 5] {
    *PROCESS_NONCE.get_or_init(|| {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&std::process::id().to_le_bytes());
        hasher.update(
            &chrono::Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        let mut nonce = [0u8; 5];
        nonce.copy_from_slice(&hasher.finalize().as_bytes()[..5]);
        nonce
    })
}

impl ObjectId {
    /// Fresh id. Unique within the process; roughly time-ordered across processes.
    pub fn new() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&process_nonce());
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| IdParseError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.to_hex()
    }
}

impl TryFrom<String> for ObjectId {
    type Error = IdParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A data-structure category. `question_ids` is only changed through the
/// store's atomic push/pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: ObjectId,
    pub data_structure: String,
    #[serde(default)]
    pub question_ids: Vec<ObjectId>,
}

/// A practice problem. `topic_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: ObjectId,
    pub topic_id: ObjectId,
    pub question_name: String,
    pub url: String,
    pub level: String,
    #[serde(default)]
    pub data_structure: Option<String>,
}
