//! The persistence contract for decoded VAAs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::vaa::Vaa;

/// Insert-or-update store for VAAs.
///
/// Implementations include `InMemoryRepository`, `MongoRepository`
/// and `SqliteRepository` in `vaaloader-storage`.
///
/// Writes are keyed on [`Vaa::message_id`]: upserting the same
/// `(vaa, raw)` pair any number of times leaves exactly one record and never
/// returns an error for the repeat.
#[async_trait]
pub trait VaaRepository: Send + Sync {
    /// Upsert a decoded VAA together with the bytes it was decoded from.
    async fn upsert(&self, vaa: &Vaa, raw: &[u8]) -> Result<(), StorageError>;

    /// Short backend name for logs (e.g. `"mongodb"`).
    fn backend(&self) -> &'static str;
}

/// The record every backend persists for one VAA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaaDocument {
    /// Upsert key, see [`Vaa::message_id`].
    #[serde(rename = "_id")]
    pub id: String,
    pub version: u8,
    pub emitter_chain: u16,
    pub emitter_addr: String,
    /// Decimal string; sequences overflow signed 64-bit document fields.
    pub sequence: String,
    pub guardian_set_index: u32,
    pub timestamp: DateTime<Utc>,
    /// Hex signing digest, no `0x` prefix.
    pub digest: String,
    /// The raw VAA bytes.
    pub vaas: Vec<u8>,
}

impl VaaDocument {
    pub fn from_vaa(vaa: &Vaa, raw: &[u8]) -> Self {
        Self {
            id: vaa.message_id(),
            version: vaa.version,
            emitter_chain: vaa.emitter_chain,
            emitter_addr: vaa.emitter_address_hex(),
            sequence: vaa.sequence.to_string(),
            guardian_set_index: vaa.guardian_set_index,
            timestamp: DateTime::<Utc>::from_timestamp(i64::from(vaa.timestamp), 0).unwrap_or_default(),
            digest: hex::encode(vaa.signing_digest()),
            vaas: raw.to_vec(),
        }
    }
}
