//! MongoDB storage backend.
//!
//! Persists one document per VAA in the `vaas` collection, keyed by the VAA
//! message id (`_id = "{chain}/{emitter}/{sequence}"`).
//!
//! # Feature Flag
//! Requires the `mongodb` feature:
//! ```toml
//! vaaloader-storage = { version = "0.1", features = ["mongodb"] }
//! ```
//!
//! # Usage
//! ```rust,no_run
//! use vaaloader_storage::mongo::MongoRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = MongoRepository::connect("mongodb://localhost:27017/", "wormhole").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use mongodb::bson::{doc, spec::BinarySubtype, Binary, DateTime, Document};
use mongodb::options::{ClientOptions, UpdateOptions};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use vaaloader_core::error::StorageError;
use vaaloader_core::repository::{VaaDocument, VaaRepository};
use vaaloader_core::vaa::Vaa;

/// Collection every VAA is upserted into.
pub const VAAS_COLLECTION: &str = "vaas";

/// Connect to MongoDB and return a handle to `database_name`.
///
/// Pings the server so an unreachable database fails here, before any
/// worker starts, rather than on the first upsert.
pub async fn get_database_handle(uri: &str, database_name: &str) -> Result<Database, StorageError> {
    let mut options = ClientOptions::parse(uri)
        .await
        .map_err(|e| StorageError::Connection(format!("invalid mongodb uri: {e}")))?;
    options.app_name = Some("vaaloader".to_string());

    let client = Client::with_options(options)
        .map_err(|e| StorageError::Connection(format!("mongodb client: {e}")))?;

    client
        .database("admin")
        .run_command(doc! { "ping": 1 }, None)
        .await
        .map_err(|e| StorageError::Connection(format!("mongodb ping: {e}")))?;

    info!(database = database_name, "MongoDB connected");
    Ok(client.database(database_name))
}

/// MongoDB-backed VAA repository.
///
/// Cheaply cloneable; the driver pools connections internally, so a single
/// instance is shared by every worker.
#[derive(Clone)]
pub struct MongoRepository {
    vaas: Collection<Document>,
}

impl MongoRepository {
    /// Connect and bind to the `vaas` collection of `database_name`.
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self, StorageError> {
        let db = get_database_handle(uri, database_name).await?;
        Ok(Self::new(&db))
    }

    pub fn new(db: &Database) -> Self {
        Self {
            vaas: db.collection(VAAS_COLLECTION),
        }
    }
}

/// Build the `$set` / `$setOnInsert` update for one document.
fn update_for(document: VaaDocument, now: DateTime) -> Document {
    let VaaDocument {
        id: _,
        version,
        emitter_chain,
        emitter_addr,
        sequence,
        guardian_set_index,
        timestamp,
        digest,
        vaas,
    } = document;
    let vaas = Binary {
        subtype: BinarySubtype::Generic,
        bytes: vaas,
    };
    let timestamp = DateTime::from_millis(timestamp.timestamp_millis());

    doc! {
        "$set": {
            "version": i32::from(version),
            "emitterChain": i32::from(emitter_chain),
            "emitterAddr": emitter_addr,
            "sequence": sequence,
            "guardianSetIndex": i64::from(guardian_set_index),
            "timestamp": timestamp,
            "digest": digest,
            "vaas": vaas,
            "updatedAt": now,
        },
        "$setOnInsert": {
            "indexedAt": now,
        },
    }
}

#[async_trait]
impl VaaRepository for MongoRepository {
    async fn upsert(&self, vaa: &Vaa, raw: &[u8]) -> Result<(), StorageError> {
        let document = VaaDocument::from_vaa(vaa, raw);
        let id = document.id.clone();
        let update = update_for(document, DateTime::now());
        let options = UpdateOptions::builder().upsert(true).build();

        let result = self
            .vaas
            .update_one(doc! { "_id": id.as_str() }, update, options)
            .await
            .map_err(|e| StorageError::Write {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            id = %id,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "vaa upserted"
        );
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_sets_fields_and_keeps_insert_time() {
        let vaa = Vaa {
            version: 1,
            guardian_set_index: 3,
            signatures: vec![],
            timestamp: 1_674_072_117,
            nonce: 0,
            emitter_chain: 2,
            emitter_address: [0xab; 32],
            sequence: 7,
            consistency_level: 15,
            payload: vec![1, 2, 3],
        };
        let raw = vaa.to_bytes();
        let now = DateTime::from_millis(1_700_000_000_000);
        let update = update_for(VaaDocument::from_vaa(&vaa, &raw), now);

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_i32("emitterChain").unwrap(), 2);
        assert_eq!(set.get_str("sequence").unwrap(), "7");
        assert_eq!(set.get_i64("guardianSetIndex").unwrap(), 3);
        assert_eq!(set.get_binary_generic("vaas").unwrap(), &raw);
        assert_eq!(
            set.get_datetime("timestamp").unwrap().timestamp_millis(),
            1_674_072_117_000
        );

        let on_insert = update.get_document("$setOnInsert").unwrap();
        assert_eq!(on_insert.get_datetime("indexedAt").unwrap(), &now);
        assert!(!set.contains_key("_id"));
    }
}
