//! MongoDB-backed overlay store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::StorageConfig;

use super::store::OverlayStore;
use super::types::{NewOverlay, Overlay, OverlayError, OverlayPatch};

/// Overlay store backed by a single MongoDB collection
///
/// The `Client` holds a connection pool and is safe to share between
/// concurrent requests; it is created once and torn down in `shutdown`.
pub struct MongoOverlayStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoOverlayStore {
    /// Create a client for the configured connection string
    ///
    /// The driver connects lazily, so an unreachable server surfaces as a
    /// storage error on the first request rather than here.
    pub async fn connect(config: &StorageConfig) -> Result<Self, OverlayError> {
        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .map_err(storage_error)?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        info!(
            "Using MongoDB collection {}.{}",
            config.database, config.collection
        );

        Ok(Self { client, collection })
    }
}

#[async_trait]
impl OverlayStore for MongoOverlayStore {
    async fn insert(&self, overlay: NewOverlay) -> Result<Overlay, OverlayError> {
        let document = to_document(&overlay)?;
        let result = self
            .collection
            .insert_one(document)
            .await
            .map_err(storage_error)?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| OverlayError::Storage("Inserted id is not an ObjectId".to_string()))?;

        Ok(overlay.with_id(id.to_hex()))
    }

    async fn list(&self) -> Result<Vec<Overlay>, OverlayError> {
        let cursor = self.collection.find(doc! {}).await.map_err(storage_error)?;
        let documents: Vec<Document> = cursor.try_collect().await.map_err(storage_error)?;

        documents.into_iter().map(from_document).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Overlay>, OverlayError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };

        self.collection
            .find_one(doc! { "_id": oid })
            .await
            .map_err(storage_error)?
            .map(from_document)
            .transpose()
    }

    async fn update(
        &self,
        id: &str,
        patch: &OverlayPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Overlay>, OverlayError> {
        let Some(oid) = parse_id(id) else {
            return Ok(None);
        };

        let update = update_document(patch, updated_at)?;

        self.collection
            .find_one_and_update(doc! { "_id": oid }, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(storage_error)?
            .map(from_document)
            .transpose()
    }

    async fn delete(&self, id: &str) -> Result<bool, OverlayError> {
        let Some(oid) = parse_id(id) else {
            return Ok(false);
        };

        let result = self
            .collection
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(storage_error)?;
        Ok(result.deleted_count > 0)
    }

    async fn shutdown(&self) {
        info!("Shutting down MongoDB client");
        self.client.clone().shutdown().await;
    }
}

fn storage_error(e: impl std::fmt::Display) -> OverlayError {
    OverlayError::Storage(e.to_string())
}

/// Identifiers that are not valid ObjectIds can never match a document
fn parse_id(id: &str) -> Option<ObjectId> {
    match ObjectId::parse_str(id) {
        Ok(oid) => Some(oid),
        Err(e) => {
            debug!("Rejecting malformed overlay id {:?}: {}", id, e);
            None
        }
    }
}

fn to_bson_datetime(ts: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(ts.timestamp_millis())
}

fn json_to_bson(value: &Value) -> Result<Bson, OverlayError> {
    bson::to_bson(value).map_err(storage_error)
}

fn to_document(overlay: &NewOverlay) -> Result<Document, OverlayError> {
    Ok(doc! {
        "type": overlay.kind.as_str(),
        "content": json_to_bson(&overlay.content)?,
        "position": json_to_bson(&overlay.position)?,
        "size": json_to_bson(&overlay.size)?,
        "style": json_to_bson(&overlay.style)?,
        "createdAt": to_bson_datetime(overlay.created_at),
        "updatedAt": to_bson_datetime(overlay.updated_at),
    })
}

/// `$set` body holding only the fields present in the patch
fn patch_document(patch: &OverlayPatch) -> Result<Document, OverlayError> {
    let mut fields = Document::new();
    if let Some(kind) = &patch.kind {
        fields.insert("type", kind.as_str());
    }
    for (key, value) in [
        ("content", &patch.content),
        ("position", &patch.position),
        ("size", &patch.size),
        ("style", &patch.style),
    ] {
        if let Some(value) = value {
            fields.insert(key, json_to_bson(value)?);
        }
    }
    Ok(fields)
}

/// Update modifiers for a patch: `$max` keeps `updatedAt` from ever moving
/// backwards, `$set` is only present when the patch carries fields
fn update_document(
    patch: &OverlayPatch,
    updated_at: DateTime<Utc>,
) -> Result<Document, OverlayError> {
    let mut update = doc! {
        "$max": { "updatedAt": to_bson_datetime(updated_at) },
    };
    let fields = patch_document(patch)?;
    if !fields.is_empty() {
        update.insert("$set", fields);
    }
    Ok(update)
}

fn from_document(document: Document) -> Result<Overlay, OverlayError> {
    let id = document.get_object_id("_id").map_err(storage_error)?.to_hex();
    let kind = document.get_str("type").map_err(storage_error)?.to_string();

    Ok(Overlay {
        id,
        kind,
        content: json_field(&document, "content").unwrap_or(Value::Null),
        position: json_field(&document, "position").unwrap_or(Value::Null),
        size: json_field(&document, "size").unwrap_or(Value::Null),
        style: json_field(&document, "style").unwrap_or_else(|| Value::Object(Map::new())),
        created_at: datetime_field(&document, "createdAt")?,
        updated_at: datetime_field(&document, "updatedAt")?,
    })
}

fn json_field(document: &Document, key: &str) -> Option<Value> {
    document.get(key).cloned().map(Bson::into_relaxed_extjson)
}

fn datetime_field(document: &Document, key: &str) -> Result<DateTime<Utc>, OverlayError> {
    let ts = document.get_datetime(key).map_err(storage_error)?;
    DateTime::<Utc>::from_timestamp_millis(ts.timestamp_millis())
        .ok_or_else(|| OverlayError::Storage(format!("Field {} is out of range", key)))
}
