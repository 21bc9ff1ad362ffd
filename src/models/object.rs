//! Metadata for a single stored object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One object row. The payload bytes live on disk, not here.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Object {
    pub id: Uuid,

    /// Owning bucket.
    pub bucket_id: Uuid,

    /// Full object key, possibly containing `/` to encode virtual folders.
    pub key: String,

    /// MIME type recorded at write time, if any.
    pub content_type: Option<String>,

    pub size_bytes: i64,

    /// Hex MD5 of the payload.
    pub etag: Option<String>,

    pub last_modified: DateTime<Utc>,

    /// Soft-deleted rows are hidden from every listing.
    pub is_deleted: bool,
}
