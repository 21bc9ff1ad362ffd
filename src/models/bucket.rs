//! A bucket: the top-level container whose keys the browser navigates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Bucket metadata as stored in the `buckets` table.
///
/// The browser only ever shows `name`; the rest is carried along so the
/// bucket list endpoint can grow richer rows without another query.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Bucket {
    /// Internal identifier, referenced by `objects.bucket_id`.
    pub id: Uuid,

    /// Globally unique bucket name (DNS-style).
    pub name: String,

    /// Region the bucket lives in (e.g. "eu-frankfurt-1", "local").
    pub region: String,

    pub created_at: DateTime<Utc>,
}
