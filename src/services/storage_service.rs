//! src/services/storage_service.rs
//!
//! StorageService — read-only access to the bucket listing backend. Bucket and
//! object metadata live in SQLite; payloads live on local disk sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`. Nothing here writes to the
//! namespace: the browser only lists keys and reads object content.

use crate::models::{bucket::Bucket, object::Object};
use futures::TryStreamExt;
use sqlx::SqlitePool;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::fs::{self, File};
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{0}` not found")]
    BucketNotFound(String),
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Listing backend shared by the HTTP handlers and the in-process browser.
#[derive(Clone)]
pub struct StorageService {
    /// Shared SQLite connection pool used for metadata queries.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

const MAX_OBJECT_KEY_LEN: usize = 1024;
const MAX_BUCKET_NAME_LEN: usize = 255;

impl StorageService {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Reject keys that could escape the bucket directory when mapped to disk.
    /// Leading delimiters are fine: `object_path` stores such keys relative
    /// to the shard directory.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.len() > MAX_OBJECT_KEY_LEN || key.trim_start_matches('/').is_empty() {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.bytes().any(|b| b.is_ascii_control() || b == b'\\') {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Bucket names come from whatever wrote the metadata, so only what is
    /// needed for a single safe directory name is checked here.
    fn ensure_bucket_name_safe(&self, name: &str) -> StorageResult<()> {
        let invalid = |reason: &str| StorageError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() || name.len() > MAX_BUCKET_NAME_LEN {
            return Err(invalid("must be between 1 and 255 bytes"));
        }
        if name == "." || name == ".." {
            return Err(invalid("must not be a relative path component"));
        }
        if name.contains(['/', '\\']) || name.chars().any(char::is_control) {
            return Err(invalid("must not contain path separators or control characters"));
        }
        Ok(())
    }

    /// Two-level shard directories derived from MD5(bucket/key).
    fn object_shards(bucket_name: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket_name, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// `base_path/bucket/{shard}/{shard}/{key}`
    pub fn object_path(&self, bucket_name: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket_name, key);
        let mut path = self.base_path.clone();
        path.push(bucket_name);
        path.push(shard_a);
        path.push(shard_b);
        // A leading `/` would make `push` replace the whole path.
        path.push(key.trim_start_matches('/'));
        path
    }

    async fn fetch_bucket(&self, bucket: &str) -> StorageResult<Bucket> {
        self.ensure_bucket_name_safe(bucket)?;
        sqlx::query_as::<_, Bucket>(
            "SELECT id, name, region, created_at FROM buckets WHERE name = ?",
        )
        .bind(bucket)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::BucketNotFound(bucket.to_string()),
            other => StorageError::Sqlx(other),
        })
    }

    async fn fetch_object(&self, bucket: &Bucket, key: &str) -> StorageResult<Object> {
        sqlx::query_as::<_, Object>(
            "SELECT id, bucket_id, key, content_type, size_bytes, etag, last_modified, is_deleted
             FROM objects
             WHERE key = ? AND bucket_id = ? AND is_deleted = 0",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: key.to_string(),
            },
            other => StorageError::Sqlx(other),
        })
    }

    /// All buckets, ordered by name.
    pub async fn list_buckets(&self) -> StorageResult<Vec<Bucket>> {
        let buckets = sqlx::query_as::<_, Bucket>(
            "SELECT id, name, region, created_at FROM buckets ORDER BY name ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(buckets)
    }

    pub async fn list_bucket_names(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .list_buckets()
            .await?
            .into_iter()
            .map(|bucket| bucket.name)
            .collect())
    }

    /// Every live key in `bucket`, ascending. The listing is complete: there
    /// is no paging contract on this side.
    pub async fn list_object_keys(&self, bucket: &str) -> StorageResult<Vec<String>> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let keys: Vec<String> = sqlx::query_scalar::<_, String>(
            "SELECT key FROM objects WHERE bucket_id = ? AND is_deleted = 0 ORDER BY key ASC",
        )
        .bind(bucket_rec.id)
        .fetch(&*self.db)
        .try_collect()
        .await?;
        debug!(bucket, count = keys.len(), "listed object keys");
        Ok(keys)
    }

    pub async fn get_object_metadata(&self, bucket: &str, key: &str) -> StorageResult<Object> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        self.fetch_object(&bucket_rec, key).await
    }

    /// Metadata plus an open handle on the payload, ready for streaming.
    /// A metadata row without its file on disk counts as not found.
    pub async fn get_object_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> StorageResult<(Object, File)> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;

        let file_path = self.object_path(&bucket_rec.name, key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                debug!("payload missing at {}", file_path.display());
                StorageError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::Io(err)
            }
        })?;

        Ok((object, file))
    }

    /// True when the payload root exists and is a directory.
    pub async fn storage_dir_ready(&self) -> io::Result<bool> {
        Ok(fs::metadata(&self.base_path).await?.is_dir())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures that populate the metadata database and payload directory
    //! the way an upstream writer would.

    use super::*;
    use crate::migrations::run_migrations;
    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use tempfile::TempDir;
    use uuid::Uuid;

    pub struct Fixture {
        pub service: StorageService,
        _dir: TempDir,
    }

    pub async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        Fixture {
            service: StorageService::new(Arc::new(pool), dir.path()),
            _dir: dir,
        }
    }

    impl Fixture {
        pub async fn bucket(&self, name: &str) -> Uuid {
            let id = Uuid::new_v4();
            sqlx::query("INSERT INTO buckets (id, name, region, created_at) VALUES (?, ?, 'local', ?)")
                .bind(id)
                .bind(name)
                .bind(Utc::now())
                .execute(&*self.service.db)
                .await
                .unwrap();
            id
        }

        pub async fn object(&self, bucket: &str, bucket_id: Uuid, key: &str, body: &[u8]) {
            let path = self.service.object_path(bucket, key);
            fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            fs::write(&path, body).await.unwrap();
            sqlx::query(
                "INSERT INTO objects (id, bucket_id, key, content_type, size_bytes, etag, last_modified, is_deleted)
                 VALUES (?, ?, ?, 'text/plain', ?, ?, ?, 0)",
            )
            .bind(Uuid::new_v4())
            .bind(bucket_id)
            .bind(key)
            .bind(body.len() as i64)
            .bind(format!("{:x}", md5::compute(body)))
            .bind(Utc::now())
            .execute(&*self.service.db)
            .await
            .unwrap();
        }

        pub async fn soft_delete(&self, bucket_id: Uuid, key: &str) {
            sqlx::query("UPDATE objects SET is_deleted = 1 WHERE bucket_id = ? AND key = ?")
                .bind(bucket_id)
                .bind(key)
                .execute(&*self.service.db)
                .await
                .unwrap();
        }
    }
}
