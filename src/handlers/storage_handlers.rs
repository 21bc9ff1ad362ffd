//! HTTP handlers for the bucket listing API.
//! Listings are plain JSON arrays of names; object content is streamed from
//! disk without buffering.

use crate::{
    browser::{breadcrumbs::breadcrumbs, projector::project},
    errors::AppError,
    models::{
        namespace::{Breadcrumb, Entry, KeySet, Prefix},
        object::Object,
    },
    services::storage_service::StorageService,
};
use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub prefix: Option<String>,
}

/// One level of a bucket, as the browser would render it.
#[derive(Debug, Serialize, Deserialize)]
pub struct BrowseResponse {
    pub bucket: String,
    pub prefix: String,
    pub entries: Vec<Entry>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// GET `/api/storage/buckets`
pub async fn list_buckets(
    State(service): State<StorageService>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(service.list_bucket_names().await?))
}

/// GET `/api/storage/buckets/{bucket}/objects`
pub async fn list_object_keys(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(service.list_object_keys(&bucket).await?))
}

/// GET `/api/storage/buckets/{bucket}/objects/{*key}` — object content.
pub async fn get_object_content(
    State(service): State<StorageService>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (meta, file) = service.get_object_reader(&bucket, &key).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// GET `/api/storage/buckets/{bucket}/browse?prefix=`
pub async fn browse_bucket(
    State(service): State<StorageService>,
    Path(bucket): Path<String>,
    Query(q): Query<BrowseQuery>,
) -> Result<Json<BrowseResponse>, AppError> {
    let raw = q.prefix.unwrap_or_default();
    let prefix = Prefix::parse(&raw).ok_or_else(|| {
        AppError::bad_request(format!("prefix `{}` must be empty or end with `/`", raw))
    })?;

    let keys: KeySet = service.list_object_keys(&bucket).await?.into_iter().collect();
    let entries = project(&keys, &prefix);
    let breadcrumbs = breadcrumbs(&bucket, &prefix);

    Ok(Json(BrowseResponse {
        bucket,
        prefix: prefix.to_string(),
        entries,
        breadcrumbs,
    }))
}

fn set_object_headers(headers: &mut HeaderMap, meta: &Object) {
    let content_type = meta
        .content_type
        .as_deref()
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(meta.size_bytes.max(0)),
    );

    if let Some(etag) = meta.etag.as_ref() {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
            headers.insert(header::ETAG, value);
        }
    }

    if let Ok(value) = HeaderValue::from_str(&meta.last_modified.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }
}
