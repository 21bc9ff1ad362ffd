//! Data models shared by the listing backend and the namespace browser.
//!
//! `bucket` and `object` mirror rows of the metadata database (`sqlx::FromRow`),
//! while `namespace` holds the derived, non-persistent view types the browser
//! computes from a flat key listing.

pub mod bucket;
pub mod namespace;
pub mod object;
