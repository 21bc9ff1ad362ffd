//! Breadcrumb trail derived from the current prefix.

use crate::models::namespace::{Breadcrumb, DELIMITER, Prefix};

/// Build the trail from the bucket root down to `prefix`.
///
/// The first crumb is always the bucket itself with an empty target. Each
/// further crumb is one segment plus the delimiter, targeting the prefix that
/// ends with that segment.
pub fn breadcrumbs(bucket: &str, prefix: &Prefix) -> Vec<Breadcrumb> {
    let mut trail = vec![Breadcrumb {
        label: bucket.to_string(),
        target_prefix: String::new(),
    }];

    let mut target = String::new();
    for segment in prefix.segments() {
        target.push_str(segment);
        target.push(DELIMITER);
        trail.push(Breadcrumb {
            label: format!("{}{}", segment, DELIMITER),
            target_prefix: target.clone(),
        });
    }

    trail
}
