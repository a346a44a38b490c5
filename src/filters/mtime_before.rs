//! Modified-time "before" filter.
//!
//! Passes objects modified at or before the configured time. Objects without
//! a last-modified timestamp always pass.

use tracing::debug;

use crate::config::FilterConfig;
use crate::types::S3Object;

pub(crate) const FILTER_NAME: &str = "MtimeBeforeFilter";

pub(crate) fn is_before(object: &S3Object, config: &FilterConfig) -> bool {
    let (Some(before_time), Some(last_modified)) = (config.before_time, object.last_modified)
    else {
        return true;
    };

    if before_time < last_modified {
        debug!(
            name = FILTER_NAME,
            key = object.key(),
            last_modified = last_modified.to_rfc3339(),
            config_time = before_time.to_rfc3339(),
            "object filtered."
        );

        return false;
    }

    true
}
