//! Extension allow-list filter.
//!
//! Passes objects whose lowercased key extension is one of the configured
//! extensions. An empty list accepts everything.

use tracing::debug;

use crate::config::FilterConfig;
use crate::types::S3Object;

pub(crate) const FILTER_NAME: &str = "ExtensionFilter";

pub(crate) fn is_allowed_extension(object: &S3Object, config: &FilterConfig) -> bool {
    if config.lower_extensions.is_empty() {
        return true;
    }

    let extension = object.lower_extension();
    if config
        .lower_extensions
        .iter()
        .any(|allowed| *allowed == extension)
    {
        return true;
    }

    debug!(
        name = FILTER_NAME,
        key = object.key(),
        extension = extension,
        "object filtered."
    );

    false
}
