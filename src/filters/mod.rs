//! Object filters.
//!
//! Each filter is a pure predicate over an [`S3Object`] and the
//! [`FilterConfig`]. [`FilterChain`] holds the active filters in evaluation
//! order and accepts an object only when every one of them passes it.

use tracing::debug;

use crate::config::FilterConfig;
use crate::types::S3Object;

pub mod extension;
mod filter_properties;
pub mod mtime_before;

type FilterFn = fn(&S3Object, &FilterConfig) -> bool;

/// Active filters built from a [`FilterConfig`].
///
/// Filters whose option is unset are left out of the chain, so an empty
/// configuration accepts every object.
#[derive(Debug, Clone)]
pub struct FilterChain {
    config: FilterConfig,
    filters: Vec<(&'static str, FilterFn)>,
}

impl FilterChain {
    pub fn new(config: FilterConfig) -> Self {
        let mut filters: Vec<(&'static str, FilterFn)> = Vec::new();

        if !config.lower_extensions.is_empty() {
            filters.push((extension::FILTER_NAME, extension::is_allowed_extension));
        }
        if config.before_time.is_some() {
            filters.push((mtime_before::FILTER_NAME, mtime_before::is_before));
        }

        debug!(
            filters = ?filters.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            "filter chain has been built."
        );

        Self { config, filters }
    }

    /// `true` when the object passes every active filter.
    pub fn is_target(&self, object: &S3Object) -> bool {
        self.filters
            .iter()
            .all(|(_, filter_fn)| filter_fn(object, &self.config))
    }

    pub fn active_filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|(name, _)| *name).collect()
    }
}
