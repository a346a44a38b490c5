//! Property-based tests for the filter chain.
