/// A cancellation token used to signal a run-wide shutdown.
///
/// This is a type alias for [`tokio_util::sync::CancellationToken`]. Pass the
/// token to [`ReinvokePipeline::new`](crate::ReinvokePipeline::new) and call
/// [`cancel()`](tokio_util::sync::CancellationToken::cancel) on it to stop
/// listing and dispatching (e.g., from a Ctrl+C handler). Invocations that are
/// already running are still awaited.
pub type PipelineCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`PipelineCancellationToken`].
///
/// # Example
///
/// ```
/// use s3_reinvoke_lambda::create_pipeline_cancellation_token;
///
/// let token = create_pipeline_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_pipeline_cancellation_token() -> PipelineCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
