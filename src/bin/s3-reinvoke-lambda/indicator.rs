use std::io;
use std::io::Write;

use async_channel::Receiver;
use indicatif::{HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use s3_reinvoke_lambda::types::InvocationStatistics;
use simple_moving_average::{SMA, SumTreeSMA};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

/// Counts gathered by [`show_indicator`] once the stats channel closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicatorSummary {
    pub total_completed_count: u64,
    pub total_skip_count: u64,
    pub total_error_count: u64,
}

impl IndicatorSummary {
    pub fn total(&self) -> u64 {
        self.total_completed_count + self.total_skip_count + self.total_error_count
    }

    fn record(&mut self, stats: &InvocationStatistics) {
        match stats {
            InvocationStatistics::InvokeComplete { .. } => self.total_completed_count += 1,
            InvocationStatistics::InvokeSkip { .. } => self.total_skip_count += 1,
            InvocationStatistics::InvokeError { .. } => self.total_error_count += 1,
        }
    }
}

const MOVING_AVERAGE_PERIOD_SECS: usize = 10;
const REFRESH_INTERVAL: f32 = 1.0;

/// Spawn a task that drains `stats_receiver` and renders progress.
///
/// The task returns once every sender is closed. In dry-run mode the
/// throughput is reported as zero.
pub fn show_indicator(
    stats_receiver: Receiver<InvocationStatistics>,
    show_progress: bool,
    show_result: bool,
    dry_run: bool,
) -> JoinHandle<IndicatorSummary> {
    let progress_text = ProgressBar::new(0);
    if let Ok(progress_style) = ProgressStyle::with_template("{wide_msg}") {
        progress_text.set_style(progress_style);
    }

    tokio::spawn(async move {
        let start_time = Instant::now();

        let mut ma_completed_count = SumTreeSMA::<_, u64, MOVING_AVERAGE_PERIOD_SECS>::new();
        let mut summary = IndicatorSummary::default();

        loop {
            let mut period_count: u64 = 0;

            let period = Instant::now();
            loop {
                while let Ok(stats) = stats_receiver.try_recv() {
                    if matches!(stats, InvocationStatistics::InvokeComplete { .. }) {
                        period_count += 1;
                    }
                    summary.record(&stats);
                }

                if REFRESH_INTERVAL < period.elapsed().as_secs_f32() {
                    break;
                }

                if stats_receiver.is_closed() && stats_receiver.is_empty() {
                    let elapsed = start_time.elapsed();
                    let elapsed_secs_f64 = elapsed.as_secs_f64();

                    let mut invocations_per_sec =
                        (summary.total_completed_count as f64 / elapsed_secs_f64) as u64;
                    if elapsed_secs_f64 < REFRESH_INTERVAL as f64 {
                        invocations_per_sec = summary.total_completed_count;
                    }
                    if dry_run {
                        invocations_per_sec = 0;
                    }

                    info!(
                        message = "invocation summary",
                        total = summary.total(),
                        completed = summary.total_completed_count,
                        completed_per_sec = invocations_per_sec,
                        skipped = summary.total_skip_count,
                        error = summary.total_error_count,
                        duration_sec = elapsed_secs_f64,
                    );

                    if show_result {
                        if let Ok(style) = ProgressStyle::with_template("{msg}") {
                            progress_text.set_style(style);
                        }

                        progress_text.finish_with_message(format!(
                            "{}invoked {:>3} objects | {:>3} objects/sec,  skipped {} objects,  error {} objects,  duration {}",
                            if dry_run { "[dry-run] " } else { "" },
                            summary.total_completed_count,
                            HumanCount(invocations_per_sec),
                            summary.total_skip_count,
                            summary.total_error_count,
                            HumanDuration(elapsed),
                        ));

                        println!();
                        let _ = io::stdout().flush();
                    }

                    return summary;
                }

                tokio::time::sleep(std::time::Duration::from_secs_f32(0.05)).await;
            }

            if !dry_run {
                ma_completed_count.add_sample(period_count);
            }

            if show_progress {
                progress_text.set_message(format!(
                    "invoked {:>3} objects | {:>3} objects/sec,  skipped {} objects,  error {} objects",
                    summary.total_completed_count,
                    HumanCount(ma_completed_count.get_average()),
                    summary.total_skip_count,
                    summary.total_error_count,
                ));
            }
        }
    })
}
