#[cfg(test)]
mod tests {
    use crate::indicator::show_indicator;
    use proptest::prelude::*;
    use s3_reinvoke_lambda::types::InvocationStatistics;
    use std::time::Duration;

    fn arb_stats_sequence() -> impl Strategy<Value = Vec<InvocationStatistics>> {
        prop::collection::vec(
            prop_oneof![
                "[a-z0-9/]{1,16}".prop_map(|key| InvocationStatistics::InvokeComplete { key }),
                "[a-z0-9/]{1,16}".prop_map(|key| InvocationStatistics::InvokeSkip { key }),
                "[a-z0-9/]{1,16}".prop_map(|key| InvocationStatistics::InvokeError { key }),
            ],
            0..50,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// The indicator finishes for any stream once the channel closes, and
        /// its counts match the stream.
        #[test]
        fn prop_indicator_counts_match_stream(
            stats in arb_stats_sequence(),
            show_progress in proptest::bool::ANY,
            show_result in proptest::bool::ANY,
            dry_run in proptest::bool::ANY,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            let summary = rt.block_on(async {
                let (sender, receiver) = async_channel::unbounded();
                for stat in &stats {
                    sender.send(stat.clone()).await.unwrap();
                }
                drop(sender);

                let handle = show_indicator(receiver, show_progress, show_result, dry_run);
                tokio::time::timeout(Duration::from_secs(5), handle)
                    .await
                    .expect("indicator should complete within timeout")
                    .expect("indicator task should not panic")
            });

            let count = |f: fn(&InvocationStatistics) -> bool| {
                stats.iter().filter(|s| f(s)).count() as u64
            };
            prop_assert_eq!(
                summary.total_completed_count,
                count(|s| matches!(s, InvocationStatistics::InvokeComplete { .. }))
            );
            prop_assert_eq!(
                summary.total_skip_count,
                count(|s| matches!(s, InvocationStatistics::InvokeSkip { .. }))
            );
            prop_assert_eq!(
                summary.total_error_count,
                count(|s| matches!(s, InvocationStatistics::InvokeError { .. }))
            );
            prop_assert_eq!(summary.total(), stats.len() as u64);
        }
    }
}
