// tests/elapsed_reporter.rs

use ido_installer_test_utils::init_tracing;
use ido_installer_test_utils::recording_sink::RecordingSink;

use std::sync::Arc;
use std::time::Duration;

use ido_installer::engine::ElapsedReporter;

#[tokio::test]
async fn publishes_strictly_increasing_values_from_zero() {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());

    let reporter = ElapsedReporter::start(sink.clone(), Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(120)).await;
    reporter.stop().await;

    let values = sink.elapsed();
    assert!(values.len() >= 3, "only got {values:?}");
    assert_eq!(values[0], Duration::ZERO);
    for pair in values.windows(2) {
        assert!(pair[0] < pair[1], "not increasing: {values:?}");
    }
    for value in &values {
        assert_eq!(value.as_nanos() % Duration::from_millis(10).as_nanos(), 0);
    }
}

#[tokio::test]
async fn nothing_is_published_after_stop() {
    init_tracing();
    let sink = Arc::new(RecordingSink::new());

    let reporter = ElapsedReporter::start(sink.clone(), Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(30)).await;
    reporter.stop().await;

    let at_stop = sink.elapsed().len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.elapsed().len(), at_stop);
}

#[tokio::test(start_paused = true)]
async fn one_value_per_second_by_default() {
    let sink = Arc::new(RecordingSink::new());

    let reporter = ElapsedReporter::start(sink.clone(), ido_installer::engine::ELAPSED_TICK);
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    reporter.stop().await;

    assert_eq!(
        sink.elapsed(),
        vec![
            Duration::ZERO,
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(3),
        ]
    );
}
