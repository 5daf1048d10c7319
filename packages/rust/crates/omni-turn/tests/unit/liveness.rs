use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

use super::*;

#[derive(Default)]
struct Collect(Mutex<Vec<ProgressEvent>>);

impl ProgressSink for Collect {
    fn emit(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

impl Collect {
    fn kinds(&self) -> Vec<ProgressKind> {
        self.0.lock().unwrap().iter().map(|e| e.kind.clone()).collect()
    }
}

fn config() -> LivenessConfig {
    LivenessConfig {
        heartbeat: Duration::from_secs(60),
        watchdog: Duration::from_secs(120),
    }
}

fn counter() -> (Arc<AtomicUsize>, RecoveryFn) {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = Arc::clone(&count);
    (
        count,
        Arc::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

#[tokio::test(start_paused = true)]
async fn heartbeat_warns_without_recovering() {
    let sink = Arc::new(Collect::default());
    let (recoveries, recovery) = counter();
    let monitor = LivenessMonitor::start(config(), 7, sink.clone(), recovery);

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert_eq!(
        sink.kinds(),
        vec![ProgressKind::HeartbeatWarning { idle_ms: 60_000 }]
    );
    assert_eq!(recoveries.load(Ordering::SeqCst), 0);
    assert!(!monitor.has_fired());
}

#[tokio::test(start_paused = true)]
async fn activity_resets_the_heartbeat() {
    let sink = Arc::new(Collect::default());
    let (_, recovery) = counter();
    let monitor = LivenessMonitor::start(config(), 7, sink.clone(), recovery);

    for _ in 0..3 {
        tokio::time::sleep(Duration::from_secs(30)).await;
        monitor.touch();
    }
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(sink.kinds().is_empty());
}

#[tokio::test(start_paused = true)]
async fn watchdog_recovers_exactly_once() {
    let sink = Arc::new(Collect::default());
    let (recoveries, recovery) = counter();
    let monitor = LivenessMonitor::start(config(), 7, sink.clone(), recovery);

    tokio::time::sleep(Duration::from_secs(121)).await;
    assert!(monitor.has_fired());
    assert!(!monitor.fire());
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(recoveries.load(Ordering::SeqCst), 1);
    let critical = sink
        .0
        .lock()
        .unwrap()
        .iter()
        .filter(|event| event.severity == omni_events::Severity::Critical)
        .count();
    assert_eq!(critical, 1);
}

#[tokio::test(start_paused = true)]
async fn rearm_allows_another_firing() {
    let sink = Arc::new(Collect::default());
    let (recoveries, recovery) = counter();
    let monitor = LivenessMonitor::start(config(), 7, sink, recovery);

    assert!(monitor.fire());
    monitor.rearm();
    tokio::time::sleep(Duration::from_secs(119)).await;
    assert_eq!(recoveries.load(Ordering::SeqCst), 1);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(recoveries.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_both_timers() {
    let sink = Arc::new(Collect::default());
    let (recoveries, recovery) = counter();
    let mut monitor = LivenessMonitor::start(config(), 7, sink.clone(), recovery);

    monitor.stop();
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert!(sink.kinds().is_empty());
    assert_eq!(recoveries.load(Ordering::SeqCst), 0);
}
