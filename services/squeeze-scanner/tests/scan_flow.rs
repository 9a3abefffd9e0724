//! Integration tests for the scan lifecycle.
//!
//! Drives full sessions against mock providers with all delays set to zero
//! and checks the event stream subscribers see.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio_test::{assert_err, assert_ok};

use squeeze_common::ScannerConfig;
use squeeze_scanner::data::{MetricsProvider, MetricsSnapshot, ProviderError};
use squeeze_scanner::scanner::{
    ScanEvent, ScanOrchestrator, ScanRequest, SessionOutcome, SessionState,
};
use squeeze_scanner::scoring::{AlertKind, ScoringPipeline, SqueezeTiming, SqueezeType};
use squeeze_scanner::ScanError;

// ============================================================================
// Mock Providers
// ============================================================================

/// Provider serving fixed snapshots, failing for selected symbols and
/// tracking how many fetches run at once.
struct MockProvider {
    snapshots: HashMap<String, MetricsSnapshot>,
    failing: Vec<String>,
    fetch_delay: Duration,
    calls: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            snapshots: HashMap::new(),
            failing: Vec::new(),
            fetch_delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_snapshot(mut self, snapshot: MetricsSnapshot) -> Self {
        self.snapshots.insert(snapshot.symbol.clone(), snapshot);
        self
    }

    fn failing(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_metrics(&self, symbol: &str) -> Result<MetricsSnapshot, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.iter().any(|s| s == symbol) {
            return Err(ProviderError::Network("Connection failed".into()));
        }

        Ok(self
            .snapshots
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| MetricsSnapshot::new(symbol, 10.0, 60.0, 10.0, 1.0)))
    }
}

/// Provider that is never ready (e.g. missing credentials).
struct UnconfiguredProvider;

#[async_trait]
impl MetricsProvider for UnconfiguredProvider {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn ensure_ready(&self) -> Result<(), ProviderError> {
        Err(ProviderError::Auth("ORTEX_API_KEY not configured".into()))
    }

    async fn fetch_metrics(&self, _symbol: &str) -> Result<MetricsSnapshot, ProviderError> {
        panic!("fetch must not run when the provider is not ready");
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn fast_config(batch_size: usize) -> ScannerConfig {
    ScannerConfig {
        batch_size,
        batch_delay_ms: 0,
        item_stagger_ms: 0,
        cycle_interval_secs: 0,
        ..ScannerConfig::default()
    }
}

fn orchestrator(provider: Arc<dyn MetricsProvider>, config: ScannerConfig) -> ScanOrchestrator {
    ScanOrchestrator::new(provider, Arc::new(ScoringPipeline::default()), config)
}

fn symbols(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("SYM{i}")).collect()
}

async fn drain(mut rx: mpsc::Receiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn names(events: &[ScanEvent]) -> Vec<&'static str> {
    events.iter().map(ScanEvent::event_name).collect()
}

fn count(events: &[ScanEvent], name: &str) -> usize {
    events.iter().filter(|e| e.event_name() == name).count()
}

// ============================================================================
// One-shot Sessions
// ============================================================================

#[tokio::test]
async fn test_partial_failure_isolated() {
    let provider = Arc::new(
        MockProvider::new()
            .with_snapshot(MetricsSnapshot::new("GME", 30.0, 95.0, 85.0, 6.0))
            .failing("BAD"),
    );
    let orchestrator = orchestrator(provider.clone(), fast_config(2));
    let session = orchestrator
        .prepare(&ScanRequest::with_symbols(["AMC", "BAD", "GME", "TSLA", "NVDA"]))
        .unwrap();
    let (tx, rx) = mpsc::channel(128);

    let outcome = orchestrator.run(session, Arc::new(tx)).await;
    assert_eq!(outcome, SessionOutcome::Finished { total_cycles: 1 });
    assert_eq!(provider.call_count(), 5);

    let events = drain(rx).await;
    let Some(ScanEvent::Complete { results, summary, .. }) =
        events.iter().find(|e| matches!(e, ScanEvent::Complete { .. })).cloned()
    else {
        panic!("no complete event");
    };

    assert_eq!(results.len(), 5);
    assert_eq!(results[0].symbol, "GME");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

    let failed = results.iter().find(|r| r.symbol == "BAD").unwrap();
    assert!(failed.is_error());
    assert_eq!(failed.score, 0);
    assert_eq!(failed.classification.squeeze_type, SqueezeType::Error);
    assert_eq!(failed.classification.timing, SqueezeTiming::NotApplicable);
    assert_eq!(failed.alerts.len(), 1);
    assert_eq!(failed.alerts[0].kind, AlertKind::ApiError);
    assert_eq!(failed.alerts[0].message, "API error: Network error: Connection failed");

    assert_eq!(summary.total, 5);
    assert_eq!(summary.errors, 1);
    assert_eq!(
        summary.legendary + summary.strong + summary.moderate + summary.weak + summary.below_threshold,
        summary.total
    );
}

#[tokio::test]
async fn test_batch_progress_sequence() {
    let provider = Arc::new(MockProvider::new());
    let orchestrator = orchestrator(provider, fast_config(5));
    let session = orchestrator.prepare(&ScanRequest::with_symbols(symbols(12))).unwrap();
    assert_eq!(session.plan().batch_count(), 3);

    let (tx, rx) = mpsc::channel(128);
    orchestrator.run(session, Arc::new(tx)).await;
    let events = drain(rx).await;

    let percentages: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress { percentage, .. } => Some(*percentage),
            _ => None,
        })
        .collect();
    assert_eq!(percentages, [0, 33, 33, 66, 66, 100]);

    let indices: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::ItemUpdate { index, total, .. } => {
                assert_eq!(*total, 12);
                Some(*index)
            }
            _ => None,
        })
        .collect();
    assert_eq!(indices, (0..12).collect::<Vec<_>>());

    assert_eq!(names(&events).first(), Some(&"scan-started"));
    assert_eq!(names(&events).last(), Some(&"scan-finished"));
}

#[tokio::test]
async fn test_concurrency_bounded_by_batch() {
    let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(20)));
    let orchestrator = orchestrator(provider.clone(), fast_config(3));
    let session = orchestrator.prepare(&ScanRequest::with_symbols(symbols(10))).unwrap();

    let (tx, rx) = mpsc::channel(128);
    let drained = tokio::spawn(drain(rx));
    orchestrator.run(session, Arc::new(tx)).await;
    drained.await.unwrap();

    assert_eq!(provider.call_count(), 10);
    assert!(provider.max_concurrency() <= 3, "max in flight {}", provider.max_concurrency());
    assert!(provider.max_concurrency() >= 2);
}

#[tokio::test]
async fn test_all_absent_snapshot_monitoring() {
    let provider = Arc::new(MockProvider::new().with_snapshot(MetricsSnapshot::empty("NONE")));
    let orchestrator = orchestrator(provider, fast_config(5));

    let report = orchestrator
        .scan_once(&ScanRequest::with_symbols(["NONE"]))
        .await
        .unwrap();

    let result = &report.results[0];
    assert_eq!(result.score, 0);
    assert_eq!(result.classification.squeeze_type, SqueezeType::Monitoring);
    assert_eq!(result.classification.timing, SqueezeTiming::Early);
    assert!(result.alerts.is_empty());
    assert!(!result.is_error());
}

#[tokio::test]
async fn test_filters_shape_published_set() {
    let provider = Arc::new(
        MockProvider::new()
            .with_snapshot(MetricsSnapshot::new("GME", 30.0, 95.0, 85.0, 6.0))
            .with_snapshot(MetricsSnapshot::new("LOW", 1.0, 10.0, 1.0, 0.1))
            .failing("BAD"),
    );
    let orchestrator = orchestrator(provider.clone(), fast_config(5));

    let mut request = ScanRequest::with_symbols(["GME", "LOW", "BAD"]);
    request.filters.min_score = Some(50.0);
    let report = orchestrator.scan_once(&request).await.unwrap();

    // filters do not change what is fetched
    assert_eq!(provider.call_count(), 3);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].symbol, "GME");
    assert_eq!(report.summary.total, 1);
    assert_eq!(report.summary.errors, 0);
}

#[tokio::test]
async fn test_invalid_requests_rejected_before_fetch() {
    let provider = Arc::new(MockProvider::new());
    let orchestrator = orchestrator(provider.clone(), fast_config(5));

    let mut request = ScanRequest::with_symbols(["GME"]);
    request.filters.min_utilization = Some(-5.0);
    let err = assert_err!(orchestrator.scan_once(&request).await);
    assert!(matches!(err, ScanError::Configuration(_)));

    let err = assert_err!(orchestrator.scan_once(&ScanRequest::with_symbols(["GME", " "])).await);
    assert!(matches!(err, ScanError::MalformedRequest(_)));

    let zero_batch = self::orchestrator(provider.clone(), fast_config(0));
    let err = assert_err!(zero_batch.prepare(&ScanRequest::with_symbols(["GME"])));
    assert!(matches!(err, ScanError::Configuration(_)));

    assert_eq!(provider.call_count(), 0);
}

// ============================================================================
// Session Failure
// ============================================================================

#[tokio::test]
async fn test_provider_not_ready_fails_session() {
    let orchestrator = orchestrator(Arc::new(UnconfiguredProvider), fast_config(5));
    let session = orchestrator.prepare(&ScanRequest::with_symbols(["GME"])).unwrap();
    let (tx, rx) = mpsc::channel(16);

    let outcome = orchestrator.run(Arc::clone(&session), Arc::new(tx)).await;
    assert!(matches!(outcome, SessionOutcome::Failed { .. }));
    assert_eq!(session.state().await, SessionState::Failed);

    let events = drain(rx).await;
    assert_eq!(names(&events), ["scan-error"]);
    match &events[0] {
        ScanEvent::Error { reason } => assert!(reason.contains("ORTEX_API_KEY")),
        other => panic!("unexpected event {other:?}"),
    }

    let err = assert_err!(orchestrator.scan_once(&ScanRequest::with_symbols(["GME"])).await);
    assert!(matches!(err, ScanError::Session(_)));
}

// ============================================================================
// Continuous Sessions
// ============================================================================

#[tokio::test]
async fn test_cycle_cap_ends_continuous_session() {
    let provider = Arc::new(MockProvider::new());
    let config = ScannerConfig {
        max_continuous_cycles: 3,
        ..fast_config(2)
    };
    let orchestrator = orchestrator(provider.clone(), config);

    let mut request = ScanRequest::with_symbols(["GME", "AMC", "TSLA"]);
    request.continuous = true;
    let session = orchestrator.prepare(&request).unwrap();
    let (tx, rx) = mpsc::channel(256);

    let outcome = orchestrator.run(session, Arc::new(tx)).await;
    assert_eq!(outcome, SessionOutcome::Finished { total_cycles: 3 });
    assert_eq!(provider.call_count(), 9);

    let events = drain(rx).await;
    assert_eq!(count(&events, "scan-started"), 3);
    assert_eq!(count(&events, "scan-complete"), 3);
    assert_eq!(count(&events, "scan-waiting"), 2);
    assert_eq!(count(&events, "scan-finished"), 1);

    let cycles: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Started { cycle, .. } => Some(*cycle),
            _ => None,
        })
        .collect();
    assert_eq!(cycles, [1, 2, 3]);
}

#[tokio::test]
async fn test_stop_after_complete() {
    let provider = Arc::new(MockProvider::new());
    let config = ScannerConfig {
        cycle_interval_secs: 30,
        ..fast_config(2)
    };
    let orchestrator = orchestrator(provider, config);

    let mut request = ScanRequest::with_symbols(["GME", "AMC", "TSLA"]);
    request.continuous = true;
    let session = orchestrator.prepare(&request).unwrap();
    let (tx, mut rx) = mpsc::channel(256);
    let handle = orchestrator.spawn(session, Arc::new(tx));

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let complete = matches!(event, ScanEvent::Complete { .. });
        events.push(event);
        if complete {
            break;
        }
    }
    handle.stop();

    let rest = drain(rx).await;
    assert_eq!(count(&rest, "scan-started"), 0);
    assert_eq!(count(&rest, "scan-complete"), 0);
    assert_eq!(count(&rest, "scan-finished"), 1);
    match rest.last() {
        Some(ScanEvent::Finished { total_cycles, .. }) => assert_eq!(*total_cycles, 1),
        other => panic!("expected finished, got {other:?}"),
    }

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("session did not stop");
    assert_eq!(outcome, SessionOutcome::Finished { total_cycles: 1 });
}

#[tokio::test]
async fn test_stop_during_batch_delay() {
    let provider = Arc::new(MockProvider::new());
    let config = ScannerConfig {
        batch_delay_ms: 60_000,
        ..fast_config(1)
    };
    let orchestrator = orchestrator(provider.clone(), config);
    let session = orchestrator.prepare(&ScanRequest::with_symbols(["GME", "AMC"])).unwrap();
    let (tx, mut rx) = mpsc::channel(64);
    let handle = orchestrator.spawn(session, Arc::new(tx));

    // wait for the first batch to finish, then stop while the scheduler sleeps
    while let Some(event) = rx.recv().await {
        if matches!(event, ScanEvent::Progress { percentage: 50, .. }) {
            break;
        }
    }
    handle.stop();

    let rest = drain(rx).await;
    assert_eq!(names(&rest), ["scan-finished"]);
    assert_eq!(provider.call_count(), 1);

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.join()).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Finished { total_cycles: 0 });
}

#[tokio::test]
async fn test_stop_during_item_stagger() {
    let provider = Arc::new(MockProvider::new());
    let config = ScannerConfig {
        item_stagger_ms: 500,
        ..fast_config(5)
    };
    let orchestrator = orchestrator(provider, config);
    let session = orchestrator.prepare(&ScanRequest::with_symbols(symbols(5))).unwrap();
    let (tx, mut rx) = mpsc::channel(64);
    let handle = orchestrator.spawn(session, Arc::new(tx));

    let mut seen = Vec::new();
    while let Some(event) = rx.recv().await {
        let update = matches!(event, ScanEvent::ItemUpdate { .. });
        seen.push(event);
        if update {
            break;
        }
    }
    handle.stop();
    assert_eq!(names(&seen), ["scan-started", "scan-progress", "scan-progress", "stock-update"]);

    let rest = drain(rx).await;
    assert_eq!(names(&rest), ["scan-finished"]);

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.join()).await.unwrap();
    assert_eq!(outcome, SessionOutcome::Finished { total_cycles: 0 });
}

#[tokio::test]
async fn test_disconnect_during_wait_ends_session() {
    let provider = Arc::new(MockProvider::new());
    let config = ScannerConfig {
        cycle_interval_secs: 30,
        ..fast_config(2)
    };
    let orchestrator = orchestrator(provider.clone(), config);

    let mut request = ScanRequest::with_symbols(["GME", "AMC", "TSLA"]);
    request.continuous = true;
    let session = orchestrator.prepare(&request).unwrap();
    let (tx, mut rx) = mpsc::channel(64);
    let handle = orchestrator.spawn(Arc::clone(&session), Arc::new(tx));

    while let Some(event) = rx.recv().await {
        if matches!(event, ScanEvent::Waiting { .. }) {
            break;
        }
    }
    drop(rx);

    // well inside the 30 s interval
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .expect("session kept sleeping after the subscriber left");
    assert_eq!(outcome, SessionOutcome::Finished { total_cycles: 1 });
    assert!(session.is_cancelled());
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_subscriber_disconnect_stops_session() {
    let provider = Arc::new(MockProvider::new());
    let config = ScannerConfig {
        cycle_interval_secs: 30,
        ..fast_config(1)
    };
    let orchestrator = orchestrator(provider, config);

    let mut request = ScanRequest::with_symbols(symbols(4));
    request.continuous = true;
    let session = orchestrator.prepare(&request).unwrap();
    let (tx, mut rx) = mpsc::channel(1);
    let handle = orchestrator.spawn(session, Arc::new(tx));

    let first = rx.recv().await.unwrap();
    assert_eq!(first.event_name(), "scan-started");
    drop(rx);

    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.join()).await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Finished { .. }));
}

#[tokio::test]
async fn test_broadcast_subscribers_see_same_events() {
    let provider = Arc::new(MockProvider::new());
    let orchestrator = orchestrator(provider, fast_config(2));
    let session = orchestrator.prepare(&ScanRequest::with_symbols(["GME", "AMC"])).unwrap();

    let (tx, mut rx1) = broadcast::channel(64);
    let mut rx2 = tx.subscribe();

    let outcome = orchestrator.run(session, Arc::new(tx)).await;
    assert_ok!(match outcome {
        SessionOutcome::Finished { total_cycles: 1 } => Ok(()),
        other => Err(other),
    });

    let mut first = Vec::new();
    while let Ok(event) = rx1.recv().await {
        first.push(event.event_name());
    }
    let mut second = Vec::new();
    while let Ok(event) = rx2.recv().await {
        second.push(event.event_name());
    }

    assert_eq!(first, second);
    assert_eq!(first.last(), Some(&"scan-finished"));
}
