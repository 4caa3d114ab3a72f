//! End-to-end cycle tests: events in, hints out, outcomes scored,
//! history persisted and restored by a second engine.

use async_trait::async_trait;
use foresight::{EngineConfig, PrefetchEngine};
use tokio_test::assert_ok;
use foresight_core::{
    BandwidthClass, Bounds, ElementSnapshot, FetchResult, HintSink, HistoryStore, NetworkContext,
    NetworkProbe, PersistedState, RenderingPort, ResourceKind, ResourceRef, Result, TelemetrySink,
    ViewportWindow,
};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

struct StaticPage {
    elements: Vec<ElementSnapshot>,
}

impl RenderingPort for StaticPage {
    fn visible_elements(&self, window: &ViewportWindow) -> Vec<ElementSnapshot> {
        self.elements
            .iter()
            .filter(|e| window.intersects(&e.bounds))
            .cloned()
            .collect()
    }

    fn viewport_height(&self) -> f64 {
        600.0
    }
}

struct StaticProbe(NetworkContext);

impl NetworkProbe for StaticProbe {
    fn snapshot(&self) -> NetworkContext {
        self.0
    }
}

#[derive(Default)]
struct CountingSink {
    issued: Mutex<Vec<String>>,
}

#[async_trait]
impl HintSink for CountingSink {
    async fn issue_preload(&self, url: &str, _kind: ResourceKind) -> FetchResult {
        self.issued.lock().unwrap().push(url.to_string());
        FetchResult::Completed { bytes: 4096 }
    }

    async fn issue_prefetch(&self, url: &str) -> FetchResult {
        self.issued.lock().unwrap().push(url.to_string());
        FetchResult::Completed { bytes: 4096 }
    }

    fn warm_connection(&self, _url: &str) {}
}

#[derive(Default)]
struct SharedStore(RwLock<Option<PersistedState>>);

#[async_trait]
impl HistoryStore for SharedStore {
    async fn load(&self) -> Result<Option<PersistedState>> {
        Ok(self.0.read().unwrap().clone())
    }

    async fn save(&self, state: &PersistedState) -> Result<()> {
        *self.0.write().unwrap() = Some(state.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CountingTelemetry {
    events: Mutex<Vec<String>>,
}

impl TelemetrySink for CountingTelemetry {
    fn report(&self, event: &str, _payload: serde_json::Value) {
        self.events.lock().unwrap().push(event.to_string());
    }
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        prediction_interval_ms: 20,
        learning_interval_ms: 60,
        ..Default::default()
    }
}

fn image_at(url: &str, top: f64) -> ElementSnapshot {
    ElementSnapshot {
        tag: "img".into(),
        bounds: Bounds::new(top, top + 300.0),
        resources: vec![ResourceRef::new(url.to_string(), ResourceKind::Image)],
        ..Default::default()
    }
}

fn build_engine(
    elements: Vec<ElementSnapshot>,
    sink: Arc<CountingSink>,
    store: Arc<SharedStore>,
    telemetry: Arc<CountingTelemetry>,
) -> Arc<PrefetchEngine> {
    Arc::new(PrefetchEngine::new(
        fast_config(),
        "/",
        Arc::new(StaticPage { elements }),
        Arc::new(StaticProbe(NetworkContext::new(
            BandwidthClass::High,
            40,
            false,
        ))),
        sink,
        store,
        telemetry,
    ))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[tokio::test]
async fn scroll_to_hint_to_hit_through_running_cycles() {
    let sink = Arc::new(CountingSink::default());
    let store = Arc::new(SharedStore::default());
    let telemetry = Arc::new(CountingTelemetry::default());
    let engine = build_engine(
        vec![image_at("/gallery/wide.webp", 9700.0)],
        sink.clone(),
        store.clone(),
        telemetry.clone(),
    );

    let runner = tokio::spawn(engine.clone().run());

    // A fast downward fling: ~8 px/ms
    let t = now_ms();
    engine.on_scroll(0.0, t);
    engine.on_scroll(800.0, t + 100);
    engine.on_scroll(1600.0, t + 200);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(sink
        .issued
        .lock()
        .unwrap()
        .contains(&"/gallery/wide.webp".to_string()));

    // The page uses the prefetched image from cache
    engine.on_resource_timing("/gallery/wide.webp", 0, 120_000, now_ms());

    tokio::time::sleep(Duration::from_millis(120)).await;
    runner.abort();

    assert!(engine.stats().hit_rate > 0.99);
    assert!(!telemetry.events.lock().unwrap().is_empty());
    let persisted = store.0.read().unwrap().clone().unwrap();
    assert_eq!(persisted.lifetime_hits, 1);
}

#[tokio::test]
async fn second_session_warm_starts_from_first() {
    let sink = Arc::new(CountingSink::default());
    let store = Arc::new(SharedStore::default());
    let telemetry = Arc::new(CountingTelemetry::default());

    // First session: learn a strong / -> /checkout habit
    let first = build_engine(Vec::new(), sink.clone(), store.clone(), telemetry.clone());
    for i in 0..9u64 {
        first.on_navigation("/checkout", 1000 + i * 10);
        first.on_navigation("/", 1005 + i * 10);
    }
    first.learning_tick().await;
    let persisted = assert_ok!(store.load().await);
    assert!(persisted.is_some());

    // Second session over the same store: the habit predicts
    let fresh_sink = Arc::new(CountingSink::default());
    let second = build_engine(Vec::new(), fresh_sink.clone(), store, telemetry);
    let runner = tokio::spawn(second.clone().run());

    tokio::time::sleep(Duration::from_millis(80)).await;
    runner.abort();

    assert!(fresh_sink
        .issued
        .lock()
        .unwrap()
        .contains(&"/checkout".to_string()));
}

#[tokio::test]
async fn save_data_gates_marginal_predictions() {
    let sink = Arc::new(CountingSink::default());
    let store = Arc::new(SharedStore::default());
    let engine = Arc::new(PrefetchEngine::new(
        fast_config(),
        "/",
        Arc::new(StaticPage {
            elements: vec![image_at("/banner.png", 9700.0)],
        }),
        Arc::new(StaticProbe(NetworkContext::new(
            BandwidthClass::High,
            40,
            true, // save-data requested
        ))),
        sink.clone(),
        store,
        Arc::new(CountingTelemetry::default()),
    ));

    let runner = tokio::spawn(engine.clone().run());

    // The same fling that fires on the fast profile scores 0.8,
    // under the save-data threshold of 0.9
    let t = now_ms();
    engine.on_scroll(0.0, t);
    engine.on_scroll(800.0, t + 100);
    engine.on_scroll(1600.0, t + 200);

    tokio::time::sleep(Duration::from_millis(80)).await;
    runner.abort();

    assert!(sink.issued.lock().unwrap().is_empty());
}
