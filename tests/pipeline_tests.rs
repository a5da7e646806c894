//! End-to-end pipeline scenarios against in-process stores.

use quadloader::pipeline::{CounterSnapshot, Counters, Pipeline, PipelineError, PipelineTuning, Sampler};
use quadloader::store::{GraphStore, MemoryStore, NodeHandle, Props, SqliteStore, StoreStats};
use quadloader::utils::config::{ENTITY_LABEL, XID_KEY};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

fn tuning(window: usize, sample_mod: u64, parsers: usize, executors: usize) -> PipelineTuning {
    PipelineTuning {
        sample_mod,
        window,
        parser_threads: parsers,
        executor_threads: executors,
        line_channel_cap: 64,
        quad_channel_cap: 64,
        telemetry_interval: Duration::from_millis(20),
        seed: Some(7),
    }
}

fn run(t: PipelineTuning, input: String, store: Arc<dyn GraphStore>) -> (Result<u64, PipelineError>, Arc<Counters>) {
    let pipeline = Pipeline::new(t);
    let counters = pipeline.counters();
    (pipeline.run(Cursor::new(input), store), counters)
}

fn node(store: &MemoryStore, xid: &str) -> NodeHandle {
    store
        .find_node(ENTITY_LABEL, XID_KEY, xid)
        .unwrap_or_else(|| panic!("missing node {xid}"))
}

// --- scenarios ---

#[test]
fn test_alice_knows_bob() {
    let input = "<a> <name> \"Alice\" .\n<a> <knows> <b> .\n<b> <name> \"Bob\" .\n".to_string();
    let store = Arc::new(MemoryStore::new());
    let (res, counters) = run(tuning(1, 1, 2, 4), input, store.clone());
    assert_eq!(res.unwrap(), 3);
    assert_eq!(counters.processed(), 3);

    let (a, b) = (node(&store, "a"), node(&store, "b"));
    assert_eq!(store.stats().unwrap(), StoreStats { nodes: 2, edges: 1 });
    assert_eq!(store.properties_of(a).get("name").map(String::as_str), Some("Alice"));
    assert_eq!(store.properties_of(b).get("name").map(String::as_str), Some("Bob"));
    assert!(store.has_edge(a, "knows", b));
    assert!(!store.has_edge(b, "knows", a));
}

#[test]
fn test_counters_balance_after_sampled_load() {
    let n = 600;
    let input: String = (0..n)
        .map(|i| format!("<s{}> <p{}> \"v{}\" .\n", i % 97, i % 5, i))
        .collect();
    let store = Arc::new(MemoryStore::new());
    let (res, counters) = run(tuning(64, 3, 3, 16), input, store.clone());
    let processed = res.unwrap();

    let snap = counters.snapshot();
    assert_eq!(snap.read, n as u64);
    assert_eq!(snap.parsed, n as u64);
    assert_eq!(snap.processed + snap.ignored, snap.parsed);
    assert_eq!(snap.processed, processed);

    let sampler = Sampler::new(3);
    let want = (0..n).filter(|i| sampler.accept(&format!("s{}", i % 97))).count() as u64;
    assert_eq!(processed, want);
}

#[test]
fn test_mod_one_ignores_nothing() {
    let input: String = (0..300).map(|i| format!("<s{i}> <link> <s{}> .\n", i + 1)).collect();
    let store = Arc::new(MemoryStore::new());
    let (res, counters) = run(tuning(32, 1, 2, 8), input, store.clone());
    assert_eq!(res.unwrap(), 300);
    assert_eq!(counters.ignored(), 0);
    assert_eq!(store.stats().unwrap(), StoreStats { nodes: 301, edges: 300 });
}

#[test]
fn test_skipped_lines_keep_counters_equal() {
    let input = "# comment\n\n<a> <p> <b> .\n   \n<b> <p> <c> .\n".to_string();
    let store = Arc::new(MemoryStore::new());
    let (res, counters) = run(tuning(8, 1, 1, 2), input, store);
    assert_eq!(res.unwrap(), 2);
    assert_eq!(counters.read(), 2);
    assert_eq!(counters.parsed(), 2);
}

#[test]
fn test_empty_input() {
    let store = Arc::new(MemoryStore::new());
    let (res, counters) = run(tuning(8, 1, 2, 2), String::new(), store);
    assert_eq!(res.unwrap(), 0);
    assert_eq!(counters.snapshot(), CounterSnapshot::default());
}

#[test]
fn test_malformed_line_aborts_with_line_number() {
    let input = "<a> <p> <b> .\n<b> <p> <c> .\n<c> <p> c .\n<d> <p> <e> .\n".to_string();
    let store = Arc::new(MemoryStore::new());
    let (res, counters) = run(tuning(1, 1, 1, 2), input, store);
    match res {
        Err(PipelineError::Parse { line, input, .. }) => {
            assert_eq!(line, 3);
            assert_eq!(input, "<c> <p> c .");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    let snap = counters.snapshot();
    // The bad line was consumed but never parsed.
    assert!(snap.read >= 3);
    assert!(snap.parsed < snap.read);
    assert!(snap.parsed <= 3);
}

#[test]
fn test_parse_error_with_large_pools_does_not_hang() {
    let mut input: String = (0..5000).map(|i| format!("<s{i}> <p> \"v\" .\n")).collect();
    input.push_str("not a quad\n");
    input.extend((0..5000).map(|i| format!("<t{i}> <p> \"v\" .\n")));
    let store = Arc::new(MemoryStore::new());
    let (res, _) = run(tuning(128, 1, 4, 64), input, store);
    assert!(matches!(res, Err(PipelineError::Parse { line: 5001, .. })));
}

// --- store failures ---

/// Memory store that refuses one subject.
struct FailingStore {
    inner: MemoryStore,
    poison: &'static str,
}

impl GraphStore for FailingStore {
    fn get_or_create_node(&self, label: &str, key: &str, value: &str) -> quadloader::Result<(NodeHandle, bool)> {
        if value == self.poison {
            anyhow::bail!("store unavailable");
        }
        self.inner.get_or_create_node(label, key, value)
    }
    fn relate(&self, src: NodeHandle, label: &str, dst: NodeHandle, props: &Props) -> quadloader::Result<()> {
        self.inner.relate(src, label, dst, props)
    }
    fn get_properties(&self, node: NodeHandle) -> quadloader::Result<Props> {
        self.inner.get_properties(node)
    }
    fn set_properties(&self, node: NodeHandle, props: &Props) -> quadloader::Result<()> {
        self.inner.set_properties(node, props)
    }
    fn stats(&self) -> quadloader::Result<StoreStats> {
        self.inner.stats()
    }
}

#[test]
fn test_store_error_aborts_with_subject() {
    let mut input: String = (0..2000).map(|i| format!("<s{i}> <p> \"v\" .\n")).collect();
    input.push_str("<boom> <p> \"v\" .\n");
    let store = Arc::new(FailingStore {
        inner: MemoryStore::new(),
        poison: "boom",
    });
    let (res, counters) = run(tuning(16, 1, 2, 8), input, store);
    match res {
        Err(PipelineError::Store { subject, message }) => {
            assert_eq!(subject, "boom");
            assert!(message.contains("store unavailable"));
        }
        other => panic!("expected store error, got {other:?}"),
    }
    let snap = counters.snapshot();
    assert!(snap.processed + snap.ignored < snap.parsed);
}

#[test]
fn test_default_merge_property_goes_through_get_and_set() {
    let input = "<a> <name> \"Alice\" .\n<a> <age> \"30\" .\n".to_string();
    let store = Arc::new(FailingStore {
        inner: MemoryStore::new(),
        poison: "-",
    });
    let (res, _) = run(tuning(1, 1, 1, 1), input, store.clone());
    assert_eq!(res.unwrap(), 2);
    let a = store.inner.find_node(ENTITY_LABEL, XID_KEY, "a").unwrap();
    let props = store.inner.properties_of(a);
    assert_eq!(props.get("name").map(String::as_str), Some("Alice"));
    assert_eq!(props.get("age").map(String::as_str), Some("30"));
}

/// Store whose node resolution always panics.
struct PanickingStore;

impl GraphStore for PanickingStore {
    fn get_or_create_node(&self, _label: &str, _key: &str, value: &str) -> quadloader::Result<(NodeHandle, bool)> {
        panic!("store blew up on {value}");
    }
    fn relate(&self, _src: NodeHandle, _label: &str, _dst: NodeHandle, _props: &Props) -> quadloader::Result<()> {
        Ok(())
    }
    fn get_properties(&self, _node: NodeHandle) -> quadloader::Result<Props> {
        Ok(Props::new())
    }
    fn set_properties(&self, _node: NodeHandle, _props: &Props) -> quadloader::Result<()> {
        Ok(())
    }
    fn stats(&self) -> quadloader::Result<StoreStats> {
        Ok(StoreStats::default())
    }
}

#[test]
fn test_panicking_executors_abort_instead_of_hanging() {
    let input: String = (0..1000).map(|i| format!("<s{i}> <p> \"v\" .\n")).collect();
    let mut t = tuning(1, 1, 1, 2);
    t.line_channel_cap = 4;
    t.quad_channel_cap = 4;
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let res = Pipeline::new(t).run(Cursor::new(input), Arc::new(PanickingStore));
        let _ = done_tx.send(res);
    });
    let res = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("pipeline still blocked after every executor panicked");
    assert!(matches!(res, Err(PipelineError::Panicked { stage: "executor" })));
}

// --- backpressure / cancellation ---

/// Store whose calls block until the test drops the gate sender.
struct GatedStore {
    inner: MemoryStore,
    gate: crossbeam_channel::Receiver<()>,
    delay: Duration,
}

impl GatedStore {
    fn wait(&self) {
        let _ = self.gate.recv();
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

impl GraphStore for GatedStore {
    fn get_or_create_node(&self, label: &str, key: &str, value: &str) -> quadloader::Result<(NodeHandle, bool)> {
        self.wait();
        self.inner.get_or_create_node(label, key, value)
    }
    fn relate(&self, src: NodeHandle, label: &str, dst: NodeHandle, props: &Props) -> quadloader::Result<()> {
        self.inner.relate(src, label, dst, props)
    }
    fn get_properties(&self, node: NodeHandle) -> quadloader::Result<Props> {
        self.inner.get_properties(node)
    }
    fn set_properties(&self, node: NodeHandle, props: &Props) -> quadloader::Result<()> {
        self.inner.set_properties(node, props)
    }
    fn merge_property(&self, node: NodeHandle, name: &str, value: &str) -> quadloader::Result<()> {
        self.inner.merge_property(node, name, value)
    }
    fn stats(&self) -> quadloader::Result<StoreStats> {
        self.inner.stats()
    }
}

#[test]
fn test_stalled_store_backs_up_to_the_reader() {
    let n = 5000_u64;
    let input: String = (0..n).map(|i| format!("<s{i}> <p> \"v\" .\n")).collect();
    let (release, gate) = crossbeam_channel::bounded::<()>(0);
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gate,
        delay: Duration::ZERO,
    });
    let mut t = tuning(1, 1, 1, 1);
    t.line_channel_cap = 4;
    t.quad_channel_cap = 4;

    let counters = Arc::new(Counters::new());
    let pipeline = Pipeline::new(t).with_counters(Arc::clone(&counters));
    let store_dyn: Arc<dyn GraphStore> = store.clone();
    let handle = thread::spawn(move || pipeline.run(Cursor::new(input), store_dyn));

    thread::sleep(Duration::from_millis(300));
    let stalled = counters.snapshot();
    // executor(1) + quad channel(4) + parser(1) + line channel(4) + reader(1) + window(1)
    assert!(stalled.read <= 12, "reader kept going: {stalled:?}");
    assert_eq!(stalled.processed, 0);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(counters.read(), stalled.read);

    drop(release);
    assert_eq!(handle.join().unwrap().unwrap(), n);
    assert_eq!(counters.read(), n);
}

#[test]
fn test_cancel_flag_stops_the_load() {
    let input: String = (0..20_000).map(|i| format!("<s{i}> <p> \"v\" .\n")).collect();
    let (release, gate) = crossbeam_channel::bounded::<()>(0);
    drop(release);
    let store = Arc::new(GatedStore {
        inner: MemoryStore::new(),
        gate,
        delay: Duration::from_millis(2),
    });
    let cancel = Arc::new(AtomicBool::new(true));
    let pipeline = Pipeline::new(tuning(16, 1, 2, 4)).with_cancel(cancel);
    let counters = pipeline.counters();
    let res = pipeline.run(Cursor::new(input), store);
    assert!(matches!(res, Err(PipelineError::Cancelled)));
    assert!(counters.processed() < 20_000);
}

// --- idempotent node resolution under contention ---

#[test]
fn test_hot_subjects_resolve_to_one_node_each() {
    let input: String = (0..3000)
        .map(|i| format!("<hot{}> <rel> <hot{}> .\n", i % 3, (i + 1) % 3))
        .collect();

    let mem = Arc::new(MemoryStore::new());
    let (res, _) = run(tuning(4, 1, 4, 32), input.clone(), mem.clone());
    assert_eq!(res.unwrap(), 3000);
    assert_eq!(mem.stats().unwrap(), StoreStats { nodes: 3, edges: 3 });

    let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
    let (res, _) = run(tuning(4, 1, 4, 32), input, sql.clone());
    assert_eq!(res.unwrap(), 3000);
    assert_eq!(sql.stats().unwrap(), StoreStats { nodes: 3, edges: 3 });
}
