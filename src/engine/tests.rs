use super::*;
use crate::backend::fixtures::feed_with_items;
use crate::transport::ScriptedFailure;
use crate::transport::{MemoryTransport, TransportError};

fn engine_for(kind: BackendKind, transport: MemoryTransport) -> ParseEngine {
    ParseEngine::for_kind(kind, Arc::new(transport))
}

struct PanickingBackend;

impl FeedBackend for PanickingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Push
    }

    fn download_and_parse(
        &self,
        _url: &str,
        _transport: &dyn Transport,
        _events: &mut RunEvents,
    ) -> Result<(), TransportError> {
        panic!("backend bug");
    }
}

#[test]
fn test_batches_concatenate_to_parse_order() {
    for kind in BackendKind::ALL {
        for n in [0usize, 1, 9, 10, 11, 25] {
            let store = StatisticsStore::in_memory().unwrap();
            let transport = MemoryTransport::new(feed_with_items(n)).with_chunk_size(37);
            let mut engine = engine_for(kind, transport);
            let mut delegate = CollectingDelegate::default();
            let outcome = engine.run("memory:", &mut delegate, &store).unwrap();

            let delivered = delegate.items();
            assert_eq!(delivered.len(), n, "{} with {} items", kind, n);
            for (i, item) in delivered.iter().enumerate() {
                assert_eq!(item.title, Some(format!("Song {}", i)));
            }
            assert!(delegate.batches.iter().all(|b| !b.is_empty()));
            assert!(delegate.batches.iter().all(|b| b.len() <= DEFAULT_BATCH_THRESHOLD + 1));
            assert_eq!(outcome.item_count(), delivered.len());
            assert_eq!(store.count(kind).unwrap(), 1);
        }
    }
}

#[test]
fn test_batch_sizes_follow_threshold() {
    let store = StatisticsStore::in_memory().unwrap();
    let mut engine = engine_for(BackendKind::EventTree, MemoryTransport::new(feed_with_items(25)));
    let mut delegate = CollectingDelegate::default();
    engine.run("memory:", &mut delegate, &store).unwrap();
    let sizes: Vec<usize> = delegate.batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![11, 11, 3]);
}

#[test]
fn test_custom_threshold() {
    let store = StatisticsStore::in_memory().unwrap();
    let mut engine = ParseEngine::with_config(
        backend_for(BackendKind::Push),
        Arc::new(MemoryTransport::new(feed_with_items(7))),
        EngineConfig::default().with_batch_threshold(2),
    );
    let mut delegate = CollectingDelegate::default();
    engine.run("memory:", &mut delegate, &store).unwrap();
    let sizes: Vec<usize> = delegate.batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 3, 1]);
}

#[test]
fn test_durations_are_consistent() {
    for kind in BackendKind::ALL {
        let store = StatisticsStore::in_memory().unwrap();
        let transport = MemoryTransport::new(feed_with_items(40))
            .with_chunk_size(256)
            .with_delay(Duration::from_millis(1));
        let mut engine = engine_for(kind, transport);
        let mut delegate = CollectingDelegate::default();
        let outcome = engine.run("memory:", &mut delegate, &store).unwrap();

        let stat = *outcome.statistic().unwrap();
        assert_eq!(stat.backend, kind);
        assert!(stat.download_duration > 0.0);
        assert!(stat.parse_duration > 0.0);
        assert!(stat.download_duration + stat.parse_duration <= stat.total_duration + 1e-9);
        assert_eq!(delegate.completed, Some(stat));
        assert_eq!(store.samples(kind).unwrap(), vec![stat]);
    }
}

#[test]
fn test_transport_failure_records_nothing() {
    for kind in BackendKind::ALL {
        let store = StatisticsStore::in_memory().unwrap();
        let transport = MemoryTransport::failing(ScriptedFailure::Network("connection refused".into()));
        let mut engine = engine_for(kind, transport);
        let mut delegate = CollectingDelegate::default();
        let outcome = engine.run("memory:", &mut delegate, &store).unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Failed(RunError::Transport(TransportError::Network(_)))
        ));
        assert_eq!(engine.state(), RunState::Failed);
        assert!(delegate.failed.is_some());
        assert!(delegate.completed.is_none());
        assert_eq!(store.count(kind).unwrap(), 0);
    }
}

#[test]
fn test_mid_stream_failure_drops_unflushed_items() {
    let store = StatisticsStore::in_memory().unwrap();
    let feed = feed_with_items(30);
    let half = feed.len() / 2;
    let transport = MemoryTransport::from_chunks(vec![feed.as_bytes()[..half].to_vec()])
        .fail_after(1, ScriptedFailure::Status(503));
    let mut engine = engine_for(BackendKind::Push, transport);
    let mut delegate = CollectingDelegate::default();
    let outcome = engine.run("memory:", &mut delegate, &store).unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Failed(RunError::Transport(TransportError::Status(503)))
    ));
    // only full batches made it across before the failure
    assert!(delegate.batches.iter().all(|b| b.len() == DEFAULT_BATCH_THRESHOLD + 1));
    assert_eq!(store.count(BackendKind::Push).unwrap(), 0);
}

#[test]
fn test_security_failure_surfaces_by_default() {
    let store = StatisticsStore::in_memory().unwrap();
    let transport = MemoryTransport::failing(ScriptedFailure::Security("plain http".into()));
    let mut engine = engine_for(BackendKind::EventTree, transport);
    let outcome = engine
        .run("memory:", &mut CollectingDelegate::default(), &store)
        .unwrap();
    match outcome {
        RunOutcome::Failed(error) => assert!(error.is_security()),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_syntax_error_still_completes() {
    for kind in BackendKind::ALL {
        let store = StatisticsStore::in_memory().unwrap();
        let transport = MemoryTransport::new("<rss><item><title>T</title></item><item>");
        let mut engine = engine_for(kind, transport);
        let outcome = engine
            .run("memory:", &mut CollectingDelegate::default(), &store)
            .unwrap();
        match outcome {
            RunOutcome::Completed { syntax_errors, .. } => {
                assert_eq!(syntax_errors.len(), 1);
                assert_eq!(syntax_errors[0].backend, kind);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(store.count(kind).unwrap(), 1);
    }
}

#[test]
fn test_start_rejected_while_running() {
    let store = StatisticsStore::in_memory().unwrap();
    let transport = MemoryTransport::new(feed_with_items(3))
        .with_chunk_size(64)
        .with_delay(Duration::from_millis(20));
    let mut engine = engine_for(BackendKind::Push, transport);
    engine.start("memory:").unwrap();
    assert!(engine.state().is_active());
    assert!(matches!(engine.start("memory:"), Err(EngineError::RunInProgress)));

    let outcome = engine.wait(&mut CollectingDelegate::default(), &store).unwrap();
    assert!(outcome.statistic().is_some());
    assert_eq!(engine.state(), RunState::Completed);

    // a finished engine can run again
    engine.run("memory:", &mut CollectingDelegate::default(), &store).unwrap();
    assert_eq!(store.count(BackendKind::Push).unwrap(), 2);
}

#[test]
fn test_wait_without_run() {
    let store = StatisticsStore::in_memory().unwrap();
    let mut engine = engine_for(BackendKind::EventTree, MemoryTransport::new("<rss/>"));
    assert_eq!(engine.state(), RunState::Idle);
    assert!(matches!(
        engine.wait(&mut CollectingDelegate::default(), &store),
        Err(EngineError::NotStarted)
    ));
    engine.run("memory:", &mut CollectingDelegate::default(), &store).unwrap();
    assert!(matches!(
        engine.poll(&mut CollectingDelegate::default(), &store),
        Err(EngineError::NotStarted)
    ));
}

#[test]
fn test_poll_until_done() {
    let store = StatisticsStore::in_memory().unwrap();
    let transport = MemoryTransport::new(feed_with_items(15))
        .with_chunk_size(128)
        .with_delay(Duration::from_millis(1));
    let mut engine = engine_for(BackendKind::Push, transport);
    let mut delegate = CollectingDelegate::default();
    engine.start("memory:").unwrap();

    let outcome = loop {
        if let Some(outcome) = engine.poll(&mut delegate, &store).unwrap() {
            break outcome;
        }
        std::thread::sleep(Duration::from_millis(1));
    };
    assert_eq!(outcome.item_count(), 15);
    assert_eq!(delegate.items().len(), 15);
}

#[test]
fn test_download_notifications() {
    let store = StatisticsStore::in_memory().unwrap();
    let mut engine = engine_for(BackendKind::EventTree, MemoryTransport::new(feed_with_items(2)));
    let mut delegate = CollectingDelegate::default();
    engine.run("memory:", &mut delegate, &store).unwrap();
    assert_eq!(delegate.downloads, (1, 1));

    let transport = MemoryTransport::new(feed_with_items(2)).with_chunk_size(50);
    let chunks = transport.chunk_count();
    let mut engine = engine_for(BackendKind::Push, transport);
    let mut delegate = CollectingDelegate::default();
    engine.run("memory:", &mut delegate, &store).unwrap();
    // open, one wait per chunk, and the wait that sees the end of the stream
    assert_eq!(delegate.downloads, (chunks + 2, chunks + 2));
}

#[test]
fn test_worker_panic_is_a_failed_run() {
    let store = StatisticsStore::in_memory().unwrap();
    let mut engine = ParseEngine::new(Arc::new(PanickingBackend), Arc::new(MemoryTransport::new("")));
    let mut delegate = CollectingDelegate::default();
    let outcome = engine.run("memory:", &mut delegate, &store).unwrap();
    assert!(matches!(outcome, RunOutcome::Failed(RunError::WorkerPanicked)));
    assert_eq!(engine.state(), RunState::Failed);
    assert_eq!(store.count(BackendKind::Push).unwrap(), 0);
}

#[test]
fn test_drop_mid_run_joins_worker() {
    let transport = MemoryTransport::new(feed_with_items(50))
        .with_chunk_size(16)
        .with_delay(Duration::from_micros(100));
    let mut engine = ParseEngine::with_config(
        backend_for(BackendKind::Push),
        Arc::new(transport),
        EngineConfig {
            channel_capacity: 1,
            ..EngineConfig::default()
        },
    );
    engine.start("memory:").unwrap();
    drop(engine);
}

#[test]
fn test_unrecorded_run_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.sqlite");
    let store = StatisticsStore::open(&path).unwrap();
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("DROP TABLE statistic")
        .unwrap();

    let mut engine = engine_for(BackendKind::EventTree, MemoryTransport::new(feed_with_items(3)));
    let mut delegate = CollectingDelegate::default();
    let outcome = engine.run("memory:", &mut delegate, &store).unwrap();

    assert!(matches!(outcome, RunOutcome::Failed(RunError::Statistics(_))));
    assert_eq!(outcome.item_count(), 0);
    assert_eq!(engine.state(), RunState::Failed);
    assert!(delegate.completed.is_none());
    assert!(delegate.failed.as_deref().is_some_and(|m| m.starts_with("Statistics error")));
    // batches already delivered stay delivered
    assert_eq!(delegate.items().len(), 3);
}
