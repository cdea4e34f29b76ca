//! Aggregated search across several mocked sources

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use vodhub_core::{
    AggregatorConfig, CancellationToken, SearchAggregator, SearchResultItem, SourceDescriptor,
    StaticRegistry, VodError,
};
use wiremock::{MockServer, ResponseTemplate};

use common::*;

type Batches = Arc<Mutex<Vec<Vec<SearchResultItem>>>>;

fn aggregator(server: &MockServer, timeout: Duration, concurrency: usize) -> SearchAggregator {
    SearchAggregator::with_client(
        relayed_client(server, timeout),
        AggregatorConfig { concurrency },
    )
}

fn collecting_sink() -> (Batches, impl FnMut(Vec<SearchResultItem>) + Send + 'static) {
    let batches: Batches = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let batches = Arc::clone(&batches);
        move |batch: Vec<SearchResultItem>| batches.lock().unwrap().push(batch)
    };
    (batches, sink)
}

fn keys(batches: &Batches) -> Vec<(String, String)> {
    batches
        .lock()
        .unwrap()
        .iter()
        .flatten()
        .map(|item| (item.source_id.clone(), item.item_id.clone()))
        .collect()
}

// ----------------------------------------------------------------------------
// Failure isolation
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_only_healthy_source_contributes() {
    let server = MockServer::start().await;
    let slow = source("slow");
    let broken = source("broken");
    let good = source("good");

    mount_search(
        &server,
        &slow,
        "earth",
        list_response(vec![record(1, "Never")]).set_delay(Duration::from_secs(3)),
    )
    .await;
    mount_search(
        &server,
        &broken,
        "earth",
        ResponseTemplate::new(200).set_body_string("not json at all"),
    )
    .await;
    mount_search(
        &server,
        &good,
        "earth",
        list_response(vec![record(1, "Earth"), record(2, "Earth II")]),
    )
    .await;

    let aggregator = aggregator(&server, Duration::from_millis(300), 3);
    let (batches, sink) = collecting_sink();
    let result = aggregator
        .search("earth", &[slow, broken, good], sink, None)
        .await;

    assert!(result.is_ok());
    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert!(batches[0].iter().all(|item| item.source_id == "good"));
    assert_eq!(batches[0][0].item_id, "1");
    assert_eq!(batches[0][1].item_id, "2");
}

#[tokio::test]
async fn test_all_sources_failing_resolves_empty() {
    let server = MockServer::start().await;
    let sources = vec![source("a"), source("b")];
    for source in &sources {
        mount_search(&server, source, "q", ResponseTemplate::new(500)).await;
    }

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let items = aggregator.search_all("q", &sources).await.unwrap();

    assert!(items.is_empty());
}

// ----------------------------------------------------------------------------
// Deduplication
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_duplicates_within_one_list_are_dropped() {
    let server = MockServer::start().await;
    let source = source("a");
    mount_search(
        &server,
        &source,
        "q",
        list_response(vec![record(1, "One"), record(2, "Two"), record(1, "One again")]),
    )
    .await;

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let (batches, sink) = collecting_sink();
    aggregator.search("q", &[source], sink, None).await.unwrap();

    let batches = batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    let titles: Vec<_> = batches[0].iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two"]);
}

#[tokio::test]
async fn test_same_source_id_listed_twice_is_deduplicated() {
    let server = MockServer::start().await;
    let primary = source("dup");
    let mirror = SourceDescriptor::new("dup", "Source DUP mirror", "http://mirror.dup.test");

    mount_search(
        &server,
        &primary,
        "q",
        list_response(vec![record(1, "One"), record(2, "Two")]),
    )
    .await;
    mount_search(
        &server,
        &mirror,
        "q",
        list_response(vec![record(2, "Two"), record(3, "Three")]),
    )
    .await;

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let (batches, sink) = collecting_sink();
    aggregator
        .search("q", &[primary, mirror], sink, None)
        .await
        .unwrap();

    let emitted = keys(&batches);
    let unique: HashSet<_> = emitted.iter().cloned().collect();
    assert_eq!(emitted.len(), 3);
    assert_eq!(unique.len(), 3);
    assert!(batches.lock().unwrap().iter().all(|batch| !batch.is_empty()));
}

#[tokio::test]
async fn test_same_item_id_on_different_sources_is_kept() {
    let server = MockServer::start().await;
    let a = source("a");
    let b = source("b");
    mount_search(&server, &a, "q", list_response(vec![record(7, "Seven")])).await;
    mount_search(&server, &b, "q", list_response(vec![record(7, "Seven")])).await;

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let (batches, sink) = collecting_sink();
    aggregator.search("q", &[a, b], sink, None).await.unwrap();

    let emitted: HashSet<_> = keys(&batches).into_iter().collect();
    assert_eq!(batches.lock().unwrap().len(), 2);
    assert!(emitted.contains(&("a".to_string(), "7".to_string())));
    assert!(emitted.contains(&("b".to_string(), "7".to_string())));
}

// ----------------------------------------------------------------------------
// Cancellation
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_cancel_from_sink_stops_further_batches() {
    let server = MockServer::start().await;
    let fast = source("fast");
    let late_one = source("late1");
    let late_two = source("late2");

    mount_search(&server, &fast, "q", list_response(vec![record(1, "Fast")])).await;
    for late in [&late_one, &late_two] {
        mount_search(
            &server,
            late,
            "q",
            list_response(vec![record(2, "Late")]).set_delay(Duration::from_secs(1)),
        )
        .await;
    }

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let token = CancellationToken::new();
    let calls = Arc::new(Mutex::new(0));
    let sink = {
        let calls = Arc::clone(&calls);
        let token = token.clone();
        move |_batch: Vec<SearchResultItem>| {
            *calls.lock().unwrap() += 1;
            token.cancel();
        }
    };

    let result = aggregator
        .search("q", &[fast, late_one, late_two], sink, Some(&token))
        .await;
    assert!(matches!(result, Err(VodError::Cancelled)));

    // Late sources still finish in the background but must not reach the sink
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_cancel_while_waiting_returns_promptly() {
    let server = MockServer::start().await;
    let slow = source("slow");
    mount_search(
        &server,
        &slow,
        "q",
        list_response(vec![record(1, "Slow")]).set_delay(Duration::from_secs(3)),
    )
    .await;

    let aggregator = aggregator(&server, Duration::from_secs(10), 3);
    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        })
    };

    let (batches, sink) = collecting_sink();
    let started = Instant::now();
    let result = aggregator.search("q", &[slow], sink, Some(&token)).await;
    canceller.await.unwrap();

    assert!(matches!(result, Err(VodError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dropping_search_future_silences_sink() {
    let server = MockServer::start().await;
    let slow = source("slow");
    mount_search(
        &server,
        &slow,
        "q",
        list_response(vec![record(1, "Slow")]).set_delay(Duration::from_millis(300)),
    )
    .await;

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let (batches, sink) = collecting_sink();
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        aggregator.search("q", &[slow], sink, None),
    )
    .await;
    assert!(outcome.is_err());

    // The upstream answers after the caller gave up; nothing may reach the sink
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(batches.lock().unwrap().is_empty());
}

// ----------------------------------------------------------------------------
// Concurrency and sinks
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_concurrency_cap_bounds_parallelism() {
    let server = MockServer::start().await;
    let sources: Vec<_> = (0..6).map(|i| source(&format!("s{}", i))).collect();
    for (i, source) in sources.iter().enumerate() {
        mount_search(
            &server,
            source,
            "q",
            list_response(vec![record(i as u64, "Item")]).set_delay(Duration::from_millis(200)),
        )
        .await;
    }

    let aggregator = aggregator(&server, Duration::from_secs(5), 2);
    let (batches, sink) = collecting_sink();
    let started = Instant::now();
    aggregator.search("q", &sources, sink, None).await.unwrap();

    // Six 200ms calls, two at a time: at least three rounds
    assert!(started.elapsed() >= Duration::from_millis(550));
    assert_eq!(batches.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_channel_sink_receives_batches() {
    let server = MockServer::start().await;
    let a = source("a");
    let b = source("b");
    mount_search(&server, &a, "q", list_response(vec![record(1, "One")])).await;
    mount_search(
        &server,
        &b,
        "q",
        list_response(vec![record(2, "Two"), record(3, "Three")]),
    )
    .await;

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    aggregator.search("q", &[a, b], tx, None).await.unwrap();

    let mut sizes = Vec::new();
    while let Ok(batch) = rx.try_recv() {
        sizes.push(batch.len());
    }
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2]);
}

#[tokio::test]
async fn test_search_all_sorts_by_title_then_source() {
    let server = MockServer::start().await;
    let a = source("a");
    let b = source("b");
    mount_search(
        &server,
        &a,
        "q",
        list_response(vec![record(1, "Zulu"), record(2, "Alpha")]),
    )
    .await;
    mount_search(&server, &b, "q", list_response(vec![record(3, "Alpha")])).await;

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let items = aggregator.search_all("q", &[b, a]).await.unwrap();

    let order: Vec<_> = items
        .iter()
        .map(|i| (i.title.as_str(), i.source_id.as_str()))
        .collect();
    assert_eq!(order, vec![("Alpha", "a"), ("Alpha", "b"), ("Zulu", "a")]);
}

#[tokio::test]
async fn test_search_enabled_skips_disabled_sources() {
    let server = MockServer::start().await;
    let json = r#"[
        {"id": "on", "name": "On", "url": "http://on.test"},
        {"id": "off", "name": "Off", "url": "http://off.test", "isEnabled": false}
    ]"#;
    let registry = StaticRegistry::from_json(json).unwrap();
    mount_search(&server, &source("on"), "q", list_response(vec![record(1, "On item")])).await;
    mount_search(&server, &source("off"), "q", list_response(vec![record(2, "Off item")])).await;

    let aggregator = aggregator(&server, Duration::from_secs(5), 3);
    let (batches, sink) = collecting_sink();
    aggregator
        .search_enabled("q", &registry, sink, None)
        .await
        .unwrap();

    let emitted = keys(&batches);
    assert_eq!(emitted, vec![("on".to_string(), "1".to_string())]);
}
