//! 多服务器聚合搜索的集成测试。

mod common;

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use common::{closed_server, item, Stub};
use flixsearch::{Aggregator, FailureKind, SearchError, SearchQuery, ServerProgress};

fn aggregator(servers: Vec<flixsearch::ServerConfig>, timeout_ms: u64) -> Aggregator {
    Aggregator::new(servers, Duration::from_millis(timeout_ms)).unwrap()
}

#[tokio::test]
async fn test_one_success_one_timeout() {
    let a = Stub::items(
        "A",
        vec![
            item("/A/Movies/Heat.mkv", Some(1500)),
            item("/A/Music/Numb.mp3", None),
        ],
    )
    .spawn()
    .await;
    let b = Stub::items("B", vec![item("/B/Movies/Late.mkv", None)])
        .delayed(Duration::from_secs(5))
        .spawn()
        .await;

    let started = Instant::now();
    let outcome = aggregator(vec![a, b], 300)
        .search("heat", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(outcome.total_files(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].server(), "B");
    assert_eq!(outcome.failures[0].kind(), FailureKind::Timeout);
}

#[tokio::test]
async fn test_all_servers_failing_is_empty_not_fatal() {
    let servers = vec![
        Stub::status("A", 500).spawn().await,
        Stub::garbage("B").spawn().await,
        closed_server("C").await,
    ];

    let outcome = aggregator(servers, 2_000)
        .search("matrix", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(outcome.is_empty());
    assert_eq!(outcome.summary(), "未找到结果");
    let kinds: Vec<_> = outcome
        .failures
        .iter()
        .map(|f| (f.server().to_string(), f.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("A".to_string(), FailureKind::Unreachable),
            ("B".to_string(), FailureKind::BadResponse),
            ("C".to_string(), FailureKind::Unreachable),
        ]
    );
}

#[tokio::test]
async fn test_results_are_normalized_filtered_and_grouped() {
    let a = Stub::items(
        "A",
        vec![
            item("/A/English/The%20Matrix.mkv", Some(1_073_741_824)),
            item("/A/English/The%20Matrix.srt", Some(10)),
            item("/Hindi/Dhoom.mp4", None),
            item("", None),
            serde_json::json!({ "size": 12 }),
        ],
    )
    .spawn()
    .await;
    let b = Stub::items("B", vec![item("/B/English/Heat.MKV", Some(1500))])
        .spawn()
        .await;
    let base_a = a.base_url.trim_end_matches('/').to_string();

    let outcome = aggregator(vec![a, b], 2_000)
        .search("e", &CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(outcome.failures.is_empty());
    let folders: Vec<_> = outcome.groups.iter().map(|g| g.folder_name.as_str()).collect();
    assert_eq!(folders, ["English", "Hindi"]);

    let english = &outcome.groups[0];
    assert_eq!(english.files.len(), 2);
    assert_eq!(english.files[0].file_name, "The Matrix.mkv");
    assert_eq!(english.files[0].size_label, "1.0 GB");
    assert_eq!(english.files[0].download_url, format!("{}/English/The%20Matrix.mkv", base_a));
    assert_eq!(english.files[1].source_server, "B");
    assert_eq!(english.files[1].extension, ".mkv");
    assert_eq!(english.files[1].size_label, "1.5 KB");

    let hindi = &outcome.groups[1].files[0];
    assert_eq!(hindi.download_url, format!("{}/Hindi/Dhoom.mp4", base_a));
    assert_eq!(hindi.size_label, "Unknown");
}

#[tokio::test]
async fn test_merge_is_independent_of_completion_order() {
    let slow_first = Stub::items("A", vec![item("/A/X/one.mkv", None)])
        .delayed(Duration::from_millis(300))
        .spawn()
        .await;
    let fast_second = Stub::items("B", vec![item("/B/X/two.mkv", None)]).spawn().await;

    let outcome = aggregator(vec![slow_first, fast_second], 2_000)
        .search("o", &CancellationToken::new(), None)
        .await
        .unwrap();

    let names: Vec<_> = outcome.files().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, ["one.mkv", "two.mkv"]);
}

#[tokio::test]
async fn test_progress_notifications_per_server() {
    let a = Stub::items("A", vec![item("/A/X/one.mkv", None), item("/A/X/n.txt", None)])
        .spawn()
        .await;
    let b = closed_server("B").await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    aggregator(vec![a, b], 2_000)
        .search("one", &CancellationToken::new(), Some(tx))
        .await
        .unwrap();

    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices.sort_by(|x, y| x.server().cmp(y.server()));
    assert_eq!(notices.len(), 2);
    assert_eq!(
        notices[0],
        ServerProgress::Responded {
            server: "A".to_string(),
            received: 2,
            kept: 1,
        }
    );
    assert!(matches!(&notices[1], ServerProgress::Failed(f) if f.kind() == FailureKind::Unreachable));
}

#[tokio::test]
async fn test_cancel_stops_fan_out() {
    let slow = Stub::items("A", vec![item("/A/X/one.mkv", None)])
        .delayed(Duration::from_secs(5))
        .spawn()
        .await;
    let aggregator = aggregator(vec![slow], 10_000);
    let token = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let query = SearchQuery::new("one").unwrap();
    let result = aggregator.run(&query, &token, Some(tx)).await;

    assert!(matches!(result, Err(SearchError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_empty_query_rejected_before_fan_out() {
    let result = aggregator(Vec::new(), 1_000)
        .search("   ", &CancellationToken::new(), None)
        .await;
    assert!(matches!(result, Err(SearchError::EmptyQuery)));
}

#[tokio::test]
async fn test_case_sensitive_flag_is_sent() {
    // 桩服务器只校验字段类型，这里确认大小写开关能正常发出
    let a = Stub::items("A", vec![item("/A/X/One.mkv", None)]).spawn().await;
    let query = SearchQuery::new("One").unwrap().case_sensitive();
    assert!(!query.case_insensitive);

    let fan_out = aggregator(vec![a], 2_000)
        .run(&query, &CancellationToken::new(), None)
        .await
        .unwrap();
    assert_eq!(fan_out.results.len(), 1);
    assert!(fan_out.failures.is_empty());
}
