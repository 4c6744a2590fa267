use std::sync::Arc;
use std::thread;

use tempfile::tempdir;
use time::macros::datetime;
use time::OffsetDateTime;
use trendwatch_core::persist::{load_snapshot, save_snapshot};
use trendwatch_core::{DatasetSnapshot, DatasetStore, Error, InvertedIndex, SearchEngine, VideoRecord};

fn video(id: &str, title: &str, views: u64, published_at: OffsetDateTime) -> VideoRecord {
    VideoRecord {
        id: id.into(),
        title: title.into(),
        description: format!("{title} description"),
        channel: "demo".into(),
        published_at,
        view_count: views,
        like_count: views / 10,
        comment_count: 3,
        duration_secs: 42,
        url: VideoRecord::watch_url(id),
        thumbnail_url: VideoRecord::default_thumbnail(id),
    }
}

fn dataset(titles: &[(&str, &str, u64)], created_at: OffsetDateTime) -> DatasetSnapshot {
    let records: Vec<VideoRecord> = titles
        .iter()
        .map(|(id, title, views)| video(id, title, *views, datetime!(2025-02-01 00:00 UTC)))
        .collect();
    DatasetSnapshot::assemble("shorts", 10, created_at, records.len() as u64, records).unwrap()
}

#[test]
fn search_over_a_reloaded_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shorts.twds");
    let snap = dataset(
        &[("1", "AI makeup tutorial", 500), ("2", "AI cat shorts", 9000)],
        datetime!(2025-02-02 00:00 UTC),
    );
    save_snapshot(&path, &snap).unwrap();
    assert_eq!(load_snapshot(&path).unwrap().records(), snap.records());

    let engine = SearchEngine::new(Arc::new(DatasetStore::open(&path).unwrap()));
    let ids: Vec<String> = engine.search("ai", 10).unwrap().results.into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec!["2", "1"]);
    assert!(engine.search("zebra", 5).unwrap().results.is_empty());
    assert!(matches!(engine.search("", 5), Err(Error::InvalidArgument(_))));
    assert!(matches!(engine.fetch("nonexistent"), Err(Error::NotFound(_))));
}

#[test]
fn identical_searches_return_identical_results() {
    let snap = dataset(
        &[
            ("a", "cat video", 10),
            ("b", "cat video", 10),
            ("c", "dog video", 10),
            ("d", "cat and dog video", 5),
        ],
        datetime!(2025-02-02 00:00 UTC),
    );
    let index = InvertedIndex::build(&snap);
    let engine = SearchEngine::new(Arc::new(DatasetStore::new(snap, index).unwrap()));
    let first = engine.search("cat dog", 10).unwrap();
    for _ in 0..20 {
        assert_eq!(engine.search("cat dog", 10).unwrap(), first);
    }
    let ids: Vec<&str> = first.results.iter().map(|h| h.id.as_str()).collect();
    // "d" matches both words; the rest tie on views and time, so ids decide.
    assert_eq!(ids, vec!["d", "a", "b", "c"]);
}

#[test]
fn searches_during_replace_see_whole_pairs() {
    // Generation N holds N+1 records all titled "clip", so a search's
    // total_hits must equal the size of the snapshot it came from.
    let build = |n: usize| {
        let titles: Vec<(String, u64)> = (0..=n).map(|k| (format!("v{k}"), k as u64)).collect();
        let refs: Vec<(&str, &str, u64)> = titles.iter().map(|(id, v)| (id.as_str(), "clip", *v)).collect();
        let created = datetime!(2025-02-02 00:00 UTC) + time::Duration::seconds(n as i64);
        let snap = dataset(&refs, created);
        let index = InvertedIndex::build(&snap);
        (snap, index)
    };
    let (s, i) = build(0);
    let store = Arc::new(DatasetStore::new(s, i).unwrap());
    let engine = SearchEngine::new(store.clone());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let pair = engine.store().current();
                    let r = trendwatch_core::search::search_pair(&pair, "clip", 1000).unwrap();
                    assert_eq!(r.total_hits, pair.snapshot.len());
                    assert_eq!(r.results.len(), pair.snapshot.len());
                }
            })
        })
        .collect();
    for n in 1..40 {
        let (s, i) = build(n);
        store.replace(s, i).unwrap();
    }
    for w in workers {
        w.join().unwrap();
    }
}
