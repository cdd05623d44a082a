//! Metadata search through `SearchManager`.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tvrpc::search::{
    Catalog, Channel, Programme, Query, SearchError, SearchManager, SearchRequest,
    SEARCH_STATUS_ABORTED, SEARCH_STATUS_COMPLETED,
};

fn programme(id: &str, name: &str, start_time: i64) -> Programme {
    Programme {
        programme_id: id.into(),
        name: name.into(),
        description: String::new(),
        start_time,
        duration: 3600,
    }
}

struct Guide;

impl Catalog for Guide {
    fn channels(&self) -> Vec<Channel> {
        vec![
            Channel { ccid: "ccid:one".into(), name: "One".into(), hidden: false },
            Channel { ccid: "ccid:two".into(), name: "Two".into(), hidden: false },
        ]
    }

    fn programmes(&self, ccid: &str) -> Vec<Programme> {
        match ccid {
            "ccid:one" => vec![programme("1a", "Morning News", 1_000), programme("1b", "Quiz", 5_000)],
            "ccid:two" => vec![programme("2a", "Late News", 9_000)],
            _ => Vec::new(),
        }
    }
}

/// Catalog that blocks inside `programmes` until released.
struct Gate {
    entered: Mutex<Option<std_mpsc::Sender<()>>>,
    release: Mutex<std_mpsc::Receiver<()>>,
}

impl Catalog for Gate {
    fn channels(&self) -> Vec<Channel> {
        vec![Channel { ccid: "slow".into(), name: "Slow".into(), hidden: false }]
    }

    fn programmes(&self, _ccid: &str) -> Vec<Programme> {
        if let Some(tx) = self.entered.lock().take() {
            let _ = tx.send(());
        }
        let _ = self.release.lock().recv();
        vec![programme("s1", "Anything", 0)]
    }
}

fn request(query_id: i32, query: &str) -> SearchRequest {
    SearchRequest {
        query_id,
        query: Query::parse(query).unwrap(),
        offset: 0,
        count: 0,
        channel_constraints: Vec::new(),
    }
}

#[tokio::test]
async fn completes_with_matches_in_channel_order() {
    let (manager, mut completed) = SearchManager::new(Arc::new(Guide));
    manager
        .start(request(
            7,
            r#"{"compare":{"field":"Programme.startTime","comparison":"GREATER_EQUAL","value":"1000"}}"#,
        ))
        .unwrap();

    let done = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.search, 7);
    assert_eq!(done.status, SEARCH_STATUS_COMPLETED);
    let ids: Vec<_> = done.programmes.iter().map(|p| p.programme_id.as_str()).collect();
    assert_eq!(ids, vec!["1a", "1b", "2a"]);
    assert!(!manager.is_running(7));
}

#[tokio::test]
async fn channel_id_compares_against_the_ccid() {
    let (manager, mut completed) = SearchManager::new(Arc::new(Guide));
    manager
        .start(request(
            1,
            r#"{"and":[
                {"compare":{"field":"Programme.channelID","comparison":"EQUAL","value":"CCID:TWO"}},
                {"compare":{"field":"Programme.name","comparison":"CONTAINS","value":"news"}}
            ]}"#,
        ))
        .unwrap();
    let done = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.programmes.len(), 1);
    assert_eq!(done.programmes[0].programme_id, "2a");
}

#[tokio::test]
async fn abort_reports_aborted_exactly_once() {
    let (entered_tx, entered_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel();
    let gate = Gate {
        entered: Mutex::new(Some(entered_tx)),
        release: Mutex::new(release_rx),
    };
    let (manager, mut completed) = SearchManager::new(Arc::new(gate));
    manager
        .start(request(
            3,
            r#"{"compare":{"field":"Programme.name","comparison":"CONTAINS","value":"a"}}"#,
        ))
        .unwrap();

    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(manager.abort(3));
    assert!(!manager.abort(3));
    release_tx.send(()).unwrap();

    let done = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.search, 3);
    assert_eq!(done.status, SEARCH_STATUS_ABORTED);
    assert!(done.programmes.is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(completed.try_recv().is_err());
}

#[tokio::test]
async fn duplicate_query_id_is_refused_while_running() {
    let (entered_tx, entered_rx) = std_mpsc::channel();
    let (release_tx, release_rx) = std_mpsc::channel();
    let gate = Gate {
        entered: Mutex::new(Some(entered_tx)),
        release: Mutex::new(release_rx),
    };
    let (manager, mut completed) = SearchManager::new(Arc::new(gate));
    let query = r#"{"compare":{"field":"Programme.name","comparison":"EQUAL","value":"x"}}"#;
    manager.start(request(9, query)).unwrap();
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    assert!(matches!(
        manager.start(request(9, query)),
        Err(SearchError::AlreadyRunning(9))
    ));
    release_tx.send(()).unwrap();
    let done = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.status, SEARCH_STATUS_COMPLETED);
}

struct Endless;

impl Catalog for Endless {
    fn channels(&self) -> Vec<Channel> {
        vec![Channel { ccid: "ccid:end".into(), name: "End".into(), hidden: false }]
    }

    fn programmes(&self, _ccid: &str) -> Vec<Programme> {
        vec![Programme { duration: 1, ..programme("far", "Far Future", i64::MAX) }]
    }
}

#[tokio::test]
async fn end_time_compare_near_the_limit_completes() {
    let (manager, mut completed) = SearchManager::new(Arc::new(Endless));
    manager
        .start(request(
            1,
            r#"{"compare":{"field":"Programme.endTime","comparison":"GREATER","value":"0"}}"#,
        ))
        .unwrap();

    let done = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.status, SEARCH_STATUS_COMPLETED);
    assert_eq!(done.programmes.len(), 1);
    assert!(!manager.is_running(1));
}

struct Broken;

impl Catalog for Broken {
    fn channels(&self) -> Vec<Channel> {
        vec![Channel { ccid: "ccid:bad".into(), name: "Bad".into(), hidden: false }]
    }

    fn programmes(&self, _ccid: &str) -> Vec<Programme> {
        panic!("schedule unavailable");
    }
}

#[tokio::test]
async fn failed_worker_reports_aborted_and_frees_the_id() {
    let (manager, mut completed) = SearchManager::new(Arc::new(Broken));
    let query = r#"{"compare":{"field":"Programme.name","comparison":"CONTAINS","value":"a"}}"#;
    manager.start(request(5, query)).unwrap();

    let done = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(done.search, 5);
    assert_eq!(done.status, SEARCH_STATUS_ABORTED);
    assert!(done.programmes.is_empty());
    assert!(!manager.is_running(5));

    manager.start(request(5, query)).unwrap();
    let again = tokio::time::timeout(Duration::from_secs(5), completed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.status, SEARCH_STATUS_ABORTED);
}
