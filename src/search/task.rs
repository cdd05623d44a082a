use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::query::Query;
use super::SearchError;

pub const SEARCH_STATUS_COMPLETED: i32 = 0;
pub const SEARCH_STATUS_ABORTED: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub ccid: String,
    pub name: String,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Programme {
    pub programme_id: String,
    pub name: String,
    pub description: String,
    /// Epoch seconds.
    pub start_time: i64,
    /// Seconds.
    pub duration: i64,
}

impl Programme {
    pub fn end_time(&self) -> i64 {
        self.start_time.saturating_add(self.duration)
    }
}

/// Source of channels and their schedules.
pub trait Catalog: Send + Sync {
    fn channels(&self) -> Vec<Channel>;

    fn programmes(&self, ccid: &str) -> Vec<Programme>;
}

/// Reported once per started search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCompleted {
    pub search: i32,
    pub status: i32,
    #[serde(rename = "programmeList")]
    pub programmes: Vec<Programme>,
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query_id: i32,
    pub query: Query,
    /// Matches to skip before collecting.
    pub offset: usize,
    /// Maximum results, 0 for no limit.
    pub count: usize,
    /// `ccid:<ccid>` entries restricting the channels searched.
    pub channel_constraints: Vec<String>,
}

/// Runs metadata searches on worker threads.
#[derive(Clone)]
pub struct SearchManager {
    catalog: Arc<dyn Catalog>,
    running: Arc<Mutex<HashMap<i32, Arc<AtomicBool>>>>,
    completed_tx: mpsc::UnboundedSender<SearchCompleted>,
}

impl SearchManager {
    pub fn new(catalog: Arc<dyn Catalog>) -> (Self, mpsc::UnboundedReceiver<SearchCompleted>) {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        let manager = Self {
            catalog,
            running: Arc::new(Mutex::new(HashMap::new())),
            completed_tx,
        };
        (manager, completed_rx)
    }

    pub fn start(&self, request: SearchRequest) -> Result<(), SearchError> {
        let query_id = request.query_id;
        let abort = Arc::new(AtomicBool::new(false));
        {
            let mut running = self.running.lock();
            if running.contains_key(&query_id) {
                return Err(SearchError::AlreadyRunning(query_id));
            }
            running.insert(query_id, abort.clone());
        }

        let catalog = self.catalog.clone();
        let running = self.running.clone();
        let completed_tx = self.completed_tx.clone();
        let flag = abort.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("search-{query_id}"))
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    run(catalog.as_ref(), &request, &flag)
                }));
                let completion = result.unwrap_or_else(|e| {
                    error!(query_id, "search worker panicked: {:?}", e);
                    SearchCompleted {
                        search: query_id,
                        status: SEARCH_STATUS_ABORTED,
                        programmes: Vec::new(),
                    }
                });
                {
                    let mut running = running.lock();
                    if running.get(&query_id).is_some_and(|f| Arc::ptr_eq(f, &flag)) {
                        running.remove(&query_id);
                    }
                }
                debug!(query_id, status = completion.status, "search finished");
                let _ = completed_tx.send(completion);
            });

        if let Err(e) = spawned {
            self.running.lock().remove(&query_id);
            return Err(SearchError::Spawn(e));
        }
        info!(query_id, "search started");
        Ok(())
    }

    /// Ask a running search to stop. It still reports, with the aborted
    /// status. Returns `false` when no such search is running.
    pub fn abort(&self, query_id: i32) -> bool {
        match self.running.lock().remove(&query_id) {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                info!(query_id, "search aborted");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, query_id: i32) -> bool {
        self.running.lock().contains_key(&query_id)
    }
}

fn run(catalog: &dyn Catalog, request: &SearchRequest, abort: &AtomicBool) -> SearchCompleted {
    let mut skip = request.offset;
    let mut found = Vec::new();
    let aborted = || abort.load(Ordering::Relaxed);

    'channels: for channel in catalog.channels() {
        if channel.hidden {
            continue;
        }
        if !request.channel_constraints.is_empty() {
            let constraint = format!("ccid:{}", channel.ccid);
            if !request.channel_constraints.contains(&constraint) {
                continue;
            }
        }
        for programme in catalog.programmes(&channel.ccid) {
            if aborted() {
                break 'channels;
            }
            if !request.query.matches(&programme, &channel.ccid) {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            found.push(programme);
            if request.count != 0 && found.len() >= request.count {
                break 'channels;
            }
        }
    }

    if aborted() {
        SearchCompleted {
            search: request.query_id,
            status: SEARCH_STATUS_ABORTED,
            programmes: Vec::new(),
        }
    } else {
        SearchCompleted {
            search: request.query_id,
            status: SEARCH_STATUS_COMPLETED,
            programmes: found,
        }
    }
}
