//! Paginated, sortable, filterable view over a remote listing.
//!
//! A [`RemoteTableController`] owns the [`QueryState`] of one table view.
//! Every mutator updates that state synchronously and issues a fetch on the
//! tokio runtime; the outcome is published as a [`TableSnapshot`] through a
//! watch channel. Each fetch carries a generation number and only the latest
//! generation may land in the snapshot, so a slow, superseded response can
//! never overwrite a newer one.

use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, Weak,
    },
};

use anyhow::{anyhow, Result};
use futures::FutureExt;
use serde_json::Value;
use shared::{
    protocol::{PageMeta, PageResponse},
    query::{FilterValue, Filters, SortRule},
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    debounce::FilterSink,
    error::TableError,
    lock,
    query::{merge_filters, toggle_sort, QueryState},
    source::PageSource,
};

const UNSPECIFIED_REMOTE_FAILURE: &str = "request failed";
const FETCH_PANICKED: &str = "fetch panicked";

#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    pub initial: QueryState,
    /// Keep the last rows and meta visible when a fetch fails instead of
    /// clearing them.
    pub keep_data_on_error: bool,
}

impl TableOptions {
    pub fn new(limit: u32) -> Self {
        Self {
            initial: QueryState::new(limit),
            keep_data_on_error: false,
        }
    }

    pub fn with_initial(initial: QueryState) -> Self {
        Self {
            initial,
            keep_data_on_error: false,
        }
    }

    pub fn keep_data_on_error(mut self, keep: bool) -> Self {
        self.keep_data_on_error = keep;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TableSnapshot<R> {
    pub data: Vec<R>,
    pub meta: PageMeta,
    pub is_loading: bool,
    pub error: Option<TableError>,
    pub query: QueryState,
    pub generation: u64,
}

impl<R> TableSnapshot<R> {
    fn initial(query: QueryState) -> Self {
        Self {
            data: Vec::new(),
            meta: PageMeta::default(),
            is_loading: false,
            error: None,
            query,
            generation: 0,
        }
    }
}

pub struct RemoteTableController<R = Value> {
    inner: Arc<ControllerInner<R>>,
}

impl<R> Clone for RemoteTableController<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<R> {
    source: Arc<dyn PageSource<R>>,
    keep_data_on_error: bool,
    query: Mutex<QueryState>,
    next_generation: AtomicU64,
    inflight: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<TableSnapshot<R>>,
}

impl<R> Drop for ControllerInner<R> {
    fn drop(&mut self) {
        let inflight = self
            .inflight
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = inflight.take() {
            task.abort();
        }
    }
}

impl<R> RemoteTableController<R>
where
    R: Clone + Send + Sync + 'static,
{
    pub fn new(source: Arc<dyn PageSource<R>>, options: TableOptions) -> Self {
        let (state, _) = watch::channel(TableSnapshot::initial(options.initial.clone()));
        Self {
            inner: Arc::new(ControllerInner {
                source,
                keep_data_on_error: options.keep_data_on_error,
                query: Mutex::new(options.initial),
                next_generation: AtomicU64::new(0),
                inflight: Mutex::new(None),
                state,
            }),
        }
    }

    pub fn with_source<S>(source: S, options: TableOptions) -> Self
    where
        S: PageSource<R> + 'static,
    {
        Self::new(Arc::new(source), options)
    }

    pub fn load(&self) {
        self.refetch();
    }

    pub fn refetch(&self) {
        let query = lock(&self.inner.query);
        ControllerInner::issue_fetch(&self.inner, &query);
    }

    /// No clamping: out-of-range pages go to the source as-is.
    pub fn set_page(&self, page: u32) {
        self.mutate(|query| query.page = page);
    }

    pub fn set_limit(&self, limit: u32) {
        self.mutate(|query| {
            query.limit = limit;
            query.page = 1;
        });
    }

    pub fn set_sort_rules(&self, rules: Vec<SortRule>) {
        self.mutate(|query| query.sort_rules = rules);
    }

    pub fn toggle_sort(&self, field: &str) {
        self.mutate(|query| query.sort_rules = toggle_sort(&query.sort_rules, field));
    }

    pub fn set_filters(&self, partial: Filters) {
        self.mutate(|query| {
            merge_filters(&mut query.filters, partial);
            query.page = 1;
        });
    }

    pub fn set_filter(&self, key: impl Into<String>, value: Option<FilterValue>) {
        self.set_filters(Filters::from([(key.into(), value)]));
    }

    pub fn clear_filters(&self) {
        self.mutate(|query| {
            query.filters.clear();
            query.page = 1;
        });
    }

    pub fn query_params(&self) -> QueryState {
        lock(&self.inner.query).clone()
    }

    pub fn snapshot(&self) -> TableSnapshot<R> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TableSnapshot<R>> {
        self.inner.state.subscribe()
    }

    pub async fn settled(&self) -> TableSnapshot<R> {
        let mut updates = self.subscribe();
        let settled = updates
            .wait_for(|snapshot| !snapshot.is_loading)
            .await
            .map(|snapshot| snapshot.clone());
        match settled {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    fn mutate(&self, change: impl FnOnce(&mut QueryState)) {
        let mut query = lock(&self.inner.query);
        change(&mut query);
        ControllerInner::issue_fetch(&self.inner, &query);
    }
}

impl<R> ControllerInner<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Must run with the query lock held so generations are published in the
    /// order they were allocated.
    fn issue_fetch(this: &Arc<Self>, query: &QueryState) {
        let generation = this.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let params = query.to_params();
        this.state.send_modify(|snapshot| {
            snapshot.is_loading = true;
            snapshot.error = None;
            snapshot.query = query.clone();
            snapshot.generation = generation;
        });
        debug!(generation, page = query.page, limit = query.limit, "table: issuing fetch");

        let source = Arc::clone(&this.source);
        let weak: Weak<Self> = Arc::downgrade(this);
        let task = tokio::spawn(async move {
            let fetch = AssertUnwindSafe(async { source.fetch_page(&params).await });
            let outcome = match fetch.catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow!(FETCH_PANICKED)),
            };
            if let Some(inner) = weak.upgrade() {
                inner.complete(generation, outcome);
            }
        });

        if let Some(superseded) = lock(&this.inflight).replace(task) {
            superseded.abort();
        }
    }

    fn complete(&self, generation: u64, outcome: Result<PageResponse<R>>) {
        let result = match outcome {
            Ok(response) if response.success => Ok((
                response.data.unwrap_or_default(),
                response.meta.unwrap_or_default(),
            )),
            Ok(response) => Err(TableError::Remote(
                response
                    .message
                    .unwrap_or_else(|| UNSPECIFIED_REMOTE_FAILURE.to_string()),
            )),
            Err(err) => Err(TableError::Transport(format!("{err:#}"))),
        };
        let failure = result.as_ref().err().cloned();

        let keep_data_on_error = self.keep_data_on_error;
        let applied = self.state.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.is_loading = false;
            match result {
                Ok((data, meta)) => {
                    snapshot.data = data;
                    snapshot.meta = meta;
                    snapshot.error = None;
                }
                Err(error) => {
                    if !keep_data_on_error {
                        snapshot.data = Vec::new();
                        snapshot.meta = PageMeta::default();
                    }
                    snapshot.error = Some(error);
                }
            }
            true
        });

        if !applied {
            debug!(generation, "table: dropped stale response");
        } else if let Some(error) = failure {
            warn!(generation, %error, "table: fetch failed");
        }
    }
}

impl<R> FilterSink for RemoteTableController<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn set_filters(&self, partial: Filters) {
        RemoteTableController::set_filters(self, partial);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
