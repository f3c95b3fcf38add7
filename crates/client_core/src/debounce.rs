//! Delay-gated filter updates for search-as-you-type inputs.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use shared::query::{FilterValue, Filters};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::lock;

pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

pub trait FilterSink: Send + Sync + 'static {
    fn set_filters(&self, partial: Filters);
}

/// A restartable one-shot timer. Scheduling cancels whatever was pending, so
/// at most one action is ever waiting. Dropping the timer cancels it.
pub struct DebounceTimer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        if let Some(previous) = lock(&self.pending).replace(task) {
            previous.abort();
        }
    }

    pub fn cancel(&self) -> bool {
        match lock(&self.pending).take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(task) = pending.take() {
            task.abort();
        }
    }
}

struct PendingInput {
    seq: u64,
    value: FilterValue,
}

struct BindingTarget {
    sink: Arc<dyn FilterSink>,
    filter_key: String,
    next_seq: AtomicU64,
    pending: Mutex<Option<PendingInput>>,
}

impl BindingTarget {
    /// With `only_seq`, commits only if that input is still the pending one;
    /// a timer that fired as newer input arrived must not take it early.
    fn commit_pending(&self, only_seq: Option<u64>) -> bool {
        let value = {
            let mut pending = lock(&self.pending);
            match (pending.as_ref(), only_seq) {
                (Some(input), Some(seq)) if input.seq != seq => None,
                _ => pending.take().map(|input| input.value),
            }
        };
        let Some(value) = value else {
            return false;
        };
        debug!(filter = %self.filter_key, %value, "debounce: committing filter");
        self.sink
            .set_filters(Filters::from([(self.filter_key.clone(), Some(value))]));
        true
    }
}

/// Binds a raw input stream to one filter key. Bursts of input collapse into
/// a single `set_filters({key: last_value})` once the input has been quiet
/// for the configured delay. There is no maximum wait.
pub struct DebouncedFilterBinding {
    target: Arc<BindingTarget>,
    timer: DebounceTimer,
}

impl DebouncedFilterBinding {
    pub fn new(sink: Arc<dyn FilterSink>, filter_key: impl Into<String>, delay: Duration) -> Self {
        Self {
            target: Arc::new(BindingTarget {
                sink,
                filter_key: filter_key.into(),
                next_seq: AtomicU64::new(0),
                pending: Mutex::new(None),
            }),
            timer: DebounceTimer::new(delay),
        }
    }

    /// Empty text is forwarded too; it clears the filter downstream.
    pub fn on_input(&self, value: impl Into<FilterValue>) {
        let seq = self.target.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.target.pending) = Some(PendingInput {
            seq,
            value: value.into(),
        });
        let target = Arc::clone(&self.target);
        self.timer.schedule(move || {
            target.commit_pending(Some(seq));
        });
    }

    /// Applies the pending value right away (e.g. on Enter). Returns whether
    /// anything was pending.
    pub fn flush(&self) -> bool {
        self.timer.cancel();
        self.target.commit_pending(None)
    }

    pub fn cancel(&self) -> bool {
        self.timer.cancel();
        lock(&self.target.pending).take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
