//! Client-side table data: a remote, paginated listing driven by page, page
//! size, sort and filter state, plus debounced bindings that feed filter
//! input into it.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod controller;
pub mod debounce;
pub mod error;
pub mod query;
pub mod source;

pub use controller::{RemoteTableController, TableOptions, TableSnapshot};
pub use debounce::{DebounceTimer, DebouncedFilterBinding, FilterSink, DEFAULT_DEBOUNCE_DELAY};
pub use error::TableError;
pub use query::{merge_filters, toggle_sort, QueryState};
pub use source::{FnPageSource, HttpPageSource, PageSource};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
