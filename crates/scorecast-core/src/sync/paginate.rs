// Bounded-concurrency paginated fetching.
//
// The first page is fetched on its own so something can be shown right
// away. The remaining offsets are fetched in batches of at most
// `max_concurrent` requests: requests within a batch run concurrently,
// batches run strictly one after another. Progress is published after each
// batch through a `watch` channel.

use std::fmt;
use std::future::Future;

use futures_util::future::join_all;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::generation::Generation;
use crate::error::FetchError;

/// Upper bound on outstanding requests for one paginated fetch.
pub const MAX_CONCURRENT: usize = 3;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

/// One page of results and the collection size reported by upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Accumulated state of a paginated collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub loading: bool,
    pub error: Option<String>,
    /// Generation of the load that last reset the collection.
    pub generation: u64,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            loading: false,
            error: None,
            generation: 0,
        }
    }
}

impl<T> Collection<T> {
    pub fn progress(&self) -> Progress {
        Progress {
            loaded: self.items.len(),
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: usize,
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.loaded, self.total)
    }
}

/// How a paginated fetch ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Complete,
    /// The generation token went stale; no further batches were issued and
    /// whatever was accumulated was left as is.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Paginator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    max_concurrent: usize,
}

impl Paginator {
    pub fn new(page_size: usize, max_concurrent: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Offsets after the first page, grouped into batches.
    pub fn batches(&self, total: usize) -> Vec<Vec<usize>> {
        let offsets: Vec<usize> = (self.page_size..total).step_by(self.page_size).collect();
        offsets
            .chunks(self.max_concurrent)
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Fetch every page into `state`.
    ///
    /// `token` is checked before each batch and before each batch's results
    /// are committed. A failure in any request fails the whole operation:
    /// the error is published on `state`, the failing batch is dropped, and
    /// pages accumulated by earlier batches stay in place.
    pub async fn fetch_all<T, F, Fut>(
        &self,
        token: &Generation,
        state: &watch::Sender<Collection<T>>,
        mut fetch: F,
    ) -> Result<Completion, FetchError>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, FetchError>>,
    {
        if !token.is_current() {
            return Ok(Completion::Cancelled);
        }
        state.send_modify(|c| {
            c.items.clear();
            c.total = 0;
            c.loading = true;
            c.error = None;
            c.generation = token.value();
        });

        let first = fetch(PageRequest {
            offset: 0,
            limit: self.page_size,
        })
        .await;
        if !token.is_current() {
            debug!(generation = token.value(), "pagination cancelled after first page");
            settle_cancelled(state, token);
            return Ok(Completion::Cancelled);
        }
        let first = match first {
            Ok(page) => page,
            Err(err) => {
                publish_failure(state, &err);
                return Err(err);
            }
        };

        let first_len = first.items.len();
        let total = first.total;
        state.send_modify(|c| {
            c.items = first.items;
            c.total = total;
        });
        debug!(loaded = first_len, total, "first page loaded");

        if first_len >= total || first_len < self.page_size {
            state.send_modify(|c| c.loading = false);
            return Ok(Completion::Complete);
        }

        for batch in self.batches(total) {
            if !token.is_current() {
                debug!(generation = token.value(), "pagination cancelled before batch");
                settle_cancelled(state, token);
                return Ok(Completion::Cancelled);
            }

            let requests: Vec<Fut> = batch
                .iter()
                .map(|&offset| {
                    fetch(PageRequest {
                        offset,
                        limit: self.page_size,
                    })
                })
                .collect();
            // join_all yields results in request order, i.e. by offset,
            // regardless of completion order.
            let results = join_all(requests).await;

            if !token.is_current() {
                debug!(generation = token.value(), "discarding batch from stale generation");
                settle_cancelled(state, token);
                return Ok(Completion::Cancelled);
            }

            let mut pages = Vec::with_capacity(results.len());
            for (offset, result) in batch.iter().zip(results) {
                match result {
                    Ok(page) => pages.push(page),
                    Err(err) => {
                        warn!(offset, "page fetch failed: {err}");
                        publish_failure(state, &err);
                        return Err(err);
                    }
                }
            }

            state.send_modify(|c| {
                for page in pages {
                    c.items.extend(page.items);
                }
            });
            debug!(progress = %state.borrow().progress(), "batch loaded");
        }

        state.send_modify(|c| c.loading = false);
        Ok(Completion::Complete)
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(50, MAX_CONCURRENT)
    }
}

/// Clear the loading flag of a cancelled load, keeping what it accumulated.
/// Leaves the collection alone once a newer load has reset it.
fn settle_cancelled<T>(state: &watch::Sender<Collection<T>>, token: &Generation) {
    state.send_if_modified(|c| {
        if c.generation != token.value() || !c.loading {
            return false;
        }
        c.loading = false;
        true
    });
}

fn publish_failure<T>(state: &watch::Sender<Collection<T>>, err: &FetchError) {
    let message = err.display_message();
    state.send_modify(|c| {
        c.loading = false;
        c.error = Some(message);
    });
}
