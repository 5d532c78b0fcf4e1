//! Generic derived-list pipeline.
//!
//! A [`DerivedQuery`] owns one dependent list (cycles, courses, groups,
//! eligible students). On every settled reload tick it re-evaluates its
//! readiness against the current [`Selection`] and, if ready, issues exactly
//! one fetch, superseding any still-pending fetch from an earlier tick.
//!
//! Correctness comes from generation stamping, not from interrupting the
//! network call: every fetch is tagged with the generation captured at
//! issue time, and publication goes through a compare-and-discard so a
//! result from tick N can never overwrite anything from tick N+1, no matter
//! which call completes first. Superseded fetches run to completion in the
//! background and are dropped at the publication gate.

use std::future::Future;
use std::sync::Arc;

use kardex_catalog::{CatalogError, CatalogResult};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::selection::Selection;
use crate::signal::ReloadListener;

/// Published state of one derived list.
///
/// `Ready(vec![])` is the normal resting state when the required inputs are
/// not selected yet; it is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// A fetch for the newest generation is in flight.
    Loading,
    /// The most recent non-superseded fetch result (or empty when inputs
    /// are missing).
    Ready(Vec<T>),
    /// The most recent non-superseded fetch failed. Local to this list;
    /// a later tick produces a fresh attempt.
    Failed(CatalogError),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }
}

/// Watch value: the state plus the generation that produced it.
#[derive(Debug, Clone)]
struct Stamped<T> {
    generation: u64,
    state: QueryState<T>,
}

/// Publish `state` for generation `g` unless something newer already
/// landed. Returns false when the result was discarded as stale.
fn publish<T>(tx: &watch::Sender<Stamped<T>>, g: u64, state: QueryState<T>) -> bool {
    tx.send_if_modified(|current| {
        if g < current.generation {
            return false;
        }
        current.generation = g;
        current.state = state;
        true
    })
}

/// Read access to a pipeline's published state.
#[derive(Debug, Clone)]
pub struct QueryWatch<T> {
    rx: watch::Receiver<Stamped<T>>,
}

impl<T: Clone> QueryWatch<T> {
    /// Current published state.
    pub fn current(&self) -> QueryState<T> {
        self.rx.borrow().state.clone()
    }

    /// Wait for the next publication and return it. `None` once the
    /// pipeline task is gone.
    pub async fn next(&mut self) -> Option<QueryState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }

    /// Wait until the published state is not `Loading` and return it.
    /// Returns the last published state if the pipeline shuts down.
    pub async fn settled_state(&mut self) -> QueryState<T> {
        loop {
            let current = self.rx.borrow_and_update().state.clone();
            if !current.is_loading() {
                return current;
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().state.clone();
            }
        }
    }
}

/// One dependent list, kept consistent with the most recently observed
/// selection.
#[derive(Debug)]
pub struct DerivedQuery<T> {
    rx: watch::Receiver<Stamped<T>>,
    task: JoinHandle<()>,
}

impl<T> DerivedQuery<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Spawn the pipeline task.
    ///
    /// `query` fuses the readiness predicate with the fetch: it returns
    /// `None` when the selection is missing a required input (the list
    /// publishes `Ready(vec![])` immediately) and `Some(future)` when a
    /// fetch should be issued.
    pub fn spawn<Q, Fut>(
        name: &'static str,
        selection: watch::Receiver<Selection>,
        mut listener: ReloadListener,
        query: Q,
    ) -> Self
    where
        Q: Fn(Selection) -> Option<Fut> + Send + 'static,
        Fut: Future<Output = CatalogResult<Vec<T>>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(Stamped {
            generation: 0,
            state: QueryState::Ready(Vec::new()),
        });
        let tx = Arc::new(tx);

        let task = tokio::spawn(async move {
            let mut generation: u64 = 0;
            while listener.settled().await.is_ok() {
                generation += 1;
                let g = generation;
                let snapshot = selection.borrow().clone();

                match query(snapshot) {
                    None => {
                        debug!(list = name, generation = g, "inputs missing, publishing empty");
                        publish(&tx, g, QueryState::Ready(Vec::new()));
                    }
                    Some(fetch) => {
                        publish(&tx, g, QueryState::Loading);
                        let tx = Arc::clone(&tx);
                        tokio::spawn(async move {
                            let state = match fetch.await {
                                Ok(items) => {
                                    debug!(list = name, generation = g, count = items.len(), "fetch completed");
                                    QueryState::Ready(items)
                                }
                                Err(err) => {
                                    warn!(list = name, generation = g, error = %err, "fetch failed");
                                    QueryState::Failed(err)
                                }
                            };
                            if !publish(&tx, g, state) {
                                debug!(list = name, generation = g, "discarding superseded result");
                            }
                        });
                    }
                }
            }
            debug!(list = name, "reload signal closed, pipeline stopping");
        });

        Self { rx, task }
    }

    /// Current published state.
    pub fn current(&self) -> QueryState<T> {
        self.rx.borrow().state.clone()
    }

    /// Subscribe for change notifications (tests, host screens, CLI).
    pub fn subscribe(&self) -> QueryWatch<T> {
        QueryWatch {
            rx: self.rx.clone(),
        }
    }
}

impl<T> Drop for DerivedQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
