//! Kardex Core: the cascading-selection and enrollment-commit coordinator.
//!
//! The enrollment screens are a chain of dependent choices (career →
//! cycle → course → group) where each choice invalidates and re-derives
//! the choices below it through asynchronous catalog queries. This crate
//! owns the coordination: the selection state and its invalidation rules,
//! the debounced reload signal, the generation-stamped derived-list
//! pipelines (latest-wins, stale results discarded), and the re-entrancy
//! gated commit machine on top.
//!
//! ## Key Components
//!
//! - `SelectionContext`: hierarchical filter state, single-writer
//! - `ReloadSignal`: coalesced, replayable trigger channel
//! - `DerivedQuery<T>`: one pipeline per dependent list
//! - `EnrollmentCommitCoordinator`: validate, duplicate-check, then
//!   create-or-repoint
//! - `EnrollmentCoordinator`: the composed per-screen facade

mod commit;
mod coordinator;
mod derived;
mod selection;
mod signal;
pub mod telemetry;

pub use commit::{CommitOutcome, CommitRequest, EnrollmentChange, EnrollmentCommitCoordinator};
pub use coordinator::{CoordinatorConfig, EnrollmentCoordinator, SessionIdentity};
pub use derived::{DerivedQuery, QueryState, QueryWatch};
pub use selection::{Selection, SelectionContext};
pub use signal::{ReloadListener, ReloadSignal, SignalClosed, DEFAULT_SETTLE};
pub use telemetry::{init_tracing, LogFormat};
