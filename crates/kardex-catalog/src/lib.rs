//! Kardex Catalog: the remote-gateway layer.
//!
//! Everything the coordinator knows about the academic-records service is
//! behind the [`CatalogGateway`] trait: list operations for the cascading
//! selection, existence checks and create/repoint for enrollment commits.
//!
//! ## Key Components
//!
//! - `CatalogGateway`: the async gateway trait (the whole remote contract)
//! - `HttpCatalog`: REST backend with internal transient-retry on reads
//! - `MemoryCatalog`: in-memory fake with test levers (latency, failure
//!   injection, call counters)
//! - `CatalogError`: the three-class failure taxonomy

mod error;
pub mod fakes;
mod gateway;
mod http;
mod models;

pub use error::{CatalogError, CatalogResult};
pub use fakes::{seed_demo, DemoSeed, FetchCounts, MemoryCatalog};
pub use gateway::CatalogGateway;
pub use http::{classify_status, HttpCatalog};
pub use models::{
    CareerId, Course, CourseId, Cycle, CycleId, EnrollmentId, EnrollmentRecord, Group,
    GroupId, Student, StudentId,
};
