//! The remote catalog/enrollment gateway trait.
//!
//! Everything the coordinator knows about the remote service goes through
//! [`CatalogGateway`]. Implementations apply their own transient-retry
//! policy internally; callers treat "the call resolved, eventually, with
//! success or failure" as the whole contract. An HTTP backend lives in
//! `http`, in-memory fakes in `fakes`.

use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::models::{
    CareerId, Course, CourseId, Cycle, CycleId, EnrollmentId, EnrollmentRecord, Group, GroupId,
    Student, StudentId,
};

/// Async gateway to the academic-records service.
///
/// Guarantees required of implementations:
/// - List operations are idempotent reads, safe to call repeatedly and
///   concurrently; the coordinator relies on this to let superseded fetches
///   run to completion in the background.
/// - `create_enrollment` and `repoint_enrollment` are *not* retried by the
///   implementation beyond what the server itself deduplicates; a
///   classified failure is returned instead.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// All academic cycles known to the service.
    async fn list_cycles(&self) -> CatalogResult<Vec<Cycle>>;

    /// Courses offered for a career in a cycle.
    async fn list_courses(&self, career: CareerId, cycle: CycleId) -> CatalogResult<Vec<Course>>;

    /// Groups offering a course in a cycle, scoped to a career.
    async fn list_groups(
        &self,
        course: CourseId,
        cycle: CycleId,
        career: CareerId,
    ) -> CatalogResult<Vec<Group>>;

    /// Students eligible to enroll in the given cycle.
    async fn list_eligible_students(&self, cycle: CycleId) -> CatalogResult<Vec<Student>>;

    /// Whether an active enrollment already exists for `(student, group)`.
    async fn enrollment_exists(
        &self,
        student: StudentId,
        group: GroupId,
    ) -> CatalogResult<bool>;

    /// Create a new enrollment. The returned record has `grade = None`.
    async fn create_enrollment(
        &self,
        student: StudentId,
        group: GroupId,
    ) -> CatalogResult<EnrollmentRecord>;

    /// Re-point an existing enrollment at a different group, in place.
    async fn repoint_enrollment(
        &self,
        enrollment: EnrollmentId,
        new_group: GroupId,
    ) -> CatalogResult<()>;
}
