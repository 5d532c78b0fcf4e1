//! In-memory fake for the catalog gateway (tests and demo mode).
//!
//! `MemoryCatalog` satisfies the [`CatalogGateway`] contract without any
//! network. Beyond plain storage it carries the levers the coordinator's
//! test suite needs: per-career simulated fetch latency (to force
//! out-of-order completions), one-shot injected failures, and per-operation
//! call counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{CatalogError, CatalogResult};
use crate::gateway::CatalogGateway;
use crate::models::*;

/// Per-operation read counters, snapshot via [`MemoryCatalog::fetch_counts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchCounts {
    pub cycles: usize,
    pub courses: usize,
    pub groups: usize,
    pub eligible_students: usize,
}

/// In-memory catalog backed by `Mutex<HashMap>` stores.
///
/// The unique `(student, group)` enrollment constraint is enforced here the
/// way the real storage does, as `Dependency("duplicate enrollment")`. The
/// coordinator's commit-time check is expected to fire first; this is the
/// backstop behind it.
#[derive(Default)]
pub struct MemoryCatalog {
    cycles: Mutex<Vec<Cycle>>,
    courses: Mutex<Vec<Course>>,
    groups: Mutex<Vec<Group>>,
    eligible: Mutex<HashMap<CycleId, Vec<Student>>>,
    enrollments: Mutex<HashMap<EnrollmentId, EnrollmentRecord>>,

    courses_latency: Mutex<HashMap<CareerId, Duration>>,
    commit_latency: Mutex<Option<Duration>>,
    fail_next_courses: Mutex<Option<CatalogError>>,

    cycles_calls: AtomicUsize,
    courses_calls: AtomicUsize,
    groups_calls: AtomicUsize,
    eligible_calls: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // -- seeding -----------------------------------------------------------

    pub fn add_cycle(&self, code: &str) -> CycleId {
        let cycle = Cycle {
            id: CycleId::new(),
            code: code.to_string(),
        };
        let id = cycle.id;
        self.cycles.lock().unwrap().push(cycle);
        id
    }

    pub fn add_course(&self, career: CareerId, name: &str, credits: u8) -> CourseId {
        let course = Course {
            id: CourseId::new(),
            career_id: career,
            name: name.to_string(),
            credits,
        };
        let id = course.id;
        self.courses.lock().unwrap().push(course);
        id
    }

    pub fn add_group(&self, course: CourseId, cycle: CycleId, code: &str, capacity: u32) -> GroupId {
        let group = Group {
            id: GroupId::new(),
            course_id: course,
            cycle_id: cycle,
            code: code.to_string(),
            capacity,
        };
        let id = group.id;
        self.groups.lock().unwrap().push(group);
        id
    }

    pub fn add_eligible_student(&self, cycle: CycleId, code: &str, full_name: &str) -> StudentId {
        let student = Student {
            id: StudentId::new(),
            code: code.to_string(),
            full_name: full_name.to_string(),
        };
        let id = student.id;
        self.eligible.lock().unwrap().entry(cycle).or_default().push(student);
        id
    }

    /// Remove a group, simulating a concurrent deletion on the server.
    pub fn remove_group(&self, group: GroupId) {
        self.groups.lock().unwrap().retain(|g| g.id != group);
    }

    // -- test levers -------------------------------------------------------

    /// Delay every `list_courses` call for `career` by `latency`.
    pub fn set_courses_latency(&self, career: CareerId, latency: Duration) {
        self.courses_latency.lock().unwrap().insert(career, latency);
    }

    /// Delay every enrollment operation (`enrollment_exists`,
    /// `create_enrollment`, `repoint_enrollment`) by `latency`. Lets tests
    /// hold a commit in flight while they observe or race it.
    pub fn set_commit_latency(&self, latency: Duration) {
        *self.commit_latency.lock().unwrap() = Some(latency);
    }

    async fn commit_pause(&self) {
        let latency = *self.commit_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Fail the next `list_courses` call with `err`, once.
    pub fn fail_next_courses(&self, err: CatalogError) {
        *self.fail_next_courses.lock().unwrap() = Some(err);
    }

    /// Snapshot of the per-operation read counters.
    pub fn fetch_counts(&self) -> FetchCounts {
        FetchCounts {
            cycles: self.cycles_calls.load(Ordering::SeqCst),
            courses: self.courses_calls.load(Ordering::SeqCst),
            groups: self.groups_calls.load(Ordering::SeqCst),
            eligible_students: self.eligible_calls.load(Ordering::SeqCst),
        }
    }

    /// Snapshot of all stored enrollment records.
    pub fn enrollments(&self) -> Vec<EnrollmentRecord> {
        self.enrollments.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    async fn list_cycles(&self) -> CatalogResult<Vec<Cycle>> {
        self.cycles_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cycles.lock().unwrap().clone())
    }

    async fn list_courses(&self, career: CareerId, _cycle: CycleId) -> CatalogResult<Vec<Course>> {
        self.courses_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_next_courses.lock().unwrap().take() {
            return Err(err);
        }
        // Capture the latency outside the lock; the sleep is what lets a
        // later, faster fetch complete first in the latest-wins tests.
        let latency = self.courses_latency.lock().unwrap().get(&career).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let courses = self.courses.lock().unwrap();
        Ok(courses
            .iter()
            .filter(|c| c.career_id == career)
            .cloned()
            .collect())
    }

    async fn list_groups(
        &self,
        course: CourseId,
        cycle: CycleId,
        _career: CareerId,
    ) -> CatalogResult<Vec<Group>> {
        self.groups_calls.fetch_add(1, Ordering::SeqCst);
        let groups = self.groups.lock().unwrap();
        Ok(groups
            .iter()
            .filter(|g| g.course_id == course && g.cycle_id == cycle)
            .cloned()
            .collect())
    }

    async fn list_eligible_students(&self, cycle: CycleId) -> CatalogResult<Vec<Student>> {
        self.eligible_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .eligible
            .lock()
            .unwrap()
            .get(&cycle)
            .cloned()
            .unwrap_or_default())
    }

    async fn enrollment_exists(
        &self,
        student: StudentId,
        group: GroupId,
    ) -> CatalogResult<bool> {
        self.commit_pause().await;
        let enrollments = self.enrollments.lock().unwrap();
        Ok(enrollments
            .values()
            .any(|e| e.student_id == student && e.group_id == group))
    }

    async fn create_enrollment(
        &self,
        student: StudentId,
        group: GroupId,
    ) -> CatalogResult<EnrollmentRecord> {
        self.commit_pause().await;
        if !self.groups.lock().unwrap().iter().any(|g| g.id == group) {
            return Err(CatalogError::Dependency(format!("group {group} not found")));
        }
        let mut enrollments = self.enrollments.lock().unwrap();
        if enrollments
            .values()
            .any(|e| e.student_id == student && e.group_id == group)
        {
            return Err(CatalogError::Dependency(format!(
                "duplicate enrollment for student {student} in group {group}"
            )));
        }
        let record = EnrollmentRecord {
            id: EnrollmentId::new(),
            student_id: student,
            group_id: group,
            grade: None,
            enrolled_at: Utc::now(),
        };
        enrollments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn repoint_enrollment(
        &self,
        enrollment: EnrollmentId,
        new_group: GroupId,
    ) -> CatalogResult<()> {
        self.commit_pause().await;
        if !self.groups.lock().unwrap().iter().any(|g| g.id == new_group) {
            return Err(CatalogError::Dependency(format!(
                "group {new_group} not found"
            )));
        }
        let mut enrollments = self.enrollments.lock().unwrap();
        let record = enrollments.get_mut(&enrollment).ok_or_else(|| {
            CatalogError::Dependency(format!("enrollment {enrollment} not found"))
        })?;
        record.group_id = new_group;
        Ok(())
    }
}

/// Handy ids from [`seed_demo`], used by the CLI demo walkthrough.
#[derive(Debug, Clone)]
pub struct DemoSeed {
    pub career: CareerId,
    pub cycle: CycleId,
    pub course: CourseId,
    pub group_a1: GroupId,
    pub group_a2: GroupId,
    pub student: StudentId,
}

/// Seed a small but complete catalog: one career, one cycle, two courses,
/// groups for each, and a couple of eligible students.
pub fn seed_demo(catalog: &MemoryCatalog) -> DemoSeed {
    let career = CareerId::new();
    let cycle = catalog.add_cycle("2026B");
    let course = catalog.add_course(career, "Data Structures", 8);
    let algebra = catalog.add_course(career, "Linear Algebra", 6);
    let group_a1 = catalog.add_group(course, cycle, "D01", 30);
    let group_a2 = catalog.add_group(course, cycle, "D02", 30);
    catalog.add_group(algebra, cycle, "L01", 40);
    let student = catalog.add_eligible_student(cycle, "219004521", "Carolina Ruvalcaba");
    catalog.add_eligible_student(cycle, "219007310", "Emilio Sandoval");
    DemoSeed {
        career,
        cycle,
        course,
        group_a1,
        group_a2,
        student,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_enrollment_rejected_by_storage_constraint() {
        let catalog = MemoryCatalog::new();
        let seed = seed_demo(&catalog);

        catalog
            .create_enrollment(seed.student, seed.group_a1)
            .await
            .unwrap();
        let second = catalog.create_enrollment(seed.student, seed.group_a1).await;

        assert!(matches!(second, Err(CatalogError::Dependency(_))));
        assert_eq!(catalog.enrollments().len(), 1);
    }

    #[tokio::test]
    async fn repoint_moves_record_in_place() {
        let catalog = MemoryCatalog::new();
        let seed = seed_demo(&catalog);

        let record = catalog
            .create_enrollment(seed.student, seed.group_a1)
            .await
            .unwrap();
        catalog
            .repoint_enrollment(record.id, seed.group_a2)
            .await
            .unwrap();

        let stored = catalog.enrollments();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, record.id);
        assert_eq!(stored[0].group_id, seed.group_a2);
    }

    #[tokio::test]
    async fn repoint_to_missing_group_is_a_dependency_failure() {
        let catalog = MemoryCatalog::new();
        let seed = seed_demo(&catalog);

        let record = catalog
            .create_enrollment(seed.student, seed.group_a1)
            .await
            .unwrap();
        catalog.remove_group(seed.group_a2);

        let result = catalog.repoint_enrollment(record.id, seed.group_a2).await;
        assert!(matches!(result, Err(CatalogError::Dependency(_))));
    }

    #[tokio::test]
    async fn eligible_students_scoped_to_cycle() {
        let catalog = MemoryCatalog::new();
        let seed = seed_demo(&catalog);
        let other_cycle = catalog.add_cycle("2027A");

        let eligible = catalog.list_eligible_students(seed.cycle).await.unwrap();
        assert_eq!(eligible.len(), 2);
        assert!(catalog
            .list_eligible_students(other_cycle)
            .await
            .unwrap()
            .is_empty());
    }
}
