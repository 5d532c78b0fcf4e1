//! The composed per-screen coordinator.
//!
//! [`EnrollmentCoordinator`] wires one [`SelectionContext`] to the four
//! derived-list pipelines and the commit machine. One instance per screen;
//! the selection is never shared across screens. The acting session
//! identity is an explicit constructor parameter so the coordinator stays
//! testable in isolation; it never reads ambient global state.

use std::sync::Arc;
use std::time::Duration;

use kardex_catalog::{
    CareerId, CatalogGateway, Course, CourseId, Cycle, CycleId, EnrollmentId, Group, GroupId,
    Student, StudentId,
};
use tokio::sync::{broadcast, watch};

use crate::commit::{
    CommitOutcome, CommitRequest, EnrollmentChange, EnrollmentCommitCoordinator,
};
use crate::derived::{DerivedQuery, QueryState, QueryWatch};
use crate::selection::{Selection, SelectionContext};
use crate::signal::DEFAULT_SETTLE;

/// Who is driving the screen.
///
/// Student self-service carries the student's own id; an administrative
/// session carries none and relies on the operator selecting a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionIdentity {
    pub student: Option<StudentId>,
}

impl SessionIdentity {
    /// A student-scoped session (self-service enrollment).
    pub fn student(id: StudentId) -> Self {
        Self { student: Some(id) }
    }

    /// An administrative session; the subject student comes from the
    /// selection.
    pub fn administrative() -> Self {
        Self::default()
    }
}

/// Tuning knobs for a coordinator instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Quiet window a burst of selection changes must survive before the
    /// pipelines re-evaluate.
    pub settle: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
        }
    }
}

/// Coordinator for the "enroll a student in a group" and "browse course
/// offering" screens.
pub struct EnrollmentCoordinator {
    selection: SelectionContext,
    cycles: DerivedQuery<Cycle>,
    courses: DerivedQuery<Course>,
    groups: DerivedQuery<Group>,
    eligible_students: DerivedQuery<Student>,
    committer: EnrollmentCommitCoordinator,
    session: SessionIdentity,
}

impl EnrollmentCoordinator {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        session: SessionIdentity,
        config: CoordinatorConfig,
    ) -> Self {
        let selection = SelectionContext::new();

        let cycles = {
            let gw = Arc::clone(&gateway);
            DerivedQuery::spawn(
                "cycles",
                selection.watch(),
                selection.reload_listener(config.settle),
                // No inputs required; refetched on every settled tick.
                move |_sel: Selection| {
                    let gw = Arc::clone(&gw);
                    Some(async move { gw.list_cycles().await })
                },
            )
        };

        let courses = {
            let gw = Arc::clone(&gateway);
            DerivedQuery::spawn(
                "courses",
                selection.watch(),
                selection.reload_listener(config.settle),
                move |sel: Selection| {
                    let career = sel.career?;
                    let cycle = sel.cycle?;
                    let gw = Arc::clone(&gw);
                    Some(async move { gw.list_courses(career, cycle).await })
                },
            )
        };

        let groups = {
            let gw = Arc::clone(&gateway);
            DerivedQuery::spawn(
                "groups",
                selection.watch(),
                selection.reload_listener(config.settle),
                move |sel: Selection| {
                    let course = sel.course?;
                    let cycle = sel.cycle?;
                    let career = sel.career?;
                    let gw = Arc::clone(&gw);
                    Some(async move { gw.list_groups(course, cycle, career).await })
                },
            )
        };

        let eligible_students = {
            let gw = Arc::clone(&gateway);
            DerivedQuery::spawn(
                "eligible_students",
                selection.watch(),
                selection.reload_listener(config.settle),
                move |sel: Selection| {
                    let cycle = sel.cycle?;
                    let gw = Arc::clone(&gw);
                    Some(async move { gw.list_eligible_students(cycle).await })
                },
            )
        };

        Self {
            selection,
            cycles,
            courses,
            groups,
            eligible_students,
            committer: EnrollmentCommitCoordinator::new(gateway),
            session,
        }
    }

    // -- selection ---------------------------------------------------------

    pub fn set_career(&self, career: Option<CareerId>) {
        self.selection.set_career(career);
    }

    pub fn set_cycle(&self, cycle: Option<CycleId>) {
        self.selection.set_cycle(cycle);
    }

    pub fn set_course(&self, course: Option<CourseId>) {
        self.selection.set_course(course);
    }

    pub fn set_group(&self, group: Option<GroupId>) {
        self.selection.set_group(group);
    }

    pub fn set_student(&self, student: Option<StudentId>) {
        self.selection.set_student(student);
    }

    /// Enter the repoint workflow for an existing enrollment.
    pub fn begin_edit(&self, enrollment: EnrollmentId) {
        self.selection.begin_edit(enrollment);
    }

    pub fn end_edit(&self) {
        self.selection.end_edit();
    }

    /// Snapshot of the current selection.
    pub fn selection(&self) -> Selection {
        self.selection.current()
    }

    // -- derived lists -----------------------------------------------------

    pub fn cycles(&self) -> QueryState<Cycle> {
        self.cycles.current()
    }

    pub fn watch_cycles(&self) -> QueryWatch<Cycle> {
        self.cycles.subscribe()
    }

    pub fn courses(&self) -> QueryState<Course> {
        self.courses.current()
    }

    pub fn watch_courses(&self) -> QueryWatch<Course> {
        self.courses.subscribe()
    }

    pub fn groups(&self) -> QueryState<Group> {
        self.groups.current()
    }

    pub fn watch_groups(&self) -> QueryWatch<Group> {
        self.groups.subscribe()
    }

    pub fn eligible_students(&self) -> QueryState<Student> {
        self.eligible_students.current()
    }

    pub fn watch_eligible_students(&self) -> QueryWatch<Student> {
        self.eligible_students.subscribe()
    }

    // -- commit ------------------------------------------------------------

    /// Commit the current selection: create an enrollment, or repoint the
    /// one under edit. The subject student is the explicitly selected one,
    /// falling back to the session identity.
    pub async fn commit(&self) {
        let sel = self.selection.current();
        self.committer
            .commit(CommitRequest {
                student: sel.student.or(self.session.student),
                group: sel.group,
                editing: sel.editing_enrollment,
            })
            .await;
    }

    /// Single-consumption read of the last commit outcome.
    pub fn take_outcome(&self) -> CommitOutcome {
        self.committer.take_outcome()
    }

    /// Observable commit progress.
    pub fn outcome_watch(&self) -> watch::Receiver<CommitOutcome> {
        self.committer.watch()
    }

    /// Enrollment-changed notifications for sibling screens.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<EnrollmentChange> {
        self.committer.subscribe_changes()
    }
}
