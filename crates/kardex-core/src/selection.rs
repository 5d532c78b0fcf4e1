//! Hierarchical selection state for the enrollment screens.
//!
//! The selection is a chain of dependent choices: career → cycle → course →
//! group, plus the subject student. Changing an ancestor invalidates every
//! strictly-dependent descendant. The context is single-writer (the owning
//! coordinator) and multi-reader (the derived-query pipelines snapshot it
//! through a watch receiver).

use std::time::Duration;

use kardex_catalog::{CareerId, CourseId, CycleId, EnrollmentId, GroupId, StudentId};
use tokio::sync::watch;
use tracing::debug;

use crate::signal::{ReloadListener, ReloadSignal};

/// Snapshot of the current hierarchical filter state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub student: Option<StudentId>,
    pub career: Option<CareerId>,
    pub cycle: Option<CycleId>,
    pub course: Option<CourseId>,
    pub group: Option<GroupId>,
    /// Set only in the repoint workflow; excludes the edited record from
    /// the duplicate check.
    pub editing_enrollment: Option<EnrollmentId>,
}

/// Owner of the selection state and its reload signal.
///
/// Every setter follows the same contract: no-op when the value is
/// unchanged, otherwise assign, clear dependents, and pulse the signal.
#[derive(Debug)]
pub struct SelectionContext {
    state: watch::Sender<Selection>,
    reload: ReloadSignal,
}

impl SelectionContext {
    pub fn new() -> Self {
        let (state, _rx) = watch::channel(Selection::default());
        Self {
            state,
            reload: ReloadSignal::new(),
        }
    }

    /// Snapshot receiver for the pipelines. Readers use `borrow()`, never
    /// `changed()`; re-evaluation is driven by the reload signal instead.
    pub fn watch(&self) -> watch::Receiver<Selection> {
        self.state.subscribe()
    }

    /// Current snapshot.
    pub fn current(&self) -> Selection {
        self.state.borrow().clone()
    }

    /// Subscribe a pipeline to the reload signal.
    pub fn reload_listener(&self, settle: Duration) -> ReloadListener {
        self.reload.subscribe(settle)
    }

    /// Select a career. Clears course and group.
    pub fn set_career(&self, career: Option<CareerId>) {
        self.apply("career", |sel| {
            if sel.career == career {
                return false;
            }
            sel.career = career;
            sel.course = None;
            sel.group = None;
            true
        });
    }

    /// Select a cycle. Clears course and group.
    pub fn set_cycle(&self, cycle: Option<CycleId>) {
        self.apply("cycle", |sel| {
            if sel.cycle == cycle {
                return false;
            }
            sel.cycle = cycle;
            sel.course = None;
            sel.group = None;
            true
        });
    }

    /// Select a course. Clears group.
    pub fn set_course(&self, course: Option<CourseId>) {
        self.apply("course", |sel| {
            if sel.course == course {
                return false;
            }
            sel.course = course;
            sel.group = None;
            true
        });
    }

    /// Select a group. Leaf key; nothing below it to clear. An invalid id
    /// is caught downstream when the commit validates against the gateway.
    pub fn set_group(&self, group: Option<GroupId>) {
        self.apply("group", |sel| {
            if sel.group == group {
                return false;
            }
            sel.group = group;
            true
        });
    }

    /// Select the subject student. Leaf key.
    pub fn set_student(&self, student: Option<StudentId>) {
        self.apply("student", |sel| {
            if sel.student == student {
                return false;
            }
            sel.student = student;
            true
        });
    }

    /// Enter the repoint workflow for an existing enrollment. Does not
    /// pulse: editing identity changes nothing any derived list depends on.
    pub fn begin_edit(&self, enrollment: EnrollmentId) {
        self.state
            .send_if_modified(|sel| sel.editing_enrollment.replace(enrollment) != Some(enrollment));
    }

    /// Leave the repoint workflow.
    pub fn end_edit(&self) {
        self.state
            .send_if_modified(|sel| sel.editing_enrollment.take().is_some());
    }

    fn apply(&self, key: &'static str, mutate: impl FnOnce(&mut Selection) -> bool) {
        let changed = self.state.send_if_modified(mutate);
        if changed {
            debug!(key, "selection changed, pulsing reload");
            self.reload.pulse();
        }
    }
}

impl Default for SelectionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_career_clears_course_and_group() {
        let ctx = SelectionContext::new();
        ctx.set_career(Some(CareerId::new()));
        ctx.set_cycle(Some(CycleId::new()));
        ctx.set_course(Some(CourseId::new()));
        ctx.set_group(Some(GroupId::new()));

        ctx.set_career(Some(CareerId::new()));

        let sel = ctx.current();
        assert!(sel.career.is_some());
        assert!(sel.cycle.is_some(), "cycle is not a descendant of career");
        assert_eq!(sel.course, None);
        assert_eq!(sel.group, None);
    }

    #[test]
    fn setting_cycle_clears_course_and_group_but_not_career() {
        let ctx = SelectionContext::new();
        let career = CareerId::new();
        ctx.set_career(Some(career));
        ctx.set_cycle(Some(CycleId::new()));
        ctx.set_course(Some(CourseId::new()));
        ctx.set_group(Some(GroupId::new()));

        ctx.set_cycle(Some(CycleId::new()));

        let sel = ctx.current();
        assert_eq!(sel.career, Some(career));
        assert_eq!(sel.course, None);
        assert_eq!(sel.group, None);
    }

    #[test]
    fn setting_course_clears_only_group() {
        let ctx = SelectionContext::new();
        ctx.set_career(Some(CareerId::new()));
        ctx.set_cycle(Some(CycleId::new()));
        ctx.set_course(Some(CourseId::new()));
        ctx.set_group(Some(GroupId::new()));

        ctx.set_course(Some(CourseId::new()));

        let sel = ctx.current();
        assert!(sel.career.is_some());
        assert!(sel.cycle.is_some());
        assert!(sel.course.is_some());
        assert_eq!(sel.group, None);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_value_does_not_pulse() {
        let ctx = SelectionContext::new();
        let career = CareerId::new();
        ctx.set_career(Some(career));

        let mut listener = ctx.reload_listener(Duration::from_millis(100));
        listener.settled().await.unwrap();

        // Same value again: no emit, listener stays parked.
        ctx.set_career(Some(career));
        let woke =
            tokio::time::timeout(Duration::from_secs(1), listener.settled()).await;
        assert!(woke.is_err(), "redundant setter pulsed the signal");
    }

    #[tokio::test(start_paused = true)]
    async fn begin_edit_does_not_pulse() {
        let ctx = SelectionContext::new();
        let mut listener = ctx.reload_listener(Duration::from_millis(100));
        listener.settled().await.unwrap();

        ctx.begin_edit(EnrollmentId::new());
        let woke =
            tokio::time::timeout(Duration::from_secs(1), listener.settled()).await;
        assert!(woke.is_err());
        assert!(ctx.current().editing_enrollment.is_some());

        ctx.end_edit();
        assert_eq!(ctx.current().editing_enrollment, None);
    }
}
