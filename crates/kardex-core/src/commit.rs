//! Enrollment commit state machine.
//!
//! One commit attempt walks `Validating → InFlight → Succeeded | Failed`.
//! The machine is re-entrancy-gated: a `commit()` call that arrives while
//! another attempt is validating or in flight is ignored, so a double
//! submission can never produce two records from the same coordinator
//! instance. Terminal outcomes are single-consumption: [`take_outcome`]
//! returns a terminal state once and resets to `Idle`, so a stale success
//! or error cannot be re-acted-upon after navigation.
//!
//! [`take_outcome`]: EnrollmentCommitCoordinator::take_outcome

use std::sync::Arc;

use kardex_catalog::{
    CatalogError, CatalogGateway, EnrollmentId, EnrollmentRecord, GroupId, StudentId,
};
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};

/// Outcome of the current (or last unconsumed) commit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// No attempt in progress, or the last terminal outcome was consumed.
    Idle,
    /// Local preconditions and the duplicate check are being evaluated.
    Validating,
    /// The create or repoint call is on the wire.
    InFlight,
    /// The enrollment was created or repointed.
    Succeeded(EnrollmentChange),
    /// Terminal failure for this attempt; never auto-retried.
    Failed(CatalogError),
}

impl CommitOutcome {
    fn is_busy(&self) -> bool {
        matches!(self, CommitOutcome::Validating | CommitOutcome::InFlight)
    }

    fn is_terminal(&self) -> bool {
        matches!(self, CommitOutcome::Succeeded(_) | CommitOutcome::Failed(_))
    }
}

/// What a successful commit did, broadcast to sibling screens so their
/// derived data (e.g. a student's enrollment list) knows to re-derive.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrollmentChange {
    Created(EnrollmentRecord),
    Repointed {
        enrollment: EnrollmentId,
        group: GroupId,
    },
}

/// Inputs to one commit attempt. `student` and `group` are optional here so
/// the machine itself owns the missing-selection validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRequest {
    pub student: Option<StudentId>,
    pub group: Option<GroupId>,
    /// Present only in the repoint workflow; the duplicate check is skipped
    /// because the edited record would match itself.
    pub editing: Option<EnrollmentId>,
}

/// Validates a resolved selection, guards against duplicates, and performs
/// the create-or-repoint write.
pub struct EnrollmentCommitCoordinator {
    gateway: Arc<dyn CatalogGateway>,
    state: watch::Sender<CommitOutcome>,
    changes: broadcast::Sender<EnrollmentChange>,
}

impl EnrollmentCommitCoordinator {
    pub fn new(gateway: Arc<dyn CatalogGateway>) -> Self {
        let (state, _rx) = watch::channel(CommitOutcome::Idle);
        let (changes, _rx) = broadcast::channel(16);
        Self {
            gateway,
            state,
            changes,
        }
    }

    /// Observable progress stream (`Validating`, `InFlight`, terminals).
    pub fn watch(&self) -> watch::Receiver<CommitOutcome> {
        self.state.subscribe()
    }

    /// Notification stream for sibling screens; independent of the reload
    /// signal because a commit on one screen must invalidate derived data
    /// owned by a different, already-mounted screen.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<EnrollmentChange> {
        self.changes.subscribe()
    }

    /// Single-consumption read of the outcome. A terminal outcome is
    /// returned once and replaced with `Idle`; non-terminal states are
    /// returned without clearing.
    pub fn take_outcome(&self) -> CommitOutcome {
        let mut taken = CommitOutcome::Idle;
        self.state.send_if_modified(|current| {
            if current.is_terminal() {
                taken = std::mem::replace(current, CommitOutcome::Idle);
                true
            } else {
                taken = current.clone();
                false
            }
        });
        taken
    }

    /// Run one commit attempt.
    ///
    /// Ignored (with a warning) when an attempt is already validating or in
    /// flight; the caller observes the first attempt's outcome instead.
    #[instrument(skip(self), fields(student = ?request.student, group = ?request.group, editing = ?request.editing))]
    pub async fn commit(&self, request: CommitRequest) {
        // Atomic check-and-set: of two concurrent calls, exactly one enters.
        let entered = self.state.send_if_modified(|current| {
            if current.is_busy() {
                return false;
            }
            *current = CommitOutcome::Validating;
            true
        });
        if !entered {
            warn!("commit ignored, another attempt is in progress");
            return;
        }

        let Some(group) = request.group else {
            self.finish(CommitOutcome::Failed(CatalogError::Validation(
                "no group selected".to_string(),
            )));
            return;
        };
        let Some(student) = request.student else {
            self.finish(CommitOutcome::Failed(CatalogError::Validation(
                "no student in session or selection".to_string(),
            )));
            return;
        };

        match request.editing {
            // Create path: at most one active enrollment per (student,
            // group), enforced here at commit time, not only at storage.
            None => {
                match self.gateway.enrollment_exists(student, group).await {
                    Ok(true) => {
                        self.finish(CommitOutcome::Failed(CatalogError::Validation(
                            "already enrolled".to_string(),
                        )));
                        return;
                    }
                    Ok(false) => {}
                    Err(err) => {
                        self.finish(CommitOutcome::Failed(err));
                        return;
                    }
                }
                self.publish(CommitOutcome::InFlight);
                match self.gateway.create_enrollment(student, group).await {
                    Ok(record) => {
                        info!(enrollment = %record.id, "enrollment created");
                        self.succeed(EnrollmentChange::Created(record));
                    }
                    Err(err) => self.finish(CommitOutcome::Failed(err)),
                }
            }
            // Repoint path: the existing record is updated in place; no
            // duplicate check against itself.
            Some(enrollment) => {
                self.publish(CommitOutcome::InFlight);
                match self.gateway.repoint_enrollment(enrollment, group).await {
                    Ok(()) => {
                        info!(%enrollment, %group, "enrollment repointed");
                        self.succeed(EnrollmentChange::Repointed { enrollment, group });
                    }
                    Err(err) => self.finish(CommitOutcome::Failed(err)),
                }
            }
        }
    }

    fn succeed(&self, change: EnrollmentChange) {
        // Receiver count may be zero when no sibling screen is mounted.
        let _ = self.changes.send(change.clone());
        self.publish(CommitOutcome::Succeeded(change));
    }

    fn finish(&self, outcome: CommitOutcome) {
        if let CommitOutcome::Failed(err) = &outcome {
            warn!(error = %err, "commit failed");
        }
        self.publish(outcome);
    }

    fn publish(&self, outcome: CommitOutcome) {
        self.state.send_replace(outcome);
    }
}
