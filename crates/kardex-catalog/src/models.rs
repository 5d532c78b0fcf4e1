//! Domain models for the academic catalog.
//!
//! Ids are uuid-backed newtypes so a `GroupId` can never be passed where a
//! `CourseId` is expected. Entities mirror the remote service's wire shapes
//! (serde derives on everything that crosses the gateway).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

id_newtype!(
    /// Identifier of a career (degree program).
    CareerId
);
id_newtype!(
    /// Identifier of an academic cycle (term).
    CycleId
);
id_newtype!(
    /// Identifier of a course within a career's curriculum.
    CourseId
);
id_newtype!(
    /// Identifier of a group (a concrete offering of a course in a cycle).
    GroupId
);
id_newtype!(
    /// Identifier of a student.
    StudentId
);
id_newtype!(
    /// Identifier of an enrollment record.
    EnrollmentId
);

/// An academic term, e.g. "2026B".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: CycleId,
    pub code: String,
}

/// A course in a career's curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub career_id: CareerId,
    pub name: String,
    pub credits: u8,
}

/// A concrete offering of a course in a cycle, with a seat capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub course_id: CourseId,
    pub cycle_id: CycleId,
    pub code: String,
    pub capacity: u32,
}

/// A student eligible to enroll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub code: String,
    pub full_name: String,
}

/// A student's membership in a group.
///
/// Created with `grade = None`; the grade is assigned later by a separate
/// grading workflow. The record is removed only through explicit deletion,
/// never as a side effect of another operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub group_id: GroupId,
    pub grade: Option<f32>,
    pub enrolled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips_through_display_and_parse() {
        let id = GroupId::new();
        let parsed: GroupId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = StudentId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.0));
    }
}
