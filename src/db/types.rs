use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "schooltype", rename_all = "lowercase")]
pub(crate) enum SchoolType {
    Public,
    Independent,
    Catholic,
}

impl SchoolType {
    pub(crate) const ALL: [SchoolType; 3] =
        [SchoolType::Public, SchoolType::Independent, SchoolType::Catholic];

    pub(crate) fn label(self) -> &'static str {
        match self {
            SchoolType::Public => "Public",
            SchoolType::Independent => "Independent",
            SchoolType::Catholic => "Catholic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "studentstatus", rename_all = "lowercase")]
pub(crate) enum StudentStatus {
    Active,
    Inactive,
}

/// Quiz lifecycle. Numeric codes are the ones clients display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "quizstatus", rename_all = "lowercase")]
pub(crate) enum QuizStatus {
    Practice,
    Upcoming,
    Ongoing,
    Finished,
}

impl QuizStatus {
    pub(crate) fn code(self) -> i16 {
        match self {
            QuizStatus::Practice => 0,
            QuizStatus::Upcoming => 1,
            QuizStatus::Ongoing => 2,
            QuizStatus::Finished => 3,
        }
    }

    pub(crate) fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(QuizStatus::Practice),
            1 => Some(QuizStatus::Upcoming),
            2 => Some(QuizStatus::Ongoing),
            3 => Some(QuizStatus::Finished),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            QuizStatus::Practice => "practice",
            QuizStatus::Upcoming => "upcoming",
            QuizStatus::Ongoing => "ongoing",
            QuizStatus::Finished => "finished",
        }
    }
}

/// Attempt state machine: `Unattempted -> InProgress -> {Submitted | Completed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstate", rename_all = "snake_case")]
pub(crate) enum AttemptState {
    Unattempted,
    InProgress,
    Submitted,
    Completed,
}

impl AttemptState {
    pub(crate) fn code(self) -> i16 {
        match self {
            AttemptState::Unattempted => 1,
            AttemptState::InProgress => 2,
            AttemptState::Submitted => 3,
            AttemptState::Completed => 4,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            AttemptState::Unattempted => "Unattempted",
            AttemptState::InProgress => "In Progress",
            AttemptState::Submitted => "Submitted",
            AttemptState::Completed => "Completed",
        }
    }

    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Submitted | AttemptState::Completed)
    }
}

/// Caller identity resolved once per request by the auth guards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student { student_id: String, school_id: String },
    Teacher { teacher_id: String, school_id: String },
    Admin,
    Anonymous,
}

impl UserRole {
    pub(crate) fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub(crate) fn is_staff_facing(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Teacher { .. })
    }

    pub(crate) fn school_id(&self) -> Option<&str> {
        match self {
            UserRole::Student { school_id, .. } | UserRole::Teacher { school_id, .. } => {
                Some(school_id)
            }
            UserRole::Admin | UserRole::Anonymous => None,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student { .. } => "student",
            UserRole::Teacher { .. } => "teacher",
            UserRole::Admin => "admin",
            UserRole::Anonymous => "anonymous",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_status_codes_roundtrip() {
        for status in
            [QuizStatus::Practice, QuizStatus::Upcoming, QuizStatus::Ongoing, QuizStatus::Finished]
        {
            assert_eq!(QuizStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(QuizStatus::from_code(7), None);
    }

    #[test]
    fn attempt_state_codes_follow_lifecycle_order() {
        assert_eq!(AttemptState::Unattempted.code(), 1);
        assert_eq!(AttemptState::InProgress.code(), 2);
        assert_eq!(AttemptState::Submitted.code(), 3);
        assert_eq!(AttemptState::Completed.code(), 4);
        assert!(AttemptState::Submitted.is_terminal());
        assert!(!AttemptState::InProgress.is_terminal());
    }

    #[test]
    fn role_serialises_as_tagged_union() {
        let role = UserRole::Teacher { teacher_id: "t1".into(), school_id: "s1".into() };
        let json = serde_json::to_value(&role).unwrap();
        assert_eq!(json["kind"], "teacher");
        assert_eq!(json["school_id"], "s1");
        assert_eq!(serde_json::to_value(UserRole::Anonymous).unwrap()["kind"], "anonymous");
    }
}
