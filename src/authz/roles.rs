//! Roles and their built-in permission sets
//!
//! Three roles, each a strict superset of the one below it:
//!
//! - `Trainee` - practice questions, manage own notes, plans and progress
//! - `Instructor` - author content and follow every trainee
//! - `Admin` - the whole catalog

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::catalog::Permission;
use super::AuthzError;

/// Principal classification attached to every user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Trainee,
    Instructor,
    Admin,
}

const TRAINEE_PERMISSIONS: &[Permission] = &[
    Permission::QuestionRead,
    Permission::ContentRead,
    Permission::ActivityCreate,
    Permission::ActivityReadOwn,
    Permission::ProgressReadOwn,
    Permission::ProgressUpdateOwn,
    Permission::NoteCreate,
    Permission::NoteReadOwn,
    Permission::NoteUpdateOwn,
    Permission::NoteDeleteOwn,
    Permission::PlanCreate,
    Permission::PlanReadOwn,
    Permission::PlanUpdateOwn,
    Permission::PlanDeleteOwn,
    Permission::AnalyticsReadOwn,
    Permission::TestTake,
    Permission::TestResultsOwn,
    Permission::NotificationRead,
    Permission::ReportCreate,
];

const INSTRUCTOR_PERMISSIONS: &[Permission] = &[
    // everything a trainee holds
    Permission::QuestionRead,
    Permission::ContentRead,
    Permission::ActivityCreate,
    Permission::ActivityReadOwn,
    Permission::ProgressReadOwn,
    Permission::ProgressUpdateOwn,
    Permission::NoteCreate,
    Permission::NoteReadOwn,
    Permission::NoteUpdateOwn,
    Permission::NoteDeleteOwn,
    Permission::PlanCreate,
    Permission::PlanReadOwn,
    Permission::PlanUpdateOwn,
    Permission::PlanDeleteOwn,
    Permission::AnalyticsReadOwn,
    Permission::TestTake,
    Permission::TestResultsOwn,
    Permission::NotificationRead,
    Permission::ReportCreate,
    // authoring
    Permission::QuestionCreate,
    Permission::QuestionUpdate,
    Permission::QuestionHistory,
    Permission::ContentCreate,
    Permission::ContentUpdate,
    Permission::ContentDelete,
    Permission::TestCreate,
    // following trainees
    Permission::ActivityReadAll,
    Permission::ProgressReadAll,
    Permission::PlanReadAll,
    Permission::PlanAssign,
    Permission::UserRead,
    Permission::AnalyticsReadAll,
    Permission::AnalyticsExport,
    Permission::TestResultsAll,
    Permission::NotificationSend,
    Permission::ReportReadAll,
    Permission::ReportResolve,
];

impl Role {
    pub const ALL: &'static [Role] = &[Role::Trainee, Role::Instructor, Role::Admin];

    /// Parse role from string; unknown names yield `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trainee" => Some(Self::Trainee),
            "instructor" => Some(Self::Instructor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trainee => "trainee",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Hebrew display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Trainee => "חניך",
            Self::Instructor => "מדריך",
            Self::Admin => "מנהל",
        }
    }

    /// Built-in permissions of this role
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Self::Trainee => TRAINEE_PERMISSIONS,
            Self::Instructor => INSTRUCTOR_PERMISSIONS,
            Self::Admin => Permission::ALL,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Role permission set by role name. Unknown roles get nothing.
pub fn role_permissions_for(role: &str) -> BTreeSet<Permission> {
    Role::parse(role)
        .map(|role| role.permissions().iter().copied().collect())
        .unwrap_or_default()
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| AuthzError::UnknownRole(s.to_string()))
    }
}
