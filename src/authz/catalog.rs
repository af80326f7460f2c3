//! Permission catalog
//!
//! The closed set of capability tokens known to the platform. Every token has
//! the shape `resource:action[:scope]` and a Hebrew description shown in the
//! administration screens. Anything that is not listed here is not a
//! permission: parsing it fails, and the custom permission store rejects it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::AuthzError;

macro_rules! permission_catalog {
    ($( $variant:ident => ($token:literal, $description:literal), )+) => {
        /// A catalog permission token
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Permission {
            $( $variant, )+
        }

        impl Permission {
            /// Every permission in the catalog, in declaration order
            pub const ALL: &'static [Permission] = &[ $( Permission::$variant, )+ ];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Permission::$variant => $token, )+
                }
            }

            /// Human readable (Hebrew) description
            pub const fn description(&self) -> &'static str {
                match self {
                    $( Permission::$variant => $description, )+
                }
            }

            /// Exact token lookup. Tokens are case sensitive.
            pub fn parse(token: &str) -> Option<Self> {
                match token {
                    $( $token => Some(Permission::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

permission_catalog! {
    // Question bank
    QuestionCreate => ("question:create", "יצירת שאלות"),
    QuestionRead => ("question:read", "צפייה בשאלות"),
    QuestionUpdate => ("question:update", "עריכת שאלות"),
    QuestionDelete => ("question:delete", "מחיקת שאלות"),
    QuestionApprove => ("question:approve", "אישור שאלות לפרסום"),
    QuestionSuspend => ("question:suspend", "השעיית שאלות וטיפול בשאלות מושעות"),
    QuestionHistory => ("question:history", "צפייה בהיסטוריית הגרסאות של שאלות"),

    // Learning content
    ContentCreate => ("content:create", "יצירת תוכן לימודי"),
    ContentRead => ("content:read", "צפייה בתוכן לימודי"),
    ContentUpdate => ("content:update", "עריכת תוכן לימודי"),
    ContentDelete => ("content:delete", "מחיקת תוכן לימודי"),

    // Activity
    ActivityCreate => ("activity:create", "רישום פעילות"),
    ActivityReadOwn => ("activity:read:own", "צפייה בפעילות האישית"),
    ActivityReadAll => ("activity:read:all", "צפייה בפעילות של כל המשתמשים"),

    // Progress
    ProgressReadOwn => ("progress:read:own", "צפייה בהתקדמות האישית"),
    ProgressUpdateOwn => ("progress:update:own", "עדכון ההתקדמות האישית"),
    ProgressReadAll => ("progress:read:all", "צפייה בהתקדמות של כל החניכים"),

    // Notes
    NoteCreate => ("note:create", "יצירת הערות"),
    NoteReadOwn => ("note:read:own", "צפייה בהערות האישיות"),
    NoteUpdateOwn => ("note:update:own", "עריכת הערות אישיות"),
    NoteDeleteOwn => ("note:delete:own", "מחיקת הערות אישיות"),
    NoteReadAll => ("note:read:all", "צפייה בהערות של כל המשתמשים"),

    // Study plans
    PlanCreate => ("plan:create", "יצירת תוכנית לימוד"),
    PlanReadOwn => ("plan:read:own", "צפייה בתוכניות הלימוד האישיות"),
    PlanUpdateOwn => ("plan:update:own", "עריכת תוכניות לימוד אישיות"),
    PlanDeleteOwn => ("plan:delete:own", "מחיקת תוכניות לימוד אישיות"),
    PlanReadAll => ("plan:read:all", "צפייה בכל תוכניות הלימוד"),
    PlanAssign => ("plan:assign", "שיוך תוכניות לימוד לחניכים"),

    // Users
    UserRead => ("user:read", "צפייה במשתמשים"),
    UserCreate => ("user:create", "יצירת משתמשים"),
    UserUpdate => ("user:update", "עריכת פרטי משתמשים"),
    UserDelete => ("user:delete", "מחיקת משתמשים"),
    UserManageRoles => ("user:manage_roles", "ניהול תפקידי משתמשים"),
    UserManagePermissions => ("user:manage_permissions", "ניהול הרשאות מותאמות אישית"),

    // Analytics
    AnalyticsReadOwn => ("analytics:read:own", "צפייה בסטטיסטיקה האישית"),
    AnalyticsReadAll => ("analytics:read:all", "צפייה בסטטיסטיקה של כלל המערכת"),
    AnalyticsExport => ("analytics:export", "ייצוא נתונים סטטיסטיים"),

    // System
    SystemSettings => ("system:settings", "ניהול הגדרות מערכת"),
    SystemBackup => ("system:backup", "גיבוי ושחזור נתונים"),
    SystemLogs => ("system:logs", "צפייה ביומני מערכת"),

    // Tests
    TestTake => ("test:take", "ביצוע מבחנים"),
    TestCreate => ("test:create", "יצירת מבחנים"),
    TestResultsOwn => ("test:results:own", "צפייה בתוצאות המבחנים האישיות"),
    TestResultsAll => ("test:results:all", "צפייה בתוצאות המבחנים של כל החניכים"),

    // Notifications
    NotificationRead => ("notification:read", "קבלת התראות"),
    NotificationSend => ("notification:send", "שליחת התראות"),
    NotificationManage => ("notification:manage", "ניהול התראות מערכת"),

    // Reports on questions
    ReportCreate => ("report:create", "דיווח על שאלה"),
    ReportReadAll => ("report:read:all", "צפייה בכל הדיווחים"),
    ReportResolve => ("report:resolve", "טיפול בדיווחים"),
}

impl Permission {
    /// The `resource` part of the token
    pub fn resource(&self) -> &'static str {
        self.as_str().split(':').next().unwrap_or_default()
    }

    /// The `action` part of the token
    pub fn action(&self) -> &'static str {
        self.as_str().split(':').nth(1).unwrap_or_default()
    }

    /// The optional `own`/`all` qualifier
    pub fn scope(&self) -> Option<&'static str> {
        self.as_str().split(':').nth(2)
    }

    /// Validate a whole list of tokens. Either every token parses or the
    /// error names all of the ones that did not.
    pub fn parse_all<I, S>(tokens: I) -> Result<Vec<Permission>, AuthzError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        let mut invalid = Vec::new();

        for token in tokens {
            let token = token.as_ref();
            match Permission::parse(token) {
                Some(permission) => parsed.push(permission),
                None => invalid.push(token.to_string()),
            }
        }

        if invalid.is_empty() {
            Ok(parsed)
        } else {
            Err(AuthzError::InvalidPermissions(invalid))
        }
    }
}

/// Description for a raw token; falls back to the token itself.
pub fn describe(token: &str) -> String {
    Permission::parse(token)
        .map(|permission| permission.description().to_string())
        .unwrap_or_else(|| token.to_string())
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::parse(s).ok_or_else(|| AuthzError::InvalidPermissions(vec![s.to_string()]))
    }
}

impl TryFrom<String> for Permission {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_are_unique_and_well_formed() {
        let mut seen = HashSet::new();
        for permission in Permission::ALL {
            assert!(seen.insert(permission.as_str()), "duplicate token {}", permission);

            let parts: Vec<&str> = permission.as_str().split(':').collect();
            assert!(parts.len() == 2 || parts.len() == 3, "bad token {}", permission);
            if let Some(scope) = permission.scope() {
                assert!(scope == "own" || scope == "all", "bad scope in {}", permission);
            }
        }
    }

    #[test]
    fn test_parse_matches_as_str() {
        for permission in Permission::ALL {
            assert_eq!(Permission::parse(permission.as_str()), Some(*permission));
        }
        assert_eq!(Permission::parse("QUESTION:CREATE"), None);
        assert_eq!(Permission::parse("not:a:real:permission"), None);
        assert_eq!(Permission::parse(""), None);
    }

    #[test]
    fn test_token_parts() {
        assert_eq!(Permission::ActivityReadOwn.resource(), "activity");
        assert_eq!(Permission::ActivityReadOwn.action(), "read");
        assert_eq!(Permission::ActivityReadOwn.scope(), Some("own"));
        assert_eq!(Permission::QuestionCreate.scope(), None);
    }

    #[test]
    fn test_every_resource_is_covered() {
        let resources: HashSet<&str> = Permission::ALL.iter().map(|p| p.resource()).collect();
        for expected in [
            "question", "content", "activity", "progress", "note", "plan",
            "user", "analytics", "system", "test", "notification", "report",
        ] {
            assert!(resources.contains(expected), "missing resource {}", expected);
        }
    }

    #[test]
    fn test_describe_falls_back_to_token() {
        assert_eq!(describe("question:create"), "יצירת שאלות");
        assert_eq!(describe("made:up"), "made:up");
        assert_eq!(describe(""), "");
    }

    #[test]
    fn test_parse_all_reports_every_invalid_token() {
        let ok = Permission::parse_all(["note:create", "plan:assign"]).unwrap();
        assert_eq!(ok, vec![Permission::NoteCreate, Permission::PlanAssign]);

        let err = Permission::parse_all(["note:create", "bogus", "also:bogus"]).unwrap_err();
        match err {
            AuthzError::InvalidPermissions(tokens) => {
                assert_eq!(tokens, vec!["bogus".to_string(), "also:bogus".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_serde_uses_token() {
        let json = serde_json::to_string(&Permission::QuestionCreate).unwrap();
        assert_eq!(json, "\"question:create\"");

        let back: Permission = serde_json::from_str("\"report:resolve\"").unwrap();
        assert_eq!(back, Permission::ReportResolve);

        assert!(serde_json::from_str::<Permission>("\"question:fly\"").is_err());
    }
}
