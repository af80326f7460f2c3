//! Application route table
//!
//! Maps client-side paths to the permission needed to open them. Paths may
//! contain `:param` segments that match any single segment.

use serde::{Deserialize, Serialize};

use super::catalog::Permission;

/// A navigation target as described by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub path: String,
    #[serde(default)]
    pub public: bool,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            public: false,
        }
    }

    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            public: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub pattern: &'static str,
    pub public: bool,
    /// `None` means any authenticated user may open the page
    pub permission: Option<Permission>,
}

impl RouteRule {
    const fn public(pattern: &'static str) -> Self {
        Self { pattern, public: true, permission: None }
    }

    const fn signed_in(pattern: &'static str) -> Self {
        Self { pattern, public: false, permission: None }
    }

    const fn requires(pattern: &'static str, permission: Permission) -> Self {
        Self { pattern, public: false, permission: Some(permission) }
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut expected = segments(self.pattern);
        let mut actual = segments(path);
        loop {
            match (expected.next(), actual.next()) {
                (None, None) => return true,
                (Some(e), Some(a)) if e.starts_with(':') || e == a => continue,
                _ => return false,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').filter(|segment| !segment.is_empty())
}

pub const APP_ROUTES: &[RouteRule] = &[
    RouteRule::public("/"),
    RouteRule::public("/login"),
    RouteRule::public("/register"),
    RouteRule::public("/unauthorized"),
    RouteRule::signed_in("/dashboard"),
    RouteRule::signed_in("/profile"),
    // trainee area
    RouteRule::requires("/practice", Permission::QuestionRead),
    RouteRule::requires("/tests", Permission::TestTake),
    RouteRule::requires("/tests/:id/results", Permission::TestResultsOwn),
    RouteRule::requires("/notes", Permission::NoteReadOwn),
    RouteRule::requires("/plans", Permission::PlanReadOwn),
    RouteRule::requires("/progress", Permission::ProgressReadOwn),
    RouteRule::requires("/notifications", Permission::NotificationRead),
    // authoring
    RouteRule::requires("/questions/new", Permission::QuestionCreate),
    RouteRule::requires("/questions/:id/edit", Permission::QuestionUpdate),
    RouteRule::requires("/questions/:id/history", Permission::QuestionHistory),
    RouteRule::requires("/instructor", Permission::ContentCreate),
    RouteRule::requires("/instructor/trainees", Permission::ProgressReadAll),
    RouteRule::requires("/reports", Permission::ReportReadAll),
    // administration
    RouteRule::requires("/manager", Permission::SystemSettings),
    RouteRule::requires("/admin/suspended", Permission::QuestionSuspend),
    RouteRule::requires("/admin/permissions", Permission::UserManagePermissions),
    RouteRule::requires("/admin/users", Permission::UserManageRoles),
    RouteRule::requires("/admin/statistics", Permission::AnalyticsReadAll),
    RouteRule::requires("/admin/logs", Permission::SystemLogs),
];

/// What to do with a path that has no entry in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnlistedRoutePolicy {
    /// Any signed-in user may open it
    #[default]
    Allow,
    /// Only listed routes are reachable
    Deny,
}

impl UnlistedRoutePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "allow" | "open" => Some(Self::Allow),
            "deny" | "allowlist" | "allow_list" | "closed" => Some(Self::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: &'static [RouteRule],
    unlisted: UnlistedRoutePolicy,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(APP_ROUTES)
    }
}

impl RouteTable {
    pub fn new(rules: &'static [RouteRule]) -> Self {
        Self {
            rules,
            unlisted: UnlistedRoutePolicy::default(),
        }
    }

    pub fn with_unlisted_policy(mut self, policy: UnlistedRoutePolicy) -> Self {
        self.unlisted = policy;
        self
    }

    pub fn unlisted_policy(&self) -> UnlistedRoutePolicy {
        self.unlisted
    }

    /// Literal patterns win over patterns with `:param` segments
    pub fn lookup(&self, path: &str) -> Option<&RouteRule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(path))
            .min_by_key(|rule| rule.pattern.matches(':').count())
    }

    pub fn required_permission(&self, path: &str) -> Option<Permission> {
        self.lookup(path).and_then(|rule| rule.permission)
    }

    pub fn rules(&self) -> &'static [RouteRule] {
        self.rules
    }
}
