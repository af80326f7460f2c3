//! Per-user custom permission overlay
//!
//! Holds permissions granted to individual users on top of their role. The
//! store only ever contains catalog permissions: every write validates its
//! input first and is rejected as a whole if any token is unknown.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::catalog::Permission;
use super::principal::UserId;
use super::AuthzError;

#[derive(Debug, Default)]
pub struct PermissionStore {
    overlays: RwLock<HashMap<UserId, BTreeSet<Permission>>>,
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written set behind,
    // every write swaps whole entries.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<UserId, BTreeSet<Permission>>> {
        self.overlays.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<UserId, BTreeSet<Permission>>> {
        self.overlays.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_custom_permissions(&self, user_id: &UserId) -> BTreeSet<Permission> {
        self.read().get(user_id).cloned().unwrap_or_default()
    }

    pub fn contains(&self, user_id: &UserId, permission: Permission) -> bool {
        self.read()
            .get(user_id)
            .map(|set| set.contains(&permission))
            .unwrap_or(false)
    }

    /// Replace the user's whole overlay with `tokens`
    pub fn set_custom_permissions<I, S>(&self, user_id: &UserId, tokens: I) -> Result<(), AuthzError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next = Permission::parse_all(tokens)?.into_iter().collect();
        self.replace(user_id, next);
        Ok(())
    }

    /// Grant a single permission. Granting twice is the same as once.
    pub fn add_custom_permission(&self, user_id: &UserId, token: &str) -> Result<(), AuthzError> {
        let permission: Permission = token.parse()?;
        self.write().entry(user_id.clone()).or_default().insert(permission);
        Ok(())
    }

    /// Revoke a single permission; absent or unknown tokens are a no-op
    pub fn remove_custom_permission(&self, user_id: &UserId, token: &str) {
        let Some(permission) = Permission::parse(token) else {
            return;
        };

        let mut overlays = self.write();
        if let Some(set) = overlays.get_mut(user_id) {
            set.remove(&permission);
            if set.is_empty() {
                overlays.remove(user_id);
            }
        }
    }

    /// Install an already validated set. An empty set drops the entry.
    pub fn replace(&self, user_id: &UserId, permissions: BTreeSet<Permission>) {
        let mut overlays = self.write();
        if permissions.is_empty() {
            overlays.remove(user_id);
        } else {
            overlays.insert(user_id.clone(), permissions);
        }
    }

    /// Drop everything held for a deleted user
    pub fn forget_user(&self, user_id: &UserId) -> bool {
        self.write().remove(user_id).is_some()
    }

    /// Number of users with a non-empty overlay
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
