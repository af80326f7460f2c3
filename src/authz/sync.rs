//! Write-through persistence for the custom permission overlay
//!
//! The persisted user record is the source of truth. Every change is
//! validated, written to the repository, and only then installed in the
//! in-memory store, so the cache never holds a set that storage rejected.
//! Writes are serialized on `writes`: the read, save and install of one
//! change finish before the next change reads the cached set.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::catalog::Permission;
use super::principal::UserId;
use super::store::PermissionStore;
use super::AuthzError;

/// Storage for per-user custom permissions
#[async_trait]
pub trait OverlayRepository: Send + Sync {
    /// Every stored overlay; users without grants may be omitted
    async fn load_all(&self) -> Result<HashMap<UserId, BTreeSet<Permission>>, AuthzError>;

    /// Persist the complete set for one user
    async fn save(&self, user_id: &UserId, permissions: &BTreeSet<Permission>) -> Result<(), AuthzError>;
}

pub struct OverlaySync<R> {
    store: Arc<PermissionStore>,
    repo: R,
    writes: Mutex<()>,
}

impl<R: OverlayRepository> OverlaySync<R> {
    pub fn new(store: Arc<PermissionStore>, repo: R) -> Self {
        Self { store, repo, writes: Mutex::new(()) }
    }

    pub fn store(&self) -> &Arc<PermissionStore> {
        &self.store
    }

    /// Fill the store from storage. Returns the number of users loaded.
    pub async fn hydrate(&self) -> Result<usize, AuthzError> {
        let overlays = self.repo.load_all().await?;
        let mut loaded = 0;
        for (user_id, permissions) in overlays {
            if !permissions.is_empty() {
                loaded += 1;
            }
            self.store.replace(&user_id, permissions);
        }
        tracing::info!(users = loaded, "custom permissions loaded");
        Ok(loaded)
    }

    pub async fn set<I, S>(&self, user_id: &UserId, tokens: I) -> Result<BTreeSet<Permission>, AuthzError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next: BTreeSet<Permission> = Permission::parse_all(tokens)?.into_iter().collect();
        let _guard = self.writes.lock().await;
        self.commit(user_id, next).await
    }

    pub async fn add(&self, user_id: &UserId, token: &str) -> Result<BTreeSet<Permission>, AuthzError> {
        let permission: Permission = token.parse()?;
        let _guard = self.writes.lock().await;
        let mut next = self.store.get_custom_permissions(user_id);
        if !next.insert(permission) {
            return Ok(next);
        }
        self.commit(user_id, next).await
    }

    pub async fn remove(&self, user_id: &UserId, token: &str) -> Result<BTreeSet<Permission>, AuthzError> {
        let _guard = self.writes.lock().await;
        let mut next = self.store.get_custom_permissions(user_id);
        let removed = Permission::parse(token)
            .map(|permission| next.remove(&permission))
            .unwrap_or(false);
        if !removed {
            return Ok(next);
        }
        self.commit(user_id, next).await
    }

    /// Drop a deleted user's overlay from the cache
    pub async fn forget(&self, user_id: &UserId) -> bool {
        let _guard = self.writes.lock().await;
        self.store.forget_user(user_id)
    }

    /// Callers hold `writes`
    async fn commit(
        &self,
        user_id: &UserId,
        next: BTreeSet<Permission>,
    ) -> Result<BTreeSet<Permission>, AuthzError> {
        if let Err(err) = self.repo.save(user_id, &next).await {
            tracing::error!(user_id = %user_id, error = %err, "failed to persist custom permissions");
            return Err(err);
        }

        self.store.replace(user_id, next.clone());
        tracing::info!(user_id = %user_id, count = next.len(), "custom permissions updated");
        Ok(next)
    }
}
