//! Shared authorization engine.
//!
//! Readers take a cheap `Arc` snapshot of the current [`PolicySet`] and
//! evaluate against it without holding any lock. Writers are serialised,
//! build the next set on a private copy, persist the delta, and only then
//! publish the copy. A failed save therefore never reaches memory.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::AuthzError;
use super::model::PolicySet;
use super::store::{PolicyDelta, PolicyStore};
use crate::models::policy::{PolicyRow, PolicyRule, RoleBinding};

/// Upper bound on any single policy store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide policy engine.
pub struct Enforcer {
    store: Arc<dyn PolicyStore>,
    current: RwLock<Option<Arc<PolicySet>>>,
    writer: Mutex<()>,
    store_timeout: Duration,
}

impl Enforcer {
    /// Create an engine that has not loaded any policy yet.
    ///
    /// Every query fails with [`AuthzError::NotReady`] until [`Enforcer::reload`]
    /// succeeds.
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
            writer: Mutex::new(()),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Create an engine and load the full rule set from `store`.
    pub async fn load(store: Arc<dyn PolicyStore>) -> Result<Self, AuthzError> {
        let enforcer = Self::new(store);
        enforcer.reload().await?;
        Ok(enforcer)
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Result<Arc<PolicySet>, AuthzError> {
        self.current.read().clone().ok_or(AuthzError::NotReady)
    }

    /// Re-read every rule from the store and swap it in whole.
    ///
    /// On failure the previous snapshot (if any) stays in effect.
    pub async fn reload(&self) -> Result<usize, AuthzError> {
        let _guard = self.writer.lock().await;
        let rows = self
            .bounded(self.store.load_all(), AuthzError::BackingStore)
            .await?;
        let (set, skipped) = PolicySet::from_rows(&rows);
        if skipped > 0 {
            warn!(skipped, "ignored undecodable policy rows");
        }
        let loaded = set.rule_count() + set.binding_count();
        *self.current.write() = Some(Arc::new(set));
        info!(loaded, "policy set loaded");
        Ok(loaded)
    }

    /// May `subject` perform `action` on `object`?
    pub fn enforce(&self, subject: &str, object: &str, action: &str) -> Result<bool, AuthzError> {
        let allowed = self.snapshot()?.enforce(subject, object, action);
        debug!(subject, object, action, allowed, "policy decision");
        Ok(allowed)
    }

    pub fn roles_of(&self, subject: &str) -> Result<BTreeSet<String>, AuthzError> {
        Ok(self.snapshot()?.roles_of(subject))
    }

    pub fn effective_roles_of(&self, subject: &str) -> Result<BTreeSet<String>, AuthzError> {
        Ok(self.snapshot()?.effective_roles(subject))
    }

    pub fn subjects_of(&self, role: &str) -> Result<BTreeSet<String>, AuthzError> {
        Ok(self.snapshot()?.subjects_of(role))
    }

    /// Rules attached directly to `subject`.
    pub fn permissions_of(&self, subject: &str) -> Result<Vec<PolicyRule>, AuthzError> {
        Ok(self.snapshot()?.permissions_of(subject))
    }

    /// Rules attached to `subject` or inherited through its roles.
    pub fn effective_permissions_of(&self, subject: &str) -> Result<Vec<PolicyRule>, AuthzError> {
        Ok(self.snapshot()?.effective_permissions_of(subject))
    }

    /// Add an allow-rule. Returns `false` if it already existed.
    pub async fn add_policy(&self, rule: PolicyRule) -> Result<bool, AuthzError> {
        validate_rule(&rule)?;
        self.mutate(|set, delta| {
            let row = PolicyRow::from(&rule);
            if set.insert_rule(rule) {
                delta.added.push(row);
            }
        })
        .await
    }

    /// Remove an allow-rule. Returns `false` if it was not present.
    pub async fn remove_policy(&self, rule: &PolicyRule) -> Result<bool, AuthzError> {
        self.mutate(|set, delta| {
            if set.remove_rule(rule) {
                delta.removed.push(PolicyRow::from(rule));
            }
        })
        .await
    }

    /// Give `binding.subject` the role `binding.role`.
    pub async fn assign_role(&self, binding: RoleBinding) -> Result<bool, AuthzError> {
        validate_binding(&binding)?;
        self.mutate(|set, delta| {
            let row = PolicyRow::from(&binding);
            if set.insert_binding(binding) {
                delta.added.push(row);
            }
        })
        .await
    }

    pub async fn unassign_role(&self, binding: &RoleBinding) -> Result<bool, AuthzError> {
        self.mutate(|set, delta| {
            if set.remove_binding(binding) {
                delta.removed.push(PolicyRow::from(binding));
            }
        })
        .await
    }

    /// Replace every rule of `role` with `grants` (object, action) in one change.
    pub async fn set_role_policies(
        &self,
        role: &str,
        grants: &[(String, String)],
    ) -> Result<bool, AuthzError> {
        let wanted: BTreeSet<PolicyRule> = grants
            .iter()
            .map(|(object, action)| PolicyRule::new(role, object, action))
            .collect();
        for rule in &wanted {
            validate_rule(rule)?;
        }
        self.mutate(|set, delta| {
            for rule in set.permissions_of(role) {
                if !wanted.contains(&rule) && set.remove_rule(&rule) {
                    delta.removed.push(PolicyRow::from(&rule));
                }
            }
            for rule in wanted {
                let row = PolicyRow::from(&rule);
                if set.insert_rule(rule) {
                    delta.added.push(row);
                }
            }
        })
        .await
    }

    /// Drop every rule and binding that names `subject` (as subject or role).
    pub async fn delete_subject(&self, subject: &str) -> Result<bool, AuthzError> {
        self.mutate(|set, delta| {
            for rule in set.permissions_of(subject) {
                set.remove_rule(&rule);
                delta.removed.push(PolicyRow::from(&rule));
            }
            let held = set
                .roles_of(subject)
                .into_iter()
                .map(|role| RoleBinding::new(subject, role));
            let holders = set
                .subjects_of(subject)
                .into_iter()
                .map(|holder| RoleBinding::new(holder, subject));
            let bindings: Vec<RoleBinding> = held.chain(holders).collect();
            for binding in bindings {
                set.remove_binding(&binding);
                delta.removed.push(PolicyRow::from(&binding));
            }
        })
        .await
    }

    /// Apply `edit` to a private copy, persist the resulting delta, then publish.
    async fn mutate<F>(&self, edit: F) -> Result<bool, AuthzError>
    where
        F: FnOnce(&mut PolicySet, &mut PolicyDelta),
    {
        let _guard = self.writer.lock().await;
        let mut next = PolicySet::clone(&*self.snapshot()?);
        let mut delta = PolicyDelta::default();
        edit(&mut next, &mut delta);
        if delta.is_empty() {
            return Ok(false);
        }

        if let Err(e) = self
            .bounded(self.store.apply(&delta), AuthzError::Persistence)
            .await
        {
            warn!(error = %e, "policy change not saved; in-memory set unchanged");
            return Err(e);
        }

        *self.current.write() = Some(Arc::new(next));
        debug!(
            added = delta.added.len(),
            removed = delta.removed.len(),
            "policy change published"
        );
        Ok(true)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, AuthzError>>,
        on_timeout: fn(String) -> AuthzError,
    ) -> Result<T, AuthzError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| on_timeout("policy store timed out".into()))?
    }
}

impl std::fmt::Debug for Enforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enforcer")
            .field("ready", &self.is_ready())
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

fn validate_rule(rule: &PolicyRule) -> Result<(), AuthzError> {
    if rule.subject.is_empty() || rule.object.is_empty() || rule.action.is_empty() {
        return Err(AuthzError::Invalid(
            "subject, object and action are required".into(),
        ));
    }
    Ok(())
}

fn validate_binding(binding: &RoleBinding) -> Result<(), AuthzError> {
    if binding.subject.is_empty() || binding.role.is_empty() {
        return Err(AuthzError::Invalid("subject and role are required".into()));
    }
    if binding.subject == binding.role {
        return Err(AuthzError::Invalid("a subject cannot hold itself".into()));
    }
    Ok(())
}
