//! Durable policy stores over the `(ptype, v0..v5)` relation.

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;

use super::AuthzError;
use crate::models::policy::PolicyRow;

/// Rows to remove and add in one durable change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDelta {
    pub removed: Vec<PolicyRow>,
    pub added: Vec<PolicyRow>,
}

impl PolicyDelta {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Row-oriented backing store for policy and role rules.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Read every stored row.
    async fn load_all(&self) -> Result<Vec<PolicyRow>, AuthzError>;

    /// Apply `delta` atomically: either all of it is saved or none.
    async fn apply(&self, delta: &PolicyDelta) -> Result<(), AuthzError>;
}

/// In-process store, mainly for tests and single-node development.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    rows: Mutex<Vec<PolicyRow>>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing rows.
    pub fn with_rows(rows: Vec<PolicyRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Snapshot of the stored rows.
    pub fn rows(&self) -> Vec<PolicyRow> {
        self.rows.lock().clone()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn load_all(&self) -> Result<Vec<PolicyRow>, AuthzError> {
        Ok(self.rows())
    }

    async fn apply(&self, delta: &PolicyDelta) -> Result<(), AuthzError> {
        let mut rows = self.rows.lock();
        rows.retain(|row| !delta.removed.contains(row));
        for row in &delta.added {
            if !rows.contains(row) {
                rows.push(row.clone());
            }
        }
        Ok(())
    }
}

/// PostgreSQL-backed store (`casbin_rule` table).
#[derive(Debug, Clone)]
pub struct PgPolicyStore {
    pool: PgPool,
}

impl PgPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    async fn load_all(&self) -> Result<Vec<PolicyRow>, AuthzError> {
        sqlx::query_as::<_, PolicyRow>(
            "SELECT ptype, v0, v1, v2, v3, v4, v5 FROM casbin_rule ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthzError::BackingStore(e.to_string()))
    }

    async fn apply(&self, delta: &PolicyDelta) -> Result<(), AuthzError> {
        let persist = |e: sqlx::Error| AuthzError::Persistence(e.to_string());
        let mut tx = self.pool.begin().await.map_err(persist)?;

        for row in &delta.removed {
            sqlx::query(
                "DELETE FROM casbin_rule \
                 WHERE ptype = $1 AND v0 = $2 AND v1 = $3 AND v2 = $4 \
                   AND v3 = $5 AND v4 = $6 AND v5 = $7",
            )
            .bind(&row.ptype)
            .bind(&row.v0)
            .bind(&row.v1)
            .bind(&row.v2)
            .bind(&row.v3)
            .bind(&row.v4)
            .bind(&row.v5)
            .execute(&mut *tx)
            .await
            .map_err(persist)?;
        }

        for row in &delta.added {
            sqlx::query(
                "INSERT INTO casbin_rule (ptype, v0, v1, v2, v3, v4, v5) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT ON CONSTRAINT casbin_rule_unique DO NOTHING",
            )
            .bind(&row.ptype)
            .bind(&row.v0)
            .bind(&row.v1)
            .bind(&row.v2)
            .bind(&row.v3)
            .bind(&row.v4)
            .bind(&row.v5)
            .execute(&mut *tx)
            .await
            .map_err(persist)?;
        }

        tx.commit().await.map_err(persist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::policy::{PolicyRule, RoleBinding};

    #[tokio::test]
    async fn memory_store_applies_removals_then_additions() {
        let keep = PolicyRow::from(&PolicyRule::new("viewer", "/docs/*", "read"));
        let drop = PolicyRow::from(&RoleBinding::new("alice", "viewer"));
        let store = MemoryPolicyStore::with_rows(vec![keep.clone(), drop.clone()]);

        let add = PolicyRow::from(&RoleBinding::new("alice", "editor"));
        store
            .apply(&PolicyDelta {
                removed: vec![drop.clone()],
                added: vec![add.clone(), add.clone()],
            })
            .await
            .unwrap();

        assert_eq!(store.load_all().await.unwrap(), vec![keep, add]);
    }

    #[test]
    fn empty_delta() {
        assert!(PolicyDelta::default().is_empty());
    }
}
