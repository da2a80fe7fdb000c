//! Policy and role-membership records.

use serde::{Deserialize, Serialize};

/// `ptype` of an allow-rule row.
pub const PTYPE_POLICY: &str = "p";
/// `ptype` of a role-membership row.
pub const PTYPE_GROUPING: &str = "g";

/// A (subject, object-pattern, action) allow-rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyRule {
    pub subject: String,
    pub object: String,
    pub action: String,
}

impl PolicyRule {
    pub fn new(
        subject: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
            action: action.into(),
        }
    }
}

/// Subject holds role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleBinding {
    pub subject: String,
    pub role: String,
}

impl RoleBinding {
    pub fn new(subject: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            role: role.into(),
        }
    }
}

/// Row of the durable `(ptype, v0..v5)` relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct PolicyRow {
    pub ptype: String,
    pub v0: String,
    pub v1: String,
    pub v2: String,
    pub v3: String,
    pub v4: String,
    pub v5: String,
}

impl From<&PolicyRule> for PolicyRow {
    fn from(rule: &PolicyRule) -> Self {
        Self {
            ptype: PTYPE_POLICY.to_string(),
            v0: rule.subject.clone(),
            v1: rule.object.clone(),
            v2: rule.action.clone(),
            ..Default::default()
        }
    }
}

impl From<&RoleBinding> for PolicyRow {
    fn from(binding: &RoleBinding) -> Self {
        Self {
            ptype: PTYPE_GROUPING.to_string(),
            v0: binding.subject.clone(),
            v1: binding.role.clone(),
            ..Default::default()
        }
    }
}

/// A row decoded into its typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRecord {
    Rule(PolicyRule),
    Binding(RoleBinding),
}

impl PolicyRow {
    /// Decode the row. Rows with an unknown `ptype` or missing fields yield `None`.
    pub fn decode(&self) -> Option<PolicyRecord> {
        match self.ptype.as_str() {
            PTYPE_POLICY if !self.v0.is_empty() && !self.v1.is_empty() && !self.v2.is_empty() => {
                Some(PolicyRecord::Rule(PolicyRule::new(&self.v0, &self.v1, &self.v2)))
            }
            PTYPE_GROUPING if !self.v0.is_empty() && !self.v1.is_empty() => {
                Some(PolicyRecord::Binding(RoleBinding::new(&self.v0, &self.v1)))
            }
            _ => None,
        }
    }
}
