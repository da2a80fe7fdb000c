//! Immutable policy snapshot and the pure evaluation over it.

use std::collections::{BTreeSet, VecDeque};

use super::matcher::{action_matches, path_matches};
use crate::models::policy::{PolicyRecord, PolicyRow, PolicyRule, RoleBinding};

/// The current set of allow-rules and role bindings.
///
/// Evaluation is a pure function of this value. The engine never mutates a
/// published snapshot; writers clone, edit and swap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    rules: BTreeSet<PolicyRule>,
    bindings: BTreeSet<RoleBinding>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from durable rows. Returns the set and the number of
    /// rows that could not be decoded.
    pub fn from_rows(rows: &[PolicyRow]) -> (Self, usize) {
        let mut set = Self::new();
        let mut skipped = 0;
        for row in rows {
            match row.decode() {
                Some(PolicyRecord::Rule(rule)) => {
                    set.rules.insert(rule);
                }
                Some(PolicyRecord::Binding(binding)) => {
                    set.bindings.insert(binding);
                }
                None => skipped += 1,
            }
        }
        (set, skipped)
    }

    /// Durable rows for every rule and binding.
    pub fn to_rows(&self) -> Vec<PolicyRow> {
        self.rules
            .iter()
            .map(PolicyRow::from)
            .chain(self.bindings.iter().map(PolicyRow::from))
            .collect()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn has_rule(&self, rule: &PolicyRule) -> bool {
        self.rules.contains(rule)
    }

    pub fn has_binding(&self, binding: &RoleBinding) -> bool {
        self.bindings.contains(binding)
    }

    pub(crate) fn insert_rule(&mut self, rule: PolicyRule) -> bool {
        self.rules.insert(rule)
    }

    pub(crate) fn remove_rule(&mut self, rule: &PolicyRule) -> bool {
        self.rules.remove(rule)
    }

    pub(crate) fn insert_binding(&mut self, binding: RoleBinding) -> bool {
        self.bindings.insert(binding)
    }

    pub(crate) fn remove_binding(&mut self, binding: &RoleBinding) -> bool {
        self.bindings.remove(binding)
    }

    /// Rules whose subject is exactly `subject`.
    fn rules_of<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a PolicyRule> + 'a {
        let start = PolicyRule::new(subject, "", "");
        self.rules
            .range(start..)
            .take_while(move |r| r.subject == subject)
    }

    /// Roles `subject` holds directly.
    pub fn roles_of(&self, subject: &str) -> BTreeSet<String> {
        let start = RoleBinding::new(subject, "");
        self.bindings
            .range(start..)
            .take_while(|b| b.subject == subject)
            .map(|b| b.role.clone())
            .collect()
    }

    /// Subjects that hold `role` directly.
    pub fn subjects_of(&self, role: &str) -> BTreeSet<String> {
        self.bindings
            .iter()
            .filter(|b| b.role == role)
            .map(|b| b.subject.clone())
            .collect()
    }

    /// Every role reachable from `subject` through role bindings.
    ///
    /// Each role is visited once, so cyclic bindings terminate.
    pub fn effective_roles(&self, subject: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<String> = self.roles_of(subject).into_iter().collect();
        while let Some(role) = queue.pop_front() {
            if role == subject || !seen.insert(role.clone()) {
                continue;
            }
            queue.extend(self.roles_of(&role));
        }
        seen
    }

    /// Rules attached to `subject` itself.
    pub fn permissions_of(&self, subject: &str) -> Vec<PolicyRule> {
        self.rules_of(subject).cloned().collect()
    }

    /// Rules attached to `subject` or any of its effective roles.
    pub fn effective_permissions_of(&self, subject: &str) -> Vec<PolicyRule> {
        let mut out = self.permissions_of(subject);
        for role in self.effective_roles(subject) {
            out.extend(self.rules_of(&role).cloned());
        }
        out
    }

    /// Allow if any rule of the subject or its roles covers `(object, action)`.
    pub fn enforce(&self, subject: &str, object: &str, action: &str) -> bool {
        let covers =
            |r: &PolicyRule| path_matches(&r.object, object) && action_matches(&r.action, action);

        if self.rules_of(subject).any(covers) {
            return true;
        }
        self.effective_roles(subject)
            .iter()
            .any(|role| self.rules_of(role).any(covers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs_set() -> PolicySet {
        let mut set = PolicySet::new();
        set.insert_rule(PolicyRule::new("viewer", "/docs/*", "read"));
        set.insert_binding(RoleBinding::new("editor", "viewer"));
        set.insert_binding(RoleBinding::new("alice", "editor"));
        set
    }

    #[test]
    fn inheritance_is_transitive() {
        let set = docs_set();
        assert!(set.enforce("alice", "/docs/42", "read"));
        assert!(!set.enforce("alice", "/docs/42", "write"));
        assert!(set.enforce("editor", "/docs/42", "read"));
        assert!(!set.enforce("bob", "/docs/42", "read"));
    }

    #[test]
    fn absence_of_rules_denies() {
        assert!(!PolicySet::new().enforce("alice", "/", "GET"));
    }

    #[test]
    fn role_scoped_wildcard_rule() {
        let mut set = PolicySet::new();
        set.insert_rule(PolicyRule::new("role:r1", "/api/v1/users/*", "GET"));
        set.insert_rule(PolicyRule::new("role:r2", "/api/v1/users/**", "*"));

        assert!(set.enforce("role:r1", "/api/v1/users/7", "GET"));
        assert!(!set.enforce("role:r1", "/api/v1/users/7/roles", "GET"));
        assert!(!set.enforce("role:r1", "/api/v1/users/7", "DELETE"));

        assert!(set.enforce("role:r2", "/api/v1/users/7/roles", "DELETE"));
    }

    #[test]
    fn cyclic_bindings_terminate() {
        let mut set = PolicySet::new();
        set.insert_binding(RoleBinding::new("a", "b"));
        set.insert_binding(RoleBinding::new("b", "c"));
        set.insert_binding(RoleBinding::new("c", "a"));
        set.insert_rule(PolicyRule::new("c", "/x", "GET"));

        assert!(set.enforce("a", "/x", "GET"));
        assert!(!set.enforce("a", "/y", "GET"));
        assert_eq!(
            set.effective_roles("a"),
            BTreeSet::from(["b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn rule_lookup_does_not_leak_across_prefixed_subjects() {
        let mut set = PolicySet::new();
        set.insert_rule(PolicyRule::new("admin2", "/x", "GET"));
        assert!(!set.enforce("admin", "/x", "GET"));
        assert!(set.permissions_of("admin").is_empty());
    }

    #[test]
    fn direct_and_effective_queries() {
        let set = docs_set();
        assert_eq!(set.roles_of("alice"), BTreeSet::from(["editor".to_string()]));
        assert_eq!(set.subjects_of("viewer"), BTreeSet::from(["editor".to_string()]));
        assert!(set.permissions_of("alice").is_empty());
        assert_eq!(
            set.effective_permissions_of("alice"),
            vec![PolicyRule::new("viewer", "/docs/*", "read")]
        );
    }

    #[test]
    fn rows_round_trip_and_skip_garbage() {
        let set = docs_set();
        let mut rows = set.to_rows();
        rows.push(PolicyRow {
            ptype: "x".into(),
            ..Default::default()
        });
        let (loaded, skipped) = PolicySet::from_rows(&rows);
        assert_eq!(loaded, set);
        assert_eq!(skipped, 1);
    }
}
