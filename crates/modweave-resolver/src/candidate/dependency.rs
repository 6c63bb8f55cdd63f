use modweave_version::{Version, VersionInterval, VersionPredicate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::environment::{EnvType, ModEnvironment};

/// Kind of relation a dependency declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Hard requirement
    Depends,
    /// Advisory requirement, warned about when missing
    Recommends,
    /// Advisory requirement, informational only
    Suggests,
    /// Hard mutual exclusion
    Breaks,
    /// Mutual exclusion; a conflicting candidate may displace a root mod
    Conflicts,
}

impl DependencyKind {
    /// Whether the relation asks for the target to be present
    pub fn is_positive(&self) -> bool {
        matches!(
            self,
            DependencyKind::Depends | DependencyKind::Recommends | DependencyKind::Suggests
        )
    }

    /// Whether the solver has to honor the relation
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            DependencyKind::Depends | DependencyKind::Breaks | DependencyKind::Conflicts
        )
    }

    pub fn key(&self) -> &'static str {
        match self {
            DependencyKind::Depends => "depends",
            DependencyKind::Recommends => "recommends",
            DependencyKind::Suggests => "suggests",
            DependencyKind::Breaks => "breaks",
            DependencyKind::Conflicts => "conflicts",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A relation from one candidate to a target mod id
///
/// A target version matches when any of the predicates accepts it; an empty
/// predicate list matches every version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModDependency {
    pub kind: DependencyKind,
    pub mod_id: String,
    pub predicates: Vec<VersionPredicate>,
    pub environment: ModEnvironment,
    pub reason: Option<String>,
}

impl ModDependency {
    pub fn new(kind: DependencyKind, mod_id: impl Into<String>, predicates: Vec<VersionPredicate>) -> Self {
        Self {
            kind,
            mod_id: mod_id.into(),
            predicates,
            environment: ModEnvironment::Universal,
            reason: None,
        }
    }

    pub fn depends(mod_id: impl Into<String>, predicate: VersionPredicate) -> Self {
        Self::new(DependencyKind::Depends, mod_id, vec![predicate])
    }

    pub fn breaks(mod_id: impl Into<String>, predicate: VersionPredicate) -> Self {
        Self::new(DependencyKind::Breaks, mod_id, vec![predicate])
    }

    pub fn conflicts(mod_id: impl Into<String>, predicate: VersionPredicate) -> Self {
        Self::new(DependencyKind::Conflicts, mod_id, vec![predicate])
    }

    pub fn recommends(mod_id: impl Into<String>, predicate: VersionPredicate) -> Self {
        Self::new(DependencyKind::Recommends, mod_id, vec![predicate])
    }

    pub fn suggests(mod_id: impl Into<String>, predicate: VersionPredicate) -> Self {
        Self::new(DependencyKind::Suggests, mod_id, vec![predicate])
    }

    pub fn with_environment(mut self, environment: ModEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.predicates.is_empty() || self.predicates.iter().any(|p| p.test(version))
    }

    /// Whether the dependency is in effect for the runtime environment
    pub fn applies_in(&self, env: EnvType) -> bool {
        self.environment.matches(env)
    }

    /// Accepted versions as a normalized interval list
    pub fn intervals(&self) -> Vec<VersionInterval> {
        VersionPredicate::intervals_of(&self.predicates)
    }

    /// Predicates joined for display, `*` when unconstrained
    pub fn constraint_string(&self) -> String {
        if self.predicates.is_empty() {
            return "*".to_string();
        }
        self.predicates
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" || ")
    }
}

impl fmt::Display for ModDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.mod_id, self.constraint_string())?;
        if self.environment != ModEnvironment::Universal {
            write!(f, " ({} only)", self.environment)?;
        }
        Ok(())
    }
}
