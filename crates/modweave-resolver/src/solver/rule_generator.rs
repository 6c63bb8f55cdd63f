use log::trace;

use super::pool::{Pool, VarId};
use super::rule::{Rule, RuleType};
use super::rule_set::RuleSet;
use crate::candidate::{CandidateId, DependencyKind, ModCandidate, ModDependency};

/// Translates a pool into SAT rules.
///
/// Rule order is deterministic: per-candidate rules in priority order, then
/// rules stemming from committed candidates, then id uniqueness rules in id
/// registration order.
pub struct RuleGenerator<'p, 'a> {
    pool: &'p Pool<'a>,
}

/// Candidates answering to a dependency's target with a matching version
struct Matches {
    vars: Vec<VarId>,
    committed: Vec<CandidateId>,
}

impl<'p, 'a> RuleGenerator<'p, 'a> {
    pub fn new(pool: &'p Pool<'a>) -> Self {
        Self { pool }
    }

    pub fn generate(&self) -> RuleSet {
        let mut rules = RuleSet::new();

        for var in self.pool.vars() {
            self.add_root_rule(&mut rules, var);
            self.add_nesting_rule(&mut rules, var);
            self.add_dependency_rules(&mut rules, var);
        }

        for &committed in self.pool.committed() {
            self.add_committed_rules(&mut rules, committed);
        }

        self.add_id_rules(&mut rules);

        trace!("Generated rules for {} candidates", self.pool.len());
        rules
    }

    fn add_root_rule(&self, rules: &mut RuleSet, var: VarId) {
        let candidate = self.pool.candidate(var);
        let module = self.pool.module(var);
        if !module.is_root() {
            return;
        }

        // Displacement only ever comes from `conflicts`, never from `breaks`
        if self
            .pool
            .committed()
            .iter()
            .any(|&c| self.mutually_conflicting(&self.pool.graph()[c], module))
        {
            return;
        }

        let displacers: Vec<VarId> = self
            .pool
            .vars()
            .filter(|&other| other != var)
            .filter(|&other| self.mutually_conflicting(self.pool.module(other), module))
            .collect();

        rules.add(
            Rule::root_require(var, displacers)
                .with_source(candidate)
                .with_target(module.id()),
        );
    }

    /// A nested candidate needs one of its parents. Parents outside the
    /// pool and not committed (environment-disabled or dropped) never count.
    fn add_nesting_rule(&self, rules: &mut RuleSet, var: VarId) {
        let module = self.pool.module(var);
        if module.is_root() {
            return;
        }

        let parents = module.containing();
        if parents.iter().any(|p| self.pool.committed().contains(p)) {
            return;
        }

        let mut parent_vars: Vec<VarId> = parents.iter().filter_map(|&p| self.pool.var(p)).collect();
        parent_vars.sort_unstable();

        rules.add(
            Rule::nesting(var, parent_vars)
                .with_source(self.pool.candidate(var))
                .with_target(module.id()),
        );
    }

    fn mutually_conflicting(&self, a: &ModCandidate, b: &ModCandidate) -> bool {
        self.conflicts_between(a, b) || self.conflicts_between(b, a)
    }

    /// Whether `from` declares an active `conflicts` on `to`
    fn conflicts_between(&self, from: &ModCandidate, to: &ModCandidate) -> bool {
        from.dependencies().iter().any(|dep| {
            dep.kind == DependencyKind::Conflicts
                && dep.applies_in(self.pool.env())
                && to.provided_version(&dep.mod_id).is_some_and(|v| dep.matches(v))
        })
    }

    fn add_dependency_rules(&self, rules: &mut RuleSet, var: VarId) {
        let candidate = self.pool.candidate(var);
        let module = self.pool.module(var);

        for (index, dep) in module.dependencies().iter().enumerate() {
            if !dep.kind.is_hard() || !dep.applies_in(self.pool.env()) {
                continue;
            }

            let matches = self.matching(dep, Some(var));
            match dep.kind {
                DependencyKind::Depends => {
                    let self_satisfied = module.provided_version(&dep.mod_id).is_some_and(|v| dep.matches(v));
                    if self_satisfied || !matches.committed.is_empty() {
                        continue;
                    }
                    rules.add(
                        Rule::depends(Some(var), matches.vars)
                            .with_source(candidate)
                            .with_target(&dep.mod_id)
                            .with_constraint(dep.constraint_string())
                            .with_dependency(index),
                    );
                }
                DependencyKind::Breaks | DependencyKind::Conflicts => {
                    let rule_type = exclusion_type(dep.kind);
                    if !matches.committed.is_empty() {
                        rules.add(
                            Rule::assertion(-var, rule_type)
                                .with_source(candidate)
                                .with_target(&dep.mod_id)
                                .with_constraint(dep.constraint_string())
                                .with_dependency(index),
                        );
                    }
                    for target in matches.vars {
                        rules.add(
                            Rule::conflict(vec![var, target], rule_type)
                                .with_source(candidate)
                                .with_target(&dep.mod_id)
                                .with_constraint(dep.constraint_string())
                                .with_dependency(index),
                        );
                    }
                }
                DependencyKind::Recommends | DependencyKind::Suggests => {}
            }
        }
    }

    /// Relations declared by a committed candidate constrain the pool
    fn add_committed_rules(&self, rules: &mut RuleSet, committed: CandidateId) {
        let module = &self.pool.graph()[committed];

        for (index, dep) in module.dependencies().iter().enumerate() {
            if !dep.kind.is_hard() || !dep.applies_in(self.pool.env()) {
                continue;
            }

            let matches = self.matching(dep, None);
            match dep.kind {
                DependencyKind::Depends => {
                    if !matches.committed.is_empty() {
                        continue;
                    }
                    rules.add(
                        Rule::depends(None, matches.vars)
                            .with_source(committed)
                            .with_target(&dep.mod_id)
                            .with_constraint(dep.constraint_string())
                            .with_dependency(index),
                    );
                }
                DependencyKind::Breaks | DependencyKind::Conflicts => {
                    for target in matches.vars {
                        rules.add(
                            Rule::assertion(-target, exclusion_type(dep.kind))
                                .with_source(committed)
                                .with_target(&dep.mod_id)
                                .with_constraint(dep.constraint_string())
                                .with_dependency(index),
                        );
                    }
                }
                DependencyKind::Recommends | DependencyKind::Suggests => {}
            }
        }
    }

    /// At most one exclusive claimant per id. Shared providers coexist with
    /// each other and with the exclusive owner.
    fn add_id_rules(&self, rules: &mut RuleSet) {
        for id in self.pool.mod_ids() {
            let exclusive: Vec<VarId> = self
                .pool
                .providers(id)
                .into_iter()
                .filter(|&var| self.pool.module(var).claims_exclusively(id))
                .collect();

            if exclusive.is_empty() {
                continue;
            }

            if let Some(&holder) = self.pool.committed_owners(id).first() {
                for &var in &exclusive {
                    rules.add(
                        Rule::assertion(-var, RuleType::SameId)
                            .with_source(holder)
                            .with_target(id.as_str()),
                    );
                }
                continue;
            }

            if exclusive.len() > 1 {
                rules.add(Rule::multi_conflict(exclusive).with_target(id.as_str()));
            }
        }
    }

    /// Pool variables and committed candidates satisfying `dep`, excluding
    /// the declaring variable itself
    fn matching(&self, dep: &ModDependency, declaring: Option<VarId>) -> Matches {
        let vars = self
            .pool
            .providers(&dep.mod_id)
            .into_iter()
            .filter(|&var| Some(var) != declaring)
            .filter(|&var| {
                self.pool
                    .module(var)
                    .provided_version(&dep.mod_id)
                    .is_some_and(|v| dep.matches(v))
            })
            .collect();

        let committed = self
            .pool
            .committed_providers(&dep.mod_id)
            .into_iter()
            .filter(|&c| {
                self.pool.graph()[c]
                    .provided_version(&dep.mod_id)
                    .is_some_and(|v| dep.matches(v))
            })
            .collect();

        Matches { vars, committed }
    }
}

fn exclusion_type(kind: DependencyKind) -> RuleType {
    match kind {
        DependencyKind::Conflicts => RuleType::Conflicts,
        _ => RuleType::Breaks,
    }
}
