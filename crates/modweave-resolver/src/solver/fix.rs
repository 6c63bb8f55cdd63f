use std::fmt;

use indexmap::IndexMap;
use modweave_version::VersionInterval;

use super::policy::Policy;
use super::pool::{Pool, VarId};
use super::rule::{Rule, RuleType};
use super::rule_set::RuleSet;
use super::solver::{run_sat, SatOutcome};
use crate::candidate::{CandidateGraph, CandidateId};
use crate::config::ResolverConfig;

/// A mod that would have to be added, restricted to version intervals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedMod {
    pub id: String,
    pub intervals: Vec<VersionInterval>,
}

impl fmt::Display for AddedMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let intervals: Vec<String> = self.intervals.iter().map(|i| i.to_string()).collect();
        write!(f, "{} {}", self.id, intervals.join(" or "))
    }
}

/// One way of changing the candidate set so that resolution succeeds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fix {
    pub to_add: Vec<AddedMod>,
    pub to_remove: Vec<CandidateId>,
    /// Installed candidates to swap for a different version range
    pub replacements: Vec<(CandidateId, AddedMod)>,
}

impl Fix {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.replacements.is_empty()
    }

    /// Render as `add {..}, remove {..}, replace [..]`
    pub fn describe(&self, graph: &CandidateGraph) -> String {
        let added: Vec<String> = self.to_add.iter().map(|m| m.to_string()).collect();
        let removed: Vec<String> = self.to_remove.iter().map(|&c| graph[c].to_string()).collect();
        let replaced: Vec<String> = self
            .replacements
            .iter()
            .map(|(old, new)| format!("{} -> {}", graph[*old], new))
            .collect();

        format!(
            "add {{{}}}, remove {{{}}}, replace [{}]",
            added.join(", "),
            removed.join(", "),
            replaced.join(", ")
        )
    }
}

/// What setting a relaxation variable to true stands for
#[derive(Debug, Clone)]
enum Relaxation {
    Remove(CandidateId),
    Add { id: String, intervals: Vec<VersionInterval> },
}

/// Searches for the smallest set of removals and additions that makes a
/// failed round solvable.
///
/// Every root requirement gets a "remove this candidate" variable and every
/// dependency an "add a matching candidate" variable. An addition for an id
/// also stands in for the installed candidates of that id, so swapping a
/// version counts as one change. Increasing limits on the number of active
/// relaxations are tried until one is satisfiable.
pub(crate) struct FixSearch<'p, 'a> {
    pool: &'p Pool<'a>,
    rules: &'p RuleSet,
    policy: &'p Policy,
    config: &'p ResolverConfig,
}

impl<'p, 'a> FixSearch<'p, 'a> {
    pub fn new(pool: &'p Pool<'a>, rules: &'p RuleSet, policy: &'p Policy, config: &'p ResolverConfig) -> Self {
        Self {
            pool,
            rules,
            policy,
            config,
        }
    }

    pub fn find(&self) -> Option<Fix> {
        let base = self.pool.len() as VarId;
        let mut relaxations: Vec<Relaxation> = Vec::new();
        let new_var = |relaxation: Relaxation, relaxations: &mut Vec<Relaxation>| -> VarId {
            relaxations.push(relaxation);
            base + relaxations.len() as VarId
        };

        // One addition variable per distinct (target, constraint) requirement
        let mut add_vars: IndexMap<(String, String), VarId> = IndexMap::new();
        let mut adds_by_id: IndexMap<String, Vec<VarId>> = IndexMap::new();
        for rule in self.rules.of_type(RuleType::Depends) {
            let (Some(target), Some(constraint)) = (rule.target_name(), rule.constraint()) else {
                continue;
            };
            let key = (target.to_string(), constraint.to_string());
            if add_vars.contains_key(&key) {
                continue;
            }
            let intervals = self.requirement_intervals(rule);
            let var = new_var(
                Relaxation::Add {
                    id: target.to_string(),
                    intervals,
                },
                &mut relaxations,
            );
            add_vars.insert(key, var);
            adds_by_id.entry(target.to_string()).or_default().push(var);
        }

        let mut relaxed = RuleSet::new();
        for rule in self.rules.iter() {
            match rule.rule_type() {
                RuleType::RootRequire => {
                    let Some(&candidate) = rule.literals().first() else {
                        relaxed.add(rule.clone());
                        continue;
                    };
                    let remove = new_var(Relaxation::Remove(self.pool.candidate(candidate)), &mut relaxations);
                    let mut rule = rule.clone();
                    rule.push_literal(remove);
                    if let Some(adds) = adds_by_id.get(self.pool.module(candidate).id()) {
                        for &add in adds {
                            rule.push_literal(add);
                        }
                    }
                    relaxed.add(rule);
                    relaxed.add(Rule::conflict(vec![remove, candidate], RuleType::Relaxation));
                }
                RuleType::Depends => {
                    let mut rule = rule.clone();
                    let key = (
                        rule.target_name().unwrap_or_default().to_string(),
                        rule.constraint().unwrap_or_default().to_string(),
                    );
                    if let Some(&add) = add_vars.get(&key) {
                        rule.push_literal(add);
                    }
                    relaxed.add(rule);
                }
                _ => {
                    relaxed.add(rule.clone());
                }
            }
        }

        for (id, adds) in &adds_by_id {
            if !self.pool.committed_owners(id).is_empty() {
                for &add in adds {
                    relaxed.add(Rule::assertion(-add, RuleType::Relaxation));
                }
                continue;
            }

            for var in self.pool.providers(id) {
                if self.pool.module(var).claims_exclusively(id) {
                    for &add in adds {
                        relaxed.add(Rule::conflict(vec![add, var], RuleType::Relaxation));
                    }
                }
            }
            if adds.len() > 1 {
                relaxed.add(Rule::multi_conflict(adds.clone()));
            }
        }

        let var_count = self.pool.len() + relaxations.len();
        let relax_vars: Vec<VarId> = (base + 1..=var_count as VarId).collect();
        let mut policy = self.policy.clone();
        policy.extend_to(var_count);

        for limit in 1..=self.config.max_fix_size.min(relax_vars.len()) {
            let mut attempt = relaxed.clone();
            attempt.add(Rule::at_most(relax_vars.clone(), limit));

            match run_sat(&attempt, var_count, &policy, self.config.max_fix_decisions) {
                Ok(SatOutcome::Satisfied(installed)) => {
                    log::debug!("Found a fix with {} changes", limit);
                    return Some(self.build_fix(&installed, &relaxations));
                }
                Ok(SatOutcome::Unsatisfiable { .. }) => {}
                Err(_) => {
                    log::debug!("Fix search ran out of decisions at {} changes", limit);
                    return None;
                }
            }
        }

        None
    }

    fn requirement_intervals(&self, rule: &Rule) -> Vec<VersionInterval> {
        let dependency = rule
            .source()
            .zip(rule.dependency())
            .and_then(|(source, index)| self.pool.graph()[source].dependencies().get(index));
        match dependency {
            Some(dep) => dep.intervals(),
            None => vec![VersionInterval::infinite()],
        }
    }

    fn build_fix(&self, installed: &[VarId], relaxations: &[Relaxation]) -> Fix {
        let base = self.pool.len() as VarId;
        let mut fix = Fix::default();
        let mut removed = Vec::new();

        for &var in installed.iter().filter(|&&var| var > base) {
            match &relaxations[(var - base - 1) as usize] {
                Relaxation::Remove(candidate) => removed.push(*candidate),
                Relaxation::Add { id, intervals } => {
                    let added = AddedMod {
                        id: id.clone(),
                        intervals: intervals.clone(),
                    };

                    // Installed candidates of the id that the addition displaces
                    let displaced: Vec<CandidateId> = self
                        .pool
                        .providers(id)
                        .into_iter()
                        .filter(|&v| !installed.contains(&v))
                        .map(|v| self.pool.candidate(v))
                        .filter(|&c| {
                            let module = &self.pool.graph()[c];
                            module.is_root() && module.id() == id
                        })
                        .collect();

                    if displaced.is_empty() {
                        fix.to_add.push(added);
                    } else {
                        for candidate in displaced {
                            fix.replacements.push((candidate, added.clone()));
                        }
                    }
                }
            }
        }

        fix.to_remove = removed
            .into_iter()
            .filter(|c| !fix.replacements.iter().any(|(old, _)| old == c))
            .collect();
        fix
    }
}
