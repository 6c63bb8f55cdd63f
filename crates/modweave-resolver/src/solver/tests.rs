//! Solver scenarios: one resolution round over a hand-built pool.

use indexmap::IndexMap;
use modweave_version::{Version, VersionPredicate};

use super::solver::{minimal_core, run_sat, SatOutcome};
use super::*;
use crate::candidate::{CandidateGraph, CandidateId, EnvType, ModCandidate, ModDependency, ProvidedMod};
use crate::config::ResolverConfig;
use crate::priority::sort_by_priority;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

fn p(s: &str) -> VersionPredicate {
    VersionPredicate::parse(s).unwrap()
}

fn module(id: &str, version: &str) -> ModCandidate {
    ModCandidate::new(id, v(version))
}

/// A round under construction: pool candidates plus committed constants
struct Round {
    graph: CandidateGraph,
    pool: Vec<CandidateId>,
    committed: Vec<CandidateId>,
    config: ResolverConfig,
}

impl Round {
    fn new() -> Self {
        Self {
            graph: CandidateGraph::new(),
            pool: Vec::new(),
            committed: Vec::new(),
            config: ResolverConfig::default(),
        }
    }

    fn add(&mut self, candidate: ModCandidate) -> CandidateId {
        let id = self.graph.add(candidate);
        self.pool.push(id);
        id
    }

    fn add_nested(&mut self, parent: CandidateId, candidate: ModCandidate) -> CandidateId {
        let id = self.graph.add_nested(parent, candidate);
        self.pool.push(id);
        id
    }

    fn commit(&mut self, candidate: ModCandidate) -> CandidateId {
        let id = self.graph.add(candidate);
        self.committed.push(id);
        id
    }

    fn solve(&mut self, phase: &str) -> Result<SolverResult, SolveError> {
        self.graph.compute_nest_levels();
        let mut sorted = self.pool.clone();
        sort_by_priority(&self.graph, &mut sorted);

        let mut mods_by_id: IndexMap<String, Vec<CandidateId>> = IndexMap::new();
        for &candidate in &sorted {
            for id in self.graph[candidate].all_ids() {
                mods_by_id.entry(id.to_string()).or_default().push(candidate);
            }
        }

        let pool = Pool::new(&self.graph, &sorted, &mods_by_id, &self.committed, EnvType::Client)
            .with_greedy(|module| module.load_phase() == phase);
        Solver::new(&pool, &self.config).solve()
    }

    fn active_names(&mut self, phase: &str) -> Vec<String> {
        let result = self.solve(phase).expect("round should be solvable");
        let mut names: Vec<String> = result.active.iter().map(|&c| self.graph[c].to_string()).collect();
        names.sort();
        names
    }

    fn problem(&mut self, phase: &str) -> Box<Problem> {
        match self.solve(phase) {
            Err(SolveError::Unsatisfiable(problem)) => problem,
            other => panic!("expected an unsatisfiable round, got {:?}", other.map(|r| r.active)),
        }
    }
}

// ============================================================================
// Satisfiable rounds
// ============================================================================

#[test]
fn test_single_root_loads() {
    let mut round = Round::new();
    round.add(module("a", "1.0"));

    assert_eq!(round.active_names("default"), vec!["a 1.0"]);
}

#[test]
fn test_dependency_prefers_newest_nested_version() {
    let mut round = Round::new();
    let a = round.add(module("a", "1.0").with_dependency(ModDependency::depends("b", p(">=1.0"))));
    round.add_nested(a, module("b", "1.0"));
    round.add_nested(a, module("b", "2.0"));

    assert_eq!(round.active_names("default"), vec!["a 1.0", "b 2.0"]);
}

#[test]
fn test_dependency_constraint_excludes_newer_version() {
    let mut round = Round::new();
    let a = round.add(module("a", "1.0").with_dependency(ModDependency::depends("b", p("1.x"))));
    round.add_nested(a, module("b", "1.5"));
    round.add_nested(a, module("b", "2.0"));

    assert_eq!(round.active_names("default"), vec!["a 1.0", "b 1.5"]);
}

#[test]
fn test_nested_candidates_outside_the_phase_stay_inactive() {
    let mut round = Round::new();
    let a = round.add(module("a", "1.0"));
    round.add_nested(a, module("late", "1.0").with_load_phase("late"));

    assert_eq!(round.active_names("default"), vec!["a 1.0"]);
}

#[test]
fn test_shared_alias_allows_several_providers() {
    let mut round = Round::new();
    round.add(module("x", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))));
    round.add(module("y", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))));

    assert_eq!(round.active_names("default"), vec!["x 1.0", "y 1.0"]);
}

#[test]
fn test_exclusive_owner_coexists_with_shared_provider() {
    let mut round = Round::new();
    let x = round.add(module("x", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))));
    round.add_nested(x, module("y", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))));

    assert_eq!(round.active_names("default"), vec!["x 1.0", "y 1.0"]);
}

#[test]
fn test_exclusive_and_shared_alias_roots_both_load() {
    let mut round = Round::new();
    round.add(module("x", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))));
    round.add(module("y", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))));

    assert_eq!(round.active_names("default"), vec!["x 1.0", "y 1.0"]);
}

#[test]
fn test_committed_shared_provider_leaves_exclusive_claimant_alone() {
    let mut round = Round::new();
    round.commit(module("y", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))));
    round.add(module("x", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))));

    assert_eq!(round.active_names("default"), vec!["x 1.0"]);
}

#[test]
fn test_nested_candidate_follows_a_displaced_parent() {
    let mut round = Round::new();
    round.add(module("alpha", "1.0"));
    let host = round.add(module("host", "1.0").with_dependency(ModDependency::conflicts("alpha", p("*"))));
    round.add_nested(host, module("lib", "1.0"));

    assert_eq!(round.active_names("default"), vec!["alpha 1.0"]);
}

#[test]
fn test_committed_parent_carries_nested_candidate() {
    let mut round = Round::new();
    let host = round.commit(module("host", "1.0"));
    round.add_nested(host, module("lib", "1.0"));

    assert_eq!(round.active_names("default"), vec!["lib 1.0"]);
}

#[test]
fn test_any_active_parent_carries_nested_candidate() {
    let mut round = Round::new();
    round.add(module("alpha", "1.0"));
    let first = round.add(module("first", "1.0").with_dependency(ModDependency::conflicts("alpha", p("*"))));
    let second = round.add(module("second", "1.0"));
    let lib = round.add_nested(first, module("lib", "1.0"));
    round.graph.link(second, lib);

    assert_eq!(round.active_names("default"), vec!["alpha 1.0", "lib 1.0", "second 1.0"]);
}

#[test]
fn test_conflicts_displaces_root() {
    let mut round = Round::new();
    round.add(module("alpha", "1.0"));
    round.add(module("beta", "1.0").with_dependency(ModDependency::conflicts("alpha", p("*"))));

    assert_eq!(round.active_names("default"), vec!["alpha 1.0"]);
}

#[test]
fn test_committed_conflict_displaces_root() {
    let mut round = Round::new();
    round.commit(module("alpha", "1.0"));
    round.add(module("beta", "1.0").with_dependency(ModDependency::conflicts("alpha", p("*"))));

    assert!(round.active_names("default").is_empty());
}

#[test]
fn test_committed_candidate_satisfies_dependency() {
    let mut round = Round::new();
    round.commit(module("core", "1.20"));
    round.add(module("a", "1.0").with_dependency(ModDependency::depends("core", p(">=1.19"))));

    assert_eq!(round.active_names("default"), vec!["a 1.0"]);
}

#[test]
fn test_non_greedy_candidates_load_when_required() {
    let mut round = Round::new();
    let a = round.add(module("a", "1.0").with_dependency(ModDependency::depends("lib", p("*"))));
    round.add_nested(a, module("lib", "1.0").with_load_phase("late"));

    assert_eq!(round.active_names("default"), vec!["a 1.0", "lib 1.0"]);
}

// ============================================================================
// Unsatisfiable rounds
// ============================================================================

#[test]
fn test_missing_dependency() {
    let mut round = Round::new();
    round.add(module("a", "1.0").with_dependency(ModDependency::depends("b", p("*"))));

    let problem = round.problem("default");
    assert_eq!(problem.immediate_reason(), "mod a 1.0 requires b *, which is missing");
    assert!(problem.mod_ids().contains(&"b".to_string()));
}

#[test]
fn test_duplicate_roots() {
    let mut round = Round::new();
    round.add(module("a", "1.0"));
    round.add(module("a", "2.0"));

    let problem = round.problem("default");
    assert_eq!(problem.immediate_reason(), "duplicate mod a: a 2.0, a 1.0");

    let fix = problem.fix().expect("a fix should exist");
    assert_eq!(fix.to_remove.len(), 1);
    assert!(fix.to_add.is_empty());
}

#[test]
fn test_version_mismatch_proposes_replacement() {
    let mut round = Round::new();
    round.add(module("a", "1.0").with_dependency(ModDependency::depends("b", p(">=2.0"))));
    let b = round.add(module("b", "1.0"));

    let problem = round.problem("default");
    assert_eq!(
        problem.immediate_reason(),
        "mod a 1.0 requires b >=2.0, but only b 1.0 is present"
    );

    let fix = problem.fix().expect("a fix should exist");
    assert_eq!(fix.replacements.len(), 1);
    assert_eq!(fix.replacements[0].0, b);
    assert_eq!(fix.replacements[0].1.to_string(), "b >=2.0");
    assert_eq!(fix.describe(&round.graph), "add {}, remove {}, replace [b 1.0 -> b >=2.0]");
}

#[test]
fn test_breaks_against_committed() {
    let mut round = Round::new();
    round.commit(module("core", "1.0"));
    round.add(module("a", "1.0").with_dependency(ModDependency::breaks("core", p("<2.0"))));

    let problem = round.problem("default");
    assert_eq!(
        problem.immediate_reason(),
        "mod a 1.0 breaks core <2.0, but core 1.0 is already loaded"
    );
    let fix = problem.fix().expect("a fix should exist");
    assert_eq!(fix.describe(&round.graph), "add {}, remove {a 1.0}, replace []");
}

#[test]
fn test_exclusive_alias_clash_between_roots() {
    let mut round = Round::new();
    round.add(module("x", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))));
    round.add(module("y", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))));

    let problem = round.problem("default");
    assert_eq!(problem.immediate_reason(), "duplicate mod api: x 1.0, y 1.0");
}

#[test]
fn test_committed_exclusive_owner_excludes_claimant() {
    let mut round = Round::new();
    round.commit(module("x", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))));
    round.add(module("z", "1.0").with_provided(ProvidedMod::exclusive("api", v("2.0"))));

    let problem = round.problem("default");
    assert_eq!(problem.immediate_reason(), "id api is already held by x 1.0, excluding z 1.0");
}

#[test]
fn test_required_candidate_without_eligible_parent() {
    let mut round = Round::new();
    // Parent known to the graph but neither pooled nor committed
    let host = round.graph.add(module("host", "1.0"));
    round.add_nested(host, module("lib", "1.0"));
    round.add(module("app", "1.0").with_dependency(ModDependency::depends("lib", p("*"))));

    let problem = round.problem("default");
    assert!(problem
        .reasons()
        .contains(&"mod lib 1.0 is nested in mods that cannot load".to_string()));
}

#[test]
fn test_core_leaves_out_unrelated_rules() {
    let mut round = Round::new();
    round.add(module("a", "1.0").with_dependency(ModDependency::depends("missing", p("*"))));
    round.add(module("c", "1.0"));

    let problem = round.problem("default");
    assert_eq!(problem.reasons().len(), 2);
    assert!(problem.reasons().iter().all(|r| !r.contains("c 1.0")));
}

#[test]
fn test_budget_exceeded() {
    let mut round = Round::new();
    round.config.max_decisions = 1;
    let a = round.add(module("a", "1.0"));
    round.add_nested(a, module("b", "1.0"));
    round.add_nested(a, module("c", "1.0"));

    assert!(matches!(round.solve("default"), Err(SolveError::BudgetExceeded(1))));
}

// ============================================================================
// SAT core
// ============================================================================

#[test]
fn test_run_sat_propagation_blocks_greedy_choice() {
    let mut rules = RuleSet::new();
    // 1 must load; 2 breaks 1, so 3 (greedy, requires 2) cannot load
    rules.add(Rule::assertion(1, RuleType::RootRequire));
    rules.add(Rule::conflict(vec![2, 1], RuleType::Breaks));
    rules.add(Rule::depends(Some(3), vec![2]));

    let mut policy = Policy::new(3);
    policy.set_greedy(3, true);

    let outcome = run_sat(&rules, 3, &policy, 100).unwrap();
    assert_eq!(outcome, SatOutcome::Satisfied(vec![1]));
}

#[test]
fn test_run_sat_backtracks_out_of_greedy_choice() {
    let mut rules = RuleSet::new();
    // 1 requires 2 or 3, both of which require 4, which breaks 1
    rules.add(Rule::depends(Some(1), vec![2, 3]));
    rules.add(Rule::depends(Some(2), vec![4]));
    rules.add(Rule::depends(Some(3), vec![4]));
    rules.add(Rule::conflict(vec![4, 1], RuleType::Breaks));

    let mut policy = Policy::new(4);
    policy.set_greedy(1, true);

    let outcome = run_sat(&rules, 4, &policy, 100).unwrap();
    assert_eq!(outcome, SatOutcome::Satisfied(vec![]));
}

#[test]
fn test_run_sat_at_most() {
    let mut rules = RuleSet::new();
    rules.add(Rule::at_most(vec![1, 2, 3], 2));
    rules.add(Rule::assertion(1, RuleType::RootRequire));
    rules.add(Rule::assertion(2, RuleType::RootRequire));
    rules.add(Rule::assertion(3, RuleType::RootRequire));

    let outcome = run_sat(&rules, 3, &Policy::new(3), 100).unwrap();
    assert!(matches!(outcome, SatOutcome::Unsatisfiable { .. }));

    let mut relaxed = RuleSet::new();
    relaxed.add(Rule::at_most(vec![1, 2, 3], 2));
    relaxed.add(Rule::root_require(1, vec![3]));
    relaxed.add(Rule::root_require(2, vec![]));
    let outcome = run_sat(&relaxed, 3, &Policy::new(3), 100).unwrap();
    assert_eq!(outcome, SatOutcome::Satisfied(vec![1, 2]));
}

#[test]
fn test_empty_rule_is_unsatisfiable() {
    let mut rules = RuleSet::new();
    rules.add(Rule::root_require(1, vec![]));
    rules.add(Rule::depends(None, vec![]));

    let outcome = run_sat(&rules, 1, &Policy::new(1), 10).unwrap();
    assert_eq!(outcome, SatOutcome::Unsatisfiable { conflict: 1, reasons: vec![] });
}

#[test]
fn test_minimal_core() {
    let mut rules = RuleSet::new();
    rules.add(Rule::root_require(1, vec![]));
    rules.add(Rule::root_require(2, vec![]));
    rules.add(Rule::depends(Some(1), vec![3]));
    rules.add(Rule::conflict(vec![3, 1], RuleType::Breaks));
    rules.add(Rule::depends(Some(2), vec![4]));

    let core = minimal_core(&rules, 4, &Policy::new(4), 100);
    assert_eq!(core, vec![0, 2, 3]);
}
