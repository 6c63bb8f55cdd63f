use std::time::Instant;

use super::decisions::Decisions;
use super::fix::FixSearch;
use super::policy::Policy;
use super::pool::{Pool, VarId};
use super::problem::Problem;
use super::rule::{Literal, Rule};
use super::rule_generator::RuleGenerator;
use super::rule_set::RuleSet;
use crate::candidate::CandidateId;
use crate::config::ResolverConfig;

/// Above this many rules, failures are explained by the conflicting rule and
/// its immediate reasons instead of a minimal core
const MAX_CORE_RULES: usize = 1_500;

/// Result of one successful solver run.
#[derive(Debug, Clone, Default)]
pub struct SolverResult {
    /// Candidates active in the chosen assignment, in priority order
    pub active: Vec<CandidateId>,
}

#[derive(Debug)]
pub enum SolveError {
    /// No assignment satisfies the rules
    Unsatisfiable(Box<Problem>),
    /// The decision budget ran out before an answer was found
    BudgetExceeded(u64),
}

/// Outcome of the SAT core on one rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SatOutcome {
    /// Variables set to true, ascending
    Satisfied(Vec<VarId>),
    /// The rule that failed last, plus the rules that forced its literals
    Unsatisfiable { conflict: u32, reasons: Vec<u32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BudgetExceeded(pub u64);

/// The SAT solver for mod resolution.
///
/// A DPLL search with unit propagation and chronological backtracking.
/// Branching follows the [`Policy`]: first satisfy triggered requirements
/// with the best remaining candidate, then load greedy candidates; whatever
/// is still undecided afterwards stays unloaded. For identical inputs the
/// search always takes the same path, so results are deterministic.
pub struct Solver<'p, 'a> {
    pool: &'p Pool<'a>,
    policy: Policy,
    config: &'p ResolverConfig,
}

impl<'p, 'a> Solver<'p, 'a> {
    pub fn new(pool: &'p Pool<'a>, config: &'p ResolverConfig) -> Self {
        Self {
            pool,
            policy: Policy::for_pool(pool),
            config,
        }
    }

    pub fn solve(&self) -> Result<SolverResult, SolveError> {
        log::debug!("Generating rules for {} candidates", self.pool.len());
        let start = Instant::now();
        let rules = RuleGenerator::new(self.pool).generate();
        log::debug!("Generated {} rules in {:?}", rules.len(), start.elapsed());

        let sat_start = Instant::now();
        let outcome = run_sat(&rules, self.pool.len(), &self.policy, self.config.max_decisions)
            .map_err(|BudgetExceeded(limit)| SolveError::BudgetExceeded(limit))?;

        match outcome {
            SatOutcome::Satisfied(installed) => {
                log::debug!(
                    "Solved {} candidates with {} rules in {:.3} seconds",
                    self.pool.len(),
                    rules.len(),
                    sat_start.elapsed().as_secs_f64()
                );
                Ok(SolverResult {
                    active: installed.into_iter().map(|var| self.pool.candidate(var)).collect(),
                })
            }
            SatOutcome::Unsatisfiable { conflict, reasons } => {
                log::debug!("Solving failed in {:?}, explaining", sat_start.elapsed());
                let core = self.explain(&rules, conflict, reasons);
                let core_rules: Vec<&Rule> = core.iter().filter_map(|&id| rules.get(id)).collect();
                let problem = Problem::from_rules(self.pool, &core_rules);

                let fix = FixSearch::new(self.pool, &rules, &self.policy, self.config).find();
                Err(SolveError::Unsatisfiable(Box::new(problem.with_fix(fix))))
            }
        }
    }

    /// Rule ids explaining a failure
    fn explain(&self, rules: &RuleSet, conflict: u32, reasons: Vec<u32>) -> Vec<u32> {
        if !self.config.explain_failures || rules.len() > MAX_CORE_RULES {
            let mut ids = reasons;
            ids.push(conflict);
            ids.sort_unstable();
            ids.dedup();
            return ids;
        }

        minimal_core(rules, self.pool.len(), &self.policy, self.config.max_decisions)
    }
}

/// Deletion-based minimal unsatisfiable subset: drop each rule in turn and
/// keep it out whenever the rest stays unsatisfiable. Rules whose removal
/// cannot be decided within the budget are kept.
pub(crate) fn minimal_core(rules: &RuleSet, var_count: usize, policy: &Policy, max_decisions: u64) -> Vec<u32> {
    let mut keep = vec![true; rules.len()];

    for index in 0..rules.len() {
        keep[index] = false;
        let subset = rules.filtered(|rule| keep[rule.id() as usize]);
        match run_sat(&subset, var_count, policy, max_decisions) {
            Ok(SatOutcome::Unsatisfiable { .. }) => {}
            Ok(SatOutcome::Satisfied(_)) | Err(_) => keep[index] = true,
        }
    }

    (0..rules.len() as u32).filter(|&id| keep[id as usize]).collect()
}

/// Run the SAT core over `rules` with variables `1..=var_count`
pub(crate) fn run_sat(
    rules: &RuleSet,
    var_count: usize,
    policy: &Policy,
    max_decisions: u64,
) -> Result<SatOutcome, BudgetExceeded> {
    let var_count = var_count.max(rules.max_var());
    let mut state = SolverState::new(rules, var_count, policy, max_decisions);
    state.run()
}

#[derive(Debug, Clone, Copy)]
struct Branch {
    level: u32,
    literal: Literal,
    flipped: bool,
}

enum RuleStatus {
    Satisfied,
    Open,
    Conflict,
    Unit(Literal),
    Forced(Vec<Literal>),
}

struct SolverState<'r> {
    rules: &'r RuleSet,
    policy: &'r Policy,
    decisions: Decisions,
    /// Rules mentioning each variable
    occurrences: Vec<Vec<u32>>,
    branches: Vec<Branch>,
    propagate_index: usize,
    var_count: usize,
    decision_count: u64,
    max_decisions: u64,
}

impl<'r> SolverState<'r> {
    fn new(rules: &'r RuleSet, var_count: usize, policy: &'r Policy, max_decisions: u64) -> Self {
        let mut occurrences = vec![Vec::new(); var_count + 1];
        for rule in rules.iter() {
            for &literal in rule.literals() {
                let list = &mut occurrences[literal.unsigned_abs() as usize];
                if list.last() != Some(&rule.id()) {
                    list.push(rule.id());
                }
            }
        }

        Self {
            rules,
            policy,
            decisions: Decisions::new(var_count),
            occurrences,
            branches: Vec::new(),
            propagate_index: 0,
            var_count,
            decision_count: 0,
            max_decisions,
        }
    }

    fn run(&mut self) -> Result<SatOutcome, BudgetExceeded> {
        // Level 1 holds everything implied by the rules alone
        self.decisions.increment_level();
        if let Err(conflict) = self.process_initial_rules() {
            return Ok(self.unsatisfiable(conflict));
        }

        loop {
            if let Err(conflict) = self.propagate() {
                if !self.backtrack()? {
                    return Ok(self.unsatisfiable(conflict));
                }
                continue;
            }

            let Some(literal) = self.select_next() else {
                return Ok(SatOutcome::Satisfied(self.decisions.installed()));
            };

            self.count_decision()?;
            self.decisions.increment_level();
            self.decisions.decide(literal, None);
            self.branches.push(Branch {
                level: self.decisions.level(),
                literal,
                flipped: false,
            });
        }
    }

    fn count_decision(&mut self) -> Result<(), BudgetExceeded> {
        self.decision_count += 1;
        if self.decision_count > self.max_decisions {
            log::debug!("Solver gave up after {} decisions", self.max_decisions);
            return Err(BudgetExceeded(self.max_decisions));
        }
        Ok(())
    }

    /// Decide assertions and check for rules that are already violated
    fn process_initial_rules(&mut self) -> Result<(), u32> {
        let rules = self.rules;
        for rule in rules.iter() {
            self.apply(rule)?;
        }
        Ok(())
    }

    fn apply(&mut self, rule: &Rule) -> Result<(), u32> {
        match self.evaluate(rule) {
            RuleStatus::Conflict => return Err(rule.id()),
            RuleStatus::Unit(literal) => self.decisions.decide(literal, Some(rule.id())),
            RuleStatus::Forced(literals) => {
                for literal in literals {
                    self.decisions.decide(literal, Some(rule.id()));
                }
            }
            RuleStatus::Satisfied | RuleStatus::Open => {}
        }
        Ok(())
    }

    /// Unit propagation over every decision not yet propagated
    fn propagate(&mut self) -> Result<(), u32> {
        let rules = self.rules;
        while self.propagate_index < self.decisions.len() {
            let (literal, _) = self.decisions.queue()[self.propagate_index];
            self.propagate_index += 1;

            let var = literal.unsigned_abs() as usize;
            for index in 0..self.occurrences[var].len() {
                let rule_id = self.occurrences[var][index];
                if let Some(rule) = rules.get(rule_id) {
                    self.apply(rule)?;
                }
            }
        }
        Ok(())
    }

    /// Flip the most recent unflipped branch. Returns false when every
    /// branch has been exhausted.
    fn backtrack(&mut self) -> Result<bool, BudgetExceeded> {
        while let Some(branch) = self.branches.pop() {
            if branch.flipped {
                continue;
            }

            self.count_decision()?;
            self.decisions.revert_to_level(branch.level - 1);
            self.decisions.increment_level();
            self.decisions.decide(-branch.literal, None);
            self.propagate_index = self.decisions.len() - 1;
            self.branches.push(Branch {
                level: branch.level,
                literal: -branch.literal,
                flipped: true,
            });
            return Ok(true);
        }
        Ok(false)
    }

    fn evaluate(&self, rule: &Rule) -> RuleStatus {
        if rule.is_multi_conflict() {
            return self.evaluate_multi_conflict(rule);
        }

        let mut open_count = 0;
        let mut open = None;
        for &literal in rule.literals() {
            if self.decisions.satisfied(literal) {
                return RuleStatus::Satisfied;
            }
            if self.decisions.undecided(literal) {
                open_count += 1;
                open = Some(literal);
            }
        }

        match (open_count, open) {
            (0, _) => RuleStatus::Conflict,
            (1, Some(literal)) => RuleStatus::Unit(literal),
            _ => RuleStatus::Open,
        }
    }

    fn evaluate_multi_conflict(&self, rule: &Rule) -> RuleStatus {
        let loaded = rule
            .literals()
            .iter()
            .filter(|&&literal| self.decisions.conflict(literal))
            .count();

        if loaded > rule.limit() {
            return RuleStatus::Conflict;
        }
        if loaded < rule.limit() {
            return RuleStatus::Open;
        }

        let open: Vec<Literal> = rule
            .literals()
            .iter()
            .copied()
            .filter(|&literal| self.decisions.undecided(literal))
            .collect();
        if open.is_empty() {
            RuleStatus::Satisfied
        } else {
            RuleStatus::Forced(open)
        }
    }

    /// Next branching literal, or None once the remaining undecided
    /// variables can all stay unloaded
    fn select_next(&self) -> Option<Literal> {
        // A triggered requirement: every negative literal is false, nothing
        // is satisfied yet and some candidate could still load
        for rule in self.rules.iter() {
            if rule.is_multi_conflict() {
                continue;
            }

            let mut open_positive = Vec::new();
            let mut triggered = true;
            for &literal in rule.literals() {
                if self.decisions.satisfied(literal) {
                    triggered = false;
                    break;
                }
                if self.decisions.undecided(literal) {
                    if literal < 0 {
                        triggered = false;
                        break;
                    }
                    open_positive.push(literal);
                }
            }

            if triggered {
                if let Some(literal) = self.policy.select_preferred(&open_positive) {
                    return Some(literal);
                }
            }
        }

        // Leaving the rest unloaded satisfies every remaining rule: each
        // open clause still has an undecided negative literal
        (1..=self.var_count as VarId).find(|&var| self.decisions.undecided(var) && self.policy.is_greedy(var))
    }

    fn unsatisfiable(&self, conflict: u32) -> SatOutcome {
        let mut reasons = Vec::new();
        if let Some(rule) = self.rules.get(conflict) {
            for &literal in rule.literals() {
                if let Some(reason) = self.decisions.decision_rule(literal) {
                    if reason != conflict && !reasons.contains(&reason) {
                        reasons.push(reason);
                    }
                }
            }
        }
        SatOutcome::Unsatisfiable { conflict, reasons }
    }
}
