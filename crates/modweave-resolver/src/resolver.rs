//! The phase loop: solve, commit, let handlers react, repeat.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use indexmap::IndexMap;
use log::{debug, info};

use crate::analyzer::{gather_warnings, Diagnostic};
use crate::candidate::{CandidateGraph, CandidateId, DependencyKind, EnvType, ModCandidate};
use crate::condition::{ConditionEvaluator, Tristate};
use crate::config::ResolverConfig;
use crate::context::{PhaseSelectHandler, ResolutionContext};
use crate::error::{ResolutionError, Result};
use crate::phase::PhaseSorting;
use crate::solver::{Pool, SolveError, Solver};

/// Resolves candidate graphs into load sets.
///
/// ```ignore
/// let resolver = Resolver::new(ResolverConfig::new(EnvType::Server));
/// let resolution = resolver.resolve(graph)?;
/// for module in resolution.load_order() {
///     println!("{}", module);
/// }
/// ```
pub struct Resolver {
    config: ResolverConfig,
}

struct NoHandler;

impl PhaseSelectHandler for NoHandler {
    fn on_phase_committed(&mut self, _mods: &[CandidateId], _phase: &str, _ctx: &mut ResolutionContext) -> Result<()> {
        Ok(())
    }
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn resolve(&self, graph: CandidateGraph) -> Result<Resolution> {
        self.resolve_with(graph, IndexMap::new(), &mut NoHandler)
    }

    /// Resolve `graph`, with `disabled` listing candidates known to be
    /// unavailable in the runtime environment and `handler` notified after
    /// every phase that committed candidates.
    ///
    /// Either the whole graph resolves or an error is returned; nothing is
    /// committed partially.
    pub fn resolve_with(
        &self,
        graph: CandidateGraph,
        disabled: IndexMap<String, Vec<ModCandidate>>,
        handler: &mut dyn PhaseSelectHandler,
    ) -> Result<Resolution> {
        let start = Instant::now();
        self.config.validate()?;

        let env = self.config.environment;
        let mut ctx = ResolutionContext::new(graph, env, disabled);
        info!(
            "Resolving {} candidates for the {} environment",
            ctx.all_mods().len(),
            env
        );
        ctx.preselect_builtins()?;

        let mut phases: PhaseSorting<String, CandidateId> = PhaseSorting::new();
        phases.set_cycle_warnings(self.config.phase_cycle_warnings);
        for (before, after) in &self.config.default_phase_ordering {
            phases.add_phase_ordering(before.clone(), after.clone())?;
        }
        let initial: Vec<CandidateId> = ctx.selected_mods().iter().chain(ctx.all_mods()).copied().collect();
        for candidate in initial {
            phases.add(ctx.graph()[candidate].load_phase().to_string(), candidate);
        }

        self.run_phases(&mut ctx, &mut phases, handler)?;

        let resolution = finish(ctx, &phases, env);
        debug!(
            "Resolved {} mods in {:.3} seconds",
            resolution.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(resolution)
    }

    fn run_phases(
        &self,
        ctx: &mut ResolutionContext,
        phases: &mut PhaseSorting<String, CandidateId>,
        handler: &mut dyn PhaseSelectHandler,
    ) -> Result<()> {
        let mut position = 0;
        // After a handler added candidates for the current or an earlier
        // phase, the current phase runs again with those counted as greedy
        let mut rerun = false;

        while !ctx.all_mods().is_empty() {
            let Some(phase) = phases.used_phases().get(position).cloned() else {
                break;
            };
            let current = phases.phase_index(&phase);
            let is_greedy = |module: &ModCandidate| {
                if rerun {
                    phases.phase_index(&module.load_phase().to_string()) <= current
                } else {
                    module.load_phase() == phase
                }
            };

            debug!("Solving phase {} with {} candidates", phase, ctx.all_mods().len());
            let active = self.solve_round(ctx, &is_greedy)?;
            let committed = commit_set(ctx, &active, &is_greedy, self.config.environment);

            for &candidate in &committed {
                ctx.select_mod(candidate)?;
            }

            let added = if committed.is_empty() {
                Vec::new()
            } else {
                handler.on_phase_committed(&committed, &phase, ctx)?;
                ctx.flush_added()
            };

            for &candidate in &added {
                phases.add(ctx.graph()[candidate].load_phase().to_string(), candidate);
            }

            let current = phases.phase_index(&phase);
            let advance = added
                .iter()
                .all(|&c| phases.phase_index(&ctx.graph()[c].load_phase().to_string()) > current);
            let here = phases
                .used_phases()
                .iter()
                .position(|p| *p == phase)
                .unwrap_or(position);

            if advance {
                position = here + 1;
                rerun = false;
            } else {
                debug!("Re-running phase {} for {} added candidates", phase, added.len());
                position = here;
                rerun = true;
            }
        }

        Ok(())
    }

    /// Run the solver over the current pool, returning the active candidates
    fn solve_round<F>(&self, ctx: &ResolutionContext, is_greedy: &F) -> Result<Vec<CandidateId>>
    where
        F: Fn(&ModCandidate) -> bool,
    {
        let env = self.config.environment;
        let candidates = ctx.all_mods().to_vec();
        let committed = ctx.selected_mods().to_vec();
        let pool = Pool::new(ctx.graph(), &candidates, ctx.mods_by_id(), &committed, env).with_greedy(is_greedy);

        match Solver::new(&pool, &self.config).solve() {
            Ok(result) => Ok(result.active),
            Err(SolveError::Unsatisfiable(problem)) => {
                info!("Mod resolution failed: {}", problem.immediate_reason());
                let diagnostic = Diagnostic::from_problem(&problem, ctx.graph(), env, ctx.env_disabled());
                Err(ResolutionError::Unsatisfiable(Box::new(diagnostic)))
            }
            Err(SolveError::BudgetExceeded(limit)) => Err(ResolutionError::SolverBudgetExceeded(limit)),
        }
    }
}

/// Active candidates to commit this round: the greedy ones plus whatever
/// their hard dependencies and their nesting need, in priority order
fn commit_set<F>(ctx: &ResolutionContext, active: &[CandidateId], is_greedy: &F, env: EnvType) -> Vec<CandidateId>
where
    F: Fn(&ModCandidate) -> bool,
{
    let graph = ctx.graph();
    let mut chosen: HashSet<CandidateId> = active.iter().copied().filter(|&c| is_greedy(&graph[c])).collect();
    let mut queue: VecDeque<CandidateId> = active.iter().copied().filter(|c| chosen.contains(c)).collect();

    while let Some(candidate) = queue.pop_front() {
        let module = &graph[candidate];
        if !module.is_root() {
            let held = |c: &CandidateId| ctx.selected_mods().contains(c) || chosen.contains(c);
            if !module.containing().iter().any(held) {
                if let Some(&parent) = active.iter().find(|&&c| module.containing().contains(&c)) {
                    chosen.insert(parent);
                    queue.push_back(parent);
                }
            }
        }
        for dep in module.dependencies() {
            if dep.kind != DependencyKind::Depends || !dep.applies_in(env) {
                continue;
            }
            let satisfies = |c: CandidateId| graph[c].provided_version(&dep.mod_id).is_some_and(|v| dep.matches(v));
            if satisfies(candidate)
                || ctx.selected_mods().iter().any(|&c| satisfies(c))
                || chosen.iter().any(|&c| satisfies(c))
            {
                continue;
            }
            if let Some(&target) = active.iter().find(|&&c| satisfies(c)) {
                chosen.insert(target);
                queue.push_back(target);
            }
        }
    }

    active.iter().copied().filter(|c| chosen.contains(c)).collect()
}

fn finish(ctx: ResolutionContext, phases: &PhaseSorting<String, CandidateId>, env: EnvType) -> Resolution {
    let env_disabled = ctx.env_disabled().clone();
    let mut selected = ctx.selected_mods().to_vec();
    let mut graph = ctx.into_graph();

    selected.sort_by(|&a, &b| graph[a].id().cmp(graph[b].id()));
    cleanup(&mut graph, &selected);
    let warnings = gather_warnings(&graph, &selected, &env_disabled, env);

    let loaded_phases: Vec<String> = phases
        .used_phases()
        .into_iter()
        .filter(|phase| selected.iter().any(|&c| graph[c].load_phase() == phase))
        .collect();

    Resolution::compact(graph, &selected, loaded_phases, phases.cycles().to_vec(), warnings)
}

/// Drop cached state and edges of everything not selected, then recompute
/// nest levels over what is left
fn cleanup(graph: &mut CandidateGraph, selected: &[CandidateId]) {
    let keep: HashSet<CandidateId> = selected.iter().copied().collect();

    for id in graph.ids().collect::<Vec<_>>() {
        if !keep.contains(&id) {
            graph.get_mut(id).clear_payload();
            graph.sever(id);
        }
    }

    let mut queue = VecDeque::new();
    for &id in selected {
        let module = graph.get_mut(id);
        if module.is_root() {
            module.min_nest_level = Some(0);
            queue.push_back(id);
        } else {
            module.min_nest_level = None;
        }
    }
    graph.relax_nest_levels(queue);
}

/// The outcome of a resolution: the selected candidates ordered by id.
///
/// Containment edges of the returned candidates refer to positions in
/// [`Resolution::mods`].
#[derive(Debug, Clone)]
pub struct Resolution {
    mods: Vec<ModCandidate>,
    by_id: HashMap<String, usize>,
    phases: Vec<String>,
    phase_cycles: Vec<(String, String)>,
    warnings: Vec<String>,
}

impl Resolution {
    fn compact(
        graph: CandidateGraph,
        selected: &[CandidateId],
        phases: Vec<String>,
        phase_cycles: Vec<(String, String)>,
        warnings: Vec<String>,
    ) -> Self {
        let remap: HashMap<CandidateId, CandidateId> = selected
            .iter()
            .enumerate()
            .map(|(index, &c)| (c, CandidateId(index)))
            .collect();
        let remap_all = |ids: &[CandidateId]| -> Vec<CandidateId> { ids.iter().filter_map(|c| remap.get(c).copied()).collect() };

        let mut slots: Vec<Option<ModCandidate>> = graph.into_mods().into_iter().map(Some).collect();
        let mut mods = Vec::with_capacity(selected.len());
        for &candidate in selected {
            if let Some(mut module) = slots.get_mut(candidate.index()).and_then(Option::take) {
                module.containing = remap_all(&module.containing);
                module.contained = remap_all(&module.contained);
                mods.push(module);
            }
        }

        let mut by_id = HashMap::new();
        for (index, module) in mods.iter().enumerate() {
            for id in module.all_ids() {
                by_id.entry(id.to_string()).or_insert(index);
            }
        }

        Self {
            mods,
            by_id,
            phases,
            phase_cycles,
            warnings,
        }
    }

    /// Selected candidates ordered by id
    pub fn mods(&self) -> &[ModCandidate] {
        &self.mods
    }

    /// The candidate answering to `id`, by primary id or alias
    pub fn get(&self, id: &str) -> Option<&ModCandidate> {
        self.by_id.get(id).map(|&index| &self.mods[index])
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    /// Phases holding selected candidates, in load order
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// Candidates grouped by phase in phase order, by id within a phase
    pub fn load_order(&self) -> Vec<&ModCandidate> {
        let mut ordered: Vec<&ModCandidate> = self.mods.iter().collect();
        ordered.sort_by_key(|m| {
            self.phases
                .iter()
                .position(|p| p == m.load_phase())
                .unwrap_or(usize::MAX)
        });
        ordered
    }

    /// Phase ordering constraints found to be cyclic
    pub fn phase_cycles(&self) -> &[(String, String)] {
        &self.phase_cycles
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Answers whether a mod id is part of the resolved set
    pub fn evaluator(&self) -> &dyn ConditionEvaluator {
        self
    }

    pub fn into_mods(self) -> Vec<ModCandidate> {
        self.mods
    }
}

impl ConditionEvaluator for Resolution {
    fn evaluate(&self, mod_id: &str) -> Tristate {
        if mod_id.is_empty() {
            return Tristate::Unknown;
        }
        Tristate::from(self.by_id.contains_key(mod_id))
    }
}
