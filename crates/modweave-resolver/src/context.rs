//! State of one resolution call.
//!
//! The context owns the candidate graph, the pool of candidates that are not
//! decided yet, the id index over that pool and the selected set. Phase
//! handlers get mutable access to it and may add or remove candidates; such
//! changes are buffered and folded into the pool before the phase loop
//! continues.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexMap;
use log::debug;

use crate::candidate::{CandidateGraph, CandidateId, DependencyKind, EnvType, ModCandidate};
use crate::condition::{ConditionEvaluator, Tristate};
use crate::error::{ResolutionError, Result};
use crate::priority::sort_by_priority;

/// Callback run after every phase that committed candidates.
///
/// `mods` are the candidates selected in this round. The handler may use
/// [`ResolutionContext::add_mod`] and friends to inject further candidates;
/// they take part in resolution from the next round on.
pub trait PhaseSelectHandler {
    fn on_phase_committed(&mut self, mods: &[CandidateId], phase: &str, ctx: &mut ResolutionContext) -> Result<()>;
}

impl<F> PhaseSelectHandler for F
where
    F: FnMut(&[CandidateId], &str, &mut ResolutionContext) -> Result<()>,
{
    fn on_phase_committed(&mut self, mods: &[CandidateId], phase: &str, ctx: &mut ResolutionContext) -> Result<()> {
        self(mods, phase, ctx)
    }
}

pub struct ResolutionContext {
    graph: CandidateGraph,
    env: EnvType,
    /// Candidates excluded by the runtime environment, by every id they answer to
    env_disabled: IndexMap<String, Vec<CandidateId>>,
    /// Undecided candidates in priority order
    pool: Vec<CandidateId>,
    /// Undecided candidates by every id they answer to
    mods_by_id: IndexMap<String, Vec<CandidateId>>,
    /// Owner of every selected id
    selected: HashMap<String, CandidateId>,
    /// Selected candidates in selection order
    unique_selected: Vec<CandidateId>,
    /// Candidates added by a handler, not yet part of the pool
    added: Vec<CandidateId>,
}

impl ResolutionContext {
    /// Take over `graph`, moving candidates that cannot run in `env` aside.
    ///
    /// `disabled` lists candidates the caller already knows to be disabled
    /// for the environment; they are kept for diagnostics only.
    pub fn new(graph: CandidateGraph, env: EnvType, disabled: IndexMap<String, Vec<ModCandidate>>) -> Self {
        let mut ctx = Self {
            graph,
            env,
            env_disabled: IndexMap::new(),
            pool: Vec::new(),
            mods_by_id: IndexMap::new(),
            selected: HashMap::new(),
            unique_selected: Vec::new(),
            added: Vec::new(),
        };

        ctx.graph.compute_nest_levels();

        let mut enabled = Vec::new();
        for id in ctx.graph.ids().collect::<Vec<_>>() {
            if ctx.graph[id].environment().matches(env) {
                enabled.push(id);
            } else {
                ctx.disable(id);
            }
        }

        for candidate in disabled.into_values().flatten() {
            let id = ctx.graph.add(candidate);
            ctx.disable(id);
        }

        ctx.ingest(enabled);
        ctx
    }

    pub fn graph(&self) -> &CandidateGraph {
        &self.graph
    }

    pub(crate) fn into_graph(self) -> CandidateGraph {
        self.graph
    }

    pub fn env(&self) -> EnvType {
        self.env
    }

    /// Undecided candidates answering to `id`, in priority order
    pub fn mods(&self, id: &str) -> &[CandidateId] {
        self.mods_by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every undecided candidate in priority order
    pub fn all_mods(&self) -> &[CandidateId] {
        &self.pool
    }

    pub(crate) fn mods_by_id(&self) -> &IndexMap<String, Vec<CandidateId>> {
        &self.mods_by_id
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains_key(id)
    }

    /// The selected candidate owning `id`
    pub fn selected(&self, id: &str) -> Option<CandidateId> {
        self.selected.get(id).copied()
    }

    /// Selected candidates in the order they were selected
    pub fn selected_mods(&self) -> &[CandidateId] {
        &self.unique_selected
    }

    pub fn env_disabled(&self) -> &IndexMap<String, Vec<CandidateId>> {
        &self.env_disabled
    }

    /// Add a top-level candidate.
    ///
    /// Returns `None` when the candidate is rejected: its id is selected
    /// already, the same id and version is pending, or it cannot run in the
    /// runtime environment.
    pub fn add_mod(&mut self, candidate: ModCandidate) -> Option<CandidateId> {
        if !self.accepts(&candidate) {
            return None;
        }
        let id = self.graph.add(candidate);
        self.buffer(id)
    }

    /// Add a candidate nested inside an already known candidate. Trees are
    /// added by calling this again with the returned handle.
    pub fn add_nested_mod(&mut self, parent: CandidateId, candidate: ModCandidate) -> Option<CandidateId> {
        if self.graph.get(parent).is_none() || !self.accepts(&candidate) {
            return None;
        }
        let id = self.graph.add_nested(parent, candidate);
        self.buffer(id)
    }

    /// Drop every undecided candidate whose primary id is `id`
    pub fn remove_mod(&mut self, id: &str) -> bool {
        let graph = &self.graph;
        let before = self.pool.len() + self.added.len();
        self.pool.retain(|&c| graph[c].id() != id);
        self.added.retain(|&c| graph[c].id() != id);
        let removed = before != self.pool.len() + self.added.len();

        if removed {
            debug!("Removed candidates of {} from the pool", id);
            self.reindex();
        }
        removed
    }

    fn accepts(&self, candidate: &ModCandidate) -> bool {
        if self.selected.contains_key(candidate.id()) {
            return false;
        }
        !self
            .pool
            .iter()
            .chain(&self.added)
            .map(|&c| &self.graph[c])
            .any(|m| m.id() == candidate.id() && m.version() == candidate.version())
    }

    fn buffer(&mut self, id: CandidateId) -> Option<CandidateId> {
        if !self.graph[id].environment().matches(self.env) {
            debug!("Candidate {} is disabled for the {} environment", self.graph[id], self.env);
            self.disable(id);
            return None;
        }
        self.added.push(id);
        Some(id)
    }

    fn disable(&mut self, id: CandidateId) {
        let ids: Vec<String> = self.graph[id].all_ids().map(str::to_string).collect();
        for mod_id in ids {
            self.env_disabled.entry(mod_id).or_default().push(id);
        }
    }

    /// Fold the handler buffer into the pool, returning the new candidates
    pub(crate) fn flush_added(&mut self) -> Vec<CandidateId> {
        let added = std::mem::take(&mut self.added);
        if added.is_empty() {
            return added;
        }

        let mut queue = VecDeque::new();
        for &id in &added {
            let module = self.graph.get_mut(id);
            if module.is_root() {
                module.min_nest_level = Some(0);
                queue.push_back(id);
            } else {
                queue.extend(module.containing().iter().copied());
            }
        }
        self.graph.relax_nest_levels(queue);

        self.ingest(added.clone());
        added
    }

    /// Insert a batch of enabled candidates into the pool
    fn ingest(&mut self, batch: Vec<CandidateId>) {
        self.pool.extend(batch.iter().copied());
        sort_by_priority(&self.graph, &mut self.pool);
        self.reindex();
        self.soften_legacy_dependencies(&batch);
    }

    fn reindex(&mut self) {
        self.mods_by_id.clear();
        for &candidate in &self.pool {
            for id in self.graph[candidate].all_ids() {
                self.mods_by_id.entry(id.to_string()).or_default().push(candidate);
            }
        }
    }

    /// Old metadata declared dependencies on mods that only exist in one
    /// environment without saying so. A positive dependency on an id whose
    /// only matching candidates are environment-disabled becomes a
    /// suggestion.
    fn soften_legacy_dependencies(&mut self, batch: &[CandidateId]) {
        for &candidate in batch {
            if self.graph[candidate].schema_version() >= 2 {
                continue;
            }

            let mut softened = Vec::new();
            for (index, dep) in self.graph[candidate].dependencies().iter().enumerate() {
                if !dep.kind.is_positive() || dep.kind == DependencyKind::Suggests {
                    continue;
                }
                if self.mods_by_id.contains_key(&dep.mod_id) || self.selected.contains_key(&dep.mod_id) {
                    continue;
                }
                let disabled_match = self.env_disabled.get(&dep.mod_id).is_some_and(|list| {
                    list.iter()
                        .any(|&c| self.graph[c].provided_version(&dep.mod_id).is_some_and(|v| dep.matches(v)))
                });
                if disabled_match {
                    softened.push(index);
                }
            }

            for index in softened {
                let dep = &mut self.graph.get_mut(candidate).dependencies_mut()[index];
                debug!(
                    "Softening {} {} to suggests, it is only available in another environment",
                    dep.kind, dep.mod_id
                );
                dep.kind = DependencyKind::Suggests;
            }
        }
    }

    /// Commit every builtin candidate.
    ///
    /// A builtin id must not be claimed by any non-builtin candidate.
    pub(crate) fn preselect_builtins(&mut self) -> Result<()> {
        let mut builtins = Vec::new();

        for (id, candidates) in &self.mods_by_id {
            let (builtin, others): (Vec<CandidateId>, Vec<CandidateId>) =
                candidates.iter().partition(|&&c| self.graph[c].is_builtin());
            let Some(&first) = builtin.first() else {
                continue;
            };
            if !others.is_empty() {
                let names: Vec<String> = others.iter().map(|&c| self.describe(c)).collect();
                return Err(ResolutionError::BuiltinCollision {
                    builtin: format!("{} ({})", self.graph[first], id),
                    others: names.join(", "),
                });
            }
            for c in builtin {
                if !builtins.contains(&c) {
                    builtins.push(c);
                }
            }
        }

        for candidate in builtins {
            self.select_mod(candidate)?;
        }
        Ok(())
    }

    fn describe(&self, candidate: CandidateId) -> String {
        let module = &self.graph[candidate];
        match module.origin_paths().first() {
            Some(path) => format!("{} from {}", module, path.display()),
            None => module.to_string(),
        }
    }

    /// Record `candidate` as selected and drop its competitors from the pool
    pub(crate) fn select_mod(&mut self, candidate: CandidateId) -> Result<()> {
        let module = &self.graph[candidate];
        let mut discarded = vec![candidate];

        for id in module.all_ids() {
            if module.claims_exclusively(id) {
                if let Some(&owner) = self.selected.get(id) {
                    if owner != candidate && self.graph[owner].claims_exclusively(id) {
                        return Err(ResolutionError::DuplicateMod(format!(
                            "{}: {} and {}",
                            id, self.graph[owner], module
                        )));
                    }
                }
                self.selected.insert(id.to_string(), candidate);
                discarded.extend(self.mods(id).iter().copied());
            } else {
                // Other shared providers go; exclusive claimants stay eligible
                self.selected.entry(id.to_string()).or_insert(candidate);
                discarded.extend(
                    self.mods(id)
                        .iter()
                        .copied()
                        .filter(|&c| !self.graph[c].claims_exclusively(id)),
                );
            }
        }

        debug!("Selected {}", module);
        self.unique_selected.push(candidate);
        self.pool.retain(|c| !discarded.contains(c));
        self.added.retain(|c| !discarded.contains(c));
        self.reindex();
        Ok(())
    }
}

impl ConditionEvaluator for ResolutionContext {
    /// Selected ids are present, ids with undecided candidates may still
    /// become present, anything else is absent
    fn evaluate(&self, mod_id: &str) -> Tristate {
        if self.selected.contains_key(mod_id) {
            Tristate::True
        } else if self.mods_by_id.contains_key(mod_id)
            || self.added.iter().any(|&c| self.graph[c].provided_version(mod_id).is_some())
        {
            Tristate::Unknown
        } else {
            Tristate::False
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{ModDependency, ModEnvironment, ProvidedMod};
    use modweave_version::{Version, VersionPredicate};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn module(id: &str, version: &str) -> ModCandidate {
        ModCandidate::new(id, v(version))
    }

    fn context(mods: Vec<ModCandidate>) -> ResolutionContext {
        let mut graph = CandidateGraph::new();
        for m in mods {
            graph.add(m);
        }
        ResolutionContext::new(graph, EnvType::Client, IndexMap::new())
    }

    fn names(ctx: &ResolutionContext, ids: &[CandidateId]) -> Vec<String> {
        ids.iter().map(|&c| ctx.graph()[c].to_string()).collect()
    }

    #[test]
    fn test_pool_is_priority_sorted_and_indexed_by_alias() {
        let ctx = context(vec![
            module("b", "1.0"),
            module("a", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))),
            module("a", "2.0"),
        ]);

        assert_eq!(names(&ctx, ctx.all_mods()), vec!["a 2.0", "a 1.0", "b 1.0"]);
        assert_eq!(names(&ctx, ctx.mods("api")), vec!["a 1.0"]);
        assert!(ctx.mods("missing").is_empty());
    }

    #[test]
    fn test_environment_filter() {
        let ctx = context(vec![
            module("a", "1.0"),
            module("server_only", "1.0").with_environment(ModEnvironment::Server),
        ]);

        assert_eq!(names(&ctx, ctx.all_mods()), vec!["a 1.0"]);
        assert!(ctx.env_disabled().contains_key("server_only"));
        assert_eq!(ctx.evaluate("server_only"), Tristate::False);
    }

    #[test]
    fn test_select_removes_competitors() {
        let mut ctx = context(vec![
            module("a", "2.0"),
            module("a", "1.0"),
            module("x", "1.0").with_provided(ProvidedMod::exclusive("a", v("1.5"))),
            module("w", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))),
            module("y", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))),
            module("z", "1.0").with_provided(ProvidedMod::shared("api", v("1.0"))),
        ]);

        let a2 = ctx.mods("a")[0];
        ctx.select_mod(a2).unwrap();
        assert!(ctx.is_selected("a"));
        assert_eq!(names(&ctx, ctx.all_mods()), vec!["w 1.0", "y 1.0", "z 1.0"]);

        // a shared alias drops the other shared providers, not the exclusive owner
        let y = ctx.mods("y")[0];
        ctx.select_mod(y).unwrap();
        assert_eq!(names(&ctx, ctx.all_mods()), vec!["w 1.0"]);
        assert_eq!(ctx.selected("api"), Some(y));
        assert_eq!(ctx.evaluate("api"), Tristate::True);
        assert_eq!(ctx.evaluate("z"), Tristate::False);
        assert_eq!(ctx.evaluate("w"), Tristate::Unknown);

        // the exclusive owner takes over the id from a shared holder
        let w = ctx.mods("w")[0];
        ctx.select_mod(w).unwrap();
        assert_eq!(ctx.selected("api"), Some(w));
        assert!(ctx.all_mods().is_empty());
    }

    #[test]
    fn test_select_rejects_second_exclusive_owner() {
        let mut ctx = context(vec![
            module("x", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))),
            module("y", "1.0").with_provided(ProvidedMod::exclusive("api", v("1.0"))),
        ]);

        let x = ctx.mods("x")[0];
        let y = ctx.mods("y")[0];
        ctx.select_mod(x).unwrap();
        let err = ctx.select_mod(y).unwrap_err();
        assert!(err.to_string().contains("api: x 1.0 and y 1.0"), "{}", err);
    }

    #[test]
    fn test_builtin_preselection() {
        let mut ctx = context(vec![module("runtime", "1.20").builtin(), module("a", "1.0")]);
        ctx.preselect_builtins().unwrap();

        assert!(ctx.is_selected("runtime"));
        assert_eq!(names(&ctx, ctx.all_mods()), vec!["a 1.0"]);
    }

    #[test]
    fn test_builtin_collision() {
        let mut ctx = context(vec![
            module("core", "1.0").builtin(),
            module("core", "2.0").with_origin_path("mods/core.jar"),
        ]);

        let err = ctx.preselect_builtins().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("share ID with builtin"), "{}", message);
        assert!(message.contains("core 2.0 from mods/core.jar"), "{}", message);
    }

    #[test]
    fn test_add_mod_rejections() {
        let mut ctx = context(vec![module("a", "1.0"), module("b", "1.0")]);
        let a = ctx.mods("a")[0];
        ctx.select_mod(a).unwrap();

        assert!(ctx.add_mod(module("a", "3.0")).is_none());
        assert!(ctx.add_mod(module("b", "1.0")).is_none());
        assert!(ctx.add_mod(module("s", "1.0").with_environment(ModEnvironment::Server)).is_none());

        let c = ctx.add_mod(module("c", "1.0")).unwrap();
        assert!(ctx.add_mod(module("c", "1.0")).is_none());
        assert_eq!(ctx.evaluate("c"), Tristate::Unknown);

        let nested = ctx.add_nested_mod(c, module("d", "1.0")).unwrap();
        assert_eq!(ctx.flush_added(), vec![c, nested]);
        assert_eq!(ctx.graph()[nested].min_nest_level(), Some(1));
        assert_eq!(names(&ctx, ctx.all_mods()), vec!["b 1.0", "c 1.0", "d 1.0"]);
    }

    #[test]
    fn test_remove_mod() {
        let mut ctx = context(vec![module("a", "1.0"), module("a", "2.0"), module("b", "1.0")]);

        assert!(ctx.remove_mod("a"));
        assert!(!ctx.remove_mod("a"));
        assert_eq!(names(&ctx, ctx.all_mods()), vec!["b 1.0"]);
        assert_eq!(ctx.evaluate("a"), Tristate::False);
    }

    #[test]
    fn test_legacy_dependencies_softened() {
        let any = VersionPredicate::parse("*").unwrap();
        let ctx = context(vec![
            module("legacy", "1.0")
                .with_schema_version(1)
                .with_dependency(ModDependency::depends("server_lib", any.clone()))
                .with_dependency(ModDependency::depends("missing", any.clone())),
            module("modern", "1.0").with_dependency(ModDependency::depends("server_lib", any)),
            module("server_lib", "1.0").with_environment(ModEnvironment::Server),
        ]);

        let legacy = ctx.mods("legacy")[0];
        let kinds: Vec<DependencyKind> = ctx.graph()[legacy].dependencies().iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DependencyKind::Suggests, DependencyKind::Depends]);

        let modern = ctx.mods("modern")[0];
        assert_eq!(ctx.graph()[modern].dependencies()[0].kind, DependencyKind::Depends);
    }
}
