use std::collections::HashMap;

use indexmap::IndexMap;

use crate::candidate::{CandidateGraph, CandidateId, EnvType, ModCandidate};

/// Solver variable of a pool candidate, numbered from 1
pub type VarId = i32;

/// The solver's view of one resolution round.
///
/// Uncommitted candidates become variables in priority order, so a lower
/// variable number always means a preferred candidate. Committed candidates
/// are constants: always present, never variables.
pub struct Pool<'a> {
    graph: &'a CandidateGraph,
    candidates: Vec<CandidateId>,
    vars: HashMap<CandidateId, VarId>,
    greedy: Vec<bool>,
    mods_by_id: &'a IndexMap<String, Vec<CandidateId>>,
    committed: &'a [CandidateId],
    env: EnvType,
}

impl<'a> Pool<'a> {
    pub fn new(
        graph: &'a CandidateGraph,
        candidates: &[CandidateId],
        mods_by_id: &'a IndexMap<String, Vec<CandidateId>>,
        committed: &'a [CandidateId],
        env: EnvType,
    ) -> Self {
        let vars = candidates
            .iter()
            .enumerate()
            .map(|(index, &candidate)| (candidate, index as VarId + 1))
            .collect();

        Self {
            graph,
            candidates: candidates.to_vec(),
            vars,
            greedy: vec![false; candidates.len()],
            mods_by_id,
            committed,
            env,
        }
    }

    /// Mark every candidate accepted by `is_greedy` as greedy
    pub fn with_greedy<F>(mut self, is_greedy: F) -> Self
    where
        F: Fn(&ModCandidate) -> bool,
    {
        for (index, &candidate) in self.candidates.iter().enumerate() {
            self.greedy[index] = is_greedy(&self.graph[candidate]);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn graph(&self) -> &'a CandidateGraph {
        self.graph
    }

    pub fn env(&self) -> EnvType {
        self.env
    }

    pub fn candidate(&self, var: VarId) -> CandidateId {
        self.candidates[var.unsigned_abs() as usize - 1]
    }

    pub fn module(&self, var: VarId) -> &'a ModCandidate {
        &self.graph[self.candidate(var)]
    }

    pub fn var(&self, candidate: CandidateId) -> Option<VarId> {
        self.vars.get(&candidate).copied()
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> {
        1..=self.candidates.len() as VarId
    }

    pub fn is_greedy(&self, var: VarId) -> bool {
        self.greedy[var.unsigned_abs() as usize - 1]
    }

    pub fn mod_ids(&self) -> impl Iterator<Item = &'a String> {
        self.mods_by_id.keys()
    }

    /// Pool variables answering to `id`, in priority order
    pub fn providers(&self, id: &str) -> Vec<VarId> {
        let mut vars: Vec<VarId> = self
            .mods_by_id
            .get(id)
            .map(|list| list.iter().filter_map(|c| self.var(*c)).collect())
            .unwrap_or_default();
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    pub fn committed(&self) -> &'a [CandidateId] {
        self.committed
    }

    /// Committed candidates answering to `id`
    pub fn committed_providers(&self, id: &str) -> Vec<CandidateId> {
        self.committed
            .iter()
            .copied()
            .filter(|c| self.graph[*c].provided_version(id).is_some())
            .collect()
    }

    /// Committed candidates claiming `id` exclusively
    pub fn committed_owners(&self, id: &str) -> Vec<CandidateId> {
        self.committed
            .iter()
            .copied()
            .filter(|c| self.graph[*c].claims_exclusively(id))
            .collect()
    }
}
