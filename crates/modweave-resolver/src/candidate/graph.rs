use std::collections::VecDeque;
use std::ops::Index;

use super::{CandidateId, ModCandidate};

/// Arena of candidates plus the containment edges between them.
///
/// Edges always point both ways: a parent lists the candidates nested in it
/// and every nested candidate lists its parents.
#[derive(Debug, Clone, Default)]
pub struct CandidateGraph {
    mods: Vec<ModCandidate>,
}

impl CandidateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a top-level candidate
    pub fn add(&mut self, candidate: ModCandidate) -> CandidateId {
        let id = CandidateId(self.mods.len());
        self.mods.push(candidate);
        id
    }

    /// Insert a candidate found nested inside `parent`
    pub fn add_nested(&mut self, parent: CandidateId, mut candidate: ModCandidate) -> CandidateId {
        candidate.root = false;
        let id = self.add(candidate);
        self.link(parent, id);
        id
    }

    /// Record that `child` is nested inside `parent`
    pub fn link(&mut self, parent: CandidateId, child: CandidateId) {
        if parent == child {
            return;
        }
        if !self.mods[parent.0].contained.contains(&child) {
            self.mods[parent.0].contained.push(child);
        }
        if !self.mods[child.0].containing.contains(&parent) {
            self.mods[child.0].containing.push(parent);
        }
    }

    pub fn get(&self, id: CandidateId) -> Option<&ModCandidate> {
        self.mods.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: CandidateId) -> &mut ModCandidate {
        &mut self.mods[id.0]
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = CandidateId> {
        (0..self.mods.len()).map(CandidateId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CandidateId, &ModCandidate)> {
        self.mods.iter().enumerate().map(|(i, m)| (CandidateId(i), m))
    }

    /// Find candidates by primary id
    pub fn find(&self, mod_id: &str) -> Vec<CandidateId> {
        self.iter()
            .filter(|(_, m)| m.id() == mod_id)
            .map(|(id, _)| id)
            .collect()
    }

    /// Compute the shallowest nesting depth of every candidate: roots sit at
    /// level 0, each containment edge adds one. Unreachable candidates keep
    /// `None`.
    pub fn compute_nest_levels(&mut self) {
        for m in &mut self.mods {
            m.min_nest_level = None;
        }

        let mut queue = VecDeque::new();
        for (index, m) in self.mods.iter_mut().enumerate() {
            if m.root {
                m.min_nest_level = Some(0);
                queue.push_back(CandidateId(index));
            }
        }

        self.relax_nest_levels(queue);
    }

    /// Breadth-first relaxation starting at already-levelled candidates
    pub(crate) fn relax_nest_levels(&mut self, mut queue: VecDeque<CandidateId>) {
        while let Some(id) = queue.pop_front() {
            let Some(level) = self.mods[id.0].min_nest_level else {
                continue;
            };
            let children = self.mods[id.0].contained.clone();
            for child in children {
                let child_mod = &mut self.mods[child.0];
                if child_mod.min_nest_level.map_or(true, |current| current > level + 1) {
                    child_mod.min_nest_level = Some(level + 1);
                    queue.push_back(child);
                }
            }
        }
    }

    /// Drop every containment edge touching `id`
    pub(crate) fn sever(&mut self, id: CandidateId) {
        let parents = std::mem::take(&mut self.mods[id.0].containing);
        for parent in parents {
            self.mods[parent.0].contained.retain(|c| *c != id);
        }
        let children = std::mem::take(&mut self.mods[id.0].contained);
        for child in children {
            self.mods[child.0].containing.retain(|c| *c != id);
        }
    }

    pub(crate) fn into_mods(self) -> Vec<ModCandidate> {
        self.mods
    }
}

impl Index<CandidateId> for CandidateGraph {
    type Output = ModCandidate;

    fn index(&self, id: CandidateId) -> &ModCandidate {
        &self.mods[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modweave_version::Version;

    fn candidate(id: &str) -> ModCandidate {
        ModCandidate::new(id, Version::parse("1.0").unwrap())
    }

    #[test]
    fn test_nested_edges_both_ways() {
        let mut graph = CandidateGraph::new();
        let outer = graph.add(candidate("outer"));
        let inner = graph.add_nested(outer, candidate("inner"));

        assert!(!graph[inner].is_root());
        assert_eq!(graph[outer].contained(), &[inner]);
        assert_eq!(graph[inner].containing(), &[outer]);

        graph.link(outer, inner);
        assert_eq!(graph[outer].contained().len(), 1);
    }

    #[test]
    fn test_nest_levels_take_shortest_path() {
        let mut graph = CandidateGraph::new();
        let a = graph.add(candidate("a"));
        let b = graph.add_nested(a, candidate("b"));
        let c = graph.add_nested(b, candidate("c"));
        let d = graph.add(candidate("d"));
        graph.link(d, c);
        let orphan = graph.add_nested(c, candidate("orphan"));
        graph.sever(orphan);

        graph.compute_nest_levels();

        assert_eq!(graph[a].min_nest_level(), Some(0));
        assert_eq!(graph[b].min_nest_level(), Some(1));
        assert_eq!(graph[c].min_nest_level(), Some(1));
        assert_eq!(graph[orphan].min_nest_level(), None);
    }

    #[test]
    fn test_sever() {
        let mut graph = CandidateGraph::new();
        let a = graph.add(candidate("a"));
        let b = graph.add_nested(a, candidate("b"));
        let c = graph.add_nested(b, candidate("c"));

        graph.sever(b);

        assert!(graph[a].contained().is_empty());
        assert!(graph[c].containing().is_empty());
        assert!(graph[b].containing().is_empty() && graph[b].contained().is_empty());
    }

    #[test]
    fn test_find_by_primary_id() {
        let mut graph = CandidateGraph::new();
        graph.add(candidate("a"));
        let b = graph.add(candidate("b"));
        assert_eq!(graph.find("b"), vec![b]);
        assert!(graph.find("z").is_empty());
        assert_eq!(graph.len(), 2);
    }
}
