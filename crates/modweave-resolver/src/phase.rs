//! Ordered load phases.
//!
//! [`PhaseSorting`] keeps elements grouped by phase and the phases in a
//! deterministic order derived from pairwise "A before B" constraints:
//!
//! 1. strongly connected components (ordering cycles) are computed
//! 2. phases inside one component are sorted by id
//! 3. components are ordered topologically, lowest id first on ties

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Display};

use log::warn;

use crate::error::{ResolutionError, Result};

/// Well-known phase ids
pub struct LoadPhases;

impl LoadPhases {
    pub const BUILTIN: &'static str = "builtin";
    pub const DEFAULT: &'static str = "default";

    pub fn default_ordering() -> Vec<(String, String)> {
        vec![(Self::BUILTIN.to_string(), Self::DEFAULT.to_string())]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitStatus {
    NotVisited,
    Visiting,
    Visited,
}

#[derive(Debug)]
struct PhaseData<P, E> {
    id: P,
    elements: Vec<E>,
    subsequent: Vec<usize>,
    previous: Vec<usize>,
    status: VisitStatus,
}

#[derive(Debug)]
pub struct PhaseSorting<P, E> {
    phases: Vec<PhaseData<P, E>>,
    by_id: BTreeMap<P, usize>,
    sorted: Vec<usize>,
    warn_on_cycles: bool,
    cycles: Vec<(P, P)>,
}

impl<P, E> Default for PhaseSorting<P, E>
where
    P: Ord + Clone + Display + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P, E> PhaseSorting<P, E>
where
    P: Ord + Clone + Display + Debug,
{
    pub fn new() -> Self {
        Self {
            phases: Vec::new(),
            by_id: BTreeMap::new(),
            sorted: Vec::new(),
            warn_on_cycles: true,
            cycles: Vec::new(),
        }
    }

    /// Toggle the warning logged when orderings form a cycle
    pub fn set_cycle_warnings(&mut self, enabled: bool) {
        self.warn_on_cycles = enabled;
    }

    /// Cycles found by the most recent sort, as `(phase, ordered-after)` pairs
    pub fn cycles(&self) -> &[(P, P)] {
        &self.cycles
    }

    pub fn add(&mut self, phase: P, element: E) {
        let index = self.get_or_create(phase, true);
        self.phases[index].elements.push(element);
    }

    pub fn get(&self, phase: &P) -> &[E] {
        self.by_id
            .get(phase)
            .map(|&index| self.phases[index].elements.as_slice())
            .unwrap_or(&[])
    }

    /// All elements, phase by phase in sorted order
    pub fn all(&self) -> Vec<&E> {
        self.sorted
            .iter()
            .flat_map(|&index| self.phases[index].elements.iter())
            .collect()
    }

    /// Require `first` to come before `second`
    pub fn add_phase_ordering(&mut self, first: P, second: P) -> Result<()> {
        if first == second {
            return Err(ResolutionError::InvalidPhaseOrdering(format!(
                "phase {} cannot be ordered after itself",
                first
            )));
        }

        let first = self.get_or_create(first, false);
        let second = self.get_or_create(second, false);
        if !self.phases[first].subsequent.contains(&second) {
            self.phases[first].subsequent.push(second);
            self.phases[second].previous.push(first);
        }
        self.sort_phases();
        Ok(())
    }

    /// Phases that hold at least one element, in sorted order
    pub fn used_phases(&self) -> Vec<P> {
        self.sorted
            .iter()
            .map(|&index| &self.phases[index])
            .filter(|phase| !phase.elements.is_empty())
            .map(|phase| phase.id.clone())
            .collect()
    }

    /// Position of `phase` in the sorted order
    pub fn phase_index(&self, phase: &P) -> Option<usize> {
        self.sorted.iter().position(|&index| self.phases[index].id == *phase)
    }

    /// Every known phase in sorted order
    pub fn phases(&self) -> Vec<&P> {
        self.sorted.iter().map(|&index| &self.phases[index].id).collect()
    }

    fn get_or_create(&mut self, id: P, sort_if_created: bool) -> usize {
        if let Some(&index) = self.by_id.get(&id) {
            return index;
        }

        let index = self.phases.len();
        self.phases.push(PhaseData {
            id: id.clone(),
            elements: Vec::new(),
            subsequent: Vec::new(),
            previous: Vec::new(),
            status: VisitStatus::NotVisited,
        });
        self.by_id.insert(id, index);
        self.sorted.push(index);

        if sort_if_created {
            self.sort_phases();
        }
        index
    }

    fn sort_phases(&mut self) {
        self.cycles.clear();

        // First Kosaraju pass: post-order over the forward edges
        let mut toposort = Vec::with_capacity(self.sorted.len());
        for index in self.sorted.clone() {
            self.forward_visit(index, None, &mut toposort);
        }
        self.clear_status();
        toposort.reverse();

        // Second pass over the reversed edges collects the components
        let mut scc_of = vec![0usize; self.phases.len()];
        let mut sccs: Vec<Vec<usize>> = Vec::new();
        for &index in &toposort {
            if self.phases[index].status == VisitStatus::NotVisited {
                let mut members = Vec::new();
                self.backward_visit(index, &mut members);
                members.sort_by(|&a, &b| self.phases[a].id.cmp(&self.phases[b].id));
                for &member in &members {
                    scc_of[member] = sccs.len();
                }
                sccs.push(members);
            }
        }
        self.clear_status();

        let mut subsequent_sccs: Vec<Vec<usize>> = vec![Vec::new(); sccs.len()];
        let mut in_degree = vec![0usize; sccs.len()];
        for (scc, members) in sccs.iter().enumerate() {
            for &member in members {
                for &next in &self.phases[member].subsequent {
                    let next_scc = scc_of[next];
                    if next_scc != scc {
                        subsequent_sccs[scc].push(next_scc);
                        in_degree[next_scc] += 1;
                    }
                }
            }
        }

        // Kahn's algorithm; the ready set yields the component with the lowest id
        let mut ready: BTreeSet<(P, usize)> = BTreeSet::new();
        for (scc, members) in sccs.iter().enumerate() {
            if in_degree[scc] == 0 {
                ready.insert((self.phases[members[0]].id.clone(), scc));
            }
        }

        self.sorted.clear();
        while let Some((_, scc)) = ready.pop_first() {
            self.sorted.extend(sccs[scc].iter().copied());
            for &next in &subsequent_sccs[scc] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.insert((self.phases[sccs[next][0]].id.clone(), next));
                }
            }
        }
    }

    fn forward_visit(&mut self, index: usize, parent: Option<usize>, toposort: &mut Vec<usize>) {
        match self.phases[index].status {
            VisitStatus::NotVisited => {
                self.phases[index].status = VisitStatus::Visiting;
                for next in self.phases[index].subsequent.clone() {
                    self.forward_visit(next, Some(index), toposort);
                }
                toposort.push(index);
                self.phases[index].status = VisitStatus::Visited;
            }
            VisitStatus::Visiting => {
                if let Some(parent) = parent {
                    let phase = self.phases[index].id.clone();
                    let after = self.phases[parent].id.clone();
                    if self.warn_on_cycles {
                        warn!(
                            "Phase ordering conflict detected.\nPhase {} is ordered both before and after phase {}.",
                            phase, after
                        );
                    }
                    self.cycles.push((phase, after));
                }
            }
            VisitStatus::Visited => {}
        }
    }

    fn backward_visit(&mut self, index: usize, members: &mut Vec<usize>) {
        if self.phases[index].status != VisitStatus::NotVisited {
            return;
        }
        self.phases[index].status = VisitStatus::Visiting;
        members.push(index);
        for previous in self.phases[index].previous.clone() {
            self.backward_visit(previous, members);
        }
    }

    fn clear_status(&mut self) {
        for phase in &mut self.phases {
            phase.status = VisitStatus::NotVisited;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorting() -> PhaseSorting<String, u32> {
        PhaseSorting::new()
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[test]
    fn test_builtin_before_default() {
        let mut sorting = sorting();
        sorting.add(s("default"), 2);
        sorting.add(s("builtin"), 1);
        sorting.add_phase_ordering(s("builtin"), s("default")).unwrap();

        assert_eq!(sorting.used_phases(), vec![s("builtin"), s("default")]);
        assert_eq!(sorting.all(), vec![&1, &2]);
        assert_eq!(sorting.phase_index(&s("default")), Some(1));
        assert_eq!(sorting.phase_index(&s("missing")), None);
    }

    #[test]
    fn test_unconstrained_phases_sort_by_id() {
        let mut sorting = sorting();
        sorting.add(s("zeta"), 1);
        sorting.add(s("alpha"), 2);
        sorting.add(s("mid"), 3);

        assert_eq!(sorting.used_phases(), vec![s("alpha"), s("mid"), s("zeta")]);
    }

    #[test]
    fn test_constraints_beat_id_order() {
        let mut sorting = sorting();
        sorting.add_phase_ordering(s("z"), s("a")).unwrap();
        sorting.add_phase_ordering(s("a"), s("m")).unwrap();

        assert_eq!(sorting.phases(), vec![&s("z"), &s("a"), &s("m")]);
    }

    #[test]
    fn test_cycle_is_grouped_and_reported() {
        let mut sorting = sorting();
        sorting.set_cycle_warnings(false);
        sorting.add_phase_ordering(s("builtin"), s("x")).unwrap();
        sorting.add_phase_ordering(s("x"), s("y")).unwrap();
        sorting.add_phase_ordering(s("y"), s("x")).unwrap();
        sorting.add_phase_ordering(s("y"), s("z")).unwrap();

        assert_eq!(sorting.phases(), vec![&s("builtin"), &s("x"), &s("y"), &s("z")]);
        assert_eq!(sorting.cycles().len(), 1);
    }

    #[test]
    fn test_self_ordering_is_rejected() {
        let mut sorting = sorting();
        let err = sorting.add_phase_ordering(s("a"), s("a")).unwrap_err();
        assert!(matches!(err, ResolutionError::InvalidPhaseOrdering(_)));
        assert!(sorting.phases().is_empty());
    }

    #[test]
    fn test_empty_phases_are_not_used() {
        let mut sorting = sorting();
        sorting.add_phase_ordering(s("builtin"), s("default")).unwrap();
        sorting.add(s("default"), 7);

        assert_eq!(sorting.used_phases(), vec![s("default")]);
        assert_eq!(sorting.phases().len(), 2);
        assert_eq!(sorting.get(&s("default")), &[7]);
        assert!(sorting.get(&s("builtin")).is_empty());
        assert!(sorting.get(&s("nope")).is_empty());
    }

    #[test]
    fn test_duplicate_ordering_is_idempotent() {
        let mut sorting = sorting();
        sorting.add_phase_ordering(s("b"), s("a")).unwrap();
        sorting.add_phase_ordering(s("b"), s("a")).unwrap();
        assert_eq!(sorting.phases(), vec![&s("b"), &s("a")]);
        assert!(sorting.cycles().is_empty());
    }
}
