//! Candidate priority ordering.
//!
//! Earlier in the order means preferred: the solver tries higher-priority
//! candidates first and the phase loop commits them first. The order is:
//!
//! 1. root candidates before nested-only ones
//! 2. ascending id
//! 3. descending version
//! 4. ascending minimum nest level (unknown sorts last)
//! 5. for nested candidates, whichever has the preferred parent

use std::cmp::Ordering;

use crate::candidate::{CandidateGraph, CandidateId};

/// How far up the containment chain rule 5 may climb before declaring a tie
const MAX_PARENT_DEPTH: usize = 32;

pub fn compare(graph: &CandidateGraph, a: CandidateId, b: CandidateId) -> Ordering {
    compare_at_depth(graph, a, b, 0)
}

fn compare_at_depth(graph: &CandidateGraph, a: CandidateId, b: CandidateId, depth: usize) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let ma = &graph[a];
    let mb = &graph[b];

    let ordering = mb
        .is_root()
        .cmp(&ma.is_root())
        .then_with(|| ma.id().cmp(mb.id()))
        .then_with(|| mb.version().cmp(ma.version()))
        .then_with(|| nest_key(ma.min_nest_level()).cmp(&nest_key(mb.min_nest_level())));
    if ordering != Ordering::Equal || ma.is_root() || depth >= MAX_PARENT_DEPTH {
        return ordering;
    }

    let parents = ma.containing().iter().chain(mb.containing()).copied();
    let Some(best) = parents.reduce(|best, parent| {
        if compare_at_depth(graph, parent, best, depth + 1) == Ordering::Less {
            parent
        } else {
            best
        }
    }) else {
        return Ordering::Equal;
    };

    // Owning a parent that ranks equal to the best one counts as owning it
    let owns_best = |containing: &[CandidateId]| {
        containing
            .iter()
            .any(|&parent| compare_at_depth(graph, parent, best, depth + 1) == Ordering::Equal)
    };
    match (owns_best(ma.containing()), owns_best(mb.containing())) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn nest_key(level: Option<u32>) -> u32 {
    level.unwrap_or(u32::MAX)
}

/// Stable sort by priority.
///
/// Binary insertion keeps equal candidates in their input order and never
/// panics on an inconsistent comparison.
pub fn sort_by_priority(graph: &CandidateGraph, ids: &mut Vec<CandidateId>) {
    let mut sorted: Vec<CandidateId> = Vec::with_capacity(ids.len());
    for &id in ids.iter() {
        let position = sorted.partition_point(|&other| compare(graph, other, id) != Ordering::Greater);
        sorted.insert(position, id);
    }
    *ids = sorted;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::ModCandidate;
    use modweave_version::Version;

    fn candidate(id: &str, version: &str) -> ModCandidate {
        ModCandidate::new(id, Version::parse(version).unwrap())
    }

    #[test]
    fn test_root_before_nested() {
        let mut graph = CandidateGraph::new();
        let parent = graph.add(candidate("z", "1.0"));
        let nested = graph.add_nested(parent, candidate("a", "1.0"));
        let root = graph.add(candidate("b", "1.0"));
        graph.compute_nest_levels();

        assert_eq!(compare(&graph, root, nested), Ordering::Less);
        assert_eq!(compare(&graph, nested, root), Ordering::Greater);
    }

    #[test]
    fn test_id_then_newest_version() {
        let mut graph = CandidateGraph::new();
        let a1 = graph.add(candidate("a", "1.0"));
        let a2 = graph.add(candidate("a", "2.0"));
        let b = graph.add(candidate("b", "9.0"));
        graph.compute_nest_levels();

        assert_eq!(compare(&graph, a2, a1), Ordering::Less);
        assert_eq!(compare(&graph, a1, b), Ordering::Less);

        let mut ids = vec![b, a1, a2];
        sort_by_priority(&graph, &mut ids);
        assert_eq!(ids, vec![a2, a1, b]);
    }

    #[test]
    fn test_shallower_nesting_wins() {
        let mut graph = CandidateGraph::new();
        let outer = graph.add(candidate("outer", "1.0"));
        let middle = graph.add_nested(outer, candidate("middle", "1.0"));
        let deep = graph.add_nested(middle, candidate("lib", "1.0"));
        let shallow = graph.add_nested(outer, candidate("lib", "1.0"));
        graph.compute_nest_levels();

        assert_eq!(compare(&graph, shallow, deep), Ordering::Less);
    }

    #[test]
    fn test_parent_priority_breaks_ties() {
        let mut graph = CandidateGraph::new();
        let old_parent = graph.add(candidate("host", "1.0"));
        let new_parent = graph.add(candidate("host", "2.0"));
        let from_old = graph.add_nested(old_parent, candidate("lib", "1.0"));
        let from_new = graph.add_nested(new_parent, candidate("lib", "1.0"));
        graph.compute_nest_levels();

        assert_eq!(compare(&graph, from_new, from_old), Ordering::Less);
        assert_eq!(compare(&graph, from_old, from_new), Ordering::Greater);
    }

    #[test]
    fn test_shared_parent_is_a_tie() {
        let mut graph = CandidateGraph::new();
        let parent = graph.add(candidate("host", "1.0"));
        let first = graph.add_nested(parent, candidate("lib", "1.0"));
        let second = graph.add_nested(parent, candidate("lib", "1.0"));
        graph.compute_nest_levels();

        assert_eq!(compare(&graph, first, second), Ordering::Equal);

        let mut ids = vec![second, first];
        sort_by_priority(&graph, &mut ids);
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_equally_ranked_parents_tie() {
        let mut graph = CandidateGraph::new();
        let first_parent = graph.add(candidate("host", "1.0"));
        let second_parent = graph.add(candidate("host", "1.0"));
        let first = graph.add_nested(first_parent, candidate("lib", "1.0"));
        let second = graph.add_nested(second_parent, candidate("lib", "1.0"));
        graph.compute_nest_levels();

        assert_eq!(compare(&graph, first, second), Ordering::Equal);
        assert_eq!(compare(&graph, second, first), Ordering::Equal);
    }

    #[test]
    fn test_identical_roots_tie() {
        let mut graph = CandidateGraph::new();
        let a = graph.add(candidate("a", "1.0"));
        let b = graph.add(candidate("a", "1.0.0"));
        graph.compute_nest_levels();
        assert_eq!(compare(&graph, a, b), Ordering::Equal);
        assert_eq!(compare(&graph, a, a), Ordering::Equal);
    }
}
