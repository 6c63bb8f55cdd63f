use super::pool::{Pool, VarId};
use super::rule::Literal;

/// Branching preferences for the solver.
///
/// Variables are numbered in candidate priority order, so among several
/// candidates able to satisfy a requirement the lowest variable wins.
/// Greedy variables (candidates of the phase being committed) are tried as
/// loaded before anything else is defaulted to not loaded.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    greedy: Vec<bool>,
}

impl Policy {
    pub fn new(var_count: usize) -> Self {
        Self {
            greedy: vec![false; var_count + 1],
        }
    }

    pub fn for_pool(pool: &Pool<'_>) -> Self {
        let mut policy = Self::new(pool.len());
        for var in pool.vars() {
            policy.greedy[var as usize] = pool.is_greedy(var);
        }
        policy
    }

    /// Extend to `var_count` variables; new variables are not greedy
    pub fn extend_to(&mut self, var_count: usize) {
        if self.greedy.len() < var_count + 1 {
            self.greedy.resize(var_count + 1, false);
        }
    }

    pub fn set_greedy(&mut self, var: VarId, greedy: bool) {
        self.extend_to(var as usize);
        self.greedy[var as usize] = greedy;
    }

    pub fn is_greedy(&self, var: VarId) -> bool {
        self.greedy.get(var.unsigned_abs() as usize).copied().unwrap_or(false)
    }

    /// Pick the preferred literal to satisfy a requirement
    pub fn select_preferred(&self, candidates: &[Literal]) -> Option<Literal> {
        candidates.iter().copied().min_by_key(|l| l.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_preferred_takes_lowest_var() {
        let policy = Policy::new(5);
        assert_eq!(policy.select_preferred(&[4, 2, 5]), Some(2));
        assert_eq!(policy.select_preferred(&[]), None);
    }

    #[test]
    fn test_greedy_flags() {
        let mut policy = Policy::new(2);
        policy.set_greedy(2, true);
        assert!(policy.is_greedy(2));
        assert!(!policy.is_greedy(1));
        assert!(!policy.is_greedy(9));

        policy.set_greedy(7, true);
        assert!(policy.is_greedy(7));
    }
}
