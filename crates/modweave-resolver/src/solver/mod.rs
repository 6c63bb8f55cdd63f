//! SAT-based solver for one resolution round.
//!
//! The phase loop hands the solver a [`Pool`]: the uncommitted candidates as
//! variables, the committed ones as constants. The solver either returns the
//! set of active candidates or a [`Problem`] explaining the failure, with a
//! proposed [`Fix`] when one can be found.

mod decisions;
mod fix;
mod policy;
mod pool;
mod problem;
mod rule;
mod rule_generator;
mod rule_set;
#[allow(clippy::module_inception)]
mod solver;

#[cfg(test)]
mod tests;

pub use decisions::Decisions;
pub use fix::{AddedMod, Fix};
pub use policy::Policy;
pub use pool::{Pool, VarId};
pub use problem::Problem;
pub use rule::{Literal, Rule, RuleType};
pub use rule_generator::RuleGenerator;
pub use rule_set::RuleSet;
pub use solver::{SolveError, Solver, SolverResult};
