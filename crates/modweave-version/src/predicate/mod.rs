//! Version predicates and the intervals they describe

mod bound;
mod interval;
mod operator;
mod predicate;

pub use bound::Bound;
pub use interval::VersionInterval;
pub use operator::Operator;
pub use predicate::{PredicateTerm, VersionPredicate};
