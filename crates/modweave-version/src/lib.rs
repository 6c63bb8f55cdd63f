//! Semantic versioning for mod resolution
//!
//! This crate provides version parsing and total ordering, version predicates
//! as they appear in mod dependency declarations, and version intervals used
//! to reason about which versions satisfy several predicates at once.

mod error;
pub mod predicate;
mod version;

pub use error::VersionParsingError;
pub use predicate::{Bound, Operator, PredicateTerm, VersionInterval, VersionPredicate};
pub use version::Version;
