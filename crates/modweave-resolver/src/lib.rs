//! Mod resolution engine.
//!
//! Takes a graph of discovered mod candidates and resolves it into one
//! consistent load set: dependencies satisfied, breaks and conflicts
//! respected, at most one owner per exclusive id. Candidates are committed in
//! ordered load phases so that handlers can react to a partially fixed set
//! and inject further candidates before later phases are decided.

pub mod analyzer;
pub mod candidate;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod phase;
pub mod priority;
pub mod resolver;
pub mod solver;

pub use analyzer::Diagnostic;
pub use candidate::{
    CandidateGraph, CandidateId, DependencyKind, EnvType, ModCandidate, ModDependency, ModEnvironment,
    ProvidedMod,
};
pub use condition::{ConditionEvaluator, Tristate};
pub use config::ResolverConfig;
pub use context::{PhaseSelectHandler, ResolutionContext};
pub use error::{ResolutionError, Result};
pub use phase::{LoadPhases, PhaseSorting};
pub use resolver::{Resolution, Resolver};
pub use solver::{Fix, Problem};

pub use modweave_version::{Version, VersionPredicate};
