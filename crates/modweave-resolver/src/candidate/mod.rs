//! Mod candidates and the containment graph they live in.

mod dependency;
mod environment;
mod graph;
mod provided;

pub use dependency::{DependencyKind, ModDependency};
pub use environment::{EnvType, ModEnvironment};
pub use graph::CandidateGraph;
pub use provided::ProvidedMod;

use modweave_version::Version;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::phase::LoadPhases;

/// Handle of a candidate inside a [`CandidateGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateId(pub(crate) usize);

impl CandidateId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One discovered, loadable version of a mod.
///
/// Candidates are built standalone and inserted into a [`CandidateGraph`],
/// which owns the containment edges between an outer candidate and the
/// candidates nested inside it.
#[derive(Debug, Clone)]
pub struct ModCandidate {
    id: String,
    version: Version,
    builtin: bool,
    root: bool,
    environment: ModEnvironment,
    schema_version: u32,
    load_phase: String,
    provides: Vec<ProvidedMod>,
    dependencies: Vec<ModDependency>,
    origin_paths: Vec<PathBuf>,
    payload: Option<Arc<[u8]>>,

    pub(crate) min_nest_level: Option<u32>,
    pub(crate) containing: Vec<CandidateId>,
    pub(crate) contained: Vec<CandidateId>,
}

impl ModCandidate {
    pub fn new(id: impl Into<String>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            builtin: false,
            root: true,
            environment: ModEnvironment::Universal,
            schema_version: 2,
            load_phase: LoadPhases::DEFAULT.to_string(),
            provides: Vec::new(),
            dependencies: Vec::new(),
            origin_paths: Vec::new(),
            payload: None,
            min_nest_level: None,
            containing: Vec::new(),
            contained: Vec::new(),
        }
    }

    /// Builtin candidates are provided by the runtime itself and are always
    /// selected; they load in the `builtin` phase.
    pub fn builtin(mut self) -> Self {
        self.builtin = true;
        self.load_phase = LoadPhases::BUILTIN.to_string();
        self
    }

    pub fn with_dependency(mut self, dependency: ModDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_provided(mut self, provided: ProvidedMod) -> Self {
        self.provides.push(provided);
        self
    }

    pub fn with_environment(mut self, environment: ModEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Metadata format version; versions below 2 get legacy dependency
    /// softening
    pub fn with_schema_version(mut self, schema_version: u32) -> Self {
        self.schema_version = schema_version;
        self
    }

    pub fn with_load_phase(mut self, phase: impl Into<String>) -> Self {
        self.load_phase = phase.into();
        self
    }

    pub fn with_origin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.origin_paths.push(path.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Arc<[u8]>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Whether the candidate was discovered at top level rather than only
    /// nested inside another candidate
    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn environment(&self) -> ModEnvironment {
        self.environment
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn load_phase(&self) -> &str {
        &self.load_phase
    }

    pub fn provides(&self) -> &[ProvidedMod] {
        &self.provides
    }

    pub fn dependencies(&self) -> &[ModDependency] {
        &self.dependencies
    }

    pub(crate) fn dependencies_mut(&mut self) -> &mut [ModDependency] {
        &mut self.dependencies
    }

    pub fn origin_paths(&self) -> &[PathBuf] {
        &self.origin_paths
    }

    pub fn payload(&self) -> Option<&Arc<[u8]>> {
        self.payload.as_ref()
    }

    pub(crate) fn clear_payload(&mut self) {
        self.payload = None;
    }

    /// Shallowest nesting depth at which the candidate was found, `None`
    /// when it is not reachable from any root
    pub fn min_nest_level(&self) -> Option<u32> {
        self.min_nest_level
    }

    pub fn containing(&self) -> &[CandidateId] {
        &self.containing
    }

    pub fn contained(&self) -> &[CandidateId] {
        &self.contained
    }

    /// Every id the candidate answers to: its own id first, then aliases
    pub fn all_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.provides.iter().map(|p| p.id.as_str()))
    }

    /// Version the candidate offers under `id`, if it answers to it
    pub fn provided_version(&self, id: &str) -> Option<&Version> {
        if self.id == id {
            return Some(&self.version);
        }
        self.provides.iter().find(|p| p.id == id).map(|p| &p.version)
    }

    /// Whether the candidate owns `id` exclusively, either as its primary id
    /// or as an exclusive alias
    pub fn claims_exclusively(&self, id: &str) -> bool {
        self.id == id || self.provides.iter().any(|p| p.id == id && p.exclusive)
    }
}

impl fmt::Display for ModCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_defaults() {
        let candidate = ModCandidate::new("a", v("1.0"));
        assert!(candidate.is_root());
        assert!(!candidate.is_builtin());
        assert_eq!(candidate.load_phase(), "default");
        assert_eq!(candidate.schema_version(), 2);
        assert_eq!(candidate.to_string(), "a 1.0");
    }

    #[test]
    fn test_builtin_phase() {
        let candidate = ModCandidate::new("core", v("1.0")).builtin();
        assert!(candidate.is_builtin());
        assert_eq!(candidate.load_phase(), "builtin");
    }

    #[test]
    fn test_provided_ids() {
        let candidate = ModCandidate::new("sodium", v("0.5"))
            .with_provided(ProvidedMod::exclusive("rubidium", v("0.5")))
            .with_provided(ProvidedMod::shared("renderer-api", v("2.0")));

        let ids: Vec<&str> = candidate.all_ids().collect();
        assert_eq!(ids, vec!["sodium", "rubidium", "renderer-api"]);
        assert_eq!(candidate.provided_version("renderer-api"), Some(&v("2.0")));
        assert_eq!(candidate.provided_version("iris"), None);
        assert!(candidate.claims_exclusively("sodium"));
        assert!(candidate.claims_exclusively("rubidium"));
        assert!(!candidate.claims_exclusively("renderer-api"));
    }

    #[test]
    fn test_payload() {
        let mut candidate = ModCandidate::new("a", v("1.0")).with_payload(vec![1u8, 2, 3]);
        assert_eq!(candidate.payload().map(|p| p.len()), Some(3));
        candidate.clear_payload();
        assert!(candidate.payload().is_none());
    }
}
