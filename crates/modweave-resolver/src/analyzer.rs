//! Failure diagnostics and advisory findings on a finished resolution.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::candidate::{CandidateGraph, CandidateId, DependencyKind, EnvType, ModCandidate, ModDependency};
use crate::solver::Problem;

/// Explanation of an incompatible mod set, ready to show to a user
#[derive(Debug, Clone)]
pub struct Diagnostic {
    immediate_reason: String,
    reasons: Vec<String>,
    environment: EnvType,
    env_disabled: Vec<String>,
    env_disabled_ids: Vec<String>,
    fix: Option<String>,
}

impl Diagnostic {
    pub(crate) fn from_problem(
        problem: &Problem,
        graph: &CandidateGraph,
        environment: EnvType,
        env_disabled: &IndexMap<String, Vec<CandidateId>>,
    ) -> Self {
        let mut relevant: Vec<&str> = problem.mod_ids().iter().map(String::as_str).collect();
        if let Some(fix) = problem.fix() {
            relevant.extend(fix.to_add.iter().map(|m| m.id.as_str()));
            relevant.extend(fix.replacements.iter().map(|(_, m)| m.id.as_str()));
        }

        let mut disabled = Vec::new();
        for id in relevant {
            for &candidate in env_disabled.get(id).into_iter().flatten() {
                let line = format!("{} ({} only)", graph[candidate], graph[candidate].environment());
                if !disabled.contains(&line) {
                    disabled.push(line);
                }
            }
        }

        Self {
            immediate_reason: problem.immediate_reason().to_string(),
            reasons: problem.reasons().to_vec(),
            environment,
            env_disabled: disabled,
            env_disabled_ids: env_disabled.keys().cloned().collect(),
            fix: problem.fix().filter(|f| !f.is_empty()).map(|f| f.describe(graph)),
        }
    }

    pub fn immediate_reason(&self) -> &str {
        &self.immediate_reason
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn environment(&self) -> EnvType {
        self.environment
    }

    /// Candidates related to the failure that are inactive due to environment
    pub fn env_disabled(&self) -> &[String] {
        &self.env_disabled
    }

    /// Every id with a candidate disabled by the environment
    pub fn env_disabled_ids(&self) -> &[String] {
        &self.env_disabled_ids
    }

    /// Rendered fix, `add {..}, remove {..}, replace [..]`
    pub fn fix(&self) -> Option<&str> {
        self.fix.as_deref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.immediate_reason)?;

        if !self.reasons.is_empty() {
            write!(f, "\nMore details:")?;
            for reason in &self.reasons {
                write!(f, "\n  - {}", reason)?;
            }
        }

        if !self.env_disabled.is_empty() {
            write!(
                f,
                "\nInactive due to environment ({}):",
                self.environment.display_name()
            )?;
            for line in &self.env_disabled {
                write!(f, "\n  - {}", line)?;
            }
        }

        if !self.env_disabled_ids.is_empty() {
            write!(f, "\nEnvironment-disabled mods: {}", self.env_disabled_ids.join(", "))?;
        }

        if let Some(fix) = &self.fix {
            write!(f, "\nA potential solution: {}", fix)?;
        }
        Ok(())
    }
}

/// Advisory findings about the selected set. Each finding is logged as it
/// is found; warnings are also returned.
pub(crate) fn gather_warnings(
    graph: &CandidateGraph,
    selected: &[CandidateId],
    env_disabled: &IndexMap<String, Vec<CandidateId>>,
    env: EnvType,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let selected_set: HashSet<CandidateId> = selected.iter().copied().collect();

    for &candidate in selected {
        let module = &graph[candidate];
        for dep in module.dependencies().iter().filter(|d| d.applies_in(env)) {
            match dep.kind {
                DependencyKind::Recommends => {
                    if let Some(message) = unmet(graph, selected, module, dep) {
                        warn!("{}", message);
                        warnings.push(message);
                    }
                }
                DependencyKind::Suggests => {
                    if let Some(message) = unmet(graph, selected, module, dep) {
                        debug!("{}", message);
                    }
                }
                _ => {}
            }
        }

        if module.min_nest_level().is_none() {
            let message = format!("mod {} is loaded but not reachable from any loaded root mod", module);
            warn!("{}", message);
            warnings.push(message);
        }
    }

    let disabled: HashSet<CandidateId> = env_disabled.values().flatten().copied().collect();
    for (candidate, module) in graph.iter() {
        if !module.is_root() || selected_set.contains(&candidate) || disabled.contains(&candidate) {
            continue;
        }
        let displacers: Vec<String> = selected
            .iter()
            .map(|&c| &graph[c])
            .filter(|other| conflicts_with(other, module, env) || conflicts_with(module, other, env))
            .map(|other| other.to_string())
            .collect();
        if !displacers.is_empty() {
            info!(
                "mod {} was not loaded because it conflicts with {}",
                module,
                displacers.join(", ")
            );
        }
    }

    warnings
}

/// Message for an advisory dependency no selected candidate satisfies
fn unmet(graph: &CandidateGraph, selected: &[CandidateId], module: &ModCandidate, dep: &ModDependency) -> Option<String> {
    let present: Vec<&ModCandidate> = selected
        .iter()
        .map(|&c| &graph[c])
        .filter(|m| m.provided_version(&dep.mod_id).is_some())
        .collect();

    if present
        .iter()
        .any(|m| m.provided_version(&dep.mod_id).is_some_and(|v| dep.matches(v)))
    {
        return None;
    }

    let mut message = format!(
        "mod {} {} {} {}",
        module,
        dep.kind,
        dep.mod_id,
        dep.constraint_string()
    );
    if present.is_empty() {
        message.push_str(", which is missing");
    } else {
        let names: Vec<String> = present.iter().map(|m| m.to_string()).collect();
        message.push_str(&format!(", but only {} is present", names.join(", ")));
    }
    if let Some(reason) = &dep.reason {
        message.push_str(&format!(" ({})", reason));
    }
    Some(message)
}

fn conflicts_with(from: &ModCandidate, to: &ModCandidate, env: EnvType) -> bool {
    from.dependencies().iter().any(|dep| {
        dep.kind == DependencyKind::Conflicts
            && dep.applies_in(env)
            && to.provided_version(&dep.mod_id).is_some_and(|v| dep.matches(v))
    })
}
