use std::fmt;

use super::fix::Fix;
use super::pool::{Pool, VarId};
use super::rule::{Rule, RuleType};
use crate::candidate::CandidateId;

/// Why a round could not be solved.
///
/// Built from a set of mutually unsatisfiable rules. The most specific of
/// them becomes the immediate reason; all of them together form the broader
/// reason.
#[derive(Debug, Clone, Default)]
pub struct Problem {
    immediate_reason: String,
    reasons: Vec<String>,
    mod_ids: Vec<String>,
    fix: Option<Fix>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_rules(pool: &Pool<'_>, rules: &[&Rule]) -> Self {
        let mut problem = Problem::new();

        for rule in rules {
            let description = describe_rule(pool, rule);
            if !description.is_empty() && !problem.reasons.contains(&description) {
                problem.reasons.push(description);
            }
            if let Some(target) = rule.target_name() {
                if !problem.mod_ids.iter().any(|id| id == target) {
                    problem.mod_ids.push(target.to_string());
                }
            }
        }

        if let Some(rule) = rules
            .iter()
            .filter(|r| r.rule_type() != RuleType::Relaxation)
            .min_by_key(|r| r.rule_type().specificity())
        {
            problem.immediate_reason = describe_rule(pool, rule);
        }

        problem
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.immediate_reason = message.into();
        self
    }

    pub(crate) fn with_fix(mut self, fix: Option<Fix>) -> Self {
        self.fix = fix;
        self
    }

    /// The single most specific failing constraint
    pub fn immediate_reason(&self) -> &str {
        &self.immediate_reason
    }

    /// Every constraint taking part in the failure
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// Mod ids the failing constraints refer to
    pub fn mod_ids(&self) -> &[String] {
        &self.mod_ids
    }

    /// One way of changing the candidate set so that it resolves
    pub fn fix(&self) -> Option<&Fix> {
        self.fix.as_ref()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.immediate_reason)?;
        for reason in &self.reasons {
            write!(f, "\n  - {}", reason)?;
        }
        Ok(())
    }
}

fn name(pool: &Pool<'_>, candidate: CandidateId) -> String {
    pool.graph()[candidate].to_string()
}

fn var_name(pool: &Pool<'_>, var: VarId) -> String {
    pool.module(var).to_string()
}

/// Whether `candidate` is a constant of the round rather than a variable
fn is_committed(pool: &Pool<'_>, candidate: CandidateId) -> bool {
    pool.var(candidate).is_none()
}

fn subject(pool: &Pool<'_>, candidate: CandidateId) -> String {
    if is_committed(pool, candidate) {
        format!("already loaded mod {}", name(pool, candidate))
    } else {
        format!("mod {}", name(pool, candidate))
    }
}

/// Human readable explanation of a single rule
pub(crate) fn describe_rule(pool: &Pool<'_>, rule: &Rule) -> String {
    let target = rule.target_name().unwrap_or("unknown");
    let constraint = rule.constraint().unwrap_or("*");

    match rule.rule_type() {
        RuleType::RootRequire => {
            let literals = rule.literals();
            let Some(&candidate) = literals.first() else {
                return String::new();
            };
            let mut text = format!("mod {} is installed and must load", var_name(pool, candidate));
            if literals.len() > 1 {
                let displacers: Vec<String> = literals[1..].iter().map(|&l| var_name(pool, l)).collect();
                text.push_str(&format!(" unless displaced by {}", displacers.join(", ")));
            }
            text
        }
        RuleType::Depends => {
            let Some(source) = rule.source() else {
                return format!("{} {} is required", target, constraint);
            };
            let targets: Vec<String> = rule.positive_literals().map(|l| var_name(pool, l)).collect();
            let mut text = format!("{} requires {} {}", subject(pool, source), target, constraint);

            if !targets.is_empty() {
                text.push_str(&format!(", which only {} can provide", targets.join(", ")));
                return text;
            }

            let mut present: Vec<String> = pool.providers(target).into_iter().map(|v| var_name(pool, v)).collect();
            present.extend(pool.committed_providers(target).into_iter().map(|c| name(pool, c)));
            if present.is_empty() {
                text.push_str(", which is missing");
            } else {
                text.push_str(&format!(", but only {} is present", present.join(", ")));
            }
            text
        }
        RuleType::Breaks | RuleType::Conflicts => {
            let verb = if rule.rule_type() == RuleType::Breaks {
                "breaks"
            } else {
                "conflicts with"
            };
            let Some(source) = rule.source() else {
                return format!("{} {} {}", verb, target, constraint);
            };

            let others: Vec<String> = rule
                .literals()
                .iter()
                .filter(|&&l| pool.var(source) != Some(-l))
                .map(|&l| var_name(pool, l))
                .collect();

            if is_committed(pool, source) {
                format!("{} {} {}", subject(pool, source), verb, others.join(", "))
            } else if others.is_empty() {
                let holders: Vec<String> = pool
                    .committed_providers(target)
                    .into_iter()
                    .map(|c| name(pool, c))
                    .collect();
                format!(
                    "{} {} {} {}, but {} is already loaded",
                    subject(pool, source),
                    verb,
                    target,
                    constraint,
                    holders.join(", ")
                )
            } else {
                format!("{} {} {}", subject(pool, source), verb, others.join(", "))
            }
        }
        RuleType::SameId => {
            let members: Vec<String> = rule.literals().iter().map(|&l| var_name(pool, l)).collect();
            let holder = rule.source().map(|h| name(pool, h)).unwrap_or_else(|| "another mod".to_string());
            format!("id {} is already held by {}, excluding {}", target, holder, members.join(", "))
        }
        RuleType::MultiConflict => {
            let members: Vec<String> = rule.literals().iter().map(|&l| var_name(pool, l)).collect();
            format!("duplicate mod {}: {}", target, members.join(", "))
        }
        RuleType::Nesting => {
            let Some(&child) = rule.literals().first() else {
                return String::new();
            };
            let parents: Vec<String> = rule.positive_literals().map(|l| var_name(pool, l)).collect();
            if parents.is_empty() {
                format!("mod {} is nested in mods that cannot load", var_name(pool, child))
            } else {
                format!(
                    "mod {} is nested in {} and cannot load without it",
                    var_name(pool, child),
                    parents.join(" or ")
                )
            }
        }
        RuleType::Relaxation => String::new(),
    }
}
