//! Version predicates as written in dependency declarations

use std::fmt;
use std::str::FromStr;

use super::{Bound, Operator, VersionInterval};
use crate::{Version, VersionParsingError};

/// A single comparison like `>=1.2`, `^2.0` or the x-range `1.4.x`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateTerm {
    operator: Operator,
    version: Option<Version>,
    /// Number of fixed leading components for x-ranges (`1.4.x` → 2)
    wildcard_depth: Option<usize>,
}

impl PredicateTerm {
    pub fn new(operator: Operator, version: Version) -> Self {
        PredicateTerm {
            operator,
            version: Some(version),
            wildcard_depth: None,
        }
    }

    pub fn any() -> Self {
        PredicateTerm {
            operator: Operator::Any,
            version: None,
            wildcard_depth: None,
        }
    }

    /// Parse a single term
    pub fn parse(term: &str) -> Result<Self, VersionParsingError> {
        let (operator, rest) = Operator::split_term(term.trim());

        if operator == Operator::Any {
            return Ok(Self::any());
        }

        if rest.is_empty() {
            return Err(VersionParsingError::InvalidPredicate(term.to_string()));
        }

        let parts: Vec<&str> = rest.split('.').collect();
        if let Some(first_wildcard) = parts.iter().position(|p| is_wildcard(p)) {
            if !operator.accepts_wildcard() {
                return Err(VersionParsingError::WildcardNotAllowed {
                    operator: operator.to_string(),
                    version: rest.to_string(),
                });
            }
            if !parts[first_wildcard..].iter().all(|p| is_wildcard(p)) {
                return Err(VersionParsingError::InvalidPredicate(term.to_string()));
            }
            if first_wildcard == 0 {
                return Ok(Self::any());
            }

            let prefix = parts[..first_wildcard].join(".");
            let version = Version::parse(&prefix)?;
            if version.is_prerelease() || version.build().is_some() {
                return Err(VersionParsingError::InvalidPredicate(term.to_string()));
            }

            return Ok(PredicateTerm {
                operator,
                version: Some(version),
                wildcard_depth: Some(first_wildcard),
            });
        }

        Ok(Self::new(operator, Version::parse(rest)?))
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// The versions this term accepts
    pub fn interval(&self) -> Option<VersionInterval> {
        let Some(version) = &self.version else {
            return Some(VersionInterval::infinite());
        };

        if let Some(depth) = self.wildcard_depth {
            return VersionInterval::new(
                Some(Bound::inclusive(version.clone())),
                Some(Bound::exclusive(version.next_at_depth(depth))),
            );
        }

        match self.operator {
            Operator::Any => Some(VersionInterval::infinite()),
            Operator::Equal => Some(VersionInterval::exact(version.clone())),
            Operator::Greater => VersionInterval::new(Some(Bound::exclusive(version.clone())), None),
            Operator::GreaterOrEqual => VersionInterval::new(Some(Bound::inclusive(version.clone())), None),
            Operator::Less => VersionInterval::new(None, Some(Bound::exclusive(version.clone()))),
            Operator::LessOrEqual => VersionInterval::new(None, Some(Bound::inclusive(version.clone()))),
            Operator::SameMajor => VersionInterval::new(
                Some(Bound::inclusive(version.clone())),
                Some(Bound::exclusive(version.next_at_depth(1))),
            ),
            Operator::SameMinor => VersionInterval::new(
                Some(Bound::inclusive(version.clone())),
                Some(Bound::exclusive(version.next_at_depth(2))),
            ),
        }
    }

    pub fn test(&self, version: &Version) -> bool {
        self.interval().map(|i| i.contains(version)).unwrap_or(false)
    }
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

impl fmt::Display for PredicateTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.version, self.wildcard_depth) {
            (None, _) => write!(f, "*"),
            (Some(version), Some(_)) => write!(f, "{}.x", version),
            (Some(version), None) if self.operator == Operator::Equal => write!(f, "{}", version),
            (Some(version), None) => write!(f, "{}{}", self.operator, version),
        }
    }
}

/// A conjunction of predicate terms, e.g. `>=1.2 <2.0`.
///
/// An empty predicate matches every version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionPredicate {
    terms: Vec<PredicateTerm>,
}

impl VersionPredicate {
    /// Parse a whitespace-separated list of terms
    pub fn parse(input: &str) -> Result<Self, VersionParsingError> {
        let mut terms = Vec::new();
        let mut pending_operator: Option<&str> = None;

        for token in input.split_whitespace() {
            // allow "> = 1.0" style spacing between operator and version
            if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
                pending_operator = Some(token);
                continue;
            }

            let term = match pending_operator.take() {
                Some(op) => PredicateTerm::parse(&format!("{}{}", op, token))?,
                None => PredicateTerm::parse(token)?,
            };
            terms.push(term);
        }

        if let Some(op) = pending_operator {
            return Err(VersionParsingError::InvalidPredicate(op.to_string()));
        }

        Ok(VersionPredicate { terms })
    }

    /// A predicate matching every version
    pub fn any() -> Self {
        VersionPredicate { terms: Vec::new() }
    }

    /// A predicate matching exactly one version
    pub fn exact(version: Version) -> Self {
        VersionPredicate {
            terms: vec![PredicateTerm::new(Operator::Equal, version)],
        }
    }

    pub fn terms(&self) -> &[PredicateTerm] {
        &self.terms
    }

    pub fn is_any(&self) -> bool {
        self.terms.iter().all(|t| t.operator() == Operator::Any)
    }

    pub fn test(&self, version: &Version) -> bool {
        self.terms.iter().all(|t| t.test(version))
    }

    /// The interval of versions accepted by every term, if any
    pub fn interval(&self) -> Option<VersionInterval> {
        let mut ret = VersionInterval::infinite();
        for term in &self.terms {
            ret = ret.and(&term.interval()?)?;
        }
        Some(ret)
    }

    /// Interval list accepted by any of the given predicates
    pub fn intervals_of(predicates: &[VersionPredicate]) -> Vec<VersionInterval> {
        if predicates.is_empty() {
            return vec![VersionInterval::infinite()];
        }
        VersionInterval::normalize(predicates.iter().filter_map(|p| p.interval()).collect())
    }
}

impl Default for VersionPredicate {
    fn default() -> Self {
        Self::any()
    }
}

impl FromStr for VersionPredicate {
    type Err = VersionParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionPredicate::parse(s)
    }
}

impl fmt::Display for VersionPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "*");
        }
        let parts: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}
