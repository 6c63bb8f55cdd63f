//! Semantic version with a total order

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::VersionParsingError;

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(
        r"^(\d+(?:\.\d+)*)(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$"
    ).unwrap();
}

/// A semantic version.
///
/// Versions consist of one or more numeric components, an optional
/// prerelease and optional build metadata (`1.2.3-beta.2+build.7`).
///
/// Ordering rules:
/// - numeric components are compared left to right, missing trailing
///   components count as `0` (`1.0` == `1.0.0`)
/// - a prerelease sorts below the matching release
/// - prerelease identifiers compare numerically if both are numeric, numeric
///   identifiers sort below alphanumeric ones, everything else compares
///   lexically; a prefix sorts first
/// - build metadata is ignored
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    prerelease: Option<String>,
    build: Option<String>,
}

impl Version {
    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, VersionParsingError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionParsingError::Empty);
        }

        let captures = VERSION_REGEX
            .captures(trimmed)
            .ok_or_else(|| VersionParsingError::InvalidVersion(trimmed.to_string()))?;

        let mut components = Vec::new();
        for part in captures[1].split('.') {
            let value = part.parse::<u64>().map_err(|_| VersionParsingError::InvalidComponent {
                version: trimmed.to_string(),
                component: part.to_string(),
            })?;
            components.push(value);
        }

        Ok(Version {
            components,
            prerelease: captures.get(2).map(|m| m.as_str().to_string()),
            build: captures.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// Create a release version from numeric components
    pub fn from_components(components: impl Into<Vec<u64>>) -> Self {
        let mut components = components.into();
        if components.is_empty() {
            components.push(0);
        }
        Version {
            components,
            prerelease: None,
            build: None,
        }
    }

    /// Return a copy of this version with the given prerelease
    pub fn with_prerelease(mut self, prerelease: impl Into<String>) -> Self {
        self.prerelease = Some(prerelease.into());
        self
    }

    /// The numeric components as written
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// Get a numeric component, treating missing components as `0`
    pub fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The lowest version sorting above every version sharing the first
    /// `depth` components with this one (`1.4.2` at depth 1 gives `2`).
    ///
    /// The result carries a `0` prerelease marker so that `2-0`, the lowest
    /// prerelease of `2`, is still excluded by a `<` comparison.
    pub fn next_at_depth(&self, depth: usize) -> Version {
        let depth = depth.max(1);
        let mut components: Vec<u64> = (0..depth).map(|i| self.component(i)).collect();
        if let Some(last) = components.last_mut() {
            *last = last.saturating_add(1);
        }
        Version::from_components(components).with_prerelease("0")
    }

    fn significant_components(&self) -> &[u64] {
        let mut end = self.components.len();
        while end > 1 && self.components[end - 1] == 0 {
            end -= 1;
        }
        &self.components[..end]
    }
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(ln), Ok(rn)) => ln.cmp(&rn),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }

        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => compare_prerelease(a, b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // must agree with Eq: trailing zero components and build metadata are ignored
        self.significant_components().hash(state);
        self.prerelease.hash(state);
    }
}

impl FromStr for Version {
    type Err = VersionParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join("."))?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{}", pre)?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{}", build)?;
        }
        Ok(())
    }
}
