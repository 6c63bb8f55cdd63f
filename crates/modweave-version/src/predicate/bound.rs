//! Bound type for interval boundaries

use std::cmp::Ordering;
use std::fmt;

use crate::Version;

/// One end of a version interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    version: Version,
    inclusive: bool,
}

impl Bound {
    pub fn new(version: Version, inclusive: bool) -> Self {
        Bound { version, inclusive }
    }

    pub fn inclusive(version: Version) -> Self {
        Self::new(version, true)
    }

    pub fn exclusive(version: Version) -> Self {
        Self::new(version, false)
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    /// Compare two lower bounds; `None` is negative infinity.
    ///
    /// At the same version an inclusive bound starts earlier.
    pub fn cmp_lower(a: Option<&Bound>, b: Option<&Bound>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a
                .version
                .cmp(&b.version)
                .then_with(|| b.inclusive.cmp(&a.inclusive)),
        }
    }

    /// Compare two upper bounds; `None` is positive infinity.
    ///
    /// At the same version an exclusive bound ends earlier.
    pub fn cmp_upper(a: Option<&Bound>, b: Option<&Bound>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a
                .version
                .cmp(&b.version)
                .then_with(|| a.inclusive.cmp(&b.inclusive)),
        }
    }

    /// Whether an upper bound still reaches a lower bound, i.e. the two
    /// intervals ending and starting here share or touch a version.
    pub fn reaches(upper: Option<&Bound>, lower: Option<&Bound>) -> bool {
        match (upper, lower) {
            (None, _) | (_, None) => true,
            (Some(upper), Some(lower)) => match upper.version.cmp(&lower.version) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => upper.inclusive || lower.inclusive,
            },
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.version,
            if self.inclusive { "inclusive" } else { "exclusive" }
        )
    }
}
