//! Version intervals and interval-list algebra

use std::cmp::Ordering;
use std::fmt;

use super::Bound;
use crate::Version;

/// A contiguous range of versions; a missing bound is unbounded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInterval {
    min: Option<Bound>,
    max: Option<Bound>,
}

impl VersionInterval {
    /// Create an interval, returning `None` if it contains no version
    pub fn new(min: Option<Bound>, max: Option<Bound>) -> Option<Self> {
        let interval = VersionInterval { min, max };
        if interval.is_empty() {
            None
        } else {
            Some(interval)
        }
    }

    /// The interval containing every version
    pub fn infinite() -> Self {
        VersionInterval { min: None, max: None }
    }

    /// The interval containing exactly one version
    pub fn exact(version: Version) -> Self {
        VersionInterval {
            min: Some(Bound::inclusive(version.clone())),
            max: Some(Bound::inclusive(version)),
        }
    }

    pub fn min(&self) -> Option<&Bound> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Bound> {
        self.max.as_ref()
    }

    fn is_empty(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => match min.version().cmp(max.version()) {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => !(min.is_inclusive() && max.is_inclusive()),
            },
            _ => false,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            match version.cmp(min.version()) {
                Ordering::Less => return false,
                Ordering::Equal if !min.is_inclusive() => return false,
                _ => {}
            }
        }

        if let Some(max) = &self.max {
            match version.cmp(max.version()) {
                Ordering::Greater => return false,
                Ordering::Equal if !max.is_inclusive() => return false,
                _ => {}
            }
        }

        true
    }

    /// Intersect two intervals
    pub fn and(&self, other: &VersionInterval) -> Option<VersionInterval> {
        let min = match Bound::cmp_lower(self.min.as_ref(), other.min.as_ref()) {
            Ordering::Less => other.min.clone(),
            _ => self.min.clone(),
        };
        let max = match Bound::cmp_upper(self.max.as_ref(), other.max.as_ref()) {
            Ordering::Greater => other.max.clone(),
            _ => self.max.clone(),
        };

        VersionInterval::new(min, max)
    }

    /// Intersect two interval lists (each a union of intervals)
    pub fn and_all(a: &[VersionInterval], b: &[VersionInterval]) -> Vec<VersionInterval> {
        let mut ret = Vec::new();
        for x in a {
            for y in b {
                if let Some(z) = x.and(y) {
                    ret.push(z);
                }
            }
        }
        Self::normalize(ret)
    }

    /// Union two interval lists
    pub fn or_all(a: &[VersionInterval], b: &[VersionInterval]) -> Vec<VersionInterval> {
        let mut ret: Vec<VersionInterval> = a.to_vec();
        ret.extend_from_slice(b);
        Self::normalize(ret)
    }

    /// Sort intervals by their lower bound and merge overlapping or touching ones
    pub fn normalize(mut intervals: Vec<VersionInterval>) -> Vec<VersionInterval> {
        intervals.sort_by(|a, b| Bound::cmp_lower(a.min.as_ref(), b.min.as_ref()));

        let mut merged: Vec<VersionInterval> = Vec::with_capacity(intervals.len());
        for interval in intervals {
            if let Some(last) = merged.last_mut() {
                if Bound::reaches(last.max.as_ref(), interval.min.as_ref()) {
                    if Bound::cmp_upper(interval.max.as_ref(), last.max.as_ref()) == Ordering::Greater {
                        last.max = interval.max;
                    }
                    continue;
                }
            }
            merged.push(interval);
        }

        merged
    }
}

impl fmt::Display for VersionInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (None, None) => write!(f, "*"),
            (Some(min), Some(max)) if min.version() == max.version() => write!(f, "{}", min.version()),
            (min, max) => {
                let mut parts = Vec::new();
                if let Some(min) = min {
                    let op = if min.is_inclusive() { ">=" } else { ">" };
                    parts.push(format!("{}{}", op, min.version()));
                }
                if let Some(max) = max {
                    let op = if max.is_inclusive() { "<=" } else { "<" };
                    parts.push(format!("{}{}", op, max.version()));
                }
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}
