//! Mod-presence conditions.
//!
//! Conditions are evaluated against the resolution state: a mod that is
//! already committed is `True`, one that is still a pending candidate is
//! `Unknown`, anything else is `False`.

use std::fmt;

/// Three-valued answer to "is this mod loaded?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tristate {
    True,
    False,
    Unknown,
}

impl Tristate {
    pub fn is_true(self) -> bool {
        self == Tristate::True
    }

    pub fn is_known(self) -> bool {
        self != Tristate::Unknown
    }

    /// Kleene conjunction
    pub fn and(self, other: Tristate) -> Tristate {
        match (self, other) {
            (Tristate::False, _) | (_, Tristate::False) => Tristate::False,
            (Tristate::True, Tristate::True) => Tristate::True,
            _ => Tristate::Unknown,
        }
    }

    /// Kleene disjunction
    pub fn or(self, other: Tristate) -> Tristate {
        match (self, other) {
            (Tristate::True, _) | (_, Tristate::True) => Tristate::True,
            (Tristate::False, Tristate::False) => Tristate::False,
            _ => Tristate::Unknown,
        }
    }

    pub fn negate(self) -> Tristate {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Unknown => Tristate::Unknown,
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tristate::True => "true",
            Tristate::False => "false",
            Tristate::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

pub trait ConditionEvaluator {
    /// Presence of the mod (or provided alias) `mod_id`
    fn evaluate(&self, mod_id: &str) -> Tristate;

    fn all_of(&self, mod_ids: &[&str]) -> Tristate {
        mod_ids
            .iter()
            .fold(Tristate::True, |acc, id| acc.and(self.evaluate(id)))
    }

    fn any_of(&self, mod_ids: &[&str]) -> Tristate {
        mod_ids
            .iter()
            .fold(Tristate::False, |acc, id| acc.or(self.evaluate(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl ConditionEvaluator for Fixed {
        fn evaluate(&self, mod_id: &str) -> Tristate {
            match mod_id {
                "loaded" => Tristate::True,
                "pending" => Tristate::Unknown,
                _ => Tristate::False,
            }
        }
    }

    #[test]
    fn test_kleene_logic() {
        assert_eq!(Tristate::True.and(Tristate::Unknown), Tristate::Unknown);
        assert_eq!(Tristate::False.and(Tristate::Unknown), Tristate::False);
        assert_eq!(Tristate::True.or(Tristate::Unknown), Tristate::True);
        assert_eq!(Tristate::False.or(Tristate::Unknown), Tristate::Unknown);
        assert_eq!(Tristate::Unknown.negate(), Tristate::Unknown);
        assert_eq!(Tristate::from(true), Tristate::True);
    }

    #[test]
    fn test_combinators() {
        assert_eq!(Fixed.all_of(&["loaded", "pending"]), Tristate::Unknown);
        assert_eq!(Fixed.all_of(&["loaded", "absent"]), Tristate::False);
        assert_eq!(Fixed.any_of(&["absent", "loaded"]), Tristate::True);
        assert_eq!(Fixed.any_of(&[]), Tristate::False);
        assert_eq!(Fixed.all_of(&[]), Tristate::True);
    }
}
