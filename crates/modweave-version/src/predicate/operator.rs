//! Operator types for version predicates

use std::fmt;

/// Comparison operators for version predicate terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal (`=` or a bare version, also used for x-ranges like `1.2.x`)
    Equal,
    /// Greater than (`>`)
    Greater,
    /// Greater than or equal (`>=`)
    GreaterOrEqual,
    /// Less than (`<`)
    Less,
    /// Less than or equal (`<=`)
    LessOrEqual,
    /// Same major version, at least the given one (`^`)
    SameMajor,
    /// Same major and minor version, at least the given one (`~`)
    SameMinor,
    /// Any version (`*`)
    Any,
}

impl Operator {
    /// Split a predicate term into its operator and the remaining version text.
    ///
    /// Longer operators are matched first so `>=1.0` is not read as `>` `=1.0`.
    pub fn split_term(term: &str) -> (Operator, &str) {
        const PREFIXES: &[(&str, Operator)] = &[
            (">=", Operator::GreaterOrEqual),
            ("<=", Operator::LessOrEqual),
            (">", Operator::Greater),
            ("<", Operator::Less),
            ("=", Operator::Equal),
            ("^", Operator::SameMajor),
            ("~", Operator::SameMinor),
        ];

        if term == "*" {
            return (Operator::Any, "");
        }

        for (prefix, operator) in PREFIXES {
            if let Some(rest) = term.strip_prefix(prefix) {
                return (*operator, rest.trim_start());
            }
        }

        (Operator::Equal, term)
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::SameMajor => "^",
            Operator::SameMinor => "~",
            Operator::Any => "*",
        }
    }

    /// Whether the operator accepts x-range versions such as `1.2.x`
    pub fn accepts_wildcard(&self) -> bool {
        matches!(self, Operator::Equal)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
