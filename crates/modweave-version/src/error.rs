use thiserror::Error;

/// Errors raised while parsing versions and version predicates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParsingError {
    #[error("Version must not be empty")]
    Empty,

    #[error("Invalid version \"{0}\"")]
    InvalidVersion(String),

    #[error("Invalid version component \"{component}\" in \"{version}\"")]
    InvalidComponent { version: String, component: String },

    #[error("Invalid prerelease \"{0}\"")]
    InvalidPrerelease(String),

    #[error("Invalid version predicate \"{0}\"")]
    InvalidPredicate(String),

    #[error("Operator {operator} does not accept x-range version \"{version}\"")]
    WildcardNotAllowed { operator: String, version: String },
}
