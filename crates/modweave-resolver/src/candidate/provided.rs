use modweave_version::Version;
use std::fmt;

/// An alias id a candidate also answers to
///
/// Exclusive aliases behave like a second primary id: no other candidate may
/// hold that id at the same time. Non-exclusive aliases may be provided by
/// several loaded mods at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedMod {
    pub id: String,
    pub version: Version,
    pub exclusive: bool,
}

impl ProvidedMod {
    pub fn new(id: impl Into<String>, version: Version, exclusive: bool) -> Self {
        Self {
            id: id.into(),
            version,
            exclusive,
        }
    }

    pub fn exclusive(id: impl Into<String>, version: Version) -> Self {
        Self::new(id, version, true)
    }

    pub fn shared(id: impl Into<String>, version: Version) -> Self {
        Self::new(id, version, false)
    }
}

impl fmt::Display for ProvidedMod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version)?;
        if !self.exclusive {
            write!(f, " (shared)")?;
        }
        Ok(())
    }
}
