use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime environment a resolution runs for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvType {
    Client,
    Server,
}

impl EnvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvType::Client => "client",
            EnvType::Server => "server",
        }
    }

    /// Capitalized name for user-facing messages
    pub fn display_name(&self) -> &'static str {
        match self {
            EnvType::Client => "Client",
            EnvType::Server => "Server",
        }
    }
}

impl fmt::Display for EnvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Environments a candidate or dependency applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModEnvironment {
    Client,
    Server,
    #[default]
    #[serde(alias = "*")]
    Universal,
}

impl ModEnvironment {
    pub fn matches(&self, env: EnvType) -> bool {
        match self {
            ModEnvironment::Universal => true,
            ModEnvironment::Client => env == EnvType::Client,
            ModEnvironment::Server => env == EnvType::Server,
        }
    }
}

impl fmt::Display for ModEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModEnvironment::Client => "client",
            ModEnvironment::Server => "server",
            ModEnvironment::Universal => "*",
        };
        write!(f, "{}", name)
    }
}
