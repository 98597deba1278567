//! Quota scopes and their storage keys.

use std::fmt;

/// Prefix applied to every client scope's storage key.
const CLIENT_PREFIX: &str = "client:";
/// Storage key of the global scope. It lacks the client prefix, so no client
/// identifier can ever map onto it.
const GLOBAL_KEY: &str = "global";

/// The identity a quota is tracked against.
///
/// Each scope is also its own sweep family: expiry for one client never
/// touches another client's entries or the global ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// A single client, identified by an opaque string
    Client(String),
    /// The whole service
    Global,
}

impl Scope {
    /// Create a client scope.
    pub fn client(id: impl Into<String>) -> Self {
        Scope::Client(id.into())
    }

    /// Whether this is the global scope.
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }

    /// Namespaced key for backends that store scopes as flat strings.
    pub fn storage_key(&self) -> String {
        match self {
            Scope::Client(id) => format!("{}{}", CLIENT_PREFIX, id),
            Scope::Global => GLOBAL_KEY.to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
