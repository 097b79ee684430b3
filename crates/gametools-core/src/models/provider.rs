use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Login details for one distribution platform, as stored in the provider sheet
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Lowercased canonical name
    pub key: String,
    pub url: String,
    pub username: String,
    pub password: String,
    /// Lowercased alternative names
    #[serde(default)]
    pub aliases: BTreeSet<String>,
}

impl ProviderRecord {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.trim().to_lowercase(),
            url: String::new(),
            username: String::new(),
            password: String::new(),
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.aliases.extend(
            aliases
                .into_iter()
                .map(|a| a.as_ref().trim().to_lowercase())
                .filter(|a| !a.is_empty()),
        );
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() || !self.password.is_empty()
    }

    /// Canonical key followed by every alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("key", &self.key)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("aliases", &self.aliases)
            .finish()
    }
}
