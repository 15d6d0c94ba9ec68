use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Short names for upstream or listener URLs, e.g. `"google" -> "https://dns.google/resolve"`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<String, String>);

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, url: impl Into<String>) {
        self.0.insert(alias.into(), url.into());
    }

    /// Returns the aliased URL, or the token itself when it is not an alias.
    /// Substitution happens once; alias targets are not looked up again.
    pub fn resolve<'a>(&'a self, token: &'a str) -> &'a str {
        self.0.get(token).map(String::as_str).unwrap_or(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
