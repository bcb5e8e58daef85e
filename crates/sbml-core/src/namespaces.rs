//! Ordered namespace declarations.

use serde::{Deserialize, Serialize};

/// One `xmlns` declaration; the empty prefix is the default namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDecl {
    pub prefix: String,
    pub uri: String,
}

/// Namespace declarations in declaration order, at most one per prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlNamespaces {
    decls: Vec<NamespaceDecl>,
}

impl XmlNamespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing only `uri` as the default namespace.
    pub fn with_default(uri: &str) -> Self {
        let mut ns = Self::new();
        ns.add(uri, "");
        ns
    }

    /// Declares `uri` under `prefix`, replacing any earlier binding of the
    /// same prefix in place.
    pub fn add(&mut self, uri: &str, prefix: &str) {
        if let Some(decl) = self.decls.iter_mut().find(|d| d.prefix == prefix) {
            decl.uri = uri.to_string();
            return;
        }
        self.decls.push(NamespaceDecl {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        });
    }

    pub fn remove_prefix(&mut self, prefix: &str) -> Option<NamespaceDecl> {
        let idx = self.decls.iter().position(|d| d.prefix == prefix)?;
        Some(self.decls.remove(idx))
    }

    /// Removes every declaration of `uri`; returns how many were removed.
    pub fn remove_uri(&mut self, uri: &str) -> usize {
        let before = self.decls.len();
        self.decls.retain(|d| d.uri != uri);
        before - self.decls.len()
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.decls
            .iter()
            .find(|d| d.prefix == prefix)
            .map(|d| d.uri.as_str())
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.decls
            .iter()
            .find(|d| d.uri == uri)
            .map(|d| d.prefix.as_str())
    }

    pub fn contains_uri(&self, uri: &str) -> bool {
        self.decls.iter().any(|d| d.uri == uri)
    }

    pub fn contains(&self, uri: &str, prefix: &str) -> bool {
        self.decls.iter().any(|d| d.uri == uri && d.prefix == prefix)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamespaceDecl> {
        self.decls.iter()
    }

    /// Keeps only declarations for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&NamespaceDecl) -> bool) {
        self.decls.retain(|d| keep(d));
    }

    /// Declarations as `(prefix, uri)` pairs with `None` for the default.
    pub fn as_pairs(&self) -> Vec<(Option<String>, String)> {
        self.decls
            .iter()
            .map(|d| {
                let prefix = (!d.prefix.is_empty()).then(|| d.prefix.clone());
                (prefix, d.uri.clone())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_replaces_existing_prefix_in_place() {
        let mut ns = XmlNamespaces::with_default("urn:a");
        ns.add("urn:b", "b");
        ns.add("urn:c", "");
        assert_eq!(ns.len(), 2);
        assert_eq!(ns.uri_for(""), Some("urn:c"));
        assert_eq!(ns.iter().next().map(|d| d.prefix.as_str()), Some(""));
    }

    #[test]
    fn lookups_by_uri_and_prefix() {
        let mut ns = XmlNamespaces::new();
        ns.add("urn:x", "x");
        assert_eq!(ns.prefix_for("urn:x"), Some("x"));
        assert!(ns.contains("urn:x", "x"));
        assert!(!ns.contains("urn:x", ""));
        assert_eq!(ns.remove_uri("urn:x"), 1);
        assert!(ns.is_empty());
    }

    #[test]
    fn pairs_use_none_for_default_prefix() {
        let mut ns = XmlNamespaces::with_default("urn:core");
        ns.add("urn:pkg", "pkg");
        assert_eq!(
            ns.as_pairs(),
            vec![
                (None, "urn:core".to_string()),
                (Some("pkg".to_string()), "urn:pkg".to_string()),
            ]
        );
    }
}
