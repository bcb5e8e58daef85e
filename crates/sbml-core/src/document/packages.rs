//! Package declarations and the enable/disable cascade.

use super::Document;
use crate::error::PackageError;
use crate::extension::{
    Extension, OpaquePayload, Plugin, extension_by_name, extension_by_uri, plugin_creator,
};
use crate::namespaces::XmlNamespaces;
use crate::node::{ElementKind, Node, NodePath};
use sbml_schema::Revision;
use std::sync::Arc;

/// A package namespace declared on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDeclaration {
    pub uri: String,
    pub prefix: String,
    /// Package name; the prefix for packages with no registered
    /// implementation.
    pub name: String,
    /// Value of the `prefix:required` attribute.
    pub required: bool,
    /// Whether a registered extension interprets the namespace.
    pub known: bool,
    /// Whether package elements are written in the default namespace.
    pub default_namespace: bool,
}

/// One plugin removed while its package was disabled.
#[derive(Debug, Clone)]
pub(crate) struct DetachedPlugin {
    /// Host path in the tree with the package detached.
    path: NodePath,
    /// Position in the host's plugin list.
    index: usize,
    payload: OpaquePayload,
}

/// Everything needed to re-enable a disabled package.
#[derive(Debug, Clone)]
pub(crate) struct DisabledPackage {
    declaration: PackageDeclaration,
    plugins: Vec<DetachedPlugin>,
}

/// Plugin a registered package attaches to a node of `kind`, if any.
pub(crate) fn new_plugin(
    uri: &str,
    prefix: &str,
    kind: ElementKind,
    namespaces: &XmlNamespaces,
) -> Option<Plugin> {
    let extension = extension_by_uri(uri)?;
    let creator = plugin_creator(uri, kind)?;
    Some(Plugin::new(
        extension.name(),
        uri,
        prefix,
        creator.create_plugin(uri, prefix, namespaces),
    ))
}

/// Pre-order mutable walk over a node, its children and the elements of
/// its plugins, with the path of each node.
fn for_each_node_mut(node: &mut Node, path: &NodePath, f: &mut dyn FnMut(&mut Node, &NodePath)) {
    f(node, path);
    for (index, child) in node.children_mut().iter_mut().enumerate() {
        for_each_node_mut(child, &path.child(index), f);
    }
    for (p, plugin) in node.plugins_mut().iter_mut().enumerate() {
        for (e, element) in plugin.elements_mut().into_iter().enumerate() {
            for_each_node_mut(element, &path.plugin_element(p, e), f);
        }
    }
}

/// Removes the plugins for `uri` below and including `node`, recording each
/// host by its path in the detached tree.
fn detach(
    node: &mut Node,
    path: &NodePath,
    uri: &str,
    revision: Revision,
    out: &mut Vec<DetachedPlugin>,
) {
    if let Some(index) = node.plugins().iter().position(|p| p.uri() == uri) {
        let plugin = node.plugins_mut().remove(index);
        out.push(DetachedPlugin {
            path: path.clone(),
            index,
            payload: plugin.snapshot(revision),
        });
    }
    for (index, child) in node.children_mut().iter_mut().enumerate() {
        detach(child, &path.child(index), uri, revision, out);
    }
    for (p, plugin) in node.plugins_mut().iter_mut().enumerate() {
        for (e, element) in plugin.elements_mut().into_iter().enumerate() {
            detach(element, &path.plugin_element(p, e), uri, revision, out);
        }
    }
}

impl Document {
    /// Enables or disables a package on every node of the document.
    ///
    /// `key` is a registered package name or a namespace URI; namespaces
    /// with no registered implementation are handled opaquely. Disabling
    /// keeps each plugin's serialized content in a side table keyed by
    /// `(uri, prefix)`, and enabling the same namespace again restores it.
    pub fn enable_package(&mut self, key: &str, prefix: &str, enabled: bool) -> Result<(), PackageError> {
        if self.revision.level() < 3 {
            return Err(PackageError::NotLevel3(self.revision));
        }
        let extension = extension_by_uri(key).or_else(|| extension_by_name(key));
        let uri = match &extension {
            Some(ext) => ext.uri_for(self.revision).ok_or_else(|| PackageError::UnsupportedRevision {
                package: ext.name().to_string(),
                revision: self.revision,
            })?,
            None => self.resolve_unknown(key, enabled)?,
        };
        if enabled {
            self.attach_package(&uri, prefix, extension);
        } else {
            self.detach_package(&uri);
        }
        Ok(())
    }

    fn resolve_unknown(&self, key: &str, enabled: bool) -> Result<String, PackageError> {
        if let Some(decl) = self.declaration(key) {
            return Ok(decl.uri.clone());
        }
        if let Some(entry) = self
            .disabled
            .values()
            .find(|d| d.declaration.uri == key || d.declaration.name == key)
        {
            return Ok(entry.declaration.uri.clone());
        }
        if enabled && key.contains(':') {
            return Ok(key.to_string());
        }
        Err(PackageError::UnknownPackage(key.to_string()))
    }

    fn attach_package(&mut self, uri: &str, prefix: &str, extension: Option<Arc<dyn Extension>>) {
        if self.packages.iter().any(|p| p.uri == uri) {
            return;
        }
        let entry_key = self
            .disabled
            .keys()
            .find(|(u, p)| u == uri && p == prefix)
            .or_else(|| self.disabled.keys().find(|(u, _)| u == uri))
            .cloned();
        let entry = entry_key.and_then(|key| self.disabled.remove(&key));

        self.namespaces.add(uri, prefix);
        let mut declaration = match &entry {
            Some(entry) => entry.declaration.clone(),
            None => PackageDeclaration {
                uri: uri.to_string(),
                prefix: prefix.to_string(),
                name: extension
                    .as_ref()
                    .map_or_else(|| prefix.to_string(), |e| e.name().to_string()),
                required: false,
                known: extension.is_some(),
                default_namespace: false,
            },
        };
        declaration.prefix = prefix.to_string();
        if extension.is_none() {
            declaration.name = prefix.to_string();
        }
        self.packages.push(declaration);

        match entry {
            Some(entry) => self.restore_plugins(uri, prefix, entry.plugins, extension.is_some()),
            None if extension.is_some() => {
                let namespaces = self.namespaces.clone();
                let mut attached = 0usize;
                for_each_node_mut(&mut self.root, &NodePath::root(), &mut |node, _| {
                    if let Some(plugin) = new_plugin(uri, prefix, node.element_kind(), &namespaces) {
                        if node.add_plugin(plugin) {
                            attached += 1;
                        }
                    }
                });
                tracing::debug!(uri, attached, "package enabled");
            }
            None => {}
        }
        self.connect_to_child();
    }

    fn restore_plugins(&mut self, uri: &str, prefix: &str, plugins: Vec<DetachedPlugin>, known: bool) {
        let revision = self.revision;
        let namespaces = self.namespaces.clone();
        let mut records = Vec::new();
        // Deepest hosts first, so recorded paths stay valid while plugins
        // are reinserted above them.
        for detached in plugins.into_iter().rev() {
            let Some(node) = self.root.node_at_mut(&detached.path) else {
                tracing::warn!(uri, path = %detached.path, "host of a disabled plugin is gone");
                continue;
            };
            let plugin = if known {
                match new_plugin(uri, prefix, node.element_kind(), &namespaces) {
                    Some(mut plugin) => {
                        records.extend(plugin.restore(&detached.payload, revision));
                        plugin
                    }
                    None => Plugin::opaque(uri, prefix, detached.payload),
                }
            } else {
                Plugin::opaque(uri, prefix, detached.payload)
            };
            let index = detached.index.min(node.plugins().len());
            node.plugins_mut().insert(index, plugin);
        }
        self.error_log.add_all(records);
        tracing::debug!(uri, "package re-enabled from the side table");
    }

    fn detach_package(&mut self, uri: &str) {
        let Some(position) = self.packages.iter().position(|p| p.uri == uri) else {
            return;
        };
        let declaration = self.packages.remove(position);
        let mut plugins = Vec::new();
        detach(&mut self.root, &NodePath::root(), uri, self.revision, &mut plugins);
        self.namespaces.remove_uri(uri);
        tracing::debug!(uri, plugins = plugins.len(), "package disabled");
        self.disabled.insert(
            (declaration.uri.clone(), declaration.prefix.clone()),
            DisabledPackage {
                declaration,
                plugins,
            },
        );
        self.connect_to_child();
    }

    /// Drops a package entirely: plugins, namespace, declaration and any
    /// side-table entry. Returns whether anything was removed.
    pub(crate) fn remove_package(&mut self, uri: &str) -> bool {
        let declared = self.packages.len();
        self.packages.retain(|p| p.uri != uri);
        let mut removed = self.packages.len() != declared;
        for_each_node_mut(&mut self.root, &NodePath::root(), &mut |node, _| {
            if node.remove_plugin(uri).is_some() {
                removed = true;
            }
        });
        removed |= self.namespaces.remove_uri(uri) > 0;
        self.disabled.retain(|(u, _), _| u != uri);
        self.connect_to_child();
        removed
    }

    /// Records a package namespace found on the `<sbml>` element, or
    /// updates its `required` flag when already declared.
    pub(crate) fn declare_package(&mut self, uri: &str, prefix: &str, required: bool) -> &mut PackageDeclaration {
        self.namespaces.add(uri, prefix);
        if let Some(index) = self.packages.iter().position(|p| p.uri == uri) {
            let declaration = &mut self.packages[index];
            declaration.required = required;
            return declaration;
        }
        let extension = extension_by_uri(uri);
        self.packages.push(PackageDeclaration {
            uri: uri.to_string(),
            prefix: prefix.to_string(),
            name: extension
                .as_ref()
                .map_or_else(|| prefix.to_string(), |e| e.name().to_string()),
            required,
            known: extension.is_some(),
            default_namespace: false,
        });
        let last = self.packages.len() - 1;
        &mut self.packages[last]
    }

    fn declaration(&self, key: &str) -> Option<&PackageDeclaration> {
        self.packages.iter().find(|p| p.uri == key || p.name == key)
    }

    fn declaration_mut(&mut self, key: &str) -> Option<&mut PackageDeclaration> {
        if let Some(index) = self.packages.iter().position(|p| p.uri == key || p.name == key) {
            return Some(&mut self.packages[index]);
        }
        self.disabled
            .values_mut()
            .map(|d| &mut d.declaration)
            .find(|d| d.uri == key || d.name == key)
    }

    /// Declared packages in declaration order.
    pub fn packages(&self) -> &[PackageDeclaration] {
        &self.packages
    }

    pub fn is_package_enabled(&self, key: &str) -> bool {
        self.declaration(key).is_some()
    }

    /// Whether the package is disabled and waiting in the side table.
    pub fn is_package_disabled(&self, key: &str) -> bool {
        self.disabled
            .values()
            .any(|d| d.declaration.uri == key || d.declaration.name == key)
    }

    /// Sets the `required` flag of a declared or disabled package.
    pub fn set_package_required(&mut self, key: &str, required: bool) -> Result<(), PackageError> {
        let declaration = self
            .declaration_mut(key)
            .ok_or_else(|| PackageError::UnknownPackage(key.to_string()))?;
        declaration.required = required;
        Ok(())
    }

    /// The `required` flag of a declared or disabled package; false for
    /// packages the document does not know about.
    pub fn package_required(&self, key: &str) -> bool {
        self.declaration(key)
            .or_else(|| {
                self.disabled
                    .values()
                    .map(|d| &d.declaration)
                    .find(|d| d.uri == key || d.name == key)
            })
            .is_some_and(|d| d.required)
    }

    /// Whether the package is declared but has no registered
    /// implementation, so its content is only preserved.
    pub fn is_ignored_package(&self, key: &str) -> bool {
        self.declaration(key).is_some_and(|d| !d.known)
    }

    /// Declared packages with no registered implementation.
    pub fn unknown_packages(&self) -> Vec<&PackageDeclaration> {
        self.packages.iter().filter(|p| !p.known).collect()
    }

    /// Writes the package's elements in the default namespace instead of
    /// under its prefix.
    pub fn enable_default_namespace(&mut self, key: &str, on: bool) -> Result<(), PackageError> {
        let declaration = self
            .declaration_mut(key)
            .ok_or_else(|| PackageError::UnknownPackage(key.to_string()))?;
        declaration.default_namespace = on;
        Ok(())
    }

    /// Registered extensions for the enabled packages, in declaration order.
    pub(crate) fn enabled_extensions(&self) -> Vec<Arc<dyn Extension>> {
        self.packages
            .iter()
            .filter(|p| p.known)
            .filter_map(|p| extension_by_uri(&p.uri))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_fragment;

    const URI: &str = "urn:example:layout";

    fn document_with_opaque_plugin() -> Document {
        let mut document = Document::with_revision(Revision::L3V1);
        document.create_model("m");
        document.declare_package(URI, "lay", true);
        let payload = OpaquePayload {
            attributes: vec![("width".to_string(), "3".to_string())],
            elements: parse_fragment(
                "<lay:box lay:id=\"b\"/>",
                &[(Some("lay".to_string()), URI.to_string())],
            )
            .expect("fragment"),
        };
        let model = document.model_mut().expect("model");
        assert!(model.add_plugin(Plugin::opaque(URI, "lay", payload)));
        document
    }

    #[test]
    fn packages_need_level_3() {
        let mut document = Document::with_revision(Revision::L2V4);
        let err = document.enable_package(URI, "lay", true).unwrap_err();
        assert_eq!(err, PackageError::NotLevel3(Revision::L2V4));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut document = Document::new();
        let err = document.enable_package("nothing", "n", true).unwrap_err();
        assert_eq!(err, PackageError::UnknownPackage("nothing".to_string()));
        assert!(document.set_package_required("nothing", true).is_err());
    }

    #[test]
    fn disabling_and_enabling_restores_opaque_content() {
        let mut document = document_with_opaque_plugin();
        let before = document.model().expect("model").plugins()[0].snapshot(Revision::L3V1);
        assert!(document.is_ignored_package(URI));
        assert!(document.package_required("lay"));

        document.enable_package(URI, "lay", false).expect("disable");
        assert!(!document.is_package_enabled(URI));
        assert!(document.is_package_disabled(URI));
        assert!(document.model().expect("model").plugins().is_empty());
        assert!(!document.namespaces().contains_uri(URI));
        assert!(document.package_required(URI));

        document.enable_package(URI, "lay", true).expect("enable");
        let model = document.model().expect("model");
        assert_eq!(model.plugins().len(), 1);
        assert_eq!(model.plugins()[0].snapshot(Revision::L3V1), before);
        assert!(document.namespaces().contains(URI, "lay"));
        assert!(document.package_required(URI));
        assert!(!document.is_package_disabled(URI));
    }

    #[test]
    fn removal_forgets_the_package() {
        let mut document = document_with_opaque_plugin();
        assert!(document.remove_package(URI));
        assert!(document.packages().is_empty());
        assert!(document.model().expect("model").plugins().is_empty());
        assert!(!document.remove_package(URI));
    }

    #[test]
    fn default_namespace_flag_is_recorded() {
        let mut document = document_with_opaque_plugin();
        document.enable_default_namespace(URI, true).expect("declared");
        assert!(document.packages()[0].default_namespace);
        assert_eq!(document.unknown_packages().len(), 1);
    }
}
