//! The document: root of a tree, its revision, namespaces, package
//! declarations and error log.
//!
//! A [`Document`] owns exactly one tree whose root node has kind
//! [`NodeKind::Document`]; the model, when present, is that root's only
//! child. Everything that walks the tree (validation, conversion, the
//! writer) borrows it from here.

mod checks;
mod packages;

pub use packages::PackageDeclaration;

pub(crate) use packages::{DisabledPackage, new_plugin};

use crate::config::EngineConfig;
use crate::error::SbmlError;
use crate::error_log::ErrorLog;
use crate::namespaces::XmlNamespaces;
use crate::node::{ElementKind, Node, NodeKind, NodeLink, NodePath, Visitor};
use crate::validation::{CheckCategories, DocumentValidator};
use sbml_schema::{MATHML_XMLNS, Revision, XHTML_XMLNS, is_core_namespace, revisions_for_namespace};
use std::collections::BTreeMap;
use std::fmt;

/// An SBML document.
pub struct Document {
    revision: Revision,
    root: Node,
    location_uri: Option<String>,
    namespaces: XmlNamespaces,
    packages: Vec<PackageDeclaration>,
    disabled: BTreeMap<(String, String), DisabledPackage>,
    error_log: ErrorLog,
    validators: Vec<Box<dyn DocumentValidator>>,
    applicable: CheckCategories,
    conversion: CheckCategories,
}

impl Document {
    /// Empty document of the default revision.
    pub fn new() -> Self {
        Self::with_revision(Revision::DEFAULT)
    }

    pub fn with_revision(revision: Revision) -> Self {
        let mut document = Self {
            revision,
            root: Node::new(NodeKind::Document),
            location_uri: None,
            namespaces: XmlNamespaces::with_default(revision.namespace_uri()),
            packages: Vec::new(),
            disabled: BTreeMap::new(),
            error_log: ErrorLog::new(),
            validators: Vec::new(),
            applicable: CheckCategories::ALL,
            conversion: CheckCategories::CONVERSION_DEFAULT,
        };
        document.connect_to_child();
        document
    }

    /// Document for a level/version pair; fails for pairs that are not
    /// defined revisions.
    pub fn from_level_version(level: u32, version: u32) -> Result<Self, SbmlError> {
        Revision::new(level, version)
            .map(Self::with_revision)
            .ok_or(SbmlError::InvalidRevision { level, version })
    }

    /// Document whose revision is taken from the core namespace in
    /// `namespaces`. Package namespaces in the set are declared (and
    /// enabled when registered); the set is otherwise kept as given.
    pub fn from_namespaces(namespaces: XmlNamespaces) -> Result<Self, SbmlError> {
        let core: Vec<&str> = namespaces
            .iter()
            .map(|d| d.uri.as_str())
            .filter(|uri| is_core_namespace(uri))
            .collect();
        let revision = match core.as_slice() {
            [uri] => revisions_for_namespace(uri)
                .last()
                .copied()
                .ok_or_else(|| SbmlError::NamespaceMismatch {
                    detail: format!("'{uri}' is not a core namespace"),
                })?,
            [] => {
                return Err(SbmlError::NamespaceMismatch {
                    detail: "no core namespace declared".to_string(),
                });
            }
            _ => {
                return Err(SbmlError::NamespaceMismatch {
                    detail: format!("{} core namespaces declared", core.len()),
                });
            }
        };
        let mut document = Self::with_revision(revision);
        document.namespaces = namespaces.clone();
        for decl in namespaces.iter() {
            if is_core_namespace(&decl.uri) || decl.uri == MATHML_XMLNS || decl.uri == XHTML_XMLNS {
                continue;
            }
            document.declare_package(&decl.uri, &decl.prefix, false);
        }
        Ok(document)
    }

    /// Empty document configured from engine settings.
    pub fn with_config(config: &EngineConfig) -> Self {
        let mut document = Self::with_revision(config.revision());
        document.applicable = config.applicable_categories();
        document.conversion = config.conversion_categories();
        document
            .error_log
            .set_severity_override(config.severity_override());
        document
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn level(&self) -> u32 {
        self.revision.level()
    }

    pub fn version(&self) -> u32 {
        self.revision.version()
    }

    /// The `<sbml>` node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutable access to the root node. Call
    /// [`Document::connect_to_child`] after structural edits made through
    /// it.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn model(&self) -> Option<&Node> {
        self.root.children_of_kind(ElementKind::Model).next()
    }

    pub fn model_mut(&mut self) -> Option<&mut Node> {
        self.root
            .children_mut()
            .iter_mut()
            .find(|n| n.element_kind() == ElementKind::Model)
    }

    /// Creates an empty model, replacing any existing one.
    pub fn create_model(&mut self, id: &str) -> &mut Node {
        let model = Node::model(id);
        self.root.children_mut().retain(|n| n.element_kind() != ElementKind::Model);
        self.root.children_mut().push(model);
        self.connect_to_child();
        let last = self.root.children_mut().len() - 1;
        &mut self.root.children_mut()[last]
    }

    /// Installs `model`, replacing any existing one.
    pub fn set_model(&mut self, model: Node) -> Result<(), SbmlError> {
        let kind = model.element_kind();
        if kind != ElementKind::Model {
            return Err(SbmlError::NotAModel(kind));
        }
        self.root.add_child(model)?;
        self.connect_to_child();
        Ok(())
    }

    /// Removes and returns the model.
    pub fn take_model(&mut self) -> Option<Node> {
        let index = self
            .root
            .children()
            .iter()
            .position(|n| n.element_kind() == ElementKind::Model)?;
        self.root.remove_child(index)
    }

    pub fn location_uri(&self) -> Option<&str> {
        self.location_uri.as_deref()
    }

    pub fn set_location_uri(&mut self, uri: impl Into<String>) {
        self.location_uri = Some(uri.into());
    }

    /// Namespace declarations of the `<sbml>` element.
    pub fn namespaces(&self) -> &XmlNamespaces {
        &self.namespaces
    }

    /// Adds a declaration other than a package namespace; use
    /// [`Document::enable_package`] for those.
    pub fn add_namespace(&mut self, uri: &str, prefix: &str) {
        self.namespaces.add(uri, prefix);
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    pub fn error_log_mut(&mut self) -> &mut ErrorLog {
        &mut self.error_log
    }

    pub fn num_errors(&self) -> usize {
        self.error_log.len()
    }

    /// Node at `path` from the root.
    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        self.root.node_at(path)
    }

    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        self.root.node_at_mut(path)
    }

    /// Owner of `node`, resolved through its path.
    pub fn parent_of(&self, node: &Node) -> Option<&Node> {
        self.root.node_at(&node.path().parent()?)
    }

    /// First node in the model-wide identifier scope with `id`.
    pub fn get_element_by_sid(&self, id: &str) -> Option<&Node> {
        self.root.get_element_by_sid(id)
    }

    /// First node anywhere in the document whose metaid is `meta_id`.
    pub fn get_element_by_meta_id(&self, meta_id: &str) -> Option<&Node> {
        self.root.get_element_by_meta_id(meta_id)
    }

    pub fn get_all_elements(&self, filter: impl Fn(&Node) -> bool) -> Vec<&Node> {
        self.root.get_all_elements(filter)
    }

    pub fn accept(&self, visitor: &mut dyn Visitor) -> bool {
        self.root.accept(visitor)
    }

    /// Rebuilds every back-reference in the tree.
    pub fn connect_to_child(&mut self) {
        self.root.set_link(NodeLink {
            path: NodePath::root(),
            parent: None,
            revision: Some(self.revision),
        });
    }

    /// Attaches an externally supplied validator, run by
    /// [`Document::validate`].
    pub fn add_validator(&mut self, validator: Box<dyn DocumentValidator>) {
        self.validators.push(validator);
    }

    pub fn clear_validators(&mut self) {
        self.validators.clear();
    }

    pub fn num_validators(&self) -> usize {
        self.validators.len()
    }

    /// Categories run by [`Document::check_consistency`].
    pub fn applicable_categories(&self) -> CheckCategories {
        self.applicable
    }

    pub fn set_consistency_checks(&mut self, category: CheckCategories, on: bool) {
        self.applicable.set(category, on);
    }

    /// Categories checked before a revision conversion.
    pub fn conversion_categories(&self) -> CheckCategories {
        self.conversion
    }

    pub fn set_consistency_checks_for_conversion(&mut self, category: CheckCategories, on: bool) {
        self.conversion.set(category, on);
    }

    /// Moves the document to `revision`: the core namespace is swapped and
    /// every back-reference rebound. The tree itself is not rewritten.
    pub(crate) fn set_revision(&mut self, revision: Revision) {
        let prefix = self
            .namespaces
            .iter()
            .find(|d| is_core_namespace(&d.uri))
            .map(|d| d.prefix.clone())
            .unwrap_or_default();
        self.namespaces.retain(|d| !is_core_namespace(&d.uri));
        self.namespaces.add(revision.namespace_uri(), &prefix);
        self.revision = revision;
        self.connect_to_child();
    }

    pub(crate) fn namespaces_mut(&mut self) -> &mut XmlNamespaces {
        &mut self.namespaces
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        let mut copy = Self {
            revision: self.revision,
            root: self.root.clone(),
            location_uri: self.location_uri.clone(),
            namespaces: self.namespaces.clone(),
            packages: self.packages.clone(),
            disabled: self.disabled.clone(),
            error_log: self.error_log.clone(),
            validators: self.validators.iter().map(|v| v.clone_box()).collect(),
            applicable: self.applicable,
            conversion: self.conversion,
        };
        copy.connect_to_child();
        copy
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("revision", &self.revision)
            .field("root", &self.root)
            .field("namespaces", &self.namespaces)
            .field("packages", &self.packages)
            .field("errors", &self.error_log.len())
            .field("validators", &self.validators.len())
            .finish()
    }
}
