//! Optional packages and the plugins they attach to core nodes.
//!
//! A package implements [`Extension`] and is registered once per process
//! with [`register_extension`]. While reading a document, every node whose
//! kind matches one of the package's extension points receives a [`Plugin`]
//! created by the matching [`PluginCreator`]; the plugin holds whatever
//! attributes and child elements the package defines for that node. Core
//! node types never learn about individual packages: callers reach package
//! state through [`Node::plugin`](crate::Node::plugin).
//!
//! Namespaces with no registered implementation are kept as
//! [`OpaquePayload`] plugins so their content survives a round trip.

mod plugin;
mod registry;

pub use plugin::{HostRef, OpaquePayload, Plugin, PluginData};
pub use registry::{
    ExtensionRegistry, extension_by_name, extension_by_uri, plugin_creator,
    register_extension, registered_extensions,
};

pub use crate::reader::PackageReader;
pub use crate::writer::PackageWriter;

use crate::error_log::ErrorRecord;
use crate::namespaces::XmlNamespaces;
use crate::node::{ElementKind, IdScope};
use crate::validation::Constraint;
use crate::Document;
use sbml_schema::Revision;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Namespace of a package for one core revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUri {
    pub uri: String,
    pub level: u32,
    pub version: u32,
    pub package_version: u32,
}

impl PackageUri {
    pub fn new(uri: impl Into<String>, level: u32, version: u32, package_version: u32) -> Self {
        Self {
            uri: uri.into(),
            level,
            version,
            package_version,
        }
    }

    pub fn revision(&self) -> Option<Revision> {
        Revision::new(self.level, self.version)
    }
}

/// Where a package may attach: a core node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionPoint {
    pub kind: ElementKind,
}

impl ExtensionPoint {
    pub fn new(kind: ElementKind) -> Self {
        Self { kind }
    }
}

/// Factory for the plugin a package attaches at one extension point.
pub trait PluginCreator: Send + Sync {
    fn extension_point(&self) -> ExtensionPoint;

    /// Builds empty plugin data for a node bound to `uri` under `prefix`.
    fn create_plugin(
        &self,
        uri: &str,
        prefix: &str,
        namespaces: &XmlNamespaces,
    ) -> Box<dyn PluginData>;
}

/// A package definition.
pub trait Extension: Send + Sync {
    /// Short package name, e.g. `arrays`.
    fn name(&self) -> &str;

    /// Primary namespace URI; the registry key.
    fn uri(&self) -> &str;

    /// Every namespace the package uses, one per supported core revision.
    fn uris(&self) -> Vec<PackageUri>;

    fn default_prefix(&self) -> &str;

    fn plugin_creators(&self) -> Vec<Arc<dyn PluginCreator>>;

    /// Package constraints, run with the core consistency checks.
    fn constraints(&self) -> Vec<Box<dyn Constraint>> {
        Vec::new()
    }

    /// Whether [`Extension::check_consistency`] reports anything; the
    /// document only calls the hook when this returns true.
    fn has_consistency_checks(&self) -> bool {
        false
    }

    /// Package-level consistency hook, invoked once per registered
    /// extension during a consistency check.
    fn check_consistency(&self, _document: &Document) -> Vec<ErrorRecord> {
        Vec::new()
    }

    fn supports_uri(&self, uri: &str) -> bool {
        self.uri() == uri || self.uris().iter().any(|u| u.uri == uri)
    }

    /// The package namespace for a core revision.
    fn uri_for(&self, revision: Revision) -> Option<String> {
        self.uris()
            .into_iter()
            .find(|u| u.revision() == Some(revision))
            .map(|u| u.uri)
    }

    /// Core revision a package namespace belongs to.
    fn revision_of(&self, uri: &str) -> Option<Revision> {
        self.uris()
            .into_iter()
            .find(|u| u.uri == uri)
            .and_then(|u| u.revision())
    }
}

/// Node payload defined by a package, carried by
/// [`NodeKind::Extension`](crate::NodeKind::Extension).
pub trait ExtensionElement: fmt::Debug + Send + Sync {
    /// Name of the package that defines the element.
    fn package(&self) -> &str;

    /// Local element name, without prefix.
    fn element_name(&self) -> &str;

    fn id_scope(&self) -> IdScope {
        IdScope::Model
    }

    /// Offers one attribute; `Ok(false)` when the name is not recognised,
    /// `Err` with a description when the value is malformed.
    fn read_attribute(&mut self, name: &str, value: &str) -> Result<bool, String>;

    /// Attributes in output order.
    fn write_attributes(&self, out: &mut Vec<(String, String)>);

    fn clone_box(&self) -> Box<dyn ExtensionElement>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
