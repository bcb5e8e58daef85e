//! Error types for construction, registry and I/O operations.
//!
//! Parse-time and validation findings are not errors in this sense; they
//! are records in a document's [`ErrorLog`](crate::ErrorLog).

use crate::config::ConfigError;
use crate::math::MathError;
use crate::node::ElementKind;
use sbml_schema::Revision;
use std::path::PathBuf;

/// Errors raised when building or persisting documents and nodes.
#[derive(Debug, thiserror::Error)]
pub enum SbmlError {
    /// The level/version pair is not one of the defined revisions.
    #[error("level {level} version {version} is not a valid SBML revision")]
    InvalidRevision { level: u32, version: u32 },

    /// The element kind does not exist in the requested revision.
    #[error("{kind} is not defined in {revision}")]
    KindNotInRevision {
        kind: ElementKind,
        revision: Revision,
    },

    /// A namespace set does not name a core namespace usable for a document.
    #[error("namespace set does not identify an SBML revision: {detail}")]
    NamespaceMismatch { detail: String },

    /// The child kind cannot be placed under the parent kind.
    #[error("{child} cannot be a child of {parent}")]
    InvalidChild {
        parent: ElementKind,
        child: ElementKind,
    },

    /// A node that should be a model is not.
    #[error("expected a Model, found {0}")]
    NotAModel(ElementKind),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised when enabling or disabling a package on a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackageError {
    /// Neither a registered package nor a namespace known to the document.
    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    /// The package defines no namespace for the document's revision.
    #[error("package '{package}' is not available for {revision}")]
    UnsupportedRevision { package: String, revision: Revision },

    /// Packages can only be used in Level 3 documents.
    #[error("packages require a Level 3 document, found {0}")]
    NotLevel3(Revision),
}

/// Errors raised by the process-wide extension registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A package with the same primary namespace is already registered.
    #[error("an extension for '{uri}' is already registered")]
    AlreadyRegistered { uri: String },

    /// A converter with the same name is already registered.
    #[error("a converter named '{name}' is already registered")]
    DuplicateConverter { name: String },
}
