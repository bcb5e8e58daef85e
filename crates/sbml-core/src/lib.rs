//! # SBML document engine
//!
//! Reads, edits, validates, converts and writes SBML documents across every
//! core revision from Level 1 Version 1 to Level 3 Version 2, with Level 3
//! packages attached as plugins.
//!
//! ## Architecture
//!
//! ```text
//! reader                 ← markup → Document, findings → ErrorLog
//!     │
//! Document               ← revision, namespaces, packages, one Node tree
//!     │
//! Node / NodeKind        ← owned tree; Plugin per enabled package
//!     │
//! validation             ← Constraint objects grouped by CheckCategories
//!     │
//! conversion             ← Converter registry; every converter leaves the
//!     │                    document intact when it fails
//! writer                 ← Document → deterministic markup
//! ```
//!
//! Revisions and the error catalog live in the `sbml-schema` crate and are
//! re-exported here.

pub mod config;
pub mod conversion;
pub mod document;
pub mod error;
pub mod error_log;
pub mod extension;
pub mod math;
pub mod namespaces;
pub mod node;
pub mod reader;
pub mod validation;
pub mod vocabulary;
pub mod writer;
pub mod xml;

pub use config::{ConfigError, EngineConfig};
pub use conversion::{
    ConversionError, ConversionOption, ConversionProperties, Converter, ConverterRegistry,
    OptionValue, converter_for, register_converter, registered_converters,
};
pub use document::{Document, PackageDeclaration};
pub use error::{PackageError, RegistryError, SbmlError};
pub use error_log::{ErrorLog, ErrorRecord, SeverityOverride};
pub use extension::{
    Extension, ExtensionElement, ExtensionPoint, PackageUri, Plugin, PluginCreator, PluginData,
    register_extension,
};
pub use math::{Math, MathError, MathNode};
pub use namespaces::{NamespaceDecl, XmlNamespaces};
pub use node::{ElementKind, Node, NodeKind, NodePath};
pub use reader::{read_sbml_from_file, read_sbml_from_str};
pub use validation::{CheckCategories, Constraint, DocumentValidator, Validator};
pub use writer::{write_node, write_sbml_to_file, write_sbml_to_string};

pub use sbml_schema::{Revision, Severity, code};
