//! # SBML schema vocabulary
//!
//! Pure data shared by every part of the engine: the enumerated schema
//! revisions with their core namespace URIs, and the error catalog that
//! assigns each numeric code a category, a message and a severity per
//! revision.

pub mod catalog;
pub mod revision;

pub use catalog::{
    CATALOG, Category, ErrorDefinition, Severity, SeverityTable, code, definition, severity_for,
    strict_units_required_code,
};
pub use revision::{
    ADDED_PREFIX, MATHML_XMLNS, Revision, XHTML_XMLNS, is_core_namespace,
    is_level3_package_namespace, revisions_for_namespace,
};
