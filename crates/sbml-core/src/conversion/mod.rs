//! Converters selected by declarative properties.
//!
//! A [`ConversionProperties`] names a target revision and a set of options.
//! [`Document::convert`] asks the process-wide converter registry for the
//! first converter whose [`Converter::matches`] accepts the properties and
//! runs it. Converters succeed in place or return an error with the
//! document as it was; the built-in ones get this by converting a copy and
//! swapping it in on success. Converters supplied by packages must keep the
//! same promise.

mod expand_functions;
mod expand_initial_assignments;
mod level_version;
mod strip_package;

pub use expand_functions::ExpandFunctionDefinitions;
pub use expand_initial_assignments::ExpandInitialAssignments;
pub use level_version::LevelVersionConverter;
pub use strip_package::StripPackage;

use crate::document::Document;
use crate::error::RegistryError;
use sbml_schema::Revision;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Value of one conversion option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOption {
    pub value: OptionValue,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Target configuration of a conversion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<Revision>,
    #[serde(default)]
    options: BTreeMap<String, ConversionOption>,
}

impl ConversionProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(target: Revision) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<Revision> {
        self.target
    }

    pub fn set_target(&mut self, target: Revision) {
        self.target = Some(target);
    }

    /// Adds or replaces an option.
    pub fn add_option(
        &mut self,
        key: impl Into<String>,
        value: impl Into<OptionValue>,
        description: impl Into<String>,
    ) -> &mut Self {
        self.options.insert(
            key.into(),
            ConversionOption {
                value: value.into(),
                description: description.into(),
            },
        );
        self
    }

    pub fn remove_option(&mut self, key: &str) -> Option<ConversionOption> {
        self.options.remove(key)
    }

    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key).map(|o| &o.value)
    }

    /// Boolean option, `false` when absent or not a boolean.
    pub fn bool_option(&self, key: &str) -> bool {
        matches!(self.option(key), Some(OptionValue::Bool(true)))
    }

    pub fn bool_option_or(&self, key: &str, default: bool) -> bool {
        match self.option(key) {
            Some(OptionValue::Bool(value)) => *value,
            _ => default,
        }
    }

    pub fn text_option(&self, key: &str) -> Option<&str> {
        match self.option(key) {
            Some(OptionValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &ConversionOption)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Why a conversion did not happen. The document is unchanged in every
/// case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// No registered converter accepts the properties.
    #[error("no converter is available for the requested conversion")]
    NotAvailable,

    /// The properties lack something the converter needs.
    #[error("invalid conversion properties: {0}")]
    InvalidProperties(String),

    /// The document has errors that make conversion unsafe; they were
    /// logged in its error log.
    #[error("the document has {errors} error(s) that prevent conversion to {target}")]
    Incompatible { target: Revision, errors: usize },

    /// Packages are present and the target cannot carry them.
    #[error("packages {packages:?} cannot be carried into {target}")]
    PackagesPresent {
        target: Revision,
        packages: Vec<String>,
    },

    #[error("conversion failed: {0}")]
    Failed(String),
}

/// One conversion capability.
pub trait Converter: Send + Sync {
    /// Registry key.
    fn name(&self) -> &str;

    /// Whether this converter handles `properties`.
    fn matches(&self, properties: &ConversionProperties) -> bool;

    /// Converts `document` in place. On error the document must be left
    /// exactly as it was; records explaining the failure may be logged.
    fn convert(
        &self,
        document: &mut Document,
        properties: &ConversionProperties,
    ) -> Result<(), ConversionError>;
}

/// Ordered converter set; lookup returns the first match.
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Registry holding the built-in converters.
    pub fn with_builtins() -> Self {
        Self {
            converters: vec![
                Arc::new(LevelVersionConverter),
                Arc::new(ExpandFunctionDefinitions),
                Arc::new(ExpandInitialAssignments),
                Arc::new(StripPackage),
            ],
        }
    }

    pub fn register(&mut self, converter: Arc<dyn Converter>) -> Result<(), RegistryError> {
        if self.converters.iter().any(|c| c.name() == converter.name()) {
            return Err(RegistryError::DuplicateConverter {
                name: converter.name().to_string(),
            });
        }
        self.converters.push(converter);
        Ok(())
    }

    pub fn converter_for(&self, properties: &ConversionProperties) -> Option<Arc<dyn Converter>> {
        self.converters
            .iter()
            .find(|c| c.matches(properties))
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.converters.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn global() -> &'static RwLock<ConverterRegistry> {
    static REGISTRY: OnceLock<RwLock<ConverterRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(ConverterRegistry::with_builtins()))
}

/// Registers a converter process-wide, after the built-in ones.
pub fn register_converter(converter: impl Converter + 'static) -> Result<(), RegistryError> {
    let result = global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(Arc::new(converter));
    if let Err(err) = &result {
        tracing::warn!(error = %err, "converter registration rejected");
    }
    result
}

pub fn converter_for(properties: &ConversionProperties) -> Option<Arc<dyn Converter>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .converter_for(properties)
}

pub fn registered_converters() -> Vec<String> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .names()
}

impl Document {
    /// Runs the registered converter matching `properties`.
    pub fn convert(&mut self, properties: &ConversionProperties) -> Result<(), ConversionError> {
        let Some(converter) = converter_for(properties) else {
            tracing::debug!(?properties, "no converter matches");
            return Err(ConversionError::NotAvailable);
        };
        tracing::debug!(converter = converter.name(), "conversion started");
        let result = converter.convert(self, properties);
        match &result {
            Ok(()) => tracing::debug!(converter = converter.name(), "conversion finished"),
            Err(err) => tracing::debug!(converter = converter.name(), error = %err, "conversion refused"),
        }
        result
    }

    /// Converts to `level`/`version`. `strict` refuses conversions that
    /// would lose information or validity; `ignore_packages` drops package
    /// content the target cannot carry instead of refusing.
    pub fn set_level_and_version(
        &mut self,
        level: u32,
        version: u32,
        strict: bool,
        ignore_packages: bool,
    ) -> Result<(), ConversionError> {
        let target = Revision::new(level, version).ok_or_else(|| {
            ConversionError::InvalidProperties(format!("level {level} version {version} is not defined"))
        })?;
        let mut properties = ConversionProperties::with_target(target);
        properties
            .add_option(level_version::OPTION, true, "convert the document to the given level and version")
            .add_option("strict", strict, "should validity be preserved")
            .add_option("ignorePackages", ignore_packages, "drop package content the target cannot carry");
        self.convert(&properties)
    }

    /// Replaces every call of a function definition by its body and removes
    /// the definitions.
    pub fn expand_function_definitions(&mut self) -> Result<(), ConversionError> {
        let mut properties = ConversionProperties::with_target(self.revision());
        properties.add_option(expand_functions::OPTION, true, "expand function definitions");
        self.convert(&properties)
    }

    /// Folds initial assignments into the initial values they set and
    /// removes them.
    pub fn expand_initial_assignments(&mut self) -> Result<(), ConversionError> {
        let mut properties = ConversionProperties::with_target(self.revision());
        properties.add_option(expand_initial_assignments::OPTION, true, "expand initial assignments");
        self.convert(&properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn options_read_back_with_defaults() {
        let mut properties = ConversionProperties::with_target(Revision::L2V4);
        properties
            .add_option("strict", false, "")
            .add_option("package", "layout", "");
        assert!(!properties.bool_option("strict"));
        assert!(properties.bool_option_or("missing", true));
        assert_eq!(properties.text_option("package"), Some("layout"));
        assert_eq!(properties.target(), Some(Revision::L2V4));
    }

    #[test]
    fn unmatched_properties_leave_the_document_alone() {
        let mut document = Document::with_revision(Revision::L2V4);
        document.create_model("m").add_child(Node::compartment("c")).expect("compartment");
        let before = crate::writer::write_sbml_to_string(&document);
        let mut properties = ConversionProperties::with_target(Revision::L1V2);
        properties.add_option("noSuchConversion", true, "");
        assert_eq!(document.convert(&properties), Err(ConversionError::NotAvailable));
        assert_eq!(document.revision(), Revision::L2V4);
        assert_eq!(crate::writer::write_sbml_to_string(&document), before);
    }

    struct Rename;

    impl Converter for Rename {
        fn name(&self) -> &str {
            "renameModel"
        }

        fn matches(&self, properties: &ConversionProperties) -> bool {
            properties.has_option("renameModel")
        }

        fn convert(&self, document: &mut Document, properties: &ConversionProperties) -> Result<(), ConversionError> {
            let name = properties
                .text_option("renameModel")
                .ok_or_else(|| ConversionError::InvalidProperties("renameModel needs a name".into()))?;
            let model = document
                .model_mut()
                .ok_or_else(|| ConversionError::Failed("no model".into()))?;
            model.set_name(name);
            Ok(())
        }
    }

    #[test]
    fn registered_converters_are_found_by_properties() {
        let mut registry = ConverterRegistry::with_builtins();
        registry.register(Arc::new(Rename)).expect("register");
        assert!(matches!(
            registry.register(Arc::new(Rename)),
            Err(RegistryError::DuplicateConverter { .. })
        ));
        let mut properties = ConversionProperties::new();
        properties.add_option("renameModel", "Branch", "");
        let converter = registry.converter_for(&properties).expect("match");
        assert_eq!(converter.name(), "renameModel");

        let mut document = Document::new();
        document.create_model("m");
        converter.convert(&mut document, &properties).expect("convert");
        assert_eq!(document.model().and_then(Node::name), Some("Branch"));
    }
}
