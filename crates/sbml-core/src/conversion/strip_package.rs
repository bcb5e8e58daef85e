use super::{ConversionError, ConversionProperties, Converter};
use crate::document::Document;

pub(crate) const OPTION: &str = "stripPackage";

/// Removes a package from the document: its plugins, namespace and
/// declaration.
///
/// The `package` text option names the package by name, prefix or URI.
/// With `stripAllUnrecognized` set instead, every package without a
/// registered implementation is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripPackage;

impl Converter for StripPackage {
    fn name(&self) -> &str {
        OPTION
    }

    fn matches(&self, properties: &ConversionProperties) -> bool {
        properties.bool_option(OPTION)
    }

    fn convert(&self, document: &mut Document, properties: &ConversionProperties) -> Result<(), ConversionError> {
        let uris: Vec<String> = match properties.text_option("package") {
            Some(key) => document
                .packages()
                .iter()
                .filter(|p| p.name == key || p.prefix == key || p.uri == key)
                .map(|p| p.uri.clone())
                .collect(),
            None if properties.bool_option("stripAllUnrecognized") => document
                .unknown_packages()
                .into_iter()
                .map(|p| p.uri.clone())
                .collect(),
            None => {
                return Err(ConversionError::InvalidProperties(
                    "stripPackage needs a 'package' option".to_string(),
                ));
            }
        };
        if uris.is_empty() {
            return Ok(());
        }
        let mut copy = document.clone();
        for uri in &uris {
            copy.remove_package(uri);
        }
        tracing::debug!(packages = ?uris, "packages stripped");
        *document = copy;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_sbml_from_str;
    use crate::writer::write_sbml_to_string;

    const WITH_PACKAGE: &str = "<sbml xmlns=\"http://www.sbml.org/sbml/level3/version1/core\" \
        xmlns:qual=\"http://www.sbml.org/sbml/level3/version1/qual/version1\" \
        level=\"3\" version=\"1\" qual:required=\"false\">\
        <model id=\"m\"><qual:listOfQualitativeSpecies/></model></sbml>";

    #[test]
    fn named_package_is_removed_everywhere() {
        let mut document = read_sbml_from_str(WITH_PACKAGE);
        let mut properties = ConversionProperties::new();
        properties
            .add_option(OPTION, true, "")
            .add_option("package", "qual", "");
        document.convert(&properties).expect("strip");
        assert!(document.packages().is_empty());
        let markup = write_sbml_to_string(&document);
        assert!(!markup.contains("qual"));
    }

    #[test]
    fn unrecognized_packages_can_be_stripped_together() {
        let mut document = read_sbml_from_str(WITH_PACKAGE);
        let mut properties = ConversionProperties::new();
        properties
            .add_option(OPTION, true, "")
            .add_option("stripAllUnrecognized", true, "");
        document.convert(&properties).expect("strip");
        assert!(document.unknown_packages().is_empty());
        assert!(document.model().is_some_and(|m| m.plugins().is_empty()));
    }

    #[test]
    fn missing_package_option_is_rejected() {
        let mut document = read_sbml_from_str(WITH_PACKAGE);
        let mut properties = ConversionProperties::new();
        properties.add_option(OPTION, true, "");
        assert!(matches!(
            document.convert(&properties),
            Err(ConversionError::InvalidProperties(_))
        ));
        assert_eq!(document.packages().len(), 1);
    }
}
