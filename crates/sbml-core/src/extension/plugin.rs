use crate::error_log::ErrorRecord;
use crate::node::{ElementKind, Node, NodePath};
use crate::reader::PackageReader;
use crate::writer::PackageWriter;
use crate::xml::{XmlElement, XmlWriter, parse_fragment};
use sbml_schema::Revision;
use std::any::Any;
use std::fmt;

/// Package state attached to one node.
pub trait PluginData: fmt::Debug + Send + Sync {
    /// Offers one attribute from the package namespace; `Ok(false)` when
    /// not recognised, `Err` with a description when the value is invalid.
    fn read_attribute(&mut self, name: &str, value: &str) -> Result<bool, String>;

    /// Offers one child element from the package namespace; returns
    /// whether it was consumed.
    fn read_element(&mut self, _element: &XmlElement, _reader: &mut PackageReader<'_>) -> bool {
        false
    }

    /// Attributes as `(local name, value)` in output order.
    fn write_attributes(&self, out: &mut Vec<(String, String)>);

    fn write_elements(&self, _out: &mut PackageWriter<'_>) {}

    /// Package-owned nodes, in output order.
    fn elements(&self) -> Vec<&Node> {
        Vec::new()
    }

    fn elements_mut(&mut self) -> Vec<&mut Node> {
        Vec::new()
    }

    fn clone_box(&self) -> Box<dyn PluginData>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Non-owning reference from a plugin to its host node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRef {
    pub path: NodePath,
    pub kind: ElementKind,
}

/// Package data kept without interpretation, for namespaces that have no
/// registered implementation or whose package is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaquePayload {
    pub attributes: Vec<(String, String)>,
    pub elements: Vec<XmlElement>,
}

impl OpaquePayload {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.elements.is_empty()
    }
}

impl PluginData for OpaquePayload {
    fn read_attribute(&mut self, name: &str, value: &str) -> Result<bool, String> {
        self.attributes.push((name.to_string(), value.to_string()));
        Ok(true)
    }

    fn read_element(&mut self, element: &XmlElement, _reader: &mut PackageReader<'_>) -> bool {
        self.elements.push(element.clone());
        true
    }

    fn write_attributes(&self, out: &mut Vec<(String, String)>) {
        out.extend(self.attributes.iter().cloned());
    }

    fn write_elements(&self, out: &mut PackageWriter<'_>) {
        for element in &self.elements {
            out.write_xml(element);
        }
    }

    fn clone_box(&self) -> Box<dyn PluginData> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A plugin instance on a host node.
#[derive(Debug)]
pub struct Plugin {
    package: String,
    uri: String,
    prefix: String,
    host: Option<HostRef>,
    data: Box<dyn PluginData>,
}

impl Plugin {
    pub fn new(
        package: impl Into<String>,
        uri: impl Into<String>,
        prefix: impl Into<String>,
        data: Box<dyn PluginData>,
    ) -> Self {
        Self {
            package: package.into(),
            uri: uri.into(),
            prefix: prefix.into(),
            host: None,
            data,
        }
    }

    /// Plugin preserving content of a namespace nobody interprets. The
    /// prefix doubles as the package name.
    pub fn opaque(uri: impl Into<String>, prefix: impl Into<String>, payload: OpaquePayload) -> Self {
        let prefix = prefix.into();
        Self::new(prefix.clone(), uri, prefix, Box::new(payload))
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn host(&self) -> Option<&HostRef> {
        self.host.as_ref()
    }

    pub fn data(&self) -> &dyn PluginData {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> &mut dyn PluginData {
        self.data.as_mut()
    }

    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.data.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.data.as_any_mut().downcast_mut::<T>()
    }

    pub fn is_opaque(&self) -> bool {
        self.data.as_any().is::<OpaquePayload>()
    }

    /// Whether `key` is this plugin's package name or namespace.
    pub fn matches(&self, key: &str) -> bool {
        self.package == key || self.uri == key
    }

    pub fn elements(&self) -> Vec<&Node> {
        self.data.elements()
    }

    pub fn elements_mut(&mut self) -> Vec<&mut Node> {
        self.data.elements_mut()
    }

    pub(crate) fn set_host(&mut self, host: HostRef) {
        self.host = Some(host);
    }

    /// Serialized form of the plugin's content.
    pub fn snapshot(&self, revision: Revision) -> OpaquePayload {
        if let Some(payload) = self.downcast::<OpaquePayload>() {
            return payload.clone();
        }
        let mut attributes = Vec::new();
        self.data.write_attributes(&mut attributes);

        let mut writer = XmlWriter::new();
        {
            let mut out = PackageWriter::new(&mut writer, revision, &self.uri, &self.prefix);
            self.data.write_elements(&mut out);
        }
        let markup = writer.finish();
        let elements = if markup.trim().is_empty() {
            Vec::new()
        } else {
            match parse_fragment(&markup, &[(Some(self.prefix.clone()), self.uri.clone())]) {
                Ok(elements) => elements,
                Err(err) => {
                    tracing::warn!(
                        package = %self.package,
                        error = %err,
                        "plugin content could not be captured"
                    );
                    Vec::new()
                }
            }
        };
        OpaquePayload {
            attributes,
            elements,
        }
    }

    /// Feeds a serialized form back into the plugin; returns the records
    /// logged while reading it.
    pub fn restore(&mut self, payload: &OpaquePayload, revision: Revision) -> Vec<ErrorRecord> {
        let mut records = Vec::new();
        for (name, value) in &payload.attributes {
            if let Err(detail) = self.data.read_attribute(name, value) {
                records.push(
                    ErrorRecord::new(
                        sbml_schema::code::INVALID_ATTRIBUTE_VALUE,
                        revision,
                        format!("  {}:{name}: {detail}", self.prefix),
                    )
                    .with_package(self.package.clone()),
                );
            }
        }
        let mut reader = PackageReader::new(
            revision,
            &self.uri,
            &self.prefix,
            &self.package,
            &mut records,
        );
        for element in &payload.elements {
            if !self.data.read_element(element, &mut reader) {
                reader.log_unrecognized(element);
            }
        }
        records
    }
}

impl Clone for Plugin {
    fn clone(&self) -> Self {
        Self {
            package: self.package.clone(),
            uri: self.uri.clone(),
            prefix: self.prefix.clone(),
            host: self.host.clone(),
            data: self.data.clone_box(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_plugins_snapshot_their_payload() {
        let payload = OpaquePayload {
            attributes: vec![("color".to_string(), "red".to_string())],
            elements: parse_fragment(
                "<x:thing x:size=\"2\"/>",
                &[(Some("x".to_string()), "urn:x".to_string())],
            )
            .expect("fragment"),
        };
        let plugin = Plugin::opaque("urn:x", "x", payload.clone());
        assert!(plugin.is_opaque());
        assert_eq!(plugin.package(), "x");
        assert!(plugin.matches("urn:x"));
        assert_eq!(plugin.snapshot(Revision::L3V1), payload);
    }

    #[test]
    fn restoring_opaque_content_keeps_everything() {
        let payload = OpaquePayload {
            attributes: vec![("a".to_string(), "1".to_string())],
            elements: Vec::new(),
        };
        let mut plugin = Plugin::opaque("urn:x", "x", OpaquePayload::default());
        let records = plugin.restore(&payload, Revision::L3V1);
        assert!(records.is_empty());
        assert_eq!(plugin.downcast::<OpaquePayload>(), Some(&payload));
    }
}
