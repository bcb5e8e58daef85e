//! A small arrays-like package defined here: parameters gain a list of
//! dimensions, each naming the parameter that holds its size.
//!
//! The package exercises the whole plugin contract: registration, plugin
//! creation while reading, package-owned nodes, writing, package
//! constraints and the enable/disable cascade.

use sbml_core::extension::{PackageReader, PackageWriter};
use sbml_core::node::ExtensionNode;
use sbml_core::validation::ConstraintContext;
use sbml_core::xml::XmlElement;
use sbml_core::{
    CheckCategories, Constraint, Document, ElementKind, ErrorRecord, Extension, ExtensionElement,
    ExtensionPoint, Node, NodeKind, PackageUri, PluginCreator, PluginData, Revision, Severity,
    XmlNamespaces, read_sbml_from_str, register_extension, write_node, write_sbml_to_string,
};
use std::any::Any;
use std::path::PathBuf;
use std::sync::{Arc, Once};

const ARRAYS_L3V1: &str = "http://www.sbml.org/sbml/level3/version1/arrays/version1";
const ARRAYS_L3V2: &str = "http://www.sbml.org/sbml/level3/version2/arrays/version1";
const DIMENSION_SIZE_UNDEFINED: u32 = 8_020_204;

#[derive(Debug, Clone, Default, PartialEq)]
struct Dimension {
    size: Option<String>,
    array_dimension: Option<u32>,
}

impl ExtensionElement for Dimension {
    fn package(&self) -> &str {
        "arrays"
    }

    fn element_name(&self) -> &str {
        "dimension"
    }

    fn read_attribute(&mut self, name: &str, value: &str) -> Result<bool, String> {
        match name {
            "size" => self.size = Some(value.to_string()),
            "arrayDimension" => {
                let index = value
                    .parse()
                    .map_err(|_| format!("'{value}' is not a non-negative integer"))?;
                self.array_dimension = Some(index);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn write_attributes(&self, out: &mut Vec<(String, String)>) {
        if let Some(size) = &self.size {
            out.push(("size".to_string(), size.clone()));
        }
        if let Some(index) = self.array_dimension {
            out.push(("arrayDimension".to_string(), index.to_string()));
        }
    }

    fn clone_box(&self) -> Box<dyn ExtensionElement> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Default)]
struct Dimensions {
    dimensions: Vec<Node>,
}

impl PluginData for Dimensions {
    fn read_attribute(&mut self, _name: &str, _value: &str) -> Result<bool, String> {
        Ok(false)
    }

    fn read_element(&mut self, element: &XmlElement, reader: &mut PackageReader<'_>) -> bool {
        if element.name != "listOfDimensions" {
            return false;
        }
        for child in element.child_elements() {
            if child.name == "dimension" {
                let node = reader.read_node(child, Box::new(Dimension::default()));
                self.dimensions.push(node);
            } else {
                reader.log_unrecognized(child);
            }
        }
        true
    }

    fn write_attributes(&self, _out: &mut Vec<(String, String)>) {}

    fn write_elements(&self, out: &mut PackageWriter<'_>) {
        if self.dimensions.is_empty() {
            return;
        }
        out.start_element("listOfDimensions");
        for dimension in &self.dimensions {
            out.write_node(dimension);
        }
        out.end_element();
    }

    fn elements(&self) -> Vec<&Node> {
        self.dimensions.iter().collect()
    }

    fn elements_mut(&mut self) -> Vec<&mut Node> {
        self.dimensions.iter_mut().collect()
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

struct DimensionsCreator;

impl PluginCreator for DimensionsCreator {
    fn extension_point(&self) -> ExtensionPoint {
        ExtensionPoint::new(ElementKind::Parameter)
    }

    fn create_plugin(&self, _: &str, _: &str, _: &XmlNamespaces) -> Box<dyn PluginData> {
        Box::new(Dimensions::default())
    }
}

/// Every dimension size names a parameter of the model.
struct DimensionSizeDefined;

impl Constraint for DimensionSizeDefined {
    fn code(&self) -> u32 {
        DIMENSION_SIZE_UNDEFINED
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::GENERAL
    }

    fn package(&self) -> &str {
        "arrays"
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        for node in model.get_all_elements(|n| dimension(n).is_some()) {
            let Some(size) = dimension(node).and_then(|d| d.size.as_deref()) else {
                continue;
            };
            let defined = model
                .children_of_kind(ElementKind::Parameter)
                .any(|p| p.id() == Some(size));
            if !defined {
                ctx.report(
                    ErrorRecord::for_package(
                        "arrays",
                        DIMENSION_SIZE_UNDEFINED,
                        Severity::Error,
                        format!(
                            "Dimension '{}' takes its size from '{size}', which is not a parameter.",
                            node.id().unwrap_or_default()
                        ),
                    )
                    .at(node.line(), node.column()),
                );
            }
        }
    }
}

struct Arrays;

impl Extension for Arrays {
    fn name(&self) -> &str {
        "arrays"
    }

    fn uri(&self) -> &str {
        ARRAYS_L3V1
    }

    fn uris(&self) -> Vec<PackageUri> {
        vec![
            PackageUri::new(ARRAYS_L3V1, 3, 1, 1),
            PackageUri::new(ARRAYS_L3V2, 3, 2, 1),
        ]
    }

    fn default_prefix(&self) -> &str {
        "arrays"
    }

    fn plugin_creators(&self) -> Vec<Arc<dyn PluginCreator>> {
        vec![Arc::new(DimensionsCreator)]
    }

    fn constraints(&self) -> Vec<Box<dyn Constraint>> {
        vec![Box::new(DimensionSizeDefined)]
    }
}

fn dimension(node: &Node) -> Option<&Dimension> {
    match node.kind() {
        NodeKind::Extension(element) => element.downcast_ref::<Dimension>(),
        _ => None,
    }
}

fn register_arrays() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| register_extension(Arrays).expect("arrays registers once"));
}

fn fixture() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/arrays_l3v1.xml");
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

fn dimension_count(document: &Document, parameter: &str) -> usize {
    document
        .get_element_by_sid(parameter)
        .and_then(|p| p.plugin_data::<Dimensions>("arrays"))
        .map_or(0, |d| d.dimensions.len())
}

#[test]
fn reading_attaches_dimensions_to_parameters() {
    register_arrays();
    let document = read_sbml_from_str(&fixture());
    assert!(document.error_log().is_empty(), "{}", document.error_log());
    assert!(document.is_package_enabled("arrays"));
    assert!(document.package_required("arrays"));
    assert_eq!(dimension_count(&document, "x"), 2);
    assert_eq!(dimension_count(&document, "n"), 0);

    let j = document.get_element_by_sid("j").expect("dimension j");
    assert_eq!(dimension(j).and_then(|d| d.array_dimension), Some(1));
    assert_eq!(j.namespace_uri(), Some(ARRAYS_L3V1));
}

#[test]
fn dimensions_are_written_back_in_the_package_namespace() {
    register_arrays();
    let document = read_sbml_from_str(&fixture());
    let markup = write_sbml_to_string(&document);
    assert!(markup.contains("arrays:required=\"true\""));
    assert!(markup.contains(
        "<arrays:dimension arrays:id=\"i\" arrays:size=\"n\" arrays:arrayDimension=\"0\"/>"
    ));
    assert_eq!(write_sbml_to_string(&read_sbml_from_str(&markup)), markup);

    let x = document.get_element_by_sid("x").expect("parameter x");
    insta::assert_snapshot!(write_node(x, Revision::L3V1), @r#"
    <parameter id="x" value="0" constant="false">
      <arrays:listOfDimensions>
        <arrays:dimension arrays:id="i" arrays:size="n" arrays:arrayDimension="0"/>
        <arrays:dimension arrays:id="j" arrays:size="m" arrays:arrayDimension="1"/>
      </arrays:listOfDimensions>
    </parameter>
    "#);
}

#[test]
fn package_constraints_run_with_the_consistency_check() {
    register_arrays();
    let mut document = read_sbml_from_str(&fixture());
    let first = document.check_consistency();
    let undefined: Vec<_> = document
        .error_log()
        .iter()
        .filter(|r| r.code == DIMENSION_SIZE_UNDEFINED)
        .collect();
    assert_eq!(undefined.len(), 1);
    assert_eq!(undefined[0].package, "arrays");
    assert!(undefined[0].message.contains("'m'"));
    assert!(undefined[0].line.is_some());

    document.error_log_mut().clear();
    assert_eq!(document.check_consistency(), first);

    document.error_log_mut().clear();
    document.set_consistency_checks(CheckCategories::GENERAL, false);
    document.check_consistency();
    assert!(!document.error_log().contains(DIMENSION_SIZE_UNDEFINED));
}

#[test]
fn disabling_and_enabling_restores_the_dimensions() {
    register_arrays();
    let mut document = read_sbml_from_str(&fixture());
    let before = write_sbml_to_string(&document);

    document.enable_package("arrays", "arrays", false).expect("disable");
    assert!(!document.is_package_enabled("arrays"));
    assert!(document.is_package_disabled("arrays"));
    assert_eq!(dimension_count(&document, "x"), 0);
    assert!(document.get_element_by_sid("i").is_none());
    assert!(!write_sbml_to_string(&document).contains("arrays"));

    document.enable_package("arrays", "arrays", true).expect("enable");
    assert_eq!(dimension_count(&document, "x"), 2);
    assert_eq!(write_sbml_to_string(&document), before);
}

#[test]
fn enabling_on_a_new_document_attaches_empty_plugins() {
    register_arrays();
    let mut document = Document::with_revision(Revision::L3V2);
    let model = document.create_model("grid");
    model.add_child(Node::parameter("n", Some(3.0))).expect("parameter");
    model.add_child(Node::parameter("v", None)).expect("parameter");
    document.enable_package("arrays", "arrays", true).expect("enable");
    assert!(document.namespaces().contains_uri(ARRAYS_L3V2));
    assert_eq!(Arrays.revision_of(ARRAYS_L3V2), Some(Revision::L3V2));
    assert_eq!(Arrays.uri_for(Revision::L3V1).as_deref(), Some(ARRAYS_L3V1));

    let model = document.model_mut().expect("model");
    let v = model
        .children_mut()
        .iter_mut()
        .find(|c| c.id() == Some("v"))
        .expect("parameter v");
    let mut node = Node::new(NodeKind::Extension(ExtensionNode::new(Dimension {
        size: Some("n".to_string()),
        array_dimension: Some(0),
    })));
    node.set_id("k");
    v.plugin_data_mut::<Dimensions>("arrays")
        .expect("plugin attached by enable")
        .dimensions
        .push(node);
    document.connect_to_child();

    assert!(document.get_element_by_sid("k").is_some());
    let markup = write_sbml_to_string(&document);
    assert!(markup.contains("xmlns:arrays=\"http://www.sbml.org/sbml/level3/version2/arrays/version1\""));
    assert!(markup.contains("<arrays:dimension arrays:id=\"k\" arrays:size=\"n\" arrays:arrayDimension=\"0\"/>"));
    document.check_consistency();
    assert!(!document.error_log().contains(DIMENSION_SIZE_UNDEFINED));
}
