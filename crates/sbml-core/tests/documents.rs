//! Integration tests over the fixtures in tests/fixtures/: reading,
//! deterministic writing, validation passes, package preservation and
//! conversion status.

use sbml_core::extension::OpaquePayload;
use sbml_core::node::Unit;
use sbml_core::{
    CheckCategories, ConversionError, ConversionProperties, Document, ElementKind, Node, Revision,
    Severity, code, read_sbml_from_file, read_sbml_from_str, write_node, write_sbml_to_string,
};
use std::path::PathBuf;

const COMP: &str = "http://www.sbml.org/sbml/level3/version1/comp/version1";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn fixture(name: &str) -> Document {
    let path = fixture_path(name);
    read_sbml_from_file(&path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

/// Kinds and ids of every node below the model, in document order.
fn outline(document: &Document) -> Vec<(ElementKind, Option<String>)> {
    document
        .model()
        .map(|m| m.get_all_elements(|_| true))
        .unwrap_or_default()
        .into_iter()
        .map(|n| (n.element_kind(), n.id().map(str::to_string)))
        .collect()
}

#[test]
fn enzyme_fixture_reads_cleanly() {
    let document = fixture("enzyme_l2v4.xml");
    assert!(document.error_log().is_empty(), "{}", document.error_log());
    assert_eq!(document.revision(), Revision::L2V4);
    assert!(document.location_uri().is_some_and(|u| u.ends_with("enzyme_l2v4.xml")));

    let model = document.model().expect("model");
    assert_eq!(model.name(), Some("Michaelis-Menten"));
    assert!(model.notes().is_some_and(|n| n.contains("Single enzymatic step.")));
    let law = document
        .get_all_elements(|n| n.element_kind() == ElementKind::KineticLaw)
        .into_iter()
        .next()
        .expect("kinetic law");
    assert_eq!(law.math().expect("math").formula(), "vm * s1 / (km + s1)");
    assert_eq!(law.line(), Some(38));
}

#[test]
fn writing_is_deterministic_and_reads_back() {
    let document = fixture("enzyme_l2v4.xml");
    let once = write_sbml_to_string(&document);
    assert_eq!(write_sbml_to_string(&document), once);
    assert!(once.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
    assert!(once.contains("<tag xmlns=\"urn:example:tags\">slow</tag>"));

    let reread = read_sbml_from_str(&once);
    assert!(reread.error_log().is_empty(), "{}", reread.error_log());
    assert_eq!(outline(&reread), outline(&document));
    assert_eq!(write_sbml_to_string(&reread), once);
}

#[test]
fn every_revision_round_trips() {
    for revision in Revision::ALL {
        let mut document = fixture("enzyme_l2v4.xml");
        document
            .set_level_and_version(revision.level(), revision.version(), false, false)
            .unwrap_or_else(|e| panic!("conversion to {revision}: {e}"));
        let written = write_sbml_to_string(&document);
        let reread = read_sbml_from_str(&written);
        assert_eq!(reread.revision(), revision);
        assert_eq!(write_sbml_to_string(&reread), written, "revision {revision}");
    }
}

#[test]
fn default_values_are_suppressed_and_others_rendered() {
    let mut species = Node::species("s", "cell");
    let data = species.as_species_mut().expect("species");
    data.boundary_condition = Some(false);
    data.has_only_substance_units = Some(false);
    assert_eq!(
        write_node(&species, Revision::L2V4),
        "<species id=\"s\" compartment=\"cell\"/>\n"
    );

    species.as_species_mut().expect("species").boundary_condition = Some(true);
    assert_eq!(
        write_node(&species, Revision::L2V4),
        "<species id=\"s\" compartment=\"cell\" boundaryCondition=\"true\"/>\n"
    );

    let mut compartment = Node::compartment("cell");
    compartment.as_compartment_mut().expect("compartment").spatial_dimensions = Some(3.0);
    assert!(!write_node(&compartment, Revision::L2V4).contains("spatialDimensions"));
    compartment.as_compartment_mut().expect("compartment").spatial_dimensions = Some(2.0);
    assert!(write_node(&compartment, Revision::L2V4).contains("spatialDimensions=\"2\""));
}

#[test]
fn mmls_in_the_default_revision() {
    let mut mmls = Node::unit_definition("mmls");
    mmls.add_child(Node::unit(Unit::with("mole", 1.0, -3))).expect("unit");
    mmls.add_child(Node::unit(Unit::with("litre", -1.0, 0))).expect("unit");
    mmls.add_child(Node::unit(Unit::with("second", -1.0, 0))).expect("unit");
    insta::assert_snapshot!(write_node(&mmls, Revision::DEFAULT), @r#"
    <unitDefinition id="mmls">
      <listOfUnits>
        <unit kind="mole" exponent="1" scale="-3"/>
        <unit kind="litre" exponent="-1" scale="0"/>
        <unit kind="second" exponent="-1" scale="0"/>
      </listOfUnits>
    </unitDefinition>
    "#);
}

#[test]
fn reaction_in_the_default_revision() {
    let mut reaction = Node::reaction("r");
    reaction.add_child(Node::reactant("x0")).expect("reactant");
    reaction.add_child(Node::product("s1")).expect("product");
    reaction
        .add_child(Node::kinetic_law("(vm * s1)/(km + s1)").expect("formula"))
        .expect("kinetic law");

    let markup = write_node(&reaction, Revision::DEFAULT);
    assert_eq!(markup.matches("<listOfReactants>").count(), 1);
    assert_eq!(markup.matches("<listOfProducts>").count(), 1);
    assert!(!markup.contains("listOfModifiers"));
    assert!(markup.contains("<speciesReference species=\"x0\"/>"));
    assert!(markup.contains("<speciesReference species=\"s1\"/>"));
    assert_eq!(markup.matches("<kineticLaw>").count(), 1);
    assert!(!markup.contains("timeUnits"));
    assert!(!markup.contains("substanceUnits"));
    assert!(markup.contains("<divide/>"));
}

#[test]
fn duplicate_identifiers_report_the_same_count_each_run() {
    let mut document = fixture("duplicate_ids_l3v2.xml");
    document.set_consistency_checks(CheckCategories::ALL, false);
    document.set_consistency_checks(CheckCategories::IDENTIFIER, true);

    let first = document.check_consistency();
    assert!(first >= 2);
    let duplicate = document
        .error_log()
        .iter()
        .find(|r| r.code == code::DUPLICATE_COMPONENT_ID)
        .expect("duplicate id record");
    assert!(duplicate.message.contains(
        "The Parameter id 'k' conflicts with the previously defined Species id 'k' at line 8."
    ));
    assert_eq!(duplicate.severity, Severity::Error);
    assert!(document.error_log().contains(code::DUPLICATE_META_ID));

    document.error_log_mut().clear();
    assert_eq!(document.check_consistency(), first);
    assert_eq!(document.error_log().len(), first);
}

#[test]
fn unknown_packages_are_preserved_and_flagged() {
    let mut document = fixture("unknown_packages_l3v1.xml");
    let required = document
        .error_log()
        .iter()
        .find(|r| r.code == code::REQUIRED_PACKAGE_PRESENT)
        .expect("required package record");
    assert!(required.is_error());
    let optional = document
        .error_log()
        .iter()
        .find(|r| r.code == code::UNREQUIRED_PACKAGE_PRESENT)
        .expect("optional package record");
    assert!(!optional.is_error());

    assert!(document.is_ignored_package("comp"));
    assert!(document.package_required("comp"));
    assert!(!document.package_required("render"));

    let markup = write_sbml_to_string(&document);
    assert!(markup.contains("comp:required=\"true\""));
    assert!(markup.contains("<comp:submodel comp:id=\"inner\" comp:modelRef=\"core\"/>"));
    assert!(markup.contains("render:style=\"plain\""));

    let payload = |document: &Document| {
        document
            .model()
            .and_then(|m| m.plugin_data::<OpaquePayload>(COMP))
            .cloned()
    };
    let before = payload(&document).expect("comp content on the model");
    assert_eq!(before.elements.len(), 1);

    document.enable_package("comp", "comp", false).expect("disable");
    assert!(payload(&document).is_none());
    assert!(!write_sbml_to_string(&document).contains("comp:"));
    assert!(document.package_required("comp"));

    document.enable_package(COMP, "comp", true).expect("enable");
    assert_eq!(payload(&document), Some(before));
    let restored = write_sbml_to_string(&document);
    assert!(restored.contains("comp:required=\"true\""));
    assert!(restored.contains("<comp:submodel comp:id=\"inner\" comp:modelRef=\"core\"/>"));
}

/// An assignment rule for `y` whose math is `body`.
fn rule_document(level: u32, version: u32, body: &str) -> String {
    let namespace = match (level, version) {
        (2, 4) => "http://www.sbml.org/sbml/level2/version4",
        _ => "http://www.sbml.org/sbml/level3/version2/core",
    };
    format!(
        "<sbml xmlns=\"{namespace}\" level=\"{level}\" version=\"{version}\">\n\
         <model id=\"m\"><listOfRules><assignmentRule variable=\"y\">\n\
         <math xmlns=\"http://www.w3.org/1998/Math/MathML\">{body}</math>\n\
         </assignmentRule></listOfRules></model></sbml>"
    )
}

#[test]
fn every_mathml_construct_survives_reading_and_writing() {
    let delay = "<apply><csymbol encoding=\"text\" \
                 definitionURL=\"http://www.sbml.org/sbml/symbols/delay\">delay</csymbol>\
                 <ci>x</ci><cn>2</cn></apply>";
    let rate_of = "<apply><csymbol encoding=\"text\" \
                   definitionURL=\"http://www.sbml.org/sbml/symbols/rateOf\">rateOf</csymbol>\
                   <ci>x</ci></apply>";
    let avogadro = "<apply><times/><ci>x</ci><csymbol encoding=\"text\" \
                    definitionURL=\"http://www.sbml.org/sbml/symbols/avogadro\">avogadro</csymbol>\
                    </apply>";
    let cases = [
        (2, 4, "piecewise", "<piecewise><piece><cn>1</cn><apply><gt/><ci>x</ci><cn>0</cn></apply>\
                             </piece><otherwise><cn>0</cn></otherwise></piecewise>"),
        (2, 4, "arcsin", "<apply><arcsin/><ci>x</ci></apply>"),
        (2, 4, "sinh", "<apply><sinh/><ci>x</ci></apply>"),
        (2, 4, "xor", "<apply><xor/><true/><false/></apply>"),
        (2, 4, "delay", delay),
        (2, 4, "rational", "<cn type=\"rational\"> 1 <sep/> 2 </cn>"),
        (3, 2, "avogadro", avogadro),
        (3, 2, "rateOf", rate_of),
    ];
    for (level, version, name, body) in cases {
        let document = read_sbml_from_str(&rule_document(level, version, body));
        assert!(document.error_log().is_empty(), "{name}: {}", document.error_log());
        let rule = document
            .get_all_elements(|n| n.element_kind() == ElementKind::AssignmentRule)
            .into_iter()
            .next()
            .expect("rule");
        assert!(rule.math().is_some(), "{name}: math dropped");

        let written = write_sbml_to_string(&document);
        let reread = read_sbml_from_str(&written);
        assert!(reread.error_log().is_empty(), "{name}: {}", reread.error_log());
        assert_eq!(write_sbml_to_string(&reread), written, "{name}");
    }
}

#[test]
fn unmatched_conversion_reports_no_converter() {
    let mut document = fixture("enzyme_l2v4.xml");
    let before = write_sbml_to_string(&document);

    let mut properties = ConversionProperties::new();
    properties.add_option("flattenHierarchy", true, "not provided by this engine");
    assert_eq!(document.convert(&properties), Err(ConversionError::NotAvailable));

    let mut untargeted = ConversionProperties::new();
    untargeted.add_option("setLevelAndVersion", true, "no target given");
    assert_eq!(document.convert(&untargeted), Err(ConversionError::NotAvailable));

    assert!(matches!(
        document.set_level_and_version(4, 1, true, false),
        Err(ConversionError::InvalidProperties(_))
    ));
    assert_eq!(document.revision(), Revision::L2V4);
    assert_eq!(write_sbml_to_string(&document), before);
}

#[test]
fn level3_and_back_keeps_the_markup() {
    let mut document = fixture("enzyme_l2v4.xml");
    let before = write_sbml_to_string(&document);

    document.set_level_and_version(3, 1, true, false).expect("to L3V1");
    let l3 = write_sbml_to_string(&document);
    assert!(l3.contains("level=\"3\" version=\"1\""));
    assert!(l3.contains("hasOnlySubstanceUnits=\"false\""));

    document.set_level_and_version(2, 4, false, false).expect("back to L2V4");
    assert_eq!(write_sbml_to_string(&document), before);
}
