//! Document to markup.
//!
//! Output is a pure function of the tree and the target revision: element
//! and attribute names are chosen per revision, Level 1 and Level 2
//! defaults are left out, and list wrappers appear only around non-empty
//! lists.

use crate::document::Document;
use crate::error::SbmlError;
use crate::extension::Plugin;
use crate::namespaces::XmlNamespaces;
use crate::node::{ElementKind, Level1RuleTarget, Node, NodeKind, Rule};
use crate::vocabulary::{ChildSlot, element_name, level1_rule_variable_attribute};
use crate::math::write_math;
use crate::xml::{XmlElement, XmlWriter, format_real, qualify};
use sbml_schema::{ADDED_PREFIX, Revision, is_core_namespace, is_level3_package_namespace};
use std::path::Path;

/// Renders a document, starting with the XML declaration.
pub fn write_sbml_to_string(document: &Document) -> String {
    let mut out = XmlWriter::with_declaration();
    let writer = TreeWriter::for_document(document);
    writer.write_root(document, &mut out);
    let markup = out.finish();
    tracing::debug!(revision = %document.revision(), bytes = markup.len(), "document written");
    markup
}

pub fn write_sbml_to_file(document: &Document, path: impl AsRef<Path>) -> Result<(), SbmlError> {
    let path = path.as_ref();
    std::fs::write(path, write_sbml_to_string(document)).map_err(|source| SbmlError::WriteFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders one node and its subtree under the rules of `revision`, without
/// an XML declaration.
pub fn write_node(node: &Node, revision: Revision) -> String {
    let mut out = XmlWriter::new();
    let writer = TreeWriter {
        revision,
        model: None,
        default_namespaces: Vec::new(),
    };
    match node.kind() {
        NodeKind::Document => writer.write_element(node, None, &mut out),
        NodeKind::Extension(_) => {
            let uri = node.namespace_uri().unwrap_or_default();
            PackageWriter::new(&mut out, revision, uri, "").write_node(node);
        }
        _ => writer.write_element(node, node.parent_kind(), &mut out),
    }
    out.finish()
}

/// Namespace declarations written on `<sbml>`.
///
/// The core namespace of the document's revision is always present, on the
/// default prefix unless the document bound it elsewhere; a different URI
/// holding the default prefix moves to [`ADDED_PREFIX`]. Core namespaces of
/// other revisions are dropped, as are package namespaces the document does
/// not declare or that the package replaces with another URI in this
/// revision.
pub fn root_namespaces(document: &Document) -> XmlNamespaces {
    let revision = document.revision();
    let core = revision.namespace_uri();
    let declared = |uri: &str| document.packages().iter().any(|p| p.uri == uri);

    let mut kept = XmlNamespaces::new();
    for decl in document.namespaces().iter() {
        let uri = decl.uri.as_str();
        if is_core_namespace(uri) && uri != core {
            continue;
        }
        let package = crate::extension::extension_by_uri(uri);
        let is_package = package.is_some() || is_level3_package_namespace(uri);
        if is_package {
            if revision.level() < 3 || !declared(uri) {
                continue;
            }
            if let Some(extension) = package {
                if extension.uri_for(revision).is_some_and(|u| u != uri) {
                    continue;
                }
            }
        }
        kept.add(uri, &decl.prefix);
    }

    if kept.contains_uri(core) {
        return kept;
    }
    let mut namespaces = XmlNamespaces::with_default(core);
    for decl in kept.iter() {
        let prefix = if decl.prefix.is_empty() {
            ADDED_PREFIX
        } else {
            decl.prefix.as_str()
        };
        namespaces.add(&decl.uri, prefix);
    }
    namespaces
}

struct TreeWriter<'d> {
    revision: Revision,
    /// Model used to resolve Level 1 rule targets.
    model: Option<&'d Node>,
    /// Packages written with their URI as the default namespace.
    default_namespaces: Vec<&'d str>,
}

impl<'d> TreeWriter<'d> {
    fn for_document(document: &'d Document) -> Self {
        Self {
            revision: document.revision(),
            model: document.model(),
            default_namespaces: document
                .packages()
                .iter()
                .filter(|p| p.default_namespace)
                .map(|p| p.uri.as_str())
                .collect(),
        }
    }

    fn level(&self) -> u32 {
        self.revision.level()
    }

    /// Whether an attribute holding `value` is written when `default` is
    /// its revision default. Level 3 defines no defaults.
    fn differs<T: PartialEq>(&self, value: T, default: T) -> bool {
        self.level() >= 3 || value != default
    }

    fn write_root(&self, document: &Document, out: &mut XmlWriter) {
        let root = document.root();
        out.start_element("sbml");
        for decl in root_namespaces(document).iter() {
            let key = if decl.prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", decl.prefix)
            };
            out.attribute(&key, &decl.uri);
        }
        out.attribute("level", &self.revision.level().to_string());
        out.attribute("version", &self.revision.version().to_string());
        if self.level() >= 3 {
            for package in document.packages() {
                out.attribute(
                    &format!("{}:required", package.prefix),
                    if package.required { "true" } else { "false" },
                );
            }
        }
        self.write_common_attributes(root, out);
        self.write_plugin_attributes(root, out);
        self.write_content(root, out);
        out.end_element();
    }

    fn write_element(&self, node: &Node, parent: Option<ElementKind>, out: &mut XmlWriter) {
        if let NodeKind::Extension(_) = node.kind() {
            return;
        }
        let l1_target = node.as_rule().map(|rule| self.level1_target(rule));
        out.start_element(element_name(node.element_kind(), parent, l1_target, self.revision));
        self.write_common_attributes(node, out);
        self.write_kind_attributes(node, l1_target, out);
        self.write_plugin_attributes(node, out);
        self.write_content(node, out);
        out.end_element();
    }

    fn level1_target(&self, rule: &Rule) -> Level1RuleTarget {
        rule.level1_target
            .or_else(|| {
                let variable = rule.variable.as_deref()?;
                let target = self.model?.get_element_by_sid(variable)?;
                match target.element_kind() {
                    ElementKind::Species => Some(Level1RuleTarget::Species),
                    ElementKind::Compartment => Some(Level1RuleTarget::Compartment),
                    _ => None,
                }
            })
            .unwrap_or(Level1RuleTarget::Parameter)
    }

    fn write_common_attributes(&self, node: &Node, out: &mut XmlWriter) {
        if self.level() == 1 {
            if node.as_rule().is_none() {
                if let Some(id) = node.id() {
                    out.attribute("name", id);
                }
            }
            return;
        }
        if let Some(meta_id) = node.meta_id() {
            out.attribute("metaid", meta_id);
        }
        if let Some(term) = node.sbo_term().filter(|_| self.revision >= Revision::L2V2) {
            out.attribute("sboTerm", &format!("SBO:{term:07}"));
        }
        if let Some(id) = node.id() {
            out.attribute("id", id);
        }
        if let Some(name) = node.name() {
            out.attribute("name", name);
        }
    }

    fn write_kind_attributes(
        &self,
        node: &Node,
        l1_target: Option<Level1RuleTarget>,
        out: &mut XmlWriter,
    ) {
        let l1 = self.level() == 1;
        let l3 = self.level() >= 3;
        let text = |out: &mut XmlWriter, name: &str, value: &Option<String>| {
            if let Some(value) = value {
                out.attribute(name, value);
            }
        };
        let real = |out: &mut XmlWriter, name: &str, value: f64| {
            out.attribute(name, &format_real(value));
        };
        let boolean = |out: &mut XmlWriter, name: &str, value: bool| {
            out.attribute(name, if value { "true" } else { "false" });
        };

        match node.kind() {
            NodeKind::Model(m) if l3 => {
                text(out, "substanceUnits", &m.substance_units);
                text(out, "timeUnits", &m.time_units);
                text(out, "volumeUnits", &m.volume_units);
                text(out, "areaUnits", &m.area_units);
                text(out, "lengthUnits", &m.length_units);
                text(out, "extentUnits", &m.extent_units);
                text(out, "conversionFactor", &m.conversion_factor);
            }
            NodeKind::Unit(u) => {
                out.attribute("kind", &u.kind);
                if let Some(exponent) = u.exponent.filter(|e| self.differs(*e, 1.0)) {
                    real(out, "exponent", exponent);
                }
                if let Some(scale) = u.scale.filter(|s| self.differs(*s, 0)) {
                    out.attribute("scale", &scale.to_string());
                }
                if let Some(multiplier) = u.multiplier.filter(|m| !l1 && self.differs(*m, 1.0)) {
                    real(out, "multiplier", multiplier);
                }
                let has_offset = self.revision == Revision::L2V1;
                if let Some(offset) = u.offset.filter(|o| has_offset && *o != 0.0) {
                    real(out, "offset", offset);
                }
            }
            NodeKind::Compartment(c) if l1 => {
                if let Some(size) = c.size.filter(|s| *s != 1.0) {
                    real(out, "volume", size);
                }
                text(out, "units", &c.units);
                text(out, "outside", &c.outside);
            }
            NodeKind::Compartment(c) => {
                if let Some(dims) = c.spatial_dimensions.filter(|d| self.differs(*d, 3.0)) {
                    real(out, "spatialDimensions", dims);
                }
                if let Some(size) = c.size {
                    real(out, "size", size);
                }
                text(out, "units", &c.units);
                if !l3 {
                    text(out, "outside", &c.outside);
                }
                if let Some(constant) = c.constant.filter(|c| self.differs(*c, true)) {
                    boolean(out, "constant", constant);
                }
            }
            NodeKind::Species(s) => {
                if (Revision::L2V2..=Revision::L2V5).contains(&self.revision) {
                    text(out, "speciesType", &s.species_type);
                }
                text(out, "compartment", &s.compartment);
                if let Some(amount) = s.initial_amount {
                    real(out, "initialAmount", amount);
                }
                if let Some(concentration) = s.initial_concentration.filter(|_| !l1) {
                    real(out, "initialConcentration", concentration);
                }
                text(out, if l1 { "units" } else { "substanceUnits" }, &s.substance_units);
                if let Some(only) = s.has_only_substance_units.filter(|v| !l1 && self.differs(*v, false)) {
                    boolean(out, "hasOnlySubstanceUnits", only);
                }
                if let Some(boundary) = s.boundary_condition.filter(|v| self.differs(*v, false)) {
                    boolean(out, "boundaryCondition", boundary);
                }
                if let Some(charge) = s.charge.filter(|_| !l3) {
                    out.attribute("charge", &charge.to_string());
                }
                if let Some(constant) = s.constant.filter(|v| !l1 && self.differs(*v, false)) {
                    boolean(out, "constant", constant);
                }
                if l3 {
                    text(out, "conversionFactor", &s.conversion_factor);
                }
            }
            NodeKind::Parameter(p) => {
                if let Some(value) = p.value {
                    real(out, "value", value);
                }
                text(out, "units", &p.units);
                let local = node.parent_kind() == Some(ElementKind::KineticLaw);
                if let Some(constant) = p.constant.filter(|v| !l1 && !(l3 && local) && self.differs(*v, true)) {
                    boolean(out, "constant", constant);
                }
            }
            NodeKind::InitialAssignment(a) => text(out, "symbol", &a.symbol),
            NodeKind::AlgebraicRule(r) if l1 => {
                if let Some(math) = &r.math {
                    out.attribute("formula", &math.formula());
                }
            }
            NodeKind::AssignmentRule(r) | NodeKind::RateRule(r) if l1 => {
                if let Some(math) = &r.math {
                    out.attribute("formula", &math.formula());
                }
                if node.element_kind() == ElementKind::RateRule {
                    out.attribute("type", "rate");
                }
                let target = l1_target.unwrap_or(Level1RuleTarget::Parameter);
                text(out, level1_rule_variable_attribute(target, self.revision), &r.variable);
                if target == Level1RuleTarget::Parameter {
                    text(out, "units", &r.level1_units);
                }
            }
            NodeKind::AssignmentRule(r) | NodeKind::RateRule(r) => text(out, "variable", &r.variable),
            NodeKind::Reaction(r) => {
                if let Some(reversible) = r.reversible.filter(|v| self.differs(*v, true)) {
                    boolean(out, "reversible", reversible);
                }
                if let Some(fast) = r.fast.filter(|v| self.differs(*v, false)) {
                    boolean(out, "fast", fast);
                }
                if l3 {
                    text(out, "compartment", &r.compartment);
                }
            }
            NodeKind::SpeciesReference(r) => {
                let species = if self.revision == Revision::L1V1 { "specie" } else { "species" };
                text(out, species, &r.species);
                if let Some(stoichiometry) = r.stoichiometry.filter(|v| self.differs(*v, 1.0)) {
                    real(out, "stoichiometry", stoichiometry);
                }
                if let Some(denominator) = r.denominator.filter(|v| l1 && *v != 1) {
                    out.attribute("denominator", &denominator.to_string());
                }
                if let Some(constant) = r.constant.filter(|_| l3) {
                    boolean(out, "constant", constant);
                }
            }
            NodeKind::ModifierSpeciesReference(m) => text(out, "species", &m.species),
            NodeKind::KineticLaw(k) => {
                if l1 {
                    if let Some(math) = &k.math {
                        out.attribute("formula", &math.formula());
                    }
                }
                if !l3 {
                    text(out, "timeUnits", &k.time_units);
                    text(out, "substanceUnits", &k.substance_units);
                }
            }
            _ => {}
        }
    }

    fn write_plugin_attributes(&self, node: &Node, out: &mut XmlWriter) {
        if self.level() < 3 {
            return;
        }
        for plugin in node.plugins() {
            let mut attributes = Vec::new();
            plugin.data().write_attributes(&mut attributes);
            for (name, value) in attributes {
                out.attribute(&qualify(Some(plugin.prefix()), &name), &value);
            }
        }
    }

    fn write_content(&self, node: &Node, out: &mut XmlWriter) {
        if let Some(notes) = node.notes() {
            out.raw_block(notes);
        }
        if let Some(annotation) = node.annotation() {
            out.raw_block(annotation);
        }
        if self.level() >= 2 {
            if let Some(math) = node.math() {
                write_math(math.ast(), out);
            }
        }

        let kind = node.element_kind();
        for slot in ChildSlot::for_parent(kind) {
            let items: Vec<&Node> = node
                .children()
                .iter()
                .filter(|c| ChildSlot::of(kind, c.kind()) == Some(*slot))
                .filter(|c| c.element_kind().exists_in(self.revision))
                .collect();
            if items.is_empty() {
                continue;
            }
            match slot.list_name(self.revision) {
                Some(list) => {
                    out.start_element(list);
                    for item in items {
                        self.write_element(item, Some(kind), out);
                    }
                    out.end_element();
                }
                None => {
                    for item in items {
                        self.write_element(item, Some(kind), out);
                    }
                }
            }
        }

        if self.level() >= 3 {
            for plugin in node.plugins() {
                self.write_plugin_elements(plugin, out);
            }
        }
    }

    fn write_plugin_elements(&self, plugin: &Plugin, out: &mut XmlWriter) {
        let default_namespace = self.default_namespaces.contains(&plugin.uri());
        let mut writer = PackageWriter::new(out, self.revision, plugin.uri(), plugin.prefix());
        writer.default_namespace = default_namespace;
        plugin.data().write_elements(&mut writer);
    }
}

/// Output context handed to package code for content in its namespace.
///
/// Element and attribute names are qualified with the package prefix, or,
/// when the package is written as a default namespace, left bare with the
/// URI declared on each outermost package element.
pub struct PackageWriter<'a> {
    out: &'a mut XmlWriter,
    revision: Revision,
    uri: &'a str,
    prefix: &'a str,
    default_namespace: bool,
    base_depth: usize,
}

impl<'a> PackageWriter<'a> {
    pub fn new(out: &'a mut XmlWriter, revision: Revision, uri: &'a str, prefix: &'a str) -> Self {
        let base_depth = out.depth();
        Self {
            out,
            revision,
            uri,
            prefix,
            default_namespace: false,
            base_depth,
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn uri(&self) -> &str {
        self.uri
    }

    pub fn prefix(&self) -> &str {
        self.prefix
    }

    fn qualified(&self, name: &str) -> String {
        if self.default_namespace {
            name.to_string()
        } else {
            qualify(Some(self.prefix), name)
        }
    }

    pub fn start_element(&mut self, name: &str) {
        let qualified = self.qualified(name);
        self.out.start_element(&qualified);
        if self.default_namespace && self.out.depth() == self.base_depth + 1 {
            self.out.attribute("xmlns", self.uri);
        }
    }

    /// Attribute in the package namespace.
    pub fn attribute(&mut self, name: &str, value: &str) {
        let qualified = self.qualified(name);
        self.out.attribute(&qualified, value);
    }

    pub fn end_element(&mut self) {
        self.out.end_element();
    }

    /// Writes a package-owned node: shared attributes first, then the
    /// element's own, then its notes and annotation.
    pub fn write_node(&mut self, node: &Node) {
        let NodeKind::Extension(element) = node.kind() else {
            return;
        };
        let element = element.element();
        self.start_element(element.element_name());
        if let Some(meta_id) = node.meta_id() {
            self.attribute("metaid", meta_id);
        }
        if let Some(term) = node.sbo_term() {
            self.attribute("sboTerm", &format!("SBO:{term:07}"));
        }
        if let Some(id) = node.id() {
            self.attribute("id", id);
        }
        if let Some(name) = node.name() {
            self.attribute("name", name);
        }
        let mut attributes = Vec::new();
        element.write_attributes(&mut attributes);
        for (name, value) in attributes {
            self.attribute(&name, &value);
        }
        if let Some(notes) = node.notes() {
            self.out.raw_block(notes);
        }
        if let Some(annotation) = node.annotation() {
            self.out.raw_block(annotation);
        }
        self.end_element();
    }

    /// Writes markup kept verbatim from input.
    pub fn write_xml(&mut self, element: &XmlElement) {
        element.write(self.out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Unit;
    use crate::reader::read_sbml_from_str;

    fn mmls() -> Node {
        let mut mmls = Node::unit_definition("mmls");
        mmls.add_child(Node::unit(Unit::with("mole", 1.0, -3))).expect("unit");
        mmls.add_child(Node::unit(Unit::with("liter", -1.0, 0))).expect("unit");
        mmls.add_child(Node::unit(Unit::with("second", -1.0, 0))).expect("unit");
        mmls
    }

    #[test]
    fn unit_definition_writes_only_non_default_terms() {
        insta::assert_snapshot!(write_node(&mmls(), Revision::L2V4), @r#"
        <unitDefinition id="mmls">
          <listOfUnits>
            <unit kind="mole" scale="-3"/>
            <unit kind="liter" exponent="-1"/>
            <unit kind="second" exponent="-1"/>
          </listOfUnits>
        </unitDefinition>
        "#);
    }

    #[test]
    fn unit_offsets_are_written_only_in_level2_version1() {
        let mut kelvin = Unit::with("kelvin", 1.0, 0);
        kelvin.offset = Some(273.15);
        let unit = Node::unit(kelvin);
        assert!(write_node(&unit, Revision::L2V1).contains("offset=\"273.15\""));
        for revision in [Revision::L2V2, Revision::L2V4, Revision::L3V1] {
            assert!(!write_node(&unit, revision).contains("offset"), "{revision}");
        }
    }

    #[test]
    fn level1_parameter_rule_units_survive_a_round_trip() {
        let text = "<sbml xmlns=\"http://www.sbml.org/sbml/level1\" level=\"1\" version=\"2\">\
            <model name=\"m\"><listOfParameters><parameter name=\"k\" value=\"1\"/>\
            </listOfParameters><listOfRules>\
            <parameterRule formula=\"2 * k\" name=\"k\" units=\"second\"/>\
            </listOfRules></model></sbml>";
        let document = read_sbml_from_str(text);
        assert!(document.error_log().is_empty(), "{}", document.error_log());
        let written = write_sbml_to_string(&document);
        assert!(written.contains("name=\"k\" units=\"second\"/>"), "{written}");
        assert_eq!(write_sbml_to_string(&read_sbml_from_str(&written)), written);

        let rule = document
            .get_all_elements(|n| n.as_rule().is_some())
            .into_iter()
            .next()
            .expect("rule");
        assert!(!write_node(rule, Revision::L2V4).contains("units"));
    }

    #[test]
    fn level1_uses_name_and_formula_attributes() {
        let mut reaction = Node::reaction("r");
        reaction.add_child(Node::reactant("x0")).expect("reactant");
        reaction.add_child(Node::product("s1")).expect("product");
        reaction
            .add_child(Node::kinetic_law("(vm * s1)/(km + s1)").expect("law"))
            .expect("kinetic law");
        insta::assert_snapshot!(write_node(&reaction, Revision::L1V2), @r#"
        <reaction name="r">
          <listOfReactants>
            <speciesReference species="x0"/>
          </listOfReactants>
          <listOfProducts>
            <speciesReference species="s1"/>
          </listOfProducts>
          <kineticLaw formula="(vm * s1)/(km + s1)"/>
        </reaction>
        "#);
    }

    #[test]
    fn level3_writes_every_set_attribute() {
        let mut species = Node::species("s", "c");
        let payload = species.as_species_mut().expect("species");
        payload.boundary_condition = Some(false);
        payload.has_only_substance_units = Some(false);
        payload.constant = Some(false);
        let l2 = write_node(&species, Revision::L2V4);
        assert!(!l2.contains("boundaryCondition"));
        let l3 = write_node(&species, Revision::L3V1);
        assert!(l3.contains("boundaryCondition=\"false\""));
        assert!(l3.contains("hasOnlySubstanceUnits=\"false\""));
        assert!(l3.contains("constant=\"false\""));
    }

    #[test]
    fn empty_lists_are_not_written() {
        let mut document = Document::with_revision(Revision::L2V4);
        document.create_model("m");
        let markup = write_sbml_to_string(&document);
        assert!(!markup.contains("listOf"));
        assert!(markup.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(markup.ends_with("</sbml>\n"));
    }

    #[test]
    fn conflicting_default_namespace_moves_to_added_prefix() {
        let mut document = Document::with_revision(Revision::L2V4);
        document.namespaces_mut().retain(|_| false);
        document.add_namespace("urn:elsewhere", "");
        let namespaces = root_namespaces(&document);
        assert_eq!(namespaces.uri_for(""), Some(Revision::L2V4.namespace_uri()));
        assert_eq!(namespaces.uri_for(ADDED_PREFIX), Some("urn:elsewhere"));
    }

    #[test]
    fn other_core_namespaces_are_stripped() {
        let mut document = Document::with_revision(Revision::L2V4);
        document.add_namespace(Revision::L3V1.namespace_uri(), "l3");
        let namespaces = root_namespaces(&document);
        assert!(!namespaces.contains_uri(Revision::L3V1.namespace_uri()));
        assert_eq!(namespaces.len(), 1);
    }

    #[test]
    fn writing_is_deterministic_and_reads_back() {
        let mut document = Document::with_revision(Revision::L2V4);
        let model = document.create_model("m");
        model.add_child(mmls()).expect("unit definition");
        model.add_child(Node::compartment("cell")).expect("compartment");
        model.add_child(Node::species("s", "cell")).expect("species");
        model.set_notes("<notes>\n  <p xmlns=\"http://www.w3.org/1999/xhtml\">kept</p>\n</notes>");
        let first = write_sbml_to_string(&document);
        assert_eq!(first, write_sbml_to_string(&document));

        let reread = read_sbml_from_str(&first);
        assert!(reread.error_log().is_empty(), "{}", reread.error_log());
        assert_eq!(write_sbml_to_string(&reread), first);
        assert_eq!(
            reread.model().and_then(Node::notes),
            document.model().and_then(Node::notes)
        );
    }
}
