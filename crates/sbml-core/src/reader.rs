//! Markup to document.
//!
//! Tokenizing is done by `roxmltree`; the element tree is copied into
//! owned [`XmlElement`]s and then walked once, building nodes slot by slot.
//! Structural problems are logged in the document's error log and reading
//! carries on with what can be salvaged; only unreadable files are
//! reported as errors.

use crate::document::{Document, new_plugin};
use crate::error::SbmlError;
use crate::error_log::ErrorRecord;
use crate::extension::{ExtensionElement, OpaquePayload, Plugin};
use crate::math::{Math, read_math};
use crate::namespaces::XmlNamespaces;
use crate::node::{
    ElementKind, ExtensionNode, Level1RuleTarget, Node, NodeKind, ReferenceRole,
    SpeciesReference,
};
use crate::vocabulary::{ChildSlot, kind_for_element, level1_rule_target};
use crate::xml::{XmlElement, parse_real};
use sbml_schema::{
    MATHML_XMLNS, Revision, Severity, XHTML_XMLNS, code, is_core_namespace,
    is_level3_package_namespace, revisions_for_namespace,
};
use std::path::Path;

/// Reads a document from markup. Never fails: problems are recorded in
/// the returned document's error log.
pub fn read_sbml_from_str(text: &str) -> Document {
    let parsed = match roxmltree::Document::parse(text) {
        Ok(parsed) => parsed,
        Err(err) => {
            let pos = err.pos();
            let mut document = Document::new();
            document.error_log_mut().log(
                ErrorRecord::new(code::BADLY_FORMED_XML, Revision::DEFAULT, format!("  {err}"))
                    .at(Some(pos.row), Some(pos.col)),
            );
            return document;
        }
    };
    let root = XmlElement::from_node(parsed.root_element(), text);
    let document = read_root(&root);
    tracing::debug!(
        revision = %document.revision(),
        errors = document.error_log().len(),
        "document read"
    );
    document
}

/// Reads a document from a file; the location is remembered on the
/// document.
pub fn read_sbml_from_file(path: impl AsRef<Path>) -> Result<Document, SbmlError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SbmlError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document = read_sbml_from_str(&text);
    document.set_location_uri(path.display().to_string());
    Ok(document)
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("'{other}' is not a boolean")),
    }
}

fn parse_number(value: &str) -> Result<f64, String> {
    parse_real(value).ok_or_else(|| format!("'{}' is not a number", value.trim()))
}

fn parse_integer<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("'{}' is not an integer", value.trim()))
}

fn parse_sbo_term(value: &str) -> Result<u32, String> {
    value
        .trim()
        .strip_prefix("SBO:")
        .filter(|digits| digits.len() == 7)
        .and_then(|digits| digits.parse::<u32>().ok())
        .ok_or_else(|| format!("'{}' is not an SBO term", value.trim()))
}

fn read_root(root: &XmlElement) -> Document {
    let mut records = Vec::new();
    if root.name != "sbml" {
        let mut document = Document::new();
        document.error_log_mut().log(
            ErrorRecord::new(
                code::NOT_SCHEMA_CONFORMANT,
                Revision::DEFAULT,
                format!("  The root element is <{}>, not <sbml>.", root.name),
            )
            .at(root.line, root.column),
        );
        return document;
    }

    let core_uri = root.uri.clone().unwrap_or_default();
    let level = root.attribute("level").and_then(|v| v.trim().parse::<u32>().ok());
    let version = root.attribute("version").and_then(|v| v.trim().parse::<u32>().ok());
    if level.is_none() {
        records.push(
            ErrorRecord::new(code::MISSING_OR_INCONSISTENT_LEVEL, Revision::DEFAULT, "")
                .at(root.line, root.column),
        );
    }
    if version.is_none() {
        records.push(
            ErrorRecord::new(code::MISSING_OR_INCONSISTENT_VERSION, Revision::DEFAULT, "")
                .at(root.line, root.column),
        );
    }
    let from_attributes = level.zip(version).and_then(|(l, v)| Revision::new(l, v));
    if let (Some(l), Some(v), None) = (level, version, from_attributes) {
        records.push(
            ErrorRecord::new(
                code::INVALID_SBML_LEVEL_VERSION,
                Revision::DEFAULT,
                format!("  Level {l} Version {v} is not defined."),
            )
            .at(root.line, root.column),
        );
    }
    let revision = from_attributes
        .or_else(|| revisions_for_namespace(&core_uri).last().copied())
        .unwrap_or(Revision::DEFAULT);
    if !revision.matches_namespace(&core_uri) {
        records.push(
            ErrorRecord::new(
                code::INVALID_NAMESPACE_ON_SBML,
                revision,
                format!("  The namespace '{core_uri}' does not match {revision}."),
            )
            .at(root.line, root.column),
        );
    }

    let mut document = Document::with_revision(revision);
    let mut namespaces = XmlNamespaces::new();
    for (prefix, uri) in &root.namespaces {
        namespaces.add(uri, prefix.as_deref().unwrap_or(""));
    }
    *document.namespaces_mut() = namespaces.clone();

    for decl in namespaces.iter() {
        let uri = decl.uri.as_str();
        if is_core_namespace(uri) || uri == MATHML_XMLNS || uri == XHTML_XMLNS {
            continue;
        }
        let required_attribute = root
            .attributes
            .iter()
            .find(|a| a.name == "required" && a.uri.as_deref() == Some(uri));
        let known = crate::extension::extension_by_uri(uri).is_some();
        if !known && required_attribute.is_none() && !is_level3_package_namespace(uri) {
            continue;
        }
        if revision.level() < 3 {
            records.push(
                ErrorRecord::new(
                    code::L3_PACKAGE_ON_LOWER_SBML,
                    revision,
                    format!("  The package namespace '{uri}' is ignored in {revision}."),
                )
                .at(root.line, root.column),
            );
            continue;
        }
        let required = match required_attribute.map(|a| parse_bool(&a.value)) {
            Some(Ok(required)) => required,
            Some(Err(detail)) => {
                records.push(
                    ErrorRecord::new(
                        code::INVALID_ATTRIBUTE_VALUE,
                        revision,
                        format!("  {}:required: {detail}", decl.prefix),
                    )
                    .at(root.line, root.column),
                );
                false
            }
            None => false,
        };
        document.declare_package(uri, &decl.prefix, required);
        if !known {
            let code = if required {
                code::REQUIRED_PACKAGE_PRESENT
            } else {
                code::UNREQUIRED_PACKAGE_PRESENT
            };
            records.push(
                ErrorRecord::new(
                    code,
                    revision,
                    format!("  The package '{}' ({uri}) is not supported.", decl.prefix),
                )
                .at(root.line, root.column),
            );
        }
    }

    let packages: Vec<Package> = document
        .packages()
        .iter()
        .map(|p| Package {
            uri: p.uri.clone(),
            prefix: p.prefix.clone(),
            known: p.known,
        })
        .collect();
    let mut reader = TreeReader {
        revision,
        core_uri,
        namespaces,
        packages,
        records,
    };

    let mut sbml = Node::new(NodeKind::Document);
    sbml.set_position(root.line, root.column);
    reader.attach_plugins(&mut sbml);
    for attr in &root.attributes {
        match (attr.uri.as_deref(), attr.name.as_str()) {
            (None, "level" | "version") => {}
            (Some(uri), "required") if reader.package(uri).is_some() => {}
            _ => reader.read_attribute(&mut sbml, root, attr),
        }
    }
    reader.read_content(&mut sbml, root);

    *document.root_mut() = sbml;
    document.connect_to_child();
    document.error_log_mut().add_all(reader.records);
    document
}

struct Package {
    uri: String,
    prefix: String,
    known: bool,
}

struct TreeReader {
    revision: Revision,
    core_uri: String,
    namespaces: XmlNamespaces,
    packages: Vec<Package>,
    records: Vec<ErrorRecord>,
}

impl TreeReader {
    fn package(&self, uri: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.uri == uri)
    }

    fn log(&mut self, code: u32, element: &XmlElement, detail: impl Into<String>) {
        self.records
            .push(ErrorRecord::new(code, self.revision, detail).at(element.line, element.column));
    }

    fn is_core(&self, uri: Option<&str>) -> bool {
        uri.is_none_or(|u| u == self.core_uri)
    }

    fn attach_plugins(&self, node: &mut Node) {
        for package in self.packages.iter().filter(|p| p.known) {
            if let Some(plugin) =
                new_plugin(&package.uri, &package.prefix, node.element_kind(), &self.namespaces)
            {
                node.add_plugin(plugin);
            }
        }
    }

    /// Plugin receiving content in a package namespace, created on demand
    /// for packages nobody interprets.
    fn plugin_for<'n>(&self, node: &'n mut Node, uri: &str) -> Option<&'n mut Plugin> {
        let package = self.package(uri)?;
        if node.plugin(uri).is_none() {
            if package.known {
                return None;
            }
            node.add_plugin(Plugin::opaque(
                uri,
                package.prefix.clone(),
                OpaquePayload::default(),
            ));
        }
        node.plugin_mut(uri)
    }

    fn read_attribute(&mut self, node: &mut Node, element: &XmlElement, attr: &crate::xml::XmlAttribute) {
        let uri = attr.uri.as_deref();
        if self.is_core(uri) {
            match read_core_attribute(node, &attr.name, &attr.value, self.revision) {
                Ok(true) => {}
                Ok(false) => self.log(
                    code::UNKNOWN_CORE_ATTRIBUTE,
                    element,
                    format!("  Attribute '{}' on <{}>.", attr.name, element.name),
                ),
                Err(detail) => self.log(
                    code::INVALID_ATTRIBUTE_VALUE,
                    element,
                    format!("  {}: {detail}", attr.name),
                ),
            }
            return;
        }
        let Some(uri) = uri else { return };
        let revision = self.revision;
        let Some(plugin) = self.plugin_for(node, uri) else {
            if self.package(uri).is_some() {
                self.log(
                    code::UNKNOWN_PACKAGE_ATTRIBUTE,
                    element,
                    format!("  Attribute '{}' on <{}>.", attr.qualified_name(), element.name),
                );
            }
            return;
        };
        let package = plugin.package().to_string();
        let record = match plugin.data_mut().read_attribute(&attr.name, &attr.value) {
            Ok(true) => None,
            Ok(false) => Some(ErrorRecord::new(
                code::UNKNOWN_PACKAGE_ATTRIBUTE,
                revision,
                format!("  Attribute '{}' on <{}>.", attr.qualified_name(), element.name),
            )),
            Err(detail) => Some(ErrorRecord::new(
                code::INVALID_ATTRIBUTE_VALUE,
                revision,
                format!("  {}: {detail}", attr.qualified_name()),
            )),
        };
        if let Some(record) = record {
            self.records
                .push(record.at(element.line, element.column).with_package(package));
        }
    }

    /// Reads the child elements of `element` into `node`.
    fn read_content(&mut self, node: &mut Node, element: &XmlElement) {
        let parent = node.element_kind();
        for child in element.child_elements() {
            let uri = child.uri.as_deref();
            if self.is_core(uri) {
                match child.name.as_str() {
                    "notes" => node.set_notes(child.raw.clone().unwrap_or_default()),
                    "annotation" => node.set_annotation(child.raw.clone().unwrap_or_default()),
                    name => {
                        if let Some(slot) = ChildSlot::from_list_name(parent, name) {
                            self.read_list(node, slot, child);
                        } else if let Some(slot) = ChildSlot::for_parent(parent)
                            .iter()
                            .copied()
                            .find(|s| s.is_singular() && kind_for_element(*s, name).is_some())
                        {
                            self.read_singular(node, slot, child);
                        } else {
                            self.log(
                                code::UNRECOGNIZED_ELEMENT,
                                child,
                                format!("  <{name}> is not allowed in <{}>.", element.name),
                            );
                        }
                    }
                }
                continue;
            }
            if uri == Some(MATHML_XMLNS) && child.name == "math" {
                self.read_math_element(node, child);
                continue;
            }
            if let Some(uri) = uri.filter(|u| self.package(u).is_some()) {
                self.read_package_element(node, uri, child);
                continue;
            }
            self.log(
                code::UNRECOGNIZED_ELEMENT,
                child,
                format!("  <{}> is not allowed in <{}>.", child.qualified_name(), element.name),
            );
        }
    }

    fn read_math_element(&mut self, node: &mut Node, element: &XmlElement) {
        if self.revision.level() < 2 {
            self.log(code::UNRECOGNIZED_ELEMENT, element, "  <math> requires Level 2.");
            return;
        }
        match read_math(element) {
            Ok(ast) => {
                if !node.set_math(Math::from_ast(ast)) {
                    self.log(
                        code::UNRECOGNIZED_ELEMENT,
                        element,
                        format!("  A {} has no math.", node.type_name()),
                    );
                }
            }
            Err(err) => self.log(code::INVALID_MATHML, element, format!("  {err}")),
        }
    }

    fn read_package_element(&mut self, node: &mut Node, uri: &str, element: &XmlElement) {
        let revision = self.revision;
        let Some(plugin) = self.plugin_for(node, uri) else {
            self.log(
                code::UNRECOGNIZED_ELEMENT,
                element,
                format!("  <{}> is not allowed here.", element.qualified_name()),
            );
            return;
        };
        let (uri, prefix, package) = (
            plugin.uri().to_string(),
            plugin.prefix().to_string(),
            plugin.package().to_string(),
        );
        let mut reader = PackageReader::new(revision, &uri, &prefix, &package, &mut self.records);
        if !plugin.data_mut().read_element(element, &mut reader) {
            reader.log_unrecognized(element);
        }
    }

    fn read_list(&mut self, node: &mut Node, slot: ChildSlot, list: &XmlElement) {
        for item in list.child_elements() {
            if !self.is_core(item.uri.as_deref()) {
                self.log(
                    code::UNRECOGNIZED_ELEMENT,
                    item,
                    format!("  <{}> is not allowed in <{}>.", item.qualified_name(), list.name),
                );
                continue;
            }
            if matches!(item.name.as_str(), "notes" | "annotation") {
                continue;
            }
            let Some(kind) = kind_for_element(slot, &item.name) else {
                self.log(
                    code::UNRECOGNIZED_ELEMENT,
                    item,
                    format!("  <{}> is not allowed in <{}>.", item.name, list.name),
                );
                continue;
            };
            if let Some(child) = self.read_element(kind, slot, item) {
                self.push_child(node, child, item);
            }
        }
    }

    fn read_singular(&mut self, node: &mut Node, slot: ChildSlot, element: &XmlElement) {
        let Some(kind) = kind_for_element(slot, &element.name) else {
            return;
        };
        let occupied = node
            .children()
            .iter()
            .any(|c| ChildSlot::of(node.element_kind(), c.kind()) == Some(slot));
        if occupied {
            self.log(
                code::NOT_SCHEMA_CONFORMANT,
                element,
                format!("  Only one <{}> is allowed here.", element.name),
            );
            return;
        }
        if let Some(child) = self.read_element(kind, slot, element) {
            self.push_child(node, child, element);
        }
    }

    fn push_child(&mut self, node: &mut Node, child: Node, element: &XmlElement) {
        if let Err(err) = node.add_child(child) {
            self.log(code::UNRECOGNIZED_ELEMENT, element, format!("  {err}"));
        }
    }

    /// Builds one core node and everything below it.
    fn read_element(&mut self, kind: ElementKind, slot: ChildSlot, element: &XmlElement) -> Option<Node> {
        let l1_target = (self.revision.level() == 1)
            .then(|| level1_rule_target(&element.name))
            .flatten();
        let payload = match empty_payload(kind, slot) {
            Some(payload) => payload,
            None => return None,
        };
        let payload = match (payload, l1_target) {
            (NodeKind::AssignmentRule(mut rule), Some(target)) => {
                rule.level1_target = Some(target);
                if element.attribute("type") == Some("rate") {
                    NodeKind::RateRule(rule)
                } else {
                    NodeKind::AssignmentRule(rule)
                }
            }
            (payload, _) => payload,
        };
        let mut node = Node::new(payload);
        node.set_position(element.line, element.column);
        node.set_namespace_uri(self.core_uri.clone());
        if !node.element_kind().exists_in(self.revision) {
            self.log(
                code::UNRECOGNIZED_ELEMENT,
                element,
                format!("  <{}> is not defined in {}.", element.name, self.revision),
            );
            return None;
        }
        tracing::trace!(element = %element.name, line = ?element.line, "reading element");

        self.attach_plugins(&mut node);
        for attr in &element.attributes {
            if l1_target.is_some() && attr.uri.is_none() && attr.name == "type" {
                continue;
            }
            self.read_attribute(&mut node, element, attr);
        }
        self.read_content(&mut node, element);
        Some(node)
    }
}

fn empty_payload(kind: ElementKind, slot: ChildSlot) -> Option<NodeKind> {
    use crate::node::{
        Compartment, FunctionDefinition, InitialAssignment, KineticLaw, Model,
        ModifierSpeciesReference, Parameter, Reaction, Rule, Species, Unit,
    };
    let payload = match kind {
        ElementKind::Model => NodeKind::Model(Model::default()),
        ElementKind::FunctionDefinition => NodeKind::FunctionDefinition(FunctionDefinition::default()),
        ElementKind::UnitDefinition => NodeKind::UnitDefinition,
        ElementKind::Unit => NodeKind::Unit(Unit::default()),
        ElementKind::Compartment => NodeKind::Compartment(Compartment::default()),
        ElementKind::SpeciesType => NodeKind::SpeciesType,
        ElementKind::Species => NodeKind::Species(Species::default()),
        ElementKind::Parameter => NodeKind::Parameter(Parameter::default()),
        ElementKind::InitialAssignment => NodeKind::InitialAssignment(InitialAssignment::default()),
        ElementKind::AlgebraicRule => NodeKind::AlgebraicRule(Rule::default()),
        ElementKind::AssignmentRule => NodeKind::AssignmentRule(Rule::default()),
        ElementKind::RateRule => NodeKind::RateRule(Rule::default()),
        ElementKind::Reaction => NodeKind::Reaction(Reaction::default()),
        ElementKind::SpeciesReference => NodeKind::SpeciesReference(SpeciesReference {
            role: if slot == ChildSlot::Products {
                ReferenceRole::Product
            } else {
                ReferenceRole::Reactant
            },
            ..SpeciesReference::default()
        }),
        ElementKind::ModifierSpeciesReference => {
            NodeKind::ModifierSpeciesReference(ModifierSpeciesReference::default())
        }
        ElementKind::KineticLaw => NodeKind::KineticLaw(KineticLaw::default()),
        ElementKind::Document | ElementKind::Extension => return None,
    };
    Some(payload)
}

fn set_formula(node: &mut Node, value: &str) -> Result<bool, String> {
    let math = Math::parse_formula(value).map_err(|e| e.to_string())?;
    Ok(node.set_math(math))
}

/// Applies one unprefixed attribute to a core node. `Ok(false)` when the
/// attribute is not defined for the node in `revision`.
fn read_core_attribute(node: &mut Node, name: &str, value: &str, revision: Revision) -> Result<bool, String> {
    let level = revision.level();
    let l1 = level == 1;
    let l3 = level >= 3;

    if l1 && node.element_kind() != ElementKind::AlgebraicRule {
        if let Some(rule) = node.as_rule_mut() {
            match name {
                "formula" => {}
                "units" if rule.level1_target == Some(Level1RuleTarget::Parameter) => {
                    rule.level1_units = Some(value.to_string());
                    return Ok(true);
                }
                _ => {
                    let target = rule.level1_target.unwrap_or(Level1RuleTarget::Parameter);
                    let expected =
                        crate::vocabulary::level1_rule_variable_attribute(target, revision);
                    if name != expected {
                        return Ok(false);
                    }
                    rule.variable = Some(value.to_string());
                    return Ok(true);
                }
            }
        }
    }

    let handled = match node.kind_mut() {
        NodeKind::Model(m) if l3 => {
            let slot = match name {
                "substanceUnits" => Some(&mut m.substance_units),
                "timeUnits" => Some(&mut m.time_units),
                "volumeUnits" => Some(&mut m.volume_units),
                "areaUnits" => Some(&mut m.area_units),
                "lengthUnits" => Some(&mut m.length_units),
                "extentUnits" => Some(&mut m.extent_units),
                "conversionFactor" => Some(&mut m.conversion_factor),
                _ => None,
            };
            slot.map(|s| *s = Some(value.to_string())).is_some()
        }
        NodeKind::Unit(u) => match name {
            "kind" => {
                u.kind = value.trim().to_string();
                true
            }
            "exponent" if l3 => {
                u.exponent = Some(parse_number(value)?);
                true
            }
            "exponent" => {
                u.exponent = Some(f64::from(parse_integer::<i32>(value)?));
                true
            }
            "scale" => {
                u.scale = Some(parse_integer(value)?);
                true
            }
            "multiplier" if !l1 => {
                u.multiplier = Some(parse_number(value)?);
                true
            }
            "offset" if revision == Revision::L2V1 => {
                u.offset = Some(parse_number(value)?);
                true
            }
            _ => false,
        },
        NodeKind::Compartment(c) => match name {
            "volume" if l1 => {
                c.size = Some(parse_number(value)?);
                true
            }
            "size" if !l1 => {
                c.size = Some(parse_number(value)?);
                true
            }
            "units" => {
                c.units = Some(value.to_string());
                true
            }
            "outside" if !l3 => {
                c.outside = Some(value.to_string());
                true
            }
            "spatialDimensions" if !l1 => {
                c.spatial_dimensions = Some(parse_number(value)?);
                true
            }
            "constant" if !l1 => {
                c.constant = Some(parse_bool(value)?);
                true
            }
            _ => false,
        },
        NodeKind::Species(s) => match name {
            "compartment" => {
                s.compartment = Some(value.to_string());
                true
            }
            "initialAmount" => {
                s.initial_amount = Some(parse_number(value)?);
                true
            }
            "initialConcentration" if !l1 => {
                s.initial_concentration = Some(parse_number(value)?);
                true
            }
            "units" if l1 => {
                s.substance_units = Some(value.to_string());
                true
            }
            "substanceUnits" if !l1 => {
                s.substance_units = Some(value.to_string());
                true
            }
            "hasOnlySubstanceUnits" if !l1 => {
                s.has_only_substance_units = Some(parse_bool(value)?);
                true
            }
            "boundaryCondition" => {
                s.boundary_condition = Some(parse_bool(value)?);
                true
            }
            "charge" if !l3 => {
                s.charge = Some(parse_integer(value)?);
                true
            }
            "constant" if !l1 => {
                s.constant = Some(parse_bool(value)?);
                true
            }
            "speciesType" if (Revision::L2V2..=Revision::L2V5).contains(&revision) => {
                s.species_type = Some(value.to_string());
                true
            }
            "conversionFactor" if l3 => {
                s.conversion_factor = Some(value.to_string());
                true
            }
            _ => false,
        },
        NodeKind::Parameter(p) => match name {
            "value" => {
                p.value = Some(parse_number(value)?);
                true
            }
            "units" => {
                p.units = Some(value.to_string());
                true
            }
            "constant" if !l1 => {
                p.constant = Some(parse_bool(value)?);
                true
            }
            _ => false,
        },
        NodeKind::InitialAssignment(a) => match name {
            "symbol" => {
                a.symbol = Some(value.to_string());
                true
            }
            _ => false,
        },
        NodeKind::AssignmentRule(r) | NodeKind::RateRule(r) if !l1 => match name {
            "variable" => {
                r.variable = Some(value.to_string());
                true
            }
            _ => false,
        },
        NodeKind::Reaction(r) => match name {
            "reversible" => {
                r.reversible = Some(parse_bool(value)?);
                true
            }
            "fast" => {
                r.fast = Some(parse_bool(value)?);
                true
            }
            "compartment" if l3 => {
                r.compartment = Some(value.to_string());
                true
            }
            _ => false,
        },
        NodeKind::SpeciesReference(r) => match name {
            "specie" if revision == Revision::L1V1 => {
                r.species = Some(value.to_string());
                true
            }
            "species" if revision != Revision::L1V1 => {
                r.species = Some(value.to_string());
                true
            }
            "stoichiometry" if l1 => {
                r.stoichiometry = Some(f64::from(parse_integer::<i32>(value)?));
                true
            }
            "stoichiometry" => {
                r.stoichiometry = Some(parse_number(value)?);
                true
            }
            "denominator" if l1 => {
                r.denominator = Some(parse_integer(value)?);
                true
            }
            "constant" if l3 => {
                r.constant = Some(parse_bool(value)?);
                true
            }
            _ => false,
        },
        NodeKind::ModifierSpeciesReference(m) => match name {
            "species" => {
                m.species = Some(value.to_string());
                true
            }
            _ => false,
        },
        NodeKind::KineticLaw(k) => match name {
            "timeUnits" if !l3 => {
                k.time_units = Some(value.to_string());
                true
            }
            "substanceUnits" if !l3 => {
                k.substance_units = Some(value.to_string());
                true
            }
            _ => false,
        },
        _ => false,
    };
    if handled {
        return Ok(true);
    }
    if l1 && name == "formula" && node.math().is_none() {
        return set_formula(node, value);
    }
    read_common_attribute(node, name, value, revision)
}

/// Attributes shared by every core element.
fn read_common_attribute(node: &mut Node, name: &str, value: &str, revision: Revision) -> Result<bool, String> {
    let level = revision.level();
    match name {
        "name" if level == 1 && node.element_kind() != ElementKind::AlgebraicRule => {
            node.set_id(value);
        }
        "name" if level > 1 => node.set_name(value),
        "id" if level > 1 => node.set_id(value),
        "metaid" if level > 1 => node.set_meta_id(value),
        "sboTerm" if revision >= Revision::L2V2 => node.set_sbo_term(Some(parse_sbo_term(value)?)),
        _ => return Ok(false),
    }
    Ok(true)
}

/// Reading context handed to package code for content in its namespace.
pub struct PackageReader<'a> {
    revision: Revision,
    uri: &'a str,
    prefix: &'a str,
    package: &'a str,
    records: &'a mut Vec<ErrorRecord>,
}

impl<'a> PackageReader<'a> {
    pub fn new(
        revision: Revision,
        uri: &'a str,
        prefix: &'a str,
        package: &'a str,
        records: &'a mut Vec<ErrorRecord>,
    ) -> Self {
        Self {
            revision,
            uri,
            prefix,
            package,
            records,
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

    pub fn package(&self) -> &str {
        self.package
    }

    /// Logs a record against the package.
    pub fn log(&mut self, record: ErrorRecord) {
        self.records.push(record.with_package(self.package));
    }

    /// Logs a package-defined code at `element`.
    pub fn log_package_error(&mut self, code: u32, severity: Severity, element: &XmlElement, message: impl Into<String>) {
        self.records.push(
            ErrorRecord::for_package(self.package, code, severity, message)
                .at(element.line, element.column),
        );
    }

    pub fn log_unrecognized(&mut self, element: &XmlElement) {
        let record = ErrorRecord::new(
            code::UNRECOGNIZED_ELEMENT,
            self.revision,
            format!("  <{}> is not part of the {} package.", element.qualified_name(), self.package),
        )
        .at(element.line, element.column);
        self.log(record);
    }

    /// Builds a package-owned node from `element` around `payload`.
    ///
    /// `id`, `name` and `metaid` are read as shared attributes, with or
    /// without the package prefix; everything else is offered to the
    /// payload. `<notes>` and `<annotation>` are kept verbatim.
    pub fn read_node(&mut self, element: &XmlElement, mut payload: Box<dyn ExtensionElement>) -> Node {
        let mut common = Vec::new();
        for attr in &element.attributes {
            let ours = attr.uri.as_deref().is_none_or(|u| u == self.uri);
            if !ours {
                continue;
            }
            match attr.name.as_str() {
                "id" | "name" | "metaid" | "sboTerm" => common.push(attr),
                name => match payload.read_attribute(name, &attr.value) {
                    Ok(true) => {}
                    Ok(false) => {
                        let record = ErrorRecord::new(
                            code::UNKNOWN_PACKAGE_ATTRIBUTE,
                            self.revision,
                            format!("  Attribute '{name}' on <{}>.", element.qualified_name()),
                        )
                        .at(element.line, element.column);
                        self.log(record);
                    }
                    Err(detail) => {
                        let record = ErrorRecord::new(
                            code::INVALID_ATTRIBUTE_VALUE,
                            self.revision,
                            format!("  {name}: {detail}"),
                        )
                        .at(element.line, element.column);
                        self.log(record);
                    }
                },
            }
        }

        let mut node = Node::new(NodeKind::Extension(ExtensionNode::from_box(payload)));
        node.set_position(element.line, element.column);
        node.set_namespace_uri(self.uri);
        for attr in common {
            match attr.name.as_str() {
                "id" => node.set_id(attr.value.as_str()),
                "name" => node.set_name(attr.value.as_str()),
                "metaid" => node.set_meta_id(attr.value.as_str()),
                _ => match parse_sbo_term(&attr.value) {
                    Ok(term) => node.set_sbo_term(Some(term)),
                    Err(detail) => {
                        let record = ErrorRecord::new(
                            code::INVALID_ATTRIBUTE_VALUE,
                            self.revision,
                            format!("  sboTerm: {detail}"),
                        )
                        .at(element.line, element.column);
                        self.log(record);
                    }
                },
            }
        }
        for child in element.child_elements() {
            match child.name.as_str() {
                "notes" => node.set_notes(child.raw.clone().unwrap_or_default()),
                "annotation" => node.set_annotation(child.raw.clone().unwrap_or_default()),
                _ => self.log_unrecognized(child),
            }
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const L2V4_HEAD: &str =
        "<sbml xmlns=\"http://www.sbml.org/sbml/level2/version4\" level=\"2\" version=\"4\">";

    #[test]
    fn malformed_markup_is_a_fatal_record() {
        let document = read_sbml_from_str("<sbml><model></sbml>");
        let record = document.error_log().get(0).expect("record");
        assert_eq!(record.code, code::BADLY_FORMED_XML);
        assert_eq!(record.severity, Severity::Fatal);
        assert!(record.line.is_some());
    }

    #[test]
    fn level_and_version_pick_the_revision() {
        let text = format!("{L2V4_HEAD}<model id=\"m\"/></sbml>");
        let document = read_sbml_from_str(&text);
        assert_eq!(document.revision(), Revision::L2V4);
        assert!(document.error_log().is_empty(), "{}", document.error_log());
        assert_eq!(document.model().and_then(Node::id), Some("m"));
    }

    #[test]
    fn missing_level_and_mismatched_namespace_are_logged() {
        let document = read_sbml_from_str(
            "<sbml xmlns=\"http://www.sbml.org/sbml/level2/version4\" version=\"1\"/>",
        );
        assert!(document.error_log().contains(code::MISSING_OR_INCONSISTENT_LEVEL));
        let document = read_sbml_from_str(
            "<sbml xmlns=\"http://www.sbml.org/sbml/level2/version4\" level=\"3\" version=\"1\"/>",
        );
        assert!(document.error_log().contains(code::INVALID_NAMESPACE_ON_SBML));
        let document = read_sbml_from_str(
            "<sbml xmlns=\"http://www.sbml.org/sbml/level2/version4\" level=\"2\" version=\"9\"/>",
        );
        assert!(document.error_log().contains(code::INVALID_SBML_LEVEL_VERSION));
        assert_eq!(document.revision(), Revision::L2V4);
    }

    #[test]
    fn a_second_model_is_rejected() {
        let text = format!("{L2V4_HEAD}<model id=\"a\"/><model id=\"b\"/></sbml>");
        let document = read_sbml_from_str(&text);
        assert!(document.error_log().contains(code::NOT_SCHEMA_CONFORMANT));
        assert_eq!(document.model().and_then(Node::id), Some("a"));
    }

    #[test]
    fn level1_names_map_onto_ids_and_rule_targets() {
        let text = "<sbml xmlns=\"http://www.sbml.org/sbml/level1\" level=\"1\" version=\"1\">\
            <model name=\"Branch\"><listOfCompartments><compartment name=\"A\" volume=\"2.1\"/>\
            </listOfCompartments><listOfSpecies><specie name=\"s\" compartment=\"A\" \
            initialAmount=\"0\" units=\"mole\"/></listOfSpecies><listOfRules>\
            <specieConcentrationRule formula=\"t * s\" type=\"rate\" specie=\"s\"/>\
            </listOfRules></model></sbml>";
        let document = read_sbml_from_str(text);
        assert!(document.error_log().is_empty(), "{}", document.error_log());
        let model = document.model().expect("model");
        assert_eq!(model.id(), Some("Branch"));
        let a = model.get_element_by_sid("A").expect("compartment");
        assert_eq!(a.as_compartment().and_then(|c| c.size), Some(2.1));
        let s = model.get_element_by_sid("s").expect("species");
        assert_eq!(
            s.as_species().and_then(|sp| sp.substance_units.as_deref()),
            Some("mole")
        );
        let rule = model
            .children_of_kind(ElementKind::RateRule)
            .next()
            .expect("rate rule");
        let payload = rule.as_rule().expect("rule");
        assert_eq!(payload.variable.as_deref(), Some("s"));
        assert_eq!(payload.level1_target, Some(Level1RuleTarget::Species));
        assert_eq!(rule.math().map(Math::formula).as_deref(), Some("t * s"));
    }

    #[test]
    fn unit_offsets_are_read_only_in_level2_version1() {
        let unit_definition = |version: u32| {
            format!(
                "<sbml xmlns=\"http://www.sbml.org/sbml/level2{suffix}\" level=\"2\" \
                 version=\"{version}\"><model><listOfUnitDefinitions>\
                 <unitDefinition id=\"celsius\"><listOfUnits>\
                 <unit kind=\"kelvin\" offset=\"273.15\"/></listOfUnits></unitDefinition>\
                 </listOfUnitDefinitions></model></sbml>",
                suffix = if version == 1 { String::new() } else { format!("/version{version}") }
            )
        };
        let offset = |document: &Document| {
            document
                .get_all_elements(|n| n.element_kind() == ElementKind::Unit)
                .first()
                .and_then(|n| n.as_unit())
                .and_then(|u| u.offset)
        };

        let l2v1 = read_sbml_from_str(&unit_definition(1));
        assert!(l2v1.error_log().is_empty(), "{}", l2v1.error_log());
        assert_eq!(offset(&l2v1), Some(273.15));

        let l2v2 = read_sbml_from_str(&unit_definition(2));
        assert_eq!(l2v2.revision(), Revision::L2V2);
        assert!(l2v2.error_log().contains(code::UNKNOWN_CORE_ATTRIBUTE));
        assert_eq!(offset(&l2v2), None);
    }

    #[test]
    fn unknown_attributes_and_elements_are_reported() {
        let text = format!(
            "{L2V4_HEAD}<model id=\"m\" colour=\"red\"><listOfWidgets/></model></sbml>"
        );
        let document = read_sbml_from_str(&text);
        assert!(document.error_log().contains(code::UNKNOWN_CORE_ATTRIBUTE));
        assert!(document.error_log().contains(code::UNRECOGNIZED_ELEMENT));
    }

    #[test]
    fn notes_and_annotations_are_kept_verbatim() {
        let text = format!(
            "{L2V4_HEAD}<model id=\"m\"><annotation>\n  <x:a xmlns:x=\"urn:x\">1</x:a>\n</annotation>\
             </model></sbml>"
        );
        let document = read_sbml_from_str(&text);
        assert_eq!(
            document.model().and_then(Node::annotation),
            Some("<annotation>\n  <x:a xmlns:x=\"urn:x\">1</x:a>\n</annotation>")
        );
    }

    #[test]
    fn unknown_packages_are_preserved_and_flagged() {
        let text = "<sbml xmlns=\"http://www.sbml.org/sbml/level3/version1/core\" \
            xmlns:qual=\"http://www.sbml.org/sbml/level3/version1/qual/version1\" \
            level=\"3\" version=\"1\" qual:required=\"true\">\
            <model id=\"m\" qual:flag=\"on\"><qual:listOfTransitions/></model></sbml>";
        let document = read_sbml_from_str(text);
        let record = document
            .error_log()
            .iter()
            .find(|r| r.code == code::REQUIRED_PACKAGE_PRESENT)
            .expect("required package flagged");
        assert_eq!(record.severity, Severity::Error);
        assert!(document.is_ignored_package("qual"));
        assert!(document.package_required("qual"));
        let plugin = document.model().and_then(|m| m.plugin("qual")).expect("opaque plugin");
        let payload = plugin.downcast::<OpaquePayload>().expect("opaque");
        assert_eq!(payload.attributes, vec![("flag".to_string(), "on".to_string())]);
        assert_eq!(payload.elements.len(), 1);
    }

    #[test]
    fn packages_below_level3_are_ignored_with_a_warning() {
        let text = "<sbml xmlns=\"http://www.sbml.org/sbml/level2/version4\" \
            xmlns:qual=\"http://www.sbml.org/sbml/level3/version1/qual/version1\" \
            level=\"2\" version=\"4\"/>";
        let document = read_sbml_from_str(text);
        let record = document.error_log().get(0).expect("record");
        assert_eq!(record.code, code::L3_PACKAGE_ON_LOWER_SBML);
        assert_eq!(record.severity, Severity::Warning);
        assert!(document.packages().is_empty());
    }
}
