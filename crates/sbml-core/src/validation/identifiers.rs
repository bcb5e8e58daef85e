//! Identifier consistency: uniqueness per scope and identifier syntax.

use super::{CheckCategories, Constraint, ConstraintContext, NodeRule, is_base_unit};
use crate::document::Document;
use crate::node::{ElementKind, IdScope, Node, NodeKind};
use regex::Regex;
use sbml_schema::{Revision, code};
use std::collections::HashMap;
use std::sync::OnceLock;

fn sid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("SId regex must compile"))
}

fn meta_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\p{L}_][\p{L}\p{N}\p{M}_.\-]*$").expect("metaid regex must compile")
    })
}

pub fn is_valid_sid(text: &str) -> bool {
    sid_re().is_match(text)
}

pub fn is_valid_meta_id(text: &str) -> bool {
    meta_id_re().is_match(text)
}

/// First-seen table for one identifier scope.
#[derive(Debug, Default)]
pub struct IdTracker {
    seen: HashMap<String, (String, Option<u32>)>,
}

impl IdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers `id` for `node`. When the id was already taken, returns
    /// the conflict description and keeps the first owner.
    pub fn observe(&mut self, id: &str, node: &Node) -> Option<String> {
        if let Some((kind, line)) = self.seen.get(id) {
            let mut message = format!(
                "  The {} id '{id}' conflicts with the previously defined {kind} id '{id}'",
                node.type_name()
            );
            if let Some(line) = line {
                message.push_str(&format!(" at line {line}"));
            }
            message.push('.');
            return Some(message);
        }
        self.seen
            .insert(id.to_string(), (node.type_name().to_string(), node.line()));
        None
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

/// Uniqueness of `id` among the nodes of one scope.
struct UniqueIds {
    code: u32,
    scope: IdScope,
    tracker: IdTracker,
}

impl Constraint for UniqueIds {
    fn code(&self) -> u32 {
        self.code
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::IDENTIFIER
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        let scope = self.scope;
        model.walk(&mut |node| {
            if node.id_scope() == scope {
                if let Some(id) = node.id() {
                    if let Some(detail) = self.tracker.observe(id, node) {
                        ctx.fail(self.code, node, detail);
                    }
                }
            }
            true
        });
    }

    fn reset(&mut self) {
        self.tracker.clear();
    }
}

/// Uniqueness of local parameter ids within each kinetic law.
#[derive(Default)]
struct UniqueLocalParameterIds {
    tracker: IdTracker,
}

impl Constraint for UniqueLocalParameterIds {
    fn code(&self) -> u32 {
        code::DUPLICATE_LOCAL_PARAMETER_ID
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::IDENTIFIER
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        for law in model.get_all_elements(|n| n.element_kind() == ElementKind::KineticLaw) {
            for parameter in law.children_of_kind(ElementKind::Parameter) {
                if let Some(id) = parameter.id() {
                    if let Some(detail) = self.tracker.observe(id, parameter) {
                        ctx.fail(code::DUPLICATE_LOCAL_PARAMETER_ID, parameter, detail);
                    }
                }
            }
            self.tracker.clear();
        }
    }

    fn reset(&mut self) {
        self.tracker.clear();
    }
}

/// Uniqueness of `metaid` across the whole document.
#[derive(Default)]
struct UniqueMetaIds {
    tracker: IdTracker,
}

impl Constraint for UniqueMetaIds {
    fn code(&self) -> u32 {
        code::DUPLICATE_META_ID
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::IDENTIFIER
    }

    fn applies_to(&self, revision: Revision) -> bool {
        revision.level() >= 2
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let document = ctx.document();
        document.root().walk(&mut |node| {
            if let Some(meta_id) = node.meta_id() {
                if let Some(detail) = self.tracker.observe(meta_id, node) {
                    ctx.fail(code::DUPLICATE_META_ID, node, detail);
                }
            }
            true
        });
    }

    fn reset(&mut self) {
        self.tracker.clear();
    }
}

fn meta_id_syntax(node: &Node, _: &Document) -> Option<String> {
    let meta_id = node.meta_id()?;
    (!is_valid_meta_id(meta_id)).then(|| format!("  The metaid '{meta_id}' is not a valid XML ID."))
}

fn id_syntax(node: &Node, _: &Document) -> Option<String> {
    if node.element_kind() == ElementKind::UnitDefinition {
        return None;
    }
    let id = node.id()?;
    (!is_valid_sid(id)).then(|| format!("  The {} id '{id}' is not a valid SId.", node.type_name()))
}

fn unit_id_syntax(node: &Node, _: &Document) -> Option<String> {
    if node.element_kind() != ElementKind::UnitDefinition {
        return None;
    }
    let id = node.id()?;
    (!is_valid_sid(id)).then(|| format!("  The unit definition id '{id}' is not a valid UnitSId."))
}

/// Every units reference a node makes, with the attribute that holds it.
pub(crate) fn unit_references(node: &Node) -> Vec<(&'static str, &str)> {
    let slots: Vec<(&'static str, &Option<String>)> = match node.kind() {
        NodeKind::Model(m) => vec![
            ("substanceUnits", &m.substance_units),
            ("timeUnits", &m.time_units),
            ("volumeUnits", &m.volume_units),
            ("areaUnits", &m.area_units),
            ("lengthUnits", &m.length_units),
            ("extentUnits", &m.extent_units),
        ],
        NodeKind::Compartment(c) => vec![("units", &c.units)],
        NodeKind::Species(s) => vec![("substanceUnits", &s.substance_units)],
        NodeKind::Parameter(p) => vec![("units", &p.units)],
        NodeKind::KineticLaw(k) => vec![
            ("timeUnits", &k.time_units),
            ("substanceUnits", &k.substance_units),
        ],
        _ => Vec::new(),
    };
    slots
        .into_iter()
        .filter_map(|(attr, value)| value.as_deref().map(|v| (attr, v)))
        .collect()
}

/// Built-in unit names of Levels 1 and 2.
fn is_predefined_unit(name: &str, revision: Revision) -> bool {
    revision.level() < 3 && matches!(name, "substance" | "volume" | "area" | "length" | "time")
}

fn undefined_unit_reference(node: &Node, document: &Document) -> Option<String> {
    let revision = document.revision();
    let model = document.model()?;
    let undefined: Vec<String> = unit_references(node)
        .into_iter()
        .filter(|(_, units)| {
            !is_base_unit(units, revision)
                && !is_predefined_unit(units, revision)
                && !model
                    .children_of_kind(ElementKind::UnitDefinition)
                    .any(|u| u.id() == Some(*units))
        })
        .map(|(attr, units)| format!("  The {attr} '{units}' of the {} is undefined.", node.type_name()))
        .collect();
    (!undefined.is_empty()).then(|| undefined.join("\n"))
}

pub(super) fn constraints() -> Vec<Box<dyn Constraint>> {
    vec![
        Box::new(UniqueIds {
            code: code::DUPLICATE_COMPONENT_ID,
            scope: IdScope::Model,
            tracker: IdTracker::new(),
        }),
        Box::new(UniqueIds {
            code: code::DUPLICATE_UNIT_DEFINITION_ID,
            scope: IdScope::UnitDefinitions,
            tracker: IdTracker::new(),
        }),
        Box::new(UniqueLocalParameterIds::default()),
        Box::new(UniqueMetaIds::default()),
        Box::new(
            NodeRule::new(code::INVALID_META_ID_SYNTAX, CheckCategories::IDENTIFIER, meta_id_syntax)
                .only_in(|r| r.level() >= 2),
        ),
        Box::new(NodeRule::new(code::INVALID_ID_SYNTAX, CheckCategories::IDENTIFIER, id_syntax)),
        Box::new(NodeRule::new(
            code::INVALID_UNIT_ID_SYNTAX,
            CheckCategories::IDENTIFIER,
            unit_id_syntax,
        )),
        Box::new(NodeRule::new(
            code::UNDEFINED_UNIT_DEFINITION,
            CheckCategories::IDENTIFIER,
            undefined_unit_reference,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Validator;

    #[test]
    fn sid_syntax() {
        assert!(is_valid_sid("x0"));
        assert!(is_valid_sid("_k_1"));
        assert!(!is_valid_sid("0x"));
        assert!(!is_valid_sid("a-b"));
        assert!(!is_valid_sid(""));
    }

    #[test]
    fn meta_id_syntax_allows_dots_and_dashes() {
        assert!(is_valid_meta_id("meta.1-a"));
        assert!(!is_valid_meta_id("1meta"));
        assert!(!is_valid_meta_id("a b"));
    }

    #[test]
    fn tracker_reports_the_first_owner() {
        let mut first = Node::parameter("k", None);
        first.set_position(Some(12), Some(4));
        let second = Node::compartment("k");
        let mut tracker = IdTracker::new();
        assert_eq!(tracker.observe("k", &first), None);
        assert_eq!(
            tracker.observe("k", &second).as_deref(),
            Some("  The Compartment id 'k' conflicts with the previously defined Parameter id 'k' at line 12.")
        );
        assert_eq!(tracker.len(), 1);
    }

    fn model_with_duplicates() -> Document {
        let mut document = Document::with_revision(Revision::L3V2);
        let model = document.create_model("m");
        let mut compartment = Node::compartment("cell");
        compartment.set_meta_id("m1");
        compartment.set_position(Some(4), Some(5));
        model.add_child(compartment).expect("compartment");
        let mut species = Node::species("k", "cell");
        species.set_meta_id("m1");
        species.set_position(Some(8), Some(5));
        model.add_child(species).expect("species");
        model.add_child(Node::parameter("k", Some(1.0))).expect("parameter");
        document
    }

    #[test]
    fn one_validator_reports_the_same_failures_on_every_run() {
        let document = model_with_duplicates();
        let mut validator = Validator::new();
        validator.add_constraint(Box::new(UniqueIds {
            code: code::DUPLICATE_COMPONENT_ID,
            scope: IdScope::Model,
            tracker: IdTracker::new(),
        }));
        validator.add_constraint(Box::new(UniqueMetaIds::default()));

        let first = validator.run(&document);
        let second = validator.run(&document);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert!(first.iter().any(|r| r.code == code::DUPLICATE_COMPONENT_ID
            && r.message.contains("previously defined Species id 'k' at line 8")));
        assert!(first.iter().any(|r| r.code == code::DUPLICATE_META_ID
            && r.message.contains("at line 4")));
    }

    #[test]
    fn tracker_omits_unknown_lines() {
        let mut tracker = IdTracker::new();
        tracker.observe("k", &Node::parameter("k", None));
        let detail = tracker.observe("k", &Node::parameter("k", None));
        assert_eq!(
            detail.as_deref(),
            Some("  The Parameter id 'k' conflicts with the previously defined Parameter id 'k'.")
        );
        tracker.clear();
        assert!(tracker.is_empty());
    }
}
