//! Internal consistency: attributes a revision requires must be set.

use super::{CheckCategories, Constraint, NodeRule};
use crate::document::Document;
use crate::node::{ElementKind, Node, NodeKind};
use sbml_schema::{Revision, code};

/// Names of required attributes that `node` leaves unset in `revision`.
pub fn missing_attributes(node: &Node, revision: Revision) -> Vec<&'static str> {
    let l3 = revision.level() >= 3;
    let mut missing = Vec::new();
    let mut require = |name: &'static str, present: bool| {
        if !present {
            missing.push(name);
        }
    };
    let id_attribute = if revision.level() == 1 { "name" } else { "id" };
    match node.kind() {
        NodeKind::FunctionDefinition(f) => {
            require("id", node.id().is_some());
            require("math", f.math.is_some());
        }
        NodeKind::UnitDefinition => require(id_attribute, node.id().is_some()),
        NodeKind::Unit(u) => {
            require("kind", !u.kind.is_empty());
            if l3 {
                require("exponent", u.exponent.is_some());
                require("scale", u.scale.is_some());
                require("multiplier", u.multiplier.is_some());
            }
        }
        NodeKind::Compartment(c) => {
            require(id_attribute, node.id().is_some());
            if l3 {
                require("constant", c.constant.is_some());
            }
        }
        NodeKind::SpeciesType => require("id", node.id().is_some()),
        NodeKind::Species(s) => {
            require(id_attribute, node.id().is_some());
            require("compartment", s.compartment.is_some());
            if l3 {
                require("hasOnlySubstanceUnits", s.has_only_substance_units.is_some());
                require("boundaryCondition", s.boundary_condition.is_some());
                require("constant", s.constant.is_some());
            }
        }
        NodeKind::Parameter(p) => {
            require(id_attribute, node.id().is_some());
            if l3 && node.parent_kind() != Some(ElementKind::KineticLaw) {
                require("constant", p.constant.is_some());
            }
        }
        NodeKind::InitialAssignment(a) => {
            require("symbol", a.symbol.is_some());
            require("math", a.math.is_some());
        }
        NodeKind::AssignmentRule(r) | NodeKind::RateRule(r) => {
            require("variable", r.variable.is_some());
            require("math", r.math.is_some());
        }
        NodeKind::AlgebraicRule(r) => require("math", r.math.is_some()),
        NodeKind::Reaction(r) => {
            require(id_attribute, node.id().is_some());
            if l3 {
                require("reversible", r.reversible.is_some());
                if revision == Revision::L3V1 {
                    require("fast", r.fast.is_some());
                }
            }
        }
        NodeKind::SpeciesReference(r) => {
            require("species", r.species.is_some());
            if l3 {
                require("constant", r.constant.is_some());
            }
        }
        NodeKind::ModifierSpeciesReference(m) => require("species", m.species.is_some()),
        NodeKind::KineticLaw(k) if !l3 => require("math", k.math.is_some()),
        _ => {}
    }
    missing
}

fn required_attributes(node: &Node, document: &Document) -> Option<String> {
    let missing = missing_attributes(node, document.revision());
    if missing.is_empty() {
        return None;
    }
    let names: Vec<String> = missing.iter().map(|m| format!("'{m}'")).collect();
    Some(format!(
        "  The {} is missing required attribute(s) {}.",
        node.type_name(),
        names.join(", ")
    ))
}

/// Constraints run by an internal consistency check.
pub fn internal_constraints() -> Vec<Box<dyn Constraint>> {
    vec![Box::new(NodeRule::new(
        code::MISSING_REQUIRED_ATTRIBUTE,
        CheckCategories::INTERNAL,
        required_attributes,
    ))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Species, Unit};

    #[test]
    fn level3_requires_explicit_flags() {
        let species = Node::species("s", "cell");
        assert!(missing_attributes(&species, Revision::L2V4).is_empty());
        assert_eq!(
            missing_attributes(&species, Revision::L3V2),
            vec!["hasOnlySubstanceUnits", "boundaryCondition", "constant"]
        );
    }

    #[test]
    fn units_need_a_kind() {
        let unit = Node::unit(Unit::new(""));
        assert_eq!(missing_attributes(&unit, Revision::L2V4), vec!["kind"]);
        let unit = Node::unit(Unit::with("mole", 1.0, 0));
        assert_eq!(missing_attributes(&unit, Revision::L3V1), vec!["multiplier"]);
    }

    #[test]
    fn level1_names_the_identifier_attribute_name() {
        let species = Node::new(Species::default());
        assert_eq!(
            missing_attributes(&species, Revision::L1V2),
            vec!["name", "compartment"]
        );
    }
}
