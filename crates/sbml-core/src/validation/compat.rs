//! Downgrade checks: content of the current document that a target
//! revision cannot express.

use super::{CheckCategories, Constraint, NodeRule};
use crate::document::Document;
use crate::math::{MathNode, Operator};
use crate::node::{ElementKind, Node, NodeKind};
use sbml_schema::{Revision, code};

fn kind_present(node: &Node, kind: ElementKind) -> Option<String> {
    (node.element_kind() == kind).then(|| {
        format!(
            "  The {} '{}' cannot be represented.",
            node.type_name(),
            node.id().unwrap_or_default()
        )
    })
}

fn function_definition(node: &Node, _: &Document) -> Option<String> {
    kind_present(node, ElementKind::FunctionDefinition)
}

fn initial_assignment(node: &Node, _: &Document) -> Option<String> {
    (node.element_kind() == ElementKind::InitialAssignment).then(|| {
        format!(
            "  The initial assignment to '{}' cannot be represented.",
            node.assigned_symbol().unwrap_or_default()
        )
    })
}

fn species_type(node: &Node, _: &Document) -> Option<String> {
    kind_present(node, ElementKind::SpeciesType)
}

fn non_integer_stoichiometry(node: &Node, _: &Document) -> Option<String> {
    let reference = node.as_species_reference()?;
    let stoichiometry = reference.stoichiometry();
    (stoichiometry.fract() != 0.0).then(|| {
        format!(
            "  The stoichiometry {stoichiometry} of '{}' is not an integer.",
            reference.species.as_deref().unwrap_or_default()
        )
    })
}

fn unit_multiplier_or_offset(node: &Node, _: &Document) -> Option<String> {
    let unit = node.as_unit()?;
    (unit.multiplier() != 1.0 || unit.offset() != 0.0)
        .then(|| format!("  The unit of kind '{}' has a multiplier or offset.", unit.kind))
}

fn unit_offset(node: &Node, _: &Document) -> Option<String> {
    let unit = node.as_unit()?;
    (unit.offset() != 0.0).then(|| format!("  The unit of kind '{}' has an offset.", unit.kind))
}

fn sbo_term(node: &Node, _: &Document) -> Option<String> {
    let term = node.sbo_term()?;
    Some(format!(
        "  The {} carries SBO term {term:07}.",
        node.type_name()
    ))
}

fn model_units(node: &Node, _: &Document) -> Option<String> {
    match node.kind() {
        NodeKind::Model(m) if m.has_level3_attributes() => {
            Some("  The model declares model-wide units or a conversion factor.".to_string())
        }
        NodeKind::Species(s) if s.conversion_factor.is_some() => Some(format!(
            "  The species '{}' declares a conversion factor.",
            node.id().unwrap_or_default()
        )),
        _ => None,
    }
}

fn species_reference_id(node: &Node, _: &Document) -> Option<String> {
    if node.element_kind() != ElementKind::SpeciesReference {
        return None;
    }
    let id = node.id()?;
    Some(format!("  The species reference '{id}' has an id."))
}

fn kinetic_law_time_units(node: &Node, _: &Document) -> Option<String> {
    let units = node.as_kinetic_law()?.time_units.as_deref()?;
    Some(format!("  The kinetic law declares timeUnits '{units}'."))
}

fn kinetic_law_substance_units(node: &Node, _: &Document) -> Option<String> {
    let units = node.as_kinetic_law()?.substance_units.as_deref()?;
    Some(format!("  The kinetic law declares substanceUnits '{units}'."))
}

fn l3v2_math(node: &Node, _: &Document) -> Option<String> {
    let mut found: Option<Operator> = None;
    node.math()?.ast().walk(&mut |m| {
        if let MathNode::Apply { op, .. } = m {
            if found.is_none() && op.is_l3v2_only() {
                found = Some(*op);
            }
        }
    });
    found.map(|op| {
        format!(
            "  The math of the {} uses '{}'.",
            node.type_name(),
            op.mathml_name()
        )
    })
}

type Test = fn(&Node, &Document) -> Option<String>;

/// Checks for downgrading a document to `target`, in registration order.
pub fn compatibility_constraints(target: Revision) -> Vec<Box<dyn Constraint>> {
    let rules: Vec<(u32, Test)> = match target {
        Revision::L1V1 | Revision::L1V2 => vec![
            (code::NO_FUNCTION_DEFINITIONS_IN_L1, function_definition),
            (code::NO_INITIAL_ASSIGNMENTS_IN_L1, initial_assignment),
            (code::NO_SPECIES_TYPES_IN_L1, species_type),
            (code::NO_NON_INTEGER_STOICHIOMETRY_IN_L1, non_integer_stoichiometry),
            (code::NO_UNIT_MULTIPLIERS_OR_OFFSETS_IN_L1, unit_multiplier_or_offset),
            (code::NO_SBO_TERMS_IN_L1, sbo_term),
            (code::NO_MODEL_UNITS_IN_L1, model_units),
        ],
        Revision::L2V1 => vec![
            (code::NO_INITIAL_ASSIGNMENTS_IN_L2V1, initial_assignment),
            (code::NO_SPECIES_TYPES_IN_L2V1, species_type),
            (code::NO_SBO_TERMS_IN_L2V1, sbo_term),
            (code::NO_ID_ON_SPECIES_REFERENCE_IN_L2V1, species_reference_id),
            (code::NO_MODEL_UNITS_IN_L2V1, model_units),
        ],
        Revision::L2V2 => vec![
            (code::NO_UNIT_OFFSET_IN_L2V2, unit_offset),
            (code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V2, kinetic_law_time_units),
            (code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V2, kinetic_law_substance_units),
            (code::NO_MODEL_UNITS_IN_L2V2, model_units),
        ],
        Revision::L2V3 => vec![
            (code::NO_UNIT_OFFSET_IN_L2V3, unit_offset),
            (code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V3, kinetic_law_time_units),
            (code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V3, kinetic_law_substance_units),
            (code::NO_MODEL_UNITS_IN_L2V3, model_units),
        ],
        Revision::L2V4 => vec![
            (code::NO_UNIT_OFFSET_IN_L2V4, unit_offset),
            (code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V4, kinetic_law_time_units),
            (code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V4, kinetic_law_substance_units),
            (code::NO_MODEL_UNITS_IN_L2V4, model_units),
        ],
        Revision::L2V5 => vec![
            (code::NO_UNIT_OFFSET_IN_L2V5, unit_offset),
            (code::NO_KINETIC_LAW_TIME_UNITS_IN_L2V5, kinetic_law_time_units),
            (code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L2V5, kinetic_law_substance_units),
            (code::NO_MODEL_UNITS_IN_L2V5, model_units),
        ],
        Revision::L3V1 => vec![
            (code::NO_SPECIES_TYPES_IN_L3V1, species_type),
            (code::NO_UNIT_OFFSET_IN_L3V1, unit_offset),
            (code::NO_KINETIC_LAW_TIME_UNITS_IN_L3V1, kinetic_law_time_units),
            (code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L3V1, kinetic_law_substance_units),
            (code::NO_L3V2_MATH_IN_L3V1, l3v2_math),
        ],
        Revision::L3V2 => vec![
            (code::NO_SPECIES_TYPES_IN_L3V2, species_type),
            (code::NO_UNIT_OFFSET_IN_L3V2, unit_offset),
            (code::NO_KINETIC_LAW_TIME_UNITS_IN_L3V2, kinetic_law_time_units),
            (code::NO_KINETIC_LAW_SUBSTANCE_UNITS_IN_L3V2, kinetic_law_substance_units),
        ],
    };
    rules
        .into_iter()
        .map(|(code, test)| {
            Box::new(NodeRule::new(code, CheckCategories::NONE, test)) as Box<dyn Constraint>
        })
        .collect()
}
