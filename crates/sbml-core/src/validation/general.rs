//! General consistency: references between components and structural
//! requirements of the core elements.

use super::{CheckCategories, Constraint, ConstraintContext, NodeRule};
use crate::document::Document;
use crate::math::MathNode;
use crate::node::{ElementKind, Node, NodeKind};
use sbml_schema::{Revision, code};
use std::collections::HashMap;

fn before_l3v2(revision: Revision) -> bool {
    revision < Revision::L3V2
}

/// Model-wide component with `id`, if any.
fn component<'a>(document: &'a Document, id: &str) -> Option<&'a Node> {
    document.model()?.get_element_by_sid(id)
}

fn refers_to(document: &Document, id: &str, kinds: &[ElementKind]) -> bool {
    component(document, id).is_some_and(|n| kinds.contains(&n.element_kind()))
}

struct MissingModel;

impl Constraint for MissingModel {
    fn code(&self) -> u32 {
        code::MISSING_MODEL
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::GENERAL
    }

    fn applies_to(&self, revision: Revision) -> bool {
        before_l3v2(revision)
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        if ctx.model().is_none() {
            ctx.fail_at(code::MISSING_MODEL, None, None, "");
        }
    }
}

fn function_math_is_lambda(node: &Node, _: &Document) -> Option<String> {
    if node.element_kind() != ElementKind::FunctionDefinition {
        return None;
    }
    match node.math()?.ast() {
        MathNode::Lambda { .. } => None,
        _ => Some(format!(
            "  The function definition '{}' does not contain a lambda.",
            node.id().unwrap_or_default()
        )),
    }
}

fn unit_definition_has_units(node: &Node, _: &Document) -> Option<String> {
    (node.element_kind() == ElementKind::UnitDefinition && node.num_children() == 0).then(|| {
        format!(
            "  The unit definition '{}' has no units.",
            node.id().unwrap_or_default()
        )
    })
}

fn species_compartment(node: &Node, document: &Document) -> Option<String> {
    let compartment = node.as_species()?.compartment.as_deref()?;
    (!refers_to(document, compartment, &[ElementKind::Compartment])).then(|| {
        format!(
            "  The compartment '{compartment}' of species '{}' is undefined.",
            node.id().unwrap_or_default()
        )
    })
}

fn initial_assignment_symbol(node: &Node, document: &Document) -> Option<String> {
    if node.element_kind() != ElementKind::InitialAssignment {
        return None;
    }
    let symbol = node.assigned_symbol()?;
    let targets = [
        ElementKind::Compartment,
        ElementKind::Species,
        ElementKind::Parameter,
        ElementKind::SpeciesReference,
    ];
    (!refers_to(document, symbol, &targets))
        .then(|| format!("  The symbol '{symbol}' does not name a compartment, species, parameter or species reference."))
}

/// A symbol may be the target of one initial assignment only.
struct SingleInitialAssignment;

impl Constraint for SingleInitialAssignment {
    fn code(&self) -> u32 {
        code::MULTIPLE_INIT_ASSIGNMENTS
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::GENERAL
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for assignment in model.children_of_kind(ElementKind::InitialAssignment) {
            let Some(symbol) = assignment.assigned_symbol() else {
                continue;
            };
            let count = seen.entry(symbol).or_default();
            *count += 1;
            if *count == 2 {
                ctx.fail(
                    code::MULTIPLE_INIT_ASSIGNMENTS,
                    assignment,
                    format!("  The symbol '{symbol}' has more than one initial assignment."),
                );
            }
        }
    }
}

fn rule_variable(node: &Node, document: &Document, kind: ElementKind) -> Option<String> {
    if node.element_kind() != kind {
        return None;
    }
    let variable = node.assigned_symbol()?;
    let mut targets = vec![
        ElementKind::Compartment,
        ElementKind::Species,
        ElementKind::Parameter,
    ];
    if document.revision().level() >= 3 {
        targets.push(ElementKind::SpeciesReference);
    }
    (!refers_to(document, variable, &targets)).then(|| {
        format!("  The variable '{variable}' does not name a compartment, species or parameter.")
    })
}

fn assignment_rule_variable(node: &Node, document: &Document) -> Option<String> {
    rule_variable(node, document, ElementKind::AssignmentRule)
}

fn rate_rule_variable(node: &Node, document: &Document) -> Option<String> {
    rule_variable(node, document, ElementKind::RateRule)
}

fn is_constant(node: &Node) -> bool {
    match node.kind() {
        NodeKind::Compartment(c) => c.constant(),
        NodeKind::Species(s) => s.constant(),
        NodeKind::Parameter(p) => p.constant(),
        NodeKind::SpeciesReference(r) => r.constant.unwrap_or(false),
        _ => false,
    }
}

fn rule_assigns_constant(node: &Node, document: &Document) -> Option<String> {
    if !matches!(
        node.element_kind(),
        ElementKind::AssignmentRule | ElementKind::RateRule
    ) {
        return None;
    }
    let variable = node.assigned_symbol()?;
    let target = component(document, variable)?;
    is_constant(target).then(|| {
        format!(
            "  The {} '{variable}' is constant and cannot be the variable of a rule.",
            target.type_name()
        )
    })
}

fn reaction_has_participants(node: &Node, _: &Document) -> Option<String> {
    if node.element_kind() != ElementKind::Reaction {
        return None;
    }
    let empty = node
        .children_of_kind(ElementKind::SpeciesReference)
        .next()
        .is_none();
    empty.then(|| {
        format!(
            "  The reaction '{}' has no reactants or products.",
            node.id().unwrap_or_default()
        )
    })
}

fn species_reference_target(node: &Node, document: &Document) -> Option<String> {
    let species = node.as_species_reference()?.species.as_deref()?;
    (!refers_to(document, species, &[ElementKind::Species]))
        .then(|| format!("  The species '{species}' is undefined."))
}

fn modifier_target(node: &Node, document: &Document) -> Option<String> {
    let species = node.as_modifier()?.species.as_deref()?;
    (!refers_to(document, species, &[ElementKind::Species]))
        .then(|| format!("  The modifier species '{species}' is undefined."))
}

pub(super) fn constraints() -> Vec<Box<dyn Constraint>> {
    let general = CheckCategories::GENERAL;
    vec![
        Box::new(MissingModel),
        Box::new(NodeRule::new(code::FUNCTION_DEF_MATH_NOT_LAMBDA, general, function_math_is_lambda)),
        Box::new(
            NodeRule::new(code::EMPTY_LIST_OF_UNITS, general, unit_definition_has_units)
                .only_in(before_l3v2),
        ),
        Box::new(NodeRule::new(code::INVALID_SPECIES_COMPARTMENT_REF, general, species_compartment)),
        Box::new(NodeRule::new(code::INVALID_INIT_ASSIGN_SYMBOL, general, initial_assignment_symbol)),
        Box::new(SingleInitialAssignment),
        Box::new(NodeRule::new(code::INVALID_ASSIGN_RULE_VARIABLE, general, assignment_rule_variable)),
        Box::new(NodeRule::new(code::INVALID_RATE_RULE_VARIABLE, general, rate_rule_variable)),
        Box::new(
            NodeRule::new(code::ASSIGN_RULE_TO_CONSTANT, general, rule_assigns_constant)
                .only_in(|r| r.level() >= 2),
        ),
        Box::new(
            NodeRule::new(code::NO_REACTANTS_OR_PRODUCTS, general, reaction_has_participants)
                .only_in(before_l3v2),
        ),
        Box::new(NodeRule::new(code::INVALID_SPECIES_REFERENCE, general, species_reference_target)),
        Box::new(NodeRule::new(code::INVALID_MODIFIER_REFERENCE, general, modifier_target)),
    ]
}
