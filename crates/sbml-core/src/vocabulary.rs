//! Element and list names per revision, and the canonical order of child
//! lists. Shared by the reader and the writer.

use crate::node::{ElementKind, Level1RuleTarget, NodeKind, ReferenceRole};
use sbml_schema::Revision;

/// A position in a parent's content model: either a wrapper list or a
/// single directly nested element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildSlot {
    Model,
    FunctionDefinitions,
    UnitDefinitions,
    SpeciesTypes,
    Compartments,
    Species,
    Parameters,
    InitialAssignments,
    Rules,
    Reactions,
    Units,
    Reactants,
    Products,
    Modifiers,
    KineticLaw,
    LocalParameters,
}

const DOCUMENT_SLOTS: &[ChildSlot] = &[ChildSlot::Model];
const MODEL_SLOTS: &[ChildSlot] = &[
    ChildSlot::FunctionDefinitions,
    ChildSlot::UnitDefinitions,
    ChildSlot::SpeciesTypes,
    ChildSlot::Compartments,
    ChildSlot::Species,
    ChildSlot::Parameters,
    ChildSlot::InitialAssignments,
    ChildSlot::Rules,
    ChildSlot::Reactions,
];
const UNIT_DEFINITION_SLOTS: &[ChildSlot] = &[ChildSlot::Units];
const REACTION_SLOTS: &[ChildSlot] = &[
    ChildSlot::Reactants,
    ChildSlot::Products,
    ChildSlot::Modifiers,
    ChildSlot::KineticLaw,
];
const KINETIC_LAW_SLOTS: &[ChildSlot] = &[ChildSlot::LocalParameters];

impl ChildSlot {
    /// Slots of `parent` in output order.
    pub fn for_parent(parent: ElementKind) -> &'static [ChildSlot] {
        match parent {
            ElementKind::Document => DOCUMENT_SLOTS,
            ElementKind::Model => MODEL_SLOTS,
            ElementKind::UnitDefinition => UNIT_DEFINITION_SLOTS,
            ElementKind::Reaction => REACTION_SLOTS,
            ElementKind::KineticLaw => KINETIC_LAW_SLOTS,
            _ => &[],
        }
    }

    /// Slot a child of `parent` belongs in, if `parent` accepts it.
    pub fn of(parent: ElementKind, child: &NodeKind) -> Option<ChildSlot> {
        let slot = match (parent, child) {
            (ElementKind::Document, NodeKind::Model(_)) => ChildSlot::Model,
            (ElementKind::Model, NodeKind::FunctionDefinition(_)) => ChildSlot::FunctionDefinitions,
            (ElementKind::Model, NodeKind::UnitDefinition) => ChildSlot::UnitDefinitions,
            (ElementKind::Model, NodeKind::SpeciesType) => ChildSlot::SpeciesTypes,
            (ElementKind::Model, NodeKind::Compartment(_)) => ChildSlot::Compartments,
            (ElementKind::Model, NodeKind::Species(_)) => ChildSlot::Species,
            (ElementKind::Model, NodeKind::Parameter(_)) => ChildSlot::Parameters,
            (ElementKind::Model, NodeKind::InitialAssignment(_)) => ChildSlot::InitialAssignments,
            (
                ElementKind::Model,
                NodeKind::AlgebraicRule(_) | NodeKind::AssignmentRule(_) | NodeKind::RateRule(_),
            ) => ChildSlot::Rules,
            (ElementKind::Model, NodeKind::Reaction(_)) => ChildSlot::Reactions,
            (ElementKind::UnitDefinition, NodeKind::Unit(_)) => ChildSlot::Units,
            (ElementKind::Reaction, NodeKind::SpeciesReference(r)) => match r.role {
                ReferenceRole::Reactant => ChildSlot::Reactants,
                ReferenceRole::Product => ChildSlot::Products,
            },
            (ElementKind::Reaction, NodeKind::ModifierSpeciesReference(_)) => ChildSlot::Modifiers,
            (ElementKind::Reaction, NodeKind::KineticLaw(_)) => ChildSlot::KineticLaw,
            (ElementKind::KineticLaw, NodeKind::Parameter(_)) => ChildSlot::LocalParameters,
            _ => return None,
        };
        Some(slot)
    }

    /// Whether the slot holds a single element rather than a list.
    pub fn is_singular(self) -> bool {
        matches!(self, ChildSlot::Model | ChildSlot::KineticLaw)
    }

    /// Wrapper element name; `None` for singular slots.
    pub fn list_name(self, revision: Revision) -> Option<&'static str> {
        let name = match self {
            ChildSlot::Model | ChildSlot::KineticLaw => return None,
            ChildSlot::FunctionDefinitions => "listOfFunctionDefinitions",
            ChildSlot::UnitDefinitions => "listOfUnitDefinitions",
            ChildSlot::SpeciesTypes => "listOfSpeciesTypes",
            ChildSlot::Compartments => "listOfCompartments",
            ChildSlot::Species => "listOfSpecies",
            ChildSlot::Parameters => "listOfParameters",
            ChildSlot::InitialAssignments => "listOfInitialAssignments",
            ChildSlot::Rules => "listOfRules",
            ChildSlot::Reactions => "listOfReactions",
            ChildSlot::Units => "listOfUnits",
            ChildSlot::Reactants => "listOfReactants",
            ChildSlot::Products => "listOfProducts",
            ChildSlot::Modifiers => "listOfModifiers",
            ChildSlot::LocalParameters if revision.level() >= 3 => "listOfLocalParameters",
            ChildSlot::LocalParameters => "listOfParameters",
        };
        Some(name)
    }

    /// Inverse of [`ChildSlot::list_name`] among the slots of `parent`.
    pub fn from_list_name(parent: ElementKind, name: &str) -> Option<ChildSlot> {
        ChildSlot::for_parent(parent)
            .iter()
            .copied()
            .find(|slot| {
                Revision::ALL
                    .iter()
                    .any(|rev| slot.list_name(*rev) == Some(name))
            })
    }
}

/// Element name of a core kind in `revision`.
///
/// `parent` distinguishes local parameters; rule names in Level 1 depend on
/// the target, which the writer resolves before asking.
pub fn element_name(
    kind: ElementKind,
    parent: Option<ElementKind>,
    l1_target: Option<Level1RuleTarget>,
    revision: Revision,
) -> &'static str {
    let l1 = revision.level() == 1;
    match kind {
        ElementKind::Document => "sbml",
        ElementKind::Model => "model",
        ElementKind::FunctionDefinition => "functionDefinition",
        ElementKind::UnitDefinition => "unitDefinition",
        ElementKind::Unit => "unit",
        ElementKind::Compartment => "compartment",
        ElementKind::SpeciesType => "speciesType",
        ElementKind::Species if revision == Revision::L1V1 => "specie",
        ElementKind::Species => "species",
        ElementKind::Parameter
            if parent == Some(ElementKind::KineticLaw) && revision.level() >= 3 =>
        {
            "localParameter"
        }
        ElementKind::Parameter => "parameter",
        ElementKind::InitialAssignment => "initialAssignment",
        ElementKind::AlgebraicRule => "algebraicRule",
        ElementKind::AssignmentRule | ElementKind::RateRule if l1 => {
            match l1_target.unwrap_or(Level1RuleTarget::Parameter) {
                Level1RuleTarget::Species if revision == Revision::L1V1 => {
                    "specieConcentrationRule"
                }
                Level1RuleTarget::Species => "speciesConcentrationRule",
                Level1RuleTarget::Compartment => "compartmentVolumeRule",
                Level1RuleTarget::Parameter => "parameterRule",
            }
        }
        ElementKind::AssignmentRule => "assignmentRule",
        ElementKind::RateRule => "rateRule",
        ElementKind::Reaction => "reaction",
        ElementKind::SpeciesReference if revision == Revision::L1V1 => "specieReference",
        ElementKind::SpeciesReference => "speciesReference",
        ElementKind::ModifierSpeciesReference => "modifierSpeciesReference",
        ElementKind::KineticLaw => "kineticLaw",
        ElementKind::Extension => "",
    }
}

/// Attribute naming a Level 1 rule's target.
pub fn level1_rule_variable_attribute(target: Level1RuleTarget, revision: Revision) -> &'static str {
    match target {
        Level1RuleTarget::Species if revision == Revision::L1V1 => "specie",
        Level1RuleTarget::Species => "species",
        Level1RuleTarget::Compartment => "compartment",
        Level1RuleTarget::Parameter => "name",
    }
}

/// Level 1 rule element names and the target each implies.
pub fn level1_rule_target(element: &str) -> Option<Level1RuleTarget> {
    match element {
        "specieConcentrationRule" | "speciesConcentrationRule" => Some(Level1RuleTarget::Species),
        "compartmentVolumeRule" => Some(Level1RuleTarget::Compartment),
        "parameterRule" => Some(Level1RuleTarget::Parameter),
        _ => None,
    }
}

/// Kind-tag of an element that may appear inside `slot`.
pub fn kind_for_element(slot: ChildSlot, element: &str) -> Option<ElementKind> {
    let kind = match (slot, element) {
        (ChildSlot::Model, "model") => ElementKind::Model,
        (ChildSlot::FunctionDefinitions, "functionDefinition") => ElementKind::FunctionDefinition,
        (ChildSlot::UnitDefinitions, "unitDefinition") => ElementKind::UnitDefinition,
        (ChildSlot::SpeciesTypes, "speciesType") => ElementKind::SpeciesType,
        (ChildSlot::Compartments, "compartment") => ElementKind::Compartment,
        (ChildSlot::Species, "species" | "specie") => ElementKind::Species,
        (ChildSlot::Parameters, "parameter") => ElementKind::Parameter,
        (ChildSlot::InitialAssignments, "initialAssignment") => ElementKind::InitialAssignment,
        (ChildSlot::Rules, "algebraicRule") => ElementKind::AlgebraicRule,
        (ChildSlot::Rules, "assignmentRule") => ElementKind::AssignmentRule,
        (ChildSlot::Rules, "rateRule") => ElementKind::RateRule,
        (ChildSlot::Rules, name) if level1_rule_target(name).is_some() => {
            ElementKind::AssignmentRule
        }
        (ChildSlot::Reactions, "reaction") => ElementKind::Reaction,
        (ChildSlot::Units, "unit") => ElementKind::Unit,
        (
            ChildSlot::Reactants | ChildSlot::Products,
            "speciesReference" | "specieReference",
        ) => ElementKind::SpeciesReference,
        (ChildSlot::Modifiers, "modifierSpeciesReference") => {
            ElementKind::ModifierSpeciesReference
        }
        (ChildSlot::KineticLaw, "kineticLaw") => ElementKind::KineticLaw,
        (ChildSlot::LocalParameters, "parameter" | "localParameter") => ElementKind::Parameter,
        _ => return None,
    };
    Some(kind)
}
