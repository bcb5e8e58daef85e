//! The closed set of core element kinds and their payloads.

use crate::extension::ExtensionElement;
use crate::math::Math;
use sbml_schema::Revision;
use std::any::Any;
use std::fmt;

/// Copyable tag naming a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Document,
    Model,
    FunctionDefinition,
    UnitDefinition,
    Unit,
    Compartment,
    SpeciesType,
    Species,
    Parameter,
    InitialAssignment,
    AlgebraicRule,
    AssignmentRule,
    RateRule,
    Reaction,
    SpeciesReference,
    ModifierSpeciesReference,
    KineticLaw,
    Extension,
}

impl ElementKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ElementKind::Document => "SBMLDocument",
            ElementKind::Model => "Model",
            ElementKind::FunctionDefinition => "FunctionDefinition",
            ElementKind::UnitDefinition => "UnitDefinition",
            ElementKind::Unit => "Unit",
            ElementKind::Compartment => "Compartment",
            ElementKind::SpeciesType => "SpeciesType",
            ElementKind::Species => "Species",
            ElementKind::Parameter => "Parameter",
            ElementKind::InitialAssignment => "InitialAssignment",
            ElementKind::AlgebraicRule => "AlgebraicRule",
            ElementKind::AssignmentRule => "AssignmentRule",
            ElementKind::RateRule => "RateRule",
            ElementKind::Reaction => "Reaction",
            ElementKind::SpeciesReference => "SpeciesReference",
            ElementKind::ModifierSpeciesReference => "ModifierSpeciesReference",
            ElementKind::KineticLaw => "KineticLaw",
            ElementKind::Extension => "Extension",
        }
    }

    /// Whether the kind is part of the core vocabulary of `revision`.
    pub fn exists_in(self, revision: Revision) -> bool {
        match self {
            ElementKind::FunctionDefinition | ElementKind::ModifierSpeciesReference => {
                revision.level() >= 2
            }
            ElementKind::SpeciesType => (Revision::L2V2..=Revision::L2V5).contains(&revision),
            ElementKind::InitialAssignment => revision >= Revision::L2V2,
            _ => true,
        }
    }

    pub fn is_rule(self) -> bool {
        matches!(
            self,
            ElementKind::AlgebraicRule | ElementKind::AssignmentRule | ElementKind::RateRule
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Namespace in which an element's `id` must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdScope {
    /// Model-wide SId namespace.
    Model,
    UnitDefinitions,
    /// Parameters local to one kinetic law.
    LocalParameters,
    Unscoped,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub substance_units: Option<String>,
    pub time_units: Option<String>,
    pub volume_units: Option<String>,
    pub area_units: Option<String>,
    pub length_units: Option<String>,
    pub extent_units: Option<String>,
    pub conversion_factor: Option<String>,
}

impl Model {
    pub fn has_level3_attributes(&self) -> bool {
        self.substance_units.is_some()
            || self.time_units.is_some()
            || self.volume_units.is_some()
            || self.area_units.is_some()
            || self.length_units.is_some()
            || self.extent_units.is_some()
            || self.conversion_factor.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionDefinition {
    pub math: Option<Math>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unit {
    pub kind: String,
    pub exponent: Option<f64>,
    pub scale: Option<i32>,
    pub multiplier: Option<f64>,
    pub offset: Option<f64>,
}

impl Unit {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with(kind: impl Into<String>, exponent: f64, scale: i32) -> Self {
        Self {
            kind: kind.into(),
            exponent: Some(exponent),
            scale: Some(scale),
            ..Self::default()
        }
    }

    pub fn exponent(&self) -> f64 {
        self.exponent.unwrap_or(1.0)
    }

    pub fn scale(&self) -> i32 {
        self.scale.unwrap_or(0)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier.unwrap_or(1.0)
    }

    pub fn offset(&self) -> f64 {
        self.offset.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compartment {
    pub size: Option<f64>,
    pub units: Option<String>,
    pub outside: Option<String>,
    pub spatial_dimensions: Option<f64>,
    pub constant: Option<bool>,
}

impl Compartment {
    pub fn constant(&self) -> bool {
        self.constant.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Species {
    pub compartment: Option<String>,
    pub initial_amount: Option<f64>,
    pub initial_concentration: Option<f64>,
    pub substance_units: Option<String>,
    pub has_only_substance_units: Option<bool>,
    pub boundary_condition: Option<bool>,
    pub charge: Option<i32>,
    pub constant: Option<bool>,
    pub species_type: Option<String>,
    pub conversion_factor: Option<String>,
}

impl Species {
    pub fn constant(&self) -> bool {
        self.constant.unwrap_or(false)
    }

    pub fn boundary_condition(&self) -> bool {
        self.boundary_condition.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    pub value: Option<f64>,
    pub units: Option<String>,
    pub constant: Option<bool>,
}

impl Parameter {
    pub fn constant(&self) -> bool {
        self.constant.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialAssignment {
    pub symbol: Option<String>,
    pub math: Option<Math>,
}

/// What a Level 1 rule element names as its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level1RuleTarget {
    Species,
    Compartment,
    Parameter,
}

/// Payload shared by the three rule kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rule {
    pub variable: Option<String>,
    pub math: Option<Math>,
    /// Set when read from, or destined for, a Level 1 rule element.
    pub level1_target: Option<Level1RuleTarget>,
    /// `units` of a Level 1 parameter rule; written only in Level 1.
    pub level1_units: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
    pub reversible: Option<bool>,
    pub fast: Option<bool>,
    pub compartment: Option<String>,
}

impl Reaction {
    pub fn reversible(&self) -> bool {
        self.reversible.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReferenceRole {
    #[default]
    Reactant,
    Product,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesReference {
    pub role: ReferenceRole,
    pub species: Option<String>,
    pub stoichiometry: Option<f64>,
    pub denominator: Option<i32>,
    pub constant: Option<bool>,
}

impl SpeciesReference {
    pub fn stoichiometry(&self) -> f64 {
        self.stoichiometry.unwrap_or(1.0)
    }

    pub fn denominator(&self) -> i32 {
        self.denominator.unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModifierSpeciesReference {
    pub species: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KineticLaw {
    pub math: Option<Math>,
    pub time_units: Option<String>,
    pub substance_units: Option<String>,
}

/// A package-defined element living in the tree.
pub struct ExtensionNode(Box<dyn ExtensionElement>);

impl ExtensionNode {
    pub fn new(element: impl ExtensionElement + 'static) -> Self {
        Self(Box::new(element))
    }

    pub fn from_box(element: Box<dyn ExtensionElement>) -> Self {
        Self(element)
    }

    pub fn element(&self) -> &dyn ExtensionElement {
        self.0.as_ref()
    }

    pub fn element_mut(&mut self) -> &mut dyn ExtensionElement {
        self.0.as_mut()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_any_mut().downcast_mut::<T>()
    }
}

impl Clone for ExtensionNode {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl fmt::Debug for ExtensionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind-specific payload of a [`Node`](super::Node).
#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Model(Model),
    FunctionDefinition(FunctionDefinition),
    UnitDefinition,
    Unit(Unit),
    Compartment(Compartment),
    SpeciesType,
    Species(Species),
    Parameter(Parameter),
    InitialAssignment(InitialAssignment),
    AlgebraicRule(Rule),
    AssignmentRule(Rule),
    RateRule(Rule),
    Reaction(Reaction),
    SpeciesReference(SpeciesReference),
    ModifierSpeciesReference(ModifierSpeciesReference),
    KineticLaw(KineticLaw),
    Extension(ExtensionNode),
}

impl NodeKind {
    pub fn element_kind(&self) -> ElementKind {
        match self {
            NodeKind::Document => ElementKind::Document,
            NodeKind::Model(_) => ElementKind::Model,
            NodeKind::FunctionDefinition(_) => ElementKind::FunctionDefinition,
            NodeKind::UnitDefinition => ElementKind::UnitDefinition,
            NodeKind::Unit(_) => ElementKind::Unit,
            NodeKind::Compartment(_) => ElementKind::Compartment,
            NodeKind::SpeciesType => ElementKind::SpeciesType,
            NodeKind::Species(_) => ElementKind::Species,
            NodeKind::Parameter(_) => ElementKind::Parameter,
            NodeKind::InitialAssignment(_) => ElementKind::InitialAssignment,
            NodeKind::AlgebraicRule(_) => ElementKind::AlgebraicRule,
            NodeKind::AssignmentRule(_) => ElementKind::AssignmentRule,
            NodeKind::RateRule(_) => ElementKind::RateRule,
            NodeKind::Reaction(_) => ElementKind::Reaction,
            NodeKind::SpeciesReference(_) => ElementKind::SpeciesReference,
            NodeKind::ModifierSpeciesReference(_) => ElementKind::ModifierSpeciesReference,
            NodeKind::KineticLaw(_) => ElementKind::KineticLaw,
            NodeKind::Extension(_) => ElementKind::Extension,
        }
    }

    /// The expression slot of kinds that carry one.
    pub fn math(&self) -> Option<&Math> {
        match self {
            NodeKind::FunctionDefinition(v) => v.math.as_ref(),
            NodeKind::InitialAssignment(v) => v.math.as_ref(),
            NodeKind::AlgebraicRule(v) | NodeKind::AssignmentRule(v) | NodeKind::RateRule(v) => {
                v.math.as_ref()
            }
            NodeKind::KineticLaw(v) => v.math.as_ref(),
            _ => None,
        }
    }

    pub fn math_slot(&mut self) -> Option<&mut Option<Math>> {
        match self {
            NodeKind::FunctionDefinition(v) => Some(&mut v.math),
            NodeKind::InitialAssignment(v) => Some(&mut v.math),
            NodeKind::AlgebraicRule(v) | NodeKind::AssignmentRule(v) | NodeKind::RateRule(v) => {
                Some(&mut v.math)
            }
            NodeKind::KineticLaw(v) => Some(&mut v.math),
            _ => None,
        }
    }

    pub fn rule(&self) -> Option<&Rule> {
        match self {
            NodeKind::AlgebraicRule(v) | NodeKind::AssignmentRule(v) | NodeKind::RateRule(v) => {
                Some(v)
            }
            _ => None,
        }
    }

    pub fn rule_mut(&mut self) -> Option<&mut Rule> {
        match self {
            NodeKind::AlgebraicRule(v) | NodeKind::AssignmentRule(v) | NodeKind::RateRule(v) => {
                Some(v)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_limited_to_their_revisions() {
        assert!(!ElementKind::FunctionDefinition.exists_in(Revision::L1V2));
        assert!(ElementKind::FunctionDefinition.exists_in(Revision::L2V1));
        assert!(!ElementKind::SpeciesType.exists_in(Revision::L2V1));
        assert!(ElementKind::SpeciesType.exists_in(Revision::L2V4));
        assert!(!ElementKind::SpeciesType.exists_in(Revision::L3V1));
        assert!(!ElementKind::InitialAssignment.exists_in(Revision::L2V1));
        assert!(ElementKind::Species.exists_in(Revision::L1V1));
    }

    #[test]
    fn unset_attributes_read_as_defaults() {
        let unit = Unit::new("second");
        assert_eq!(unit.exponent(), 1.0);
        assert_eq!(unit.scale(), 0);
        assert!(Parameter::default().constant());
        assert!(!Species::default().constant());
        assert!(Reaction::default().reversible());
        assert_eq!(SpeciesReference::default().denominator(), 1);
    }

    #[test]
    fn rule_kinds_share_a_payload() {
        let mut kind = NodeKind::RateRule(Rule {
            variable: Some("x".to_string()),
            ..Rule::default()
        });
        assert!(kind.element_kind().is_rule());
        assert_eq!(kind.rule().and_then(|r| r.variable.as_deref()), Some("x"));
        assert!(kind.math_slot().is_some());
        assert!(NodeKind::Unit(Unit::new("mole")).math().is_none());
    }
}
