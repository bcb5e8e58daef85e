//! Unit consistency.
//!
//! Units are compared dimensionally: every base unit kind is its own
//! dimension, exponents add under multiplication, and scale, multiplier
//! and offset are ignored. Bare numbers have undeclared units and never
//! cause a mismatch; an expression whose units cannot be derived is not
//! checked.

use super::{CheckCategories, Constraint, ConstraintContext, expressions};
use crate::math::{MathNode, Operator};
use crate::node::{ElementKind, Node, NodeKind};
use sbml_schema::{Revision, code};
use std::collections::BTreeMap;
use std::fmt;

/// Unit kinds usable without a definition.
pub const BASE_UNITS: [&str; 36] = [
    "ampere", "avogadro", "becquerel", "candela", "celsius", "coulomb", "dimensionless", "farad",
    "gram", "gray", "henry", "hertz", "item", "joule", "katal", "kelvin", "kilogram", "liter",
    "litre", "lumen", "lux", "meter", "metre", "mole", "newton", "ohm", "pascal", "radian",
    "second", "siemens", "sievert", "steradian", "tesla", "volt", "watt", "weber",
];

/// Whether `name` is a base unit kind in `revision`.
pub fn is_base_unit(name: &str, revision: Revision) -> bool {
    match name {
        "avogadro" => revision.level() >= 3,
        "celsius" => revision <= Revision::L2V1,
        "liter" | "meter" => revision.level() == 1,
        _ => BASE_UNITS.contains(&name),
    }
}

/// Product of base unit kinds raised to exponents. The empty product is
/// dimensionless.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedUnits(BTreeMap<String, f64>);

impl DerivedUnits {
    const EPSILON: f64 = 1e-9;

    pub fn dimensionless() -> Self {
        Self::default()
    }

    pub fn base(kind: &str) -> Self {
        let kind = match kind {
            "liter" => "litre",
            "meter" => "metre",
            "dimensionless" => return Self::dimensionless(),
            other => other,
        };
        Self(BTreeMap::from([(kind.to_string(), 1.0)]))
    }

    pub fn is_dimensionless(&self) -> bool {
        self.0.is_empty()
    }

    pub fn exponent_of(&self, kind: &str) -> f64 {
        self.0.get(kind).copied().unwrap_or(0.0)
    }

    pub fn times(&self, other: &Self) -> Self {
        self.combine(other, 1.0)
    }

    pub fn divided_by(&self, other: &Self) -> Self {
        self.combine(other, -1.0)
    }

    pub fn pow(&self, exponent: f64) -> Self {
        let mut result = Self::default();
        for (kind, e) in &self.0 {
            result.add(kind, e * exponent);
        }
        result
    }

    /// Dimensional equality, tolerant of rounding in exponents.
    pub fn same_as(&self, other: &Self) -> bool {
        self.divided_by(other).is_dimensionless()
    }

    fn combine(&self, other: &Self, sign: f64) -> Self {
        let mut result = self.clone();
        for (kind, e) in &other.0 {
            result.add(kind, sign * e);
        }
        result
    }

    fn add(&mut self, kind: &str, exponent: f64) {
        let total = self.exponent_of(kind) + exponent;
        if total.abs() < Self::EPSILON {
            self.0.remove(kind);
        } else {
            self.0.insert(kind.to_string(), total);
        }
    }
}

impl fmt::Display for DerivedUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("dimensionless");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(kind, e)| {
                if (e - 1.0).abs() < Self::EPSILON {
                    kind.clone()
                } else {
                    format!("{kind}^{e}")
                }
            })
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// Derives the units of identifiers and expressions of one model.
pub struct UnitResolver<'a> {
    model: &'a Node,
    revision: Revision,
}

impl<'a> UnitResolver<'a> {
    pub fn new(model: &'a Node, revision: Revision) -> Self {
        Self { model, revision }
    }

    fn model_attribute(&self, pick: fn(&crate::node::Model) -> Option<&String>) -> Option<&'a str> {
        match self.model.kind() {
            NodeKind::Model(m) => pick(m).map(String::as_str),
            _ => None,
        }
    }

    /// Units named by a `units`-style attribute value.
    pub fn units_of_reference(&self, name: &str) -> Option<DerivedUnits> {
        if let Some(definition) = self
            .model
            .children_of_kind(ElementKind::UnitDefinition)
            .find(|u| u.id() == Some(name))
        {
            let mut units = DerivedUnits::dimensionless();
            for unit in definition.children() {
                let unit = unit.as_unit()?;
                units = units.times(&DerivedUnits::base(&unit.kind).pow(unit.exponent()));
            }
            return Some(units);
        }
        if is_base_unit(name, self.revision) {
            return Some(DerivedUnits::base(name));
        }
        if self.revision.level() < 3 {
            return match name {
                "substance" => Some(DerivedUnits::base("mole")),
                "volume" => Some(DerivedUnits::base("litre")),
                "area" => Some(DerivedUnits::base("metre").pow(2.0)),
                "length" => Some(DerivedUnits::base("metre")),
                "time" => Some(DerivedUnits::base("second")),
                _ => None,
            };
        }
        None
    }

    /// Units of a Level 1/2 built-in quantity, or of the matching model
    /// attribute in Level 3.
    fn default_units(&self, builtin: &str, pick: fn(&crate::node::Model) -> Option<&String>) -> Option<DerivedUnits> {
        if self.revision.level() < 3 {
            self.units_of_reference(builtin)
        } else {
            self.units_of_reference(self.model_attribute(pick)?)
        }
    }

    pub fn time_units(&self) -> Option<DerivedUnits> {
        self.default_units("time", |m| m.time_units.as_ref())
    }

    fn substance_units(&self) -> Option<DerivedUnits> {
        self.default_units("substance", |m| m.substance_units.as_ref())
    }

    fn compartment_units(&self, compartment: &Node) -> Option<DerivedUnits> {
        let payload = compartment.as_compartment()?;
        if let Some(units) = &payload.units {
            return self.units_of_reference(units);
        }
        let dimensions = payload.spatial_dimensions.unwrap_or(3.0);
        if dimensions == 3.0 {
            self.default_units("volume", |m| m.volume_units.as_ref())
        } else if dimensions == 2.0 {
            self.default_units("area", |m| m.area_units.as_ref())
        } else if dimensions == 1.0 {
            self.default_units("length", |m| m.length_units.as_ref())
        } else if dimensions == 0.0 {
            Some(DerivedUnits::dimensionless())
        } else {
            None
        }
    }

    /// Units a bare identifier has in math. `law` supplies local
    /// parameters, which shadow model-wide ids.
    pub fn units_of_identifier(&self, id: &str, law: Option<&Node>) -> Option<DerivedUnits> {
        if let Some(local) = law.and_then(|l| {
            l.children_of_kind(ElementKind::Parameter)
                .find(|p| p.id() == Some(id))
        }) {
            return self.units_of_reference(local.as_parameter()?.units.as_deref()?);
        }
        let node = self.model.get_element_by_sid(id)?;
        match node.kind() {
            NodeKind::Parameter(p) => self.units_of_reference(p.units.as_deref()?),
            NodeKind::Compartment(_) => self.compartment_units(node),
            NodeKind::Species(s) => {
                let substance = match &s.substance_units {
                    Some(units) => self.units_of_reference(units)?,
                    None => self.substance_units()?,
                };
                if s.has_only_substance_units.unwrap_or(false) {
                    return Some(substance);
                }
                let compartment = self.model.get_element_by_sid(s.compartment.as_deref()?)?;
                Some(substance.divided_by(&self.compartment_units(compartment)?))
            }
            NodeKind::Reaction(_) => {
                let extent = if self.revision.level() < 3 {
                    self.substance_units()?
                } else {
                    self.units_of_reference(self.model_attribute(|m| m.extent_units.as_ref())?)?
                };
                Some(extent.divided_by(&self.time_units()?))
            }
            NodeKind::SpeciesReference(_) => Some(DerivedUnits::dimensionless()),
            _ => None,
        }
    }

    /// Units of an expression; operand mismatches of additions and
    /// subtractions are appended to `mismatches`.
    pub fn units_of_math(
        &self,
        math: &MathNode,
        law: Option<&Node>,
        mismatches: &mut Vec<String>,
    ) -> Option<DerivedUnits> {
        match math {
            MathNode::Integer(_) | MathNode::Real(_) | MathNode::Rational { .. } => None,
            MathNode::Constant(_) => Some(DerivedUnits::dimensionless()),
            MathNode::Identifier(id) => self.units_of_identifier(id, law),
            MathNode::Time => self.time_units(),
            MathNode::Call { .. } | MathNode::Lambda { .. } => None,
            MathNode::Apply { op, args } => {
                let units: Vec<Option<DerivedUnits>> = args
                    .iter()
                    .map(|a| self.units_of_math(a, law, mismatches))
                    .collect();
                self.units_of_apply(*op, args, &units, mismatches)
            }
        }
    }

    fn units_of_apply(
        &self,
        op: Operator,
        args: &[MathNode],
        units: &[Option<DerivedUnits>],
        mismatches: &mut Vec<String>,
    ) -> Option<DerivedUnits> {
        let all_known = || units.iter().cloned().collect::<Option<Vec<DerivedUnits>>>();
        match op {
            Operator::Plus | Operator::Minus | Operator::Max | Operator::Min | Operator::Rem => {
                let known: Vec<&DerivedUnits> = units.iter().flatten().collect();
                let first = known.first().copied()?;
                for other in &known[1..] {
                    if !first.same_as(other) {
                        mismatches.push(format!(
                            "  The operands of '{}' have units {first} and {other}.",
                            crate::math::format_formula(&MathNode::apply(op, args.to_vec()))
                        ));
                        break;
                    }
                }
                Some(first.clone())
            }
            Operator::Times => all_known()?
                .iter()
                .try_fold(DerivedUnits::dimensionless(), |acc, u| Some(acc.times(u))),
            Operator::Divide | Operator::Quotient => match units {
                [Some(a), Some(b)] => Some(a.divided_by(b)),
                _ => None,
            },
            Operator::Power => {
                let base = units.first()?.as_ref()?;
                if base.is_dimensionless() {
                    return Some(DerivedUnits::dimensionless());
                }
                let exponent = args.get(1)?.evaluate(&|_| None)?;
                Some(base.pow(exponent))
            }
            Operator::Root => match (args, units) {
                ([_], [Some(x)]) => Some(x.pow(0.5)),
                ([degree, _], [_, Some(x)]) => Some(x.pow(1.0 / degree.evaluate(&|_| None)?)),
                _ => None,
            },
            Operator::Abs | Operator::Floor | Operator::Ceiling | Operator::Delay => {
                units.first()?.clone()
            }
            // Units of the first piece value.
            Operator::Piecewise => units.first()?.clone(),
            op if op.is_dimensionless() => Some(DerivedUnits::dimensionless()),
            _ => None,
        }
    }
}

struct ConsistentOperandUnits;

impl Constraint for ConsistentOperandUnits {
    fn code(&self) -> u32 {
        code::INCONSISTENT_ARG_UNITS
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::UNITS
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        let resolver = UnitResolver::new(model, ctx.revision());
        for (node, law) in expressions(model) {
            let Some(math) = node.math() else {
                continue;
            };
            let mut mismatches = Vec::new();
            resolver.units_of_math(math.ast(), law, &mut mismatches);
            for detail in mismatches {
                ctx.fail(code::INCONSISTENT_ARG_UNITS, node, detail);
            }
        }
    }
}

struct AssignmentMatchesParameterUnits;

impl Constraint for AssignmentMatchesParameterUnits {
    fn code(&self) -> u32 {
        code::ASSIGN_RULE_PARAMETER_MISMATCH
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::UNITS
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        let resolver = UnitResolver::new(model, ctx.revision());
        for rule in model.children_of_kind(ElementKind::AssignmentRule) {
            let (Some(variable), Some(math)) = (rule.assigned_symbol(), rule.math()) else {
                continue;
            };
            let Some(target) = model.get_element_by_sid(variable) else {
                continue;
            };
            if target.element_kind() != ElementKind::Parameter {
                continue;
            }
            let Some(expected) = resolver.units_of_identifier(variable, None) else {
                continue;
            };
            let Some(found) = resolver.units_of_math(math.ast(), None, &mut Vec::new()) else {
                continue;
            };
            if !expected.same_as(&found) {
                ctx.fail(
                    code::ASSIGN_RULE_PARAMETER_MISMATCH,
                    rule,
                    format!("  The parameter '{variable}' has units {expected} but its rule computes {found}."),
                );
            }
        }
    }
}

pub(super) fn constraints() -> Vec<Box<dyn Constraint>> {
    vec![
        Box::new(ConsistentOperandUnits),
        Box::new(AssignmentMatchesParameterUnits),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Unit;

    fn model() -> Node {
        let mut model = Node::model("m");
        let mut mmls = Node::unit_definition("mmls");
        mmls.add_child(Node::unit(Unit::with("mole", 1.0, -3))).expect("unit");
        mmls.add_child(Node::unit(Unit::with("liter", -1.0, 0))).expect("unit");
        mmls.add_child(Node::unit(Unit::with("second", -1.0, 0))).expect("unit");
        model.add_child(mmls).expect("unit definition");
        model.add_child(Node::compartment("cell")).expect("compartment");
        model.add_child(Node::species("s", "cell")).expect("species");
        let mut k = Node::parameter("k", Some(1.0));
        k.as_parameter_mut().expect("parameter").units = Some("second".to_string());
        model.add_child(k).expect("parameter");
        model
    }

    #[test]
    fn unit_definitions_multiply_their_terms() {
        let model = model();
        let resolver = UnitResolver::new(&model, Revision::L2V4);
        let units = resolver.units_of_reference("mmls").expect("defined");
        assert_eq!(units.exponent_of("mole"), 1.0);
        assert_eq!(units.exponent_of("litre"), -1.0);
        assert_eq!(units.exponent_of("second"), -1.0);
        assert_eq!(units.to_string(), "litre^-1 mole second^-1");
    }

    #[test]
    fn species_are_concentrations_by_default() {
        let model = model();
        let resolver = UnitResolver::new(&model, Revision::L2V4);
        let units = resolver.units_of_identifier("s", None).expect("derivable");
        assert!(units.same_as(&DerivedUnits::base("mole").divided_by(&DerivedUnits::base("litre"))));
    }

    #[test]
    fn mismatched_sums_are_reported() {
        let model = model();
        let resolver = UnitResolver::new(&model, Revision::L2V4);
        let expr = crate::math::parse_formula("k + s").expect("formula");
        let mut mismatches = Vec::new();
        resolver.units_of_math(&expr, None, &mut mismatches);
        assert_eq!(mismatches.len(), 1);

        let expr = crate::math::parse_formula("k * 2 + 3").expect("formula");
        mismatches.clear();
        let units = resolver.units_of_math(&expr, None, &mut mismatches);
        assert!(mismatches.is_empty());
        assert_eq!(units, None);
    }

    #[test]
    fn level3_needs_model_units_for_defaults() {
        let model = model();
        let resolver = UnitResolver::new(&model, Revision::L3V2);
        assert_eq!(resolver.time_units(), None);
        assert!(is_base_unit("avogadro", Revision::L3V1));
        assert!(!is_base_unit("liter", Revision::L3V1));
    }
}
