//! Constraint-based validation.
//!
//! A [`Constraint`] is an independent rule object with a catalog code and a
//! category. A [`Validator`] runs an ordered set of them over a read-only
//! [`Document`] and returns the failures of the pass; the document merges
//! them into its error log under the severity override of the check that
//! asked for the pass (see [`merge_failures`]).
//!
//! Constraints may keep scratch state across the nodes of one pass (the
//! identifier checks remember every id they have seen). The validator calls
//! [`Constraint::reset`] after each constraint has run, so repeated passes
//! over an unchanged tree report the same failures.

mod compat;
mod general;
mod identifiers;
mod internal;
mod math;
mod practice;
mod units;

pub use compat::compatibility_constraints;
pub use identifiers::{IdTracker, is_valid_meta_id, is_valid_sid};
pub use internal::internal_constraints;
pub use units::{BASE_UNITS, DerivedUnits, UnitResolver, is_base_unit};

use crate::document::Document;
use crate::error_log::{ErrorLog, ErrorRecord, SeverityOverride};
use crate::node::{ElementKind, Node};
use sbml_schema::Revision;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bit set of check categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CheckCategories(u16);

impl CheckCategories {
    pub const NONE: Self = Self(0);
    pub const IDENTIFIER: Self = Self(0x01);
    pub const GENERAL: Self = Self(0x02);
    pub const UNITS: Self = Self(0x04);
    pub const MATHML: Self = Self(0x08);
    pub const MODELING_PRACTICE: Self = Self(0x10);
    /// Required-attribute checks; only run by an internal consistency
    /// check, never by a consistency check.
    pub const INTERNAL: Self = Self(0x20);
    /// Every consistency category.
    pub const ALL: Self = Self(0x1f);
    /// Categories checked before a revision conversion.
    pub const CONVERSION_DEFAULT: Self = Self(0x01 | 0x02 | 0x08);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::IDENTIFIER, "identifier"),
        (Self::GENERAL, "general"),
        (Self::UNITS, "units"),
        (Self::MATHML, "mathml"),
        (Self::MODELING_PRACTICE, "modeling-practice"),
        (Self::INTERNAL, "internal"),
    ];

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> Self {
        Self(bits & 0x3f)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Adds or removes `other` depending on `on`.
    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    /// Category for a configuration name such as `units`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(category, _)| *category)
    }

    /// Names of the single categories in the set, in bit order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(category, _)| self.contains(*category))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for CheckCategories {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CheckCategories {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for CheckCategories {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for CheckCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        f.write_str(&self.names().join("|"))
    }
}

/// What one constraint sees during a pass.
pub struct ConstraintContext<'a> {
    document: &'a Document,
    revision: Revision,
    failures: Vec<ErrorRecord>,
}

impl<'a> ConstraintContext<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self {
            document,
            revision: document.revision(),
            failures: Vec::new(),
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn model(&self) -> Option<&'a Node> {
        self.document.model()
    }

    /// Revision whose severity table classifies the failures.
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Records a failure located at `node`.
    pub fn fail(&mut self, code: u32, node: &Node, detail: impl Into<String>) {
        self.fail_at(code, node.line(), node.column(), detail);
    }

    pub fn fail_at(
        &mut self,
        code: u32,
        line: Option<u32>,
        column: Option<u32>,
        detail: impl Into<String>,
    ) {
        self.failures
            .push(ErrorRecord::new(code, self.revision, detail).at(line, column));
    }

    /// Records a failure built by the caller, such as one carrying a
    /// package-defined code.
    pub fn report(&mut self, record: ErrorRecord) {
        self.failures.push(record);
    }

    pub fn failures(&self) -> &[ErrorRecord] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ErrorRecord> {
        self.failures
    }
}

/// One validation rule.
pub trait Constraint: Send + Sync {
    /// Catalog code logged on failure.
    fn code(&self) -> u32;

    fn category(&self) -> CheckCategories;

    /// Package that owns the rule; empty for core rules.
    fn package(&self) -> &str {
        ""
    }

    /// Whether the rule is defined for documents of `revision`.
    fn applies_to(&self, _revision: Revision) -> bool {
        true
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>);

    /// Drops scratch state kept between nodes.
    fn reset(&mut self) {}
}

/// Externally supplied validator attached to a document.
pub trait DocumentValidator: Send + Sync {
    fn validate(&mut self, document: &Document) -> Vec<ErrorRecord>;

    fn clone_box(&self) -> Box<dyn DocumentValidator>;
}

/// Progress of a validator's current pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassState {
    #[default]
    Idle,
    Running,
    Done,
}

/// Ordered constraint set run as a unit.
#[derive(Default)]
pub struct Validator {
    constraints: Vec<Box<dyn Constraint>>,
    state: PassState,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Core constraints of the given categories, in registration order.
    pub fn for_categories(categories: CheckCategories) -> Self {
        let mut validator = Self::new();
        for constraint in core_constraints() {
            if categories.contains(constraint.category()) {
                validator.add_constraint(constraint);
            }
        }
        validator
    }

    pub fn add_constraint(&mut self, constraint: Box<dyn Constraint>) {
        self.constraints.push(constraint);
    }

    pub fn extend(&mut self, constraints: impl IntoIterator<Item = Box<dyn Constraint>>) {
        self.constraints.extend(constraints);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    /// Runs every applicable constraint once and returns the failures of
    /// the pass. The document is never modified.
    pub fn run(&mut self, document: &Document) -> Vec<ErrorRecord> {
        self.state = PassState::Running;
        let revision = document.revision();
        let mut failures = Vec::new();
        for constraint in &mut self.constraints {
            if !constraint.applies_to(revision) {
                continue;
            }
            let mut ctx = ConstraintContext::new(document);
            constraint.check(&mut ctx);
            constraint.reset();
            let package = constraint.package().to_string();
            failures.extend(ctx.into_failures().into_iter().map(|record| {
                if package.is_empty() {
                    record
                } else {
                    record.with_package(package.clone())
                }
            }));
        }
        tracing::debug!(
            constraints = self.constraints.len(),
            failures = failures.len(),
            "validation pass finished"
        );
        self.state = PassState::Done;
        failures
    }
}

/// Every core consistency constraint, in registration order.
pub fn core_constraints() -> Vec<Box<dyn Constraint>> {
    let mut all = identifiers::constraints();
    all.extend(general::constraints());
    all.extend(math::constraints());
    all.extend(units::constraints());
    all.extend(practice::constraints());
    all
}

/// Severity override in force while a pass's failures are merged; the
/// previous override is restored when the scope ends.
struct OverrideScope<'a> {
    log: &'a mut ErrorLog,
    saved: SeverityOverride,
}

impl<'a> OverrideScope<'a> {
    fn enter(log: &'a mut ErrorLog, mode: SeverityOverride) -> Self {
        let saved = log.severity_override();
        log.set_severity_override(mode);
        Self { log, saved }
    }
}

impl Drop for OverrideScope<'_> {
    fn drop(&mut self) {
        self.log.set_severity_override(self.saved);
    }
}

/// Appends the failures of a pass to `log` under `mode`; returns how many
/// failures the pass produced.
pub fn merge_failures(log: &mut ErrorLog, failures: Vec<ErrorRecord>, mode: SeverityOverride) -> usize {
    let count = failures.len();
    let scope = OverrideScope::enter(log, mode);
    scope.log.add_all(failures);
    count
}

/// Math-carrying nodes outside function definitions, paired with the
/// kinetic law whose local parameters they can see.
pub(crate) fn expressions(model: &Node) -> Vec<(&Node, Option<&Node>)> {
    model
        .get_all_elements(|n| {
            n.math().is_some() && n.element_kind() != ElementKind::FunctionDefinition
        })
        .into_iter()
        .map(|n| (n, (n.element_kind() == ElementKind::KineticLaw).then_some(n)))
        .collect()
}

/// A rule expressed as a per-node test over the whole document tree.
pub(crate) struct NodeRule {
    pub code: u32,
    pub category: CheckCategories,
    pub applies: fn(Revision) -> bool,
    pub test: fn(&Node, &Document) -> Option<String>,
}

impl NodeRule {
    pub fn new(
        code: u32,
        category: CheckCategories,
        test: fn(&Node, &Document) -> Option<String>,
    ) -> Self {
        Self {
            code,
            category,
            applies: |_| true,
            test,
        }
    }

    pub fn only_in(mut self, applies: fn(Revision) -> bool) -> Self {
        self.applies = applies;
        self
    }
}

impl Constraint for NodeRule {
    fn code(&self) -> u32 {
        self.code
    }

    fn category(&self) -> CheckCategories {
        self.category
    }

    fn applies_to(&self, revision: Revision) -> bool {
        (self.applies)(revision)
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let document = ctx.document();
        let test = self.test;
        let code = self.code;
        document.root().walk(&mut |node| {
            if let Some(detail) = test(node, document) {
                ctx.fail(code, node, detail);
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbml_schema::code;

    #[test]
    fn category_sets_combine_and_name() {
        let mut set = CheckCategories::IDENTIFIER | CheckCategories::UNITS;
        assert!(set.contains(CheckCategories::UNITS));
        assert!(!set.contains(CheckCategories::GENERAL));
        set.set(CheckCategories::UNITS, false);
        assert_eq!(set, CheckCategories::IDENTIFIER);
        assert_eq!(CheckCategories::from_name("modeling-practice"), Some(CheckCategories::MODELING_PRACTICE));
        assert_eq!(CheckCategories::from_name("spelling"), None);
        assert_eq!(CheckCategories::CONVERSION_DEFAULT.to_string(), "identifier|general|mathml");
        assert!(!CheckCategories::ALL.contains(CheckCategories::INTERNAL));
    }

    #[test]
    fn merging_restores_the_previous_override() {
        let mut log = ErrorLog::new();
        log.set_severity_override(SeverityOverride::DontLog);
        let warning = ErrorRecord::new(code::PARAMETER_UNITS, Revision::L3V2, "");
        let merged = merge_failures(&mut log, vec![warning], SeverityOverride::AsError);
        assert_eq!(merged, 1);
        assert_eq!(log.len(), 1);
        assert!(log.records()[0].is_error());
        assert_eq!(log.severity_override(), SeverityOverride::DontLog);
    }

    #[test]
    fn validators_select_by_category() {
        let all = Validator::for_categories(CheckCategories::ALL);
        let ids = Validator::for_categories(CheckCategories::IDENTIFIER);
        assert!(ids.len() > 0);
        assert!(all.len() > ids.len());
        assert!(Validator::for_categories(CheckCategories::NONE).is_empty());
    }

    #[test]
    fn passes_move_through_their_states() {
        let document = Document::new();
        let mut validator = Validator::for_categories(CheckCategories::GENERAL);
        assert_eq!(validator.state(), PassState::Idle);
        let failures = validator.run(&document);
        assert_eq!(validator.state(), PassState::Done);
        // A Level 3 Version 2 document may omit its model.
        assert!(failures.is_empty());
    }
}
