//! Consistency and compatibility checks of a whole document.
//!
//! Every check runs its constraints over the unchanged tree and merges the
//! failures into the error log in one step, with the log's severity
//! override disabled for the merge; the strict unit pass is the one
//! exception and merges with warnings forced to errors.

use super::Document;
use crate::error_log::{ErrorRecord, SeverityOverride};
use crate::validation::{
    CheckCategories, Validator, compatibility_constraints, internal_constraints,
    merge_failures,
};
use sbml_schema::{Revision, Severity, severity_for, strict_units_required_code};

impl Document {
    /// Runs the applicable consistency categories, the checks of every
    /// enabled package and the attached ad hoc validators; returns the
    /// number of failures logged.
    ///
    /// Unit and modeling-practice checks are skipped when the identifier,
    /// general or MathML checks already found errors.
    pub fn check_consistency(&mut self) -> usize {
        let mut failures = self.consistency_failures(self.applicable);
        failures.extend(self.ad_hoc_failures());
        let count = merge_failures(&mut self.error_log, failures, SeverityOverride::Disabled);
        tracing::debug!(failures = count, "consistency check finished");
        count
    }

    fn consistency_failures(&self, categories: CheckCategories) -> Vec<ErrorRecord> {
        let structural = categories
            & (CheckCategories::IDENTIFIER | CheckCategories::GENERAL | CheckCategories::MATHML);
        let mut failures = Validator::for_categories(structural).run(self);
        if !failures.iter().any(ErrorRecord::is_error) {
            let semantic =
                categories & (CheckCategories::UNITS | CheckCategories::MODELING_PRACTICE);
            failures.extend(Validator::for_categories(semantic).run(self));
        }

        for extension in self.enabled_extensions() {
            let mut validator = Validator::new();
            validator.extend(
                extension
                    .constraints()
                    .into_iter()
                    .filter(|c| c.category().is_empty() || categories.intersects(c.category())),
            );
            failures.extend(validator.run(self));
            if extension.has_consistency_checks() {
                failures.extend(extension.check_consistency(self));
            }
        }
        failures
    }

    /// Failures of the categories selected for conversion, without logging.
    pub(crate) fn conversion_failures(&self) -> Vec<ErrorRecord> {
        self.consistency_failures(self.conversion)
    }

    fn ad_hoc_failures(&mut self) -> Vec<ErrorRecord> {
        let mut validators = std::mem::take(&mut self.validators);
        let failures = validators
            .iter_mut()
            .flat_map(|validator| validator.validate(self))
            .collect();
        self.validators = validators;
        failures
    }

    /// Same as [`check_consistency`](Self::check_consistency).
    pub fn validate(&mut self) -> usize {
        self.check_consistency()
    }

    /// Consistency check without units, then, if the log holds no errors,
    /// the unit checks with warnings logged as errors.
    pub fn check_consistency_with_strict_units(&mut self) -> usize {
        let mut categories = self.applicable;
        categories.remove(CheckCategories::UNITS);
        let mut failures = self.consistency_failures(categories);
        failures.extend(self.ad_hoc_failures());
        let mut count = merge_failures(&mut self.error_log, failures, SeverityOverride::Disabled);
        if self.error_log.num_at_least(Severity::Error) > 0 {
            tracing::debug!("strict unit pass skipped; document has errors");
            return count;
        }
        let failures = Validator::for_categories(CheckCategories::UNITS).run(self);
        count += merge_failures(&mut self.error_log, failures, SeverityOverride::AsError);
        count
    }

    /// Checks that every attribute the revision requires is set.
    pub fn check_internal_consistency(&mut self) -> usize {
        let mut validator = Validator::new();
        validator.extend(internal_constraints());
        let failures = validator.run(self);
        merge_failures(&mut self.error_log, failures, SeverityOverride::Disabled)
    }

    /// Logs what `target` cannot represent; returns the number of records
    /// logged.
    ///
    /// Outside a conversion, targets that require unit consistency also
    /// get a unit pass: when any unit failure would be an error in
    /// `target`, a single "strict units required" record is logged in
    /// place of the unit failures, otherwise they are dropped.
    pub fn check_compatibility(&mut self, target: Revision, in_conversion: bool) -> usize {
        let failures = self.compatibility_failures(target, in_conversion);
        let count = merge_failures(&mut self.error_log, failures, SeverityOverride::Disabled);
        tracing::debug!(%target, failures = count, "compatibility check finished");
        count
    }

    pub(crate) fn compatibility_failures(&self, target: Revision, in_conversion: bool) -> Vec<ErrorRecord> {
        let mut validator = Validator::new();
        validator.extend(compatibility_constraints(target));
        let mut failures = validator.run(self);

        if let (false, Some(strict_code)) = (in_conversion, strict_units_required_code(target)) {
            let unit_failures = Validator::for_categories(CheckCategories::UNITS).run(self);
            if unit_failures
                .iter()
                .any(|f| severity_for(f.code, target).is_error())
            {
                failures.push(ErrorRecord::new(strict_code, target, ""));
            }
        }
        failures
    }

    pub fn check_l1_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L1V2, in_conversion)
    }

    pub fn check_l2v1_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L2V1, in_conversion)
    }

    pub fn check_l2v2_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L2V2, in_conversion)
    }

    pub fn check_l2v3_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L2V3, in_conversion)
    }

    pub fn check_l2v4_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L2V4, in_conversion)
    }

    pub fn check_l2v5_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L2V5, in_conversion)
    }

    pub fn check_l3v1_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L3V1, in_conversion)
    }

    pub fn check_l3v2_compatibility(&mut self, in_conversion: bool) -> usize {
        self.check_compatibility(Revision::L3V2, in_conversion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::validation::DocumentValidator;
    use sbml_schema::code;

    fn document(revision: Revision) -> Document {
        let mut document = Document::with_revision(revision);
        let model = document.create_model("m");
        model.add_child(Node::compartment("cell")).expect("compartment");
        model.add_child(Node::species("s", "cell")).expect("species");
        document
    }

    #[test]
    fn duplicate_ids_are_reported_once_per_run() {
        let mut document = document(Revision::L2V4);
        document
            .model_mut()
            .expect("model")
            .add_child(Node::parameter("s", Some(1.0)))
            .expect("parameter");
        let first = document.check_consistency();
        let second = document.check_consistency();
        assert_eq!(first, second);
        assert!(document.error_log().contains(code::DUPLICATE_COMPONENT_ID));
        assert_eq!(document.error_log().len(), first + second);
    }

    #[test]
    fn function_definitions_cannot_go_to_level_1() {
        let mut document = document(Revision::L2V4);
        document
            .model_mut()
            .expect("model")
            .add_child(Node::function_definition("f", "lambda(x, x * 2)").expect("lambda"))
            .expect("function definition");
        let count = document.check_l1_compatibility(true);
        assert_eq!(count, 1);
        assert!(document.error_log().contains(code::NO_FUNCTION_DEFINITIONS_IN_L1));
        assert_eq!(document.check_l2v4_compatibility(true), 0);
    }

    #[test]
    fn unit_errors_collapse_into_strict_units_required() {
        let mut document = document(Revision::L2V4);
        let model = document.model_mut().expect("model");
        let mut k = Node::parameter("k", Some(1.0));
        k.as_parameter_mut().expect("parameter").units = Some("second".to_string());
        model.add_child(k).expect("parameter");
        let mut v = Node::parameter("v", Some(1.0));
        v.as_parameter_mut().expect("parameter").units = Some("mole".to_string());
        v.as_parameter_mut().expect("parameter").constant = Some(false);
        model.add_child(v).expect("parameter");
        model
            .add_child(Node::assignment_rule("v", "k + k").expect("rule"))
            .expect("rule");

        assert_eq!(document.check_l2v1_compatibility(false), 1);
        assert!(document.error_log().contains(code::STRICT_UNITS_REQUIRED_IN_L2V1));
        assert!(!document.error_log().contains(code::ASSIGN_RULE_PARAMETER_MISMATCH));

        document.error_log_mut().clear();
        assert_eq!(document.check_l2v1_compatibility(true), 0);
    }

    #[test]
    fn strict_units_turn_warnings_into_errors() {
        let mut document = document(Revision::L3V1);
        let model = document.model_mut().expect("model");
        let mut a = Node::parameter("a", Some(1.0));
        a.as_parameter_mut().expect("parameter").units = Some("second".to_string());
        let mut b = Node::parameter("b", Some(1.0));
        b.as_parameter_mut().expect("parameter").units = Some("mole".to_string());
        model.add_child(a).expect("parameter");
        model.add_child(b).expect("parameter");
        model
            .add_child(Node::algebraic_rule("a + b").expect("rule"))
            .expect("rule");
        document.set_consistency_checks(CheckCategories::MODELING_PRACTICE, false);

        document.check_consistency_with_strict_units();
        let record = document
            .error_log()
            .iter()
            .find(|r| r.code == code::INCONSISTENT_ARG_UNITS)
            .expect("unit mismatch logged");
        assert_eq!(record.severity, Severity::Error);
        assert_eq!(document.error_log().severity_override(), SeverityOverride::Disabled);
    }

    #[derive(Clone)]
    struct NoParameters;

    impl DocumentValidator for NoParameters {
        fn validate(&mut self, document: &Document) -> Vec<ErrorRecord> {
            document
                .get_all_elements(|n| n.as_parameter().is_some())
                .into_iter()
                .map(|n| ErrorRecord::new(code::UNKNOWN_ERROR, document.revision(), "").at(n.line(), n.column()))
                .collect()
        }

        fn clone_box(&self) -> Box<dyn DocumentValidator> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn ad_hoc_validators_run_after_consistency() {
        let mut document = document(Revision::L2V4);
        document
            .model_mut()
            .expect("model")
            .add_child(Node::parameter("p", Some(2.0)))
            .expect("parameter");
        assert_eq!(document.validate(), 0);
        document.add_validator(Box::new(NoParameters));
        assert_eq!(document.num_validators(), 1);
        assert_eq!(document.validate(), 1);
        assert_eq!(document.clone().num_validators(), 1);
        document.clear_validators();
        assert_eq!(document.validate(), 0);
    }

    #[test]
    fn ad_hoc_validators_run_with_every_consistency_check() {
        let mut document = document(Revision::L2V4);
        document
            .model_mut()
            .expect("model")
            .add_child(Node::parameter("p", Some(2.0)))
            .expect("parameter");
        document.add_validator(Box::new(NoParameters));

        assert_eq!(document.check_consistency(), 1);
        assert!(document.error_log().contains(code::UNKNOWN_ERROR));

        document.error_log_mut().clear();
        document.check_consistency_with_strict_units();
        assert!(document.error_log().contains(code::UNKNOWN_ERROR));
        assert_eq!(document.num_validators(), 1);
    }
}
