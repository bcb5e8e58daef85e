//! Modeling practice recommendations. Failures are warnings.

use super::{CheckCategories, Constraint, ConstraintContext, NodeRule};
use crate::document::Document;
use crate::node::{ElementKind, Node};
use sbml_schema::code;

fn parameter_has_units(node: &Node, _: &Document) -> Option<String> {
    let parameter = node.as_parameter()?;
    parameter.units.is_none().then(|| {
        format!(
            "  The parameter '{}' does not declare units.",
            node.id().unwrap_or_default()
        )
    })
}

/// Local parameters should not hide model-wide components.
struct LocalParametersDoNotShadow;

impl Constraint for LocalParametersDoNotShadow {
    fn code(&self) -> u32 {
        code::LOCAL_PARAMETER_SHADOWS_ID
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::MODELING_PRACTICE
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        for law in model.get_all_elements(|n| n.element_kind() == ElementKind::KineticLaw) {
            for local in law.children_of_kind(ElementKind::Parameter) {
                let Some(id) = local.id() else {
                    continue;
                };
                if let Some(global) = model.get_element_by_sid(id) {
                    ctx.fail(
                        code::LOCAL_PARAMETER_SHADOWS_ID,
                        local,
                        format!(
                            "  The local parameter '{id}' shadows the {} of the same id.",
                            global.type_name()
                        ),
                    );
                }
            }
        }
    }
}

pub(super) fn constraints() -> Vec<Box<dyn Constraint>> {
    vec![
        Box::new(NodeRule::new(
            code::PARAMETER_UNITS,
            CheckCategories::MODELING_PRACTICE,
            parameter_has_units,
        )),
        Box::new(LocalParametersDoNotShadow),
    ]
}
