//! MathML consistency: every name used in an expression must resolve.

use super::{CheckCategories, Constraint, ConstraintContext, expressions};
use crate::node::{ElementKind, Node};
use sbml_schema::code;

struct CalledFunctionsDefined;

impl Constraint for CalledFunctionsDefined {
    fn code(&self) -> u32 {
        code::FUNCTION_CALL_NOT_DEFINED
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::MATHML
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        let defined: Vec<&str> = model
            .children_of_kind(ElementKind::FunctionDefinition)
            .filter_map(Node::id)
            .collect();
        for (node, _) in expressions(model) {
            let Some(math) = node.math() else {
                continue;
            };
            for function in math.ast().called_functions() {
                if !defined.contains(&function.as_str()) {
                    ctx.fail(
                        code::FUNCTION_CALL_NOT_DEFINED,
                        node,
                        format!("  The function '{function}' is not defined in this model."),
                    );
                }
            }
        }
    }
}

struct IdentifiersDefined;

impl Constraint for IdentifiersDefined {
    fn code(&self) -> u32 {
        code::UNDEFINED_MATH_IDENTIFIER
    }

    fn category(&self) -> CheckCategories {
        CheckCategories::MATHML
    }

    fn check(&mut self, ctx: &mut ConstraintContext<'_>) {
        let Some(model) = ctx.model() else {
            return;
        };
        for (node, law) in expressions(model) {
            let Some(math) = node.math() else {
                continue;
            };
            for name in math.ast().free_identifiers() {
                let local = law.is_some_and(|l| {
                    l.children_of_kind(ElementKind::Parameter)
                        .any(|p| p.id() == Some(name.as_str()))
                });
                if !local && model.get_element_by_sid(&name).is_none() {
                    ctx.fail(
                        code::UNDEFINED_MATH_IDENTIFIER,
                        node,
                        format!(
                            "  The identifier '{name}' in the math of the {} is undefined.",
                            node.type_name()
                        ),
                    );
                }
            }
        }
    }
}

pub(super) fn constraints() -> Vec<Box<dyn Constraint>> {
    vec![Box::new(CalledFunctionsDefined), Box::new(IdentifiersDefined)]
}
