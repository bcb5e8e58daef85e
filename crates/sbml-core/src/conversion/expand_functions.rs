use super::{ConversionError, ConversionProperties, Converter};
use crate::document::Document;
use crate::math::{Math, MathNode};
use crate::node::{ElementKind, Node, NodeKind};
use std::collections::BTreeMap;

pub(crate) const OPTION: &str = "expandFunctionDefinitions";

/// Calls may nest; anything deeper than this is treated as recursion.
const MAX_DEPTH: usize = 64;

/// Inlines every function definition at its call sites and removes the
/// definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandFunctionDefinitions;

impl Converter for ExpandFunctionDefinitions {
    fn name(&self) -> &str {
        OPTION
    }

    fn matches(&self, properties: &ConversionProperties) -> bool {
        properties.bool_option(OPTION)
    }

    fn convert(&self, document: &mut Document, _properties: &ConversionProperties) -> Result<(), ConversionError> {
        let Some(model) = document.model() else {
            return Ok(());
        };
        let functions = definitions(model)?;
        if functions.is_empty() {
            return Ok(());
        }

        let mut copy = document.clone();
        let Some(model) = copy.model_mut() else {
            return Ok(());
        };
        model
            .children_mut()
            .retain(|c| c.element_kind() != ElementKind::FunctionDefinition);
        let mut result = Ok(());
        for_each_math_mut(model, &mut |math| {
            if result.is_err() || math.ast().called_functions().is_empty() {
                return;
            }
            match expand(math.ast(), &functions, 0) {
                Ok(ast) => math.set_ast(ast),
                Err(err) => result = Err(err),
            }
        });
        result?;
        copy.connect_to_child();
        tracing::debug!(functions = functions.len(), "function definitions expanded");
        *document = copy;
        Ok(())
    }
}

struct Lambda {
    params: Vec<String>,
    body: MathNode,
}

fn definitions(model: &Node) -> Result<BTreeMap<String, Lambda>, ConversionError> {
    let mut functions = BTreeMap::new();
    for definition in model.children_of_kind(ElementKind::FunctionDefinition) {
        let Some(id) = definition.id() else { continue };
        match definition.math().map(Math::ast) {
            Some(MathNode::Lambda { params, body }) => {
                functions.insert(
                    id.to_string(),
                    Lambda {
                        params: params.clone(),
                        body: (**body).clone(),
                    },
                );
            }
            _ => {
                return Err(ConversionError::Failed(format!(
                    "function definition '{id}' has no lambda body"
                )));
            }
        }
    }
    Ok(functions)
}

fn expand(node: &MathNode, functions: &BTreeMap<String, Lambda>, depth: usize) -> Result<MathNode, ConversionError> {
    if depth > MAX_DEPTH {
        return Err(ConversionError::Failed("function definitions call each other recursively".to_string()));
    }
    let expanded = match node {
        MathNode::Call { function, args } => {
            let args = args
                .iter()
                .map(|a| expand(a, functions, depth))
                .collect::<Result<Vec<_>, _>>()?;
            match functions.get(function) {
                Some(lambda) if lambda.params.len() == args.len() => {
                    let bindings: BTreeMap<String, MathNode> =
                        lambda.params.iter().cloned().zip(args).collect();
                    expand(&lambda.body.substitute(&bindings), functions, depth + 1)?
                }
                Some(_) => {
                    return Err(ConversionError::Failed(format!(
                        "'{function}' is called with the wrong number of arguments"
                    )));
                }
                None => MathNode::Call {
                    function: function.clone(),
                    args,
                },
            }
        }
        MathNode::Apply { op, args } => MathNode::Apply {
            op: *op,
            args: args
                .iter()
                .map(|a| expand(a, functions, depth))
                .collect::<Result<_, _>>()?,
        },
        MathNode::Lambda { params, body } => MathNode::Lambda {
            params: params.clone(),
            body: Box::new(expand(body, functions, depth)?),
        },
        other => other.clone(),
    };
    Ok(expanded)
}

/// Visits the math of `node` and of every core node below it.
pub(crate) fn for_each_math_mut(node: &mut Node, f: &mut dyn FnMut(&mut Math)) {
    if !matches!(node.kind(), NodeKind::Extension(_)) {
        if let Some(Some(math)) = node.kind_mut().math_slot() {
            f(math);
        }
    }
    for child in node.children_mut() {
        for_each_math_mut(child, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbml_schema::Revision;

    fn document() -> Document {
        let mut document = Document::with_revision(Revision::L2V4);
        let model = document.create_model("m");
        model
            .add_child(Node::function_definition("double", "lambda(x, 2 * x)").expect("lambda"))
            .expect("function");
        model
            .add_child(Node::function_definition("quad", "lambda(y, double(double(y)))").expect("lambda"))
            .expect("function");
        model.add_child(Node::parameter("k", Some(1.0))).expect("parameter");
        let mut p = Node::parameter("p", None);
        p.as_parameter_mut().expect("parameter").constant = Some(false);
        model.add_child(p).expect("parameter");
        model
            .add_child(Node::assignment_rule("p", "quad(k) + 1").expect("rule"))
            .expect("rule");
        document
    }

    #[test]
    fn calls_are_replaced_by_bodies() {
        let mut document = document();
        document.expand_function_definitions().expect("expand");
        let model = document.model().expect("model");
        assert_eq!(model.children_of_kind(ElementKind::FunctionDefinition).count(), 0);
        let rule = model.children_of_kind(ElementKind::AssignmentRule).next().expect("rule");
        let ast = rule.math().expect("math").ast();
        assert!(ast.called_functions().is_empty());
        assert_eq!(ast.evaluate(&|name| (name == "k").then_some(3.0)), Some(13.0));
    }

    #[test]
    fn recursive_definitions_leave_the_document_alone() {
        let mut document = Document::with_revision(Revision::L2V4);
        let model = document.create_model("m");
        model
            .add_child(Node::function_definition("f", "lambda(x, f(x))").expect("lambda"))
            .expect("function");
        model
            .add_child(Node::algebraic_rule("f(1)").expect("rule"))
            .expect("rule");
        let err = document.expand_function_definitions().expect_err("recursion");
        assert!(matches!(err, ConversionError::Failed(_)));
        assert_eq!(
            document
                .model()
                .expect("model")
                .children_of_kind(ElementKind::FunctionDefinition)
                .count(),
            1
        );
    }
}
