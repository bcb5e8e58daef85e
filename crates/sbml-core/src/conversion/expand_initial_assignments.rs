use super::{ConversionError, ConversionProperties, Converter};
use crate::document::Document;
use crate::node::{ElementKind, Node, NodeKind};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) const OPTION: &str = "expandInitialAssignments";

/// Evaluates initial assignments and stores the results as the initial
/// values of their symbols. Assignments whose math cannot be evaluated
/// (unknown symbols, user functions, cycles) are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandInitialAssignments;

impl Converter for ExpandInitialAssignments {
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
        if model.children_of_kind(ElementKind::InitialAssignment).next().is_none() {
            return Ok(());
        }

        let mut copy = document.clone();
        let Some(model) = copy.model_mut() else {
            return Ok(());
        };
        let mut values = initial_values(model);
        let mut pending: Vec<(String, usize)> = model
            .children()
            .iter()
            .enumerate()
            .filter_map(|(index, c)| Some((c.as_initial_assignment()?.symbol.clone()?, index)))
            .collect();
        for (symbol, _) in &pending {
            values.remove(symbol);
        }

        let mut expanded = BTreeSet::new();
        let mut assigned = BTreeMap::new();
        loop {
            let before = expanded.len();
            pending.retain(|(symbol, index)| {
                let value = model.children()[*index]
                    .math()
                    .and_then(|m| m.ast().evaluate(&|name| values.get(name).copied()));
                match value {
                    Some(value) => {
                        values.insert(symbol.clone(), value);
                        assigned.insert(symbol.clone(), value);
                        expanded.insert(*index);
                        false
                    }
                    None => true,
                }
            });
            if expanded.len() == before {
                break;
            }
        }
        if expanded.is_empty() {
            return Ok(());
        }

        for (index, child) in model.children_mut().iter_mut().enumerate() {
            if expanded.contains(&index) {
                continue;
            }
            if let Some(value) = child.id().and_then(|id| assigned.get(id)).copied() {
                set_initial_value(child, value);
            }
        }
        for child in model.children_mut() {
            if let NodeKind::Reaction(_) = child.kind() {
                for reference in child.children_mut() {
                    if let Some(value) = reference.id().and_then(|id| assigned.get(id)).copied() {
                        if let Some(r) = reference.as_species_reference_mut() {
                            r.stoichiometry = Some(value);
                        }
                    }
                }
            }
        }
        let mut index = 0;
        model.children_mut().retain(|_| {
            let keep = !expanded.contains(&index);
            index += 1;
            keep
        });
        copy.connect_to_child();
        tracing::debug!(expanded = expanded.len(), "initial assignments expanded");
        *document = copy;
        Ok(())
    }
}

/// Current initial values of the model's quantities.
fn initial_values(model: &Node) -> BTreeMap<String, f64> {
    let mut values = BTreeMap::new();
    for child in model.children() {
        let Some(id) = child.id() else { continue };
        let value = match child.kind() {
            NodeKind::Compartment(c) => c.size,
            NodeKind::Parameter(p) => p.value,
            NodeKind::Species(s) => s.initial_concentration.or(s.initial_amount),
            _ => None,
        };
        if let Some(value) = value {
            values.insert(id.to_string(), value);
        }
    }
    for reaction in model.children_of_kind(ElementKind::Reaction) {
        for reference in reaction.children() {
            if let (Some(id), Some(r)) = (reference.id(), reference.as_species_reference()) {
                values.insert(id.to_string(), r.stoichiometry());
            }
        }
    }
    values
}

fn set_initial_value(node: &mut Node, value: f64) {
    match node.kind_mut() {
        NodeKind::Compartment(c) => c.size = Some(value),
        NodeKind::Parameter(p) => p.value = Some(value),
        NodeKind::Species(s) if s.initial_concentration.is_some() => {
            s.initial_concentration = Some(value);
        }
        NodeKind::Species(s) => s.initial_amount = Some(value),
        _ => {}
    }
}
