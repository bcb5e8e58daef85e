//! Conversion between core revisions.

use super::{ConversionError, ConversionProperties, Converter};
use crate::document::Document;
use crate::error_log::{ErrorRecord, SeverityOverride};
use crate::node::{ElementKind, Node, NodeKind};
use crate::validation::merge_failures;
use sbml_schema::Revision;
use std::collections::HashMap;

pub(crate) const OPTION: &str = "setLevelAndVersion";

/// Moves a document to the revision named by the properties' target.
///
/// Options: `strict` (default true) refuses when the document has errors
/// before or after conversion or when the target cannot represent
/// something in it; `ignorePackages` drops package content when the target
/// is below Level 3 instead of refusing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelVersionConverter;

impl Converter for LevelVersionConverter {
    fn name(&self) -> &str {
        OPTION
    }

    fn matches(&self, properties: &ConversionProperties) -> bool {
        properties.bool_option(OPTION) && properties.target().is_some()
    }

    fn convert(
        &self,
        document: &mut Document,
        properties: &ConversionProperties,
    ) -> Result<(), ConversionError> {
        let target = properties
            .target()
            .ok_or_else(|| ConversionError::InvalidProperties("no target revision".to_string()))?;
        let strict = properties.bool_option_or("strict", true);
        let ignore_packages = properties.bool_option("ignorePackages");
        let source = document.revision();
        if source == target {
            return Ok(());
        }

        let mut copy = document.clone();
        if target.level() < 3 && !copy.packages().is_empty() {
            if !ignore_packages {
                return Err(ConversionError::PackagesPresent {
                    target,
                    packages: copy.packages().iter().map(|p| p.name.clone()).collect(),
                });
            }
            let uris: Vec<String> = copy.packages().iter().map(|p| p.uri.clone()).collect();
            for uri in uris {
                copy.remove_package(&uri);
            }
        }

        if strict {
            let failures = copy.conversion_failures();
            refuse_on_errors(document, failures, target)?;
        }
        let failures = copy.compatibility_failures(target, true);
        if strict {
            refuse_on_errors(document, failures, target)?;
        } else {
            merge_failures(copy.error_log_mut(), failures, SeverityOverride::Disabled);
        }

        let sizes = compartment_sizes(copy.model());
        adapt(copy.root_mut(), source, target, &sizes);
        copy.set_revision(target);

        if strict {
            let failures = copy.conversion_failures();
            refuse_on_errors(document, failures, target)?;
        }
        tracing::debug!(%source, %target, strict, "revision converted");
        *document = copy;
        Ok(())
    }
}

/// Logs `failures` on the untouched document and refuses when any of them
/// is an error.
fn refuse_on_errors(
    document: &mut Document,
    failures: Vec<ErrorRecord>,
    target: Revision,
) -> Result<(), ConversionError> {
    let errors = failures.iter().filter(|f| f.is_error()).count();
    if errors == 0 {
        return Ok(());
    }
    merge_failures(document.error_log_mut(), failures, SeverityOverride::Disabled);
    Err(ConversionError::Incompatible { target, errors })
}

fn compartment_sizes(model: Option<&Node>) -> HashMap<String, f64> {
    model
        .map(|m| {
            m.children_of_kind(ElementKind::Compartment)
                .filter_map(|c| Some((c.id()?.to_string(), c.as_compartment()?.size.unwrap_or(1.0))))
                .collect()
        })
        .unwrap_or_default()
}

/// Rewrites attribute values whose meaning or presence differs between
/// `source` and `target`, and drops elements `target` does not have.
fn adapt(node: &mut Node, source: Revision, target: Revision, sizes: &HashMap<String, f64>) {
    node.children_mut()
        .retain(|c| matches!(c.kind(), NodeKind::Extension(_)) || c.element_kind().exists_in(target));

    let to_l3 = target.level() >= 3;
    let from_below_l3 = source.level() < 3;
    let local = node.parent_kind() == Some(ElementKind::KineticLaw);

    if target.level() == 1 {
        node.unset_meta_id();
        node.unset_name();
        node.set_sbo_term(None);
    } else if target < Revision::L2V2 {
        node.set_sbo_term(None);
    }

    match node.kind_mut() {
        NodeKind::Model(m) if !to_l3 => *m = Default::default(),
        NodeKind::Unit(u) => {
            if to_l3 && from_below_l3 {
                u.exponent.get_or_insert(1.0);
                u.scale.get_or_insert(0);
                u.multiplier.get_or_insert(1.0);
            }
            if target != Revision::L2V1 {
                u.offset = None;
            }
            if target.level() == 1 {
                u.multiplier = None;
            }
        }
        NodeKind::Compartment(c) => {
            if source.level() == 1 {
                c.size.get_or_insert(1.0);
            }
            if to_l3 {
                c.outside = None;
                if from_below_l3 {
                    c.constant.get_or_insert(true);
                    c.spatial_dimensions.get_or_insert(3.0);
                }
            }
            if target.level() == 1 {
                c.constant = None;
                c.spatial_dimensions = None;
            }
        }
        NodeKind::Species(s) => {
            if target.level() == 1 && s.initial_amount.is_none() {
                if let Some(concentration) = s.initial_concentration {
                    let size = s
                        .compartment
                        .as_deref()
                        .and_then(|c| sizes.get(c))
                        .copied()
                        .unwrap_or(1.0);
                    s.initial_amount = Some(concentration * size);
                }
            }
            if target.level() == 1 {
                s.initial_concentration = None;
                s.has_only_substance_units = None;
                s.constant = None;
            }
            if !(Revision::L2V2..=Revision::L2V5).contains(&target) {
                s.species_type = None;
            }
            if to_l3 {
                s.charge = None;
                if from_below_l3 {
                    s.has_only_substance_units.get_or_insert(false);
                    s.boundary_condition.get_or_insert(false);
                    s.constant.get_or_insert(false);
                }
            } else {
                s.conversion_factor = None;
            }
        }
        NodeKind::Parameter(p) => {
            if target.level() == 1 || (to_l3 && local) {
                p.constant = None;
            } else if to_l3 && from_below_l3 {
                p.constant.get_or_insert(true);
            }
        }
        NodeKind::Reaction(r) => {
            if to_l3 && from_below_l3 {
                r.reversible.get_or_insert(true);
            }
            if target == Revision::L3V1 {
                r.fast.get_or_insert(false);
            }
            if !to_l3 {
                r.compartment = None;
            }
        }
        NodeKind::SpeciesReference(r) => {
            if target.level() > 1 {
                if let Some(denominator) = r.denominator.take().filter(|d| *d != 0 && *d != 1) {
                    r.stoichiometry = Some(r.stoichiometry() / f64::from(denominator));
                }
            }
            if to_l3 {
                if from_below_l3 {
                    r.stoichiometry.get_or_insert(1.0);
                    r.constant.get_or_insert(true);
                }
            } else {
                r.constant = None;
            }
        }
        NodeKind::KineticLaw(k) if target > Revision::L2V1 => {
            k.time_units = None;
            k.substance_units = None;
        }
        _ => {}
    }

    for child in node.children_mut() {
        adapt(child, source, target, sizes);
    }
}
