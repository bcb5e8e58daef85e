//! The node tree.
//!
//! Every element of a document is a [`Node`]: a [`NodeKind`] payload plus
//! the attributes all elements share (id, name, metaid, SBO term, notes,
//! annotation, source position), its owned children and its plugins.
//!
//! Ownership is strictly tree-shaped. The upward relation is a
//! [`NodeLink`]: the node's [`NodePath`] from the document root, the kind
//! of its parent and the revision of the owning document. Links are plain
//! values, rebuilt by [`Node::connect_to_child`] after any structural edit
//! and after cloning; they are never used to reach or drop other nodes.
//!
//! Setters do not enforce identifier uniqueness. Uniqueness depends on the
//! kind's [`IdScope`] and is checked by the identifier constraints.

mod kinds;

pub use kinds::{
    Compartment, ElementKind, ExtensionNode, FunctionDefinition, IdScope, InitialAssignment,
    KineticLaw, Level1RuleTarget, Model, ModifierSpeciesReference, NodeKind, Parameter, Reaction,
    ReferenceRole, Rule, Species, SpeciesReference, Unit,
};

use crate::error::SbmlError;
use crate::extension::{HostRef, Plugin};
use crate::math::{Math, MathError};
use crate::vocabulary::ChildSlot;
use sbml_schema::Revision;
use std::any::Any;
use std::fmt;

/// One step from a node to a node it owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    Child(usize),
    /// The `element`th node owned by the `plugin`th plugin.
    PluginElement { plugin: usize, element: usize },
}

/// Position of a node relative to the root of its tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn child(&self, index: usize) -> Self {
        self.join(PathStep::Child(index))
    }

    pub fn plugin_element(&self, plugin: usize, element: usize) -> Self {
        self.join(PathStep::PluginElement { plugin, element })
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    fn join(&self, step: PathStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for step in &self.0 {
            match step {
                PathStep::Child(i) => write!(f, "/{i}")?,
                PathStep::PluginElement { plugin, element } => write!(f, "/@{plugin}.{element}")?,
            }
        }
        Ok(())
    }
}

/// Non-owning back-reference of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeLink {
    pub path: NodePath,
    pub parent: Option<ElementKind>,
    /// Revision of the owning document, or the revision a standalone node
    /// was built for.
    pub revision: Option<Revision>,
}

/// Pre-order traversal hooks.
pub trait Visitor {
    /// Called before a node's children; returning false stops the walk.
    fn visit(&mut self, node: &Node) -> bool;

    /// Called after a node's children and plugin elements.
    fn leave(&mut self, _node: &Node) {}
}

/// An element of the tree.
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    id: Option<String>,
    name: Option<String>,
    meta_id: Option<String>,
    sbo_term: Option<u32>,
    notes: Option<String>,
    annotation: Option<String>,
    line: Option<u32>,
    column: Option<u32>,
    namespace_uri: Option<String>,
    children: Vec<Node>,
    plugins: Vec<Plugin>,
    link: NodeLink,
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

impl Node {
    pub fn new(kind: impl Into<NodeKind>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            name: None,
            meta_id: None,
            sbo_term: None,
            notes: None,
            annotation: None,
            line: None,
            column: None,
            namespace_uri: None,
            children: Vec::new(),
            plugins: Vec::new(),
            link: NodeLink::default(),
        }
    }

    /// Node bound to `revision`; fails when the kind does not exist there.
    pub fn with_revision(kind: impl Into<NodeKind>, revision: Revision) -> Result<Self, SbmlError> {
        let mut node = Self::new(kind);
        let element_kind = node.element_kind();
        if !element_kind.exists_in(revision) {
            return Err(SbmlError::KindNotInRevision {
                kind: element_kind,
                revision,
            });
        }
        node.link.revision = Some(revision);
        node.namespace_uri = Some(revision.namespace_uri().to_string());
        Ok(node)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn element_kind(&self) -> ElementKind {
        self.kind.element_kind()
    }

    /// Human-readable kind name, e.g. `Species`.
    pub fn type_name(&self) -> &str {
        match &self.kind {
            NodeKind::Extension(ext) => ext.element().element_name(),
            _ => self.element_kind().type_name(),
        }
    }

    pub fn id_scope(&self) -> IdScope {
        match &self.kind {
            NodeKind::UnitDefinition => IdScope::UnitDefinitions,
            NodeKind::Parameter(_) if self.link.parent == Some(ElementKind::KineticLaw) => {
                IdScope::LocalParameters
            }
            NodeKind::Model(_)
            | NodeKind::FunctionDefinition(_)
            | NodeKind::Compartment(_)
            | NodeKind::SpeciesType
            | NodeKind::Species(_)
            | NodeKind::Parameter(_)
            | NodeKind::Reaction(_)
            | NodeKind::SpeciesReference(_)
            | NodeKind::ModifierSpeciesReference(_) => IdScope::Model,
            NodeKind::Extension(ext) => ext.element().id_scope(),
            _ => IdScope::Unscoped,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Sets the identifier; an empty string unsets it.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = non_empty(id.into());
    }

    pub fn unset_id(&mut self) {
        self.id = None;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = non_empty(name.into());
    }

    pub fn unset_name(&mut self) {
        self.name = None;
    }

    pub fn meta_id(&self) -> Option<&str> {
        self.meta_id.as_deref()
    }

    pub fn set_meta_id(&mut self, meta_id: impl Into<String>) {
        self.meta_id = non_empty(meta_id.into());
    }

    pub fn unset_meta_id(&mut self) {
        self.meta_id = None;
    }

    pub fn sbo_term(&self) -> Option<u32> {
        self.sbo_term
    }

    pub fn set_sbo_term(&mut self, term: Option<u32>) {
        self.sbo_term = term;
    }

    /// Notes markup: either a complete `<notes>` element or its content.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = non_empty(notes.into());
    }

    pub fn unset_notes(&mut self) {
        self.notes = None;
    }

    /// Annotation markup: either a complete `<annotation>` element or its
    /// content.
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn set_annotation(&mut self, annotation: impl Into<String>) {
        self.annotation = non_empty(annotation.into());
    }

    pub fn unset_annotation(&mut self) {
        self.annotation = None;
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn column(&self) -> Option<u32> {
        self.column
    }

    pub fn set_position(&mut self, line: Option<u32>, column: Option<u32>) {
        self.line = line;
        self.column = column;
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn set_namespace_uri(&mut self, uri: impl Into<String>) {
        self.namespace_uri = non_empty(uri.into());
    }

    pub fn link(&self) -> &NodeLink {
        &self.link
    }

    pub fn path(&self) -> &NodePath {
        &self.link.path
    }

    pub fn parent_kind(&self) -> Option<ElementKind> {
        self.link.parent
    }

    pub fn revision(&self) -> Option<Revision> {
        self.link.revision
    }

    pub fn math(&self) -> Option<&Math> {
        self.kind.math()
    }

    /// Stores an expression; returns false for kinds without one.
    pub fn set_math(&mut self, math: Math) -> bool {
        match self.kind.math_slot() {
            Some(slot) => {
                *slot = Some(math);
                true
            }
            None => false,
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct access to the children. Call [`Node::connect_to_child`]
    /// after adding, removing or reordering.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn children_of_kind(&self, kind: ElementKind) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.element_kind() == kind)
    }

    /// Whether `child` may be placed under this node.
    pub fn accepts_child(&self, child: &NodeKind) -> bool {
        ChildSlot::of(self.element_kind(), child).is_some()
    }

    /// Appends a child, or replaces the existing one for single-valued
    /// positions such as a reaction's kinetic law.
    pub fn add_child(&mut self, child: Node) -> Result<&mut Node, SbmlError> {
        let parent = self.element_kind();
        let Some(slot) = ChildSlot::of(parent, &child.kind) else {
            return Err(SbmlError::InvalidChild {
                parent,
                child: child.element_kind(),
            });
        };
        let existing = slot
            .is_singular()
            .then(|| {
                self.children
                    .iter()
                    .position(|c| ChildSlot::of(parent, &c.kind) == Some(slot))
            })
            .flatten();
        let index = match existing {
            Some(index) => {
                self.children[index] = child;
                index
            }
            None => {
                self.children.push(child);
                self.children.len() - 1
            }
        };
        self.connect_to_child();
        Ok(&mut self.children[index])
    }

    pub fn remove_child(&mut self, index: usize) -> Option<Node> {
        if index >= self.children.len() {
            return None;
        }
        let mut removed = self.children.remove(index);
        self.connect_to_child();
        removed.link = NodeLink {
            revision: removed.link.revision,
            ..NodeLink::default()
        };
        removed.connect_to_child();
        Some(removed)
    }

    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Plugin by package name or namespace URI.
    pub fn plugin(&self, key: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.matches(key))
    }

    pub fn plugin_mut(&mut self, key: &str) -> Option<&mut Plugin> {
        self.plugins.iter_mut().find(|p| p.matches(key))
    }

    /// Typed plugin state by package name or namespace URI.
    pub fn plugin_data<T: Any>(&self, key: &str) -> Option<&T> {
        self.plugin(key)?.downcast::<T>()
    }

    pub fn plugin_data_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.plugin_mut(key)?.downcast_mut::<T>()
    }

    /// Attaches a plugin; a node carries at most one per package, so a
    /// second plugin for the same package is refused.
    pub fn add_plugin(&mut self, plugin: Plugin) -> bool {
        if self
            .plugins
            .iter()
            .any(|p| p.package() == plugin.package() || p.uri() == plugin.uri())
        {
            return false;
        }
        self.plugins.push(plugin);
        self.connect_to_child();
        true
    }

    pub fn remove_plugin(&mut self, key: &str) -> Option<Plugin> {
        let index = self.plugins.iter().position(|p| p.matches(key))?;
        let removed = self.plugins.remove(index);
        self.connect_to_child();
        Some(removed)
    }

    pub(crate) fn plugins_mut(&mut self) -> &mut Vec<Plugin> {
        &mut self.plugins
    }

    /// Records this node's place under a parent with the given link.
    pub fn connect_to_parent(&mut self, parent: &NodeLink, parent_kind: ElementKind, step: PathStep) {
        let mut path = parent.path.clone();
        path.0.push(step);
        self.link = NodeLink {
            path,
            parent: Some(parent_kind),
            revision: parent.revision,
        };
        self.connect_to_child();
    }

    /// Rebuilds the links of every node below this one from this node's
    /// own link.
    pub fn connect_to_child(&mut self) {
        let kind = self.element_kind();
        let link = self.link.clone();
        for (index, child) in self.children.iter_mut().enumerate() {
            child.connect_to_parent(&link, kind, PathStep::Child(index));
        }
        for (plugin_index, plugin) in self.plugins.iter_mut().enumerate() {
            plugin.set_host(HostRef {
                path: link.path.clone(),
                kind,
            });
            for (element, node) in plugin.elements_mut().into_iter().enumerate() {
                node.connect_to_parent(
                    &link,
                    kind,
                    PathStep::PluginElement {
                        plugin: plugin_index,
                        element,
                    },
                );
            }
        }
    }

    pub(crate) fn set_link(&mut self, link: NodeLink) {
        self.link = link;
        self.connect_to_child();
    }

    /// Node at `path` relative to this node.
    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        let mut node = self;
        for step in path.steps() {
            node = match step {
                PathStep::Child(i) => node.children.get(*i)?,
                PathStep::PluginElement { plugin, element } => node
                    .plugins
                    .get(*plugin)?
                    .elements()
                    .into_iter()
                    .nth(*element)?,
            };
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut node = self;
        for step in path.steps() {
            node = match step {
                PathStep::Child(i) => node.children.get_mut(*i)?,
                PathStep::PluginElement { plugin, element } => node
                    .plugins
                    .get_mut(*plugin)?
                    .elements_mut()
                    .into_iter()
                    .nth(*element)?,
            };
        }
        Some(node)
    }

    /// Pre-order walk over this node, its children and plugin elements.
    /// `f` returns false to stop; the result tells whether the walk ran to
    /// completion.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Node) -> bool) -> bool {
        if !f(self) {
            return false;
        }
        for child in &self.children {
            if !child.walk(f) {
                return false;
            }
        }
        for plugin in &self.plugins {
            for element in plugin.elements() {
                if !element.walk(f) {
                    return false;
                }
            }
        }
        true
    }

    pub fn accept(&self, visitor: &mut dyn Visitor) -> bool {
        if !visitor.visit(self) {
            return false;
        }
        for child in &self.children {
            if !child.accept(visitor) {
                return false;
            }
        }
        for plugin in &self.plugins {
            for element in plugin.elements() {
                if !element.accept(visitor) {
                    return false;
                }
            }
        }
        visitor.leave(self);
        true
    }

    /// First descendant in the model-wide identifier scope with `id`.
    pub fn get_element_by_sid(&self, id: &str) -> Option<&Node> {
        let mut found = None;
        self.walk(&mut |node| {
            if !std::ptr::eq(node, self)
                && node.id_scope() == IdScope::Model
                && node.id() == Some(id)
            {
                found = Some(node);
                return false;
            }
            true
        });
        found
    }

    /// First node, this one included, whose metaid is `meta_id`.
    pub fn get_element_by_meta_id(&self, meta_id: &str) -> Option<&Node> {
        let mut found = None;
        self.walk(&mut |node| {
            if node.meta_id() == Some(meta_id) {
                found = Some(node);
                return false;
            }
            true
        });
        found
    }

    /// Every descendant, in document order, that satisfies `filter`.
    pub fn get_all_elements(&self, filter: impl Fn(&Node) -> bool) -> Vec<&Node> {
        let mut all = Vec::new();
        self.walk(&mut |node| {
            if !std::ptr::eq(node, self) && filter(node) {
                all.push(node);
            }
            true
        });
        all
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        let mut copy = Self {
            kind: self.kind.clone(),
            id: self.id.clone(),
            name: self.name.clone(),
            meta_id: self.meta_id.clone(),
            sbo_term: self.sbo_term,
            notes: self.notes.clone(),
            annotation: self.annotation.clone(),
            line: self.line,
            column: self.column,
            namespace_uri: self.namespace_uri.clone(),
            children: self.children.clone(),
            plugins: self.plugins.clone(),
            link: self.link.clone(),
        };
        copy.connect_to_child();
        copy
    }
}

macro_rules! payload_accessors {
    ($($variant:ident($ty:ty) => $as_ref:ident, $as_mut:ident;)*) => {
        $(
            impl From<$ty> for NodeKind {
                fn from(payload: $ty) -> Self {
                    NodeKind::$variant(payload)
                }
            }
        )*

        impl Node {
            $(
                pub fn $as_ref(&self) -> Option<&$ty> {
                    match &self.kind {
                        NodeKind::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }

                pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                    match &mut self.kind {
                        NodeKind::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            )*
        }
    };
}

payload_accessors! {
    Model(Model) => as_model, as_model_mut;
    FunctionDefinition(FunctionDefinition) => as_function_definition, as_function_definition_mut;
    Unit(Unit) => as_unit, as_unit_mut;
    Compartment(Compartment) => as_compartment, as_compartment_mut;
    Species(Species) => as_species, as_species_mut;
    Parameter(Parameter) => as_parameter, as_parameter_mut;
    InitialAssignment(InitialAssignment) => as_initial_assignment, as_initial_assignment_mut;
    Reaction(Reaction) => as_reaction, as_reaction_mut;
    SpeciesReference(SpeciesReference) => as_species_reference, as_species_reference_mut;
    ModifierSpeciesReference(ModifierSpeciesReference) => as_modifier, as_modifier_mut;
    KineticLaw(KineticLaw) => as_kinetic_law, as_kinetic_law_mut;
    Extension(ExtensionNode) => as_extension, as_extension_mut;
}

impl Node {
    pub fn as_rule(&self) -> Option<&Rule> {
        self.kind.rule()
    }

    pub fn as_rule_mut(&mut self) -> Option<&mut Rule> {
        self.kind.rule_mut()
    }

    /// Identifier that the node's math or attributes assign, for rules and
    /// initial assignments.
    pub fn assigned_symbol(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::AssignmentRule(r) | NodeKind::RateRule(r) => r.variable.as_deref(),
            NodeKind::InitialAssignment(a) => a.symbol.as_deref(),
            _ => None,
        }
    }

    fn identified(kind: impl Into<NodeKind>, id: &str) -> Self {
        let mut node = Self::new(kind);
        node.set_id(id);
        node
    }

    pub fn model(id: &str) -> Self {
        Self::identified(Model::default(), id)
    }

    pub fn unit_definition(id: &str) -> Self {
        Self::identified(NodeKind::UnitDefinition, id)
    }

    pub fn unit(unit: Unit) -> Self {
        Self::new(unit)
    }

    pub fn compartment(id: &str) -> Self {
        Self::identified(Compartment::default(), id)
    }

    pub fn species_type(id: &str) -> Self {
        Self::identified(NodeKind::SpeciesType, id)
    }

    pub fn species(id: &str, compartment: &str) -> Self {
        Self::identified(
            Species {
                compartment: non_empty(compartment.to_string()),
                ..Species::default()
            },
            id,
        )
    }

    pub fn parameter(id: &str, value: Option<f64>) -> Self {
        Self::identified(
            Parameter {
                value,
                ..Parameter::default()
            },
            id,
        )
    }

    pub fn function_definition(id: &str, formula: &str) -> Result<Self, MathError> {
        Ok(Self::identified(
            FunctionDefinition {
                math: Some(Math::parse_formula(formula)?),
            },
            id,
        ))
    }

    pub fn initial_assignment(symbol: &str, formula: &str) -> Result<Self, MathError> {
        Ok(Self::new(InitialAssignment {
            symbol: Some(symbol.to_string()),
            math: Some(Math::parse_formula(formula)?),
        }))
    }

    pub fn algebraic_rule(formula: &str) -> Result<Self, MathError> {
        Ok(Self::new(NodeKind::AlgebraicRule(Rule {
            math: Some(Math::parse_formula(formula)?),
            ..Rule::default()
        })))
    }

    pub fn assignment_rule(variable: &str, formula: &str) -> Result<Self, MathError> {
        Ok(Self::new(NodeKind::AssignmentRule(Rule {
            variable: Some(variable.to_string()),
            math: Some(Math::parse_formula(formula)?),
            ..Rule::default()
        })))
    }

    pub fn rate_rule(variable: &str, formula: &str) -> Result<Self, MathError> {
        Ok(Self::new(NodeKind::RateRule(Rule {
            variable: Some(variable.to_string()),
            math: Some(Math::parse_formula(formula)?),
            ..Rule::default()
        })))
    }

    pub fn reaction(id: &str) -> Self {
        Self::identified(Reaction::default(), id)
    }

    pub fn reactant(species: &str) -> Self {
        Self::new(SpeciesReference {
            role: ReferenceRole::Reactant,
            species: Some(species.to_string()),
            ..SpeciesReference::default()
        })
    }

    pub fn product(species: &str) -> Self {
        Self::new(SpeciesReference {
            role: ReferenceRole::Product,
            species: Some(species.to_string()),
            ..SpeciesReference::default()
        })
    }

    pub fn modifier(species: &str) -> Self {
        Self::new(ModifierSpeciesReference {
            species: Some(species.to_string()),
        })
    }

    pub fn kinetic_law(formula: &str) -> Result<Self, MathError> {
        Ok(Self::new(KineticLaw {
            math: Some(Math::parse_formula(formula)?),
            ..KineticLaw::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_model() -> Node {
        let mut model = Node::model("m");
        model.add_child(Node::compartment("cell")).expect("compartment");
        model.add_child(Node::species("s1", "cell")).expect("species");
        model.add_child(Node::unit_definition("u")).expect("unit definition");
        let mut reaction = Node::reaction("r1");
        reaction.add_child(Node::reactant("s1")).expect("reactant");
        let mut law = Node::kinetic_law("k * s1").expect("law");
        law.add_child(Node::parameter("k", Some(1.0))).expect("local parameter");
        reaction.add_child(law).expect("law");
        model.add_child(reaction).expect("reaction");
        model
    }

    #[test]
    fn children_are_linked_to_their_parents() {
        let model = small_model();
        let reaction = model.get_element_by_sid("r1").expect("reaction");
        assert_eq!(reaction.parent_kind(), Some(ElementKind::Model));
        assert_eq!(reaction.path(), &NodePath::root().child(3));
        let law = &reaction.children()[1];
        assert_eq!(law.path().to_string(), "/3/1");
        assert_eq!(model.node_at(law.path()).map(Node::element_kind), Some(ElementKind::KineticLaw));
    }

    #[test]
    fn sid_search_skips_other_scopes() {
        let model = small_model();
        assert!(model.get_element_by_sid("s1").is_some());
        assert!(model.get_element_by_sid("u").is_none());
        assert!(model.get_element_by_sid("k").is_none());
        assert!(model.get_element_by_sid("m").is_none());
    }

    #[test]
    fn meta_id_search_includes_self() {
        let mut model = small_model();
        model.set_meta_id("meta_m");
        assert!(model.get_element_by_meta_id("meta_m").is_some());
        assert!(model.get_element_by_meta_id("nothing").is_none());
    }

    #[test]
    fn rejected_children_report_both_kinds() {
        let mut unit_definition = Node::unit_definition("u");
        let err = unit_definition.add_child(Node::species("s", "c")).unwrap_err();
        assert!(matches!(
            err,
            SbmlError::InvalidChild {
                parent: ElementKind::UnitDefinition,
                child: ElementKind::Species
            }
        ));
    }

    #[test]
    fn kinetic_law_slot_holds_one_law() {
        let mut reaction = Node::reaction("r");
        reaction.add_child(Node::kinetic_law("a").expect("law")).expect("first");
        reaction.add_child(Node::kinetic_law("b").expect("law")).expect("second");
        assert_eq!(reaction.num_children(), 1);
        assert_eq!(
            reaction.children()[0].math().map(Math::formula).as_deref(),
            Some("b")
        );
    }

    #[test]
    fn clones_are_independent_and_relinked() {
        let model = small_model();
        let mut copy = model.clone();
        copy.children_mut().remove(0);
        copy.connect_to_child();
        assert_eq!(model.num_children(), 4);
        assert_eq!(copy.num_children(), 3);
        assert_eq!(copy.children()[0].path(), &NodePath::root().child(0));
        assert_eq!(copy.children()[0].id(), Some("s1"));
    }

    #[test]
    fn removing_a_child_renumbers_siblings() {
        let mut model = small_model();
        let removed = model.remove_child(0).expect("removed");
        assert_eq!(removed.path(), &NodePath::root());
        assert_eq!(removed.parent_kind(), None);
        assert_eq!(model.children()[0].path(), &NodePath::root().child(0));
    }

    #[test]
    fn visitor_can_stop_early() {
        struct CountUntilSpecies(usize);
        impl Visitor for CountUntilSpecies {
            fn visit(&mut self, node: &Node) -> bool {
                self.0 += 1;
                node.element_kind() != ElementKind::Species
            }
        }
        let model = small_model();
        let mut visitor = CountUntilSpecies(0);
        assert!(!model.accept(&mut visitor));
        assert_eq!(visitor.0, 3);
    }

    #[test]
    fn construction_for_a_revision_checks_the_kind() {
        assert!(Node::with_revision(NodeKind::SpeciesType, Revision::L2V2).is_ok());
        let err = Node::with_revision(NodeKind::SpeciesType, Revision::L3V1).unwrap_err();
        assert!(matches!(err, SbmlError::KindNotInRevision { .. }));
        let fd = Node::with_revision(FunctionDefinition::default(), Revision::L1V2);
        assert!(fd.is_err());
    }

    #[test]
    fn empty_identifiers_unset() {
        let mut node = Node::species_type("st");
        node.set_id("");
        assert_eq!(node.id(), None);
        node.set_name("Glucose");
        assert_eq!(node.name(), Some("Glucose"));
    }

    #[test]
    fn all_elements_are_listed_in_document_order() {
        let model = small_model();
        let kinds: Vec<ElementKind> = model
            .get_all_elements(|_| true)
            .into_iter()
            .map(Node::element_kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::Compartment,
                ElementKind::Species,
                ElementKind::UnitDefinition,
                ElementKind::Reaction,
                ElementKind::SpeciesReference,
                ElementKind::KineticLaw,
                ElementKind::Parameter,
            ]
        );
    }

    #[test]
    fn nodes_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Node>();
    }
}
