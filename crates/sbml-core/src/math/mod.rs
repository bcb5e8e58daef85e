//! Mathematical expressions attached to kinetic laws, rules, initial
//! assignments and function definitions.

pub mod ast;
pub mod infix;
pub mod mathml;

pub use ast::{Constant, MathNode, Operator};
pub use infix::{format_formula, parse_formula};
pub use mathml::{read_math, write_math};

/// Failure to read an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("empty expression")]
    Empty,

    #[error("formula syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("invalid MathML: {0}")]
    Markup(String),
}

/// An expression plus the formula text it was written as, when it came
/// from formula text. Keeping the text lets Level 1 output reproduce the
/// author's spelling.
#[derive(Debug, Clone)]
pub struct Math {
    ast: MathNode,
    formula: Option<String>,
}

impl Math {
    pub fn parse_formula(text: &str) -> Result<Self, MathError> {
        let ast = parse_formula(text)?;
        Ok(Self {
            ast,
            formula: Some(text.to_string()),
        })
    }

    pub fn from_ast(ast: MathNode) -> Self {
        Self { ast, formula: None }
    }

    pub fn ast(&self) -> &MathNode {
        &self.ast
    }

    /// Replaces the tree; the remembered formula text no longer applies.
    pub fn set_ast(&mut self, ast: MathNode) {
        self.ast = ast;
        self.formula = None;
    }

    /// Formula text: the original spelling if any, otherwise rendered.
    pub fn formula(&self) -> String {
        self.formula
            .clone()
            .unwrap_or_else(|| format_formula(&self.ast))
    }
}

impl PartialEq for Math {
    fn eq(&self, other: &Self) -> bool {
        self.ast == other.ast
    }
}

impl From<MathNode> for Math {
    fn from(ast: MathNode) -> Self {
        Math::from_ast(ast)
    }
}
