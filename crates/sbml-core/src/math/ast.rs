//! Expression trees shared by infix formulas and MathML.

use std::collections::{BTreeMap, BTreeSet};

pub const AVOGADRO_SYMBOL_URL: &str = "http://www.sbml.org/sbml/symbols/avogadro";
pub const DELAY_SYMBOL_URL: &str = "http://www.sbml.org/sbml/symbols/delay";
pub const RATE_OF_SYMBOL_URL: &str = "http://www.sbml.org/sbml/symbols/rateOf";

const AVOGADRO: f64 = 6.022_140_857e23;

/// Named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    ExponentialE,
    True,
    False,
    Infinity,
    NotANumber,
    /// Avogadro's number, a Level 3 csymbol.
    Avogadro,
}

impl Constant {
    pub fn mathml_name(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::ExponentialE => "exponentiale",
            Constant::True => "true",
            Constant::False => "false",
            Constant::Infinity => "infinity",
            Constant::NotANumber => "notanumber",
            Constant::Avogadro => "avogadro",
        }
    }

    /// Constants written as empty elements; `avogadro` is a csymbol.
    pub fn from_mathml(name: &str) -> Option<Self> {
        Some(match name {
            "pi" => Constant::Pi,
            "exponentiale" => Constant::ExponentialE,
            "true" => Constant::True,
            "false" => Constant::False,
            "infinity" => Constant::Infinity,
            "notanumber" => Constant::NotANumber,
            _ => return None,
        })
    }

    /// Spelling in infix formulas.
    pub fn infix_name(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::ExponentialE => "exponentiale",
            Constant::True => "true",
            Constant::False => "false",
            Constant::Infinity => "INF",
            Constant::NotANumber => "NaN",
            Constant::Avogadro => "avogadro",
        }
    }

    pub fn from_infix(name: &str) -> Option<Self> {
        Some(match name {
            "pi" => Constant::Pi,
            "exponentiale" => Constant::ExponentialE,
            "true" => Constant::True,
            "false" => Constant::False,
            "INF" | "inf" | "infinity" => Constant::Infinity,
            "NaN" | "nan" | "notanumber" => Constant::NotANumber,
            _ => return None,
        })
    }

    pub fn value(self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
            Constant::ExponentialE => std::f64::consts::E,
            Constant::True => 1.0,
            Constant::False => 0.0,
            Constant::Infinity => f64::INFINITY,
            Constant::NotANumber => f64::NAN,
            Constant::Avogadro => AVOGADRO,
        }
    }
}

/// Built-in operators and functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
    Root,
    Abs,
    Exp,
    Ln,
    Log,
    Floor,
    Ceiling,
    Factorial,
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Arcsin,
    Arccos,
    Arctan,
    Arcsec,
    Arccsc,
    Arccot,
    Arcsinh,
    Arccosh,
    Arctanh,
    Arcsech,
    Arccsch,
    Arccoth,
    Max,
    Min,
    Quotient,
    Rem,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    And,
    Or,
    Xor,
    Not,
    Implies,
    /// Arguments are value/condition pairs, optionally followed by the
    /// `otherwise` value.
    Piecewise,
    /// `delay(x, d)`, a csymbol.
    Delay,
    /// `rateOf(x)`, a Level 3 Version 2 csymbol.
    RateOf,
}

impl Operator {
    const TABLE: &'static [(Operator, &'static str, &'static str)] = &[
        (Operator::Plus, "plus", "plus"),
        (Operator::Minus, "minus", "minus"),
        (Operator::Times, "times", "times"),
        (Operator::Divide, "divide", "divide"),
        (Operator::Power, "power", "pow"),
        (Operator::Root, "root", "sqrt"),
        (Operator::Abs, "abs", "abs"),
        (Operator::Exp, "exp", "exp"),
        (Operator::Ln, "ln", "log"),
        (Operator::Log, "log", "log10"),
        (Operator::Floor, "floor", "floor"),
        (Operator::Ceiling, "ceiling", "ceil"),
        (Operator::Factorial, "factorial", "factorial"),
        (Operator::Sin, "sin", "sin"),
        (Operator::Cos, "cos", "cos"),
        (Operator::Tan, "tan", "tan"),
        (Operator::Sec, "sec", "sec"),
        (Operator::Csc, "csc", "csc"),
        (Operator::Cot, "cot", "cot"),
        (Operator::Sinh, "sinh", "sinh"),
        (Operator::Cosh, "cosh", "cosh"),
        (Operator::Tanh, "tanh", "tanh"),
        (Operator::Sech, "sech", "sech"),
        (Operator::Csch, "csch", "csch"),
        (Operator::Coth, "coth", "coth"),
        (Operator::Arcsin, "arcsin", "asin"),
        (Operator::Arccos, "arccos", "acos"),
        (Operator::Arctan, "arctan", "atan"),
        (Operator::Arcsec, "arcsec", "arcsec"),
        (Operator::Arccsc, "arccsc", "arccsc"),
        (Operator::Arccot, "arccot", "arccot"),
        (Operator::Arcsinh, "arcsinh", "arcsinh"),
        (Operator::Arccosh, "arccosh", "arccosh"),
        (Operator::Arctanh, "arctanh", "arctanh"),
        (Operator::Arcsech, "arcsech", "arcsech"),
        (Operator::Arccsch, "arccsch", "arccsch"),
        (Operator::Arccoth, "arccoth", "arccoth"),
        (Operator::Max, "max", "max"),
        (Operator::Min, "min", "min"),
        (Operator::Quotient, "quotient", "quotient"),
        (Operator::Rem, "rem", "rem"),
        (Operator::Eq, "eq", "eq"),
        (Operator::Neq, "neq", "neq"),
        (Operator::Lt, "lt", "lt"),
        (Operator::Gt, "gt", "gt"),
        (Operator::Leq, "leq", "leq"),
        (Operator::Geq, "geq", "geq"),
        (Operator::And, "and", "and"),
        (Operator::Or, "or", "or"),
        (Operator::Xor, "xor", "xor"),
        (Operator::Not, "not", "not"),
        (Operator::Implies, "implies", "implies"),
        (Operator::Piecewise, "piecewise", "piecewise"),
        (Operator::Delay, "delay", "delay"),
        (Operator::RateOf, "rateOf", "rateOf"),
    ];

    pub fn mathml_name(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(op, _, _)| *op == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("plus")
    }

    /// Operators written as empty elements after `<apply>`.
    pub fn from_mathml(name: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(_, mathml, _)| *mathml == name)
            .map(|(op, _, _)| *op)
            .filter(|op| op.csymbol_url().is_none())
    }

    /// Definition URL of operators written as `<csymbol>`.
    pub fn csymbol_url(self) -> Option<&'static str> {
        match self {
            Operator::Delay => Some(DELAY_SYMBOL_URL),
            Operator::RateOf => Some(RATE_OF_SYMBOL_URL),
            _ => None,
        }
    }

    pub fn from_csymbol_url(url: &str) -> Option<Self> {
        match url {
            DELAY_SYMBOL_URL => Some(Operator::Delay),
            RATE_OF_SYMBOL_URL => Some(Operator::RateOf),
            _ => None,
        }
    }

    /// Function-call spelling in infix formulas (`log` is the natural log,
    /// as in Level 1 formulas).
    pub fn function_name(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(op, _, _)| *op == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("plus")
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        match name {
            "ln" => return Some(Operator::Ln),
            "ceiling" => return Some(Operator::Ceiling),
            "power" => return Some(Operator::Power),
            "arcsin" => return Some(Operator::Arcsin),
            "arccos" => return Some(Operator::Arccos),
            "arctan" => return Some(Operator::Arctan),
            _ => {}
        }
        Self::TABLE
            .iter()
            .find(|(_, _, function)| *function == name)
            .map(|(op, _, _)| *op)
            .filter(|op| {
                !matches!(
                    op,
                    Operator::Plus | Operator::Minus | Operator::Times | Operator::Divide
                )
            })
    }

    /// Functions introduced in Level 3 Version 2.
    pub fn is_l3v2_only(self) -> bool {
        matches!(
            self,
            Operator::Max
                | Operator::Min
                | Operator::Quotient
                | Operator::Rem
                | Operator::Implies
                | Operator::RateOf
        )
    }

    /// Whether the result is dimensionless regardless of arguments.
    pub fn is_dimensionless(self) -> bool {
        matches!(
            self,
            Operator::Exp
                | Operator::Ln
                | Operator::Log
                | Operator::Factorial
                | Operator::Sin
                | Operator::Cos
                | Operator::Tan
                | Operator::Sec
                | Operator::Csc
                | Operator::Cot
                | Operator::Sinh
                | Operator::Cosh
                | Operator::Tanh
                | Operator::Sech
                | Operator::Csch
                | Operator::Coth
                | Operator::Arcsin
                | Operator::Arccos
                | Operator::Arctan
                | Operator::Arcsec
                | Operator::Arccsc
                | Operator::Arccot
                | Operator::Arcsinh
                | Operator::Arccosh
                | Operator::Arctanh
                | Operator::Arcsech
                | Operator::Arccsch
                | Operator::Arccoth
                | Operator::Eq
                | Operator::Neq
                | Operator::Lt
                | Operator::Gt
                | Operator::Leq
                | Operator::Geq
                | Operator::And
                | Operator::Or
                | Operator::Xor
                | Operator::Not
                | Operator::Implies
        )
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    Integer(i64),
    Real(f64),
    /// `<cn type="rational">`, kept as written.
    Rational {
        numerator: i64,
        denominator: i64,
    },
    Identifier(String),
    /// The simulation time symbol.
    Time,
    Constant(Constant),
    Apply {
        op: Operator,
        args: Vec<MathNode>,
    },
    /// Call of a user-defined function.
    Call {
        function: String,
        args: Vec<MathNode>,
    },
    Lambda {
        params: Vec<String>,
        body: Box<MathNode>,
    },
}

impl MathNode {
    pub fn apply(op: Operator, args: Vec<MathNode>) -> Self {
        MathNode::Apply { op, args }
    }

    pub fn ident(name: impl Into<String>) -> Self {
        MathNode::Identifier(name.into())
    }

    /// Pre-order walk over every node.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a MathNode)) {
        f(self);
        match self {
            MathNode::Apply { args, .. } | MathNode::Call { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            MathNode::Lambda { body, .. } => body.walk(f),
            _ => {}
        }
    }

    /// Identifiers referenced outside lambda parameter bindings.
    pub fn free_identifiers(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.collect_free(&mut Vec::new(), &mut found);
        found
    }

    fn collect_free(&self, bound: &mut Vec<String>, found: &mut BTreeSet<String>) {
        match self {
            MathNode::Identifier(name) if !bound.contains(name) => {
                found.insert(name.clone());
            }
            MathNode::Apply { args, .. } | MathNode::Call { args, .. } => {
                for arg in args {
                    arg.collect_free(bound, found);
                }
            }
            MathNode::Lambda { params, body } => {
                let before = bound.len();
                bound.extend(params.iter().cloned());
                body.collect_free(bound, found);
                bound.truncate(before);
            }
            _ => {}
        }
    }

    /// Names of user-defined functions called anywhere in the tree.
    pub fn called_functions(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.walk(&mut |node| {
            if let MathNode::Call { function, .. } = node {
                found.insert(function.clone());
            }
        });
        found
    }

    /// Replaces free identifiers by the given expressions.
    pub fn substitute(&self, bindings: &BTreeMap<String, MathNode>) -> MathNode {
        match self {
            MathNode::Identifier(name) => bindings
                .get(name)
                .cloned()
                .unwrap_or_else(|| self.clone()),
            MathNode::Apply { op, args } => MathNode::Apply {
                op: *op,
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            MathNode::Call { function, args } => MathNode::Call {
                function: function.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            MathNode::Lambda { params, body } => {
                let inner: BTreeMap<String, MathNode> = bindings
                    .iter()
                    .filter(|(k, _)| !params.contains(k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                MathNode::Lambda {
                    params: params.clone(),
                    body: Box::new(body.substitute(&inner)),
                }
            }
            _ => self.clone(),
        }
    }

    /// Renames every free occurrence of `from` to `to`.
    pub fn rename_identifier(&mut self, from: &str, to: &str) {
        match self {
            MathNode::Identifier(name) if name == from => *name = to.to_string(),
            MathNode::Apply { args, .. } | MathNode::Call { args, .. } => {
                for arg in args {
                    arg.rename_identifier(from, to);
                }
            }
            MathNode::Lambda { params, body } if !params.iter().any(|p| p == from) => {
                body.rename_identifier(from, to);
            }
            _ => {}
        }
    }

    /// Numeric value, resolving identifiers through `lookup`.
    ///
    /// `None` when an identifier is unknown or a user function is called.
    pub fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
        match self {
            MathNode::Integer(v) => Some(*v as f64),
            MathNode::Real(v) => Some(*v),
            MathNode::Rational {
                numerator,
                denominator,
            } => Some(*numerator as f64 / *denominator as f64),
            MathNode::Identifier(name) => lookup(name),
            MathNode::Time => Some(0.0),
            MathNode::Constant(c) => Some(c.value()),
            MathNode::Call { .. } | MathNode::Lambda { .. } => None,
            MathNode::Apply {
                op: Operator::Piecewise,
                args,
            } => evaluate_piecewise(args, lookup),
            MathNode::Apply { op, args } => {
                let values = args
                    .iter()
                    .map(|a| a.evaluate(lookup))
                    .collect::<Option<Vec<f64>>>()?;
                evaluate_op(*op, &values)
            }
        }
    }
}

fn truth(v: bool) -> f64 {
    if v { 1.0 } else { 0.0 }
}

/// First value whose condition holds, else the `otherwise` value.
fn evaluate_piecewise(args: &[MathNode], lookup: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
    let mut pieces = args.chunks(2);
    for piece in pieces.by_ref() {
        match piece {
            [value, condition] => {
                if condition.evaluate(lookup)? != 0.0 {
                    return value.evaluate(lookup);
                }
            }
            [otherwise] => return otherwise.evaluate(lookup),
            _ => return None,
        }
    }
    None
}

fn evaluate_op(op: Operator, v: &[f64]) -> Option<f64> {
    let first = v.first().copied();
    let pair = || match v {
        [a, b] => Some((*a, *b)),
        _ => None,
    };
    Some(match op {
        Operator::Plus => v.iter().sum(),
        Operator::Times => v.iter().product(),
        Operator::Minus => match v {
            [a] => -a,
            [a, b] => a - b,
            _ => return None,
        },
        Operator::Divide => {
            let (a, b) = pair()?;
            a / b
        }
        Operator::Power => {
            let (a, b) = pair()?;
            a.powf(b)
        }
        Operator::Root => match v {
            [a] => a.sqrt(),
            [degree, a] => a.powf(1.0 / degree),
            _ => return None,
        },
        Operator::Abs => first?.abs(),
        Operator::Exp => first?.exp(),
        Operator::Ln => first?.ln(),
        Operator::Log => match v {
            [a] => a.log10(),
            [base, a] => a.log(*base),
            _ => return None,
        },
        Operator::Floor => first?.floor(),
        Operator::Ceiling => first?.ceil(),
        Operator::Factorial => {
            let n = first?;
            if n < 0.0 || n.fract() != 0.0 {
                return None;
            }
            (1..=(n as u64)).map(|k| k as f64).product()
        }
        Operator::Sin => first?.sin(),
        Operator::Cos => first?.cos(),
        Operator::Tan => first?.tan(),
        Operator::Sec => first?.cos().recip(),
        Operator::Csc => first?.sin().recip(),
        Operator::Cot => first?.tan().recip(),
        Operator::Sinh => first?.sinh(),
        Operator::Cosh => first?.cosh(),
        Operator::Tanh => first?.tanh(),
        Operator::Sech => first?.cosh().recip(),
        Operator::Csch => first?.sinh().recip(),
        Operator::Coth => first?.tanh().recip(),
        Operator::Arcsin => first?.asin(),
        Operator::Arccos => first?.acos(),
        Operator::Arctan => first?.atan(),
        Operator::Arcsec => first?.recip().acos(),
        Operator::Arccsc => first?.recip().asin(),
        Operator::Arccot => first?.recip().atan(),
        Operator::Arcsinh => first?.asinh(),
        Operator::Arccosh => first?.acosh(),
        Operator::Arctanh => first?.atanh(),
        Operator::Arcsech => first?.recip().acosh(),
        Operator::Arccsch => first?.recip().asinh(),
        Operator::Arccoth => first?.recip().atanh(),
        Operator::Max => v.iter().copied().reduce(f64::max)?,
        Operator::Min => v.iter().copied().reduce(f64::min)?,
        Operator::Quotient => {
            let (a, b) = pair()?;
            (a / b).trunc()
        }
        Operator::Rem => {
            let (a, b) = pair()?;
            a % b
        }
        Operator::Eq => truth(v.windows(2).all(|w| w[0] == w[1])),
        Operator::Neq => {
            let (a, b) = pair()?;
            truth(a != b)
        }
        Operator::Lt => truth(v.windows(2).all(|w| w[0] < w[1])),
        Operator::Gt => truth(v.windows(2).all(|w| w[0] > w[1])),
        Operator::Leq => truth(v.windows(2).all(|w| w[0] <= w[1])),
        Operator::Geq => truth(v.windows(2).all(|w| w[0] >= w[1])),
        Operator::And => truth(v.iter().all(|x| *x != 0.0)),
        Operator::Or => truth(v.iter().any(|x| *x != 0.0)),
        Operator::Xor => truth(v.iter().filter(|x| **x != 0.0).count() % 2 == 1),
        Operator::Not => truth(first? == 0.0),
        Operator::Implies => {
            let (a, b) = pair()?;
            truth(a == 0.0 || b != 0.0)
        }
        // Piecewise is evaluated lazily; delay and rateOf need simulation state.
        Operator::Piecewise | Operator::Delay | Operator::RateOf => return None,
    })
}
