//! MathML content markup for Level 2 and later.

use super::MathError;
use super::ast::{AVOGADRO_SYMBOL_URL, Constant, MathNode, Operator};
use crate::xml::{XmlContent, XmlElement, XmlWriter, format_real, parse_real};
use sbml_schema::MATHML_XMLNS;

pub const TIME_SYMBOL_URL: &str = "http://www.sbml.org/sbml/symbols/time";

/// Writes `<math xmlns="...">` wrapping `node`.
pub fn write_math(node: &MathNode, out: &mut XmlWriter) {
    out.start_element("math");
    out.attribute("xmlns", MATHML_XMLNS);
    write_node(node, out);
    out.end_element();
}

fn write_node(node: &MathNode, out: &mut XmlWriter) {
    match node {
        MathNode::Integer(v) => out.inline_element("cn", &[("type", "integer")], &v.to_string()),
        MathNode::Real(v) => out.inline_element("cn", &[], &format_real(*v)),
        MathNode::Rational {
            numerator,
            denominator,
        } => out.raw_block(&format!(
            "<cn type=\"rational\"> {numerator} <sep/> {denominator} </cn>"
        )),
        MathNode::Identifier(name) => out.inline_element("ci", &[], name),
        MathNode::Time => out.inline_element(
            "csymbol",
            &[("encoding", "text"), ("definitionURL", TIME_SYMBOL_URL)],
            "time",
        ),
        MathNode::Constant(Constant::Avogadro) => out.inline_element(
            "csymbol",
            &[("encoding", "text"), ("definitionURL", AVOGADRO_SYMBOL_URL)],
            "avogadro",
        ),
        MathNode::Constant(c) => {
            out.start_element(c.mathml_name());
            out.end_element();
        }
        MathNode::Apply {
            op: Operator::Piecewise,
            args,
        } => write_piecewise(args, out),
        MathNode::Apply { op, args } => {
            out.start_element("apply");
            match op.csymbol_url() {
                Some(url) => out.inline_element(
                    "csymbol",
                    &[("encoding", "text"), ("definitionURL", url)],
                    op.mathml_name(),
                ),
                None => {
                    out.start_element(op.mathml_name());
                    out.end_element();
                }
            }
            for arg in args {
                write_node(arg, out);
            }
            out.end_element();
        }
        MathNode::Call { function, args } => {
            out.start_element("apply");
            out.inline_element("ci", &[], function);
            for arg in args {
                write_node(arg, out);
            }
            out.end_element();
        }
        MathNode::Lambda { params, body } => {
            out.start_element("lambda");
            for param in params {
                out.start_element("bvar");
                out.inline_element("ci", &[], param);
                out.end_element();
            }
            write_node(body, out);
            out.end_element();
        }
    }
}

fn write_piecewise(args: &[MathNode], out: &mut XmlWriter) {
    out.start_element("piecewise");
    for piece in args.chunks(2) {
        out.start_element(if piece.len() == 2 { "piece" } else { "otherwise" });
        for part in piece {
            write_node(part, out);
        }
        out.end_element();
    }
    out.end_element();
}

/// Reads the single expression inside a `<math>` element.
pub fn read_math(math: &XmlElement) -> Result<MathNode, MathError> {
    let mut children = math.child_elements();
    let Some(first) = children.next() else {
        return Err(MathError::Empty);
    };
    if children.next().is_some() {
        return Err(MathError::Markup(
            "<math> must contain exactly one expression".to_string(),
        ));
    }
    read_node(first)
}

fn read_node(element: &XmlElement) -> Result<MathNode, MathError> {
    match element.name.as_str() {
        "cn" => read_number(element),
        "ci" => Ok(MathNode::Identifier(element.text().trim().to_string())),
        "csymbol" => match element.attribute("definitionURL") {
            Some(TIME_SYMBOL_URL) => Ok(MathNode::Time),
            Some(AVOGADRO_SYMBOL_URL) => Ok(MathNode::Constant(Constant::Avogadro)),
            other => Err(MathError::Markup(format!(
                "unsupported csymbol '{}'",
                other.unwrap_or("")
            ))),
        },
        "apply" => read_apply(element),
        "piecewise" => read_piecewise(element),
        "lambda" => read_lambda(element),
        "semantics" => element
            .child_elements()
            .next()
            .ok_or(MathError::Empty)
            .and_then(read_node),
        name => Constant::from_mathml(name)
            .map(MathNode::Constant)
            .ok_or_else(|| MathError::Markup(format!("unsupported element <{name}>"))),
    }
}

fn read_number(element: &XmlElement) -> Result<MathNode, MathError> {
    let text = element.text();
    let text = text.trim();
    let invalid = || MathError::Markup(format!("invalid number '{text}'"));
    match element.attribute("type") {
        Some("integer") => text.parse::<i64>().map(MathNode::Integer).map_err(|_| invalid()),
        Some("e-notation") => {
            match separated_parts(element).as_slice() {
                [mantissa, exponent] => parse_real(&format!("{mantissa}e{exponent}"))
                    .map(MathNode::Real)
                    .ok_or_else(invalid),
                _ => Err(invalid()),
            }
        }
        Some("rational") => match separated_parts(element).as_slice() {
            [numerator, denominator] => {
                let numerator = numerator.parse::<i64>().map_err(|_| invalid())?;
                let denominator = denominator.parse::<i64>().map_err(|_| invalid())?;
                if denominator == 0 {
                    return Err(invalid());
                }
                Ok(MathNode::Rational {
                    numerator,
                    denominator,
                })
            }
            _ => Err(invalid()),
        },
        _ => parse_real(text).map(MathNode::Real).ok_or_else(invalid),
    }
}

/// Text on either side of the `<sep/>` in `<cn> a <sep/> b </cn>`.
fn separated_parts(element: &XmlElement) -> Vec<&str> {
    element
        .children
        .iter()
        .filter_map(|c| match c {
            XmlContent::Text(t) => Some(t.trim()),
            XmlContent::Element(_) => None,
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn read_piecewise(element: &XmlElement) -> Result<MathNode, MathError> {
    let mut args = Vec::new();
    let mut otherwise = None;
    for child in element.child_elements() {
        let parts = child
            .child_elements()
            .map(read_node)
            .collect::<Result<Vec<_>, _>>()?;
        match (child.name.as_str(), parts.len()) {
            ("piece", 2) if otherwise.is_none() => args.extend(parts),
            ("otherwise", 1) if otherwise.is_none() => otherwise = parts.into_iter().next(),
            (name, _) => {
                return Err(MathError::Markup(format!("misplaced <{name}> in <piecewise>")));
            }
        }
    }
    args.extend(otherwise);
    Ok(MathNode::apply(Operator::Piecewise, args))
}

fn read_apply(element: &XmlElement) -> Result<MathNode, MathError> {
    let mut children = element.child_elements();
    let Some(head) = children.next() else {
        return Err(MathError::Markup("empty <apply>".to_string()));
    };
    let mut args = Vec::new();
    let mut degree = None;
    let mut log_base = None;
    for child in children {
        match child.name.as_str() {
            "degree" => degree = Some(read_qualifier(child)?),
            "logbase" => log_base = Some(read_qualifier(child)?),
            _ => args.push(read_node(child)?),
        }
    }
    if head.name == "ci" {
        return Ok(MathNode::Call {
            function: head.text().trim().to_string(),
            args,
        });
    }
    let op = if head.name == "csymbol" {
        let url = head.attribute("definitionURL").unwrap_or_default();
        Operator::from_csymbol_url(url)
            .ok_or_else(|| MathError::Markup(format!("unsupported csymbol '{url}'")))?
    } else {
        Operator::from_mathml(&head.name)
            .filter(|op| *op != Operator::Piecewise)
            .ok_or_else(|| MathError::Markup(format!("unsupported operator <{}>", head.name)))?
    };
    let qualifier = match op {
        Operator::Root => degree.filter(|d| *d != MathNode::Integer(2)),
        Operator::Log => log_base.filter(|b| *b != MathNode::Integer(10)),
        _ => None,
    };
    if let Some(q) = qualifier {
        args.insert(0, q);
    }
    Ok(MathNode::apply(op, args))
}

fn read_qualifier(element: &XmlElement) -> Result<MathNode, MathError> {
    element
        .child_elements()
        .next()
        .ok_or(MathError::Empty)
        .and_then(read_node)
}

fn read_lambda(element: &XmlElement) -> Result<MathNode, MathError> {
    let mut params = Vec::new();
    let mut body = None;
    for child in element.child_elements() {
        if child.name == "bvar" {
            let name = child
                .child_elements()
                .next()
                .map(|ci| ci.text().trim().to_string())
                .ok_or_else(|| MathError::Markup("empty <bvar>".to_string()))?;
            params.push(name);
        } else if body.is_none() {
            body = Some(read_node(child)?);
        } else {
            return Err(MathError::Markup(
                "<lambda> must have a single body".to_string(),
            ));
        }
    }
    let body = body.ok_or(MathError::Empty)?;
    Ok(MathNode::Lambda {
        params,
        body: Box::new(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::infix::parse_formula;
    use crate::xml::parse_fragment;

    fn render(node: &MathNode) -> String {
        let mut out = XmlWriter::new();
        write_math(node, &mut out);
        out.finish()
    }

    fn reparse(markup: &str) -> MathNode {
        let elements = parse_fragment(markup, &[]).expect("fragment");
        read_math(&elements[0]).expect("math")
    }

    #[test]
    fn writes_nested_applies() {
        let node = parse_formula("k * S / 2").expect("formula");
        assert_eq!(
            render(&node),
            "<math xmlns=\"http://www.w3.org/1998/Math/MathML\">\n\
             \x20 <apply>\n\
             \x20   <divide/>\n\
             \x20   <apply>\n\
             \x20     <times/>\n\
             \x20     <ci> k </ci>\n\
             \x20     <ci> S </ci>\n\
             \x20   </apply>\n\
             \x20   <cn type=\"integer\"> 2 </cn>\n\
             \x20 </apply>\n\
             </math>\n"
        );
    }

    #[test]
    fn written_math_reads_back_unchanged() {
        for formula in [
            "(vm * s1)/(km + s1)",
            "exp(-k * t) + 2.5",
            "f(x, y) - pi",
            "sqrt(x) + log10(y)",
        ] {
            let node = parse_formula(formula).expect("formula");
            assert_eq!(reparse(&render(&node)), node, "formula {formula}");
        }
    }

    #[test]
    fn lambdas_and_time_symbols_read() {
        let node = reparse(
            "<math xmlns=\"http://www.w3.org/1998/Math/MathML\">\
             <lambda><bvar><ci>x</ci></bvar><apply><times/><ci>x</ci>\
             <csymbol encoding=\"text\" definitionURL=\"http://www.sbml.org/sbml/symbols/time\">t</csymbol>\
             </apply></lambda></math>",
        );
        assert_eq!(
            node,
            MathNode::Lambda {
                params: vec!["x".to_string()],
                body: Box::new(MathNode::apply(
                    Operator::Times,
                    vec![MathNode::ident("x"), MathNode::Time]
                )),
            }
        );
    }

    #[test]
    fn e_notation_and_degree_qualifiers() {
        assert_eq!(
            reparse("<math><cn type=\"e-notation\"> 1 <sep/> -3 </cn></math>"),
            MathNode::Real(1e-3)
        );
        assert_eq!(
            reparse("<math><apply><root/><degree><cn type=\"integer\">3</cn></degree><ci>x</ci></apply></math>"),
            MathNode::apply(Operator::Root, vec![MathNode::Integer(3), MathNode::ident("x")])
        );
    }

    fn wrapped(body: &str) -> String {
        format!("<math xmlns=\"http://www.w3.org/1998/Math/MathML\">{body}</math>")
    }

    #[test]
    fn every_construct_reads_and_writes_back() {
        let delay = "<apply><csymbol encoding=\"text\" \
                     definitionURL=\"http://www.sbml.org/sbml/symbols/delay\">delay</csymbol>\
                     <ci>x</ci><cn>0.5</cn></apply>";
        let rate_of = "<apply><csymbol encoding=\"text\" \
                       definitionURL=\"http://www.sbml.org/sbml/symbols/rateOf\">rateOf</csymbol>\
                       <ci>x</ci></apply>";
        let avogadro = "<csymbol encoding=\"text\" \
                        definitionURL=\"http://www.sbml.org/sbml/symbols/avogadro\">avogadro</csymbol>";
        let piecewise = "<piecewise><piece><cn>1</cn><apply><lt/><ci>x</ci><cn>0</cn></apply></piece>\
                         <otherwise><ci>x</ci></otherwise></piecewise>";
        let cases = [
            ("arcsin", "<apply><arcsin/><ci>x</ci></apply>".to_string()),
            ("sinh", "<apply><sinh/><ci>x</ci></apply>".to_string()),
            ("arccoth", "<apply><arccoth/><ci>x</ci></apply>".to_string()),
            ("sec", "<apply><sec/><ci>x</ci></apply>".to_string()),
            ("xor", "<apply><xor/><true/><ci>b</ci></apply>".to_string()),
            ("delay", delay.to_string()),
            ("rateOf", rate_of.to_string()),
            ("avogadro", avogadro.to_string()),
            ("piecewise", piecewise.to_string()),
            ("rational", "<cn type=\"rational\"> 1 <sep/> 3 </cn>".to_string()),
        ];
        for (name, body) in cases {
            let node = reparse(&wrapped(&body));
            let written = render(&node);
            assert_eq!(reparse(&written), node, "{name}");
            assert_eq!(render(&reparse(&written)), written, "{name}");
        }
    }

    #[test]
    fn piecewise_and_rationals_keep_their_shape() {
        let node = reparse(&wrapped(
            "<piecewise><piece><ci>a</ci><true/></piece><otherwise><ci>b</ci></otherwise></piecewise>",
        ));
        assert_eq!(
            node,
            MathNode::apply(
                Operator::Piecewise,
                vec![
                    MathNode::ident("a"),
                    MathNode::Constant(Constant::True),
                    MathNode::ident("b"),
                ]
            )
        );
        assert!(render(&node).contains("<otherwise>"));
        assert_eq!(
            render(&MathNode::Rational {
                numerator: 2,
                denominator: 7
            }),
            "<math xmlns=\"http://www.w3.org/1998/Math/MathML\">\n\
             \x20 <cn type=\"rational\"> 2 <sep/> 7 </cn>\n\
             </math>\n"
        );
        let unknown = parse_fragment(
            &wrapped("<apply><csymbol definitionURL=\"urn:x\">f</csymbol><ci>x</ci></apply>"),
            &[],
        )
        .expect("fragment");
        assert!(read_math(&unknown[0]).is_err());
    }

    #[test]
    fn unsupported_markup_is_rejected() {
        let elements = parse_fragment("<math><matrix/></math>", &[]).expect("fragment");
        assert!(read_math(&elements[0]).is_err());
        let empty = parse_fragment("<math/>", &[]).expect("fragment");
        assert_eq!(read_math(&empty[0]), Err(MathError::Empty));
    }
}
