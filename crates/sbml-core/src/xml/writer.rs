//! Indenting XML output stream.
//!
//! Elements are written two spaces per nesting level, one per line. A start
//! tag stays open until the first child, text block or end tag decides
//! whether it closes as `>` or `/>`.

pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
    open: Vec<String>,
    start_pending: bool,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer that starts with the fixed XML declaration line.
    pub fn with_declaration() -> Self {
        let mut writer = Self::new();
        writer.out.push_str(XML_DECLARATION);
        writer.out.push('\n');
        writer
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn start_element(&mut self, name: &str) {
        self.close_pending_start();
        self.indent();
        self.out.push('<');
        self.out.push_str(name);
        self.open.push(name.to_string());
        self.start_pending = true;
    }

    /// Adds an attribute to the start tag currently being written.
    ///
    /// Ignored when no start tag is open.
    pub fn attribute(&mut self, name: &str, value: &str) {
        if !self.start_pending {
            return;
        }
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        escape_into(&mut self.out, value, true);
        self.out.push('"');
    }

    pub fn end_element(&mut self) {
        let Some(name) = self.open.pop() else {
            return;
        };
        if self.start_pending {
            self.out.push_str("/>\n");
            self.start_pending = false;
            return;
        }
        self.indent();
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push_str(">\n");
    }

    /// Escaped text on its own indented line.
    pub fn text_line(&mut self, text: &str) {
        self.close_pending_start();
        self.indent();
        escape_into(&mut self.out, text, false);
        self.out.push('\n');
    }

    /// Markup copied byte-for-byte after the current indentation.
    pub fn raw_block(&mut self, markup: &str) {
        self.close_pending_start();
        self.indent();
        self.out.push_str(markup);
        self.out.push('\n');
    }

    /// `<name attrs> text </name>` on a single line, as MathML tokens are
    /// written.
    pub fn inline_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) {
        self.close_pending_start();
        self.indent();
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attributes {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            escape_into(&mut self.out, value, true);
            self.out.push('"');
        }
        self.out.push_str("> ");
        escape_into(&mut self.out, text, false);
        self.out.push_str(" </");
        self.out.push_str(name);
        self.out.push_str(">\n");
    }

    /// Closes every open element and returns the markup.
    pub fn finish(mut self) -> String {
        while !self.open.is_empty() {
            self.end_element();
        }
        self.out
    }

    fn close_pending_start(&mut self) {
        if self.start_pending {
            self.out.push_str(">\n");
            self.start_pending = false;
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.open.len() {
            self.out.push_str(INDENT);
        }
    }
}

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\'' if attribute => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
}

/// Renders a double the way it appears in attributes and `<cn>` elements.
///
/// Integral values print without a fractional part, very large or small
/// magnitudes use exponent notation, and the non-finite values use the
/// `INF`/`-INF`/`NaN` spellings.
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-5..1e15).contains(&magnitude) {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

/// Parses a double written by [`format_real`] or by other SBML tools.
pub fn parse_real(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    match trimmed {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => trimmed.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_element_self_closes() {
        let mut w = XmlWriter::with_declaration();
        w.start_element("sbml");
        w.attribute("level", "1");
        w.end_element();
        assert_eq!(
            w.finish(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<sbml level=\"1\"/>\n"
        );
    }

    #[test]
    fn nested_elements_indent_two_spaces() {
        let mut w = XmlWriter::new();
        w.start_element("a");
        w.start_element("b");
        w.start_element("c");
        w.end_element();
        w.end_element();
        w.text_line("x < y");
        w.end_element();
        assert_eq!(w.finish(), "<a>\n  <b>\n    <c/>\n  </b>\n  x &lt; y\n</a>\n");
    }

    #[test]
    fn attribute_values_are_escaped() {
        let mut w = XmlWriter::new();
        w.start_element("p");
        w.attribute("formula", "a < b & \"c\"");
        w.end_element();
        assert_eq!(
            w.finish(),
            "<p formula=\"a &lt; b &amp; &quot;c&quot;\"/>\n"
        );
    }

    #[test]
    fn raw_blocks_are_not_reindented() {
        let mut w = XmlWriter::new();
        w.start_element("c");
        w.raw_block("<annotation>\n<x/>\n</annotation>");
        w.end_element();
        assert_eq!(w.finish(), "<c>\n  <annotation>\n<x/>\n</annotation>\n</c>\n");
    }

    #[test]
    fn inline_elements_pad_their_text() {
        let mut w = XmlWriter::new();
        w.start_element("apply");
        w.inline_element("cn", &[("type", "integer")], "3");
        w.end_element();
        assert_eq!(
            w.finish(),
            "<apply>\n  <cn type=\"integer\"> 3 </cn>\n</apply>\n"
        );
    }

    #[test]
    fn reals_render_compactly() {
        assert_eq!(format_real(3.0), "3");
        assert_eq!(format_real(2.1), "2.1");
        assert_eq!(format_real(-0.7), "-0.7");
        assert_eq!(format_real(1e-20), "1e-20");
        assert_eq!(format_real(6.02e23), "6.02e23");
        assert_eq!(format_real(f64::INFINITY), "INF");
        assert_eq!(format_real(f64::NAN), "NaN");
    }

    #[test]
    fn reals_parse_back() {
        assert_eq!(parse_real(" 2.1 "), Some(2.1));
        assert_eq!(parse_real("1e-20"), Some(1e-20));
        assert_eq!(parse_real("-INF"), Some(f64::NEG_INFINITY));
        assert!(parse_real("NaN").is_some_and(f64::is_nan));
        assert_eq!(parse_real("abc"), None);
    }
}
