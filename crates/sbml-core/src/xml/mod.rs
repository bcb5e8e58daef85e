//! Owned XML element trees and the output stream.
//!
//! Tokenizing is delegated to `roxmltree`; this module only copies the
//! parts of its tree that outlive the input text (package content, MathML)
//! into owned values, and writes them back out.

pub mod writer;

pub use writer::{XML_DECLARATION, XmlWriter, format_real, parse_real};

use std::fmt;

/// An attribute with its namespace resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub prefix: Option<String>,
    pub uri: Option<String>,
    pub value: String,
}

impl XmlAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            uri: None,
            value: value.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlContent {
    Element(XmlElement),
    Text(String),
}

/// An owned element subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub prefix: Option<String>,
    pub uri: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    /// Namespaces declared on this element (not inherited ones).
    pub namespaces: Vec<(Option<String>, String)>,
    pub children: Vec<XmlContent>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Original markup, kept for `<notes>` and `<annotation>`.
    pub raw: Option<String>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            uri: None,
            attributes: Vec::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
            line: None,
            column: None,
            raw: None,
        }
    }

    pub fn qualified_name(&self) -> String {
        qualify(self.prefix.as_deref(), &self.name)
    }

    /// Value of an attribute by local name, in any namespace.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlContent::Element(element) => Some(element),
            XmlContent::Text(_) => None,
        })
    }

    /// Concatenated direct text content.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlContent::Text(text) => Some(text.as_str()),
                XmlContent::Element(_) => None,
            })
            .collect()
    }

    /// Writes the subtree through `out`, dropping whitespace-only text.
    pub fn write(&self, out: &mut XmlWriter) {
        if let Some(raw) = &self.raw {
            out.raw_block(raw);
            return;
        }
        let name = self.qualified_name();
        let text = self.text();
        let has_elements = self.child_elements().next().is_some();
        let attributes = self.attribute_pairs();
        if !has_elements && !text.trim().is_empty() {
            let borrowed: Vec<(&str, &str)> = attributes
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            out.inline_element(&name, &borrowed, text.trim());
            return;
        }
        out.start_element(&name);
        for (key, value) in &attributes {
            out.attribute(key, value);
        }
        for child in &self.children {
            match child {
                XmlContent::Element(element) => element.write(out),
                XmlContent::Text(text) if !text.trim().is_empty() => out.text_line(text.trim()),
                XmlContent::Text(_) => {}
            }
        }
        out.end_element();
    }

    fn attribute_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (prefix, uri) in &self.namespaces {
            let key = match prefix {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            pairs.push((key, uri.clone()));
        }
        for attr in &self.attributes {
            pairs.push((attr.qualified_name(), attr.value.clone()));
        }
        pairs
    }

    /// Copies a `roxmltree` element into an owned tree.
    pub fn from_node(node: roxmltree::Node<'_, '_>, source: &str) -> Self {
        let tag = node.tag_name();
        let uri = tag.namespace().map(str::to_string);
        let prefix = tag
            .namespace()
            .and_then(|ns| node.lookup_prefix(ns))
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let pos = node.document().text_pos_at(node.range().start);

        let parent_ns: Vec<(Option<&str>, &str)> = node
            .parent_element()
            .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
            .unwrap_or_default();
        let namespaces = node
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .filter(|ns| !parent_ns.contains(&(ns.name(), ns.uri())))
            .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
            .collect();

        let attributes = node
            .attributes()
            .map(|attr| XmlAttribute {
                name: attr.name().to_string(),
                prefix: attr
                    .namespace()
                    .and_then(|ns| node.lookup_prefix(ns))
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
                uri: attr.namespace().map(str::to_string),
                value: attr.value().to_string(),
            })
            .collect();

        let raw = match tag.name() {
            "notes" | "annotation" => source.get(node.range()).map(str::to_string),
            _ => None,
        };

        let children = node
            .children()
            .filter_map(|child| {
                if child.is_element() {
                    Some(XmlContent::Element(XmlElement::from_node(child, source)))
                } else if child.is_text() {
                    child.text().map(|t| XmlContent::Text(t.to_string()))
                } else {
                    None
                }
            })
            .collect();

        Self {
            name: tag.name().to_string(),
            prefix,
            uri,
            attributes,
            namespaces,
            children,
            line: Some(pos.row),
            column: Some(pos.col),
            raw,
        }
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = XmlWriter::new();
        self.write(&mut out);
        f.write_str(out.finish().trim_end())
    }
}

/// Error from the tokenizer, with its position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct XmlParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl From<roxmltree::Error> for XmlParseError {
    fn from(err: roxmltree::Error) -> Self {
        let pos = err.pos();
        Self {
            message: err.to_string(),
            line: pos.row,
            column: pos.col,
        }
    }
}

/// Parses a fragment of markup into an owned element, declaring the given
/// namespaces on a synthetic wrapper so prefixed content resolves.
pub fn parse_fragment(
    markup: &str,
    namespaces: &[(Option<String>, String)],
) -> Result<Vec<XmlElement>, XmlParseError> {
    let mut wrapped = String::from("<fragment");
    for (prefix, uri) in namespaces {
        match prefix {
            Some(prefix) => wrapped.push_str(&format!(" xmlns:{prefix}=\"{uri}\"")),
            None => wrapped.push_str(&format!(" xmlns=\"{uri}\"")),
        }
    }
    wrapped.push('>');
    wrapped.push_str(markup);
    wrapped.push_str("</fragment>");
    let doc = roxmltree::Document::parse(&wrapped)?;
    Ok(doc
        .root_element()
        .children()
        .filter(|n| n.is_element())
        .map(|n| XmlElement::from_node(n, &wrapped))
        .collect())
}

pub fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{name}"),
        _ => name.to_string(),
    }
}
