//! Declarative XML tree used by the builder and parser.
//!
//! The answer file is order-sensitive, so the document is modeled as an
//! explicit tree of elements built first and serialized once. The same tree
//! is what the parser walks after reading a document back in, which keeps
//! architecture replication a structural clone instead of a text rewrite.

use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::UnattendError;

/// A single XML element: name, attributes in emission order, ordered child
/// elements and optional text content. The answer file schema never mixes
/// text and child elements inside one element, so text is a scalar.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An element holding only text content.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Overwrite an attribute if present, otherwise append it.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        for (key, existing) in self.attrs.iter_mut() {
            if key == name {
                *existing = value.to_string();
                return;
            }
        }
        self.attrs.push((name.to_string(), value.to_string()));
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_named(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Text content of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child_named(name).and_then(|child| child.text.as_deref())
    }

    /// First element with the given name in document order, searching the
    /// whole subtree.
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// All elements with the given name, in document order.
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Render the tree as a UTF-8 document with an XML declaration. This is
    /// the single serialization pass; escaping of text and attribute values
    /// happens here and nowhere else.
    pub fn to_xml(&self) -> Result<String, UnattendError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write_into(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), UnattendError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attrs {
            start.push_attribute((name.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

impl FromStr for Element {
    type Err = UnattendError;

    /// Read a document into an element tree. Only well-formedness is
    /// checked; schema validity is not.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event().map_err(quick_xml::Error::from)? {
                Event::Start(start) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(malformed("content after the root element"));
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(malformed("content after the root element"));
                    }
                    let element = element_from_start(&start)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(quick_xml::Error::from)?;
                    if let Some(parent) = stack.last_mut() {
                        if !value.is_empty() {
                            parent.text = Some(value.into_owned());
                        }
                    }
                }
                Event::CData(data) => {
                    let value = String::from_utf8_lossy(&data.into_inner()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.text = Some(value);
                    }
                }
                Event::End(_) => {
                    // The reader has already verified tag pairing.
                    let element = match stack.pop() {
                        Some(element) => element,
                        None => return Err(malformed("unexpected closing tag")),
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(malformed("unclosed element"));
        }
        root.ok_or_else(|| malformed("no root element"))
    }
}

fn malformed(reason: &str) -> UnattendError {
    UnattendError::MalformedDocument(reason.to_string())
}

fn element_from_start(start: &BytesStart) -> Result<Element, UnattendError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(quick_xml::Error::from)?
            .into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}
