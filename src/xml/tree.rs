//! Element tree built on the quick-xml event API

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{MeasError, Result};

/// One XML element: qualified name, attributes, text content and children
///
/// Text and child elements are kept separately; the wire format never mixes
/// them inside one element. Attribute and child order is preserved, which
/// keeps encoded documents deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

fn local_part(qualified: &str) -> &str {
    match qualified.rsplit_once(':') {
        Some((_, local)) => local,
        None => qualified,
    }
}

impl Element {
    /// Create an empty element with the given qualified name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The qualified name as written, e.g. `swe:Quantity`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name without its prefix, e.g. `Quantity`
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// The trimmed text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attribute value looked up by local name
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| local_part(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given local name
    pub fn child(&self, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    /// All children with the given local name, in document order
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    /// All children, in document order
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First child with the given local name, or `RequiredFieldMissing`
    pub fn required_child(&self, local: &str) -> Result<&Element> {
        self.child(local).ok_or_else(|| MeasError::required(local))
    }

    /// Attribute value by local name, or `RequiredFieldMissing`
    pub fn required_attr(&self, local: &str) -> Result<&str> {
        self.attr(local).ok_or_else(|| MeasError::required(local))
    }

    /// Set (or replace) an attribute
    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Set the text content
    pub fn set_text<S: Into<String>>(&mut self, text: S) {
        self.text = text.into();
    }

    /// Append a child element
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Builder-style attribute
    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style text content
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.set_text(text);
        self
    }

    /// Builder-style child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.push_child(child);
        self
    }

    /// Parse a document and return its root element
    pub fn parse(bytes: &[u8]) -> Result<Element> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| MeasError::xml(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    stack.push(Self::from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(top) = stack.last_mut() {
                        let chunk = text
                            .unescape()
                            .map_err(|e| MeasError::xml(e.to_string()))?;
                        top.text.push_str(&chunk);
                    }
                }
                Event::CData(data) => {
                    if let Some(top) = stack.last_mut() {
                        top.text
                            .push_str(&String::from_utf8_lossy(data.as_ref()));
                    }
                }
                Event::End(_) => {
                    let mut element = stack
                        .pop()
                        .ok_or_else(|| MeasError::xml("unbalanced end tag"))?;
                    element.text = element.text.trim().to_string();
                    Self::attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions and
                // doctypes carry no payload data.
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(MeasError::xml("unclosed element"));
        }
        root.ok_or_else(|| MeasError::xml("document has no root element"))
    }

    /// Serialise this element as a standalone document
    pub fn to_document_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| MeasError::xml(e.to_string()))?;
        self.write_into(&mut writer)?;
        Ok(writer.into_inner())
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Element> {
        let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(|e| MeasError::xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| MeasError::xml(e.to_string()))?
                .into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    fn attach(
        stack: &mut Vec<Element>,
        root: &mut Option<Element>,
        element: Element,
    ) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                Ok(())
            }
            None if root.is_none() => {
                *root = Some(element);
                Ok(())
            }
            None => Err(MeasError::xml("multiple root elements")),
        }
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(|e| MeasError::xml(e.to_string()))?;
            return Ok(());
        }
        writer
            .write_event(Event::Start(start))
            .map_err(|e| MeasError::xml(e.to_string()))?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| MeasError::xml(e.to_string()))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| MeasError::xml(e.to_string()))?;
        Ok(())
    }
}
