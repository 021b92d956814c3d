//! Minimal owned element tree built from quick-xml events.

use crate::error::IngestError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Local name, lowercased.
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_children(tag: impl Into<String>, children: Vec<Element>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: children.into_iter().map(Node::Element).collect(),
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value trimmed, `None` when absent or blank.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |element| element.is(tag))
    }

    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.elements().find(|element| element.is(tag))
    }

    /// Trimmed text of the first direct child named `tag`, `None` when absent or blank.
    pub fn child_text(&self, tag: &str) -> Option<String> {
        self.child(tag)
            .map(|element| element.text_content().trim().to_string())
            .filter(|text| !text.is_empty())
    }

    /// All descendant text, concatenated in document order.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }
}

pub fn parse(bytes: &[u8]) -> Result<Element, IngestError> {
    let source = std::str::from_utf8(bytes)
        .map_err(|error| malformed(format!("xml is not valid utf-8: {error}")))?;

    let mut reader = Reader::from_str(source);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(open_element(&start)?),
            Ok(Event::Empty(start)) => {
                let element = open_element(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("closing tag without an open element".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|error| malformed(format!("invalid text content: {error}")))?;
                push_text(&mut stack, &text)?;
            }
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                push_text(&mut stack, &text)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => {
                return Err(malformed(format!(
                    "xml parse error at byte {}: {error}",
                    reader.buffer_position()
                )))
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(format!(
            "unexpected end of document inside <{}>",
            open.tag
        )));
    }

    root.ok_or_else(|| malformed("document has no root element".to_string()))
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, IngestError> {
    let tag = String::from_utf8_lossy(start.local_name().as_ref()).to_lowercase();
    let mut attributes = Vec::new();

    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|error| malformed(format!("invalid attribute on <{tag}>: {error}")))?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|error| malformed(format!("invalid attribute value on <{tag}>: {error}")))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Element {
        tag,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), IngestError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }

    if root.is_some() {
        return Err(malformed(format!(
            "second root element <{}>",
            element.tag
        )));
    }

    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), IngestError> {
    match stack.last_mut() {
        Some(parent) => {
            match parent.children.last_mut() {
                Some(Node::Text(previous)) => previous.push_str(text),
                _ => parent.children.push(Node::Text(text.to_string())),
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(malformed("text outside the root element".to_string())),
    }
}

fn malformed(details: String) -> IngestError {
    IngestError::MalformedDocument(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_nested_tree_with_mixed_content() {
        let root = parse(br#"<?xml version="1.0"?><Folder id="3"><naam> Root </naam><p>a <b>b</b> c</p></Folder>"#)
            .expect("valid xml");

        assert_eq!(root.tag, "folder");
        assert_eq!(root.attr("id"), Some("3"));
        assert_eq!(root.child_text("naam").as_deref(), Some("Root"));
        let paragraph = root.child("p").expect("p child");
        assert_eq!(paragraph.children.len(), 3);
        assert_eq!(paragraph.text_content(), "a b c");
    }

    #[test]
    fn entities_and_cdata_become_text() {
        let root = parse(b"<p>x &amp; y<![CDATA[ <raw> ]]></p>").expect("valid xml");
        assert_eq!(root.text_content(), "x & y <raw> ");
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let result = parse(b"<folder><document></folder>");
        assert!(matches!(result, Err(IngestError::MalformedDocument(_))));
    }

    #[test]
    fn unclosed_root_is_malformed() {
        let result = parse(b"<folder><document/>");
        assert!(matches!(result, Err(IngestError::MalformedDocument(_))));
    }

    #[test]
    fn empty_input_is_malformed() {
        assert!(matches!(parse(b"  "), Err(IngestError::MalformedDocument(_))));
    }
}
