//! XML ingestion: raw text to a generic [`Node`] tree.
//!
//! The produced shape follows the conventions NFe tooling expects from
//! dict-style XML conversion: attributes become `@name` entries, text that
//! coexists with attributes or children becomes a `#text` entry, and
//! repeated sibling tags collapse into a single `Seq` entry at the position
//! of the first occurrence. Namespace prefixes are stripped; NFe documents
//! use a default namespace but some issuer software emits prefixed tags.

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::trace;

use super::Node;
use crate::error::TreeError;

struct Frame {
    name: String,
    children: Vec<(String, Node)>,
    text: String,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
            text: String::new(),
        }
    }

    fn into_node(self) -> (String, Node) {
        let text = self.text.trim().to_string();
        let node = if self.children.is_empty() {
            Node::Text(text)
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.push(("#text".to_string(), Node::Text(text)));
            }
            Node::Map(children)
        };
        (self.name, node)
    }
}

/// Insert a child under `name`, collapsing repeated tags into one `Seq`
/// entry that keeps the position of the first occurrence.
fn insert_child(children: &mut Vec<(String, Node)>, name: String, node: Node) {
    if let Some((_, existing)) = children.iter_mut().find(|(k, _)| *k == name) {
        match existing {
            Node::Seq(items) => items.push(node),
            _ => {
                let first = std::mem::replace(existing, Node::Seq(Vec::new()));
                *existing = Node::Seq(vec![first, node]);
            }
        }
    } else {
        children.push((name, node));
    }
}

/// Parse one XML document into a tree rooted at a single-entry map
/// (`root tag name -> content`).
///
/// Any well-formed document is accepted; no schema validation is applied.
pub fn parse_document(text: &str) -> Result<Node, TreeError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    // Bottom frame stands in for the document itself.
    let mut stack: Vec<Frame> = vec![Frame::new(String::new())];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TreeError::Malformed(e.to_string()))?;

        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                let mut frame = Frame::new(name);
                for attr in start.attributes() {
                    let attr = attr.map_err(|e| TreeError::Malformed(e.to_string()))?;
                    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                    let value = attr
                        .unescape_value()
                        .map_err(|e| TreeError::Malformed(e.to_string()))?;
                    frame
                        .children
                        .push((format!("@{key}"), Node::Text(value.into_owned())));
                }
                stack.push(frame);
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                let mut frame = Frame::new(name);
                for attr in start.attributes() {
                    let attr = attr.map_err(|e| TreeError::Malformed(e.to_string()))?;
                    let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                    let value = attr
                        .unescape_value()
                        .map_err(|e| TreeError::Malformed(e.to_string()))?;
                    frame
                        .children
                        .push((format!("@{key}"), Node::Text(value.into_owned())));
                }
                let (name, node) = frame.into_node();
                let parent = stack.last_mut().ok_or(TreeError::Empty)?;
                insert_child(&mut parent.children, name, node);
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or(TreeError::Empty)?;
                let (name, node) = frame.into_node();
                let parent = stack.last_mut().ok_or(TreeError::Empty)?;
                insert_child(&mut parent.children, name, node);
            }
            Event::Text(t) => {
                let value = t
                    .unescape()
                    .map_err(|e| TreeError::Malformed(e.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&value);
                }
            }
            Event::CData(c) => {
                let value = String::from_utf8_lossy(c.into_inner().as_ref()).into_owned();
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&value);
                }
            }
            Event::Eof => break,
            other => trace!("ignoring XML event {:?}", other),
        }
    }

    if stack.len() != 1 {
        return Err(TreeError::Malformed("unclosed element at end of input".into()));
    }
    let root = stack.pop().ok_or(TreeError::Empty)?;
    if root.children.is_empty() {
        return Err(TreeError::Empty);
    }
    Ok(Node::Map(root.children))
}
