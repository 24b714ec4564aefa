//! XML parsing into the normalized [`Node`] tree

use crate::node::Node;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Error raised when a document cannot be adapted into a tree
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Document has no root element")]
    Empty,

    #[error("XML parse error at position {position}: {message}")]
    Xml { position: u64, message: String },

    #[error("Element <{tag}> is never closed")]
    Unclosed { tag: String },

    #[error("Second root element <{tag}>")]
    MultipleRoots { tag: String },

    #[error("Character data outside the root element")]
    TextOutsideRoot,
}

/// An element still being built, with its accumulated character data
struct OpenElement {
    node: Node,
    text: String,
}

impl OpenElement {
    fn close(self) -> Node {
        let mut node = self.node;
        let text = self.text.trim();
        if !text.is_empty() {
            node.text = Some(text.to_string());
        }
        node
    }
}

/// Parse XML text into its root element
pub fn parse_document(content: &str) -> Result<Node, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader.read_event().map_err(|e| ParseError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => {
                let node = element(&e, reader.buffer_position())?;
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::MultipleRoots {
                        tag: node.tag.clone(),
                    });
                }
                stack.push(OpenElement {
                    node,
                    text: String::new(),
                });
            }

            Event::Empty(e) => {
                let node = element(&e, reader.buffer_position())?;
                attach(node, &mut stack, &mut root)?;
            }

            Event::End(_) => {
                // quick-xml already rejects mismatched and unmatched end tags
                if let Some(open) = stack.pop() {
                    attach(open.close(), &mut stack, &mut root)?;
                }
            }

            Event::Text(e) => {
                let text = e.unescape().map_err(|err| ParseError::Xml {
                    position: reader.buffer_position(),
                    message: err.to_string(),
                })?;
                match stack.last_mut() {
                    Some(open) => open.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(ParseError::TextOutsideRoot),
                }
            }

            Event::CData(e) => match stack.last_mut() {
                Some(open) => open.text.push_str(&String::from_utf8_lossy(&e)),
                None => return Err(ParseError::TextOutsideRoot),
            },

            Event::Eof => break,

            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(ParseError::Unclosed {
            tag: open.node.tag.clone(),
        });
    }

    root.ok_or(ParseError::Empty)
}

fn element(start: &BytesStart<'_>, position: u64) -> Result<Node, ParseError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut node = Node::new(&name);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::Xml {
            position,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|e| ParseError::Xml {
            position,
            message: e.to_string(),
        })?;
        node.set_attr(&key, &value);
    }

    Ok(node)
}

fn attach(
    node: Node,
    stack: &mut [OpenElement],
    root: &mut Option<Node>,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.node.push_child(node);
            Ok(())
        }
        None if root.is_some() => Err(ParseError::MultipleRoots {
            tag: node.tag.clone(),
        }),
        None => {
            *root = Some(node);
            Ok(())
        }
    }
}
