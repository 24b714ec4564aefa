//! Normalized element tree
//!
//! Every document is adapted into this shape before any rule runs: children are
//! grouped by tag and always held in a `Vec`, whether the tag occurs once or many
//! times, and tag names never carry a namespace prefix.

/// Strip a namespace prefix from a tag name (`ns:City` -> `City`).
///
/// Applying it twice is the same as applying it once.
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// A single XML element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    /// Normalized tag name
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Children grouped by tag, in order of first appearance
    pub children: Vec<(String, Vec<Node>)>,
    /// Trimmed character data, if any
    pub text: Option<String>,
}

impl Node {
    /// Create an element, normalizing its tag
    pub fn new(tag: &str) -> Self {
        Self {
            tag: local_name(tag).to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Builder-style attribute insertion
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child insertion
    pub fn with_child(mut self, child: Node) -> Self {
        self.push_child(child);
        self
    }

    /// Builder-style text
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Set an attribute, replacing an existing value of the same name
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => self
                .attributes
                .push((name.to_string(), value.to_string())),
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child under its tag group
    pub fn push_child(&mut self, child: Node) {
        match self.children.iter_mut().find(|(tag, _)| *tag == child.tag) {
            Some((_, group)) => group.push(child),
            None => self.children.push((child.tag.clone(), vec![child])),
        }
    }

    /// Iterate over every direct child, group by group
    pub fn child_nodes(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().flat_map(|(_, group)| group.iter())
    }

    /// Total number of elements in this subtree, including `self`
    pub fn element_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.child_nodes());
        }
        count
    }

    /// Move every child group out, leaving the node childless
    fn take_children(&mut self) -> impl Iterator<Item = Node> {
        std::mem::take(&mut self.children)
            .into_iter()
            .flat_map(|(_, group)| group)
    }
}

// Nesting depth is bounded only by input size; tear subtrees down iteratively.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending: Vec<Node> = self.take_children().collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.take_children());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group<'a>(node: &'a Node, tag: &str) -> &'a [Node] {
        node.children
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, g)| g.as_slice())
            .unwrap_or(&[])
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("ns:City"), "City");
        assert_eq!(local_name("City"), "City");
        assert_eq!(local_name(local_name("a:b:City")), "City");
        assert_eq!(local_name(""), "");
    }

    #[test]
    fn test_new_strips_prefix() {
        let node = Node::new("soap:Envelope");
        assert_eq!(node.tag, "Envelope");
    }

    #[test]
    fn test_repeated_children_grouped() {
        let node = Node::new("Crew")
            .with_child(Node::new("Member"))
            .with_child(Node::new("Leg"))
            .with_child(Node::new("Member"));

        assert_eq!(node.children.len(), 2);
        assert_eq!(group(&node, "Member").len(), 2);
        assert_eq!(group(&node, "Leg").len(), 1);
        assert!(group(&node, "Missing").is_empty());
        assert_eq!(node.child_nodes().count(), 3);
    }

    #[test]
    fn test_single_child_is_still_a_sequence() {
        let node = Node::new("Flights").with_child(Node::new("GetSectors"));
        assert_eq!(group(&node, "GetSectors").len(), 1);
    }

    #[test]
    fn test_attributes_keep_order_and_replace() {
        let mut node = Node::new("Staff")
            .with_attr("b", "1")
            .with_attr("a", "2");
        node.set_attr("b", "3");

        assert_eq!(
            node.attributes,
            vec![
                ("b".to_string(), "3".to_string()),
                ("a".to_string(), "2".to_string())
            ]
        );
        assert_eq!(node.attr("a"), Some("2"));
        assert_eq!(node.attr("c"), None);
    }

    #[test]
    fn test_element_count() {
        let node = Node::new("a")
            .with_child(Node::new("b").with_child(Node::new("c")))
            .with_child(Node::new("b"));
        assert_eq!(node.element_count(), 4);
        assert_eq!(Node::new("x").element_count(), 1);
    }

    #[test]
    fn test_deep_chain_counts_and_drops() {
        let depth = 200_000;
        let mut node = Node::new("leaf");
        for _ in 1..depth {
            node = Node::new("a").with_child(node);
        }

        assert_eq!(node.element_count(), depth);
        drop(node);
    }
}
