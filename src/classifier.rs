//! Static-data document classification
//!
//! Decides whether a document belongs to the static-data class, which brings the
//! static rule set into play. Two strategies exist:
//!
//! - **textual**: substring search of the raw text for a marker token. Works on
//!   documents that fail to parse.
//! - **structural**: recursive search of the parsed tree for a static-only tag.
//!
//! `hybrid` tries the textual check first and falls back to the structural one.

use crate::node::{local_name, Node};
use serde::{Deserialize, Serialize};

/// Classification strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStrategy {
    #[default]
    Textual,
    Structural,
    Hybrid,
}

impl ClassifierStrategy {
    /// Whether the strategy can decide from raw text alone
    pub fn uses_text(&self) -> bool {
        matches!(self, Self::Textual | Self::Hybrid)
    }

    /// Whether the strategy looks at the parsed tree
    pub fn uses_tree(&self) -> bool {
        matches!(self, Self::Structural | Self::Hybrid)
    }
}

impl std::str::FromStr for ClassifierStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "textual" | "text" => Ok(Self::Textual),
            "structural" | "tree" => Ok(Self::Structural),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(format!("Unknown classifier strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for ClassifierStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Textual => write!(f, "textual"),
            Self::Structural => write!(f, "structural"),
            Self::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// What a classifier gets to look at
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    /// Raw document text
    pub text: &'a str,
    /// Adapted tree, when parsing succeeded
    pub tree: Option<&'a Node>,
}

impl<'a> ClassifierInput<'a> {
    pub fn text(text: &'a str) -> Self {
        Self { text, tree: None }
    }

    pub fn parsed(text: &'a str, tree: &'a Node) -> Self {
        Self {
            text,
            tree: Some(tree),
        }
    }
}

/// Static-data classifier
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    strategy: ClassifierStrategy,
    markers: Vec<String>,
    tags: Vec<String>,
    tag_fragments: Vec<String>,
}

impl Classifier {
    /// Create a classifier
    ///
    /// `tags` are compared exactly against normalized element names,
    /// `tag_fragments` case-insensitively as substrings of them.
    pub fn new(
        strategy: ClassifierStrategy,
        markers: Vec<String>,
        tags: Vec<String>,
        tag_fragments: Vec<String>,
    ) -> Self {
        Self {
            strategy,
            markers: markers.into_iter().filter(|m| !m.is_empty()).collect(),
            tags: tags.iter().map(|t| local_name(t).to_string()).collect(),
            tag_fragments: tag_fragments
                .iter()
                .filter(|f| !f.is_empty())
                .map(|f| f.to_lowercase())
                .collect(),
        }
    }

    pub fn strategy(&self) -> ClassifierStrategy {
        self.strategy
    }

    /// Classify a document
    pub fn is_static_data(&self, input: &ClassifierInput<'_>) -> bool {
        match self.strategy {
            ClassifierStrategy::Textual => self.matches_text(input.text),
            ClassifierStrategy::Structural => input.tree.is_some_and(|t| self.matches_tree(t)),
            ClassifierStrategy::Hybrid => {
                self.matches_text(input.text) || input.tree.is_some_and(|t| self.matches_tree(t))
            }
        }
    }

    /// Textual check: any marker occurs in the raw text
    pub fn matches_text(&self, text: &str) -> bool {
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }

    /// Structural check: any descendant carries a static-only tag
    pub fn matches_tree(&self, root: &Node) -> bool {
        let mut stack: Vec<&Node> = root.child_nodes().collect();
        while let Some(node) = stack.pop() {
            if self.is_static_tag(&node.tag) {
                return true;
            }
            stack.extend(node.child_nodes());
        }
        false
    }

    fn is_static_tag(&self, tag: &str) -> bool {
        if self.tags.iter().any(|t| t == tag) {
            return true;
        }
        if self.tag_fragments.is_empty() {
            return false;
        }
        let lower = tag.to_lowercase();
        self.tag_fragments.iter().any(|f| lower.contains(f.as_str()))
    }
}
