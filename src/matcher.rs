//! Tag and attribute matching over a normalized tree

use crate::finding::Finding;
use crate::node::{local_name, Node};
use crate::rules::RuleSet;
use std::collections::HashSet;

/// Result of an attribute search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeOutcome {
    /// Matches and mismatches, one per distinct `(attribute, value)` pair
    pub findings: Vec<Finding>,
    /// At least one element carried an allowed value
    pub matched: bool,
}

/// Everything the matcher found in one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Tag findings of every applied set, then attribute findings
    pub findings: Vec<Finding>,
    pub attribute_matched: bool,
}

/// Pre-order walk over `root` and all of its descendants
fn walk(root: &Node) -> impl Iterator<Item = &Node> {
    let mut stack = vec![root];
    std::iter::from_fn(move || {
        let node = stack.pop()?;
        let children: Vec<&Node> = node.child_nodes().collect();
        stack.extend(children.into_iter().rev());
        Some(node)
    })
}

/// Whether any descendant of `node` has the given tag, at any depth.
///
/// The node's own tag is not compared.
pub fn has_tag(node: &Node, tag: &str) -> bool {
    let tag = local_name(tag);
    node.child_nodes()
        .any(|child| walk(child).any(|n| n.tag == tag))
}

/// One `TagFound` or `TagMissing` per required tag
pub fn check_tags(root: &Node, rules: &RuleSet) -> Vec<Finding> {
    rules
        .required_tags
        .iter()
        .map(|tag| {
            if has_tag(root, tag) {
                Finding::tag_found(rules.scope, tag)
            } else {
                Finding::tag_missing(rules.scope, tag)
            }
        })
        .collect()
}

/// Compare every whitelisted attribute in the tree against its allowed values.
/// Attributes with an empty value are skipped.
///
/// `seen` holds `name=value` keys already reported for this file; a pair is
/// reported the first time it is met and skipped afterwards.
pub fn match_attributes(
    root: &Node,
    rules: &RuleSet,
    seen: &mut HashSet<String>,
) -> AttributeOutcome {
    let mut outcome = AttributeOutcome::default();
    if rules.required_attribute_values.is_empty() {
        return outcome;
    }

    for node in walk(root) {
        for (name, allowed) in &rules.required_attribute_values {
            // An empty value is treated as absent
            let Some(value) = node.attr(name).filter(|v| !v.is_empty()) else {
                continue;
            };

            let is_allowed = rules.allows(name, value);
            if is_allowed {
                outcome.matched = true;
            }

            if !seen.insert(format!("{}={}", name, value)) {
                continue;
            }

            outcome.findings.push(if is_allowed {
                Finding::attribute_match(rules.scope, name, value)
            } else {
                Finding::attribute_mismatch(rules.scope, name, value, allowed)
            });
        }
    }

    outcome
}

/// Apply rule sets in order: every tag check first, then attribute checks
/// sharing one deduplication set.
pub fn evaluate<'a>(root: &Node, sets: impl IntoIterator<Item = &'a RuleSet>) -> Evaluation {
    let sets: Vec<&RuleSet> = sets.into_iter().collect();
    let mut evaluation = Evaluation::default();

    for rules in &sets {
        evaluation.findings.extend(check_tags(root, rules));
    }

    let mut seen = HashSet::new();
    for rules in &sets {
        let outcome = match_attributes(root, rules, &mut seen);
        evaluation.attribute_matched |= outcome.matched;
        evaluation.findings.extend(outcome.findings);
    }

    evaluation
}
