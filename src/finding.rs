//! Findings produced by the matcher

use crate::rules::RuleScope;
use serde::{Deserialize, Serialize};

/// Kind of observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    TagFound,
    TagMissing,
    AttributeMatch,
    AttributeMismatch,
}

impl FindingKind {
    /// Whether this kind counts as a positive signal for the verdict
    pub fn is_positive(&self) -> bool {
        matches!(self, FindingKind::TagFound | FindingKind::AttributeMatch)
    }
}

/// One pass/fail observation about a tag or attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// Rule set that produced it
    pub scope: RuleScope,
    /// Tag or attribute name
    pub subject: String,
    /// Observed attribute value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Allowed values, for mismatches
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub expected: Vec<String>,
}

impl Finding {
    pub fn tag_found(scope: RuleScope, tag: &str) -> Self {
        Self::tag(FindingKind::TagFound, scope, tag)
    }

    pub fn tag_missing(scope: RuleScope, tag: &str) -> Self {
        Self::tag(FindingKind::TagMissing, scope, tag)
    }

    fn tag(kind: FindingKind, scope: RuleScope, tag: &str) -> Self {
        Self {
            kind,
            scope,
            subject: tag.to_string(),
            detail: None,
            expected: Vec::new(),
        }
    }

    pub fn attribute_match(scope: RuleScope, attribute: &str, value: &str) -> Self {
        Self {
            kind: FindingKind::AttributeMatch,
            scope,
            subject: attribute.to_string(),
            detail: Some(value.to_string()),
            expected: Vec::new(),
        }
    }

    pub fn attribute_mismatch(
        scope: RuleScope,
        attribute: &str,
        value: &str,
        expected: &[String],
    ) -> Self {
        Self {
            kind: FindingKind::AttributeMismatch,
            scope,
            subject: attribute.to_string(),
            detail: Some(value.to_string()),
            expected: expected.to_vec(),
        }
    }

    pub fn is_positive(&self) -> bool {
        self.kind.is_positive()
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.detail.as_deref().unwrap_or("");
        match self.kind {
            FindingKind::TagFound => write!(f, "Tag found ({}): {}", self.scope, self.subject),
            FindingKind::TagMissing => write!(f, "Missing tag ({}): {}", self.scope, self.subject),
            FindingKind::AttributeMatch => {
                write!(f, "Attribute match: {} = {}", self.subject, value)
            }
            FindingKind::AttributeMismatch => write!(
                f,
                "Attribute mismatch: {} found {}, expected one of {}",
                self.subject,
                value,
                self.expected.join(", ")
            ),
        }
    }
}
