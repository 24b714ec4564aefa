//! Rule sets: required tags and attribute whitelists

use crate::node::local_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current rule book schema version
pub const RULES_VERSION: u32 = 1;

/// When a rule set applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// Every document
    #[default]
    Global,
    /// Only documents classified as static data
    #[serde(rename = "static")]
    StaticData,
}

impl RuleScope {
    /// Whether a rule set with this scope applies to a document
    pub fn applies(&self, is_static: bool) -> bool {
        match self {
            RuleScope::Global => true,
            RuleScope::StaticData => is_static,
        }
    }
}

impl std::fmt::Display for RuleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleScope::Global => write!(f, "global"),
            RuleScope::StaticData => write!(f, "static"),
        }
    }
}

/// One set of checks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Assigned by the owning [`RuleBook`]
    #[serde(skip)]
    pub scope: RuleScope,

    /// Tags that should occur somewhere in the document
    #[serde(rename = "tags")]
    pub required_tags: Vec<String>,

    /// Attribute name -> allowed values
    #[serde(rename = "attributes")]
    pub required_attribute_values: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new(scope: RuleScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    /// Add a required tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.required_tags.push(tag.to_string());
        self
    }

    /// Add an attribute whitelist
    pub fn with_values(mut self, attribute: &str, allowed: &[&str]) -> Self {
        self.required_attribute_values
            .entry(attribute.to_string())
            .or_default()
            .extend(allowed.iter().map(|v| v.to_string()));
        self
    }

    /// Strip tag prefixes and drop duplicates, keeping first occurrences
    pub fn normalize(&mut self) {
        let mut tags: Vec<String> = Vec::with_capacity(self.required_tags.len());
        for tag in &self.required_tags {
            let tag = local_name(tag.trim());
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        self.required_tags = tags;

        for allowed in self.required_attribute_values.values_mut() {
            let mut unique: Vec<String> = Vec::with_capacity(allowed.len());
            for value in allowed.drain(..) {
                if !unique.contains(&value) {
                    unique.push(value);
                }
            }
            *allowed = unique;
        }
    }

    /// Whether the set checks nothing
    pub fn is_empty(&self) -> bool {
        self.required_tags.is_empty() && self.required_attribute_values.is_empty()
    }

    /// Whether `value` is allowed for `attribute`
    pub fn allows(&self, attribute: &str, value: &str) -> bool {
        self.required_attribute_values
            .get(attribute)
            .is_some_and(|allowed| allowed.iter().any(|v| v == value))
    }
}

/// The global and static rule sets, versioned together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    pub version: u32,

    pub global: RuleSet,

    #[serde(rename = "static")]
    pub static_data: RuleSet,
}

impl Default for RuleBook {
    fn default() -> Self {
        let global = RuleSet::new(RuleScope::Global)
            .with_tag("GetAircraftTypes")
            .with_tag("GetSectors")
            .with_tag("GetDelayReasonCodes")
            .with_tag("GetAircraftsByDateRange")
            .with_tag("CrewChangedRQ")
            .with_values("staffNumber", &["2950", "26368", "6936"]);

        let static_data = RuleSet::new(RuleScope::StaticData)
            .with_tag("city")
            .with_tag("base")
            .with_tag("serviceTypeCode")
            .with_tag("functionCode")
            .with_tag("baseCode")
            .with_tag("aircraftCode")
            .with_values("baseCode", &["EPR"])
            .with_values("serviceTypeCode", &["W"])
            .with_values("city", &["GYO"])
            .with_values("aircraftCode", &["HA-EPR"]);

        Self {
            version: RULES_VERSION,
            global,
            static_data,
        }
    }
}

impl RuleBook {
    /// Build a rule book from two sets, fixing their scopes
    pub fn new(global: RuleSet, static_data: RuleSet) -> Self {
        let mut book = Self {
            version: RULES_VERSION,
            global,
            static_data,
        };
        book.normalize();
        book
    }

    /// Assign scopes and normalize both sets
    pub fn normalize(&mut self) {
        self.global.scope = RuleScope::Global;
        self.static_data.scope = RuleScope::StaticData;
        self.global.normalize();
        self.static_data.normalize();
    }

    /// Rule sets that apply to a document, global first
    pub fn applicable(&self, is_static: bool) -> impl Iterator<Item = &RuleSet> {
        [&self.global, &self.static_data]
            .into_iter()
            .filter(move |set| set.scope.applies(is_static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_book() {
        let book = RuleBook::default();
        assert_eq!(book.version, RULES_VERSION);
        assert_eq!(book.global.scope, RuleScope::Global);
        assert_eq!(book.static_data.scope, RuleScope::StaticData);
        assert!(book.global.required_tags.contains(&"GetSectors".to_string()));
        assert!(book.global.allows("staffNumber", "2950"));
        assert!(!book.global.allows("staffNumber", "9999"));
        assert!(book.static_data.allows("city", "GYO"));
    }

    #[test]
    fn test_applicable() {
        let book = RuleBook::default();

        let scopes: Vec<_> = book.applicable(false).map(|s| s.scope).collect();
        assert_eq!(scopes, vec![RuleScope::Global]);

        let scopes: Vec<_> = book.applicable(true).map(|s| s.scope).collect();
        assert_eq!(scopes, vec![RuleScope::Global, RuleScope::StaticData]);
    }

    #[test]
    fn test_normalize() {
        let mut set = RuleSet::new(RuleScope::Global)
            .with_tag("ns:City")
            .with_tag("City")
            .with_tag(" ")
            .with_tag("Base")
            .with_values("code", &["A", "B", "A"]);
        set.normalize();

        assert_eq!(set.required_tags, vec!["City".to_string(), "Base".to_string()]);
        assert_eq!(
            set.required_attribute_values.get("code"),
            Some(&vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_rule_book_new_fixes_scopes() {
        let book = RuleBook::new(
            RuleSet::new(RuleScope::StaticData).with_tag("a"),
            RuleSet::new(RuleScope::Global).with_tag("b"),
        );
        assert_eq!(book.global.scope, RuleScope::Global);
        assert_eq!(book.static_data.scope, RuleScope::StaticData);
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
version: 1
global:
  tags: [GetSectors]
  attributes:
    staffNumber: ["2950"]
static:
  tags: [city]
"#;
        let mut book: RuleBook = serde_yaml::from_str(yaml).unwrap();
        book.normalize();

        assert_eq!(book.global.required_tags, vec!["GetSectors".to_string()]);
        assert!(book.global.allows("staffNumber", "2950"));
        assert_eq!(book.static_data.required_tags, vec!["city".to_string()]);
        assert!(book.static_data.required_attribute_values.is_empty());
        assert_eq!(book.static_data.scope, RuleScope::StaticData);
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(RuleScope::Global.to_string(), "global");
        assert_eq!(RuleScope::StaticData.to_string(), "static");
    }

    #[test]
    fn test_is_empty() {
        assert!(RuleSet::new(RuleScope::Global).is_empty());
        assert!(!RuleSet::new(RuleScope::Global).with_tag("a").is_empty());
    }
}
