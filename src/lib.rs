//! xml-audit - batch tag and attribute validator for XML responses
//!
//! Audits every XML file in a directory against two rule sets: a global set
//! applied to every file and a static-data set applied only to files the
//! classifier recognizes as static data. Each file gets a pass/fail verdict and
//! a block in an append-only, timestamped report file.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> BatchRunner -> document -> classifier -> matcher -> report
//! ```
//!
//! A run is strictly sequential. A [`StopToken`] checked between files lets an
//! operator cancel it; the CLI flips the token through a watched stop file.
//!
//! # Example
//!
//! ```no_run
//! use xml_audit::{BatchRunner, Config, StopToken};
//! use std::path::Path;
//!
//! let runner = BatchRunner::new(Config::default()).unwrap();
//! let result = runner.run_directory(Path::new("responses"), &StopToken::new()).unwrap();
//! println!("{} passed, {} failed", result.passed, result.failed);
//! ```

pub mod classifier;
pub mod config;
pub mod document;
pub mod finding;
pub mod matcher;
pub mod node;
pub mod output;
pub mod report;
pub mod rules;
pub mod runner;
pub mod stop;

pub use classifier::{Classifier, ClassifierInput, ClassifierStrategy};
pub use config::{Config, ConfigError};
pub use document::{parse_document, ParseError};
pub use finding::{Finding, FindingKind};
pub use matcher::{evaluate, has_tag, match_attributes, Evaluation};
pub use node::Node;
pub use report::{aggregate, FileReport, ReportWriter, Verdict};
pub use rules::{RuleBook, RuleScope, RuleSet, RULES_VERSION};
pub use runner::{BatchError, BatchResult, BatchRunner};
pub use stop::{StopAck, StopFileWatcher, StopToken};
