//! Per-file reports and the append-only report file

use crate::finding::Finding;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Separator closing every block
pub const SEPARATOR: &str = "----------------------";

/// Completion marker for a run that went through every file
pub const COMPLETED_MARKER: &str = "All files processed!";

/// Completion marker for a cancelled run
pub const STOPPED_MARKER: &str = "Processing stopped by user!";

/// Per-file outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
        }
    }
}

/// Findings of one file, split by polarity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: String,
    pub static_data: bool,
    /// Some element carried an allowed attribute value, reported or not
    pub attribute_matched: bool,
    pub passed: Vec<Finding>,
    pub failed: Vec<Finding>,
}

impl FileReport {
    /// Pass when anything matched: a found tag or an allowed attribute value.
    /// Mismatches alone never make a file pass, and their absence is not enough.
    ///
    /// An allowed value counts even when its finding was deduplicated away
    /// under another rule set.
    pub fn verdict(&self) -> Verdict {
        if self.attribute_matched || self.passed.iter().any(Finding::is_positive) {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// Text block for the report file
    pub fn render(&self) -> String {
        let mut block = format!("\nFile: {}\n", self.file);

        if !self.passed.is_empty() {
            block.push_str("PASSED:\n");
            for finding in &self.passed {
                block.push_str(&format!("  - {}\n", finding));
            }
        }

        if !self.failed.is_empty() {
            block.push_str("FAILED:\n");
            for finding in &self.failed {
                block.push_str(&format!("  - {}\n", finding));
            }
        }

        block.push_str(SEPARATOR);
        block.push('\n');
        block
    }
}

/// Combine a file's findings into a report, keeping their order
pub fn aggregate(
    file: &str,
    static_data: bool,
    attribute_matched: bool,
    findings: impl IntoIterator<Item = Finding>,
) -> FileReport {
    let (passed, failed): (Vec<Finding>, Vec<Finding>) =
        findings.into_iter().partition(Finding::is_positive);
    FileReport {
        file: file.to_string(),
        static_data,
        attribute_matched,
        passed,
        failed,
    }
}

/// Block for a file that could not be parsed
pub fn render_parse_error(file: &str, reason: &str) -> String {
    format!("\nFile: {}\nError parsing XML: {}\n{}\n", file, reason, SEPARATOR)
}

/// Block for a file that could not be read
pub fn render_read_error(file: &str, reason: &str) -> String {
    format!("\nFile: {}\nError reading file: {}\n{}\n", file, reason, SEPARATOR)
}

/// Report file name for a run started at `at`
pub fn report_file_name(at: DateTime<Utc>) -> String {
    format!("report-{}.txt", at.format("%Y-%m-%dT%H-%M-%S-%3fZ"))
}

/// Append-only report file.
///
/// Each block goes out in one write followed by a flush, so an interrupted run
/// leaves only whole blocks behind.
pub struct ReportWriter {
    path: PathBuf,
    file: File,
}

impl ReportWriter {
    /// Create a timestamped report file in `dir`
    pub fn create(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Self::open(&dir.join(report_file_name(Utc::now())))
    }

    /// Open (or create) a report file at an explicit path
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one block
    pub fn append(&mut self, block: &str) -> io::Result<()> {
        self.file.write_all(block.as_bytes())?;
        self.file.flush()
    }

    /// Append the final marker line
    pub fn finish(&mut self, marker: &str) -> io::Result<()> {
        self.append(&format!("{}\n", marker))
    }
}
