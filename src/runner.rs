//! Batch runner
//!
//! Walks a directory of XML files one at a time, classifies and evaluates each,
//! and streams per-file blocks into the report file as it goes.

use crate::classifier::{Classifier, ClassifierInput};
use crate::config::{Config, ConfigError};
use crate::document::parse_document;
use crate::matcher::evaluate;
use crate::report::{
    aggregate, render_parse_error, render_read_error, FileReport, ReportWriter, Verdict,
    COMPLETED_MARKER, STOPPED_MARKER,
};
use crate::stop::StopToken;
use globset::GlobSet;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a whole run
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No XML files found in directory: {}", .0.display())]
    NoInputFiles(PathBuf),

    #[error("Cannot list {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write report: {0}")]
    Report(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Outcome of one processed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Evaluated(FileReport),
    ReadError(String),
    ParseError(String),
}

impl FileOutcome {
    pub fn verdict(&self) -> Verdict {
        match self {
            FileOutcome::Evaluated(report) => report.verdict(),
            _ => Verdict::Fail,
        }
    }
}

/// Summary of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Human-readable progress lines, in order
    pub logs: Vec<String>,
    pub passed: usize,
    pub failed: usize,
    #[serde(rename = "reportFile")]
    pub report_path: PathBuf,
    pub stopped: bool,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    /// Process exit code: 0 when nothing failed
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }

    fn log(&mut self, line: String) {
        info!("{}", line);
        self.logs.push(line);
    }
}

/// Sequential audit of a set of files
pub struct BatchRunner {
    config: Config,
    classifier: Classifier,
    exclude: GlobSet,
}

impl BatchRunner {
    pub fn new(config: Config) -> Result<Self, BatchError> {
        if config.rules.global.is_empty() && config.rules.static_data.is_empty() {
            warn!("Both rule sets are empty; every file will fail");
        }
        let classifier = config.classifier();
        debug!("Classifier strategy: {}", classifier.strategy());
        let exclude = config.exclude_set()?;
        Ok(Self {
            config,
            classifier,
            exclude,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Regular files directly inside `root` with a configured extension,
    /// minus excluded paths, ordered by file name
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>, BatchError> {
        if !root.is_dir() {
            return Err(BatchError::DirectoryNotFound(root.to_path_buf()));
        }

        let read_dir_error = |source| BatchError::ReadDir {
            path: root.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(root).map_err(read_dir_error)? {
            let path = entry.map_err(read_dir_error)?.path();
            if !path.is_file() || !self.config.matches_extension(&path) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path.as_path());
            if self.exclude.is_match(&path) || self.exclude.is_match(relative) {
                debug!("Excluding {}", path.display());
                continue;
            }
            files.push(path);
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Audit every matching file in `root`
    pub fn run_directory(&self, root: &Path, stop: &StopToken) -> Result<BatchResult, BatchError> {
        let files = self.discover(root)?;
        if files.is_empty() {
            return Err(BatchError::NoInputFiles(root.to_path_buf()));
        }
        info!("Found {} file(s) in {}", files.len(), root.display());
        self.run(&files, stop)
    }

    /// Audit `files` in order, writing into a fresh report in the configured directory
    pub fn run(&self, files: &[PathBuf], stop: &StopToken) -> Result<BatchResult, BatchError> {
        let mut writer = ReportWriter::create(&self.config.output.report_dir)?;
        self.run_with_writer(files, stop, &mut writer)
    }

    /// Audit `files` in order, appending to `writer`
    pub fn run_with_writer(
        &self,
        files: &[PathBuf],
        stop: &StopToken,
        writer: &mut ReportWriter,
    ) -> Result<BatchResult, BatchError> {
        self.run_observed(files, stop, writer, |_, _| {})
    }

    /// Like [`run_with_writer`](Self::run_with_writer), calling `on_file` once
    /// each file's block is written and counted
    pub fn run_observed<F>(
        &self,
        files: &[PathBuf],
        stop: &StopToken,
        writer: &mut ReportWriter,
        mut on_file: F,
    ) -> Result<BatchResult, BatchError>
    where
        F: FnMut(&Path, &FileOutcome),
    {
        let mut result = BatchResult {
            report_path: writer.path().to_path_buf(),
            ..Default::default()
        };

        for path in files {
            if stop.is_stopped() {
                result.stopped = true;
                result.log(STOPPED_MARKER.to_string());
                break;
            }

            let name = display_name(path);
            let outcome = self.process_file(path, &name, &mut result);

            let block = match &outcome {
                FileOutcome::Evaluated(report) => report.render(),
                FileOutcome::ReadError(reason) => render_read_error(&name, reason),
                FileOutcome::ParseError(reason) => render_parse_error(&name, reason),
            };
            writer.append(&block)?;

            match outcome.verdict() {
                Verdict::Pass => result.passed += 1,
                Verdict::Fail => result.failed += 1,
            }

            if let FileOutcome::Evaluated(_) = outcome {
                result.log(format!("Processed: {}", name));
            }

            on_file(path, &outcome);
        }

        if result.stopped {
            writer.finish(STOPPED_MARKER)?;
        } else {
            writer.finish(COMPLETED_MARKER)?;
            result.log(COMPLETED_MARKER.to_string());
        }

        Ok(result)
    }

    fn process_file(&self, path: &Path, name: &str, result: &mut BatchResult) -> FileOutcome {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                result.log(format!("Error processing: {}", name));
                return FileOutcome::ReadError(e.to_string());
            }
        };
        let text = String::from_utf8_lossy(&bytes);

        // Textual markers work even when the document does not parse
        let mut is_static = self.classifier.strategy().uses_text()
            && self.classifier.matches_text(&text);
        if is_static {
            result.log(format!("Detected as Static Data file: {}", name));
        }

        let root = match parse_document(&text) {
            Ok(root) => root,
            Err(e) => {
                warn!("Cannot parse {}: {}", path.display(), e);
                result.log(format!("Error processing: {}", name));
                return FileOutcome::ParseError(e.to_string());
            }
        };

        if !is_static
            && self.classifier.strategy().uses_tree()
            && self
                .classifier
                .is_static_data(&ClassifierInput::parsed(&text, &root))
        {
            is_static = true;
            result.log(format!("Detected as Static Data file: {}", name));
        }

        let evaluation = evaluate(&root, self.config.rules.applicable(is_static));
        debug!(
            "{}: {} element(s), {} finding(s), attribute match: {}",
            name,
            root.element_count(),
            evaluation.findings.len(),
            evaluation.attribute_matched
        );

        FileOutcome::Evaluated(aggregate(
            name,
            is_static,
            evaluation.attribute_matched,
            evaluation.findings,
        ))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierStrategy;
    use crate::rules::{RuleBook, RuleScope, RuleSet};
    use std::fs;

    fn runner_in(report_dir: &Path) -> BatchRunner {
        let mut config = Config::new();
        config.output.report_dir = report_dir.to_path_buf();
        BatchRunner::new(config).unwrap()
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.xml"), "<a/>").unwrap();
        fs::write(dir.path().join("A.XML"), "<a/>").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.xml")).unwrap();

        let runner = runner_in(dir.path());
        let files = runner.discover(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();

        assert_eq!(names, vec!["A.XML".to_string(), "b.xml".to_string()]);
    }

    #[test]
    fn test_discover_respects_exclude() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.xml"), "<a/>").unwrap();
        fs::write(dir.path().join("skip-me.xml"), "<a/>").unwrap();

        let mut config = Config::new();
        config.files.exclude = vec!["skip-*.xml".to_string()];
        let runner = BatchRunner::new(config).unwrap();

        let files = runner.discover(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep.xml"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_in(dir.path());
        let missing = dir.path().join("missing");

        let err = runner
            .run_directory(&missing, &StopToken::new())
            .unwrap_err();
        assert!(matches!(err, BatchError::DirectoryNotFound(_)));
    }

    #[test]
    fn test_no_input_files_creates_no_report() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        fs::write(input.path().join("readme.md"), "hi").unwrap();

        let runner = runner_in(reports.path());
        let err = runner
            .run_directory(input.path(), &StopToken::new())
            .unwrap_err();

        assert!(matches!(err, BatchError::NoInputFiles(_)));
        assert_eq!(fs::read_dir(reports.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_process_logs_and_counts() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join("1.xml"),
            "<Flights><GetSectors/></Flights>",
        )
        .unwrap();
        fs::write(input.path().join("2.xml"), "<Flights><Other/></Flights>").unwrap();
        fs::write(input.path().join("3.xml"), "<Flights><Other></Flights>").unwrap();

        let runner = runner_in(reports.path());
        let result = runner
            .run_directory(input.path(), &StopToken::new())
            .unwrap();

        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 2);
        assert_eq!(result.exit_code(), 1);
        assert!(!result.stopped);
        assert_eq!(
            result.logs,
            vec![
                "Processed: 1.xml".to_string(),
                "Processed: 2.xml".to_string(),
                "Error processing: 3.xml".to_string(),
                "All files processed!".to_string(),
            ]
        );
    }

    #[test]
    fn test_static_detected_before_parse_failure() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        fs::write(input.path().join("s.xml"), "<GetStaticDataRS><city>").unwrap();

        let runner = runner_in(reports.path());
        let result = runner
            .run_directory(input.path(), &StopToken::new())
            .unwrap();

        assert_eq!(result.failed, 1);
        assert_eq!(result.logs[0], "Detected as Static Data file: s.xml");
        assert_eq!(result.logs[1], "Error processing: s.xml");
    }

    #[test]
    fn test_structural_classification_after_parse() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join("s.xml"),
            r#"<Data><city baseCode="EPR">GYO</city></Data>"#,
        )
        .unwrap();

        let mut config = Config::new();
        config.output.report_dir = reports.path().to_path_buf();
        config.classifier.strategy = ClassifierStrategy::Structural;
        let runner = BatchRunner::new(config).unwrap();

        let result = runner
            .run_directory(input.path(), &StopToken::new())
            .unwrap();
        assert_eq!(result.passed, 1);
        assert_eq!(result.logs[0], "Detected as Static Data file: s.xml");
    }

    #[test]
    fn test_stop_before_first_file() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.xml"), "<a/>").unwrap();

        let stop = StopToken::new();
        stop.request_stop();

        let runner = runner_in(reports.path());
        let result = runner.run_directory(input.path(), &stop).unwrap();

        assert!(result.stopped);
        assert_eq!(result.total(), 0);
        assert_eq!(result.logs, vec!["Processing stopped by user!".to_string()]);

        let report = fs::read_to_string(&result.report_path).unwrap();
        assert_eq!(report, "Processing stopped by user!\n");
    }

    #[test]
    fn test_allowed_value_counts_after_cross_set_dedup() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join("static.xml"),
            r#"<GetStaticDataRS><Item code="B"/></GetStaticDataRS>"#,
        )
        .unwrap();

        let mut config = Config::new();
        config.output.report_dir = reports.path().to_path_buf();
        config.rules = RuleBook::new(
            RuleSet::new(RuleScope::Global).with_values("code", &["A"]),
            RuleSet::new(RuleScope::StaticData).with_values("code", &["B"]),
        );
        let runner = BatchRunner::new(config).unwrap();

        let result = runner
            .run_directory(input.path(), &StopToken::new())
            .unwrap();
        assert_eq!((result.passed, result.failed), (1, 0));

        // Only the global mismatch is reported; the static match was deduplicated
        let report = fs::read_to_string(&result.report_path).unwrap();
        assert!(report.contains("Attribute mismatch: code found B, expected one of A"));
        assert!(!report.contains("Attribute match:"));
    }

    #[test]
    fn test_deeply_nested_file_does_not_abort_batch() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        let depth = 200_000;
        fs::write(
            input.path().join("1-deep.xml"),
            format!(
                "<Root>{}<GetSectors/>{}</Root>",
                "<a>".repeat(depth),
                "</a>".repeat(depth)
            ),
        )
        .unwrap();
        fs::write(input.path().join("2-next.xml"), "<Root><Other/></Root>").unwrap();

        let runner = runner_in(reports.path());
        let result = runner
            .run_directory(input.path(), &StopToken::new())
            .unwrap();

        assert_eq!((result.passed, result.failed), (1, 1));
        assert_eq!(result.logs.last().unwrap(), "All files processed!");
    }

    #[test]
    fn test_stop_between_files_of_one_run() {
        let input = tempfile::tempdir().unwrap();
        let reports = tempfile::tempdir().unwrap();
        for name in ["1.xml", "2.xml", "3.xml", "4.xml"] {
            fs::write(
                input.path().join(name),
                "<Flights><GetSectors/></Flights>",
            )
            .unwrap();
        }

        let runner = runner_in(reports.path());
        let files = runner.discover(input.path()).unwrap();
        let mut writer = ReportWriter::open(&reports.path().join("report.txt")).unwrap();

        // Flag set after file 2, so file 3 is never started
        let stop = StopToken::new();
        let mut done = 0;
        let result = runner
            .run_observed(&files, &stop, &mut writer, |_, _| {
                done += 1;
                if done == 2 {
                    stop.request_stop();
                }
            })
            .unwrap();

        assert!(result.stopped);
        assert_eq!((result.passed, result.failed), (2, 0));
        assert_eq!(
            result.logs,
            vec![
                "Processed: 1.xml".to_string(),
                "Processed: 2.xml".to_string(),
                "Processing stopped by user!".to_string(),
            ]
        );

        let report = fs::read_to_string(writer.path()).unwrap();
        let reported: Vec<&str> = report
            .lines()
            .filter_map(|l| l.strip_prefix("File: "))
            .collect();
        assert_eq!(reported, vec!["1.xml", "2.xml"]);
        assert!(report.ends_with("Processing stopped by user!\n"));
    }

    #[test]
    fn test_result_json_shape() {
        let result = BatchResult {
            logs: vec!["Processed: a.xml".to_string()],
            passed: 1,
            failed: 0,
            report_path: PathBuf::from("report.txt"),
            stopped: false,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["reportFile"], "report.txt");
        assert_eq!(value["passed"], 1);
        assert_eq!(value["logs"][0], "Processed: a.xml");
    }
}
