//! Batch driver
//!
//! Runs the extraction over every log in the configured input directory and
//! writes one export per log into the output directory, under the same file
//! name. Files are processed one after another; each file is analysed fully in
//! memory before its export is written, so a failing file leaves no output.

use crate::config::Config;
use crate::error::ExtractError;
use crate::export::export_results;
use crate::pipeline::analyze;
use crate::reader::read_log_file;
use crate::types::ResultTable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Number of values one series received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesCount {
    pub series: &'static str,
    pub values: usize,
}

/// A log that was extracted and exported
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub file_name: String,
    pub output_path: PathBuf,
    pub series: Vec<SeriesCount>,
}

/// A log that failed while the batch was allowed to continue
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub file_name: String,
    pub error: String,
}

/// Outcome of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub processed: Vec<FileSummary>,
    pub failed: Vec<FileFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Batch extraction over a directory of logs.
pub struct BatchRunner {
    config: Config,
}

impl BatchRunner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Regular files of the input directory, sorted by name
    pub fn discover(&self) -> Result<Vec<PathBuf>, ExtractError> {
        let dir = &self.config.input_dir;
        let entries = fs::read_dir(dir).map_err(|e| ExtractError::from(e).in_file(dir))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ExtractError::from(e).in_file(dir))?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        tracing::debug!(dir = %dir.display(), files = files.len(), "discovered logs");
        Ok(files)
    }

    /// Read and analyse one log
    pub fn process_file(&self, path: &Path) -> Result<ResultTable, ExtractError> {
        let table = read_log_file(path)?;
        analyze(&table)
    }

    /// Where the export of `input` is written
    pub fn output_path(&self, input: &Path) -> PathBuf {
        match input.file_name() {
            Some(name) => self.config.output_dir.join(name),
            None => self.config.output_dir.clone(),
        }
    }

    /// Process every discovered log without observing the tables
    pub fn run(&self) -> Result<BatchReport, ExtractError> {
        self.run_with(|_, _| {})
    }

    /// Process every discovered log, handing each successful table to
    /// `observer` before it is exported.
    ///
    /// The first failure aborts the batch unless `continue_on_error` is set,
    /// in which case the failure is logged and recorded in the report.
    pub fn run_with<F>(&self, mut observer: F) -> Result<BatchReport, ExtractError>
    where
        F: FnMut(&Path, &ResultTable),
    {
        let started_at = Utc::now();
        let files = self.discover()?;

        if files.is_empty() {
            tracing::warn!(dir = %self.config.input_dir.display(), "no logs found");
        }

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| ExtractError::from(e).in_file(&self.config.output_dir))?;

        let mut processed = Vec::new();
        let mut failed = Vec::new();

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::info!(file = %file_name, "processing log");

            match self.extract_one(&path, &file_name, &mut observer) {
                Ok(summary) => processed.push(summary),
                Err(e) => {
                    let e = e.in_file(&path);
                    if !self.config.continue_on_error {
                        return Err(e);
                    }
                    tracing::error!(file = %file_name, error = %e, "skipping log");
                    failed.push(FileFailure {
                        file_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            input_dir: self.config.input_dir.clone(),
            output_dir: self.config.output_dir.clone(),
            processed,
            failed,
        };

        tracing::info!(
            processed = report.processed.len(),
            failed = report.failed.len(),
            "batch finished"
        );

        Ok(report)
    }

    fn extract_one<F>(
        &self,
        path: &Path,
        file_name: &str,
        observer: &mut F,
    ) -> Result<FileSummary, ExtractError>
    where
        F: FnMut(&Path, &ResultTable),
    {
        let table = self.process_file(path)?;
        observer(path, &table);

        let output_path = self.output_path(path);
        export_results(&output_path, &table)?;

        Ok(FileSummary {
            file_name: file_name.to_string(),
            output_path,
            series: table
                .iter()
                .map(|(category, values)| SeriesCount {
                    series: category.label(),
                    values: values.len(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::read_exported;
    use pretty_assertions::assert_eq;
    use std::fs::File;

    const HEADER: &str = "Correct,Image,ExperimentType,ResponseTime,ResponseTimeMriTrigger,TimeMriTrigger,Con_1,Incon_1,InstCon_1,InstIncon_1";

    fn write_log(dir: &Path, name: &str, trials: usize) {
        let mut content = format!("{}\n", HEADER);
        for i in 1..=trials {
            let image = if i % 2 == 1 { "pos.jpg" } else { "neg.jpg" };
            content.push_str(&format!(
                "1,{},AAT_con,{},100,50,{},{},{},{}\n",
                image,
                600 + i,
                150 + i * 1000,
                10_150 + i * 1000,
                20_150 + i * 1000,
                30_150 + i * 1000,
            ));
        }
        fs::write(dir.join(name), content).unwrap();
    }

    fn runner(input: &Path, output: &Path, continue_on_error: bool) -> BatchRunner {
        BatchRunner::new(Config {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            display: false,
            continue_on_error,
        })
    }

    #[test]
    fn test_batch_writes_one_export_per_log() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_log(input.path(), "b_subject.csv", 5);
        write_log(input.path(), "a_subject.csv", 12);
        fs::create_dir(input.path().join("nested")).unwrap();

        let mut seen = Vec::new();
        let report = runner(input.path(), output.path(), false)
            .run_with(|path, table| {
                seen.push((path.file_name().unwrap().to_owned(), table.total_values()));
            })
            .unwrap();

        assert!(report.is_success());
        let names: Vec<&str> = report.processed.iter().map(|s| s.file_name.as_str()).collect();
        assert_eq!(names, vec!["a_subject.csv", "b_subject.csv"]);
        assert_eq!(seen.len(), 2);

        let exported = read_exported(File::open(output.path().join("a_subject.csv")).unwrap())
            .unwrap();
        assert_eq!(exported[0].0, "Inst Onset");
        assert_eq!(exported[0].1, vec!["21.0", "41.0"]);
        assert_eq!(exported[1].1, vec!["1.0", "3.0", "5.0", "7.0", "9.0"]);

        let counts = &report.processed[1].series;
        assert_eq!(counts[1], SeriesCount { series: "Pos Cong Onset", values: 2 });
    }

    #[test]
    fn test_batch_fails_fast() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a_broken.csv"), "Correct,Image\n1,pos.jpg\n2,neg.jpg\n")
            .unwrap();
        write_log(input.path(), "b_subject.csv", 5);

        let err = runner(input.path(), output.path(), false).run().unwrap_err();

        assert!(err.to_string().contains("a_broken.csv"));
        assert!(err.to_string().contains("Missing column: ResponseTimeMriTrigger"));
        assert!(!output.path().join("a_broken.csv").exists());
        assert!(!output.path().join("b_subject.csv").exists());
    }

    #[test]
    fn test_batch_continues_on_error() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a_empty.csv"), "").unwrap();
        write_log(input.path(), "b_subject.csv", 5);

        let report = runner(input.path(), output.path(), true).run().unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed[0].file_name, "a_empty.csv");
        assert_eq!(report.processed.len(), 1);
        assert!(!output.path().join("a_empty.csv").exists());
        assert!(output.path().join("b_subject.csv").exists());
    }

    #[test]
    fn test_batch_creates_output_dir() {
        let input = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("exports").join("aat");
        write_log(input.path(), "subject.csv", 3);

        runner(input.path(), &output, false).run().unwrap();
        assert!(output.join("subject.csv").is_file());
    }

    #[test]
    fn test_missing_input_dir() {
        let output = tempfile::tempdir().unwrap();
        let err = runner(Path::new("/nonexistent/aat/raw"), output.path(), true)
            .run()
            .unwrap_err();
        assert!(matches!(err, ExtractError::File { .. }));
    }

    #[test]
    fn test_report_serializes() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_log(input.path(), "subject.csv", 3);

        let report = runner(input.path(), output.path(), false).run().unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["processed"][0]["file_name"], "subject.csv");
        assert_eq!(json["processed"][0]["series"][0]["series"], "Inst Onset");
        assert!(json["started_at"].is_string());
    }
}
