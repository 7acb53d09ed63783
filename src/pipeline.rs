//! Extraction pipeline
//!
//! This module provides the public API for AAT Extract. It drives the trial
//! classifier over one parsed log and buckets baseline-relative onset times and
//! response times into the ten result series.
//!
//! Two passes run over the trial rows:
//! - the instruction pass samples one instruction onset per rotation run
//!   (rows 1, 11, 21, ...);
//! - the response pass files every trial under its condition, or under
//!   `Falses` when the answer was wrong.
//!
//! Neither pass visits the final row of the log.

use crate::classifier::{classify, ROTATION_RUN};
use crate::columns::{ColumnIndexMap, ColumnLabel, StaticColumn};
use crate::error::ExtractError;
use crate::types::{Category, Measure, ResultTable, SeriesValue, TrialProperties};
use serde::Serialize;

/// Rows between two instruction-onset samples
pub const INSTRUCTION_STRIDE: usize = ROTATION_RUN;

const MILLIS_PER_SECOND: f64 = 1000.0;

/// Per-file MRI trigger offset, read from the first trial row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Baseline {
    pub response_time_mri_trigger: i64,
    pub time_mri_trigger: i64,
}

impl Baseline {
    /// Read the trigger columns of `row` (the first row after the header)
    pub fn read(indices: &ColumnIndexMap, row: &[String]) -> Result<Self, ExtractError> {
        Ok(Self {
            response_time_mri_trigger: parse_int(
                indices,
                row,
                1,
                StaticColumn::ResponseTimeMriTrigger,
            )?,
            time_mri_trigger: parse_int(indices, row, 1, StaticColumn::TimeMriTrigger)?,
        })
    }

    /// Total offset subtracted from every onset. Widened so that any pair of
    /// logged trigger values sums without overflow.
    pub fn excess(&self) -> i128 {
        i128::from(self.response_time_mri_trigger) + i128::from(self.time_mri_trigger)
    }

    /// Milliseconds since log start to seconds since the trigger
    pub fn normalize(&self, raw_ms: i64) -> f64 {
        (i128::from(raw_ms) - self.excess()) as f64 / MILLIS_PER_SECOND
    }
}

/// Integer cell of `row` under `label`. Surrounding whitespace and a sign are
/// accepted.
fn parse_int(
    indices: &ColumnIndexMap,
    row: &[String],
    row_index: usize,
    label: impl Into<ColumnLabel>,
) -> Result<i64, ExtractError> {
    let label = label.into();
    let value = indices.cell(row, row_index, label)?;
    parse_cell(value, row_index, label)
}

fn parse_cell(value: &str, row_index: usize, label: ColumnLabel) -> Result<i64, ExtractError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ExtractError::NonNumeric {
            row: row_index,
            label: label.column_name(),
            value: value.to_string(),
        })
}

/// Extractor bound to one log: resolved columns plus baseline.
pub struct Extractor {
    indices: ColumnIndexMap,
    baseline: Baseline,
}

impl Extractor {
    /// Resolve the header row and read the baseline from the row after it
    pub fn from_table(table: &[Vec<String>]) -> Result<Self, ExtractError> {
        let header = table.first().ok_or(ExtractError::EmptyLog)?;
        let indices = ColumnIndexMap::resolve(header);

        let first_trial = table.get(1).ok_or(ExtractError::MissingBaselineRow)?;
        let baseline = Baseline::read(&indices, first_trial)?;

        tracing::info!(
            response_time_mri_trigger = baseline.response_time_mri_trigger,
            time_mri_trigger = baseline.time_mri_trigger,
            excess = baseline.excess(),
            "read MRI trigger baseline"
        );

        Ok(Self { indices, baseline })
    }

    /// Run both passes over `table`, which must be the table this extractor
    /// was built from.
    pub fn extract(&self, table: &[Vec<String>]) -> Result<ResultTable, ExtractError> {
        let mut result = ResultTable::new();
        let end = table.len().saturating_sub(1);

        // Instruction onsets
        for row_index in (1..end).step_by(INSTRUCTION_STRIDE) {
            let props = classify(&self.indices, &table[row_index], row_index)?;
            let onset = self.onset_seconds(&props.inst_onset, props.inst_column, row_index)?;
            result.push(Category::InstOnset, SeriesValue::Seconds(onset));
        }

        // Responses
        for row_index in 1..end {
            let props = classify(&self.indices, &table[row_index], row_index)?;
            let onset = self.onset_seconds(&props.onset_time, props.onset_column, row_index)?;

            if props.correct {
                result.push(
                    trial_category(&props, Measure::Resp)?,
                    SeriesValue::Text(props.response_time.clone()),
                );
                result.push(
                    trial_category(&props, Measure::Onset)?,
                    SeriesValue::Seconds(onset),
                );
            } else {
                result.push(Category::Falses, SeriesValue::Seconds(onset));
            }
        }

        tracing::debug!(
            trials = end.saturating_sub(1),
            values = result.total_values(),
            "extraction finished"
        );

        Ok(result)
    }

    fn onset_seconds(
        &self,
        value: &str,
        label: ColumnLabel,
        row_index: usize,
    ) -> Result<f64, ExtractError> {
        let raw = parse_cell(value, row_index, label)?;
        Ok(self.baseline.normalize(raw))
    }
}

/// Series a correctly answered trial belongs to
fn trial_category(props: &TrialProperties, measure: Measure) -> Result<Category, ExtractError> {
    let valence = props.valence().ok_or_else(|| ExtractError::MissingCategory {
        row: props.row,
        reason: "image name matches neither \"pos\" nor \"neg\"".to_string(),
    })?;
    let congruency = props
        .labelled_congruency()
        .ok_or_else(|| ExtractError::MissingCategory {
            row: props.row,
            reason: "experiment type matches neither \"AAT_con\" nor \"AAT_incon\"".to_string(),
        })?
        .effective(props.reverse_rotation);

    Ok(Category::trial(valence, congruency, measure))
}

/// Convert one parsed log (row 0 = header) into its result table.
///
/// # Example
/// ```ignore
/// let table = read_log_file("raw/subject_01.csv")?;
/// let result = analyze(&table)?;
/// ```
pub fn analyze(table: &[Vec<String>]) -> Result<ResultTable, ExtractError> {
    tracing::debug!(rows = table.len(), "analyzing log");
    let extractor = Extractor::from_table(table)?;
    extractor.extract(table)
}
