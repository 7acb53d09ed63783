//! Trial classification
//!
//! Derives the categorical properties of one trial row and resolves which of
//! the per-block onset columns holds its onset time.
//!
//! Trials alternate rotation phase every [`ROTATION_RUN`] rows and move on to
//! a new set of onset columns every [`BLOCK_SIZE`] rows.

use crate::columns::{ColumnIndexMap, ColumnLabel, StaticColumn};
use crate::error::ExtractError;
use crate::types::{Congruency, TrialProperties};

/// Number of consecutive trials sharing one rotation phase
pub const ROTATION_RUN: usize = 10;

/// Number of consecutive trials sharing one set of onset columns
pub const BLOCK_SIZE: usize = 20;

const CORRECT_MARKER: &str = "1";
const POSITIVE_MARKER: &str = "pos";
const NEGATIVE_MARKER: &str = "neg";
const INCONGRUENT_MARKER: &str = "AAT_incon";
const CONGRUENT_MARKER: &str = "AAT_con";

/// Whether the trial at 1-based `row_index` runs in the reversed rotation phase
pub fn reverse_rotation(row_index: usize) -> bool {
    (row_index.saturating_sub(1) / ROTATION_RUN) % 2 != 0
}

/// 1-based block number of the trial at 1-based `row_index`
pub fn block_number(row_index: usize) -> u32 {
    (row_index.saturating_sub(1) / BLOCK_SIZE) as u32 + 1
}

/// Label of the onset column for a condition in a block
pub fn resolve_column(condition: Congruency, instructional: bool, block: u32) -> ColumnLabel {
    ColumnLabel::Block {
        condition,
        instructional,
        block,
    }
}

/// Onset and instruction-onset columns for a trial.
///
/// The presented condition is the start condition flipped by a reversed
/// rotation phase.
pub fn onset_columns(
    start: Congruency,
    reverse_rotation: bool,
    block: u32,
) -> (ColumnLabel, ColumnLabel) {
    let presented = start.effective(reverse_rotation);
    (
        resolve_column(presented, false, block),
        resolve_column(presented, true, block),
    )
}

/// Classify the trial row at 1-based `row_index`.
///
/// Both onset columns of the trial's block must exist, even when the caller
/// only needs one of them.
pub fn classify<S: AsRef<str>>(
    indices: &ColumnIndexMap,
    row: &[S],
    row_index: usize,
) -> Result<TrialProperties, ExtractError> {
    let cell = move |column: StaticColumn| indices.cell(row, row_index, column);

    let image = cell(StaticColumn::Image)?;
    let experiment_type = cell(StaticColumn::ExperimentType)?;

    let incongruent_start = experiment_type.contains(INCONGRUENT_MARKER);
    let reverse_rotation = reverse_rotation(row_index);
    let block = block_number(row_index);

    let start = if incongruent_start {
        Congruency::Incongruent
    } else {
        Congruency::Congruent
    };
    let (onset_column, inst_column) = onset_columns(start, reverse_rotation, block);

    let props = TrialProperties {
        row: row_index,
        block,
        correct: cell(StaticColumn::Correct)? == CORRECT_MARKER,
        positive: image.contains(POSITIVE_MARKER),
        negative: image.contains(NEGATIVE_MARKER),
        congruent_start: experiment_type.contains(CONGRUENT_MARKER),
        incongruent_start,
        reverse_rotation,
        response_time: cell(StaticColumn::ResponseTime)?.to_string(),
        onset_column,
        onset_time: indices.cell(row, row_index, onset_column)?.to_string(),
        inst_column,
        inst_onset: indices.cell(row, row_index, inst_column)?.to_string(),
    };

    tracing::trace!(
        row = row_index,
        block,
        correct = props.correct,
        reverse_rotation,
        onset_column = %onset_column,
        "classified trial"
    );

    Ok(props)
}
