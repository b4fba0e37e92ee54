use std::collections::{HashMap, HashSet};

use log::warn;

use super::model::{CellValue, RecordSet};
use crate::error::{MergeError, MergeResult};

/// Columns identifying one variant call within a sample.
pub const VARIANT_KEY: [&str; 4] = ["Chrom", "Position", "Ref", "Variant"];

/// Inner equi-join of `left` and `right` on `keys`.
///
/// The output schema is every left column followed by the right columns that
/// are not keys; a non-key name present on both sides is rejected, callers
/// rename beforehand. Key cells compare by [`CellValue::key_text`], and a
/// null key cell never matches. Repeated keys produce the cross product of
/// their matches and are reported with a warning.
pub fn inner_join(left: &RecordSet, right: &RecordSet, keys: &[&str]) -> MergeResult<RecordSet> {
    let left_keys: Vec<usize> = keys
        .iter()
        .map(|k| left.column_index(k))
        .collect::<MergeResult<_>>()?;
    let right_keys: Vec<usize> = keys
        .iter()
        .map(|k| right.column_index(k))
        .collect::<MergeResult<_>>()?;

    let right_rest: Vec<usize> = (0..right.columns().len())
        .filter(|i| !right_keys.contains(i))
        .collect();

    let mut columns = left.columns().to_vec();
    for &i in &right_rest {
        let name = &right.columns()[i];
        if columns.contains(name) {
            return Err(MergeError::DuplicateColumn(name.clone()));
        }
        columns.push(name.clone());
    }

    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (row_no, row) in right.rows().iter().enumerate() {
        if let Some(key) = row_key(row, &right_keys) {
            index.entry(key).or_default().push(row_no);
        }
    }
    let right_dups = index.values().filter(|m| m.len() > 1).count();

    let mut out = RecordSet::empty(columns)?;
    let mut seen_left: HashMap<Vec<String>, usize> = HashMap::new();
    for row in left.rows() {
        let Some(key) = row_key(row, &left_keys) else {
            continue;
        };
        let Some(matches) = index.get(&key) else {
            continue;
        };
        *seen_left.entry(key).or_default() += 1;
        for &r in matches {
            let mut joined = row.clone();
            joined.extend(right_rest.iter().map(|&i| right.rows()[r][i].clone()));
            out.push(joined)?;
        }
    }
    let left_dups = seen_left.values().filter(|&&n| n > 1).count();

    if left_dups > 0 || right_dups > 0 {
        warn!(
            "Join keys are not unique ({left_dups} repeated on the left, {right_dups} on the right); matches were cross-multiplied"
        );
    }

    Ok(out)
}

/// Number of rows in `side` whose key does not appear in `joined`.
///
/// Comparing row counts misreports when repeated keys cross-multiply, so this
/// checks key membership instead. Rows with a null key cell count as unmatched.
pub fn count_unmatched(side: &RecordSet, joined: &RecordSet, keys: &[&str]) -> MergeResult<usize> {
    let side_keys: Vec<usize> = keys
        .iter()
        .map(|k| side.column_index(k))
        .collect::<MergeResult<_>>()?;
    let joined_keys: Vec<usize> = keys
        .iter()
        .map(|k| joined.column_index(k))
        .collect::<MergeResult<_>>()?;

    let present: HashSet<Vec<String>> = joined
        .rows()
        .iter()
        .filter_map(|row| row_key(row, &joined_keys))
        .collect();

    Ok(side
        .rows()
        .iter()
        .filter(|row| row_key(row, &side_keys).map_or(true, |k| !present.contains(&k)))
        .count())
}

fn row_key(row: &[CellValue], idx: &[usize]) -> Option<Vec<String>> {
    idx.iter().map(|&i| row[i].key_text()).collect()
}
