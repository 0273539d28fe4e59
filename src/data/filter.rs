use super::model::DatasetState;

// ---------------------------------------------------------------------------
// Category filter: which loaded rows are eligible for rendering
// ---------------------------------------------------------------------------

/// Position of a row inside the per-category datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowRef {
    /// Category slot (declaration order).
    pub slot: usize,
    /// Index into that category's rows.
    pub index: usize,
}

/// Build the combined collection.
///
/// Walks categories in declaration order and, for each one that is active
/// *and* loaded, appends all of its rows in their original order. Inactive,
/// loading and unrequested categories contribute nothing.
pub fn combine(datasets: &[DatasetState], active: &[bool]) -> Vec<RowRef> {
    datasets
        .iter()
        .zip(active)
        .enumerate()
        .filter(|(_, (_, wanted))| **wanted)
        .filter_map(|(slot, (dataset, _))| dataset.rows().map(|rows| (slot, rows.len())))
        .flat_map(|(slot, len)| (0..len).map(move |index| RowRef { slot, index }))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::model::PointRow;

    fn loaded(n: usize) -> DatasetState {
        DatasetState::Loaded(Arc::new(vec![PointRow::default(); n]))
    }

    #[test]
    fn skips_inactive_and_unloaded() {
        let datasets = vec![loaded(2), DatasetState::Loading, loaded(1), loaded(3)];
        let active = [true, true, false, true];
        let refs = combine(&datasets, &active);
        let slots: Vec<usize> = refs.iter().map(|r| r.slot).collect();
        assert_eq!(slots, [0, 0, 3, 3, 3]);
        assert_eq!(refs[2], RowRef { slot: 3, index: 0 });
    }

    #[test]
    fn nothing_active_means_nothing_combined() {
        let datasets = vec![loaded(4), DatasetState::NotRequested];
        assert!(combine(&datasets, &[false, false]).is_empty());
    }
}
