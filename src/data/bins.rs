use std::collections::HashMap;

use super::filter::RowRef;
use super::model::PointRow;

/// Square lon/lat cell aggregating the rows that fall inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// Cell center, `[lon, lat]`.
    pub center: [f64; 2],
    /// Member rows in combined-collection order.
    pub members: Vec<RowRef>,
}

/// Cell size (degrees) for a zoom level: roughly a twelfth of the visible span.
pub fn cell_size_for_zoom(zoom: f64) -> f64 {
    (360.0 / zoom.exp2() / 12.0).max(0.01)
}

/// Group positioned rows into square cells of `cell` degrees. Bins come out
/// in the order their first member was seen; rows without a position are
/// skipped.
pub fn bin_rows<'a>(rows: impl IntoIterator<Item = (RowRef, &'a PointRow)>, cell: f64) -> Vec<Bin> {
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut bins: Vec<Bin> = Vec::new();
    for (r, row) in rows {
        let Some([lon, lat]) = row.position() else {
            continue;
        };
        let key = ((lon / cell).floor() as i64, (lat / cell).floor() as i64);
        let slot = *index.entry(key).or_insert_with(|| {
            bins.push(Bin {
                center: [(key.0 as f64 + 0.5) * cell, (key.1 as f64 + 0.5) * cell],
                members: Vec::new(),
            });
            bins.len() - 1
        });
        bins[slot].members.push(r);
    }
    bins
}

/// Index of the item nearest to `at` within `max_dist`, if any.
pub fn nearest<T>(items: &[T], at: [f64; 2], max_dist: f64, pos: impl Fn(&T) -> [f64; 2]) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let [x, y] = pos(item);
            (i, (x - at[0]).hypot(y - at[1]))
        })
        .filter(|&(_, d)| d <= max_dist)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FieldValue;

    fn at(lon: f64, lat: f64) -> PointRow {
        PointRow::default()
            .with("lon", FieldValue::Float(lon))
            .with("lat", FieldValue::Float(lat))
    }

    #[test]
    fn groups_by_cell_in_first_seen_order() {
        let rows = vec![at(0.2, 0.2), at(5.5, 0.1), at(0.9, 0.7), at(-0.1, 0.1), PointRow::default()];
        let refs: Vec<(RowRef, &PointRow)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (RowRef { slot: 0, index: i }, row))
            .collect();
        let bins = bin_rows(refs, 1.0);
        assert_eq!(bins.len(), 3);
        assert_eq!(bins[0].center, [0.5, 0.5]);
        let firsts: Vec<usize> = bins[0].members.iter().map(|r| r.index).collect();
        assert_eq!(firsts, [0, 2]);
        assert_eq!(bins[2].center, [-0.5, 0.5]);
    }

    #[test]
    fn nearest_respects_radius() {
        let pts = [[0.0, 0.0], [3.0, 4.0]];
        assert_eq!(nearest(&pts, [2.5, 3.5], 1.0, |p| *p), Some(1));
        assert_eq!(nearest(&pts, [10.0, 10.0], 1.0, |p| *p), None);
    }

    #[test]
    fn cell_size_shrinks_with_zoom() {
        assert!(cell_size_for_zoom(8.0) < cell_size_for_zoom(3.0));
        assert_eq!(cell_size_for_zoom(40.0), 0.01);
    }
}
