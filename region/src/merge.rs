//! The bounding box merging algorithm.

use crate::common::*;
use bbox::Bbox;

/// Tunables for the region merger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionMergerInit {
    /// Maximum axis-projected gap, in pixels, for two boxes to count as
    /// adjacent on that axis. Boxes merge when both axes are within the gap.
    pub min_gap: i64,
    /// Inclusive lower bound on a merged region's bounding area.
    pub min_area: Option<i64>,
    /// Inclusive upper bound on a merged region's bounding area.
    pub max_area: Option<i64>,
    /// Minimum area-to-perimeter ratio a merged region must meet. Rejects
    /// thin sliver regions.
    pub min_area_perimeter_ratio: Option<R64>,
}

impl Default for RegionMergerInit {
    fn default() -> Self {
        Self {
            min_gap: 16,
            min_area: None,
            max_area: None,
            min_area_perimeter_ratio: Some(r64(4.0)),
        }
    }
}

impl RegionMergerInit {
    pub fn build(self) -> RegionMerger {
        let Self {
            min_gap,
            min_area,
            max_area,
            min_area_perimeter_ratio,
        } = self;

        RegionMerger {
            min_gap,
            min_area,
            max_area,
            min_area_perimeter_ratio: min_area_perimeter_ratio.map(R64::raw),
        }
    }
}

/// Groups mutually near boxes and reduces each group to one enclosing box.
#[derive(Debug, Clone)]
pub struct RegionMerger {
    min_gap: i64,
    min_area: Option<i64>,
    max_area: Option<i64>,
    min_area_perimeter_ratio: Option<f64>,
}

impl RegionMerger {
    /// Partition the boxes into groups that are transitively within
    /// `min_gap` of each other, and return the enclosing box of every group
    /// that survives the area and shape filters. Output order is not
    /// significant.
    pub fn merge(&self, bboxes: Vec<Bbox<i64>>) -> Vec<Bbox<i64>> {
        // zero-extent boxes would break the area/perimeter ratio below
        let mut boxes: Vec<_> = bboxes.into_iter().filter(|bbox| !bbox.is_empty()).collect();

        if let Some(min_area) = self.min_area {
            let tiny = ((min_area as f64).sqrt() / 4.0) as i64;
            boxes.retain(|bbox| bbox.w() > tiny && bbox.h() > tiny);
        }

        let mut visited = vec![false; boxes.len()];
        let mut regions = vec![];

        for seed in 0..boxes.len() {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;

            // single-linkage closure: every member becomes a candidate whose
            // neighbors are pulled into the group in turn
            let mut members = vec![seed];
            let mut cursor = 0;
            while cursor < members.len() {
                let current = members[cursor];
                cursor += 1;

                for index in 0..boxes.len() {
                    if visited[index] {
                        continue;
                    }
                    if boxes[current].is_within_gap(&boxes[index], self.min_gap) {
                        visited[index] = true;
                        members.push(index);
                    }
                }
            }

            let enclosing = members[1..]
                .iter()
                .fold(boxes[seed], |union, &index| union.union(&boxes[index]));

            if self.accepts(&enclosing) {
                regions.push(enclosing);
            }
        }

        regions
    }

    fn accepts(&self, region: &Bbox<i64>) -> bool {
        let area = region.area();
        if let Some(min_area) = self.min_area {
            if area < min_area {
                return false;
            }
        }
        if let Some(max_area) = self.max_area {
            if area > max_area {
                return false;
            }
        }
        if let Some(min_ratio) = self.min_area_perimeter_ratio {
            if (area as f64) / (region.perimeter() as f64) < min_ratio {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unfiltered() -> RegionMerger {
        RegionMergerInit {
            min_gap: 16,
            min_area: None,
            max_area: None,
            min_area_perimeter_ratio: None,
        }
        .build()
    }

    #[test]
    fn empty_input() {
        assert_eq!(unfiltered().merge(vec![]), vec![]);
    }

    #[test]
    fn single_box_unchanged() {
        let bbox = Bbox::from_xyxy([3, 5, 13, 9]);
        assert_eq!(unfiltered().merge(vec![bbox]), vec![bbox]);
    }

    #[test]
    fn near_boxes_merge() {
        let merger = RegionMergerInit {
            min_gap: 5,
            min_area_perimeter_ratio: None,
            ..Default::default()
        }
        .build();
        let merged = merger.merge(vec![
            Bbox::from_xyxy([0, 0, 10, 10]),
            Bbox::from_xyxy([12, 0, 20, 10]),
        ]);
        assert_eq!(merged, vec![Bbox::from_xyxy([0, 0, 20, 10])]);
    }

    #[test]
    fn distant_boxes_stay_apart() {
        let merger = RegionMergerInit {
            min_gap: 0,
            min_area_perimeter_ratio: None,
            ..Default::default()
        }
        .build();
        let lhs = Bbox::from_xyxy([0, 0, 10, 10]);
        let rhs = Bbox::from_xyxy([12, 0, 20, 10]);
        let mut merged = merger.merge(vec![lhs, rhs]);
        merged.sort_by_key(|bbox| bbox.xmin());
        assert_eq!(merged, vec![lhs, rhs]);
    }

    #[test]
    fn grouping_is_transitive() {
        // a-b and b-c are adjacent while a-c are not; all three must still
        // end up in one region
        let merger = RegionMergerInit {
            min_gap: 4,
            min_area_perimeter_ratio: None,
            ..Default::default()
        }
        .build();
        let merged = merger.merge(vec![
            Bbox::from_xyxy([0, 0, 10, 10]),
            Bbox::from_xyxy([28, 0, 40, 10]),
            Bbox::from_xyxy([13, 0, 25, 10]),
        ]);
        assert_eq!(merged, vec![Bbox::from_xyxy([0, 0, 40, 10])]);
    }

    #[test]
    fn outputs_are_pairwise_apart() {
        let merger = RegionMergerInit {
            min_gap: 2,
            min_area_perimeter_ratio: None,
            ..Default::default()
        }
        .build();
        let merged = merger.merge(vec![
            Bbox::from_xyxy([0, 0, 10, 10]),
            Bbox::from_xyxy([11, 0, 20, 10]),
            Bbox::from_xyxy([40, 40, 50, 50]),
            Bbox::from_xyxy([52, 40, 60, 50]),
            Bbox::from_xyxy([100, 0, 110, 10]),
        ]);
        assert_eq!(merged.len(), 3);
        for (index, lhs) in merged.iter().enumerate() {
            for rhs in &merged[index + 1..] {
                assert!(!lhs.is_within_gap(rhs, 2));
            }
        }
    }

    #[test]
    fn tiny_boxes_are_prefiltered() {
        // min_area 64 makes the tiny threshold floor(sqrt(64) / 4) = 2; the
        // 2-pixel-wide box is dropped before grouping and cannot bridge the
        // two large boxes
        let merger = RegionMergerInit {
            min_gap: 4,
            min_area: Some(64),
            min_area_perimeter_ratio: None,
            ..Default::default()
        }
        .build();
        let mut merged = merger.merge(vec![
            Bbox::from_xyxy([0, 0, 10, 10]),
            Bbox::from_xyxy([13, 0, 15, 10]),
            Bbox::from_xyxy([18, 0, 28, 10]),
        ]);
        merged.sort_by_key(|bbox| bbox.xmin());
        assert_eq!(
            merged,
            vec![Bbox::from_xyxy([0, 0, 10, 10]), Bbox::from_xyxy([18, 0, 28, 10])]
        );
    }

    #[test]
    fn area_bounds_filter_regions() {
        let merger = RegionMergerInit {
            min_gap: 0,
            min_area: Some(196),
            max_area: Some(1000),
            min_area_perimeter_ratio: None,
        }
        .build();
        let merged = merger.merge(vec![
            // area 225, kept
            Bbox::from_xyxy([0, 0, 15, 15]),
            // area 169, under min_area yet over the tiny threshold of 3
            Bbox::from_xyxy([100, 100, 113, 113]),
            // area 1600, over max_area
            Bbox::from_xyxy([200, 200, 240, 240]),
        ]);
        assert_eq!(merged, vec![Bbox::from_xyxy([0, 0, 15, 15])]);
    }

    #[test]
    fn slivers_are_rejected_by_ratio() {
        let merger = RegionMergerInit {
            min_gap: 0,
            ..Default::default()
        }
        .build();
        // area 200, perimeter 204, ratio < 1
        assert_eq!(merger.merge(vec![Bbox::from_xyxy([0, 0, 100, 2])]), vec![]);
        // area 400, perimeter 80, ratio 5
        let square = Bbox::from_xyxy([0, 0, 20, 20]);
        assert_eq!(merger.merge(vec![square]), vec![square]);
    }

    #[test]
    fn zero_extent_boxes_are_dropped() {
        let merged = unfiltered().merge(vec![
            Bbox::from_xyxy([0, 0, 0, 10]),
            Bbox::from_xyxy([5, 5, 5, 5]),
        ]);
        assert_eq!(merged, vec![]);
    }
}
