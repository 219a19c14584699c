//! Range membership index
//!
//! Partitions the student list into per-tier candidate lists. The index is a
//! pure function of the current roster and tier configuration; it is rebuilt
//! whenever either changes rather than updated incrementally. O(students x
//! ranges) is fine at classroom scale.

use ahash::AHashMap;

use crate::roster::range::PointRange;
use crate::roster::student::Student;

/// Per-tier candidate lists, keyed by range id
#[derive(Debug, Clone, Default)]
pub struct RangeIndex {
    by_range: AHashMap<String, Vec<Student>>,
}

impl RangeIndex {
    /// Build the index from the current roster state.
    ///
    /// A student with points inside several overlapping tiers appears in
    /// each of them; that is permitted, not an error.
    pub fn build(students: &[Student], ranges: &[PointRange]) -> Self {
        let mut by_range = AHashMap::with_capacity(ranges.len());

        for range in ranges {
            let members: Vec<Student> = students
                .iter()
                .filter(|s| range.contains(s.points))
                .cloned()
                .collect();
            by_range.insert(range.id.clone(), members);
        }

        Self { by_range }
    }

    /// Candidates for a tier; empty for an unknown range id
    pub fn candidates(&self, range_id: &str) -> &[Student] {
        self.by_range
            .get(range_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Candidate count for a tier
    pub fn count(&self, range_id: &str) -> usize {
        self.candidates(range_id).len()
    }

    /// Number of indexed tiers
    pub fn len(&self) -> usize {
        self.by_range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_range.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::range::default_ranges;

    fn student(id: &str, points: i32) -> Student {
        Student {
            id: id.to_string(),
            name: id.to_string(),
            class_id: "class-1".to_string(),
            points,
        }
    }

    #[test]
    fn test_build_partitions_by_bounds() {
        let students = vec![
            student("a", 5),
            student("b", 15),
            student("c", 16),
            student("d", 50),
            student("e", 99),
        ];
        let index = RangeIndex::build(&students, &default_ranges());

        assert_eq!(index.count("range-1"), 2);
        assert_eq!(index.count("range-2"), 1);
        assert_eq!(index.count("range-3"), 1);
        // 99 is above every tier
        let total: usize = ["range-1", "range-2", "range-3"]
            .iter()
            .map(|id| index.count(id))
            .sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_overlapping_ranges_duplicate_membership() {
        let ranges = vec![
            PointRange {
                id: "low".to_string(),
                label: "Low".to_string(),
                min: 0,
                max: 20,
                winners_count: 1,
            },
            PointRange {
                id: "wide".to_string(),
                label: "Wide".to_string(),
                min: 10,
                max: 30,
                winners_count: 1,
            },
        ];
        let students = vec![student("a", 15)];
        let index = RangeIndex::build(&students, &ranges);

        assert_eq!(index.count("low"), 1);
        assert_eq!(index.count("wide"), 1);
    }

    #[test]
    fn test_unknown_range_is_empty() {
        let index = RangeIndex::build(&[], &default_ranges());
        assert!(index.candidates("range-404").is_empty());
    }
}
