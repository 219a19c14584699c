//! Roster store - explicit state container for classes, students and tiers
//!
//! The store owns the roster of record. Draw sessions never hold a reference
//! to it; they take a candidate snapshot at start and work from that.

use serde::{Deserialize, Serialize};

use crate::error::{DrawCoreError, Result};
use crate::roster::class::{display_name, Class, VALID_GRADES};
use crate::roster::range::{default_ranges, PointRange};
use crate::roster::student::{Student, StudentUpdate};

/// Partial update for a point range; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct RangeUpdate {
    pub label: Option<String>,
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub winners_count: Option<usize>,
}

/// The roster of record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterStore {
    classes: Vec<Class>,
    students: Vec<Student>,
    ranges: Vec<PointRange>,
    next_class_id: u32,
    next_student_id: u32,
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    /// Create an empty store with the default prize tiers
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            students: Vec::new(),
            ranges: default_ranges(),
            next_class_id: 1,
            next_student_id: 1,
        }
    }

    /// Build a store from already-deserialized parts.
    ///
    /// Id counters are inferred from the highest numeric suffix present so
    /// that freshly generated ids never collide with imported ones.
    pub fn from_parts(
        classes: Vec<Class>,
        students: Vec<Student>,
        ranges: Vec<PointRange>,
    ) -> Self {
        let next_class_id = next_counter(classes.iter().map(|c| c.id.as_str()), "class-");
        let next_student_id = next_counter(students.iter().map(|s| s.id.as_str()), "student-");
        Self {
            classes,
            students,
            ranges,
            next_class_id,
            next_student_id,
        }
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn ranges(&self) -> &[PointRange] {
        &self.ranges
    }

    pub fn class(&self, id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    pub fn range(&self, id: &str) -> Option<&PointRange> {
        self.ranges.iter().find(|r| r.id == id)
    }

    pub fn students_by_class(&self, class_id: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .collect()
    }

    /// Students whose points fall inside the given tier (bounds inclusive)
    pub fn students_by_range(&self, range_id: &str) -> Result<Vec<&Student>> {
        let range = self
            .range(range_id)
            .ok_or_else(|| DrawCoreError::RangeNotFound(range_id.to_string()))?;
        Ok(self
            .students
            .iter()
            .filter(|s| range.contains(s.points))
            .collect())
    }

    /// Owned candidate snapshot for a tier, taken at draw start
    pub fn candidates_for(&self, range_id: &str) -> Result<Vec<Student>> {
        Ok(self
            .students_by_range(range_id)?
            .into_iter()
            .cloned()
            .collect())
    }

    // ------------------------------------------------------------------------
    // Class mutations
    // ------------------------------------------------------------------------

    /// Add a class. The grade must be one of the supported grades and the
    /// grade/number pair must be unique.
    pub fn add_class(&mut self, grade: i32, class_number: i32) -> Result<Class> {
        if !VALID_GRADES.contains(&grade) {
            return Err(DrawCoreError::InvalidGrade(grade));
        }
        if self
            .classes
            .iter()
            .any(|c| c.grade == grade && c.class_number == class_number)
        {
            return Err(DrawCoreError::DuplicateClass {
                grade,
                class_number,
            });
        }

        let id = format!("class-{}", self.next_class_id);
        self.next_class_id += 1;

        let class = Class::new(id, grade, class_number);
        self.classes.push(class.clone());
        Ok(class)
    }

    /// Remove a class and every student that references it.
    ///
    /// Returns the number of students removed by the cascade.
    pub fn remove_class(&mut self, id: &str) -> Result<usize> {
        if self.class(id).is_none() {
            return Err(DrawCoreError::ClassNotFound(id.to_string()));
        }

        self.classes.retain(|c| c.id != id);
        let before = self.students.len();
        self.students.retain(|s| s.class_id != id);
        Ok(before - self.students.len())
    }

    // ------------------------------------------------------------------------
    // Student mutations
    // ------------------------------------------------------------------------

    pub fn add_student(&mut self, name: &str, class_id: &str, points: i32) -> Result<Student> {
        if self.class(class_id).is_none() {
            return Err(DrawCoreError::ClassNotFound(class_id.to_string()));
        }

        let id = format!("student-{}", self.next_student_id);
        self.next_student_id += 1;

        let student = Student {
            id,
            name: name.to_string(),
            class_id: class_id.to_string(),
            points,
        };
        self.students.push(student.clone());
        Ok(student)
    }

    pub fn update_student(&mut self, id: &str, update: StudentUpdate) -> Result<Student> {
        if let Some(ref class_id) = update.class_id {
            if self.class(class_id).is_none() {
                return Err(DrawCoreError::ClassNotFound(class_id.clone()));
            }
        }

        let student = self
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| DrawCoreError::StudentNotFound(id.to_string()))?;

        if let Some(name) = update.name {
            student.name = name;
        }
        if let Some(class_id) = update.class_id {
            student.class_id = class_id;
        }
        if let Some(points) = update.points {
            student.points = points;
        }
        Ok(student.clone())
    }

    pub fn remove_student(&mut self, id: &str) -> Result<()> {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        if self.students.len() == before {
            return Err(DrawCoreError::StudentNotFound(id.to_string()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Range mutations
    // ------------------------------------------------------------------------

    /// Apply a partial update to a tier. The resulting range is validated
    /// before anything is written; a failed validation leaves the store
    /// untouched.
    pub fn update_range(&mut self, id: &str, update: RangeUpdate) -> Result<PointRange> {
        let index = self
            .ranges
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| DrawCoreError::RangeNotFound(id.to_string()))?;

        let mut candidate = self.ranges[index].clone();
        if let Some(label) = update.label {
            candidate.label = label;
        }
        if let Some(min) = update.min {
            candidate.min = min;
        }
        if let Some(max) = update.max {
            candidate.max = max;
        }
        if let Some(winners_count) = update.winners_count {
            candidate.winners_count = winners_count;
        }

        candidate.validate()?;
        self.ranges[index] = candidate.clone();
        Ok(candidate)
    }

    // ------------------------------------------------------------------------
    // Persistence for the external store
    // ------------------------------------------------------------------------

    /// Serialize the full store state to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| DrawCoreError::DeserializationError(e.to_string()))
    }

    /// Restore a store from a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DrawCoreError::DeserializationError(e.to_string()))
    }

    /// Rebuild derived class names, e.g. after a snapshot edited by hand
    pub fn normalize(&mut self) {
        for class in &mut self.classes {
            class.name = display_name(class.grade, class.class_number);
        }
    }
}

/// Smallest counter strictly above every `<prefix>N` suffix in `ids`
fn next_counter<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> u32 {
    ids.filter_map(|id| id.strip_prefix(prefix))
        .filter_map(|suffix| suffix.parse::<u32>().ok())
        .max()
        .map(|max| max + 1)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_class() -> (RosterStore, String) {
        let mut store = RosterStore::new();
        let class = store.add_class(4, 1).unwrap();
        (store, class.id)
    }

    #[test]
    fn test_add_class_generates_name() {
        let (store, class_id) = store_with_class();
        let class = store.class(&class_id).unwrap();
        assert_eq!(class.name, "Grade 4 Class 1");
    }

    #[test]
    fn test_add_class_rejects_unknown_grade() {
        let mut store = RosterStore::new();
        assert!(matches!(
            store.add_class(7, 1),
            Err(DrawCoreError::InvalidGrade(7))
        ));
        assert!(store.classes().is_empty());
    }

    #[test]
    fn test_add_class_rejects_duplicate() {
        let (mut store, _) = store_with_class();
        assert!(matches!(
            store.add_class(4, 1),
            Err(DrawCoreError::DuplicateClass { .. })
        ));
        assert_eq!(store.classes().len(), 1);
    }

    #[test]
    fn test_remove_class_cascades_to_students() {
        let (mut store, class_id) = store_with_class();
        let other = store.add_class(5, 1).unwrap();

        store.add_student("Ava", &class_id, 10).unwrap();
        store.add_student("Ben", &class_id, 20).unwrap();
        let kept = store.add_student("Cho", &other.id, 30).unwrap();

        let removed = store.remove_class(&class_id).unwrap();
        assert_eq!(removed, 2);
        assert!(store.class(&class_id).is_none());
        assert!(store.students().iter().all(|s| s.class_id != class_id));
        assert!(store.student(&kept.id).is_some());
    }

    #[test]
    fn test_add_student_requires_class() {
        let mut store = RosterStore::new();
        assert!(matches!(
            store.add_student("Ava", "class-404", 10),
            Err(DrawCoreError::ClassNotFound(_))
        ));
    }

    #[test]
    fn test_update_student_partial() {
        let (mut store, class_id) = store_with_class();
        let student = store.add_student("Ava", &class_id, 10).unwrap();

        let updated = store
            .update_student(
                &student.id,
                StudentUpdate {
                    points: Some(42),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.points, 42);
        assert_eq!(updated.name, "Ava");
        assert_eq!(updated.class_id, class_id);
    }

    #[test]
    fn test_update_student_rejects_unknown_class() {
        let (mut store, class_id) = store_with_class();
        let student = store.add_student("Ava", &class_id, 10).unwrap();

        let result = store.update_student(
            &student.id,
            StudentUpdate {
                class_id: Some("class-404".to_string()),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert_eq!(store.student(&student.id).unwrap().class_id, class_id);
    }

    #[test]
    fn test_update_range_validates_before_commit() {
        let mut store = RosterStore::new();
        let original = store.range("range-1").unwrap().clone();

        let result = store.update_range(
            "range-1",
            RangeUpdate {
                max: Some(original.min),
                ..Default::default()
            },
        );

        assert!(result.is_err());
        assert_eq!(store.range("range-1").unwrap(), &original);
    }

    #[test]
    fn test_update_range_commits_valid_edit() {
        let mut store = RosterStore::new();
        let updated = store
            .update_range(
                "range-1",
                RangeUpdate {
                    label: Some("Copper".to_string()),
                    min: None,
                    max: Some(12),
                    winners_count: Some(3),
                },
            )
            .unwrap();

        assert_eq!(updated.label, "Copper");
        assert_eq!(updated.max, 12);
        assert_eq!(updated.winners_count, 3);
        assert_eq!(store.range("range-1").unwrap(), &updated);
    }

    #[test]
    fn test_students_by_range_boundaries() {
        let (mut store, class_id) = store_with_class();
        for points in [0, 15, 16, 50] {
            store
                .add_student(&format!("P{}", points), &class_id, points)
                .unwrap();
        }

        let bronze: Vec<i32> = store
            .students_by_range("range-1")
            .unwrap()
            .iter()
            .map(|s| s.points)
            .collect();
        assert_eq!(bronze, vec![0, 15]);
    }

    #[test]
    fn test_from_parts_infers_counters() {
        let classes = vec![Class::new("class-3".to_string(), 4, 1)];
        let students = vec![Student {
            id: "student-9".to_string(),
            name: "Ava".to_string(),
            class_id: "class-3".to_string(),
            points: 10,
        }];
        let mut store = RosterStore::from_parts(classes, students, default_ranges());

        let class = store.add_class(5, 1).unwrap();
        assert_eq!(class.id, "class-4");
        let student = store.add_student("Ben", "class-3", 0).unwrap();
        assert_eq!(student.id, "student-10");
    }

    #[test]
    fn test_json_round_trip() {
        let (mut store, class_id) = store_with_class();
        store.add_student("Ava", &class_id, 10).unwrap();
        store
            .update_range(
                "range-2",
                RangeUpdate {
                    winners_count: Some(4),
                    ..Default::default()
                },
            )
            .unwrap();

        let json = store.to_json().unwrap();
        let restored = RosterStore::from_json(&json).unwrap();

        assert_eq!(restored.classes(), store.classes());
        assert_eq!(restored.students(), store.students());
        assert_eq!(restored.ranges(), store.ranges());

        // Id counters survive the round trip so new ids never collide
        let mut restored = restored;
        let new_student = restored.add_student("Ben", &class_id, 5).unwrap();
        assert!(store.student(&new_student.id).is_none());
    }
}
