//! Roster module: classes, students, prize tiers and the store of record
//!
//! This module handles deserialization of roster data from Python dicts.

mod class;
mod index;
mod range;
mod store;
mod student;


pub use class::*;
pub use index::*;
pub use range::*;
pub use store::*;
pub use student::*;

use crate::error::DrawCoreError;
use pyo3::types::{PyAnyMethods, PyDict, PyDictMethods, PyList, PyListMethods};
use pyo3::Bound;

/// Helper to get attribute from either dict or object
fn get_attr<'py>(
    obj: &Bound<'py, pyo3::PyAny>,
    name: &str,
) -> pyo3::PyResult<Bound<'py, pyo3::PyAny>> {
    if let Ok(dict) = obj.downcast::<PyDict>() {
        dict.get_item(name)?
            .ok_or_else(|| pyo3::exceptions::PyKeyError::new_err(name.to_string()))
    } else {
        obj.getattr(name)
    }
}

/// Helper to get optional attribute from either dict or object
fn get_attr_opt<'py>(obj: &Bound<'py, pyo3::PyAny>, name: &str) -> Option<Bound<'py, pyo3::PyAny>> {
    if let Ok(dict) = obj.downcast::<PyDict>() {
        dict.get_item(name).ok().flatten()
    } else {
        obj.getattr(name).ok()
    }
}

/// Deserialize a full roster from a Python config dict.
///
/// Expected format:
/// `{"classes": [...], "students": [...], "ranges": [...]}`.
/// Every section is optional; missing tiers fall back to the defaults.
pub fn deserialize_roster(config: &Bound<'_, PyDict>) -> pyo3::PyResult<RosterStore> {
    let classes = match config.get_item("classes")? {
        Some(obj) if !obj.is_none() => deserialize_classes(&obj)?,
        _ => Vec::new(),
    };

    let students = match config.get_item("students")? {
        Some(obj) if !obj.is_none() => deserialize_students(&obj)?,
        _ => Vec::new(),
    };

    // Support both "ranges" and the original "pointRanges" section name
    let ranges_obj = match config.get_item("ranges")? {
        Some(obj) if !obj.is_none() => Some(obj),
        _ => config.get_item("pointRanges")?.filter(|o| !o.is_none()),
    };
    let ranges = match ranges_obj {
        Some(obj) => deserialize_ranges(&obj)?,
        None => default_ranges(),
    };

    for student in &students {
        if !classes.iter().any(|c| c.id == student.class_id) {
            return Err(DrawCoreError::ClassNotFound(student.class_id.clone()).into());
        }
    }
    for range in &ranges {
        range.validate().map_err(pyo3::PyErr::from)?;
    }

    Ok(RosterStore::from_parts(classes, students, ranges))
}

/// Deserialize the class list
pub fn deserialize_classes(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<Vec<Class>> {
    let list: Bound<'_, PyList> = obj.extract()?;
    let mut classes = Vec::with_capacity(list.len());
    for item in list.iter() {
        classes.push(extract_class(&item)?);
    }
    Ok(classes)
}

fn extract_class(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<Class> {
    let id: String = get_attr(obj, "id")?.extract()?;
    let grade: i32 = get_attr(obj, "grade")?.extract()?;
    // Support both "class_number" and "classNumber" field names
    let class_number: i32 = get_attr(obj, "class_number")
        .or_else(|_| get_attr(obj, "classNumber"))?
        .extract()?;

    // The display name is derived, never trusted from input
    Ok(Class::new(id, grade, class_number))
}

/// Deserialize the student list
pub fn deserialize_students(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<Vec<Student>> {
    let list: Bound<'_, PyList> = obj.extract()?;
    let mut students = Vec::with_capacity(list.len());
    for item in list.iter() {
        students.push(extract_student(&item)?);
    }
    Ok(students)
}

fn extract_student(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<Student> {
    let id: String = get_attr(obj, "id")?.extract()?;
    let name: String = get_attr(obj, "name")?.extract()?;
    // Support both "class_id" and "classId" field names
    let class_id: String = get_attr(obj, "class_id")
        .or_else(|_| get_attr(obj, "classId"))?
        .extract()?;
    let points: i32 = get_attr_opt(obj, "points")
        .and_then(|v| v.extract().ok())
        .unwrap_or(0);

    Ok(Student {
        id,
        name,
        class_id,
        points,
    })
}

/// Deserialize the prize tier list
pub fn deserialize_ranges(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<Vec<PointRange>> {
    let list: Bound<'_, PyList> = obj.extract()?;
    let mut ranges = Vec::with_capacity(list.len());
    for item in list.iter() {
        ranges.push(extract_range(&item)?);
    }
    Ok(ranges)
}

fn extract_range(obj: &Bound<'_, pyo3::PyAny>) -> pyo3::PyResult<PointRange> {
    let id: String = get_attr(obj, "id")?.extract()?;
    let label: String = get_attr(obj, "label")?.extract()?;
    let min: i32 = get_attr(obj, "min")?.extract()?;
    let max: i32 = get_attr(obj, "max")?.extract()?;
    // Support both "winners_count" and "winnersCount" field names
    let winners_count: usize = get_attr(obj, "winners_count")
        .or_else(|_| get_attr(obj, "winnersCount"))?
        .extract()?;

    Ok(PointRange {
        id,
        label,
        min,
        max,
        winners_count,
    })
}
