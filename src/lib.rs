//! Prize Draw Core - High-performance classroom prize draw engine
//!
//! This crate provides a Rust implementation of a classroom roster and
//! prize draw with Python bindings via PyO3. The roster of record is cached
//! in Rust memory; draws run over candidate snapshots and are driven frame
//! by frame from the presentation layer, or to completion in one call.

use pyo3::prelude::*;

pub mod draw;
pub mod error;
pub mod field;
pub mod random;
pub mod roster;

use crate::draw::{DrawEngine, DrawSession, DrawStyle};
use crate::error::DrawCoreError;
use crate::roster::{RangeUpdate, RosterStore, Student, StudentUpdate};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use pyo3::types::{PyDict, PyList};
use std::sync::Arc;

/// Frame budget for draws driven to completion in one call
const RUN_FRAME_BUDGET: u64 = 100_000;

// ============================================================================
// Cached Roster
// ============================================================================

/// Global cached roster store
static CACHED_ROSTER: OnceCell<Arc<RwLock<RosterStore>>> = OnceCell::new();

/// Run a closure against the cached store (read lock)
fn with_store<T>(f: impl FnOnce(&RosterStore) -> PyResult<T>) -> PyResult<T> {
    let store = CACHED_ROSTER
        .get()
        .ok_or(DrawCoreError::RosterNotInitialized)?;
    let guard = store.read();
    f(&guard)
}

/// Run a closure against the cached store (write lock)
fn with_store_mut<T>(f: impl FnOnce(&mut RosterStore) -> PyResult<T>) -> PyResult<T> {
    let store = CACHED_ROSTER
        .get()
        .ok_or(DrawCoreError::RosterNotInitialized)?;
    let mut guard = store.write();
    f(&mut guard)
}

/// Install a store into the cache, replacing any previous one
fn install_store(store: RosterStore) {
    if let Some(existing) = CACHED_ROSTER.get() {
        let mut guard = existing.write();
        *guard = store;
    } else {
        let _ = CACHED_ROSTER.set(Arc::new(RwLock::new(store)));
    }
}

// ============================================================================
// Dict Conversion Helpers
// ============================================================================

fn class_to_dict<'py>(
    py: Python<'py>,
    class: &roster::Class,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("id", &class.id)?;
    dict.set_item("grade", class.grade)?;
    dict.set_item("class_number", class.class_number)?;
    dict.set_item("name", &class.name)?;
    Ok(dict)
}

fn student_to_dict<'py>(py: Python<'py>, student: &Student) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("id", &student.id)?;
    dict.set_item("name", &student.name)?;
    dict.set_item("class_id", &student.class_id)?;
    dict.set_item("points", student.points)?;
    Ok(dict)
}

fn range_to_dict<'py>(
    py: Python<'py>,
    range: &roster::PointRange,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("id", &range.id)?;
    dict.set_item("label", &range.label)?;
    dict.set_item("min", range.min)?;
    dict.set_item("max", range.max)?;
    dict.set_item("winners_count", range.winners_count)?;
    Ok(dict)
}

fn students_to_list<'py>(
    py: Python<'py>,
    students: &[&Student],
) -> PyResult<Bound<'py, PyList>> {
    let list = PyList::empty(py);
    for student in students {
        list.append(student_to_dict(py, student)?)?;
    }
    Ok(list)
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the roster (call once at startup)
///
/// Caches the roster in Rust memory. With no argument an empty roster with
/// the default prize tiers is installed; otherwise the dict is expected to
/// hold `classes`, `students` and `ranges` sections.
///
/// # Arguments
/// * `config` - Optional roster data previously exported by the embedding
#[pyfunction]
#[pyo3(signature = (config=None))]
fn init_roster(config: Option<&Bound<'_, PyDict>>) -> PyResult<()> {
    let store = match config {
        Some(dict) => roster::deserialize_roster(dict)?,
        None => RosterStore::new(),
    };
    install_store(store);
    Ok(())
}

/// Check if the roster is initialized
#[pyfunction]
fn is_roster_initialized() -> bool {
    CACHED_ROSTER.get().is_some()
}

/// Restore the roster from a JSON snapshot produced by `dump_roster_json`
#[pyfunction]
fn load_roster_json(json: &str) -> PyResult<()> {
    let mut store = RosterStore::from_json(json).map_err(PyErr::from)?;
    store.normalize();
    install_store(store);
    Ok(())
}

/// Export the full roster state as JSON for durable persistence
#[pyfunction]
fn dump_roster_json() -> PyResult<String> {
    with_store(|store| store.to_json().map_err(PyErr::from))
}

// ============================================================================
// Roster Mutations
// ============================================================================

/// Add a class and return it. The grade must be 4, 5 or 6 and the
/// grade/number pair must be unique.
#[pyfunction]
fn add_class(py: Python<'_>, grade: i32, class_number: i32) -> PyResult<Py<PyAny>> {
    let class = with_store_mut(|store| {
        store.add_class(grade, class_number).map_err(PyErr::from)
    })?;
    Ok(class_to_dict(py, &class)?.into())
}

/// Remove a class and every student in it; returns the number of students
/// removed by the cascade
#[pyfunction]
fn remove_class(class_id: &str) -> PyResult<usize> {
    with_store_mut(|store| store.remove_class(class_id).map_err(PyErr::from))
}

/// Add a student and return it
#[pyfunction]
#[pyo3(signature = (name, class_id, points=0))]
fn add_student(py: Python<'_>, name: &str, class_id: &str, points: i32) -> PyResult<Py<PyAny>> {
    let student = with_store_mut(|store| {
        store.add_student(name, class_id, points).map_err(PyErr::from)
    })?;
    Ok(student_to_dict(py, &student)?.into())
}

/// Partially update a student; omitted fields are left unchanged
#[pyfunction]
#[pyo3(signature = (student_id, name=None, class_id=None, points=None))]
fn update_student(
    py: Python<'_>,
    student_id: &str,
    name: Option<String>,
    class_id: Option<String>,
    points: Option<i32>,
) -> PyResult<Py<PyAny>> {
    let update = StudentUpdate {
        name,
        class_id,
        points,
    };
    let student = with_store_mut(|store| {
        store.update_student(student_id, update).map_err(PyErr::from)
    })?;
    Ok(student_to_dict(py, &student)?.into())
}

/// Remove a student
#[pyfunction]
fn remove_student(student_id: &str) -> PyResult<()> {
    with_store_mut(|store| store.remove_student(student_id).map_err(PyErr::from))
}

/// Partially update a prize tier. The edit is validated first; on failure
/// the tier keeps its previous values.
#[pyfunction]
#[pyo3(signature = (range_id, label=None, min=None, max=None, winners_count=None))]
fn update_point_range(
    py: Python<'_>,
    range_id: &str,
    label: Option<String>,
    min: Option<i32>,
    max: Option<i32>,
    winners_count: Option<usize>,
) -> PyResult<Py<PyAny>> {
    let update = RangeUpdate {
        label,
        min,
        max,
        winners_count,
    };
    let range = with_store_mut(|store| {
        store.update_range(range_id, update).map_err(PyErr::from)
    })?;
    Ok(range_to_dict(py, &range)?.into())
}

// ============================================================================
// Roster Reads
// ============================================================================

/// All classes
#[pyfunction]
fn get_classes(py: Python<'_>) -> PyResult<Py<PyAny>> {
    with_store(|store| {
        let list = PyList::empty(py);
        for class in store.classes() {
            list.append(class_to_dict(py, class)?)?;
        }
        Ok(list.into())
    })
}

/// All students
#[pyfunction]
fn get_students(py: Python<'_>) -> PyResult<Py<PyAny>> {
    with_store(|store| {
        let refs: Vec<&Student> = store.students().iter().collect();
        Ok(students_to_list(py, &refs)?.into())
    })
}

/// All prize tiers
#[pyfunction]
fn get_point_ranges(py: Python<'_>) -> PyResult<Py<PyAny>> {
    with_store(|store| {
        let list = PyList::empty(py);
        for range in store.ranges() {
            list.append(range_to_dict(py, range)?)?;
        }
        Ok(list.into())
    })
}

/// Students belonging to a class
#[pyfunction]
fn get_students_by_class(py: Python<'_>, class_id: &str) -> PyResult<Py<PyAny>> {
    with_store(|store| Ok(students_to_list(py, &store.students_by_class(class_id))?.into()))
}

/// Students whose points fall inside a tier's bounds (both inclusive)
#[pyfunction]
fn get_students_by_range(py: Python<'_>, range_id: &str) -> PyResult<Py<PyAny>> {
    with_store(|store| {
        let members = store.students_by_range(range_id).map_err(PyErr::from)?;
        Ok(students_to_list(py, &members)?.into())
    })
}

/// Candidate count and tier settings for a tier
#[pyfunction]
fn get_range_stats(py: Python<'_>, range_id: &str) -> PyResult<Py<PyAny>> {
    with_store(|store| {
        let range = store
            .range(range_id)
            .ok_or_else(|| DrawCoreError::RangeNotFound(range_id.to_string()))?;
        let count = store.students_by_range(range_id).map_err(PyErr::from)?.len();

        let dict = PyDict::new(py);
        dict.set_item("count", count)?;
        dict.set_item("range", range_to_dict(py, range)?)?;
        Ok(dict.into())
    })
}

// ============================================================================
// Draws
// ============================================================================

/// Read an optional numeric entry from a layout dict
fn layout_value(layout: &Bound<'_, PyDict>, key: &str) -> PyResult<Option<f32>> {
    match layout.get_item(key)? {
        Some(value) if !value.is_none() => Ok(Some(value.extract()?)),
        _ => Ok(None),
    }
}

/// Apply presentation-supplied geometry (on-screen area dimensions and
/// entity radius) to an engine
fn apply_layout(engine: DrawEngine, layout: &Bound<'_, PyDict>) -> PyResult<DrawEngine> {
    let mut lottery = *engine.lottery_layout();
    let mut pinball = *engine.pinball_layout();

    if let Some(size) = layout_value(layout, "container_size")? {
        lottery.container_size = size;
    }
    if let Some(radius) = layout_value(layout, "ball_radius")? {
        lottery.ball_radius = radius;
        pinball.ball_radius = radius;
    }
    if let Some(width) = layout_value(layout, "board_width")? {
        pinball.width = width;
    }
    if let Some(height) = layout_value(layout, "board_height")? {
        pinball.height = height;
    }
    if let Some(radius) = layout_value(layout, "peg_radius")? {
        pinball.peg_radius = radius;
    }
    if let Some(width) = layout_value(layout, "exit_width")? {
        pinball.exit_width = width;
    }

    Ok(engine
        .with_lottery_layout(lottery)
        .with_pinball_layout(pinball))
}

/// Snapshot a tier and build an engine for it
fn build_engine(
    range_id: &str,
    style: &str,
    seed: Option<u64>,
    layout: Option<&Bound<'_, PyDict>>,
) -> PyResult<DrawEngine> {
    let style = DrawStyle::parse(style).map_err(PyErr::from)?;
    let (candidates, winners_count) = with_store(|store| {
        let range = store
            .range(range_id)
            .ok_or_else(|| DrawCoreError::RangeNotFound(range_id.to_string()))?;
        let candidates = store.candidates_for(range_id).map_err(PyErr::from)?;
        Ok((candidates, range.winners_count))
    })?;

    let engine = DrawEngine::new(style, candidates, winners_count, seed).map_err(PyErr::from)?;
    match layout {
        Some(dict) => apply_layout(engine, dict),
        None => Ok(engine),
    }
}

/// Create an idle draw session over the tier's current candidates.
///
/// The session holds its own snapshot; later roster edits do not affect a
/// running draw. Drive it with `start` and `advance`, render
/// `entity_positions` each frame, and read `winners` once complete.
///
/// # Arguments
/// * `range_id` - Prize tier to draw for
/// * `style` - "lottery" (circular container) or "pinball" (funnel board)
/// * `seed` - Optional seed for a reproducible draw
/// * `layout` - Optional geometry dict: container_size, ball_radius,
///   board_width, board_height, peg_radius, exit_width
#[pyfunction]
#[pyo3(signature = (range_id, style="lottery", seed=None, layout=None))]
fn start_draw(
    range_id: &str,
    style: &str,
    seed: Option<u64>,
    layout: Option<&Bound<'_, PyDict>>,
) -> PyResult<DrawSession> {
    let mut engine = build_engine(range_id, style, seed, layout)?;
    engine.start().map_err(PyErr::from)?;
    Ok(DrawSession::new(engine))
}

/// Run a full draw synchronously and return the completed session
#[pyfunction]
#[pyo3(signature = (range_id, style="lottery", seed=None, layout=None))]
fn run_draw(
    range_id: &str,
    style: &str,
    seed: Option<u64>,
    layout: Option<&Bound<'_, PyDict>>,
) -> PyResult<DrawSession> {
    let mut engine = build_engine(range_id, style, seed, layout)?;
    engine.run_to_completion(RUN_FRAME_BUDGET).map_err(PyErr::from)?;
    Ok(DrawSession::new(engine))
}

/// Run a full draw asynchronously
///
/// The simulation runs on a background thread via Tokio's spawn_blocking,
/// keeping Python's asyncio event loop responsive. The GIL is released for
/// the duration of the simulation.
///
/// # Arguments
/// * `py` - Python interpreter token
/// * `range_id` - Prize tier to draw for
/// * `style` - "lottery" or "pinball"
/// * `seed` - Optional seed for a reproducible draw
///
/// # Returns
/// A Python awaitable that resolves to a completed DrawSession
///
/// # Example (Python)
/// ```python
/// session = await run_draw_async("range-1", style="pinball")
/// print(session.winners())
/// ```
#[pyfunction]
#[pyo3(signature = (range_id, style="lottery", seed=None, layout=None))]
fn run_draw_async<'py>(
    py: Python<'py>,
    range_id: &str,
    style: &str,
    seed: Option<u64>,
    layout: Option<&Bound<'py, PyDict>>,
) -> PyResult<Bound<'py, PyAny>> {
    // Snapshot the roster before entering the async context
    let engine = build_engine(range_id, style, seed, layout)?;

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let session = tokio::task::spawn_blocking(move || {
            let mut engine = engine;
            engine
                .run_to_completion(RUN_FRAME_BUDGET)
                .map_err(PyErr::from)?;
            Ok::<DrawSession, PyErr>(DrawSession::new(engine))
        })
        .await
        .map_err(|e| {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                "Draw task panicked: {}",
                e
            ))
        })??;

        Ok(session)
    })
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn prize_draw_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_roster, m)?)?;
    m.add_function(wrap_pyfunction!(is_roster_initialized, m)?)?;
    m.add_function(wrap_pyfunction!(load_roster_json, m)?)?;
    m.add_function(wrap_pyfunction!(dump_roster_json, m)?)?;
    m.add_function(wrap_pyfunction!(add_class, m)?)?;
    m.add_function(wrap_pyfunction!(remove_class, m)?)?;
    m.add_function(wrap_pyfunction!(add_student, m)?)?;
    m.add_function(wrap_pyfunction!(update_student, m)?)?;
    m.add_function(wrap_pyfunction!(remove_student, m)?)?;
    m.add_function(wrap_pyfunction!(update_point_range, m)?)?;
    m.add_function(wrap_pyfunction!(get_classes, m)?)?;
    m.add_function(wrap_pyfunction!(get_students, m)?)?;
    m.add_function(wrap_pyfunction!(get_point_ranges, m)?)?;
    m.add_function(wrap_pyfunction!(get_students_by_class, m)?)?;
    m.add_function(wrap_pyfunction!(get_students_by_range, m)?)?;
    m.add_function(wrap_pyfunction!(get_range_stats, m)?)?;
    m.add_function(wrap_pyfunction!(start_draw, m)?)?;
    m.add_function(wrap_pyfunction!(run_draw, m)?)?;
    m.add_function(wrap_pyfunction!(run_draw_async, m)?)?;
    m.add_class::<DrawSession>()?;
    Ok(())
}
