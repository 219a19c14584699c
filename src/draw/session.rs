//! DrawSession - Stateful session for Python-Rust boundary
//!
//! This module provides the DrawSession PyClass that holds one draw engine
//! in Rust heap memory. The presentation layer drives it one frame per
//! display tick and reads back entity positions, or hands control to
//! `run_to_completion` and only consumes the result.

use pyo3::prelude::*;
use pyo3::types::{PyAny, PyDict, PyList};

use crate::draw::DrawEngine;
use crate::field::Entity;
use crate::roster::Student;

/// Default frame budget for a driven-to-completion draw
const RUN_FRAME_BUDGET: u64 = 100_000;

/// DrawSession - one draw over a candidate snapshot
///
/// The session owns its simulation state exclusively; discarding or
/// resetting it leaves the roster untouched. All pacing is frame counters
/// inside the engine, so a reset cancels everything outstanding.
#[pyclass]
pub struct DrawSession {
    engine: DrawEngine,
}

impl DrawSession {
    pub fn new(engine: DrawEngine) -> Self {
        Self { engine }
    }

    /// Engine access for Rust-side callers and tests
    pub fn engine(&self) -> &DrawEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut DrawEngine {
        &mut self.engine
    }
}

#[pymethods]
impl DrawSession {
    // ------------------------------------------------------------------------
    // Getter Properties
    // ------------------------------------------------------------------------

    /// Current phase name: idle, spinning, exiting, holding, paused,
    /// dropping, finalizing or complete
    #[getter]
    fn phase(&self) -> &'static str {
        self.engine.phase().as_str()
    }

    /// Animation style name: lottery or pinball
    #[getter]
    fn style(&self) -> &'static str {
        self.engine.style().as_str()
    }

    /// Seed driving this session, for reproducible draws
    #[getter]
    fn seed(&self) -> u64 {
        self.engine.seed()
    }

    /// Frames advanced since start
    #[getter]
    fn frames_elapsed(&self) -> u64 {
        self.engine.frames_elapsed()
    }

    /// Number of winners this draw will produce
    #[getter]
    fn winners_count(&self) -> usize {
        self.engine.winners_count()
    }

    /// Size of the candidate snapshot
    #[getter]
    fn candidate_count(&self) -> usize {
        self.engine.candidates().len()
    }

    #[getter]
    fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    // ------------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------------

    /// Begin the run. Fails if the session is not idle.
    fn start(&mut self) -> PyResult<()> {
        self.engine.start().map_err(PyErr::from)
    }

    /// Advance one frame and return the phase name afterwards
    fn advance(&mut self) -> &'static str {
        self.engine.advance().as_str()
    }

    /// Discard the run and return to idle. Nothing scheduled by the
    /// abandoned run can fire afterwards.
    fn reset(&mut self) {
        self.engine.reset();
    }

    /// Drive the draw until it completes and return the ordered winners.
    ///
    /// # Arguments
    /// * `max_frames` - Frame budget (default: 100000)
    #[pyo3(signature = (max_frames=None))]
    fn run_to_completion(&mut self, py: Python<'_>, max_frames: Option<u64>) -> PyResult<Py<PyAny>> {
        let budget = max_frames.unwrap_or(RUN_FRAME_BUDGET);
        self.engine
            .run_to_completion(budget)
            .map_err(PyErr::from)?;
        self.winners(py)
    }

    // ------------------------------------------------------------------------
    // Lazy Data Access Methods
    // ------------------------------------------------------------------------

    /// Positions of the balls still in play, one dict per ball
    fn entity_positions(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for entity in self.engine.active_entities() {
            list.append(self.entity_to_dict(py, entity)?)?;
        }
        Ok(list.into())
    }

    /// The ball currently riding the exit path, or None
    fn exiting_ball(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        match self.engine.exiting() {
            Some((entity, point)) => {
                let dict = PyDict::new(py);
                dict.set_item("id", &entity.id)?;
                dict.set_item("name", &entity.name)?;
                dict.set_item("x", point.pos.x)?;
                dict.set_item("y", point.pos.y)?;
                dict.set_item("scale", point.scale)?;
                dict.set_item("stage", format!("{:?}", point.stage).to_lowercase())?;
                Ok(dict.into())
            }
            None => Ok(py.None()),
        }
    }

    /// Ordered winners so far. Complete only once `is_complete` is true.
    fn winners(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for student in self.engine.winners() {
            list.append(self.student_to_dict(py, student)?)?;
        }
        Ok(list.into())
    }

    /// Balls that left the active set, in departure order. For the funnel
    /// board this is the finish order the selection is based on.
    fn finish_order(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for entity in self.engine.departed_entities() {
            let dict = PyDict::new(py);
            dict.set_item("id", &entity.id)?;
            dict.set_item("name", &entity.name)?;
            list.append(dict)?;
        }
        Ok(list.into())
    }

    /// The candidate snapshot this draw runs over
    fn candidates(&self, py: Python<'_>) -> PyResult<Py<PyAny>> {
        let list = PyList::empty(py);
        for student in self.engine.candidates() {
            list.append(self.student_to_dict(py, student)?)?;
        }
        Ok(list.into())
    }
}

// ============================================================================
// Private Helper Methods
// ============================================================================

impl DrawSession {
    /// Convert a Student to a Python dict
    fn student_to_dict<'py>(
        &self,
        py: Python<'py>,
        student: &Student,
    ) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        dict.set_item("id", &student.id)?;
        dict.set_item("name", &student.name)?;
        dict.set_item("class_id", &student.class_id)?;
        dict.set_item("points", student.points)?;
        Ok(dict)
    }

    /// Convert an Entity to a Python dict
    fn entity_to_dict<'py>(
        &self,
        py: Python<'py>,
        entity: &Entity,
    ) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        dict.set_item("id", &entity.id)?;
        dict.set_item("name", &entity.name)?;
        dict.set_item("x", entity.pos.x)?;
        dict.set_item("y", entity.pos.y)?;
        Ok(dict)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawPhase, DrawStyle};
    use crate::roster::Student;

    fn students(count: usize) -> Vec<Student> {
        (0..count)
            .map(|i| Student {
                id: format!("student-{}", i + 1),
                name: format!("S{}", i + 1),
                class_id: "class-1".to_string(),
                points: 10,
            })
            .collect()
    }

    #[test]
    fn test_session_wraps_engine_state() {
        let engine = DrawEngine::new(DrawStyle::Lottery, students(4), 2, Some(1)).unwrap();
        let mut session = DrawSession::new(engine);

        assert_eq!(session.engine().phase(), DrawPhase::Idle);
        session.engine_mut().start().unwrap();
        assert_eq!(session.engine().phase(), DrawPhase::Spinning);

        session.engine_mut().reset();
        assert_eq!(session.engine().phase(), DrawPhase::Idle);
        assert!(session.engine().winners().is_empty());
    }
}
