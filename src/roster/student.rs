//! Student data structure

use serde::{Deserialize, Serialize};

/// A student on the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Owning class id; removing the class removes the student
    pub class_id: String,
    /// Point score, conventionally 0-100
    #[serde(default)]
    pub points: i32,
}

/// Partial update for a student; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub class_id: Option<String>,
    pub points: Option<i32>,
}
