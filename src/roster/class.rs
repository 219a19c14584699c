//! Class data structure

use serde::{Deserialize, Serialize};

/// Grades a class may belong to
pub const VALID_GRADES: [i32; 3] = [4, 5, 6];

/// A school class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub grade: i32,
    pub class_number: i32,
    /// Derived display name, e.g. "Grade 4 Class 1"
    pub name: String,
}

impl Class {
    pub fn new(id: String, grade: i32, class_number: i32) -> Self {
        let name = display_name(grade, class_number);
        Self {
            id,
            grade,
            class_number,
            name,
        }
    }
}

/// Build the display name for a grade/number pair
#[inline]
pub fn display_name(grade: i32, class_number: i32) -> String {
    format!("Grade {} Class {}", grade, class_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        let class = Class::new("class-1".to_string(), 4, 2);
        assert_eq!(class.name, "Grade 4 Class 2");
    }
}
