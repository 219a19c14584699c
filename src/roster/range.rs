//! Point range (prize tier) configuration

use serde::{Deserialize, Serialize};

use crate::error::{DrawCoreError, Result};

/// A score-based prize tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRange {
    pub id: String,
    pub label: String,
    /// Inclusive lower bound
    pub min: i32,
    /// Inclusive upper bound
    pub max: i32,
    /// Required winner count for a draw in this tier
    #[serde(default = "default_winners_count")]
    pub winners_count: usize,
}

fn default_winners_count() -> usize {
    2
}

impl PointRange {
    /// Whether a point score falls inside this tier (both bounds inclusive)
    #[inline]
    pub fn contains(&self, points: i32) -> bool {
        points >= self.min && points <= self.max
    }

    /// Validate the edit-time invariant: min >= 0, max > min, winners >= 1.
    ///
    /// Overlaps with other tiers and gaps between tiers are legal.
    pub fn validate(&self) -> Result<()> {
        if self.min < 0 {
            return Err(DrawCoreError::InvalidRange(format!(
                "min must be >= 0, got {}",
                self.min
            )));
        }
        if self.max <= self.min {
            return Err(DrawCoreError::InvalidRange(format!(
                "max must be greater than min, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.winners_count < 1 {
            return Err(DrawCoreError::InvalidRange(
                "winners_count must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default tiers shipped with a fresh store
pub fn default_ranges() -> Vec<PointRange> {
    vec![
        PointRange {
            id: "range-1".to_string(),
            label: "Bronze".to_string(),
            min: 0,
            max: 15,
            winners_count: 2,
        },
        PointRange {
            id: "range-2".to_string(),
            label: "Silver".to_string(),
            min: 16,
            max: 30,
            winners_count: 2,
        },
        PointRange {
            id: "range-3".to_string(),
            label: "Gold".to_string(),
            min: 31,
            max: 50,
            winners_count: 2,
        },
    ]
}
