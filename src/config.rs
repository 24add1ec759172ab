use serde::Deserialize;

use crate::error::{DetourError, Result};

pub const DEFAULT_M_CLOSEST_NEIGHBOR_COUNT: usize = 4;
pub const DEFAULT_W_SELECTION_THRESHOLD: usize = 4;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DetourConfig {
    /// Target section count when reducing road curvature features.
    pub road_section_count: usize,
    pub random_seed: u64,
    pub prioritization_ratio: f64,
    pub selection_min_ratio: f64,
    pub selection_max_ratio: f64,
    // Early stop once the last `w` selections each have `m` passing nearest oracles
    pub m_closest_neighbor_count: usize,
    pub w_selection_threshold: usize,
}

impl Default for DetourConfig {
    fn default() -> Self {
        Self {
            road_section_count: 6,
            random_seed: 0,
            prioritization_ratio: 1.0,
            selection_min_ratio: 0.05,
            selection_max_ratio: 0.4,
            m_closest_neighbor_count: DEFAULT_M_CLOSEST_NEIGHBOR_COUNT,
            w_selection_threshold: DEFAULT_W_SELECTION_THRESHOLD,
        }
    }
}

impl DetourConfig {
    pub fn validate(&self) -> Result<()> {
        if self.road_section_count == 0 {
            return Err(DetourError::Configuration(
                "road_section_count must be at least 1".to_string(),
            ));
        }
        check_ratio("prioritization_ratio", self.prioritization_ratio)?;
        check_ratio_bounds(self.selection_min_ratio, self.selection_max_ratio)
    }
}

pub fn check_ratio(name: &str, ratio: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(DetourError::Configuration(format!(
            "{name} must lie in [0, 1], got {ratio}"
        )));
    }
    Ok(())
}

pub fn check_ratio_bounds(min_ratio: f64, max_ratio: f64) -> Result<()> {
    check_ratio("min ratio", min_ratio)?;
    check_ratio("max ratio", max_ratio)?;
    if min_ratio > max_ratio {
        return Err(DetourError::Configuration(format!(
            "min ratio {min_ratio} is greater than max ratio {max_ratio}"
        )));
    }
    Ok(())
}
