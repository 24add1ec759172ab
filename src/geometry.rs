//! Conversion of a road from Cartesian points to its curvature representation:
//! an initial heading plus curvature and arclength values of the road pieces.
//!
//! See Castellano, Cetinkaya, Arcaini, "Analysis of road representations in
//! search-based testing of autonomous driving systems", IEEE QRS 2021.

use geo_types::{Coord, Line};
use std::f64::consts::PI;

use crate::error::{DetourError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct CurvatureProfile {
    /// Heading of the first segment, in radians.
    pub initial_heading: f64,
    /// One value per inner joint, `points - 2` values.
    pub kappas: Vec<f64>,
    /// One value per segment, `points - 1` values.
    pub arclengths: Vec<f64>,
}

/// Wraps an angle difference into `[-pi, pi)`.
pub fn angle_adjust(theta_diff: f64) -> f64 {
    let diff = theta_diff.rem_euclid(2.0 * PI);
    if diff >= PI { diff - 2.0 * PI } else { diff }
}

pub fn xy_to_curvature(points: &[Coord<f64>]) -> Result<CurvatureProfile> {
    if points.len() < 3 {
        return Err(DetourError::geometry(format!(
            "at least 3 points are needed to compute a curvature, got {}",
            points.len()
        )));
    }
    if let Some(i) = points.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(DetourError::geometry(format!(
            "point {i} has a non-finite coordinate"
        )));
    }

    let segments: Vec<Line<f64>> = points.windows(2).map(|w| Line::new(w[0], w[1])).collect();

    let arclengths: Vec<f64> = segments.iter().map(|s| s.dx().hypot(s.dy())).collect();
    // kappa i divides by the length of segment i + 1, the first segment only
    // contributes its heading
    if let Some(i) = arclengths.iter().skip(1).position(|&a| a == 0.0) {
        return Err(DetourError::geometry(format!(
            "segment {} has zero length (repeated point)",
            i + 1
        )));
    }

    let thetas: Vec<f64> = segments.iter().map(|s| s.dy().atan2(s.dx())).collect();

    let kappas = thetas
        .windows(2)
        .zip(arclengths.iter().skip(1))
        .map(|(t, a)| angle_adjust(t[1] - t[0]) / a)
        .collect();

    Ok(CurvatureProfile {
        initial_heading: thetas[0],
        kappas,
        arclengths,
    })
}
