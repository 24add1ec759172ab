use geo_types::Coord;
use itertools::Itertools;
use tracing::debug;

use crate::error::{DetourError, Result};
use crate::geometry::xy_to_curvature;

pub trait RoadFeatureExtractor {
    /// Turns the Cartesian points of a road into a list of numeric features.
    fn extract_features(&self, points: &[Coord<f64>]) -> Result<Vec<f64>>;
}

/// Features are the initial heading followed by the curvature and arclength
/// values of the road approximated with `road_section_count` sections.
#[derive(Debug, Clone, Copy)]
pub struct CurvatureFeatureExtractor {
    road_section_count: usize,
}

impl CurvatureFeatureExtractor {
    pub fn new(road_section_count: usize) -> Result<Self> {
        if road_section_count == 0 {
            return Err(DetourError::Configuration(
                "road section count must be at least 1".to_string(),
            ));
        }
        Ok(Self { road_section_count })
    }

    pub fn road_section_count(&self) -> usize {
        self.road_section_count
    }

    /// Length of every feature vector this extractor produces.
    pub fn feature_len(&self) -> usize {
        2 * self.road_section_count + 1
    }
}

impl RoadFeatureExtractor for CurvatureFeatureExtractor {
    fn extract_features(&self, points: &[Coord<f64>]) -> Result<Vec<f64>> {
        let profile = xy_to_curvature(points)?;
        let section_count = profile.kappas.len();
        if section_count < self.road_section_count {
            return Err(DetourError::Configuration(format!(
                "road has {} sections, fewer than the road section count {}",
                section_count, self.road_section_count
            )));
        }

        let (kappas, arclengths) =
            reduce(&profile.kappas, &profile.arclengths, self.road_section_count);

        let mut features = Vec::with_capacity(self.feature_len());
        features.push(profile.initial_heading);
        features.extend(kappas);
        features.extend(arclengths);
        Ok(features)
    }
}

#[derive(Debug, Clone)]
struct Section {
    kappa: f64,
    arclength: f64,
    /// Original (kappa, arclength) pieces merged into this section.
    pieces: Vec<(f64, f64)>,
}

impl Section {
    fn error_against(&self, kappa: f64) -> f64 {
        self.pieces.iter().map(|&(k, a)| (kappa - k).abs() * a).sum()
    }
}

/// Approximates a road with at most `n` sections.
///
/// Each iteration merges the two adjacent sections whose merge changes the
/// curvature of the road the least. The merged section takes the
/// arclength-weighted average curvature and the summed arclength. Ties go to
/// the lowest index.
///
/// `kappas[i]` is paired with `arclengths[i]`. Trailing arclengths without a
/// curvature value are ignored.
pub fn reduce(kappas: &[f64], arclengths: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut sections: Vec<Section> = kappas
        .iter()
        .zip(arclengths.iter())
        .map(|(&kappa, &arclength)| Section {
            kappa,
            arclength,
            pieces: vec![(kappa, arclength)],
        })
        .collect();

    let target = n.max(1);
    while sections.len() > target {
        let candidates: Vec<(f64, f64, f64)> = sections
            .iter()
            .tuple_windows()
            .map(|(left, right)| {
                let arclength = left.arclength + right.arclength;
                let kappa =
                    (left.kappa * left.arclength + right.kappa * right.arclength) / arclength;
                let error = left.error_against(kappa) + right.error_against(kappa);
                (kappa, arclength, error)
            })
            .collect();

        let Some(merge_index) = candidates
            .iter()
            .position_min_by(|a, b| a.2.total_cmp(&b.2))
        else {
            break;
        };
        let (kappa, arclength, error) = candidates[merge_index];
        debug!(merge_index, error, "merging road sections");

        let right = sections.remove(merge_index + 1);
        let left = &mut sections[merge_index];
        left.kappa = kappa;
        left.arclength = arclength;
        left.pieces.extend(right.pieces);
    }

    sections.into_iter().map(|s| (s.kappa, s.arclength)).unzip()
}
