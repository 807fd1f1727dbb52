//! Mosaic regularity statistics
//!
//! The regularity index (RI) of a point set is the mean nearest-neighbour
//! distance divided by its standard deviation. Random (Poisson) placement
//! gives an RI around 1.9; real retinal mosaics reach 3 to 8.

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::core::types::{planar, CategoryId};
use crate::entity::SomaAgent;

/// Regularity of one category at one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegularitySample {
    pub category: CategoryId,
    pub index: f64,
    pub population: usize,
}

/// Mean over population standard deviation of nearest-neighbour distances
///
/// Fewer than two points give 0. Perfectly uniform spacing (zero deviation)
/// gives infinity; points that all coincide give 0.
pub fn regularity_index(points: &[DVec2]) -> f64 {
    let n = points.len();
    if n < 2 {
        return 0.0;
    }

    let nearest: Vec<f64> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            points
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, q)| p.distance(*q))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();

    let mean = nearest.iter().sum::<f64>() / n as f64;
    let variance = nearest.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64;
    let std = variance.sqrt();

    if std == 0.0 {
        return if mean > 0.0 { f64::INFINITY } else { 0.0 };
    }
    mean / std
}

/// RI of every committed category present, ordered by category id
pub fn regularity_by_category<'a>(somas: impl IntoIterator<Item = &'a SomaAgent>) -> Vec<RegularitySample> {
    let mut groups: BTreeMap<CategoryId, Vec<DVec2>> = BTreeMap::new();
    for soma in somas {
        if let Some(category) = soma.category {
            groups.entry(category).or_default().push(planar(soma.position));
        }
    }

    groups
        .into_iter()
        .map(|(category, points)| RegularitySample {
            category,
            index: regularity_index(&points),
            population: points.len(),
        })
        .collect()
}

/// Percentage of the initial population that has died
pub fn death_rate(initial: usize, current: usize) -> f64 {
    if initial == 0 {
        return 0.0;
    }
    (1.0 - current as f64 / initial as f64) * 100.0
}

/// Peak population per category, for per-category death rates
///
/// With fate assignment a category starts empty and fills up as somas commit,
/// so its death rate is measured against the largest population it reached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationTracker {
    peak: BTreeMap<CategoryId, usize>,
}

impl PopulationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, samples: &[RegularitySample]) {
        for sample in samples {
            let peak = self.peak.entry(sample.category).or_insert(0);
            *peak = (*peak).max(sample.population);
        }
    }

    pub fn peak(&self, category: CategoryId) -> usize {
        self.peak.get(&category).copied().unwrap_or(0)
    }

    pub fn death_rate(&self, category: CategoryId, current: usize) -> f64 {
        death_rate(self.peak(category), current)
    }

    pub fn categories(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.peak.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AgentId;
    use glam::DVec3;

    #[test]
    fn test_fewer_than_two_points() {
        assert_eq!(regularity_index(&[]), 0.0);
        assert_eq!(regularity_index(&[DVec2::new(3.0, 4.0)]), 0.0);
    }

    #[test]
    fn test_square_lattice_is_infinite() {
        let points: Vec<DVec2> = (0..5)
            .flat_map(|x| (0..5).map(move |y| DVec2::new(x as f64 * 10.0, y as f64 * 10.0)))
            .collect();
        assert_eq!(regularity_index(&points), f64::INFINITY);
    }

    #[test]
    fn test_coincident_points_give_zero() {
        assert_eq!(regularity_index(&[DVec2::ONE, DVec2::ONE, DVec2::ONE]), 0.0);
    }

    #[test]
    fn test_known_configuration() {
        // nearest distances: 1, 1, 3 -> mean 5/3, population std sqrt(8/9)
        let points = [DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0), DVec2::new(4.0, 0.0)];
        let expected = (5.0 / 3.0) / (8.0f64 / 9.0).sqrt();
        assert!((regularity_index(&points) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_groups_only_committed_somas() {
        let somas = vec![
            SomaAgent::new(AgentId(1), DVec3::new(0.0, 0.0, 5.0), 7.0, Some(CategoryId(203))),
            SomaAgent::new(AgentId(2), DVec3::new(1.0, 0.0, 9.0), 7.0, Some(CategoryId(203))),
            SomaAgent::new(AgentId(3), DVec3::new(4.0, 0.0, 1.0), 7.0, Some(CategoryId(203))),
            SomaAgent::new(AgentId(4), DVec3::new(9.0, 9.0, 0.0), 7.0, Some(CategoryId(100))),
            SomaAgent::new(AgentId(5), DVec3::new(2.0, 2.0, 0.0), 7.0, None),
        ];
        let samples = regularity_by_category(&somas);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].category, CategoryId(100));
        assert_eq!(samples[0].population, 1);
        assert_eq!(samples[0].index, 0.0);
        assert_eq!(samples[1].category, CategoryId(203));
        assert_eq!(samples[1].population, 3);
        // depth is ignored
        let expected = (5.0 / 3.0) / (8.0f64 / 9.0).sqrt();
        assert!((samples[1].index - expected).abs() < 1e-12);
    }

    #[test]
    fn test_death_rate() {
        assert!((death_rate(100, 35) - 65.0).abs() < 1e-9);
        assert_eq!(death_rate(100, 100), 0.0);
        assert_eq!(death_rate(0, 0), 0.0);
    }

    #[test]
    fn test_tracker_keeps_peak() {
        let mut tracker = PopulationTracker::new();
        let sample = |population| RegularitySample {
            category: CategoryId(202),
            index: 0.0,
            population,
        };
        tracker.observe(&[sample(40)]);
        tracker.observe(&[sample(80)]);
        tracker.observe(&[sample(60)]);
        assert_eq!(tracker.peak(CategoryId(202)), 80);
        assert_eq!(tracker.death_rate(CategoryId(202), 60), 25.0);
        assert_eq!(tracker.peak(CategoryId(1)), 0);
    }
}
