//! Soma (cell body) agent state

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{
    diameter_from_volume, planar, volume_from_diameter, AgentId, CategoryId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SomaAgent {
    pub id: AgentId,
    pub position: DVec3,
    /// Position at the last migration step, for distance accounting
    pub previous_position: DVec3,
    pub diameter: f64,
    /// `None` until fate assignment commits the soma
    pub category: Option<CategoryId>,
    pub internal_clock: u64,
    pub distance_travelled: f64,
    /// Dendrites have been spawned
    pub matured: bool,
    /// Root segments of the dendritic tree
    pub neurites: Vec<AgentId>,
}

impl SomaAgent {
    pub fn new(id: AgentId, position: DVec3, diameter: f64, category: Option<CategoryId>) -> Self {
        Self {
            id,
            position,
            previous_position: position,
            diameter,
            category,
            internal_clock: 0,
            distance_travelled: 0.0,
            matured: false,
            neurites: Vec::new(),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.category.is_some()
    }

    /// Commit the soma to a category. Returns false if it was already committed.
    pub fn commit(&mut self, category: CategoryId) -> bool {
        if self.category.is_some() {
            return false;
        }
        self.category = Some(category);
        true
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn volume(&self) -> f64 {
        volume_from_diameter(self.diameter)
    }

    /// Grow the cell body by `delta` µm³
    pub fn change_volume(&mut self, delta: f64) {
        self.diameter = diameter_from_volume(self.volume() + delta);
    }

    pub fn update_position(&mut self, delta: DVec3) {
        self.position += delta;
    }

    /// Add the planar distance since the last snapshot and take a new one
    pub fn record_travel(&mut self) {
        let step = planar(self.position).distance(planar(self.previous_position));
        self.distance_travelled += step;
        self.previous_position = self.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soma() -> SomaAgent {
        SomaAgent::new(AgentId(1), DVec3::new(10.0, 10.0, 25.0), 7.5, None)
    }

    #[test]
    fn test_commit_only_once() {
        let mut s = soma();
        assert!(s.commit(CategoryId(200)));
        assert!(!s.commit(CategoryId(201)));
        assert_eq!(s.category, Some(CategoryId(200)));
    }

    #[test]
    fn test_change_volume_grows_diameter() {
        let mut s = soma();
        let before = s.diameter;
        s.change_volume(3000.0);
        assert!(s.diameter > before);
        assert!((s.volume() - (volume_from_diameter(before) + 3000.0)).abs() < 1e-6);
    }

    #[test]
    fn test_record_travel_is_planar() {
        let mut s = soma();
        s.update_position(DVec3::new(3.0, 4.0, 12.0));
        s.record_travel();
        assert!((s.distance_travelled - 5.0).abs() < 1e-12);
        assert_eq!(s.previous_position, s.position);
    }
}
