//! Neurite (dendrite segment) agent state

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, CategoryId};

/// What a segment is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parent {
    Soma(AgentId),
    Neurite(AgentId),
}

/// Growth/retraction state derived from the two flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthState {
    Growing,
    /// Pulled back by same-type crowding
    RetractingCrowded,
    /// Pulled back after losing the guidance cue
    RetractingLost,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeuriteAgent {
    pub id: AgentId,
    /// Distal tip of the segment
    pub position: DVec3,
    /// Start of the segment (parent tip or soma surface)
    pub proximal: DVec3,
    pub diameter: f64,
    pub subtype: CategoryId,
    pub has_to_retract: bool,
    pub beyond_threshold: bool,
    pub diameter_before_retraction: f64,
    pub owning_soma: AgentId,
    pub parent: Parent,
    pub daughters: Vec<AgentId>,
    pub behavior_active: bool,
}

impl NeuriteAgent {
    pub fn from_seed(id: AgentId, owning_soma: AgentId, parent: Parent, seed: NeuriteSeed) -> Self {
        Self {
            id,
            position: seed.position,
            proximal: seed.proximal,
            diameter: seed.diameter,
            subtype: seed.subtype,
            has_to_retract: seed.has_to_retract,
            beyond_threshold: seed.beyond_threshold,
            diameter_before_retraction: seed.diameter_before_retraction,
            owning_soma,
            parent,
            daughters: Vec::new(),
            behavior_active: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.daughters.is_empty()
    }

    pub fn axis(&self) -> DVec3 {
        self.position - self.proximal
    }

    pub fn length(&self) -> f64 {
        self.axis().length()
    }

    pub fn state(&self) -> GrowthState {
        match (self.has_to_retract, self.beyond_threshold) {
            (false, _) => GrowthState::Growing,
            (true, false) => GrowthState::RetractingCrowded,
            (true, true) => GrowthState::RetractingLost,
        }
    }

    /// Seed for a daughter continuing from this segment's tip
    pub fn daughter_seed(&self, direction: DVec3, length: f64, diameter: f64) -> NeuriteSeed {
        NeuriteSeed {
            proximal: self.position,
            position: self.position + direction.normalize_or_zero() * length,
            diameter,
            subtype: self.subtype,
            has_to_retract: self.has_to_retract,
            beyond_threshold: self.beyond_threshold,
            diameter_before_retraction: self.diameter_before_retraction,
        }
    }
}

/// Initial state of a segment requested during a tick and created at its boundary
#[derive(Debug, Clone, PartialEq)]
pub struct NeuriteSeed {
    pub proximal: DVec3,
    pub position: DVec3,
    pub diameter: f64,
    pub subtype: CategoryId,
    pub has_to_retract: bool,
    pub beyond_threshold: bool,
    pub diameter_before_retraction: f64,
}

impl NeuriteSeed {
    /// A fresh growing root segment
    pub fn root(proximal: DVec3, position: DVec3, diameter: f64, subtype: CategoryId) -> Self {
        Self {
            proximal,
            position,
            diameter,
            subtype,
            has_to_retract: false,
            beyond_threshold: false,
            diameter_before_retraction: diameter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> NeuriteAgent {
        let seed = NeuriteSeed::root(DVec3::ZERO, DVec3::new(0.0, 0.0, 2.0), 1.0, CategoryId(203));
        NeuriteAgent::from_seed(AgentId(2), AgentId(1), Parent::Soma(AgentId(1)), seed)
    }

    #[test]
    fn test_root_starts_growing_and_terminal() {
        let n = segment();
        assert_eq!(n.state(), GrowthState::Growing);
        assert!(n.is_terminal());
        assert!(n.behavior_active);
        assert!((n.length() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_state_from_flags() {
        let mut n = segment();
        n.has_to_retract = true;
        assert_eq!(n.state(), GrowthState::RetractingCrowded);
        n.beyond_threshold = true;
        assert_eq!(n.state(), GrowthState::RetractingLost);
    }

    #[test]
    fn test_daughter_seed_inherits_state() {
        let mut n = segment();
        n.has_to_retract = true;
        n.diameter_before_retraction = 0.8;
        let seed = n.daughter_seed(DVec3::X, 1.5, 0.7);
        assert_eq!(seed.proximal, n.position);
        assert!((seed.position - n.position - DVec3::new(1.5, 0.0, 0.0)).length() < 1e-12);
        assert_eq!(seed.subtype, n.subtype);
        assert!(seed.has_to_retract);
        assert_eq!(seed.diameter_before_retraction, 0.8);
    }
}
