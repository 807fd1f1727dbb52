//! Agents of the mosaic simulation
//!
//! Agents are a tagged variant resolved once at dispatch, rather than probed
//! for their kind inside every behavior.

pub mod neurite;
pub mod soma;

use glam::DVec3;

use crate::core::types::AgentId;

pub use neurite::{GrowthState, NeuriteAgent, NeuriteSeed, Parent};
pub use soma::SomaAgent;

#[derive(Debug, Clone)]
pub enum Agent {
    Soma(SomaAgent),
    Neurite(NeuriteAgent),
}

impl Agent {
    pub fn id(&self) -> AgentId {
        match self {
            Agent::Soma(s) => s.id,
            Agent::Neurite(n) => n.id,
        }
    }

    pub fn position(&self) -> DVec3 {
        match self {
            Agent::Soma(s) => s.position,
            Agent::Neurite(n) => n.position,
        }
    }

    pub fn as_soma(&self) -> Option<&SomaAgent> {
        match self {
            Agent::Soma(s) => Some(s),
            Agent::Neurite(_) => None,
        }
    }

    pub fn as_neurite(&self) -> Option<&NeuriteAgent> {
        match self {
            Agent::Neurite(n) => Some(n),
            Agent::Soma(_) => None,
        }
    }

    /// Soma this agent belongs to (itself for a soma)
    pub fn owning_soma(&self) -> AgentId {
        match self {
            Agent::Soma(s) => s.id,
            Agent::Neurite(n) => n.owning_soma,
        }
    }
}
