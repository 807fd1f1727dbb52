//! Snapshot-consistent neighbor enumeration

use ahash::AHashMap;
use glam::DVec3;

use crate::core::types::AgentId;
use crate::entity::Agent;
use crate::spatial::sparse_hash::SparseHashGrid;

/// Neighbor enumeration against the state at the start of the tick
pub trait NeighborQuery: Sync {
    /// Visit every agent other than `origin` within `radius` of `center`
    fn for_each_within_radius(
        &self,
        origin: AgentId,
        center: DVec3,
        radius: f64,
        visitor: &mut dyn FnMut(&Agent),
    );
}

/// Neighbor index over a frozen slice of agents
pub struct NeighborSnapshot<'a> {
    agents: &'a [Agent],
    index: AHashMap<AgentId, usize>,
    grid: SparseHashGrid,
}

impl<'a> NeighborSnapshot<'a> {
    pub fn build(agents: &'a [Agent], cell_size: f64) -> Self {
        let mut grid = SparseHashGrid::new(cell_size);
        grid.rebuild(agents.iter().map(|a| (a.id(), a.position())));
        let index = agents
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id(), i))
            .collect();
        Self { agents, index, grid }
    }

    pub fn get(&self, id: AgentId) -> Option<&'a Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }
}

impl NeighborQuery for NeighborSnapshot<'_> {
    fn for_each_within_radius(
        &self,
        origin: AgentId,
        center: DVec3,
        radius: f64,
        visitor: &mut dyn FnMut(&Agent),
    ) {
        for id in self.grid.query_radius(center, radius) {
            if id == origin {
                continue;
            }
            if let Some(agent) = self.get(id) {
                visitor(agent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::SomaAgent;

    #[test]
    fn test_excludes_origin() {
        let agents = vec![
            Agent::Soma(SomaAgent::new(AgentId(1), DVec3::ZERO, 7.0, None)),
            Agent::Soma(SomaAgent::new(AgentId(2), DVec3::new(1.0, 0.0, 0.0), 7.0, None)),
            Agent::Soma(SomaAgent::new(AgentId(3), DVec3::new(9.0, 0.0, 0.0), 7.0, None)),
        ];
        let snapshot = NeighborSnapshot::build(&agents, 4.0);
        let mut seen = Vec::new();
        snapshot.for_each_within_radius(AgentId(1), DVec3::ZERO, 2.0, &mut |a| seen.push(a.id()));
        assert_eq!(seen, vec![AgentId(2)]);
    }
}
