//! Sparse hash grid for efficient spatial queries

use ahash::AHashMap;
use glam::DVec3;

use crate::core::types::AgentId;

/// Sparse hash grid over 3-D cells for radius queries
pub struct SparseHashGrid {
    cell_size: f64,
    cells: AHashMap<(i32, i32, i32), Vec<(AgentId, DVec3)>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_coord(&self, pos: DVec3) -> (i32, i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, agent: AgentId, pos: DVec3) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push((agent, pos));
    }

    /// All entries in the cells overlapping the cube of half-width `radius`
    fn query_cells(&self, center: DVec3, radius: f64) -> impl Iterator<Item = (AgentId, DVec3)> + '_ {
        let reach = (radius / self.cell_size).ceil() as i32;
        let (cx, cy, cz) = self.cell_coord(center);

        (-reach..=reach).flat_map(move |dx| {
            (-reach..=reach).flat_map(move |dy| {
                (-reach..=reach).flat_map(move |dz| {
                    self.cells
                        .get(&(cx + dx, cy + dy, cz + dz))
                        .into_iter()
                        .flatten()
                        .copied()
                })
            })
        })
    }

    /// Query agents within radius (inclusive)
    pub fn query_radius(&self, center: DVec3, radius: f64) -> impl Iterator<Item = AgentId> + '_ {
        let radius_sq = radius * radius;
        self.query_cells(center, radius)
            .filter(move |(_, pos)| center.distance_squared(*pos) <= radius_sq)
            .map(|(agent, _)| agent)
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, agents: impl Iterator<Item = (AgentId, DVec3)>) {
        self.clear();
        for (agent, pos) in agents {
            self.insert(agent, pos);
        }
    }
}
