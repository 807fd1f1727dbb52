//! Explicit per-call simulation context
//!
//! Every behavior call receives a `BehaviorContext` carrying read access to
//! the tick snapshot (fields, neighbors, category table), a random stream,
//! and a queue of mutation requests. Requests are applied by the driver at
//! the tick boundary, never inline.

use glam::DVec3;
use rand::Rng;

use crate::core::types::{AgentId, FieldId, Tick};
use crate::entity::NeuriteSeed;
use crate::simulation::categories::CategoryTable;
use crate::spatial::field::SpatialField;
use crate::spatial::neighbors::NeighborQuery;

/// Mutation requested by a behavior
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Secrete {
        field: FieldId,
        position: DVec3,
        amount: f64,
    },
    /// Remove a soma together with its dendritic tree
    Remove(AgentId),
    /// Attach a new root segment to a soma
    SpawnNeurite { soma: AgentId, seed: NeuriteSeed },
    /// Attach daughters to a segment tip (one for continuation, two for bifurcation)
    Branch {
        parent: AgentId,
        daughters: Vec<NeuriteSeed>,
    },
    /// Stop running the agent's behavior from the next tick on
    Deactivate(AgentId),
}

pub struct BehaviorContext<'a, R: Rng> {
    pub tick: Tick,
    pub fields: &'a dyn SpatialField,
    pub neighbors: &'a dyn NeighborQuery,
    pub categories: &'a CategoryTable,
    pub rng: R,
    commands: Vec<Command>,
}

impl<'a, R: Rng> BehaviorContext<'a, R> {
    pub fn new(
        tick: Tick,
        fields: &'a dyn SpatialField,
        neighbors: &'a dyn NeighborQuery,
        categories: &'a CategoryTable,
        rng: R,
    ) -> Self {
        Self {
            tick,
            fields,
            neighbors,
            categories,
            rng,
            commands: Vec::new(),
        }
    }

    /// Uniform draw in `[low, high)`
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.uniform(0.0, 1.0) < p
    }

    /// Isotropic random direction
    pub fn random_unit_vector(&mut self) -> DVec3 {
        loop {
            let v = DVec3::new(
                self.uniform(-1.0, 1.0),
                self.uniform(-1.0, 1.0),
                self.uniform(-1.0, 1.0),
            );
            let len_sq = v.length_squared();
            if len_sq > 1e-12 && len_sq <= 1.0 {
                return v / len_sq.sqrt();
            }
        }
    }

    pub fn concentration(&self, field: FieldId, position: DVec3) -> f64 {
        self.fields.concentration(field, position)
    }

    pub fn gradient(&self, field: FieldId, position: DVec3) -> DVec3 {
        self.fields.gradient(field, position)
    }

    pub fn request(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}
