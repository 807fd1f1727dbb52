//! Shared fixtures for behavior unit tests

use ahash::AHashMap;
use glam::DVec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, FieldId};
use crate::entity::Agent;
use crate::simulation::categories::CategoryTable;
use crate::simulation::context::BehaviorContext;
use crate::spatial::field::{FieldRegistry, SpatialField};
use crate::spatial::neighbors::NeighborQuery;

/// Default configuration with its field registry and category table
pub struct Fixture {
    pub config: SimulationConfig,
    pub fields: FieldRegistry,
    pub table: CategoryTable,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    pub fn with_config(config: SimulationConfig) -> Self {
        let fields = FieldRegistry::from_config(&config.fields, &config.domain).expect("fields");
        let table = CategoryTable::build(&config.categories, &config.neurite, &fields).expect("table");
        Self { config, fields, table }
    }
}

/// Spatially constant field values, optionally per field
#[derive(Default)]
pub struct StubField {
    default: (f64, DVec3),
    values: AHashMap<FieldId, (f64, DVec3)>,
}

impl StubField {
    pub fn uniform(concentration: f64, gradient: DVec3) -> Self {
        Self {
            default: (concentration, gradient),
            values: AHashMap::new(),
        }
    }

    pub fn with(mut self, field: FieldId, concentration: f64, gradient: DVec3) -> Self {
        self.values.insert(field, (concentration, gradient));
        self
    }

    fn lookup(&self, field: FieldId) -> (f64, DVec3) {
        self.values.get(&field).copied().unwrap_or(self.default)
    }
}

impl SpatialField for StubField {
    fn concentration(&self, field: FieldId, _position: DVec3) -> f64 {
        self.lookup(field).0
    }

    fn gradient(&self, field: FieldId, _position: DVec3) -> DVec3 {
        self.lookup(field).1
    }
}

/// Brute-force neighbor list
pub struct AgentList(pub Vec<Agent>);

impl NeighborQuery for AgentList {
    fn for_each_within_radius(
        &self,
        origin: AgentId,
        center: DVec3,
        radius: f64,
        visitor: &mut dyn FnMut(&Agent),
    ) {
        for agent in &self.0 {
            if agent.id() != origin && agent.position().distance(center) <= radius {
                visitor(agent);
            }
        }
    }
}

static NO_NEIGHBORS: AgentList = AgentList(Vec::new());

pub fn context<'a>(
    fixture: &'a Fixture,
    fields: &'a dyn SpatialField,
    seed: u64,
) -> BehaviorContext<'a, ChaCha8Rng> {
    context_with_neighbors(fixture, fields, &NO_NEIGHBORS, seed)
}

pub fn context_with_neighbors<'a>(
    fixture: &'a Fixture,
    fields: &'a dyn SpatialField,
    neighbors: &'a dyn NeighborQuery,
    seed: u64,
) -> BehaviorContext<'a, ChaCha8Rng> {
    BehaviorContext::new(
        0,
        fields,
        neighbors,
        &fixture.table,
        ChaCha8Rng::seed_from_u64(seed),
    )
}
