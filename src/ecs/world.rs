//! World - the agent arena plus everything a tick reads
//!
//! Agents live in one flat vector in creation order, which is also the order
//! in which their mutation requests are applied. An id index gives O(1)
//! lookup for parent/daughter links and command targets.

use ahash::{AHashMap, AHashSet};
use glam::DVec3;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, CategoryId, Tick};
use crate::entity::{Agent, NeuriteAgent, NeuriteSeed, Parent, SomaAgent};
use crate::simulation::categories::CategoryTable;
use crate::simulation::fate::FateAssigner;
use crate::simulation::neurite::NeuriteBehavior;
use crate::simulation::soma::SomaBehavior;
use crate::spatial::field::FieldRegistry;

/// The simulated tissue
pub struct World {
    pub current_tick: Tick,
    seed: u64,
    agents: Vec<Agent>,
    index: AHashMap<AgentId, usize>,
    next_id: u64,
    initial_population: usize,
    pub fields: FieldRegistry,
    pub categories: CategoryTable,
    pub soma_behavior: SomaBehavior,
    pub neurite_behavior: NeuriteBehavior,
    /// Agent count from which behaviors are evaluated in parallel
    pub parallel_threshold: usize,
    /// Cell size of the per-tick neighbor index
    pub neighbor_cell_size: f64,
}

impl World {
    /// Empty world with fields, category table and behaviors built from `config`
    pub fn new(config: &SimulationConfig, seed: u64) -> Result<Self> {
        let fields = FieldRegistry::from_config(&config.fields, &config.domain)?;
        let categories = CategoryTable::build(&config.categories, &config.neurite, &fields)?;
        let fate = if config.population.cell_fate {
            Some(FateAssigner::new(categories.fate_candidates().to_vec(), &config.fate)?)
        } else {
            None
        };

        Ok(Self {
            current_tick: 0,
            seed,
            agents: Vec::new(),
            index: AHashMap::new(),
            next_id: 1,
            initial_population: 0,
            fields,
            categories,
            soma_behavior: SomaBehavior::new(config.soma.clone(), fate),
            neurite_behavior: NeuriteBehavior::new(config.neurite.clone()),
            parallel_threshold: config.parallel_threshold,
            neighbor_cell_size: config.neurite.crowding_radius,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn allocate_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, agent: Agent) {
        self.index.insert(agent.id(), self.agents.len());
        self.agents.push(agent);
    }

    pub fn spawn_soma(&mut self, position: DVec3, diameter: f64, category: Option<CategoryId>) -> AgentId {
        let id = self.allocate_id();
        self.push(Agent::Soma(SomaAgent::new(id, position, diameter, category)));
        id
    }

    /// Create a segment and link it under `parent`. Returns `None` if the parent is gone.
    pub fn attach_neurite(&mut self, parent: Parent, seed: NeuriteSeed) -> Option<AgentId> {
        let owner = match parent {
            Parent::Soma(id) => self.get(id)?.as_soma()?.id,
            Parent::Neurite(id) => self.get(id)?.as_neurite()?.owning_soma,
        };

        let id = self.allocate_id();
        match parent {
            Parent::Soma(p) => {
                if let Some(Agent::Soma(s)) = self.get_mut(p) {
                    s.neurites.push(id);
                }
            }
            Parent::Neurite(p) => {
                if let Some(Agent::Neurite(n)) = self.get_mut(p) {
                    n.daughters.push(id);
                }
            }
        }
        self.push(Agent::Neurite(NeuriteAgent::from_seed(id, owner, parent, seed)));
        Some(id)
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        match self.index.get(&id) {
            Some(&i) => self.agents.get_mut(i),
            None => None,
        }
    }

    pub fn soma(&self, id: AgentId) -> Option<&SomaAgent> {
        self.get(id).and_then(Agent::as_soma)
    }

    pub fn neurite(&self, id: AgentId) -> Option<&NeuriteAgent> {
        self.get(id).and_then(Agent::as_neurite)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Write access for the tick's state swap; ids and links must be preserved
    pub(crate) fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn somas(&self) -> impl Iterator<Item = &SomaAgent> {
        self.agents.iter().filter_map(Agent::as_soma)
    }

    pub fn neurites(&self) -> impl Iterator<Item = &NeuriteAgent> {
        self.agents.iter().filter_map(Agent::as_neurite)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn soma_count(&self) -> usize {
        self.somas().count()
    }

    pub fn neurite_count(&self) -> usize {
        self.neurites().count()
    }

    pub fn initial_population(&self) -> usize {
        self.initial_population
    }

    pub fn set_initial_population(&mut self, count: usize) {
        self.initial_population = count;
    }

    /// Remove somas together with every segment they own.
    /// Returns `(somas, neurites)` removed.
    pub fn remove_trees(&mut self, somas: &AHashSet<AgentId>) -> (usize, usize) {
        let before_somas = self.soma_count();
        let before = self.agents.len();
        self.agents.retain(|a| !somas.contains(&a.owning_soma()));
        self.index = self
            .agents
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id(), i))
            .collect();

        let removed_somas = before_somas - self.soma_count();
        (removed_somas, before - self.agents.len() - removed_somas)
    }

    pub fn tick(&mut self) {
        self.current_tick += 1;
    }
}
