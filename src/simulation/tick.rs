//! Tick system - advances the world by one synchronous step
//!
//! Each tick:
//! snapshot -> behaviors (read old, write own copy + requests) -> apply requests
//! -> remove dead trees -> settle fields
//!
//! Behaviors only ever see the state at the start of the tick, so the result
//! does not depend on evaluation order. Uses rayon for large populations; each
//! agent draws from its own ChaCha stream, so the parallel and sequential paths
//! produce identical worlds.

use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::core::error::Result;
use crate::core::types::{AgentId, Tick};
use crate::ecs::world::World;
use crate::entity::{Agent, Parent};
use crate::simulation::context::{BehaviorContext, Command};
use crate::spatial::neighbors::NeighborSnapshot;

/// Diffusion time step per tick
const FIELD_DT: f64 = 1.0;

/// Per-tick counts, for logging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Tick,
    pub evaluated: usize,
    pub secretions: usize,
    pub neurites_created: usize,
    pub deactivated: usize,
    pub somas_removed: usize,
    pub neurites_removed: usize,
}

/// Next state of one agent plus its requests
struct Outcome {
    index: usize,
    next: Agent,
    commands: Vec<Command>,
}

/// Random stream of one agent at one tick
fn agent_rng(seed: u64, tick: Tick, agent: AgentId) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ tick.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    rng.set_stream(agent.0);
    rng
}

/// Run one simulation tick
pub fn run_simulation_tick(world: &mut World) -> Result<TickReport> {
    let tick = world.current_tick;
    let outcomes = evaluate_behaviors(world)?;

    let mut report = TickReport {
        tick,
        evaluated: outcomes.len(),
        ..TickReport::default()
    };

    let mut commands = Vec::new();
    {
        let agents = world.agents_mut();
        for outcome in outcomes {
            agents[outcome.index] = outcome.next;
            commands.extend(outcome.commands);
        }
    }

    apply_commands(world, commands, &mut report);

    world.fields.step(FIELD_DT);
    world.tick();

    tracing::debug!(
        "Tick {}: {} evaluated, {} somas removed, {} neurites created",
        report.tick,
        report.evaluated,
        report.somas_removed,
        report.neurites_created
    );
    Ok(report)
}

/// Evaluate every active agent against the start-of-tick snapshot (PARALLEL when beneficial)
fn evaluate_behaviors(world: &World) -> Result<Vec<Outcome>> {
    let tick = world.current_tick;
    let seed = world.seed();
    let agents = world.agents();
    let snapshot = NeighborSnapshot::build(agents, world.neighbor_cell_size);

    let evaluate = |(index, agent): (usize, &Agent)| -> Result<Option<Outcome>> {
        if let Agent::Neurite(n) = agent {
            if !n.behavior_active {
                return Ok(None);
            }
        }

        let rng = agent_rng(seed, tick, agent.id());
        let mut ctx = BehaviorContext::new(tick, &world.fields, &snapshot, &world.categories, rng);
        let mut next = agent.clone();
        match &mut next {
            Agent::Soma(soma) => world.soma_behavior.run(soma, &mut ctx)?,
            Agent::Neurite(neurite) => world.neurite_behavior.run(neurite, &mut ctx)?,
        }
        Ok(Some(Outcome {
            index,
            next,
            commands: ctx.into_commands(),
        }))
    };

    let outcomes: Vec<Option<Outcome>> = if agents.len() >= world.parallel_threshold {
        agents.par_iter().enumerate().map(evaluate).collect::<Result<_>>()?
    } else {
        agents.iter().enumerate().map(evaluate).collect::<Result<_>>()?
    };
    Ok(outcomes.into_iter().flatten().collect())
}

/// Apply requests in agent order; removals go last so that every other
/// request of the tick still finds its target.
fn apply_commands(world: &mut World, commands: Vec<Command>, report: &mut TickReport) {
    let mut removals: AHashSet<AgentId> = AHashSet::new();

    for command in commands {
        match command {
            Command::Secrete {
                field,
                position,
                amount,
            } => {
                world.fields.increase_concentration_by(field, position, amount);
                report.secretions += 1;
            }
            Command::Remove(id) => {
                removals.insert(id);
            }
            Command::SpawnNeurite { soma, seed } => {
                if world.attach_neurite(Parent::Soma(soma), seed).is_some() {
                    report.neurites_created += 1;
                }
            }
            Command::Branch { parent, daughters } => {
                for daughter in daughters {
                    if world.attach_neurite(Parent::Neurite(parent), daughter).is_some() {
                        report.neurites_created += 1;
                    }
                }
            }
            Command::Deactivate(id) => {
                if let Some(Agent::Neurite(n)) = world.get_mut(id) {
                    n.behavior_active = false;
                    report.deactivated += 1;
                }
            }
        }
    }

    if !removals.is_empty() {
        let (somas, neurites) = world.remove_trees(&removals);
        report.somas_removed = somas;
        report.neurites_removed = neurites;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::CategoryId;
    use crate::entity::NeuriteSeed;
    use crate::simulation::population::populate;
    use glam::DVec3;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.domain.max_bound = 150.0;
        config
    }

    fn snapshot_of(world: &World) -> Vec<(AgentId, DVec3, Option<CategoryId>, u64)> {
        world
            .somas()
            .map(|s| (s.id, s.position, s.category, s.internal_clock))
            .collect()
    }

    #[test]
    fn test_tick_advances_clock_and_secretes() {
        let config = small_config();
        let mut world = World::new(&config, 3).expect("world");
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        populate(&mut world, &config, &mut rng);

        let report = run_simulation_tick(&mut world).expect("tick");
        assert_eq!(report.tick, 0);
        assert_eq!(world.current_tick, 1);
        // clock 0 is a secretion tick for every committed soma
        assert_eq!(report.secretions, world.soma_count());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut config = small_config();
        config.population.cell_fate = true;
        config.population.cell_density = 4000.0;

        let run = |threshold: usize| {
            let mut world = World::new(&config, 11).expect("world");
            world.parallel_threshold = threshold;
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            populate(&mut world, &config, &mut rng);
            for _ in 0..30 {
                run_simulation_tick(&mut world).expect("tick");
            }
            snapshot_of(&world)
        };

        assert_eq!(run(usize::MAX), run(0));
    }

    #[test]
    fn test_removal_takes_whole_tree() {
        let config = small_config();
        let mut world = World::new(&config, 5).expect("world");
        let s = world.spawn_soma(DVec3::new(50.0, 50.0, 30.0), 7.5, Some(CategoryId(203)));
        let seed = NeuriteSeed::root(DVec3::new(50.0, 50.0, 34.0), DVec3::new(50.0, 50.0, 36.0), 1.2, CategoryId(203));
        let root = world.attach_neurite(Parent::Soma(s), seed).expect("root");

        let mut report = TickReport::default();
        apply_commands(
            &mut world,
            vec![
                Command::Deactivate(root),
                Command::Remove(s),
            ],
            &mut report,
        );
        assert_eq!(report.deactivated, 1);
        assert_eq!(report.somas_removed, 1);
        assert_eq!(report.neurites_removed, 1);
        assert!(world.is_empty());
    }

    #[test]
    fn test_branch_links_daughters() {
        let config = small_config();
        let mut world = World::new(&config, 5).expect("world");
        let s = world.spawn_soma(DVec3::new(50.0, 50.0, 30.0), 7.5, Some(CategoryId(203)));
        let seed = NeuriteSeed::root(DVec3::new(50.0, 50.0, 34.0), DVec3::new(50.0, 50.0, 36.0), 1.2, CategoryId(203));
        let root = world.attach_neurite(Parent::Soma(s), seed.clone()).expect("root");

        let mut report = TickReport::default();
        apply_commands(
            &mut world,
            vec![Command::Branch {
                parent: root,
                daughters: vec![seed.clone(), seed],
            }],
            &mut report,
        );
        assert_eq!(report.neurites_created, 2);
        let parent = world.neurite(root).expect("root");
        assert_eq!(parent.daughters.len(), 2);
        assert!(!parent.is_terminal());
    }

    #[test]
    fn test_inactive_neurites_are_skipped() {
        let config = small_config();
        let mut world = World::new(&config, 5).expect("world");
        let s = world.spawn_soma(DVec3::new(50.0, 50.0, 30.0), 7.5, Some(CategoryId(203)));
        let seed = NeuriteSeed::root(DVec3::new(50.0, 50.0, 34.0), DVec3::new(50.0, 50.0, 36.0), 1.2, CategoryId(203));
        let root = world.attach_neurite(Parent::Soma(s), seed).expect("root");
        if let Some(Agent::Neurite(n)) = world.get_mut(root) {
            n.behavior_active = false;
        }
        let before = world.neurite(root).expect("root").position;

        let report = run_simulation_tick(&mut world).expect("tick");
        assert_eq!(report.evaluated, 1);
        assert_eq!(world.neurite(root).expect("root").position, before);
    }
}
