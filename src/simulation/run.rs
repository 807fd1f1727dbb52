//! Run driver - population setup, the tick loop, sampling and reports

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::ecs::world::World;
use crate::output::reports::ReportWriter;
use crate::output::summary::{mean_regularity, CategorySummary, RunSummary};
use crate::simulation::population::populate;
use crate::simulation::regularity::{death_rate, regularity_by_category, PopulationTracker};
use crate::simulation::tick::run_simulation_tick;

/// Seeds drawn at startup stay below this, matching the result folder names
const MAX_RANDOM_SEED: u64 = 10_000;

pub fn resolve_seed(config: &SimulationConfig) -> u64 {
    config
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..MAX_RANDOM_SEED))
}

/// Build and populate a world for `config`
pub fn build_world(config: &SimulationConfig, seed: u64) -> Result<World> {
    let mut world = World::new(config, seed)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    populate(&mut world, config, &mut rng);
    Ok(world)
}

/// Advance `world` by `ticks`, sampling regularity every `sample_every` ticks
pub fn advance(
    world: &mut World,
    config: &SimulationConfig,
    ticks: u64,
    tracker: &mut PopulationTracker,
    mut writer: Option<&mut ReportWriter>,
) -> Result<()> {
    for _ in 0..ticks {
        run_simulation_tick(world)?;
        let tick = world.current_tick;

        if tick % config.sample_every == 0 {
            let samples = regularity_by_category(world.somas());
            tracker.observe(&samples);
            if let Some(w) = writer.as_deref_mut() {
                let rate = death_rate(world.initial_population(), world.soma_count());
                w.record_sample(tick, &samples, rate, world)?;
            }
        }

        if tick % config.ticks_per_day == 0 {
            log_day(world, config, tracker);
        }
    }
    Ok(())
}

fn log_day(world: &World, config: &SimulationConfig, tracker: &PopulationTracker) {
    let day = world.current_tick / config.ticks_per_day;
    let days = config.max_step / config.ticks_per_day;
    let categories: Vec<CategorySummary> = regularity_by_category(world.somas())
        .into_iter()
        .map(|s| CategorySummary {
            category: s.category,
            regularity_index: s.index,
            population: s.population,
            peak_population: tracker.peak(s.category),
            death_rate: tracker.death_rate(s.category, s.population),
        })
        .collect();

    if config.output.verbose {
        for c in &categories {
            tracing::info!(
                "type: {} - ri: {:.3} - population: {} - max pop: {} - death: {:.1}%",
                c.category,
                c.regularity_index,
                c.population,
                c.peak_population,
                c.death_rate
            );
        }
    }
    tracing::info!(
        "Day {}/{} simulated: average ri = {:.3}; {:.1}% of cell death ({} neurites)",
        day,
        days,
        mean_regularity(&categories),
        death_rate(world.initial_population(), world.soma_count()),
        world.neurite_count()
    );
}

/// Run a whole simulation and write its reports
pub fn simulate(config: &SimulationConfig) -> Result<RunSummary> {
    config.validate()?;
    let start = Instant::now();
    let seed = resolve_seed(config);

    let mut world = build_world(config, seed)?;
    tracing::info!(
        "Start simulation with {} somas using seed {}",
        world.soma_count(),
        seed
    );

    let mut writer = ReportWriter::create(&config.output, seed)?;
    writer.write_positions_at(0, &world)?;

    let mut tracker = PopulationTracker::new();
    tracker.observe(&regularity_by_category(world.somas()));
    advance(&mut world, config, config.max_step, &mut tracker, Some(&mut writer))?;

    let summary = RunSummary::new(&world, &tracker, start.elapsed());
    writer.finish(&world, &summary)?;
    tracing::info!("{}", summary.summary());
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_seed_is_kept() {
        let config = SimulationConfig {
            seed: Some(77),
            ..SimulationConfig::default()
        };
        assert_eq!(resolve_seed(&config), 77);
        assert!(resolve_seed(&SimulationConfig::default()) < MAX_RANDOM_SEED);
    }

    #[test]
    fn test_advance_samples_population() {
        let mut config = SimulationConfig::default();
        config.domain.max_bound = 120.0;
        let mut world = build_world(&config, 4).expect("world");
        let mut tracker = PopulationTracker::new();
        advance(&mut world, &config, 32, &mut tracker, None).expect("advance");

        assert_eq!(world.current_tick, 32);
        assert!(tracker.categories().count() > 0);
    }
}
