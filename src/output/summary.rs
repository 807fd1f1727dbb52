//! Run summary and serialization

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::types::CategoryId;
use crate::ecs::world::World;
use crate::simulation::regularity::{death_rate, regularity_by_category, PopulationTracker};

/// Final state of one category
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: CategoryId,
    pub regularity_index: f64,
    pub population: usize,
    pub peak_population: usize,
    pub death_rate: f64,
}

/// Complete run output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub ticks: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub death_rate: f64,
    pub mean_regularity_index: f64,
    pub categories: Vec<CategorySummary>,
    pub simulation_time_ms: u64,
}

impl RunSummary {
    pub fn new(world: &World, tracker: &PopulationTracker, elapsed: Duration) -> Self {
        let samples = regularity_by_category(world.somas());
        let categories: Vec<CategorySummary> = samples
            .iter()
            .map(|s| CategorySummary {
                category: s.category,
                regularity_index: s.index,
                population: s.population,
                peak_population: tracker.peak(s.category).max(s.population),
                death_rate: tracker.death_rate(s.category, s.population),
            })
            .collect();
        let final_population = world.soma_count();

        Self {
            seed: world.seed(),
            ticks: world.current_tick,
            initial_population: world.initial_population(),
            final_population,
            death_rate: death_rate(world.initial_population(), final_population),
            mean_regularity_index: mean_regularity(&categories),
            categories,
            simulation_time_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        format!(
            "Simulated {} ticks in {}ms (seed {})\n{} of {} somas remain ({:.1}% death), mean RI {:.2}",
            self.ticks,
            self.simulation_time_ms,
            self.seed,
            self.final_population,
            self.initial_population,
            self.death_rate,
            self.mean_regularity_index,
        )
    }
}

/// Mean RI over categories with a finite index
pub fn mean_regularity(categories: &[CategorySummary]) -> f64 {
    let finite: Vec<f64> = categories
        .iter()
        .map(|c| c.regularity_index)
        .filter(|ri| ri.is_finite())
        .collect();
    if finite.is_empty() {
        return 0.0;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}
