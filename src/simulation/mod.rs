//! Simulation systems that operate on the world

pub mod categories;
pub mod context;
pub mod fate;
pub mod neurite;
pub mod population;
pub mod regularity;
pub mod run;
pub mod soma;
pub mod tick;

#[cfg(test)]
pub(crate) mod test_support;

pub use categories::{CategoryTable, GuidanceFields};
pub use context::{BehaviorContext, Command};
pub use fate::{FateAssigner, FateCandidate, FateDecision};
pub use neurite::NeuriteBehavior;
pub use regularity::{death_rate, regularity_by_category, regularity_index, PopulationTracker, RegularitySample};
pub use run::simulate;
pub use soma::SomaBehavior;
pub use tick::{run_simulation_tick, TickReport};
