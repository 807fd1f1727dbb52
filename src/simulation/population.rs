//! Initial population factory
//!
//! Somas are scattered uniformly over the retinal plane (keeping a 10 µm
//! margin from the border) inside a 14 µm thick ganglion cell layer that
//! later collapses onto one sheet.

use glam::DVec3;
use rand::Rng;

use crate::core::config::{DomainConfig, SimulationConfig};
use crate::core::types::CategoryId;
use crate::ecs::world::World;

const PLANAR_MARGIN: f64 = 10.0;
const LAYER_BOTTOM: f64 = 20.0;
const LAYER_TOP: f64 = 34.0;
const DIAMETER_RANGE: (f64, f64) = (7.0, 8.0);

/// Number of somas for a density (cells/mm²) over the domain's plane
pub fn soma_count(density: f64, domain: &DomainConfig) -> usize {
    (density * domain.area_mm2()).round().max(0.0) as usize
}

/// Random initial position and diameter of a soma
pub fn random_soma<R: Rng + ?Sized>(domain: &DomainConfig, rng: &mut R) -> (DVec3, f64) {
    let low = domain.min_bound + PLANAR_MARGIN;
    let high = domain.max_bound - PLANAR_MARGIN;
    let position = DVec3::new(
        rng.gen_range(low..high),
        rng.gen_range(low..high),
        rng.gen_range(domain.min_z + LAYER_BOTTOM..domain.min_z + LAYER_TOP),
    );
    let diameter = rng.gen_range(DIAMETER_RANGE.0..DIAMETER_RANGE.1);
    (position, diameter)
}

/// Create `count` somas of one category (or undetermined)
pub fn create_somas<R: Rng + ?Sized>(
    world: &mut World,
    domain: &DomainConfig,
    count: usize,
    category: Option<CategoryId>,
    rng: &mut R,
) {
    for _ in 0..count {
        let (position, diameter) = random_soma(domain, rng);
        world.spawn_soma(position, diameter, category);
    }
}

/// Create the starting population and record its size as the initial population
pub fn populate<R: Rng + ?Sized>(world: &mut World, config: &SimulationConfig, rng: &mut R) -> usize {
    let domain = &config.domain;
    let mut created = 0;

    if config.population.cell_fate {
        let count = soma_count(config.population.cell_density, domain);
        create_somas(world, domain, count, None, rng);
        created += count;
    } else {
        for category in &config.categories {
            let count = soma_count(category.initial_density, domain);
            create_somas(world, domain, count, Some(category.id), rng);
            tracing::debug!("Created {} somas of category {}", count, category.id);
            created += count;
        }
    }

    world.set_initial_population(world.soma_count());
    tracing::info!(
        "Created {} somas over {:.3} mm² ({})",
        created,
        domain.area_mm2(),
        if config.population.cell_fate { "fate assignment" } else { "fixed categories" }
    );
    created
}
