//! Soma behavior - one tick of a cell body's life
//!
//! Phases are gated by the soma's own internal clock, which advances
//! stochastically, so neighbouring cells drift out of lockstep:
//!
//! fate -> growth -> tangential migration -> vertical settling/death
//!      -> marker secretion -> maturation -> clock advance
//!
//! The homotypic marker is sampled once at the start of the tick; every phase
//! reacts to that single reading.

use glam::DVec3;
use rand::Rng;

use crate::core::config::SomaParams;
use crate::core::error::Result;
use crate::entity::{NeuriteSeed, SomaAgent};
use crate::simulation::categories::CategoryRow;
use crate::simulation::context::{BehaviorContext, Command};
use crate::simulation::fate::FateAssigner;

#[derive(Debug, Clone)]
pub struct SomaBehavior {
    params: SomaParams,
    fate: Option<FateAssigner>,
}

/// Half-open clock window with a cadence
fn in_window(clock: u64, start: u64, end: u64, every: u64) -> bool {
    clock >= start && clock < end && clock % every == 0
}

impl SomaBehavior {
    pub fn new(params: SomaParams, fate: Option<FateAssigner>) -> Self {
        Self { params, fate }
    }

    pub fn run<R: Rng>(&self, soma: &mut SomaAgent, ctx: &mut BehaviorContext<'_, R>) -> Result<()> {
        let p = &self.params;
        let clock = soma.internal_clock;

        let Some(category) = soma.category else {
            if clock % p.fate_every == 0 {
                match &self.fate {
                    Some(fate) => {
                        fate.assign(soma, ctx)?;
                    }
                    None => tracing::warn!("Soma {} is undetermined but fate assignment is off", soma.id),
                }
            }
            self.advance_clock(soma, ctx);
            return Ok(());
        };

        let categories = ctx.categories;
        let row = match categories.get(category) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Soma {} skipped: {}", soma.id, e);
                return Ok(());
            }
        };

        let concentration = ctx.concentration(row.marker, soma.position);
        let gradient = ctx.gradient(row.marker, soma.position);
        let settle = if soma.position.z > p.layer_center_z {
            DVec3::new(0.0, 0.0, -p.vertical_step)
        } else {
            DVec3::new(0.0, 0.0, p.vertical_step)
        };

        if clock < p.growth_clock_end && clock % p.growth_every == 0 {
            let jitter = DVec3::new(ctx.uniform(-p.jitter, p.jitter), ctx.uniform(-p.jitter, p.jitter), 0.0);
            soma.update_position(jitter);
            if soma.diameter < p.max_diameter && ctx.chance(p.growth_probability) {
                soma.change_volume(p.volume_increment);
            }
            // without death the layer still collapses, just more slowly
            if !p.with_death {
                soma.update_position(settle);
            }
        }

        if p.with_movement
            && in_window(clock, p.migration_clock_start, p.migration_clock_end, p.migration_every)
            && concentration >= row.params.movement_threshold
        {
            let mut step = gradient.normalize_or_zero() * -p.migration_step;
            step.z = 0.0;
            soma.update_position(step);
            soma.record_travel();
        }

        let mut removed = false;
        if p.with_death && in_window(clock, p.death_clock_start, p.death_clock_end, p.death_every) {
            soma.update_position(settle);
            if concentration > row.params.death_threshold && ctx.chance(p.death_probability) {
                ctx.request(Command::Remove(soma.id));
                removed = true;
            }
        }

        if !removed {
            if clock % p.secretion_every == 0 {
                ctx.request(Command::Secrete {
                    field: row.marker,
                    position: soma.position,
                    amount: p.secretion_amount,
                });
            }
            if !soma.matured && clock >= p.maturation_clock {
                self.spawn_neurites(soma, row, ctx);
            }
        }

        self.advance_clock(soma, ctx);
        Ok(())
    }

    fn advance_clock<R: Rng>(&self, soma: &mut SomaAgent, ctx: &mut BehaviorContext<'_, R>) {
        if ctx.chance(self.params.clock_advance_probability) {
            soma.internal_clock += 1;
        }
    }

    /// Request the root segments of the dendritic tree, leaving the soma surface upwards
    fn spawn_neurites<R: Rng>(&self, soma: &mut SomaAgent, row: &CategoryRow, ctx: &mut BehaviorContext<'_, R>) {
        let p = &self.params;
        for _ in 0..row.params.neurite_count {
            let direction = (ctx.random_unit_vector() + DVec3::Z)
                .try_normalize()
                .unwrap_or(DVec3::Z);
            let proximal = soma.position + direction * soma.radius();
            let position = proximal + direction * p.initial_neurite_length;
            ctx.request(Command::SpawnNeurite {
                soma: soma.id,
                seed: NeuriteSeed::root(proximal, position, p.initial_neurite_diameter, row.params.id),
            });
        }
        soma.matured = true;
        tracing::trace!("Soma {} matured with {} neurites", soma.id, row.params.neurite_count);
    }
}
