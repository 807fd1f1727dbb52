//! Neurite behavior - the growth/retraction state machine of a dendrite tip
//!
//! Only terminal segments are active. A growing tip elongates along a blend of
//! its own axis, the guidance gradient and noise, and occasionally bifurcates.
//! It switches to retraction when terminals of the same type from other cells
//! outnumber other-type terminals around it (homotypic lateral inhibition), or
//! when it loses the guidance cue while thin.
//!
//! ```text
//!            crowded                     concentration lost
//! Growing ───────────► Retracting ◄──────────────────────── Growing
//!    ▲   diameter regained │  (crowded)         (lost) │  cue found again
//!    └─────────────────────┘                           └──────► Growing
//! ```

use glam::DVec3;
use rand::Rng;

use crate::core::config::NeuriteParams;
use crate::core::error::Result;
use crate::entity::{Agent, GrowthState, NeuriteAgent};
use crate::simulation::categories::{CategoryRow, GuidanceFields};
use crate::simulation::context::{BehaviorContext, Command};

/// Guidance reading at the tip
#[derive(Debug, Clone, Copy)]
struct Guidance {
    concentration: f64,
    gradient: DVec3,
}

#[derive(Debug, Clone)]
pub struct NeuriteBehavior {
    params: NeuriteParams,
}

impl NeuriteBehavior {
    pub fn new(params: NeuriteParams) -> Self {
        Self { params }
    }

    pub fn run<R: Rng>(&self, neurite: &mut NeuriteAgent, ctx: &mut BehaviorContext<'_, R>) -> Result<()> {
        if !neurite.behavior_active || ctx.tick % self.params.neurite_every != 0 {
            return Ok(());
        }
        if !neurite.is_terminal() || neurite.diameter < self.params.min_diameter {
            ctx.request(Command::Deactivate(neurite.id));
            return Ok(());
        }

        let categories = ctx.categories;
        let row = match categories.get(neurite.subtype) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Neurite {} skipped: {}", neurite.id, e);
                return Ok(());
            }
        };
        let guidance = self.read_guidance(neurite.position, row, ctx);

        match neurite.state() {
            GrowthState::Growing => self.grow(neurite, row, guidance, ctx),
            GrowthState::RetractingCrowded | GrowthState::RetractingLost => {
                self.retract(neurite, row, guidance, ctx)
            }
        }
        Ok(())
    }

    /// ON-OFF cells pick whichever sublamina signal is stronger at the tip
    fn read_guidance<R: Rng>(&self, position: DVec3, row: &CategoryRow, ctx: &BehaviorContext<'_, R>) -> Guidance {
        let field = match ctx.categories.guidance(row.params.guidance) {
            GuidanceFields::Single(field) => field,
            GuidanceFields::Competing { on, off } => {
                let on_conc = ctx.concentration(on, position);
                let off_conc = ctx.concentration(off, position);
                if on_conc * self.params.on_off_factor > off_conc {
                    on
                } else {
                    off
                }
            }
        };
        Guidance {
            concentration: ctx.concentration(field, position),
            gradient: ctx.gradient(field, position),
        }
    }

    fn grow<R: Rng>(
        &self,
        neurite: &mut NeuriteAgent,
        row: &CategoryRow,
        guidance: Guidance,
        ctx: &mut BehaviorContext<'_, R>,
    ) {
        let p = &self.params;
        let mut retract = false;

        if self.is_crowded(neurite, ctx) {
            neurite.has_to_retract = true;
            neurite.beyond_threshold = false;
            neurite.diameter_before_retraction = neurite.diameter;
            retract = true;
        }
        if guidance.concentration < p.guidance_loss_threshold && neurite.diameter < p.retraction_diameter_cap {
            neurite.has_to_retract = true;
            neurite.beyond_threshold = true;
            retract = true;
        }
        if retract {
            tracing::trace!("Neurite {} starts retracting ({:?})", neurite.id, neurite.state());
            return;
        }

        let continued = self.elongate(neurite, row, guidance, ctx);
        if !continued {
            self.bifurcate(neurite, row, guidance, ctx);
        }
    }

    /// Count terminal segments of other cells around the tip
    fn is_crowded<R: Rng>(&self, neurite: &NeuriteAgent, ctx: &BehaviorContext<'_, R>) -> bool {
        let p = &self.params;
        if let Some(cap) = p.crowding_diameter_cap {
            if neurite.diameter >= cap {
                return false;
            }
        }

        let owner = neurite.owning_soma;
        let subtype = neurite.subtype;
        let mut same = 0usize;
        let mut other = 0usize;
        ctx.neighbors
            .for_each_within_radius(neurite.id, neurite.position, p.crowding_radius, &mut |agent| {
                if let Agent::Neurite(n) = agent {
                    if n.owning_soma != owner && n.is_terminal() {
                        if n.subtype == subtype {
                            same += 1;
                        } else {
                            other += 1;
                        }
                    }
                }
            });

        if p.crowding_tie_retracts {
            same > 0 && same >= other
        } else {
            same > other
        }
    }

    /// Move the tip forward. Returns true when a continuation daughter was requested.
    fn elongate<R: Rng>(
        &self,
        neurite: &mut NeuriteAgent,
        row: &CategoryRow,
        guidance: Guidance,
        ctx: &mut BehaviorContext<'_, R>,
    ) -> bool {
        let p = &self.params;
        let axis = neurite.axis().normalize_or_zero();
        let random = ctx.random_unit_vector();
        let direction = (axis * p.axis_weight
            + guidance.gradient.normalize_or_zero() * p.gradient_weight
            + random * row.params.randomness_weight
            + row.params.preferred_direction)
            .try_normalize()
            .unwrap_or(random);

        neurite.position += direction * p.elongation_length;
        neurite.diameter -= row.params.shrinkage;
        debug_assert!(neurite.diameter >= 0.0, "segment diameter went negative");

        if neurite.length() > p.max_segment_length {
            let daughter = neurite.daughter_seed(direction, p.elongation_length, neurite.diameter);
            ctx.request(Command::Branch {
                parent: neurite.id,
                daughters: vec![daughter],
            });
            return true;
        }
        false
    }

    fn bifurcate<R: Rng>(
        &self,
        neurite: &NeuriteAgent,
        row: &CategoryRow,
        guidance: Guidance,
        ctx: &mut BehaviorContext<'_, R>,
    ) {
        let p = &self.params;
        if guidance.concentration <= p.bifurcation_threshold {
            return;
        }
        if ctx.uniform(0.0, 1.0) >= neurite.diameter * row.params.bifurcation_rate {
            return;
        }

        let axis = neurite.axis().try_normalize().unwrap_or(DVec3::Z);
        let random = ctx.random_unit_vector();
        let perpendicular = (random - axis * random.dot(axis))
            .try_normalize()
            .unwrap_or_else(|| axis.any_orthonormal_vector());
        let diameter = neurite.diameter - p.bifurcation_cost;
        debug_assert!(diameter >= 0.0, "daughter diameter went negative");

        let daughters = [1.0, -1.0]
            .iter()
            .map(|side| {
                let direction = axis + perpendicular * (p.branch_spread * side);
                neurite.daughter_seed(direction, p.elongation_length, diameter)
            })
            .collect();
        ctx.request(Command::Branch {
            parent: neurite.id,
            daughters,
        });
        tracing::trace!("Neurite {} bifurcates", neurite.id);
    }

    fn retract<R: Rng>(
        &self,
        neurite: &mut NeuriteAgent,
        row: &CategoryRow,
        guidance: Guidance,
        ctx: &mut BehaviorContext<'_, R>,
    ) {
        let p = &self.params;
        let axis = neurite.axis();
        let length = axis.length();
        if length > 0.0 {
            let shortened = (length - p.retraction_length).max(p.min_segment_length).min(length);
            neurite.position = neurite.proximal + axis / length * shortened;
        }

        if !neurite.beyond_threshold {
            neurite.diameter += row.params.retraction_diameter_gain;
            if neurite.diameter > neurite.diameter_before_retraction + p.recovery_epsilon {
                neurite.has_to_retract = false;
                if p.single_retraction_episode {
                    ctx.request(Command::Deactivate(neurite.id));
                }
            }
        } else if guidance.concentration > p.recovery_threshold {
            neurite.has_to_retract = false;
            neurite.beyond_threshold = false;
        }
    }
}
