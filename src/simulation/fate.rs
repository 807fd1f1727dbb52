//! Fate assignment - committing an undetermined soma to a category
//!
//! Each candidate category owns a marker field and a target relative
//! abundance (weight). A category is admissible while the local concentration
//! of its marker is below `threshold × weight³`; the threshold widens tenfold
//! until something is admissible, then a weighted draw picks among the
//! admissible set. Local abundance of a type therefore inhibits that fate.

use rand::Rng;

use crate::core::config::FateParams;
use crate::core::error::{MosaicError, Result};
use crate::core::types::{CategoryId, FieldId};
use crate::entity::SomaAgent;
use crate::simulation::context::BehaviorContext;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FateCandidate {
    pub field: FieldId,
    pub category: CategoryId,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FateDecision {
    /// Nothing decided this tick
    Deferred,
    Assigned(CategoryId),
}

#[derive(Debug, Clone)]
pub struct FateAssigner {
    candidates: Vec<FateCandidate>,
    initial_threshold: f64,
    zero_defer_probability: f64,
}

impl FateAssigner {
    /// Requires at least one candidate with a strictly positive weight, which
    /// is what guarantees the widening loop terminates.
    pub fn new(candidates: Vec<FateCandidate>, params: &FateParams) -> Result<Self> {
        if !candidates.iter().any(|c| c.weight > 0.0) {
            return Err(MosaicError::InvalidConfig(
                "fate assignment needs a candidate with positive weight".into(),
            ));
        }
        if params.initial_threshold <= 0.0 {
            return Err(MosaicError::InvalidConfig(format!(
                "fate initial_threshold ({}) must be positive",
                params.initial_threshold
            )));
        }
        Ok(Self {
            candidates,
            initial_threshold: params.initial_threshold,
            zero_defer_probability: params.zero_defer_probability,
        })
    }

    /// Sample every marker at the soma and commit it if a category is drawn
    pub fn assign<R: Rng>(
        &self,
        soma: &mut SomaAgent,
        ctx: &mut BehaviorContext<'_, R>,
    ) -> Result<FateDecision> {
        if soma.is_committed() {
            return Ok(FateDecision::Deferred);
        }
        let concentrations: Vec<f64> = self
            .candidates
            .iter()
            .map(|c| ctx.concentration(c.field, soma.position))
            .collect();

        let decision = self.choose(&concentrations, &mut ctx.rng)?;
        if let FateDecision::Assigned(category) = decision {
            soma.commit(category);
            tracing::trace!("Soma {} committed to category {}", soma.id, category);
        }
        Ok(decision)
    }

    /// Decide from concentrations given in candidate order
    pub fn choose<R: Rng + ?Sized>(&self, concentrations: &[f64], rng: &mut R) -> Result<FateDecision> {
        debug_assert_eq!(concentrations.len(), self.candidates.len());

        // no marker secreted nearby yet: mostly wait for the field to build up
        if concentrations.iter().all(|&c| c == 0.0)
            && rng.gen::<f64>() < self.zero_defer_probability
        {
            return Ok(FateDecision::Deferred);
        }

        let admissible = self.admissible(concentrations)?;

        let total: f64 = admissible.iter().map(|c| c.weight.max(0.0)).sum();
        if total <= 0.0 {
            return Ok(FateDecision::Deferred);
        }
        let r = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        for candidate in &admissible {
            cumulative += candidate.weight.max(0.0);
            if r < cumulative {
                return Ok(FateDecision::Assigned(candidate.category));
            }
        }

        // r rounded onto the upper edge: last bucket with any width
        Ok(admissible
            .iter()
            .rev()
            .find(|c| c.weight > 0.0)
            .map(|c| FateDecision::Assigned(c.category))
            .unwrap_or(FateDecision::Deferred))
    }

    /// Candidates below `threshold × weight³`, widening the threshold tenfold until non-empty
    fn admissible(&self, concentrations: &[f64]) -> Result<Vec<FateCandidate>> {
        let mut threshold = self.initial_threshold;
        loop {
            let subset: Vec<FateCandidate> = self
                .candidates
                .iter()
                .zip(concentrations)
                .filter(|(c, &conc)| conc < threshold * c.weight.powi(3))
                .map(|(c, _)| *c)
                .collect();
            if !subset.is_empty() {
                return Ok(subset);
            }
            threshold *= 10.0;
            if !threshold.is_finite() {
                return Err(MosaicError::FateUnresolvable(threshold));
            }
        }
    }
}
