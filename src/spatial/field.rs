//! Diffusible substance fields
//!
//! Behaviors only see the [`SpatialField`] contract: concentration and gradient
//! reads against the field as it settled at the end of the previous tick.
//! Secretion is buffered by [`FieldRegistry::increase_concentration_by`] and
//! folded in by [`FieldRegistry::step`] at the tick boundary, so the order in
//! which agents secrete never matters.
//!
//! The reference solver is an explicit Euler scheme on a uniform voxel grid
//! with closed (zero-flux) boundaries and first-order decay.

use ahash::AHashMap;
use glam::DVec3;
use rayon::prelude::*;

use crate::core::config::{DomainConfig, FieldConfig, FieldProfile};
use crate::core::error::{MosaicError, Result};
use crate::core::types::FieldId;
use crate::spatial::grid::VoxelGrid;

/// Read access to named scalar fields
pub trait SpatialField: Sync {
    fn concentration(&self, field: FieldId, position: DVec3) -> f64;

    /// Raw (non-normalized) spatial gradient
    fn gradient(&self, field: FieldId, position: DVec3) -> DVec3;
}

/// One substance on a voxel grid
#[derive(Debug, Clone)]
pub struct DiffusionGrid {
    name: String,
    diffusion_coefficient: f64,
    decay: f64,
    values: VoxelGrid<f64>,
    pending: Vec<f64>,
}

impl DiffusionGrid {
    pub fn new(config: &FieldConfig, min: DVec3, max: DVec3, spacing: f64) -> Self {
        let values = VoxelGrid::covering(min, max, spacing);
        let pending = vec![0.0; values.len()];
        let mut grid = Self {
            name: config.name.clone(),
            diffusion_coefficient: config.diffusion_coefficient,
            decay: config.decay,
            values,
            pending,
        };
        if let Some(profile) = config.profile {
            grid.apply_profile(profile);
        }
        grid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn apply_profile(&mut self, profile: FieldProfile) {
        let FieldProfile::GaussianBand { center_z, sigma, peak } = profile;
        for z in 0..self.values.nz {
            let depth = self.values.cell_center(0, 0, z).z;
            let value = peak * (-(depth - center_z).powi(2) / (2.0 * sigma * sigma)).exp();
            for y in 0..self.values.ny {
                for x in 0..self.values.nx {
                    if let Some(c) = self.values.get_mut(x, y, z) {
                        *c = value;
                    }
                }
            }
        }
    }

    /// Concentration of the voxel containing `position`
    pub fn concentration(&self, position: DVec3) -> f64 {
        *self.values.sample(position)
    }

    /// Central-difference gradient at the voxel containing `position`
    pub fn gradient(&self, position: DVec3) -> DVec3 {
        let (x, y, z) = self.values.world_to_cell(position);
        let v = &self.values;
        let h = v.spacing;

        let axis = |lo: Option<f64>, hi: Option<f64>, centre: f64| -> f64 {
            match (lo, hi) {
                (Some(l), Some(r)) => (r - l) / (2.0 * h),
                (None, Some(r)) => (r - centre) / h,
                (Some(l), None) => (centre - l) / h,
                (None, None) => 0.0,
            }
        };
        let centre = *v.sample(position);
        let at = |x: Option<usize>, y: Option<usize>, z: Option<usize>| -> Option<f64> {
            v.get(x?, y?, z?).copied()
        };

        DVec3::new(
            axis(at(x.checked_sub(1), Some(y), Some(z)), at(Some(x + 1), Some(y), Some(z)), centre),
            axis(at(Some(x), y.checked_sub(1), Some(z)), at(Some(x), Some(y + 1), Some(z)), centre),
            axis(at(Some(x), Some(y), z.checked_sub(1)), at(Some(x), Some(y), Some(z + 1)), centre),
        )
    }

    /// Buffer a secretion; applied by the next `step`
    pub fn increase_concentration_by(&mut self, position: DVec3, amount: f64) {
        let (x, y, z) = self.values.world_to_cell(position);
        let idx = self.values.index(x, y, z);
        self.pending[idx] += amount;
    }

    /// Fold pending secretion in, then advance diffusion and decay by `dt`
    pub fn step(&mut self, dt: f64) {
        for (c, p) in self.values.as_mut_slice().iter_mut().zip(self.pending.iter_mut()) {
            *c += *p;
            *p = 0.0;
        }

        if self.diffusion_coefficient == 0.0 && self.decay == 0.0 {
            return;
        }

        let (nx, ny, nz) = (self.values.nx, self.values.ny, self.values.nz);
        let alpha = self.diffusion_coefficient * dt / (self.values.spacing * self.values.spacing);
        let decay = self.decay * dt;
        let old = self.values.as_slice().to_vec();
        let idx = |x: usize, y: usize, z: usize| (z * ny + y) * nx + x;

        self.values
            .as_mut_slice()
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, c)| {
                let x = i % nx;
                let y = (i / nx) % ny;
                let z = i / (nx * ny);
                let centre = old[i];
                // zero-flux boundary: a missing neighbor mirrors the centre
                let neighbors = [
                    (x > 0).then(|| idx(x - 1, y, z)),
                    (x + 1 < nx).then(|| idx(x + 1, y, z)),
                    (y > 0).then(|| idx(x, y - 1, z)),
                    (y + 1 < ny).then(|| idx(x, y + 1, z)),
                    (z > 0).then(|| idx(x, y, z - 1)),
                    (z + 1 < nz).then(|| idx(x, y, z + 1)),
                ];
                let lap: f64 = neighbors.iter().flatten().map(|&n| old[n] - centre).sum();
                *c = centre + alpha * lap - decay * centre;
            });
    }

    /// Sum of all voxel values (conserved by diffusion without decay)
    pub fn total(&self) -> f64 {
        self.values.as_slice().iter().sum()
    }
}

/// All substances of a run, addressable by name or [`FieldId`]
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    grids: Vec<DiffusionGrid>,
    by_name: AHashMap<String, FieldId>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(fields: &[FieldConfig], domain: &DomainConfig) -> Result<Self> {
        let min = DVec3::new(domain.min_bound, domain.min_bound, domain.min_z);
        let max = DVec3::new(domain.max_bound, domain.max_bound, domain.max_z);
        let mut registry = Self::new();
        for field in fields {
            registry.define(DiffusionGrid::new(field, min, max, domain.grid_spacing))?;
        }
        tracing::debug!("Initialised {} diffusion fields", registry.len());
        Ok(registry)
    }

    pub fn define(&mut self, grid: DiffusionGrid) -> Result<FieldId> {
        if self.by_name.contains_key(grid.name()) {
            return Err(MosaicError::InvalidConfig(format!(
                "field '{}' defined twice",
                grid.name()
            )));
        }
        let id = FieldId(self.grids.len());
        self.by_name.insert(grid.name().to_string(), id);
        self.grids.push(grid);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Result<FieldId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| MosaicError::UnknownField(name.to_string()))
    }

    pub fn get(&self, id: FieldId) -> Option<&DiffusionGrid> {
        self.grids.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn increase_concentration_by(&mut self, id: FieldId, position: DVec3, amount: f64) {
        match self.grids.get_mut(id.0) {
            Some(grid) => grid.increase_concentration_by(position, amount),
            None => tracing::warn!("Secretion into unknown field {:?} dropped", id),
        }
    }

    /// Settle every field for the next tick
    pub fn step(&mut self, dt: f64) {
        for grid in &mut self.grids {
            grid.step(dt);
        }
    }
}

impl SpatialField for FieldRegistry {
    fn concentration(&self, field: FieldId, position: DVec3) -> f64 {
        self.get(field).map(|g| g.concentration(position)).unwrap_or(0.0)
    }

    fn gradient(&self, field: FieldId, position: DVec3) -> DVec3 {
        self.get(field).map(|g| g.gradient(position)).unwrap_or(DVec3::ZERO)
    }
}
