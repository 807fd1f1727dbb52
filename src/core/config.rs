//! Simulation configuration with documented constants
//!
//! All magic numbers of the mosaic model are collected here. Defaults are the
//! set-points of the reference retina model (one tick ~ 9 minutes, 160 ticks
//! per developmental day). Everything is loadable from TOML; missing keys fall
//! back to these defaults.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::core::error::{MosaicError, Result};
use crate::core::types::CategoryId;

/// Top-level configuration for a mosaic run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every random stream; `None` draws one at startup
    pub seed: Option<u64>,

    /// Number of ticks to simulate (2240 = 14 days at 160 ticks per day)
    pub max_step: u64,

    /// Ticks between two report samples
    pub sample_every: u64,

    /// Ticks per developmental day, used for progress summaries
    pub ticks_per_day: u64,

    /// Minimum agent count before behaviors are evaluated with rayon
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    pub parallel_threshold: usize,

    pub domain: DomainConfig,
    pub population: PopulationConfig,
    pub output: OutputConfig,
    pub fate: FateParams,
    pub soma: SomaParams,
    pub neurite: NeuriteParams,
    pub fields: Vec<FieldConfig>,
    pub categories: Vec<CategoryParams>,
}

/// Spatial extent of the simulated tissue and of the field grids
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainConfig {
    /// Lower bound of the retinal plane (x and y, µm)
    pub min_bound: f64,
    /// Upper bound of the retinal plane (x and y, µm)
    pub max_bound: f64,
    /// Lower bound of the depth axis (µm)
    pub min_z: f64,
    /// Upper bound of the depth axis (µm)
    pub max_z: f64,
    /// Edge length of one field voxel (µm)
    pub grid_spacing: f64,
}

impl DomainConfig {
    /// Planar area of the domain in mm²
    pub fn area_mm2(&self) -> f64 {
        let side_mm = (self.max_bound - self.min_bound) / 1000.0;
        side_mm * side_mm
    }
}

/// How the initial population is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Create undetermined somas and let fate assignment pick categories
    ///
    /// When false, every category row contributes `initial_density` somas.
    pub cell_fate: bool,

    /// Density of undetermined somas (cells/mm²) when `cell_fate` is set
    pub cell_density: f64,
}

/// Which report files a run writes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub write_ri: bool,
    pub write_positions: bool,
    pub write_swc: bool,
    pub write_distance: bool,
    pub write_summary: bool,
    /// Log per-category population and death rate every day
    pub verbose: bool,
}

/// Fate assignment constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FateParams {
    /// Starting concentration sensitivity threshold
    pub initial_threshold: f64,
    /// Probability to postpone the decision while no marker reached the soma
    pub zero_defer_probability: f64,
}

/// Soma phase windows and rates
///
/// Clock windows are half-open: `start <= clock < end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SomaParams {
    pub fate_every: u64,

    pub growth_clock_end: u64,
    pub growth_every: u64,
    /// Half-width of the planar jitter applied during growth (µm)
    pub jitter: f64,
    pub max_diameter: f64,
    pub growth_probability: f64,
    /// Volume added by one growth event (µm³)
    pub volume_increment: f64,

    pub with_movement: bool,
    pub migration_clock_start: u64,
    pub migration_clock_end: u64,
    pub migration_every: u64,
    /// Length of one step down the homotypic gradient (µm)
    pub migration_step: f64,

    pub with_death: bool,
    pub death_clock_start: u64,
    pub death_clock_end: u64,
    pub death_every: u64,
    pub death_probability: f64,
    /// Depth the multi-layer ganglion cell layer collapses onto (µm)
    pub layer_center_z: f64,
    pub vertical_step: f64,

    pub clock_advance_probability: f64,

    pub secretion_every: u64,
    pub secretion_amount: f64,

    /// Clock value after which the soma grows its dendrites
    pub maturation_clock: u64,
    pub initial_neurite_diameter: f64,
    pub initial_neurite_length: f64,
}

/// Dendrite growth/retraction constants shared by every category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuriteParams {
    pub neurite_every: u64,
    /// Terminal segments thinner than this stop growing for good
    pub min_diameter: f64,

    pub elongation_length: f64,
    pub max_segment_length: f64,
    pub min_segment_length: f64,
    /// Weight of the previous segment axis (directional persistence)
    pub axis_weight: f64,
    pub gradient_weight: f64,

    pub bifurcation_threshold: f64,
    pub bifurcation_cost: f64,
    /// Perpendicular deviation of daughter branches relative to the axis
    pub branch_spread: f64,

    pub crowding_radius: f64,
    /// Treat `same == other` as crowded
    pub crowding_tie_retracts: bool,
    /// Only retract from crowding below this diameter
    pub crowding_diameter_cap: Option<f64>,

    pub guidance_loss_threshold: f64,
    pub retraction_diameter_cap: f64,
    pub retraction_length: f64,
    pub recovery_epsilon: f64,
    pub recovery_threshold: f64,
    /// Stop the behavior after the first crowding retraction has recovered
    pub single_retraction_episode: bool,

    pub on_field: String,
    pub off_field: String,
    /// Scales the ON concentration when an ON-OFF cell picks its sublamina
    pub on_off_factor: f64,
}

/// Guidance field(s) followed by a category's dendrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceMode {
    On,
    Off,
    OnOff,
}

impl GuidanceMode {
    /// Retinal convention: 0-99 ON-OFF, 100-199 ON, 200+ OFF
    pub fn for_category(id: CategoryId) -> Self {
        match id.0 {
            0..=99 => GuidanceMode::OnOff,
            100..=199 => GuidanceMode::On,
            _ => GuidanceMode::Off,
        }
    }
}

/// One row of the per-category constant table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryParams {
    pub id: CategoryId,
    /// Field this category secretes and senses for homotypic spacing
    pub marker_field: String,
    pub guidance: GuidanceMode,
    /// Somas per mm² created when fate assignment is disabled
    pub initial_density: f64,
    /// Relative abundance when fate assignment picks among categories
    pub fate_weight: Option<f64>,
    pub movement_threshold: f64,
    pub death_threshold: f64,
    pub neurite_count: u32,
    /// Diameter lost per elongation step
    pub shrinkage: f64,
    pub randomness_weight: f64,
    pub bifurcation_rate: f64,
    pub preferred_direction: DVec3,
    /// Diameter regained per tick while retracting from crowding
    pub retraction_diameter_gain: f64,
}

/// Initial concentration profile of a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldProfile {
    /// Gaussian band along depth: `peak * exp(-(z - center_z)² / (2 sigma²))`
    GaussianBand { center_z: f64, sigma: f64, peak: f64 },
}

/// Definition of one diffusible substance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub diffusion_coefficient: f64,
    #[serde(default)]
    pub decay: f64,
    #[serde(default)]
    pub profile: Option<FieldProfile>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, diffusion_coefficient: f64) -> Self {
        Self {
            name: name.into(),
            diffusion_coefficient,
            decay: 0.0,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: FieldProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let domain = DomainConfig::default();
        // ratio diffusion_coefficient / spacing² = 0.125 keeps the explicit step stable
        let marker_diffusion = 0.125 * domain.grid_spacing * domain.grid_spacing;
        let categories = default_categories();

        let mut fields: Vec<FieldConfig> = categories
            .iter()
            .map(|c| FieldConfig::new(c.marker_field.clone(), marker_diffusion))
            .collect();
        fields.push(
            FieldConfig::new("on_diffu", 0.0).with_profile(FieldProfile::GaussianBand {
                center_z: 60.0,
                sigma: 18.0,
                peak: 0.1,
            }),
        );
        fields.push(
            FieldConfig::new("off_diffu", 0.0).with_profile(FieldProfile::GaussianBand {
                center_z: 45.0,
                sigma: 18.0,
                peak: 0.1,
            }),
        );

        Self {
            seed: None,
            max_step: 2240,
            sample_every: 16,
            ticks_per_day: 160,
            parallel_threshold: 1000,
            domain,
            population: PopulationConfig::default(),
            output: OutputConfig::default(),
            fate: FateParams::default(),
            soma: SomaParams::default(),
            neurite: NeuriteParams::default(),
            fields,
            categories,
        }
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            min_bound: 0.0,
            max_bound: 400.0,
            min_z: 0.0,
            max_z: 100.0,
            grid_spacing: 4.0,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            cell_fate: false,
            cell_density: 8600.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            write_ri: true,
            write_positions: true,
            write_swc: false,
            write_distance: true,
            write_summary: true,
            verbose: false,
        }
    }
}

impl Default for FateParams {
    fn default() -> Self {
        Self {
            initial_threshold: 0.1,
            zero_defer_probability: 0.9,
        }
    }
}

impl Default for SomaParams {
    fn default() -> Self {
        Self {
            fate_every: 3,
            growth_clock_end: 960,
            growth_every: 3,
            jitter: 0.01,
            max_diameter: 14.0,
            growth_probability: 0.02,
            volume_increment: 3000.0,
            with_movement: true,
            migration_clock_start: 100,
            migration_clock_end: 1920,
            migration_every: 3,
            migration_step: 0.1,
            with_death: true,
            death_clock_start: 100,
            death_clock_end: 960,
            death_every: 4,
            death_probability: 0.1,
            layer_center_z: 27.0,
            vertical_step: 0.01,
            clock_advance_probability: 0.96,
            secretion_every: 3,
            secretion_amount: 1.0,
            maturation_clock: 1950,
            initial_neurite_diameter: 1.2,
            initial_neurite_length: 1.0,
        }
    }
}

impl Default for NeuriteParams {
    fn default() -> Self {
        Self {
            neurite_every: 1,
            min_diameter: 0.3,
            elongation_length: 0.5,
            max_segment_length: 10.0,
            min_segment_length: 0.5,
            axis_weight: 4.0,
            gradient_weight: 0.6,
            bifurcation_threshold: 0.04,
            bifurcation_cost: 0.05,
            branch_spread: 0.5,
            crowding_radius: 4.0,
            crowding_tie_retracts: false,
            crowding_diameter_cap: None,
            guidance_loss_threshold: 0.01,
            retraction_diameter_cap: 1.0,
            retraction_length: 0.5,
            recovery_epsilon: 0.01,
            recovery_threshold: 0.02,
            single_retraction_episode: false,
            on_field: "on_diffu".to_string(),
            off_field: "off_diffu".to_string(),
            on_off_factor: 1.0,
        }
    }
}

impl Default for CategoryParams {
    fn default() -> Self {
        Self {
            id: CategoryId(200),
            marker_field: String::new(),
            guidance: GuidanceMode::Off,
            initial_density: 0.0,
            fate_weight: None,
            movement_threshold: 1.735,
            death_threshold: 1.76,
            neurite_count: 4,
            shrinkage: 0.0006,
            randomness_weight: 0.4,
            bifurcation_rate: 0.005,
            preferred_direction: DVec3::ZERO,
            retraction_diameter_gain: 0.001,
        }
    }
}

impl CategoryParams {
    pub fn new(id: i32, marker_field: impl Into<String>, initial_density: f64) -> Self {
        let id = CategoryId(id);
        Self {
            id,
            marker_field: marker_field.into(),
            guidance: GuidanceMode::for_category(id),
            initial_density,
            ..Self::default()
        }
    }

    pub fn with_fate_weight(mut self, weight: f64) -> Self {
        self.fate_weight = Some(weight);
        self
    }
}

/// Reference category table: a few ON-OFF and ON types plus the four OFF
/// types that fate assignment chooses between (target densities 40, 40, 65, 200).
fn default_categories() -> Vec<CategoryParams> {
    let mut on_off = CategoryParams::new(0, "on-off_dsgca", 357.0);
    on_off.neurite_count = 5;
    let mut on_alpha = CategoryParams::new(103, "on_aplha", 114.0);
    on_alpha.shrinkage = 0.0004;
    on_alpha.bifurcation_rate = 0.003;

    vec![
        on_off,
        CategoryParams::new(100, "on_dsgca", 114.0),
        on_alpha,
        CategoryParams::new(200, "off_aplhaa", 114.0).with_fate_weight(0.115),
        CategoryParams::new(201, "off_aplhab", 114.0).with_fate_weight(0.115),
        CategoryParams::new(202, "off_m1", 180.0).with_fate_weight(0.188),
        CategoryParams::new(203, "off_j", 571.0).with_fate_weight(0.579),
    ]
}

impl SimulationConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: SimulationConfig = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!(
            "Loaded configuration from {:?} ({} categories, {} fields)",
            path,
            config.categories.len(),
            config.fields.len()
        );
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(MosaicError::InvalidConfig(msg)) };

        let d = &self.domain;
        if d.max_bound <= d.min_bound || d.max_z <= d.min_z {
            return invalid("domain bounds must satisfy max > min".into());
        }
        if d.grid_spacing <= 0.0 {
            return invalid(format!("grid_spacing ({}) must be positive", d.grid_spacing));
        }
        // CellCreator keeps a 10 µm margin in the plane and spawns in [min_z+20, min_z+34]
        if d.max_bound - d.min_bound <= 20.0 || d.max_z - d.min_z < 34.0 {
            return invalid("domain too small for soma placement margins".into());
        }
        if self.sample_every == 0 || self.ticks_per_day == 0 {
            return invalid("sample_every and ticks_per_day must be positive".into());
        }

        let mut field_names = HashSet::new();
        for field in &self.fields {
            if !field_names.insert(field.name.as_str()) {
                return invalid(format!("duplicate field '{}'", field.name));
            }
            if field.diffusion_coefficient < 0.0 || field.decay < 0.0 {
                return invalid(format!("field '{}' has a negative rate", field.name));
            }
            // explicit 3-D diffusion is stable for D·dt/h² <= 1/6
            let ratio = field.diffusion_coefficient / (d.grid_spacing * d.grid_spacing);
            if ratio > 1.0 / 6.0 {
                return invalid(format!(
                    "field '{}' diffusion ratio {:.3} exceeds the stable limit 1/6",
                    field.name, ratio
                ));
            }
        }
        for name in [&self.neurite.on_field, &self.neurite.off_field] {
            if !field_names.contains(name.as_str()) {
                return invalid(format!("guidance field '{}' is not defined", name));
            }
        }

        let mut ids = HashSet::new();
        for cat in &self.categories {
            if !ids.insert(cat.id) {
                return invalid(format!("duplicate category {}", cat.id));
            }
            if !field_names.contains(cat.marker_field.as_str()) {
                return invalid(format!(
                    "category {} uses undefined marker field '{}'",
                    cat.id, cat.marker_field
                ));
            }
            if cat.shrinkage < 0.0 || cat.bifurcation_rate < 0.0 || cat.randomness_weight < 0.0 {
                return invalid(format!("category {} has a negative rate", cat.id));
            }
            if let Some(w) = cat.fate_weight {
                if w < 0.0 {
                    return invalid(format!("category {} has a negative fate weight", cat.id));
                }
            }
        }

        if self.population.cell_fate {
            let positive = self
                .categories
                .iter()
                .filter_map(|c| c.fate_weight)
                .any(|w| w > 0.0);
            if !positive {
                return invalid("cell_fate requires at least one positive fate_weight".into());
            }
        }
        if self.fate.initial_threshold <= 0.0 {
            return invalid("fate initial_threshold must be positive".into());
        }

        let s = &self.soma;
        if s.fate_every == 0
            || s.growth_every == 0
            || s.migration_every == 0
            || s.death_every == 0
            || s.secretion_every == 0
        {
            return invalid("soma cadences must be positive".into());
        }
        if s.initial_neurite_diameter <= 0.0 || s.initial_neurite_length <= 0.0 {
            return invalid("initial neurite diameter and length must be positive".into());
        }

        let n = &self.neurite;
        if n.neurite_every == 0 {
            return invalid("neurite_every must be positive".into());
        }
        if n.elongation_length <= 0.0 || n.retraction_length <= 0.0 {
            return invalid("elongation and retraction lengths must be positive".into());
        }
        if n.min_segment_length <= 0.0 || n.max_segment_length <= n.min_segment_length {
            return invalid(format!(
                "segment lengths must satisfy 0 < min ({}) < max ({})",
                n.min_segment_length, n.max_segment_length
            ));
        }
        if n.min_diameter < 0.0 || n.crowding_radius <= 0.0 {
            return invalid("neurite min_diameter and crowding_radius out of range".into());
        }
        for (name, value) in [
            ("bifurcation_cost", n.bifurcation_cost),
            ("retraction_diameter_cap", n.retraction_diameter_cap),
        ] {
            if value < 0.0 || value >= s.initial_neurite_diameter {
                return invalid(format!(
                    "{} ({}) must be within [0, initial_neurite_diameter ({}))",
                    name, value, s.initial_neurite_diameter
                ));
            }
        }
        // a growing segment is at least min_diameter thick; one elongation plus
        // one bifurcation must not take it below zero
        for cat in &self.categories {
            if cat.shrinkage + n.bifurcation_cost > n.min_diameter {
                return invalid(format!(
                    "category {} shrinkage ({}) plus bifurcation_cost ({}) exceeds min_diameter ({})",
                    cat.id, cat.shrinkage, n.bifurcation_cost, n.min_diameter
                ));
            }
        }

        for (name, p) in [
            ("growth_probability", s.growth_probability),
            ("death_probability", s.death_probability),
            ("clock_advance_probability", s.clock_advance_probability),
            ("zero_defer_probability", self.fate.zero_defer_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{} ({}) must be within [0, 1]", name, p));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        SimulationConfig::default()
            .validate()
            .expect("default config should validate");
    }

    #[test]
    fn test_default_fate_weights_sum_to_one() {
        let sum: f64 = SimulationConfig::default()
            .categories
            .iter()
            .filter_map(|c| c.fate_weight)
            .sum();
        assert!((sum - 0.997).abs() < 0.01, "weights sum to {}", sum);
    }

    #[test]
    fn test_guidance_mode_convention() {
        assert_eq!(GuidanceMode::for_category(CategoryId(5)), GuidanceMode::OnOff);
        assert_eq!(GuidanceMode::for_category(CategoryId(107)), GuidanceMode::On);
        assert_eq!(GuidanceMode::for_category(CategoryId(203)), GuidanceMode::Off);
    }

    #[test]
    fn test_rejects_unknown_marker_field() {
        let mut config = SimulationConfig::default();
        config.categories[0].marker_field = "missing".into();
        assert!(matches!(
            config.validate(),
            Err(MosaicError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_unstable_diffusion() {
        let mut config = SimulationConfig::default();
        config.fields[0].diffusion_coefficient = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fate_requires_positive_weight() {
        let mut config = SimulationConfig::default();
        config.population.cell_fate = true;
        for cat in &mut config.categories {
            cat.fate_weight = cat.fate_weight.map(|_| 0.0);
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_diameter_costs_out_of_range() {
        let mut config = SimulationConfig::default();
        config.neurite.bifurcation_cost = -0.01;
        assert!(matches!(config.validate(), Err(MosaicError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.neurite.bifurcation_cost = config.soma.initial_neurite_diameter;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.neurite.retraction_diameter_cap = -1.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.neurite.retraction_diameter_cap = config.soma.initial_neurite_diameter + 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_shrinkage_that_could_go_negative() {
        let mut config = SimulationConfig::default();
        config.categories[0].shrinkage = config.neurite.min_diameter;
        assert!(matches!(config.validate(), Err(MosaicError::InvalidConfig(_))));

        let mut config = SimulationConfig::default();
        config.categories[0].shrinkage = config.neurite.min_diameter / 2.0;
        config.validate().expect("moderate shrinkage validates");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SimulationConfig::default();
        let text = toml::to_string(&config).expect("serialize");
        let back: SimulationConfig = toml::from_str(&text).expect("parse");
        assert_eq!(back.categories.len(), config.categories.len());
        assert_eq!(back.fields.len(), config.fields.len());
        assert_eq!(back.soma.maturation_clock, config.soma.maturation_clock);
        back.validate().expect("round-tripped config validates");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SimulationConfig = toml::from_str("max_step = 320\n").expect("parse");
        assert_eq!(config.max_step, 320);
        assert_eq!(config.sample_every, 16);
        assert!(!config.categories.is_empty());
    }

    #[test]
    fn test_area_in_square_millimetres() {
        let domain = DomainConfig {
            min_bound: 0.0,
            max_bound: 1000.0,
            ..DomainConfig::default()
        };
        assert!((domain.area_mm2() - 1.0).abs() < 1e-12);
    }
}
