//! Core type definitions used throughout the codebase

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for agents (somas and neurite segments)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Committed cell category (RGC subtype)
///
/// Ids follow the retinal convention: 0-99 ON-OFF, 100-199 ON, 200-299 OFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub i32);

impl CategoryId {
    /// Wire value used by exports for an undetermined soma
    pub const UNDETERMINED: i32 = -1;

    /// Export value for an optional category
    pub fn export_value(category: Option<CategoryId>) -> i32 {
        category.map(|c| c.0).unwrap_or(Self::UNDETERMINED)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a field inside the field registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub usize);

/// Simulation tick counter
pub type Tick = u64;

/// Projection onto the retinal plane (x-y)
#[inline]
pub fn planar(position: DVec3) -> DVec2 {
    DVec2::new(position.x, position.y)
}

/// Diameter of a sphere with the given volume
#[inline]
pub fn diameter_from_volume(volume: f64) -> f64 {
    (6.0 * volume / std::f64::consts::PI).cbrt()
}

/// Volume of a sphere with the given diameter
#[inline]
pub fn volume_from_diameter(diameter: f64) -> f64 {
    std::f64::consts::PI / 6.0 * diameter.powi(3)
}
