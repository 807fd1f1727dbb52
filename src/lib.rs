//! Retina Mosaic - self-organisation of retinal ganglion cell mosaics
//!
//! Somas commit to a cell type, spread out by migrating down the gradient of
//! their own type's marker and by dying where it is too concentrated, then grow
//! dendrites that retract from same-type crowding.

pub mod core;
pub mod ecs;
pub mod entity;
pub mod output;
pub mod simulation;
pub mod spatial;
