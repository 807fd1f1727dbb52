pub mod field;
pub mod grid;
pub mod neighbors;
pub mod sparse_hash;

pub use field::{DiffusionGrid, FieldRegistry, SpatialField};
pub use neighbors::{NeighborQuery, NeighborSnapshot};
pub use sparse_hash::SparseHashGrid;
