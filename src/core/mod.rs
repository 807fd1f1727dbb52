pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{MosaicError, Result};
pub use types::{AgentId, CategoryId, FieldId, Tick};
