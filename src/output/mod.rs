//! Run outputs: text reports, morphologies and the JSON summary

pub mod morphology;
pub mod reports;
pub mod summary;

pub use morphology::{parse_swc, soma_morphology, write_swc, NodeType, SwcNode};
pub use reports::ReportWriter;
pub use summary::{CategorySummary, RunSummary};
